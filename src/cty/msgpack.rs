//! MessagePack encoding of values, the primary wire encoding.
//!
//! Unknown values use extension type 0. Plugins that attach refinements to
//! unknown values send extension type 12 instead; both decode as
//! [`Value::Unknown`].

use std::collections::BTreeMap;

use rmpv::Value as Wire;

use super::{Number, Type, Value};
use crate::error::CodecError;

const UNKNOWN_EXT: i8 = 0;
const REFINED_UNKNOWN_EXT: i8 = 12;

/// Encode `value` as msgpack against `ty`.
pub fn marshal(value: &Value, ty: &Type) -> Result<Vec<u8>, CodecError> {
    let wire = to_wire(value, ty, "")?;
    let mut buf = Vec::new();
    rmpv::encode::write_value(&mut buf, &wire).map_err(|e| CodecError::Msgpack(e.to_string()))?;
    Ok(buf)
}

/// Decode msgpack bytes against `ty`.
pub fn unmarshal(bytes: &[u8], ty: &Type) -> Result<Value, CodecError> {
    let mut reader = bytes;
    let wire =
        rmpv::decode::read_value(&mut reader).map_err(|e| CodecError::Msgpack(e.to_string()))?;
    if !reader.is_empty() {
        return Err(CodecError::Msgpack(format!(
            "{} trailing bytes after value",
            reader.len()
        )));
    }
    from_wire(wire, ty, "")
}

fn unknown() -> Wire {
    Wire::Ext(UNKNOWN_EXT, vec![0])
}

fn to_wire(value: &Value, ty: &Type, path: &str) -> Result<Wire, CodecError> {
    match value {
        Value::Null => return Ok(Wire::Nil),
        Value::Unknown => return Ok(unknown()),
        _ => {}
    }

    match (ty, value) {
        (Type::Dynamic, v) => {
            let actual = v.infer_type();
            Ok(Wire::Array(vec![
                Wire::Binary(actual.to_json_bytes()),
                to_wire(v, &actual, path)?,
            ]))
        }
        (Type::Bool, Value::Bool(b)) => Ok(Wire::Boolean(*b)),
        (Type::Number, Value::Number(n)) => Ok(number_to_wire(n)),
        (Type::String, Value::String(s)) => Ok(Wire::String(s.as_str().into())),
        (Type::List(ety), Value::List(items)) | (Type::Set(ety), Value::Set(items)) => items
            .iter()
            .enumerate()
            .map(|(i, item)| to_wire(item, ety, &format!("{path}[{i}]")))
            .collect::<Result<_, _>>()
            .map(Wire::Array),
        (Type::Map(ety), Value::Map(entries)) => entries
            .iter()
            .map(|(k, v)| {
                Ok((
                    Wire::String(k.as_str().into()),
                    to_wire(v, ety, &format!("{path}[{k:?}]"))?,
                ))
            })
            .collect::<Result<_, CodecError>>()
            .map(Wire::Map),
        (
            Type::Object {
                attributes,
                optional,
            },
            Value::Object(entries),
        ) => {
            if let Some(extra) = entries.keys().find(|k| !attributes.contains_key(*k)) {
                return Err(CodecError::at(
                    path,
                    format!("unsupported attribute {extra:?}"),
                ));
            }
            let mut fields = Vec::with_capacity(attributes.len());
            for (name, aty) in attributes {
                let attr_path = format!("{path}.{name}");
                let wire = match entries.get(name) {
                    Some(v) => to_wire(v, aty, &attr_path)?,
                    None if optional.contains(name) => Wire::Nil,
                    None => {
                        return Err(CodecError::at(
                            path,
                            format!("attribute {name:?} is required"),
                        ))
                    }
                };
                fields.push((Wire::String(name.as_str().into()), wire));
            }
            Ok(Wire::Map(fields))
        }
        (Type::Tuple(etys), Value::Tuple(items)) => {
            if etys.len() != items.len() {
                return Err(CodecError::at(
                    path,
                    format!("tuple of {} elements required, got {}", etys.len(), items.len()),
                ));
            }
            items
                .iter()
                .zip(etys)
                .enumerate()
                .map(|(i, (item, ety))| to_wire(item, ety, &format!("{path}[{i}]")))
                .collect::<Result<_, _>>()
                .map(Wire::Array)
        }
        (ty, _) => Err(CodecError::at(path, format!("{ty} required"))),
    }
}

fn number_to_wire(n: &Number) -> Wire {
    if let Some(i) = n.as_i64() {
        Wire::from(i)
    } else if let Some(u) = n.as_u64() {
        Wire::from(u)
    } else {
        Wire::F64(n.as_f64().unwrap_or_default())
    }
}

fn from_wire(wire: Wire, ty: &Type, path: &str) -> Result<Value, CodecError> {
    match wire {
        Wire::Nil => return Ok(Value::Null),
        Wire::Ext(UNKNOWN_EXT | REFINED_UNKNOWN_EXT, _) => return Ok(Value::Unknown),
        _ => {}
    }

    match ty {
        Type::Dynamic => {
            let Wire::Array(mut pair) = wire else {
                return Err(CodecError::at(path, "dynamic value must be a [type, value] pair"));
            };
            if pair.len() != 2 {
                return Err(CodecError::at(path, "dynamic value must be a [type, value] pair"));
            }
            let inner = pair.pop().unwrap_or(Wire::Nil);
            let actual = match pair.pop() {
                Some(Wire::Binary(json)) => Type::from_json_bytes(&json)?,
                Some(Wire::String(json)) => Type::from_json_bytes(json.as_bytes())?,
                _ => return Err(CodecError::at(path, "dynamic value type must be JSON bytes")),
            };
            from_wire(inner, &actual, path)
        }
        Type::Bool => match wire {
            Wire::Boolean(b) => Ok(Value::Bool(b)),
            _ => Err(CodecError::at(path, "bool required")),
        },
        Type::Number => wire_to_number(wire, path).map(Value::Number),
        Type::String => match wire {
            Wire::String(s) => s
                .into_str()
                .map(Value::String)
                .ok_or_else(|| CodecError::at(path, "string is not valid UTF-8")),
            _ => Err(CodecError::at(path, "string required")),
        },
        Type::List(ety) | Type::Set(ety) => {
            let Wire::Array(items) = wire else {
                return Err(CodecError::at(path, format!("{ty} required")));
            };
            let items = items
                .into_iter()
                .enumerate()
                .map(|(i, item)| from_wire(item, ety, &format!("{path}[{i}]")))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(match ty {
                Type::Set(_) => Value::Set(items),
                _ => Value::List(items),
            })
        }
        Type::Map(ety) => {
            let Wire::Map(entries) = wire else {
                return Err(CodecError::at(path, format!("{ty} required")));
            };
            let mut map = BTreeMap::new();
            for (k, v) in entries {
                let key = wire_key(k, path)?;
                let value = from_wire(v, ety, &format!("{path}[{key:?}]"))?;
                map.insert(key, value);
            }
            Ok(Value::Map(map))
        }
        Type::Object {
            attributes,
            optional,
        } => {
            let Wire::Map(entries) = wire else {
                return Err(CodecError::at(path, "object required"));
            };
            let mut object = BTreeMap::new();
            for (k, v) in entries {
                let name = wire_key(k, path)?;
                let aty = attributes.get(&name).ok_or_else(|| {
                    CodecError::at(path, format!("unsupported attribute {name:?}"))
                })?;
                let value = from_wire(v, aty, &format!("{path}.{name}"))?;
                object.insert(name, value);
            }
            for name in attributes.keys() {
                if !object.contains_key(name) {
                    if optional.contains(name) {
                        object.insert(name.clone(), Value::Null);
                    } else {
                        return Err(CodecError::at(
                            path,
                            format!("attribute {name:?} is required"),
                        ));
                    }
                }
            }
            Ok(Value::Object(object))
        }
        Type::Tuple(etys) => {
            let Wire::Array(items) = wire else {
                return Err(CodecError::at(path, "tuple required"));
            };
            if items.len() != etys.len() {
                return Err(CodecError::at(
                    path,
                    format!("tuple of {} elements required, got {}", etys.len(), items.len()),
                ));
            }
            items
                .into_iter()
                .zip(etys)
                .enumerate()
                .map(|(i, (item, ety))| from_wire(item, ety, &format!("{path}[{i}]")))
                .collect::<Result<_, _>>()
                .map(Value::Tuple)
        }
    }
}

fn wire_to_number(wire: Wire, path: &str) -> Result<Number, CodecError> {
    match wire {
        Wire::Integer(i) => i
            .as_i64()
            .map(Number::from)
            .or_else(|| i.as_u64().map(Number::from))
            .ok_or_else(|| CodecError::at(path, "integer out of range")),
        Wire::F32(f) => Number::from_f64(f64::from(f))
            .ok_or_else(|| CodecError::at(path, "number must be finite")),
        Wire::F64(f) => {
            Number::from_f64(f).ok_or_else(|| CodecError::at(path, "number must be finite"))
        }
        // Numbers too large for a float travel as their decimal string.
        Wire::String(s) => {
            let text = s
                .as_str()
                .ok_or_else(|| CodecError::at(path, "number is not valid UTF-8"))?;
            serde_json::from_str::<Number>(text)
                .map_err(|_| CodecError::at(path, format!("invalid number {text:?}")))
        }
        _ => Err(CodecError::at(path, "number required")),
    }
}

fn wire_key(key: Wire, path: &str) -> Result<String, CodecError> {
    match key {
        Wire::String(s) => s
            .into_str()
            .ok_or_else(|| CodecError::at(path, "key is not valid UTF-8")),
        _ => Err(CodecError::at(path, "map keys must be strings")),
    }
}
