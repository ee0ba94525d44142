//! JSON encoding of values.
//!
//! Plugins may answer with JSON instead of msgpack, and persisted state uses
//! JSON. Unknown values have no JSON form. Values of dynamic type are wrapped
//! as `{"value": ..., "type": ...}`.

use std::collections::BTreeMap;

use serde_json::Value as Json;

use super::{Number, Type, Value};
use crate::error::CodecError;

/// Encode `value` as JSON against `ty`.
pub fn marshal(value: &Value, ty: &Type) -> Result<Vec<u8>, CodecError> {
    let json = to_json(value, ty, "")?;
    Ok(serde_json::to_vec(&json)?)
}

/// Decode JSON bytes against `ty`.
pub fn unmarshal(bytes: &[u8], ty: &Type) -> Result<Value, CodecError> {
    let json: Json = serde_json::from_slice(bytes)?;
    from_json(json, ty, "")
}

fn to_json(value: &Value, ty: &Type, path: &str) -> Result<Json, CodecError> {
    match (ty, value) {
        (_, Value::Null) => Ok(Json::Null),
        (_, Value::Unknown) => Err(CodecError::at(path, "value is not known")),
        (Type::Dynamic, v) => {
            let actual = v.infer_type();
            let mut wrapper = serde_json::Map::new();
            wrapper.insert("value".into(), to_json(v, &actual, path)?);
            wrapper.insert("type".into(), actual.to_json());
            Ok(Json::Object(wrapper))
        }
        (Type::Bool, Value::Bool(b)) => Ok(Json::Bool(*b)),
        (Type::Number, Value::Number(n)) => Ok(Json::Number(n.clone())),
        (Type::String, Value::String(s)) => Ok(Json::String(s.clone())),
        (Type::List(ety), Value::List(items)) | (Type::Set(ety), Value::Set(items)) => items
            .iter()
            .enumerate()
            .map(|(i, item)| to_json(item, ety, &format!("{path}[{i}]")))
            .collect::<Result<_, _>>()
            .map(Json::Array),
        (Type::Map(ety), Value::Map(entries)) => entries
            .iter()
            .map(|(k, v)| Ok((k.clone(), to_json(v, ety, &format!("{path}[{k:?}]"))?)))
            .collect::<Result<_, CodecError>>()
            .map(Json::Object),
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
            let mut object = serde_json::Map::new();
            for (name, aty) in attributes {
                let json = match entries.get(name) {
                    Some(v) => to_json(v, aty, &format!("{path}.{name}"))?,
                    None if optional.contains(name) => Json::Null,
                    None => {
                        return Err(CodecError::at(
                            path,
                            format!("attribute {name:?} is required"),
                        ))
                    }
                };
                object.insert(name.clone(), json);
            }
            Ok(Json::Object(object))
        }
        (Type::Tuple(etys), Value::Tuple(items)) if etys.len() == items.len() => items
            .iter()
            .zip(etys)
            .enumerate()
            .map(|(i, (item, ety))| to_json(item, ety, &format!("{path}[{i}]")))
            .collect::<Result<_, _>>()
            .map(Json::Array),
        (ty, _) => Err(CodecError::at(path, format!("{ty} required"))),
    }
}

fn from_json(json: Json, ty: &Type, path: &str) -> Result<Value, CodecError> {
    if json.is_null() {
        return Ok(Value::Null);
    }

    match ty {
        Type::Dynamic => {
            let Json::Object(mut wrapper) = json else {
                return Err(CodecError::at(
                    path,
                    "dynamic value must be an object with \"value\" and \"type\"",
                ));
            };
            let actual = wrapper
                .remove("type")
                .ok_or_else(|| CodecError::at(path, "dynamic value is missing \"type\""))?;
            let actual = Type::from_json(&actual)?;
            let inner = wrapper
                .remove("value")
                .ok_or_else(|| CodecError::at(path, "dynamic value is missing \"value\""))?;
            from_json(inner, &actual, path)
        }
        Type::Bool => match json {
            Json::Bool(b) => Ok(Value::Bool(b)),
            Json::String(s) if s == "true" => Ok(Value::Bool(true)),
            Json::String(s) if s == "false" => Ok(Value::Bool(false)),
            _ => Err(CodecError::at(path, "bool required")),
        },
        Type::Number => match json {
            Json::Number(n) => Ok(Value::Number(n)),
            Json::String(s) => serde_json::from_str::<Number>(&s)
                .map(Value::Number)
                .map_err(|_| CodecError::at(path, format!("invalid number {s:?}"))),
            _ => Err(CodecError::at(path, "number required")),
        },
        // Primitive JSON tokens convert to strings.
        Type::String => match json {
            Json::String(s) => Ok(Value::String(s)),
            Json::Number(n) => Ok(Value::String(n.to_string())),
            Json::Bool(b) => Ok(Value::String(b.to_string())),
            _ => Err(CodecError::at(path, "string required")),
        },
        Type::List(ety) | Type::Set(ety) => {
            let Json::Array(items) = json else {
                return Err(CodecError::at(path, format!("{ty} required")));
            };
            let items = items
                .into_iter()
                .enumerate()
                .map(|(i, item)| from_json(item, ety, &format!("{path}[{i}]")))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(match ty {
                Type::Set(_) => Value::Set(items),
                _ => Value::List(items),
            })
        }
        Type::Map(ety) => {
            let Json::Object(entries) = json else {
                return Err(CodecError::at(path, format!("{ty} required")));
            };
            entries
                .into_iter()
                .map(|(k, v)| {
                    let value = from_json(v, ety, &format!("{path}[{k:?}]"))?;
                    Ok((k, value))
                })
                .collect::<Result<BTreeMap<_, _>, CodecError>>()
                .map(Value::Map)
        }
        Type::Object {
            attributes,
            optional,
        } => {
            let Json::Object(mut entries) = json else {
                return Err(CodecError::at(path, "object required"));
            };
            if let Some(extra) = entries.keys().find(|k| !attributes.contains_key(*k)) {
                return Err(CodecError::at(
                    path,
                    format!("unsupported attribute {extra:?}"),
                ));
            }
            let mut object = BTreeMap::new();
            for (name, aty) in attributes {
                let value = match entries.remove(name) {
                    Some(v) => from_json(v, aty, &format!("{path}.{name}"))?,
                    None if optional.contains(name) => Value::Null,
                    None => {
                        return Err(CodecError::at(
                            path,
                            format!("attribute {name:?} is required"),
                        ))
                    }
                };
                object.insert(name.clone(), value);
            }
            Ok(Value::Object(object))
        }
        Type::Tuple(etys) => {
            let Json::Array(items) = json else {
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
                .map(|(i, (item, ety))| from_json(item, ety, &format!("{path}[{i}]")))
                .collect::<Result<_, _>>()
                .map(Value::Tuple)
        }
    }
}
