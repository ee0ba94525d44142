use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde_json::Value as Json;

use crate::error::CodecError;

/// A type in the provider value system.
///
/// Types travel on the wire as compact JSON expressions: primitives are plain
/// strings (`"string"`) and compound types are arrays (`["list","string"]`,
/// `["object",{"id":"string"}]`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Bool,
    Number,
    String,
    /// Placeholder for "any type". Values of this type carry their concrete
    /// type alongside them on the wire.
    Dynamic,
    List(Box<Type>),
    Set(Box<Type>),
    Map(Box<Type>),
    Object {
        attributes: BTreeMap<String, Type>,
        /// Attributes that may be omitted from a value of this type.
        optional: BTreeSet<String>,
    },
    Tuple(Vec<Type>),
}

impl Type {
    pub fn list(element: Type) -> Self {
        Self::List(Box::new(element))
    }

    pub fn set(element: Type) -> Self {
        Self::Set(Box::new(element))
    }

    pub fn map(element: Type) -> Self {
        Self::Map(Box::new(element))
    }

    pub fn object<I, K>(attributes: I) -> Self
    where
        I: IntoIterator<Item = (K, Type)>,
        K: Into<String>,
    {
        Self::Object {
            attributes: attributes.into_iter().map(|(k, t)| (k.into(), t)).collect(),
            optional: BTreeSet::new(),
        }
    }

    pub fn tuple(elements: Vec<Type>) -> Self {
        Self::Tuple(elements)
    }

    pub fn empty_object() -> Self {
        Self::object(std::iter::empty::<(String, Type)>())
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, Self::Bool | Self::Number | Self::String)
    }

    /// Element type of a list, set or map.
    pub fn element_type(&self) -> Option<&Type> {
        match self {
            Self::List(t) | Self::Set(t) | Self::Map(t) => Some(t),
            _ => None,
        }
    }

    /// Parse a JSON type expression.
    pub fn from_json(json: &Json) -> Result<Self, CodecError> {
        match json {
            Json::String(name) => match name.as_str() {
                "bool" => Ok(Self::Bool),
                "number" => Ok(Self::Number),
                "string" => Ok(Self::String),
                "dynamic" => Ok(Self::Dynamic),
                other => Err(CodecError::InvalidType(format!(
                    "unknown primitive type {other:?}"
                ))),
            },
            Json::Array(parts) => {
                let kind = parts.first().and_then(Json::as_str).ok_or_else(|| {
                    CodecError::InvalidType("type array must start with a type kind".into())
                })?;
                match (kind, parts.len()) {
                    ("list", 2) => Ok(Self::list(Self::from_json(&parts[1])?)),
                    ("set", 2) => Ok(Self::set(Self::from_json(&parts[1])?)),
                    ("map", 2) => Ok(Self::map(Self::from_json(&parts[1])?)),
                    ("object", 2 | 3) => {
                        let attrs = parts[1].as_object().ok_or_else(|| {
                            CodecError::InvalidType("object attributes must be a JSON object".into())
                        })?;
                        let attributes = attrs
                            .iter()
                            .map(|(name, ty)| Ok((name.clone(), Self::from_json(ty)?)))
                            .collect::<Result<BTreeMap<_, _>, CodecError>>()?;
                        let mut optional = BTreeSet::new();
                        if let Some(names) = parts.get(2) {
                            let names = names.as_array().ok_or_else(|| {
                                CodecError::InvalidType("optional attributes must be an array".into())
                            })?;
                            for name in names {
                                let name = name.as_str().ok_or_else(|| {
                                    CodecError::InvalidType(
                                        "optional attribute names must be strings".into(),
                                    )
                                })?;
                                if !attributes.contains_key(name) {
                                    return Err(CodecError::InvalidType(format!(
                                        "optional attribute {name:?} is not declared"
                                    )));
                                }
                                optional.insert(name.to_string());
                            }
                        }
                        Ok(Self::Object { attributes, optional })
                    }
                    ("tuple", 2) => {
                        let elems = parts[1].as_array().ok_or_else(|| {
                            CodecError::InvalidType("tuple elements must be an array".into())
                        })?;
                        Ok(Self::Tuple(
                            elems.iter().map(Self::from_json).collect::<Result<_, _>>()?,
                        ))
                    }
                    (other, n) => Err(CodecError::InvalidType(format!(
                        "invalid {other:?} type expression with {n} elements"
                    ))),
                }
            }
            other => Err(CodecError::InvalidType(format!(
                "expected string or array, got {other}"
            ))),
        }
    }

    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        let json: Json = serde_json::from_slice(bytes)?;
        Self::from_json(&json)
    }

    /// Render as a JSON type expression.
    pub fn to_json(&self) -> Json {
        match self {
            Self::Bool => Json::from("bool"),
            Self::Number => Json::from("number"),
            Self::String => Json::from("string"),
            Self::Dynamic => Json::from("dynamic"),
            Self::List(t) => Json::Array(vec!["list".into(), t.to_json()]),
            Self::Set(t) => Json::Array(vec!["set".into(), t.to_json()]),
            Self::Map(t) => Json::Array(vec!["map".into(), t.to_json()]),
            Self::Object {
                attributes,
                optional,
            } => {
                let attrs: serde_json::Map<String, Json> = attributes
                    .iter()
                    .map(|(name, ty)| (name.clone(), ty.to_json()))
                    .collect();
                let mut parts = vec!["object".into(), Json::Object(attrs)];
                if !optional.is_empty() {
                    parts.push(optional.iter().map(|n| Json::from(n.as_str())).collect());
                }
                Json::Array(parts)
            }
            Self::Tuple(elems) => Json::Array(vec![
                "tuple".into(),
                Json::Array(elems.iter().map(Type::to_json).collect()),
            ]),
        }
    }

    pub fn to_json_bytes(&self) -> Vec<u8> {
        // Serializing a serde_json::Value into a Vec cannot fail.
        self.to_json().to_string().into_bytes()
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => f.write_str("bool"),
            Self::Number => f.write_str("number"),
            Self::String => f.write_str("string"),
            Self::Dynamic => f.write_str("dynamic"),
            Self::List(t) => write!(f, "list of {t}"),
            Self::Set(t) => write!(f, "set of {t}"),
            Self::Map(t) => write!(f, "map of {t}"),
            Self::Object { .. } => f.write_str("object"),
            Self::Tuple(_) => f.write_str("tuple"),
        }
    }
}
