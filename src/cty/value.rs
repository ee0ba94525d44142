use std::collections::BTreeMap;

use super::Type;

pub use serde_json::Number;

/// A dynamically-typed value.
///
/// Values do not carry their own type: the type is supplied separately when a
/// value is encoded or decoded. `Null` and `Unknown` conform to every type.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    /// A value that will only be known after apply.
    Unknown,
    Bool(bool),
    Number(Number),
    String(String),
    List(Vec<Value>),
    Set(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Object(BTreeMap<String, Value>),
    Tuple(Vec<Value>),
}

impl Value {
    pub fn object<I, K>(attributes: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self::Object(attributes.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn map<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// A number value from a float. Returns `None` for NaN or infinities,
    /// which have no representation.
    pub fn from_f64(n: f64) -> Option<Self> {
        Number::from_f64(n).map(Self::Number)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown)
    }

    /// Whether neither this value nor anything nested inside it is unknown.
    pub fn is_wholly_known(&self) -> bool {
        match self {
            Self::Unknown => false,
            Self::List(items) | Self::Set(items) | Self::Tuple(items) => {
                items.iter().all(Value::is_wholly_known)
            }
            Self::Map(entries) | Self::Object(entries) => {
                entries.values().all(Value::is_wholly_known)
            }
            _ => true,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<&Number> {
        match self {
            Self::Number(n) => Some(n),
            _ => None,
        }
    }

    /// Attribute of an object value, or element of a map value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Self::Object(entries) | Self::Map(entries) => entries.get(key),
            _ => None,
        }
    }

    /// The most specific type this value conforms to, used when a value is
    /// encoded against [`Type::Dynamic`].
    ///
    /// Null and unknown values, and empty collections, infer as dynamic.
    pub fn infer_type(&self) -> Type {
        match self {
            Self::Null | Self::Unknown => Type::Dynamic,
            Self::Bool(_) => Type::Bool,
            Self::Number(_) => Type::Number,
            Self::String(_) => Type::String,
            Self::List(items) => Type::list(infer_element_type(items.iter())),
            Self::Set(items) => Type::set(infer_element_type(items.iter())),
            Self::Map(entries) => Type::map(infer_element_type(entries.values())),
            Self::Object(entries) => {
                Type::object(entries.iter().map(|(k, v)| (k.clone(), v.infer_type())))
            }
            Self::Tuple(items) => Type::tuple(items.iter().map(Value::infer_type).collect()),
        }
    }
}

fn infer_element_type<'a>(mut items: impl Iterator<Item = &'a Value>) -> Type {
    items
        .find(|v| !matches!(v, Value::Null | Value::Unknown))
        .map(Value::infer_type)
        .unwrap_or(Type::Dynamic)
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Self::Number(n.into())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}
