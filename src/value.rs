//! Values crossing the plugin boundary.
//!
//! Outbound values pair a [`Value`] with the type it is serialized against.
//! Inbound values stay as raw bytes until the caller supplies the type to
//! decode them with, because the wire never says which type applies.

use std::collections::HashMap;

use crate::cty::{json, msgpack, Type, Value};
use crate::error::CodecError;

/// A value paired with its serialization type, ready to send to a plugin.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedValue {
    value: Value,
    ty: Type,
}

impl TypedValue {
    pub fn new(value: Value, ty: Type) -> Self {
        Self { value, ty }
    }

    /// A null value of the given type.
    pub fn null(ty: Type) -> Self {
        Self::new(Value::Null, ty)
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn serialization_type(&self) -> &Type {
        &self.ty
    }

    pub(crate) fn to_msgpack(&self) -> Result<Vec<u8>, CodecError> {
        msgpack::marshal(&self.value, &self.ty)
    }
}

/// Which encoding a plugin used for a returned value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireEncoding {
    Msgpack,
    Json,
}

/// A value returned by a plugin, decoded only on request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireValue {
    encoding: Option<WireEncoding>,
    raw: Vec<u8>,
}

impl WireValue {
    /// Msgpack wins when a plugin populates both encodings.
    pub(crate) fn from_wire(msgpack: Vec<u8>, json: Vec<u8>) -> Self {
        if !msgpack.is_empty() {
            Self {
                encoding: Some(WireEncoding::Msgpack),
                raw: msgpack,
            }
        } else if !json.is_empty() {
            Self {
                encoding: Some(WireEncoding::Json),
                raw: json,
            }
        } else {
            Self {
                encoding: None,
                raw: Vec::new(),
            }
        }
    }

    /// The encoding the plugin chose, or `None` if it populated neither.
    pub fn encoding(&self) -> Option<WireEncoding> {
        self.encoding
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }

    /// Decode against `ty`, failing if the bytes do not conform to it.
    pub fn decode(&self, ty: &Type) -> Result<Value, CodecError> {
        match self.encoding {
            Some(WireEncoding::Msgpack) => msgpack::unmarshal(&self.raw, ty),
            Some(WireEncoding::Json) => json::unmarshal(&self.raw, ty),
            None => Err(CodecError::NoEncoding),
        }
    }
}

/// Previously-persisted resource state, as sent to state upgrade and move.
///
/// `flatmap` holds the legacy flat key/value form. It exists only to pass
/// along state written by very old clients; new state is always JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawState {
    pub json: Vec<u8>,
    pub flatmap: HashMap<String, String>,
}

impl RawState {
    /// Serialize `value` as JSON state. Unknown values cannot be persisted.
    pub fn from_value(value: &Value, ty: &Type) -> Result<Self, CodecError> {
        Ok(Self {
            json: json::marshal(value, ty)?,
            flatmap: HashMap::new(),
        })
    }
}
