//! The provider value system: types, values and their two wire encodings.

pub mod json;
pub mod msgpack;
mod types;
mod value;

pub use types::Type;
pub use value::{Number, Value};
