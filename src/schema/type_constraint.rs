use std::fmt;

use crate::cty::Type;
use crate::error::CodecError;

/// A type constraint as the plugin sent it: a JSON type expression.
///
/// Views are rebuilt on every lookup, so the expression is parsed on each
/// call to [`TypeConstraint::ty`]. Keep the returned [`Type`] when it is
/// needed more than once.
#[derive(Clone, Copy)]
pub struct TypeConstraint<'a> {
    json: &'a [u8],
}

impl<'a> TypeConstraint<'a> {
    pub(crate) fn new(json: &'a [u8]) -> Self {
        Self { json }
    }

    /// The raw JSON type expression.
    pub fn as_json(&self) -> &'a [u8] {
        self.json
    }

    pub fn ty(&self) -> Result<Type, CodecError> {
        Type::from_json_bytes(self.json)
    }
}

impl fmt::Debug for TypeConstraint<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypeConstraint")
            .field(&String::from_utf8_lossy(self.json))
            .finish()
    }
}
