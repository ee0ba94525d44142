use std::fmt;

use super::Diagnostics;
use crate::schema::{FunctionArity, FunctionSet, FunctionSignature};
use crate::value::{TypedValue, WireValue};

#[derive(Debug, Clone)]
pub struct GetFunctionsResponse {
    pub(crate) functions: FunctionSet,
    pub(crate) diagnostics: Diagnostics,
}

impl GetFunctionsResponse {
    /// All declared functions, in unspecified order.
    pub fn function_signatures(&self) -> impl Iterator<Item = (&str, FunctionSignature<'_>)> {
        self.functions.signatures()
    }

    pub fn function_signature(&self, name: &str) -> Option<FunctionSignature<'_>> {
        self.functions.signature(name)
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }
}

#[derive(Debug, Clone)]
pub struct CallFunctionRequest {
    pub function_name: String,
    /// One value per argument, each typed by the parameter it binds to.
    pub arguments: Vec<TypedValue>,
    /// When set, the argument count is checked before anything is sent.
    /// Obtain it from [`FunctionSignature::arity`].
    pub signature: Option<FunctionArity>,
}

/// A failure reported by the function itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionError {
    pub(crate) text: String,
    pub(crate) argument_index: Option<usize>,
}

impl FunctionError {
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Zero-based index of the argument that caused the failure.
    pub fn argument_index(&self) -> Option<usize> {
        self.argument_index
    }
}

impl fmt::Display for FunctionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.argument_index {
            Some(index) => write!(f, "argument {index}: {}", self.text),
            None => f.write_str(&self.text),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CallFunctionResponse {
    pub(crate) result: WireValue,
    pub(crate) error: Option<FunctionError>,
}

impl CallFunctionResponse {
    /// Meaningless when [`Self::error`] is set.
    pub fn result(&self) -> &WireValue {
        &self.result
    }

    pub fn error(&self) -> Option<&FunctionError> {
        self.error.as_ref()
    }
}
