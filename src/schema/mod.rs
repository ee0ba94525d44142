//! Version-agnostic views over provider schemas.
//!
//! Every view borrows the protocol 5 or protocol 6 wire message it was built
//! from and converts fields only when they are asked for, so inspecting one
//! resource type in a large provider schema costs nothing for the rest.
//! Views have no public constructors; they are obtained from responses.

/// Evaluate the same expression against whichever wire message a view wraps.
macro_rules! by_version {
    ($repr:expr, $enum:ident, |$bind:ident| $body:expr) => {
        match $repr {
            $enum::V5($bind) => $body,
            $enum::V6($bind) => $body,
        }
    };
}

mod block;
mod function;
mod provider;
mod type_constraint;

pub use block::{
    Attribute, AttributeUsage, BlockType, NestedBlockType, NestingMode, ObjectType, Schema,
};
pub use function::{FunctionArity, FunctionParameter, FunctionSignature};
pub use provider::ProviderSchema;
pub(crate) use provider::{FunctionSet, SchemaSet};
pub use type_constraint::TypeConstraint;

/// Builds a view from the wire message it borrows.
pub(crate) trait FromWire<'a, W: ?Sized> {
    fn from_wire(wire: &'a W) -> Self;
}

/// Markup used by a documentation string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocStringFormat {
    Plain,
    Markdown,
    /// A format newer than this client understands.
    Unsupported,
}

impl DocStringFormat {
    /// Both protocol versions number their string kinds identically.
    pub(crate) fn from_wire(kind: i32) -> Self {
        match kind {
            0 => Self::Plain,
            1 => Self::Markdown,
            _ => Self::Unsupported,
        }
    }
}

/// Documentation text with its format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocString<'a> {
    pub text: &'a str,
    pub format: DocStringFormat,
}

impl<'a> DocString<'a> {
    pub(crate) fn new(text: &'a str, kind: i32) -> Self {
        Self {
            text,
            format: DocStringFormat::from_wire(kind),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}
