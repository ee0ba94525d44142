use std::fmt;

use super::{DocString, FromWire, TypeConstraint};
use crate::provider::{tfplugin5, tfplugin6};

/// Signature of a provider-defined function.
#[derive(Debug, Clone, Copy)]
pub struct FunctionSignature<'a>(SignatureRepr<'a>);

#[derive(Debug, Clone, Copy)]
enum SignatureRepr<'a> {
    V5(&'a tfplugin5::Function),
    V6(&'a tfplugin6::Function),
}

impl<'a> FromWire<'a, tfplugin5::Function> for FunctionSignature<'a> {
    fn from_wire(wire: &'a tfplugin5::Function) -> Self {
        Self(SignatureRepr::V5(wire))
    }
}

impl<'a> FromWire<'a, tfplugin6::Function> for FunctionSignature<'a> {
    fn from_wire(wire: &'a tfplugin6::Function) -> Self {
        Self(SignatureRepr::V6(wire))
    }
}

impl<'a> FunctionSignature<'a> {
    /// Positional parameters, in call order.
    pub fn parameters(&self) -> Box<dyn Iterator<Item = FunctionParameter<'a>> + 'a> {
        by_version!(self.0, SignatureRepr, |f| Box::new(
            f.parameters.iter().map(FunctionParameter::from_wire)
        ))
    }

    /// Parameter matching any arguments after the positional ones.
    pub fn variadic_parameter(&self) -> Option<FunctionParameter<'a>> {
        by_version!(self.0, SignatureRepr, |f| f
            .variadic_parameter
            .as_ref()
            .map(FunctionParameter::from_wire))
    }

    pub fn result_type(&self) -> Option<TypeConstraint<'a>> {
        let raw: Option<&'a [u8]> =
            by_version!(self.0, SignatureRepr, |f| f.r#return.as_ref().map(|r| r.r#type.as_slice()));
        raw.filter(|r| !r.is_empty()).map(TypeConstraint::new)
    }

    pub fn summary(&self) -> &'a str {
        by_version!(self.0, SignatureRepr, |f| f.summary.as_str())
    }

    pub fn description(&self) -> DocString<'a> {
        by_version!(self.0, SignatureRepr, |f| DocString::new(
            &f.description,
            f.description_kind
        ))
    }

    /// Set when the function is deprecated.
    pub fn deprecation_message(&self) -> Option<&'a str> {
        let message = by_version!(self.0, SignatureRepr, |f| f.deprecation_message.as_str());
        (!message.is_empty()).then_some(message)
    }

    pub fn arity(&self) -> FunctionArity {
        let parameters = by_version!(self.0, SignatureRepr, |f| f.parameters.len());
        FunctionArity::new(parameters, self.variadic_parameter().is_some())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FunctionParameter<'a>(ParameterRepr<'a>);

#[derive(Debug, Clone, Copy)]
enum ParameterRepr<'a> {
    V5(&'a tfplugin5::function::Parameter),
    V6(&'a tfplugin6::function::Parameter),
}

impl<'a> FromWire<'a, tfplugin5::function::Parameter> for FunctionParameter<'a> {
    fn from_wire(wire: &'a tfplugin5::function::Parameter) -> Self {
        Self(ParameterRepr::V5(wire))
    }
}

impl<'a> FromWire<'a, tfplugin6::function::Parameter> for FunctionParameter<'a> {
    fn from_wire(wire: &'a tfplugin6::function::Parameter) -> Self {
        Self(ParameterRepr::V6(wire))
    }
}

impl<'a> FunctionParameter<'a> {
    pub fn name(&self) -> &'a str {
        by_version!(self.0, ParameterRepr, |p| p.name.as_str())
    }

    pub fn type_constraint(&self) -> TypeConstraint<'a> {
        by_version!(self.0, ParameterRepr, |p| TypeConstraint::new(&p.r#type))
    }

    pub fn null_value_allowed(&self) -> bool {
        by_version!(self.0, ParameterRepr, |p| p.allow_null_value)
    }

    pub fn unknown_values_allowed(&self) -> bool {
        by_version!(self.0, ParameterRepr, |p| p.allow_unknown_values)
    }

    pub fn description(&self) -> DocString<'a> {
        by_version!(self.0, ParameterRepr, |p| DocString::new(
            &p.description,
            p.description_kind
        ))
    }
}

/// How many arguments a function accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionArity {
    pub parameters: usize,
    pub variadic: bool,
}

impl FunctionArity {
    pub fn new(parameters: usize, variadic: bool) -> Self {
        Self {
            parameters,
            variadic,
        }
    }

    pub fn accepts(&self, arguments: usize) -> bool {
        if self.variadic {
            arguments >= self.parameters
        } else {
            arguments == self.parameters
        }
    }
}

impl fmt::Display for FunctionArity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.variadic {
            write!(f, "at least {}", self.parameters)
        } else {
            write!(f, "exactly {}", self.parameters)
        }
    }
}
