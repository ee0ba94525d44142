use std::collections::HashMap;

use super::{FromWire, FunctionSignature, Schema};
use crate::provider::{tfplugin5, tfplugin6};

/// A schema response as received, kept so views can borrow from it.
#[derive(Debug, Clone)]
pub(crate) enum SchemaSet {
    V5(tfplugin5::get_provider_schema::Response),
    V6(tfplugin6::get_provider_schema::Response),
}

impl SchemaSet {
    pub(crate) fn view(&self) -> ProviderSchema<'_> {
        match self {
            Self::V5(r) => ProviderSchema(ProviderRepr::V5(r)),
            Self::V6(r) => ProviderSchema(ProviderRepr::V6(r)),
        }
    }
}

/// Everything a plugin declared about itself: the provider configuration
/// schema, every resource type schema, and its functions.
///
/// Lookups wrap the relevant part of the response on demand; iteration order
/// over resource types and functions is unspecified.
#[derive(Debug, Clone, Copy)]
pub struct ProviderSchema<'a>(ProviderRepr<'a>);

#[derive(Debug, Clone, Copy)]
enum ProviderRepr<'a> {
    V5(&'a tfplugin5::get_provider_schema::Response),
    V6(&'a tfplugin6::get_provider_schema::Response),
}

type Named<'a, T> = Box<dyn Iterator<Item = (&'a str, T)> + 'a>;

fn named<'a, W, T>(map: &'a HashMap<String, W>) -> Named<'a, T>
where
    T: FromWire<'a, W> + 'a,
{
    Box::new(map.iter().map(|(k, v)| (k.as_str(), T::from_wire(v))))
}

impl<'a> ProviderSchema<'a> {
    pub fn provider_config_schema(&self) -> Option<Schema<'a>> {
        by_version!(self.0, ProviderRepr, |r| r.provider.as_ref().map(Schema::from_wire))
    }

    /// Schema for `provider_meta` blocks in modules using this provider.
    pub fn provider_meta_schema(&self) -> Option<Schema<'a>> {
        by_version!(self.0, ProviderRepr, |r| r
            .provider_meta
            .as_ref()
            .map(Schema::from_wire))
    }

    pub fn managed_resource_type_schemas(&self) -> Named<'a, Schema<'a>> {
        by_version!(self.0, ProviderRepr, |r| named(&r.resource_schemas))
    }

    pub fn managed_resource_type_schema(&self, type_name: &str) -> Option<Schema<'a>> {
        by_version!(self.0, ProviderRepr, |r| r
            .resource_schemas
            .get(type_name)
            .map(Schema::from_wire))
    }

    pub fn data_resource_type_schemas(&self) -> Named<'a, Schema<'a>> {
        by_version!(self.0, ProviderRepr, |r| named(&r.data_source_schemas))
    }

    pub fn data_resource_type_schema(&self, type_name: &str) -> Option<Schema<'a>> {
        by_version!(self.0, ProviderRepr, |r| r
            .data_source_schemas
            .get(type_name)
            .map(Schema::from_wire))
    }

    pub fn ephemeral_resource_type_schemas(&self) -> Named<'a, Schema<'a>> {
        by_version!(self.0, ProviderRepr, |r| named(&r.ephemeral_resource_schemas))
    }

    pub fn ephemeral_resource_type_schema(&self, type_name: &str) -> Option<Schema<'a>> {
        by_version!(self.0, ProviderRepr, |r| r
            .ephemeral_resource_schemas
            .get(type_name)
            .map(Schema::from_wire))
    }

    pub fn function_signatures(&self) -> Named<'a, FunctionSignature<'a>> {
        by_version!(self.0, ProviderRepr, |r| named(&r.functions))
    }

    pub fn function_signature(&self, name: &str) -> Option<FunctionSignature<'a>> {
        by_version!(self.0, ProviderRepr, |r| r
            .functions
            .get(name)
            .map(FunctionSignature::from_wire))
    }
}

/// Function declarations returned by a standalone function listing.
#[derive(Debug, Clone)]
pub(crate) enum FunctionSet {
    V5(HashMap<String, tfplugin5::Function>),
    V6(HashMap<String, tfplugin6::Function>),
}

impl FunctionSet {
    pub(crate) fn signatures(&self) -> Named<'_, FunctionSignature<'_>> {
        match self {
            Self::V5(functions) => named(functions),
            Self::V6(functions) => named(functions),
        }
    }

    pub(crate) fn signature(&self, name: &str) -> Option<FunctionSignature<'_>> {
        match self {
            Self::V5(functions) => functions.get(name).map(FunctionSignature::from_wire),
            Self::V6(functions) => functions.get(name).map(FunctionSignature::from_wire),
        }
    }
}
