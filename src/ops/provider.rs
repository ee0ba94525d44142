use super::{ClientCapabilities, Diagnostics, ServerCapabilities};
use crate::schema::{ProviderSchema, SchemaSet};
use crate::value::TypedValue;

#[derive(Debug, Clone)]
pub struct GetProviderSchemaResponse {
    pub(crate) schemas: SchemaSet,
    pub(crate) server_capabilities: ServerCapabilities,
    pub(crate) diagnostics: Diagnostics,
}

impl GetProviderSchemaResponse {
    pub fn provider_schema(&self) -> ProviderSchema<'_> {
        self.schemas.view()
    }

    pub fn server_capabilities(&self) -> ServerCapabilities {
        self.server_capabilities
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }
}

#[derive(Debug, Clone)]
pub struct ValidateProviderConfigRequest {
    pub config: TypedValue,
}

#[derive(Debug, Clone)]
pub struct ValidateProviderConfigResponse {
    pub(crate) diagnostics: Diagnostics,
}

impl ValidateProviderConfigResponse {
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }
}

#[derive(Debug, Clone)]
pub struct ConfigureProviderRequest {
    /// Version of the calling program, reported to the plugin.
    pub terraform_version: String,
    pub config: TypedValue,
    pub client_capabilities: Option<ClientCapabilities>,
}

#[derive(Debug, Clone)]
pub struct ConfigureProviderResponse {
    pub(crate) diagnostics: Diagnostics,
}

impl ConfigureProviderResponse {
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }
}
