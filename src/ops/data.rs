use super::{ClientCapabilities, Deferred, Diagnostics};
use crate::value::{TypedValue, WireValue};

#[derive(Debug, Clone)]
pub struct ValidateDataResourceConfigRequest {
    pub resource_type: String,
    pub config: TypedValue,
}

#[derive(Debug, Clone)]
pub struct ValidateDataResourceConfigResponse {
    pub(crate) diagnostics: Diagnostics,
}

impl ValidateDataResourceConfigResponse {
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }
}

#[derive(Debug, Clone)]
pub struct ReadDataResourceRequest {
    pub resource_type: String,
    pub config: TypedValue,
    pub provider_meta: Option<TypedValue>,
    pub client_capabilities: Option<ClientCapabilities>,
}

#[derive(Debug, Clone)]
pub struct ReadDataResourceResponse {
    pub(crate) state: WireValue,
    pub(crate) deferred: Option<Deferred>,
    pub(crate) diagnostics: Diagnostics,
}

impl ReadDataResourceResponse {
    pub fn state(&self) -> &WireValue {
        &self.state
    }

    pub fn deferred(&self) -> Option<&Deferred> {
        self.deferred.as_ref()
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }
}
