//! Ephemeral resources live only for the duration of one run: opened,
//! optionally renewed, then closed. They never produce persisted state.

use chrono::{DateTime, Utc};

use super::{ClientCapabilities, Deferred, Diagnostics};
use crate::value::{TypedValue, WireValue};

#[derive(Debug, Clone)]
pub struct ValidateEphemeralResourceConfigRequest {
    pub resource_type: String,
    pub config: TypedValue,
}

#[derive(Debug, Clone)]
pub struct ValidateEphemeralResourceConfigResponse {
    pub(crate) diagnostics: Diagnostics,
}

impl ValidateEphemeralResourceConfigResponse {
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }
}

#[derive(Debug, Clone)]
pub struct OpenEphemeralResourceRequest {
    pub resource_type: String,
    pub config: TypedValue,
    pub client_capabilities: Option<ClientCapabilities>,
}

#[derive(Debug, Clone)]
pub struct OpenEphemeralResourceResponse {
    pub(crate) result: WireValue,
    pub(crate) private: Option<Vec<u8>>,
    pub(crate) renew_at: Option<DateTime<Utc>>,
    pub(crate) deferred: Option<Deferred>,
    pub(crate) diagnostics: Diagnostics,
}

impl OpenEphemeralResourceResponse {
    pub fn result(&self) -> &WireValue {
        &self.result
    }

    /// Opaque bytes for the renew and close requests of this instance.
    pub fn private(&self) -> Option<&[u8]> {
        self.private.as_deref()
    }

    /// When the resource must be renewed to stay valid, if ever.
    pub fn renew_at(&self) -> Option<DateTime<Utc>> {
        self.renew_at
    }

    pub fn deferred(&self) -> Option<&Deferred> {
        self.deferred.as_ref()
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }
}

#[derive(Debug, Clone)]
pub struct RenewEphemeralResourceRequest {
    pub resource_type: String,
    pub private: Option<Vec<u8>>,
}

#[derive(Debug, Clone)]
pub struct RenewEphemeralResourceResponse {
    pub(crate) private: Option<Vec<u8>>,
    pub(crate) renew_at: Option<DateTime<Utc>>,
    pub(crate) diagnostics: Diagnostics,
}

impl RenewEphemeralResourceResponse {
    /// Replaces the bytes sent with the renew request.
    pub fn private(&self) -> Option<&[u8]> {
        self.private.as_deref()
    }

    pub fn renew_at(&self) -> Option<DateTime<Utc>> {
        self.renew_at
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }
}

#[derive(Debug, Clone)]
pub struct CloseEphemeralResourceRequest {
    pub resource_type: String,
    pub private: Option<Vec<u8>>,
}

#[derive(Debug, Clone)]
pub struct CloseEphemeralResourceResponse {
    pub(crate) diagnostics: Diagnostics,
}

impl CloseEphemeralResourceResponse {
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }
}
