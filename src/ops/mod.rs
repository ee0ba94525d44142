//! Requests and responses for every provider operation.
//!
//! Requests are plain structs filled in by the caller. Responses are only
//! built by this crate and expose their fields through accessors.

mod capabilities;
mod data;
mod diagnostics;
mod ephemeral;
mod function;
mod managed;
mod provider;

pub use capabilities::{ClientCapabilities, Deferred, DeferredReason, ServerCapabilities};
pub use data::{
    ReadDataResourceRequest, ReadDataResourceResponse, ValidateDataResourceConfigRequest,
    ValidateDataResourceConfigResponse,
};
pub use diagnostics::{AttributePath, Diagnostic, DiagnosticSeverity, Diagnostics, PathStep};
pub use ephemeral::{
    CloseEphemeralResourceRequest, CloseEphemeralResourceResponse, OpenEphemeralResourceRequest,
    OpenEphemeralResourceResponse, RenewEphemeralResourceRequest, RenewEphemeralResourceResponse,
    ValidateEphemeralResourceConfigRequest, ValidateEphemeralResourceConfigResponse,
};
pub use function::{CallFunctionRequest, CallFunctionResponse, FunctionError, GetFunctionsResponse};
pub use managed::{
    ApplyManagedResourceChangeRequest, ApplyManagedResourceChangeResponse,
    ImportManagedResourceStateRequest, ImportManagedResourceStateResponse,
    ImportedManagedResource, MoveManagedResourceStateRequest, MoveManagedResourceStateResponse,
    PlanManagedResourceChangeRequest, PlanManagedResourceChangeResponse,
    ReadManagedResourceRequest, ReadManagedResourceResponse, UpgradeManagedResourceStateRequest,
    UpgradeManagedResourceStateResponse, ValidateManagedResourceConfigRequest,
    ValidateManagedResourceConfigResponse,
};
pub use provider::{
    ConfigureProviderRequest, ConfigureProviderResponse, GetProviderSchemaResponse,
    ValidateProviderConfigRequest, ValidateProviderConfigResponse,
};
