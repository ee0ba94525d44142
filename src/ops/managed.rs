//! Managed resources: the full validate, upgrade, read, plan, apply cycle,
//! plus import and move as alternate ways to obtain state.

use super::{AttributePath, ClientCapabilities, Deferred, Diagnostics};
use crate::value::{RawState, TypedValue, WireValue};

#[derive(Debug, Clone)]
pub struct ValidateManagedResourceConfigRequest {
    pub resource_type: String,
    pub config: TypedValue,
    pub client_capabilities: Option<ClientCapabilities>,
}

#[derive(Debug, Clone)]
pub struct ValidateManagedResourceConfigResponse {
    pub(crate) diagnostics: Diagnostics,
}

impl ValidateManagedResourceConfigResponse {
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }
}

// ─── Upgrade ─────────────────────────────────────────────────────────────────

/// Must be sent for every stored state before it is used, even when the
/// stored schema version matches the current one.
#[derive(Debug, Clone)]
pub struct UpgradeManagedResourceStateRequest {
    pub resource_type: String,
    /// Schema version the state was written with.
    pub schema_version: i64,
    pub raw_state: RawState,
}

#[derive(Debug, Clone)]
pub struct UpgradeManagedResourceStateResponse {
    pub(crate) upgraded_state: WireValue,
    pub(crate) diagnostics: Diagnostics,
}

impl UpgradeManagedResourceStateResponse {
    /// State conforming to the current schema of the resource type.
    pub fn upgraded_state(&self) -> &WireValue {
        &self.upgraded_state
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }
}

// ─── Read ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ReadManagedResourceRequest {
    pub resource_type: String,
    pub current_state: TypedValue,
    /// Opaque bytes from the response that produced `current_state`.
    pub private: Vec<u8>,
    pub provider_meta: Option<TypedValue>,
    pub client_capabilities: Option<ClientCapabilities>,
}

#[derive(Debug, Clone)]
pub struct ReadManagedResourceResponse {
    pub(crate) new_state: WireValue,
    pub(crate) private: Vec<u8>,
    pub(crate) deferred: Option<Deferred>,
    pub(crate) diagnostics: Diagnostics,
}

impl ReadManagedResourceResponse {
    /// Null when the remote object no longer exists.
    pub fn new_state(&self) -> &WireValue {
        &self.new_state
    }

    pub fn private(&self) -> &[u8] {
        &self.private
    }

    pub fn deferred(&self) -> Option<&Deferred> {
        self.deferred.as_ref()
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }
}

// ─── Plan ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct PlanManagedResourceChangeRequest {
    pub resource_type: String,
    /// Null when the object is being created.
    pub prior_state: TypedValue,
    /// Null when the object is being destroyed.
    pub proposed_new_state: TypedValue,
    pub config: TypedValue,
    pub prior_private: Vec<u8>,
    pub provider_meta: Option<TypedValue>,
    pub client_capabilities: Option<ClientCapabilities>,
}

#[derive(Debug, Clone)]
pub struct PlanManagedResourceChangeResponse {
    pub(crate) planned_state: WireValue,
    pub(crate) requires_replace: Vec<AttributePath>,
    pub(crate) planned_private: Vec<u8>,
    pub(crate) legacy_type_system: bool,
    pub(crate) deferred: Option<Deferred>,
    pub(crate) diagnostics: Diagnostics,
}

impl PlanManagedResourceChangeResponse {
    pub fn planned_state(&self) -> &WireValue {
        &self.planned_state
    }

    /// Attributes whose change forces the object to be replaced.
    pub fn requires_replace(&self) -> &[AttributePath] {
        &self.requires_replace
    }

    /// Must be passed unchanged to the matching apply request.
    pub fn planned_private(&self) -> &[u8] {
        &self.planned_private
    }

    /// The plugin cannot honor every consistency rule between plan and
    /// apply. Violations should be downgraded to warnings.
    pub fn legacy_type_system(&self) -> bool {
        self.legacy_type_system
    }

    pub fn deferred(&self) -> Option<&Deferred> {
        self.deferred.as_ref()
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }
}

// ─── Apply ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ApplyManagedResourceChangeRequest {
    pub resource_type: String,
    pub prior_state: TypedValue,
    pub planned_state: TypedValue,
    pub config: TypedValue,
    pub planned_private: Vec<u8>,
    pub provider_meta: Option<TypedValue>,
}

#[derive(Debug, Clone)]
pub struct ApplyManagedResourceChangeResponse {
    pub(crate) new_state: WireValue,
    pub(crate) private: Vec<u8>,
    pub(crate) legacy_type_system: bool,
    pub(crate) diagnostics: Diagnostics,
}

impl ApplyManagedResourceChangeResponse {
    pub fn new_state(&self) -> &WireValue {
        &self.new_state
    }

    pub fn private(&self) -> &[u8] {
        &self.private
    }

    pub fn legacy_type_system(&self) -> bool {
        self.legacy_type_system
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }
}

// ─── Import ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ImportManagedResourceStateRequest {
    pub resource_type: String,
    /// Plugin-defined identifier of the remote object.
    pub id: String,
    pub client_capabilities: Option<ClientCapabilities>,
}

/// One object produced by an import. A single import may yield several
/// objects of different resource types.
#[derive(Debug, Clone)]
pub struct ImportedManagedResource {
    pub(crate) resource_type: String,
    pub(crate) state: WireValue,
    pub(crate) private: Vec<u8>,
}

impl ImportedManagedResource {
    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    pub fn state(&self) -> &WireValue {
        &self.state
    }

    pub fn private(&self) -> &[u8] {
        &self.private
    }
}

#[derive(Debug, Clone)]
pub struct ImportManagedResourceStateResponse {
    pub(crate) imported_resources: Vec<ImportedManagedResource>,
    pub(crate) deferred: Option<Deferred>,
    pub(crate) diagnostics: Diagnostics,
}

impl ImportManagedResourceStateResponse {
    pub fn imported_resources(&self) -> &[ImportedManagedResource] {
        &self.imported_resources
    }

    pub fn deferred(&self) -> Option<&Deferred> {
        self.deferred.as_ref()
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }
}

// ─── Move ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct MoveManagedResourceStateRequest {
    /// Fully-qualified address of the provider that owns the source type.
    pub source_provider_address: String,
    pub source_resource_type: String,
    pub source_schema_version: i64,
    pub source_state: RawState,
    pub source_private: Vec<u8>,
    pub target_resource_type: String,
}

#[derive(Debug, Clone)]
pub struct MoveManagedResourceStateResponse {
    pub(crate) target_state: WireValue,
    pub(crate) target_private: Vec<u8>,
    pub(crate) diagnostics: Diagnostics,
}

impl MoveManagedResourceStateResponse {
    pub fn target_state(&self) -> &WireValue {
        &self.target_state
    }

    pub fn target_private(&self) -> &[u8] {
        &self.target_private
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }
}
