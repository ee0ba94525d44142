/// Optional behaviors a plugin declared support for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServerCapabilities {
    pub(crate) plan_destroy: bool,
    pub(crate) move_resource_state: bool,
    pub(crate) get_provider_schema_optional: bool,
}

impl ServerCapabilities {
    /// Whether the plugin wants a plan request for resources being destroyed.
    pub fn can_plan_destroy(&self) -> bool {
        self.plan_destroy
    }

    /// Reported as declared. This client only sends moves over protocol 6.
    pub fn can_move_managed_resource_state(&self) -> bool {
        self.move_resource_state
    }

    /// Whether the plugin can serve requests before its schema was fetched.
    pub fn get_provider_schema_is_optional(&self) -> bool {
        self.get_provider_schema_optional
    }
}

/// Response shapes the caller is prepared to handle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientCapabilities {
    /// The caller accepts [`Deferred`] responses.
    pub deferral_allowed: bool,
    pub write_only_attributes_allowed: bool,
}

/// Why the plugin could not finish an operation yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredReason {
    Unsupported,
    ResourceConfigUnknown,
    ProviderConfigUnknown,
    AbsentPrerequisite,
}

impl DeferredReason {
    pub(crate) fn from_wire(reason: i32) -> Self {
        match reason {
            1 => Self::ResourceConfigUnknown,
            2 => Self::ProviderConfigUnknown,
            3 => Self::AbsentPrerequisite,
            _ => Self::Unsupported,
        }
    }
}

/// Marks a response as a prediction rather than a final answer. The other
/// fields of a deferred response must not be persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deferred {
    pub(crate) reason: DeferredReason,
}

impl Deferred {
    pub fn reason(&self) -> DeferredReason {
        self.reason
    }
}
