//! The provider client: one façade over both plugin protocol versions.

#[macro_use]
mod convert;
#[macro_use]
mod rpc;

pub mod launch;
mod lifecycle;
pub mod tfplugin5;
pub mod tfplugin6;
mod v5;
mod v6;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::context::CallContext;
use crate::error::{Error, Result};
use crate::ops::*;
use launch::{GrpcPluginLauncher, NegotiatedPlugin, PluginLauncher, PluginProcess};
pub use lifecycle::LifecycleState;
use lifecycle::Lifecycle;

/// Major version of the plugin protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolVersion {
    V5,
    V6,
}

impl ProtocolVersion {
    pub fn major(self) -> u32 {
        match self {
            ProtocolVersion::V5 => 5,
            ProtocolVersion::V6 => 6,
        }
    }

    pub fn from_major(major: u32) -> Option<Self> {
        match major {
            5 => Some(ProtocolVersion::V5),
            6 => Some(ProtocolVersion::V6),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.major())
    }
}

/// The negotiated gRPC client, for protocol features the façade does not
/// cover. Requests sent through it bypass lifecycle checks.
#[derive(Clone)]
pub enum RawClient {
    V5(Arc<dyn tfplugin5::ProviderRpc>),
    V6(Arc<dyn tfplugin6::ProviderRpc>),
}

impl std::fmt::Debug for RawClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RawClient::V5(_) => f.write_str("RawClient::V5"),
            RawClient::V6(_) => f.write_str("RawClient::V6"),
        }
    }
}

/// The operation set both protocol adapters translate.
#[async_trait]
pub(crate) trait Protocol: Send + Sync {
    async fn get_provider_schema(&self, cx: &CallContext) -> Result<GetProviderSchemaResponse>;
    async fn get_functions(&self, cx: &CallContext) -> Result<GetFunctionsResponse>;
    async fn validate_provider_config(
        &self,
        cx: &CallContext,
        req: &ValidateProviderConfigRequest,
    ) -> Result<ValidateProviderConfigResponse>;
    async fn configure_provider(
        &self,
        cx: &CallContext,
        req: &ConfigureProviderRequest,
    ) -> Result<ConfigureProviderResponse>;
    async fn validate_managed_resource_config(
        &self,
        cx: &CallContext,
        req: &ValidateManagedResourceConfigRequest,
    ) -> Result<ValidateManagedResourceConfigResponse>;
    async fn upgrade_managed_resource_state(
        &self,
        cx: &CallContext,
        req: &UpgradeManagedResourceStateRequest,
    ) -> Result<UpgradeManagedResourceStateResponse>;
    async fn read_managed_resource(
        &self,
        cx: &CallContext,
        req: &ReadManagedResourceRequest,
    ) -> Result<ReadManagedResourceResponse>;
    async fn plan_managed_resource_change(
        &self,
        cx: &CallContext,
        req: &PlanManagedResourceChangeRequest,
    ) -> Result<PlanManagedResourceChangeResponse>;
    async fn apply_managed_resource_change(
        &self,
        cx: &CallContext,
        req: &ApplyManagedResourceChangeRequest,
    ) -> Result<ApplyManagedResourceChangeResponse>;
    async fn import_managed_resource_state(
        &self,
        cx: &CallContext,
        req: &ImportManagedResourceStateRequest,
    ) -> Result<ImportManagedResourceStateResponse>;
    async fn move_managed_resource_state(
        &self,
        cx: &CallContext,
        req: &MoveManagedResourceStateRequest,
    ) -> Result<MoveManagedResourceStateResponse>;
    async fn validate_data_resource_config(
        &self,
        cx: &CallContext,
        req: &ValidateDataResourceConfigRequest,
    ) -> Result<ValidateDataResourceConfigResponse>;
    async fn read_data_resource(
        &self,
        cx: &CallContext,
        req: &ReadDataResourceRequest,
    ) -> Result<ReadDataResourceResponse>;
    async fn validate_ephemeral_resource_config(
        &self,
        cx: &CallContext,
        req: &ValidateEphemeralResourceConfigRequest,
    ) -> Result<ValidateEphemeralResourceConfigResponse>;
    async fn open_ephemeral_resource(
        &self,
        cx: &CallContext,
        req: &OpenEphemeralResourceRequest,
    ) -> Result<OpenEphemeralResourceResponse>;
    async fn renew_ephemeral_resource(
        &self,
        cx: &CallContext,
        req: &RenewEphemeralResourceRequest,
    ) -> Result<RenewEphemeralResourceResponse>;
    async fn close_ephemeral_resource(
        &self,
        cx: &CallContext,
        req: &CloseEphemeralResourceRequest,
    ) -> Result<CloseEphemeralResourceResponse>;
    async fn call_function(
        &self,
        cx: &CallContext,
        req: &CallFunctionRequest,
    ) -> Result<CallFunctionResponse>;
    async fn stop(&self, cx: &CallContext) -> Result<()>;
}

/// Exactly one adapter per supported protocol version.
enum Adapter {
    V5(v5::V5Adapter),
    V6(v6::V6Adapter),
}

impl Adapter {
    fn protocol(&self) -> &dyn Protocol {
        match self {
            Adapter::V5(adapter) => adapter,
            Adapter::V6(adapter) => adapter,
        }
    }
}

/// A connection to one provider plugin.
///
/// Every operation takes a [`CallContext`]; cancelling it or letting its
/// timeout expire unblocks the call without waiting on the plugin.
/// Operations may run concurrently. Calls in flight when [`Provider::close`]
/// runs have unspecified outcomes.
///
/// Error diagnostics are returned as response data, not as `Err`: check
/// `diagnostics().has_errors()` before using any other part of a response.
pub struct Provider {
    adapter: Adapter,
    lifecycle: Lifecycle,
    process: Mutex<Option<Box<dyn PluginProcess>>>,
    transport: Option<CancellationToken>,
}

impl Drop for Provider {
    fn drop(&mut self) {
        if let Some(transport) = &self.transport {
            transport.cancel();
        }
    }
}

impl std::fmt::Debug for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provider")
            .field("protocol_version", &self.protocol_version())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Provider {
    /// Start a plugin executable with the default launcher settings.
    pub async fn launch(executable: impl AsRef<Path>, args: &[String]) -> Result<Self> {
        Self::launch_with(&GrpcPluginLauncher::default(), executable, args).await
    }

    pub async fn launch_with(
        launcher: &dyn PluginLauncher,
        executable: impl AsRef<Path>,
        args: &[String],
    ) -> Result<Self> {
        let negotiated = launcher.start(executable.as_ref(), args).await?;
        Ok(Self::from_negotiated(negotiated))
    }

    /// Wrap an already-negotiated connection.
    ///
    /// # Panics
    ///
    /// If `negotiated.protocol_version` is not 5 or 6, or `negotiated.client`
    /// is not the client type for that version. Launchers only offer
    /// versions this crate handles, so either is a launcher bug.
    pub fn from_negotiated(negotiated: NegotiatedPlugin) -> Self {
        let NegotiatedPlugin {
            protocol_version,
            client,
            process,
            transport,
        } = negotiated;
        let adapter = match ProtocolVersion::from_major(protocol_version) {
            Some(ProtocolVersion::V5) => match client.downcast::<Arc<dyn tfplugin5::ProviderRpc>>() {
                Ok(client) => Adapter::V5(v5::V5Adapter::new(*client)),
                Err(_) => panic!("launcher negotiated protocol 5 with a non-tfplugin5 client"),
            },
            Some(ProtocolVersion::V6) => match client.downcast::<Arc<dyn tfplugin6::ProviderRpc>>() {
                Ok(client) => Adapter::V6(v6::V6Adapter::new(*client)),
                Err(_) => panic!("launcher negotiated protocol 6 with a non-tfplugin6 client"),
            },
            None => panic!("launcher negotiated unsupported protocol version {protocol_version}"),
        };
        info!(protocol = protocol_version, "provider ready");
        Self {
            adapter,
            lifecycle: Lifecycle::default(),
            process: Mutex::new(process),
            transport,
        }
    }

    pub fn protocol_version(&self) -> ProtocolVersion {
        match self.adapter {
            Adapter::V5(_) => ProtocolVersion::V5,
            Adapter::V6(_) => ProtocolVersion::V6,
        }
    }

    pub fn protocol_major_version(&self) -> u32 {
        self.protocol_version().major()
    }

    pub fn raw_client(&self) -> RawClient {
        match &self.adapter {
            Adapter::V5(adapter) => RawClient::V5(adapter.client()),
            Adapter::V6(adapter) => RawClient::V6(adapter.client()),
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    fn protocol(&self) -> &dyn Protocol {
        self.adapter.protocol()
    }

    // ─── Provider ────────────────────────────────────────────────────────

    pub async fn get_provider_schema(&self, cx: &CallContext) -> Result<GetProviderSchemaResponse> {
        self.lifecycle.ensure_open()?;
        debug!(operation = "GetProviderSchema", "calling provider");
        let resp = self.protocol().get_provider_schema(cx).await?;
        self.lifecycle.schema_retrieved();
        Ok(resp)
    }

    pub async fn get_functions(&self, cx: &CallContext) -> Result<GetFunctionsResponse> {
        self.lifecycle.ensure_open()?;
        debug!(operation = "GetFunctions", "calling provider");
        self.protocol().get_functions(cx).await
    }

    pub async fn validate_provider_config(
        &self,
        cx: &CallContext,
        req: &ValidateProviderConfigRequest,
    ) -> Result<ValidateProviderConfigResponse> {
        self.lifecycle.ensure_open()?;
        self.lifecycle.note_typed_operation("ValidateProviderConfig");
        debug!(operation = "ValidateProviderConfig", "calling provider");
        self.protocol().validate_provider_config(cx, req).await
    }

    /// Accepted once. A response with error diagnostics leaves the provider
    /// unconfigured, and so does a failed or cancelled call.
    pub async fn configure_provider(
        &self,
        cx: &CallContext,
        req: &ConfigureProviderRequest,
    ) -> Result<ConfigureProviderResponse> {
        let guard = self.lifecycle.begin_configure()?;
        self.lifecycle.note_typed_operation("ConfigureProvider");
        debug!(operation = "ConfigureProvider", "calling provider");
        let resp = self.protocol().configure_provider(cx, req).await?;
        if !resp.diagnostics().has_errors() {
            guard.succeeded();
            info!("provider configured");
        }
        Ok(resp)
    }

    /// Ask the plugin to abandon in-flight operations. The plugin may take
    /// arbitrarily long to comply, or ignore the request.
    pub async fn graceful_stop(&self, cx: &CallContext) -> Result<()> {
        self.lifecycle.ensure_open()?;
        info!("requesting provider stop");
        self.protocol().stop(cx).await
    }

    /// Shut down the connection and the plugin process. Calling it again is
    /// a no-op; every other operation fails with [`Error::Closed`] afterwards.
    pub async fn close(&self) -> Result<()> {
        if !self.lifecycle.close() {
            return Ok(());
        }
        info!("closing provider");
        if let Some(transport) = &self.transport {
            transport.cancel();
        }
        let process = self.process.lock().await.take();
        if let Some(mut process) = process {
            process.kill().await.map_err(Error::Terminate)?;
        }
        Ok(())
    }

    // ─── Managed Resources ───────────────────────────────────────────────

    pub async fn validate_managed_resource_config(
        &self,
        cx: &CallContext,
        req: &ValidateManagedResourceConfigRequest,
    ) -> Result<ValidateManagedResourceConfigResponse> {
        self.lifecycle.ensure_open()?;
        self.lifecycle.note_typed_operation("ValidateResourceConfig");
        debug!(operation = "ValidateResourceConfig", resource_type = %req.resource_type, "calling provider");
        self.protocol().validate_managed_resource_config(cx, req).await
    }

    /// Required for every stored state before it is read, planned or
    /// applied, whether or not its schema version changed.
    pub async fn upgrade_managed_resource_state(
        &self,
        cx: &CallContext,
        req: &UpgradeManagedResourceStateRequest,
    ) -> Result<UpgradeManagedResourceStateResponse> {
        self.lifecycle.ensure_configured("UpgradeResourceState")?;
        self.lifecycle.note_typed_operation("UpgradeResourceState");
        debug!(operation = "UpgradeResourceState", resource_type = %req.resource_type, version = req.schema_version, "calling provider");
        self.protocol().upgrade_managed_resource_state(cx, req).await
    }

    pub async fn read_managed_resource(
        &self,
        cx: &CallContext,
        req: &ReadManagedResourceRequest,
    ) -> Result<ReadManagedResourceResponse> {
        self.lifecycle.ensure_configured("ReadResource")?;
        self.lifecycle.note_typed_operation("ReadResource");
        debug!(operation = "ReadResource", resource_type = %req.resource_type, "calling provider");
        let resp = self.protocol().read_managed_resource(cx, req).await?;
        Lifecycle::check_deferral(
            "ReadResource",
            req.client_capabilities.as_ref(),
            resp.deferred(),
        )?;
        Ok(resp)
    }

    pub async fn plan_managed_resource_change(
        &self,
        cx: &CallContext,
        req: &PlanManagedResourceChangeRequest,
    ) -> Result<PlanManagedResourceChangeResponse> {
        self.lifecycle.ensure_configured("PlanResourceChange")?;
        self.lifecycle.note_typed_operation("PlanResourceChange");
        debug!(operation = "PlanResourceChange", resource_type = %req.resource_type, "calling provider");
        let resp = self.protocol().plan_managed_resource_change(cx, req).await?;
        Lifecycle::check_deferral(
            "PlanResourceChange",
            req.client_capabilities.as_ref(),
            resp.deferred(),
        )?;
        Ok(resp)
    }

    /// `req.planned_private` must be the bytes the matching plan returned.
    pub async fn apply_managed_resource_change(
        &self,
        cx: &CallContext,
        req: &ApplyManagedResourceChangeRequest,
    ) -> Result<ApplyManagedResourceChangeResponse> {
        self.lifecycle.ensure_configured("ApplyResourceChange")?;
        self.lifecycle.note_typed_operation("ApplyResourceChange");
        debug!(operation = "ApplyResourceChange", resource_type = %req.resource_type, "calling provider");
        self.protocol().apply_managed_resource_change(cx, req).await
    }

    pub async fn import_managed_resource_state(
        &self,
        cx: &CallContext,
        req: &ImportManagedResourceStateRequest,
    ) -> Result<ImportManagedResourceStateResponse> {
        self.lifecycle.ensure_configured("ImportResourceState")?;
        self.lifecycle.note_typed_operation("ImportResourceState");
        debug!(operation = "ImportResourceState", resource_type = %req.resource_type, id = %req.id, "calling provider");
        let resp = self.protocol().import_managed_resource_state(cx, req).await?;
        Lifecycle::check_deferral(
            "ImportResourceState",
            req.client_capabilities.as_ref(),
            resp.deferred(),
        )?;
        Ok(resp)
    }

    pub async fn move_managed_resource_state(
        &self,
        cx: &CallContext,
        req: &MoveManagedResourceStateRequest,
    ) -> Result<MoveManagedResourceStateResponse> {
        self.lifecycle.ensure_configured("MoveResourceState")?;
        self.lifecycle.note_typed_operation("MoveResourceState");
        debug!(
            operation = "MoveResourceState",
            source = %req.source_resource_type,
            target = %req.target_resource_type,
            "calling provider"
        );
        self.protocol().move_managed_resource_state(cx, req).await
    }

    // ─── Data Resources ──────────────────────────────────────────────────

    pub async fn validate_data_resource_config(
        &self,
        cx: &CallContext,
        req: &ValidateDataResourceConfigRequest,
    ) -> Result<ValidateDataResourceConfigResponse> {
        self.lifecycle.ensure_open()?;
        self.lifecycle.note_typed_operation("ValidateDataResourceConfig");
        debug!(operation = "ValidateDataResourceConfig", resource_type = %req.resource_type, "calling provider");
        self.protocol().validate_data_resource_config(cx, req).await
    }

    pub async fn read_data_resource(
        &self,
        cx: &CallContext,
        req: &ReadDataResourceRequest,
    ) -> Result<ReadDataResourceResponse> {
        self.lifecycle.ensure_configured("ReadDataSource")?;
        self.lifecycle.note_typed_operation("ReadDataSource");
        debug!(operation = "ReadDataSource", resource_type = %req.resource_type, "calling provider");
        let resp = self.protocol().read_data_resource(cx, req).await?;
        Lifecycle::check_deferral(
            "ReadDataSource",
            req.client_capabilities.as_ref(),
            resp.deferred(),
        )?;
        Ok(resp)
    }

    // ─── Ephemeral Resources ─────────────────────────────────────────────

    pub async fn validate_ephemeral_resource_config(
        &self,
        cx: &CallContext,
        req: &ValidateEphemeralResourceConfigRequest,
    ) -> Result<ValidateEphemeralResourceConfigResponse> {
        self.lifecycle.ensure_open()?;
        self.lifecycle.note_typed_operation("ValidateEphemeralResourceConfig");
        debug!(operation = "ValidateEphemeralResourceConfig", resource_type = %req.resource_type, "calling provider");
        self.protocol()
            .validate_ephemeral_resource_config(cx, req)
            .await
    }

    pub async fn open_ephemeral_resource(
        &self,
        cx: &CallContext,
        req: &OpenEphemeralResourceRequest,
    ) -> Result<OpenEphemeralResourceResponse> {
        self.lifecycle.ensure_configured("OpenEphemeralResource")?;
        self.lifecycle.note_typed_operation("OpenEphemeralResource");
        debug!(operation = "OpenEphemeralResource", resource_type = %req.resource_type, "calling provider");
        let resp = self.protocol().open_ephemeral_resource(cx, req).await?;
        Lifecycle::check_deferral(
            "OpenEphemeralResource",
            req.client_capabilities.as_ref(),
            resp.deferred(),
        )?;
        Ok(resp)
    }

    pub async fn renew_ephemeral_resource(
        &self,
        cx: &CallContext,
        req: &RenewEphemeralResourceRequest,
    ) -> Result<RenewEphemeralResourceResponse> {
        self.lifecycle.ensure_configured("RenewEphemeralResource")?;
        debug!(operation = "RenewEphemeralResource", resource_type = %req.resource_type, "calling provider");
        self.protocol().renew_ephemeral_resource(cx, req).await
    }

    pub async fn close_ephemeral_resource(
        &self,
        cx: &CallContext,
        req: &CloseEphemeralResourceRequest,
    ) -> Result<CloseEphemeralResourceResponse> {
        self.lifecycle.ensure_configured("CloseEphemeralResource")?;
        debug!(operation = "CloseEphemeralResource", resource_type = %req.resource_type, "calling provider");
        self.protocol().close_ephemeral_resource(cx, req).await
    }

    // ─── Functions ───────────────────────────────────────────────────────

    /// With `req.signature` set, a wrong argument count fails with
    /// [`Error::FunctionArguments`] before anything is sent. Failures the
    /// function itself reports come back in [`CallFunctionResponse::error`].
    pub async fn call_function(
        &self,
        cx: &CallContext,
        req: &CallFunctionRequest,
    ) -> Result<CallFunctionResponse> {
        self.lifecycle.ensure_open()?;
        if let Some(arity) = req.signature {
            if !arity.accepts(req.arguments.len()) {
                return Err(Error::FunctionArguments {
                    function: req.function_name.clone(),
                    arity,
                    given: req.arguments.len(),
                });
            }
        }
        self.lifecycle.note_typed_operation("CallFunction");
        debug!(operation = "CallFunction", function = %req.function_name, "calling provider");
        self.protocol().call_function(cx, req).await
    }
}
