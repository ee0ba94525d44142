//! Protocol 6 adapter.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::tfplugin6 as wire;
use super::tfplugin6::ProviderRpc;
use super::Protocol;
use crate::context::CallContext;
use crate::error::{Error, Result};
use crate::ops::*;
use crate::schema::{FunctionSet, SchemaSet};

wire_conversions!();

fn timestamp(ts: Option<prost_types::Timestamp>) -> Option<DateTime<Utc>> {
    let ts = ts?;
    DateTime::from_timestamp(ts.seconds, u32::try_from(ts.nanos).ok()?)
}

pub(crate) struct V6Adapter {
    client: Arc<dyn ProviderRpc>,
}

impl V6Adapter {
    pub(crate) fn new(client: Arc<dyn ProviderRpc>) -> Self {
        Self { client }
    }

    pub(crate) fn client(&self) -> Arc<dyn ProviderRpc> {
        Arc::clone(&self.client)
    }
}

#[async_trait]
impl Protocol for V6Adapter {
    async fn get_provider_schema(&self, cx: &CallContext) -> Result<GetProviderSchemaResponse> {
        let mut resp = cx
            .run(
                "GetProviderSchema",
                self.client
                    .get_provider_schema(wire::get_provider_schema::Request {}),
            )
            .await?;
        let diags = diagnostics(std::mem::take(&mut resp.diagnostics));
        let caps = resp.server_capabilities.clone().unwrap_or_default();
        Ok(GetProviderSchemaResponse {
            server_capabilities: ServerCapabilities {
                plan_destroy: caps.plan_destroy,
                move_resource_state: caps.move_resource_state,
                get_provider_schema_optional: caps.get_provider_schema_optional,
            },
            schemas: SchemaSet::V6(resp),
            diagnostics: diags,
        })
    }

    async fn get_functions(&self, cx: &CallContext) -> Result<GetFunctionsResponse> {
        let resp = cx
            .run(
                "GetFunctions",
                self.client.get_functions(wire::get_functions::Request {}),
            )
            .await?;
        Ok(GetFunctionsResponse {
            functions: FunctionSet::V6(resp.functions),
            diagnostics: diagnostics(resp.diagnostics),
        })
    }

    async fn validate_provider_config(
        &self,
        cx: &CallContext,
        req: &ValidateProviderConfigRequest,
    ) -> Result<ValidateProviderConfigResponse> {
        let request = wire::validate_provider_config::Request {
            config: Some(dynamic("config", &req.config)?),
        };
        let resp = cx
            .run(
                "ValidateProviderConfig",
                self.client.validate_provider_config(request),
            )
            .await?;
        Ok(ValidateProviderConfigResponse {
            diagnostics: diagnostics(resp.diagnostics),
        })
    }

    async fn configure_provider(
        &self,
        cx: &CallContext,
        req: &ConfigureProviderRequest,
    ) -> Result<ConfigureProviderResponse> {
        let request = wire::configure_provider::Request {
            terraform_version: req.terraform_version.clone(),
            config: Some(dynamic("config", &req.config)?),
            client_capabilities: client_capabilities(req.client_capabilities.as_ref()),
        };
        let resp = cx
            .run("ConfigureProvider", self.client.configure_provider(request))
            .await?;
        Ok(ConfigureProviderResponse {
            diagnostics: diagnostics(resp.diagnostics),
        })
    }

    async fn validate_managed_resource_config(
        &self,
        cx: &CallContext,
        req: &ValidateManagedResourceConfigRequest,
    ) -> Result<ValidateManagedResourceConfigResponse> {
        let request = wire::validate_resource_config::Request {
            type_name: req.resource_type.clone(),
            config: Some(dynamic("config", &req.config)?),
            client_capabilities: client_capabilities(req.client_capabilities.as_ref()),
        };
        let resp = cx
            .run(
                "ValidateResourceConfig",
                self.client.validate_resource_config(request),
            )
            .await?;
        Ok(ValidateManagedResourceConfigResponse {
            diagnostics: diagnostics(resp.diagnostics),
        })
    }

    async fn upgrade_managed_resource_state(
        &self,
        cx: &CallContext,
        req: &UpgradeManagedResourceStateRequest,
    ) -> Result<UpgradeManagedResourceStateResponse> {
        let request = wire::upgrade_resource_state::Request {
            type_name: req.resource_type.clone(),
            version: req.schema_version,
            raw_state: Some(raw_state(&req.raw_state)),
        };
        let resp = cx
            .run(
                "UpgradeResourceState",
                self.client.upgrade_resource_state(request),
            )
            .await?;
        Ok(UpgradeManagedResourceStateResponse {
            upgraded_state: wire_value(resp.upgraded_state),
            diagnostics: diagnostics(resp.diagnostics),
        })
    }

    async fn read_managed_resource(
        &self,
        cx: &CallContext,
        req: &ReadManagedResourceRequest,
    ) -> Result<ReadManagedResourceResponse> {
        let request = wire::read_resource::Request {
            type_name: req.resource_type.clone(),
            current_state: Some(dynamic("current_state", &req.current_state)?),
            private: req.private.clone(),
            provider_meta: dynamic_optional("provider_meta", req.provider_meta.as_ref())?,
            client_capabilities: client_capabilities(req.client_capabilities.as_ref()),
        };
        let resp = cx
            .run("ReadResource", self.client.read_resource(request))
            .await?;
        Ok(ReadManagedResourceResponse {
            new_state: wire_value(resp.new_state),
            private: resp.private,
            deferred: deferred(resp.deferred),
            diagnostics: diagnostics(resp.diagnostics),
        })
    }

    async fn plan_managed_resource_change(
        &self,
        cx: &CallContext,
        req: &PlanManagedResourceChangeRequest,
    ) -> Result<PlanManagedResourceChangeResponse> {
        let request = wire::plan_resource_change::Request {
            type_name: req.resource_type.clone(),
            prior_state: Some(dynamic("prior_state", &req.prior_state)?),
            proposed_new_state: Some(dynamic("proposed_new_state", &req.proposed_new_state)?),
            config: Some(dynamic("config", &req.config)?),
            prior_private: req.prior_private.clone(),
            provider_meta: dynamic_optional("provider_meta", req.provider_meta.as_ref())?,
            client_capabilities: client_capabilities(req.client_capabilities.as_ref()),
        };
        let resp = cx
            .run("PlanResourceChange", self.client.plan_resource_change(request))
            .await?;
        Ok(PlanManagedResourceChangeResponse {
            planned_state: wire_value(resp.planned_state),
            requires_replace: resp.requires_replace.into_iter().map(attribute_path).collect(),
            planned_private: resp.planned_private,
            legacy_type_system: resp.legacy_type_system,
            deferred: deferred(resp.deferred),
            diagnostics: diagnostics(resp.diagnostics),
        })
    }

    async fn apply_managed_resource_change(
        &self,
        cx: &CallContext,
        req: &ApplyManagedResourceChangeRequest,
    ) -> Result<ApplyManagedResourceChangeResponse> {
        let request = wire::apply_resource_change::Request {
            type_name: req.resource_type.clone(),
            prior_state: Some(dynamic("prior_state", &req.prior_state)?),
            planned_state: Some(dynamic("planned_state", &req.planned_state)?),
            config: Some(dynamic("config", &req.config)?),
            planned_private: req.planned_private.clone(),
            provider_meta: dynamic_optional("provider_meta", req.provider_meta.as_ref())?,
        };
        let resp = cx
            .run(
                "ApplyResourceChange",
                self.client.apply_resource_change(request),
            )
            .await?;
        Ok(ApplyManagedResourceChangeResponse {
            new_state: wire_value(resp.new_state),
            private: resp.private,
            legacy_type_system: resp.legacy_type_system,
            diagnostics: diagnostics(resp.diagnostics),
        })
    }

    async fn import_managed_resource_state(
        &self,
        cx: &CallContext,
        req: &ImportManagedResourceStateRequest,
    ) -> Result<ImportManagedResourceStateResponse> {
        let request = wire::import_resource_state::Request {
            type_name: req.resource_type.clone(),
            id: req.id.clone(),
            client_capabilities: client_capabilities(req.client_capabilities.as_ref()),
        };
        let resp = cx
            .run(
                "ImportResourceState",
                self.client.import_resource_state(request),
            )
            .await?;
        Ok(ImportManagedResourceStateResponse {
            imported_resources: resp
                .imported_resources
                .into_iter()
                .map(|r| ImportedManagedResource {
                    resource_type: r.type_name,
                    state: wire_value(r.state),
                    private: r.private,
                })
                .collect(),
            deferred: deferred(resp.deferred),
            diagnostics: diagnostics(resp.diagnostics),
        })
    }

    async fn move_managed_resource_state(
        &self,
        cx: &CallContext,
        req: &MoveManagedResourceStateRequest,
    ) -> Result<MoveManagedResourceStateResponse> {
        let request = wire::move_resource_state::Request {
            source_provider_address: req.source_provider_address.clone(),
            source_type_name: req.source_resource_type.clone(),
            source_schema_version: req.source_schema_version,
            source_state: Some(raw_state(&req.source_state)),
            target_type_name: req.target_resource_type.clone(),
            source_private: req.source_private.clone(),
        };
        let resp = cx
            .run("MoveResourceState", self.client.move_resource_state(request))
            .await?;
        Ok(MoveManagedResourceStateResponse {
            target_state: wire_value(resp.target_state),
            target_private: resp.target_private,
            diagnostics: diagnostics(resp.diagnostics),
        })
    }

    async fn validate_data_resource_config(
        &self,
        cx: &CallContext,
        req: &ValidateDataResourceConfigRequest,
    ) -> Result<ValidateDataResourceConfigResponse> {
        let request = wire::validate_data_resource_config::Request {
            type_name: req.resource_type.clone(),
            config: Some(dynamic("config", &req.config)?),
        };
        let resp = cx
            .run(
                "ValidateDataResourceConfig",
                self.client.validate_data_resource_config(request),
            )
            .await?;
        Ok(ValidateDataResourceConfigResponse {
            diagnostics: diagnostics(resp.diagnostics),
        })
    }

    async fn read_data_resource(
        &self,
        cx: &CallContext,
        req: &ReadDataResourceRequest,
    ) -> Result<ReadDataResourceResponse> {
        let request = wire::read_data_source::Request {
            type_name: req.resource_type.clone(),
            config: Some(dynamic("config", &req.config)?),
            provider_meta: dynamic_optional("provider_meta", req.provider_meta.as_ref())?,
            client_capabilities: client_capabilities(req.client_capabilities.as_ref()),
        };
        let resp = cx
            .run("ReadDataSource", self.client.read_data_source(request))
            .await?;
        Ok(ReadDataResourceResponse {
            state: wire_value(resp.state),
            deferred: deferred(resp.deferred),
            diagnostics: diagnostics(resp.diagnostics),
        })
    }

    async fn validate_ephemeral_resource_config(
        &self,
        cx: &CallContext,
        req: &ValidateEphemeralResourceConfigRequest,
    ) -> Result<ValidateEphemeralResourceConfigResponse> {
        let request = wire::validate_ephemeral_resource_config::Request {
            type_name: req.resource_type.clone(),
            config: Some(dynamic("config", &req.config)?),
        };
        let resp = cx
            .run(
                "ValidateEphemeralResourceConfig",
                self.client.validate_ephemeral_resource_config(request),
            )
            .await?;
        Ok(ValidateEphemeralResourceConfigResponse {
            diagnostics: diagnostics(resp.diagnostics),
        })
    }

    async fn open_ephemeral_resource(
        &self,
        cx: &CallContext,
        req: &OpenEphemeralResourceRequest,
    ) -> Result<OpenEphemeralResourceResponse> {
        let request = wire::open_ephemeral_resource::Request {
            type_name: req.resource_type.clone(),
            config: Some(dynamic("config", &req.config)?),
            client_capabilities: client_capabilities(req.client_capabilities.as_ref()),
        };
        let resp = cx
            .run(
                "OpenEphemeralResource",
                self.client.open_ephemeral_resource(request),
            )
            .await?;
        Ok(OpenEphemeralResourceResponse {
            result: wire_value(resp.result),
            private: resp.private,
            renew_at: timestamp(resp.renew_at),
            deferred: deferred(resp.deferred),
            diagnostics: diagnostics(resp.diagnostics),
        })
    }

    async fn renew_ephemeral_resource(
        &self,
        cx: &CallContext,
        req: &RenewEphemeralResourceRequest,
    ) -> Result<RenewEphemeralResourceResponse> {
        let request = wire::renew_ephemeral_resource::Request {
            type_name: req.resource_type.clone(),
            private: req.private.clone(),
        };
        let resp = cx
            .run(
                "RenewEphemeralResource",
                self.client.renew_ephemeral_resource(request),
            )
            .await?;
        Ok(RenewEphemeralResourceResponse {
            private: resp.private,
            renew_at: timestamp(resp.renew_at),
            diagnostics: diagnostics(resp.diagnostics),
        })
    }

    async fn close_ephemeral_resource(
        &self,
        cx: &CallContext,
        req: &CloseEphemeralResourceRequest,
    ) -> Result<CloseEphemeralResourceResponse> {
        let request = wire::close_ephemeral_resource::Request {
            type_name: req.resource_type.clone(),
            private: req.private.clone(),
        };
        let resp = cx
            .run(
                "CloseEphemeralResource",
                self.client.close_ephemeral_resource(request),
            )
            .await?;
        Ok(CloseEphemeralResourceResponse {
            diagnostics: diagnostics(resp.diagnostics),
        })
    }

    async fn call_function(
        &self,
        cx: &CallContext,
        req: &CallFunctionRequest,
    ) -> Result<CallFunctionResponse> {
        let request = wire::call_function::Request {
            name: req.function_name.clone(),
            arguments: arguments(&req.function_name, &req.arguments)?,
        };
        let resp = cx
            .run("CallFunction", self.client.call_function(request))
            .await?;
        Ok(CallFunctionResponse {
            result: wire_value(resp.result),
            error: resp.error.map(function_error),
        })
    }

    async fn stop(&self, cx: &CallContext) -> Result<()> {
        let resp = cx
            .run(
                "StopProvider",
                self.client.stop_provider(wire::stop_provider::Request {}),
            )
            .await?;
        if resp.error.is_empty() {
            Ok(())
        } else {
            Err(Error::Stop(resp.error))
        }
    }
}
