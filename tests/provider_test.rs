mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio_test::{assert_err, assert_ok};
use tokio_util::sync::CancellationToken;

use oxid_provider::ops::*;
use oxid_provider::provider::launch::NegotiatedPlugin;
use oxid_provider::provider::tfplugin6::{self, ProviderRpc as _};
use oxid_provider::schema::{AttributeUsage, FunctionArity, NestingMode};
use oxid_provider::{
    CallContext, Error, LifecycleState, Provider, ProtocolVersion, RawClient, RawState, Type,
    TypedValue, Value, WireEncoding,
};

use common::*;

fn plan_request(caps: Option<ClientCapabilities>) -> PlanManagedResourceChangeRequest {
    PlanManagedResourceChangeRequest {
        resource_type: "stub_thing".to_string(),
        prior_state: TypedValue::null(thing_type()),
        proposed_new_state: thing_value("a", 3),
        config: thing_value("a", 3),
        prior_private: Vec::new(),
        provider_meta: None,
        client_capabilities: caps,
    }
}

fn read_request(caps: Option<ClientCapabilities>) -> ReadManagedResourceRequest {
    ReadManagedResourceRequest {
        resource_type: "stub_thing".to_string(),
        current_state: thing_value("a", 3),
        private: b"read-private".to_vec(),
        provider_meta: None,
        client_capabilities: caps,
    }
}

// ─── Negotiation ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_negotiated_version_exposed() {
    let v6 = launch_v6(StubV6::default()).await;
    assert_eq!(v6.protocol_version(), ProtocolVersion::V6);
    assert_eq!(v6.protocol_major_version(), 6);
    assert!(matches!(v6.raw_client(), RawClient::V6(_)));
    assert_eq!(v6.state(), LifecycleState::Unconfigured);

    let v5 = launch_v5(StubV5::default()).await;
    assert_eq!(v5.protocol_version(), ProtocolVersion::V5);
    assert!(matches!(v5.raw_client(), RawClient::V5(_)));
}

#[tokio::test]
async fn test_raw_client_reaches_plugin() {
    let stub = StubV6::default();
    let stops = stub.stop_calls.clone();
    let provider = launch_v6(stub).await;

    let RawClient::V6(client) = provider.raw_client() else {
        panic!("expected a protocol 6 client");
    };
    assert_ok!(
        client
            .stop_provider(tfplugin6::stop_provider::Request {})
            .await
    );
    assert_eq!(stops.load(Ordering::SeqCst), 1);
}

#[test]
#[should_panic(expected = "non-tfplugin5 client")]
fn test_mismatched_client_panics() {
    let mut plugin = NegotiatedPlugin::v6(Arc::new(StubV6::default()));
    plugin.protocol_version = 5;
    let _ = Provider::from_negotiated(plugin);
}

// ─── Schema ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_v6_schema_flat_attribute() {
    let provider = launch_v6(StubV6::default()).await;
    let resp = provider
        .get_provider_schema(&CallContext::new())
        .await
        .unwrap();
    let schema = resp.provider_schema();

    let thing = schema.managed_resource_type_schema("stub_thing").unwrap();
    assert_eq!(thing.version(), 1);
    let block = thing.block();
    assert!(block.duplicate_names().is_empty());

    let settings = block.attribute("settings").unwrap();
    assert!(settings.nested_type().is_none());
    let constraint = settings.type_constraint().unwrap();
    assert_eq!(constraint.ty().unwrap(), Type::map(Type::String));
    assert_eq!(settings.usage(), AttributeUsage::Optional);

    let id = block.attribute("id").unwrap();
    assert_eq!(id.usage(), AttributeUsage::Computed);

    assert!(schema.provider_config_schema().is_some());
    assert!(schema.provider_meta_schema().is_none());
    assert!(schema.data_resource_type_schemas().next().is_none());
    assert!(schema.ephemeral_resource_type_schema("stub_token").is_some());

    let caps = resp.server_capabilities();
    assert!(caps.can_plan_destroy());
    assert!(caps.can_move_managed_resource_state());
    assert!(!caps.get_provider_schema_is_optional());
}

#[tokio::test]
async fn test_v6_schema_nested_attribute() {
    let provider = launch_v6(StubV6 {
        nested_settings: true,
        ..Default::default()
    })
    .await;
    let resp = provider
        .get_provider_schema(&CallContext::new())
        .await
        .unwrap();
    let schema = resp.provider_schema();
    let block = schema
        .managed_resource_type_schema("stub_thing")
        .unwrap()
        .block();

    let settings = block.attribute("settings").unwrap();
    assert!(settings.type_constraint().is_none());
    let nested = settings.nested_type().unwrap();
    assert_eq!(nested.nesting(), NestingMode::Single);
    assert_eq!(
        nested.attribute("mode").unwrap().usage(),
        AttributeUsage::Required
    );
    assert_eq!(
        settings.implied_type().unwrap(),
        Type::object([("mode", Type::String)])
    );
}

#[tokio::test]
async fn test_v5_schema_capabilities() {
    let provider = launch_v5(StubV5::default()).await;
    let resp = provider
        .get_provider_schema(&CallContext::new())
        .await
        .unwrap();
    let schema = resp.provider_schema();

    let thing = schema.managed_resource_type_schema("stub_thing").unwrap();
    assert_eq!(thing.version(), 3);
    let settings = thing.block().attribute("settings").unwrap();
    assert!(settings.nested_type().is_none());
    assert!(!settings.is_write_only());
    assert!(schema.provider_config_schema().is_none());

    let token = schema.ephemeral_resource_type_schema("stub_token").unwrap();
    assert_eq!(
        token.block().attribute("ttl").unwrap().implied_type().unwrap(),
        Type::Number
    );
    assert_eq!(schema.ephemeral_resource_type_schemas().count(), 1);

    let caps = resp.server_capabilities();
    assert!(caps.can_plan_destroy());
    assert!(caps.can_move_managed_resource_state());
    assert!(caps.get_provider_schema_is_optional());
}

#[tokio::test]
async fn test_v5_validate_ephemeral_config() {
    let provider = launch_v5(StubV5::default()).await;
    let token_type = Type::object([("ttl", Type::Number)]);
    let validate = |ttl: i64| ValidateEphemeralResourceConfigRequest {
        resource_type: "stub_token".to_string(),
        config: TypedValue::new(Value::object([("ttl", Value::from(ttl))]), token_type.clone()),
    };

    let resp = provider
        .validate_ephemeral_resource_config(&CallContext::new(), &validate(60))
        .await
        .unwrap();
    assert!(resp.diagnostics().is_empty());

    let resp = provider
        .validate_ephemeral_resource_config(&CallContext::new(), &validate(0))
        .await
        .unwrap();
    let error = resp.diagnostics().errors().next().unwrap();
    assert_eq!(error.summary(), "stub_token ttl must be positive");
}

#[tokio::test]
async fn test_function_signatures() {
    let provider = launch_v6(StubV6::default()).await;
    let resp = provider.get_functions(&CallContext::new()).await.unwrap();
    assert!(resp.diagnostics().is_empty());

    let parse = resp.function_signature("parse").unwrap();
    assert_eq!(parse.arity(), FunctionArity::new(2, true));
    let names: Vec<&str> = parse.parameters().map(|p| p.name()).collect();
    assert_eq!(names, ["input", "format"]);
    assert_eq!(parse.variadic_parameter().unwrap().name(), "options");
    assert_eq!(
        parse.result_type().unwrap().ty().unwrap(),
        Type::String
    );
    assert!(parse.deprecation_message().is_none());
    assert!(resp.function_signature("missing").is_none());
}

// ─── Lifecycle ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_operations_require_configure() {
    let provider = launch_v6(StubV6::default()).await;
    let err = assert_err!(
        provider
            .read_managed_resource(&CallContext::new(), &read_request(None))
            .await
    );
    assert!(matches!(
        err,
        Error::NotConfigured {
            operation: "ReadResource"
        }
    ));

    // Validation is allowed before configure.
    let resp = provider
        .validate_provider_config(
            &CallContext::new(),
            &ValidateProviderConfigRequest {
                config: config_value("us-east-1"),
            },
        )
        .await
        .unwrap();
    assert!(!resp.diagnostics().has_errors());
}

#[tokio::test]
async fn test_configure_only_once() {
    let provider = launch_v6(StubV6::default()).await;
    configure(&provider).await;
    assert_eq!(provider.state(), LifecycleState::Configured);

    let err = assert_err!(
        provider
            .configure_provider(&CallContext::new(), &configure_request())
            .await
    );
    assert!(matches!(err, Error::AlreadyConfigured));
}

#[tokio::test]
async fn test_failed_configure_stays_unconfigured() {
    let provider = launch_v6(StubV6 {
        configure_fails: true,
        ..Default::default()
    })
    .await;

    let resp = provider
        .configure_provider(&CallContext::new(), &configure_request())
        .await
        .unwrap();
    assert!(resp.diagnostics().has_errors());
    let first = resp.diagnostics().errors().next().unwrap();
    assert_eq!(first.summary(), "invalid credentials");
    assert_eq!(first.severity(), DiagnosticSeverity::Error);

    assert_eq!(provider.state(), LifecycleState::Unconfigured);
    assert!(matches!(
        provider
            .plan_managed_resource_change(&CallContext::new(), &plan_request(None))
            .await,
        Err(Error::NotConfigured { .. })
    ));
}

#[tokio::test]
async fn test_close_is_idempotent() {
    let process = StubProcess::default();
    let kills = process.kills.clone();
    let plugin =
        NegotiatedPlugin::v6(Arc::new(StubV6::default())).with_process(Box::new(process));
    let provider = launch(plugin).await;
    configure(&provider).await;

    assert_ok!(provider.close().await);
    assert_ok!(provider.close().await);
    assert_eq!(kills.load(Ordering::SeqCst), 1);
    assert_eq!(provider.state(), LifecycleState::Closed);

    assert!(matches!(
        provider.get_provider_schema(&CallContext::new()).await,
        Err(Error::Closed)
    ));
    assert!(matches!(
        provider
            .read_managed_resource(&CallContext::new(), &read_request(None))
            .await,
        Err(Error::Closed)
    ));
    assert!(matches!(
        provider
            .configure_provider(&CallContext::new(), &configure_request())
            .await,
        Err(Error::Closed)
    ));
}

#[tokio::test]
async fn test_close_stops_transport() {
    let transport = CancellationToken::new();
    let plugin = NegotiatedPlugin::v6(Arc::new(StubV6::default()))
        .with_process(Box::new(StubProcess::default()))
        .with_transport(transport.clone());
    let provider = launch(plugin).await;
    assert!(!transport.is_cancelled());

    assert_ok!(provider.close().await);
    assert!(transport.is_cancelled());
}

#[tokio::test]
async fn test_drop_stops_transport() {
    let transport = CancellationToken::new();
    let provider = launch(
        NegotiatedPlugin::v5(Arc::new(StubV5::default())).with_transport(transport.clone()),
    )
    .await;
    drop(provider);
    assert!(transport.is_cancelled());
}

#[tokio::test]
async fn test_graceful_stop() {
    let stub = StubV6::default();
    let stops = stub.stop_calls.clone();
    let provider = launch_v6(stub).await;
    assert_ok!(provider.graceful_stop(&CallContext::new()).await);
    assert_eq!(stops.load(Ordering::SeqCst), 1);

    let v5 = launch_v5(StubV5::default()).await;
    let err = assert_err!(v5.graceful_stop(&CallContext::new()).await);
    assert!(matches!(err, Error::Stop(msg) if msg == "already stopping"));
}

// ─── Cancellation ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_cancelled_call() {
    let provider = launch_v6(StubV6 {
        read_hangs: true,
        ..Default::default()
    })
    .await;
    configure(&provider).await;

    let cx = CallContext::new();
    let token = cx.cancellation_token().clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();
    });

    let err = assert_err!(provider.read_managed_resource(&cx, &read_request(None)).await);
    assert!(matches!(
        err,
        Error::Cancelled {
            operation: "ReadResource"
        }
    ));
    assert!(cx.is_cancelled());
}

#[tokio::test]
async fn test_already_cancelled_context() {
    let provider = launch_v6(StubV6::default()).await;
    let cx = CallContext::new();
    cx.cancel();
    assert!(matches!(
        provider.get_provider_schema(&cx).await,
        Err(Error::Cancelled { .. })
    ));
}

#[tokio::test]
async fn test_call_timeout() {
    let provider = launch_v6(StubV6 {
        read_hangs: true,
        ..Default::default()
    })
    .await;
    configure(&provider).await;

    let cx = CallContext::new().with_timeout(Duration::from_millis(50));
    let err = assert_err!(provider.read_managed_resource(&cx, &read_request(None)).await);
    assert!(matches!(err, Error::Timeout { timeout, .. } if timeout == Duration::from_millis(50)));
}

// ─── Managed Resources ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_plan_and_apply_pass_private_through() {
    let stub = StubV6::default();
    let applied = stub.applied_private.clone();
    let provider = launch_v6(stub).await;
    configure(&provider).await;

    let plan = provider
        .plan_managed_resource_change(&CallContext::new(), &plan_request(None))
        .await
        .unwrap();
    assert!(plan.deferred().is_none());
    assert_eq!(plan.planned_private(), PLANNED_PRIVATE);
    assert_eq!(plan.requires_replace().len(), 1);
    assert_eq!(plan.requires_replace()[0].to_string(), "size");
    assert_eq!(
        plan.planned_state().decode(&thing_type()).unwrap(),
        *thing_value("a", 3).value()
    );

    let apply = provider
        .apply_managed_resource_change(
            &CallContext::new(),
            &ApplyManagedResourceChangeRequest {
                resource_type: "stub_thing".to_string(),
                prior_state: TypedValue::null(thing_type()),
                planned_state: thing_value("a", 3),
                config: thing_value("a", 3),
                planned_private: plan.planned_private().to_vec(),
                provider_meta: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(apply.private(), PLANNED_PRIVATE);
    assert_eq!(applied.lock().unwrap().as_slice(), [PLANNED_PRIVATE.to_vec()]);
    assert_eq!(apply.new_state().encoding(), Some(WireEncoding::Msgpack));
}

#[tokio::test]
async fn test_deferred_plan_with_capability() {
    let provider = launch_v6(StubV6 {
        plan_deferred: Some(tfplugin6::deferred::Reason::ResourceConfigUnknown),
        ..Default::default()
    })
    .await;
    configure(&provider).await;

    let plan = provider
        .plan_managed_resource_change(&CallContext::new(), &plan_request(deferral_allowed()))
        .await
        .unwrap();
    assert_eq!(
        plan.deferred().map(|d| d.reason()),
        Some(DeferredReason::ResourceConfigUnknown)
    );
}

#[tokio::test]
async fn test_deferred_plan_without_capability() {
    let provider = launch_v6(StubV6 {
        plan_deferred: Some(tfplugin6::deferred::Reason::AbsentPrereq),
        ..Default::default()
    })
    .await;
    configure(&provider).await;

    let err = assert_err!(
        provider
            .plan_managed_resource_change(&CallContext::new(), &plan_request(None))
            .await
    );
    assert!(matches!(
        err,
        Error::UnexpectedDeferral {
            operation: "PlanResourceChange"
        }
    ));
}

#[tokio::test]
async fn test_read_returns_private() {
    let provider = launch_v6(StubV6::default()).await;
    configure(&provider).await;
    let resp = provider
        .read_managed_resource(&CallContext::new(), &read_request(None))
        .await
        .unwrap();
    assert_eq!(resp.private(), b"read-private");
    assert!(resp.diagnostics().is_empty());
}

#[tokio::test]
async fn test_upgrade_state() {
    let provider = launch_v6(StubV6::default()).await;
    configure(&provider).await;

    let stored = thing_value("a", 7);
    let raw_state = RawState::from_value(stored.value(), &thing_type()).unwrap();
    let resp = provider
        .upgrade_managed_resource_state(
            &CallContext::new(),
            &UpgradeManagedResourceStateRequest {
                resource_type: "stub_thing".to_string(),
                schema_version: 0,
                raw_state,
            },
        )
        .await
        .unwrap();
    assert_eq!(resp.upgraded_state().encoding(), Some(WireEncoding::Json));
    assert_eq!(
        resp.upgraded_state().decode(&thing_type()).unwrap(),
        *stored.value()
    );
}

#[tokio::test]
async fn test_import_state() {
    let provider = launch_v6(StubV6::default()).await;
    configure(&provider).await;
    let resp = provider
        .import_managed_resource_state(
            &CallContext::new(),
            &ImportManagedResourceStateRequest {
                resource_type: "stub_thing".to_string(),
                id: "i-123".to_string(),
                client_capabilities: None,
            },
        )
        .await
        .unwrap();

    let [imported] = resp.imported_resources() else {
        panic!("expected one imported resource");
    };
    assert_eq!(imported.resource_type(), "stub_thing");
    assert_eq!(imported.private(), b"imported");
    assert_eq!(
        imported.state().decode(&thing_type()).unwrap(),
        *thing_value("i-123", 1).value()
    );
}

#[tokio::test]
async fn test_state_operations_note_missing_schema() {
    let (_guard, logs) = capture_logs();
    let provider = launch_v6(StubV6::default()).await;
    configure(&provider).await;

    let raw_state = RawState::from_value(thing_value("a", 7).value(), &thing_type()).unwrap();
    assert_ok!(
        provider
            .upgrade_managed_resource_state(
                &CallContext::new(),
                &UpgradeManagedResourceStateRequest {
                    resource_type: "stub_thing".to_string(),
                    schema_version: 0,
                    raw_state,
                },
            )
            .await
    );
    assert_ok!(
        provider
            .import_managed_resource_state(
                &CallContext::new(),
                &ImportManagedResourceStateRequest {
                    resource_type: "stub_thing".to_string(),
                    id: "i-123".to_string(),
                    client_capabilities: None,
                },
            )
            .await
    );

    let logs = logs.contents();
    let noted: Vec<&str> = logs
        .lines()
        .filter(|line| line.contains("before the provider schema was retrieved"))
        .collect();
    assert_eq!(noted.len(), 3, "{logs}");
    assert!(noted[0].contains("WARN") && noted[0].contains("ConfigureProvider"));
    assert!(noted[1].contains("DEBUG") && noted[1].contains("UpgradeResourceState"));
    assert!(noted[2].contains("DEBUG") && noted[2].contains("ImportResourceState"));
}

#[tokio::test]
async fn test_schema_retrieval_silences_note() {
    let (_guard, logs) = capture_logs();
    let provider = launch_v6(StubV6::default()).await;
    provider
        .get_provider_schema(&CallContext::new())
        .await
        .unwrap();
    configure(&provider).await;
    assert!(!logs
        .contents()
        .contains("before the provider schema was retrieved"));
}

#[tokio::test]
async fn test_move_state() {
    let provider = launch_v6(StubV6::default()).await;
    configure(&provider).await;

    let source = thing_value("old", 2);
    let resp = provider
        .move_managed_resource_state(
            &CallContext::new(),
            &MoveManagedResourceStateRequest {
                source_provider_address: "registry.opentofu.org/acme/legacy".to_string(),
                source_resource_type: "legacy_thing".to_string(),
                source_schema_version: 4,
                source_state: RawState::from_value(source.value(), &thing_type()).unwrap(),
                source_private: b"moved".to_vec(),
                target_resource_type: "stub_thing".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(resp.target_private(), b"moved");
    assert_eq!(
        resp.target_state().decode(&thing_type()).unwrap(),
        *source.value()
    );
}

#[tokio::test]
async fn test_validate_resource_diagnostic_path() {
    let provider = launch_v6(StubV6::default()).await;
    let resp = provider
        .validate_managed_resource_config(
            &CallContext::new(),
            &ValidateManagedResourceConfigRequest {
                resource_type: "stub_thing".to_string(),
                config: thing_value("a", 1),
                client_capabilities: None,
            },
        )
        .await
        .unwrap();

    assert!(!resp.diagnostics().has_errors());
    let warning = resp.diagnostics().warnings().next().unwrap();
    assert_eq!(warning.detail(), "use labels instead");
    assert_eq!(warning.attribute().unwrap().to_string(), r#"tags["env"]"#);
}

// ─── Data Resources ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_read_data_resource() {
    let provider = launch_v6(StubV6::default()).await;
    let req = ReadDataResourceRequest {
        resource_type: "stub_lookup".to_string(),
        config: thing_value("lookup", 5),
        provider_meta: None,
        client_capabilities: None,
    };
    assert!(matches!(
        provider.read_data_resource(&CallContext::new(), &req).await,
        Err(Error::NotConfigured {
            operation: "ReadDataSource"
        })
    ));

    configure(&provider).await;
    let resp = provider
        .read_data_resource(&CallContext::new(), &req)
        .await
        .unwrap();
    assert!(resp.deferred().is_none());
    assert_eq!(
        resp.state().decode(&thing_type()).unwrap(),
        *thing_value("lookup", 5).value()
    );
}

#[tokio::test]
async fn test_validate_data_resource_unimplemented() {
    let provider = launch_v6(StubV6::default()).await;
    let err = assert_err!(
        provider
            .validate_data_resource_config(
                &CallContext::new(),
                &ValidateDataResourceConfigRequest {
                    resource_type: "stub_lookup".to_string(),
                    config: thing_value("lookup", 5),
                },
            )
            .await
    );
    assert!(err.is_unimplemented());
    assert!(!err.is_caller_error());
}

// ─── Ephemeral Resources ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_ephemeral_lifecycle() {
    let provider = launch_v6(StubV6::default()).await;
    configure(&provider).await;

    let opened = provider
        .open_ephemeral_resource(
            &CallContext::new(),
            &OpenEphemeralResourceRequest {
                resource_type: "stub_token".to_string(),
                config: TypedValue::new(Value::object::<_, String>([]), Type::empty_object()),
                client_capabilities: None,
            },
        )
        .await
        .unwrap();
    let expected: DateTime<Utc> = DateTime::from_timestamp(1_893_456_000, 0).unwrap();
    assert_eq!(opened.renew_at(), Some(expected));
    assert_eq!(opened.private(), Some(&b"lease-1"[..]));
    assert_eq!(
        opened
            .result()
            .decode(&Type::object([("token", Type::String)]))
            .unwrap(),
        Value::object([("token", Value::from("s3cr3t"))])
    );

    let renewed = provider
        .renew_ephemeral_resource(
            &CallContext::new(),
            &RenewEphemeralResourceRequest {
                resource_type: "stub_token".to_string(),
                private: opened.private().map(<[u8]>::to_vec),
            },
        )
        .await
        .unwrap();
    assert_eq!(renewed.private(), Some(&b"lease-1+renewed"[..]));
    assert!(renewed.renew_at().is_none());

    let closed = provider
        .close_ephemeral_resource(
            &CallContext::new(),
            &CloseEphemeralResourceRequest {
                resource_type: "stub_token".to_string(),
                private: renewed.private().map(<[u8]>::to_vec),
            },
        )
        .await
        .unwrap();
    assert!(closed.diagnostics().is_empty());
}

// ─── Functions ───────────────────────────────────────────────────────────────

fn call(arguments: Vec<TypedValue>) -> CallFunctionRequest {
    CallFunctionRequest {
        function_name: "parse".to_string(),
        arguments,
        signature: Some(FunctionArity::new(2, true)),
    }
}

fn string_arg(s: &str) -> TypedValue {
    TypedValue::new(Value::from(s), Type::String)
}

#[tokio::test]
async fn test_function_arity_checked_locally() {
    let provider = launch_v6(StubV6::default()).await;
    let err = assert_err!(
        provider
            .call_function(&CallContext::new(), &call(vec![string_arg("x")]))
            .await
    );
    assert!(err.is_caller_error());
    assert!(matches!(
        err,
        Error::FunctionArguments { given: 1, arity, .. } if arity == FunctionArity::new(2, true)
    ));
}

#[tokio::test]
async fn test_function_result_and_error() {
    let provider = launch_v6(StubV6::default()).await;

    let ok = provider
        .call_function(
            &CallContext::new(),
            &call(vec![string_arg("hello"), string_arg("raw")]),
        )
        .await
        .unwrap();
    assert!(ok.error().is_none());
    assert_eq!(ok.result().decode(&Type::String).unwrap(), Value::from("hello"));

    let failed = provider
        .call_function(
            &CallContext::new(),
            &call(vec![string_arg("a"), string_arg("b"), string_arg("c")]),
        )
        .await
        .unwrap();
    let error = failed.error().unwrap();
    assert_eq!(error.text(), "unknown option");
    assert_eq!(error.argument_index(), Some(2));
    assert_eq!(failed.result().encoding(), None);
}

// ─── Protocol 5 ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_v5_validate_ignores_prepared_config() {
    let stub = StubV5::default();
    let prepares = stub.prepare_calls.clone();
    let configured = stub.configured_with.clone();
    let provider = launch_v5(stub).await;

    let resp = provider
        .validate_provider_config(
            &CallContext::new(),
            &ValidateProviderConfigRequest {
                config: config_value("us-east-1"),
            },
        )
        .await
        .unwrap();
    assert_eq!(prepares.load(Ordering::SeqCst), 1);
    assert!(!resp.diagnostics().has_errors());
    assert_eq!(resp.diagnostics().warnings().count(), 1);

    configure(&provider).await;
    let sent = configured.lock().unwrap()[0].clone();
    assert_eq!(
        oxid_provider::cty::msgpack::unmarshal(&sent, &config_type()).unwrap(),
        *config_value("us-east-1").value()
    );
}

#[tokio::test]
async fn test_v5_unsupported_operations() {
    let provider = launch_v5(StubV5::default()).await;
    configure(&provider).await;

    let err = assert_err!(
        provider
            .open_ephemeral_resource(
                &CallContext::new(),
                &OpenEphemeralResourceRequest {
                    resource_type: "stub_token".to_string(),
                    config: TypedValue::null(Type::empty_object()),
                    client_capabilities: None,
                },
            )
            .await
    );
    assert!(err.is_unimplemented());
    assert!(matches!(
        err,
        Error::UnsupportedOperation {
            version: ProtocolVersion::V5,
            ..
        }
    ));

    let err = assert_err!(
        provider
            .move_managed_resource_state(
                &CallContext::new(),
                &MoveManagedResourceStateRequest {
                    source_provider_address: "registry.opentofu.org/acme/legacy".to_string(),
                    source_resource_type: "legacy_thing".to_string(),
                    source_schema_version: 0,
                    source_state: RawState::default(),
                    source_private: Vec::new(),
                    target_resource_type: "stub_thing".to_string(),
                },
            )
            .await
    );
    assert!(err.is_unimplemented());
}

#[tokio::test]
async fn test_v5_unimplemented_rpc() {
    let provider = launch_v5(StubV5::default()).await;
    configure(&provider).await;

    let err = assert_err!(
        provider
            .plan_managed_resource_change(&CallContext::new(), &plan_request(None))
            .await
    );
    assert!(err.is_unimplemented());
    assert!(matches!(
        err,
        Error::Rpc {
            operation: "PlanResourceChange",
            ..
        }
    ));
}

#[tokio::test]
async fn test_v5_deferred_read() {
    let provider = launch_v5(StubV5::default()).await;
    configure(&provider).await;

    assert!(matches!(
        provider
            .read_managed_resource(&CallContext::new(), &read_request(None))
            .await,
        Err(Error::UnexpectedDeferral { .. })
    ));

    let resp = provider
        .read_managed_resource(&CallContext::new(), &read_request(deferral_allowed()))
        .await
        .unwrap();
    assert_eq!(
        resp.deferred().unwrap().reason(),
        DeferredReason::ProviderConfigUnknown
    );
}
