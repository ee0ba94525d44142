#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tonic::Status;

use oxid_provider::ops::{ClientCapabilities, ConfigureProviderRequest};
use oxid_provider::provider::launch::{NegotiatedPlugin, PluginLauncher, PluginProcess};
use oxid_provider::provider::{tfplugin5, tfplugin6};
use oxid_provider::{CallContext, LaunchError, Provider, Type, TypedValue, Value};

pub const PLANNED_PRIVATE: &[u8] = b"\x00plan\xffopaque\x01";

// ─── Logs ────────────────────────────────────────────────────────────────────

/// Collects formatted log lines from the current thread.
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl std::io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Route debug-level logs into a buffer until the guard drops. Tests run
/// on a current-thread runtime, so provider calls log on this thread.
pub fn capture_logs() -> (tracing::subscriber::DefaultGuard, LogBuffer) {
    let logs = LogBuffer::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    (tracing::subscriber::set_default(subscriber), logs)
}

// ─── Launcher ────────────────────────────────────────────────────────────────

/// Hands out one pre-built connection, as if a plugin had been started.
pub struct StubLauncher {
    plugin: Mutex<Option<NegotiatedPlugin>>,
}

impl StubLauncher {
    pub fn new(plugin: NegotiatedPlugin) -> Self {
        Self {
            plugin: Mutex::new(Some(plugin)),
        }
    }
}

#[async_trait]
impl PluginLauncher for StubLauncher {
    async fn start(
        &self,
        _executable: &Path,
        _args: &[String],
    ) -> Result<NegotiatedPlugin, LaunchError> {
        self.plugin
            .lock()
            .unwrap()
            .take()
            .ok_or(LaunchError::ExitedBeforeHandshake)
    }
}

/// Counts how often the provider tried to kill its process.
#[derive(Clone, Default)]
pub struct StubProcess {
    pub kills: Arc<AtomicUsize>,
}

#[async_trait]
impl PluginProcess for StubProcess {
    async fn kill(&mut self) -> std::io::Result<()> {
        self.kills.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub async fn launch(plugin: NegotiatedPlugin) -> Provider {
    Provider::launch_with(&StubLauncher::new(plugin), "terraform-provider-stub", &[])
        .await
        .unwrap()
}

pub async fn launch_v6(stub: StubV6) -> Provider {
    launch(NegotiatedPlugin::v6(Arc::new(stub))).await
}

pub async fn launch_v5(stub: StubV5) -> Provider {
    launch(NegotiatedPlugin::v5(Arc::new(stub))).await
}

pub async fn configure(provider: &Provider) {
    let resp = provider
        .configure_provider(&CallContext::new(), &configure_request())
        .await
        .unwrap();
    assert!(!resp.diagnostics().has_errors());
}

pub fn configure_request() -> ConfigureProviderRequest {
    ConfigureProviderRequest {
        terraform_version: "1.9.0".to_string(),
        config: config_value("us-east-1"),
        client_capabilities: None,
    }
}

pub fn deferral_allowed() -> Option<ClientCapabilities> {
    Some(ClientCapabilities {
        deferral_allowed: true,
        write_only_attributes_allowed: false,
    })
}

// ─── Values ──────────────────────────────────────────────────────────────────

pub fn config_type() -> Type {
    Type::object([("region", Type::String)])
}

pub fn config_value(region: &str) -> TypedValue {
    TypedValue::new(Value::object([("region", Value::from(region))]), config_type())
}

pub fn thing_type() -> Type {
    Type::object([("id", Type::String), ("size", Type::Number)])
}

pub fn thing_value(id: &str, size: i64) -> TypedValue {
    TypedValue::new(
        Value::object([("id", Value::from(id)), ("size", Value::from(size))]),
        thing_type(),
    )
}

fn error_diagnostic6(summary: &str) -> tfplugin6::Diagnostic {
    tfplugin6::Diagnostic {
        severity: tfplugin6::diagnostic::Severity::Error as i32,
        summary: summary.to_string(),
        detail: String::new(),
        attribute: None,
    }
}

// ─── Protocol 6 stub ─────────────────────────────────────────────────────────

/// A protocol 6 plugin with one managed resource type, `stub_thing`.
#[derive(Default)]
pub struct StubV6 {
    /// Give `stub_thing.settings` a nested object type instead of a flat one.
    pub nested_settings: bool,
    /// Reason code attached to every plan response.
    pub plan_deferred: Option<tfplugin6::deferred::Reason>,
    pub configure_fails: bool,
    /// Never answer read requests.
    pub read_hangs: bool,
    /// Every `planned_private` blob received by apply.
    pub applied_private: Arc<Mutex<Vec<Vec<u8>>>>,
    pub stop_calls: Arc<AtomicUsize>,
}

impl StubV6 {
    fn schema(&self) -> tfplugin6::get_provider_schema::Response {
        use tfplugin6::schema::{object, Attribute, Block, Object};

        let mut settings = Attribute {
            name: "settings".to_string(),
            optional: true,
            ..Default::default()
        };
        if self.nested_settings {
            settings.nested_type = Some(Object {
                attributes: vec![Attribute {
                    name: "mode".to_string(),
                    r#type: br#""string""#.to_vec(),
                    required: true,
                    ..Default::default()
                }],
                nesting: object::NestingMode::Single as i32,
            });
        } else {
            settings.r#type = br#"["map","string"]"#.to_vec();
        }

        let thing = tfplugin6::Schema {
            version: 1,
            block: Some(Block {
                attributes: vec![
                    Attribute {
                        name: "id".to_string(),
                        r#type: br#""string""#.to_vec(),
                        computed: true,
                        ..Default::default()
                    },
                    settings,
                ],
                ..Default::default()
            }),
        };
        let parse = tfplugin6::Function {
            parameters: vec![
                tfplugin6::function::Parameter {
                    name: "input".to_string(),
                    r#type: br#""string""#.to_vec(),
                    ..Default::default()
                },
                tfplugin6::function::Parameter {
                    name: "format".to_string(),
                    r#type: br#""string""#.to_vec(),
                    ..Default::default()
                },
            ],
            variadic_parameter: Some(tfplugin6::function::Parameter {
                name: "options".to_string(),
                r#type: br#""string""#.to_vec(),
                ..Default::default()
            }),
            r#return: Some(tfplugin6::function::Return {
                r#type: br#""string""#.to_vec(),
            }),
            ..Default::default()
        };

        tfplugin6::get_provider_schema::Response {
            provider: Some(tfplugin6::Schema {
                version: 0,
                block: Some(Block {
                    attributes: vec![Attribute {
                        name: "region".to_string(),
                        r#type: br#""string""#.to_vec(),
                        optional: true,
                        ..Default::default()
                    }],
                    ..Default::default()
                }),
            }),
            resource_schemas: HashMap::from([("stub_thing".to_string(), thing)]),
            ephemeral_resource_schemas: HashMap::from([(
                "stub_token".to_string(),
                tfplugin6::Schema::default(),
            )]),
            functions: HashMap::from([("parse".to_string(), parse)]),
            server_capabilities: Some(tfplugin6::ServerCapabilities {
                plan_destroy: true,
                get_provider_schema_optional: false,
                move_resource_state: true,
            }),
            ..Default::default()
        }
    }
}

#[async_trait]
impl tfplugin6::ProviderRpc for StubV6 {
    async fn get_provider_schema(
        &self,
        _request: tfplugin6::get_provider_schema::Request,
    ) -> Result<tfplugin6::get_provider_schema::Response, Status> {
        Ok(self.schema())
    }

    async fn get_functions(
        &self,
        _request: tfplugin6::get_functions::Request,
    ) -> Result<tfplugin6::get_functions::Response, Status> {
        Ok(tfplugin6::get_functions::Response {
            functions: self.schema().functions,
            diagnostics: Vec::new(),
        })
    }

    async fn validate_provider_config(
        &self,
        request: tfplugin6::validate_provider_config::Request,
    ) -> Result<tfplugin6::validate_provider_config::Response, Status> {
        let config = request.config.unwrap_or_default();
        let diagnostics = if config.msgpack.is_empty() {
            vec![error_diagnostic6("config missing")]
        } else {
            Vec::new()
        };
        Ok(tfplugin6::validate_provider_config::Response { diagnostics })
    }

    async fn configure_provider(
        &self,
        _request: tfplugin6::configure_provider::Request,
    ) -> Result<tfplugin6::configure_provider::Response, Status> {
        let diagnostics = if self.configure_fails {
            vec![error_diagnostic6("invalid credentials")]
        } else {
            Vec::new()
        };
        Ok(tfplugin6::configure_provider::Response { diagnostics })
    }

    async fn validate_resource_config(
        &self,
        _request: tfplugin6::validate_resource_config::Request,
    ) -> Result<tfplugin6::validate_resource_config::Response, Status> {
        use tfplugin6::attribute_path::{step::Selector, Step};
        Ok(tfplugin6::validate_resource_config::Response {
            diagnostics: vec![tfplugin6::Diagnostic {
                severity: tfplugin6::diagnostic::Severity::Warning as i32,
                summary: "tag is deprecated".to_string(),
                detail: "use labels instead".to_string(),
                attribute: Some(tfplugin6::AttributePath {
                    steps: vec![
                        Step {
                            selector: Some(Selector::AttributeName("tags".to_string())),
                        },
                        Step {
                            selector: Some(Selector::ElementKeyString("env".to_string())),
                        },
                    ],
                }),
            }],
        })
    }

    async fn read_data_source(
        &self,
        request: tfplugin6::read_data_source::Request,
    ) -> Result<tfplugin6::read_data_source::Response, Status> {
        Ok(tfplugin6::read_data_source::Response {
            state: request.config,
            diagnostics: Vec::new(),
            deferred: None,
        })
    }

    async fn upgrade_resource_state(
        &self,
        request: tfplugin6::upgrade_resource_state::Request,
    ) -> Result<tfplugin6::upgrade_resource_state::Response, Status> {
        let raw = request.raw_state.unwrap_or_default();
        Ok(tfplugin6::upgrade_resource_state::Response {
            upgraded_state: Some(tfplugin6::DynamicValue {
                msgpack: Vec::new(),
                json: raw.json,
            }),
            diagnostics: Vec::new(),
        })
    }

    async fn read_resource(
        &self,
        request: tfplugin6::read_resource::Request,
    ) -> Result<tfplugin6::read_resource::Response, Status> {
        if self.read_hangs {
            std::future::pending::<()>().await;
        }
        Ok(tfplugin6::read_resource::Response {
            new_state: request.current_state,
            diagnostics: Vec::new(),
            private: request.private,
            deferred: None,
        })
    }

    async fn plan_resource_change(
        &self,
        request: tfplugin6::plan_resource_change::Request,
    ) -> Result<tfplugin6::plan_resource_change::Response, Status> {
        Ok(tfplugin6::plan_resource_change::Response {
            planned_state: request.proposed_new_state,
            requires_replace: vec![tfplugin6::AttributePath {
                steps: vec![tfplugin6::attribute_path::Step {
                    selector: Some(tfplugin6::attribute_path::step::Selector::AttributeName(
                        "size".to_string(),
                    )),
                }],
            }],
            planned_private: PLANNED_PRIVATE.to_vec(),
            diagnostics: Vec::new(),
            legacy_type_system: false,
            deferred: self.plan_deferred.map(|reason| tfplugin6::Deferred {
                reason: reason as i32,
            }),
        })
    }

    async fn apply_resource_change(
        &self,
        request: tfplugin6::apply_resource_change::Request,
    ) -> Result<tfplugin6::apply_resource_change::Response, Status> {
        self.applied_private
            .lock()
            .unwrap()
            .push(request.planned_private.clone());
        Ok(tfplugin6::apply_resource_change::Response {
            new_state: request.planned_state,
            private: request.planned_private,
            diagnostics: Vec::new(),
            legacy_type_system: false,
        })
    }

    async fn import_resource_state(
        &self,
        request: tfplugin6::import_resource_state::Request,
    ) -> Result<tfplugin6::import_resource_state::Response, Status> {
        Ok(tfplugin6::import_resource_state::Response {
            imported_resources: vec![tfplugin6::import_resource_state::ImportedResource {
                type_name: request.type_name,
                state: Some(tfplugin6::DynamicValue {
                    msgpack: Vec::new(),
                    json: format!(r#"{{"id":"{}","size":1}}"#, request.id).into_bytes(),
                }),
                private: b"imported".to_vec(),
            }],
            diagnostics: Vec::new(),
            deferred: None,
        })
    }

    async fn move_resource_state(
        &self,
        request: tfplugin6::move_resource_state::Request,
    ) -> Result<tfplugin6::move_resource_state::Response, Status> {
        let source = request.source_state.unwrap_or_default();
        Ok(tfplugin6::move_resource_state::Response {
            target_state: Some(tfplugin6::DynamicValue {
                msgpack: Vec::new(),
                json: source.json,
            }),
            diagnostics: Vec::new(),
            target_private: request.source_private,
        })
    }

    async fn open_ephemeral_resource(
        &self,
        _request: tfplugin6::open_ephemeral_resource::Request,
    ) -> Result<tfplugin6::open_ephemeral_resource::Response, Status> {
        Ok(tfplugin6::open_ephemeral_resource::Response {
            diagnostics: Vec::new(),
            renew_at: Some(prost_types::Timestamp {
                seconds: 1_893_456_000,
                nanos: 0,
            }),
            result: Some(tfplugin6::DynamicValue {
                msgpack: Vec::new(),
                json: br#"{"token":"s3cr3t"}"#.to_vec(),
            }),
            private: Some(b"lease-1".to_vec()),
            deferred: None,
        })
    }

    async fn renew_ephemeral_resource(
        &self,
        request: tfplugin6::renew_ephemeral_resource::Request,
    ) -> Result<tfplugin6::renew_ephemeral_resource::Response, Status> {
        let mut private = request.private.unwrap_or_default();
        private.extend_from_slice(b"+renewed");
        Ok(tfplugin6::renew_ephemeral_resource::Response {
            diagnostics: Vec::new(),
            renew_at: None,
            private: Some(private),
        })
    }

    async fn close_ephemeral_resource(
        &self,
        _request: tfplugin6::close_ephemeral_resource::Request,
    ) -> Result<tfplugin6::close_ephemeral_resource::Response, Status> {
        Ok(tfplugin6::close_ephemeral_resource::Response {
            diagnostics: Vec::new(),
        })
    }

    async fn call_function(
        &self,
        request: tfplugin6::call_function::Request,
    ) -> Result<tfplugin6::call_function::Response, Status> {
        if request.arguments.len() > 2 {
            return Ok(tfplugin6::call_function::Response {
                result: None,
                error: Some(tfplugin6::FunctionError {
                    text: "unknown option".to_string(),
                    function_argument: Some(2),
                }),
            });
        }
        Ok(tfplugin6::call_function::Response {
            result: request.arguments.into_iter().next(),
            error: None,
        })
    }

    async fn stop_provider(
        &self,
        _request: tfplugin6::stop_provider::Request,
    ) -> Result<tfplugin6::stop_provider::Response, Status> {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        Ok(tfplugin6::stop_provider::Response {
            error: String::new(),
        })
    }
}

// ─── Protocol 5 stub ─────────────────────────────────────────────────────────

/// A protocol 5 plugin. Its prepare step rewrites the region, which the
/// client must ignore.
#[derive(Default)]
pub struct StubV5 {
    /// The config each configure request carried, as raw msgpack.
    pub configured_with: Arc<Mutex<Vec<Vec<u8>>>>,
    pub prepare_calls: Arc<AtomicUsize>,
}

#[async_trait]
impl tfplugin5::ProviderRpc for StubV5 {
    async fn get_schema(
        &self,
        _request: tfplugin5::get_provider_schema::Request,
    ) -> Result<tfplugin5::get_provider_schema::Response, Status> {
        use tfplugin5::schema::{Attribute, Block};
        Ok(tfplugin5::get_provider_schema::Response {
            resource_schemas: HashMap::from([(
                "stub_thing".to_string(),
                tfplugin5::Schema {
                    version: 3,
                    block: Some(Block {
                        attributes: vec![Attribute {
                            name: "settings".to_string(),
                            r#type: br#"["map","string"]"#.to_vec(),
                            optional: true,
                            ..Default::default()
                        }],
                        ..Default::default()
                    }),
                },
            )]),
            ephemeral_resource_schemas: HashMap::from([(
                "stub_token".to_string(),
                tfplugin5::Schema {
                    version: 0,
                    block: Some(Block {
                        attributes: vec![Attribute {
                            name: "ttl".to_string(),
                            r#type: br#""number""#.to_vec(),
                            optional: true,
                            ..Default::default()
                        }],
                        ..Default::default()
                    }),
                },
            )]),
            server_capabilities: Some(tfplugin5::ServerCapabilities {
                plan_destroy: true,
                get_provider_schema_optional: true,
                move_resource_state: true,
            }),
            ..Default::default()
        })
    }

    async fn prepare_provider_config(
        &self,
        _request: tfplugin5::prepare_provider_config::Request,
    ) -> Result<tfplugin5::prepare_provider_config::Response, Status> {
        self.prepare_calls.fetch_add(1, Ordering::SeqCst);
        let prepared = oxid_provider::cty::msgpack::marshal(
            &Value::object([("region", Value::from("rewritten"))]),
            &config_type(),
        )
        .unwrap();
        Ok(tfplugin5::prepare_provider_config::Response {
            prepared_config: Some(tfplugin5::DynamicValue {
                msgpack: prepared,
                json: Vec::new(),
            }),
            diagnostics: vec![tfplugin5::Diagnostic {
                severity: tfplugin5::diagnostic::Severity::Warning as i32,
                summary: "region is deprecated".to_string(),
                detail: String::new(),
                attribute: None,
            }],
        })
    }

    async fn configure(
        &self,
        request: tfplugin5::configure::Request,
    ) -> Result<tfplugin5::configure::Response, Status> {
        self.configured_with
            .lock()
            .unwrap()
            .push(request.config.unwrap_or_default().msgpack);
        Ok(tfplugin5::configure::Response {
            diagnostics: Vec::new(),
        })
    }

    async fn read_resource(
        &self,
        request: tfplugin5::read_resource::Request,
    ) -> Result<tfplugin5::read_resource::Response, Status> {
        Ok(tfplugin5::read_resource::Response {
            new_state: request.current_state,
            diagnostics: Vec::new(),
            private: request.private,
            deferred: Some(tfplugin5::Deferred {
                reason: tfplugin5::deferred::Reason::ProviderConfigUnknown as i32,
            }),
        })
    }

    async fn validate_ephemeral_resource_config(
        &self,
        request: tfplugin5::validate_ephemeral_resource_config::Request,
    ) -> Result<tfplugin5::validate_ephemeral_resource_config::Response, Status> {
        let ttl = oxid_provider::cty::msgpack::unmarshal(
            &request.config.unwrap_or_default().msgpack,
            &Type::object([("ttl", Type::Number)]),
        )
        .map_err(|e| Status::invalid_argument(e.to_string()))?;
        let diagnostics = if ttl == Value::object([("ttl", Value::from(0i64))]) {
            vec![tfplugin5::Diagnostic {
                severity: tfplugin5::diagnostic::Severity::Error as i32,
                summary: format!("{} ttl must be positive", request.type_name),
                detail: String::new(),
                attribute: None,
            }]
        } else {
            Vec::new()
        };
        Ok(tfplugin5::validate_ephemeral_resource_config::Response { diagnostics })
    }

    async fn stop(
        &self,
        _request: tfplugin5::stop::Request,
    ) -> Result<tfplugin5::stop::Response, Status> {
        Ok(tfplugin5::stop::Response {
            error: "already stopping".to_string(),
        })
    }
}
