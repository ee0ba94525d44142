//! Starting plugin processes and negotiating a protocol version.
//!
//! Plugins follow the go-plugin convention: the client passes a magic cookie
//! and the offered protocol versions in the environment, and the plugin
//! answers with one handshake line on stdout:
//! `core-version|app-version|network|address|protocol`.

use std::any::Any;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::net::{TcpListener, UnixStream};
use tokio::process::{Child, Command};
use tokio_util::sync::{CancellationToken, DropGuard};
use tonic::transport::Channel;
use tracing::{debug, error, info, warn};

use super::{tfplugin5, tfplugin6, ProtocolVersion};
use crate::config::LaunchConfig;
use crate::error::LaunchError;

const MAGIC_COOKIE_KEY: &str = "TF_PLUGIN_MAGIC_COOKIE";
const MAGIC_COOKIE_VALUE: &str = "d602bf8f470bc67ca7faa0386276bbdd4330efaf76d1a219cb4d6991ca9872b2";

/// The only go-plugin core protocol version in existence.
const CORE_PROTOCOL_VERSION: u32 = 1;

/// Starts a plugin and returns a connection speaking the version it chose.
///
/// [`GrpcPluginLauncher`] is the real implementation; tests substitute
/// launchers that hand out in-process stubs.
#[async_trait]
pub trait PluginLauncher: Send + Sync {
    async fn start(
        &self,
        executable: &Path,
        args: &[String],
    ) -> Result<NegotiatedPlugin, LaunchError>;
}

/// Handle to a running plugin process.
#[async_trait]
pub trait PluginProcess: Send {
    /// Terminate the process and wait for it to exit.
    async fn kill(&mut self) -> std::io::Result<()>;
}

#[async_trait]
impl PluginProcess for Child {
    async fn kill(&mut self) -> std::io::Result<()> {
        Child::kill(self).await
    }
}

/// Result of a successful launch.
///
/// `client` holds an `Arc<dyn tfplugin5::ProviderRpc>` when
/// `protocol_version` is 5 and an `Arc<dyn tfplugin6::ProviderRpc>` when it
/// is 6. The constructors keep the two in step.
pub struct NegotiatedPlugin {
    pub protocol_version: u32,
    pub client: Box<dyn Any + Send + Sync>,
    pub process: Option<Box<dyn PluginProcess>>,
    /// Cancelled when the connection closes, stopping any local relay
    /// between the client and the plugin.
    pub transport: Option<CancellationToken>,
}

impl NegotiatedPlugin {
    pub fn v5(client: Arc<dyn tfplugin5::ProviderRpc>) -> Self {
        Self {
            protocol_version: 5,
            client: Box::new(client),
            process: None,
            transport: None,
        }
    }

    pub fn v6(client: Arc<dyn tfplugin6::ProviderRpc>) -> Self {
        Self {
            protocol_version: 6,
            client: Box::new(client),
            process: None,
            transport: None,
        }
    }

    pub fn with_process(mut self, process: Box<dyn PluginProcess>) -> Self {
        self.process = Some(process);
        self
    }

    pub fn with_transport(mut self, transport: CancellationToken) -> Self {
        self.transport = Some(transport);
        self
    }
}

impl std::fmt::Debug for NegotiatedPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NegotiatedPlugin")
            .field("protocol_version", &self.protocol_version)
            .field("process", &self.process.is_some())
            .field("transport", &self.transport.is_some())
            .finish_non_exhaustive()
    }
}

/// Launches plugin executables as child processes and connects over gRPC.
#[derive(Debug, Clone, Default)]
pub struct GrpcPluginLauncher {
    config: LaunchConfig,
}

impl GrpcPluginLauncher {
    pub fn new(config: LaunchConfig) -> Result<Self, LaunchError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &LaunchConfig {
        &self.config
    }
}

#[async_trait]
impl PluginLauncher for GrpcPluginLauncher {
    async fn start(
        &self,
        executable: &Path,
        args: &[String],
    ) -> Result<NegotiatedPlugin, LaunchError> {
        info!(executable = %executable.display(), "starting provider plugin");

        let stderr = if self.config.forward_stderr {
            Stdio::piped()
        } else {
            Stdio::null()
        };
        let mut child = Command::new(executable)
            .args(args)
            .envs(&self.config.env)
            .env(MAGIC_COOKIE_KEY, MAGIC_COOKIE_VALUE)
            .env("PLUGIN_MIN_PORT", self.config.plugin_min_port.to_string())
            .env("PLUGIN_MAX_PORT", self.config.plugin_max_port.to_string())
            .env("PLUGIN_PROTOCOL_VERSIONS", self.config.protocol_versions_env())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(stderr)
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| LaunchError::Spawn {
                path: executable.display().to_string(),
                source,
            })?;

        // An undrained pipe blocks the plugin once the OS buffer fills.
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_stderr(stderr));
        }

        let stdout = child.stdout.take().ok_or(LaunchError::Stdio("stdout"))?;
        let mut reader = BufReader::new(stdout);
        let mut line = String::new();
        let timeout = self.config.handshake_timeout();
        match tokio::time::timeout(timeout, reader.read_line(&mut line)).await {
            Ok(Ok(0)) => return Err(LaunchError::ExitedBeforeHandshake),
            Ok(Ok(_)) => {}
            Ok(Err(e)) => return Err(LaunchError::ReadHandshake(e)),
            Err(_) => return Err(LaunchError::HandshakeTimeout(timeout)),
        }
        tokio::spawn(drain_stdout(reader));

        let handshake = parse_handshake(line.trim())?;
        debug!(?handshake, "provider handshake");
        if !self.config.protocol_versions.contains(&handshake.app_protocol) {
            return Err(LaunchError::UnexpectedProtocolVersion(
                handshake.app_protocol,
            ));
        }
        let version = ProtocolVersion::from_major(handshake.app_protocol).ok_or(
            LaunchError::UnexpectedProtocolVersion(handshake.app_protocol),
        )?;

        // The relay stops if the connection below fails.
        let (endpoint, relay): (String, Option<DropGuard>) = match handshake.network.as_str() {
            "tcp" => (format!("http://{}", handshake.address), None),
            "unix" => {
                let (proxy, shutdown) = unix_proxy(handshake.address.clone()).await?;
                (format!("http://{proxy}"), Some(shutdown.drop_guard()))
            }
            other => return Err(LaunchError::UnsupportedNetwork(other.to_string())),
        };
        info!(%endpoint, protocol = %version, "connecting to provider");

        let channel = Channel::from_shared(endpoint)
            .map_err(|e| LaunchError::Endpoint(e.to_string()))?
            .initial_stream_window_size((1 << 31) - 1)
            .initial_connection_window_size((1 << 31) - 1)
            .connect()
            .await
            .map_err(LaunchError::Connect)?;

        let limit = self.config.max_message_size;
        let negotiated = match version {
            ProtocolVersion::V5 => NegotiatedPlugin::v5(Arc::new(
                tfplugin5::ProviderClient::new(channel)
                    .max_decoding_message_size(limit)
                    .max_encoding_message_size(limit),
            )),
            ProtocolVersion::V6 => NegotiatedPlugin::v6(Arc::new(
                tfplugin6::ProviderClient::new(channel)
                    .max_decoding_message_size(limit)
                    .max_encoding_message_size(limit),
            )),
        };
        let negotiated = negotiated.with_process(Box::new(child));
        Ok(match relay {
            Some(relay) => negotiated.with_transport(relay.disarm()),
            None => negotiated,
        })
    }
}

/// A parsed go-plugin handshake line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Handshake {
    pub(crate) app_protocol: u32,
    pub(crate) network: String,
    pub(crate) address: String,
}

pub(crate) fn parse_handshake(line: &str) -> Result<Handshake, LaunchError> {
    let invalid = |reason: &str| LaunchError::InvalidHandshake {
        line: line.to_string(),
        reason: reason.to_string(),
    };
    let parts: Vec<&str> = line.split('|').collect();
    if parts.len() < 4 {
        return Err(invalid("expected at least 4 pipe-separated fields"));
    }
    let core_protocol: u32 = parts[0]
        .parse()
        .map_err(|_| invalid("core protocol version is not a number"))?;
    if core_protocol != CORE_PROTOCOL_VERSION {
        return Err(invalid("unsupported core protocol version"));
    }
    let app_protocol = parts[1]
        .parse()
        .map_err(|_| invalid("app protocol version is not a number"))?;
    // Plugins that omit the fifth field speak net/rpc.
    let protocol = parts.get(4).copied().unwrap_or("netrpc");
    if protocol != "grpc" {
        return Err(LaunchError::UnsupportedTransport(protocol.to_string()));
    }
    Ok(Handshake {
        app_protocol,
        network: parts[2].to_string(),
        address: parts[3].to_string(),
    })
}

/// tonic's unix connector does not apply connection-level window sizes, so
/// large responses stall. Relaying through a loopback TCP port avoids it.
///
/// The relay runs until the returned token is cancelled, which also drops
/// every connection it carries.
async fn unix_proxy(
    socket_path: String,
) -> Result<(std::net::SocketAddr, CancellationToken), LaunchError> {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .map_err(LaunchError::Proxy)?;
    let addr = listener.local_addr().map_err(LaunchError::Proxy)?;
    info!(%addr, socket = %socket_path, "proxying provider unix socket");

    let shutdown = CancellationToken::new();
    let token = shutdown.clone();
    tokio::spawn(async move {
        loop {
            let tcp = tokio::select! {
                _ = token.cancelled() => break,
                accepted = listener.accept() => match accepted {
                    Ok((tcp, _)) => tcp,
                    Err(e) => {
                        error!("provider proxy accept failed: {e}");
                        break;
                    }
                },
            };
            let path = socket_path.clone();
            let token = token.clone();
            tokio::spawn(async move {
                let unix = match UnixStream::connect(&path).await {
                    Ok(unix) => unix,
                    Err(e) => {
                        error!("failed to connect to provider socket {path}: {e}");
                        return;
                    }
                };
                let (mut tcp_read, mut tcp_write) = tokio::io::split(tcp);
                let (mut unix_read, mut unix_write) = tokio::io::split(unix);
                tokio::select! {
                    _ = token.cancelled() => {}
                    _ = async {
                        tokio::try_join!(
                            tokio::io::copy(&mut tcp_read, &mut unix_write),
                            tokio::io::copy(&mut unix_read, &mut tcp_write),
                        )
                    } => {}
                }
            });
        }
        debug!(%addr, "provider proxy stopped");
    });
    Ok((addr, shutdown))
}

/// Plugin stderr carries go-hclog JSON lines. Only warnings and worse are
/// surfaced above debug.
async fn forward_stderr(stderr: impl AsyncRead + Unpin) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }
        if is_important(line) {
            warn!(target: "provider_stderr", "{line}");
        } else {
            debug!(target: "provider_stderr", "{line}");
        }
    }
}

fn is_important(line: &str) -> bool {
    match serde_json::from_str::<serde_json::Value>(line) {
        Ok(parsed) => matches!(
            parsed.get("@level").and_then(|l| l.as_str()),
            Some("warn" | "error" | "fatal")
        ),
        Err(_) => {
            let upper = line.to_uppercase();
            upper.contains("PANIC")
                || upper.contains("FATAL")
                || upper.starts_with("GOROUTINE ")
                || upper.starts_with("[ERROR]")
                || upper.starts_with("[WARN]")
        }
    }
}

async fn drain_stdout(reader: BufReader<impl AsyncRead + Unpin>) {
    let mut lines = reader.lines();
    while let Ok(Some(line)) = lines.next_line().await {
        debug!(target: "provider_stdout", "{line}");
    }
}
