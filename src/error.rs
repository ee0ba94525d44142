//! Error types for the provider client.

use std::time::Duration;

use thiserror::Error;

use crate::provider::ProtocolVersion;
use crate::schema::FunctionArity;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors returned by [`crate::Provider`] operations.
///
/// Diagnostics reported by the plugin are not errors: they arrive as ordinary
/// response data and must be inspected by the caller.
#[derive(Debug, Error)]
pub enum Error {
    /// The plugin process could not be started or the handshake failed.
    #[error("failed to launch provider plugin: {0}")]
    Launch(#[from] LaunchError),

    /// A request value did not conform to the type it was declared with.
    #[error("invalid {field} value: {source}")]
    InvalidValue {
        field: &'static str,
        source: CodecError,
    },

    /// A function was called with the wrong number of arguments.
    #[error("function {function:?} takes {arity} argument(s), but {given} were given")]
    FunctionArguments {
        function: String,
        arity: FunctionArity,
        given: usize,
    },

    /// A function argument did not conform to its declared type.
    #[error("invalid value for argument {index} of function {function:?}: {source}")]
    InvalidFunctionArgument {
        function: String,
        index: usize,
        source: CodecError,
    },

    /// The negotiated protocol version has no message for this operation.
    #[error("{operation} is not supported by plugin protocol version {version}")]
    UnsupportedOperation {
        operation: &'static str,
        version: ProtocolVersion,
    },

    /// The RPC itself failed (transport failure or a non-OK gRPC status).
    #[error("{operation} RPC failed: {status}")]
    Rpc {
        operation: &'static str,
        #[source]
        status: tonic::Status,
    },

    #[error("{operation} was cancelled")]
    Cancelled { operation: &'static str },

    #[error("{operation} timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },

    /// The plugin deferred an operation whose request did not allow deferral.
    #[error("provider returned a deferred {operation} response, but the request did not allow deferral")]
    UnexpectedDeferral { operation: &'static str },

    #[error("{operation} requires a configured provider")]
    NotConfigured { operation: &'static str },

    #[error("provider is already configured")]
    AlreadyConfigured,

    #[error("provider has been closed")]
    Closed,

    /// The plugin answered a graceful stop request with an error message.
    #[error("provider failed to stop: {0}")]
    Stop(String),

    #[error("failed to terminate provider plugin: {0}")]
    Terminate(#[source] std::io::Error),
}

impl Error {
    /// Whether the operation is not implemented by this plugin or protocol
    /// version. Callers use this to fall back to an older equivalent.
    pub fn is_unimplemented(&self) -> bool {
        match self {
            Self::Rpc { status, .. } => status.code() == tonic::Code::Unimplemented,
            Self::UnsupportedOperation { .. } => true,
            _ => false,
        }
    }

    /// Whether the caller supplied a request inconsistent with its own
    /// declarations, as opposed to a plugin or transport problem.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidValue { .. }
                | Self::FunctionArguments { .. }
                | Self::InvalidFunctionArgument { .. }
        )
    }
}

/// Errors converting values to or from their wire encodings.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("invalid type expression: {0}")]
    InvalidType(String),

    #[error("{}{}", path_prefix(.path), .message)]
    Value { path: String, message: String },

    #[error("malformed msgpack: {0}")]
    Msgpack(String),

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("value has neither a msgpack nor a JSON serialization")]
    NoEncoding,
}

impl CodecError {
    pub(crate) fn at(path: &str, message: impl Into<String>) -> Self {
        Self::Value {
            path: path.to_string(),
            message: message.into(),
        }
    }
}

fn path_prefix(path: &str) -> String {
    if path.is_empty() {
        String::new()
    } else {
        format!("at {path}: ")
    }
}

/// Errors starting a plugin process and negotiating its protocol.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("failed to start plugin executable {path}: {source}")]
    Spawn {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to capture plugin {0}")]
    Stdio(&'static str),

    #[error("plugin exited before completing the handshake")]
    ExitedBeforeHandshake,

    #[error("failed to read plugin handshake: {0}")]
    ReadHandshake(#[source] std::io::Error),

    #[error("plugin handshake timed out after {0:?}")]
    HandshakeTimeout(Duration),

    #[error("invalid plugin handshake {line:?}: {reason}")]
    InvalidHandshake { line: String, reason: String },

    #[error("plugin selected protocol version {0}, which was not offered")]
    UnexpectedProtocolVersion(u32),

    #[error("unsupported plugin RPC protocol {0:?}, expected grpc")]
    UnsupportedTransport(String),

    #[error("unsupported plugin network type {0:?}")]
    UnsupportedNetwork(String),

    #[error("failed to start unix socket proxy: {0}")]
    Proxy(#[source] std::io::Error),

    #[error("invalid plugin endpoint: {0}")]
    Endpoint(String),

    #[error("failed to connect to plugin: {0}")]
    Connect(#[source] tonic::transport::Error),

    #[error("invalid launch configuration: {0}")]
    Config(String),
}
