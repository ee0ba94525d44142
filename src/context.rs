//! Per-call cancellation and deadlines.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};

/// Carries the caller's cancellation signal and deadline into a provider
/// call.
///
/// Cancelling a context unblocks the pending call on the client side only;
/// the plugin keeps working until it finishes or is asked to stop with
/// [`crate::Provider::graceful_stop`].
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    cancel: CancellationToken,
    timeout: Option<Duration>,
}

impl CallContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Each call made with this context fails with [`Error::Timeout`] once
    /// `timeout` has elapsed since the call started.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Use an existing token, e.g. one shared with a caller's shutdown path.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// A context cancelled along with this one, but cancellable on its own.
    pub fn child(&self) -> Self {
        Self {
            cancel: self.cancel.child_token(),
            timeout: self.timeout,
        }
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Drive one RPC to completion unless the context gives up first.
    pub(crate) async fn run<T, F>(&self, operation: &'static str, rpc: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, tonic::Status>>,
    {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled { operation });
        }
        let rpc = async {
            let result = match self.timeout {
                Some(timeout) => match tokio::time::timeout(timeout, rpc).await {
                    Ok(result) => result,
                    Err(_) => return Err(Error::Timeout { operation, timeout }),
                },
                None => rpc.await,
            };
            result.map_err(|status| Error::Rpc { operation, status })
        };
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Error::Cancelled { operation }),
            result = rpc => result,
        }
    }
}
