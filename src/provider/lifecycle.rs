use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::ops::{ClientCapabilities, Deferred};

const UNCONFIGURED: u8 = 0;
const CONFIGURING: u8 = 1;
const CONFIGURED: u8 = 2;
const CLOSED: u8 = 3;

/// Where a [`super::Provider`] is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Only schema, function and validation requests are meaningful.
    Unconfigured,
    /// A configure request is in flight.
    Configuring,
    Configured,
    Closed,
}

/// Lock-free lifecycle bookkeeping. Calls read it on entry; only configure
/// and close write it.
#[derive(Debug, Default)]
pub(crate) struct Lifecycle {
    state: AtomicU8,
    schema_seen: AtomicBool,
    schema_warned: AtomicBool,
}

impl Lifecycle {
    pub(crate) fn state(&self) -> LifecycleState {
        match self.state.load(Ordering::Acquire) {
            UNCONFIGURED => LifecycleState::Unconfigured,
            CONFIGURING => LifecycleState::Configuring,
            CONFIGURED => LifecycleState::Configured,
            _ => LifecycleState::Closed,
        }
    }

    pub(crate) fn ensure_open(&self) -> Result<()> {
        match self.state() {
            LifecycleState::Closed => Err(Error::Closed),
            _ => Ok(()),
        }
    }

    pub(crate) fn ensure_configured(&self, operation: &'static str) -> Result<()> {
        match self.state() {
            LifecycleState::Configured => Ok(()),
            LifecycleState::Closed => Err(Error::Closed),
            _ => Err(Error::NotConfigured { operation }),
        }
    }

    /// Claims the single configure slot. Concurrent or repeated configure
    /// attempts fail with `AlreadyConfigured`.
    pub(crate) fn begin_configure(&self) -> Result<ConfigureGuard<'_>> {
        match self.state.compare_exchange(
            UNCONFIGURED,
            CONFIGURING,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => Ok(ConfigureGuard {
                lifecycle: self,
                succeeded: false,
            }),
            Err(CLOSED) => Err(Error::Closed),
            Err(_) => Err(Error::AlreadyConfigured),
        }
    }

    /// A close that raced the configure request wins.
    fn finish_configure(&self, succeeded: bool) {
        let next = if succeeded { CONFIGURED } else { UNCONFIGURED };
        let _ = self
            .state
            .compare_exchange(CONFIGURING, next, Ordering::AcqRel, Ordering::Acquire);
    }

    /// Returns true for the call that actually closed.
    pub(crate) fn close(&self) -> bool {
        self.state.swap(CLOSED, Ordering::AcqRel) != CLOSED
    }

    pub(crate) fn schema_retrieved(&self) {
        self.schema_seen.store(true, Ordering::Release);
    }

    /// Typed values are encoded against caller-supplied types, so a missing
    /// schema fetch is survivable. Warn once per provider, then only at debug.
    pub(crate) fn note_typed_operation(&self, operation: &'static str) {
        if self.schema_seen.load(Ordering::Acquire) {
            return;
        }
        if !self.schema_warned.swap(true, Ordering::AcqRel) {
            warn!(
                operation,
                "typed request sent before the provider schema was retrieved"
            );
        } else {
            debug!(
                operation,
                "typed request sent before the provider schema was retrieved"
            );
        }
    }

    pub(crate) fn check_deferral(
        operation: &'static str,
        caps: Option<&ClientCapabilities>,
        deferred: Option<&Deferred>,
    ) -> Result<()> {
        let allowed = caps.is_some_and(|c| c.deferral_allowed);
        if deferred.is_some() && !allowed {
            return Err(Error::UnexpectedDeferral { operation });
        }
        Ok(())
    }
}

/// Holds the configure slot for one configure request. Dropped without
/// [`ConfigureGuard::succeeded`] (an error, error diagnostics, or a
/// cancelled call) it returns the provider to unconfigured.
pub(crate) struct ConfigureGuard<'a> {
    lifecycle: &'a Lifecycle,
    succeeded: bool,
}

impl ConfigureGuard<'_> {
    pub(crate) fn succeeded(mut self) {
        self.succeeded = true;
    }
}

impl Drop for ConfigureGuard<'_> {
    fn drop(&mut self) {
        self.lifecycle.finish_configure(self.succeeded);
    }
}
