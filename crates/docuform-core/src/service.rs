//! Lifecycle state for background services.
//!
//! The HTTP server owns a few long-lived collaborators (the template store,
//! the student records directory) whose readiness is reported by `/health`.
//! Each one gets a [`ServiceHandle`]; state changes are broadcast through a
//! watch channel so callers can wait for readiness.
//!
//! ```rust
//! use docuform_core::service::{ServiceHandle, ServiceState};
//!
//! let records = ServiceHandle::new("records");
//! assert_eq!(records.state(), ServiceState::Stopped);
//!
//! records.set_state(ServiceState::Starting);
//! records.set_state(ServiceState::Ready);
//! assert!(records.snapshot().available);
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::watch;

// ============================================================================
// ServiceState
// ============================================================================

/// State of a service in its lifecycle.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "lowercase")]
pub enum ServiceState {
    /// Not started, or intentionally disabled.
    Stopped,
    /// Loading (first fetch of records, bucket check).
    Starting,
    /// Operational.
    Ready,
    /// Serving, but with stale or partial data.
    Degraded(String),
    /// Could not start.
    Failed(String),
}

impl ServiceState {
    /// Returns `true` if the service is fully ready.
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    /// Returns `true` if the service can handle requests (Ready or Degraded).
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Ready | Self::Degraded(_))
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stopped => write!(f, "stopped"),
            Self::Starting => write!(f, "starting"),
            Self::Ready => write!(f, "ready"),
            Self::Degraded(reason) => write!(f, "degraded: {reason}"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

// ============================================================================
// ServiceHandle
// ============================================================================

/// Point-in-time view of a service, as reported by the health endpoint.
#[derive(Clone, Debug, Serialize)]
pub struct ServiceSnapshot {
    /// Service name.
    pub name: String,
    /// Current state.
    #[serde(flatten)]
    pub state: ServiceState,
    /// Whether requests depending on this service can be served.
    pub available: bool,
    /// Seconds since the handle was created.
    pub uptime_secs: u64,
}

/// Shared handle for observing and updating a service's state.
///
/// Clones share the same underlying channel.
#[derive(Clone)]
pub struct ServiceHandle {
    inner: Arc<Inner>,
}

struct Inner {
    name: String,
    tx: watch::Sender<ServiceState>,
    created_at: Instant,
}

impl ServiceHandle {
    /// Create a handle in the [`ServiceState::Stopped`] state.
    pub fn new(name: impl Into<String>) -> Self {
        let (tx, _rx) = watch::channel(ServiceState::Stopped);
        Self {
            inner: Arc::new(Inner {
                name: name.into(),
                tx,
                created_at: Instant::now(),
            }),
        }
    }

    /// Service name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Current state.
    pub fn state(&self) -> ServiceState {
        self.inner.tx.borrow().clone()
    }

    /// Update the state, notifying subscribers.
    pub fn set_state(&self, state: ServiceState) {
        log::info!("Service '{}' -> {state}", self.inner.name);
        self.inner.tx.send_replace(state);
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> watch::Receiver<ServiceState> {
        self.inner.tx.subscribe()
    }

    /// Snapshot for reporting.
    pub fn snapshot(&self) -> ServiceSnapshot {
        let state = self.state();
        ServiceSnapshot {
            name: self.inner.name.clone(),
            available: state.is_available(),
            state,
            uptime_secs: self.inner.created_at.elapsed().as_secs(),
        }
    }

    /// Wait until the service is available, has failed, or `timeout` passes.
    pub async fn wait_available(&self, timeout: Duration) -> Result<(), String> {
        let mut rx = self.subscribe();
        let name = self.inner.name.clone();
        let waited = tokio::time::timeout(timeout, async move {
            loop {
                let state = rx.borrow_and_update().clone();
                match state {
                    s if s.is_available() => return Ok(()),
                    ServiceState::Failed(reason) => {
                        return Err(format!("Service '{name}' failed: {reason}"));
                    }
                    _ => {}
                }
                if rx.changed().await.is_err() {
                    return Err(format!("Service '{name}' channel closed"));
                }
            }
        })
        .await;

        match waited {
            Ok(result) => result,
            Err(_) => Err(format!(
                "Service '{}' not available after {timeout:?} (state: {})",
                self.inner.name,
                self.state()
            )),
        }
    }
}

impl fmt::Debug for ServiceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceHandle")
            .field("name", &self.inner.name)
            .field("state", &self.state())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
