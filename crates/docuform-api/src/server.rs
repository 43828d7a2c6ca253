//! Binding, warm-up and graceful shutdown.

use std::future::Future;
use std::sync::Arc;

use docuform_core::{DocuformConfig, ServiceState};
use tokio::net::TcpListener;

use crate::routes::router;
use crate::state::AppState;
use crate::Result;

/// Docuform API server.
#[derive(Debug)]
pub struct Server {
    state: AppState,
    addr: String,
}

impl Server {
    /// Server for `state`, listening on `addr` (`host:port`).
    pub fn new(state: AppState, addr: impl Into<String>) -> Self {
        Self {
            state,
            addr: addr.into(),
        }
    }

    /// Server built from configuration.
    pub fn from_config(config: &DocuformConfig) -> Result<Self> {
        Ok(Self::new(
            AppState::from_config(config)?,
            config.server.bind_addr(),
        ))
    }

    /// Shared state.
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Bind and serve until Ctrl-C or SIGTERM.
    pub async fn run(self) -> Result<()> {
        let listener = TcpListener::bind(&self.addr).await?;
        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on an existing listener until `shutdown` resolves.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let local = listener.local_addr()?;
        tracing::info!(addr = %local, "Docuform API listening");

        warm_up(&self.state);
        axum::serve(listener, router(self.state))
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("Server stopped");
        Ok(())
    }
}

/// Check the template store and load student records in the background so
/// `/health` reflects reality before the first request.
fn warm_up(state: &AppState) {
    let store = Arc::clone(&state.store);
    let service = state.templates_service.clone();
    service.set_state(ServiceState::Starting);
    tokio::spawn(async move {
        match store.list().await {
            Ok(templates) => {
                tracing::info!(count = templates.len(), backend = store.backend(), "Template store ready");
                service.set_state(ServiceState::Ready);
            }
            Err(e) if e.is_upstream() => {
                tracing::warn!("Template store unreachable: {e}");
                service.set_state(ServiceState::Degraded(e.to_string()));
            }
            Err(e) => {
                tracing::error!("Template store failed: {e}");
                service.set_state(ServiceState::Failed(e.to_string()));
            }
        }
    });

    if let Some(records) = state.records.clone() {
        tokio::spawn(async move {
            if let Err(e) = records.refresh().await {
                tracing::warn!("Initial student record load failed: {e}");
            }
        });
    }
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
