use std::sync::Arc;
use std::time::Duration;

use axum::{extract::DefaultBodyLimit, middleware, Router};
use mainline_core::config::{AppConfig, ConfigError, LoadOptions, ServerConfig};
use mainline_core::CrmAdapter;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::correlation::propagate_correlation_id;
use crate::crm::LoggingCrmAdapter;
use crate::{health, routes};

/// Everything the process needs to serve traffic, built once at start-up.
pub struct Application {
    pub config: AppConfig,
    pub router: Router,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("could not bind `{address}`: {source}")]
    Bind { address: String, source: std::io::Error },
    #[error("server terminated unexpectedly: {0}")]
    Serve(#[source] std::io::Error),
    #[error("server task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error("could not install shutdown signal handler: {0}")]
    Signal(#[source] std::io::Error),
}

pub fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );
    let config = AppConfig::load(options)?;
    Ok(bootstrap_with_config(config))
}

pub fn bootstrap_with_config(config: AppConfig) -> Application {
    bootstrap_with_adapter(config, Arc::new(LoggingCrmAdapter))
}

pub fn bootstrap_with_adapter(config: AppConfig, crm: Arc<dyn CrmAdapter>) -> Application {
    let router = build_router(crm, &config.server);
    info!(
        event_name = "system.bootstrap.router_ready",
        correlation_id = "bootstrap",
        "routes registered"
    );
    Application { config, router }
}

pub fn build_router(crm: Arc<dyn CrmAdapter>, server: &ServerConfig) -> Router {
    routes::router(crm)
        .merge(health::router())
        .layer(DefaultBodyLimit::max(server.max_body_bytes))
        .layer(middleware::from_fn(propagate_correlation_id))
        .layer(TraceLayer::new_for_http())
}

/// Serves until Ctrl-C, then drains in-flight requests for at most
/// `server.graceful_shutdown_secs`.
pub async fn serve(app: Application) -> Result<(), BootstrapError> {
    let address = app.config.server.socket_address();
    let grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| BootstrapError::Bind { address: address.clone(), source })?;

    info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bind_address = %address,
        "mainline-server listening"
    );

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await
    });

    tokio::select! {
        joined = &mut server => return joined?.map_err(BootstrapError::Serve),
        signal = tokio::signal::ctrl_c() => signal.map_err(BootstrapError::Signal)?,
    }

    info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        grace_secs = grace.as_secs(),
        "shutdown signal received, draining requests"
    );
    let _ = shutdown_tx.send(());

    match tokio::time::timeout(grace, &mut server).await {
        Ok(joined) => joined?.map_err(BootstrapError::Serve)?,
        Err(_) => {
            warn!(
                event_name = "system.server.drain_timeout",
                correlation_id = "shutdown",
                "graceful shutdown window elapsed, aborting in-flight requests"
            );
            server.abort();
        }
    }

    info!(
        event_name = "system.server.stopped",
        correlation_id = "shutdown",
        "mainline-server stopped"
    );
    Ok(())
}
