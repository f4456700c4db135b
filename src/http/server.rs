//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the catch-all proxy handler
//! - Wire up middleware (request ID, tracing, timeout, body limit, gate)
//! - Serve on a listener until shutdown
//! - Swap gate and upstream when a new config arrives

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use axum::{middleware, routing::any, Router};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::GateConfig;
use crate::error::GateError;
use crate::gate::{gate_middleware, Gate, GateHandle};
use crate::http::proxy::{proxy_handler, Upstream, UpstreamHandle};
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};

/// HTTP server for the gate.
pub struct HttpServer {
    router: Router,
    config: GateConfig,
    gate: GateHandle,
    upstream: UpstreamHandle,
}

impl HttpServer {
    /// Create a server whose collaborators are reached over HTTP.
    pub fn new(config: GateConfig) -> Result<Self, GateError> {
        let client = collaborator_client(&config)?;
        let gate = Gate::from_config(&config, client);
        Self::with_gate(config, gate)
    }

    /// Create a server around an already built gate.
    pub fn with_gate(config: GateConfig, gate: Gate) -> Result<Self, GateError> {
        let gate = GateHandle::new(gate);
        let upstream: UpstreamHandle = Arc::new(ArcSwap::from_pointee(Upstream::from_config(&config.upstream)?));

        let router = Self::build_router(&config, gate.clone(), upstream.clone());
        Ok(Self {
            router,
            config,
            gate,
            upstream,
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GateConfig, gate: GateHandle, upstream: UpstreamHandle) -> Router {
        Router::new()
            .route("/", any(proxy_handler))
            .route("/{*path}", any(proxy_handler))
            .with_state(upstream)
            .layer(middleware::from_fn_with_state(gate, gate_middleware))
            .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// The fully layered router, for driving the gate without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<GateConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream = %self.config.upstream.address,
            "HTTP server starting"
        );

        let gate = self.gate.clone();
        let upstream = self.upstream.clone();
        let reload_task = tokio::spawn(async move {
            while let Some(new_config) = config_updates.recv().await {
                if let Err(e) = apply_config(&new_config, &gate, &upstream) {
                    tracing::error!(error = %e, "Rejected reloaded configuration");
                }
            }
        });

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        reload_task.abort();
        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GateConfig {
        &self.config
    }
}

/// Rebuild gate and upstream from a new config and swap them in.
///
/// Listener, timeout and body-limit settings are fixed at startup.
fn apply_config(config: &GateConfig, gate: &GateHandle, upstream: &UpstreamHandle) -> Result<(), GateError> {
    let new_upstream = Upstream::from_config(&config.upstream)?;
    let client = collaborator_client(config)?;
    gate.replace(Gate::from_config(config, client));
    upstream.store(Arc::new(new_upstream));
    tracing::info!(upstream = %config.upstream.address, "Configuration reloaded");
    Ok(())
}

/// One client for auth and notes calls, bounded by the collaborator deadline.
fn collaborator_client(config: &GateConfig) -> Result<reqwest::Client, GateError> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeouts.collaborator_secs))
        .redirect(reqwest::redirect::Policy::none())
        .user_agent(concat!("note-gate/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}
