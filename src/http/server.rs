//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, request ID, session gate, metrics)
//! - Bind server to listener
//! - Apply config reloads to the live snapshot
//! - Cancel relay sessions on shutdown before draining

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::MatchedPath,
    http::Request,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::RelayConfig;
use crate::http::{auth, events, loaders};
use crate::http::loaders::BackendClient;
use crate::observability::metrics;
use crate::relay::HttpConnector;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Live configuration; swapped on reload.
    pub config: Arc<ArcSwap<RelayConfig>>,
    /// Client for upstream event streams (connect timeout only).
    pub upstream: reqwest::Client,
    /// Client for the REST loaders.
    pub backend: BackendClient,
    /// Parent of every relay session's cancellation token.
    pub shutdown: CancellationToken,
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// HTTP server for the dashboard relay.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: RelayConfig, shutdown: CancellationToken) -> Result<Self, ServerError> {
        let connect_timeout = Duration::from_secs(config.upstream.connect_timeout_secs);
        let upstream = HttpConnector::build_client(connect_timeout)?;
        let backend = BackendClient::new(
            connect_timeout,
            Duration::from_secs(config.upstream.request_timeout_secs),
        )?;

        let state = AppState {
            config: Arc::new(ArcSwap::from_pointee(config.clone())),
            upstream,
            backend,
            shutdown,
        };

        let router = Self::build_router(&config, state.clone());
        Ok(Self { router, state })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &RelayConfig, state: AppState) -> Router {
        // The event stream is unbounded in time, so only the loaders get a deadline.
        let api_deadline = Duration::from_secs(
            config.upstream.connect_timeout_secs + config.upstream.request_timeout_secs,
        );
        let api = Router::new()
            .route("/api/deployments", get(loaders::list_deployments))
            .route("/api/deployments/{id}", get(loaders::get_deployment))
            .route(
                "/api/deployments/{project}/{service}",
                get(loaders::service_deployments),
            )
            .route("/api/containers", get(loaders::list_containers))
            .route("/api/containers/{id}", get(loaders::get_container))
            .route(
                "/api/containers/{hostname}/{project}/{service}",
                get(loaders::service_containers),
            )
            .layer(TimeoutLayer::new(api_deadline));

        Router::new()
            .route("/health", get(health))
            .route("/login", post(auth::login))
            .route("/logout", post(auth::logout))
            .route("/events", get(events::relay_events))
            .merge(api)
            .route_layer(middleware::from_fn(track_requests))
            .layer(middleware::from_fn_with_state(state.clone(), auth::session_gate))
            .with_state(state)
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<RelayConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let live = self.state.config.clone();
        tokio::spawn(async move {
            while let Some(new_config) = config_updates.recv().await {
                tracing::info!(
                    sse_url = ?new_config.upstream.sse_url,
                    api_url = ?new_config.upstream.api_url,
                    "Configuration reloaded; applies to new sessions and requests"
                );
                live.store(Arc::new(new_config));
            }
        });

        let sessions = self.state.shutdown.clone();
        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                // End open event streams so draining does not wait on them.
                sessions.cancel();
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// The fully layered router, for serving or in-process requests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Current configuration snapshot.
    pub fn config(&self) -> Arc<RelayConfig> {
        self.state.config.load_full()
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn track_requests(request: Request<Body>, next: Next) -> Response {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_string());
    let response = next.run(request).await;
    metrics::record_request(&route, response.status().as_u16());
    response
}
