//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build the pipeline's root handler from config, routes and hooks
//! - Wire up middleware (tracing, request ID)
//! - Bind server to listener with graceful shutdown
//! - Apply the configured policy to fatal failures

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::config::{FatalPolicy, PipelineConfig};
use crate::context::{ContextError, ContextOptions, UrlResolver};
use crate::http::cors::CorsNegotiator;
use crate::http::hooks::Hooks;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::http::root::RootHandler;
use crate::lifecycle::shutdown::wait_for;
use crate::observability::metrics;
use crate::routing::Router;

/// Application state injected into the fallback handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pub root: Arc<RootHandler>,
    pub on_fatal: FatalPolicy,
}

/// HTTP server hosting the request pipeline.
pub struct HttpServer {
    app: axum::Router,
    config: PipelineConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    ///
    /// Fails when the configured URL strategy is unusable.
    pub fn new(config: PipelineConfig, router: Router, hooks: Hooks) -> Result<Self, ContextError> {
        let url = UrlResolver::from_config(&config.url)?;
        let router = match &config.cors.allow_origins {
            Some(origins) => router.with_cors(CorsNegotiator::new(origins.iter().cloned())),
            None => router,
        };
        let options = ContextOptions {
            url,
            max_body_size: config.limits.max_body_size,
        };

        let state = AppState {
            root: Arc::new(RootHandler::new(router, hooks, options)),
            on_fatal: config.runtime.on_fatal,
        };

        Ok(Self {
            app: Self::build_router(state),
            config,
        })
    }

    /// Every request goes to the pipeline; axum itself never matches paths.
    fn build_router(state: AppState) -> axum::Router {
        axum::Router::new()
            .fallback(pipeline_handler)
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(set_request_id_layer())
                    .layer(TraceLayer::new_for_http())
                    .layer(propagate_request_id_layer()),
            )
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.app)
            .with_graceful_shutdown(wait_for(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }
}

/// Fallback handler: runs the pipeline and applies the fatal policy.
async fn pipeline_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    match state.root.handle(request).await {
        Ok(response) => response,
        Err(failure) => {
            metrics::record_fatal(failure.stage().as_str());
            tracing::error!(
                stage = %failure.stage(),
                error = %failure,
                policy = ?state.on_fatal,
                "UNHANDLED ERROR"
            );
            match state.on_fatal {
                FatalPolicy::Terminate => std::process::exit(1),
                FatalPolicy::Isolate => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
            }
        }
    }
}
