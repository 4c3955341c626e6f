//! micro-pipeline reference server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ axum (request id, trace) ──▶ RootHandler
//!                                                    │
//!                          on_request → parse → on_request_parsed
//!                                                    │
//!                                                    ▼
//!                               Router: pre-route → CORS → routes
//!                                                    │
//!                          on_response / on_error → normalize
//!                                                    │
//!     Client Response                                ▼
//!     ◀────────────── emit headers → before_send → transmit
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use axum::http::Method;
use clap::Parser;
use serde_json::json;
use tokio::net::TcpListener;

use micro_pipeline::config::{load_config, load_config_var, PipelineConfig};
use micro_pipeline::lifecycle::{shutdown_signal, Shutdown};
use micro_pipeline::observability::{init_logging, init_metrics};
use micro_pipeline::query_values::{
    parse_bool_query_value, parse_enum_query_value, parse_int_query_value,
};
use micro_pipeline::security::assert_valid_jwt;
use micro_pipeline::{BoxError, Hooks, HttpServer, RequestContext, RespError, Route, RouteResponse, Router};

#[derive(Debug, Parser)]
#[command(name = "micro-pipeline", version, about = "Minimal HTTP request pipeline")]
struct Cli {
    /// Path to a TOML config file. Built-in defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => PipelineConfig::default(),
    };

    init_logging(&config.observability)?;

    tracing::info!("micro-pipeline v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        url = ?config.url,
        cors = ?config.cors.allow_origins,
        on_fatal = ?config.runtime.on_fatal,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        init_metrics(config.observability.metrics_address.parse()?)?;
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = HttpServer::new(config, demo_router(), Hooks::new())?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(shutdown_signal(shutdown));

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn demo_router() -> Router {
    Router::new(vec![
        Route::get("/health", health),
        Route::post("/echo", echo),
        Route::get("/query", query),
        Route::get("/whoami", whoami),
        Route::any_path(Method::GET, not_found),
    ])
}

async fn health(_ctx: Arc<RequestContext>) -> Result<RouteResponse, BoxError> {
    Ok(RouteResponse::json(&json!({ "status": "ok" }))?)
}

async fn echo(ctx: Arc<RequestContext>) -> Result<RouteResponse, BoxError> {
    let body: serde_json::Value = ctx
        .read_body_as_json()
        .await
        .map_err(|e| RespError::bad_request(format!("invalid json body: {}", e)).with_source(e))?;
    Ok(RouteResponse::json(&body)?)
}

async fn query(ctx: Arc<RequestContext>) -> Result<RouteResponse, BoxError> {
    let query = ctx.query();
    let verbose = parse_bool_query_value(query, "verbose")?;
    let limit = parse_int_query_value(query, "limit", Some(10))?;
    let order = parse_enum_query_value(query, "order", &["asc", "desc"], Some("asc"))?;
    Ok(RouteResponse::json(&json!({
        "query": query,
        "verbose": verbose,
        "limit": limit,
        "order": order,
    }))?)
}

async fn whoami(ctx: Arc<RequestContext>) -> Result<RouteResponse, BoxError> {
    let secret = load_config_var("JWT_SECRET")?;
    let claims = assert_valid_jwt(&ctx, &secret)?;
    Ok(RouteResponse::json(&claims)?)
}

async fn not_found(_ctx: Arc<RequestContext>) -> Result<RouteResponse, BoxError> {
    Err(RespError::not_found().into())
}
