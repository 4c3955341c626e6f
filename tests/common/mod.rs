//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::time::Duration;

use micro_pipeline::{Hooks, HttpServer, PipelineConfig, Router, Shutdown};
use tokio::net::TcpListener;

/// A running server on an ephemeral port. Dropping it shuts the server down.
pub struct TestServer {
    pub addr: SocketAddr,
    shutdown: Shutdown,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start the pipeline with the given config, routes and hooks.
pub async fn spawn_server(config: PipelineConfig, router: Router, hooks: Hooks) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = HttpServer::new(config, router, hooks).unwrap();
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    // Give the accept loop a moment to start.
    tokio::time::sleep(Duration::from_millis(50)).await;

    TestServer { addr, shutdown }
}

/// A client that never pools or proxies, so every test sees a fresh connection.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
