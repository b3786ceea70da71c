//! HTTP server - REST transport over the search/recommend/sync surface.

use anyhow::Result;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::routes::create_app;
use crate::stores::Stores;

/// HTTP server configuration.
#[derive(Debug, Clone)]
pub struct HttpServerConfig {
    pub host: String,
    pub port: u16,
    pub enable_cors: bool,
    pub enable_tracing: bool,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".to_string(), port: 3000, enable_cors: true, enable_tracing: true }
    }
}

/// Shared application state: the process-wide config snapshot plus the
/// three persisted stores (spec §6.1), opened once at startup.
pub struct AppState {
    pub started_at: Instant,
    pub stores: Stores,
}

impl AppState {
    pub async fn new(config_path: Option<&std::path::Path>) -> Result<Self> {
        let stores = Stores::open(config_path).await?;
        Ok(Self { started_at: Instant::now(), stores })
    }
}

/// HTTP server that exposes the tool surface via REST.
pub struct HttpServer {
    config: HttpServerConfig,
}

impl HttpServer {
    pub fn new() -> Self {
        Self { config: HttpServerConfig::default() }
    }

    pub fn with_config(config: HttpServerConfig) -> Self {
        Self { config }
    }

    pub async fn run(&self) -> Result<()> {
        let state = std::sync::Arc::new(AppState::new(None).await?);

        let mut app = create_app(state);

        if self.config.enable_cors {
            let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);
            app = app.layer(cors);
        }
        if self.config.enable_tracing {
            app = app.layer(TraceLayer::new_for_http());
        }

        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;

        info!(address = %addr, cors = self.config.enable_cors, "HTTP server starting");
        println!("Skillsmith HTTP API listening on http://{addr}");
        println!("  API endpoints: http://{addr}/api/...");
        println!("  Health check:  http://{addr}/api/health");

        axum::serve(listener, app).await?;
        Ok(())
    }
}

impl Default for HttpServer {
    fn default() -> Self {
        Self::new()
    }
}
