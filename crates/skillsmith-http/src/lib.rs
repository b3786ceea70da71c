//! Skillsmith HTTP transport - REST API over the search, recommend, and
//! sync surface (spec §6.3 rendered as HTTP).
//!
//! ## API Endpoints
//!
//! - `GET /api/search` - catalog search (spec §6.3 `search`)
//! - `GET /api/skills/{skill_id}` - skill lookup
//! - `GET /api/skills/{skill_id}/suggest-install` - install policy gate
//! - `POST /api/recommend` - contextual recommendations
//! - `POST /api/compare` - two-skill comparison
//! - `POST /api/validate` - frontmatter/schema validation
//! - `POST /api/sync` - differential registry refresh
//! - `GET /api/health` - health check
//! - `GET /api/version` - version information
//!
//! ## Example
//!
//! ```ignore
//! use skillsmith_http::{HttpServer, HttpServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = HttpServerConfig {
//!         host: "127.0.0.1".to_string(),
//!         port: 3000,
//!         enable_cors: true,
//!         enable_tracing: true,
//!     };
//!
//!     let server = HttpServer::with_config(config);
//!     server.run().await
//! }
//! ```

pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod server;
pub mod stores;
pub mod types;

pub use server::{AppState, HttpServer, HttpServerConfig};
pub use types::*;

use anyhow::Result;

/// Start the HTTP server with default configuration.
pub async fn serve(host: &str, port: u16) -> Result<()> {
    let config = HttpServerConfig { host: host.to_string(), port, enable_cors: true, enable_tracing: true };
    let server = HttpServer::with_config(config);
    server.run().await
}
