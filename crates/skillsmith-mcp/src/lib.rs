//! Skillsmith MCP server - Model Context Protocol transport
//!
//! Exposes the tool surface from spec §6.3 (`search`, `get_skill`,
//! `recommend`, `compare`, `validate`, `suggest_install`, `sync`) over
//! stdio so an MCP-speaking agent can discover and install skills.
//!
//! # Usage
//!
//! ```no_run
//! use skillsmith_mcp::McpServer;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let server = McpServer::open(None).await?;
//! server.run().await
//! # }
//! ```

pub mod server;
pub mod stores;

pub use server::McpServer;
