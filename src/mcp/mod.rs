//! s7s MCP Server
//!
//! Exposes the guarded Shortcuts execution pipeline via Model Context
//! Protocol (MCP), so AI agents (Claude Desktop, Claude Code, etc.)
//! can discover and run shortcuts without bypassing the security gate.
//!
//! ## Capabilities
//!
//! - **Tools**: run, list, and inspect shortcuts; read and clear the
//!   audit log
//!
//! ## Example
//!
//! ```rust,ignore
//! use s7s::config::Config;
//! use s7s::mcp::S7sMcpServer;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let server = S7sMcpServer::new(Config::load()).await?;
//!     server.run_stdio().await?;
//!     Ok(())
//! }
//! ```

mod server;
mod tools;

pub use server::S7sMcpServer;
pub use tools::S7sService;
