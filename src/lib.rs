//! s7s - guarded execution pipeline for macOS Shortcuts
//!
//! s7s exposes named macOS Shortcuts to AI agents over MCP, with a
//! security gate in front of every invocation: allow/block lists,
//! rate limiting, input-size and content checks, hard timeouts, output
//! redaction, and a bounded audit trail of everything that ran.
//!
//! ## Pipeline
//!
//! A request enters the [`guard::SecurityGate`]; on approval the
//! [`catalog::ShortcutsCatalog`] resolves the target (cache-first), the
//! [`engine::Executor`] runs it under a timeout, the gate filters the
//! output, and the [`guard::AuditLog`] records the attempt.
//!
//! ## Example
//!
//! ```rust,ignore
//! use s7s::config::Config;
//! use s7s::mcp::S7sMcpServer;
//!
//! let server = S7sMcpServer::new(Config::load()).await?;
//! server.run_stdio().await?;
//! ```

pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod guard;
pub mod mcp;

pub use error::{Error, Result};
pub use mcp::S7sMcpServer;
