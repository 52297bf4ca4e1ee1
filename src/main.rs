//! s7s command-line interface.
//!
//! The primary mode (`s7s mcp`) serves the guarded pipeline over MCP
//! stdio. The remaining subcommands drive the same pipeline directly
//! for local use and debugging.
//!
//! ## Usage with Claude Desktop
//!
//! Add to `~/Library/Application Support/Claude/claude_desktop_config.json`:
//!
//! ```json
//! {
//!   "mcpServers": {
//!     "s7s": {
//!       "command": "s7s",
//!       "args": ["mcp"]
//!     }
//!   }
//! }
//! ```

use clap::{Parser, Subcommand};
use serde_json::Value;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use s7s::catalog::CatalogFilter;
use s7s::config::Config;
use s7s::engine::{CliBackend, ExecutionRequest};
use s7s::mcp::S7sMcpServer;

#[derive(Parser)]
#[command(name = "s7s")]
#[command(about = "Guarded execution pipeline for macOS Shortcuts")]
#[command(version)]
struct Cli {
    /// Enable debug logging (writes to stderr)
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the pipeline over MCP stdio
    Mcp,
    /// List available shortcuts
    List {
        /// Filter by category
        #[arg(long)]
        category: Option<String>,
        /// Substring match on the shortcut name
        #[arg(long)]
        search: Option<String>,
        /// Maximum number of results
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Run one shortcut through the guarded pipeline
    Run {
        /// Shortcut name (case-sensitive)
        name: String,
        /// Input passed to the shortcut
        #[arg(long)]
        input: Option<String>,
        /// Timeout override in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
    /// Show metadata for one shortcut
    Info {
        /// Shortcut name (case-sensitive)
        name: String,
    },
    /// Print recent audit entries
    Audit {
        /// Maximum number of entries (default 100)
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Log to stderr; stdout carries the MCP transport
    let filter = if cli.debug { "s7s=debug,rmcp=debug" } else { "s7s=info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(filter))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::load();
    config.validate().map_err(|e| anyhow::anyhow!("{}", e))?;

    match cli.command {
        Command::Mcp => {
            let server = S7sMcpServer::new(config).await?;
            server.run_stdio().await?;
        }
        Command::List {
            category,
            search,
            limit,
        } => {
            let server = startup(config).await?;
            let shortcuts = server
                .executor()
                .catalog()
                .list(&CatalogFilter {
                    category,
                    search,
                    limit,
                })
                .await?;
            println!("{}", serde_json::to_string_pretty(&shortcuts)?);
        }
        Command::Run {
            name,
            input,
            timeout_ms,
        } => {
            let server = startup(config).await?;
            let mut request = ExecutionRequest::new(&name, "cli");
            if let Some(input) = input {
                request = request.with_input(Value::String(input));
            }
            if let Some(timeout_ms) = timeout_ms {
                request = request.with_timeout_ms(timeout_ms);
            }
            match server.executor().execute(request).await {
                Ok(result) => println!("{}", serde_json::to_string_pretty(&result)?),
                Err(e) => {
                    println!("{}", serde_json::to_string_pretty(&e.to_json())?);
                    std::process::exit(1);
                }
            }
        }
        Command::Info { name } => {
            let server = startup(config).await?;
            match server.executor().catalog().get_info(&name).await? {
                Some(info) => println!("{}", serde_json::to_string_pretty(&info)?),
                None => {
                    eprintln!("Shortcut not found: {}", name);
                    std::process::exit(1);
                }
            }
        }
        Command::Audit { limit } => {
            let server = startup(config).await?;
            let entries = server.executor().audit_log().recent(limit);
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
    }

    Ok(())
}

/// Build the pipeline for direct CLI use, probing the environment first.
async fn startup(config: Config) -> anyhow::Result<S7sMcpServer> {
    let backend = CliBackend::new(&config.execution.shortcuts_bin);
    backend.ensure_available().await?;
    Ok(S7sMcpServer::with_backend(config, Arc::new(backend)))
}
