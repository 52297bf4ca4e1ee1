//! s7s MCP server wiring.
//!
//! Builds the pipeline (gate, catalog, coordinator, audit) from a
//! validated [`Config`] and serves it over stdio.

use std::sync::Arc;

use rmcp::transport::stdio;
use rmcp::ServiceExt;
use tracing::info;

use crate::catalog::ShortcutsCatalog;
use crate::config::Config;
use crate::engine::{CliBackend, Executor, ShortcutsBackend};
use crate::guard::{AuditLog, SecurityGate};

use super::tools::S7sService;

/// s7s MCP server.
pub struct S7sMcpServer {
    service: S7sService,
}

impl std::fmt::Debug for S7sMcpServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S7sMcpServer").finish_non_exhaustive()
    }
}

impl S7sMcpServer {
    /// Create a new server over the real `shortcuts` CLI.
    ///
    /// Fails fast with an environment error when the binary is missing;
    /// per-request execution never has to discover that.
    pub async fn new(config: Config) -> crate::error::Result<Self> {
        config.validate()?;

        let backend = CliBackend::new(&config.execution.shortcuts_bin);
        backend.ensure_available().await?;

        Ok(Self::assemble(config, Arc::new(backend)))
    }

    /// Create a server over a custom backend. Used by tests and the
    /// non-MCP CLI paths.
    pub fn with_backend(config: Config, backend: Arc<dyn ShortcutsBackend>) -> Self {
        Self::assemble(config, backend)
    }

    fn assemble(config: Config, backend: Arc<dyn ShortcutsBackend>) -> Self {
        let catalog = Arc::new(ShortcutsCatalog::new(backend.clone(), &config.cache));
        let gate = Arc::new(SecurityGate::new(config.security.clone()));
        let audit = Arc::new(AuditLog::new());
        let executor = Arc::new(Executor::new(
            backend,
            catalog,
            gate,
            audit,
            config.execution.clone(),
        ));

        Self {
            service: S7sService { executor },
        }
    }

    pub fn executor(&self) -> Arc<crate::engine::Executor> {
        self.service.executor.clone()
    }

    /// Run the MCP server with stdio transport.
    pub async fn run_stdio(self) -> crate::error::Result<()> {
        info!("Starting s7s MCP server (stdio transport)");

        let service = self
            .service
            .serve(stdio())
            .await
            .map_err(|e| crate::error::Error::Execution(format!("MCP server error: {}", e)))?;

        let quit_reason = service
            .waiting()
            .await
            .map_err(|e| crate::error::Error::Execution(format!("MCP server error: {}", e)))?;

        info!("s7s MCP server stopped: {:?}", quit_reason);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ExecutionOutcome, ExecutionRequest, RunOutput};
    use crate::error::Result;
    use async_trait::async_trait;
    use serde_json::Value;

    struct EchoBackend;

    #[async_trait]
    impl ShortcutsBackend for EchoBackend {
        async fn list_names(&self) -> Result<Vec<String>> {
            Ok(vec!["Weather Report".to_string()])
        }

        async fn view(&self, _name: &str) -> Result<Option<String>> {
            Ok(None)
        }

        async fn run(&self, _name: &str, input: Option<&str>) -> Result<RunOutput> {
            Ok(RunOutput {
                success: true,
                exit_code: Some(0),
                stdout: input.unwrap_or("ok").to_string(),
                stderr: String::new(),
            })
        }
    }

    #[test]
    fn test_invalid_config_rejected_at_startup() {
        let mut config = Config::default();
        config.execution.default_timeout_ms = 10;
        // with_backend skips the environment probe but new() must not
        // skip config validation
        let err = futures_block_on(S7sMcpServer::new(config)).unwrap_err();
        assert_eq!(err.code(), "CONFIG_ERROR");
    }

    fn futures_block_on<F: std::future::Future>(f: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(f)
    }

    #[tokio::test]
    async fn test_assembled_pipeline_executes() {
        let server = S7sMcpServer::with_backend(Config::default(), Arc::new(EchoBackend));
        let executor = server.executor();

        let result = executor
            .execute(
                ExecutionRequest::new("Weather Report", "test")
                    .with_input(Value::String("San Francisco".into())),
            )
            .await
            .unwrap();
        assert_eq!(result.outcome, ExecutionOutcome::Succeeded);
        assert_eq!(executor.audit_log().len(), 1);
    }
}
