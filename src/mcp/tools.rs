//! MCP tool definitions for s7s.
//!
//! Every tool call passes through the security gate before touching the
//! catalog or the coordinator; the gate's decision (including its risk
//! level) is what the caller sees on denial.

use rmcp::{model::*, tool, Error as McpError, ServerHandler};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::catalog::CatalogFilter;
use crate::engine::{ExecutionRequest, Executor};

/// Client identity used when the caller does not provide one.
const DEFAULT_CLIENT_ID: &str = "mcp";

/// s7s MCP service - handles all tool calls.
#[derive(Clone)]
pub struct S7sService {
    pub executor: Arc<Executor>,
}

// ============================================================================
// Tool Parameter Types
// ============================================================================

/// Parameters for running a shortcut
#[derive(Debug, Deserialize, JsonSchema)]
pub struct RunShortcutParams {
    /// Name of the shortcut to run (case-sensitive)
    pub name: String,
    /// Input passed to the shortcut (string or structured JSON)
    #[serde(default)]
    pub input: Option<Value>,
    /// Per-request timeout override in milliseconds
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    /// Client identity for rate limiting (default: "mcp")
    #[serde(default)]
    pub client_id: Option<String>,
}

/// Parameters for listing shortcuts
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListShortcutsParams {
    /// Filter by category (communication, media, productivity, system, utilities)
    #[serde(default)]
    pub category: Option<String>,
    /// Case-insensitive substring match on the shortcut name
    #[serde(default)]
    pub search: Option<String>,
    /// Maximum number of shortcuts to return
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Parameters for fetching shortcut info
#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetShortcutInfoParams {
    /// Shortcut name (case-sensitive)
    pub name: String,
}

/// Parameters for reading the audit log
#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetAuditLogParams {
    /// Maximum number of entries to return (default: 100)
    #[serde(default)]
    pub limit: Option<usize>,
}

// ============================================================================
// Tool Implementations
// ============================================================================

impl S7sService {
    fn gate_check(&self, operation: &str, params: &Value) -> Option<CallToolResult> {
        let decision = self
            .executor
            .gate()
            .validate_request(operation, params, DEFAULT_CLIENT_ID);
        if decision.allowed {
            return None;
        }
        let body = json!({
            "success": false,
            "error": {
                "code": decision.code,
                "message": decision.reason,
                "risk_level": decision.risk,
            }
        });
        Some(CallToolResult::error(vec![Content::text(
            serde_json::to_string_pretty(&body).unwrap_or_default(),
        )]))
    }
}

#[tool(tool_box)]
impl S7sService {
    /// Run a shortcut through the guarded pipeline.
    #[tool(
        description = "Run a macOS shortcut by name. Applies security policy, rate limiting, and a hard timeout; returns the structured execution result."
    )]
    pub async fn run_shortcut(
        &self,
        #[tool(aggr)] params: RunShortcutParams,
    ) -> Result<CallToolResult, McpError> {
        let mut request = ExecutionRequest::new(
            &params.name,
            params.client_id.as_deref().unwrap_or(DEFAULT_CLIENT_ID),
        );
        if let Some(input) = params.input {
            request = request.with_input(input);
        }
        if let Some(timeout_ms) = params.timeout_ms {
            request = request.with_timeout_ms(timeout_ms);
        }

        match self.executor.execute(request).await {
            Ok(result) => Ok(CallToolResult::success(vec![Content::text(
                serde_json::to_string_pretty(&result).unwrap_or_default(),
            )])),
            Err(e) => Ok(CallToolResult::error(vec![Content::text(
                serde_json::to_string_pretty(&e.to_json()).unwrap_or_default(),
            )])),
        }
    }

    /// List available shortcuts.
    #[tool(
        description = "List available shortcuts with their categories. Supports category, search, and limit filters; results are cached."
    )]
    pub async fn list_shortcuts(
        &self,
        #[tool(aggr)] params: ListShortcutsParams,
    ) -> Result<CallToolResult, McpError> {
        if let Some(denied) = self.gate_check("list_shortcuts", &json!({})) {
            return Ok(denied);
        }

        let filter = CatalogFilter {
            category: params.category,
            search: params.search,
            limit: params.limit,
        };

        match self.executor.catalog().list(&filter).await {
            Ok(shortcuts) => {
                let result = json!({
                    "shortcuts": shortcuts,
                    "count": shortcuts.len(),
                });
                Ok(CallToolResult::success(vec![Content::text(
                    serde_json::to_string_pretty(&result).unwrap_or_default(),
                )]))
            }
            Err(e) => Err(McpError::internal_error(
                "catalog_error",
                Some(json!({"error": e.to_string(), "code": e.code()})),
            )),
        }
    }

    /// Get composed metadata for one shortcut.
    #[tool(
        description = "Get metadata for one shortcut: category, system classification, and best-effort detail (action count, size)."
    )]
    pub async fn get_shortcut_info(
        &self,
        #[tool(aggr)] params: GetShortcutInfoParams,
    ) -> Result<CallToolResult, McpError> {
        if let Some(denied) = self.gate_check("get_shortcut_info", &json!({})) {
            return Ok(denied);
        }

        match self.executor.catalog().get_info(&params.name).await {
            Ok(Some(info)) => Ok(CallToolResult::success(vec![Content::text(
                serde_json::to_string_pretty(&info).unwrap_or_default(),
            )])),
            Ok(None) => Ok(CallToolResult::error(vec![Content::text(format!(
                "Shortcut not found: {}",
                params.name
            ))])),
            Err(e) => Err(McpError::internal_error(
                "catalog_error",
                Some(json!({"error": e.to_string(), "code": e.code()})),
            )),
        }
    }

    /// Read the most recent audit entries.
    #[tool(
        description = "Get the most recent audit entries (default 100) in insertion order: what ran, when, and with what outcome."
    )]
    pub async fn get_audit_log(
        &self,
        #[tool(aggr)] params: GetAuditLogParams,
    ) -> Result<CallToolResult, McpError> {
        if let Some(denied) = self.gate_check("get_audit_log", &json!({})) {
            return Ok(denied);
        }

        let entries = self.executor.audit_log().recent(params.limit);
        let result = json!({
            "entries": entries,
            "count": entries.len(),
        });
        Ok(CallToolResult::success(vec![Content::text(
            serde_json::to_string_pretty(&result).unwrap_or_default(),
        )]))
    }

    /// Reset the audit ledger.
    #[tool(description = "Clear the audit log, resetting the ledger to empty.")]
    pub async fn clear_audit_log(&self) -> Result<CallToolResult, McpError> {
        if let Some(denied) = self.gate_check("clear_audit_log", &json!({})) {
            return Ok(denied);
        }

        self.executor.audit_log().clear();
        Ok(CallToolResult::success(vec![Content::text(
            json!({"cleared": true}).to_string(),
        )]))
    }
}

#[tool(tool_box)]
impl ServerHandler for S7sService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "s7s runs macOS Shortcuts behind a security gate with rate limiting, \
                 timeouts, and an audit trail. Use run_shortcut to execute and \
                 list_shortcuts to discover what is available."
                    .to_string(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "s7s".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            ..Default::default()
        }
    }
}
