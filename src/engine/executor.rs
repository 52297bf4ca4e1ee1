//! Execution coordinator.
//!
//! Runs the full guarded pipeline for one request: security gate, then
//! catalog resolution (cache-first), then the external invocation raced
//! against a hard timeout, then output filtering and the audit record.
//!
//! A request the gate rejects never produces an [`ExecutionResult`];
//! every accepted request produces exactly one audit entry, whatever
//! the outcome.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::time::{timeout, Instant};
use tracing::{debug, info, warn};

use crate::catalog::ShortcutsCatalog;
use crate::config::ExecutionConfig;
use crate::engine::backend::ShortcutsBackend;
use crate::error::{Error, ErrorInfo, Result};
use crate::guard::{redact_text, AuditEntry, AuditLog, Decision, RiskLevel, SecurityGate};

/// Terminal classification of one execution attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionOutcome {
    Succeeded,
    Failed,
    TimedOut,
    NotFound,
}

/// One named-shortcut execution request. Constructed per call, never
/// persisted.
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    pub name: String,
    pub input: Option<Value>,
    pub timeout_ms: Option<u64>,
    pub client_id: String,
}

impl ExecutionRequest {
    pub fn new(name: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            input: None,
            timeout_ms: None,
            client_id: client_id.into(),
        }
    }

    pub fn with_input(mut self, input: Value) -> Self {
        self.input = Some(input);
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }
}

/// Timing and size accounting, populated on every outcome branch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionMetadata {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub input_bytes: usize,
    pub output_bytes: usize,
    pub warnings: usize,
    pub errors: usize,
}

/// Structured result of one accepted execution attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub outcome: ExecutionOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
    pub duration_ms: u64,
    pub metadata: ExecutionMetadata,
}

/// Coordinates the guarded pipeline for execution requests.
pub struct Executor {
    backend: Arc<dyn ShortcutsBackend>,
    catalog: Arc<ShortcutsCatalog>,
    gate: Arc<SecurityGate>,
    audit: Arc<AuditLog>,
    config: ExecutionConfig,
}

impl Executor {
    pub fn new(
        backend: Arc<dyn ShortcutsBackend>,
        catalog: Arc<ShortcutsCatalog>,
        gate: Arc<SecurityGate>,
        audit: Arc<AuditLog>,
        config: ExecutionConfig,
    ) -> Self {
        Self {
            backend,
            catalog,
            gate,
            audit,
            config,
        }
    }

    /// Run one request through the full pipeline.
    ///
    /// Gate rejections return `Err` and are audited as rejections;
    /// accepted requests return `Ok` with a terminal
    /// [`ExecutionOutcome`], including failures and timeouts.
    pub async fn execute(&self, request: ExecutionRequest) -> Result<ExecutionResult> {
        let params = serde_json::json!({
            "name": request.name.clone(),
            "input": request.input.clone(),
        });
        let decision = self
            .gate
            .validate_request("run_shortcut", &params, &request.client_id);
        if !decision.allowed {
            return Err(self.record_rejection(&request.name, decision));
        }
        let warnings = decision.warnings;
        for warning in &warnings {
            warn!(shortcut = %request.name, "{}", warning);
        }

        let input = request.input.map(|v| self.gate.sanitize_input(v));
        let input_text = input.as_ref().map(input_as_text);
        let input_bytes = input_text.as_ref().map(|s| s.len()).unwrap_or(0);

        let started_at = Utc::now();
        let started = Instant::now();

        // Resolve existence via the catalog, cache-first. Absence is a
        // distinct terminal state, not a timeout or a rejection.
        let resolved = self.catalog.exists(&request.name).await;
        let (outcome, output, error) = match resolved {
            Err(e) => (ExecutionOutcome::Failed, None, Some(ErrorInfo::from(&e))),
            Ok(false) => (
                ExecutionOutcome::NotFound,
                None,
                Some(ErrorInfo::new(
                    "SHORTCUT_NOT_FOUND",
                    format!("no shortcut named '{}'", request.name),
                )),
            ),
            Ok(true) => {
                // max() before min(): a ceiling below the floor wins
                // instead of panicking like clamp would
                let timeout_ms = request
                    .timeout_ms
                    .unwrap_or(self.config.default_timeout_ms)
                    .max(1000)
                    .min(self.config.max_execution_ms);
                self.run_with_timeout(&request.name, input_text.as_deref(), timeout_ms)
                    .await
            }
        };

        let duration_ms = started.elapsed().as_millis() as u64;
        let success = outcome == ExecutionOutcome::Succeeded;
        let output_bytes = output.as_ref().map(|v| v.to_string().len()).unwrap_or(0);

        let result = ExecutionResult {
            success,
            outcome,
            output,
            error,
            duration_ms,
            metadata: ExecutionMetadata {
                started_at,
                finished_at: Utc::now(),
                input_bytes,
                output_bytes,
                warnings: warnings.len(),
                errors: usize::from(!success),
            },
        };

        self.audit.record(
            AuditEntry::new("run_shortcut", &request.name)
                .with_input(input_text.map(|t| redact_text(&t)))
                .with_outcome(success, duration_ms)
                .with_risk(RiskLevel::Low),
        );

        info!(
            shortcut = %request.name,
            outcome = ?result.outcome,
            duration_ms,
            "execution finished"
        );
        Ok(result)
    }

    /// Race the invocation against the timer; whichever completes first
    /// determines the outcome. On timeout the invocation future is
    /// dropped, which kills the child process.
    async fn run_with_timeout(
        &self,
        name: &str,
        input: Option<&str>,
        timeout_ms: u64,
    ) -> (ExecutionOutcome, Option<Value>, Option<ErrorInfo>) {
        debug!(shortcut = %name, timeout_ms, "starting invocation");

        match timeout(
            Duration::from_millis(timeout_ms),
            self.backend.run(name, input),
        )
        .await
        {
            Ok(Ok(run)) if run.success => {
                let parsed = parse_output(&run.stdout);
                let filtered = self.gate.filter_output(parsed);
                (ExecutionOutcome::Succeeded, Some(filtered), None)
            }
            Ok(Ok(run)) => {
                let message = if run.stderr.trim().is_empty() {
                    format!(
                        "shortcut exited with code {}",
                        run.exit_code
                            .map(|c| c.to_string())
                            .unwrap_or_else(|| "unknown".into())
                    )
                } else {
                    // stderr can leak secrets just like stdout
                    redact_text(run.stderr.trim())
                };
                (
                    ExecutionOutcome::Failed,
                    None,
                    Some(ErrorInfo::new("EXECUTION_ERROR", message)),
                )
            }
            Ok(Err(e)) => (ExecutionOutcome::Failed, None, Some(ErrorInfo::from(&e))),
            Err(_) => (
                ExecutionOutcome::TimedOut,
                None,
                Some(ErrorInfo::new(
                    "EXECUTION_TIMEOUT",
                    format!("shortcut did not finish within {}ms", timeout_ms),
                )),
            ),
        }
    }

    fn record_rejection(&self, name: &str, decision: Decision) -> Error {
        let code = decision.code.unwrap_or("SECURITY_BLOCKED");
        let reason = decision
            .reason
            .unwrap_or_else(|| "rejected by security policy".to_string());

        self.audit.record(
            AuditEntry::new("security_rejection", name)
                .with_outcome(false, 0)
                .with_risk(decision.risk),
        );
        warn!(shortcut = %name, code, risk = ?decision.risk, "request rejected");

        match code {
            "RATE_LIMITED" => Error::RateLimited(reason),
            "INVALID_OPERATION" | "INVALID_PARAMS" | "MISSING_SHORTCUT_NAME" => {
                Error::Validation(reason)
            }
            _ => Error::Security(reason),
        }
    }

    pub fn audit_log(&self) -> &AuditLog {
        &self.audit
    }

    pub fn catalog(&self) -> &ShortcutsCatalog {
        &self.catalog
    }

    pub fn gate(&self) -> &SecurityGate {
        &self.gate
    }
}

/// Attempt a structured parse of stdout, falling back to trimmed text.
fn parse_output(stdout: &str) -> Value {
    let trimmed = stdout.trim();
    serde_json::from_str(trimmed).unwrap_or_else(|_| Value::String(trimmed.to_string()))
}

/// A plain string travels to the shortcut as-is; structured input is
/// serialized JSON. Sizes are measured on this text.
fn input_as_text(input: &Value) -> String {
    match input {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
