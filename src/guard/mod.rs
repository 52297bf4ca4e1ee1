//! Security gate for the execution pipeline.
//!
//! Stateless-per-call policy evaluation: structural request checks,
//! rate-limit admission, allow/block list enforcement, input-size and
//! content-pattern checks, and output redaction. Validation
//! short-circuits on the first rejection and every decision carries a
//! risk level for audit prioritization.
//!
//! Ordering note: allow/block policy is evaluated before input-size
//! validation, so a request that is both blocked and oversized is
//! rejected for the block reason.

pub mod audit;
pub mod rate_limiter;

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::OnceLock;
use tracing::warn;

use crate::config::SecurityConfig;

pub use audit::{AuditEntry, AuditLog};
pub use rate_limiter::{Admission, RateLimitConfig, RateLimiter};

/// Keywords marking a shortcut as system-level. Case-insensitive
/// substring match against the shortcut name.
const SYSTEM_KEYWORDS: &[&str] = &[
    "system",
    "setting",
    "preference",
    "config",
    "admin",
    "security",
    "password",
    "keychain",
    "permission",
];

/// Operations the gate recognizes at the structural check.
const KNOWN_OPERATIONS: &[&str] = &[
    "run_shortcut",
    "list_shortcuts",
    "get_shortcut_info",
    "get_audit_log",
    "clear_audit_log",
];

/// Coarse severity classification attached to a security decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Outcome of a policy evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    /// Machine-checkable denial code, `None` when allowed.
    pub code: Option<&'static str>,
    pub reason: Option<String>,
    pub risk: RiskLevel,
    /// Non-blocking findings, e.g. suspicious content patterns.
    pub warnings: Vec<String>,
}

impl Decision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            code: None,
            reason: None,
            risk: RiskLevel::Low,
            warnings: Vec::new(),
        }
    }

    pub fn deny(code: &'static str, reason: impl Into<String>, risk: RiskLevel) -> Self {
        Self {
            allowed: false,
            code: Some(code),
            reason: Some(reason.into()),
            risk,
            warnings: Vec::new(),
        }
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }
}

/// Result of input validation.
#[derive(Debug, Clone, Default)]
pub struct InputReport {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Whether a shortcut name is classified system-level.
pub fn is_system_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    SYSTEM_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

fn suspicious_patterns() -> &'static [(Regex, &'static str)] {
    static PATTERNS: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            (r"(?i)\brm\s+-[rf]{1,2}\b", "destructive filesystem command"),
            (r"(?i)\bsudo\b", "privilege escalation"),
            (r"(?i)\bdd\s+if=", "raw disk write"),
            (r"(?i)\b(drop|truncate)\s+table\b", "destructive SQL verb"),
            (r"(?i)\bdelete\s+from\b", "destructive SQL verb"),
            (r"(?i)curl\s+[^|]*\|\s*(ba)?sh", "piped remote script"),
        ]
        .into_iter()
        .map(|(pat, label)| (Regex::new(pat).expect("invalid pattern"), label))
        .collect()
    })
}

fn redaction_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)(password|passwd|token|secret|api[_-]?key|\bkey)("?\s*[:=]\s*)("[^"]*"|\S+)"#)
            .expect("invalid redaction pattern")
    })
}

fn secret_key_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(password|passwd|token|secret|key)").expect("invalid key pattern")
    })
}

/// Policy evaluator guarding every remotely-invokable operation.
pub struct SecurityGate {
    config: SecurityConfig,
    rate_limiter: RateLimiter,
}

impl SecurityGate {
    pub fn new(config: SecurityConfig) -> Self {
        let rate_limiter = RateLimiter::new(RateLimitConfig {
            window: std::time::Duration::from_millis(config.rate_window_ms),
            max_requests: config.rate_max_requests,
        });
        Self {
            config,
            rate_limiter,
        }
    }

    /// Validate a request end to end, short-circuiting on the first
    /// rejection.
    pub fn validate_request(&self, operation: &str, params: &Value, client_id: &str) -> Decision {
        // 1. Structural check
        if !KNOWN_OPERATIONS.contains(&operation) {
            return Decision::deny(
                "INVALID_OPERATION",
                format!("unrecognized operation '{}'", operation),
                RiskLevel::Medium,
            );
        }
        if !params.is_object() {
            return Decision::deny(
                "INVALID_PARAMS",
                "parameters must be an object",
                RiskLevel::Medium,
            );
        }

        // 2. Rate-limit admission
        if let Admission::Denied { reason } = self.rate_limiter.admit(client_id) {
            warn!(client_id = %client_id, "rate limit denial");
            return Decision::deny("RATE_LIMITED", reason, RiskLevel::Medium);
        }

        // 3. Operation-specific policy
        if operation == "run_shortcut" {
            let name = params.get("name").and_then(Value::as_str).unwrap_or("");
            if name.is_empty() {
                return Decision::deny(
                    "MISSING_SHORTCUT_NAME",
                    "run_shortcut requires a shortcut name",
                    RiskLevel::Medium,
                );
            }

            // 4. Allow/block evaluation precedes input validation
            let policy = self.is_shortcut_allowed(name);
            if !policy.allowed {
                return policy;
            }

            // 5. Input validation
            let report = self.validate_input(params.get("input"));
            if !report.valid {
                return Decision::deny(
                    "INPUT_TOO_LARGE",
                    report.errors.join("; "),
                    RiskLevel::High,
                );
            }
            return Decision::allow().with_warnings(report.warnings);
        }

        Decision::allow()
    }

    /// Evaluate the allow/block policy for one shortcut name.
    pub fn is_shortcut_allowed(&self, name: &str) -> Decision {
        let lower = name.to_lowercase();

        if self
            .config
            .blocked_shortcuts
            .iter()
            .any(|blocked| blocked.to_lowercase() == lower)
        {
            return Decision::deny(
                "SHORTCUT_BLOCKED",
                format!("shortcut '{}' is on the block list", name),
                RiskLevel::High,
            );
        }

        if is_system_name(name) && !self.config.allow_system_shortcuts {
            return Decision::deny(
                "SYSTEM_SHORTCUT_BLOCKED",
                format!(
                    "shortcut '{}' is system-level and system shortcuts are disabled",
                    name
                ),
                RiskLevel::High,
            );
        }

        if !self.config.allowed_prefixes.is_empty()
            && !self
                .config
                .allowed_prefixes
                .iter()
                .any(|prefix| name.starts_with(prefix.as_str()))
        {
            return Decision::deny(
                "PREFIX_NOT_ALLOWED",
                format!("shortcut '{}' does not match any allowed prefix", name),
                RiskLevel::Medium,
            );
        }

        Decision::allow()
    }

    /// Validate request input: hard size limit, soft content patterns.
    pub fn validate_input(&self, input: Option<&Value>) -> InputReport {
        let Some(input) = input else {
            return InputReport {
                valid: true,
                ..Default::default()
            };
        };

        let serialized = input.to_string();
        let mut report = InputReport {
            valid: true,
            ..Default::default()
        };

        if serialized.len() > self.config.max_input_size {
            report.valid = false;
            report.errors.push(format!(
                "INPUT_TOO_LARGE: input is {} bytes, maximum is {}",
                serialized.len(),
                self.config.max_input_size
            ));
            return report;
        }

        for (pattern, label) in suspicious_patterns() {
            if pattern.is_match(&serialized) {
                report
                    .warnings
                    .push(format!("input matches suspicious pattern: {}", label));
            }
        }

        report
    }

    /// Strip script/markup injection vectors from string inputs,
    /// recursively through nested structures.
    pub fn sanitize_input(&self, input: Value) -> Value {
        match input {
            Value::String(s) => Value::String(sanitize_text(&s)),
            Value::Array(items) => {
                Value::Array(items.into_iter().map(|v| self.sanitize_input(v)).collect())
            }
            Value::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(k, v)| (k, self.sanitize_input(v)))
                    .collect(),
            ),
            other => other,
        }
    }

    /// Redact secret-bearing values from structured output.
    ///
    /// Map entries whose key looks secret-like are replaced wholesale;
    /// string leaves go through text redaction. Runs on every result,
    /// successful or not.
    pub fn filter_output(&self, output: Value) -> Value {
        match output {
            Value::String(s) => Value::String(redact_text(&s)),
            Value::Array(items) => {
                Value::Array(items.into_iter().map(|v| self.filter_output(v)).collect())
            }
            Value::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(k, v)| {
                        if secret_key_regex().is_match(&k) {
                            (k, Value::String("[REDACTED]".to_string()))
                        } else {
                            (k, self.filter_output(v))
                        }
                    })
                    .collect(),
            ),
            other => other,
        }
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    pub fn config(&self) -> &SecurityConfig {
        &self.config
    }
}

/// Redact values following secret-like key patterns in free text.
///
/// Idempotent: `[REDACTED]` re-matches as a value and is replaced with
/// itself.
pub fn redact_text(text: &str) -> String {
    redaction_regex()
        .replace_all(text, "$1$2[REDACTED]")
        .into_owned()
}

fn sanitize_text(text: &str) -> String {
    static SCRIPT_TAG: OnceLock<Regex> = OnceLock::new();
    static URI_SCHEME: OnceLock<Regex> = OnceLock::new();
    static EVENT_HANDLER: OnceLock<Regex> = OnceLock::new();

    let script_tag = SCRIPT_TAG
        .get_or_init(|| Regex::new(r"(?is)<script[^>]*>.*?</script>").expect("invalid pattern"));
    let uri_scheme = URI_SCHEME
        .get_or_init(|| Regex::new(r"(?i)(javascript|vbscript):").expect("invalid pattern"));
    let event_handler = EVENT_HANDLER
        .get_or_init(|| Regex::new(r#"(?i)\son\w+\s*=\s*("[^"]*"|'[^']*'|\S+)"#).expect("invalid pattern"));

    let step1 = script_tag.replace_all(text, "");
    let step2 = uri_scheme.replace_all(&step1, "");
    let step3 = event_handler.replace_all(&step2, "");

    // Control characters other than tab/newline have no business in
    // shortcut input.
    step3
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn gate() -> SecurityGate {
        SecurityGate::new(SecurityConfig::default())
    }

    fn gate_with(config: SecurityConfig) -> SecurityGate {
        SecurityGate::new(config)
    }

    #[test]
    fn test_unrecognized_operation_rejected_medium() {
        let decision = gate().validate_request("format_disk", &json!({}), "c");
        assert!(!decision.allowed);
        assert_eq!(decision.risk, RiskLevel::Medium);
    }

    #[test]
    fn test_non_object_params_rejected() {
        let decision = gate().validate_request("run_shortcut", &json!("nope"), "c");
        assert!(!decision.allowed);
        assert_eq!(decision.risk, RiskLevel::Medium);
    }

    #[test]
    fn test_missing_name_rejected_medium() {
        let decision = gate().validate_request("run_shortcut", &json!({}), "c");
        assert!(!decision.allowed);
        assert_eq!(decision.risk, RiskLevel::Medium);
        assert!(decision.reason.unwrap().contains("name"));
    }

    #[test]
    fn test_rate_limit_denial_medium() {
        let mut config = SecurityConfig::default();
        config.rate_max_requests = 1;
        let gate = gate_with(config);

        assert!(gate
            .validate_request("list_shortcuts", &json!({}), "c")
            .allowed);
        let denied = gate.validate_request("list_shortcuts", &json!({}), "c");
        assert!(!denied.allowed);
        assert_eq!(denied.risk, RiskLevel::Medium);
    }

    #[test]
    fn test_block_list_high_risk() {
        let mut config = SecurityConfig::default();
        config.blocked_shortcuts = vec!["Wipe Disk".to_string()];
        let gate = gate_with(config);

        let decision = gate.is_shortcut_allowed("wipe disk");
        assert!(!decision.allowed);
        assert_eq!(decision.risk, RiskLevel::High);
        assert_eq!(decision.code, Some("SHORTCUT_BLOCKED"));
    }

    #[test]
    fn test_system_keyword_blocked_by_default() {
        let decision = gate().is_shortcut_allowed("System Configuration");
        assert!(!decision.allowed);
        assert_eq!(decision.risk, RiskLevel::High);

        let mut config = SecurityConfig::default();
        config.allow_system_shortcuts = true;
        assert!(gate_with(config)
            .is_shortcut_allowed("System Configuration")
            .allowed);
    }

    #[test]
    fn test_prefix_allow_list() {
        let mut config = SecurityConfig::default();
        config.allowed_prefixes = vec!["Work ".to_string()];
        let gate = gate_with(config);

        assert!(gate.is_shortcut_allowed("Work Report").allowed);
        let denied = gate.is_shortcut_allowed("Play Music");
        assert!(!denied.allowed);
        assert_eq!(denied.risk, RiskLevel::Medium);
    }

    #[test]
    fn test_policy_rejection_precedes_input_size() {
        let mut config = SecurityConfig::default();
        config.blocked_shortcuts = vec!["Blocked".to_string()];
        config.max_input_size = 1024;
        let gate = gate_with(config);

        let oversized = "x".repeat(4096);
        let decision = gate.validate_request(
            "run_shortcut",
            &json!({"name": "Blocked", "input": oversized}),
            "c",
        );
        assert!(!decision.allowed);
        assert_eq!(decision.risk, RiskLevel::High);
        assert_eq!(decision.code, Some("SHORTCUT_BLOCKED"));
        assert!(decision.reason.unwrap().contains("block list"));
    }

    #[test]
    fn test_oversized_input_rejected_high() {
        let mut config = SecurityConfig::default();
        config.max_input_size = 1024;
        let gate = gate_with(config);

        let report = gate.validate_input(Some(&json!("y".repeat(2048))));
        assert!(!report.valid);
        assert!(report.errors[0].contains("INPUT_TOO_LARGE"));

        let decision = gate.validate_request(
            "run_shortcut",
            &json!({"name": "Echo", "input": "y".repeat(2048)}),
            "c",
        );
        assert!(!decision.allowed);
        assert_eq!(decision.risk, RiskLevel::High);
        assert_eq!(decision.code, Some("INPUT_TOO_LARGE"));
    }

    #[test]
    fn test_suspicious_patterns_warn_without_blocking() {
        let report = gate().validate_input(Some(&json!("please run rm -rf / thanks")));
        assert!(report.valid);
        assert!(!report.warnings.is_empty());

        let report = gate().validate_input(Some(&json!("DROP TABLE users")));
        assert!(report.valid);
        assert!(report.warnings[0].contains("SQL"));
    }

    #[test]
    fn test_sanitize_strips_injection_vectors() {
        let gate = gate();
        let input = json!({
            "text": "hello <script>alert(1)</script> world",
            "link": "javascript:alert(1)",
            "nested": [{"html": "<img src=x onerror=\"steal()\">"}]
        });
        let clean = gate.sanitize_input(input);

        assert_eq!(clean["text"], "hello  world");
        assert_eq!(clean["link"], "alert(1)");
        let html = clean["nested"][0]["html"].as_str().unwrap();
        assert!(!html.contains("onerror"));
    }

    #[test]
    fn test_redaction_of_text_and_structures() {
        assert_eq!(
            redact_text("password: hunter2 and more"),
            "password: [REDACTED] and more"
        );

        let gate = gate();
        let filtered = gate.filter_output(json!({
            "api_key": "sk-12345",
            "result": "ok",
            "log": "token=abc123 done"
        }));
        assert_eq!(filtered["api_key"], "[REDACTED]");
        assert_eq!(filtered["result"], "ok");
        assert_eq!(filtered["log"], "token=[REDACTED] done");
    }

    #[test]
    fn test_redaction_is_idempotent() {
        let once = redact_text("password: hunter2");
        let twice = redact_text(&once);
        assert_eq!(once, "password: [REDACTED]");
        assert_eq!(once, twice);
    }

    #[test]
    fn test_is_system_name() {
        assert!(is_system_name("System Configuration"));
        assert!(is_system_name("change-keychain-entry"));
        assert!(is_system_name("Admin Tools"));
        assert!(!is_system_name("Weather Report"));
    }
}
