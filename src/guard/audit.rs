//! Bounded in-memory audit ledger.
//!
//! Every accepted request produces exactly one entry; security
//! rejections are recorded with a distinct operation name so they can
//! never be mistaken for executed attempts. The ledger is append-only
//! with a hard capacity of 1000 entries; once full, the oldest entries
//! are silently dropped.

use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::RiskLevel;

/// Hard capacity of the ledger.
const MAX_ENTRIES: usize = 1000;

/// Default number of entries returned by [`AuditLog::recent`].
const DEFAULT_RECENT_LIMIT: usize = 100;

/// One execution attempt and its outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// Operation that produced this entry, e.g. `run_shortcut` for
    /// executed attempts or `security_rejection` for gate denials.
    pub operation: String,
    pub shortcut: String,
    /// Input as recorded after redaction, when capture is enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    pub success: bool,
    pub duration_ms: u64,
    pub risk: RiskLevel,
}

impl AuditEntry {
    pub fn new(operation: &str, shortcut: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            operation: operation.to_string(),
            shortcut: shortcut.to_string(),
            input: None,
            success: false,
            duration_ms: 0,
            risk: RiskLevel::Low,
        }
    }

    pub fn with_input(mut self, input: Option<String>) -> Self {
        self.input = input;
        self
    }

    pub fn with_outcome(mut self, success: bool, duration_ms: u64) -> Self {
        self.success = success;
        self.duration_ms = duration_ms;
        self
    }

    pub fn with_risk(mut self, risk: RiskLevel) -> Self {
        self.risk = risk;
        self
    }
}

/// Append-only ledger of execution attempts.
pub struct AuditLog {
    entries: Mutex<VecDeque<AuditEntry>>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(MAX_ENTRIES)),
        }
    }

    /// Append an entry, evicting the oldest when at capacity.
    pub fn record(&self, entry: AuditEntry) {
        let mut entries = self.entries.lock().expect("audit lock poisoned");
        if entries.len() >= MAX_ENTRIES {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// The most recent `limit` entries in insertion order.
    pub fn recent(&self, limit: Option<usize>) -> Vec<AuditEntry> {
        let entries = self.entries.lock().expect("audit lock poisoned");
        let limit = limit.unwrap_or(DEFAULT_RECENT_LIMIT);
        let skip = entries.len().saturating_sub(limit);
        entries.iter().skip(skip).cloned().collect()
    }

    /// Reset the ledger to empty.
    pub fn clear(&self) {
        self.entries.lock().expect("audit lock poisoned").clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("audit lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new()
    }
}
