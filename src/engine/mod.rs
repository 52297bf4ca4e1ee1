//! Guarded execution of shortcuts.

pub mod backend;
mod executor;

pub use backend::{CliBackend, RunOutput, ShortcutsBackend};
pub use executor::{
    ExecutionMetadata, ExecutionOutcome, ExecutionRequest, ExecutionResult, Executor,
};
