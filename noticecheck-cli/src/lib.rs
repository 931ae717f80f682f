// All validation functionality is in noticecheck-core
// This CLI acts as a thin wrapper around the core library

// CLI-specific modules
pub mod run_id;

// Re-export core types for convenience
pub use noticecheck_core::*;

// Re-export CLI utilities
pub use run_id::{default_run_id, is_valid_run_id};
