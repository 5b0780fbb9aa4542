//! Error types for docsift.

// Submodule declarations
pub mod conversions;
pub mod types;

// Re-exports
pub use types::{ExtractError, MEMORY_LABEL, Result};
