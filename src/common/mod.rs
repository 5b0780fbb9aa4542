//! Common types and utilities shared across layers.

// Submodule declarations
pub mod binary;
pub mod encoding;
pub mod error;
pub mod metadata;

// Re-exports for convenience
pub use error::{ExtractError, Result};
pub use metadata::Metadata;
