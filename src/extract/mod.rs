//! Text extraction pipeline.
//!
//! [`ExtractionPipeline`] opens a `.doc` package and runs an ordered chain
//! of [`Strategy`] implementations until one produces text:
//!
//! - **native**: an external converter via [`NativeBridge`], path inputs only
//! - **structured**: FIB, piece table and declared codepage
//! - **heuristic**: every stream decoded independently, low confidence
//!
//! # Example
//!
//! ```rust,no_run
//! use docsift::extract::{ExtractOptions, ExtractionPipeline};
//! use std::time::Duration;
//!
//! let options = ExtractOptions::new().with_native_timeout(Duration::from_secs(10));
//! let pipeline = ExtractionPipeline::new(options).with_antiword();
//!
//! let doc = pipeline.extract_path("legacy.doc")?;
//! for warning in &doc.warnings {
//!     eprintln!("warning: {warning}");
//! }
//! println!("{}", doc.text);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod document;
pub mod heuristic;
pub mod native;
pub mod options;
pub mod pipeline;
pub mod strategy;
pub mod structured;

pub use document::{Confidence, ExtractedDocument, StrategyKind};
pub use heuristic::{HeuristicStrategy, HeuristicStreamScanner, ScanResult};
#[cfg(feature = "native")]
pub use native::AntiwordBridge;
pub use native::{NativeBridge, NativeError, NativeStrategy};
pub use options::ExtractOptions;
pub use pipeline::{ExtractionPipeline, extract_batch, extract_path};
pub use strategy::{ExtractionContext, FallbackReason, Outcome, Strategy};
pub use structured::StructuredStrategy;
