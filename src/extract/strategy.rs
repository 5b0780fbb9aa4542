//! The strategy seam of the pipeline.
//!
//! Each strategy either produces a final [`ExtractedDocument`] or falls
//! through with a reason, optionally leaving behind a partial result the
//! pipeline returns when nothing better turns up.

use super::document::{ExtractedDocument, StrategyKind};
use super::options::ExtractOptions;
use crate::common::Metadata;
use crate::ole::doc::Package;
use crate::text::TextCleaner;
use std::fmt;
use std::path::Path;

/// Everything a strategy may look at for one document.
#[derive(Debug, Clone, Copy)]
pub struct ExtractionContext<'a> {
    pub package: &'a Package,
    /// Set only when the input came from the filesystem
    pub path: Option<&'a Path>,
    /// Effective codepage: override, else declared, else none
    pub codepage: Option<u32>,
    pub metadata: &'a Metadata,
    pub options: &'a ExtractOptions,
    pub cleaner: &'a TextCleaner,
}

/// Why a strategy did not produce the final result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    /// The strategy does not apply to this input
    NotEligible(&'static str),
    /// Native bridge failure, timeout or empty output
    Native(String),
    /// FIB, piece table or stream failure
    Structured(String),
    /// Output below the acceptance threshold
    TooShort { chars: usize, min: usize },
    /// No stream yielded usable text
    NothingRecovered,
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::NotEligible(why) => write!(f, "not eligible: {why}"),
            FallbackReason::Native(msg) => write!(f, "native bridge: {msg}"),
            FallbackReason::Structured(msg) => write!(f, "structured parse: {msg}"),
            FallbackReason::TooShort { chars, min } => {
                write!(f, "only {chars} meaningful characters (need {min})")
            }
            FallbackReason::NothingRecovered => f.write_str("no stream yielded text"),
        }
    }
}

/// Result of running one strategy.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Extracted(ExtractedDocument),
    Fallback(FallbackReason, Option<ExtractedDocument>),
}

/// One way of recovering text from a package.
pub trait Strategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    fn run(&self, ctx: &ExtractionContext<'_>) -> Outcome;

    /// Work from the file alone when its container could not be opened.
    ///
    /// `None` means the strategy needs a parsed package.
    fn run_unopened(&self, _path: &Path, _options: &ExtractOptions, _cleaner: &TextCleaner) -> Option<Outcome> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_display() {
        let reason = FallbackReason::TooShort { chars: 10, min: 50 };
        assert_eq!(reason.to_string(), "only 10 meaningful characters (need 50)");
        assert_eq!(
            FallbackReason::NotEligible("no path").to_string(),
            "not eligible: no path"
        );
    }
}
