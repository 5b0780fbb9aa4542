//! Extraction result handed to downstream formatters.

use crate::common::Metadata;
use crate::text::charclass::meaningful_count;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Strategy that produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// External application (antiword)
    Native,
    /// FIB and piece table
    Structured,
    /// Scan of every stream
    Heuristic,
}

impl StrategyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StrategyKind::Native => "native",
            StrategyKind::Structured => "structured",
            StrategyKind::Heuristic => "heuristic",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How much the text can be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Low,
}

/// Recovered text plus provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedDocument {
    /// Cleaned text; may be empty
    pub text: String,
    /// Encoding label the text was decoded with
    pub codepage: String,
    pub strategy: StrategyKind,
    pub confidence: Confidence,
    /// Caveats for presentation
    pub warnings: Vec<String>,
    pub metadata: Metadata,
}

impl ExtractedDocument {
    /// New result; heuristic results are always low confidence.
    pub fn new(text: String, codepage: impl Into<String>, strategy: StrategyKind) -> Self {
        let confidence = match strategy {
            StrategyKind::Heuristic => Confidence::Low,
            StrategyKind::Native | StrategyKind::Structured => Confidence::High,
        };
        Self {
            text,
            codepage: codepage.into(),
            strategy,
            confidence,
            warnings: Vec::new(),
            metadata: Metadata::default(),
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn push_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Alphanumeric and CJK characters in the text.
    #[inline]
    pub fn meaningful_chars(&self) -> usize {
        meaningful_count(&self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_follows_strategy() {
        let doc = ExtractedDocument::new("text".to_string(), "GBK", StrategyKind::Heuristic);
        assert_eq!(doc.confidence, Confidence::Low);
        let doc = ExtractedDocument::new("text".to_string(), "GBK", StrategyKind::Structured);
        assert_eq!(doc.confidence, Confidence::High);
        assert_eq!(doc.meaningful_chars(), 4);
    }

    #[test]
    fn test_serialized_labels_are_lowercase() {
        assert_eq!(StrategyKind::Native.to_string(), "native");
        let doc = ExtractedDocument::new(String::new(), "UTF-8", StrategyKind::Heuristic);
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["strategy"], "heuristic");
        assert_eq!(value["confidence"], "low");
        assert_eq!(value["text"], "");
    }
}
