//! Configuration for the extraction pipeline.

use crate::text::CleanOptions;
use std::time::Duration;

/// Thresholds and overrides for [`ExtractionPipeline`](crate::extract::ExtractionPipeline).
///
/// # Examples
///
/// ```rust
/// use docsift::extract::ExtractOptions;
/// use std::time::Duration;
///
/// // Create with defaults
/// let options = ExtractOptions::default();
/// assert_eq!(options.min_structured_chars, 50);
///
/// // Or customize
/// let options = ExtractOptions::new()
///     .with_native_timeout(Duration::from_secs(5))
///     .with_codepage(950);
/// assert_eq!(options.codepage_override, Some(950));
/// ```
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Upper bound on one native bridge invocation
    pub native_timeout: Duration,
    /// Structured text with fewer characters falls through to the heuristic
    pub min_structured_chars: usize,
    /// A stream's best decoding must exceed this many characters to be kept
    pub min_stream_chars: usize,
    /// Heuristic text below this CJK density (and above `min_stream_chars`
    /// characters) gets a caveat
    pub low_confidence_cjk_density: f64,
    /// Codepage used instead of the one declared in SummaryInformation
    pub codepage_override: Option<u32>,
    /// Line filtering thresholds
    pub clean: CleanOptions,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            native_timeout: Duration::from_secs(30),
            min_structured_chars: 50,
            min_stream_chars: 100,
            low_confidence_cjk_density: 0.05,
            codepage_override: None,
            clean: CleanOptions::default(),
        }
    }
}

impl ExtractOptions {
    /// Create a new `ExtractOptions` with default values.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the native bridge timeout.
    #[inline]
    pub fn with_native_timeout(mut self, timeout: Duration) -> Self {
        self.native_timeout = timeout;
        self
    }

    /// Set the minimum length of acceptable structured output.
    #[inline]
    pub fn with_min_structured_chars(mut self, chars: usize) -> Self {
        self.min_structured_chars = chars;
        self
    }

    /// Set the minimum length of a stream candidate kept by the heuristic scan.
    #[inline]
    pub fn with_min_stream_chars(mut self, chars: usize) -> Self {
        self.min_stream_chars = chars;
        self
    }

    #[inline]
    pub fn with_low_confidence_cjk_density(mut self, density: f64) -> Self {
        self.low_confidence_cjk_density = density;
        self
    }

    /// Force a codepage for 8-bit text.
    ///
    /// Takes precedence over the document's SummaryInformation codepage.
    #[inline]
    pub fn with_codepage(mut self, codepage: u32) -> Self {
        self.codepage_override = Some(codepage);
        self
    }

    #[inline]
    pub fn with_clean_options(mut self, clean: CleanOptions) -> Self {
        self.clean = clean;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ExtractOptions::default();
        assert_eq!(options.native_timeout, Duration::from_secs(30));
        assert_eq!(options.min_structured_chars, 50);
        assert_eq!(options.min_stream_chars, 100);
        assert_eq!(options.low_confidence_cjk_density, 0.05);
        assert_eq!(options.codepage_override, None);
        assert_eq!(options.clean, CleanOptions::default());
    }

    #[test]
    fn test_builder_chain() {
        let options = ExtractOptions::new()
            .with_min_structured_chars(10)
            .with_min_stream_chars(20)
            .with_low_confidence_cjk_density(0.5)
            .with_clean_options(CleanOptions::new().with_min_line_chars(4));
        assert_eq!(options.min_structured_chars, 10);
        assert_eq!(options.min_stream_chars, 20);
        assert_eq!(options.low_confidence_cjk_density, 0.5);
        assert_eq!(options.clean.min_line_chars, 4);
    }
}
