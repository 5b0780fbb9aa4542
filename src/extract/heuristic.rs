//! Last-resort scan of every stream in the container.
//!
//! Each stream is decoded every plausible way and the best candidate kept
//! when it is long enough. The scan ignores document structure, so the
//! result is lossy and only roughly ordered.

use super::document::{ExtractedDocument, StrategyKind};
use super::strategy::{ExtractionContext, FallbackReason, Outcome, Strategy};
use crate::common::encoding::encoding_for_codepage;
use crate::ole::CompoundFile;
use crate::text::charclass::cjk_density;
use crate::text::{DecodeCandidate, decode_candidates, select_best};
use rayon::prelude::*;
use tracing::{debug, warn};

/// Text recovered by [`HeuristicStreamScanner::scan`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanResult {
    /// Retained candidates joined by a blank line, in directory order
    pub text: String,
    /// Paths of the streams that contributed
    pub streams: Vec<String>,
    /// Encoding of the longest retained candidate
    pub encoding: Option<&'static str>,
}

impl ScanResult {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Decodes all streams independently and keeps the long ones.
#[derive(Debug, Clone, Copy)]
pub struct HeuristicStreamScanner {
    min_stream_chars: usize,
}

impl Default for HeuristicStreamScanner {
    fn default() -> Self {
        Self::new(100)
    }
}

impl HeuristicStreamScanner {
    /// Keep a stream when its best decoding has more than `min_stream_chars`.
    pub fn new(min_stream_chars: usize) -> Self {
        Self { min_stream_chars }
    }

    pub fn scan(&self, cf: &CompoundFile, declared: Option<u32>) -> ScanResult {
        let paths = cf.stream_paths();
        let kept: Vec<(String, DecodeCandidate)> = paths
            .into_par_iter()
            .filter_map(|path| {
                let data = match cf.open_stream(&path) {
                    Ok(data) => data,
                    Err(e) => {
                        warn!(stream = %path, error = %e, "skipping unreadable stream");
                        return None;
                    }
                };
                let best = select_best(decode_candidates(&data, declared))?;
                (best.char_count > self.min_stream_chars).then_some((path, best))
            })
            .collect();

        let encoding = kept
            .iter()
            .fold(None::<&DecodeCandidate>, |longest, (_, c)| match longest {
                Some(l) if l.char_count >= c.char_count => Some(l),
                _ => Some(c),
            })
            .map(|c| c.encoding);

        let mut result = ScanResult {
            encoding,
            ..Default::default()
        };
        for (path, candidate) in kept {
            debug!(stream = %path, encoding = candidate.encoding, chars = candidate.char_count, "kept stream");
            if !result.text.is_empty() {
                result.text.push_str("\n\n");
            }
            result.text.push_str(&candidate.text);
            result.streams.push(path);
        }
        result
    }
}

/// Pipeline step running [`HeuristicStreamScanner`] and the cleaner.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicStrategy;

impl Strategy for HeuristicStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Heuristic
    }

    fn run(&self, ctx: &ExtractionContext<'_>) -> Outcome {
        let scanner = HeuristicStreamScanner::new(ctx.options.min_stream_chars);
        let scan = scanner.scan(ctx.package.compound_file(), ctx.codepage);

        let text = ctx.cleaner.clean(&scan.text);
        let encoding = scan
            .encoding
            .unwrap_or_else(|| encoding_for_codepage(ctx.codepage).name());
        let mut doc = ExtractedDocument::new(text, encoding, StrategyKind::Heuristic)
            .with_metadata(ctx.metadata.clone());

        if doc.is_empty() {
            return Outcome::Fallback(FallbackReason::NothingRecovered, Some(doc));
        }

        let density = cjk_density(&doc.text);
        if density < ctx.options.low_confidence_cjk_density
            && doc.text.chars().count() > ctx.options.min_stream_chars
        {
            doc.push_warning(format!(
                "Recovered by scanning raw streams; CJK density {:.1}% suggests the encoding may be wrong",
                density * 100.0
            ));
        }
        debug!(streams = scan.streams.len(), density, "heuristic scan finished");
        Outcome::Extracted(doc)
    }
}
