//! FIB and piece-table driven extraction.

use super::document::{ExtractedDocument, StrategyKind};
use super::strategy::{ExtractionContext, FallbackReason, Outcome, Strategy};
use crate::ole::doc::TextSource;
use tracing::debug;

/// Decodes the main text through the FIB, then cleans it.
///
/// Output with fewer than `min_structured_chars` meaningful characters is
/// handed back as a partial so the heuristic scan gets a chance.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuredStrategy;

impl Strategy for StructuredStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Structured
    }

    fn run(&self, ctx: &ExtractionContext<'_>) -> Outcome {
        let structured = match ctx.package.structured_text(ctx.codepage) {
            Ok(text) => text,
            Err(e) => {
                debug!(error = %e, "structured parse failed");
                return Outcome::Fallback(e.into(), None);
            }
        };

        match structured.source {
            TextSource::Simple => debug!(encoding = structured.encoding, "simple text block"),
            TextSource::Pieces(n) => debug!(encoding = structured.encoding, pieces = n, "piece table text"),
        }

        let text = ctx.cleaner.clean(&structured.text);
        let doc = ExtractedDocument::new(text, structured.encoding, StrategyKind::Structured)
            .with_metadata(ctx.metadata.clone());

        let chars = doc.meaningful_chars();
        let min = ctx.options.min_structured_chars;
        if chars < min {
            return Outcome::Fallback(FallbackReason::TooShort { chars, min }, Some(doc));
        }
        Outcome::Extracted(doc)
    }
}
