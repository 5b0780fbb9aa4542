//! The ordered fallback chain.
//!
//! `Start` opens the package (the only fatal step), then each strategy runs
//! in turn: native (when a bridge is configured), structured, heuristic.
//! The first [`Outcome::Extracted`] wins. If every strategy falls through,
//! the best remembered partial is returned.
//!
//! A file with the compound file signature whose structure cannot be read
//! still goes to the native bridge before the error is reported.

use super::document::{ExtractedDocument, StrategyKind};
use super::heuristic::HeuristicStrategy;
use super::native::{NativeBridge, NativeStrategy};
use super::options::ExtractOptions;
use super::strategy::{ExtractionContext, Outcome, Strategy};
use super::structured::StructuredStrategy;
use crate::common::encoding::encoding_for_codepage;
use crate::common::error::MEMORY_LABEL;
use crate::common::{ExtractError, Metadata, Result};
use crate::ole::doc::Package;
use crate::text::TextCleaner;
use bytes::Bytes;
use rayon::prelude::*;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Runs the strategy chain over `.doc` inputs.
///
/// The pipeline holds no per-document state and can be shared across
/// threads.
///
/// # Examples
///
/// ```rust,no_run
/// use docsift::extract::{ExtractOptions, ExtractionPipeline};
///
/// let pipeline = ExtractionPipeline::new(ExtractOptions::default());
/// let doc = pipeline.extract_path("report.doc")?;
/// println!("[{} / {}] {}", doc.strategy, doc.codepage, doc.text);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct ExtractionPipeline {
    options: ExtractOptions,
    cleaner: TextCleaner,
    strategies: Vec<Box<dyn Strategy>>,
}

impl Default for ExtractionPipeline {
    fn default() -> Self {
        Self::new(ExtractOptions::default())
    }
}

impl fmt::Debug for ExtractionPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kinds: Vec<StrategyKind> = self.strategies.iter().map(|s| s.kind()).collect();
        f.debug_struct("ExtractionPipeline")
            .field("options", &self.options)
            .field("strategies", &kinds)
            .finish()
    }
}

impl ExtractionPipeline {
    /// Structured then heuristic; no native bridge.
    pub fn new(options: ExtractOptions) -> Self {
        let cleaner = TextCleaner::new(options.clean);
        Self {
            options,
            cleaner,
            strategies: vec![Box::new(StructuredStrategy), Box::new(HeuristicStrategy)],
        }
    }

    /// Try `bridge` before anything else for path inputs.
    pub fn with_native_bridge(mut self, bridge: impl NativeBridge + 'static) -> Self {
        self.strategies
            .retain(|s| s.kind() != StrategyKind::Native);
        self.strategies
            .insert(0, Box::new(NativeStrategy::new(Box::new(bridge))));
        self
    }

    /// Try `antiword` from `PATH` first.
    #[cfg(feature = "native")]
    pub fn with_antiword(self) -> Self {
        self.with_native_bridge(super::native::AntiwordBridge::new())
    }

    #[inline]
    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Strategies in the order they run.
    pub fn strategies(&self) -> impl Iterator<Item = StrategyKind> + '_ {
        self.strategies.iter().map(|s| s.kind())
    }

    /// Extract a `.doc` file from disk.
    pub fn extract_path(&self, path: impl AsRef<Path>) -> Result<ExtractedDocument> {
        let path = path.as_ref();
        let label = path.display().to_string();
        let data = std::fs::read(path).map_err(|e| ExtractError::io(&label, e))?;
        self.run(Bytes::from(data), Some(path), &label)
    }

    /// Extract an in-memory `.doc`. The native bridge is never used.
    pub fn extract_bytes(&self, data: impl Into<Bytes>) -> Result<ExtractedDocument> {
        self.run(data.into(), None, MEMORY_LABEL)
    }

    /// Extract several files on the rayon pool; results keep input order.
    pub fn extract_batch<P>(&self, paths: &[P]) -> Vec<Result<ExtractedDocument>>
    where
        P: AsRef<Path> + Sync,
    {
        paths.par_iter().map(|p| self.extract_path(p)).collect()
    }

    fn run(&self, data: Bytes, path: Option<&Path>, label: &str) -> Result<ExtractedDocument> {
        let package = match Package::open(data) {
            Ok(package) => package,
            Err(e) => {
                let err = ExtractError::from_doc_error(e, label);
                let Some(path) = path.filter(|_| matches!(err, ExtractError::CorruptContainer { .. })) else {
                    return Err(err);
                };
                warn!(source = label, error = %err, "container is damaged");
                return self.run_unopened(path, label).ok_or(err);
            }
        };
        let metadata = Metadata::from(package.metadata());
        let codepage = self.options.codepage_override.or(metadata.codepage);
        info!(source = label, codepage, "extracting");

        let ctx = ExtractionContext {
            package: &package,
            path,
            codepage,
            metadata: &metadata,
            options: &self.options,
            cleaner: &self.cleaner,
        };

        let mut partial: Option<ExtractedDocument> = None;
        for strategy in &self.strategies {
            match strategy.run(&ctx) {
                Outcome::Extracted(doc) => {
                    info!(
                        source = label,
                        strategy = %doc.strategy,
                        codepage = %doc.codepage,
                        chars = doc.text.chars().count(),
                        "extracted"
                    );
                    return Ok(doc);
                }
                Outcome::Fallback(reason, candidate) => {
                    debug!(source = label, strategy = %strategy.kind(), %reason, "falling through");
                    partial = better_partial(partial, candidate);
                }
            }
        }

        let doc = partial.unwrap_or_else(|| {
            ExtractedDocument::new(String::new(), encoding_for_codepage(codepage).name(), StrategyKind::Heuristic)
                .with_metadata(metadata.clone())
        });
        info!(source = label, strategy = %doc.strategy, chars = doc.text.chars().count(), "returning partial result");
        Ok(doc)
    }
}

impl ExtractionPipeline {
    /// Give strategies that read the file directly a chance at a container
    /// that failed to open.
    fn run_unopened(&self, path: &Path, label: &str) -> Option<ExtractedDocument> {
        self.strategies.iter().find_map(|strategy| {
            match strategy.run_unopened(path, &self.options, &self.cleaner)? {
                Outcome::Extracted(doc) => {
                    info!(source = label, strategy = %doc.strategy, chars = doc.text.chars().count(), "extracted");
                    Some(doc)
                }
                Outcome::Fallback(reason, _) => {
                    debug!(source = label, strategy = %strategy.kind(), %reason, "falling through");
                    None
                }
            }
        })
    }
}

/// Keep the partial with more meaningful characters; earlier wins ties.
fn better_partial(
    current: Option<ExtractedDocument>,
    candidate: Option<ExtractedDocument>,
) -> Option<ExtractedDocument> {
    match (current, candidate) {
        (Some(current), Some(candidate)) if candidate.meaningful_chars() > current.meaningful_chars() => {
            Some(candidate)
        }
        (Some(current), _) => Some(current),
        (None, candidate) => candidate,
    }
}

/// Extract one file with default options and no native bridge.
pub fn extract_path(path: impl AsRef<Path>) -> Result<ExtractedDocument> {
    ExtractionPipeline::default().extract_path(path)
}

/// Extract many files with default options, in parallel.
pub fn extract_batch(paths: &[PathBuf]) -> Vec<Result<ExtractedDocument>> {
    ExtractionPipeline::default().extract_batch(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::document::Confidence;
    use crate::extract::native::NativeError;
    use crate::ole::CompoundFileBuilder;
    use crate::ole::doc::fixtures::{BODY_OFFSET, DocFixture};
    use crate::ole::doc::parts::piece_table::clx_bytes;
    use std::io::Write;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const PHRASE: &str = "这是一个中文测试文档";
    const ENGLISH: &str = "The structured path returns this sentence exactly as it was written.";

    fn gbk(text: &str) -> Vec<u8> {
        encoding_rs::GBK.encode(text).0.into_owned()
    }

    fn utf16(text: &str) -> Vec<u8> {
        text.encode_utf16().flat_map(u16::to_le_bytes).collect()
    }

    fn temp_doc(bytes: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".doc").tempfile().unwrap();
        file.write_all(bytes).unwrap();
        file.flush().unwrap();
        file
    }

    struct FixedBridge {
        result: fn() -> std::result::Result<ExtractedDocument, NativeError>,
        calls: Arc<AtomicUsize>,
    }

    impl NativeBridge for FixedBridge {
        fn name(&self) -> &str {
            "fixed"
        }

        fn try_extract(&self, _path: &Path, _timeout: Duration) -> std::result::Result<ExtractedDocument, NativeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.result)()
        }
    }

    fn bridge(result: fn() -> std::result::Result<ExtractedDocument, NativeError>) -> (FixedBridge, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            FixedBridge {
                result,
                calls: Arc::clone(&calls),
            },
            calls,
        )
    }

    #[test]
    fn test_pipeline_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ExtractionPipeline>();
    }

    #[test]
    fn test_default_chain() {
        let pipeline = ExtractionPipeline::default();
        let kinds: Vec<_> = pipeline.strategies().collect();
        assert_eq!(kinds, [StrategyKind::Structured, StrategyKind::Heuristic]);

        let (b, _) = bridge(|| Err(NativeError::Empty));
        let (b2, _) = bridge(|| Err(NativeError::Empty));
        let pipeline = pipeline.with_native_bridge(b).with_native_bridge(b2);
        let kinds: Vec<_> = pipeline.strategies().collect();
        assert_eq!(
            kinds,
            [StrategyKind::Native, StrategyKind::Structured, StrategyKind::Heuristic]
        );
    }

    #[test]
    fn test_simple_path_text_is_returned_verbatim() {
        let bytes = DocFixture::simple(ENGLISH.as_bytes()).build();
        let doc = ExtractionPipeline::default().extract_bytes(bytes).unwrap();
        assert_eq!(doc.text, ENGLISH);
        assert_eq!(doc.strategy, StrategyKind::Structured);
        assert_eq!(doc.confidence, Confidence::High);
        assert_eq!(doc.codepage, "GBK");
        assert!(doc.warnings.is_empty());
    }

    #[test]
    fn test_piece_table_text() {
        let body = ENGLISH.as_bytes();
        let fc = ((BODY_OFFSET as u32) * 2) | 0x4000_0000;
        let clx = clx_bytes(Some(&[0xAA; 6]), &[(0, body.len() as u32, fc)]);
        let bytes = DocFixture::complex(body, clx, body.len() as u32).build();
        let doc = ExtractionPipeline::default().extract_bytes(bytes).unwrap();
        assert_eq!(doc.text, ENGLISH);
        assert_eq!(doc.strategy, StrategyKind::Structured);
    }

    #[test]
    fn test_missing_signature_is_fatal() {
        let pipeline = ExtractionPipeline::default();
        let err = pipeline.extract_bytes(b"Not a DOC file".repeat(200)).unwrap_err();
        assert!(matches!(err, ExtractError::NotACompoundFile { .. }));
        assert_eq!(err.path(), MEMORY_LABEL);
    }

    #[test]
    fn test_empty_input_is_fatal() {
        let err = ExtractionPipeline::default().extract_bytes(Vec::new()).unwrap_err();
        assert!(matches!(err, ExtractError::NotACompoundFile { .. }));
    }

    /// Point the first FAT sector far beyond the end of the file.
    fn damaged_fat(mut bytes: Vec<u8>) -> Vec<u8> {
        bytes[0x4C..0x50].copy_from_slice(&0xF000u32.to_le_bytes());
        bytes
    }

    #[test]
    fn test_damaged_container_is_not_called_foreign() {
        let bytes = damaged_fat(DocFixture::simple(ENGLISH.as_bytes()).build());
        let err = ExtractionPipeline::default().extract_bytes(bytes).unwrap_err();
        assert!(matches!(err, ExtractError::CorruptContainer { .. }));
        let message = err.to_string();
        assert!(message.contains("damaged"));
        assert!(!message.contains("not an OLE2"));
    }

    #[test]
    fn test_damaged_container_still_reaches_native_bridge() {
        let file = temp_doc(&damaged_fat(DocFixture::simple(ENGLISH.as_bytes()).build()));

        let (b, calls) = bridge(|| {
            Ok(ExtractedDocument::new(
                "Rescued by the converter".to_string(),
                "UTF-8",
                StrategyKind::Native,
            ))
        });
        let doc = ExtractionPipeline::default()
            .with_native_bridge(b)
            .extract_path(file.path())
            .unwrap();
        assert_eq!(doc.text, "Rescued by the converter");
        assert_eq!(doc.strategy, StrategyKind::Native);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let (b, calls) = bridge(|| Err(NativeError::Failed("cannot read".to_string())));
        let err = ExtractionPipeline::default()
            .with_native_bridge(b)
            .extract_path(file.path())
            .unwrap_err();
        assert!(matches!(err, ExtractError::CorruptContainer { .. }));
        assert_eq!(err.path(), file.path().display().to_string());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Foreign files never reach the bridge
        let (b, calls) = bridge(|| Err(NativeError::Empty));
        let foreign = temp_doc(b"plain text, not a compound file");
        let err = ExtractionPipeline::default()
            .with_native_bridge(b)
            .extract_path(foreign.path())
            .unwrap_err();
        assert!(matches!(err, ExtractError::NotACompoundFile { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_container_without_word_document_is_fatal() {
        let mut builder = CompoundFileBuilder::new();
        builder.create_stream("Workbook", &gbk(&PHRASE.repeat(20))).unwrap();
        let err = ExtractionPipeline::default()
            .extract_bytes(builder.build().unwrap())
            .unwrap_err();
        assert!(matches!(err, ExtractError::NotAWordBinary { .. }));
    }

    #[test]
    fn test_short_gbk_phrase_survives_as_partial() {
        let encoded = gbk(PHRASE);
        assert_eq!(encoded.len(), 20);
        let bytes = DocFixture::simple(&encoded).with_codepage(936).build();

        let doc = ExtractionPipeline::default().extract_bytes(bytes).unwrap();
        assert_eq!(doc.text, PHRASE);
        assert_eq!(doc.strategy, StrategyKind::Structured);
        assert_eq!(doc.codepage, "GBK");
        assert_eq!(doc.metadata.codepage, Some(936));
    }

    #[test]
    fn test_malformed_clx_falls_back_to_heuristic() {
        let recovered = PHRASE.repeat(12);
        let bytes = DocFixture::complex(b"body", vec![0x03, 0x00, 0x00, 0x00], 4)
            .with_stream("Recovered", &gbk(&recovered))
            .build();

        let doc = ExtractionPipeline::default().extract_bytes(bytes).unwrap();
        assert_eq!(doc.strategy, StrategyKind::Heuristic);
        assert_eq!(doc.confidence, Confidence::Low);
        assert_eq!(doc.text, recovered);
        assert_eq!(doc.codepage, "GBK");
        assert!(doc.warnings.is_empty());
    }

    #[test]
    fn test_truncated_file_keeps_recoverable_text() {
        let recovered = PHRASE.repeat(300);
        let mut bytes = DocFixture::simple(b"short")
            .with_stream("Recovered", &gbk(&recovered))
            .build();
        // Cut the last two sectors of the Recovered stream
        bytes.truncate(bytes.len() - 1024);

        let doc = ExtractionPipeline::default().extract_bytes(bytes).unwrap();
        assert_eq!(doc.strategy, StrategyKind::Heuristic);
        assert_eq!(doc.text, PHRASE.repeat(256));
        assert_eq!(doc.codepage, "GBK");
    }

    #[test]
    fn test_low_cjk_heuristic_result_gets_caveat() {
        let latin = "The quick brown fox jumps over the lazy dog. ".repeat(4);
        let bytes = DocFixture::simple(b"short")
            .with_stream("Latin", &utf16(&latin))
            .build();

        let doc = ExtractionPipeline::default().extract_bytes(bytes).unwrap();
        assert_eq!(doc.strategy, StrategyKind::Heuristic);
        assert_eq!(doc.confidence, Confidence::Low);
        assert_eq!(doc.text, latin.trim());
        assert_eq!(doc.warnings.len(), 1);
        assert!(doc.warnings[0].contains("CJK density"));
    }

    #[test]
    fn test_nothing_recovered_returns_empty_success() {
        let bytes = DocFixture::simple(b"").with_flags(0x0100).build();
        let doc = ExtractionPipeline::default().extract_bytes(bytes).unwrap();
        assert!(doc.text.is_empty());
        assert_eq!(doc.strategy, StrategyKind::Heuristic);
        assert_eq!(doc.confidence, Confidence::Low);
    }

    #[test]
    fn test_declared_codepage_and_override() {
        let text = "Café crème brûlée à la carte, déjà vu, naïve façade, résumé and piñata.";
        let (latin1, _, _) = encoding_rs::WINDOWS_1252.encode(text);
        let bytes = DocFixture::simple(&latin1).with_codepage(1252).build();
        let doc = ExtractionPipeline::default().extract_bytes(bytes).unwrap();
        assert_eq!(doc.text, text);
        assert_eq!(doc.codepage, "windows-1252");

        let bytes = DocFixture::simple(&latin1).build();
        let options = ExtractOptions::new().with_codepage(1252);
        let doc = ExtractionPipeline::new(options).extract_bytes(bytes).unwrap();
        assert_eq!(doc.text, text);
    }

    #[test]
    fn test_metadata_travels_with_result() {
        let bytes = DocFixture::simple(ENGLISH.as_bytes()).with_author(b"Zhang Wei").build();
        let doc = ExtractionPipeline::default().extract_bytes(bytes).unwrap();
        assert_eq!(doc.metadata.author.as_deref(), Some("Zhang Wei"));
    }

    #[test]
    fn test_extract_path_and_errors_name_the_file() {
        let file = temp_doc(&DocFixture::simple(ENGLISH.as_bytes()).build());
        let doc = ExtractionPipeline::default().extract_path(file.path()).unwrap();
        assert_eq!(doc.text, ENGLISH);

        let bad = temp_doc(b"plain text, not a compound file");
        let err = extract_path(bad.path()).unwrap_err();
        assert_eq!(err.path(), bad.path().display().to_string());

        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.doc");
        let err = extract_path(&missing).unwrap_err();
        assert!(matches!(err, ExtractError::Io { .. }));
    }

    #[test]
    fn test_batch_keeps_input_order() {
        let first = temp_doc(&DocFixture::simple(ENGLISH.as_bytes()).build());
        let second = temp_doc(b"garbage");
        let third = temp_doc(&DocFixture::simple(&gbk(PHRASE)).build());
        let paths = vec![
            first.path().to_path_buf(),
            second.path().to_path_buf(),
            third.path().to_path_buf(),
        ];

        let results = extract_batch(&paths);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().text, ENGLISH);
        assert!(matches!(results[1], Err(ExtractError::NotACompoundFile { .. })));
        assert_eq!(results[2].as_ref().unwrap().text, PHRASE);
    }

    #[test]
    fn test_native_bridge_wins_for_paths() {
        let (b, calls) = bridge(|| {
            Ok(ExtractedDocument::new(
                "Native output\r\n\u{0001}".to_string(),
                "UTF-8",
                StrategyKind::Native,
            ))
        });
        let pipeline = ExtractionPipeline::default().with_native_bridge(b);
        let fixture = DocFixture::simple(ENGLISH.as_bytes()).with_author(b"Li");
        let file = temp_doc(&fixture.build());

        let doc = pipeline.extract_path(file.path()).unwrap();
        assert_eq!(doc.text, "Native output");
        assert_eq!(doc.strategy, StrategyKind::Native);
        assert_eq!(doc.metadata.author.as_deref(), Some("Li"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // In-memory input never reaches the bridge
        let doc = pipeline.extract_bytes(fixture.build()).unwrap();
        assert_eq!(doc.strategy, StrategyKind::Structured);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_native_failure_falls_through() {
        let (b, calls) = bridge(|| Err(NativeError::Timeout(Duration::from_secs(30))));
        let pipeline = ExtractionPipeline::default().with_native_bridge(b);
        let file = temp_doc(&DocFixture::simple(ENGLISH.as_bytes()).build());

        let doc = pipeline.extract_path(file.path()).unwrap();
        assert_eq!(doc.strategy, StrategyKind::Structured);
        assert_eq!(doc.text, ENGLISH);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_better_partial_prefers_longer_then_earlier() {
        let short = ExtractedDocument::new("ab".to_string(), "GBK", StrategyKind::Structured);
        let empty = ExtractedDocument::new(String::new(), "GBK", StrategyKind::Heuristic);
        let kept = better_partial(Some(short.clone()), Some(empty.clone())).unwrap();
        assert_eq!(kept.strategy, StrategyKind::Structured);
        let kept = better_partial(None, Some(empty)).unwrap();
        assert_eq!(kept.strategy, StrategyKind::Heuristic);
        assert!(better_partial(None, None).is_none());
    }
}
