//! Bridge to an external `.doc` text extractor.
//!
//! The bridge is tried first for filesystem inputs. Every invocation is
//! bounded by [`ExtractOptions::native_timeout`](super::ExtractOptions); an
//! overrun kills the child process and the pipeline moves on.

use super::document::{ExtractedDocument, StrategyKind};
use super::options::ExtractOptions;
use super::strategy::{ExtractionContext, FallbackReason, Outcome, Strategy};
use crate::common::Metadata;
use crate::text::TextCleaner;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Native bridge failures. None of them is fatal to the pipeline.
#[derive(Debug, Error)]
pub enum NativeError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("unavailable: {0}")]
    Unavailable(String),
    #[error("failed: {0}")]
    Failed(String),
    #[error("produced no text")]
    Empty,
}

/// An external application that converts a `.doc` file to text.
pub trait NativeBridge: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Extract the text of the file at `path`, giving up after `timeout`.
    ///
    /// The returned document is cleaned and given metadata by the pipeline.
    fn try_extract(&self, path: &Path, timeout: Duration) -> Result<ExtractedDocument, NativeError>;
}

/// Pipeline step wrapping a [`NativeBridge`].
pub struct NativeStrategy {
    bridge: Box<dyn NativeBridge>,
}

impl NativeStrategy {
    pub fn new(bridge: Box<dyn NativeBridge>) -> Self {
        Self { bridge }
    }

    fn extract(&self, path: &Path, options: &ExtractOptions, cleaner: &TextCleaner, metadata: &Metadata) -> Outcome {
        let mut doc = match self.bridge.try_extract(path, options.native_timeout) {
            Ok(doc) => doc,
            Err(e) => {
                debug!(bridge = self.bridge.name(), error = %e, "native bridge declined");
                return Outcome::Fallback(e.into(), None);
            }
        };

        doc.text = cleaner.clean(&doc.text);
        if doc.is_empty() {
            return Outcome::Fallback(NativeError::Empty.into(), None);
        }
        doc.strategy = StrategyKind::Native;
        doc.metadata = metadata.clone();
        Outcome::Extracted(doc)
    }
}

impl Strategy for NativeStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Native
    }

    fn run(&self, ctx: &ExtractionContext<'_>) -> Outcome {
        let Some(path) = ctx.path else {
            return Outcome::Fallback(FallbackReason::NotEligible("input is not a file"), None);
        };
        self.extract(path, ctx.options, ctx.cleaner, ctx.metadata)
    }

    fn run_unopened(&self, path: &Path, options: &ExtractOptions, cleaner: &TextCleaner) -> Option<Outcome> {
        Some(self.extract(path, options, cleaner, &Metadata::default()))
    }
}

#[cfg(feature = "native")]
pub use self::antiword::AntiwordBridge;

#[cfg(feature = "native")]
mod antiword {
    use super::{NativeBridge, NativeError};
    use crate::extract::document::{ExtractedDocument, StrategyKind};
    use std::io::ErrorKind;
    use std::path::{Path, PathBuf};
    use std::process::Stdio;
    use std::time::Duration;
    use tokio::process::Command;

    /// Runs `antiword <path>` in a child process.
    #[derive(Debug, Clone)]
    pub struct AntiwordBridge {
        program: PathBuf,
    }

    impl Default for AntiwordBridge {
        fn default() -> Self {
            Self::with_program("antiword")
        }
    }

    impl AntiwordBridge {
        pub fn new() -> Self {
            Self::default()
        }

        /// Use a different executable with the same calling convention.
        pub fn with_program(program: impl Into<PathBuf>) -> Self {
            Self {
                program: program.into(),
            }
        }

        fn block_on(&self, path: &Path, limit: Duration) -> Result<ExtractedDocument, NativeError> {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(|e| NativeError::Unavailable(format!("cannot start runtime: {e}")))?;
            runtime.block_on(self.run(path, limit))
        }

        async fn run(&self, path: &Path, limit: Duration) -> Result<ExtractedDocument, NativeError> {
            let child = Command::new(&self.program)
                .arg(path)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .spawn()
                .map_err(|e| match e.kind() {
                    ErrorKind::NotFound => NativeError::Unavailable(format!("{} not found", self.program.display())),
                    _ => NativeError::Unavailable(e.to_string()),
                })?;

            // Dropping the future on timeout drops the child, which kills it.
            let output = match tokio::time::timeout(limit, child.wait_with_output()).await {
                Ok(result) => result.map_err(|e| NativeError::Failed(e.to_string()))?,
                Err(_) => return Err(NativeError::Timeout(limit)),
            };

            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                return Err(NativeError::Failed(format!("{}: {}", output.status, stderr.trim())));
            }

            let text = String::from_utf8_lossy(&output.stdout).into_owned();
            if text.trim().is_empty() {
                return Err(NativeError::Empty);
            }
            Ok(ExtractedDocument::new(text, "UTF-8", StrategyKind::Native))
        }
    }

    impl NativeBridge for AntiwordBridge {
        fn name(&self) -> &str {
            "antiword"
        }

        fn try_extract(&self, path: &Path, timeout: Duration) -> Result<ExtractedDocument, NativeError> {
            // A runtime cannot block inside another one, so async callers get a
            // private runtime on a scoped thread.
            if tokio::runtime::Handle::try_current().is_err() {
                return self.block_on(path, timeout);
            }
            std::thread::scope(|scope| {
                scope
                    .spawn(|| self.block_on(path, timeout))
                    .join()
                    .unwrap_or_else(|_| Err(NativeError::Failed("bridge thread panicked".to_string())))
            })
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_missing_program_is_unavailable() {
            let bridge = AntiwordBridge::with_program("/nonexistent/docsift-antiword");
            let err = bridge
                .try_extract(Path::new("a.doc"), Duration::from_secs(1))
                .unwrap_err();
            assert!(matches!(err, NativeError::Unavailable(_)));
        }

        #[cfg(unix)]
        #[test]
        fn test_stdout_becomes_text() {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            std::io::Write::write_all(&mut file, b"Converted body text\n").unwrap();
            let bridge = AntiwordBridge::with_program("cat");
            let doc = bridge.try_extract(file.path(), Duration::from_secs(5)).unwrap();
            assert_eq!(doc.text, "Converted body text\n");
            assert_eq!(doc.strategy, StrategyKind::Native);
        }

        #[cfg(unix)]
        #[test]
        fn test_callable_from_async_context() {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            std::io::Write::write_all(&mut file, b"Converted inside a runtime\n").unwrap();
            let bridge = AntiwordBridge::with_program("cat");

            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            let doc = runtime
                .block_on(async { bridge.try_extract(file.path(), Duration::from_secs(5)) })
                .unwrap();
            assert_eq!(doc.text, "Converted inside a runtime\n");

            let err = runtime
                .block_on(async { AntiwordBridge::with_program("sleep").try_extract(Path::new("5"), Duration::from_millis(100)) })
                .unwrap_err();
            assert!(matches!(err, NativeError::Timeout(_)));
        }

        #[cfg(unix)]
        #[test]
        fn test_overrun_times_out() {
            let bridge = AntiwordBridge::with_program("sleep");
            let err = bridge
                .try_extract(Path::new("5"), Duration::from_millis(100))
                .unwrap_err();
            assert!(matches!(err, NativeError::Timeout(_)));
        }

        #[cfg(unix)]
        #[test]
        fn test_nonzero_exit_is_failure() {
            let bridge = AntiwordBridge::with_program("cat");
            let err = bridge
                .try_extract(Path::new("/nonexistent/file.doc"), Duration::from_secs(5))
                .unwrap_err();
            assert!(matches!(err, NativeError::Failed(_)));
        }
    }
}
