/// Word (.doc) document support.
///
/// A .doc file is an OLE2 compound file containing several streams:
/// - **WordDocument**: the FIB followed by the document text
/// - **1Table** or **0Table**: the piece table and other structures
/// - **\x05SummaryInformation**: document metadata
///
/// # Example
///
/// ```rust,no_run
/// use docsift::ole::doc::Package;
///
/// let package = Package::open(std::fs::read("document.doc")?)?;
/// let fib = package.fib()?;
/// println!("nFib: 0x{:04X}, table stream: {}", fib.nfib, fib.table_stream_name());
///
/// let text = package.structured_text(None)?;
/// println!("{}", text.text);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub mod package;
pub mod parts;

#[cfg(test)]
pub(crate) mod fixtures;

pub use package::{DocError, Package, WORD_DOCUMENT_STREAM};
pub use parts::text::{StructuredError, StructuredText, TextSource};
