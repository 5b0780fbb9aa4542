//! Command-line tool for recovering text from legacy Word (.doc) files.
//!
//! # Usage
//!
//! Basic extraction:
//! ```sh
//! cargo run --example extract_doc -- report.doc
//! ```
//!
//! Force a codepage and skip antiword:
//! ```sh
//! cargo run --example extract_doc -- --codepage 950 --no-native *.doc
//! ```
//!
//! Machine-readable output, with decisions logged:
//! ```sh
//! RUST_LOG=docsift=debug cargo run --example extract_doc -- --json report.doc
//! ```

use clap::Parser;
use docsift::{ExtractOptions, ExtractedDocument, ExtractionPipeline};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Recover text and metadata from .doc files
#[derive(Parser, Debug)]
#[command(
    name = "extract_doc",
    about = "Recover text and metadata from legacy Word binary (.doc) files",
    version
)]
struct Args {
    /// Input file(s)
    #[arg(value_name = "INPUT", required = true)]
    input: Vec<PathBuf>,

    /// Codepage for 8-bit text, overriding the one the document declares
    #[arg(long, value_name = "CODEPAGE")]
    codepage: Option<u32>,

    /// Do not try antiword first
    #[arg(long)]
    no_native: bool,

    /// Seconds to wait for antiword
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    /// Print each result as JSON
    #[arg(long)]
    json: bool,

    /// Omit metadata from the text report
    #[arg(long)]
    no_metadata: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("docsift=info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut options = ExtractOptions::new().with_native_timeout(Duration::from_secs(args.timeout));
    if let Some(codepage) = args.codepage {
        options = options.with_codepage(codepage);
    }

    let mut pipeline = ExtractionPipeline::new(options);
    if !args.no_native {
        pipeline = pipeline.with_antiword();
    }

    let mut failed = 0usize;
    let results = pipeline.extract_batch(&args.input);
    for (path, result) in args.input.iter().zip(results) {
        match result {
            Ok(doc) if args.json => match serde_json::to_string_pretty(&doc) {
                Ok(json) => println!("{json}"),
                Err(e) => {
                    eprintln!("❌ {}: {}", path.display(), e);
                    failed += 1;
                }
            },
            Ok(doc) => print_report(&path.display().to_string(), &doc, !args.no_metadata),
            Err(e) => {
                eprintln!("❌ {e}");
                failed += 1;
            }
        }
    }

    if failed > 0 {
        eprintln!("\n{} of {} file(s) failed", failed, args.input.len());
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn print_report(label: &str, doc: &ExtractedDocument, with_metadata: bool) {
    println!("📄 {label}");
    println!("{}", "-".repeat(60));
    println!("  Strategy:   {}", doc.strategy);
    println!("  Codepage:   {}", doc.codepage);
    println!("  Confidence: {:?}", doc.confidence);
    for warning in &doc.warnings {
        println!("  ⚠️  {warning}");
    }

    if with_metadata && doc.metadata.has_data() {
        let m = &doc.metadata;
        let fields = [
            ("Title", m.title.clone()),
            ("Subject", m.subject.clone()),
            ("Author", m.author.clone()),
            ("Last saved by", m.last_modified_by.clone()),
            ("Created", m.created.map(|d| d.to_rfc3339())),
            ("Modified", m.modified.map(|d| d.to_rfc3339())),
            ("Application", m.application.clone()),
            ("Codepage", m.codepage.map(|c| c.to_string())),
        ];
        for (name, value) in fields {
            if let Some(value) = value {
                println!("  {:<14}{}", format!("{name}:"), value);
            }
        }
    }

    println!("{}", "-".repeat(60));
    println!("{}\n", doc.text);
}
