//! # pdf2corpus
//!
//! OCR scanned PDF books page by page in parallel, then filter the extracted
//! text down to a clean single-script corpus (Kannada by default).
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input      validate the path and PDF magic bytes
//!  ├─ 2. Count      page count from document metadata
//!  ├─ 3. OCR        N pages, `concurrency` at a time:
//!  │                render (pdfium) ─▶ recognize (tesseract child process)
//!  ├─ 4. Assemble   `--- Page N ---` segments in page order, placeholders
//!  │                for failed pages, staged write + rename
//!  └─ 5. Filter     10-rule line cleaning, keep target-script lines
//! ```
//!
//! A failed page never fails the document: it shows up as
//! `[ERROR page N: reason]` in the assembled text and is dropped by the
//! filter. Only document-level problems (unreadable file, zero pages, pool
//! failure, write failure) are returned as [`CorpusError`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2corpus::{ingest_document, OcrConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = OcrConfig::builder().concurrency(8).build()?;
//!     let report = ingest_document("book.pdf", "book_ocr.txt", "book_cleaned.txt", &config).await;
//!     if report.is_completed() {
//!         println!("{} lines kept", report.kept_lines);
//!     } else {
//!         eprintln!("failed: {}", report.error.unwrap_or_default());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2corpus` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdf2corpus = { version = "0.1", default-features = false }
//! ```
//!
//! ## Runtime requirements
//!
//! The default capabilities need the pdfium shared library (system search
//! path or `PDFIUM_LIB_PATH`) and a `tesseract` executable with the requested
//! language data installed. Both can be replaced through
//! [`OcrConfigBuilder::renderer`] and [`OcrConfigBuilder::recognizer`].

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{OcrConfig, OcrConfigBuilder, ScriptBlock};
pub use convert::{
    clean_file, clean_text, ingest_document, inspect, ocr, ocr_sync, ocr_to_file, ocr_to_string,
};
pub use error::{CapabilityError, CorpusError, ErrorKind, PageError};
pub use output::{
    BatchOutcome, BatchStats, CleanOutcome, DocumentMetadata, IngestReport, IngestStatus,
    PageOutcome, PageResult,
};
pub use pipeline::clean::LineCleaner;
pub use pipeline::recognize::{PageRecognizer, TesseractRecognizer};
pub use pipeline::render::{PageRenderer, PdfiumRenderer};
pub use progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback};
