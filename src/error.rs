//! Error types for the pdf2corpus library.
//!
//! Three error types reflect three distinct failure scopes:
//!
//! * [`CorpusError`]: **Fatal** for one document. The batch cannot proceed
//!   or its output cannot be committed (unreadable PDF, zero pages, staging
//!   write failed). Returned as `Err(CorpusError)` from the entry points in
//!   [`crate::convert`].
//!
//! * [`PageError`]: **Non-fatal**. A single page could not be rendered or
//!   recognised. Stored inside [`crate::output::PageOutcome::Failure`] and
//!   rendered as a placeholder at that page's position in the assembled text.
//!
//! * [`CapabilityError`]: reported by a [`crate::pipeline::render::PageRenderer`]
//!   or [`crate::pipeline::recognize::PageRecognizer`] implementation.
//!   The orchestrator folds it into a [`PageError`] for the page at hand.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdf2corpus library.
///
/// Page-level failures use [`PageError`] and never surface here.
#[derive(Debug, Error)]
pub enum CorpusError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── Orchestration errors ──────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}\nTry repairing with: qpdf --decrypt input.pdf output.pdf")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// Page count could not be determined.
    #[error("Could not read PDF info for '{path}': {detail}")]
    MetadataUnavailable { path: PathBuf, detail: String },

    /// The document reports zero pages; there is nothing to recognise.
    #[error("No pages found in '{path}'")]
    NoPages { path: PathBuf },

    /// The worker pool failed in a way no single page can be blamed for.
    #[error("Worker pool failed: {detail}")]
    WorkerPoolFailed { detail: String },

    /// The rendering backend could not be initialised.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Install pdfium for your platform, or set PDFIUM_LIB_PATH=/path/to/libpdfium\n\
to point at an existing copy.\n"
    )]
    RendererUnavailable(String),

    // ── Assembly errors ───────────────────────────────────────────────────
    /// Could not write the staging file for the assembled text.
    #[error("Failed to write staging file '{path}': {source}")]
    StagingWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The staging file was written but could not be moved into place.
    #[error("Failed to promote '{staging}' to '{path}': {source}")]
    PromotionFailed {
        staging: PathBuf,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Cleaning errors ───────────────────────────────────────────────────
    /// Reading the raw text or writing the cleaned corpus failed.
    #[error("Failed to clean '{path}': {source}")]
    CleanFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification of a [`CorpusError`], reported to the persistence sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Input unreadable, zero pages, or the pool itself failed.
    Orchestration,
    /// Staging write or final promotion failed.
    Assembly,
    /// I/O failure while filtering the extracted text.
    Cleaning,
    /// Rejected configuration.
    Config,
    /// Anything else.
    Internal,
}

impl CorpusError {
    /// Which part of the pipeline this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CorpusError::FileNotFound { .. }
            | CorpusError::PermissionDenied { .. }
            | CorpusError::NotAPdf { .. }
            | CorpusError::CorruptPdf { .. }
            | CorpusError::PasswordRequired { .. }
            | CorpusError::WrongPassword { .. }
            | CorpusError::MetadataUnavailable { .. }
            | CorpusError::NoPages { .. }
            | CorpusError::WorkerPoolFailed { .. }
            | CorpusError::RendererUnavailable(_) => ErrorKind::Orchestration,
            CorpusError::StagingWriteFailed { .. } | CorpusError::PromotionFailed { .. } => {
                ErrorKind::Assembly
            }
            CorpusError::CleanFailed { .. } => ErrorKind::Cleaning,
            CorpusError::InvalidConfig(_) => ErrorKind::Config,
            CorpusError::Internal(_) => ErrorKind::Internal,
        }
    }
}

/// A non-fatal error for a single page.
///
/// Stored in [`crate::output::PageOutcome::Failure`]. The batch always
/// continues; the assembled text carries a placeholder for the page instead.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// The renderer returned successfully but produced no image.
    #[error("Page {page}: renderer produced no image")]
    NoImage { page: usize },

    /// Page rasterisation failed.
    #[error("Page {page}: rasterisation failed: {detail}")]
    RenderFailed { page: usize, detail: String },

    /// The recognizer failed on the rendered image.
    #[error("Page {page}: recognition failed: {detail}")]
    RecognitionFailed { page: usize, detail: String },

    /// The worker processing this page panicked.
    #[error("Page {page}: worker panicked: {detail}")]
    WorkerPanicked { page: usize, detail: String },
}

impl PageError {
    /// The 1-indexed page this error belongs to.
    pub fn page(&self) -> usize {
        match self {
            PageError::NoImage { page }
            | PageError::RenderFailed { page, .. }
            | PageError::RecognitionFailed { page, .. }
            | PageError::WorkerPanicked { page, .. } => *page,
        }
    }

    /// The sentinel placeholder written in place of the page's text.
    ///
    /// Always a single line: whitespace runs in the detail, newlines
    /// included, become one space.
    pub fn placeholder(&self) -> String {
        match self {
            PageError::NoImage { page } => format!("[NO IMAGE for page {page}]"),
            PageError::RenderFailed { page, detail }
            | PageError::RecognitionFailed { page, detail }
            | PageError::WorkerPanicked { page, detail } => {
                let detail = detail.split_whitespace().collect::<Vec<_>>().join(" ");
                format!("[ERROR page {page}: {detail}]")
            }
        }
    }
}

/// Error reported by a rendering or recognition capability.
#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("{0}")]
    Message(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("timed out after {secs}s")]
    Timeout { secs: u64 },
}

impl CapabilityError {
    pub fn msg(detail: impl Into<String>) -> Self {
        CapabilityError::Message(detail.into())
    }
}
