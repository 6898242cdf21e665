//! Top-level entry points.
//!
//! [`ocr`] runs the parallel per-page recognition and returns the raw page
//! results. The other entry points are sinks over it:
//!
//! * [`ocr_to_file`]: assemble and commit through a staging file
//! * [`ocr_to_string`]: assemble in memory
//! * [`ingest_document`]: OCR, filter to the target script and report the
//!   outcome for persistence
//!
//! Dropping any of these futures before it completes (e.g. on Ctrl-C) never
//! promotes a final artifact. Page jobs already running on blocking threads
//! finish in the background; their results are discarded.

use crate::config::{OcrConfig, ScriptBlock};
use crate::error::CorpusError;
use crate::output::{
    BatchOutcome, BatchStats, CleanOutcome, DocumentMetadata, IngestReport, IngestStatus,
};
use crate::pipeline::clean::LineCleaner;
use crate::pipeline::recognize::{PageRecognizer, TesseractRecognizer};
use crate::pipeline::render::{PageRenderer, PdfiumRenderer};
use crate::pipeline::{assemble, filter, input, orchestrate};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Recognise every page of a PDF.
///
/// # Returns
/// `Ok(BatchOutcome)` with one result per page, even if some pages failed
/// (check [`BatchOutcome::failed_pages`]).
///
/// # Errors
/// Returns `Err(CorpusError)` only for fatal errors:
/// - File not found / permission denied / not a PDF
/// - Page count unavailable or zero pages
/// - Renderer backend unavailable
/// - Worker pool failure
pub async fn ocr(
    input_path: impl AsRef<Path>,
    config: &OcrConfig,
) -> Result<BatchOutcome, CorpusError> {
    let pdf_path = input::resolve_input(input_path)?;
    info!("Starting OCR: {}", pdf_path.display());

    let renderer = resolve_renderer(config)?;
    let recognizer = resolve_recognizer(config);

    let total_pages = orchestrate::count_pages(Arc::clone(&renderer), &pdf_path).await?;
    info!("PDF has {} pages", total_pages);

    orchestrate::process_pages(&pdf_path, total_pages, renderer, recognizer, config).await
}

/// OCR a PDF and commit the assembled text to `output_path`.
///
/// The text is written to `<output_path>.tmp` and renamed into place only
/// after every page has a result. A staging file left by an earlier run is
/// removed before any page is processed. On any error `output_path` is
/// untouched.
pub async fn ocr_to_file(
    input_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &OcrConfig,
) -> Result<BatchStats, CorpusError> {
    let pdf_path = input::resolve_input(input_path)?;
    assemble::discard_staging(output_path.as_ref()).await?;
    let outcome = ocr(pdf_path, config).await?;
    assemble::commit(&outcome, output_path.as_ref()).await?;
    Ok(outcome.stats())
}

/// OCR a PDF and return the assembled text without touching the filesystem.
pub async fn ocr_to_string(
    input_path: impl AsRef<Path>,
    config: &OcrConfig,
) -> Result<String, CorpusError> {
    let outcome = ocr(input_path, config).await?;
    Ok(assemble::assemble(&outcome))
}

/// Synchronous wrapper around [`ocr_to_string`].
///
/// Creates a temporary tokio runtime internally.
pub fn ocr_sync(input_path: impl AsRef<Path>, config: &OcrConfig) -> Result<String, CorpusError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| CorpusError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(ocr_to_string(input_path, config))
}

/// Extract PDF metadata without running recognition.
///
/// Does not require tesseract.
pub async fn inspect(
    input_path: impl AsRef<Path>,
    config: &OcrConfig,
) -> Result<DocumentMetadata, CorpusError> {
    let pdf_path = input::resolve_input(input_path)?;
    let renderer = resolve_renderer(config)?;
    let path = pdf_path.clone();
    tokio::task::spawn_blocking(move || renderer.metadata(&path))
        .await
        .map_err(|e| CorpusError::MetadataUnavailable {
            path: pdf_path,
            detail: format!("metadata task failed: {e}"),
        })?
}

/// Filter `raw` down to lines of `script`.
pub fn clean_text(raw: &str, script: ScriptBlock) -> CleanOutcome {
    filter::clean_text(raw, &LineCleaner::new(script))
}

/// Filter the file at `input` into `output`, returning the kept-line count.
///
/// Runs on a blocking thread; `output` is replaced atomically.
pub async fn clean_file(
    input_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    script: ScriptBlock,
) -> Result<usize, CorpusError> {
    let input_path = input_path.as_ref().to_path_buf();
    let output_path = output_path.as_ref().to_path_buf();
    let cleaner = LineCleaner::new(script);
    let task_input = input_path.clone();
    tokio::task::spawn_blocking(move || filter::clean_file(&task_input, &output_path, &cleaner))
        .await
        .map_err(|e| {
            CorpusError::Internal(format!(
                "clean task for '{}' failed: {e}",
                input_path.display()
            ))
        })?
}

/// OCR a document, filter it to the configured script and report the result.
///
/// Steps:
/// 1. OCR to `ocr_path` (staged commit)
/// 2. Clean `ocr_path` into `cleaned_path`
/// 3. Read the cleaned text back into the report
///
/// Never returns an error: every failure becomes an [`IngestReport`] with
/// [`IngestStatus::Failed`]. On failure the OCR file, its staging file and
/// the cleaned file are removed, including any left by an earlier run.
pub async fn ingest_document(
    input_path: impl AsRef<Path>,
    ocr_path: impl AsRef<Path>,
    cleaned_path: impl AsRef<Path>,
    config: &OcrConfig,
) -> IngestReport {
    let start = Instant::now();
    let document = input_path.as_ref().to_path_buf();
    let ocr_path = ocr_path.as_ref().to_path_buf();
    let cleaned_path = cleaned_path.as_ref().to_path_buf();

    let mut report = IngestReport {
        document: document.clone(),
        status: IngestStatus::Failed,
        error: None,
        error_kind: None,
        content: String::new(),
        kept_lines: 0,
        ocr_path: ocr_path.clone(),
        cleaned_path: cleaned_path.clone(),
        stats: None,
        elapsed_ms: 0,
    };

    match run_ingest(&document, &ocr_path, &cleaned_path, config, &mut report).await {
        Ok(()) => {
            report.status = IngestStatus::Completed;
            info!(
                "Ingested {}: {} lines kept",
                document.display(),
                report.kept_lines
            );
        }
        Err(e) => {
            error!("Ingest of {} failed: {}", document.display(), e);
            report.error = Some(e.to_string());
            report.error_kind = Some(e.kind());
            report.content.clear();
            report.kept_lines = 0;
            remove_if_present(&ocr_path).await;
            remove_if_present(&assemble::staging_path(&ocr_path)).await;
            remove_if_present(&cleaned_path).await;
        }
    }

    report.elapsed_ms = start.elapsed().as_millis() as u64;
    report
}

async fn run_ingest(
    document: &Path,
    ocr_path: &Path,
    cleaned_path: &Path,
    config: &OcrConfig,
    report: &mut IngestReport,
) -> Result<(), CorpusError> {
    report.stats = Some(ocr_to_file(document, ocr_path, config).await?);
    report.kept_lines = clean_file(ocr_path, cleaned_path, config.script).await?;
    report.content = tokio::fs::read_to_string(cleaned_path)
        .await
        .map_err(|source| CorpusError::CleanFailed {
            path: cleaned_path.to_path_buf(),
            source,
        })?;
    Ok(())
}

async fn remove_if_present(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => info!("Removed {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Could not remove {}: {}", path.display(), e),
    }
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// The renderer to use: the injected one if present, otherwise pdfium.
fn resolve_renderer(config: &OcrConfig) -> Result<Arc<dyn PageRenderer>, CorpusError> {
    if let Some(ref renderer) = config.renderer {
        return Ok(Arc::clone(renderer));
    }
    Ok(Arc::new(PdfiumRenderer::new(config)?))
}

/// The recognizer to use: the injected one if present, otherwise tesseract.
fn resolve_recognizer(config: &OcrConfig) -> Arc<dyn PageRecognizer> {
    match config.recognizer {
        Some(ref recognizer) => Arc::clone(recognizer),
        None => Arc::new(TesseractRecognizer::from_config(config)),
    }
}
