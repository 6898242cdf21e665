//! Parallel per-page OCR with bounded concurrency.
//!
//! Every page of the document becomes one [`PageJob`]. All jobs are fed into a
//! `buffer_unordered(workers)` stream up front; the stream keeps at most
//! `workers` jobs in flight and yields results as they finish, in whatever
//! order the capabilities happen to complete them. Each job runs its blocking
//! render + recognise calls on a `spawn_blocking` thread.
//!
//! Results are keyed by page number as they arrive. The single collector owns
//! the map, and each page number is written exactly once, so no lock is needed.
//!
//! A page that fails (no image, renderer error, recognizer error, worker
//! panic) becomes a [`PageOutcome::Failure`] for that page only. Only faults
//! that cannot be pinned on one page abort the batch.

use crate::config::OcrConfig;
use crate::error::{CorpusError, PageError};
use crate::output::{BatchOutcome, PageOutcome, PageResult};
use crate::pipeline::recognize::PageRecognizer;
use crate::pipeline::render::PageRenderer;
use crate::progress::ProgressCallback;
use futures::stream::{self, StreamExt};
use std::any::Any;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// One unit of work: a single page of a single document.
#[derive(Debug, Clone)]
pub struct PageJob {
    pub document: Arc<PathBuf>,
    /// 1-indexed page number.
    pub page_num: usize,
    pub dpi: u32,
    pub languages: Arc<str>,
}

/// Ask the renderer how many pages `document` has.
///
/// Zero pages is an error: there would be nothing to assemble.
pub async fn count_pages(
    renderer: Arc<dyn PageRenderer>,
    document: &Path,
) -> Result<usize, CorpusError> {
    let path = document.to_path_buf();
    let total = tokio::task::spawn_blocking(move || renderer.page_count(&path))
        .await
        .map_err(|e| CorpusError::MetadataUnavailable {
            path: document.to_path_buf(),
            detail: format!("page-count task failed: {e}"),
        })??;

    if total == 0 {
        return Err(CorpusError::NoPages {
            path: document.to_path_buf(),
        });
    }
    Ok(total)
}

/// Recognise every page of `document` and collect the results by page number.
///
/// # Returns
/// `Ok(BatchOutcome)` holding exactly one [`PageResult`] for each page in
/// `1..=total_pages`, whether that page succeeded or failed.
///
/// # Errors
/// - [`CorpusError::NoPages`] if `total_pages == 0`
/// - [`CorpusError::WorkerPoolFailed`] if a worker was cancelled by the
///   runtime or the pool produced an out-of-range or duplicate page
pub async fn process_pages(
    document: &Path,
    total_pages: usize,
    renderer: Arc<dyn PageRenderer>,
    recognizer: Arc<dyn PageRecognizer>,
    config: &OcrConfig,
) -> Result<BatchOutcome, CorpusError> {
    if total_pages == 0 {
        return Err(CorpusError::NoPages {
            path: document.to_path_buf(),
        });
    }

    let start = Instant::now();
    let workers = config.effective_workers(total_pages);
    info!(
        "OCR {}: {} pages, {} workers, languages '{}', {} DPI",
        document.display(),
        total_pages,
        workers,
        config.languages,
        config.dpi
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_start(total_pages);
    }

    let document = Arc::new(document.to_path_buf());
    let languages: Arc<str> = Arc::from(config.languages.as_str());

    let jobs = (1..=total_pages).map(|page_num| PageJob {
        document: Arc::clone(&document),
        page_num,
        dpi: config.dpi,
        languages: Arc::clone(&languages),
    });

    let mut completions = stream::iter(jobs.map(|job| {
        let renderer = Arc::clone(&renderer);
        let recognizer = Arc::clone(&recognizer);
        let progress = config.progress_callback.clone();
        run_job(job, renderer, recognizer, progress, total_pages)
    }))
    .buffer_unordered(workers);

    let mut results: HashMap<usize, PageResult> = HashMap::with_capacity(total_pages);
    while let Some(completed) = completions.next().await {
        let result = completed?;
        let page_num = result.page_num;
        if page_num == 0 || page_num > total_pages {
            return Err(CorpusError::WorkerPoolFailed {
                detail: format!("worker returned page {page_num} outside 1..={total_pages}"),
            });
        }
        if results.insert(page_num, result).is_some() {
            return Err(CorpusError::WorkerPoolFailed {
                detail: format!("page {page_num} produced more than one result"),
            });
        }
    }

    if results.len() != total_pages {
        return Err(CorpusError::WorkerPoolFailed {
            detail: format!(
                "collected {} results for {} pages",
                results.len(),
                total_pages
            ),
        });
    }

    let outcome = BatchOutcome {
        total_pages,
        results,
        elapsed_ms: start.elapsed().as_millis() as u64,
    };

    let succeeded = outcome.succeeded_pages();
    info!(
        "OCR complete: {}/{} pages recognised in {}ms",
        succeeded, total_pages, outcome.elapsed_ms
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_complete(total_pages, succeeded);
    }

    Ok(outcome)
}

/// Run one page job and always come back with a [`PageResult`] unless the
/// runtime itself cancelled the worker.
async fn run_job(
    job: PageJob,
    renderer: Arc<dyn PageRenderer>,
    recognizer: Arc<dyn PageRecognizer>,
    progress: Option<ProgressCallback>,
    total_pages: usize,
) -> Result<PageResult, CorpusError> {
    let page_num = job.page_num;
    let start = Instant::now();
    if let Some(ref cb) = progress {
        cb.on_page_start(page_num, total_pages);
    }

    let handle = tokio::task::spawn_blocking(move || {
        recognise_page(&job, renderer.as_ref(), recognizer.as_ref())
    });

    let outcome = match handle.await {
        Ok(outcome) => outcome,
        Err(e) if e.is_panic() => PageOutcome::Failure {
            error: PageError::WorkerPanicked {
                page: page_num,
                detail: panic_message(e.into_panic()),
            },
        },
        Err(e) => {
            return Err(CorpusError::WorkerPoolFailed {
                detail: format!("worker for page {page_num} was cancelled: {e}"),
            })
        }
    };

    match &outcome {
        PageOutcome::Success { text } => {
            debug!("Page {}: {} bytes recognised", page_num, text.len());
            if let Some(ref cb) = progress {
                cb.on_page_complete(page_num, total_pages, text.len());
            }
        }
        PageOutcome::Failure { error } => {
            warn!("{}", error);
            if let Some(ref cb) = progress {
                cb.on_page_error(page_num, total_pages, &error.to_string());
            }
        }
    }

    Ok(PageResult {
        page_num,
        outcome,
        duration_ms: start.elapsed().as_millis() as u64,
    })
}

/// Render then recognise one page. Errors from either capability are
/// returned as data.
fn recognise_page(
    job: &PageJob,
    renderer: &dyn PageRenderer,
    recognizer: &dyn PageRecognizer,
) -> PageOutcome {
    let page = job.page_num;
    let image = match renderer.render_page(&job.document, page, job.dpi) {
        Ok(Some(image)) => image,
        Ok(None) => {
            return PageOutcome::Failure {
                error: PageError::NoImage { page },
            }
        }
        Err(e) => {
            return PageOutcome::Failure {
                error: PageError::RenderFailed {
                    page,
                    detail: e.to_string(),
                },
            }
        }
    };

    match recognizer.recognize(&image, &job.languages) {
        Ok(text) => PageOutcome::Success { text },
        Err(e) => PageOutcome::Failure {
            error: PageError::RecognitionFailed {
                page,
                detail: e.to_string(),
            },
        },
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CapabilityError;
    use image::{DynamicImage, Rgba, RgbaImage};

    struct FixedRenderer {
        pages: usize,
    }

    impl PageRenderer for FixedRenderer {
        fn page_count(&self, _document: &Path) -> Result<usize, CorpusError> {
            Ok(self.pages)
        }

        fn render_page(
            &self,
            _document: &Path,
            page_num: usize,
            _dpi: u32,
        ) -> Result<Option<DynamicImage>, CapabilityError> {
            // Page number encoded in the image width so the recognizer can echo it.
            Ok(Some(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
                page_num as u32,
                1,
                Rgba([0, 0, 0, 255]),
            ))))
        }
    }

    struct EchoRecognizer;

    impl PageRecognizer for EchoRecognizer {
        fn recognize(
            &self,
            image: &DynamicImage,
            languages: &str,
        ) -> Result<String, CapabilityError> {
            Ok(format!("page {} [{}]", image.width(), languages))
        }
    }

    #[tokio::test]
    async fn every_page_gets_exactly_one_result() {
        let config = OcrConfig::builder().concurrency(3).build().unwrap();
        let outcome = process_pages(
            Path::new("book.pdf"),
            7,
            Arc::new(FixedRenderer { pages: 7 }),
            Arc::new(EchoRecognizer),
            &config,
        )
        .await
        .unwrap();

        assert!(outcome.is_complete());
        assert_eq!(outcome.results.len(), 7);
        for p in 1..=7 {
            assert_eq!(
                outcome.get(p).unwrap().outcome,
                PageOutcome::Success {
                    text: format!("page {p} [kan+eng]")
                }
            );
        }
    }

    #[tokio::test]
    async fn zero_pages_is_fatal() {
        let config = OcrConfig::default();
        let err = process_pages(
            Path::new("empty.pdf"),
            0,
            Arc::new(FixedRenderer { pages: 0 }),
            Arc::new(EchoRecognizer),
            &config,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, CorpusError::NoPages { .. }));
    }

    #[tokio::test]
    async fn count_pages_rejects_empty_document() {
        let err = count_pages(Arc::new(FixedRenderer { pages: 0 }), Path::new("e.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, CorpusError::NoPages { .. }));
        let n = count_pages(Arc::new(FixedRenderer { pages: 12 }), Path::new("b.pdf"))
            .await
            .unwrap();
        assert_eq!(n, 12);
    }

    #[test]
    fn panic_message_handles_str_and_string() {
        assert_eq!(panic_message(Box::new("boom")), "boom");
        assert_eq!(panic_message(Box::new(String::from("bang"))), "bang");
        assert_eq!(panic_message(Box::new(42u8)), "unknown panic");
    }
}
