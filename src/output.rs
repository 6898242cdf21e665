//! Result types produced by the OCR and cleaning stages.
//!
//! A page's outcome is a tagged type ([`PageOutcome`]) rather than a string
//! that happens to start with `[ERROR`. The assembler decides how a failure is
//! rendered; nothing downstream has to sniff text to tell the two apart.

use crate::error::{ErrorKind, PageError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// What happened to one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PageOutcome {
    /// Recognised text for the page (may be empty for a blank page).
    Success { text: String },
    /// The page could not be rendered or recognised.
    Failure { error: PageError },
}

impl PageOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, PageOutcome::Success { .. })
    }
}

/// Outcome of one page job, produced exactly once by the worker that ran it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageResult {
    /// 1-indexed page number.
    pub page_num: usize,
    pub outcome: PageOutcome,
    /// Wall-clock time spent rendering and recognising this page.
    pub duration_ms: u64,
}

impl PageResult {
    pub fn success(page_num: usize, text: impl Into<String>) -> Self {
        Self {
            page_num,
            outcome: PageOutcome::Success { text: text.into() },
            duration_ms: 0,
        }
    }

    pub fn failure(error: PageError) -> Self {
        Self {
            page_num: error.page(),
            outcome: PageOutcome::Failure { error },
            duration_ms: 0,
        }
    }

    pub fn error(&self) -> Option<&PageError> {
        match &self.outcome {
            PageOutcome::Failure { error } => Some(error),
            PageOutcome::Success { .. } => None,
        }
    }
}

/// Every page result for one document, keyed by page number.
///
/// On the success path of [`crate::pipeline::orchestrate::process_pages`]
/// the map holds exactly the keys `1..=total_pages`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub total_pages: usize,
    pub results: HashMap<usize, PageResult>,
    pub elapsed_ms: u64,
}

impl BatchOutcome {
    /// True when every page in `1..=total_pages` has a result.
    pub fn is_complete(&self) -> bool {
        (1..=self.total_pages).all(|p| self.results.contains_key(&p))
    }

    pub fn get(&self, page_num: usize) -> Option<&PageResult> {
        self.results.get(&page_num)
    }

    pub fn succeeded_pages(&self) -> usize {
        self.results
            .values()
            .filter(|r| r.outcome.is_success())
            .count()
    }

    pub fn failed_pages(&self) -> usize {
        self.results.len() - self.succeeded_pages()
    }

    pub fn stats(&self) -> BatchStats {
        BatchStats {
            total_pages: self.total_pages,
            processed_pages: self.succeeded_pages(),
            failed_pages: self.failed_pages(),
            missing_pages: self.total_pages.saturating_sub(self.results.len()),
            duration_ms: self.elapsed_ms,
        }
    }
}

/// Summary counters for one OCR run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    pub total_pages: usize,
    pub processed_pages: usize,
    pub failed_pages: usize,
    /// Pages with no result at all; zero unless the pool misbehaved.
    pub missing_pages: usize,
    pub duration_ms: u64,
}

/// Document-level metadata reported by the renderer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<String>,
    pub modification_date: Option<String>,
    pub page_count: usize,
    pub pdf_version: String,
}

/// Result of filtering one text to the target script.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanOutcome {
    pub text: String,
    pub kept_lines: usize,
}

/// Final status of one document, as handed to the persistence sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestStatus {
    Completed,
    Failed,
}

/// Everything a caller needs to persist the outcome of [`crate::convert::ingest_document`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestReport {
    pub document: PathBuf,
    pub status: IngestStatus,
    /// Human-readable failure reason when `status == Failed`.
    pub error: Option<String>,
    pub error_kind: Option<ErrorKind>,
    /// Cleaned corpus text; empty on failure.
    pub content: String,
    pub kept_lines: usize,
    pub ocr_path: PathBuf,
    pub cleaned_path: PathBuf,
    pub stats: Option<BatchStats>,
    pub elapsed_ms: u64,
}

impl IngestReport {
    pub fn is_completed(&self) -> bool {
        self.status == IngestStatus::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome_with(pages: &[(usize, bool)], total: usize) -> BatchOutcome {
        let results = pages
            .iter()
            .map(|&(p, ok)| {
                let r = if ok {
                    PageResult::success(p, "text")
                } else {
                    PageResult::failure(PageError::NoImage { page: p })
                };
                (p, r)
            })
            .collect();
        BatchOutcome {
            total_pages: total,
            results,
            elapsed_ms: 5,
        }
    }

    #[test]
    fn complete_when_every_page_present() {
        let o = outcome_with(&[(1, true), (2, false), (3, true)], 3);
        assert!(o.is_complete());
        let s = o.stats();
        assert_eq!(s.processed_pages, 2);
        assert_eq!(s.failed_pages, 1);
        assert_eq!(s.missing_pages, 0);
    }

    #[test]
    fn incomplete_when_a_page_is_missing() {
        let o = outcome_with(&[(1, true), (3, true)], 3);
        assert!(!o.is_complete());
        assert_eq!(o.stats().missing_pages, 1);
    }

    #[test]
    fn failure_result_takes_page_from_error() {
        let r = PageResult::failure(PageError::RenderFailed {
            page: 4,
            detail: "bad xref".into(),
        });
        assert_eq!(r.page_num, 4);
        assert!(r.error().is_some());
    }

    #[test]
    fn page_outcome_serialises_tagged() {
        let json = serde_json::to_string(&PageOutcome::Success { text: "ಕ".into() }).unwrap();
        assert!(json.contains("\"status\":\"success\""), "got: {json}");
    }
}
