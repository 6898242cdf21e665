//! Assemble page results into one text blob and commit it atomically.
//!
//! Pages are always walked `1..=total_pages` in ascending order, no matter the
//! order the workers finished in. Each page becomes one segment:
//!
//! ```text
//! --- Page N ---
//! <payload>
//!
//! ```
//!
//! The payload is the recognised text, or a placeholder for a failed page, or
//! `[NO RESULT]` when the page has no entry at all.
//!
//! [`commit`] writes the blob to `<final>.tmp`, flushes it, then renames it
//! onto the final path. Readers of the final path see either the previous
//! file or the complete new one.

use crate::error::CorpusError;
use crate::output::{BatchOutcome, PageOutcome};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Placeholder for a page number with no entry in the result map.
pub const MISSING_PAGE: &str = "[NO RESULT]";

/// Render every page of `outcome` in ascending page order.
pub fn assemble(outcome: &BatchOutcome) -> String {
    let mut out = String::new();
    for page in 1..=outcome.total_pages {
        out.push_str(&format!("--- Page {page} ---\n"));
        match outcome.get(page).map(|r| &r.outcome) {
            Some(PageOutcome::Success { text }) => out.push_str(text.trim_end()),
            Some(PageOutcome::Failure { error }) => out.push_str(&error.placeholder()),
            None => out.push_str(MISSING_PAGE),
        }
        out.push_str("\n\n");
    }
    out
}

/// `<final>.tmp`, next to the final artifact so the rename stays on one
/// filesystem.
pub fn staging_path(final_path: &Path) -> PathBuf {
    let mut name = final_path.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Remove a staging file left next to `final_path` by an earlier run.
///
/// A missing staging file is not an error.
pub async fn discard_staging(final_path: &Path) -> Result<(), CorpusError> {
    let staging = staging_path(final_path);
    match tokio::fs::remove_file(&staging).await {
        Ok(()) => {
            debug!("Removed stale staging file {}", staging.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(CorpusError::StagingWriteFailed {
            path: staging,
            source,
        }),
    }
}

/// Assemble `outcome` and commit it to `final_path` via the staging file.
///
/// On error the staging file is removed and `final_path` is left exactly as
/// it was before the call.
pub async fn commit(outcome: &BatchOutcome, final_path: &Path) -> Result<(), CorpusError> {
    let text = assemble(outcome);
    commit_text(&text, final_path).await
}

/// Stage-then-rename write of an already assembled blob.
pub async fn commit_text(text: &str, final_path: &Path) -> Result<(), CorpusError> {
    let staging = staging_path(final_path);

    let result = stage_and_promote(text, &staging, final_path).await;
    if result.is_err() {
        if let Err(e) = tokio::fs::remove_file(&staging).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Could not remove staging file {}: {}", staging.display(), e);
            }
        }
    }
    result
}

async fn stage_and_promote(
    text: &str,
    staging: &Path,
    final_path: &Path,
) -> Result<(), CorpusError> {
    let staging_err = |source: std::io::Error| CorpusError::StagingWriteFailed {
        path: staging.to_path_buf(),
        source,
    };

    discard_staging(final_path).await?;

    if let Some(parent) = final_path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.map_err(staging_err)?;
        }
    }

    let mut file = tokio::fs::File::create(staging)
        .await
        .map_err(staging_err)?;
    file.write_all(text.as_bytes()).await.map_err(staging_err)?;
    file.flush().await.map_err(staging_err)?;
    file.sync_all().await.map_err(staging_err)?;
    drop(file);

    tokio::fs::rename(staging, final_path)
        .await
        .map_err(|source| CorpusError::PromotionFailed {
            staging: staging.to_path_buf(),
            path: final_path.to_path_buf(),
            source,
        })?;

    info!("Wrote {} bytes to {}", text.len(), final_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PageError;
    use crate::output::PageResult;
    use std::collections::HashMap;

    fn outcome(results: Vec<PageResult>, total: usize) -> BatchOutcome {
        BatchOutcome {
            total_pages: total,
            results: results
                .into_iter()
                .map(|r| (r.page_num, r))
                .collect::<HashMap<_, _>>(),
            elapsed_ms: 0,
        }
    }

    #[test]
    fn segments_are_in_page_order() {
        let o = outcome(
            vec![
                PageResult::success(3, "three\n"),
                PageResult::success(1, "one"),
                PageResult::success(2, "two  \n\n"),
            ],
            3,
        );
        assert_eq!(
            assemble(&o),
            "--- Page 1 ---\none\n\n--- Page 2 ---\ntwo\n\n--- Page 3 ---\nthree\n\n"
        );
    }

    #[test]
    fn failures_and_gaps_get_placeholders() {
        let o = outcome(
            vec![
                PageResult::success(1, "ಕನ್ನಡ"),
                PageResult::failure(PageError::RecognitionFailed {
                    page: 2,
                    detail: "timeout".into(),
                }),
                PageResult::failure(PageError::NoImage { page: 4 }),
            ],
            4,
        );
        let text = assemble(&o);
        assert!(text.contains("--- Page 2 ---\n[ERROR page 2: timeout]\n\n"));
        assert!(text.contains("--- Page 3 ---\n[NO RESULT]\n\n"));
        assert!(text.contains("--- Page 4 ---\n[NO IMAGE for page 4]\n\n"));
    }

    #[test]
    fn blank_page_keeps_its_header() {
        let o = outcome(vec![PageResult::success(1, "")], 1);
        assert_eq!(assemble(&o), "--- Page 1 ---\n\n\n");
    }

    #[test]
    fn staging_path_appends_suffix() {
        assert_eq!(
            staging_path(Path::new("/out/book_ocr.txt")),
            PathBuf::from("/out/book_ocr.txt.tmp")
        );
    }

    #[test]
    fn commit_replaces_stale_staging_and_promotes() {
        let dir = tempfile::tempdir().unwrap();
        let final_path = dir.path().join("nested").join("book_ocr.txt");
        std::fs::create_dir_all(final_path.parent().unwrap()).unwrap();
        std::fs::write(staging_path(&final_path), "stale garbage").unwrap();

        let o = outcome(vec![PageResult::success(1, "hello")], 1);
        tokio_test::block_on(commit(&o, &final_path)).unwrap();

        assert_eq!(
            std::fs::read_to_string(&final_path).unwrap(),
            "--- Page 1 ---\nhello\n\n"
        );
        assert!(!staging_path(&final_path).exists());
    }

    #[test]
    fn failed_promotion_leaves_previous_final_untouched() {
        let dir = tempfile::tempdir().unwrap();
        // A directory at the final path makes the rename fail.
        let final_path = dir.path().join("out.txt");
        std::fs::create_dir(&final_path).unwrap();
        std::fs::write(final_path.join("keep"), "old").unwrap();

        let o = outcome(vec![PageResult::success(1, "new")], 1);
        let err = tokio_test::block_on(commit(&o, &final_path)).unwrap_err();

        assert!(matches!(err, CorpusError::PromotionFailed { .. }), "got {err:?}");
        assert!(!staging_path(&final_path).exists());
        assert_eq!(std::fs::read_to_string(final_path.join("keep")).unwrap(), "old");
    }

    #[test]
    fn discard_staging_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let final_path = dir.path().join("book_ocr.txt");
        tokio_test::block_on(discard_staging(&final_path)).unwrap();

        std::fs::write(staging_path(&final_path), "left over").unwrap();
        tokio_test::block_on(discard_staging(&final_path)).unwrap();
        assert!(!staging_path(&final_path).exists());
    }

    #[test]
    fn multi_line_failure_stays_on_one_marked_line() {
        let o = outcome(
            vec![PageResult::failure(PageError::RecognitionFailed {
                page: 1,
                detail: "Error opening data file\nFailed loading language 'kan'".into(),
            })],
            1,
        );
        let text = assemble(&o);
        let body: Vec<&str> = text.lines().skip(1).filter(|l| !l.is_empty()).collect();
        assert_eq!(
            body,
            vec!["[ERROR page 1: Error opening data file Failed loading language 'kan']"]
        );
    }
}
