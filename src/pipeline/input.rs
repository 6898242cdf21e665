//! Input resolution: validate a user-supplied path before any page work.
//!
//! We check existence, read permission and the PDF magic bytes (`%PDF`) up
//! front so callers get a meaningful error rather than a renderer failure on
//! every page.

use crate::error::CorpusError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Resolve a local file path, validating existence and PDF magic bytes.
pub fn resolve_input(input: impl AsRef<Path>) -> Result<PathBuf, CorpusError> {
    let path = input.as_ref().to_path_buf();

    if !path.exists() {
        return Err(CorpusError::FileNotFound { path });
    }

    match std::fs::File::open(&path) {
        Ok(f) => {
            // Files shorter than the magic are not PDFs either.
            let mut head = Vec::with_capacity(4);
            if let Err(e) = f.take(4).read_to_end(&mut head) {
                debug!("Could not read header of {}: {}", path.display(), e);
            }
            if head.as_slice() != b"%PDF" {
                let mut magic = [0u8; 4];
                magic[..head.len()].copy_from_slice(&head);
                return Err(CorpusError::NotAPdf { path, magic });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(CorpusError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(CorpusError::FileNotFound { path });
        }
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(path)
}

/// Default output locations next to the document: `<stem>_ocr.txt` and
/// `<stem>_cleaned.txt`.
pub fn derived_outputs(document: &Path) -> (PathBuf, PathBuf) {
    let stem = document
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    let dir = document.parent().unwrap_or_else(|| Path::new(""));
    (
        dir.join(format!("{stem}_ocr.txt")),
        dir.join(format!("{stem}_cleaned.txt")),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_not_found() {
        let err = resolve_input("/definitely/not/a/real/file.pdf").unwrap_err();
        assert!(matches!(err, CorpusError::FileNotFound { .. }));
    }

    #[test]
    fn rejects_non_pdf_magic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.pdf");
        std::fs::write(&path, b"hello world").unwrap();
        let err = resolve_input(&path).unwrap_err();
        match err {
            CorpusError::NotAPdf { magic, .. } => assert_eq!(&magic, b"hell"),
            other => panic!("expected NotAPdf, got {other:?}"),
        }
    }

    #[test]
    fn file_shorter_than_magic_is_not_a_pdf() {
        let dir = tempfile::tempdir().unwrap();
        for (name, bytes) in [("empty.pdf", &b""[..]), ("short.pdf", &b"%P"[..])] {
            let path = dir.path().join(name);
            std::fs::write(&path, bytes).unwrap();
            let err = resolve_input(&path).unwrap_err();
            assert!(matches!(err, CorpusError::NotAPdf { .. }), "{name}: got {err:?}");
        }
    }

    #[test]
    fn accepts_pdf_magic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.pdf");
        std::fs::write(&path, b"%PDF-1.7\n").unwrap();
        assert_eq!(resolve_input(&path).unwrap(), path);
    }

    #[test]
    fn derived_outputs_sit_next_to_document() {
        let (ocr, cleaned) = derived_outputs(Path::new("/books/ramayana.pdf"));
        assert_eq!(ocr, PathBuf::from("/books/ramayana_ocr.txt"));
        assert_eq!(cleaned, PathBuf::from("/books/ramayana_cleaned.txt"));
    }
}
