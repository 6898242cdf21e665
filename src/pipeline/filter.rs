//! Script filter: run [`LineCleaner`] over a whole text and keep the lines
//! that still carry target-script characters.
//!
//! Two entry points share one per-line decision ([`filter_line`]):
//! [`clean_text`] works on a string in memory, [`clean_file`] streams a file
//! line by line. For the same input they produce the same text and the same
//! kept-line count.
//!
//! Kept lines are joined with `\n`; there is no trailing newline.

use crate::error::CorpusError;
use crate::output::CleanOutcome;
use crate::pipeline::clean::LineCleaner;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

/// Decide what one raw line contributes to the corpus.
///
/// Returns `None` for blank lines, `<doc ...>` / `</doc>` boundary markers,
/// and lines left without any target-script character after cleaning.
pub fn filter_line(raw: &str, cleaner: &LineCleaner) -> Option<String> {
    let line = raw.trim();
    if line.is_empty() || line.starts_with("<doc") || line.starts_with("</doc") {
        return None;
    }
    let cleaned = cleaner.clean(line);
    if cleaned.is_empty() || !cleaner.has_script_char(&cleaned) {
        return None;
    }
    Some(cleaned)
}

/// Filter `raw` in memory.
pub fn clean_text(raw: &str, cleaner: &LineCleaner) -> CleanOutcome {
    let kept: Vec<String> = raw
        .lines()
        .filter_map(|line| filter_line(line, cleaner))
        .collect();
    CleanOutcome {
        kept_lines: kept.len(),
        text: kept.join("\n"),
    }
}

/// Stream `input` through the filter into `output`.
///
/// The cleaned text is written to a temp file in `output`'s directory and
/// persisted over `output` only once every line has been written. Invalid
/// UTF-8 is replaced rather than rejected.
///
/// # Returns
/// The number of lines kept.
pub fn clean_file(input: &Path, output: &Path, cleaner: &LineCleaner) -> Result<usize, CorpusError> {
    let read_err = |source: std::io::Error| CorpusError::CleanFailed {
        path: input.to_path_buf(),
        source,
    };
    let write_err = |source: std::io::Error| CorpusError::CleanFailed {
        path: output.to_path_buf(),
        source,
    };

    let mut reader = BufReader::new(File::open(input).map_err(read_err)?);

    let dir = match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(write_err)?;
    let tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
    let mut writer = BufWriter::new(tmp);

    let mut buf = Vec::new();
    let mut seen = 0usize;
    let mut kept = 0usize;
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).map_err(read_err)? == 0 {
            break;
        }
        seen += 1;
        let line = String::from_utf8_lossy(&buf);
        if let Some(cleaned) = filter_line(&line, cleaner) {
            if kept > 0 {
                writer.write_all(b"\n").map_err(write_err)?;
            }
            writer.write_all(cleaned.as_bytes()).map_err(write_err)?;
            kept += 1;
        }
    }

    let tmp = writer
        .into_inner()
        .map_err(|e| write_err(e.into_error()))?;
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(output).map_err(|e| write_err(e.error))?;

    debug!("Filtered {} lines from {}", seen, input.display());
    info!(
        "Kept {} {} lines in {}",
        kept,
        cleaner.script().name,
        output.display()
    );
    Ok(kept)
}
