//! Pipeline stages for PDF-to-corpus extraction.
//!
//! Each submodule implements one step. Rendering and recognition sit behind
//! traits so the orchestrator can be driven by stub capabilities in tests.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ orchestrate ──────────────────▶ assemble ──▶ filter
//! (path)    │ per page, N at a time:         (ordered,     (clean each line,
//!           │   render ──▶ recognize          staged        keep script lines)
//!           │  (pdfium)   (tesseract)         commit)
//! ```
//!
//! 1. [`input`]: validate the user-supplied path, derive output paths
//! 2. [`render`]: rasterise one page; pdfium is blocking, so callers use
//!    `spawn_blocking`
//! 3. [`recognize`]: extract text from one page image in a child process
//! 4. [`orchestrate`]: fan out one job per page with bounded concurrency and
//!    collect results by page number
//! 5. [`assemble`]: join pages in ascending order with placeholders for
//!    failures; write through `<final>.tmp` and rename
//! 6. [`clean`]: the ordered per-line cleaning rules
//! 7. [`filter`]: apply [`clean`] to a whole text or file

pub mod assemble;
pub mod clean;
pub mod filter;
pub mod input;
pub mod orchestrate;
pub mod recognize;
pub mod render;
