//! Configuration types for OCR and script filtering.
//!
//! All behaviour is controlled through [`OcrConfig`], built via its
//! [`OcrConfigBuilder`]. The language spec, resolution and worker count live
//! here rather than in process-wide constants so two documents can be
//! processed side by side with different settings.

use crate::error::CorpusError;
use crate::pipeline::recognize::PageRecognizer;
use crate::pipeline::render::PageRenderer;
use crate::progress::ProgressCallback;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Configuration for OCR-ing one document and filtering its text.
///
/// Built via [`OcrConfig::builder()`] or using [`OcrConfig::default()`].
///
/// # Example
/// ```rust
/// use pdf2corpus::{OcrConfig, ScriptBlock};
///
/// let config = OcrConfig::builder()
///     .dpi(200)
///     .concurrency(8)
///     .languages("kan+eng")
///     .script(ScriptBlock::KANNADA)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct OcrConfig {
    /// Rendering DPI used when rasterising each page. Range: 72–600. Default: 150.
    ///
    /// Lower DPI reduces memory and CPU per worker but may lower recognition
    /// accuracy on small print. 300 is the usual choice for dense book scans.
    pub dpi: u32,

    /// Maximum rendered image dimension (width or height) in pixels. Default: 5000.
    ///
    /// Caps either dimension independent of DPI so an oversized page cannot
    /// exhaust memory in a worker.
    pub max_rendered_pixels: u32,

    /// Maximum number of pages processed at the same time. Default: 4.
    ///
    /// The effective worker count is `min(concurrency, total_pages)`. Each
    /// worker holds one rendered page in memory and runs one recognizer
    /// process, so this bounds both CPU and peak memory.
    pub concurrency: usize,

    /// Recognizer language spec, `+`-joined script codes. Default: `"kan+eng"`.
    pub languages: String,

    /// Unicode block the filter keeps. Default: [`ScriptBlock::KANNADA`].
    pub script: ScriptBlock,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Per-page recognition timeout in seconds. Default: 300.
    ///
    /// Applied by [`crate::pipeline::recognize::TesseractRecognizer`], which
    /// kills its child process once the deadline passes.
    pub page_timeout_secs: u64,

    /// Tesseract executable name or path. Default: `"tesseract"`.
    pub tesseract_cmd: String,

    /// Pre-constructed renderer. Takes precedence over the pdfium default.
    pub renderer: Option<Arc<dyn PageRenderer>>,

    /// Pre-constructed recognizer. Takes precedence over the Tesseract default.
    pub recognizer: Option<Arc<dyn PageRecognizer>>,

    /// Receives per-page progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            dpi: 150,
            max_rendered_pixels: 5000,
            concurrency: 4,
            languages: "kan+eng".to_string(),
            script: ScriptBlock::default(),
            password: None,
            page_timeout_secs: 300,
            tesseract_cmd: "tesseract".to_string(),
            renderer: None,
            recognizer: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for OcrConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OcrConfig")
            .field("dpi", &self.dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("concurrency", &self.concurrency)
            .field("languages", &self.languages)
            .field("script", &self.script)
            .field("page_timeout_secs", &self.page_timeout_secs)
            .field("tesseract_cmd", &self.tesseract_cmd)
            .field("renderer", &self.renderer.as_ref().map(|_| "<dyn PageRenderer>"))
            .field(
                "recognizer",
                &self.recognizer.as_ref().map(|_| "<dyn PageRecognizer>"),
            )
            .field("progress_callback", &self.progress_callback.is_some())
            .finish()
    }
}

impl OcrConfig {
    /// Create a new builder for `OcrConfig`.
    pub fn builder() -> OcrConfigBuilder {
        OcrConfigBuilder {
            config: Self::default(),
        }
    }

    /// Number of workers actually used for a document of `total_pages` pages.
    pub fn effective_workers(&self, total_pages: usize) -> usize {
        self.concurrency.min(total_pages).max(1)
    }
}

/// Builder for [`OcrConfig`].
#[derive(Debug)]
pub struct OcrConfigBuilder {
    config: OcrConfig,
}

impl OcrConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 600);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn languages(mut self, langs: impl Into<String>) -> Self {
        self.config.languages = langs.into();
        self
    }

    pub fn script(mut self, script: ScriptBlock) -> Self {
        self.config.script = script;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn page_timeout_secs(mut self, secs: u64) -> Self {
        self.config.page_timeout_secs = secs.max(1);
        self
    }

    pub fn tesseract_cmd(mut self, cmd: impl Into<String>) -> Self {
        self.config.tesseract_cmd = cmd.into();
        self
    }

    pub fn renderer(mut self, renderer: Arc<dyn PageRenderer>) -> Self {
        self.config.renderer = Some(renderer);
        self
    }

    pub fn recognizer(mut self, recognizer: Arc<dyn PageRecognizer>) -> Self {
        self.config.recognizer = Some(recognizer);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<OcrConfig, CorpusError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 600 {
            return Err(CorpusError::InvalidConfig(format!(
                "DPI must be 72–600, got {}",
                c.dpi
            )));
        }
        if c.concurrency == 0 {
            return Err(CorpusError::InvalidConfig("Concurrency must be ≥ 1".into()));
        }
        validate_languages(&c.languages)?;
        if c.script.first > c.script.last {
            return Err(CorpusError::InvalidConfig(format!(
                "Script block '{}' is empty: U+{:04X} > U+{:04X}",
                c.script.name, c.script.first as u32, c.script.last as u32
            )));
        }
        Ok(self.config)
    }
}

/// Language specs are passed straight to the recognizer's command line, so
/// only `[A-Za-z0-9_]` codes joined by `+` are accepted. A code may carry
/// `/`-separated parts, as in tesseract's `script/Devanagari`.
fn validate_languages(langs: &str) -> Result<(), CorpusError> {
    let ok = !langs.is_empty()
        && langs.split('+').all(|code| {
            code.split('/').all(|part| {
                !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
            })
        });
    if ok {
        Ok(())
    } else {
        Err(CorpusError::InvalidConfig(format!(
            "Language spec must be '+'-joined codes like 'kan+eng', got '{langs}'"
        )))
    }
}

// ── Script blocks ────────────────────────────────────────────────────────

/// A contiguous Unicode block identifying the target writing script.
///
/// Everything outside the block (other scripts, Latin letters, punctuation)
/// is noise to the line filter. Digits are stripped even when the block
/// contains script-native digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScriptBlock {
    pub name: &'static str,
    pub first: char,
    pub last: char,
}

impl ScriptBlock {
    pub const DEVANAGARI: ScriptBlock = ScriptBlock::new("devanagari", '\u{0900}', '\u{097F}');
    pub const BENGALI: ScriptBlock = ScriptBlock::new("bengali", '\u{0980}', '\u{09FF}');
    pub const GURMUKHI: ScriptBlock = ScriptBlock::new("gurmukhi", '\u{0A00}', '\u{0A7F}');
    pub const GUJARATI: ScriptBlock = ScriptBlock::new("gujarati", '\u{0A80}', '\u{0AFF}');
    pub const ORIYA: ScriptBlock = ScriptBlock::new("oriya", '\u{0B00}', '\u{0B7F}');
    pub const TAMIL: ScriptBlock = ScriptBlock::new("tamil", '\u{0B80}', '\u{0BFF}');
    pub const TELUGU: ScriptBlock = ScriptBlock::new("telugu", '\u{0C00}', '\u{0C7F}');
    pub const KANNADA: ScriptBlock = ScriptBlock::new("kannada", '\u{0C80}', '\u{0CFF}');
    pub const MALAYALAM: ScriptBlock = ScriptBlock::new("malayalam", '\u{0D00}', '\u{0D7F}');

    /// All built-in blocks, for CLI listing and lookup.
    pub const ALL: [ScriptBlock; 9] = [
        Self::DEVANAGARI,
        Self::BENGALI,
        Self::GURMUKHI,
        Self::GUJARATI,
        Self::ORIYA,
        Self::TAMIL,
        Self::TELUGU,
        Self::KANNADA,
        Self::MALAYALAM,
    ];

    pub const fn new(name: &'static str, first: char, last: char) -> Self {
        Self { name, first, last }
    }

    /// Look up a built-in block by name (case-insensitive).
    pub fn from_name(name: &str) -> Option<ScriptBlock> {
        Self::ALL
            .into_iter()
            .find(|b| b.name.eq_ignore_ascii_case(name.trim()))
    }

    pub fn contains(&self, c: char) -> bool {
        (self.first..=self.last).contains(&c)
    }
}

impl Default for ScriptBlock {
    fn default() -> Self {
        Self::KANNADA
    }
}

impl fmt::Display for ScriptBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (U+{:04X}–U+{:04X})",
            self.name, self.first as u32, self.last as u32
        )
    }
}
