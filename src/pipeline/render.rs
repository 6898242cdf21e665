//! Page rasterisation: the [`PageRenderer`] capability and its pdfium backend.
//!
//! The orchestrator only needs two things from a renderer: how many pages a
//! document has, and one page rendered to an image. Both calls are blocking;
//! the orchestrator runs them on `spawn_blocking` threads.
//!
//! ## Why one pdfium binding per renderer?
//!
//! Binding loads the shared library and initialises pdfium's global state.
//! Doing that once and reusing it for every page avoids init/destroy races
//! between workers. Each page job still opens the document on its own, so a
//! page never depends on state left behind by another page.

use crate::config::OcrConfig;
use crate::error::{CapabilityError, CorpusError};
use crate::output::DocumentMetadata;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::{debug, info};

/// Renders single pages of a source document.
///
/// Implementations must be callable concurrently for different pages of the
/// same document.
pub trait PageRenderer: Send + Sync {
    /// Number of pages in `document`.
    fn page_count(&self, document: &Path) -> Result<usize, CorpusError>;

    /// Document-level metadata. The default reports only the page count.
    fn metadata(&self, document: &Path) -> Result<DocumentMetadata, CorpusError> {
        Ok(DocumentMetadata {
            page_count: self.page_count(document)?,
            ..DocumentMetadata::default()
        })
    }

    /// Render 1-indexed `page_num` at `dpi`.
    ///
    /// `Ok(None)` means the backend ran but produced no image for the page.
    fn render_page(
        &self,
        document: &Path,
        page_num: usize,
        dpi: u32,
    ) -> Result<Option<DynamicImage>, CapabilityError>;
}

/// [`PageRenderer`] backed by the pdfium library.
pub struct PdfiumRenderer {
    pdfium: Pdfium,
    password: Option<String>,
    max_rendered_pixels: u32,
}

impl PdfiumRenderer {
    /// Bind to pdfium.
    ///
    /// Honours `PDFIUM_LIB_PATH` (path to the shared library) and falls back
    /// to the system library search path.
    pub fn new(config: &OcrConfig) -> Result<Self, CorpusError> {
        let bindings = match std::env::var("PDFIUM_LIB_PATH") {
            Ok(p) if !p.is_empty() => Pdfium::bind_to_library(&p),
            _ => Pdfium::bind_to_system_library(),
        }
        .map_err(|e| CorpusError::RendererUnavailable(format!("{:?}", e)))?;

        info!("Bound to pdfium");
        Ok(Self {
            pdfium: Pdfium::new(bindings),
            password: config.password.clone(),
            max_rendered_pixels: config.max_rendered_pixels,
        })
    }

    fn open<'a>(&'a self, pdf_path: &Path) -> Result<PdfDocument<'a>, CorpusError> {
        let password = self.password.as_deref();
        self.pdfium
            .load_pdf_from_file(pdf_path, password)
            .map_err(|e| {
                let err_str = format!("{:?}", e);
                if err_str.contains("Password") || err_str.contains("password") {
                    if password.is_some() {
                        CorpusError::WrongPassword {
                            path: pdf_path.to_path_buf(),
                        }
                    } else {
                        CorpusError::PasswordRequired {
                            path: pdf_path.to_path_buf(),
                        }
                    }
                } else {
                    CorpusError::CorruptPdf {
                        path: pdf_path.to_path_buf(),
                        detail: err_str,
                    }
                }
            })
    }
}

impl PageRenderer for PdfiumRenderer {
    fn page_count(&self, document: &Path) -> Result<usize, CorpusError> {
        let doc = self.open(document)?;
        Ok(doc.pages().len() as usize)
    }

    fn metadata(&self, document: &Path) -> Result<DocumentMetadata, CorpusError> {
        let doc = self.open(document)?;
        let metadata = doc.metadata();

        let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
            metadata.get(tag).and_then(|t| {
                let v = t.value().to_string();
                if v.is_empty() {
                    None
                } else {
                    Some(v)
                }
            })
        };

        Ok(DocumentMetadata {
            title: get_meta(PdfDocumentMetadataTagType::Title),
            author: get_meta(PdfDocumentMetadataTagType::Author),
            subject: get_meta(PdfDocumentMetadataTagType::Subject),
            creator: get_meta(PdfDocumentMetadataTagType::Creator),
            producer: get_meta(PdfDocumentMetadataTagType::Producer),
            creation_date: get_meta(PdfDocumentMetadataTagType::CreationDate),
            modification_date: get_meta(PdfDocumentMetadataTagType::ModificationDate),
            page_count: doc.pages().len() as usize,
            pdf_version: format!("{:?}", doc.version()),
        })
    }

    fn render_page(
        &self,
        document: &Path,
        page_num: usize,
        dpi: u32,
    ) -> Result<Option<DynamicImage>, CapabilityError> {
        let doc = self
            .open(document)
            .map_err(|e| CapabilityError::msg(e.to_string()))?;
        let pages = doc.pages();

        let idx = page_num.saturating_sub(1);
        if idx >= pages.len() as usize {
            return Err(CapabilityError::msg(format!(
                "page {} out of range (document has {} pages)",
                page_num,
                pages.len()
            )));
        }

        let page = pages
            .get(idx as u16)
            .map_err(|e| CapabilityError::msg(format!("{:?}", e)))?;

        let render_config = PdfRenderConfig::new()
            .scale_page_by_factor(dpi as f32 / 72.0)
            .set_maximum_width(self.max_rendered_pixels as i32)
            .set_maximum_height(self.max_rendered_pixels as i32);

        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| CapabilityError::msg(format!("{:?}", e)))?;

        let image = bitmap.as_image();
        if image.width() == 0 || image.height() == 0 {
            return Ok(None);
        }
        debug!(
            "Rendered page {} → {}x{} px",
            page_num,
            image.width(),
            image.height()
        );

        Ok(Some(image))
    }
}
