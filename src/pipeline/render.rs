//! PDF rasterisation: render pages to `DynamicImage` via pdfium.
//!
//! ## Why a trait?
//!
//! OCR mode only needs "page N as pixels". [`PageSource`] is that seam:
//! [`PageRenderer`] fills it with pdfium, while pre-rendered scans (and the
//! tests) hand in a `Vec<DynamicImage>`.
//!
//! ## Why cap pixels, not DPI?
//!
//! Page sizes vary wildly: an A0 poster at 150 DPI would produce a
//! 12,000 × 17,000 px image. `max_rendered_pixels` caps the longest edge
//! regardless of physical size, which keeps memory bounded and keeps the
//! row-merge tolerance meaningful across documents.
//!
//! pdfium keeps thread-local state and is not async-safe, so every caller
//! of this module runs inside `tokio::task::spawn_blocking`.

use crate::error::TocError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::{debug, info};

/// Environment variable naming an explicit libpdfium to load.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Bind to pdfium: `PDFIUM_LIB_PATH` if set, else the system library.
pub fn bind_pdfium() -> Result<Pdfium, TocError> {
    let bindings = match std::env::var_os(PDFIUM_LIB_PATH_ENV) {
        Some(path) => {
            debug!("Binding pdfium from {}", Path::new(&path).display());
            Pdfium::bind_to_library(&path)
        }
        None => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| TocError::PdfiumBindingFailed(format!("{:?}", e)))?;
    Ok(Pdfium::new(bindings))
}

/// Anything that can hand out page `index` (0-based) as pixels.
pub trait PageSource {
    fn page_count(&self) -> usize;
    fn render_page(&self, index: usize) -> Result<DynamicImage, TocError>;
}

/// Pages rendered from a PDF with pdfium.
pub struct PageRenderer<'a> {
    document: PdfDocument<'a>,
    render_config: PdfRenderConfig,
}

impl<'a> PageRenderer<'a> {
    pub fn open(pdfium: &'a Pdfium, pdf_path: &Path, max_pixels: u32) -> Result<Self, TocError> {
        let document =
            pdfium
                .load_pdf_from_file(pdf_path, None)
                .map_err(|e| TocError::CorruptPdf {
                    path: pdf_path.to_path_buf(),
                    detail: format!("{:?}", e),
                })?;
        info!("PDF loaded for rendering: {} pages", document.pages().len());

        let render_config = PdfRenderConfig::new()
            .set_target_width(max_pixels as i32)
            .set_maximum_height(max_pixels as i32);

        Ok(Self {
            document,
            render_config,
        })
    }
}

impl PageSource for PageRenderer<'_> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn render_page(&self, index: usize) -> Result<DynamicImage, TocError> {
        let total = self.page_count();
        if index >= total {
            return Err(TocError::PageOutOfRange {
                page: index + 1,
                total,
            });
        }

        let page = self
            .document
            .pages()
            .get(index as u16)
            .map_err(|e| TocError::RasterisationFailed {
                page: index + 1,
                detail: format!("{:?}", e),
            })?;

        let bitmap = page.render_with_config(&self.render_config).map_err(|e| {
            TocError::RasterisationFailed {
                page: index + 1,
                detail: format!("{:?}", e),
            }
        })?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            index + 1,
            image.width(),
            image.height()
        );
        Ok(image)
    }
}

/// Pre-rendered pages, one image per page.
impl PageSource for Vec<DynamicImage> {
    fn page_count(&self) -> usize {
        self.len()
    }

    fn render_page(&self, index: usize) -> Result<DynamicImage, TocError> {
        self.get(index).cloned().ok_or(TocError::PageOutOfRange {
            page: index + 1,
            total: self.len(),
        })
    }
}
