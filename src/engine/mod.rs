//! Layout-analysis and text-recognition engines.
//!
//! OCR mode talks to two collaborators through the traits here. Both are
//! constructed by the caller and passed in as [`OcrEngines`]; nothing in
//! the crate keeps engines in global state, so a process can run several
//! differently configured constructions side by side.
//!
//! | Engine | Trait | Backed by |
//! |---|---|---|
//! | [`WholePageLayout`] | [`LayoutDetector`] | nothing; the page is one title region |
//! | [`command::CommandLayout`] | [`LayoutDetector`] | external command printing region JSON |
//! | [`tesseract::TesseractRecognizer`] | [`TextRecognizer`] | `tesseract` CLI, TSV output |

pub mod command;
pub mod tesseract;

use crate::entry::{LayoutRegion, RegionKind, TextFragment};
use crate::error::TocError;
use crate::pipeline::scratch::PageImage;
use std::fmt;
use std::sync::Arc;

/// Finds typed regions (titles, text, figures, …) on a page.
pub trait LayoutDetector: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    fn detect_regions(&self, page: &PageImage<'_>) -> Result<Vec<LayoutRegion>, TocError>;
}

/// Recognises text fragments in an image.
///
/// Fragment coordinates are in the pixel space of the image passed in.
pub trait TextRecognizer: Send + Sync {
    fn name(&self) -> &str;

    fn recognize_text(&self, image: &PageImage<'_>) -> Result<Vec<TextFragment>, TocError>;
}

/// Reports the whole page as a single title region.
///
/// For pages that are themselves a printed table of contents: every line
/// on them becomes an entry.
#[derive(Debug, Clone, Copy, Default)]
pub struct WholePageLayout;

impl LayoutDetector for WholePageLayout {
    fn name(&self) -> &str {
        "whole-page"
    }

    fn detect_regions(&self, page: &PageImage<'_>) -> Result<Vec<LayoutRegion>, TocError> {
        Ok(vec![LayoutRegion::new(RegionKind::Title, page.bounds())])
    }
}

/// The engine pair OCR mode runs with.
#[derive(Clone)]
pub struct OcrEngines {
    pub layout: Arc<dyn LayoutDetector>,
    pub recognizer: Arc<dyn TextRecognizer>,
}

impl OcrEngines {
    pub fn new(layout: Arc<dyn LayoutDetector>, recognizer: Arc<dyn TextRecognizer>) -> Self {
        Self { layout, recognizer }
    }
}

impl fmt::Debug for OcrEngines {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OcrEngines")
            .field("layout", &self.layout.name())
            .field("recognizer", &self.recognizer.name())
            .finish()
    }
}
