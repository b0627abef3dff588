//! Configuration types for TOC construction.
//!
//! Every knob of the OCR and file-mode pipelines lives in [`TocConfig`],
//! built via [`TocConfigBuilder`]. Engines are not part of the config: they
//! are heavyweight, caller-owned objects passed to
//! [`crate::toc::add_toc_from_ocr`] alongside it.

use crate::error::TocError;
use crate::progress::ProgressCallback;
use crate::range::RangeSpec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Configuration for building a TOC.
///
/// # Example
/// ```rust
/// use pdf_toolbox::{PageSelection, TocConfig};
///
/// let config = TocConfig::builder()
///     .offset(12)
///     .double_columns(true)
///     .pages("3-6".parse::<PageSelection>().unwrap())
///     .build()
///     .unwrap();
/// assert_eq!(config.offset, 12);
/// ```
#[derive(Clone)]
pub struct TocConfig {
    /// Added to every page number before attaching: "real PDF page" minus
    /// "page printed in the listing". Default: 0.
    pub offset: i32,

    /// Pages scanned in OCR mode. Default: All.
    pub pages: PageSelection,

    /// Read left column fully before the right one. Default: false.
    pub double_columns: bool,

    /// Max vertical-center distance (pixels) for two fragments to share a
    /// row. Default: 5.0.
    ///
    /// Scales with render size; raise it together with `max_rendered_pixels`.
    pub row_merge_tolerance: f32,

    /// Padding added around each title region before recognition, so glyphs
    /// on the region edge are not clipped. Default: 10 × 5 px.
    pub region_margin: RegionMargin,

    /// Fragments below this confidence are dropped. Range 0–1. Default: 0.0.
    pub min_confidence: f32,

    /// Longest rendered page edge in pixels. Default: 2000.
    pub max_rendered_pixels: u32,

    /// Optional per-page progress callback (OCR mode).
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for TocConfig {
    fn default() -> Self {
        Self {
            offset: 0,
            pages: PageSelection::default(),
            double_columns: false,
            row_merge_tolerance: 5.0,
            region_margin: RegionMargin::default(),
            min_confidence: 0.0,
            max_rendered_pixels: 2000,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for TocConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TocConfig")
            .field("offset", &self.offset)
            .field("pages", &self.pages)
            .field("double_columns", &self.double_columns)
            .field("row_merge_tolerance", &self.row_merge_tolerance)
            .field("region_margin", &self.region_margin)
            .field("min_confidence", &self.min_confidence)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn TocProgressCallback>"),
            )
            .finish()
    }
}

impl TocConfig {
    pub fn builder() -> TocConfigBuilder {
        TocConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`TocConfig`].
#[derive(Debug)]
pub struct TocConfigBuilder {
    config: TocConfig,
}

impl TocConfigBuilder {
    pub fn offset(mut self, offset: i32) -> Self {
        self.config.offset = offset;
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn double_columns(mut self, v: bool) -> Self {
        self.config.double_columns = v;
        self
    }

    pub fn row_merge_tolerance(mut self, px: f32) -> Self {
        self.config.row_merge_tolerance = px;
        self
    }

    pub fn region_margin(mut self, x: u32, y: u32) -> Self {
        self.config.region_margin = RegionMargin { x, y };
        self
    }

    pub fn min_confidence(mut self, c: f32) -> Self {
        self.config.min_confidence = c;
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<TocConfig, TocError> {
        let c = &self.config;
        if !c.row_merge_tolerance.is_finite() || c.row_merge_tolerance <= 0.0 {
            return Err(TocError::InvalidConfig(format!(
                "row merge tolerance must be a positive number of pixels, got {}",
                c.row_merge_tolerance
            )));
        }
        if !(0.0..=1.0).contains(&c.min_confidence) {
            return Err(TocError::InvalidConfig(format!(
                "minimum confidence must be within 0–1, got {}",
                c.min_confidence
            )));
        }
        Ok(self.config)
    }
}

// ── Supporting types ─────────────────────────────────────────────────────

/// Pixel padding around layout regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionMargin {
    pub x: u32,
    pub y: u32,
}

impl Default for RegionMargin {
    fn default() -> Self {
        Self { x: 10, y: 5 }
    }
}

/// Specifies which pages of the PDF to process.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSelection {
    /// Every page (default).
    #[default]
    All,
    /// A range expression such as `1-3,5`.
    Ranges(RangeSpec),
}

impl PageSelection {
    /// 0-based indices in expression order, duplicates kept.
    pub fn resolve(&self, total_pages: usize) -> Result<Vec<usize>, TocError> {
        match self {
            PageSelection::All => Ok((0..total_pages).collect()),
            PageSelection::Ranges(spec) => {
                if let Some(max) = spec.max_index().filter(|&m| m >= total_pages) {
                    return Err(TocError::PageOutOfRange {
                        page: max + 1,
                        total: total_pages,
                    });
                }
                Ok(spec.flatten())
            }
        }
    }

    /// Like [`resolve`](Self::resolve) but sorted and deduplicated.
    pub fn resolve_sorted(&self, total_pages: usize) -> Result<Vec<usize>, TocError> {
        let mut indices = self.resolve(total_pages)?;
        indices.sort_unstable();
        indices.dedup();
        Ok(indices)
    }
}

impl FromStr for PageSelection {
    type Err = TocError;

    /// `"all"` (any case) or a range expression.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(PageSelection::All);
        }
        Ok(PageSelection::Ranges(RangeSpec::parse(s)?))
    }
}
