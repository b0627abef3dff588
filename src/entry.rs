//! Core data types: outline entries and the geometry OCR hands us.
//!
//! Coordinates are image pixels with the origin at the top-left corner and
//! `y` growing downwards, which is what every OCR and layout engine reports.

use serde::{Deserialize, Serialize};

// ── Outline entries ──────────────────────────────────────────────────────

/// One bookmark: nesting depth, display title and 1-based target page.
///
/// Serialises as the compact `[level, title, page]` row used by structured
/// TOC files. `anchor_y` never leaves the OCR pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawRow", into = "(u32, String, u32)")]
pub struct TocEntry {
    /// 1 = top level.
    pub level: u32,
    pub title: String,
    pub page: u32,
    /// Vertical position of the source text on its page (OCR only).
    pub anchor_y: Option<f32>,
}

impl TocEntry {
    pub fn new(level: u32, title: impl Into<String>, page: u32) -> Self {
        Self {
            level,
            title: title.into(),
            page,
            anchor_y: None,
        }
    }

    pub fn with_anchor(mut self, y: f32) -> Self {
        self.anchor_y = Some(y);
        self
    }
}

/// Accepted row shapes: `[level, title, page]`, or with a trailing
/// destination value as written by older extractors.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawRow {
    Plain(u32, String, u32),
    WithDest(u32, String, u32, serde_json::Value),
}

impl From<RawRow> for TocEntry {
    fn from(row: RawRow) -> Self {
        match row {
            RawRow::Plain(level, title, page) | RawRow::WithDest(level, title, page, _) => {
                TocEntry::new(level, title, page)
            }
        }
    }
}

impl From<TocEntry> for (u32, String, u32) {
    fn from(e: TocEntry) -> Self {
        (e.level, e.title, e.page)
    }
}

// ── Geometry ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned box `(x0, y0)`–`(x1, y1)` with `x0 <= x1`, `y0 <= y1`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl BBox {
    /// Build a box from two corners given in any order.
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        }
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    pub fn center_y(&self) -> f32 {
        (self.y0 + self.y1) / 2.0
    }

    pub fn translate(&self, dx: f32, dy: f32) -> Self {
        Self {
            x0: self.x0 + dx,
            y0: self.y0 + dy,
            x1: self.x1 + dx,
            y1: self.y1 + dy,
        }
    }

    /// Smallest box containing both.
    pub fn union(&self, other: &BBox) -> Self {
        Self {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    /// Corners clockwise from top-left.
    pub fn corners(&self) -> [Point; 4] {
        [
            Point::new(self.x0, self.y0),
            Point::new(self.x1, self.y0),
            Point::new(self.x1, self.y1),
            Point::new(self.x0, self.y1),
        ]
    }
}

/// Anything with a position on the page: fragments, regions, raw boxes.
///
/// The reading-order code is generic over this so the same sweep orders
/// recognised text lines and layout regions alike.
pub trait Spatial {
    fn bounds(&self) -> BBox;

    /// Vertical center used for row grouping.
    fn center_y(&self) -> f32 {
        self.bounds().center_y()
    }

    fn left(&self) -> f32 {
        self.bounds().x0
    }

    fn top(&self) -> f32 {
        self.bounds().y0
    }

    fn right(&self) -> f32 {
        self.bounds().x1
    }
}

impl Spatial for BBox {
    fn bounds(&self) -> BBox {
        *self
    }
}

// ── OCR fragments ────────────────────────────────────────────────────────

/// A recognised text span: quadrilateral (clockwise from top-left), text and
/// engine confidence in `0.0..=1.0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextFragment {
    pub quad: [Point; 4],
    pub text: String,
    pub confidence: f32,
}

impl TextFragment {
    pub fn new(quad: [Point; 4], text: impl Into<String>, confidence: f32) -> Self {
        Self {
            quad,
            text: text.into(),
            confidence,
        }
    }

    /// Fragment covering an axis-aligned box.
    pub fn from_bbox(bbox: BBox, text: impl Into<String>, confidence: f32) -> Self {
        Self::new(bbox.corners(), text, confidence)
    }

    /// Move the fragment, e.g. from crop space back to page space.
    pub fn translate(mut self, dx: f32, dy: f32) -> Self {
        for p in &mut self.quad {
            p.x += dx;
            p.y += dy;
        }
        self
    }
}

impl Spatial for TextFragment {
    fn bounds(&self) -> BBox {
        let mut b = BBox {
            x0: f32::INFINITY,
            y0: f32::INFINITY,
            x1: f32::NEG_INFINITY,
            y1: f32::NEG_INFINITY,
        };
        for p in &self.quad {
            b.x0 = b.x0.min(p.x);
            b.y0 = b.y0.min(p.y);
            b.x1 = b.x1.max(p.x);
            b.y1 = b.y1.max(p.y);
        }
        b
    }

    // Mean of the top-left and bottom-right corners, not of the hull: on a
    // skewed quad this tracks the text baseline better.
    fn center_y(&self) -> f32 {
        (self.quad[0].y + self.quad[2].y) / 2.0
    }
}

// ── Layout regions ───────────────────────────────────────────────────────

/// Region categories reported by layout analysis (PP-Structure vocabulary).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionKind {
    Title,
    Text,
    Figure,
    FigureCaption,
    Table,
    TableCaption,
    Equation,
    Header,
    Footer,
    Reference,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutRegion {
    pub kind: RegionKind,
    pub bbox: BBox,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

impl LayoutRegion {
    pub fn new(kind: RegionKind, bbox: BBox) -> Self {
        Self {
            kind,
            bbox,
            score: None,
        }
    }
}

impl Spatial for LayoutRegion {
    fn bounds(&self) -> BBox {
        self.bbox
    }
}
