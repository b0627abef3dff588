//! Pipeline stages for TOC construction.
//!
//! Each submodule implements exactly one transformation step, so each is
//! testable on its own and the two ingestion modes share everything past
//! the point where they produce raw entries.
//!
//! ## Data Flow
//!
//! ```text
//!                  ┌─ ingest ──────────────────────────┐
//! TOC file ────────┤  (trailing page, classify)        │
//!                  └───────────────────────────────────┤
//!                                                      ├─▶ finalize ──▶ outline / file
//! PDF ─▶ render ─▶ ocr (layout, recognise,             │   (offset, repair, bounds)
//!                      reading_order, classify) ───────┘
//! ```
//!
//! 1. [`input`]   : validate the user-supplied PDF path
//! 2. [`render`]  : rasterise pages with pdfium (OCR mode only)
//! 3. [`scratch`] : scoped temp directory for engines that want files
//! 4. [`ocr`]     : per-page title regions → recognised rows → entries
//! 5. [`ingest`]  : text / JSON listings → entries
//! 6. [`classify`], [`reading_order`], [`repair`] : the shared algorithms
//! 7. [`cleanup`] : line filter for hand-editing OCR output into a listing

pub mod classify;
pub mod cleanup;
pub mod ingest;
pub mod input;
pub mod ocr;
pub mod reading_order;
pub mod render;
pub mod repair;
pub mod scratch;

use crate::entry::TocEntry;
use crate::error::TocError;
use tracing::{debug, warn};

/// Entries ready to attach, plus what the tail changed.
#[derive(Debug, Clone, PartialEq)]
pub struct Finalized {
    pub entries: Vec<TocEntry>,
    pub levels_repaired: usize,
}

/// Shared tail of both ingestion modes.
///
/// Shifts every page by `offset`, rejects the whole TOC if any page falls
/// outside `1..=page_count`, drops OCR anchors and runs the repair pass.
/// The entries must already be in final document order.
pub fn finalize(
    entries: Vec<TocEntry>,
    offset: i32,
    page_count: usize,
) -> Result<Finalized, TocError> {
    let mut shifted = Vec::with_capacity(entries.len());
    for mut entry in entries {
        let page = i64::from(entry.page) + i64::from(offset);
        if page < 1 || page > page_count as i64 {
            return Err(TocError::EntryOutOfRange {
                title: entry.title,
                page,
                total: page_count,
            });
        }
        entry.page = page as u32;
        entry.anchor_y = None;
        shifted.push(entry);
    }

    let before: Vec<u32> = shifted.iter().map(|e| e.level).collect();
    let repaired = repair::repair_levels(shifted);
    let levels_repaired = before
        .iter()
        .zip(&repaired)
        .filter(|(old, e)| **old != e.level)
        .count();

    if levels_repaired > 0 {
        debug!("Repair pass adjusted {} levels", levels_repaired);
    }
    let levels: Vec<u32> = repaired.iter().map(|e| e.level).collect();
    if let Some(i) = repair::first_violation(&levels) {
        warn!(
            "Outline still skips levels after repair at entry {} {:?}; viewers will nest it as best they can",
            i, repaired[i].title
        );
    }

    Ok(Finalized {
        entries: repaired,
        levels_repaired,
    })
}
