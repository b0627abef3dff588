//! File-mode ingestion: text listings and structured JSON.
//!
//! ## Text lines
//!
//! The rightmost integer on a line is its page number. Typed or OCR'd
//! listings often lose the gap between title and page (`"Intro125"` for
//! page 25), so a number larger than the document is shortened by dropping
//! leading digits until it fits. What precedes the number is classified as
//! the title; lines without a title are skipped and lines without a number
//! point at page 1.
//!
//! Offsets, repair and bounds checking happen later in
//! [`crate::pipeline::finalize`].

use crate::entry::TocEntry;
use crate::error::TocError;
use crate::pipeline::classify::classify_title;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

static RE_TRAILING_PAGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"([0-9]+)\s*$").unwrap());

/// Parse a whole text listing.
pub fn parse_text_toc(text: &str, page_count: usize) -> Vec<TocEntry> {
    let text = text.strip_prefix('\u{FEFF}').unwrap_or(text);
    text.lines()
        .filter_map(|line| parse_text_line(line, page_count))
        .collect()
}

/// Parse one listing line; `None` when the line carries no title.
pub fn parse_text_line(line: &str, page_count: usize) -> Option<TocEntry> {
    let (title, page) = match split_trailing_page(line) {
        (title, Some(digits)) => (title, fit_page_number(digits, page_count)),
        (title, None) => (title, 1),
    };
    if title.trim().is_empty() {
        return None;
    }

    let classified = classify_title(title);
    if classified.text.is_empty() {
        return None;
    }
    Some(TocEntry::new(classified.level, classified.text, page))
}

/// Split a line into the text before its trailing integer and the digits.
pub fn split_trailing_page(line: &str) -> (&str, Option<&str>) {
    match RE_TRAILING_PAGE.captures(line).and_then(|c| c.get(1)) {
        Some(m) => (&line[..m.start()], Some(m.as_str())),
        None => (line, None),
    }
}

/// Parse `digits`, dropping leading digits while the value exceeds
/// `page_count`. Stops at a single digit; a value still out of range is
/// returned unchanged for the caller to reject.
pub fn fit_page_number(digits: &str, page_count: usize) -> u32 {
    let mut rest = digits;
    loop {
        if let Ok(n) = rest.parse::<u64>() {
            if n <= page_count as u64 {
                if rest.len() != digits.len() {
                    debug!("Page number {} shortened to {}", digits, n);
                }
                return n as u32;
            }
        }
        if rest.len() <= 1 {
            break;
        }
        // ASCII digits only, so byte slicing is safe.
        rest = &rest[1..];
    }
    rest.parse::<u64>()
        .map(|n| n.min(u32::MAX as u64) as u32)
        .unwrap_or(u32::MAX)
}

/// Parse a structured `[[level, title, page], ...]` document.
pub fn parse_json_toc(json: &str) -> Result<Vec<TocEntry>, TocError> {
    let json = json.strip_prefix('\u{FEFF}').unwrap_or(json);
    let entries: Vec<TocEntry> =
        serde_json::from_str(json).map_err(|e| TocError::MalformedToc {
            detail: format!("expected an array of [level, title, page] rows: {e}"),
        })?;

    if let Some((i, e)) = entries.iter().enumerate().find(|(_, e)| e.level == 0) {
        return Err(TocError::MalformedToc {
            detail: format!("row {} ({:?}) has level 0; levels start at 1", i + 1, e.title),
        });
    }
    Ok(entries)
}
