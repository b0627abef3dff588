//! TOC file formats and the extraction serialisers.
//!
//! * Text: one entry per line, `level - 1` leading tabs, title, a space and
//!   the page number. Re-ingesting the output with offset 0 reproduces the
//!   same entries.
//! * JSON: a compact array of `[level, title, page]` rows.

use crate::entry::TocEntry;
use crate::error::TocError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// On-disk TOC format, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TocFormat {
    #[default]
    Text,
    Json,
}

impl TocFormat {
    /// `.txt` → Text, `.json` → Json (case-insensitive).
    pub fn from_path(path: &Path) -> Result<Self, TocError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("txt") => Ok(TocFormat::Text),
            Some("json") => Ok(TocFormat::Json),
            _ => Err(TocError::UnsupportedTocFormat {
                path: path.to_path_buf(),
            }),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            TocFormat::Text => "txt",
            TocFormat::Json => "json",
        }
    }

    /// Serialise entries in this format.
    pub fn render(&self, entries: &[TocEntry]) -> Result<String, TocError> {
        match self {
            TocFormat::Text => Ok(render_text(entries)),
            TocFormat::Json => render_json(entries),
        }
    }
}

impl FromStr for TocFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "txt" | "text" => Ok(TocFormat::Text),
            "json" => Ok(TocFormat::Json),
            other => Err(format!("unknown TOC format '{other}' (expected txt or json)")),
        }
    }
}

impl fmt::Display for TocFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Indented text listing, one `"{tabs}{title} {page}\n"` line per entry.
pub fn render_text(entries: &[TocEntry]) -> String {
    let mut out = String::new();
    for e in entries {
        let indent = "\t".repeat(e.level.saturating_sub(1) as usize);
        out.push_str(&format!("{indent}{} {}\n", e.title.trim(), e.page));
    }
    out
}

pub fn render_json(entries: &[TocEntry]) -> Result<String, TocError> {
    serde_json::to_string(entries)
        .map_err(|e| TocError::Internal(format!("TOC serialisation failed: {e}")))
}
