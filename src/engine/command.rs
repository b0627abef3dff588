//! Layout analysis through an external command.
//!
//! The command gets the page PNG path as its last argument and prints a
//! JSON array of regions on stdout, in the PP-Structure shape:
//!
//! ```json
//! [{"type": "title", "bbox": [12, 40, 480, 72], "score": 0.97},
//!  {"type": "text",  "bbox": [12, 90, 480, 400]}]
//! ```
//!
//! Unknown `type` values map to [`RegionKind::Other`] and are ignored by
//! OCR mode.

use crate::engine::LayoutDetector;
use crate::entry::{BBox, LayoutRegion, RegionKind};
use crate::error::TocError;
use crate::pipeline::scratch::PageImage;
use serde::Deserialize;
use std::ffi::OsString;
use std::process::Command;
use tracing::debug;

/// [`LayoutDetector`] that shells out to a layout-analysis program.
#[derive(Debug, Clone)]
pub struct CommandLayout {
    program: OsString,
    args: Vec<OsString>,
}

impl CommandLayout {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Split a command line on whitespace: first word is the program.
    pub fn from_command_line(line: &str) -> Result<Self, TocError> {
        let mut words = line.split_whitespace();
        let program = words.next().ok_or_else(|| {
            TocError::InvalidConfig("layout command is empty".to_string())
        })?;
        Ok(Self {
            program: program.into(),
            args: words.map(OsString::from).collect(),
        })
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }
}

impl LayoutDetector for CommandLayout {
    fn name(&self) -> &str {
        "layout-command"
    }

    fn detect_regions(&self, page: &PageImage<'_>) -> Result<Vec<LayoutRegion>, TocError> {
        let path = page.path()?;
        let out = Command::new(&self.program)
            .args(&self.args)
            .arg(path)
            .output()
            .map_err(|e| TocError::EngineUnavailable {
                engine: self.name().to_string(),
                detail: format!("cannot run '{}': {}", self.program.to_string_lossy(), e),
            })?;

        if !out.status.success() {
            return Err(TocError::EngineFailed {
                engine: self.name().to_string(),
                page: page.page_number(),
                detail: format!(
                    "exit {}: {}",
                    out.status.code().unwrap_or(-1),
                    String::from_utf8_lossy(&out.stderr).trim()
                ),
            });
        }

        let regions = parse_regions(&out.stdout).map_err(|e| TocError::EngineFailed {
            engine: self.name().to_string(),
            page: page.page_number(),
            detail: format!("unreadable region JSON: {}", e),
        })?;
        debug!(
            "layout: {} regions on page {}",
            regions.len(),
            page.page_number()
        );
        Ok(regions)
    }
}

#[derive(Deserialize)]
struct RawRegion {
    #[serde(rename = "type")]
    kind: String,
    bbox: [f32; 4],
    #[serde(default)]
    score: Option<f32>,
}

/// Parse the region JSON a layout command prints.
pub fn parse_regions(json: &[u8]) -> Result<Vec<LayoutRegion>, serde_json::Error> {
    let raw: Vec<RawRegion> = serde_json::from_slice(json)?;
    Ok(raw
        .into_iter()
        .map(|r| {
            let kind = serde_json::from_value(serde_json::Value::String(r.kind.to_ascii_lowercase()))
                .unwrap_or(RegionKind::Other);
            let [x0, y0, x1, y1] = r.bbox;
            LayoutRegion {
                kind,
                bbox: BBox::new(x0, y0, x1, y1),
                score: r.score,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pp_structure_regions() {
        let json = br#"[
            {"type": "title", "bbox": [12, 40, 480, 72], "score": 0.97},
            {"type": "Text", "bbox": [480, 400, 12, 90]},
            {"type": "seal", "bbox": [0, 0, 1, 1]}
        ]"#;
        let regions = parse_regions(json).unwrap();
        assert_eq!(regions.len(), 3);
        assert_eq!(regions[0].kind, RegionKind::Title);
        assert_eq!(regions[0].score, Some(0.97));
        assert_eq!(regions[1].kind, RegionKind::Text);
        assert_eq!(regions[1].bbox, BBox::new(12.0, 90.0, 480.0, 400.0));
        assert_eq!(regions[2].kind, RegionKind::Other);
    }

    #[test]
    fn rejects_non_array() {
        assert!(parse_regions(br#"{"type": "title"}"#).is_err());
    }

    #[test]
    fn command_line_split() {
        let c = CommandLayout::from_command_line("python3 layout.py --lang en").unwrap();
        assert_eq!(c.program, OsString::from("python3"));
        assert_eq!(c.args.len(), 3);
        assert!(CommandLayout::from_command_line("   ").is_err());
    }
}
