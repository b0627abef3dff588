//! Text recognition through the `tesseract` command-line tool.
//!
//! Runs `tesseract <png> stdout -l <lang> --psm <n> tsv` and turns the TSV
//! word table into one [`TextFragment`] per recognised line.
//!
//! ## TSV columns
//!
//! ```text
//! level page_num block_num par_num line_num word_num left top width height conf text
//! ```
//!
//! Only level-5 rows (words) carry text. Words sharing
//! `(page, block, paragraph, line)` are one line.

use crate::engine::TextRecognizer;
use crate::entry::{BBox, TextFragment};
use crate::error::TocError;
use crate::pipeline::scratch::PageImage;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::process::Command;
use std::str::FromStr;
use tracing::debug;

/// Page segmentation mode used unless overridden: fully automatic.
pub const DEFAULT_PSM: u8 = 3;

/// OCR languages, named the way the command line accepts them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OcrLanguage {
    /// Simplified Chinese.
    #[default]
    Ch,
    En,
    Fr,
    German,
    It,
    Japan,
    Korean,
    Ru,
    /// Traditional Chinese.
    ChineseCht,
}

impl OcrLanguage {
    /// Tesseract traineddata name.
    pub fn tesseract_code(&self) -> &'static str {
        match self {
            OcrLanguage::Ch => "chi_sim",
            OcrLanguage::En => "eng",
            OcrLanguage::Fr => "fra",
            OcrLanguage::German => "deu",
            OcrLanguage::It => "ita",
            OcrLanguage::Japan => "jpn",
            OcrLanguage::Korean => "kor",
            OcrLanguage::Ru => "rus",
            OcrLanguage::ChineseCht => "chi_tra",
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            OcrLanguage::Ch => "ch",
            OcrLanguage::En => "en",
            OcrLanguage::Fr => "fr",
            OcrLanguage::German => "german",
            OcrLanguage::It => "it",
            OcrLanguage::Japan => "japan",
            OcrLanguage::Korean => "korean",
            OcrLanguage::Ru => "ru",
            OcrLanguage::ChineseCht => "chinese_cht",
        }
    }
}

impl fmt::Display for OcrLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OcrLanguage {
    type Err = TocError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ch" => Ok(OcrLanguage::Ch),
            "en" => Ok(OcrLanguage::En),
            "fr" => Ok(OcrLanguage::Fr),
            "german" => Ok(OcrLanguage::German),
            "it" => Ok(OcrLanguage::It),
            "japan" => Ok(OcrLanguage::Japan),
            "korean" => Ok(OcrLanguage::Korean),
            "ru" => Ok(OcrLanguage::Ru),
            "chinese_cht" => Ok(OcrLanguage::ChineseCht),
            other => Err(TocError::InvalidConfig(format!(
                "unknown OCR language '{}'; expected one of ch, en, fr, german, it, japan, korean, ru, chinese_cht",
                other
            ))),
        }
    }
}

/// [`TextRecognizer`] backed by the tesseract binary.
#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    program: PathBuf,
    language: String,
    psm: u8,
}

impl TesseractRecognizer {
    pub fn new(language: OcrLanguage) -> Self {
        Self {
            program: PathBuf::from("tesseract"),
            language: language.tesseract_code().to_string(),
            psm: DEFAULT_PSM,
        }
    }

    /// Use a specific binary instead of `tesseract` on `PATH`.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Raw `-l` argument, e.g. `"eng+chi_sim"`.
    pub fn with_language_code(mut self, code: impl Into<String>) -> Self {
        self.language = code.into();
        self
    }

    pub fn with_psm(mut self, psm: u8) -> Self {
        self.psm = psm;
        self
    }

    /// Run `tesseract --version` so a missing binary fails before any page
    /// is rendered.
    pub fn check_available(&self) -> Result<(), TocError> {
        let out = Command::new(&self.program)
            .arg("--version")
            .output()
            .map_err(|e| self.unavailable(e))?;
        if !out.status.success() {
            return Err(TocError::EngineUnavailable {
                engine: self.name().to_string(),
                detail: String::from_utf8_lossy(&out.stderr).trim().to_string(),
            });
        }
        Ok(())
    }

    fn unavailable(&self, e: std::io::Error) -> TocError {
        TocError::EngineUnavailable {
            engine: self.name().to_string(),
            detail: format!(
                "cannot run '{}': {}\nInstall tesseract-ocr or pass its path with --tesseract.",
                self.program.display(),
                e
            ),
        }
    }
}

impl TextRecognizer for TesseractRecognizer {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn recognize_text(&self, image: &PageImage<'_>) -> Result<Vec<TextFragment>, TocError> {
        let path = image.path()?;
        let out = Command::new(&self.program)
            .arg(path)
            .arg("stdout")
            .args(["-l", &self.language])
            .args(["--psm", &self.psm.to_string()])
            .arg("tsv")
            .output()
            .map_err(|e| self.unavailable(e))?;

        if !out.status.success() {
            return Err(TocError::EngineFailed {
                engine: self.name().to_string(),
                page: image.page_number(),
                detail: format!(
                    "exit {}: {}",
                    out.status.code().unwrap_or(-1),
                    String::from_utf8_lossy(&out.stderr).trim()
                ),
            });
        }

        let fragments = parse_tsv(&String::from_utf8_lossy(&out.stdout));
        debug!(
            "tesseract: {} lines on page {} ({}x{})",
            fragments.len(),
            image.page_number(),
            image.width(),
            image.height()
        );
        Ok(fragments)
    }
}

// ── TSV parsing ──────────────────────────────────────────────────────────

struct LineAcc {
    bbox: BBox,
    words: Vec<String>,
    conf_sum: f32,
}

/// Group tesseract TSV word rows into line fragments, in first-seen order.
///
/// Rows with negative confidence or blank text are skipped, as are rows
/// that don't parse. Confidence is the mean word confidence scaled to 0–1.
pub fn parse_tsv(tsv: &str) -> Vec<TextFragment> {
    let mut order: Vec<LineAcc> = Vec::new();
    let mut index: HashMap<(u32, u32, u32, u32), usize> = HashMap::new();

    for row in tsv.lines().skip(1) {
        let cols: Vec<&str> = row.split('\t').collect();
        if cols.len() < 12 || cols[0] != "5" {
            continue;
        }
        let text = cols[11..].join("\t");
        let text = text.trim();
        if text.is_empty() {
            continue;
        }
        let Some(key) = parse_key(&cols) else {
            continue;
        };
        let Some((bbox, conf)) = parse_geometry(&cols) else {
            continue;
        };
        if conf < 0.0 {
            continue;
        }

        match index.get(&key) {
            Some(&i) => {
                let acc = &mut order[i];
                acc.bbox = acc.bbox.union(&bbox);
                acc.words.push(text.to_string());
                acc.conf_sum += conf;
            }
            None => {
                index.insert(key, order.len());
                order.push(LineAcc {
                    bbox,
                    words: vec![text.to_string()],
                    conf_sum: conf,
                });
            }
        }
    }

    order
        .into_iter()
        .map(|acc| {
            let mean = acc.conf_sum / acc.words.len() as f32;
            TextFragment::from_bbox(acc.bbox, acc.words.join(" "), (mean / 100.0).clamp(0.0, 1.0))
        })
        .collect()
}

fn parse_key(cols: &[&str]) -> Option<(u32, u32, u32, u32)> {
    Some((
        cols[1].parse().ok()?,
        cols[2].parse().ok()?,
        cols[3].parse().ok()?,
        cols[4].parse().ok()?,
    ))
}

fn parse_geometry(cols: &[&str]) -> Option<(BBox, f32)> {
    let left: f32 = cols[6].parse().ok()?;
    let top: f32 = cols[7].parse().ok()?;
    let width: f32 = cols[8].parse().ok()?;
    let height: f32 = cols[9].parse().ok()?;
    let conf: f32 = cols[10].parse().ok()?;
    Some((BBox::new(left, top, left + width, top + height), conf))
}
