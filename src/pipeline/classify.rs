//! Title classification: raw line → (level, display text).
//!
//! ## Rule Order
//!
//! Rules are tried in a fixed order and the first match wins:
//!
//! 1. Numeric outline   `1.2.3 Overview`        → level = number of groups
//! 2. Chapter / part    `第三章 总论`, `Chapter 4 Results` → level 1
//! 3. Section           `第二节 方法`, `Section 2 Scope`   → level 2
//! 4. Indentation       `\t\tDetails`           → level = tabs + 1
//!
//! Rules 1–3 live in [`RULES`] so each can be tested on its own; rule 4 is
//! the fallback that always matches. The classifier never fails: a line the
//! rules reject with a [`ClassifyError`] becomes a level-1 verbatim entry and
//! a warning in the log.

use crate::error::ClassifyError;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Deepest level the classifier will emit.
pub const MAX_LEVEL: u32 = 16;

/// Output of [`classify_title`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedTitle {
    pub level: u32,
    pub text: String,
}

impl ClassifiedTitle {
    fn new(level: u32, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
        }
    }
}

/// One pattern rule: a regex with two capture groups (marker, remainder) and
/// a function deriving the level from the marker.
pub struct TitleRule {
    pub name: &'static str,
    pattern: &'static Lazy<Regex>,
    level: fn(&str) -> Result<u32, ClassifyError>,
}

impl TitleRule {
    /// `Ok(None)` when the rule does not match the line.
    pub fn apply(&self, line: &str) -> Result<Option<ClassifiedTitle>, ClassifyError> {
        let Some(caps) = self.pattern.captures(line) else {
            return Ok(None);
        };
        let (marker, rest) = marker_and_rest(&caps);
        let level = (self.level)(marker)?;
        Ok(Some(ClassifiedTitle::new(
            level,
            format!("{marker} {}", rest.trim()),
        )))
    }
}

// Group 1 is the marker; the remainder is whichever later group took part.
fn marker_and_rest<'h>(caps: &Captures<'h>) -> (&'h str, &'h str) {
    let marker = caps.get(1).map_or("", |m| m.as_str());
    let rest = caps
        .iter()
        .skip(2)
        .flatten()
        .next()
        .map_or("", |m| m.as_str());
    (marker, rest)
}

// ── Rule 1: Numeric outline ──────────────────────────────────────────────────

// The remainder must be separated by whitespace or start with a non-ASCII
// character; "3D printing" or "1.1Background" are not numbered headings.
static RE_NUMERIC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*((?:\d+\.)*\d+\.?)(?:\s+(\S.*)|([^\x00-\x7F].*))$").unwrap()
});

fn numeric_level(marker: &str) -> Result<u32, ClassifyError> {
    let depth = marker.split('.').filter(|g| !g.is_empty()).count();
    if depth > MAX_LEVEL as usize {
        return Err(ClassifyError::TooDeep {
            depth,
            max: MAX_LEVEL,
        });
    }
    Ok(depth as u32)
}

// ── Rule 2: Chapter / part marker ────────────────────────────────────────────

// Roman numerals up to 39 only; a looser class would swallow words like "civil".
static RE_CHAPTER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*(第[^节章编]{1,10}?[章编]|(?i:(?:chapter|part)\s+(?:\d+|x{1,3}(?:ix|iv|v?i{0,3})|ix|iv|v?i{1,3}|v)\b[.:]?))\s*(.+)$",
    )
    .unwrap()
});

fn top_level(_marker: &str) -> Result<u32, ClassifyError> {
    Ok(1)
}

// ── Rule 3: Section marker ───────────────────────────────────────────────────

static RE_SECTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(第[^节章编]{1,10}?节|(?i:section)\s+\d+(?:\.\d+)*\b[.:]?)\s*(.+)$").unwrap()
});

fn second_level(_marker: &str) -> Result<u32, ClassifyError> {
    Ok(2)
}

/// Pattern rules in priority order.
pub static RULES: [TitleRule; 3] = [
    TitleRule {
        name: "numeric",
        pattern: &RE_NUMERIC,
        level: numeric_level,
    },
    TitleRule {
        name: "chapter",
        pattern: &RE_CHAPTER,
        level: top_level,
    },
    TitleRule {
        name: "section",
        pattern: &RE_SECTION,
        level: second_level,
    },
];

// ── Rule 4: Indentation fallback ─────────────────────────────────────────────

fn by_indentation(line: &str) -> Result<ClassifiedTitle, ClassifyError> {
    let tabs = line.chars().take_while(|&c| c == '\t').count();
    if tabs >= MAX_LEVEL as usize {
        return Err(ClassifyError::TooDeep {
            depth: tabs + 1,
            max: MAX_LEVEL,
        });
    }
    Ok(ClassifiedTitle::new(tabs as u32 + 1, line.trim_start()))
}

// ── Entry points ─────────────────────────────────────────────────────────────

/// Classify a line, reporting why it was rejected instead of degrading.
pub fn try_classify(raw: &str) -> Result<ClassifiedTitle, ClassifyError> {
    let line = raw.trim_end();
    if line.trim().is_empty() {
        return Ok(ClassifiedTitle::new(1, ""));
    }
    for rule in &RULES {
        if let Some(title) = rule.apply(line)? {
            return Ok(title);
        }
    }
    by_indentation(line)
}

/// Classify a raw title line. Never fails.
///
/// ```rust
/// use pdf_toolbox::pipeline::classify::classify_title;
///
/// let t = classify_title("1.2.3 Overview");
/// assert_eq!((t.level, t.text.as_str()), (3, "1.2.3 Overview"));
///
/// let t = classify_title("\t\tDetails");
/// assert_eq!((t.level, t.text.as_str()), (3, "Details"));
/// ```
pub fn classify_title(raw: &str) -> ClassifiedTitle {
    try_classify(raw).unwrap_or_else(|e| {
        warn!("Unclassifiable title {:?}: {}; keeping it at level 1", raw, e);
        ClassifiedTitle::new(1, raw.trim())
    })
}
