//! Cleanup transform for text TOC listings (usually raw OCR output).
//!
//! ## Rule Order
//!
//! Three independently toggled rules run per line, each on the output of
//! the previous one:
//!
//! 1. Strip dot leaders (`Intro ........ 12` → `Intro 12`)
//! 2. Re-indent from the classifier (`1.1 Background 7` → `\t1.1 Background 7`)
//! 3. Shift the trailing page number by a fixed amount
//!
//! Dots go first so the classifier never sees leader noise, and the shift
//! goes last so it applies to the final trailing number.

use crate::error::TocError;
use crate::pipeline::classify::classify_title;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Which cleanup rules to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupOptions {
    pub remove_trailing_dots: bool,
    pub add_indent: bool,
    /// Added to every trailing page number. 0 disables the rule.
    pub page_shift: i32,
}

impl Default for CleanupOptions {
    fn default() -> Self {
        Self {
            remove_trailing_dots: true,
            add_indent: true,
            page_shift: 0,
        }
    }
}

/// Apply the enabled rules to every line of `input`.
///
/// Output always ends with a newline. With re-indenting on, blank lines
/// are dropped.
pub fn transform_toc_text(input: &str, opts: &CleanupOptions) -> Result<String, TocError> {
    let input = input.strip_prefix('\u{FEFF}').unwrap_or(input);
    let mut out = String::with_capacity(input.len());
    for (i, line) in input.lines().enumerate() {
        if let Some(cleaned) = transform_line(line, i + 1, opts)? {
            out.push_str(&cleaned);
            out.push('\n');
        }
    }
    Ok(out)
}

/// Clean one line. `line_no` is 1-based and only used in errors.
pub fn transform_line(
    line: &str,
    line_no: usize,
    opts: &CleanupOptions,
) -> Result<Option<String>, TocError> {
    let mut s = line.to_string();
    if opts.remove_trailing_dots {
        s = strip_dot_leaders(&s);
    }
    if opts.add_indent {
        match reindent(&s) {
            Some(indented) => s = indented,
            None => return Ok(None),
        }
    }
    if opts.page_shift != 0 {
        s = shift_page(&s, line_no, opts.page_shift)?;
    }
    Ok(Some(s))
}

// ── Rule 1: Strip dot leaders ────────────────────────────────────────────────

// Any run of dots (also `·` and `…`) directly before the optional page
// number. A trailing dotted number is split too: "Section 1.2" becomes
// "Section 1 2".
static RE_DOT_LEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*(?:[.·…]\s*)+([0-9]*\s*)$").unwrap());

fn strip_dot_leaders(line: &str) -> String {
    RE_DOT_LEADER
        .replace(line, " ${1}")
        .trim_end()
        .to_string()
}

// ── Rule 2: Re-indent from the classifier ────────────────────────────────────

fn reindent(line: &str) -> Option<String> {
    let title = classify_title(line);
    if title.text.is_empty() {
        return None;
    }
    let indent = "\t".repeat(title.level.saturating_sub(1) as usize);
    Some(format!("{indent}{}", title.text))
}

// ── Rule 3: Shift the page number ────────────────────────────────────────────

static RE_PAGE_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"([0-9]+)(\s*)$").unwrap());

fn shift_page(line: &str, line_no: usize, shift: i32) -> Result<String, TocError> {
    let Some(m) = RE_PAGE_TOKEN.captures(line).and_then(|c| c.get(1)) else {
        return Ok(line.to_string());
    };
    let page: i64 = m.as_str().parse().unwrap_or(i64::MAX);
    let shifted = page.saturating_add(i64::from(shift));
    if shifted < 0 {
        return Err(TocError::InvalidPageShift {
            line: line_no,
            page,
            shift,
        });
    }
    Ok(format!(
        "{}{}{}",
        &line[..m.start()],
        shifted,
        &line[m.end()..]
    ))
}
