//! Page range mini-language: `"1-3,5,7-10"`.
//!
//! Parts are comma separated. Each part is a single 1-based page `N` or an
//! inclusive pair `A-B` with `A <= B`. Parsing produces zero-based indices.
//!
//! Order and duplicates are preserved exactly as written: `"3,1,1"` means
//! "page 3, then page 1 twice", which is what slicing and reordering rely on.
//! Callers that need a set (OCR scanning) sort and deduplicate themselves.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;
use thiserror::Error;

/// A range expression that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid page range '{part}' in '{expr}': {reason}")]
pub struct RangeSyntaxError {
    /// The whole expression as supplied.
    pub expr: String,
    /// The comma-separated part that failed.
    pub part: String,
    pub reason: String,
}

/// One comma-separated part of a range expression, zero-based and inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageGroup {
    Single(usize),
    Run { start: usize, end: usize },
}

impl PageGroup {
    pub fn indices(&self) -> RangeInclusive<usize> {
        match *self {
            PageGroup::Single(i) => i..=i,
            PageGroup::Run { start, end } => start..=end,
        }
    }

    /// Largest index the group touches.
    pub fn last(&self) -> usize {
        match *self {
            PageGroup::Single(i) => i,
            PageGroup::Run { end, .. } => end,
        }
    }
}

/// A parsed range expression: an ordered list of [`PageGroup`]s.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeSpec {
    groups: Vec<PageGroup>,
}

impl RangeSpec {
    pub fn parse(expr: &str) -> Result<Self, RangeSyntaxError> {
        let trimmed = expr.trim();
        let fail = |part: &str, reason: &str| RangeSyntaxError {
            expr: expr.to_string(),
            part: part.to_string(),
            reason: reason.to_string(),
        };

        if trimmed.is_empty() {
            return Err(fail(expr, "expression is empty"));
        }

        let mut groups = Vec::new();
        for raw in trimmed.split(',') {
            let part = raw.trim();
            if part.is_empty() {
                return Err(fail(raw, "empty part"));
            }
            let numbers: Vec<&str> = part.split('-').collect();
            let group = match numbers.as_slice() {
                [single] => PageGroup::Single(parse_page(single).map_err(|r| fail(part, &r))?),
                [a, b] => {
                    let start = parse_page(a).map_err(|r| fail(part, &r))?;
                    let end = parse_page(b).map_err(|r| fail(part, &r))?;
                    if start > end {
                        return Err(fail(part, "start is after end"));
                    }
                    PageGroup::Run { start, end }
                }
                _ => return Err(fail(part, "a range has at most two numbers")),
            };
            groups.push(group);
        }

        Ok(Self { groups })
    }

    pub fn groups(&self) -> &[PageGroup] {
        &self.groups
    }

    /// All indices in expression order, duplicates kept.
    pub fn flatten(&self) -> Vec<usize> {
        self.groups.iter().flat_map(PageGroup::indices).collect()
    }

    /// One index list per part, for callers that emit one output per part.
    pub fn grouped(&self) -> Vec<Vec<usize>> {
        self.groups.iter().map(|g| g.indices().collect()).collect()
    }

    /// Largest index referenced anywhere in the expression.
    pub fn max_index(&self) -> Option<usize> {
        self.groups.iter().map(PageGroup::last).max()
    }
}

impl FromStr for RangeSpec {
    type Err = RangeSyntaxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for RangeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, group) in self.groups.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            match *group {
                PageGroup::Single(p) => write!(f, "{}", p + 1)?,
                PageGroup::Run { start, end } => write!(f, "{}-{}", start + 1, end + 1)?,
            }
        }
        Ok(())
    }
}

/// Result of [`parse_range`]: flat when `multiple` is false, grouped otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageIndices {
    Flat(Vec<usize>),
    Grouped(Vec<Vec<usize>>),
}

/// Parse a range expression into zero-based page indices.
///
/// ```rust
/// use pdf_toolbox::range::{parse_range, PageIndices};
///
/// assert_eq!(
///     parse_range("1-3,5,7-10", false).unwrap(),
///     PageIndices::Flat(vec![0, 1, 2, 4, 6, 7, 8, 9])
/// );
/// assert_eq!(
///     parse_range("2-2", true).unwrap(),
///     PageIndices::Grouped(vec![vec![1]])
/// );
/// ```
pub fn parse_range(expr: &str, multiple: bool) -> Result<PageIndices, RangeSyntaxError> {
    let spec = RangeSpec::parse(expr)?;
    Ok(if multiple {
        PageIndices::Grouped(spec.grouped())
    } else {
        PageIndices::Flat(spec.flatten())
    })
}

fn parse_page(token: &str) -> Result<usize, String> {
    let token = token.trim();
    let n: usize = token
        .parse()
        .map_err(|_| format!("'{token}' is not a page number"))?;
    if n == 0 {
        return Err("pages are 1-indexed".to_string());
    }
    Ok(n - 1)
}
