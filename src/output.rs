//! Result types returned by the TOC entry points.

use crate::entry::TocEntry;
use crate::error::TocError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Where the entries of a TOC came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TocSource {
    Text,
    Json,
    Ocr,
}

/// Counters describing one TOC construction run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocStats {
    pub source: TocSource,
    /// Pages in the target document.
    pub page_count: usize,
    /// Pages rendered and recognised (0 in file mode).
    pub pages_scanned: usize,
    /// Entries attached to the outline.
    pub entries: usize,
    /// Entries whose level the repair pass changed.
    pub levels_repaired: usize,
    pub total_duration_ms: u64,
}

/// A TOC that was built and written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TocOutput {
    pub entries: Vec<TocEntry>,
    pub stats: TocStats,
    /// The PDF the outline was written to.
    pub output_path: PathBuf,
}

/// Write `bytes` to `path` via a sibling `.tmp` file and a rename, so a
/// failure never leaves a partial output behind.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), TocError> {
    let fail = |source: std::io::Error| TocError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(fail)?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    if let Err(e) = std::fs::write(&tmp_path, bytes) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(fail(e));
    }
    std::fs::rename(&tmp_path, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp_path);
        fail(e)
    })
}
