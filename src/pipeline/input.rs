//! Input validation: make sure a user-supplied path is a readable PDF.
//!
//! lopdf and pdfium both produce cryptic errors for a missing file or a
//! text file with a `.pdf` name. Checking the `%PDF` magic bytes up front
//! lets callers report something meaningful instead.

use crate::error::TocError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Validate existence, read permission and PDF magic bytes.
pub fn resolve_pdf(path: &Path) -> Result<PathBuf, TocError> {
    let path = path.to_path_buf();

    if !path.exists() {
        return Err(TocError::FileNotFound { path });
    }

    match std::fs::File::open(&path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
                return Err(TocError::NotAPdf { path, magic });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(TocError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(TocError::FileNotFound { path });
        }
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(path)
}

/// Read a UTF-8 text input (TOC listings), mapping I/O failures.
pub fn read_text(path: &Path) -> Result<String, TocError> {
    std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => TocError::FileNotFound {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::PermissionDenied => TocError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => TocError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        },
    })
}
