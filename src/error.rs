//! Error types for the pdf-toolbox library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`TocError`]: **Fatal**: the operation cannot produce a trustworthy
//!   result (unreadable input, malformed TOC file, a page number that points
//!   outside the document, an OCR engine that crashed). Returned as
//!   `Err(TocError)` from every public entry point. Nothing is written to
//!   disk when one is returned.
//!
//! * [`ClassifyError`]: **Non-fatal**: a single title line could not be
//!   classified. The classifier logs it and degrades the line to a level-1
//!   entry; construction carries on with the rest of the document.
//!
//! OCR text is noisy by nature, so only structural and collaborator failures
//! may abort a run. Anything that goes wrong with one recognised line stays
//! local to that line.

use crate::range::RangeSyntaxError;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdf-toolbox library.
#[derive(Debug, Error)]
pub enum TocError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// Reading an input file failed after it was opened.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref or object structure cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}\nTry repairing with: qpdf input.pdf output.pdf")]
    CorruptPdf { path: PathBuf, detail: String },

    /// A selected page index is past the end of the document.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// pdfium-render returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// The in-memory document could not be serialised.
    #[error("Failed to serialise PDF for '{path}': {detail}")]
    PdfWriteFailed { path: PathBuf, detail: String },

    // ── TOC errors ────────────────────────────────────────────────────────
    /// A page range expression could not be parsed.
    #[error(transparent)]
    RangeSyntax(#[from] RangeSyntaxError),

    /// A structured TOC file did not contain `[level, title, page]` rows.
    #[error("Malformed TOC: {detail}")]
    MalformedToc { detail: String },

    /// The TOC file extension is neither `.txt` nor `.json`.
    #[error("Unsupported TOC file format: '{path}'\nUse a .txt or .json file.")]
    UnsupportedTocFormat { path: PathBuf },

    /// A TOC entry points outside the document after the offset was applied.
    #[error(
        "TOC entry '{title}' points to page {page}, but the document has {total} pages\n\
Adjust --offset or fix the page number in the TOC file."
    )]
    EntryOutOfRange { title: String, page: i64, total: usize },

    /// Shifting a page number in a TOC text file would make it negative.
    #[error("Line {line}: shifting page {page} by {shift} gives a negative page number")]
    InvalidPageShift { line: usize, page: i64, shift: i32 },

    // ── Engine errors ─────────────────────────────────────────────────────
    /// An OCR or layout engine binary could not be started.
    #[error("OCR engine '{engine}' is not available: {detail}")]
    EngineUnavailable { engine: String, detail: String },

    /// An OCR or layout engine ran but reported a failure.
    #[error("OCR engine '{engine}' failed on page {page}: {detail}")]
    EngineFailed {
        engine: String,
        page: usize,
        detail: String,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
OCR mode renders pages with pdfium. You can:\n\
  • Install libpdfium system-wide, or\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single title line.
///
/// Never propagated past the classifier: [`crate::pipeline::classify::classify_title`]
/// logs it and falls back to a level-1 verbatim entry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassifyError {
    /// The line claims a nesting depth no outline viewer can display.
    #[error("title nesting depth {depth} exceeds the maximum of {max}")]
    TooDeep { depth: usize, max: u32 },
}
