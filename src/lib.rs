//! # pdf-toolbox
//!
//! Build, attach, extract and clean up PDF tables of contents (outlines,
//! a.k.a. bookmarks), plus the page operations that usually go with them.
//!
//! ## Why this crate?
//!
//! Scanned books and many generated PDFs ship without an outline, which
//! makes a 600-page document painful to navigate. A TOC can come from two
//! places: a listing someone typed (or cleaned up from OCR output), or the
//! headings printed on the pages themselves. This crate handles both and
//! funnels them through the same validation and hierarchy repair, so the
//! outline written back is always one a viewer can display.
//!
//! ## Pipeline Overview
//!
//! ```text
//! TOC file (.txt / .json)          PDF pages
//!  │                                 │
//!  ├─ ingest  trailing page,         ├─ render   pdfium, spawn_blocking
//!  │          title classifier       ├─ layout   title regions only
//!  │                                 ├─ ocr      rows in reading order,
//!  │                                 │           title classifier
//!  └───────────────┬─────────────────┘
//!                  ├─ finalize  offset, bounds check, hierarchy repair
//!                  └─ outline   written with lopdf, saved atomically
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf_toolbox::{add_toc_from_file, TocConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Printed page 1 is PDF page 13.
//!     let config = TocConfig::builder().offset(12).build()?;
//!     let output = add_toc_from_file("book.pdf", "toc.txt", &config, "book-toc.pdf").await?;
//!     eprintln!(
//!         "{} entries, {} levels repaired",
//!         output.stats.entries, output.stats.levels_repaired
//!     );
//!     Ok(())
//! }
//! ```
//!
//! A text TOC has one entry per line, the page number last and the
//! nesting implied by the numbering (`1.2.3 …`, `Chapter 4 …`, `第二章 …`)
//! or, failing that, by leading tabs:
//!
//! ```text
//! 1 Introduction 1
//! 1.1 Background 3
//! Chapter 2 Methods 10
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf-toolbox` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdf-toolbox = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod document;
pub mod engine;
pub mod entry;
pub mod error;
pub mod format;
pub mod output;
pub mod pages;
pub mod pipeline;
pub mod progress;
pub mod range;
pub mod toc;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{PageSelection, RegionMargin, TocConfig, TocConfigBuilder};
pub use document::PdfFile;
pub use engine::command::CommandLayout;
pub use engine::tesseract::{OcrLanguage, TesseractRecognizer};
pub use engine::{LayoutDetector, OcrEngines, TextRecognizer, WholePageLayout};
pub use entry::{BBox, LayoutRegion, Point, RegionKind, TextFragment, TocEntry};
pub use error::{ClassifyError, TocError};
pub use format::TocFormat;
pub use output::{TocOutput, TocSource, TocStats};
pub use pipeline::classify::classify_title;
pub use pipeline::cleanup::{transform_toc_text, CleanupOptions};
pub use pipeline::repair::repair_levels;
pub use progress::{NoopProgressCallback, ProgressCallback, TocProgressCallback};
pub use range::{parse_range, PageIndices, RangeSpec, RangeSyntaxError};
pub use toc::{
    add_toc_from_file, add_toc_from_file_sync, add_toc_from_images, add_toc_from_ocr,
    add_toc_from_ocr_sync, clean_toc_file, default_output_path, extract_toc, ocr_to_text,
};
