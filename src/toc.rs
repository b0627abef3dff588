//! TOC entry points: attach, extract, clean, and OCR text export.
//!
//! Every function here is `async` and moves the blocking work (lopdf
//! parsing, pdfium rendering, engine subprocesses) onto
//! `tokio::task::spawn_blocking`. Outputs are written atomically: when a
//! function returns `Err`, no output file exists.
//!
//! ## Typical OCR workflow
//!
//! ```text
//! ocr_to_text ──▶ {stem}-ocr.txt ──▶ clean_toc_file ──▶ (hand edit) ──▶ add_toc_from_file
//! ```
//!
//! or, when the document has real headings, one step: [`add_toc_from_ocr`].

use crate::config::TocConfig;
use crate::document::PdfFile;
use crate::engine::{OcrEngines, TextRecognizer};
use crate::entry::TocEntry;
use crate::error::TocError;
use crate::format::TocFormat;
use crate::output::{write_atomic, TocOutput, TocSource, TocStats};
use crate::pipeline::cleanup::{transform_toc_text, CleanupOptions};
use crate::pipeline::render::{self, PageRenderer, PageSource};
use crate::pipeline::scratch::Scratch;
use crate::pipeline::{self, ingest, input, ocr};
use image::DynamicImage;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Attach the TOC listed in `toc_path` (`.txt` or `.json`) to `pdf_path`
/// and write the result to `output_path`.
///
/// # Errors
/// - the PDF or TOC file is missing, unreadable or malformed
/// - any entry lands outside the document after `config.offset`
pub async fn add_toc_from_file(
    pdf_path: impl AsRef<Path>,
    toc_path: impl AsRef<Path>,
    config: &TocConfig,
    output_path: impl AsRef<Path>,
) -> Result<TocOutput, TocError> {
    let pdf_path = pdf_path.as_ref().to_path_buf();
    let toc_path = toc_path.as_ref().to_path_buf();
    let output_path = output_path.as_ref().to_path_buf();
    let offset = config.offset;

    run_blocking("TOC attach", move || {
        let start = Instant::now();
        info!(
            "Attaching TOC {} to {}",
            toc_path.display(),
            pdf_path.display()
        );
        let mut pdf = PdfFile::open(&pdf_path)?;
        let page_count = pdf.page_count();

        let format = TocFormat::from_path(&toc_path)?;
        let text = input::read_text(&toc_path)?;
        let (entries, source) = match format {
            TocFormat::Text => (ingest::parse_text_toc(&text, page_count), TocSource::Text),
            TocFormat::Json => (ingest::parse_json_toc(&text)?, TocSource::Json),
        };
        if entries.is_empty() {
            warn!("{} contains no entries", toc_path.display());
        }

        attach(&mut pdf, entries, offset, source, 0, start, &output_path)
    })
    .await
}

/// Build a TOC by OCR-ing the heading regions of `pdf_path` and attach it.
///
/// Pages are rendered with pdfium (see [`render::bind_pdfium`]).
pub async fn add_toc_from_ocr(
    pdf_path: impl AsRef<Path>,
    engines: &OcrEngines,
    config: &TocConfig,
    output_path: impl AsRef<Path>,
) -> Result<TocOutput, TocError> {
    let pdf_path = pdf_path.as_ref().to_path_buf();
    let output_path = output_path.as_ref().to_path_buf();
    let engines = engines.clone();
    let config = config.clone();

    run_blocking("OCR TOC", move || {
        let pdf = PdfFile::open(&pdf_path)?;
        let pdfium = render::bind_pdfium()?;
        let renderer = PageRenderer::open(&pdfium, &pdf_path, config.max_rendered_pixels)?;
        ocr_toc_blocking(pdf, &renderer, &engines, &config, &output_path)
    })
    .await
}

/// Like [`add_toc_from_ocr`], but OCR runs on `pages` (one image per PDF
/// page) instead of pdfium renders. Useful when the scans are at hand in
/// better quality than the PDF.
pub async fn add_toc_from_images(
    pdf_path: impl AsRef<Path>,
    pages: Vec<DynamicImage>,
    engines: &OcrEngines,
    config: &TocConfig,
    output_path: impl AsRef<Path>,
) -> Result<TocOutput, TocError> {
    let pdf_path = pdf_path.as_ref().to_path_buf();
    let output_path = output_path.as_ref().to_path_buf();
    let engines = engines.clone();
    let config = config.clone();

    run_blocking("OCR TOC", move || {
        let pdf = PdfFile::open(&pdf_path)?;
        ocr_toc_blocking(pdf, &pages, &engines, &config, &output_path)
    })
    .await
}

/// Write the outline of `pdf_path` to `output_path` as text or JSON.
pub async fn extract_toc(
    pdf_path: impl AsRef<Path>,
    format: TocFormat,
    output_path: impl AsRef<Path>,
) -> Result<Vec<TocEntry>, TocError> {
    let pdf_path = pdf_path.as_ref().to_path_buf();
    let output_path = output_path.as_ref().to_path_buf();

    run_blocking("TOC extract", move || {
        let pdf = PdfFile::open(&pdf_path)?;
        let entries = pdf.outline()?;
        let rendered = format.render(&entries)?;
        write_atomic(&output_path, rendered.as_bytes())?;
        info!(
            "Extracted {} entries to {}",
            entries.len(),
            output_path.display()
        );
        Ok(entries)
    })
    .await
}

/// Run the cleanup transform over a text TOC. Returns the cleaned text.
pub async fn clean_toc_file(
    toc_path: impl AsRef<Path>,
    options: &CleanupOptions,
    output_path: impl AsRef<Path>,
) -> Result<String, TocError> {
    let toc_path = toc_path.as_ref().to_path_buf();
    let output_path = output_path.as_ref().to_path_buf();
    let options = *options;

    run_blocking("TOC cleanup", move || {
        let text = input::read_text(&toc_path)?;
        let cleaned = transform_toc_text(&text, &options)?;
        write_atomic(&output_path, cleaned.as_bytes())?;
        info!(
            "Cleaned {} → {} ({} lines)",
            toc_path.display(),
            output_path.display(),
            cleaned.lines().count()
        );
        Ok(cleaned)
    })
    .await
}

/// OCR the full text of the selected pages into a plain text file, one
/// line per reconstructed row. Returns the text.
pub async fn ocr_to_text(
    pdf_path: impl AsRef<Path>,
    recognizer: Arc<dyn TextRecognizer>,
    config: &TocConfig,
    output_path: impl AsRef<Path>,
) -> Result<String, TocError> {
    let pdf_path = pdf_path.as_ref().to_path_buf();
    let output_path = output_path.as_ref().to_path_buf();
    let config = config.clone();

    run_blocking("OCR text", move || {
        let page_count = PdfFile::open(&pdf_path)?.page_count();
        let indices = config.pages.resolve_sorted(page_count)?;
        let pdfium = render::bind_pdfium()?;
        let renderer = PageRenderer::open(&pdfium, &pdf_path, config.max_rendered_pixels)?;
        let scratch = Scratch::new()?;

        let text = ocr::ocr_pages_to_text(&renderer, &indices, recognizer.as_ref(), &config, &scratch)?;
        write_atomic(&output_path, text.as_bytes())?;
        info!(
            "OCR text of {} pages written to {}",
            indices.len(),
            output_path.display()
        );
        Ok(text)
    })
    .await
}

/// Synchronous wrapper around [`add_toc_from_file`].
///
/// Creates a temporary tokio runtime internally.
pub fn add_toc_from_file_sync(
    pdf_path: impl AsRef<Path>,
    toc_path: impl AsRef<Path>,
    config: &TocConfig,
    output_path: impl AsRef<Path>,
) -> Result<TocOutput, TocError> {
    runtime()?.block_on(add_toc_from_file(pdf_path, toc_path, config, output_path))
}

/// Synchronous wrapper around [`add_toc_from_ocr`].
pub fn add_toc_from_ocr_sync(
    pdf_path: impl AsRef<Path>,
    engines: &OcrEngines,
    config: &TocConfig,
    output_path: impl AsRef<Path>,
) -> Result<TocOutput, TocError> {
    runtime()?.block_on(add_toc_from_ocr(pdf_path, engines, config, output_path))
}

/// `{dir}/{stem}{suffix}.{ext}` next to `input`.
///
/// ```rust
/// use pdf_toolbox::toc::default_output_path;
/// use std::path::Path;
///
/// assert_eq!(
///     default_output_path(Path::new("books/manual.pdf"), "-toc", "txt"),
///     Path::new("books/manual-toc.txt"),
/// );
/// ```
pub fn default_output_path(input: &Path, suffix: &str, ext: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    input.with_file_name(format!("{}{}.{}", stem, suffix, ext))
}

// ── Shared tail ──────────────────────────────────────────────────────────

fn ocr_toc_blocking(
    mut pdf: PdfFile,
    source: &dyn PageSource,
    engines: &OcrEngines,
    config: &TocConfig,
    output_path: &Path,
) -> Result<TocOutput, TocError> {
    let start = Instant::now();
    let page_count = pdf.page_count();
    if source.page_count() != page_count {
        return Err(TocError::InvalidConfig(format!(
            "{} page images for a {}-page document",
            source.page_count(),
            page_count
        )));
    }
    let indices = config.pages.resolve_sorted(page_count)?;
    info!(
        "OCR TOC for {}: {} of {} pages",
        pdf.path().display(),
        indices.len(),
        page_count
    );

    let entries = {
        let scratch = Scratch::new()?;
        ocr::scan_pages(source, &indices, engines, config, &scratch)?
    };

    attach(
        &mut pdf,
        entries,
        config.offset,
        TocSource::Ocr,
        indices.len(),
        start,
        output_path,
    )
}

fn attach(
    pdf: &mut PdfFile,
    entries: Vec<TocEntry>,
    offset: i32,
    source: TocSource,
    pages_scanned: usize,
    start: Instant,
    output_path: &Path,
) -> Result<TocOutput, TocError> {
    let page_count = pdf.page_count();
    let finalized = pipeline::finalize(entries, offset, page_count)?;
    pdf.set_outline(&finalized.entries)?;
    pdf.save(output_path)?;

    let stats = TocStats {
        source,
        page_count,
        pages_scanned,
        entries: finalized.entries.len(),
        levels_repaired: finalized.levels_repaired,
        total_duration_ms: start.elapsed().as_millis() as u64,
    };
    info!(
        "TOC attached: {} entries, {} levels repaired, {}ms",
        stats.entries, stats.levels_repaired, stats.total_duration_ms
    );

    Ok(TocOutput {
        entries: finalized.entries,
        stats,
        output_path: output_path.to_path_buf(),
    })
}

async fn run_blocking<T, F>(what: &'static str, f: F) -> Result<T, TocError>
where
    F: FnOnce() -> Result<T, TocError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| TocError::Internal(format!("{} task panicked: {}", what, e)))?
}

fn runtime() -> Result<tokio::runtime::Runtime, TocError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| TocError::Internal(format!("Failed to create tokio runtime: {}", e)))
}
