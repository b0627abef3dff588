//! CLI binary for pdf-toolbox.
//!
//! A thin shim over the library crate: each subcommand maps its flags to
//! a `TocConfig` / `CleanupOptions` or a `PdfFile` page operation and
//! prints a one-line summary.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use pdf_toolbox::{
    add_toc_from_file, add_toc_from_ocr, clean_toc_file, default_output_path, extract_toc,
    ocr_to_text, parse_range, CleanupOptions, CommandLayout, LayoutDetector, OcrEngines,
    OcrLanguage, PageIndices, PageSelection, PdfFile, ProgressCallback, TesseractRecognizer,
    TocConfig, TocFormat, TocProgressCallback, WholePageLayout,
};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress for OCR scans: a bar at the bottom and one log line
/// per page. Pages arrive strictly in order, so one start time suffices.
struct CliProgressCallback {
    bar: ProgressBar,
    /// What each page yields: "titles" for bookmark add, "lines" for ocr.
    unit: &'static str,
    page_started: Mutex<Option<Instant>>,
}

impl CliProgressCallback {
    fn new(unit: &'static str) -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            unit,
            page_started: Mutex::new(None),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Scanning");
        self.bar.reset_eta();
    }

    fn page_elapsed(&self) -> f64 {
        self.page_started
            .lock()
            .ok()
            .and_then(|mut t| t.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl TocProgressCallback for CliProgressCallback {
    fn on_scan_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Scanning {total_pages} pages…"))
        ));
    }

    fn on_page_start(&self, page_num: usize, _total_pages: usize) {
        if let Ok(mut t) = self.page_started.lock() {
            *t = Some(Instant::now());
        }
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, page_num: usize, _total_pages: usize, titles_found: usize) {
        self.bar.println(format!(
            "  {} Page {:>4}  {:<12}  {}",
            green("✓"),
            page_num,
            dim(&format!("{titles_found:>3} {}", self.unit)),
            dim(&format!("{:.1}s", self.page_elapsed())),
        ));
        self.bar.inc(1);
    }

    /// The scan stops at the first failed page, so the bar goes too.
    fn on_page_error(&self, page_num: usize, _total_pages: usize, error: &str) {
        let msg = match error.char_indices().nth(79) {
            Some((cut, _)) => format!("{}\u{2026}", &error[..cut]),
            None => error.to_string(),
        };
        self.bar.println(format!(
            "  {} Page {:>4}  {}  {}",
            red("✗"),
            page_num,
            red(&msg),
            dim(&format!("{:.1}s", self.page_elapsed())),
        ));
        self.bar.finish_and_clear();
    }

    fn on_scan_complete(&self, total_pages: usize, total_entries: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} pages scanned, {} {}",
            green("✔"),
            bold(&total_pages.to_string()),
            bold(&total_entries.to_string()),
            self.unit
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Attach a typed TOC; printed page 1 is PDF page 13
  pdf-toolbox bookmark add book.pdf --toc-file toc.txt --offset 12

  # OCR a printed contents listing on pages 5-8 (English scan)
  pdf-toolbox bookmark add book.pdf --lang en --range 5-8 --whole-page

  # Build the TOC from the headings a layout model finds on every page
  pdf-toolbox bookmark add book.pdf --lang en --layout-cmd "layout-detect --json"

  # Dump the current outline, fix it by hand, put it back
  pdf-toolbox bookmark extract book.pdf -o toc.txt
  pdf-toolbox bookmark clean toc.txt --shift 2
  pdf-toolbox bookmark add book.pdf --toc-file toc-toc-clean.txt

  # OCR pages to plain text
  pdf-toolbox ocr scan.pdf --range 1-3 --lang en

  # Page operations (pages are 1-indexed)
  pdf-toolbox slice book.pdf -r 1-10,20
  pdf-toolbox slice book.pdf -r 1-10,11-20 -m
  pdf-toolbox remove book.pdf -r 2,4-6
  pdf-toolbox rotate book.pdf -r 1-3 -a 90
  pdf-toolbox merge a.pdf b.pdf c.pdf -o all.pdf
  pdf-toolbox insert book.pdf cover.pdf --after 0

TOC FILE FORMAT:
  One entry per line, page number last. Nesting comes from the numbering
  (1 / 1.2 / 1.2.3, Chapter N, 第N章 …) or, failing that, leading tabs.
  A .json file holds [[level, "title", page], …].

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH          Path to libpdfium (OCR modes); default: system library
  TESSERACT_PATH           tesseract executable (default: tesseract on PATH)
  PDF_TOOLBOX_LAYOUT_CMD   Layout command emitting JSON regions
  PDF_TOOLBOX_LANG         Default OCR language
  RUST_LOG                 Overrides --verbose / --quiet log filtering
"#;

/// Build, extract and clean PDF bookmarks; OCR and page operations.
#[derive(Parser, Debug)]
#[command(
    name = "pdf-toolbox",
    version,
    about = "Build, extract and clean PDF bookmarks; OCR and page operations",
    long_about = "Attach a table of contents to a PDF from a typed listing or from the \
headings found on its pages by OCR, extract and clean existing outlines, and slice, \
remove, rotate, merge or insert pages.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PDF_TOOLBOX_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "PDF_TOOLBOX_QUIET")]
    quiet: bool,

    /// Disable the OCR progress bar.
    #[arg(long, global = true, env = "PDF_TOOLBOX_NO_PROGRESS")]
    no_progress: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Add, extract or clean bookmarks (the PDF outline).
    #[command(subcommand)]
    Bookmark(BookmarkCommand),

    /// OCR pages to a plain text file.
    Ocr(OcrTextArgs),

    #[command(flatten)]
    Pages(PageCommand),
}

/// Page operations; none of them needs OCR.
#[derive(Subcommand, Debug)]
enum PageCommand {
    /// Keep only the given pages, or split into one file per range.
    Slice {
        pdf: PathBuf,
        /// Pages to keep, e.g. 1-3,5.
        #[arg(short, long)]
        range: String,
        /// Write one file per comma-separated part.
        #[arg(short, long)]
        multiple: bool,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Delete pages.
    Remove {
        pdf: PathBuf,
        /// Pages to delete, e.g. 2,4-6.
        #[arg(short, long)]
        range: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Set the rotation of pages.
    Rotate {
        pdf: PathBuf,
        #[arg(short, long, default_value = "all")]
        range: PageSelection,
        /// Clockwise degrees, a multiple of 90.
        #[arg(short, long, allow_negative_numbers = true)]
        angle: i32,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Concatenate PDFs in the order given.
    Merge {
        #[arg(required = true, num_args = 2..)]
        pdfs: Vec<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Insert all pages of another PDF.
    Insert {
        pdf: PathBuf,
        other: PathBuf,
        /// Number of pages of <PDF> that stay in front (0 = prepend).
        #[arg(long)]
        after: usize,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum BookmarkCommand {
    /// Attach a TOC from a text/JSON file or, without --toc-file, from OCR.
    Add(AddArgs),

    /// Write the existing outline as text or JSON.
    Extract {
        pdf: PathBuf,
        #[arg(short, long, value_enum, default_value = "txt")]
        format: FormatArg,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Normalise a text TOC: strip dot leaders, re-indent, shift pages.
    Clean {
        toc: PathBuf,
        /// Keep dot leaders before page numbers.
        #[arg(long)]
        keep_dots: bool,
        /// Don't re-indent lines by their numbering.
        #[arg(long)]
        no_indent: bool,
        /// Add N to every page number.
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        shift: i32,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct AddArgs {
    pdf: PathBuf,

    /// Text (.txt) or JSON (.json) TOC; OCR the PDF when absent.
    #[arg(long)]
    toc_file: Option<PathBuf>,

    /// PDF page = printed page + offset.
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    offset: i32,

    #[command(flatten)]
    ocr: OcrArgs,

    /// Find title regions with an external layout command (JSON regions
    /// on stdout). OCR mode needs this or --whole-page.
    #[arg(long, env = "PDF_TOOLBOX_LAYOUT_CMD", conflicts_with = "whole_page")]
    layout_cmd: Option<String>,

    /// Treat every page as one title region (for printed contents pages).
    #[arg(long)]
    whole_page: bool,

    /// Pixel padding around each title region: X,Y or one value for both
    /// [default: 10,5].
    #[arg(long, value_name = "X,Y", value_parser = parse_margin)]
    margin: Option<(u32, u32)>,

    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct OcrTextArgs {
    pdf: PathBuf,

    #[command(flatten)]
    ocr: OcrArgs,

    #[arg(short, long)]
    output: Option<PathBuf>,
}

/// Flags shared by every command that OCRs pages.
#[derive(Args, Debug)]
struct OcrArgs {
    /// OCR language: ch, en, fr, german, it, japan, korean, ru, chinese_cht.
    #[arg(long, env = "PDF_TOOLBOX_LANG", default_value = "ch")]
    lang: OcrLanguage,

    /// Pages to scan: all, 5, 3-15 or 1,3,5-7.
    #[arg(short, long, default_value = "all")]
    range: PageSelection,

    /// Read pages as two columns, left before right.
    #[arg(long)]
    double_columns: bool,

    /// tesseract executable.
    #[arg(long, env = "TESSERACT_PATH", default_value = "tesseract")]
    tesseract: PathBuf,

    /// Vertical distance (px) within which fragments share a row.
    #[arg(long, default_value_t = 5.0)]
    tolerance: f32,

    /// Drop recognised text below this confidence (0-1).
    #[arg(long, default_value_t = 0.0)]
    min_confidence: f32,

    /// Longest rendered page edge in pixels.
    #[arg(long, default_value_t = 2000)]
    max_pixels: u32,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Txt,
    Json,
}

impl From<FormatArg> for TocFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Txt => TocFormat::Text,
            FormatArg::Json => TocFormat::Json,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let show_progress = !cli.quiet && !cli.no_progress;

    match cli.command {
        Command::Bookmark(BookmarkCommand::Add(args)) => {
            bookmark_add(args, show_progress, cli.quiet).await
        }
        Command::Bookmark(BookmarkCommand::Extract {
            pdf,
            format,
            output,
        }) => {
            let format = TocFormat::from(format);
            let output =
                output.unwrap_or_else(|| default_output_path(&pdf, "-toc", format.extension()));
            let entries = extract_toc(&pdf, format, &output)
                .await
                .context("Bookmark extraction failed")?;
            if !cli.quiet {
                if entries.is_empty() {
                    eprintln!("{} {} has no bookmarks", cyan("⚠"), pdf.display());
                }
                done(&format!("{} entries", entries.len()), &output);
            }
            Ok(())
        }
        Command::Bookmark(BookmarkCommand::Clean {
            toc,
            keep_dots,
            no_indent,
            shift,
            output,
        }) => {
            let options = CleanupOptions {
                remove_trailing_dots: !keep_dots,
                add_indent: !no_indent,
                page_shift: shift,
            };
            let output = output.unwrap_or_else(|| default_output_path(&toc, "-toc-clean", "txt"));
            let cleaned = clean_toc_file(&toc, &options, &output)
                .await
                .context("TOC cleanup failed")?;
            if !cli.quiet {
                done(&format!("{} lines", cleaned.lines().count()), &output);
            }
            Ok(())
        }
        Command::Ocr(args) => {
            let progress = show_progress.then(|| CliProgressCallback::new("lines"));
            let config = build_config(&args.ocr, 0, None, progress)?;
            let recognizer = recognizer(&args.ocr)?;
            let output = args
                .output
                .unwrap_or_else(|| default_output_path(&args.pdf, "-ocr", "txt"));
            let text = ocr_to_text(&args.pdf, Arc::new(recognizer), &config, &output)
                .await
                .context("OCR failed")?;
            if !cli.quiet {
                done(&format!("{} lines", text.lines().count()), &output);
            }
            Ok(())
        }
        Command::Pages(op) => {
            let quiet = cli.quiet;
            tokio::task::block_in_place(|| run_page_op(op, quiet))
        }
    }
}

async fn bookmark_add(args: AddArgs, show_progress: bool, quiet: bool) -> Result<()> {
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&args.pdf, "-toc", "pdf"));

    let result = if let Some(ref toc_file) = args.toc_file {
        let config = build_config(&args.ocr, args.offset, args.margin, None)?;
        add_toc_from_file(&args.pdf, toc_file, &config, &output)
            .await
            .context("Adding bookmarks from file failed")?
    } else {
        let progress = show_progress.then(|| CliProgressCallback::new("titles"));
        let config = build_config(&args.ocr, args.offset, args.margin, progress)?;
        let engines = OcrEngines::new(layout_for(&args)?, Arc::new(recognizer(&args.ocr)?));
        add_toc_from_ocr(&args.pdf, &engines, &config, &output)
            .await
            .context("Adding bookmarks from OCR failed")?
    };

    if !quiet {
        let stats = &result.stats;
        done(
            &format!(
                "{} entries  {} levels repaired  {}ms",
                stats.entries, stats.levels_repaired, stats.total_duration_ms
            ),
            &result.output_path,
        );
    }
    Ok(())
}

/// The layout detector OCR mode asked for. There is no silent default:
/// whole-page OCR on a body page yields every line as a title.
fn layout_for(args: &AddArgs) -> Result<Arc<dyn LayoutDetector>> {
    match (&args.layout_cmd, args.whole_page) {
        (Some(line), _) => Ok(Arc::new(
            CommandLayout::from_command_line(line).context("Invalid --layout-cmd")?,
        )),
        (None, true) => Ok(Arc::new(WholePageLayout)),
        (None, false) => bail!(
            "OCR mode needs --layout-cmd <CMD> to find headings, or --whole-page \
             when --range covers printed contents pages"
        ),
    }
}

/// `--margin 8` or `--margin 10,5`.
fn parse_margin(s: &str) -> Result<(u32, u32), String> {
    let parse = |v: &str| {
        v.trim()
            .parse::<u32>()
            .map_err(|_| format!("invalid margin {s:?}: expected N or X,Y"))
    };
    match s.split_once(',') {
        Some((x, y)) => Ok((parse(x)?, parse(y)?)),
        None => parse(s).map(|px| (px, px)),
    }
}

/// Map OCR flags to a `TocConfig`.
fn build_config(
    ocr: &OcrArgs,
    offset: i32,
    margin: Option<(u32, u32)>,
    progress: Option<Arc<CliProgressCallback>>,
) -> Result<TocConfig> {
    let mut builder = TocConfig::builder()
        .offset(offset)
        .pages(ocr.range.clone())
        .double_columns(ocr.double_columns)
        .row_merge_tolerance(ocr.tolerance)
        .min_confidence(ocr.min_confidence)
        .max_rendered_pixels(ocr.max_pixels);

    if let Some((x, y)) = margin {
        builder = builder.region_margin(x, y);
    }

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb as ProgressCallback);
    }

    builder.build().context("Invalid configuration")
}

fn recognizer(ocr: &OcrArgs) -> Result<TesseractRecognizer> {
    let recognizer = TesseractRecognizer::new(ocr.lang).with_program(&ocr.tesseract);
    recognizer
        .check_available()
        .with_context(|| format!("Cannot run {}", ocr.tesseract.display()))?;
    Ok(recognizer)
}

fn run_page_op(command: PageCommand, quiet: bool) -> Result<()> {
    match command {
        PageCommand::Slice {
            pdf,
            range,
            multiple,
            output,
        } => {
            let base = output.unwrap_or_else(|| default_output_path(&pdf, "-slice", "pdf"));
            let mut doc = open(&pdf)?;
            match parse_range(&range, multiple).context("Invalid --range")? {
                PageIndices::Flat(indices) => {
                    doc.select(&indices).context("Slicing failed")?;
                    save(&mut doc, &base, quiet)
                }
                PageIndices::Grouped(groups) => {
                    let mut parts = doc.split(&groups).context("Splitting failed")?;
                    let paths: Vec<PathBuf> =
                        (1..=parts.len()).map(|n| numbered(&base, n)).collect();
                    PdfFile::save_all(&mut parts, &paths).with_context(|| {
                        format!("Failed to write the parts of {}", base.display())
                    })?;
                    if !quiet {
                        for (part, path) in parts.iter().zip(&paths) {
                            done(&format!("{} pages", part.page_count()), path);
                        }
                    }
                    Ok(())
                }
            }
        }
        PageCommand::Remove { pdf, range, output } => {
            let output = output.unwrap_or_else(|| default_output_path(&pdf, "-removed", "pdf"));
            let mut doc = open(&pdf)?;
            let indices = match parse_range(&range, false).context("Invalid --range")? {
                PageIndices::Flat(indices) => indices,
                PageIndices::Grouped(groups) => groups.concat(),
            };
            doc.delete(&indices).context("Removing pages failed")?;
            save(&mut doc, &output, quiet)
        }
        PageCommand::Rotate {
            pdf,
            range,
            angle,
            output,
        } => {
            let output = output.unwrap_or_else(|| default_output_path(&pdf, "-rotated", "pdf"));
            let mut doc = open(&pdf)?;
            let indices = range
                .resolve_sorted(doc.page_count())
                .context("Invalid --range")?;
            doc.rotate(&indices, angle).context("Rotating pages failed")?;
            save(&mut doc, &output, quiet)
        }
        PageCommand::Merge { pdfs, output } => {
            let (first, rest) = match pdfs.split_first() {
                Some(split) => split,
                None => bail!("merge needs at least two PDFs"),
            };
            let output = output.unwrap_or_else(|| default_output_path(first, "-merged", "pdf"));
            let mut doc = open(first)?;
            for path in rest {
                let other = open(path)?;
                doc.append(&other)
                    .with_context(|| format!("Appending {} failed", path.display()))?;
            }
            save(&mut doc, &output, quiet)
        }
        PageCommand::Insert {
            pdf,
            other,
            after,
            output,
        } => {
            let output = output.unwrap_or_else(|| default_output_path(&pdf, "-inserted", "pdf"));
            let mut doc = open(&pdf)?;
            let other = open(&other)?;
            doc.insert(&other, after).context("Inserting pages failed")?;
            save(&mut doc, &output, quiet)
        }
    }
}

fn open(path: &Path) -> Result<PdfFile> {
    PdfFile::open(path).with_context(|| format!("Failed to open {}", path.display()))
}

fn save(doc: &mut PdfFile, path: &Path, quiet: bool) -> Result<()> {
    doc.save(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    if !quiet {
        done(&format!("{} pages", doc.page_count()), path);
    }
    Ok(())
}

/// `out/book-slice.pdf` → `out/book-slice-{n}.pdf`
fn numbered(base: &Path, n: usize) -> PathBuf {
    default_output_path(base, &format!("-{n}"), "pdf")
}

fn done(summary: &str, output: &Path) {
    eprintln!(
        "{}  {}  →  {}",
        green("✔"),
        summary,
        bold(&output.display().to_string())
    );
}
