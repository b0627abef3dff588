//! Integration tests for the TOC entry points and page operations.
//!
//! Everything here runs offline: PDFs are generated with lopdf and OCR mode
//! gets in-process engines plus injected page images, so neither pdfium
//! nor tesseract is needed. See `e2e.rs` for the live-engine tests.

mod common;

use common::{page_labels, row, rows, write_numbered_pdf, write_pdf};
use image::{DynamicImage, RgbImage};
use pdf_toolbox::entry::Spatial;
use pdf_toolbox::pipeline::scratch::PageImage;
use pdf_toolbox::{
    add_toc_from_file, add_toc_from_images, clean_toc_file, extract_toc, BBox, CleanupOptions,
    OcrEngines, PageSelection, PdfFile, TextFragment, TextRecognizer, TocConfig, TocError,
    TocFormat, TocProgressCallback, TocSource, WholePageLayout,
};
use std::collections::HashMap;
use std::fs;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

// ── File mode ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn text_toc_attaches_and_extracts() {
    let dir = TempDir::new().unwrap();
    let pdf = write_numbered_pdf(dir.path(), "book.pdf", 20);
    let toc = dir.path().join("toc.txt");
    fs::write(&toc, "1 Intro 5\n1.1 Background 7\n2 Methods 20\n").unwrap();
    let out = dir.path().join("book-toc.pdf");

    let config = TocConfig::default();
    let result = add_toc_from_file(&pdf, &toc, &config, &out).await.unwrap();

    let expected = vec![
        row(1, "1 Intro", 5),
        row(2, "1.1 Background", 7),
        row(1, "2 Methods", 20),
    ];
    assert_eq!(rows(&result.entries), expected);
    assert_eq!(result.stats.source, TocSource::Text);
    assert_eq!(result.stats.page_count, 20);
    assert_eq!(result.stats.levels_repaired, 0);
    assert_eq!(result.output_path, out);

    let outline = PdfFile::open(&out).unwrap().outline().unwrap();
    assert_eq!(rows(&outline), expected);
    // Page content survives the rewrite.
    assert_eq!(page_labels(&out)[4], "p5");
}

#[tokio::test]
async fn extracted_text_reattaches_identically() {
    let dir = TempDir::new().unwrap();
    let pdf = write_numbered_pdf(dir.path(), "book.pdf", 12);
    let toc = dir.path().join("toc.txt");
    fs::write(&toc, "第一章 总论 1\n1.1 Scope 2\n1.1.1 Terms 3\n第二章 方法 9\n").unwrap();
    let with_toc = dir.path().join("with-toc.pdf");
    let first = add_toc_from_file(&pdf, &toc, &TocConfig::default(), &with_toc)
        .await
        .unwrap();

    let listing = dir.path().join("extracted.txt");
    let extracted = extract_toc(&with_toc, TocFormat::Text, &listing).await.unwrap();
    assert_eq!(rows(&extracted), rows(&first.entries));
    assert_eq!(
        fs::read_to_string(&listing).unwrap(),
        "第一章 总论 1\n\t1.1 Scope 2\n\t\t1.1.1 Terms 3\n第二章 方法 9\n"
    );

    let again = dir.path().join("again.pdf");
    let second = add_toc_from_file(&pdf, &listing, &TocConfig::default(), &again)
        .await
        .unwrap();
    assert_eq!(rows(&second.entries), rows(&first.entries));
}

#[tokio::test]
async fn json_toc_applies_offset_and_repairs_levels() {
    let dir = TempDir::new().unwrap();
    let pdf = write_numbered_pdf(dir.path(), "book.pdf", 10);
    let toc = dir.path().join("toc.json");
    fs::write(&toc, r#"[[1, "Preface", 1], [1, "Part I", 2], [3, "Deep", 3], [1, "Index", 8]]"#)
        .unwrap();
    let out = dir.path().join("out.pdf");

    let config = TocConfig::builder().offset(2).build().unwrap();
    let result = add_toc_from_file(&pdf, &toc, &config, &out).await.unwrap();

    assert_eq!(result.stats.source, TocSource::Json);
    assert_eq!(result.stats.levels_repaired, 1);
    assert_eq!(
        rows(&result.entries),
        vec![
            row(1, "Preface", 3),
            row(3, "Part I", 4),
            row(3, "Deep", 5),
            row(1, "Index", 10),
        ]
    );
    let pages: Vec<u32> = PdfFile::open(&out)
        .unwrap()
        .outline()
        .unwrap()
        .iter()
        .map(|e| e.page)
        .collect();
    assert_eq!(pages, vec![3, 4, 5, 10]);
}

#[tokio::test]
async fn out_of_range_entry_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let pdf = write_numbered_pdf(dir.path(), "short.pdf", 3);
    let toc = dir.path().join("toc.txt");
    fs::write(&toc, "1 Intro 1\n2 Results 3\n").unwrap();
    let out = dir.path().join("short-toc.pdf");

    let config = TocConfig::builder().offset(5).build().unwrap();
    let err = add_toc_from_file(&pdf, &toc, &config, &out)
        .await
        .unwrap_err();

    match err {
        TocError::EntryOutOfRange { page, total, .. } => {
            assert_eq!(page, 6);
            assert_eq!(total, 3);
        }
        other => panic!("expected EntryOutOfRange, got {other:?}"),
    }
    assert!(!out.exists());
}

#[tokio::test]
async fn unsupported_toc_extension_is_rejected() {
    let dir = TempDir::new().unwrap();
    let pdf = write_numbered_pdf(dir.path(), "book.pdf", 2);
    let toc = dir.path().join("toc.csv");
    fs::write(&toc, "1,Intro,1\n").unwrap();

    let err = add_toc_from_file(&pdf, &toc, &TocConfig::default(), dir.path().join("o.pdf"))
        .await
        .unwrap_err();
    assert!(matches!(err, TocError::UnsupportedTocFormat { .. }));
}

#[tokio::test]
async fn non_pdf_input_is_rejected() {
    let dir = TempDir::new().unwrap();
    let fake = dir.path().join("fake.pdf");
    fs::write(&fake, "not a pdf at all").unwrap();
    let toc = dir.path().join("toc.txt");
    fs::write(&toc, "Intro 1\n").unwrap();

    let err = add_toc_from_file(&fake, &toc, &TocConfig::default(), dir.path().join("o.pdf"))
        .await
        .unwrap_err();
    assert!(matches!(err, TocError::NotAPdf { .. }));
}

#[test]
fn sync_wrapper_matches_async() {
    let dir = TempDir::new().unwrap();
    let pdf = write_numbered_pdf(dir.path(), "book.pdf", 4);
    let toc = dir.path().join("toc.txt");
    fs::write(&toc, "Chapter 1 Start 1\nChapter 2 Finish 4\n").unwrap();

    let result = pdf_toolbox::add_toc_from_file_sync(
        &pdf,
        &toc,
        &TocConfig::default(),
        dir.path().join("out.pdf"),
    )
    .unwrap();
    assert_eq!(
        rows(&result.entries),
        vec![row(1, "Chapter 1 Start", 1), row(1, "Chapter 2 Finish", 4)]
    );
}

#[tokio::test]
async fn extract_json_from_pdf_without_outline_is_empty() {
    let dir = TempDir::new().unwrap();
    let pdf = write_numbered_pdf(dir.path(), "plain.pdf", 2);
    let out = dir.path().join("plain-toc.json");

    let entries = extract_toc(&pdf, TocFormat::Json, &out).await.unwrap();
    assert!(entries.is_empty());
    assert_eq!(fs::read_to_string(&out).unwrap(), "[]");
}

// ── Cleanup ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn cleanup_strips_leaders_indents_and_shifts() {
    let dir = TempDir::new().unwrap();
    let toc = dir.path().join("raw.txt");
    fs::write(&toc, "1 Intro ........ 5\n1.1 Background . . . . 7\n\n2 Methods 20\n").unwrap();
    let out = dir.path().join("clean.txt");

    let options = CleanupOptions {
        page_shift: 1,
        ..Default::default()
    };
    let cleaned = clean_toc_file(&toc, &options, &out).await.unwrap();

    assert_eq!(cleaned, "1 Intro 6\n\t1.1 Background 8\n2 Methods 21\n");
    assert_eq!(fs::read_to_string(&out).unwrap(), cleaned);
}

#[tokio::test]
async fn cleanup_negative_page_fails_without_output() {
    let dir = TempDir::new().unwrap();
    let toc = dir.path().join("raw.txt");
    fs::write(&toc, "Intro 1\n").unwrap();
    let out = dir.path().join("clean.txt");

    let options = CleanupOptions {
        page_shift: -3,
        ..Default::default()
    };
    let err = clean_toc_file(&toc, &options, &out).await.unwrap_err();
    assert!(matches!(err, TocError::InvalidPageShift { .. }));
    assert!(!out.exists());
}

// ── OCR mode with injected engines ───────────────────────────────────────────

/// Serves fixed page-space fragments per 1-based page number.
struct ScriptedText(HashMap<usize, Vec<TextFragment>>);

impl TextRecognizer for ScriptedText {
    fn name(&self) -> &str {
        "scripted"
    }

    fn recognize_text(&self, image: &PageImage<'_>) -> Result<Vec<TextFragment>, TocError> {
        let o = image.origin();
        let (w, h) = (image.width() as f32, image.height() as f32);
        Ok(self
            .0
            .get(&image.page_number())
            .into_iter()
            .flatten()
            .filter(|f| {
                let b = f.bounds();
                b.x0 >= o.x && b.y0 >= o.y && b.x1 <= o.x + w && b.y1 <= o.y + h
            })
            .cloned()
            .map(|f| f.translate(-o.x, -o.y))
            .collect())
    }
}

#[derive(Default)]
struct Events(Mutex<Vec<(usize, usize)>>);

impl TocProgressCallback for Events {
    fn on_page_complete(&self, page_num: usize, _total_pages: usize, titles_found: usize) {
        self.0.lock().unwrap().push((page_num, titles_found));
    }
}

fn frag(x0: f32, y0: f32, x1: f32, y1: f32, text: &str) -> TextFragment {
    TextFragment::from_bbox(BBox::new(x0, y0, x1, y1), text, 0.95)
}

fn blank_pages(n: usize) -> Vec<DynamicImage> {
    (0..n)
        .map(|_| DynamicImage::ImageRgb8(RgbImage::new(400, 600)))
        .collect()
}

fn scripted_engines() -> OcrEngines {
    let mut pages = HashMap::new();
    pages.insert(2, vec![frag(40.0, 50.0, 300.0, 80.0, "1 Introduction")]);
    pages.insert(
        3,
        vec![
            // Reading order comes from geometry, not from the engine.
            frag(40.0, 400.0, 200.0, 430.0, "2 Methods"),
            frag(40.0, 60.0, 80.0, 85.0, "1.1"),
            frag(90.0, 62.0, 250.0, 86.0, "Scope"),
        ],
    );
    OcrEngines::new(Arc::new(WholePageLayout), Arc::new(ScriptedText(pages)))
}

#[tokio::test]
async fn ocr_mode_builds_outline_from_page_titles() {
    let dir = TempDir::new().unwrap();
    let pdf = write_numbered_pdf(dir.path(), "scan.pdf", 3);
    let out = dir.path().join("scan-toc.pdf");
    let events = Arc::new(Events::default());
    let config = TocConfig::builder()
        .progress_callback(events.clone())
        .build()
        .unwrap();

    let result = add_toc_from_images(&pdf, blank_pages(3), &scripted_engines(), &config, &out)
        .await
        .unwrap();

    let expected = vec![
        row(1, "1 Introduction", 2),
        row(2, "1.1 Scope", 3),
        row(1, "2 Methods", 3),
    ];
    assert_eq!(rows(&result.entries), expected);
    assert_eq!(result.stats.source, TocSource::Ocr);
    assert_eq!(result.stats.pages_scanned, 3);
    assert_eq!(*events.0.lock().unwrap(), vec![(1, 0), (2, 1), (3, 2)]);

    let outline = PdfFile::open(&out).unwrap().outline().unwrap();
    assert_eq!(rows(&outline), expected);
}

#[tokio::test]
async fn ocr_mode_scans_only_selected_pages() {
    let dir = TempDir::new().unwrap();
    let pdf = write_numbered_pdf(dir.path(), "scan.pdf", 3);
    let out = dir.path().join("scan-toc.pdf");
    let config = TocConfig::builder()
        .pages("3".parse::<PageSelection>().unwrap())
        .build()
        .unwrap();

    let result = add_toc_from_images(&pdf, blank_pages(3), &scripted_engines(), &config, &out)
        .await
        .unwrap();
    assert_eq!(result.stats.pages_scanned, 1);
    assert_eq!(
        rows(&result.entries),
        vec![row(2, "1.1 Scope", 3), row(1, "2 Methods", 3)]
    );
}

#[tokio::test]
async fn ocr_mode_rejects_image_count_mismatch() {
    let dir = TempDir::new().unwrap();
    let pdf = write_numbered_pdf(dir.path(), "scan.pdf", 3);
    let out = dir.path().join("scan-toc.pdf");

    let err = add_toc_from_images(
        &pdf,
        blank_pages(2),
        &scripted_engines(),
        &TocConfig::default(),
        &out,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, TocError::InvalidConfig(_)));
    assert!(!out.exists());
}

// ── Page operations ──────────────────────────────────────────────────────────

#[test]
fn slice_and_split_write_valid_files() {
    let dir = TempDir::new().unwrap();
    let src = write_pdf(dir.path(), "src.pdf", &["a", "b", "c", "d"]);

    let mut sliced = PdfFile::open(&src).unwrap();
    sliced.select(&[3, 0]).unwrap();
    let sliced_path = dir.path().join("sliced.pdf");
    sliced.save(&sliced_path).unwrap();
    assert_eq!(page_labels(&sliced_path), vec!["d", "a"]);

    let parts = PdfFile::open(&src)
        .unwrap()
        .split(&[vec![0, 1], vec![2]])
        .unwrap();
    assert_eq!(parts.len(), 2);
    for (i, mut part) in parts.into_iter().enumerate() {
        let path = dir.path().join(format!("part-{i}.pdf"));
        part.save(&path).unwrap();
        let expected: &[&str] = if i == 0 { &["a", "b"] } else { &["c"] };
        assert_eq!(page_labels(&path), expected);
    }
}

#[test]
fn delete_rotate_merge_insert() {
    let dir = TempDir::new().unwrap();
    let main = write_pdf(dir.path(), "main.pdf", &["a", "b", "c"]);
    let extra = write_pdf(dir.path(), "extra.pdf", &["x", "y"]);
    let out = dir.path().join("out.pdf");

    let mut doc = PdfFile::open(&main).unwrap();
    doc.delete(&[1]).unwrap();
    doc.rotate(&[0], 90).unwrap();
    let other = PdfFile::open(&extra).unwrap();
    doc.insert(&other, 1).unwrap();
    doc.append(&other).unwrap();
    doc.save(&out).unwrap();

    assert_eq!(page_labels(&out), vec!["a", "x", "y", "c", "x", "y"]);

    let reloaded = lopdf::Document::load(&out).unwrap();
    let first = *reloaded.get_pages().get(&1).unwrap();
    let rotate = reloaded
        .get_dictionary(first)
        .unwrap()
        .get(b"Rotate")
        .unwrap()
        .as_i64()
        .unwrap();
    assert_eq!(rotate, 90);
}

#[test]
fn out_of_range_page_op_is_rejected() {
    let dir = TempDir::new().unwrap();
    let src = write_pdf(dir.path(), "src.pdf", &["a", "b"]);
    let mut doc = PdfFile::open(&src).unwrap();
    assert!(matches!(
        doc.select(&[5]),
        Err(TocError::PageOutOfRange { .. })
    ));
    assert!(matches!(doc.delete(&[0, 1]), Err(TocError::InvalidConfig(_))));
}
