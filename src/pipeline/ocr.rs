//! OCR mode: rendered pages → title regions → recognised rows → entries.
//!
//! ## Per page
//!
//! 1. Layout analysis; keep only `Title` regions, ordered by top edge
//!    (column-aware when `double_columns` is set).
//! 2. Crop each region with `region_margin` padding, clamped to the page.
//! 3. Recognise text in the crop and move fragments back to page space.
//! 4. Rebuild rows inside the region; each non-empty row is one entry.
//!
//! Entries of a single-column page are finally stable-sorted by their
//! vertical anchor so overlapping regions cannot scramble the order. In
//! two-column mode the region order already is the reading order.
//!
//! Any render or engine failure aborts the whole scan.

use crate::config::TocConfig;
use crate::engine::{OcrEngines, TextRecognizer};
use crate::entry::{BBox, RegionKind, Spatial, TextFragment, TocEntry};
use crate::error::TocError;
use crate::pipeline::classify::classify_title;
use crate::pipeline::reading_order::{order_regions, reading_order, reconstruct_lines, ColumnLayout};
use crate::pipeline::render::PageSource;
use crate::pipeline::scratch::{PageImage, Scratch};
use tracing::{debug, info, warn};

/// Extract title entries from one rendered page.
///
/// Entries carry `anchor_y`; [`crate::pipeline::finalize`] drops it.
pub fn extract_page_titles(
    page: &PageImage<'_>,
    engines: &OcrEngines,
    config: &TocConfig,
) -> Result<Vec<TocEntry>, TocError> {
    let layout = column_layout(page, config);
    let regions: Vec<_> = engines
        .layout
        .detect_regions(page)?
        .into_iter()
        .filter(|r| r.kind == RegionKind::Title)
        .collect();
    let regions = order_regions(regions, layout);
    debug!(
        "Page {}: {} title regions",
        page.page_number(),
        regions.len()
    );

    let margin = config.region_margin;
    let mut entries = Vec::new();

    for (i, region) in regions.iter().enumerate() {
        let padded = BBox::new(
            region.bbox.x0 - margin.x as f32,
            region.bbox.y0 - margin.y as f32,
            region.bbox.x1 + margin.x as f32,
            region.bbox.y1 + margin.y as f32,
        );
        let Some(crop) = page.crop(&padded, &format!("title-{:02}", i)) else {
            debug!("Page {}: region {} lies outside the image", page.page_number(), i);
            continue;
        };

        let fragments = recognize_in_page_space(&crop, engines.recognizer.as_ref(), config)?;
        for row in reconstruct_lines(fragments, config.row_merge_tolerance) {
            let Some((text, top)) = join_row(&row) else {
                continue;
            };
            let title = classify_title(&text);
            if title.text.is_empty() {
                continue;
            }
            entries.push(
                TocEntry::new(title.level, title.text, page.page_number() as u32).with_anchor(top),
            );
        }
    }

    if matches!(layout, ColumnLayout::Single) {
        entries.sort_by(|a, b| {
            a.anchor_y
                .unwrap_or(0.0)
                .total_cmp(&b.anchor_y.unwrap_or(0.0))
        });
    }
    Ok(entries)
}

/// Scan `indices` (0-based, ascending) and collect every title entry.
///
/// Progress events go to `config.progress_callback`.
pub fn scan_pages(
    source: &dyn PageSource,
    indices: &[usize],
    engines: &OcrEngines,
    config: &TocConfig,
    scratch: &Scratch,
) -> Result<Vec<TocEntry>, TocError> {
    let total = indices.len();
    let cb = config.progress_callback.as_ref();
    if let Some(cb) = cb {
        cb.on_scan_start(total);
    }
    info!(
        "Scanning {} pages with {} + {}",
        total,
        engines.layout.name(),
        engines.recognizer.name()
    );

    let mut all = Vec::new();
    for &idx in indices {
        let page_num = idx + 1;
        if let Some(cb) = cb {
            cb.on_page_start(page_num, total);
        }

        let result = source
            .render_page(idx)
            .and_then(|img| extract_page_titles(&scratch.page_image(page_num, img), engines, config));

        match result {
            Ok(entries) => {
                debug!("Page {}: {} titles", page_num, entries.len());
                if let Some(cb) = cb {
                    cb.on_page_complete(page_num, total, entries.len());
                }
                all.extend(entries);
            }
            Err(e) => {
                if let Some(cb) = cb {
                    cb.on_page_error(page_num, total, &e.to_string());
                }
                return Err(e);
            }
        }
    }

    if let Some(cb) = cb {
        cb.on_scan_complete(total, all.len());
    }
    Ok(all)
}

/// Recognise a whole page and return its text lines in reading order.
pub fn recognize_page_lines(
    page: &PageImage<'_>,
    recognizer: &dyn TextRecognizer,
    config: &TocConfig,
) -> Result<Vec<String>, TocError> {
    let fragments = recognize_in_page_space(page, recognizer, config)?;
    let rows = reading_order(fragments, config.row_merge_tolerance, column_layout(page, config));
    Ok(rows.iter().filter_map(|row| join_row(row).map(|(text, _)| text)).collect())
}

/// Full-page text of `indices`, one line per row, pages in the given order.
pub fn ocr_pages_to_text(
    source: &dyn PageSource,
    indices: &[usize],
    recognizer: &dyn TextRecognizer,
    config: &TocConfig,
    scratch: &Scratch,
) -> Result<String, TocError> {
    let total = indices.len();
    let cb = config.progress_callback.as_ref();
    if let Some(cb) = cb {
        cb.on_scan_start(total);
    }

    let mut out = String::new();
    let mut line_count = 0;
    for &idx in indices {
        let page_num = idx + 1;
        if let Some(cb) = cb {
            cb.on_page_start(page_num, total);
        }
        let result = source
            .render_page(idx)
            .and_then(|img| recognize_page_lines(&scratch.page_image(page_num, img), recognizer, config));
        match result {
            Ok(lines) => {
                if let Some(cb) = cb {
                    cb.on_page_complete(page_num, total, lines.len());
                }
                line_count += lines.len();
                for line in lines {
                    out.push_str(&line);
                    out.push('\n');
                }
            }
            Err(e) => {
                if let Some(cb) = cb {
                    cb.on_page_error(page_num, total, &e.to_string());
                }
                return Err(e);
            }
        }
    }

    if let Some(cb) = cb {
        cb.on_scan_complete(total, line_count);
    }
    Ok(out)
}

// ── Helpers ──────────────────────────────────────────────────────────────

fn column_layout(page: &PageImage<'_>, config: &TocConfig) -> ColumnLayout {
    if config.double_columns {
        ColumnLayout::Double {
            page_width: page.width() as f32,
        }
    } else {
        ColumnLayout::Single
    }
}

/// Recognise `image` and move fragments into page coordinates, dropping
/// those under `min_confidence`.
fn recognize_in_page_space(
    image: &PageImage<'_>,
    recognizer: &dyn TextRecognizer,
    config: &TocConfig,
) -> Result<Vec<TextFragment>, TocError> {
    let origin = image.origin();
    let fragments = recognizer.recognize_text(image)?;
    let before = fragments.len();
    let kept: Vec<TextFragment> = fragments
        .into_iter()
        .filter(|f| f.confidence >= config.min_confidence)
        .map(|f| f.translate(origin.x, origin.y))
        .collect();
    if kept.len() < before {
        warn!(
            "Page {}: dropped {} fragments below confidence {}",
            image.page_number(),
            before - kept.len(),
            config.min_confidence
        );
    }
    Ok(kept)
}

/// Row text (fragments joined by one space) and the row's top edge.
fn join_row(row: &[TextFragment]) -> Option<(String, f32)> {
    let text = row
        .iter()
        .map(|f| f.text.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if text.is_empty() {
        return None;
    }
    let top = row.iter().map(Spatial::top).fold(f32::INFINITY, f32::min);
    Some((text, top))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{LayoutDetector, WholePageLayout};
    use crate::entry::LayoutRegion;
    use crate::progress::TocProgressCallback;
    use image::{DynamicImage, RgbImage};
    use std::sync::{Arc, Mutex};

    /// Returns fixed regions regardless of the page.
    struct FixedLayout(Vec<LayoutRegion>);

    impl LayoutDetector for FixedLayout {
        fn name(&self) -> &str {
            "fixed"
        }

        fn detect_regions(&self, _page: &PageImage<'_>) -> Result<Vec<LayoutRegion>, TocError> {
            Ok(self.0.clone())
        }
    }

    /// Returns page-space fragments that fall inside the image it is
    /// given, shifted into that image's own coordinates.
    struct FixedText(Vec<TextFragment>);

    impl TextRecognizer for FixedText {
        fn name(&self) -> &str {
            "fixed"
        }

        fn recognize_text(&self, image: &PageImage<'_>) -> Result<Vec<TextFragment>, TocError> {
            let o = image.origin();
            let (w, h) = (image.width() as f32, image.height() as f32);
            Ok(self
                .0
                .iter()
                .filter(|f| {
                    let b = f.bounds();
                    b.x0 >= o.x && b.y0 >= o.y && b.x1 <= o.x + w && b.y1 <= o.y + h
                })
                .cloned()
                .map(|f| f.translate(-o.x, -o.y))
                .collect())
        }
    }

    struct FailingText;

    impl TextRecognizer for FailingText {
        fn name(&self) -> &str {
            "failing"
        }

        fn recognize_text(&self, image: &PageImage<'_>) -> Result<Vec<TextFragment>, TocError> {
            Err(TocError::EngineFailed {
                engine: "failing".into(),
                page: image.page_number(),
                detail: "boom".into(),
            })
        }
    }

    fn frag(x0: f32, y0: f32, x1: f32, y1: f32, text: &str) -> TextFragment {
        TextFragment::from_bbox(BBox::new(x0, y0, x1, y1), text, 0.9)
    }

    fn title(x0: f32, y0: f32, x1: f32, y1: f32) -> LayoutRegion {
        LayoutRegion::new(RegionKind::Title, BBox::new(x0, y0, x1, y1))
    }

    fn blank(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::new(w, h))
    }

    fn engines(layout: impl LayoutDetector + 'static, text: impl TextRecognizer + 'static) -> OcrEngines {
        OcrEngines::new(Arc::new(layout), Arc::new(text))
    }

    #[test]
    fn one_entry_per_row_in_title_regions() {
        let eng = engines(
            FixedLayout(vec![
                title(20.0, 200.0, 400.0, 230.0),
                LayoutRegion::new(RegionKind::Text, BBox::new(20.0, 300.0, 400.0, 500.0)),
                title(20.0, 50.0, 400.0, 100.0),
            ]),
            FixedText(vec![
                frag(30.0, 55.0, 60.0, 70.0, "1"),
                frag(70.0, 56.0, 200.0, 71.0, "Intro"),
                frag(30.0, 80.0, 200.0, 95.0, "1.1 Background"),
                frag(30.0, 205.0, 200.0, 220.0, "2 Methods"),
                frag(30.0, 320.0, 200.0, 335.0, "body text"),
            ]),
        );
        let scratch = Scratch::new().unwrap();
        let page = scratch.page_image(4, blank(600, 800));
        let entries = extract_page_titles(&page, &eng, &TocConfig::default()).unwrap();

        let got: Vec<_> = entries.iter().map(|e| (e.level, e.title.as_str(), e.page)).collect();
        assert_eq!(
            got,
            vec![(1, "1 Intro", 4), (2, "1.1 Background", 4), (1, "2 Methods", 4)]
        );
        assert_eq!(entries[0].anchor_y, Some(55.0));
    }

    #[test]
    fn single_column_sorts_by_anchor() {
        // Regions ordered by top edge, but the tall first region holds a
        // row below the second region's row.
        let eng = engines(
            FixedLayout(vec![title(0.0, 10.0, 300.0, 400.0), title(310.0, 40.0, 590.0, 60.0)]),
            FixedText(vec![
                frag(10.0, 350.0, 100.0, 365.0, "2 Late"),
                frag(320.0, 42.0, 400.0, 57.0, "1 Early"),
            ]),
        );
        let scratch = Scratch::new().unwrap();
        let page = scratch.page_image(1, blank(600, 800));
        let config = TocConfig::builder().region_margin(0, 0).build().unwrap();
        let titles: Vec<_> = extract_page_titles(&page, &eng, &config)
            .unwrap()
            .into_iter()
            .map(|e| e.title)
            .collect();
        assert_eq!(titles, vec!["1 Early", "2 Late"]);
    }

    #[test]
    fn double_columns_read_left_first() {
        let eng = engines(
            FixedLayout(vec![title(320.0, 40.0, 590.0, 60.0), title(10.0, 300.0, 280.0, 320.0)]),
            FixedText(vec![
                frag(330.0, 42.0, 400.0, 57.0, "2 Right"),
                frag(20.0, 302.0, 100.0, 317.0, "1 Left"),
            ]),
        );
        let scratch = Scratch::new().unwrap();
        let page = scratch.page_image(1, blank(600, 800));
        let config = TocConfig::builder()
            .double_columns(true)
            .region_margin(0, 0)
            .build()
            .unwrap();
        let titles: Vec<_> = extract_page_titles(&page, &eng, &config)
            .unwrap()
            .into_iter()
            .map(|e| e.title)
            .collect();
        assert_eq!(titles, vec!["1 Left", "2 Right"]);
    }

    #[test]
    fn low_confidence_fragments_dropped() {
        let mut faint = frag(10.0, 10.0, 100.0, 25.0, "ghost");
        faint.confidence = 0.2;
        let eng = engines(
            WholePageLayout,
            FixedText(vec![faint, frag(10.0, 40.0, 100.0, 55.0, "1 Real")]),
        );
        let scratch = Scratch::new().unwrap();
        let page = scratch.page_image(1, blank(200, 100));
        let config = TocConfig::builder().min_confidence(0.5).build().unwrap();
        let entries = extract_page_titles(&page, &eng, &config).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "1 Real");
    }

    #[derive(Default)]
    struct Events(Mutex<Vec<String>>);

    impl TocProgressCallback for Events {
        fn on_scan_start(&self, total_pages: usize) {
            self.0.lock().unwrap().push(format!("start {total_pages}"));
        }
        fn on_page_complete(&self, page_num: usize, _total: usize, titles_found: usize) {
            self.0.lock().unwrap().push(format!("page {page_num}: {titles_found}"));
        }
        fn on_page_error(&self, page_num: usize, _total: usize, _error: &str) {
            self.0.lock().unwrap().push(format!("error {page_num}"));
        }
        fn on_scan_complete(&self, _total: usize, entries: usize) {
            self.0.lock().unwrap().push(format!("done {entries}"));
        }
    }

    #[test]
    fn scan_reports_progress_per_page() {
        let events = Arc::new(Events::default());
        let config = TocConfig::builder()
            .progress_callback(events.clone())
            .build()
            .unwrap();
        let eng = engines(
            WholePageLayout,
            FixedText(vec![frag(10.0, 10.0, 100.0, 25.0, "1 Intro")]),
        );
        let pages = vec![blank(200, 100), blank(200, 100), blank(200, 100)];
        let scratch = Scratch::new().unwrap();

        let entries = scan_pages(&pages, &[0, 2], &eng, &config, &scratch).unwrap();
        let page_numbers: Vec<u32> = entries.iter().map(|e| e.page).collect();
        assert_eq!(page_numbers, vec![1, 3]);
        assert_eq!(
            *events.0.lock().unwrap(),
            vec!["start 2", "page 1: 1", "page 3: 1", "done 2"]
        );
    }

    #[test]
    fn engine_failure_aborts_scan() {
        let calls = Arc::new(Events::default());
        let config = TocConfig::builder()
            .progress_callback(calls.clone())
            .build()
            .unwrap();
        let eng = engines(WholePageLayout, FailingText);
        let scratch = Scratch::new().unwrap();
        let err = scan_pages(&vec![blank(10, 10)], &[0], &eng, &config, &scratch).unwrap_err();
        assert!(matches!(err, TocError::EngineFailed { page: 1, .. }));
        assert_eq!(*calls.0.lock().unwrap(), vec!["start 1", "error 1"]);
    }

    #[test]
    fn render_failure_aborts_scan() {
        let eng = engines(WholePageLayout, FixedText(vec![]));
        let scratch = Scratch::new().unwrap();
        let err = scan_pages(&vec![blank(10, 10)], &[0, 5], &eng, &TocConfig::default(), &scratch)
            .unwrap_err();
        assert!(matches!(err, TocError::PageOutOfRange { page: 6, .. }));
    }

    #[test]
    fn page_text_lines_in_reading_order() {
        let text = FixedText(vec![
            frag(300.0, 10.0, 380.0, 25.0, "right-top"),
            frag(10.0, 12.0, 100.0, 27.0, "left-top"),
            frag(10.0, 50.0, 100.0, 65.0, "left-bottom"),
        ]);
        let scratch = Scratch::new().unwrap();
        let page = scratch.page_image(1, blank(400, 100));

        let single = recognize_page_lines(&page, &text, &TocConfig::default()).unwrap();
        assert_eq!(single, vec!["left-top right-top", "left-bottom"]);

        let config = TocConfig::builder().double_columns(true).build().unwrap();
        let double = recognize_page_lines(&page, &text, &config).unwrap();
        assert_eq!(double, vec!["left-top", "left-bottom", "right-top"]);
    }

    #[test]
    fn text_export_joins_pages() {
        let text = FixedText(vec![frag(10.0, 10.0, 100.0, 25.0, "Contents")]);
        let scratch = Scratch::new().unwrap();
        let pages = vec![blank(200, 100), blank(200, 100)];
        let out = ocr_pages_to_text(&pages, &[1, 0], &text, &TocConfig::default(), &scratch).unwrap();
        assert_eq!(out, "Contents\nContents\n");
    }
}
