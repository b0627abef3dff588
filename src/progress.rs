//! Progress-callback trait for per-page OCR scan events.
//!
//! Inject an [`Arc<dyn TocProgressCallback>`] via
//! [`crate::config::TocConfigBuilder::progress_callback`] to receive events
//! while OCR mode renders and recognises each selected page. File mode has
//! no per-page work and emits nothing.
//!
//! # Example
//!
//! ```rust
//! use pdf_toolbox::{TocConfig, TocProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct TitleCounter {
//!     titles: AtomicUsize,
//! }
//!
//! impl TocProgressCallback for TitleCounter {
//!     fn on_page_complete(&self, page_num: usize, total_pages: usize, titles_found: usize) {
//!         self.titles.fetch_add(titles_found, Ordering::SeqCst);
//!         eprintln!("Page {}/{}: {} titles", page_num, total_pages, titles_found);
//!     }
//! }
//!
//! let config = TocConfig::builder()
//!     .progress_callback(Arc::new(TitleCounter { titles: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the OCR pipeline as it scans each page.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Pages are scanned in ascending order on a blocking
/// worker thread, hence `Send + Sync`.
pub trait TocProgressCallback: Send + Sync {
    /// Called once, before the first page is rendered.
    ///
    /// # Arguments
    /// * `total_pages` — number of pages that will be scanned
    fn on_scan_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called before a page is rendered.
    ///
    /// # Arguments
    /// * `page_num`    — 1-indexed page number
    /// * `total_pages` — number of pages being scanned
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called when a page has been scanned.
    ///
    /// # Arguments
    /// * `titles_found` — entries this page contributed
    fn on_page_complete(&self, page_num: usize, total_pages: usize, titles_found: usize) {
        let _ = (page_num, total_pages, titles_found);
    }

    /// Called when a page fails. The scan stops right after this event.
    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        let _ = (page_num, total_pages, error);
    }

    /// Called once after the last page, before the outline is attached.
    ///
    /// # Arguments
    /// * `total_pages`   — number of pages scanned
    /// * `total_entries` — entries collected across all pages
    fn on_scan_complete(&self, total_pages: usize, total_entries: usize) {
        let _ = (total_pages, total_entries);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl TocProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::TocConfig`].
pub type ProgressCallback = Arc<dyn TocProgressCallback>;
