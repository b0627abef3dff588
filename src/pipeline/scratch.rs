//! Scoped working directory for rendered page images.
//!
//! Engines that shell out (tesseract, layout commands) need a file path,
//! in-process engines only need pixels. [`PageImage`] holds the pixels and
//! writes a PNG into the [`Scratch`] directory the first time a path is
//! asked for. The directory and everything in it goes away when the
//! `Scratch` is dropped, on success and error paths alike.

use crate::entry::{BBox, Point};
use crate::error::TocError;
use image::{DynamicImage, GenericImageView, ImageFormat};
use once_cell::unsync::OnceCell;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

/// Owns the temporary directory for one construction run.
pub struct Scratch {
    dir: TempDir,
}

impl Scratch {
    pub fn new() -> Result<Self, TocError> {
        let dir = tempfile::Builder::new()
            .prefix("pdf-toolbox-")
            .tempdir()
            .map_err(|e| TocError::Internal(format!("Failed to create scratch directory: {}", e)))?;
        debug!("Scratch directory: {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Wrap a rendered page. `page_number` is 1-based.
    pub fn page_image(&self, page_number: usize, image: DynamicImage) -> PageImage<'_> {
        PageImage {
            image,
            page_number,
            origin: Point::default(),
            dir: self.dir.path(),
            name: format!("page-{:04}", page_number),
            file: OnceCell::new(),
        }
    }
}

/// A page (or part of one) handed to the engines.
pub struct PageImage<'s> {
    image: DynamicImage,
    page_number: usize,
    origin: Point,
    dir: &'s Path,
    name: String,
    file: OnceCell<PathBuf>,
}

impl<'s> PageImage<'s> {
    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    /// 1-based page this image was rendered from.
    pub fn page_number(&self) -> usize {
        self.page_number
    }

    /// Top-left corner of this image in page pixel space. Zero for a full
    /// page; the crop position for crops.
    pub fn origin(&self) -> Point {
        self.origin
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// The whole image as a box in its own pixel space.
    pub fn bounds(&self) -> BBox {
        BBox::new(0.0, 0.0, self.width() as f32, self.height() as f32)
    }

    /// PNG on disk with the same pixels. Written on first call only.
    pub fn path(&self) -> Result<&Path, TocError> {
        self.file
            .get_or_try_init(|| {
                let path = self.dir.join(format!("{}.png", self.name));
                self.image
                    .save_with_format(&path, ImageFormat::Png)
                    .map_err(|e| {
                        TocError::Internal(format!(
                            "Failed to write page image '{}': {}",
                            path.display(),
                            e
                        ))
                    })?;
                Ok(path)
            })
            .map(PathBuf::as_path)
    }

    /// Cut out `bbox`, clamped to the image. `None` when nothing is left.
    ///
    /// The crop shares the scratch directory; `label` keeps its file name
    /// distinct from the parent's.
    pub fn crop(&self, bbox: &BBox, label: &str) -> Option<PageImage<'s>> {
        let (w, h) = self.image.dimensions();
        let x0 = bbox.x0.max(0.0).floor().min(w as f32) as u32;
        let y0 = bbox.y0.max(0.0).floor().min(h as f32) as u32;
        let x1 = bbox.x1.max(0.0).ceil().min(w as f32) as u32;
        let y1 = bbox.y1.max(0.0).ceil().min(h as f32) as u32;
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(PageImage {
            image: self.image.crop_imm(x0, y0, x1 - x0, y1 - y0),
            page_number: self.page_number,
            origin: Point::new(self.origin.x + x0 as f32, self.origin.y + y0 as f32),
            dir: self.dir,
            name: format!("{}-{}", self.name, label),
            file: OnceCell::new(),
        })
    }
}
