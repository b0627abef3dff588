//! Reading order: turn a bag of positioned boxes into rows, top to bottom.
//!
//! ## Row grouping
//!
//! Items are sorted by vertical center and swept once. An item joins the
//! current row when its center is within `tolerance` of the *previous*
//! item's center (single-link chaining), so a baseline that drifts across a
//! long row stays one row while real line breaks still split. Each closed row
//! is sorted left to right.
//!
//! ## Two columns
//!
//! In column-aware mode items whose right edge lies left of the page's
//! horizontal midpoint form the left column; everything else is the right
//! column. The left column is read completely before the right one.

use crate::entry::Spatial;
use serde::{Deserialize, Serialize};

/// Page layout assumption for ordering.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub enum ColumnLayout {
    #[default]
    Single,
    /// Two columns split at `page_width / 2`.
    Double { page_width: f32 },
}

/// Group items into rows ordered top to bottom, each row ordered left to right.
///
/// ```rust
/// use pdf_toolbox::entry::BBox;
/// use pdf_toolbox::pipeline::reading_order::reconstruct_lines;
///
/// let boxes = vec![
///     BBox::new(60.0, 5.0, 90.0, 15.0),  // center 10
///     BBox::new(0.0, 45.0, 30.0, 55.0),  // center 50
///     BBox::new(0.0, 6.0, 30.0, 16.0),   // center 11
///     BBox::new(40.0, 46.0, 70.0, 56.0), // center 51
/// ];
/// let rows = reconstruct_lines(boxes, 5.0);
/// assert_eq!(rows.len(), 2);
/// assert_eq!(rows[0][0].x0, 0.0);
/// ```
pub fn reconstruct_lines<T: Spatial>(mut items: Vec<T>, tolerance: f32) -> Vec<Vec<T>> {
    items.sort_by(|a, b| a.center_y().total_cmp(&b.center_y()));

    let mut rows: Vec<Vec<T>> = Vec::new();
    let mut current: Vec<T> = Vec::new();
    let mut prev_center: Option<f32> = None;

    for item in items {
        let center = item.center_y();
        let joins = prev_center.is_some_and(|prev| (center - prev).abs() < tolerance);
        if !joins && !current.is_empty() {
            rows.push(close_row(std::mem::take(&mut current)));
        }
        prev_center = Some(center);
        current.push(item);
    }
    if !current.is_empty() {
        rows.push(close_row(current));
    }
    rows
}

/// Column-aware [`reconstruct_lines`]: all left-column rows, then all right-column rows.
pub fn reconstruct_columns<T: Spatial>(
    items: Vec<T>,
    tolerance: f32,
    page_width: f32,
) -> Vec<Vec<T>> {
    let (left, right) = split_columns(items, page_width);
    let mut rows = reconstruct_lines(left, tolerance);
    rows.extend(reconstruct_lines(right, tolerance));
    rows
}

/// Dispatch on `layout`.
pub fn reading_order<T: Spatial>(items: Vec<T>, tolerance: f32, layout: ColumnLayout) -> Vec<Vec<T>> {
    match layout {
        ColumnLayout::Single => reconstruct_lines(items, tolerance),
        ColumnLayout::Double { page_width } => reconstruct_columns(items, tolerance, page_width),
    }
}

/// Order whole regions (not rows) by their top edge, honouring `layout`.
pub fn order_regions<T: Spatial>(regions: Vec<T>, layout: ColumnLayout) -> Vec<T> {
    match layout {
        ColumnLayout::Single => sorted_by_top(regions),
        ColumnLayout::Double { page_width } => {
            let (left, right) = split_columns(regions, page_width);
            let mut ordered = sorted_by_top(left);
            ordered.extend(sorted_by_top(right));
            ordered
        }
    }
}

fn split_columns<T: Spatial>(items: Vec<T>, page_width: f32) -> (Vec<T>, Vec<T>) {
    let mid = page_width / 2.0;
    items.into_iter().partition(|item| item.right() < mid)
}

fn sorted_by_top<T: Spatial>(mut items: Vec<T>) -> Vec<T> {
    items.sort_by(|a, b| a.top().total_cmp(&b.top()));
    items
}

fn close_row<T: Spatial>(mut row: Vec<T>) -> Vec<T> {
    row.sort_by(|a, b| a.left().total_cmp(&b.left()));
    row
}
