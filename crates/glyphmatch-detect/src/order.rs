//! The shared reading order: top-to-bottom rows, left-to-right within a row.

use std::cmp::Ordering;

use glyphmatch_core::{PixelGrid, Rect};

use crate::band::Band;

/// Items whose center-Y differs by at most this many pixels share a row.
pub const ROW_TOLERANCE: usize = 8;

/// Anything with a source-image bounding rectangle.
pub trait Positioned {
    fn rect(&self) -> Rect;
}

impl Positioned for Rect {
    fn rect(&self) -> Rect {
        *self
    }
}

impl Positioned for PixelGrid {
    fn rect(&self) -> Rect {
        self.bounds()
    }
}

impl Positioned for Band {
    fn rect(&self) -> Rect {
        self.bounds()
    }
}

/// Twice the center-Y, which keeps the comparison in integers.
fn center_y2(r: &Rect) -> usize {
    2 * r.y + r.height
}

/// Total order on rectangles: center-Y first, then every other field.
fn vertical_key(a: &Rect, b: &Rect) -> Ordering {
    center_y2(a)
        .cmp(&center_y2(b))
        .then(a.x.cmp(&b.x))
        .then(a.y.cmp(&b.y))
        .then(a.width.cmp(&b.width))
        .then(a.height.cmp(&b.height))
}

fn horizontal_key(a: &Rect, b: &Rect) -> Ordering {
    a.x.cmp(&b.x).then_with(|| vertical_key(a, b))
}

/// Split items into rows.
///
/// Items are sorted by center-Y and a new row starts whenever the gap to the
/// previous item's center exceeds `ROW_TOLERANCE`. Each row is then sorted
/// by left-X. The result depends only on the set of rectangles, not on the
/// input order.
pub fn rows<T: Positioned>(mut items: Vec<T>) -> Vec<Vec<T>> {
    items.sort_by(|a, b| vertical_key(&a.rect(), &b.rect()));

    let mut rows: Vec<Vec<T>> = Vec::new();
    let mut last_center = None;
    for item in items {
        let c = center_y2(&item.rect());
        match (last_center, rows.last_mut()) {
            (Some(prev), Some(row)) if c - prev <= 2 * ROW_TOLERANCE => row.push(item),
            _ => rows.push(vec![item]),
        }
        last_center = Some(c);
    }

    for row in &mut rows {
        row.sort_by(|a, b| horizontal_key(&a.rect(), &b.rect()));
    }
    rows
}

/// Sort items into reading order in place.
pub fn reading_order<T: Positioned>(items: &mut Vec<T>) {
    let taken = std::mem::take(items);
    items.extend(rows(taken).into_iter().flatten());
}
