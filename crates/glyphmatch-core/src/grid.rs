//! The binary pixel grid every stage of the pipeline works on.
//!
//! A `PixelGrid` is both the whole binarized page and, after component
//! extraction, a single "artifact" (ideally one glyph) carrying its source
//! position and recognition tags.

use std::fmt;
use std::ops::Range;
use std::sync::OnceLock;

use crate::types::{Point, Rect};

/// Minimum number of active cells in a 3×3 neighborhood (center included)
/// for `erode_soft` to keep a cell.
pub const ERODE_MIN_NEIGHBORS: usize = 5;

/// Memoized derived attributes. Cleared by `PixelGrid::invalidate`.
#[derive(Debug, Clone, Default)]
pub(crate) struct FeatureCache {
    pub(crate) content: OnceLock<Rect>,
    pub(crate) enclosures: OnceLock<usize>,
    pub(crate) line_left: OnceLock<bool>,
    pub(crate) line_right: OnceLock<bool>,
}

/// A row-major binary grid with position metadata.
///
/// `cells.len() == cols * rows` always holds.
#[derive(Debug, Clone, Default)]
pub struct PixelGrid {
    pub(crate) cols: usize,
    pub(crate) rows: usize,
    pub(crate) cells: Vec<bool>,
    /// Origin of this grid in source-image coordinates.
    pub location_found: Point,
    /// Origin after band packing. Layout bookkeeping only.
    pub location_adjusted: Point,
    /// `None` until recognized. `Some("")` means nothing matched.
    pub matching_character: Option<String>,
    pub matching_score: f32,
    pub needs_inspection: bool,
    pub was_part_of_split: bool,
    pub font: Option<String>,
    pub(crate) cache: FeatureCache,
}

impl PixelGrid {
    /// Create a blank grid.
    pub fn new(cols: usize, rows: usize) -> Self {
        Self {
            cols,
            rows,
            cells: vec![false; cols * rows],
            ..Default::default()
        }
    }

    /// Create a grid from a flat row-major buffer. `rows` is derived from
    /// the buffer length; a trailing partial row is dropped.
    pub fn from_cells(cols: usize, mut cells: Vec<bool>) -> Self {
        let rows = if cols > 0 { cells.len() / cols } else { 0 };
        cells.truncate(cols * rows);
        Self {
            cols,
            rows,
            cells,
            ..Default::default()
        }
    }

    /// Parse an ASCII drawing: `#` is ink, anything else is background.
    /// Blank lines and surrounding whitespace are ignored; short rows are
    /// padded with background.
    pub fn from_ascii(art: &str) -> Self {
        let lines: Vec<&str> = art
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();
        let cols = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
        let mut grid = Self::new(cols, lines.len());
        for (y, line) in lines.iter().enumerate() {
            for (x, c) in line.chars().enumerate() {
                if c == '#' {
                    grid.cells[y * cols + x] = true;
                }
            }
        }
        grid
    }

    /// Render as `#`/`.` rows, for debug logging and fixtures.
    pub fn to_ascii(&self) -> String {
        self.to_string()
    }

    /// A zero-ink artifact standing in for a word space.
    pub fn new_space(location: Point, width: usize, height: usize) -> Self {
        Self {
            location_found: location,
            location_adjusted: location,
            matching_character: Some(" ".to_string()),
            matching_score: 1.0,
            ..Self::new(width, height)
        }
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cells(&self) -> &[bool] {
        &self.cells
    }

    pub fn is_empty(&self) -> bool {
        self.cols == 0 || self.rows == 0
    }

    pub fn is_space(&self) -> bool {
        self.matching_character.as_deref() == Some(" ")
    }

    pub fn is_matched(&self) -> bool {
        self.matching_character.is_some()
    }

    /// Cell value, `false` outside the grid.
    pub fn get(&self, x: usize, y: usize) -> bool {
        x < self.cols && y < self.rows && self.cells[y * self.cols + x]
    }

    /// Cell value for signed coordinates, `false` outside the grid.
    pub fn get_signed(&self, x: isize, y: isize) -> bool {
        x >= 0 && y >= 0 && self.get(x as usize, y as usize)
    }

    /// Set a cell. Writes outside the grid are ignored.
    pub fn set(&mut self, x: usize, y: usize, value: bool) {
        if x < self.cols && y < self.rows {
            self.cells[y * self.cols + x] = value;
            self.invalidate();
        }
    }

    /// Drop all memoized attributes. Called by every mutation of the buffer.
    pub fn invalidate(&mut self) {
        self.cache = FeatureCache::default();
    }

    pub fn active_count(&self) -> usize {
        self.cells.iter().filter(|&&c| c).count()
    }

    /// Fraction of active cells, 0 for an empty grid.
    pub fn density(&self) -> f32 {
        if self.cells.is_empty() {
            0.0
        } else {
            self.active_count() as f32 / self.cells.len() as f32
        }
    }

    /// The grid's extent in source-image coordinates.
    pub fn bounds(&self) -> Rect {
        Rect::new(
            self.location_found.x,
            self.location_found.y,
            self.cols,
            self.rows,
        )
    }

    /// Tightest rectangle (grid coordinates) containing all active cells.
    pub fn content_rect(&self) -> Rect {
        *self.cache.content.get_or_init(|| self.compute_content_rect())
    }

    fn compute_content_rect(&self) -> Rect {
        let mut min_x = usize::MAX;
        let mut min_y = usize::MAX;
        let mut max_x = 0;
        let mut max_y = 0;
        for y in 0..self.rows {
            let row = &self.cells[y * self.cols..(y + 1) * self.cols];
            for (x, &on) in row.iter().enumerate() {
                if on {
                    min_x = min_x.min(x);
                    min_y = min_y.min(y);
                    max_x = max_x.max(x);
                    max_y = max_y.max(y);
                }
            }
        }
        if min_x == usize::MAX {
            Rect::empty()
        } else {
            Rect::from_corners(min_x, min_y, max_x, max_y)
        }
    }

    /// Copy out a sub-rectangle (grid coordinates, clamped to the grid).
    pub fn crop(&self, rect: &Rect) -> PixelGrid {
        let x0 = rect.x.min(self.cols);
        let y0 = rect.y.min(self.rows);
        let x1 = rect.right().min(self.cols);
        let y1 = rect.bottom().min(self.rows);
        let cols = x1 - x0;
        let mut cells = Vec::with_capacity(cols * (y1 - y0));
        for y in y0..y1 {
            cells.extend_from_slice(&self.cells[y * self.cols + x0..y * self.cols + x1]);
        }
        let location = Point::new(self.location_found.x + x0, self.location_found.y + y0);
        PixelGrid {
            cols,
            rows: y1 - y0,
            cells,
            location_found: location,
            location_adjusted: location,
            was_part_of_split: self.was_part_of_split,
            font: self.font.clone(),
            ..Default::default()
        }
    }

    /// Crop to the content rectangle. A grid without ink trims to 0×0.
    pub fn trim(&self) -> PixelGrid {
        let content = self.content_rect();
        if content.is_empty() {
            return PixelGrid {
                location_found: self.location_found,
                location_adjusted: self.location_found,
                ..Default::default()
            };
        }
        self.crop(&content)
    }

    /// Full-height slice of the given column range.
    pub fn columns(&self, range: Range<usize>) -> PixelGrid {
        self.crop(&Rect::new(
            range.start,
            0,
            range.end.saturating_sub(range.start),
            self.rows,
        ))
    }

    /// Surround the grid with background cells, in place. The origin moves
    /// so existing ink keeps its source-image position.
    pub fn pad(&mut self, top: usize, bottom: usize, left: usize, right: usize) {
        let cols = self.cols + left + right;
        let rows = self.rows + top + bottom;
        let mut cells = vec![false; cols * rows];
        for y in 0..self.rows {
            let dst = (y + top) * cols + left;
            cells[dst..dst + self.cols]
                .copy_from_slice(&self.cells[y * self.cols..(y + 1) * self.cols]);
        }
        self.cols = cols;
        self.rows = rows;
        self.cells = cells;
        self.location_found.x = self.location_found.x.saturating_sub(left);
        self.location_found.y = self.location_found.y.saturating_sub(top);
        self.invalidate();
    }

    /// Active-cell count per column.
    pub fn column_histogram(&self) -> Vec<usize> {
        let mut hist = vec![0; self.cols];
        for y in 0..self.rows {
            for (x, count) in hist.iter_mut().enumerate() {
                if self.cells[y * self.cols + x] {
                    *count += 1;
                }
            }
        }
        hist
    }

    /// Grow to the union of both grids' source bounds and OR in `other`.
    pub fn merge_artifact(&mut self, other: &PixelGrid) {
        let union = self.bounds().union(&other.bounds());
        let mut merged = vec![false; union.width * union.height];
        for src in [&*self, other] {
            let dx = src.location_found.x - union.x;
            let dy = src.location_found.y - union.y;
            for y in 0..src.rows {
                for x in 0..src.cols {
                    if src.cells[y * src.cols + x] {
                        merged[(y + dy) * union.width + x + dx] = true;
                    }
                }
            }
        }
        self.cols = union.width;
        self.rows = union.height;
        self.cells = merged;
        self.location_found = Point::new(union.x, union.y);
        self.location_adjusted = self.location_found;
        self.was_part_of_split |= other.was_part_of_split;
        self.invalidate();
    }

    /// Thin strokes by one step: keep a cell only if at least
    /// `ERODE_MIN_NEIGHBORS` of its 3×3 neighborhood are active.
    pub fn erode_soft(&self) -> PixelGrid {
        let mut out = PixelGrid::new(self.cols, self.rows);
        out.location_found = self.location_found;
        for y in 0..self.rows {
            for x in 0..self.cols {
                if !self.cells[y * self.cols + x] {
                    continue;
                }
                let mut count = 0;
                for dy in -1..=1isize {
                    for dx in -1..=1isize {
                        if self.get_signed(x as isize + dx, y as isize + dy) {
                            count += 1;
                        }
                    }
                }
                if count >= ERODE_MIN_NEIGHBORS {
                    out.cells[y * self.cols + x] = true;
                }
            }
        }
        out
    }

    /// Shorthand for [`hamming_distance_percentage`].
    pub fn similarity(&self, other: &PixelGrid) -> f32 {
        hamming_distance_percentage(self, other)
    }
}

/// Similarity of two equally sized grids: cells active in both divided by
/// cells active in either. Returns 0 for mismatched sizes or when neither
/// grid has ink.
pub fn hamming_distance_percentage(a: &PixelGrid, b: &PixelGrid) -> f32 {
    if a.cols != b.cols || a.rows != b.rows {
        return 0.0;
    }
    let mut both = 0usize;
    let mut either = 0usize;
    for (&x, &y) in a.cells.iter().zip(b.cells.iter()) {
        if x || y {
            either += 1;
            if x && y {
                both += 1;
            }
        }
    }
    if either == 0 {
        0.0
    } else {
        both as f32 / either as f32
    }
}

/// Grids compare by shape and content only, not by position or tags.
impl PartialEq for PixelGrid {
    fn eq(&self, other: &Self) -> bool {
        self.cols == other.cols && self.rows == other.rows && self.cells == other.cells
    }
}

impl fmt::Display for PixelGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for y in 0..self.rows {
            for x in 0..self.cols {
                let on = self.cells[y * self.cols + x];
                f.write_str(if on { "#" } else { "." })?;
            }
            f.write_str("\n")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ring() -> PixelGrid {
        PixelGrid::from_ascii(
            "
            .....
            .###.
            .#.#.
            .###.
            .....
            ",
        )
    }

    #[test]
    fn from_cells_derives_rows() {
        let g = PixelGrid::from_cells(3, vec![true; 7]);
        assert_eq!(g.rows(), 2);
        assert_eq!(g.cells().len(), 6);
        let empty = PixelGrid::from_cells(0, vec![true; 4]);
        assert_eq!(empty.rows(), 0);
        assert!(empty.cells().is_empty());
    }

    #[test]
    fn get_and_set_are_bounds_checked() {
        let mut g = PixelGrid::new(2, 2);
        g.set(5, 5, true);
        assert_eq!(g.active_count(), 0);
        assert!(!g.get(5, 0));
        g.set(1, 1, true);
        assert!(g.get(1, 1));
    }

    #[test]
    fn content_rect_tracks_mutation() {
        let mut g = ring();
        assert_eq!(g.content_rect(), Rect::new(1, 1, 3, 3));
        g.set(4, 4, true);
        assert_eq!(g.content_rect(), Rect::new(1, 1, 4, 4));
    }

    #[test]
    fn trim_of_blank_grid_is_empty() {
        let g = PixelGrid::new(4, 3);
        let t = g.trim();
        assert_eq!(t.cols(), 0);
        assert_eq!(t.rows(), 0);
        assert!(g.content_rect().is_empty());
    }

    #[test]
    fn trim_keeps_source_position() {
        let mut g = ring();
        g.location_found = Point::new(10, 20);
        let t = g.trim();
        assert_eq!((t.cols(), t.rows()), (3, 3));
        assert_eq!(t.location_found, Point::new(11, 21));
    }

    #[test]
    fn pad_moves_origin() {
        let mut g = PixelGrid::from_ascii("##");
        g.location_found = Point::new(5, 5);
        g.pad(2, 1, 1, 0);
        assert_eq!((g.cols(), g.rows()), (3, 4));
        assert!(g.get(1, 2) && g.get(2, 2));
        assert_eq!(g.location_found, Point::new(4, 3));
    }

    #[test]
    fn merge_artifact_unions_bounds() {
        let mut a = PixelGrid::from_ascii("#");
        a.location_found = Point::new(2, 0);
        let mut b = PixelGrid::from_ascii("##");
        b.location_found = Point::new(0, 3);
        a.merge_artifact(&b);
        assert_eq!(a.bounds(), Rect::new(0, 0, 3, 4));
        assert!(a.get(2, 0));
        assert!(a.get(0, 3) && a.get(1, 3));
        assert_eq!(a.active_count(), 3);
    }

    #[test]
    fn erode_soft_removes_hairlines_keeps_blocks() {
        let g = PixelGrid::from_ascii(
            "
            #....
            .#...
            ..###
            ..###
            ..###
            ",
        );
        let e = g.erode_soft();
        assert!(!e.get(0, 0));
        assert!(!e.get(1, 1));
        assert!(e.get(3, 3));
    }

    #[test]
    fn hamming_handles_degenerate_inputs() {
        let g = ring();
        assert_eq!(hamming_distance_percentage(&g, &g), 1.0);
        let blank = PixelGrid::new(5, 5);
        assert_eq!(hamming_distance_percentage(&blank, &blank), 0.0);
        assert_eq!(hamming_distance_percentage(&g, &PixelGrid::new(4, 5)), 0.0);
        let mut other = ring();
        other.set(0, 0, true);
        let similarity = hamming_distance_percentage(&g, &other);
        assert!((similarity - 8.0 / 9.0).abs() < 1e-6);
    }

    #[test]
    fn column_histogram_counts_ink() {
        assert_eq!(ring().column_histogram(), vec![0, 3, 2, 3, 0]);
    }

    fn arb_grid() -> impl Strategy<Value = PixelGrid> {
        (0usize..12, 0usize..12).prop_flat_map(|(w, h)| {
            proptest::collection::vec(any::<bool>(), w * h)
                .prop_map(move |cells| PixelGrid::from_cells(w, cells))
        })
    }

    proptest! {
        #[test]
        fn prop_trim_is_idempotent(g in arb_grid()) {
            let once = g.trim();
            prop_assert_eq!(once.trim(), once);
        }

        #[test]
        fn prop_self_similarity_is_one(g in arb_grid()) {
            let expected = if g.active_count() > 0 { 1.0 } else { 0.0 };
            prop_assert_eq!(g.similarity(&g), expected);
        }

        #[test]
        fn prop_buffer_matches_dimensions(g in arb_grid()) {
            prop_assert_eq!(g.cells().len(), g.cols() * g.rows());
        }
    }
}
