//! Geometric features used to pre-filter templates: stroke/hairline
//! detection, punctuation height, enclosed holes and edge strokes.

use crate::grid::PixelGrid;

/// Content aspect ratio (height / width) below which a glyph is a
/// horizontal stroke.
pub const LINE_ASPECT_MIN: f32 = 0.09;
/// Content aspect ratio above which a glyph is a vertical hairline.
pub const LINE_ASPECT_MAX: f32 = 50.0;
/// Content shorter than this fraction of the grid height is punctuation.
pub const PUNCTUATION_HEIGHT_RATIO: f32 = 0.4;
pub const ENCLOSURE_MIN_CELLS: usize = 3;
pub const ENCLOSURE_MIN_AREA_RATIO: f32 = 0.01;
/// Minimum edge-stroke run as a fraction of the grid height.
pub const VERTICAL_LINE_MIN_RATIO: f32 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

impl PixelGrid {
    /// Content height divided by content width, 0 when there is no ink.
    pub fn content_aspect_ratio(&self) -> f32 {
        let r = self.content_rect();
        if r.is_empty() {
            0.0
        } else {
            r.height as f32 / r.width as f32
        }
    }

    /// Whether the ink is a bare horizontal or vertical stroke.
    pub fn is_considered_line(&self) -> bool {
        if self.content_rect().is_empty() {
            return false;
        }
        let ratio = self.content_aspect_ratio();
        ratio < LINE_ASPECT_MIN || ratio > LINE_ASPECT_MAX
    }

    pub fn is_punctuation(&self) -> bool {
        let r = self.content_rect();
        !r.is_empty() && (r.height as f32) < PUNCTUATION_HEIGHT_RATIO * self.rows as f32
    }

    /// Number of enclosed background holes (the counter of `o`, the two
    /// bowls of `B`). Memoized.
    pub fn enclosures(&self) -> usize {
        *self.cache.enclosures.get_or_init(|| count_enclosures(self))
    }

    pub fn vertical_line_left(&self) -> bool {
        *self
            .cache
            .line_left
            .get_or_init(|| has_edge_stroke(self, Side::Left))
    }

    pub fn vertical_line_right(&self) -> bool {
        *self
            .cache
            .line_right
            .get_or_init(|| has_edge_stroke(self, Side::Right))
    }
}

/// Count maximal 4-connected background regions that stay clear of the
/// grid border and are large enough to be a real counter.
fn count_enclosures(grid: &PixelGrid) -> usize {
    let (w, h) = (grid.cols, grid.rows);
    if w < 3 || h < 3 {
        return 0;
    }
    let min_area = ENCLOSURE_MIN_AREA_RATIO * (w * h) as f32;
    let mut visited = vec![false; w * h];
    let mut stack = Vec::new();
    let mut count = 0;

    for start in 0..w * h {
        if grid.cells[start] || visited[start] {
            continue;
        }
        visited[start] = true;
        stack.push(start);
        let mut area = 0usize;
        let mut touches_border = false;

        while let Some(idx) = stack.pop() {
            area += 1;
            let (x, y) = (idx % w, idx / w);
            if x == 0 || y == 0 || x == w - 1 || y == h - 1 {
                touches_border = true;
            }
            let mut visit = |n: usize| {
                if !grid.cells[n] && !visited[n] {
                    visited[n] = true;
                    stack.push(n);
                }
            };
            if x > 0 {
                visit(idx - 1);
            }
            if x + 1 < w {
                visit(idx + 1);
            }
            if y > 0 {
                visit(idx - w);
            }
            if y + 1 < h {
                visit(idx + w);
            }
        }

        if !touches_border && area >= ENCLOSURE_MIN_CELLS && area as f32 >= min_area {
            count += 1;
        }
    }
    count
}

/// Look for a tall vertical run in the outer quarter of the content on one
/// side. A run is broken wherever the cell just outside it is also ink.
fn has_edge_stroke(grid: &PixelGrid, side: Side) -> bool {
    let content = grid.content_rect();
    if content.is_empty() || grid.rows == 0 {
        return false;
    }
    let min_run = ((VERTICAL_LINE_MIN_RATIO * grid.rows as f32).ceil() as usize).max(1);
    let span = (content.width / 4).max(1);

    for k in 0..span {
        let (x, outside) = match side {
            Side::Left => {
                let x = content.x + k;
                (x, x.checked_sub(1))
            }
            Side::Right => {
                let x = content.right() - 1 - k;
                (x, Some(x + 1).filter(|&o| o < grid.cols))
            }
        };
        let mut run = 0;
        for y in 0..grid.rows {
            let blocked = outside.is_some_and(|ox| grid.get(ox, y));
            if grid.get(x, y) && !blocked {
                run += 1;
                if run >= min_run {
                    return true;
                }
            } else {
                run = 0;
            }
        }
    }
    false
}
