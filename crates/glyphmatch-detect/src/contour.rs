use glyphmatch_core::{PixelGrid, Point, Rect};

use crate::order::reading_order;

/// Neighborhood used by flood fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
    /// Edge neighbors only. Used for region detection.
    Four,
    /// Edge and corner neighbors. Used when cutting out a single glyph so
    /// diagonal strokes stay in one piece.
    Eight,
}

impl Connectivity {
    fn offsets(self) -> &'static [(isize, isize)] {
        match self {
            Connectivity::Four => &[(-1, 0), (1, 0), (0, -1), (0, 1)],
            Connectivity::Eight => &[
                (-1, -1),
                (0, -1),
                (1, -1),
                (-1, 0),
                (1, 0),
                (-1, 1),
                (0, 1),
                (1, 1),
            ],
        }
    }
}

/// Stack-based fill from `start`, calling `visit` once per component cell.
///
/// `visited` must be `cols * rows` long and is shared across calls so each
/// cell is filled at most once per image.
fn fill(
    grid: &PixelGrid,
    visited: &mut [bool],
    start: Point,
    connectivity: Connectivity,
    mut visit: impl FnMut(usize, usize),
) {
    let w = grid.cols();
    if !grid.get(start.x, start.y) || visited[start.y * w + start.x] {
        return;
    }

    let mut stack = vec![(start.x, start.y)];
    visited[start.y * w + start.x] = true;

    while let Some((x, y)) = stack.pop() {
        visit(x, y);
        for &(dx, dy) in connectivity.offsets() {
            let nx = x as isize + dx;
            let ny = y as isize + dy;
            if !grid.get_signed(nx, ny) {
                continue;
            }
            let idx = ny as usize * w + nx as usize;
            if !visited[idx] {
                visited[idx] = true;
                stack.push((nx as usize, ny as usize));
            }
        }
    }
}

/// All cells of the component containing `start`. Empty if `start` is
/// background.
pub fn flood_fill(grid: &PixelGrid, start: Point, connectivity: Connectivity) -> Vec<Point> {
    let mut visited = vec![false; grid.cols() * grid.rows()];
    let mut points = Vec::new();
    fill(grid, &mut visited, start, connectivity, |x, y| {
        points.push(Point::new(x, y))
    });
    points
}

/// Bounding box of the component containing `start`, without collecting
/// its points. Empty if `start` is background or already visited.
pub fn flood_fill_bounds(
    grid: &PixelGrid,
    visited: &mut [bool],
    start: Point,
    connectivity: Connectivity,
) -> Rect {
    let mut bounds: Option<(usize, usize, usize, usize)> = None;
    fill(grid, visited, start, connectivity, |x, y| {
        bounds = Some(match bounds {
            Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
            None => (x, y, x, y),
        });
    });
    match bounds {
        Some((x0, y0, x1, y1)) => Rect::from_corners(x0, y0, x1, y1),
        None => Rect::empty(),
    }
}

/// Bounding boxes of the 4-connected blobs of a (dilated) page, in reading
/// order.
pub fn find_regions(dilated: &PixelGrid) -> Vec<Rect> {
    let (w, h) = (dilated.cols(), dilated.rows());
    let mut visited = vec![false; w * h];
    let mut regions = Vec::new();

    for y in 0..h {
        for x in 0..w {
            let r = flood_fill_bounds(dilated, &mut visited, Point::new(x, y), Connectivity::Four);
            if !r.is_empty() {
                regions.push(r);
            }
        }
    }

    reading_order(&mut regions);
    tracing::debug!(regions = regions.len(), "found regions");
    regions
}

/// Cut every 8-connected component out of `grid` as its own artifact, in
/// reading order.
///
/// Each artifact covers exactly its component's bounding box and holds only
/// that component's ink.
pub fn find_artifacts(grid: &PixelGrid) -> Vec<PixelGrid> {
    let (w, h) = (grid.cols(), grid.rows());
    let mut visited = vec![false; w * h];
    let mut artifacts = Vec::new();
    let mut points = Vec::new();

    for y in 0..h {
        for x in 0..w {
            points.clear();
            fill(grid, &mut visited, Point::new(x, y), Connectivity::Eight, |px, py| {
                points.push(Point::new(px, py))
            });
            if points.is_empty() {
                continue;
            }
            artifacts.push(component_to_artifact(grid, &points));
        }
    }

    reading_order(&mut artifacts);
    tracing::debug!(artifacts = artifacts.len(), "found artifacts");
    artifacts
}

fn component_to_artifact(page: &PixelGrid, points: &[Point]) -> PixelGrid {
    let x0 = points.iter().map(|p| p.x).min().unwrap_or(0);
    let y0 = points.iter().map(|p| p.y).min().unwrap_or(0);
    let x1 = points.iter().map(|p| p.x).max().unwrap_or(0);
    let y1 = points.iter().map(|p| p.y).max().unwrap_or(0);
    let bounds = Rect::from_corners(x0, y0, x1, y1);

    let mut cells = vec![false; bounds.area()];
    for p in points {
        cells[(p.y - y0) * bounds.width + (p.x - x0)] = true;
    }

    let origin = Point::new(page.location_found.x + x0, page.location_found.y + y0);
    let mut artifact = PixelGrid::from_cells(bounds.width, cells);
    artifact.location_found = origin;
    artifact.location_adjusted = origin;
    artifact
}
