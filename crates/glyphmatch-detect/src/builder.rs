use glyphmatch_core::{PixelGrid, Point, Rect};

use crate::band::Band;
use crate::contour::{find_artifacts, find_regions};
use crate::order::{reading_order, rows};

/// Center-Y distance, relative to the mean height, below which two bands
/// are on the same row.
pub const ROW_CENTER_RATIO: f32 = 0.4;
/// Largest horizontal gap, relative to the mean height, bridged when
/// merging bands on the same row.
pub const MERGE_GAP_RATIO: f32 = 1.2;
/// Horizontal overlap, relative to the narrower artifact, at which two
/// artifacts are treated as parts of one stacked glyph.
pub const STACK_OVERLAP_RATIO: f32 = 0.5;
pub const SPACE_KERNING_FACTOR: f32 = 2.0;
pub const SPACE_WIDTH_DIVISOR: f32 = 3.0;
/// Background kept on each side of an inserted space.
pub const SPACE_BORDER: usize = 2;
/// Gap between artifacts after packing.
pub const PACK_KERNING: usize = 4;

/// Groups artifacts into text lines.
///
/// Algorithm:
/// 1. Assign every artifact to the region holding its center (or the
///    nearest region); each non-empty region starts a band
/// 2. Group bands on the same row and merge horizontal neighbors
/// 3. Merge vertically stacked parts of one glyph (dots, colons)
/// 4. Sort left to right and insert spaces at wide gaps
/// 5. Pad to the band height and pack
pub struct BandBuilder {
    pub row_center_ratio: f32,
    pub merge_gap_ratio: f32,
    pub stack_overlap_ratio: f32,
    pub pack_kerning: usize,
    /// Insert space artifacts at word gaps.
    pub detect_spaces: bool,
}

impl Default for BandBuilder {
    fn default() -> Self {
        Self {
            row_center_ratio: ROW_CENTER_RATIO,
            merge_gap_ratio: MERGE_GAP_RATIO,
            stack_overlap_ratio: STACK_OVERLAP_RATIO,
            pack_kerning: PACK_KERNING,
            detect_spaces: true,
        }
    }
}

impl BandBuilder {
    /// Detect regions on the dilated page, cut artifacts from the binary
    /// page and build bands from both.
    pub fn build_page(&self, binary: &PixelGrid, dilated: &PixelGrid) -> Vec<Band> {
        let regions = find_regions(dilated);
        let artifacts = find_artifacts(binary);
        self.build(&regions, artifacts)
    }

    /// Build bands in reading order.
    pub fn build(&self, regions: &[Rect], artifacts: Vec<PixelGrid>) -> Vec<Band> {
        let artifact_count = artifacts.len();
        let bands = assign_to_regions(regions, artifacts);
        let initial = bands.len();

        let mut bands = self.merge_rows(bands);
        for band in &mut bands {
            self.finish(band);
        }
        reading_order(&mut bands);

        tracing::debug!(
            regions = regions.len(),
            artifacts = artifact_count,
            initial_bands = initial,
            bands = bands.len(),
            "built bands"
        );
        bands
    }

    /// Whether two band rectangles are almost on the same row.
    pub fn same_row(&self, a: &Rect, b: &Rect) -> bool {
        if !a.overlaps_vertically(b) {
            return false;
        }
        let distance = (a.center_y() - b.center_y()).abs();
        let mean_height = (a.height + b.height) as f32 / 2.0;
        distance < self.row_center_ratio * mean_height
    }

    /// Partition bands into row groups.
    ///
    /// Bands are visited in reading order and join the first group holding
    /// a band on the same row, so the grouping does not depend on the
    /// input order.
    pub fn row_groups(&self, mut bands: Vec<Band>) -> Vec<Vec<Band>> {
        reading_order(&mut bands);
        let mut groups: Vec<Vec<Band>> = Vec::new();
        for band in bands {
            let r = band.bounds();
            let slot = groups
                .iter()
                .position(|g| g.iter().any(|m| self.same_row(&m.bounds(), &r)));
            match slot {
                Some(i) => groups[i].push(band),
                None => groups.push(vec![band]),
            }
        }
        groups
    }

    fn should_merge(&self, left: &Rect, right: &Rect) -> bool {
        let gap = left.horizontal_gap(right);
        let mean_height = (left.height + right.height) as f32 / 2.0;
        gap > 0 && gap as f32 <= self.merge_gap_ratio * mean_height
    }

    fn merge_rows(&self, bands: Vec<Band>) -> Vec<Band> {
        let mut out = Vec::new();
        for mut row in self.row_groups(bands) {
            loop {
                row.sort_by_key(|b| {
                    let r = b.bounds();
                    (r.x, r.y, r.width, r.height)
                });
                let mut merged = false;
                let mut i = 0;
                while i + 1 < row.len() {
                    if self.should_merge(&row[i].bounds(), &row[i + 1].bounds()) {
                        let next = row.remove(i + 1);
                        row[i].absorb(next);
                        merged = true;
                    } else {
                        i += 1;
                    }
                }
                if !merged {
                    break;
                }
            }
            out.extend(row);
        }
        out
    }

    fn finish(&self, band: &mut Band) {
        self.merge_stacked(band);
        band.sort_left_to_right();
        if self.detect_spaces {
            insert_spaces(band);
        }
        band.pad_to_height();
        band.pack(self.pack_kerning);
    }

    /// Merge artifacts sharing most of their horizontal extent, such as the
    /// dot and stem of `i`.
    fn merge_stacked(&self, band: &mut Band) {
        let mut artifacts = std::mem::take(band).into_artifacts();
        sort_by_position(&mut artifacts);

        let mut i = 0;
        while i < artifacts.len() {
            let mut j = i + 1;
            while j < artifacts.len() {
                let a = artifacts[i].bounds();
                let b = artifacts[j].bounds();
                if b.x >= a.right() {
                    break;
                }
                let narrower = a.width.min(b.width) as f32;
                if a.horizontal_overlap(&b) as f32 >= self.stack_overlap_ratio * narrower {
                    let other = artifacts.remove(j);
                    artifacts[i].merge_artifact(&other);
                    j = i + 1;
                } else {
                    j += 1;
                }
            }
            i += 1;
        }

        *band = Band::from_artifacts(artifacts);
    }
}

fn sort_by_position(artifacts: &mut [PixelGrid]) {
    artifacts.sort_by_key(|a| {
        let r = a.bounds();
        (r.x, r.y, r.width, r.height)
    });
}

fn assign_to_regions(regions: &[Rect], artifacts: Vec<PixelGrid>) -> Vec<Band> {
    if regions.is_empty() {
        return artifacts
            .into_iter()
            .map(|a| Band::from_artifacts(vec![a]))
            .collect();
    }

    // Regions may arrive in any order; containment ties go to the first in
    // reading order.
    let ordered: Vec<Rect> = rows(regions.to_vec()).into_iter().flatten().collect();
    let mut buckets: Vec<Vec<PixelGrid>> = vec![Vec::new(); ordered.len()];

    for artifact in artifacts {
        let (cx, cy) = artifact.bounds().center();
        let idx = ordered
            .iter()
            .position(|r| r.contains(cx as usize, cy as usize))
            .unwrap_or_else(|| nearest_region(&ordered, cx, cy));
        buckets[idx].push(artifact);
    }

    buckets
        .into_iter()
        .filter(|b| !b.is_empty())
        .map(Band::from_artifacts)
        .collect()
}

fn nearest_region(regions: &[Rect], cx: f32, cy: f32) -> usize {
    let distance = |r: &Rect| {
        let dx = (r.x as f32 - cx).max(cx - r.right() as f32).max(0.0);
        let dy = (r.y as f32 - cy).max(cy - r.bottom() as f32).max(0.0);
        dx * dx + dy * dy
    };
    regions
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| distance(a).total_cmp(&distance(b)))
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// Insert a space artifact wherever the gap to the previous artifact is at
/// least `max(2 * kerning, width / 3)`.
fn insert_spaces(band: &mut Band) {
    if band.len() < 2 {
        return;
    }
    let threshold = (SPACE_KERNING_FACTOR * band.average_kerning())
        .max(band.average_width() / SPACE_WIDTH_DIVISOR);
    let bounds = band.bounds();

    let artifacts = std::mem::take(band).into_artifacts();
    let mut out = Vec::with_capacity(artifacts.len());
    let mut prev_right: Option<usize> = None;
    let mut spaces = 0;

    for artifact in artifacts {
        let right = artifact.bounds().right();
        if let Some(prev) = prev_right {
            let gap = artifact.location_found.x.saturating_sub(prev);
            if gap > 0 && gap as f32 >= threshold {
                let width = gap.saturating_sub(2 * SPACE_BORDER).max(1);
                let at = Point::new(prev + SPACE_BORDER, bounds.y);
                out.push(PixelGrid::new_space(at, width, bounds.height));
                spaces += 1;
            }
        }
        prev_right = Some(prev_right.map_or(right, |p| p.max(right)));
        out.push(artifact);
    }

    tracing::trace!(threshold, spaces, "inserted spaces");
    *band = Band::from_artifacts(out);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(x: usize, y: usize, w: usize, h: usize) -> PixelGrid {
        let mut g = PixelGrid::from_cells(w, vec![true; w * h]);
        g.location_found = Point::new(x, y);
        g.location_adjusted = g.location_found;
        g
    }

    #[test]
    fn word_gap_becomes_space() {
        let artifacts = vec![
            block(0, 0, 6, 10),
            block(10, 0, 6, 10),
            block(20, 0, 6, 10),
            block(50, 0, 6, 10),
        ];
        let bands = BandBuilder::default().build(&[Rect::new(0, 0, 56, 10)], artifacts);
        assert_eq!(bands.len(), 1);

        let band = &bands[0];
        assert_eq!(band.len(), 5);
        let space = &band.artifacts()[3];
        assert!(space.is_space());
        assert_eq!(space.location_found.x, 28);
        assert_eq!(space.cols(), 20);
        assert!(band.artifacts().iter().all(|a| a.rows() == 10));
    }

    #[test]
    fn letter_gaps_do_not_become_spaces() {
        let artifacts = vec![block(0, 0, 6, 10), block(10, 0, 6, 10), block(20, 0, 6, 10)];
        let bands = BandBuilder::default().build(&[Rect::new(0, 0, 26, 10)], artifacts);
        assert!(bands[0].artifacts().iter().all(|a| !a.is_space()));
    }

    #[test]
    fn dot_joins_stem() {
        let artifacts = vec![block(0, 6, 2, 8), block(0, 0, 2, 2)];
        let bands = BandBuilder::default().build(&[Rect::new(0, 0, 2, 14)], artifacts);
        assert_eq!(bands[0].len(), 1);
        let i = &bands[0].artifacts()[0];
        assert_eq!((i.cols(), i.rows()), (2, 14));
        assert_eq!(i.active_count(), 20);
    }

    #[test]
    fn separate_lines_stay_separate() {
        let regions = [Rect::new(0, 40, 30, 10), Rect::new(0, 0, 30, 10)];
        let artifacts = vec![block(0, 40, 30, 10), block(0, 0, 30, 10)];
        let bands = BandBuilder::default().build(&regions, artifacts);
        assert_eq!(bands.len(), 2);
        assert_eq!(bands[0].bounds().y, 0);
        assert_eq!(bands[1].bounds().y, 40);
    }

    #[test]
    fn close_regions_on_a_row_merge() {
        let regions = [Rect::new(0, 0, 20, 10), Rect::new(30, 0, 20, 10)];
        let artifacts = vec![block(0, 0, 20, 10), block(30, 0, 20, 10)];
        let bands = BandBuilder::default().build(&regions, artifacts);
        assert_eq!(bands.len(), 1);

        let regions = [Rect::new(0, 0, 20, 10), Rect::new(40, 0, 20, 10)];
        let artifacts = vec![block(0, 0, 20, 10), block(40, 0, 20, 10)];
        let bands = BandBuilder::default().build(&regions, artifacts);
        assert_eq!(bands.len(), 2);
        assert_eq!(bands[0].bounds().x, 0);
    }

    #[test]
    fn overlapping_regions_stay_separate() {
        let regions = [Rect::new(0, 0, 20, 10), Rect::new(15, 2, 20, 10)];
        let artifacts = vec![block(0, 0, 20, 10), block(15, 2, 20, 10)];
        let b = BandBuilder::default();
        assert!(b.same_row(&regions[0], &regions[1]));
        assert!(!b.should_merge(&regions[0], &regions[1]));
        let bands = b.build(&regions, artifacts);
        assert_eq!(bands.len(), 2);
    }

    #[test]
    fn same_row_needs_close_centers() {
        let b = BandBuilder::default();
        let a = Rect::new(0, 0, 10, 10);
        assert!(b.same_row(&a, &Rect::new(20, 3, 10, 10)));
        assert!(!b.same_row(&a, &Rect::new(20, 4, 10, 10)));
        assert!(!b.same_row(&a, &Rect::new(20, 10, 10, 10)));
    }

    #[test]
    fn orphan_artifact_goes_to_nearest_region() {
        let regions = [Rect::new(0, 0, 10, 10), Rect::new(100, 0, 10, 10)];
        let artifacts = vec![
            block(0, 0, 10, 10),
            block(100, 0, 10, 10),
            block(85, 2, 4, 4),
        ];
        let bands = BandBuilder::default().build(&regions, artifacts);
        assert_eq!(bands.len(), 2);
        let glyphs = bands[1].artifacts().iter().filter(|a| !a.is_space()).count();
        assert_eq!(glyphs, 2);
    }

    #[test]
    fn packing_uses_fixed_kerning() {
        let artifacts = vec![block(3, 0, 6, 10), block(12, 0, 4, 10)];
        let bands = BandBuilder::default().build(&[Rect::new(3, 0, 13, 10)], artifacts);
        let xs: Vec<usize> = bands[0]
            .artifacts()
            .iter()
            .map(|a| a.location_adjusted.x)
            .collect();
        assert_eq!(xs, vec![3, 3 + 6 + PACK_KERNING]);
    }
}
