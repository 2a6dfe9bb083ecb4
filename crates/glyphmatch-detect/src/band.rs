use std::sync::OnceLock;

use glyphmatch_core::{PixelGrid, Point, Rect};

#[derive(Debug, Clone, Copy, Default)]
struct BandStats {
    average_width: f32,
    average_kerning: f32,
}

/// One text line: an ordered run of artifacts.
///
/// The band owns its artifacts. Width and kerning statistics ignore spaces
/// and are recomputed after any change to the artifact list.
#[derive(Debug, Clone, Default)]
pub struct Band {
    artifacts: Vec<PixelGrid>,
    stats: OnceLock<BandStats>,
}

impl Band {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_artifacts(artifacts: Vec<PixelGrid>) -> Self {
        Self {
            artifacts,
            stats: OnceLock::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    pub fn artifacts(&self) -> &[PixelGrid] {
        &self.artifacts
    }

    /// Mutable access to the artifacts. Statistics are recomputed afterwards.
    pub fn artifacts_mut(&mut self) -> &mut [PixelGrid] {
        self.invalidate();
        &mut self.artifacts
    }

    pub fn get(&self, index: usize) -> Option<&PixelGrid> {
        self.artifacts.get(index)
    }

    pub fn push(&mut self, artifact: PixelGrid) {
        self.artifacts.push(artifact);
        self.invalidate();
    }

    pub fn remove(&mut self, index: usize) -> PixelGrid {
        let a = self.artifacts.remove(index);
        self.invalidate();
        a
    }

    /// Replace the artifact at `index` with `pieces`, in order.
    pub fn replace(&mut self, index: usize, pieces: Vec<PixelGrid>) {
        self.artifacts.splice(index..=index, pieces);
        self.invalidate();
    }

    /// Move every artifact of `other` into this band.
    pub fn absorb(&mut self, other: Band) {
        self.artifacts.extend(other.artifacts);
        self.invalidate();
    }

    pub fn into_artifacts(self) -> Vec<PixelGrid> {
        self.artifacts
    }

    fn invalidate(&mut self) {
        self.stats = OnceLock::new();
    }

    /// Union of all artifact bounds in source-image coordinates.
    pub fn bounds(&self) -> Rect {
        self.artifacts
            .iter()
            .fold(Rect::empty(), |acc, a| acc.union(&a.bounds()))
    }

    /// Mean width of the non-space artifacts, 0 if there are none.
    pub fn average_width(&self) -> f32 {
        self.stats().average_width
    }

    /// Mean horizontal gap between consecutive non-space artifacts,
    /// 0 with fewer than two.
    pub fn average_kerning(&self) -> f32 {
        self.stats().average_kerning
    }

    fn stats(&self) -> BandStats {
        *self.stats.get_or_init(|| {
            let glyphs: Vec<Rect> = self
                .artifacts
                .iter()
                .filter(|a| !a.is_space())
                .map(PixelGrid::bounds)
                .collect();
            if glyphs.is_empty() {
                return BandStats::default();
            }
            let average_width =
                glyphs.iter().map(|r| r.width as f32).sum::<f32>() / glyphs.len() as f32;
            let average_kerning = if glyphs.len() < 2 {
                0.0
            } else {
                let total: i64 = glyphs
                    .windows(2)
                    .map(|w| w[0].horizontal_gap(&w[1]).max(0))
                    .sum();
                total as f32 / (glyphs.len() - 1) as f32
            };
            BandStats {
                average_width,
                average_kerning,
            }
        })
    }

    pub fn sort_left_to_right(&mut self) {
        let key = |a: &PixelGrid| (a.location_found.x, a.location_found.y, a.cols(), a.rows());
        self.artifacts.sort_by(|a, b| key(a).cmp(&key(b)));
        self.invalidate();
    }

    /// Pad every artifact top and bottom so all share the band's vertical
    /// extent.
    pub fn pad_to_height(&mut self) {
        let band = self.bounds();
        for a in &mut self.artifacts {
            let top = a.location_found.y.saturating_sub(band.y);
            let bottom = band.bottom().saturating_sub(a.location_found.y + a.rows());
            if top > 0 || bottom > 0 {
                a.pad(top, bottom, 0, 0);
            }
        }
        self.invalidate();
    }

    /// Lay artifacts out left to right with a fixed gap, starting at the
    /// band's left edge. Only `location_adjusted` changes.
    pub fn pack(&mut self, kerning: usize) {
        let band = self.bounds();
        let mut x = band.x;
        for a in &mut self.artifacts {
            a.location_adjusted = Point::new(x, band.y);
            x += a.cols() + kerning;
        }
    }

    /// Matched characters concatenated by packed position. Unmatched
    /// artifacts contribute nothing.
    pub fn text(&self) -> String {
        let mut ordered: Vec<&PixelGrid> = self.artifacts.iter().collect();
        ordered.sort_by_key(|a| (a.location_adjusted.x, a.location_found.x));
        ordered
            .iter()
            .filter_map(|a| a.matching_character.as_deref())
            .collect()
    }
}
