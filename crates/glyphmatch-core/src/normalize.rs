//! Resizing artifacts onto the fixed template canvas.

use crate::grid::PixelGrid;

/// Density at or below which the sparse fill threshold applies.
pub const LOW_DENSITY: f32 = 0.15;
/// Density at or above which the dense fill threshold applies.
pub const HIGH_DENSITY: f32 = 0.45;
pub const LOW_FILL_THRESHOLD: f32 = 0.25;
pub const HIGH_FILL_THRESHOLD: f32 = 0.50;

/// Coverage fraction a downscaled cell needs to be considered ink.
///
/// Sparse glyphs get a lower threshold so thin strokes survive; dense glyphs
/// a higher one so counters do not fill in. Linear in between.
pub fn fill_threshold(density: f32) -> f32 {
    if density <= LOW_DENSITY {
        LOW_FILL_THRESHOLD
    } else if density >= HIGH_DENSITY {
        HIGH_FILL_THRESHOLD
    } else {
        let t = (density - LOW_DENSITY) / (HIGH_DENSITY - LOW_DENSITY);
        LOW_FILL_THRESHOLD + t * (HIGH_FILL_THRESHOLD - LOW_FILL_THRESHOLD)
    }
}

impl PixelGrid {
    /// Produce a `width`×`height` grid comparable against templates.
    ///
    /// Glyphs are trimmed to their ink; punctuation keeps its full height so
    /// a comma and an apostrophe stay distinguishable. The result always has
    /// exactly the requested size.
    pub fn create_normalize_matrix(&self, width: usize, height: usize) -> PixelGrid {
        if width == 0 || height == 0 {
            return PixelGrid::new(width, height);
        }
        let mut source = if self.is_punctuation() {
            self.centered_strip(width, height)
        } else {
            self.trim()
        };
        source.pad(1, 1, 1, 1);
        resize(&source, width, height)
    }

    /// Content columns at full height, centered in a canvas with the
    /// target aspect ratio.
    fn centered_strip(&self, width: usize, height: usize) -> PixelGrid {
        let content = self.content_rect();
        let mut strip = self.columns(content.x..content.right());
        let target_cols = ((strip.rows * width) as f32 / height as f32).round() as usize;
        let extra = target_cols.saturating_sub(strip.cols);
        let left = extra / 2;
        strip.pad(0, 0, left, extra - left);
        strip
    }
}

/// Nearest-neighbor when growing in both axes, coverage thresholding
/// otherwise.
fn resize(src: &PixelGrid, width: usize, height: usize) -> PixelGrid {
    let mut out = PixelGrid::new(width, height);
    let (sw, sh) = (src.cols, src.rows);
    if sw == 0 || sh == 0 {
        return out;
    }

    if sw <= width && sh <= height {
        for y in 0..height {
            let sy = y * sh / height;
            for x in 0..width {
                let sx = x * sw / width;
                out.cells[y * width + x] = src.cells[sy * sw + sx];
            }
        }
        return out;
    }

    let threshold = fill_threshold(src.density());
    for y in 0..height {
        let y0 = y * sh / height;
        let y1 = ((y + 1) * sh / height).max(y0 + 1);
        for x in 0..width {
            let x0 = x * sw / width;
            let x1 = ((x + 1) * sw / width).max(x0 + 1);
            let mut on = 0usize;
            for sy in y0..y1 {
                on += src.cells[sy * sw + x0..sy * sw + x1]
                    .iter()
                    .filter(|&&c| c)
                    .count();
            }
            let total = (x1 - x0) * (y1 - y0);
            out.cells[y * width + x] = on as f32 / total as f32 >= threshold;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn threshold_interpolates() {
        assert_eq!(fill_threshold(0.0), LOW_FILL_THRESHOLD);
        assert_eq!(fill_threshold(0.9), HIGH_FILL_THRESHOLD);
        assert!((fill_threshold(0.30) - 0.375).abs() < 1e-6);
    }

    #[test]
    fn empty_input_normalizes_to_blank_canvas() {
        let n = PixelGrid::default().create_normalize_matrix(12, 16);
        assert_eq!((n.cols(), n.rows()), (12, 16));
        assert_eq!(n.active_count(), 0);
    }

    #[test]
    fn upscale_is_nearest_neighbor() {
        let g = PixelGrid::from_ascii("#");
        // 1×1 ink + border = 3×3, scaled ×2.
        let n = g.create_normalize_matrix(6, 6);
        assert_eq!(n.active_count(), 4);
        assert!(n.get(2, 2) && n.get(3, 3));
        assert!(!n.get(1, 1) && !n.get(4, 4));
    }

    #[test]
    fn downscale_keeps_thick_strokes() {
        let mut art = String::new();
        for _ in 0..40 {
            art.push_str(&"#".repeat(8));
            art.push_str(&".".repeat(16));
            art.push_str(&"#".repeat(8));
            art.push('\n');
        }
        let n = PixelGrid::from_ascii(&art).create_normalize_matrix(8, 10);
        // Both vertical bars survive as the outer ink columns.
        assert!(n.get(1, 5));
        assert!(n.get(6, 5));
        assert!(!n.get(4, 5));
    }

    #[test]
    fn punctuation_keeps_vertical_position() {
        let mut period = PixelGrid::from_ascii("##\n##");
        period.pad(10, 0, 0, 0);
        let mut apostrophe = PixelGrid::from_ascii("##\n##");
        apostrophe.pad(0, 10, 0, 0);
        let p = period.create_normalize_matrix(10, 14);
        let a = apostrophe.create_normalize_matrix(10, 14);
        assert!(p.similarity(&a) < 0.5);
    }

    proptest! {
        #[test]
        fn prop_normalize_has_requested_size(
            w in 0usize..20,
            h in 0usize..20,
            tw in 1usize..24,
            th in 1usize..24,
            seed in proptest::collection::vec(any::<bool>(), 400),
        ) {
            let g = PixelGrid::from_cells(w, seed[..w * h].to_vec());
            let n = g.create_normalize_matrix(tw, th);
            prop_assert_eq!((n.cols(), n.rows()), (tw, th));
        }
    }
}
