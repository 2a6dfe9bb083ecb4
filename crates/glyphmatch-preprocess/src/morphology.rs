use glyphmatch_core::PixelGrid;

/// Default dilation kernel size as a fraction of the image width.
pub const DEFAULT_KERNEL_RATIO: f32 = 0.02;

/// Dilation kernel size for an image: `round(ratio * width)` clamped to
/// `[1, width]`.
pub fn compute_kernel_size(width: usize, _height: usize, ratio: f32) -> usize {
    if width == 0 {
        return 0;
    }
    ((ratio * width as f32).round() as usize).clamp(1, width)
}

/// Square binary dilation with radius `kernel_size / 2`.
///
/// Implemented as a horizontal then a vertical sliding-window pass, which is
/// equivalent to the square structuring element. Borders are clamped.
/// Kernel sizes 0 and 1 return an unchanged copy.
pub fn dilate(grid: &PixelGrid, kernel_size: usize) -> PixelGrid {
    let radius = kernel_size / 2;
    let (w, h) = (grid.cols(), grid.rows());
    if radius == 0 || grid.is_empty() {
        return grid.clone();
    }

    let mut horizontal = vec![false; w * h];
    dilate_horizontal(grid.cells(), &mut horizontal, w, h, radius);
    let mut both = vec![false; w * h];
    dilate_vertical(&horizontal, &mut both, w, h, radius);

    tracing::trace!(width = w, height = h, kernel_size, "dilate");

    let mut out = PixelGrid::from_cells(w, both);
    out.location_found = grid.location_found;
    out
}

/// Each output cell is set if any input cell in `[x - r, x + r]` is set.
fn dilate_horizontal(input: &[bool], output: &mut [bool], w: usize, h: usize, r: usize) {
    for y in 0..h {
        let row = y * w;
        let mut count = input[row..row + (r + 1).min(w)]
            .iter()
            .filter(|&&c| c)
            .count();

        for x in 0..w {
            output[row + x] = count > 0;

            // Cell entering the right edge of the next window.
            let enter = x + r + 1;
            if enter < w && input[row + enter] {
                count += 1;
            }
            // Cell leaving the left edge of the current window.
            if x >= r && input[row + x - r] {
                count -= 1;
            }
        }
    }
}

fn dilate_vertical(input: &[bool], output: &mut [bool], w: usize, h: usize, r: usize) {
    for x in 0..w {
        let mut count = (0..(r + 1).min(h)).filter(|&y| input[y * w + x]).count();

        for y in 0..h {
            output[y * w + x] = count > 0;

            let enter = y + r + 1;
            if enter < h && input[enter * w + x] {
                count += 1;
            }
            if y >= r && input[(y - r) * w + x] {
                count -= 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn kernel_size_is_clamped() {
        assert_eq!(compute_kernel_size(500, 100, DEFAULT_KERNEL_RATIO), 10);
        assert_eq!(compute_kernel_size(10, 10, DEFAULT_KERNEL_RATIO), 1);
        assert_eq!(compute_kernel_size(10, 10, 5.0), 10);
        assert_eq!(compute_kernel_size(0, 10, DEFAULT_KERNEL_RATIO), 0);
    }

    #[test]
    fn single_pixel_grows_to_square() {
        let mut g = PixelGrid::new(7, 7);
        g.set(3, 3, true);
        let d = dilate(&g, 4);
        assert_eq!(d.active_count(), 25);
        assert!(d.get(1, 1) && d.get(5, 5));
        assert!(!d.get(0, 3) && !d.get(6, 3));
    }

    #[test]
    fn dilation_is_clamped_at_borders() {
        let mut g = PixelGrid::new(4, 4);
        g.set(0, 0, true);
        let d = dilate(&g, 2);
        assert_eq!(d.active_count(), 4);
        assert!(d.get(1, 1));
    }

    #[test]
    fn bridges_small_gaps() {
        let g = PixelGrid::from_ascii("#...#");
        let d = dilate(&g, 4);
        assert_eq!(d.active_count(), 5);
    }

    proptest! {
        #[test]
        fn prop_kernel_zero_is_identity(
            w in 1usize..16,
            cells in proptest::collection::vec(any::<bool>(), 0..200),
        ) {
            let g = PixelGrid::from_cells(w, cells);
            prop_assert_eq!(dilate(&g, 0), g);
        }

        #[test]
        fn prop_larger_kernel_never_loses_ink(
            w in 1usize..16,
            cells in proptest::collection::vec(any::<bool>(), 0..200),
            k in 0usize..6,
        ) {
            let g = PixelGrid::from_cells(w, cells);
            let small = dilate(&g, k).active_count();
            let large = dilate(&g, k + 1).active_count();
            prop_assert!(g.active_count() <= small);
            prop_assert!(small <= large);
        }
    }
}
