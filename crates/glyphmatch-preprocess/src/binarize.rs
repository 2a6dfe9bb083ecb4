use glyphmatch_core::{OcrError, PixelGrid, Result};

/// Offset subtracted from the mean luma to get the global threshold.
pub const THRESHOLD_OFFSET: f32 = 90.0;

/// Luma of an 8-bit RGB pixel (BT.601 weights).
pub fn luma(r: u8, g: u8, b: u8) -> f32 {
    0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32
}

/// Stretch a luma value away from mid-gray. `contrast == 1.0` is a no-op.
pub fn apply_contrast(value: f32, contrast: f32) -> f32 {
    ((value - 128.0) * contrast + 128.0).clamp(0.0, 255.0)
}

/// Binarize an RGBA buffer: dark ink becomes active cells.
///
/// A single global threshold (`mean luma - THRESHOLD_OFFSET`) is used, which
/// suits the clean, evenly lit input this engine targets. Pixels brighter
/// than the threshold are background.
pub fn to_black_on_white(
    rgba: &[u8],
    width: usize,
    height: usize,
    contrast: f32,
) -> Result<PixelGrid> {
    let n = width * height;
    if n == 0 {
        return Ok(PixelGrid::new(0, 0));
    }
    if rgba.len() < n * 4 {
        return Err(OcrError::InvalidInput(format!(
            "RGBA buffer holds {} bytes, expected {} for {width}x{height}",
            rgba.len(),
            n * 4
        )));
    }

    let stretch = (contrast - 1.0).abs() > f32::EPSILON;
    let lumas: Vec<f32> = rgba[..n * 4]
        .chunks_exact(4)
        .map(|p| {
            let l = luma(p[0], p[1], p[2]);
            if stretch {
                apply_contrast(l, contrast)
            } else {
                l
            }
        })
        .collect();

    let mean = lumas.iter().sum::<f32>() / n as f32;
    let threshold = mean - THRESHOLD_OFFSET;

    let cells: Vec<bool> = lumas.iter().map(|&l| l <= threshold).collect();
    let grid = PixelGrid::from_cells(width, cells);

    tracing::trace!(
        width,
        height,
        mean,
        threshold,
        ink = grid.active_count(),
        "binarize"
    );
    Ok(grid)
}
