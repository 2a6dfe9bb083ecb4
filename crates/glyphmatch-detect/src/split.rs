//! Splitting touching characters at ink-histogram valleys.

use glyphmatch_core::PixelGrid;

/// An artifact wider than this many average widths is a split candidate.
pub const SPLIT_WIDTH_RATIO: f32 = 2.0;
/// Multiplier on the smallest local minimum for the hard-valley threshold.
pub const VALLEY_THRESHOLD_FACTOR: f32 = 1.2;
/// A soft valley may be at most this fraction of its lower neighboring peak.
pub const SOFT_VALLEY_PEAK_RATIO: f32 = 0.4;
/// Columns searched past a plateau for the histogram to rise again.
pub const SOFT_VALLEY_LOOKAHEAD: usize = 2;
/// Split points closer than this are collapsed into the first.
pub const MIN_SPLIT_SPACING: usize = 2;

/// Hard-valley threshold: the smallest strict interior local minimum times
/// `VALLEY_THRESHOLD_FACTOR`, truncated. 0 if there is no local minimum.
pub fn valley_threshold(hist: &[usize]) -> usize {
    if hist.len() < 3 {
        return 0;
    }
    hist.windows(3)
        .filter(|w| w[1] < w[0] && w[1] < w[2])
        .map(|w| w[1])
        .min()
        .map(|m| (m as f32 * VALLEY_THRESHOLD_FACTOR) as usize)
        .unwrap_or(0)
}

/// Inclusive column runs at or below the hard-valley threshold, reduced to
/// their middle column. Runs touching either edge are serifs and dropped.
pub fn hard_valleys(hist: &[usize]) -> Vec<usize> {
    let threshold = valley_threshold(hist);
    let last = hist.len().saturating_sub(1);
    let mut points = Vec::new();
    let mut i = 0;
    while i < hist.len() {
        if hist[i] > threshold {
            i += 1;
            continue;
        }
        let start = i;
        while i + 1 < hist.len() && hist[i + 1] <= threshold {
            i += 1;
        }
        if start > 0 && i < last {
            points.push((start + i) / 2);
        }
        i += 1;
    }
    points
}

/// Middle columns of flat local minima that are shallow relative to the
/// peaks around them.
pub fn soft_valleys(hist: &[usize]) -> Vec<usize> {
    let mut points = Vec::new();
    let mut start = 1;
    while start + 1 < hist.len() {
        let value = hist[start];
        let mut end = start;
        while end + 1 < hist.len() && hist[end + 1] == value {
            end += 1;
        }

        let falls_in = hist[start - 1] > value;
        if falls_in && rises_within(hist, end + 1, value) {
            let left_peak = peak_left(hist, start - 1);
            let right_peak = peak_right(hist, end + 1);
            let limit = SOFT_VALLEY_PEAK_RATIO * left_peak.min(right_peak) as f32;
            if value as f32 <= limit {
                points.push((start + end) / 2);
            }
        }
        start = end + 1;
    }
    points
}

fn rises_within(hist: &[usize], from: usize, value: usize) -> bool {
    for &h in hist.iter().skip(from).take(SOFT_VALLEY_LOOKAHEAD) {
        if h != value {
            return h > value;
        }
    }
    false
}

/// Walk left while the histogram does not decrease.
fn peak_left(hist: &[usize], mut i: usize) -> usize {
    while i > 0 && hist[i - 1] >= hist[i] {
        i -= 1;
    }
    hist[i]
}

fn peak_right(hist: &[usize], mut i: usize) -> usize {
    while i + 1 < hist.len() && hist[i + 1] >= hist[i] {
        i += 1;
    }
    hist[i]
}

/// Sorted split columns from both valley kinds, at least
/// `MIN_SPLIT_SPACING` apart and never on the outer columns.
pub fn split_points(hist: &[usize]) -> Vec<usize> {
    let last = hist.len().saturating_sub(1);
    let mut candidates = hard_valleys(hist);
    candidates.extend(soft_valleys(hist));
    candidates.retain(|&p| p > 0 && p < last);
    candidates.sort_unstable();

    let mut points: Vec<usize> = Vec::with_capacity(candidates.len());
    for p in candidates {
        match points.last() {
            Some(&prev) if p - prev < MIN_SPLIT_SPACING => {}
            _ => points.push(p),
        }
    }
    points
}

/// Cut a too-wide artifact into column slices at its valleys.
///
/// Returns `None` unless the artifact is wider than
/// `SPLIT_WIDTH_RATIO * average_width` and at least two non-empty pieces
/// result.
pub fn split_large_artifact(artifact: &PixelGrid, average_width: f32) -> Option<Vec<PixelGrid>> {
    if average_width <= 0.0 || artifact.cols() as f32 <= SPLIT_WIDTH_RATIO * average_width {
        return None;
    }

    let hist = artifact.column_histogram();
    let points = split_points(&hist);
    if points.is_empty() {
        return None;
    }

    let mut bounds = Vec::with_capacity(points.len() + 2);
    bounds.push(0);
    bounds.extend(points);
    bounds.push(artifact.cols());

    let pieces: Vec<PixelGrid> = bounds
        .windows(2)
        .map(|w| artifact.columns(w[0]..w[1]))
        .filter(|piece| piece.active_count() > 0)
        .map(|mut piece| {
            piece.was_part_of_split = true;
            piece
        })
        .collect();

    tracing::debug!(
        x = artifact.location_found.x,
        width = artifact.cols(),
        pieces = pieces.len(),
        "split artifact"
    );

    (pieces.len() >= 2).then_some(pieces)
}
