//! Tie-breaks between shapes template scores separate poorly.
//!
//! Both rules look only at the rank-0 match and one named contender, and
//! only ever move the contender to the top.

use glyphmatch_core::{PixelGrid, ScoreMatch};

/// Side of the lower-right probe square for `P`/`R`, as a fraction of the
/// grid.
pub const PR_REGION_RATIO: f32 = 0.45;
/// Lower-right density, relative to overall density, that suggests the leg
/// of an `R`.
pub const PR_DENSITY_RATIO: f32 = 0.6;
pub const PR_SCORE_GAP: f32 = 0.06;
/// Column count, relative to the maximum, that makes a column part of a
/// stem.
pub const STEM_PEAK_RATIO: f32 = 0.8;
pub const MU_MAX_STEMS: usize = 2;
pub const MU_ASPECT_MAX: f32 = 1.05;
pub const MU_SCORE_GAP: f32 = 0.08;

/// Apply the `P`→`R` and `m`→`u` rules to a sorted match list.
///
/// `normalized` is the artifact on the template canvas, `artifact` the
/// original.
pub fn disambiguate(matches: &mut Vec<ScoreMatch>, normalized: &PixelGrid, artifact: &PixelGrid) {
    let Some(top) = matches.first() else {
        return;
    };
    match top.character {
        'P' | 'p' => promote_r(matches, normalized),
        'm' => promote_u(matches, normalized, artifact),
        _ => {}
    }
}

fn promote_r(matches: &mut Vec<ScoreMatch>, normalized: &PixelGrid) {
    let top = &matches[0];
    let target = if top.character == 'P' { 'R' } else { 'r' };
    let Some(idx) = position(matches, target) else {
        return;
    };
    if matches[idx].score < top.score - PR_SCORE_GAP {
        return;
    }
    if lower_right_density(normalized) >= PR_DENSITY_RATIO * normalized.density() {
        tracing::trace!(from = %top.character, to = %target, "promoted contender");
        promote(matches, idx);
    }
}

fn promote_u(matches: &mut Vec<ScoreMatch>, normalized: &PixelGrid, artifact: &PixelGrid) {
    let Some(idx) = position(matches, 'u') else {
        return;
    };
    let stems = count_stems(&normalized.column_histogram());
    let accept = if stems <= MU_MAX_STEMS {
        true
    } else {
        let gap = matches[0].score - matches[idx].score;
        artifact.content_aspect_ratio() < MU_ASPECT_MAX && gap <= MU_SCORE_GAP
    };
    if accept {
        tracing::trace!(stems, "promoted u over m");
        promote(matches, idx);
    }
}

fn position(matches: &[ScoreMatch], c: char) -> Option<usize> {
    matches.iter().skip(1).position(|m| m.character == c).map(|i| i + 1)
}

fn promote(matches: &mut Vec<ScoreMatch>, idx: usize) {
    let m = matches.remove(idx);
    matches.insert(0, m);
}

/// Ink density of the lower-right `PR_REGION_RATIO` square.
pub fn lower_right_density(grid: &PixelGrid) -> f32 {
    let w = ((grid.cols() as f32 * PR_REGION_RATIO).ceil() as usize).min(grid.cols());
    let h = ((grid.rows() as f32 * PR_REGION_RATIO).ceil() as usize).min(grid.rows());
    if w == 0 || h == 0 {
        return 0.0;
    }
    let (x0, y0) = (grid.cols() - w, grid.rows() - h);
    let mut on = 0;
    for y in y0..grid.rows() {
        for x in x0..grid.cols() {
            if grid.get(x, y) {
                on += 1;
            }
        }
    }
    on as f32 / (w * h) as f32
}

/// Number of runs of columns whose count is at least `STEM_PEAK_RATIO` of
/// the tallest column.
pub fn count_stems(hist: &[usize]) -> usize {
    let max = hist.iter().copied().max().unwrap_or(0);
    if max == 0 {
        return 0;
    }
    let cutoff = STEM_PEAK_RATIO * max as f32;
    let mut stems = 0;
    let mut in_stem = false;
    for &h in hist {
        let strong = h as f32 >= cutoff;
        if strong && !in_stem {
            stems += 1;
        }
        in_stem = strong;
    }
    stems
}
