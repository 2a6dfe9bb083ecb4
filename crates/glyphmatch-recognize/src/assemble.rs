use std::sync::Arc;

use glyphmatch_core::{OcrError, PixelGrid, Result, ScoreMatch, TextLine};
use glyphmatch_detect::builder::PACK_KERNING;
use glyphmatch_detect::{split_large_artifact, Band};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::library::TemplateLibrary;
use crate::matcher::TemplateMatcher;

/// Width, relative to the band average, below which an artifact is narrow.
pub const MERGE_NARROW_RATIO: f32 = 0.6;
/// Largest combined width, relative to the band average, of a merge pair.
pub const MERGE_COMBINED_WIDTH_RATIO: f32 = 1.3;
/// Minimum best score of a merged artifact.
pub const MERGE_MIN_SCORE: f32 = 0.6;
/// How close an `H`/`h` candidate must be to the merged best.
pub const MERGE_H_WINDOW: f32 = 0.05;
/// How much the merged best must beat both halves.
pub const MERGE_IMPROVEMENT: f32 = 0.05;
/// Best score below which an artifact is a split candidate.
pub const SPLIT_SCORE_THRESHOLD: f32 = 0.4;
/// Scan passes per band before giving up on further splits and merges.
pub const MAX_RESCAN_PASSES: usize = 64;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AssemblerConfig {
    pub attempt_character_splitting: bool,
    /// Restrict matching to these characters. Empty = unrestricted.
    pub supported_characters: String,
    /// Pre-score a band's artifacts on the rayon pool.
    pub parallel_scoring: bool,
    /// Scan passes per band before the remaining artifacts are assigned
    /// their current best match.
    pub max_rescan_passes: usize,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            attempt_character_splitting: true,
            supported_characters: String::new(),
            parallel_scoring: false,
            max_rescan_passes: MAX_RESCAN_PASSES,
        }
    }
}

/// Counters for one band.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssemblyStats {
    pub passes: usize,
    pub merges: usize,
    pub splits: usize,
    pub capped: bool,
}

/// Recognizes the artifacts of each band and turns bands into lines.
pub struct TextAssembler {
    matcher: TemplateMatcher,
    config: AssemblerConfig,
}

/// Scores for the artifacts of a band, kept index-aligned with it.
struct ScoreCache(Vec<Option<Vec<ScoreMatch>>>);

impl ScoreCache {
    fn new(len: usize) -> Self {
        Self(vec![None; len])
    }

    fn get_or_score(
        &mut self,
        i: usize,
        artifact: &PixelGrid,
        matcher: &TemplateMatcher,
    ) -> &[ScoreMatch] {
        self.0[i].get_or_insert_with(|| matcher.score(artifact))
    }

    fn remove(&mut self, i: usize) {
        self.0.remove(i);
    }

    fn set(&mut self, i: usize, scores: Vec<ScoreMatch>) {
        self.0[i] = Some(scores);
    }
}

impl TextAssembler {
    /// Fails with `PreconditionFailed` on an empty library. A
    /// `supported_characters` filter that leaves nothing is allowed; every
    /// artifact then matches the empty string.
    pub fn new(library: Arc<TemplateLibrary>, config: AssemblerConfig) -> Result<Self> {
        if library.is_empty() {
            return Err(OcrError::PreconditionFailed(
                "template library is empty".into(),
            ));
        }
        let library = if config.supported_characters.is_empty() {
            library
        } else {
            let restricted = library.restrict(&config.supported_characters);
            if restricted.is_empty() {
                tracing::warn!(
                    supported = %config.supported_characters,
                    "no template matches the supported characters"
                );
            }
            Arc::new(restricted)
        };
        Ok(Self {
            matcher: TemplateMatcher::new(library),
            config,
        })
    }

    pub fn matcher(&self) -> &TemplateMatcher {
        &self.matcher
    }

    /// Recognize every band, in order, and return one line per band that
    /// produced text.
    pub fn assemble(&self, bands: &mut [Band]) -> Vec<TextLine> {
        let mut lines = Vec::with_capacity(bands.len());
        for (index, band) in bands.iter_mut().enumerate() {
            let stats = self.assemble_band(band);
            let line = line_of(band);
            tracing::debug!(
                band = index,
                passes = stats.passes,
                merges = stats.merges,
                splits = stats.splits,
                text = %line.text,
                "assembled band"
            );
            if !line.text.trim().is_empty() {
                lines.push(line);
            }
        }
        lines
    }

    /// Match every artifact of `band`, splitting and merging until a full
    /// pass changes nothing or the rescan limit is reached.
    pub fn assemble_band(&self, band: &mut Band) -> AssemblyStats {
        let mut stats = AssemblyStats::default();

        'scan: loop {
            if stats.passes >= self.config.max_rescan_passes {
                stats.capped = true;
                tracing::warn!(
                    passes = stats.passes,
                    artifacts = band.len(),
                    "rescan limit reached, keeping current matches"
                );
                self.assign_remaining(band);
                break;
            }
            stats.passes += 1;

            let mut cache = self.prescore(band);
            let mut changed = false;
            let mut i = 0;

            while i < band.len() {
                if band.artifacts()[i].is_matched() {
                    i += 1;
                    continue;
                }
                let scores = cache
                    .get_or_score(i, &band.artifacts()[i], &self.matcher)
                    .to_vec();

                if let Some((merged, merged_scores)) =
                    self.try_merge(band, i, &scores, &mut cache)
                {
                    band.remove(i + 1);
                    cache.remove(i + 1);
                    band.replace(i, vec![merged]);
                    cache.set(i, merged_scores);
                    stats.merges += 1;
                    changed = true;
                    i += 1;
                    continue;
                }

                let top = scores.first();
                let weak = top.map_or(true, |m| m.score < SPLIT_SCORE_THRESHOLD);
                if weak {
                    band.artifacts_mut()[i].needs_inspection = true;
                }
                if weak && self.config.attempt_character_splitting {
                    let average_width = band.average_width();
                    if let Some(pieces) =
                        split_large_artifact(&band.artifacts()[i], average_width)
                    {
                        band.replace(i, pieces);
                        stats.splits += 1;
                        continue 'scan;
                    }
                }

                assign(&mut band.artifacts_mut()[i], top);
                i += 1;
            }

            if !changed {
                break;
            }
        }

        band.pack(PACK_KERNING);
        stats
    }

    /// Score all unmatched artifacts up front on the rayon pool.
    fn prescore(&self, band: &Band) -> ScoreCache {
        let mut cache = ScoreCache::new(band.len());
        if !self.config.parallel_scoring {
            return cache;
        }
        let scored: Vec<(usize, Vec<ScoreMatch>)> = band
            .artifacts()
            .par_iter()
            .enumerate()
            .filter(|(_, a)| !a.is_matched())
            .map(|(i, a)| (i, self.matcher.score(a)))
            .collect();
        for (i, scores) in scored {
            cache.set(i, scores);
        }
        cache
    }

    /// Merge artifact `i` with its right neighbor if the pair qualifies and
    /// the merged shape is a convincing match.
    fn try_merge(
        &self,
        band: &Band,
        i: usize,
        scores: &[ScoreMatch],
        cache: &mut ScoreCache,
    ) -> Option<(PixelGrid, Vec<ScoreMatch>)> {
        let current = band.get(i)?;
        let next = band.get(i + 1)?;
        if next.is_matched() || current.is_space() || next.is_space() {
            return None;
        }

        let average_width = band.average_width();
        let a = current.bounds();
        let b = next.bounds();

        let gap_limit = (average_width / 2.0)
            .min(2.0 * band.average_kerning())
            .max(1.0);
        if a.horizontal_gap(&b) as f32 > gap_limit {
            return None;
        }

        let both_lines = current.is_considered_line() && next.is_considered_line();
        let narrow = MERGE_NARROW_RATIO * average_width;
        let both_narrow = a.width as f32 <= narrow && b.width as f32 <= narrow;
        let combined = a.union(&b).width as f32;
        let fits = combined <= MERGE_COMBINED_WIDTH_RATIO * average_width;
        if !(both_lines || both_narrow || fits) {
            return None;
        }

        let mut merged = current.clone();
        merged.merge_artifact(next);
        let merged_scores = self.matcher.score(&merged);
        let best = merged_scores.first()?;
        if best.score < MERGE_MIN_SCORE {
            return None;
        }

        let next_best = cache
            .get_or_score(i + 1, next, &self.matcher)
            .first()
            .map_or(0.0, |m| m.score);
        let separate_best = scores.first().map_or(0.0, |m| m.score).max(next_best);

        let is_h = |c: char| c == 'H' || c == 'h';
        let h_close = merged_scores.iter().any(|m| {
            is_h(m.character)
                && m.score >= MERGE_MIN_SCORE
                && best.score - m.score <= MERGE_H_WINDOW
        });
        let accepted =
            is_h(best.character) || h_close || best.score > separate_best + MERGE_IMPROVEMENT;
        if !accepted {
            return None;
        }

        tracing::trace!(
            x = a.x,
            merged = %best.character,
            score = best.score,
            separate = separate_best,
            "merged neighbors"
        );
        assign(&mut merged, Some(best));
        Some((merged, merged_scores))
    }

    fn assign_remaining(&self, band: &mut Band) {
        for artifact in band.artifacts_mut() {
            if !artifact.is_matched() {
                let best = self.matcher.best(artifact);
                assign(artifact, best.as_ref());
            }
        }
    }
}

fn assign(artifact: &mut PixelGrid, best: Option<&ScoreMatch>) {
    match best {
        Some(m) => {
            artifact.matching_character = Some(m.character.to_string());
            artifact.matching_score = m.score;
        }
        None => {
            artifact.matching_character = Some(String::new());
            artifact.matching_score = 0.0;
        }
    }
}

/// Line text, mean score over non-space artifacts, and bounds.
fn line_of(band: &Band) -> TextLine {
    let glyphs: Vec<f32> = band
        .artifacts()
        .iter()
        .filter(|a| !a.is_space())
        .map(|a| a.matching_score)
        .collect();
    let confidence = if glyphs.is_empty() {
        0.0
    } else {
        glyphs.iter().sum::<f32>() / glyphs.len() as f32
    };
    TextLine {
        text: band.text(),
        confidence,
        bbox: band.bounds(),
    }
}
