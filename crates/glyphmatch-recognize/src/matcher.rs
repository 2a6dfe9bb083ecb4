use std::sync::Arc;

use glyphmatch_core::{PixelGrid, ScoreMatch};

use crate::disambiguate::disambiguate;
use crate::library::{TemplateLibrary, TemplateVariant};

/// Weight of the best variant in a character's combined score.
pub const BEST_VARIANT_WEIGHT: f32 = 0.7;
/// Weight of the mean over the character's qualifying variants.
pub const AVERAGE_VARIANT_WEIGHT: f32 = 0.3;
/// Feature checks (out of 4) a variant must agree on to be scored.
pub const PREFILTER_MIN_AGREEMENT: usize = 2;

/// The features templates are pre-filtered on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlyphFeatures {
    pub enclosures: usize,
    pub line_left: bool,
    pub line_right: bool,
    pub is_punctuation: bool,
}

impl GlyphFeatures {
    pub fn of(grid: &PixelGrid) -> Self {
        Self {
            enclosures: grid.enclosures(),
            line_left: grid.vertical_line_left(),
            line_right: grid.vertical_line_right(),
            is_punctuation: grid.is_punctuation(),
        }
    }

    /// Number of the four checks on which `variant` agrees.
    pub fn agreement(&self, variant: &TemplateVariant) -> usize {
        [
            self.enclosures == variant.enclosures,
            self.line_left == variant.line_left,
            self.line_right == variant.line_right,
            self.is_punctuation == variant.is_punctuation,
        ]
        .into_iter()
        .filter(|&agrees| agrees)
        .count()
    }
}

/// Scores artifacts against a shared template library.
#[derive(Clone)]
pub struct TemplateMatcher {
    library: Arc<TemplateLibrary>,
}

impl TemplateMatcher {
    pub fn new(library: Arc<TemplateLibrary>) -> Self {
        Self { library }
    }

    pub fn library(&self) -> &TemplateLibrary {
        &self.library
    }

    /// All candidate characters for `artifact`, best first.
    ///
    /// Never fails: an empty library yields an empty list, and an artifact
    /// no variant pre-qualifies for is scored against every variant.
    pub fn score(&self, artifact: &PixelGrid) -> Vec<ScoreMatch> {
        if self.library.is_empty() {
            return Vec::new();
        }

        let features = GlyphFeatures::of(artifact);
        let prefiltered = self
            .library
            .characters()
            .iter()
            .flat_map(|t| &t.variants)
            .any(|v| features.agreement(v) >= PREFILTER_MIN_AGREEMENT);
        if !prefiltered {
            tracing::trace!(?features, "no template qualified, scoring full library");
        }

        let normalized =
            artifact.create_normalize_matrix(self.library.width(), self.library.height());
        let eroded = normalized.erode_soft();

        let mut matches = Vec::with_capacity(self.library.len());
        for template in self.library.characters() {
            let mut best: Option<(usize, f32)> = None;
            let mut total = 0.0;
            let mut count = 0;

            for (i, variant) in template.variants.iter().enumerate() {
                if prefiltered && features.agreement(variant) < PREFILTER_MIN_AGREEMENT {
                    continue;
                }
                let s = normalized
                    .similarity(&variant.grid)
                    .max(eroded.similarity(&variant.grid));
                total += s;
                count += 1;
                if best.map_or(true, |(_, b)| s > b) {
                    best = Some((i, s));
                }
            }

            if let Some((variant, best_score)) = best {
                let average = total / count as f32;
                let combined = BEST_VARIANT_WEIGHT * best_score + AVERAGE_VARIANT_WEIGHT * average;
                matches.push(ScoreMatch::new(template.character, variant, combined));
            }
        }

        // Stable: equal scores keep library order.
        matches.sort_by(|a, b| b.score.total_cmp(&a.score));
        disambiguate(&mut matches, &normalized, artifact);

        tracing::trace!(
            x = artifact.location_found.x,
            y = artifact.location_found.y,
            top = ?matches.first(),
            candidates = matches.len(),
            "scored artifact"
        );
        matches
    }

    /// Best candidate, if any.
    pub fn best(&self, artifact: &PixelGrid) -> Option<ScoreMatch> {
        self.score(artifact).into_iter().next()
    }
}
