use std::sync::Arc;
use std::time::Instant;

use glyphmatch_core::{Lexicon, OcrError, PageResult, PixelGrid, RawImage, Result, TimingInfo};
use glyphmatch_detect::BandBuilder;
use glyphmatch_preprocess::{PreprocessPipeline, Preprocessed};
use glyphmatch_recognize::{Corrector, TemplateLibrary, TextAssembler};

use crate::config::PipelineConfig;

/// The full OCR pipeline: preprocess → bands → match → correct.
///
/// Immutable after construction. One image is recognized synchronously on
/// the calling thread; share the pipeline across threads for batches.
pub struct OcrPipeline {
    preprocess: PreprocessPipeline,
    builder: BandBuilder,
    assembler: TextAssembler,
    corrector: Corrector,
    config: PipelineConfig,
}

fn elapsed_ms(start: Instant) -> f32 {
    start.elapsed().as_secs_f32() * 1000.0
}

impl OcrPipeline {
    /// Build the pipeline. Fails with `PreconditionFailed` on an empty
    /// template library.
    pub fn new(
        library: Arc<TemplateLibrary>,
        dictionary: Option<Arc<dyn Lexicon>>,
        config: PipelineConfig,
    ) -> Result<Self> {
        let characters = library.len();
        let assembler = TextAssembler::new(library, config.assembler())?;
        let dictionary = dictionary.filter(|_| config.apply_dictionary_correction);
        let corrector = Corrector::new(dictionary);

        tracing::info!(
            characters,
            dictionary = corrector.has_dictionary(),
            splitting = config.attempt_character_splitting,
            "OCR pipeline ready"
        );

        Ok(Self {
            preprocess: PreprocessPipeline::new(config.preprocess()),
            builder: BandBuilder::default(),
            assembler,
            corrector,
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Recognize an already binarized page.
    pub fn recognize_grid(&self, binary: PixelGrid) -> String {
        let mut timing = TimingInfo::default();
        let total = Instant::now();
        let start = Instant::now();
        let pre = self.preprocess.execute_binary(binary);
        timing.preprocess_ms = elapsed_ms(start);
        self.run(pre, &mut timing, total).text
    }

    /// Recognize an RGBA buffer of `width`×`height` pixels.
    pub fn recognize_rgba(&self, rgba: &[u8], width: usize, height: usize) -> Result<String> {
        let mut timing = TimingInfo::default();
        let total = Instant::now();
        let start = Instant::now();
        let pre = self.preprocess.execute(rgba, width, height)?;
        timing.preprocess_ms = elapsed_ms(start);
        Ok(self.run(pre, &mut timing, total).text)
    }

    pub fn recognize_image(&self, image: &RawImage) -> Result<String> {
        self.recognize_detailed(image).map(|(page, _)| page.text)
    }

    /// Recognize an image and report per-line results and stage timings.
    ///
    /// `PageResult::lines` carry the assembled text of each band; the
    /// page text is the corrected text.
    pub fn recognize_detailed(&self, image: &RawImage) -> Result<(PageResult, TimingInfo)> {
        let mut timing = TimingInfo::default();
        let total = Instant::now();
        if image.is_empty() {
            return Ok((PageResult::default(), timing));
        }

        let start = Instant::now();
        let rgba = image.to_rgba().ok_or_else(|| {
            OcrError::InvalidInput(format!(
                "{}x{} image with {} channels and {} bytes",
                image.width,
                image.height,
                image.channels,
                image.data.len()
            ))
        })?;
        let pre = self
            .preprocess
            .execute(&rgba, image.width as usize, image.height as usize)?;
        timing.preprocess_ms = elapsed_ms(start);

        let page = self.run(pre, &mut timing, total);
        Ok((page, timing))
    }

    fn run(&self, pre: Preprocessed, timing: &mut TimingInfo, total: Instant) -> PageResult {
        let start = Instant::now();
        let mut bands = self.builder.build_page(&pre.binary, &pre.dilated);
        timing.detect_ms = elapsed_ms(start);

        let start = Instant::now();
        let lines = self.assembler.assemble(&mut bands);
        timing.recognize_ms = elapsed_ms(start);

        let start = Instant::now();
        let raw: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
        let text = self.corrector.correct(&raw.join("\n"));
        timing.correct_ms = elapsed_ms(start);
        timing.total_ms = elapsed_ms(total);

        let confidence = if lines.is_empty() {
            0.0
        } else {
            lines.iter().map(|l| l.confidence).sum::<f32>() / lines.len() as f32
        };

        tracing::info!(
            bands = bands.len(),
            lines = lines.len(),
            chars = text.chars().count(),
            confidence,
            total_ms = timing.total_ms,
            "page recognized"
        );

        PageResult {
            page_index: 0,
            text,
            lines,
            confidence,
        }
    }
}
