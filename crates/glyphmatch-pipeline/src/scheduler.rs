use glyphmatch_core::{OcrError, PageResult, RawImage, Result};
use rayon::prelude::*;

use crate::pipeline::OcrPipeline;

/// Runs independent images through one shared pipeline in parallel.
///
/// Each image is still recognized synchronously; parallelism is across
/// images only. Results come back in input order.
pub struct PageScheduler {
    pool: Option<rayon::ThreadPool>,
}

impl PageScheduler {
    /// `workers == 0` uses the global rayon pool.
    pub fn new(workers: usize) -> Result<Self> {
        let pool = if workers == 0 {
            None
        } else {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(workers)
                .thread_name(|i| format!("glyphmatch-page-{i}"))
                .build()
                .map_err(|e| OcrError::InvalidInput(format!("worker pool: {e}")))?;
            Some(pool)
        };
        Ok(Self { pool })
    }

    pub fn workers(&self) -> usize {
        self.pool
            .as_ref()
            .map_or_else(rayon::current_num_threads, |p| p.current_num_threads())
    }

    /// Recognize every image. A failing image does not stop the others.
    pub fn process_batch(
        &self,
        pipeline: &OcrPipeline,
        images: &[RawImage],
    ) -> Vec<Result<PageResult>> {
        let run = || {
            images
                .par_iter()
                .enumerate()
                .map(|(index, image)| -> Result<PageResult> {
                    let (mut page, timing) = pipeline.recognize_detailed(image)?;
                    page.page_index = index as u32;
                    tracing::debug!(page = index, total_ms = timing.total_ms, "page done");
                    Ok(page)
                })
                .collect::<Vec<_>>()
        };

        let results = match &self.pool {
            Some(pool) => pool.install(run),
            None => run(),
        };

        tracing::info!(
            pages = images.len(),
            failed = results.iter().filter(|r| r.is_err()).count(),
            workers = self.workers(),
            "batch complete"
        );
        results
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use glyphmatch_core::PixelGrid;
    use glyphmatch_recognize::TemplateLibrary;

    use super::*;
    use crate::PipelineConfig;

    fn pipeline() -> OcrPipeline {
        let dot = PixelGrid::from_ascii("###\n###\n###");
        let library = TemplateLibrary::from_glyphs(8, 8, vec![('x', "test", dot)]).unwrap();
        OcrPipeline::new(Arc::new(library), None, PipelineConfig::default()).unwrap()
    }

    fn blank(width: u32) -> RawImage {
        RawImage {
            data: vec![255; width as usize * 4],
            width,
            height: 4,
            channels: 1,
        }
    }

    #[test]
    fn results_keep_input_order() {
        let scheduler = PageScheduler::new(2).unwrap();
        assert_eq!(scheduler.workers(), 2);
        let images: Vec<RawImage> = (1..=6).map(blank).collect();
        let results = scheduler.process_batch(&pipeline(), &images);
        assert_eq!(results.len(), 6);
        for (i, r) in results.iter().enumerate() {
            let page = r.as_ref().unwrap();
            assert_eq!(page.page_index, i as u32);
            assert!(page.text.is_empty());
        }
    }

    #[test]
    fn failures_are_per_image() {
        let scheduler = PageScheduler::new(0).unwrap();
        let broken = RawImage {
            data: vec![0; 2],
            width: 4,
            height: 4,
            channels: 3,
        };
        let results = scheduler.process_batch(&pipeline(), &[blank(3), broken, blank(5)]);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(OcrError::InvalidInput(_))));
        assert!(results[2].is_ok());
    }
}
