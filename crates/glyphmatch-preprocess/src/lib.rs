pub mod binarize;
pub mod morphology;

pub use binarize::to_black_on_white;
pub use morphology::{compute_kernel_size, dilate, DEFAULT_KERNEL_RATIO};

use glyphmatch_core::{PixelGrid, Result};
use serde::{Deserialize, Serialize};

/// Binarize → dilate.
///
/// The binary grid is what glyphs are cut from; the dilated grid only serves
/// region detection, where it fuses the letters of a line into one blob.
pub struct PreprocessPipeline {
    config: PreprocessConfig,
}

/// Configuration for the preprocessing pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreprocessConfig {
    /// Contrast factor around mid-gray. 1.0 = unchanged.
    pub contrast: f32,
    /// Dilation kernel size as a fraction of the image width.
    pub dilation_kernel_ratio: f32,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            contrast: 1.0,
            dilation_kernel_ratio: DEFAULT_KERNEL_RATIO,
        }
    }
}

/// Output of preprocessing.
#[derive(Debug, Clone)]
pub struct Preprocessed {
    pub binary: PixelGrid,
    pub dilated: PixelGrid,
    pub kernel_size: usize,
}

impl PreprocessPipeline {
    pub fn new(config: PreprocessConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PreprocessConfig {
        &self.config
    }

    /// Run the full preprocessing chain on an RGBA buffer.
    pub fn execute(&self, rgba: &[u8], width: usize, height: usize) -> Result<Preprocessed> {
        let binary = to_black_on_white(rgba, width, height, self.config.contrast)?;
        Ok(self.execute_binary(binary))
    }

    /// Dilate an already binarized grid.
    pub fn execute_binary(&self, binary: PixelGrid) -> Preprocessed {
        let ratio = self.config.dilation_kernel_ratio;
        let kernel_size = compute_kernel_size(binary.cols(), binary.rows(), ratio);
        let dilated = dilate(&binary, kernel_size);

        tracing::debug!(
            width = binary.cols(),
            height = binary.rows(),
            kernel_size,
            ink = binary.active_count(),
            "preprocessed"
        );

        Preprocessed {
            binary,
            dilated,
            kernel_size,
        }
    }
}

impl Default for PreprocessPipeline {
    fn default() -> Self {
        Self::new(PreprocessConfig::default())
    }
}
