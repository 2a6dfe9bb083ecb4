use std::path::Path;

use glyphmatch_core::{OcrError, Result};
use glyphmatch_preprocess::morphology::DEFAULT_KERNEL_RATIO;
use glyphmatch_preprocess::PreprocessConfig;
use glyphmatch_recognize::AssemblerConfig;
use serde::{Deserialize, Serialize};

/// Runtime configuration for the OCR pipeline.
///
/// Serialized in camelCase; missing fields take their defaults, so a config
/// file only needs the options it changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineConfig {
    /// Split wide, poorly matched artifacts at column-histogram valleys.
    pub attempt_character_splitting: bool,
    /// Run dictionary correction when a dictionary is present.
    pub apply_dictionary_correction: bool,
    /// Restrict matching to these characters. Empty = unrestricted.
    pub supported_characters: String,
    /// Dilation kernel width as a fraction of the image width.
    pub dilation_kernel_ratio: f32,
    pub contrast: f32,
    /// Pre-score each band's artifacts on the rayon pool.
    pub parallel_scoring: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            attempt_character_splitting: true,
            apply_dictionary_correction: true,
            supported_characters: String::new(),
            dilation_kernel_ratio: DEFAULT_KERNEL_RATIO,
            contrast: 1.0,
            parallel_scoring: false,
        }
    }
}

impl PipelineConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| OcrError::InvalidInput(format!("config: {e}")))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&text)
    }

    pub fn preprocess(&self) -> PreprocessConfig {
        PreprocessConfig {
            contrast: self.contrast,
            dilation_kernel_ratio: self.dilation_kernel_ratio,
        }
    }

    pub fn assembler(&self) -> AssemblerConfig {
        AssemblerConfig {
            attempt_character_splitting: self.attempt_character_splitting,
            supported_characters: self.supported_characters.clone(),
            parallel_scoring: self.parallel_scoring,
            ..AssemblerConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = PipelineConfig::default();
        assert!(c.attempt_character_splitting);
        assert!(c.apply_dictionary_correction);
        assert!(c.supported_characters.is_empty());
        assert_eq!(c.dilation_kernel_ratio, 0.02);
        assert_eq!(c.contrast, 1.0);
        assert!(!c.parallel_scoring);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let c = PipelineConfig::from_json(
            r#"{ "attemptCharacterSplitting": false, "supportedCharacters": "0123456789" }"#,
        )
        .unwrap();
        assert!(!c.attempt_character_splitting);
        assert_eq!(c.supported_characters, "0123456789");
        assert!(c.apply_dictionary_correction);
        assert_eq!(c.assembler().supported_characters, "0123456789");
        assert_eq!(c.preprocess().dilation_kernel_ratio, 0.02);
    }

    #[test]
    fn round_trips_through_json() {
        let c = PipelineConfig {
            parallel_scoring: true,
            contrast: 1.5,
            ..Default::default()
        };
        let json = serde_json::to_string(&c).unwrap();
        assert!(json.contains("\"parallelScoring\":true"));
        let back = PipelineConfig::from_json(&json).unwrap();
        assert!(back.parallel_scoring);
        assert_eq!(back.contrast, 1.5);
    }

    #[test]
    fn bad_json_is_invalid_input() {
        let err = PipelineConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, OcrError::InvalidInput(_)));
    }
}
