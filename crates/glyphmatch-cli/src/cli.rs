use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};

use glyphmatch_core::{Lexicon, PixelGrid};
use glyphmatch_decode::ImageDecoder;
use glyphmatch_pipeline::{OcrPipeline, PageScheduler, PipelineConfig};
use glyphmatch_preprocess::to_black_on_white;
use glyphmatch_recognize::{Dictionary, TemplateLibrary};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "tif", "tiff", "bmp"];

#[derive(Parser)]
#[command(name = "glyphmatch", about = "Template-matching OCR for clean digital images")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to a JSON pipeline config. Flags override it.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins if set.
    #[arg(long, default_value = "info", global = true)]
    pub log_level: String,

    #[command(flatten)]
    pub overrides: Overrides,
}

/// Config overrides shared by all subcommands.
#[derive(Args, Debug, Default)]
pub struct Overrides {
    /// Do not split wide, poorly matched artifacts.
    #[arg(long, global = true)]
    pub no_split: bool,
    /// Skip dictionary correction even when a dictionary is given.
    #[arg(long, global = true)]
    pub no_dictionary_correction: bool,
    /// Only match these characters.
    #[arg(long, global = true)]
    pub supported_chars: Option<String>,
    /// Score the artifacts of each line in parallel.
    #[arg(long, global = true)]
    pub parallel_scoring: bool,
    #[arg(long, global = true)]
    pub dilation_ratio: Option<f32>,
    #[arg(long, global = true)]
    pub contrast: Option<f32>,
}

impl Overrides {
    pub fn apply(&self, config: &mut PipelineConfig) {
        if self.no_split {
            config.attempt_character_splitting = false;
        }
        if self.no_dictionary_correction {
            config.apply_dictionary_correction = false;
        }
        if let Some(chars) = &self.supported_chars {
            config.supported_characters = chars.clone();
        }
        if self.parallel_scoring {
            config.parallel_scoring = true;
        }
        if let Some(ratio) = self.dilation_ratio {
            config.dilation_kernel_ratio = ratio;
        }
        if let Some(contrast) = self.contrast {
            config.contrast = contrast;
        }
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Recognize a single image and print the text.
    Process {
        #[arg(required = true)]
        input: PathBuf,
        /// Template library JSON.
        #[arg(long)]
        templates: PathBuf,
        /// Word list, one word per line.
        #[arg(long)]
        dictionary: Option<PathBuf>,
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },
    /// Recognize every image in a directory.
    Batch {
        #[arg(required = true)]
        input_dir: PathBuf,
        /// Output directory, one result file per image.
        #[arg(required = true)]
        output_dir: PathBuf,
        #[arg(long)]
        templates: PathBuf,
        #[arg(long)]
        dictionary: Option<PathBuf>,
        #[arg(long, default_value = "json")]
        format: OutputFormat,
        /// Worker threads; 0 uses one per core.
        #[arg(long, default_value = "0")]
        workers: usize,
    },
    /// Build a template library from one image per character.
    ///
    /// The file stem names the character (`a.png`); `_`-suffixed stems are
    /// extra variants (`a_2.png`). Characters that cannot appear in file
    /// names are written as `U+002F`.
    BuildTemplates {
        #[arg(required = true)]
        glyph_dir: PathBuf,
        #[arg(long)]
        width: usize,
        #[arg(long)]
        height: usize,
        /// Font name recorded on every variant.
        #[arg(long, default_value = "default")]
        font: String,
        #[arg(long)]
        output: PathBuf,
    },
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Text => "txt",
            OutputFormat::Json => "json",
        }
    }
}

pub fn build_pipeline(
    templates: &Path,
    dictionary: Option<&Path>,
    config: PipelineConfig,
) -> anyhow::Result<OcrPipeline> {
    let library = TemplateLibrary::load(templates)
        .with_context(|| format!("loading templates from {}", templates.display()))?;
    let dictionary = match dictionary {
        Some(path) => {
            let dict = Dictionary::load(path)
                .with_context(|| format!("loading dictionary from {}", path.display()))?;
            Some(Arc::new(dict) as Arc<dyn Lexicon>)
        }
        None => None,
    };
    Ok(OcrPipeline::new(Arc::new(library), dictionary, config)?)
}

/// Recognize one file and print it.
pub fn process_file(
    pipeline: &OcrPipeline,
    path: &Path,
    format: &OutputFormat,
) -> anyhow::Result<()> {
    let image = ImageDecoder::new()
        .decode_file(path)
        .with_context(|| format!("decoding {}", path.display()))?;
    let (page, timing) = pipeline.recognize_detailed(&image)?;

    match format {
        OutputFormat::Text => {
            println!("{}", page.text);
            eprintln!(
                "\n[{:.1}ms total | preproc:{:.1}ms detect:{:.1}ms recog:{:.1}ms correct:{:.1}ms]",
                timing.total_ms,
                timing.preprocess_ms,
                timing.detect_ms,
                timing.recognize_ms,
                timing.correct_ms
            );
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "page": page,
                "timing": timing,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(())
}

/// Recognize every image in `input_dir`, writing `<stem>.<ext>` results to
/// `output_dir`. Files that fail are logged and skipped.
pub fn process_dir(
    pipeline: &OcrPipeline,
    input_dir: &Path,
    output_dir: &Path,
    format: &OutputFormat,
    workers: usize,
) -> anyhow::Result<()> {
    std::fs::create_dir_all(output_dir)?;
    let decoder = ImageDecoder::new();

    let mut paths = Vec::new();
    let mut images = Vec::new();
    for path in image_files(input_dir)? {
        match decoder.decode_file(&path) {
            Ok(image) => {
                paths.push(path);
                images.push(image);
            }
            Err(e) => tracing::error!(file = %path.display(), error = %e, "decode failed"),
        }
    }

    let scheduler = PageScheduler::new(workers)?;
    let results = scheduler.process_batch(pipeline, &images);

    let mut written = 0;
    for (path, result) in paths.iter().zip(results) {
        let page = match result {
            Ok(page) => page,
            Err(e) => {
                tracing::error!(file = %path.display(), error = %e, "recognition failed");
                continue;
            }
        };
        let stem = path.file_stem().unwrap_or_default();
        let out = output_dir.join(stem).with_extension(format.extension());
        let body = match format {
            OutputFormat::Text => page.text,
            OutputFormat::Json => serde_json::to_string_pretty(&page)?,
        };
        std::fs::write(&out, body).with_context(|| format!("writing {}", out.display()))?;
        written += 1;
    }

    tracing::info!(files = paths.len(), written, "batch finished");
    Ok(())
}

/// Binarize one image per character and build a library from them.
pub fn build_templates(
    glyph_dir: &Path,
    width: usize,
    height: usize,
    font: &str,
) -> anyhow::Result<TemplateLibrary> {
    let decoder = ImageDecoder::new();
    let mut glyphs: Vec<(char, String, PixelGrid)> = Vec::new();

    for path in image_files(glyph_dir)? {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        let Some(character) = parse_glyph_name(stem) else {
            tracing::warn!(file = %path.display(), "file name does not name a character, skipped");
            continue;
        };
        let image = decoder
            .decode_file(&path)
            .with_context(|| format!("decoding {}", path.display()))?;
        let rgba = image
            .to_rgba()
            .with_context(|| format!("unsupported pixel layout in {}", path.display()))?;
        let grid = to_black_on_white(&rgba, image.width as usize, image.height as usize, 1.0)?;
        tracing::debug!(%character, file = %path.display(), ink = grid.active_count(), "glyph");
        glyphs.push((character, font.to_string(), grid));
    }

    if glyphs.is_empty() {
        anyhow::bail!("no glyph images found in {}", glyph_dir.display());
    }
    Ok(TemplateLibrary::from_glyphs(width, height, glyphs)?)
}

/// Character named by a glyph file stem: a single character or `U+XXXX`,
/// optionally followed by `_<variant>`.
pub fn parse_glyph_name(stem: &str) -> Option<char> {
    let base = if stem.chars().count() == 1 {
        stem
    } else {
        stem.rsplit_once('_').map_or(stem, |(base, _)| base)
    };
    let mut chars = base.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => base
            .strip_prefix("U+")
            .and_then(|hex| u32::from_str_radix(hex, 16).ok())
            .and_then(char::from_u32),
    }
}

/// Image files directly inside `dir`, sorted by name.
fn image_files(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("reading {}", dir.display()))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && has_image_extension(p))
        .collect();
    files.sort();
    Ok(files)
}

fn has_image_extension(path: &Path) -> bool {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str())
}
