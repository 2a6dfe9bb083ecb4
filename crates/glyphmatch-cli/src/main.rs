use clap::Parser;
use tracing_subscriber::EnvFilter;

use glyphmatch_pipeline::PipelineConfig;

mod cli;

use cli::{Cli, Command};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("glyphmatch v{}", env!("CARGO_PKG_VERSION"));

    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };
    cli.overrides.apply(&mut config);

    match cli.command {
        Command::Process {
            input,
            templates,
            dictionary,
            format,
        } => {
            let pipeline = cli::build_pipeline(&templates, dictionary.as_deref(), config)?;
            cli::process_file(&pipeline, &input, &format)?;
        }
        Command::Batch {
            input_dir,
            output_dir,
            templates,
            dictionary,
            format,
            workers,
        } => {
            tracing::info!(
                input = %input_dir.display(),
                output = %output_dir.display(),
                workers,
                "batch processing"
            );
            let pipeline = cli::build_pipeline(&templates, dictionary.as_deref(), config)?;
            cli::process_dir(&pipeline, &input_dir, &output_dir, &format, workers)?;
        }
        Command::BuildTemplates {
            glyph_dir,
            width,
            height,
            font,
            output,
        } => {
            let library = cli::build_templates(&glyph_dir, width, height, &font)?;
            library.save(&output)?;
            tracing::info!(
                characters = library.len(),
                variants = library.variant_count(),
                output = %output.display(),
                "template library written"
            );
        }
    }

    Ok(())
}
