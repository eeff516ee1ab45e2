//! patchwork: segment an image into flat-colored regions.
//!
//! Reads an image file, runs the edge filter, clustering and region
//! coloring pipeline, and writes the painted result as a PNG.
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin patchwork -- [OPTIONS] <IMAGE_PATH>
//! ```
//!
//! Logging goes to stderr and is controlled by `RUST_LOG`
//! (default `info`).

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use patchwork_pipeline::diagnostics::process_with_diagnostics;
use patchwork_pipeline::{RandomColors, SegmentConfig, codec};
use tracing_subscriber::EnvFilter;

/// Segment a raster image into regions and recolor each with a flat color.
#[derive(Parser)]
#[command(name = "patchwork", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    image_path: PathBuf,

    /// Path of the PNG to write.
    #[arg(short, long, default_value = "output.png")]
    output: PathBuf,

    /// RGB distance below which neighboring pixels are clustered.
    #[arg(long, default_value_t = SegmentConfig::DEFAULT_MERGE_THRESHOLD)]
    merge_threshold: f64,

    /// Red value below which two pixels are never clustered.
    #[arg(long, default_value_t = SegmentConfig::DEFAULT_DARK_GUARD)]
    dark_guard: u8,

    /// Red value below which a pixel seeds a region fill.
    #[arg(long, default_value_t = SegmentConfig::DEFAULT_FILL_THRESHOLD)]
    fill_threshold: u8,

    /// Seed for region colors. Omit for different colors every run.
    #[arg(long)]
    seed: Option<u64>,

    /// Full pipeline config as a JSON string.
    ///
    /// When provided, all other pipeline parameter flags are ignored.
    /// Missing fields take their default values.
    #[arg(long)]
    config_json: Option<String>,

    /// Print a per-stage diagnostics report to stdout.
    #[arg(long)]
    diagnostics: bool,

    /// Print diagnostics as JSON instead of the human-readable report.
    #[arg(long, requires = "diagnostics")]
    json: bool,
}

/// Build a [`SegmentConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// individual parameter flags are ignored.
fn config_from_cli(cli: &Cli) -> Result<SegmentConfig, String> {
    let config = if let Some(ref json) = cli.config_json {
        serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"))?
    } else {
        SegmentConfig {
            merge_threshold: cli.merge_threshold,
            dark_guard: cli.dark_guard,
            fill_threshold: cli.fill_threshold,
            seed: cli.seed,
        }
    };
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let image_bytes = match std::fs::read(&cli.image_path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Error reading {}: {e}", cli.image_path.display());
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(
        path = %cli.image_path.display(),
        bytes = image_bytes.len(),
        ?config,
        "processing image"
    );

    let mut colors = RandomColors::from_config(&config);
    let (result, diagnostics) = match process_with_diagnostics(&image_bytes, &config, &mut colors)
    {
        Ok(output) => output,
        Err(e) => {
            eprintln!("Pipeline error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if cli.diagnostics {
        if cli.json {
            match serde_json::to_string_pretty(&diagnostics) {
                Ok(json) => println!("{json}"),
                Err(e) => {
                    eprintln!("Error serializing diagnostics: {e}");
                    return ExitCode::FAILURE;
                }
            }
        } else {
            println!("{}", diagnostics.report());
        }
    }

    let png = match codec::encode_png(&result.image) {
        Ok(png) => png,
        Err(e) => {
            eprintln!("Error encoding output: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = std::fs::write(&cli.output, &png) {
        eprintln!("Error writing {}: {e}", cli.output.display());
        return ExitCode::FAILURE;
    }

    tracing::info!(
        path = %cli.output.display(),
        bytes = png.len(),
        regions = result.regions_painted,
        components = result.partition.component_count(),
        "output written"
    );
    ExitCode::SUCCESS
}
