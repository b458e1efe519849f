//! cellsplit: split touching cells in a binary microscopy image.
//!
//! Runs the watershed separation once with the chosen parameters, writes
//! the diagnostic figure and the separated mask, and lists every seed and
//! every region kept as a cell. It then sweeps a list of `min_distance`
//! values and prints the region count for each.
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin cellsplit -- [OPTIONS] [IMAGE]
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use cellsplit_pipeline::diagnostics::{Clock, PipelineDiagnostics};
use cellsplit_pipeline::{RegionFilter, RegionStats, Seed, SegmentConfig, StagedResult, Threshold};
use clap::{Parser, ValueEnum};

/// Watershed separation of touching cell blobs.
///
/// Binarizes the input, seeds one basin per distance-transform peak and
/// erases the boundaries between basins.
#[derive(Parser)]
#[command(name = "cellsplit", version)]
struct Cli {
    /// Path to the input image (BMP, PNG, JPEG, WebP).
    #[arg(default_value = "stage_0.bmp")]
    image_path: PathBuf,

    /// Minimum separation between two seeds, in pixels.
    #[arg(long, default_value_t = SegmentConfig::DEFAULT_MIN_DISTANCE, value_parser = clap::builder::RangedU64ValueParser::<u32>::new().range(1..))]
    min_distance: u32,

    /// How the binarization level is chosen.
    #[arg(long, value_enum, default_value_t = ThresholdMode::Fixed)]
    threshold: ThresholdMode,

    /// Binarization level for `--threshold fixed` (foreground is strictly above).
    #[arg(long, default_value_t = SegmentConfig::DEFAULT_THRESHOLD_LEVEL)]
    threshold_level: u8,

    /// Leave a one-pixel unassigned line where basins meet while flooding.
    #[arg(long)]
    watershed_line: bool,

    /// Do not report regions smaller than this many pixels as cells.
    #[arg(long)]
    min_area: Option<u64>,

    /// Do not report regions larger than this many pixels as cells.
    #[arg(long)]
    max_area: Option<u64>,

    /// Do not report regions touching the image border as cells.
    #[arg(long)]
    exclude_border: bool,

    /// Skip writing the figure, result, and overlay images.
    #[arg(long)]
    no_outputs: bool,

    /// Where to write the six-panel diagnostic figure.
    #[arg(long, default_value = "watershed_debug.png")]
    debug_image: PathBuf,

    /// Where to write the separated 8-bit mask.
    #[arg(long, default_value = "watershed_result.png")]
    result_image: PathBuf,

    /// Also write the grayscale input with a red cross on every seed.
    #[arg(long)]
    overlay_image: Option<PathBuf>,

    /// `min_distance` values to try after the main run.
    #[arg(long, value_delimiter = ',', default_values_t = [4_u32, 5, 6, 7, 8], value_parser = clap::builder::RangedU64ValueParser::<u32>::new().range(1..))]
    sweep: Vec<u32>,

    /// Skip the `min_distance` sweep.
    #[arg(long)]
    no_sweep: bool,

    /// Output diagnostics as JSON instead of a human-readable report.
    #[arg(long)]
    json: bool,

    /// Full segmentation config as a JSON string.
    ///
    /// When provided, the individual parameter flags are ignored. Missing
    /// fields take their default values.
    #[arg(long)]
    config_json: Option<String>,
}

/// Threshold selection.
#[derive(Clone, Copy, ValueEnum)]
enum ThresholdMode {
    /// Use `--threshold-level`.
    Fixed,
    /// Pick the level automatically with Otsu's method.
    Otsu,
}

/// Build a [`SegmentConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and the
/// individual parameter flags are ignored.
fn config_from_cli(cli: &Cli) -> Result<SegmentConfig, String> {
    let config = if let Some(ref json) = cli.config_json {
        serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"))?
    } else {
        SegmentConfig {
            min_distance: cli.min_distance,
            threshold: match cli.threshold {
                ThresholdMode::Fixed => Threshold::Fixed(cli.threshold_level),
                ThresholdMode::Otsu => Threshold::Otsu,
            },
            watershed_line: cli.watershed_line,
            cell_filter: RegionFilter {
                min_area: cli.min_area,
                max_area: cli.max_area,
                exclude_border: cli.exclude_border,
            },
        }
    };
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn Error>> {
    let config = config_from_cli(cli)?;

    let image_bytes = std::fs::read(&cli.image_path)
        .map_err(|e| format!("Error reading {}: {e}", cli.image_path.display()))?;

    eprintln!(
        "Image: {} ({} bytes)",
        cli.image_path.display(),
        image_bytes.len(),
    );
    eprintln!("Config: {config:#?}");
    eprintln!();

    let (staged, diagnostics) =
        cellsplit_pipeline::diagnostics::process_with_diagnostics(&image_bytes, &config, &StdClock)?;
    print_diagnostics(&diagnostics, cli.json)?;

    if !cli.no_outputs {
        write_outputs(cli, &staged)?;
    }

    println!("Found {} centers", staged.segmentation.marker_count);
    print_seeds(&staged.segmentation.seeds);
    println!("Regions found: {}", staged.segmentation.region_count);
    print_cells(&staged.segmentation.cells);

    if !cli.no_sweep {
        for &min_distance in &cli.sweep {
            let sweep_config = SegmentConfig {
                min_distance,
                ..config
            };
            println!();
            println!("Testing min_distance={min_distance}");
            let result = cellsplit_pipeline::process(&image_bytes, &sweep_config)?;
            println!("Regions found: {}", result.segmentation.region_count);
        }
    }

    Ok(())
}

fn print_diagnostics(diagnostics: &PipelineDiagnostics, json: bool) -> Result<(), Box<dyn Error>> {
    if json {
        let json = serde_json::to_string_pretty(diagnostics)
            .map_err(|e| format!("Error serializing diagnostics: {e}"))?;
        println!("{json}");
    } else {
        println!("{}", diagnostics.report());
    }
    println!();
    Ok(())
}

fn print_seeds(seeds: &[Seed]) {
    for seed in seeds {
        println!("{}", format_seed(seed));
    }
}

fn print_cells(cells: &[RegionStats]) {
    println!("Cells kept: {}", cells.len());
    for cell in cells {
        println!("{}", format_cell(cell));
    }
}

fn format_seed(seed: &Seed) -> String {
    format!("  center at ({}, {})", seed.x, seed.y)
}

fn format_cell(cell: &RegionStats) -> String {
    format!(
        "  cell {}: centroid ({:.1}, {:.1}), area {} px",
        cell.label, cell.centroid_x, cell.centroid_y, cell.area,
    )
}

/// Render and write the figure, the result mask, and the optional overlay.
fn write_outputs(cli: &Cli, staged: &StagedResult) -> Result<(), Box<dyn Error>> {
    let figure = cellsplit_export::render_panels(staged);
    write_file(&cli.debug_image, &cellsplit_export::encode_png(&figure)?)?;
    tracing::info!(path = %cli.debug_image.display(), "diagnostic figure written");

    let result = cellsplit_export::result_image(&staged.segmentation.result);
    write_file(&cli.result_image, &cellsplit_export::encode_png(&result)?)?;
    tracing::info!(path = %cli.result_image.display(), "result image written");

    if let Some(ref path) = cli.overlay_image {
        let overlay = cellsplit_export::draw_seed_crosses(
            &staged.grayscale,
            &staged.segmentation.seeds,
            cellsplit_export::DEFAULT_CROSS_SIZE,
        );
        write_file(path, &cellsplit_export::encode_png(&overlay)?)?;
        tracing::info!(path = %path.display(), "seed overlay written");
    }
    Ok(())
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), String> {
    std::fs::write(path, bytes).map_err(|e| format!("Error writing {}: {e}", path.display()))?;
    eprintln!("Wrote {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}
