//! parcelgis CLI - small-parcel elimination for cadastral layers

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use parcelgis_algorithms::elimination::{
    eliminate_small_polygons, BarrierSet, EliminationOutput, EliminationParams,
};
use parcelgis_algorithms::provider::{PlanarConfig, PlanarProvider};
use parcelgis_algorithms::vector::{area_hectares, line_length};
use parcelgis_core::io::{read_layer, write_layer_to_writer};
use parcelgis_core::{FeatureCollection, GeometryKind};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "parcelgis")]
#[command(author, version, about = "Small-parcel elimination under barrier constraints", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a GeoJSON layer
    Info {
        /// Input layer
        input: PathBuf,
    },
    /// Merge undersized parcels into their largest neighbor
    Eliminate {
        /// Ground polygons to subdivide
        #[arg(short, long)]
        grounds: PathBuf,
        /// Quarter boundary lines
        #[arg(short, long)]
        quarters: PathBuf,
        /// River center lines or water-area polygons
        #[arg(short, long)]
        rivers: PathBuf,
        /// Area threshold in hectares; parcels at or below it are merged
        #[arg(short, long)]
        threshold: f64,
        /// Output layer
        #[arg(short, long)]
        output: PathBuf,
        /// Upper bound on merge passes
        #[arg(long, default_value = "100")]
        max_passes: usize,
        /// Snapping distance in map units
        #[arg(long, default_value = "1e-6")]
        snap_tolerance: f64,
        /// Metres per map unit (1.0 for metre-based projections)
        #[arg(long, default_value = "1.0")]
        units_to_metres: f64,
    },
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set up logging")
}

fn spinner(msg: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    Ok(pb)
}

fn read(path: &Path, what: &str) -> Result<FeatureCollection> {
    let pb = spinner(&format!("Reading {}...", what))?;
    let layer = read_layer(path).with_context(|| format!("Failed to read {} layer {}", what, path.display()))?;
    pb.finish_and_clear();
    info!("{}: {} features ({})", what, layer.len(), layer.geometry_kind());
    Ok(layer)
}

/// Write `layer` next to `path` and move it into place only once complete
fn write_atomically(layer: &FeatureCollection, path: &Path) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temporary file in {}", dir.display()))?;
    write_layer_to_writer(&mut tmp, layer).context("Failed to write output layer")?;
    tmp.flush().context("Failed to flush output layer")?;
    tmp.persist(path)
        .with_context(|| format!("Failed to move output into {}", path.display()))?;
    Ok(())
}

fn done(name: &str, path: &Path, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

fn summarize(output: &EliminationOutput) {
    let report = &output.report;
    println!("Parcels: {} ({:.4} ha)", output.parcels.len(), output.total_area());
    println!("  After split: {}", report.split_polygons);
    println!("  Passes: {}", report.passes.len());
    println!("  Merges: {}", report.merges);
    if report.ghosts_removed > 0 {
        println!("  Removed outside grounds: {}", report.ghosts_removed);
    }
    if !report.converged {
        println!("  Stopped at the pass limit");
    }
    if !report.warnings.is_empty() {
        println!("\nWarnings:");
        for w in &report.warnings {
            println!("  {}", w);
        }
    }
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        // ── Info ─────────────────────────────────────────────────────
        Commands::Info { input } => {
            let layer = read(&input, "layer")?;
            let kind = layer.geometry_kind();

            println!("File: {}", input.display());
            println!("Features: {}", layer.len());
            println!("Geometry: {}", kind);
            match kind {
                GeometryKind::Polygon => {
                    let polygons = layer.polygons("input")?;
                    let total: f64 = polygons.iter().map(|p| area_hectares(p, 1.0)).sum();
                    println!("Polygons: {}", polygons.len());
                    println!("Area: {:.4} ha (metre units)", total);
                }
                GeometryKind::Line => {
                    let lines = layer.lines("input")?;
                    println!("Lines: {}", lines.0.len());
                    println!("Length: {:.2}", line_length(&lines));
                }
                _ => {}
            }
        }

        // ── Eliminate ────────────────────────────────────────────────
        Commands::Eliminate {
            grounds,
            quarters,
            rivers,
            threshold,
            output,
            max_passes,
            snap_tolerance,
            units_to_metres,
        } => {
            let provider = PlanarProvider::new(PlanarConfig {
                snap_tolerance,
                square_metres_per_unit: units_to_metres * units_to_metres,
            })
            .context("Invalid geometry settings")?;
            let params = EliminationParams {
                threshold_hectares: threshold,
                max_passes,
            };
            params.validate().context("Invalid elimination parameters")?;

            let ground_polygons = read(&grounds, "grounds")?
                .polygons("grounds")
                .context("Grounds must be a polygon layer")?;
            let barriers = BarrierSet::from_layers(&read(&quarters, "quarters")?, &read(&rivers, "rivers")?)
                .context("Invalid barrier layers")?;

            let pb = spinner("Eliminating small parcels...")?;
            let start = Instant::now();
            let result = eliminate_small_polygons(&provider, &ground_polygons, &barriers, &params);
            pb.finish_and_clear();
            let result = result.context("Elimination failed")?;
            let elapsed = start.elapsed();

            if !result.report.converged {
                warn!("result is best effort: pass limit reached");
            }
            write_atomically(&result.to_features(), &output)?;
            summarize(&result);
            done("Parcels", &output, elapsed);
        }
    }

    Ok(())
}
