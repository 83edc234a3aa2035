#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for catchment zone computation.
//!
//! Uses `indicatif-log-bridge` (via [`chalandise_cli_utils::init_logger`])
//! so log lines and progress bars share the terminal cleanly.

use std::io::IsTerminal as _;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use chalandise_cli::config::ZonesConfig;
use chalandise_cli::export;
use chalandise_cli_utils::IndicatifProgress;
use chalandise_spatial::{CellIndex, great_circle_distance_km};
use chalandise_zones::{LogProgress, ProgressCallback as _, ZonePipeline, ZoneResolver};
use clap::{Parser, Subcommand};

/// Zone groups between two progress log lines when stderr is not a terminal.
const LOG_PROGRESS_EVERY: u64 = 500;

#[derive(Parser)]
#[command(name = "chalandise", about = "Catchment zone computation for service points")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute catchment zones and coverage for a points file
    Zones {
        /// `GeoJSON` `FeatureCollection` of statistical cell polygons (WGS84)
        #[arg(long)]
        cells: PathBuf,
        /// Demographics CSV keyed by the cell code
        #[arg(long)]
        demographics: PathBuf,
        /// Service points CSV
        #[arg(long)]
        points: PathBuf,
        /// TOML configuration (column names, radius per environment class).
        /// Built-in defaults are used when omitted.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Directory the result files are written to
        #[arg(long, default_value = "output")]
        output_dir: PathBuf,
    },
    /// Print the great-circle distance in km between two coordinates
    Distance {
        /// Latitude of the first point, in degrees
        #[arg(allow_hyphen_values = true)]
        lat1: f64,
        /// Longitude of the first point, in degrees
        #[arg(allow_hyphen_values = true)]
        lon1: f64,
        /// Latitude of the second point, in degrees
        #[arg(allow_hyphen_values = true)]
        lat2: f64,
        /// Longitude of the second point, in degrees
        #[arg(allow_hyphen_values = true)]
        lon2: f64,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = chalandise_cli_utils::init_logger();
    let cli = Cli::parse();

    match cli.command {
        Commands::Zones {
            cells,
            demographics,
            points,
            config,
            output_dir,
        } => {
            let start = Instant::now();
            let config = ZonesConfig::load(config.as_deref())?;

            let steps = IndicatifProgress::steps_bar(&multi, "Zones", 4);

            steps.set_message("Loading cells".to_string());
            let cell_set =
                chalandise_geography::load_cells(&cells, &demographics, &config.cells.code_column)?;
            let index = Arc::new(CellIndex::build(cell_set)?);
            steps.inc(1);

            steps.set_message("Loading points".to_string());
            let points = chalandise_geography::load_points(&points, &config.points)?;
            steps.inc(1);

            steps.set_message("Computing zones".to_string());
            let resolver = ZoneResolver::new(Arc::clone(&index));
            let progress = if std::io::stderr().is_terminal() {
                IndicatifProgress::zones_bar(&multi, "Resolving zones")
            } else {
                LogProgress::new(LOG_PROGRESS_EVERY)
            };
            let result = ZonePipeline::new(&resolver)
                .with_progress(progress)
                .run(&points, &config.environments);
            steps.inc(1);

            steps.set_message("Writing results".to_string());
            export::write_all(&output_dir, &result, &index)?;
            steps.inc(1);
            steps.finish("Zones done".to_string());

            if !result.failures.is_empty() {
                log::warn!(
                    "{} groups failed, see {}",
                    result.failures.len(),
                    output_dir.join(export::FAILURES_FILE).display()
                );
            }

            log::info!(
                "{} points, {} covered cells, {} orphans in {:.1}s",
                result.points.len(),
                result.cells.len(),
                result.orphans.len(),
                start.elapsed().as_secs_f64()
            );
        }
        Commands::Distance {
            lat1,
            lon1,
            lat2,
            lon2,
        } => {
            let km = great_circle_distance_km(lat1, lon1, lat2, lon2);
            println!("{km:.2} km");
        }
    }

    Ok(())
}
