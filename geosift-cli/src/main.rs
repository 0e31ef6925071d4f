//! geosift: find, filter, and organize photos by embedded GPS coordinates.
#![allow(clippy::uninlined_format_args, clippy::too_many_lines)]

mod config;
mod run;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use log::{error, warn};

use geosift_core::{
    ClusterParams, FilterBounds, GeoPoint, Geocoder, GeocodingError, SearchCriteria,
};
use geosift_io::{ExifLocationExtractor, PacedGeocoder};

use config::{
    pick, pick_opt, FileConfig, DEFAULT_BATCH_FILES, DEFAULT_BATCH_SECS, DEFAULT_CHECKPOINT,
};
use run::{Mode, RunError, RunOptions, RunOutput, RunSummary};

/// Default search radius in kilometers.
const DEFAULT_RADIUS_KM: f64 = 0.1;
/// Default clustering merge radius in kilometers.
const DEFAULT_MERGE_RADIUS_KM: f64 = 0.1;

/// Process exit codes, distinct per error kind so scripting callers can
/// tell causes apart.
mod exit_codes {
    pub const INTERRUPTED: u8 = 1;
    pub const GEOCODING_FAILED: u8 = 6;
    pub const FILE_OPERATION_ERROR: u8 = 17;
    pub const GPS_DATA_ERROR: u8 = 18;
    pub const CONFIGURATION_ERROR: u8 = 19;
}

/// Locate and organize photos by embedded GPS coordinates.
#[derive(Parser)]
#[command(name = "geosift")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (default: ./geosift.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find photos within a radius of a location
    Search {
        #[command(flatten)]
        scan: ScanArgs,

        /// Search center as "LAT,LON"
        #[arg(long, value_parser = parse_center, conflicts_with = "address")]
        center: Option<GeoPoint>,

        /// Search center as a free-form address (geocoded)
        #[arg(long)]
        address: Option<String>,

        /// Search radius in kilometers
        #[arg(long)]
        radius_km: Option<f64>,

        #[command(flatten)]
        filters: FilterArgs,

        #[command(flatten)]
        output: OutputArgs,

        #[command(flatten)]
        checkpoint: CheckpointArgs,
    },

    /// Group photos into geographic clusters
    Cluster {
        #[command(flatten)]
        scan: ScanArgs,

        /// Merge radius in kilometers
        #[arg(long)]
        merge_radius_km: Option<f64>,

        #[command(flatten)]
        filters: FilterArgs,

        #[command(flatten)]
        output: OutputArgs,

        #[command(flatten)]
        checkpoint: CheckpointArgs,
    },
}

#[derive(Args)]
struct ScanArgs {
    /// Directory to scan for photos
    root: Option<PathBuf>,

    /// Do not descend into subdirectories
    #[arg(long)]
    no_recursive: bool,
}

#[derive(Args)]
struct FilterArgs {
    /// Earliest capture date (YYYY-MM-DD, inclusive)
    #[arg(long)]
    date_from: Option<NaiveDate>,

    /// Latest capture date (YYYY-MM-DD, inclusive)
    #[arg(long)]
    date_to: Option<NaiveDate>,

    /// Maximum GPS accuracy error in meters
    #[arg(long)]
    max_accuracy_m: Option<f64>,
}

#[derive(Args)]
struct OutputArgs {
    /// Copy matches into this directory
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Report matches without copying files
    #[arg(long)]
    find_only: bool,

    /// Write a CSV export
    #[arg(long)]
    csv: bool,

    /// Write a KML export
    #[arg(long)]
    kml: bool,
}

#[derive(Args)]
struct CheckpointArgs {
    /// Checkpoint file path
    #[arg(long)]
    checkpoint: Option<PathBuf>,

    /// Resume from a matching checkpoint
    #[arg(long)]
    resume: bool,
}

fn parse_center(text: &str) -> Result<GeoPoint, String> {
    let (lat, lon) = text
        .split_once(',')
        .ok_or_else(|| "expected LAT,LON".to_string())?;
    let latitude: f64 = lat.trim().parse().map_err(|_| "invalid latitude")?;
    let longitude: f64 = lon.trim().parse().map_err(|_| "invalid longitude")?;
    GeoPoint::new(latitude, longitude).map_err(|err| err.to_string())
}

/// Placeholder geocoder: this build carries no network backend, so address
/// centers fail with a distinct exit status and clusters fall back to
/// coordinate names.
struct OfflineGeocoder;

impl Geocoder for OfflineGeocoder {
    fn resolve_address(&self, query: &str) -> Result<GeoPoint, GeocodingError> {
        Err(GeocodingError::Service(format!(
            "no geocoding backend configured (cannot resolve {query:?})"
        )))
    }

    fn reverse_geocode(&self, _point: GeoPoint) -> Result<String, GeocodingError> {
        Err(GeocodingError::Service(
            "no geocoding backend configured".into(),
        ))
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = Arc::clone(&cancel);
        if let Err(err) = ctrlc::set_handler(move || cancel.store(true, Ordering::SeqCst)) {
            warn!("could not install interrupt handler: {err}");
        }
    }

    match execute(cli, &cancel) {
        Ok(summary) => {
            report(&summary);
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{err}");
            ExitCode::from(exit_code(&err))
        }
    }
}

fn execute(cli: Cli, cancel: &AtomicBool) -> Result<RunSummary, RunError> {
    let file = FileConfig::load(cli.config.as_deref())?;

    let (mode, scan, output, checkpoint) = match cli.command {
        Commands::Search {
            scan,
            center,
            address,
            radius_km,
            filters,
            output,
            checkpoint,
        } => {
            let bounds = merge_filters(&filters, &file);
            let radius = pick(radius_km, file.search.radius_km, DEFAULT_RADIUS_KM);
            let criteria = search_criteria(center, address, radius, bounds, &file)?;
            (Mode::Search(criteria), scan, output, checkpoint)
        }
        Commands::Cluster {
            scan,
            merge_radius_km,
            filters,
            output,
            checkpoint,
        } => {
            let bounds = merge_filters(&filters, &file);
            let merge = pick(
                merge_radius_km,
                file.cluster.merge_radius_km,
                DEFAULT_MERGE_RADIUS_KM,
            );
            let params = ClusterParams::new(merge).with_filters(bounds);
            (Mode::Cluster(params), scan, output, checkpoint)
        }
    };

    let root = pick_opt(scan.root, file.scan.root)
        .ok_or_else(|| RunError::config("no root directory specified"))?;
    let recursive = if scan.no_recursive {
        false
    } else {
        file.scan.recursive.unwrap_or(true)
    };

    let options = RunOptions {
        root,
        recursive,
        output_dir: pick_opt(output.output, file.output.directory),
        find_only: output.find_only || file.output.find_only.unwrap_or(false),
        export_csv: output.csv || file.output.csv.unwrap_or(false),
        export_kml: output.kml || file.output.kml.unwrap_or(false),
        checkpoint: pick(
            checkpoint.checkpoint,
            file.checkpoint.path,
            PathBuf::from(DEFAULT_CHECKPOINT),
        ),
        resume: checkpoint.resume,
        batch_files: file.checkpoint.batch_files.unwrap_or(DEFAULT_BATCH_FILES),
        batch_interval: Duration::from_secs(
            file.checkpoint.batch_secs.unwrap_or(DEFAULT_BATCH_SECS),
        ),
    };

    let extractor = ExifLocationExtractor::new();
    let geocoder = PacedGeocoder::new(OfflineGeocoder);

    run::run(&mode, &options, &extractor, &geocoder, cancel)
}

fn merge_filters(cli: &FilterArgs, file: &FileConfig) -> FilterBounds {
    FilterBounds {
        date_from: pick_opt(cli.date_from, file.filters.date_from),
        date_to: pick_opt(cli.date_to, file.filters.date_to),
        max_accuracy_m: pick_opt(cli.max_accuracy_m, file.filters.max_accuracy_m),
    }
}

fn search_criteria(
    center: Option<GeoPoint>,
    address: Option<String>,
    radius_km: f64,
    bounds: FilterBounds,
    file: &FileConfig,
) -> Result<SearchCriteria, RunError> {
    // CLI coordinates beat a CLI address, which beats the config file.
    let criteria = if let Some(point) = center {
        SearchCriteria::at(point, radius_km)
    } else if let Some(address) = address {
        SearchCriteria::at_address(address, radius_km)
    } else if let (Some(latitude), Some(longitude)) =
        (file.search.latitude, file.search.longitude)
    {
        let point = GeoPoint::new(latitude, longitude)?;
        SearchCriteria::at(point, radius_km)
    } else if let Some(address) = file.search.address.clone() {
        SearchCriteria::at_address(address, radius_km)
    } else {
        return Err(RunError::config(
            "search needs a center: --center, --address, or the [search] config section",
        ));
    };
    Ok(criteria.with_filters(bounds))
}

fn report(summary: &RunSummary) {
    println!(
        "Processed {} of {} discovered files",
        summary.processed, summary.discovered
    );
    match &summary.output {
        RunOutput::Search(hits) => {
            println!("{} matching images", hits.len());
            for hit in hits {
                println!("  {} ({:.2} km)", hit.record.path.display(), hit.distance_km);
            }
        }
        RunOutput::Clusters(clusters) => {
            println!("{} location clusters", clusters.len());
            for cluster in clusters {
                println!("  {}: {} images", cluster.display_name(), cluster.len());
            }
        }
    }
}

fn exit_code(err: &RunError) -> u8 {
    match err {
        RunError::Config(_) => exit_codes::CONFIGURATION_ERROR,
        RunError::Geocoding(_) => exit_codes::GEOCODING_FAILED,
        RunError::Interrupted => exit_codes::INTERRUPTED,
        RunError::Io(io_err) => match io_err {
            geosift_io::Error::Core(geosift_core::Error::GpsData(_)) => {
                exit_codes::GPS_DATA_ERROR
            }
            _ => exit_codes::FILE_OPERATION_ERROR,
        },
    }
}
