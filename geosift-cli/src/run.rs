//! The run orchestrator: scan, filter, route, checkpoint, export.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use thiserror::Error;

use geosift_algorithms::{
    name_clusters, resolve_center, ClusterState, GreedyClusterer, RadiusSearch, SearchAccumulator,
};
use geosift_core::{
    Cluster, ClusterParams, Error as CoreError, FilterBounds, GeoPoint, Geocoder,
    LocationExtractor, SearchCriteria, SearchHit,
};
use geosift_io::{
    copy_clusters, copy_hits, Accumulator, CheckpointManager, CheckpointState, CsvWriter,
    ImageScanner, KmlWriter,
};

/// Errors that end a run, each mapped to a distinct exit status.
#[derive(Error, Debug)]
pub enum RunError {
    /// Invalid or contradictory parameters; nothing was touched.
    #[error("configuration error: {0}")]
    Config(String),

    /// The search center could not be established.
    #[error("geocoding failed: {0}")]
    Geocoding(#[from] geosift_core::GeocodingError),

    /// I/O failure, including fatal checkpoint persist failures.
    #[error(transparent)]
    Io(#[from] geosift_io::Error),

    /// Interrupt signal received; progress was flushed to the checkpoint.
    #[error("interrupted; progress saved to checkpoint")]
    Interrupted,
}

impl RunError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

impl From<CoreError> for RunError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Geocoding(inner) => Self::Geocoding(inner),
            other => Self::Config(other.to_string()),
        }
    }
}

/// What a run computes: an ordered search result or a cluster partition.
#[derive(Debug)]
pub enum RunOutput {
    /// Search hits, ascending by distance.
    Search(Vec<SearchHit>),
    /// Clusters in id order.
    Clusters(Vec<Cluster>),
}

/// Counters reported after a completed run.
#[derive(Debug)]
pub struct RunSummary {
    /// Files discovered by the scan.
    pub discovered: usize,
    /// Files processed by this run (skipped checkpoint entries excluded).
    pub processed: usize,
    /// The computed result.
    pub output: RunOutput,
}

/// The run mode with its parameters.
#[derive(Debug, Clone)]
pub enum Mode {
    /// Radius search around a center.
    Search(SearchCriteria),
    /// Greedy proximity clustering.
    Cluster(ClusterParams),
}

impl Mode {
    fn validate(&self) -> Result<(), CoreError> {
        match self {
            Mode::Search(criteria) => criteria.validate(),
            Mode::Cluster(params) => params.validate(),
        }
    }

    fn fingerprint(&self) -> String {
        match self {
            Mode::Search(criteria) => criteria.fingerprint(),
            Mode::Cluster(params) => params.fingerprint(),
        }
    }

    fn filters(&self) -> &FilterBounds {
        match self {
            Mode::Search(criteria) => &criteria.filters,
            Mode::Cluster(params) => &params.filters,
        }
    }
}

/// Everything a run needs besides the mode.
pub struct RunOptions {
    /// Directory to scan.
    pub root: PathBuf,
    /// Descend into subdirectories.
    pub recursive: bool,
    /// Destination for copied matches and default export location.
    pub output_dir: Option<PathBuf>,
    /// Report matches without copying files.
    pub find_only: bool,
    /// Write a CSV export.
    pub export_csv: bool,
    /// Write a KML export.
    pub export_kml: bool,
    /// Checkpoint file path.
    pub checkpoint: PathBuf,
    /// Resume from a matching checkpoint instead of starting fresh.
    pub resume: bool,
    /// Files per checkpoint batch.
    pub batch_files: usize,
    /// Time per checkpoint batch; whichever limit is hit first flushes.
    pub batch_interval: Duration,
}

enum Engine {
    Search {
        search: RadiusSearch,
        accumulator: SearchAccumulator,
    },
    Cluster {
        clusterer: GreedyClusterer,
        state: ClusterState,
    },
}

impl Engine {
    fn snapshot(&self) -> Accumulator {
        match self {
            Engine::Search { accumulator, .. } => {
                Accumulator::Search(accumulator.hits().to_vec())
            }
            Engine::Cluster { state, .. } => Accumulator::Clusters(state.clusters().to_vec()),
        }
    }
}

/// Runs one scan-to-export pass.
///
/// Single-threaded and sequential: one file is extracted, filtered, and
/// routed at a time, with a checkpoint flush after every batch and on
/// cancellation. The checkpoint is deleted only after the run completes
/// without error.
///
/// # Errors
/// See [`RunError`]; per-file extraction failures are logged and skipped,
/// never fatal.
pub fn run<E, G>(
    mode: &Mode,
    options: &RunOptions,
    extractor: &E,
    geocoder: &G,
    cancel: &AtomicBool,
) -> Result<RunSummary, RunError>
where
    E: LocationExtractor + ?Sized,
    G: Geocoder + ?Sized,
{
    mode.validate()?;

    // Establish the center before touching any file; an unresolvable
    // address aborts the whole run.
    let center = match mode {
        Mode::Search(criteria) => Some(resolve_center(criteria, geocoder)?),
        Mode::Cluster(_) => None,
    };

    let mut scanner = ImageScanner::new(&options.root);
    if !options.recursive {
        scanner = scanner.non_recursive();
    }
    if let Some(output_dir) = &options.output_dir {
        scanner = scanner.excluding(output_dir);
    }
    let files = scanner.scan()?;
    info!("discovered {} candidate files under {}", files.len(), options.root.display());

    let manager = CheckpointManager::acquire(&options.checkpoint)?;
    let fingerprint = mode.fingerprint();

    let resumed = if options.resume {
        manager.load(&fingerprint)?
    } else {
        None
    };

    let (mut state, mut engine) = match resumed {
        Some(state) => {
            let engine = seed_engine(mode, center, &state.accumulator);
            (state, engine)
        }
        None => {
            let engine = fresh_engine(mode, center);
            let state = CheckpointState::new(fingerprint.clone(), engine.snapshot());
            (state, engine)
        }
    };

    let mut pending: Vec<String> = Vec::new();
    let mut processed = 0usize;
    let mut last_flush = Instant::now();

    for path in &files {
        if cancel.load(Ordering::SeqCst) {
            warn!("interrupt received; flushing checkpoint");
            manager.record(&mut state, pending.drain(..), engine.snapshot())?;
            return Err(RunError::Interrupted);
        }

        let key = path.to_string_lossy().into_owned();
        if state.is_processed(&key) {
            debug!("skipping already-processed {key}");
            continue;
        }

        match extractor.extract(path) {
            Ok(Some(record)) => {
                if mode.filters().passes(&record) {
                    match &mut engine {
                        Engine::Search {
                            search,
                            accumulator,
                        } => {
                            if accumulator.consider(search, record) {
                                debug!("{key} within radius");
                            }
                        }
                        Engine::Cluster {
                            clusterer,
                            state: cluster_state,
                        } => {
                            clusterer.assign(cluster_state, record);
                        }
                    }
                }
            }
            Ok(None) => debug!("{key}: no GPS data"),
            // The path still counts as processed so a resumed run does not
            // retry permanently unreadable files.
            Err(err) => warn!("{key}: {err}"),
        }

        processed += 1;
        pending.push(key);

        if pending.len() >= options.batch_files
            || last_flush.elapsed() >= options.batch_interval
        {
            manager.record(&mut state, pending.drain(..), engine.snapshot())?;
            last_flush = Instant::now();
        }
    }

    if !pending.is_empty() {
        manager.record(&mut state, pending.drain(..), engine.snapshot())?;
    }

    let output = finish(engine, geocoder);
    export(&output, center, options)?;
    copy_matches(&output, options)?;

    manager.finalize()?;

    Ok(RunSummary {
        discovered: files.len(),
        processed,
        output,
    })
}

fn fresh_engine(mode: &Mode, center: Option<GeoPoint>) -> Engine {
    match mode {
        Mode::Search(criteria) => Engine::Search {
            search: RadiusSearch::new(
                center.expect("search mode resolves a center"),
                criteria.radius_km,
            ),
            accumulator: SearchAccumulator::new(),
        },
        Mode::Cluster(params) => Engine::Cluster {
            clusterer: GreedyClusterer::new(params.merge_radius_km),
            state: ClusterState::new(),
        },
    }
}

fn seed_engine(mode: &Mode, center: Option<GeoPoint>, accumulator: &Accumulator) -> Engine {
    match (mode, accumulator) {
        (Mode::Search(criteria), Accumulator::Search(hits)) => Engine::Search {
            search: RadiusSearch::new(
                center.expect("search mode resolves a center"),
                criteria.radius_km,
            ),
            accumulator: SearchAccumulator::from_hits(hits.clone()),
        },
        (Mode::Cluster(params), Accumulator::Clusters(clusters)) => Engine::Cluster {
            clusterer: GreedyClusterer::new(params.merge_radius_km),
            state: ClusterState::from_clusters(clusters.clone()),
        },
        // The fingerprint separates modes, so a mismatch here means the
        // checkpoint file was edited by hand; start over.
        _ => {
            warn!("checkpoint accumulator does not match run mode; starting fresh");
            fresh_engine(mode, center)
        }
    }
}

fn finish<G: Geocoder + ?Sized>(engine: Engine, geocoder: &G) -> RunOutput {
    match engine {
        Engine::Search { accumulator, .. } => RunOutput::Search(accumulator.into_sorted()),
        Engine::Cluster { state, .. } => {
            let mut clusters = state.into_clusters();
            name_clusters(&mut clusters, geocoder);
            RunOutput::Clusters(clusters)
        }
    }
}

fn export(
    output: &RunOutput,
    center: Option<GeoPoint>,
    options: &RunOptions,
) -> Result<(), RunError> {
    let export_dir = options
        .output_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));

    if options.export_csv {
        std::fs::create_dir_all(&export_dir).map_err(geosift_io::Error::from)?;
        let path = export_dir.join("geosift_results.csv");
        let mut writer = CsvWriter::create(&path)?;
        match output {
            RunOutput::Search(hits) => writer.write_search_hits(hits)?,
            RunOutput::Clusters(clusters) => writer.write_clusters(clusters)?,
        }
        info!("CSV export written to {}", path.display());
    }

    if options.export_kml {
        std::fs::create_dir_all(&export_dir).map_err(geosift_io::Error::from)?;
        let path = export_dir.join("geosift_results.kml");
        let mut writer = KmlWriter::create(&path)?;
        match output {
            RunOutput::Search(hits) => writer.write_search_hits(hits, center)?,
            RunOutput::Clusters(clusters) => writer.write_clusters(clusters)?,
        }
        info!("KML export written to {}", path.display());
    }

    Ok(())
}

fn copy_matches(output: &RunOutput, options: &RunOptions) -> Result<(), RunError> {
    if options.find_only {
        return Ok(());
    }
    let Some(dest) = &options.output_dir else {
        return Ok(());
    };

    match output {
        RunOutput::Search(hits) => {
            copy_hits(hits, dest)?;
        }
        RunOutput::Clusters(clusters) => {
            copy_clusters(clusters, dest)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;
    use std::path::Path;
    use std::sync::atomic::AtomicUsize;

    use geosift_core::{GeocodingError, PhotoLocation, Result as CoreResult};

    /// Maps file names to coordinates; stands in for EXIF parsing.
    struct FakeExtractor {
        coords: HashMap<String, (f64, f64)>,
    }

    impl FakeExtractor {
        fn new(coords: &[(&str, f64, f64)]) -> Self {
            Self {
                coords: coords
                    .iter()
                    .map(|(name, lat, lon)| ((*name).to_string(), (*lat, *lon)))
                    .collect(),
            }
        }
    }

    impl LocationExtractor for FakeExtractor {
        fn extract(&self, path: &Path) -> CoreResult<Option<PhotoLocation>> {
            let name = path.file_name().unwrap().to_string_lossy().into_owned();
            match self.coords.get(&name) {
                Some(&(lat, lon)) => {
                    let point = GeoPoint::new(lat, lon)?;
                    Ok(Some(PhotoLocation::new(path, point)))
                }
                None => Ok(None),
            }
        }
    }

    /// Raises the cancel flag after a fixed number of extractions, simulating
    /// an interrupt mid-run.
    struct CancelAfter<'a> {
        inner: &'a FakeExtractor,
        cancel: &'a AtomicBool,
        remaining: AtomicUsize,
    }

    impl LocationExtractor for CancelAfter<'_> {
        fn extract(&self, path: &Path) -> CoreResult<Option<PhotoLocation>> {
            let result = self.inner.extract(path);
            if self.remaining.fetch_sub(1, Ordering::SeqCst) == 1 {
                self.cancel.store(true, Ordering::SeqCst);
            }
            result
        }
    }

    struct NullGeocoder;

    impl Geocoder for NullGeocoder {
        fn resolve_address(&self, query: &str) -> Result<GeoPoint, GeocodingError> {
            Err(GeocodingError::NoMatch(query.to_string()))
        }
        fn reverse_geocode(&self, _point: GeoPoint) -> Result<String, GeocodingError> {
            Err(GeocodingError::Service("offline".into()))
        }
    }

    fn options(root: &Path, checkpoint: &Path) -> RunOptions {
        RunOptions {
            root: root.to_path_buf(),
            recursive: true,
            output_dir: None,
            find_only: true,
            export_csv: false,
            export_kml: false,
            checkpoint: checkpoint.to_path_buf(),
            resume: false,
            batch_files: 3,
            batch_interval: Duration::from_secs(3600),
        }
    }

    /// Ten files in two tight groups: 00-04 near the origin and 05-09 about
    /// 112 km north, ~0.17 km spacing within each group.
    fn line_fixture() -> (tempfile::TempDir, FakeExtractor) {
        let dir = tempfile::tempdir().unwrap();
        let mut coords = Vec::new();
        for i in 0..10u32 {
            let name = format!("{i:02}.jpg");
            fs::write(dir.path().join(&name), b"").unwrap();
            let base = if i < 5 { 0.0 } else { 1.0 };
            coords.push((name, base + 0.0015 * f64::from(i), 0.0));
        }
        let coords: Vec<(&str, f64, f64)> = coords
            .iter()
            .map(|(name, lat, lon)| (name.as_str(), *lat, *lon))
            .collect();
        let extractor = FakeExtractor::new(&coords);
        (dir, extractor)
    }

    fn cluster_mode() -> Mode {
        Mode::Cluster(ClusterParams::new(0.5))
    }

    fn search_mode() -> Mode {
        Mode::Search(SearchCriteria::at(GeoPoint::new(0.0, 0.0).unwrap(), 2.0))
    }

    #[test]
    fn test_uninterrupted_cluster_run() {
        let (dir, extractor) = line_fixture();
        let checkpoint = dir.path().join("cp.json");
        let cancel = AtomicBool::new(false);

        let summary = run(
            &cluster_mode(),
            &options(dir.path(), &checkpoint),
            &extractor,
            &NullGeocoder,
            &cancel,
        )
        .unwrap();

        assert_eq!(summary.discovered, 10);
        assert_eq!(summary.processed, 10);
        let RunOutput::Clusters(clusters) = summary.output else {
            panic!("expected clusters");
        };
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].len() + clusters[1].len(), 10);
        // Checkpoint removed after a clean finish.
        assert!(!checkpoint.exists());
    }

    #[test]
    fn test_interrupted_cluster_run_resumes_identically() {
        let (dir, extractor) = line_fixture();
        let cancel = AtomicBool::new(false);

        // Reference: uninterrupted run with its own checkpoint.
        let full = run(
            &cluster_mode(),
            &options(dir.path(), &dir.path().join("cp_full.json")),
            &extractor,
            &NullGeocoder,
            &cancel,
        )
        .unwrap();

        // Interrupted after four files.
        let checkpoint = dir.path().join("cp.json");
        let interrupting = CancelAfter {
            inner: &extractor,
            cancel: &cancel,
            remaining: AtomicUsize::new(4),
        };
        let err = run(
            &cluster_mode(),
            &options(dir.path(), &checkpoint),
            &interrupting,
            &NullGeocoder,
            &cancel,
        )
        .unwrap_err();
        assert!(matches!(err, RunError::Interrupted));
        assert!(checkpoint.exists());

        // Resume to completion.
        cancel.store(false, Ordering::SeqCst);
        let mut resume_options = options(dir.path(), &checkpoint);
        resume_options.resume = true;
        let resumed = run(
            &cluster_mode(),
            &resume_options,
            &extractor,
            &NullGeocoder,
            &cancel,
        )
        .unwrap();

        // The already-checkpointed four files were skipped.
        assert_eq!(resumed.processed, 6);

        let (RunOutput::Clusters(expected), RunOutput::Clusters(actual)) =
            (full.output, resumed.output)
        else {
            panic!("expected clusters");
        };
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_interrupted_search_run_resumes_identically() {
        let (dir, extractor) = line_fixture();
        let cancel = AtomicBool::new(false);

        let full = run(
            &search_mode(),
            &options(dir.path(), &dir.path().join("cp_full.json")),
            &extractor,
            &NullGeocoder,
            &cancel,
        )
        .unwrap();

        let checkpoint = dir.path().join("cp.json");
        let interrupting = CancelAfter {
            inner: &extractor,
            cancel: &cancel,
            remaining: AtomicUsize::new(3),
        };
        assert!(run(
            &search_mode(),
            &options(dir.path(), &checkpoint),
            &interrupting,
            &NullGeocoder,
            &cancel,
        )
        .is_err());

        cancel.store(false, Ordering::SeqCst);
        let mut resume_options = options(dir.path(), &checkpoint);
        resume_options.resume = true;
        let resumed = run(
            &search_mode(),
            &resume_options,
            &extractor,
            &NullGeocoder,
            &cancel,
        )
        .unwrap();

        let (RunOutput::Search(expected), RunOutput::Search(actual)) =
            (full.output, resumed.output)
        else {
            panic!("expected search hits");
        };
        assert_eq!(actual, expected);
        // Only the five files near the origin are within 2 km.
        assert_eq!(actual.len(), 5);
    }

    #[test]
    fn test_changed_parameters_invalidate_checkpoint() {
        let (dir, extractor) = line_fixture();
        let cancel = AtomicBool::new(false);
        let checkpoint = dir.path().join("cp.json");

        let interrupting = CancelAfter {
            inner: &extractor,
            cancel: &cancel,
            remaining: AtomicUsize::new(4),
        };
        assert!(run(
            &cluster_mode(),
            &options(dir.path(), &checkpoint),
            &interrupting,
            &NullGeocoder,
            &cancel,
        )
        .is_err());

        // Resume with a different merge radius: the checkpoint must be
        // discarded and every file reprocessed.
        cancel.store(false, Ordering::SeqCst);
        let mut resume_options = options(dir.path(), &checkpoint);
        resume_options.resume = true;
        let resumed = run(
            &Mode::Cluster(ClusterParams::new(0.8)),
            &resume_options,
            &extractor,
            &NullGeocoder,
            &cancel,
        )
        .unwrap();

        assert_eq!(resumed.processed, 10);
    }

    #[test]
    fn test_extraction_failures_do_not_abort() {
        struct FailingExtractor;
        impl LocationExtractor for FailingExtractor {
            fn extract(&self, path: &Path) -> CoreResult<Option<PhotoLocation>> {
                Err(CoreError::FileOperation(format!(
                    "unreadable: {}",
                    path.display()
                )))
            }
        }

        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.jpg"), b"").unwrap();
        fs::write(dir.path().join("b.jpg"), b"").unwrap();
        let cancel = AtomicBool::new(false);

        let summary = run(
            &cluster_mode(),
            &options(dir.path(), &dir.path().join("cp.json")),
            &FailingExtractor,
            &NullGeocoder,
            &cancel,
        )
        .unwrap();

        assert_eq!(summary.processed, 2);
        let RunOutput::Clusters(clusters) = summary.output else {
            panic!("expected clusters");
        };
        assert!(clusters.is_empty());
    }

    #[test]
    fn test_invalid_parameters_abort_before_scan() {
        let cancel = AtomicBool::new(false);
        // Root does not exist, but validation must fail first.
        let result = run(
            &Mode::Cluster(ClusterParams::new(-1.0)),
            &options(Path::new("/nonexistent"), Path::new("/nonexistent/cp.json")),
            &FakeExtractor::new(&[]),
            &NullGeocoder,
            &cancel,
        );
        assert!(matches!(result, Err(RunError::Config(_))));
    }

    #[test]
    fn test_address_resolution_failure_aborts_search() {
        let (dir, extractor) = line_fixture();
        let cancel = AtomicBool::new(false);

        let result = run(
            &Mode::Search(SearchCriteria::at_address("Atlantis", 1.0)),
            &options(dir.path(), &dir.path().join("cp.json")),
            &extractor,
            &NullGeocoder,
            &cancel,
        );
        assert!(matches!(result, Err(RunError::Geocoding(_))));
    }

    #[test]
    fn test_exports_written_to_output_dir() {
        let (dir, extractor) = line_fixture();
        let out = dir.path().join("out");
        let cancel = AtomicBool::new(false);

        let mut opts = options(dir.path(), &dir.path().join("cp.json"));
        opts.output_dir = Some(out.clone());
        opts.export_csv = true;
        opts.export_kml = true;

        run(
            &search_mode(),
            &opts,
            &extractor,
            &NullGeocoder,
            &cancel,
        )
        .unwrap();

        assert!(out.join("geosift_results.csv").exists());
        assert!(out.join("geosift_results.kml").exists());
    }
}

