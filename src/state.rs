use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use log::{debug, error};

use crate::data::loader::{try_load, LoadReport, LogSink};
use crate::data::model::Dataset;

// ---------------------------------------------------------------------------
// Dataset cache
// ---------------------------------------------------------------------------

/// Owns the current dataset snapshot for one source file.
///
/// Readers get an `Arc<Dataset>` and never block each other once the first
/// load has finished. A reload builds a new dataset and swaps the `Arc`;
/// snapshots already handed out stay valid and unchanged. At most one load
/// runs at a time: callers arriving during a load wait for it and reuse its
/// result.
pub struct DatasetCache {
    path: PathBuf,
    snapshot: RwLock<Option<Arc<Dataset>>>,
    last_report: RwLock<Option<LoadReport>>,
    /// Held for the whole duration of a load.
    load_lock: Mutex<()>,
    loads: AtomicUsize,
}

impl DatasetCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            snapshot: RwLock::new(None),
            last_report: RwLock::new(None),
            load_lock: Mutex::new(()),
            loads: AtomicUsize::new(0),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a snapshot is available without loading.
    pub fn is_loaded(&self) -> bool {
        self.read_snapshot().is_some()
    }

    /// Number of loads performed so far.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// Report of the most recent load, if any.
    pub fn last_report(&self) -> Option<LoadReport> {
        self.last_report
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Current snapshot, loading the source on first use.
    pub fn dataset(&self) -> Arc<Dataset> {
        if let Some(ds) = self.read_snapshot() {
            debug!("dataset cache hit for {}", self.path.display());
            return ds;
        }

        let _guard = self.load_lock.lock().unwrap_or_else(PoisonError::into_inner);
        // Another caller may have finished a load while we waited.
        if let Some(ds) = self.read_snapshot() {
            return ds;
        }
        self.load_locked()
    }

    /// Re-read the source and replace the snapshot wholesale.
    pub fn reload(&self) -> Arc<Dataset> {
        let _guard = self.load_lock.lock().unwrap_or_else(PoisonError::into_inner);
        debug!("reloading {}", self.path.display());
        self.load_locked()
    }

    fn read_snapshot(&self) -> Option<Arc<Dataset>> {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Caller must hold `load_lock`.
    fn load_locked(&self) -> Arc<Dataset> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        let (dataset, report) = match try_load(&self.path, &mut LogSink) {
            Ok(loaded) => loaded,
            Err(err) => {
                error!("CRITICAL: {err}; serving an empty dataset");
                let report = LoadReport {
                    source_found: true,
                    ..LoadReport::default()
                };
                (Dataset::default(), report)
            }
        };

        let dataset = Arc::new(dataset);
        *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&dataset));
        *self.last_report.write().unwrap_or_else(PoisonError::into_inner) = Some(report);
        dataset
    }
}
