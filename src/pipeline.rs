use std::fmt;

use crate::config::AnalysisConfig;
use crate::data::bundle::HistogramBundle;
use crate::data::loader;
use crate::data::store::BundleStore;
use crate::error::{AnalysisError, StoreError};

// ---------------------------------------------------------------------------
// Driver state
// ---------------------------------------------------------------------------

/// How the bundle of a run was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// A valid stored bundle was found; the input was not read.
    Cached,
    /// The input was ingested and the bundle computed from scratch.
    Compute,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineState::Cached => write!(f, "CACHED"),
            PipelineState::Compute => write!(f, "COMPUTE"),
        }
    }
}

/// Result of a successful run.
#[derive(Debug)]
pub struct PipelineOutcome {
    pub state: PipelineState,
    /// Fully populated; read-only from here on.
    pub bundle: HistogramBundle,
    /// Set when a computed bundle could not be persisted. The bundle is
    /// still valid for this run.
    pub save_error: Option<StoreError>,
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

pub struct Pipeline<'a, S: BundleStore> {
    config: &'a AnalysisConfig,
    store: &'a S,
    force: bool,
    chunk_size: Option<usize>,
}

impl<'a, S: BundleStore> Pipeline<'a, S> {
    pub fn new(config: &'a AnalysisConfig, store: &'a S) -> Self {
        Self {
            config,
            store,
            force: false,
            chunk_size: None,
        }
    }

    /// Ignore any stored bundle and always ingest.
    pub fn force_compute(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Fill partial bundles of `chunk_size` records and merge them.
    pub fn chunk_size(mut self, chunk_size: Option<usize>) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn run(&self) -> Result<PipelineOutcome, AnalysisError> {
        self.config.validate()?;

        if let Some(bundle) = self.lookup() {
            log::info!(
                "state {}: loaded {} histograms ({} records) from store key '{}'",
                PipelineState::Cached,
                bundle.len(),
                bundle.stats.records,
                self.config.bundle_key
            );
            return Ok(PipelineOutcome {
                state: PipelineState::Cached,
                bundle,
                save_error: None,
            });
        }

        log::info!(
            "state {}: reading {}",
            PipelineState::Compute,
            self.config.input.display()
        );
        let mut bundle = match self.chunk_size {
            Some(n) => loader::ingest_file_partitioned(&self.config.input, self.config, n)?,
            None => loader::ingest_file(&self.config.input, self.config)?,
        };
        bundle.finalize()?;
        log::info!(
            "ingested {} records: {} opposite-sign, {} same-sign pairs",
            bundle.stats.records,
            bundle.stats.opposite_sign,
            bundle.stats.same_sign
        );

        let save_error = match self.store.save(&self.config.bundle_key, &bundle) {
            Ok(()) => None,
            Err(e) => {
                log::warn!("could not cache histograms: {e}");
                Some(e)
            }
        };

        Ok(PipelineOutcome {
            state: PipelineState::Compute,
            bundle,
            save_error,
        })
    }

    /// Any store failure or layout mismatch is a cache miss.
    fn lookup(&self) -> Option<HistogramBundle> {
        if self.force {
            log::info!("cache lookup skipped (forced recompute)");
            return None;
        }
        match self.store.load(&self.config.bundle_key) {
            Ok(Some(bundle)) => match bundle.check_layout(self.config) {
                Ok(()) => Some(bundle),
                Err(reason) => {
                    log::info!("cached bundle ignored: {reason}");
                    None
                }
            },
            Ok(None) => {
                log::debug!("no cached bundle under '{}'", self.config.bundle_key);
                None
            }
            Err(e) => {
                log::warn!("cached bundle unusable, recomputing: {e}");
                None
            }
        }
    }
}
