use std::path::PathBuf;

use crate::config::AnalysisConfig;
use crate::data::bundle::HistogramBundle;
use crate::data::store::JsonFileStore;
use crate::pipeline::{Pipeline, PipelineOutcome, PipelineState};

// ---------------------------------------------------------------------------
// What the central plot shows
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// Mass spectrum for the range at this index of `bundle.ranges`.
    Mass(usize),
    /// mu+ and mu- transverse momentum.
    Pt,
    /// mu+ minus mu- transverse momentum, with errors.
    PtDiff,
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full viewer state, independent of rendering.
pub struct AppState {
    pub config: AnalysisConfig,

    /// Finished histograms (None until a run succeeds).
    pub bundle: Option<HistogramBundle>,

    /// How the current bundle was obtained.
    pub pipeline_state: Option<PipelineState>,

    pub view: View,

    /// Plot log10 of the contents.
    pub log_y: bool,

    /// Overlay the same-sign spectrum on mass plots.
    pub show_same_sign: bool,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            config,
            bundle: None,
            pipeline_state: None,
            view: View::Mass(0),
            log_y: true,
            show_same_sign: true,
            status_message: None,
        }
    }

    /// Take over the result of a pipeline run.
    pub fn set_outcome(&mut self, outcome: PipelineOutcome) {
        self.status_message = outcome
            .save_error
            .as_ref()
            .map(|e| format!("Histograms not cached: {e}"));
        self.pipeline_state = Some(outcome.state);
        self.bundle = Some(outcome.bundle);
        if let View::Mass(i) = self.view {
            if i >= self.range_names().len() {
                self.view = View::Mass(0);
            }
        }
    }

    /// Run the pipeline on `input`, bypassing the cache.
    pub fn recompute(&mut self, input: PathBuf) {
        self.config.input = input;
        let store = JsonFileStore::new(&self.config.store_dir);
        match Pipeline::new(&self.config, &store).force_compute(true).run() {
            Ok(outcome) => {
                log::info!(
                    "recomputed {} histograms from {}",
                    outcome.bundle.len(),
                    self.config.input.display()
                );
                self.set_outcome(outcome);
            }
            Err(e) => {
                log::error!("Failed to analyse {}: {e}", self.config.input.display());
                self.status_message = Some(format!("Error: {e}"));
            }
        }
    }

    pub fn range_names(&self) -> &[String] {
        self.bundle.as_ref().map(|b| b.ranges.as_slice()).unwrap_or(&[])
    }
}
