use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use cms_dimuon::app;
use cms_dimuon::config::AnalysisConfig;
use cms_dimuon::data::store::JsonFileStore;
use cms_dimuon::pipeline::{Pipeline, PipelineOutcome};

/// Dimuon mass and pT spectra from the CMS 2010 open data.
#[derive(Parser, Debug)]
#[command(name = "cms-dimuon")]
#[command(version)]
struct Cli {
    /// JSON analysis config; missing keys use the built-in defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Input CSV of muon pairs
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Directory for the cached histogram bundle
    #[arg(long)]
    store_dir: Option<PathBuf>,

    /// Bundle key (file name without `.json`)
    #[arg(long)]
    key: Option<String>,

    /// Recompute even if a cached bundle exists
    #[arg(long)]
    force: bool,

    /// Fill partial histograms every N records and merge them
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Open the viewer when done
    #[arg(long)]
    view: bool,

    /// Default log filter when RUST_LOG is unset (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Cli {
    fn resolve_config(&self) -> Result<AnalysisConfig> {
        let mut config = match &self.config {
            Some(path) => AnalysisConfig::from_file(path)?,
            None => AnalysisConfig::default(),
        };
        if let Some(input) = &self.input {
            config.input = input.clone();
        }
        if let Some(dir) = &self.store_dir {
            config.store_dir = dir.clone();
        }
        if let Some(key) = &self.key {
            config.bundle_key = key.clone();
        }
        Ok(config)
    }
}

fn print_summary(outcome: &PipelineOutcome) {
    let stats = outcome.bundle.stats;
    println!(
        "{}: {} records ({} opposite-sign, {} same-sign)",
        outcome.state, stats.records, stats.opposite_sign, stats.same_sign
    );
    println!("{:<18} {:>6} {:>12} {:>10} {:>10}", "histogram", "bins", "integral", "under", "over");
    for h in outcome.bundle.histograms() {
        println!(
            "{:<18} {:>6} {:>12.0} {:>10.0} {:>10.0}",
            h.name,
            h.bins,
            h.integral(),
            h.underflow,
            h.overflow
        );
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_level.as_str())).init();

    let config = cli.resolve_config()?;
    let store = JsonFileStore::new(&config.store_dir);
    let outcome = Pipeline::new(&config, &store)
        .force_compute(cli.force)
        .chunk_size(cli.chunk_size)
        .run()
        .with_context(|| format!("analysing {}", config.input.display()))?;

    print_summary(&outcome);
    if let Some(e) = &outcome.save_error {
        log::error!("histograms were not cached: {e}");
    }

    if cli.view {
        app::run_viewer(config, outcome).map_err(|e| anyhow::anyhow!("viewer failed: {e}"))?;
    }
    Ok(())
}
