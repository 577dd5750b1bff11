use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::histogram::Binning;
use crate::error::AnalysisError;

// ---------------------------------------------------------------------------
// Mass ranges
// ---------------------------------------------------------------------------

/// A named window of the dimuon mass spectrum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MassRange {
    pub name: String,
    pub bins: usize,
    pub lower: f64,
    pub upper: f64,
}

impl MassRange {
    pub fn new(name: &str, bins: usize, lower: f64, upper: f64) -> Self {
        Self {
            name: name.to_string(),
            bins,
            lower,
            upper,
        }
    }

    pub fn binning(&self) -> Binning {
        Binning::new(self.bins, self.lower, self.upper)
    }
}

/// Which non-zero charge sums count as "same sign".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SameSignPolicy {
    /// Both `++` and `--` pairs.
    #[default]
    Any,
    /// Only `++` pairs.
    PositiveOnly,
}

impl SameSignPolicy {
    pub fn accepts(self, pair_charge: i32) -> bool {
        match self {
            SameSignPolicy::Any => pair_charge != 0,
            SameSignPolicy::PositiveOnly => pair_charge > 0,
        }
    }
}

// ---------------------------------------------------------------------------
// AnalysisConfig
// ---------------------------------------------------------------------------

/// Everything a pipeline run needs to know. Missing JSON keys take the
/// defaults below, which reproduce the 2010 Run B dimuon analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Input CSV of muon pairs.
    pub input: PathBuf,
    /// Directory holding cached bundles.
    pub store_dir: PathBuf,
    /// Bundle key; the file is `<store_dir>/<bundle_key>.json`.
    pub bundle_key: String,
    pub mass_ranges: Vec<MassRange>,
    pub pt_binning: Binning,
    pub same_sign: SameSignPolicy,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("../data/MuRun2010B.csv"),
            store_dir: PathBuf::from("."),
            bundle_key: "histograms".to_string(),
            mass_ranges: vec![
                MassRange::new("full", 120, 0.0, 120.0),
                MassRange::new("psi", 100, 2.0, 6.0),
                MassRange::new("Ups", 100, 8.5, 12.5),
            ],
            pt_binning: Binning::new(100, 0.0, 100.0),
            same_sign: SameSignPolicy::Any,
        }
    }
}

impl AnalysisConfig {
    /// Read a JSON config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: AnalysisConfig = serde_json::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.bundle_key.trim().is_empty() {
            return Err(AnalysisError::Config("bundle key is empty".into()));
        }
        if self.mass_ranges.is_empty() {
            return Err(AnalysisError::Config("no mass ranges configured".into()));
        }
        let mut seen = BTreeSet::new();
        for range in &self.mass_ranges {
            if range.name.is_empty() {
                return Err(AnalysisError::Config("mass range with empty name".into()));
            }
            if !seen.insert(range.name.as_str()) {
                return Err(AnalysisError::Config(format!("duplicate mass range '{}'", range.name)));
            }
            if !range.binning().is_valid() {
                return Err(AnalysisError::Config(format!(
                    "mass range '{}' has invalid binning ({} bins over [{}, {}))",
                    range.name, range.bins, range.lower, range.upper
                )));
            }
        }
        if !self.pt_binning.is_valid() {
            return Err(AnalysisError::Config("invalid pT binning".into()));
        }
        Ok(())
    }

    pub fn bundle_path(&self) -> PathBuf {
        self.store_dir.join(format!("{}.json", self.bundle_key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_reproduce_run_b_ranges() {
        let config = AnalysisConfig::default();
        let ranges: Vec<(&str, usize, f64, f64)> = config
            .mass_ranges
            .iter()
            .map(|r| (r.name.as_str(), r.bins, r.lower, r.upper))
            .collect();
        assert_eq!(
            ranges,
            vec![("full", 120, 0.0, 120.0), ("psi", 100, 2.0, 6.0), ("Ups", 100, 8.5, 12.5)]
        );
        assert_eq!(config.pt_binning, Binning::new(100, 0.0, 100.0));
        assert!(config.validate().is_ok());
        assert_eq!(config.bundle_path(), PathBuf::from("./histograms.json"));
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: AnalysisConfig =
            serde_json::from_str(r#"{ "input": "run.csv", "same_sign": "positive_only" }"#).unwrap();
        assert_eq!(config.input, PathBuf::from("run.csv"));
        assert_eq!(config.same_sign, SameSignPolicy::PositiveOnly);
        assert_eq!(config.mass_ranges.len(), 3);
    }

    #[test]
    fn rejects_duplicate_and_degenerate_ranges() {
        let mut config = AnalysisConfig::default();
        config.mass_ranges.push(MassRange::new("psi", 10, 0.0, 1.0));
        assert!(config.validate().is_err());

        let mut config = AnalysisConfig::default();
        config.mass_ranges[1].upper = config.mass_ranges[1].lower;
        assert!(config.validate().is_err());

        let mut config = AnalysisConfig::default();
        config.mass_ranges.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn same_sign_policies() {
        assert!(SameSignPolicy::Any.accepts(2));
        assert!(SameSignPolicy::Any.accepts(-2));
        assert!(!SameSignPolicy::Any.accepts(0));
        assert!(SameSignPolicy::PositiveOnly.accepts(2));
        assert!(!SameSignPolicy::PositiveOnly.accepts(-2));
    }
}
