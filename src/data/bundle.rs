use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::histogram::Histogram;
use super::model::{Charge, Dimuon};
use crate::config::{AnalysisConfig, SameSignPolicy};
use crate::error::HistogramError;

/// Histogram naming scheme shared by the store and the viewer.
pub mod names {
    pub const PT_POS: &str = "h_pt_pos";
    pub const PT_NEG: &str = "h_pt_neg";
    /// Derived mu+ minus mu- pT spectrum, with errors.
    pub const PT_DIFF: &str = "h_pt_diff";

    pub fn same_sign(range: &str) -> String {
        format!("h_mm_SS_{range}")
    }

    /// Opposite- and same-sign pairs combined.
    pub fn all_events(range: &str) -> String {
        format!("h_mm_OSSS_{range}")
    }
}

// ---------------------------------------------------------------------------
// IngestStats
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestStats {
    pub records: u64,
    pub opposite_sign: u64,
    /// Pairs routed to the same-sign spectra under the bundle's policy.
    pub same_sign: u64,
}

impl IngestStats {
    fn add(&mut self, other: &IngestStats) {
        self.records += other.records;
        self.opposite_sign += other.opposite_sign;
        self.same_sign += other.same_sign;
    }
}

// ---------------------------------------------------------------------------
// HistogramBundle
// ---------------------------------------------------------------------------

/// All aggregates of one pipeline run, keyed by histogram name.
///
/// Filled during ingestion, then handed by value to the store and the viewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBundle {
    /// Mass range names in booking order.
    pub ranges: Vec<String>,
    /// Policy the same-sign spectra were filled with.
    pub same_sign: SameSignPolicy,
    pub stats: IngestStats,
    histograms: BTreeMap<String, Histogram>,
}

impl HistogramBundle {
    /// Book zero-filled histograms for every configured range plus the two
    /// pT spectra.
    pub fn book(config: &AnalysisConfig) -> Result<Self, HistogramError> {
        let mut histograms = BTreeMap::new();
        for range in &config.mass_ranges {
            let base = Histogram::new(format!("hBase_mm_{}", range.name), range.binning())?;
            for name in [names::same_sign(&range.name), names::all_events(&range.name)] {
                histograms.insert(name.clone(), base.clone_empty(name));
            }
        }
        let pt = Histogram::new("hBase_pt", config.pt_binning)?;
        for name in [names::PT_POS, names::PT_NEG] {
            histograms.insert(name.to_string(), pt.clone_empty(name));
        }

        Ok(HistogramBundle {
            ranges: config.mass_ranges.iter().map(|r| r.name.clone()).collect(),
            same_sign: config.same_sign,
            stats: IngestStats::default(),
            histograms,
        })
    }

    /// Route one reconstructed pair into the mass and pT spectra.
    pub fn fill_pair(&mut self, pair: &Dimuon) {
        let mass = pair.mass();
        let is_same_sign = self.same_sign.accepts(pair.charge);

        for range in &self.ranges {
            if is_same_sign {
                if let Some(h) = self.histograms.get_mut(&names::same_sign(range)) {
                    h.fill(mass);
                }
            }
            if let Some(h) = self.histograms.get_mut(&names::all_events(range)) {
                h.fill(mass);
            }
        }

        for mu in pair.daughters() {
            let name = match mu.charge {
                Charge::Negative => names::PT_NEG,
                Charge::Positive => names::PT_POS,
            };
            if let Some(h) = self.histograms.get_mut(name) {
                h.fill(mu.p4.pt());
            }
        }

        self.stats.records += 1;
        if pair.is_opposite_sign() {
            self.stats.opposite_sign += 1;
        } else if is_same_sign {
            self.stats.same_sign += 1;
        }
    }

    /// Add the derived pT difference. Call once ingestion is complete.
    pub fn finalize(&mut self) -> Result<(), HistogramError> {
        let pos = self.require(names::PT_POS)?;
        let neg = self.require(names::PT_NEG)?;
        let diff = Histogram::difference(names::PT_DIFF, pos, neg)?;
        self.histograms.insert(names::PT_DIFF.to_string(), diff);
        Ok(())
    }

    /// Bin-wise sum of two partial bundles with identical booking.
    pub fn merge(&mut self, other: &HistogramBundle) -> Result<(), HistogramError> {
        for (name, theirs) in &other.histograms {
            match self.histograms.get_mut(name) {
                Some(mine) => mine.merge(theirs)?,
                None => {
                    self.histograms.insert(name.clone(), theirs.clone());
                }
            }
        }
        self.stats.add(&other.stats);
        Ok(())
    }

    /// Zero every filled histogram and drop derived ones.
    pub fn reset(&mut self) {
        self.histograms.remove(names::PT_DIFF);
        for h in self.histograms.values_mut() {
            *h = h.clone_empty(h.name.clone());
        }
        self.stats = IngestStats::default();
    }

    pub fn get(&self, name: &str) -> Option<&Histogram> {
        self.histograms.get(name)
    }

    fn require(&self, name: &str) -> Result<&Histogram, HistogramError> {
        self.get(name).ok_or_else(|| HistogramError::Missing {
            name: name.to_string(),
        })
    }

    pub fn histograms(&self) -> impl Iterator<Item = &Histogram> {
        self.histograms.values()
    }

    pub fn len(&self) -> usize {
        self.histograms.len()
    }

    /// Check internal consistency and that the bundle was booked with the
    /// same ranges, binning and same-sign policy as `config`. Returns the
    /// first mismatch.
    pub fn check_layout(&self, config: &AnalysisConfig) -> Result<(), String> {
        for (name, h) in &self.histograms {
            if *name != h.name {
                return Err(format!("entry '{name}' holds histogram '{}'", h.name));
            }
            h.validate().map_err(|e| e.to_string())?;
        }

        let expected: Vec<&str> = config.mass_ranges.iter().map(|r| r.name.as_str()).collect();
        if self.ranges != expected {
            return Err(format!("ranges {:?}, expected {:?}", self.ranges, expected));
        }
        if self.same_sign != config.same_sign {
            return Err(format!(
                "filled with same-sign policy {:?}, expected {:?}",
                self.same_sign, config.same_sign
            ));
        }

        let mut wanted = Vec::new();
        for range in &config.mass_ranges {
            wanted.push((names::same_sign(&range.name), range.binning()));
            wanted.push((names::all_events(&range.name), range.binning()));
        }
        for name in [names::PT_POS, names::PT_NEG, names::PT_DIFF] {
            wanted.push((name.to_string(), config.pt_binning));
        }

        for (name, binning) in wanted {
            let h = self.get(&name).ok_or_else(|| format!("missing histogram '{name}'"))?;
            if h.binning() != binning {
                return Err(format!("histogram '{name}' binning differs from configuration"));
            }
        }
        Ok(())
    }
}
