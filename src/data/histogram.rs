use serde::{Deserialize, Serialize};

use crate::error::HistogramError;

// ---------------------------------------------------------------------------
// Binning
// ---------------------------------------------------------------------------

/// Fixed-width binning over the half-open interval `[lower, upper)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Binning {
    pub bins: usize,
    pub lower: f64,
    pub upper: f64,
}

impl Binning {
    pub fn new(bins: usize, lower: f64, upper: f64) -> Self {
        Self { bins, lower, upper }
    }

    pub fn is_valid(&self) -> bool {
        self.bins > 0 && self.lower.is_finite() && self.upper.is_finite() && self.lower < self.upper
    }

    pub fn width(&self) -> f64 {
        (self.upper - self.lower) / self.bins as f64
    }
}

/// Where a value lands relative to the binning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinSlot {
    Underflow,
    Bin(usize),
    Overflow,
}

// ---------------------------------------------------------------------------
// Histogram
// ---------------------------------------------------------------------------

/// A 1D fixed-width histogram.
///
/// Values outside `[lower, upper)` never touch a bin; they are tallied in
/// `underflow` / `overflow` instead, so for unit weights
/// `integral() + underflow + overflow == entries`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    pub name: String,
    pub bins: usize,
    pub lower: f64,
    pub upper: f64,
    /// Bin contents (length = bins, no under/overflow).
    pub contents: Vec<f64>,
    /// Per-bin errors. Only derived histograms carry them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<f64>>,
    #[serde(default)]
    pub underflow: f64,
    #[serde(default)]
    pub overflow: f64,
    /// Number of fill calls, in range or not.
    #[serde(default)]
    pub entries: u64,
}

impl Histogram {
    /// Zero-filled histogram.
    pub fn new(name: impl Into<String>, binning: Binning) -> Result<Self, HistogramError> {
        let name = name.into();
        if !binning.is_valid() {
            return Err(HistogramError::InvalidBinning {
                name,
                bins: binning.bins,
                lower: binning.lower,
                upper: binning.upper,
            });
        }
        Ok(Histogram {
            name,
            bins: binning.bins,
            lower: binning.lower,
            upper: binning.upper,
            contents: vec![0.0; binning.bins],
            errors: None,
            underflow: 0.0,
            overflow: 0.0,
            entries: 0,
        })
    }

    /// Empty copy with the same binning under a new name.
    pub fn clone_empty(&self, name: impl Into<String>) -> Self {
        Histogram {
            name: name.into(),
            bins: self.bins,
            lower: self.lower,
            upper: self.upper,
            contents: vec![0.0; self.bins],
            errors: None,
            underflow: 0.0,
            overflow: 0.0,
            entries: 0,
        }
    }

    pub fn binning(&self) -> Binning {
        Binning::new(self.bins, self.lower, self.upper)
    }

    pub fn bin_width(&self) -> f64 {
        self.binning().width()
    }

    pub fn bin_center(&self, bin: usize) -> f64 {
        self.lower + (bin as f64 + 0.5) * self.bin_width()
    }

    /// Locate `x`. `lower` is inside the first bin, `upper` is overflow.
    pub fn find_bin(&self, x: f64) -> BinSlot {
        if x.is_nan() || x >= self.upper {
            return BinSlot::Overflow;
        }
        if x < self.lower {
            return BinSlot::Underflow;
        }
        let idx = ((x - self.lower) / (self.upper - self.lower) * self.bins as f64).floor() as usize;
        BinSlot::Bin(idx.min(self.bins - 1))
    }

    /// Fill with unit weight.
    pub fn fill(&mut self, x: f64) {
        self.fill_weighted(x, 1.0);
    }

    pub fn fill_weighted(&mut self, x: f64, weight: f64) {
        self.entries += 1;
        match self.find_bin(x) {
            BinSlot::Bin(i) => self.contents[i] += weight,
            BinSlot::Underflow => self.underflow += weight,
            BinSlot::Overflow => self.overflow += weight,
        }
    }

    /// Sum of in-range bin contents.
    pub fn integral(&self) -> f64 {
        self.contents.iter().sum()
    }

    pub fn same_binning(&self, other: &Histogram) -> bool {
        self.bins == other.bins && self.lower == other.lower && self.upper == other.upper
    }

    /// Bin-wise sum of `other` into `self`.
    ///
    /// Commutative and associative: partial histograms filled from disjoint
    /// slices of the input merge to the same contents as one sequential fill.
    pub fn merge(&mut self, other: &Histogram) -> Result<(), HistogramError> {
        if !self.same_binning(other) {
            return Err(HistogramError::BinningMismatch {
                left: self.name.clone(),
                right: other.name.clone(),
            });
        }
        for (a, b) in self.contents.iter_mut().zip(&other.contents) {
            *a += b;
        }
        self.errors = match (self.errors.take(), &other.errors) {
            (Some(ea), Some(eb)) => Some(ea.iter().zip(eb).map(|(a, b)| a.hypot(*b)).collect()),
            _ => None,
        };
        self.underflow += other.underflow;
        self.overflow += other.overflow;
        self.entries += other.entries;
        Ok(())
    }

    /// Derived `a - b` histogram with Poisson errors `sqrt(a + b)` per bin.
    pub fn difference(name: impl Into<String>, a: &Histogram, b: &Histogram) -> Result<Histogram, HistogramError> {
        if !a.same_binning(b) {
            return Err(HistogramError::BinningMismatch {
                left: a.name.clone(),
                right: b.name.clone(),
            });
        }
        let mut diff = a.clone_empty(name);
        let mut errors = Vec::with_capacity(a.bins);
        for (i, (ca, cb)) in a.contents.iter().zip(&b.contents).enumerate() {
            diff.contents[i] = ca - cb;
            errors.push((ca + cb).max(0.0).sqrt());
        }
        diff.errors = Some(errors);
        diff.underflow = a.underflow - b.underflow;
        diff.overflow = a.overflow - b.overflow;
        diff.entries = a.entries + b.entries;
        Ok(diff)
    }

    /// Internal consistency check used when reading a stored bundle.
    pub fn validate(&self) -> Result<(), HistogramError> {
        if !self.binning().is_valid() {
            return Err(HistogramError::InvalidBinning {
                name: self.name.clone(),
                bins: self.bins,
                lower: self.lower,
                upper: self.upper,
            });
        }
        let lengths = std::iter::once(self.contents.len()).chain(self.errors.as_ref().map(Vec::len));
        for found in lengths {
            if found != self.bins {
                return Err(HistogramError::ContentLength {
                    name: self.name.clone(),
                    bins: self.bins,
                    found,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hist(bins: usize, lower: f64, upper: f64) -> Histogram {
        Histogram::new("h", Binning::new(bins, lower, upper)).unwrap()
    }

    #[test]
    fn rejects_invalid_binning() {
        assert!(Histogram::new("h", Binning::new(0, 0.0, 1.0)).is_err());
        assert!(Histogram::new("h", Binning::new(10, 1.0, 1.0)).is_err());
        assert!(Histogram::new("h", Binning::new(10, 2.0, 1.0)).is_err());
        assert!(Histogram::new("h", Binning::new(10, f64::NAN, 1.0)).is_err());
    }

    #[test]
    fn lower_edge_included_upper_edge_excluded() {
        let mut h = hist(120, 0.0, 120.0);
        h.fill(0.0);
        assert_eq!(h.contents[0], 1.0);

        h.fill(120.0);
        h.fill(-0.001);
        h.fill(500.0);
        assert_eq!(h.integral(), 1.0);
        assert_eq!(h.underflow, 1.0);
        assert_eq!(h.overflow, 2.0);
        assert_eq!(h.entries, 4);
    }

    #[test]
    fn bins_are_located_by_fixed_width() {
        let h = hist(100, 2.0, 6.0);
        assert_eq!(h.find_bin(2.0), BinSlot::Bin(0));
        assert_eq!(h.find_bin(3.097), BinSlot::Bin(27));
        assert_eq!(h.find_bin(5.999_999), BinSlot::Bin(99));
        assert_eq!(h.find_bin(6.0), BinSlot::Overflow);
        assert_eq!(h.find_bin(1.999), BinSlot::Underflow);
        assert_eq!(h.find_bin(f64::NAN), BinSlot::Overflow);
    }

    #[test]
    fn just_below_upper_never_overflows() {
        let h = hist(100, 8.5, 12.5);
        let x = 12.5_f64 - f64::EPSILON * 8.0;
        assert_eq!(h.find_bin(x), BinSlot::Bin(99));
    }

    #[test]
    fn flows_account_for_every_fill() {
        let mut h = hist(10, 0.0, 10.0);
        for x in [-5.0, 0.0, 0.5, 3.3, 9.99, 10.0, 42.0, f64::NAN] {
            h.fill(x);
        }
        assert_eq!(h.integral() + h.underflow + h.overflow, h.entries as f64);
    }

    #[test]
    fn fill_order_does_not_matter() {
        let values = [0.1, 5.5, 5.4, 99.0, 3.0, 3.0, 7.25, -1.0];
        let mut forward = hist(20, 0.0, 10.0);
        let mut backward = hist(20, 0.0, 10.0);
        values.iter().for_each(|&x| forward.fill(x));
        values.iter().rev().for_each(|&x| backward.fill(x));
        assert_eq!(forward, backward);
    }

    #[test]
    fn weighted_fill() {
        let mut h = hist(4, 0.0, 4.0);
        h.fill_weighted(1.5, 2.5);
        assert_eq!(h.contents, vec![0.0, 2.5, 0.0, 0.0]);
        assert_eq!(h.entries, 1);
    }

    #[test]
    fn merge_matches_sequential_fill() {
        let values: Vec<f64> = (0..200).map(|i| (i as f64 * 0.37) % 12.0 - 1.0).collect();
        let mut whole = hist(12, 0.0, 10.0);
        values.iter().for_each(|&x| whole.fill(x));

        let (left, right) = values.split_at(77);
        let mut a = hist(12, 0.0, 10.0);
        let mut b = hist(12, 0.0, 10.0);
        left.iter().for_each(|&x| a.fill(x));
        right.iter().for_each(|&x| b.fill(x));

        let mut ab = a.clone();
        ab.merge(&b).unwrap();
        let mut ba = b.clone();
        ba.merge(&a).unwrap();
        assert_eq!(ab, whole);
        assert_eq!(ba, whole);
    }

    #[test]
    fn merge_rejects_different_binning() {
        let mut a = hist(10, 0.0, 10.0);
        let b = hist(10, 0.0, 20.0);
        assert!(matches!(a.merge(&b), Err(HistogramError::BinningMismatch { .. })));
    }

    #[test]
    fn difference_carries_poisson_errors() {
        let mut pos = hist(2, 0.0, 2.0);
        let mut neg = hist(2, 0.0, 2.0);
        for _ in 0..9 {
            pos.fill(0.5);
        }
        for _ in 0..7 {
            neg.fill(0.5);
        }
        neg.fill(1.5);

        let diff = Histogram::difference("h_diff", &pos, &neg).unwrap();
        assert_eq!(diff.name, "h_diff");
        assert_eq!(diff.contents, vec![2.0, -1.0]);
        assert_eq!(diff.errors, Some(vec![4.0, 1.0]));
        assert!(diff.validate().is_ok());
    }

    #[test]
    fn validate_catches_length_mismatch() {
        let mut h = hist(3, 0.0, 3.0);
        h.contents.pop();
        assert!(matches!(h.validate(), Err(HistogramError::ContentLength { found: 2, .. })));
    }

    #[test]
    fn bin_geometry() {
        let h = hist(100, 8.5, 12.5);
        assert!((h.bin_width() - 0.04).abs() < 1e-12);
        assert!((h.bin_center(0) - 8.52).abs() < 1e-12);
    }
}
