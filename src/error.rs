use std::path::PathBuf;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Record parsing
// ---------------------------------------------------------------------------

/// A data line that cannot be turned into two muon observations.
#[derive(Debug, Error, PartialEq)]
pub enum RecordError {
    #[error("line {line}: expected at least {expected} fields, found {found}")]
    TooFewFields {
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("line {line}, field {field}: '{value}' is not a number")]
    NotANumber {
        line: u64,
        field: usize,
        value: String,
    },

    #[error("line {line}, field {field}: charge must be +1 or -1, got '{value}'")]
    InvalidCharge {
        line: u64,
        field: usize,
        value: String,
    },
}

// ---------------------------------------------------------------------------
// Histograms
// ---------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq)]
pub enum HistogramError {
    #[error("histogram '{name}': invalid binning ({bins} bins over [{lower}, {upper}))")]
    InvalidBinning {
        name: String,
        bins: usize,
        lower: f64,
        upper: f64,
    },

    #[error("cannot combine '{left}' and '{right}': binning differs")]
    BinningMismatch { left: String, right: String },

    #[error("histogram '{name}' is not booked")]
    Missing { name: String },

    #[error("histogram '{name}': {found} bin values for {bins} bins")]
    ContentLength {
        name: String,
        bins: usize,
        found: usize,
    },
}

// ---------------------------------------------------------------------------
// Aggregate store
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("bundle {path} is unavailable: {source}")]
    Unavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("bundle {path} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("failed to write bundle {path}: {reason}")]
    Write { path: PathBuf, reason: String },
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Fatal errors for a pipeline run.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("malformed record: {0}")]
    MalformedRecord(#[from] RecordError),

    #[error("reading input {path}: {source}")]
    Input {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error(transparent)]
    Histogram(#[from] HistogramError),

    #[error("invalid configuration: {0}")]
    Config(String),
}
