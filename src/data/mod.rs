/// Data layer: observations, ingestion, aggregation and persistence.
///
/// Architecture:
/// ```text
///  MuRun2010B.csv
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse row → (Muon, Muon) → Dimuon
///   └──────────┘
///        │
///        ▼
///   ┌────────────────┐
///   │ HistogramBundle │  fill mass / pT histograms by name
///   └────────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  store    │  <key>.json, read back on the next run
///   └──────────┘
/// ```

pub mod bundle;
pub mod histogram;
pub mod loader;
pub mod model;
pub mod store;
