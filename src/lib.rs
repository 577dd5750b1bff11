//! Dimuon mass and transverse-momentum spectra from the CMS 2010 open data.
//!
//! `cms-dimuon` runs the [`pipeline`] and optionally opens the viewer in
//! [`app`]; `generate_sample` writes synthetic input in the same CSV layout.

pub mod app;
pub mod color;
pub mod config;
pub mod data;
pub mod error;
pub mod pipeline;
pub mod state;
pub mod ui;
