use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::bundle::HistogramBundle;
use crate::error::StoreError;

/// Bumped whenever the on-disk layout changes; other versions read as corrupt.
pub const FORMAT_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Store interface
// ---------------------------------------------------------------------------

/// Keyed persistence for finished bundles.
pub trait BundleStore {
    /// `Ok(None)` when nothing is stored under `key`.
    fn load(&self, key: &str) -> Result<Option<HistogramBundle>, StoreError>;

    fn save(&self, key: &str, bundle: &HistogramBundle) -> Result<(), StoreError>;
}

#[derive(Serialize)]
struct BundleFileRef<'a> {
    format_version: u32,
    bundle: &'a HistogramBundle,
}

#[derive(Deserialize)]
struct BundleFile {
    format_version: u32,
    bundle: HistogramBundle,
}

// ---------------------------------------------------------------------------
// JSON file store
// ---------------------------------------------------------------------------

/// One pretty-printed JSON file per key: `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl BundleStore for JsonFileStore {
    fn load(&self, key: &str) -> Result<Option<HistogramBundle>, StoreError> {
        let path = self.path_for(key);
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StoreError::Unavailable { path, source }),
        };

        let file: BundleFile = serde_json::from_str(&text).map_err(|e| corrupt(&path, e))?;
        if file.format_version != FORMAT_VERSION {
            return Err(corrupt(
                &path,
                format!("format version {}, expected {FORMAT_VERSION}", file.format_version),
            ));
        }
        for h in file.bundle.histograms() {
            h.validate().map_err(|e| corrupt(&path, e))?;
        }
        Ok(Some(file.bundle))
    }

    fn save(&self, key: &str, bundle: &HistogramBundle) -> Result<(), StoreError> {
        let path = self.path_for(key);
        let write_err = |reason: String| StoreError::Write {
            path: path.clone(),
            reason,
        };

        let json = serde_json::to_string_pretty(&BundleFileRef {
            format_version: FORMAT_VERSION,
            bundle,
        })
        .map_err(|e| write_err(e.to_string()))?;

        std::fs::create_dir_all(&self.dir).map_err(|e| write_err(format!("creating {}: {e}", self.dir.display())))?;

        // Write next to the target and rename, so readers never see half a file.
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|e| write_err(e.to_string()))?;
        std::fs::rename(&tmp, &path).map_err(|e| {
            let _ = std::fs::remove_file(&tmp);
            write_err(e.to_string())
        })?;

        log::debug!("saved {} histograms to {}", bundle.len(), path.display());
        Ok(())
    }
}

fn corrupt(path: &Path, reason: impl ToString) -> StoreError {
    StoreError::Corrupt {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}
