//! Calibration Factor Persistence

use crate::error::ScaleError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Storage for the calibration factor across restarts
pub trait FactorStore {
    /// Load the saved factor, if any
    fn load(&self) -> Result<Option<f64>, ScaleError>;

    /// Save `factor`
    fn save(&mut self, factor: f64) -> Result<(), ScaleError>;
}

impl<S: FactorStore + ?Sized> FactorStore for Box<S> {
    fn load(&self) -> Result<Option<f64>, ScaleError> {
        (**self).load()
    }

    fn save(&mut self, factor: f64) -> Result<(), ScaleError> {
        (**self).save(factor)
    }
}

/// In-memory store (lost on restart)
#[derive(Debug, Clone, Default)]
pub struct MemoryFactorStore {
    factor: Option<f64>,
}

impl MemoryFactorStore {
    /// Create a store pre-loaded with `factor`
    pub fn with_factor(factor: f64) -> Self {
        Self {
            factor: Some(factor),
        }
    }
}

impl FactorStore for MemoryFactorStore {
    fn load(&self) -> Result<Option<f64>, ScaleError> {
        Ok(self.factor)
    }

    fn save(&mut self, factor: f64) -> Result<(), ScaleError> {
        self.factor = Some(factor);
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct SavedFactor {
    calibration_factor: f64,
}

/// Store backed by a small JSON file
#[derive(Debug, Clone)]
pub struct JsonFactorStore {
    path: PathBuf,
}

impl JsonFactorStore {
    /// Create a store at `path`; the file is created on first save
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Backing file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FactorStore for JsonFactorStore {
    fn load(&self) -> Result<Option<f64>, ScaleError> {
        if !self.path.exists() {
            debug!("No saved calibration factor at {}", self.path.display());
            return Ok(None);
        }
        let text = fs::read_to_string(&self.path)?;
        let saved: SavedFactor = serde_json::from_str(&text)?;
        Ok(Some(saved.calibration_factor))
    }

    fn save(&mut self, factor: f64) -> Result<(), ScaleError> {
        let text = serde_json::to_string_pretty(&SavedFactor {
            calibration_factor: factor,
        })?;
        fs::write(&self.path, text)?;
        info!("Saved calibration factor {} to {}", factor, self.path.display());
        Ok(())
    }
}
