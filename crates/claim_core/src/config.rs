//! Tunable thresholds for fix filtering, capture closure and territory validity.
//!
//! All values are data, loadable from RON. Defaults are the tuned values
//! used in production.
//!
//! # Example RON
//!
//! ```ron
//! EngineConfig(
//!     filter: (max_accuracy_m: 25.0),
//!     capture: (closure_tolerance_m: 40.0),
//!     territory: (min_area_m2: 250.0),
//! )
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ClaimError, Result};

/// Thresholds for [`crate::track::TrackFilter`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Fixes with a horizontal accuracy worse than this are dropped.
    pub max_accuracy_m: f64,
    /// Fixes arriving sooner than this after the last accepted one...
    pub min_interval_secs: u64,
    /// ...and closer than this to it are treated as stationary noise.
    pub min_displacement_m: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            max_accuracy_m: 30.0,
            min_interval_secs: 2,
            min_displacement_m: 3.0,
        }
    }
}

/// Thresholds for closing a [`crate::capture::CaptureSession`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Maximum gap between the last and first point that still closes the loop.
    pub closure_tolerance_m: f64,
    /// Minimum number of distinct points in a closable path.
    pub min_points: usize,
    /// Vertex cap per capture; longer paths are simplified before validation.
    pub max_vertices: usize,
    /// Initial segment length used when simplifying an over-long path.
    pub simplify_min_segment_m: f64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            closure_tolerance_m: 60.0,
            min_points: 3,
            max_vertices: 2000,
            simplify_min_segment_m: 2.0,
        }
    }
}

/// Validity thresholds enforced by [`crate::territory::TerritoryRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerritoryConfig {
    /// Minimum enclosed area for a committed territory.
    pub min_area_m2: f64,
}

impl Default for TerritoryConfig {
    fn default() -> Self {
        Self { min_area_m2: 100.0 }
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Fix filter thresholds.
    pub filter: FilterConfig,
    /// Capture closure thresholds.
    pub capture: CaptureConfig,
    /// Territory validity thresholds.
    pub territory: TerritoryConfig,
}

impl EngineConfig {
    /// Parse a configuration from a RON string.
    ///
    /// Omitted fields fall back to their defaults.
    pub fn from_ron_str(source: &str) -> Result<Self> {
        ron::from_str(source).map_err(|e| ClaimError::DataParse {
            path: "<inline>".to_string(),
            message: e.to_string(),
        })
    }

    /// Load a configuration from a RON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ClaimError::Io {
            path: path.display().to_string(),
            source,
        })?;
        ron::from_str(&contents).map_err(|e| ClaimError::DataParse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }
}
