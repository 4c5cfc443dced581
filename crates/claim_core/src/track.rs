//! Location fixes and the quality filter that gates them.
//!
//! The filter is stateless: the caller owns the last accepted fix and
//! passes it in with every decision.

use serde::{Deserialize, Serialize};

use crate::config::FilterConfig;
use crate::geo::LatLon;
use crate::ids::Timestamp;

/// One filtered location sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Capture time in seconds since the Unix epoch.
    pub timestamp: Timestamp,
    /// Reported horizontal accuracy radius in meters.
    pub accuracy_m: f64,
}

impl TrackPoint {
    /// Create a new fix.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64, timestamp: Timestamp, accuracy_m: f64) -> Self {
        Self {
            latitude,
            longitude,
            timestamp,
            accuracy_m,
        }
    }

    /// Fix position as a coordinate.
    #[must_use]
    pub const fn position(&self) -> LatLon {
        LatLon::new(self.latitude, self.longitude)
    }

    /// Great-circle distance to another fix in meters.
    #[must_use]
    pub fn distance_m(&self, other: &Self) -> f64 {
        self.position().haversine_m(other.position())
    }
}

/// Why a fix was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RejectReason {
    /// Coordinates are not finite or out of range, or accuracy is negative.
    InvalidCoordinate,
    /// Horizontal accuracy is worse than the configured ceiling.
    LowAccuracy {
        /// Reported accuracy.
        accuracy_m: f64,
        /// Configured ceiling.
        ceiling_m: f64,
    },
    /// Fix is older than the last accepted one.
    OutOfOrder,
    /// Too soon and too close to the last accepted fix.
    Stationary {
        /// Seconds since the last accepted fix.
        elapsed_secs: u64,
        /// Distance from the last accepted fix.
        displacement_m: f64,
    },
}

/// Outcome of filtering a single fix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FixDecision {
    /// Fix should be appended to the path.
    Accepted,
    /// Fix should be dropped.
    Rejected(RejectReason),
}

impl FixDecision {
    /// Check if the fix was accepted.
    #[must_use]
    pub const fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// Rejects noisy and redundant fixes.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TrackFilter {
    config: FilterConfig,
}

impl TrackFilter {
    /// Create a filter with the given thresholds.
    #[must_use]
    pub const fn new(config: FilterConfig) -> Self {
        Self { config }
    }

    /// Thresholds in use.
    #[must_use]
    pub const fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// Decide whether `fix` should follow `last_accepted` in a path.
    #[must_use]
    pub fn evaluate(&self, fix: &TrackPoint, last_accepted: Option<&TrackPoint>) -> FixDecision {
        if !fix.position().is_valid() || !(fix.accuracy_m >= 0.0) {
            return FixDecision::Rejected(RejectReason::InvalidCoordinate);
        }

        if fix.accuracy_m > self.config.max_accuracy_m {
            return FixDecision::Rejected(RejectReason::LowAccuracy {
                accuracy_m: fix.accuracy_m,
                ceiling_m: self.config.max_accuracy_m,
            });
        }

        let Some(last) = last_accepted else {
            return FixDecision::Accepted;
        };

        if fix.timestamp < last.timestamp {
            return FixDecision::Rejected(RejectReason::OutOfOrder);
        }

        let elapsed_secs = fix.timestamp - last.timestamp;
        let displacement_m = fix.distance_m(last);
        if elapsed_secs < self.config.min_interval_secs
            && displacement_m < self.config.min_displacement_m
        {
            return FixDecision::Rejected(RejectReason::Stationary {
                elapsed_secs,
                displacement_m,
            });
        }

        FixDecision::Accepted
    }
}
