//! Error types for the capture and building engine.
//!
//! Every component returns its own focused error so callers can match on
//! the exact failure kind. [`ClaimError`] aggregates them for code that
//! only needs to propagate.

use thiserror::Error;

use crate::capture::CaptureState;
use crate::ids::{BuildingId, OwnerId, ResourceId, TemplateId, TerritoryId};

/// Result type alias using [`ClaimError`].
pub type Result<T> = std::result::Result<T, ClaimError>;

/// A single resource the owner is short of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shortfall {
    /// Resource that is short.
    pub resource: ResourceId,
    /// Quantity required by the cost.
    pub required: u64,
    /// Quantity currently held.
    pub available: u64,
}

/// Errors raised while walking and closing a capture.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CaptureError {
    /// Fewer distinct points than a polygon needs.
    #[error("Insufficient points: have {found}, need {required}")]
    InsufficientPoints {
        /// Distinct points in the path.
        found: usize,
        /// Minimum required.
        required: usize,
    },

    /// The last point is too far from the first to close the loop.
    #[error("Path not closed: gap {gap_m:.1} m exceeds tolerance {tolerance_m:.1} m")]
    NotClosed {
        /// Distance from the last point back to the first.
        gap_m: f64,
        /// Configured closure tolerance.
        tolerance_m: f64,
    },

    /// Self-intersecting or degenerate polygon.
    #[error("Invalid polygon: self-intersecting or degenerate")]
    InvalidPolygon,

    /// Enclosed area is below the configured minimum.
    #[error("Territory too small: {area_m2:.1} m² < {minimum_m2:.1} m²")]
    TooSmall {
        /// Enclosed area.
        area_m2: f64,
        /// Configured minimum.
        minimum_m2: f64,
    },

    /// The polygon shares interior area with a committed territory.
    #[error("Overlaps existing territory {existing}")]
    Overlap {
        /// Territory that was hit first.
        existing: TerritoryId,
    },

    /// Operation requires the session to be tracking.
    #[error("Capture session is {state:?}, expected Tracking")]
    NotTracking {
        /// Current state.
        state: CaptureState,
    },

    /// The session has already left `Idle`.
    #[error("Capture session is {state:?}, expected Idle")]
    AlreadyStarted {
        /// Current state.
        state: CaptureState,
    },

    /// The player already has an open capture.
    #[error("Player {0} already has an active capture session")]
    AlreadyCapturing(OwnerId),

    /// The player has no open capture.
    #[error("Player {0} has no active capture session")]
    NoActiveSession(OwnerId),

    /// Registry failure with no capture-specific meaning.
    #[error(transparent)]
    Registry(RegistryError),
}

/// Errors raised by the territory registry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistryError {
    /// Self-intersecting or degenerate polygon.
    #[error("Invalid polygon: self-intersecting or degenerate")]
    InvalidPolygon,

    /// Enclosed area is below the configured minimum.
    #[error("Territory too small: {area_m2:.1} m² < {minimum_m2:.1} m²")]
    TooSmall {
        /// Enclosed area.
        area_m2: f64,
        /// Configured minimum.
        minimum_m2: f64,
    },

    /// The polygon shares interior area with a committed territory.
    #[error("Overlaps existing territory {existing}")]
    Overlap {
        /// Territory that was hit first.
        existing: TerritoryId,
    },

    /// No such territory.
    #[error("Territory not found: {0}")]
    NotFound(TerritoryId),

    /// The requester does not own the territory.
    #[error("Player {owner} does not own territory {territory}")]
    NotOwner {
        /// Territory in question.
        territory: TerritoryId,
        /// Requesting player.
        owner: OwnerId,
    },
}

impl From<RegistryError> for CaptureError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::InvalidPolygon => Self::InvalidPolygon,
            RegistryError::TooSmall {
                area_m2,
                minimum_m2,
            } => Self::TooSmall {
                area_m2,
                minimum_m2,
            },
            RegistryError::Overlap { existing } => Self::Overlap { existing },
            other => Self::Registry(other),
        }
    }
}

/// Errors raised by the resource ledger.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// At least one resource is short; nothing was debited.
    #[error("Insufficient resources: {}", describe_shortfalls(.0))]
    InsufficientResources(Vec<Shortfall>),
}

/// Errors raised by the building lifecycle engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    /// Unknown building template.
    #[error("Building template not found: {0}")]
    TemplateNotFound(TemplateId),

    /// Unknown territory.
    #[error("Territory not found: {0}")]
    TerritoryNotFound(TerritoryId),

    /// Unknown building.
    #[error("Building not found: {0}")]
    NotFound(BuildingId),

    /// The requester does not own the territory or building.
    #[error("Player {0} is not the owner")]
    NotOwner(OwnerId),

    /// Template already at its per-territory limit.
    #[error("Territory {territory} already holds {limit} of {template}")]
    MaxPerTerritoryReached {
        /// Territory in question.
        territory: TerritoryId,
        /// Template in question.
        template: TemplateId,
        /// Configured limit.
        limit: u32,
    },

    /// The building site is not inside the target territory.
    #[error("Building site lies outside territory {0}")]
    OutsideTerritory(TerritoryId),

    /// Building is still under construction or upgrade.
    #[error("Building {0} is not active")]
    NotActive(BuildingId),

    /// Building is already at the template's maximum level.
    #[error("Building {building} is already at max level {max_level}")]
    MaxLevelReached {
        /// Building in question.
        building: BuildingId,
        /// Template maximum.
        max_level: u32,
    },

    /// The template has no cost or time entry for the requested level.
    #[error("Template {template} has no data for level {level}")]
    MissingLevelData {
        /// Template in question.
        template: TemplateId,
        /// Requested level.
        level: u32,
    },

    /// Owner cannot pay the cost; nothing was debited.
    #[error("Insufficient resources: {}", describe_shortfalls(.0))]
    InsufficientResources(Vec<Shortfall>),
}

impl From<LedgerError> for LifecycleError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientResources(shortfalls) => {
                Self::InsufficientResources(shortfalls)
            }
        }
    }
}

/// Top-level error type for everything the crate can fail with.
#[derive(Debug, Error)]
pub enum ClaimError {
    /// Capture failure.
    #[error(transparent)]
    Capture(#[from] CaptureError),

    /// Registry failure.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Ledger failure.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Building lifecycle failure.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// Data file parsing error.
    #[error("Failed to parse data file '{path}': {message}")]
    DataParse {
        /// Path to the file that failed to parse.
        path: String,
        /// Error message.
        message: String,
    },

    /// File could not be read or written.
    #[error("IO error on '{path}': {source}")]
    Io {
        /// Path involved.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Snapshot could not be encoded or decoded.
    #[error("Snapshot error: {0}")]
    Snapshot(String),
}

fn describe_shortfalls(shortfalls: &[Shortfall]) -> String {
    shortfalls
        .iter()
        .map(|s| format!("need {} {}, have {}", s.required, s.resource, s.available))
        .collect::<Vec<_>>()
        .join("; ")
}
