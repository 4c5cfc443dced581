//! # Claim Core
//!
//! Territory capture and building lifecycle engine for a location-based game.
//!
//! Players walk a closed loop with their device; the filtered GPS fixes
//! become a polygon that is committed as a territory if it is simple, large
//! enough and overlaps no other territory. Inside their territories players
//! spend resources on buildings whose construction and upgrades complete
//! over wall-clock time.
//!
//! This crate contains **only** engine logic:
//! - No rendering or UI
//! - No network or persistence transport
//! - No background threads or timers (time is always passed in)
//!
//! ## Crate Structure
//!
//! - [`track`] - Location fixes and the fix filter
//! - [`capture`] - Capture session state machine
//! - [`geometry`] - Polygon predicates in a local planar frame
//! - [`territory`] - Territory registry with the no-overlap rule
//! - [`buildings`] - Read-time construction and upgrades
//! - [`ledger`] - Atomic per-player resource balances
//! - [`realm`] - Composition of all of the above

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod buildings;
pub mod capture;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod error;
pub mod facade;
pub mod geo;
pub mod geometry;
pub mod ids;
pub mod ledger;
pub mod realm;
pub mod snapshot;
pub mod territory;
pub mod track;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::buildings::{BuildingEngine, BuildingStatus, ConstructionOrder, PlayerBuilding};
    pub use crate::capture::{CaptureSession, CaptureSessions, CaptureState};
    pub use crate::catalog::{BuildingCatalog, BuildingCategory, BuildingTemplate};
    pub use crate::clock::{Clock, SystemClock};
    pub use crate::config::{CaptureConfig, EngineConfig, FilterConfig, TerritoryConfig};
    pub use crate::error::{
        CaptureError, ClaimError, LedgerError, LifecycleError, RegistryError, Result, Shortfall,
    };
    pub use crate::facade::{PlayerFacade, PlayerHandle};
    pub use crate::geo::{LatLon, LocalFrame, Vec2};
    pub use crate::ids::{
        BuildingId, OwnerId, ResourceCost, ResourceId, SessionId, TemplateId, TerritoryId,
        Timestamp,
    };
    pub use crate::ledger::{Balances, ResourceLedger};
    pub use crate::realm::Realm;
    pub use crate::snapshot::RealmSnapshot;
    pub use crate::territory::{Territory, TerritoryRegistry};
    pub use crate::track::{FixDecision, RejectReason, TrackFilter, TrackPoint};
}
