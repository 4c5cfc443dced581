//! Per-player command/query interface.
//!
//! The presentation layer, bots and tests all drive the engine through
//! [`PlayerFacade`]. Every call is scoped to the facade's owner: there is
//! no way to act on another player's sessions, territories or buildings.
//! Live views are obtained by querying again, never by subscription.

use crate::buildings::{ConstructionOrder, PlayerBuilding};
use crate::capture::CaptureSession;
use crate::error::{CaptureError, LifecycleError, RegistryError};
use crate::geo::LatLon;
use crate::ids::{BuildingId, OwnerId, ResourceCost, SessionId, TerritoryId};
use crate::ledger::Balances;
use crate::realm::Realm;
use crate::territory::Territory;
use crate::track::{FixDecision, TrackPoint};

/// What one player can do and see.
pub trait PlayerFacade {
    /// Player this facade acts for.
    fn owner(&self) -> OwnerId;

    /// Begin walking a new territory boundary.
    fn start_capture(&self) -> Result<SessionId, CaptureError>;

    /// Report a location fix for the open capture.
    fn record_fix(&self, fix: TrackPoint) -> Result<FixDecision, CaptureError>;

    /// Report several fixes in order, stopping at the first error.
    ///
    /// Returns how many were accepted.
    fn record_fixes(&self, fixes: &[TrackPoint]) -> Result<usize, CaptureError> {
        let mut accepted = 0;
        for fix in fixes {
            if self.record_fix(*fix)?.is_accepted() {
                accepted += 1;
            }
        }
        Ok(accepted)
    }

    /// Close the open capture and claim the enclosed land.
    fn close_capture(&self) -> Result<Territory, CaptureError>;

    /// Abandon the open capture. Returns whether one was open.
    fn abort_capture(&self) -> bool;

    /// Current state of the open capture.
    fn capture(&self) -> Option<CaptureSession>;

    /// Territories this player owns.
    fn territories(&self) -> Vec<Territory>;

    /// Territory under a coordinate, whoever owns it.
    fn territory_at(&self, point: LatLon) -> Option<Territory>;

    /// Give up a territory along with its buildings.
    fn delete_territory(&self, territory: TerritoryId) -> Result<Vec<BuildingId>, RegistryError>;

    /// Start a new building.
    fn construct(&self, order: ConstructionOrder) -> Result<PlayerBuilding, LifecycleError>;

    /// Upgrade one of this player's buildings.
    fn upgrade(&self, building: BuildingId) -> Result<PlayerBuilding, LifecycleError>;

    /// Demolish one of this player's buildings.
    fn demolish(&self, building: BuildingId) -> Result<PlayerBuilding, LifecycleError>;

    /// This player's buildings, with completions applied.
    fn buildings(&self) -> Vec<PlayerBuilding>;

    /// This player's buildings in one territory.
    fn buildings_in(&self, territory: TerritoryId) -> Vec<PlayerBuilding> {
        self.buildings()
            .into_iter()
            .filter(|b| b.territory == territory)
            .collect()
    }

    /// Current resource balances.
    fn balances(&self) -> Balances;

    /// Check if a cost is payable right now.
    fn can_afford(&self, cost: &ResourceCost) -> bool;
}

/// [`PlayerFacade`] over a borrowed [`Realm`].
#[derive(Debug, Clone, Copy)]
pub struct PlayerHandle<'a> {
    realm: &'a Realm,
    owner: OwnerId,
}

impl<'a> PlayerHandle<'a> {
    /// Scope `realm` to `owner`.
    #[must_use]
    pub const fn new(realm: &'a Realm, owner: OwnerId) -> Self {
        Self { realm, owner }
    }
}

impl PlayerFacade for PlayerHandle<'_> {
    fn owner(&self) -> OwnerId {
        self.owner
    }

    fn start_capture(&self) -> Result<SessionId, CaptureError> {
        self.realm.start_capture(self.owner)
    }

    fn record_fix(&self, fix: TrackPoint) -> Result<FixDecision, CaptureError> {
        self.realm.add_fix(self.owner, fix)
    }

    fn close_capture(&self) -> Result<Territory, CaptureError> {
        self.realm.close_capture(self.owner)
    }

    fn abort_capture(&self) -> bool {
        self.realm.abort_capture(self.owner)
    }

    fn capture(&self) -> Option<CaptureSession> {
        self.realm.capture_session(self.owner)
    }

    fn territories(&self) -> Vec<Territory> {
        self.realm.registry().owned_by(self.owner)
    }

    fn territory_at(&self, point: LatLon) -> Option<Territory> {
        self.realm.registry().find_containing(point)
    }

    fn delete_territory(&self, territory: TerritoryId) -> Result<Vec<BuildingId>, RegistryError> {
        self.realm.delete_territory(self.owner, territory)
    }

    fn construct(&self, order: ConstructionOrder) -> Result<PlayerBuilding, LifecycleError> {
        self.realm.start_construction(self.owner, order)
    }

    fn upgrade(&self, building: BuildingId) -> Result<PlayerBuilding, LifecycleError> {
        self.realm.upgrade(self.owner, building)
    }

    fn demolish(&self, building: BuildingId) -> Result<PlayerBuilding, LifecycleError> {
        self.realm.demolish(self.owner, building)
    }

    fn buildings(&self) -> Vec<PlayerBuilding> {
        self.realm
            .buildings()
            .buildings_of(self.owner, self.realm.now())
    }

    fn balances(&self) -> Balances {
        self.realm.ledger().balances(self.owner)
    }

    fn can_afford(&self, cost: &ResourceCost) -> bool {
        self.realm.ledger().can_afford(self.owner, cost)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{BuildingCatalog, BuildingCategory, BuildingTemplate};
    use crate::clock::SystemClock;
    use crate::config::EngineConfig;
    use crate::geo::{LocalFrame, Vec2};
    use crate::ids::{cost, TemplateId};
    use std::sync::Arc;

    fn realm() -> Realm {
        let catalog = BuildingCatalog::new([BuildingTemplate {
            id: TemplateId::from("well"),
            name: "building.well.name".to_string(),
            category: BuildingCategory::Utility,
            tier: 1,
            max_level: 1,
            build_time_secs_by_level: vec![0],
            required_resources_by_level: vec![cost([("stone", 5)])],
            max_per_territory: 1,
            tags: Vec::new(),
        }]);
        Realm::new(EngineConfig::default(), catalog, Arc::new(SystemClock))
    }

    fn square(x: f64) -> Vec<TrackPoint> {
        let frame = LocalFrame::new(LatLon::new(52.52, 13.40));
        [(0.0, 0.0), (30.0, 0.0), (30.0, 30.0), (0.0, 30.0)]
            .iter()
            .enumerate()
            .map(|(i, (dx, dy))| {
                let p = frame.unproject(Vec2::new(x + dx, *dy));
                TrackPoint::new(p.lat, p.lon, 100 + 20 * i as u64, 3.0)
            })
            .collect()
    }

    #[test]
    fn test_player_flow_through_facade() {
        let realm = realm();
        let alice = realm.player(OwnerId::new(1));
        realm.ledger().credit(alice.owner(), "stone", 5);

        alice.start_capture().expect("start");
        assert_eq!(alice.record_fixes(&square(0.0)).expect("tracking"), 4);
        assert_eq!(alice.capture().map(|s| s.path().len()), Some(4));
        let territory = alice.close_capture().expect("close");
        assert!(alice.capture().is_none());

        assert!(alice.can_afford(&cost([("stone", 5)])));
        let well = alice
            .construct(ConstructionOrder::new(territory.id, "well"))
            .expect("construct");
        let listed = alice.buildings_in(territory.id);
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, well.id);
        // Zero build time: the first read completes it
        assert!(listed[0].is_active());
        assert!(alice.balances().values().all(|q| *q == 0));
        assert_eq!(alice.territories().len(), 1);
        assert_eq!(
            alice.territory_at(territory.centroid).map(|t| t.id),
            Some(territory.id)
        );
    }

    #[test]
    fn test_handles_are_scoped_to_owner() {
        let realm = realm();
        let alice = realm.player(OwnerId::new(1));
        let bob = realm.player(OwnerId::new(2));

        alice.start_capture().expect("start");
        alice.record_fixes(&square(0.0)).expect("tracking");
        let territory = alice.close_capture().expect("close");

        assert!(bob.territories().is_empty());
        assert!(bob.capture().is_none());
        assert!(!bob.abort_capture());
        assert!(matches!(
            bob.delete_territory(territory.id),
            Err(RegistryError::NotOwner { .. })
        ));
        assert!(matches!(
            bob.construct(ConstructionOrder::new(territory.id, "well")),
            Err(LifecycleError::NotOwner(_))
        ));
    }
}
