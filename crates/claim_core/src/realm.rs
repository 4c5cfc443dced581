//! Composition root for one game world.
//!
//! A [`Realm`] owns explicit instances of every engine component and reads
//! its [`Clock`] once per operation. Embedders create as many realms as they
//! need; nothing is global.

use std::sync::Arc;

use crate::buildings::{BuildingEngine, ConstructionOrder, PlayerBuilding};
use crate::capture::{CaptureSession, CaptureSessions};
use crate::catalog::BuildingCatalog;
use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::error::{CaptureError, ClaimError, LifecycleError, RegistryError, Result};
use crate::facade::PlayerHandle;
use crate::ids::{BuildingId, OwnerId, SessionId, TerritoryId, Timestamp};
use crate::ledger::ResourceLedger;
use crate::snapshot::{RealmSnapshot, SNAPSHOT_VERSION};
use crate::territory::{Territory, TerritoryRegistry};
use crate::track::{FixDecision, TrackFilter, TrackPoint};

/// Territory capture and building engine wired together.
pub struct Realm {
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    catalog: Arc<BuildingCatalog>,
    ledger: Arc<ResourceLedger>,
    registry: Arc<TerritoryRegistry>,
    buildings: BuildingEngine,
    captures: CaptureSessions,
}

impl std::fmt::Debug for Realm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Realm")
            .field("config", &self.config)
            .field("territories", &self.registry.len())
            .field("buildings", &self.buildings.len())
            .field("captures", &self.captures.active_count())
            .finish_non_exhaustive()
    }
}

impl Realm {
    /// Create an empty realm.
    #[must_use]
    pub fn new(config: EngineConfig, catalog: BuildingCatalog, clock: Arc<dyn Clock>) -> Self {
        let catalog = Arc::new(catalog);
        let ledger = Arc::new(ResourceLedger::new());
        let registry = Arc::new(TerritoryRegistry::new(config.territory));
        let buildings = BuildingEngine::new(
            Arc::clone(&catalog),
            Arc::clone(&ledger),
            Arc::clone(&registry),
        );
        Self::assemble(config, clock, catalog, ledger, registry, buildings)
    }

    /// Rebuild a realm from a snapshot.
    pub fn restore(
        config: EngineConfig,
        catalog: BuildingCatalog,
        clock: Arc<dyn Clock>,
        snapshot: RealmSnapshot,
    ) -> Result<Self> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(ClaimError::Snapshot(format!(
                "Snapshot version mismatch: expected {SNAPSHOT_VERSION}, got {}",
                snapshot.version
            )));
        }

        let catalog = Arc::new(catalog);
        let ledger = Arc::new(ResourceLedger::from_balances(snapshot.balances));
        let registry = Arc::new(TerritoryRegistry::from_parts(
            config.territory,
            snapshot.territories,
            snapshot.next_territory_id,
        ));
        let buildings = BuildingEngine::from_parts(
            Arc::clone(&catalog),
            Arc::clone(&ledger),
            Arc::clone(&registry),
            snapshot.buildings,
            snapshot.next_building_id,
        );

        tracing::info!(
            territories = registry.len(),
            buildings = buildings.len(),
            "Realm restored"
        );
        Ok(Self::assemble(config, clock, catalog, ledger, registry, buildings))
    }

    fn assemble(
        config: EngineConfig,
        clock: Arc<dyn Clock>,
        catalog: Arc<BuildingCatalog>,
        ledger: Arc<ResourceLedger>,
        registry: Arc<TerritoryRegistry>,
        buildings: BuildingEngine,
    ) -> Self {
        let captures = CaptureSessions::new(TrackFilter::new(config.filter), config.capture);
        Self {
            config,
            clock,
            catalog,
            ledger,
            registry,
            buildings,
            captures,
        }
    }

    /// Current time from the realm's clock.
    #[must_use]
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Engine configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Building template catalog.
    #[must_use]
    pub fn catalog(&self) -> &BuildingCatalog {
        &self.catalog
    }

    /// Resource ledger.
    #[must_use]
    pub fn ledger(&self) -> &ResourceLedger {
        &self.ledger
    }

    /// Territory registry.
    #[must_use]
    pub fn registry(&self) -> &TerritoryRegistry {
        &self.registry
    }

    /// Building engine.
    #[must_use]
    pub const fn buildings(&self) -> &BuildingEngine {
        &self.buildings
    }

    /// Open capture sessions.
    #[must_use]
    pub const fn captures(&self) -> &CaptureSessions {
        &self.captures
    }

    /// Command/query surface scoped to one player.
    #[must_use]
    pub const fn player(&self, owner: OwnerId) -> PlayerHandle<'_> {
        PlayerHandle::new(self, owner)
    }

    // ------------------------------------------------------------------------
    // Capture
    // ------------------------------------------------------------------------

    /// Open a capture session for `owner`.
    pub fn start_capture(&self, owner: OwnerId) -> std::result::Result<SessionId, CaptureError> {
        self.captures.start(owner, self.now())
    }

    /// Feed a fix into the owner's capture.
    pub fn add_fix(
        &self,
        owner: OwnerId,
        fix: TrackPoint,
    ) -> std::result::Result<FixDecision, CaptureError> {
        self.captures.add_fix(owner, fix)
    }

    /// Close the owner's capture and commit the territory.
    pub fn close_capture(&self, owner: OwnerId) -> std::result::Result<Territory, CaptureError> {
        self.captures.close(owner, &self.registry, self.now())
    }

    /// Abort the owner's capture, if any.
    pub fn abort_capture(&self, owner: OwnerId) -> bool {
        self.captures.abort(owner)
    }

    /// Copy of the owner's open capture.
    #[must_use]
    pub fn capture_session(&self, owner: OwnerId) -> Option<CaptureSession> {
        self.captures.session(owner)
    }

    /// Abort captures with no accepted fix for `max_idle_secs`.
    pub fn abort_stale_captures(&self, max_idle_secs: u64) -> Vec<OwnerId> {
        self.captures.abort_stale(self.now(), max_idle_secs)
    }

    // ------------------------------------------------------------------------
    // Territories and buildings
    // ------------------------------------------------------------------------

    /// Delete a territory and every building inside it. Nothing is refunded.
    ///
    /// Returns the removed building ids.
    pub fn delete_territory(
        &self,
        owner: OwnerId,
        territory: TerritoryId,
    ) -> std::result::Result<Vec<BuildingId>, RegistryError> {
        self.registry.delete(territory, owner)?;
        Ok(self.buildings.purge_territory(territory))
    }

    /// Start a level-1 building.
    pub fn start_construction(
        &self,
        owner: OwnerId,
        order: ConstructionOrder,
    ) -> std::result::Result<PlayerBuilding, LifecycleError> {
        self.buildings.start_construction(owner, order, self.now())
    }

    /// Start an upgrade to the next level.
    pub fn upgrade(
        &self,
        owner: OwnerId,
        building: BuildingId,
    ) -> std::result::Result<PlayerBuilding, LifecycleError> {
        self.buildings.upgrade(owner, building, self.now())
    }

    /// Demolish a building.
    pub fn demolish(
        &self,
        owner: OwnerId,
        building: BuildingId,
    ) -> std::result::Result<PlayerBuilding, LifecycleError> {
        self.buildings.demolish(owner, building)
    }

    /// Progress of a building's current phase.
    pub fn progress(&self, building: BuildingId) -> std::result::Result<f64, LifecycleError> {
        self.buildings.progress(building, self.now())
    }

    // ------------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------------

    /// Copy the persistent state.
    ///
    /// Components are exported one after another, so a snapshot taken while
    /// other threads mutate the realm may straddle those mutations.
    #[must_use]
    pub fn snapshot(&self) -> RealmSnapshot {
        let (territories, next_territory_id) = self.registry.export();
        let (buildings, next_building_id) = self.buildings.export();
        RealmSnapshot {
            version: SNAPSHOT_VERSION,
            taken_at: self.now(),
            territories,
            next_territory_id,
            buildings,
            next_building_id,
            balances: self.ledger.export(),
        }
    }
}
