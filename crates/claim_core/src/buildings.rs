//! Building construction, upgrades and demolition.
//!
//! Progress is derived from stored timestamps and a caller-supplied `now`.
//! Nothing ticks: a building becomes `Active` the first time a read observes
//! `now >= build_completed_at`, and an upgrade bumps the level at that same
//! moment, exactly once.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::catalog::{BuildingCatalog, BuildingTemplate};
use crate::error::LifecycleError;
use crate::geo::LatLon;
use crate::ids::{BuildingId, OwnerId, ResourceCost, TemplateId, TerritoryId, Timestamp};
use crate::ledger::ResourceLedger;
use crate::territory::TerritoryRegistry;

// ============================================================================
// Records
// ============================================================================

/// Construction phase of a building.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildingStatus {
    /// Initial construction in progress.
    Constructing,
    /// Upgrade to the next level in progress; the current level still applies.
    Upgrading,
    /// Complete and usable.
    Active,
}

/// A building placed in a territory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerBuilding {
    /// Engine-issued identifier.
    pub id: BuildingId,
    /// Owning player.
    pub owner: OwnerId,
    /// Territory the building stands in.
    pub territory: TerritoryId,
    /// Catalog template.
    pub template: TemplateId,
    /// Player-chosen display name.
    pub name: String,
    /// Construction phase.
    pub status: BuildingStatus,
    /// Current level, starting at 1.
    pub level: u32,
    /// Optional placement coordinate inside the territory.
    pub site: Option<LatLon>,
    /// Start of the current construction or upgrade.
    pub build_started_at: Timestamp,
    /// End of the current construction or upgrade.
    pub build_completed_at: Option<Timestamp>,
}

impl PlayerBuilding {
    /// Check if the building is complete and usable.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == BuildingStatus::Active
    }

    /// Fraction of the current phase completed at `now`, in `[0, 1]`.
    #[must_use]
    pub fn progress(&self, now: Timestamp) -> f64 {
        if self.is_active() {
            return 1.0;
        }
        let Some(completed) = self.build_completed_at else {
            return 1.0;
        };
        if now >= completed {
            return 1.0;
        }
        if now <= self.build_started_at {
            return 0.0;
        }
        let elapsed = (now - self.build_started_at) as f64;
        let total = (completed - self.build_started_at) as f64;
        (elapsed / total).clamp(0.0, 1.0)
    }

    /// Seconds until the current phase completes.
    #[must_use]
    pub fn remaining_secs(&self, now: Timestamp) -> u64 {
        if self.is_active() {
            return 0;
        }
        self.build_completed_at
            .map_or(0, |completed| completed.saturating_sub(now))
    }

    /// Apply the completion transition if `now` has reached the end time.
    ///
    /// Returns whether the building changed.
    pub fn settle(&mut self, now: Timestamp) -> bool {
        if self.is_active() || self.progress(now) < 1.0 {
            return false;
        }
        if self.status == BuildingStatus::Upgrading {
            self.level += 1;
        }
        self.status = BuildingStatus::Active;
        tracing::debug!(building = %self.id, level = self.level, "Building completed");
        true
    }
}

/// Request to place a new building.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstructionOrder {
    /// Target territory.
    pub territory: TerritoryId,
    /// Catalog template to build.
    pub template: TemplateId,
    /// Display name.
    pub name: String,
    /// Optional site; must lie inside the target territory.
    pub site: Option<LatLon>,
}

impl ConstructionOrder {
    /// Order a building with no explicit site, named after its template.
    #[must_use]
    pub fn new(territory: TerritoryId, template: impl Into<TemplateId>) -> Self {
        let template = template.into();
        Self {
            territory,
            name: template.to_string(),
            template,
            site: None,
        }
    }

    /// Set the display name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the placement coordinate.
    #[must_use]
    pub const fn at(mut self, site: LatLon) -> Self {
        self.site = Some(site);
        self
    }
}

// ============================================================================
// Engine
// ============================================================================

#[derive(Debug, Default)]
struct BuildingBook {
    buildings: BTreeMap<BuildingId, PlayerBuilding>,
    next_id: u64,
}

impl BuildingBook {
    fn settled(&mut self, id: BuildingId, now: Timestamp) -> Result<&mut PlayerBuilding, LifecycleError> {
        let building = self
            .buildings
            .get_mut(&id)
            .ok_or(LifecycleError::NotFound(id))?;
        building.settle(now);
        Ok(building)
    }

    fn settle_all(&mut self, now: Timestamp) {
        for building in self.buildings.values_mut() {
            building.settle(now);
        }
    }
}

/// Resource-gated building lifecycle over a catalog, ledger and registry.
///
/// The book lock is held across the territory lookup and the ledger debit,
/// so a concurrent territory deletion either sees the new building and
/// purges it or makes the construction fail with `TerritoryNotFound`.
#[derive(Debug)]
pub struct BuildingEngine {
    catalog: Arc<BuildingCatalog>,
    ledger: Arc<ResourceLedger>,
    registry: Arc<TerritoryRegistry>,
    book: Mutex<BuildingBook>,
}

impl BuildingEngine {
    /// Create an engine with no buildings.
    #[must_use]
    pub fn new(
        catalog: Arc<BuildingCatalog>,
        ledger: Arc<ResourceLedger>,
        registry: Arc<TerritoryRegistry>,
    ) -> Self {
        Self::from_parts(catalog, ledger, registry, Vec::new(), 1)
    }

    /// Rebuild an engine from exported buildings.
    #[must_use]
    pub fn from_parts(
        catalog: Arc<BuildingCatalog>,
        ledger: Arc<ResourceLedger>,
        registry: Arc<TerritoryRegistry>,
        buildings: Vec<PlayerBuilding>,
        next_id: u64,
    ) -> Self {
        let highest = buildings.iter().map(|b| b.id.0).max().unwrap_or(0);
        Self {
            catalog,
            ledger,
            registry,
            book: Mutex::new(BuildingBook {
                buildings: buildings.into_iter().map(|b| (b.id, b)).collect(),
                next_id: next_id.max(highest + 1),
            }),
        }
    }

    /// Template catalog in use.
    #[must_use]
    pub fn catalog(&self) -> &BuildingCatalog {
        &self.catalog
    }

    fn template(&self, id: &TemplateId) -> Result<&BuildingTemplate, LifecycleError> {
        self.catalog
            .get(id)
            .ok_or_else(|| LifecycleError::TemplateNotFound(id.clone()))
    }

    /// Pay for and start a level-1 building.
    pub fn start_construction(
        &self,
        owner: OwnerId,
        order: ConstructionOrder,
        now: Timestamp,
    ) -> Result<PlayerBuilding, LifecycleError> {
        let template = self.template(&order.template)?;

        let mut book = self.book.lock().unwrap_or_else(PoisonError::into_inner);

        let territory = self
            .registry
            .get(order.territory)
            .ok_or(LifecycleError::TerritoryNotFound(order.territory))?;
        if territory.owner != owner {
            return Err(LifecycleError::NotOwner(owner));
        }

        if let Some(site) = order.site {
            let containing = self.registry.find_containing(site).map(|t| t.id);
            if containing != Some(territory.id) {
                return Err(LifecycleError::OutsideTerritory(territory.id));
            }
        }

        let existing = book
            .buildings
            .values()
            .filter(|b| b.territory == territory.id && b.template == template.id)
            .count();
        if existing >= template.max_per_territory as usize {
            return Err(LifecycleError::MaxPerTerritoryReached {
                territory: territory.id,
                template: template.id.clone(),
                limit: template.max_per_territory,
            });
        }

        let (cost, build_secs) = level_data(template, 1)?;
        self.ledger.debit_all(owner, cost)?;

        let id = BuildingId::new(book.next_id);
        book.next_id += 1;

        let building = PlayerBuilding {
            id,
            owner,
            territory: territory.id,
            template: template.id.clone(),
            name: order.name,
            status: BuildingStatus::Constructing,
            level: 1,
            site: order.site,
            build_started_at: now,
            build_completed_at: Some(now.saturating_add(build_secs)),
        };
        book.buildings.insert(id, building.clone());

        tracing::info!(
            %owner,
            building = %id,
            territory = %territory.id,
            template = %template.id,
            build_secs,
            "Construction started"
        );
        Ok(building)
    }

    /// Pay for and start the upgrade to the next level.
    pub fn upgrade(
        &self,
        owner: OwnerId,
        id: BuildingId,
        now: Timestamp,
    ) -> Result<PlayerBuilding, LifecycleError> {
        let mut book = self.book.lock().unwrap_or_else(PoisonError::into_inner);
        let building = book.settled(id, now)?;

        if building.owner != owner {
            return Err(LifecycleError::NotOwner(owner));
        }
        if !building.is_active() {
            return Err(LifecycleError::NotActive(id));
        }

        let template = self.template(&building.template)?;
        if building.level >= template.max_level {
            return Err(LifecycleError::MaxLevelReached {
                building: id,
                max_level: template.max_level,
            });
        }

        let next_level = building.level + 1;
        let (cost, build_secs) = level_data(template, next_level)?;
        self.ledger.debit_all(owner, cost)?;

        building.status = BuildingStatus::Upgrading;
        building.build_started_at = now;
        building.build_completed_at = Some(now.saturating_add(build_secs));

        tracing::info!(%owner, building = %id, next_level, build_secs, "Upgrade started");
        Ok(building.clone())
    }

    /// Remove a building in any phase. Nothing is refunded.
    pub fn demolish(&self, owner: OwnerId, id: BuildingId) -> Result<PlayerBuilding, LifecycleError> {
        let mut book = self.book.lock().unwrap_or_else(PoisonError::into_inner);
        match book.buildings.get(&id) {
            None => return Err(LifecycleError::NotFound(id)),
            Some(b) if b.owner != owner => return Err(LifecycleError::NotOwner(owner)),
            Some(_) => {}
        }
        let removed = book
            .buildings
            .remove(&id)
            .ok_or(LifecycleError::NotFound(id))?;
        tracing::info!(%owner, building = %id, "Building demolished");
        Ok(removed)
    }

    /// Progress of the building's current phase at `now`.
    pub fn progress(&self, id: BuildingId, now: Timestamp) -> Result<f64, LifecycleError> {
        let mut book = self.book.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(book.settled(id, now)?.progress(now))
    }

    /// Seconds until the building's current phase completes.
    pub fn remaining_secs(&self, id: BuildingId, now: Timestamp) -> Result<u64, LifecycleError> {
        let mut book = self.book.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(book.settled(id, now)?.remaining_secs(now))
    }

    /// Building as observed at `now`.
    pub fn get(&self, id: BuildingId, now: Timestamp) -> Option<PlayerBuilding> {
        let mut book = self.book.lock().unwrap_or_else(PoisonError::into_inner);
        book.settled(id, now).ok().map(|b| b.clone())
    }

    /// Every building in a territory, as observed at `now`.
    pub fn buildings_in(&self, territory: TerritoryId, now: Timestamp) -> Vec<PlayerBuilding> {
        let mut book = self.book.lock().unwrap_or_else(PoisonError::into_inner);
        book.settle_all(now);
        book.buildings
            .values()
            .filter(|b| b.territory == territory)
            .cloned()
            .collect()
    }

    /// Every building owned by a player, as observed at `now`.
    pub fn buildings_of(&self, owner: OwnerId, now: Timestamp) -> Vec<PlayerBuilding> {
        let mut book = self.book.lock().unwrap_or_else(PoisonError::into_inner);
        book.settle_all(now);
        book.buildings
            .values()
            .filter(|b| b.owner == owner)
            .cloned()
            .collect()
    }

    /// Cost of the next level, or `None` at the template's max level.
    pub fn next_upgrade_cost(&self, id: BuildingId) -> Result<Option<ResourceCost>, LifecycleError> {
        let book = self.book.lock().unwrap_or_else(PoisonError::into_inner);
        let building = book.buildings.get(&id).ok_or(LifecycleError::NotFound(id))?;
        let template = self.template(&building.template)?;

        // An upgrade in flight already counts as the next level
        let current = match building.status {
            BuildingStatus::Upgrading => building.level + 1,
            _ => building.level,
        };
        if current >= template.max_level {
            return Ok(None);
        }
        let (cost, _) = level_data(template, current + 1)?;
        Ok(Some(cost.clone()))
    }

    /// Drop every building in a territory. Returns the removed ids.
    pub fn purge_territory(&self, territory: TerritoryId) -> Vec<BuildingId> {
        let mut book = self.book.lock().unwrap_or_else(PoisonError::into_inner);
        let doomed: Vec<BuildingId> = book
            .buildings
            .values()
            .filter(|b| b.territory == territory)
            .map(|b| b.id)
            .collect();
        for id in &doomed {
            book.buildings.remove(id);
        }
        if !doomed.is_empty() {
            tracing::info!(territory = %territory, count = doomed.len(), "Buildings purged");
        }
        doomed
    }

    /// Number of buildings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.book
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .buildings
            .len()
    }

    /// Check if no building exists.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of every building as stored, plus the next id to issue.
    #[must_use]
    pub fn export(&self) -> (Vec<PlayerBuilding>, u64) {
        let book = self.book.lock().unwrap_or_else(PoisonError::into_inner);
        (book.buildings.values().cloned().collect(), book.next_id)
    }
}

fn level_data(template: &BuildingTemplate, level: u32) -> Result<(&ResourceCost, u64), LifecycleError> {
    let missing = || LifecycleError::MissingLevelData {
        template: template.id.clone(),
        level,
    };
    let cost = template.cost_for_level(level).ok_or_else(missing)?;
    let secs = template.build_time_secs(level).ok_or_else(missing)?;
    Ok((cost, secs))
}
