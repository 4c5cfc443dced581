//! Committed territories and the global no-overlap registry.
//!
//! The overlap scan and the insert run under a single registry lock, so
//! two racing commits can never both pass the check against each other.
//! No-overlap applies across all owners.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::config::TerritoryConfig;
use crate::error::RegistryError;
use crate::geo::{LatLon, LocalFrame};
use crate::geometry;
use crate::ids::{OwnerId, TerritoryId, Timestamp};

/// A committed, non-overlapping polygon owned by one player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Territory {
    /// Registry-issued identifier.
    pub id: TerritoryId,
    /// Owning player.
    pub owner: OwnerId,
    /// Vertices, implicitly closed.
    pub polygon: Vec<LatLon>,
    /// Enclosed area in square meters.
    pub area_m2: f64,
    /// Area-weighted centroid.
    pub centroid: LatLon,
    /// Commit time.
    pub created_at: Timestamp,
}

impl Territory {
    /// Check whether a coordinate lies inside this territory.
    #[must_use]
    pub fn contains(&self, point: LatLon) -> bool {
        geometry::contains(&self.polygon, point)
    }

    /// Number of polygon vertices.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.polygon.len()
    }

    /// Perimeter in meters.
    #[must_use]
    pub fn perimeter_m(&self) -> f64 {
        self.polygon
            .iter()
            .enumerate()
            .map(|(i, p)| p.haversine_m(self.polygon[(i + 1) % self.polygon.len()]))
            .sum()
    }
}

#[derive(Debug, Default)]
struct RegistryState {
    territories: BTreeMap<TerritoryId, Territory>,
    next_id: u64,
}

/// Holds committed territories and enforces the no-overlap invariant.
#[derive(Debug)]
pub struct TerritoryRegistry {
    config: TerritoryConfig,
    state: Mutex<RegistryState>,
}

impl TerritoryRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new(config: TerritoryConfig) -> Self {
        Self {
            config,
            state: Mutex::new(RegistryState {
                territories: BTreeMap::new(),
                next_id: 1,
            }),
        }
    }

    /// Rebuild a registry from exported territories.
    ///
    /// `next_id` is raised above every restored id if necessary.
    #[must_use]
    pub fn from_parts(config: TerritoryConfig, territories: Vec<Territory>, next_id: u64) -> Self {
        let highest = territories.iter().map(|t| t.id.0).max().unwrap_or(0);
        Self {
            config,
            state: Mutex::new(RegistryState {
                territories: territories.into_iter().map(|t| (t.id, t)).collect(),
                next_id: next_id.max(highest + 1),
            }),
        }
    }

    /// Thresholds in use.
    #[must_use]
    pub const fn config(&self) -> &TerritoryConfig {
        &self.config
    }

    /// Validate `polygon` and commit it as a new territory for `owner`.
    pub fn commit(
        &self,
        owner: OwnerId,
        polygon: Vec<LatLon>,
        now: Timestamp,
    ) -> Result<Territory, RegistryError> {
        if polygon.len() < 3 || !geometry::is_simple(&polygon) {
            return Err(RegistryError::InvalidPolygon);
        }

        let area_m2 = geometry::area_m2(&polygon);
        if area_m2 < self.config.min_area_m2 {
            return Err(RegistryError::TooSmall {
                area_m2,
                minimum_m2: self.config.min_area_m2,
            });
        }

        let centroid = geometry::centroid(&polygon);

        // Overlap scan and insert form one critical section.
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        let frame = LocalFrame::new(centroid);
        let candidate = frame.project_all(&polygon);
        if let Some(existing) = state
            .territories
            .values()
            .find(|t| geometry::planar_intersects(&candidate, &frame.project_all(&t.polygon)))
        {
            tracing::warn!(%owner, existing = %existing.id, "Territory rejected: overlap");
            return Err(RegistryError::Overlap {
                existing: existing.id,
            });
        }

        let id = TerritoryId::new(state.next_id);
        state.next_id += 1;

        let territory = Territory {
            id,
            owner,
            polygon,
            area_m2,
            centroid,
            created_at: now,
        };
        state.territories.insert(id, territory.clone());

        tracing::info!(%owner, territory = %id, area_m2, "Territory committed");
        Ok(territory)
    }

    /// Remove a territory owned by `owner`.
    ///
    /// Buildings are not touched here; [`crate::realm::Realm::delete_territory`]
    /// cascades to them.
    pub fn delete(&self, id: TerritoryId, owner: OwnerId) -> Result<Territory, RegistryError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        match state.territories.get(&id) {
            None => Err(RegistryError::NotFound(id)),
            Some(t) if t.owner != owner => Err(RegistryError::NotOwner {
                territory: id,
                owner,
            }),
            Some(_) => {
                let removed = state
                    .territories
                    .remove(&id)
                    .ok_or(RegistryError::NotFound(id))?;
                tracing::info!(%owner, territory = %id, "Territory deleted");
                Ok(removed)
            }
        }
    }

    /// The territory whose polygon contains `point`, if any.
    #[must_use]
    pub fn find_containing(&self, point: LatLon) -> Option<Territory> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state
            .territories
            .values()
            .find(|t| t.contains(point))
            .cloned()
    }

    /// Look up a territory by id.
    #[must_use]
    pub fn get(&self, id: TerritoryId) -> Option<Territory> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.territories.get(&id).cloned()
    }

    /// All territories owned by `owner`, in id order.
    #[must_use]
    pub fn owned_by(&self, owner: OwnerId) -> Vec<Territory> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state
            .territories
            .values()
            .filter(|t| t.owner == owner)
            .cloned()
            .collect()
    }

    /// Number of committed territories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .territories
            .len()
    }

    /// Check if no territory has been committed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of every territory plus the next id to issue.
    #[must_use]
    pub fn export(&self) -> (Vec<Territory>, u64) {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        (state.territories.values().cloned().collect(), state.next_id)
    }
}

impl Default for TerritoryRegistry {
    fn default() -> Self {
        Self::new(TerritoryConfig::default())
    }
}
