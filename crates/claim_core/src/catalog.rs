//! Static building template catalog.
//!
//! Templates are pure data loaded from RON. The engine reads them but never
//! validates the ladders; `claim-tools validate` does that offline.
//!
//! # Example RON
//!
//! ```ron
//! [
//!     BuildingTemplate(
//!         id: "sawmill",
//!         name: "building.sawmill.name",
//!         category: Production,
//!         tier: 1,
//!         max_level: 3,
//!         build_time_secs_by_level: [60, 300, 900],
//!         required_resources_by_level: [
//!             {"wood": 30},
//!             {"wood": 60, "stone": 10},
//!             {"wood": 120, "stone": 40},
//!         ],
//!         max_per_territory: 2,
//!         tags: ["economy"],
//!     ),
//! ]
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ClaimError, Result};
use crate::ids::{ResourceCost, TemplateId};

/// Broad grouping of building templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildingCategory {
    /// Shelters and camps.
    Shelter,
    /// Gatherers and workshops.
    Production,
    /// Warehouses and caches.
    Storage,
    /// Walls and towers.
    Defense,
    /// Everything else.
    Utility,
}

/// Data-driven building definition.
///
/// Level vectors are indexed from level 1: element 0 describes the initial
/// construction, element `n - 1` the upgrade to level `n`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildingTemplate {
    /// Unique identifier for this template.
    pub id: TemplateId,

    /// Localization key for the display name.
    pub name: String,

    /// Broad grouping.
    pub category: BuildingCategory,

    /// Progression tier (1 = starter).
    #[serde(default = "default_tier")]
    pub tier: u8,

    /// Highest reachable level.
    pub max_level: u32,

    /// Seconds to reach each level.
    pub build_time_secs_by_level: Vec<u64>,

    /// Resources consumed to reach each level.
    pub required_resources_by_level: Vec<ResourceCost>,

    /// How many instances a single territory may hold.
    #[serde(default = "default_max_per_territory")]
    pub max_per_territory: u32,

    /// Free-form tags (e.g. "economy", "defense").
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Default tier for templates without an explicit tier.
const fn default_tier() -> u8 {
    1
}

const fn default_max_per_territory() -> u32 {
    1
}

impl BuildingTemplate {
    /// Seconds needed to reach `level`, if the template defines it.
    #[must_use]
    pub fn build_time_secs(&self, level: u32) -> Option<u64> {
        let index = usize::try_from(level.checked_sub(1)?).ok()?;
        self.build_time_secs_by_level.get(index).copied()
    }

    /// Resources needed to reach `level`, if the template defines it.
    #[must_use]
    pub fn cost_for_level(&self, level: u32) -> Option<&ResourceCost> {
        let index = usize::try_from(level.checked_sub(1)?).ok()?;
        self.required_resources_by_level.get(index)
    }

    /// Check if this template has the specified tag.
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Read-only catalog of templates keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildingCatalog {
    templates: BTreeMap<TemplateId, BuildingTemplate>,
}

impl BuildingCatalog {
    /// Build a catalog from a list of templates.
    ///
    /// A later template with a duplicate id replaces the earlier one.
    #[must_use]
    pub fn new(templates: impl IntoIterator<Item = BuildingTemplate>) -> Self {
        Self {
            templates: templates
                .into_iter()
                .map(|template| (template.id.clone(), template))
                .collect(),
        }
    }

    /// Look up a template.
    #[must_use]
    pub fn get(&self, id: &TemplateId) -> Option<&BuildingTemplate> {
        self.templates.get(id)
    }

    /// Iterate templates in id order.
    pub fn iter(&self) -> impl Iterator<Item = &BuildingTemplate> {
        self.templates.values()
    }

    /// Number of templates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Check if the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Parse a RON list of templates.
    pub fn from_ron_str(source: &str) -> Result<Self> {
        let templates: Vec<BuildingTemplate> =
            ron::from_str(source).map_err(|e| ClaimError::DataParse {
                path: "<inline>".to_string(),
                message: e.to_string(),
            })?;
        Ok(Self::new(templates))
    }

    /// Load a RON list of templates from a file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ClaimError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let templates: Vec<BuildingTemplate> =
            ron::from_str(&contents).map_err(|e| ClaimError::DataParse {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        tracing::debug!(path = %path.display(), count = templates.len(), "Loaded building catalog");
        Ok(Self::new(templates))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{cost, ResourceId};

    fn sawmill() -> BuildingTemplate {
        BuildingTemplate {
            id: TemplateId::from("sawmill"),
            name: "building.sawmill.name".to_string(),
            category: BuildingCategory::Production,
            tier: 1,
            max_level: 3,
            build_time_secs_by_level: vec![60, 300, 900],
            required_resources_by_level: vec![
                cost([("wood", 30)]),
                cost([("wood", 60), ("stone", 10)]),
                cost([("wood", 120), ("stone", 40)]),
            ],
            max_per_territory: 2,
            tags: vec!["economy".to_string()],
        }
    }

    #[test]
    fn test_level_lookups_are_one_based() {
        let t = sawmill();
        assert_eq!(t.build_time_secs(1), Some(60));
        assert_eq!(t.build_time_secs(3), Some(900));
        assert_eq!(t.build_time_secs(0), None);
        assert_eq!(t.build_time_secs(4), None);

        let level2 = t.cost_for_level(2).expect("level 2 cost");
        assert_eq!(level2[&ResourceId::from("stone")], 10);
        assert!(t.cost_for_level(0).is_none());
    }

    #[test]
    fn test_has_tag() {
        let t = sawmill();
        assert!(t.has_tag("economy"));
        assert!(!t.has_tag("defense"));
    }

    #[test]
    fn test_catalog_lookup() {
        let catalog = BuildingCatalog::new([sawmill()]);
        assert_eq!(catalog.len(), 1);
        assert!(catalog.get(&TemplateId::from("sawmill")).is_some());
        assert!(catalog.get(&TemplateId::from("forge")).is_none());
    }

    #[test]
    fn test_catalog_from_ron() {
        let source = r#"[
            BuildingTemplate(
                id: "camp",
                name: "building.camp.name",
                category: Shelter,
                max_level: 2,
                build_time_secs_by_level: [30, 120],
                required_resources_by_level: [{"wood": 10}, {"wood": 25}],
            ),
        ]"#;
        let catalog = BuildingCatalog::from_ron_str(source).expect("valid catalog");
        let camp = catalog.get(&TemplateId::from("camp")).expect("camp");
        assert_eq!(camp.tier, 1);
        assert_eq!(camp.max_per_territory, 1);
        assert!(camp.tags.is_empty());
        assert_eq!(camp.build_time_secs(2), Some(120));
    }

    #[test]
    fn test_catalog_parse_error() {
        let err = BuildingCatalog::from_ron_str("[BuildingTemplate(id: 3)]").unwrap_err();
        assert!(matches!(err, ClaimError::DataParse { .. }));
    }
}
