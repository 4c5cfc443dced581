//! Test fixtures and helpers.
//!
//! Shapes are described in meters east/north of [`ORIGIN`] and converted
//! to coordinates through a [`LocalFrame`], so tests read as geometry
//! rather than as degrees.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use claim_core::catalog::{BuildingCatalog, BuildingTemplate};
use claim_core::clock::Clock;
use claim_core::config::EngineConfig;
use claim_core::geo::{LatLon, LocalFrame, Vec2};
use claim_core::ids::{OwnerId, Timestamp};
use claim_core::ledger::ResourceLedger;
use claim_core::realm::Realm;
use claim_core::track::TrackPoint;

/// Reference point for every fixture shape.
pub const ORIGIN: LatLon = LatLon::new(47.3769, 8.5417);

/// Horizontal accuracy reported by fixture fixes.
pub const FIX_ACCURACY_M: f64 = 5.0;

/// Seconds between consecutive fixture fixes.
pub const FIX_INTERVAL_SECS: u64 = 15;

/// Frame centered on [`ORIGIN`].
#[must_use]
pub fn frame() -> LocalFrame {
    LocalFrame::new(ORIGIN)
}

/// Coordinate `x` meters east and `y` meters north of [`ORIGIN`].
#[must_use]
pub fn at(x: f64, y: f64) -> LatLon {
    frame().unproject(Vec2::new(x, y))
}

/// Axis-aligned rectangle, counter-clockwise from its south-west corner.
#[must_use]
pub fn rect(x: f64, y: f64, w: f64, h: f64) -> Vec<LatLon> {
    vec![at(x, y), at(x + w, y), at(x + w, y + h), at(x, y + h)]
}

/// Square with side `side` and south-west corner at (`x`, `y`).
#[must_use]
pub fn square(x: f64, y: f64, side: f64) -> Vec<LatLon> {
    rect(x, y, side, side)
}

/// One fix per vertex, starting at `start` and [`FIX_INTERVAL_SECS`] apart.
#[must_use]
pub fn walk(vertices: &[LatLon], start: Timestamp) -> Vec<TrackPoint> {
    vertices
        .iter()
        .enumerate()
        .map(|(i, p)| {
            TrackPoint::new(
                p.lat,
                p.lon,
                start + FIX_INTERVAL_SECS * i as u64,
                FIX_ACCURACY_M,
            )
        })
        .collect()
}

/// Fixes every `step_m` meters along the closed outline of `vertices`,
/// ending one step short of the first vertex.
#[must_use]
pub fn dense_walk(vertices: &[LatLon], step_m: f64, start: Timestamp) -> Vec<TrackPoint> {
    let pts = frame().project_all(vertices);
    let mut positions = Vec::new();
    for (i, a) in pts.iter().enumerate() {
        let b = pts[(i + 1) % pts.len()];
        // Round-tripping through degrees leaves lengths a hair short of whole steps
        let steps = (a.distance(b) / step_m + 1e-6).floor().max(1.0) as usize;
        for s in 0..steps {
            positions.push(frame().unproject(a.lerp(b, s as f64 / steps as f64)));
        }
    }
    walk(&positions, start)
}

/// Starter catalog used across integration tests.
///
/// - `sawmill`: 3 levels, 60/300/900 s, costs `{wood: 30}`, `{wood: 60, stone: 10}`,
///   `{wood: 120, stone: 40}`, two per territory
/// - `camp`: 2 levels, 30/120 s, costs `{wood: 10}`, `{wood: 25}`, one per territory
/// - `watchtower`: 1 level, 600 s, costs `{stone: 50, iron: 5}`
pub const SAMPLE_CATALOG_RON: &str = r#"[
    BuildingTemplate(
        id: "sawmill",
        name: "building.sawmill.name",
        category: Production,
        tier: 1,
        max_level: 3,
        build_time_secs_by_level: [60, 300, 900],
        required_resources_by_level: [
            {"wood": 30},
            {"wood": 60, "stone": 10},
            {"wood": 120, "stone": 40},
        ],
        max_per_territory: 2,
        tags: ["economy"],
    ),
    BuildingTemplate(
        id: "camp",
        name: "building.camp.name",
        category: Shelter,
        max_level: 2,
        build_time_secs_by_level: [30, 120],
        required_resources_by_level: [{"wood": 10}, {"wood": 25}],
    ),
    BuildingTemplate(
        id: "watchtower",
        name: "building.watchtower.name",
        category: Defense,
        tier: 2,
        max_level: 1,
        build_time_secs_by_level: [600],
        required_resources_by_level: [{"stone": 50, "iron": 5}],
        tags: ["defense"],
    ),
]"#;

/// Parsed [`SAMPLE_CATALOG_RON`].
///
/// # Panics
///
/// Panics if the embedded RON is malformed.
#[must_use]
pub fn sample_catalog() -> BuildingCatalog {
    let templates: Vec<BuildingTemplate> =
        ron::from_str(SAMPLE_CATALOG_RON).expect("sample catalog RON is valid");
    BuildingCatalog::new(templates)
}

/// Credit each `(resource, quantity)` pair to `owner`.
pub fn fund(ledger: &ResourceLedger, owner: OwnerId, entries: &[(&str, u64)]) {
    for (resource, quantity) in entries {
        ledger.credit(owner, *resource, *quantity);
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    /// Clock reading `start`.
    #[must_use]
    pub fn new(start: Timestamp) -> Arc<Self> {
        Arc::new(Self {
            now: AtomicU64::new(start),
        })
    }

    /// Jump to `now`.
    pub fn set(&self, now: Timestamp) {
        self.now.store(now, Ordering::SeqCst);
    }

    /// Move forward by `secs`.
    pub fn advance(&self, secs: u64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.load(Ordering::SeqCst)
    }
}

/// Realm with default config and the sample catalog, driven by `clock`.
#[must_use]
pub fn sample_realm(clock: &Arc<ManualClock>) -> Realm {
    Realm::new(
        EngineConfig::default(),
        sample_catalog(),
        Arc::clone(clock) as Arc<dyn Clock>,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use claim_core::geometry;
    use claim_core::ids::TemplateId;

    #[test]
    fn test_square_area() {
        let area = geometry::area_m2(&square(0.0, 0.0, 50.0));
        assert!((area - 2500.0).abs() < 1.0);
    }

    #[test]
    fn test_walk_timestamps() {
        let fixes = walk(&square(0.0, 0.0, 10.0), 100);
        assert_eq!(fixes.len(), 4);
        assert_eq!(fixes[3].timestamp, 100 + 3 * FIX_INTERVAL_SECS);
    }

    #[test]
    fn test_dense_walk_spacing() {
        let fixes = dense_walk(&square(0.0, 0.0, 20.0), 5.0, 0);
        assert_eq!(fixes.len(), 16);
        assert!((fixes[0].distance_m(&fixes[1]) - 5.0).abs() < 0.01);
    }

    #[test]
    fn test_dense_walk_exact_multiples_keep_step() {
        for side in [20.0, 30.0, 100.0] {
            let fixes = dense_walk(&square(0.0, 0.0, side), 5.0, 0);
            assert_eq!(fixes.len(), (4.0 * side / 5.0) as usize, "side {side}");
            for pair in fixes.windows(2) {
                assert!((pair[0].distance_m(&pair[1]) - 5.0).abs() < 0.01);
            }
        }
    }

    #[test]
    fn test_sample_catalog_parses() {
        let catalog = sample_catalog();
        assert_eq!(catalog.len(), 3);
        let camp = catalog.get(&TemplateId::from("camp")).expect("camp");
        assert_eq!(camp.max_per_territory, 1);
    }

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(10);
        clock.advance(5);
        assert_eq!(clock.now(), 15);
        clock.set(3);
        assert_eq!(clock.now(), 3);
    }
}
