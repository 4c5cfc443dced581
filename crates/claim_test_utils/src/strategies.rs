//! Proptest strategies for geometry and ledger properties.
//!
//! All shapes are in meters relative to [`crate::fixtures::ORIGIN`], small
//! enough for the local planar approximation to hold.

use claim_core::geo::{LatLon, Vec2};
use claim_core::ids::ResourceCost;
use proptest::prelude::*;

use crate::fixtures::{at, rect};

/// Axis-aligned rectangle in meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RectSpec {
    /// West edge.
    pub x: f64,
    /// South edge.
    pub y: f64,
    /// Width.
    pub w: f64,
    /// Height.
    pub h: f64,
}

impl RectSpec {
    /// Vertices as coordinates.
    #[must_use]
    pub fn vertices(&self) -> Vec<LatLon> {
        rect(self.x, self.y, self.w, self.h)
    }

    /// Planar area.
    #[must_use]
    pub fn area(&self) -> f64 {
        self.w * self.h
    }

    /// Check if the interiors of two rectangles intersect.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.x < other.x + other.w
            && other.x < self.x + self.w
            && self.y < other.y + other.h
            && other.y < self.y + self.h
    }
}

/// Rectangle with sides between 12 and 400 m anywhere within 2 km.
pub fn arb_rect() -> impl Strategy<Value = RectSpec> {
    (-1000.0..1000.0f64, -1000.0..1000.0f64, 12.0..400.0f64, 12.0..400.0f64)
        .prop_map(|(x, y, w, h)| RectSpec { x, y, w, h })
}

/// Two rectangles whose interiors are guaranteed to share area.
pub fn arb_overlapping_rects() -> impl Strategy<Value = (RectSpec, RectSpec)> {
    (arb_rect(), 0.05..0.95f64, 0.05..0.95f64, 12.0..400.0f64, 12.0..400.0f64).prop_map(
        |(a, fx, fy, w, h)| {
            // Anchor the second rectangle at a point strictly inside the first
            let b = RectSpec {
                x: a.x + a.w * fx,
                y: a.y + a.h * fy,
                w,
                h,
            };
            (a, b)
        },
    )
}

/// Rectangles on a grid of disjoint cells, one per cell, `1..max` of them.
///
/// Cells are 100 m apart and rectangles at most 90 m wide, so no two share
/// interior area.
pub fn arb_disjoint_rects(max: usize) -> impl Strategy<Value = Vec<RectSpec>> {
    proptest::collection::vec((12.0..90.0f64, 12.0..90.0f64), 1..max).prop_map(|sizes| {
        sizes
            .into_iter()
            .enumerate()
            .map(|(i, (w, h))| RectSpec {
                x: (i % 8) as f64 * 100.0,
                y: (i / 8) as f64 * 100.0,
                w,
                h,
            })
            .collect()
    })
}

/// Regular convex polygon with 3 to 24 vertices and a 10 to 300 m radius.
pub fn arb_convex_polygon() -> impl Strategy<Value = Vec<LatLon>> {
    (3usize..24, 10.0..300.0f64, 0.0..std::f64::consts::TAU).prop_map(|(n, radius, phase)| {
        (0..n)
            .map(|i| {
                let angle = phase + std::f64::consts::TAU * i as f64 / n as f64;
                let v = Vec2::new(radius * angle.cos(), radius * angle.sin());
                at(v.x, v.y)
            })
            .collect()
    })
}

/// Resource identifiers used by ledger properties.
pub const RESOURCES: [&str; 4] = ["wood", "stone", "iron", "food"];

/// Cost over a subset of [`RESOURCES`] with quantities below 200.
pub fn arb_cost() -> impl Strategy<Value = ResourceCost> {
    proptest::collection::vec((0usize..RESOURCES.len(), 0u64..200), 0..RESOURCES.len())
        .prop_map(|entries| {
            entries
                .into_iter()
                .map(|(i, q)| (RESOURCES[i].into(), q))
                .collect()
        })
}

/// Starting balances as `(resource, quantity)` pairs.
pub fn arb_balances() -> impl Strategy<Value = Vec<(&'static str, u64)>> {
    proptest::collection::vec((0usize..RESOURCES.len(), 0u64..300), 0..8)
        .prop_map(|entries| entries.into_iter().map(|(i, q)| (RESOURCES[i], q)).collect())
}
