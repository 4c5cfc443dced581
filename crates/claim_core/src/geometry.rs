//! Polygon predicates over geographic vertex lists.
//!
//! Every public function projects its input into a [`LocalFrame`] and
//! works in planar meters. Polygons are vertex sequences that are
//! implicitly closed (the last vertex connects back to the first).
//! The `planar_*` variants operate on already-projected points.
//!
//! Simplicity is checked by testing every pair of non-adjacent edges,
//! which is O(n²); callers cap the vertex count with [`simplify_path`].

use crate::geo::{LatLon, LocalFrame, Vec2};

/// Tolerance for orientation tests, in square meters.
const ORIENTATION_EPSILON: f64 = 1e-7;

/// Points closer than this to a polygon edge count as on the boundary.
const BOUNDARY_EPSILON_M: f64 = 1e-3;

/// Distance of interior sample points from their edge.
const INSET_M: f64 = 1e-2;

// ============================================================================
// Area and centroid
// ============================================================================

/// Signed shoelace area of projected points.
///
/// Positive for counter-clockwise winding, negative for clockwise,
/// zero for fewer than three points.
#[must_use]
pub fn planar_signed_area(pts: &[Vec2]) -> f64 {
    if pts.len() < 3 {
        return 0.0;
    }

    let mut twice_area = 0.0;
    for (i, p) in pts.iter().enumerate() {
        let q = pts[(i + 1) % pts.len()];
        twice_area += p.cross(q);
    }
    twice_area * 0.5
}

/// Signed area of a geographic polygon in square meters.
///
/// The sign only reflects winding; territory areas use the absolute value.
#[must_use]
pub fn signed_area(vertices: &[LatLon]) -> f64 {
    LocalFrame::centered_on(vertices)
        .map_or(0.0, |frame| planar_signed_area(&frame.project_all(vertices)))
}

/// Enclosed area of a geographic polygon in square meters.
#[must_use]
pub fn area_m2(vertices: &[LatLon]) -> f64 {
    signed_area(vertices).abs()
}

/// Area-weighted centroid of projected points.
///
/// Falls back to the vertex mean for degenerate (zero-area) input.
#[must_use]
pub fn planar_centroid(pts: &[Vec2]) -> Vec2 {
    if pts.is_empty() {
        return Vec2::ZERO;
    }

    let area = planar_signed_area(pts);
    if area.abs() < ORIENTATION_EPSILON {
        let n = pts.len() as f64;
        let sum = pts.iter().fold(Vec2::ZERO, |acc, p| acc + *p);
        return Vec2::new(sum.x / n, sum.y / n);
    }

    let (mut cx, mut cy) = (0.0, 0.0);
    for (i, p) in pts.iter().enumerate() {
        let q = pts[(i + 1) % pts.len()];
        let w = p.cross(q);
        cx += (p.x + q.x) * w;
        cy += (p.y + q.y) * w;
    }
    Vec2::new(cx / (6.0 * area), cy / (6.0 * area))
}

/// Centroid of a geographic polygon.
#[must_use]
pub fn centroid(vertices: &[LatLon]) -> LatLon {
    match LocalFrame::centered_on(vertices) {
        Some(frame) => frame.unproject(planar_centroid(&frame.project_all(vertices))),
        None => LatLon::default(),
    }
}

// ============================================================================
// Segment predicates
// ============================================================================

fn orientation(a: Vec2, b: Vec2, c: Vec2) -> f64 {
    (b - a).cross(c - a)
}

fn sign(value: f64) -> i8 {
    if value > ORIENTATION_EPSILON {
        1
    } else if value < -ORIENTATION_EPSILON {
        -1
    } else {
        0
    }
}

/// `p` is collinear with `a`-`b`; check it lies within the segment's box.
fn within_segment_box(a: Vec2, b: Vec2, p: Vec2) -> bool {
    p.x >= a.x.min(b.x) - BOUNDARY_EPSILON_M
        && p.x <= a.x.max(b.x) + BOUNDARY_EPSILON_M
        && p.y >= a.y.min(b.y) - BOUNDARY_EPSILON_M
        && p.y <= a.y.max(b.y) + BOUNDARY_EPSILON_M
}

/// Proper crossing: each segment strictly separates the other's endpoints.
fn segments_cross(a: Vec2, b: Vec2, c: Vec2, d: Vec2) -> bool {
    let d1 = sign(orientation(c, d, a));
    let d2 = sign(orientation(c, d, b));
    let d3 = sign(orientation(a, b, c));
    let d4 = sign(orientation(a, b, d));
    d1 * d2 < 0 && d3 * d4 < 0
}

/// Crossing or touching, including collinear overlap.
fn segments_touch(a: Vec2, b: Vec2, c: Vec2, d: Vec2) -> bool {
    if segments_cross(a, b, c, d) {
        return true;
    }

    (sign(orientation(c, d, a)) == 0 && within_segment_box(c, d, a))
        || (sign(orientation(c, d, b)) == 0 && within_segment_box(c, d, b))
        || (sign(orientation(a, b, c)) == 0 && within_segment_box(a, b, c))
        || (sign(orientation(a, b, d)) == 0 && within_segment_box(a, b, d))
}

/// Two consecutive edges `p`-`s`, `s`-`q` that double back over each other.
fn folds_back(p: Vec2, s: Vec2, q: Vec2) -> bool {
    let u = p - s;
    let v = q - s;
    let scale = (u.dot(u) * v.dot(v)).sqrt();
    u.cross(v).abs() <= ORIENTATION_EPSILON * scale.max(1.0) && u.dot(v) > 0.0
}

fn distance_to_segment(p: Vec2, a: Vec2, b: Vec2) -> f64 {
    let ab = b - a;
    let len_sq = ab.dot(ab);
    if len_sq == 0.0 {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    p.distance(a.lerp(b, t))
}

fn edges(pts: &[Vec2]) -> impl Iterator<Item = (Vec2, Vec2)> + '_ {
    pts.iter()
        .enumerate()
        .map(move |(i, p)| (*p, pts[(i + 1) % pts.len()]))
}

// ============================================================================
// Simplicity
// ============================================================================

/// Check that projected points form a simple polygon.
///
/// Rejects fewer than three points, zero-length edges, non-adjacent edges
/// that cross or touch, and adjacent edges that double back.
#[must_use]
pub fn planar_is_simple(pts: &[Vec2]) -> bool {
    let n = pts.len();
    if n < 3 || pts.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
        return false;
    }

    if edges(pts).any(|(a, b)| a.distance(b) < BOUNDARY_EPSILON_M) {
        return false;
    }

    for i in 0..n {
        let (a, b) = (pts[i], pts[(i + 1) % n]);
        for j in (i + 1)..n {
            let (c, d) = (pts[j], pts[(j + 1) % n]);

            if j == i + 1 {
                // Edges share b == c
                if folds_back(a, b, d) {
                    return false;
                }
            } else if i == 0 && j == n - 1 {
                // Edges share a == d
                if folds_back(b, a, c) {
                    return false;
                }
            } else if segments_touch(a, b, c, d) {
                return false;
            }
        }
    }

    true
}

/// Check that a geographic polygon is simple (no self-intersections).
#[must_use]
pub fn is_simple(vertices: &[LatLon]) -> bool {
    if vertices.iter().any(|v| !v.is_valid()) {
        return false;
    }
    LocalFrame::centered_on(vertices)
        .is_some_and(|frame| planar_is_simple(&frame.project_all(vertices)))
}

// ============================================================================
// Containment
// ============================================================================

/// Even-odd ray casting; boundary points may land on either side.
#[must_use]
pub fn planar_contains(pts: &[Vec2], p: Vec2) -> bool {
    let mut inside = false;
    for (a, b) in edges(pts) {
        if (a.y > p.y) != (b.y > p.y) {
            let x_at = a.x + (p.y - a.y) / (b.y - a.y) * (b.x - a.x);
            if p.x < x_at {
                inside = !inside;
            }
        }
    }
    inside
}

/// Inside and not within [`BOUNDARY_EPSILON_M`] of any edge.
fn contains_strictly(pts: &[Vec2], p: Vec2) -> bool {
    planar_contains(pts, p)
        && edges(pts).all(|(a, b)| distance_to_segment(p, a, b) > BOUNDARY_EPSILON_M)
}

/// Check whether `point` lies inside a geographic polygon.
#[must_use]
pub fn contains(polygon: &[LatLon], point: LatLon) -> bool {
    LocalFrame::centered_on(polygon).is_some_and(|frame| {
        let pts = frame.project_all(polygon);
        planar_contains(&pts, frame.project(point))
    })
}

// ============================================================================
// Overlap
// ============================================================================

/// Axis-aligned bounding box in planar meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// South-west corner.
    pub min: Vec2,
    /// North-east corner.
    pub max: Vec2,
}

impl BoundingBox {
    /// Bounding box of a point set, `None` when empty.
    #[must_use]
    pub fn of(pts: &[Vec2]) -> Option<Self> {
        let first = *pts.first()?;
        Some(pts.iter().fold(
            Self {
                min: first,
                max: first,
            },
            |bb, p| Self {
                min: Vec2::new(bb.min.x.min(p.x), bb.min.y.min(p.y)),
                max: Vec2::new(bb.max.x.max(p.x), bb.max.y.max(p.y)),
            },
        ))
    }

    /// Check whether two boxes share any area (touching edges excluded).
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.min.x < other.max.x - BOUNDARY_EPSILON_M
            && other.min.x < self.max.x - BOUNDARY_EPSILON_M
            && self.min.y < other.max.y - BOUNDARY_EPSILON_M
            && other.min.y < self.max.y - BOUNDARY_EPSILON_M
    }
}

/// Boundary and near-boundary sample points of a polygon.
///
/// Vertices, edge midpoints, and a point just inside each edge midpoint.
fn sample_points(pts: &[Vec2]) -> Vec<Vec2> {
    let inward = if planar_signed_area(pts) >= 0.0 { 1.0 } else { -1.0 };
    let mut samples = Vec::with_capacity(pts.len() * 3 + 1);
    samples.push(planar_centroid(pts));

    for (a, b) in edges(pts) {
        let mid = a.lerp(b, 0.5);
        let dir = b - a;
        let len = dir.dot(dir).sqrt();
        samples.push(a);
        samples.push(mid);
        if len > 0.0 {
            // Left normal points inward for counter-clockwise winding.
            let normal = Vec2::new(-dir.y / len, dir.x / len);
            let offset = INSET_M.min(len * 0.01) * inward;
            samples.push(mid + Vec2::new(normal.x * offset, normal.y * offset));
        }
    }
    samples
}

/// Check whether two projected polygons share interior area.
#[must_use]
pub fn planar_intersects(a: &[Vec2], b: &[Vec2]) -> bool {
    let (Some(box_a), Some(box_b)) = (BoundingBox::of(a), BoundingBox::of(b)) else {
        return false;
    };
    if !box_a.overlaps(&box_b) {
        return false;
    }

    for (p, q) in edges(a) {
        for (r, s) in edges(b) {
            if segments_cross(p, q, r, s) {
                return true;
            }
        }
    }

    sample_points(b).into_iter().any(|p| contains_strictly(a, p))
        || sample_points(a).into_iter().any(|p| contains_strictly(b, p))
}

/// Check whether two geographic polygons share interior area.
///
/// True when any pair of edges properly crosses, or when a centroid,
/// vertex, edge midpoint or near-edge interior sample of one polygon lies
/// strictly inside the other. Polygons that only touch along an edge or
/// at a vertex do not intersect.
#[must_use]
pub fn intersects(a: &[LatLon], b: &[LatLon]) -> bool {
    let Some(frame) = LocalFrame::centered_on(a) else {
        return false;
    };
    planar_intersects(&frame.project_all(a), &frame.project_all(b))
}

// ============================================================================
// Simplification
// ============================================================================

/// Collapse a path to at most `max_vertices` points.
///
/// Keeps the first point, then drops every point closer than the current
/// minimum segment length to the previously kept one. The segment length
/// starts at `min_segment_m` and doubles until the cap is met.
#[must_use]
pub fn simplify_path(path: &[LatLon], max_vertices: usize, min_segment_m: f64) -> Vec<LatLon> {
    if path.len() <= max_vertices {
        return path.to_vec();
    }

    let mut segment = if min_segment_m > 0.0 { min_segment_m } else { 1.0 };
    let mut kept = path.to_vec();
    for _ in 0..64 {
        kept.clear();
        kept.push(path[0]);
        for p in &path[1..] {
            let last = kept[kept.len() - 1];
            if last.haversine_m(*p) >= segment {
                kept.push(*p);
            }
        }
        if kept.len() <= max_vertices {
            break;
        }
        segment *= 2.0;
    }

    tracing::debug!(
        from = path.len(),
        to = kept.len(),
        segment_m = segment,
        "Simplified capture path"
    );
    kept
}
