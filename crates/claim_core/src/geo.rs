//! Geographic coordinates and the local planar frame.
//!
//! Territories are a few hundred meters across, so every area and
//! intersection computation happens in a local tangent-plane frame
//! (meters east/north of an origin) rather than on the sphere.
//! Great-circle distances between fixes use the haversine formula.

use serde::{Deserialize, Serialize};

/// Mean Earth radius in meters (IUGG).
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// A WGS84 coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LatLon {
    /// Latitude in degrees, positive north.
    pub lat: f64,
    /// Longitude in degrees, positive east.
    pub lon: f64,
}

impl LatLon {
    /// Create a new coordinate.
    #[must_use]
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Check that both components are finite and inside their valid ranges.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }

    /// Great-circle distance to another coordinate in meters.
    #[must_use]
    pub fn haversine_m(self, other: Self) -> f64 {
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let dlat = (other.lat - self.lat).to_radians();
        let dlon = (other.lon - self.lon).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * a.sqrt().min(1.0).asin()
    }
}

/// Planar 2D vector in meters (x east, y north).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    /// East offset in meters.
    pub x: f64,
    /// North offset in meters.
    pub y: f64,
}

impl Vec2 {
    /// Create a new vector.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Zero vector.
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    /// Squared distance (avoids sqrt for comparisons).
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Euclidean distance.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        self.distance_squared(other).sqrt()
    }

    /// Dot product of two vectors.
    #[must_use]
    pub fn dot(self, other: Self) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// Z component of the 3D cross product.
    #[must_use]
    pub fn cross(self, other: Self) -> f64 {
        self.x * other.y - self.y * other.x
    }

    /// Linearly interpolate between two vectors.
    #[must_use]
    pub fn lerp(self, other: Self, t: f64) -> Self {
        Self {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }
}

impl std::ops::Add for Vec2 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

/// Equirectangular tangent-plane projection around an origin.
///
/// Accurate to well under a meter for extents of a few kilometers away
/// from the poles, which is all a walked territory ever covers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalFrame {
    origin: LatLon,
    cos_lat: f64,
}

impl LocalFrame {
    /// Create a frame centered on `origin`.
    #[must_use]
    pub fn new(origin: LatLon) -> Self {
        Self {
            origin,
            cos_lat: origin.lat.to_radians().cos(),
        }
    }

    /// Frame centered on the arithmetic mean of `points`.
    ///
    /// Returns `None` for an empty slice.
    #[must_use]
    pub fn centered_on(points: &[LatLon]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let n = points.len() as f64;
        let lat = points.iter().map(|p| p.lat).sum::<f64>() / n;
        let lon = points.iter().map(|p| p.lon).sum::<f64>() / n;
        Some(Self::new(LatLon::new(lat, lon)))
    }

    /// Origin of the frame.
    #[must_use]
    pub const fn origin(&self) -> LatLon {
        self.origin
    }

    /// Project a coordinate into meters relative to the origin.
    #[must_use]
    pub fn project(&self, point: LatLon) -> Vec2 {
        let dlat = (point.lat - self.origin.lat).to_radians();
        let dlon = (point.lon - self.origin.lon).to_radians();
        Vec2::new(
            EARTH_RADIUS_M * dlon * self.cos_lat,
            EARTH_RADIUS_M * dlat,
        )
    }

    /// Project every coordinate of a path.
    #[must_use]
    pub fn project_all(&self, points: &[LatLon]) -> Vec<Vec2> {
        points.iter().map(|p| self.project(*p)).collect()
    }

    /// Inverse of [`LocalFrame::project`].
    #[must_use]
    pub fn unproject(&self, v: Vec2) -> LatLon {
        let lat = self.origin.lat + (v.y / EARTH_RADIUS_M).to_degrees();
        let lon = self.origin.lon + (v.x / (EARTH_RADIUS_M * self.cos_lat)).to_degrees();
        LatLon::new(lat, lon)
    }
}
