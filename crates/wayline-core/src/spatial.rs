//! Spatial math for geofence lookup and viewport fitting.

use crate::models::Position;
use serde::{Deserialize, Serialize};

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Calculate distance between two points in meters using Haversine formula.
///
/// # Arguments
/// * `lat1`, `lon1` - First point coordinates in decimal degrees
/// * `lat2`, `lon2` - Second point coordinates in decimal degrees
///
/// # Returns
/// Distance in meters. NaN inputs propagate to a NaN result.
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Haversine distance between two positions in meters.
pub fn distance_m(a: Position, b: Position) -> f64 {
    haversine_distance(a.lat, a.lon, b.lat, b.lon)
}

/// Total length of a polyline in meters.
pub fn path_length_m(path: &[Position]) -> f64 {
    path.windows(2).map(|w| distance_m(w[0], w[1])).sum()
}

/// Axis-aligned lat/lon bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    /// Degenerate box around a single point.
    pub fn around(p: Position) -> Self {
        Self {
            min_lat: p.lat,
            min_lon: p.lon,
            max_lat: p.lat,
            max_lon: p.lon,
        }
    }

    /// Smallest box containing every point, or `None` for an empty input.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Position>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bounds = Self::around(*first);
        for p in iter {
            bounds.extend(*p);
        }
        Some(bounds)
    }

    pub fn extend(&mut self, p: Position) {
        self.min_lat = self.min_lat.min(p.lat);
        self.min_lon = self.min_lon.min(p.lon);
        self.max_lat = self.max_lat.max(p.lat);
        self.max_lon = self.max_lon.max(p.lon);
    }

    pub fn contains(&self, p: Position) -> bool {
        p.lat >= self.min_lat && p.lat <= self.max_lat && p.lon >= self.min_lon && p.lon <= self.max_lon
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_known_distance() {
        // ~111km between these points (1 degree latitude)
        let dist = haversine_distance(0.0, 0.0, 1.0, 0.0);
        assert!((dist - 111_194.0).abs() < 100.0);
    }

    #[test]
    fn test_haversine_same_point() {
        let dist = haversine_distance(18.0857, -15.9785, 18.0857, -15.9785);
        assert!(dist < 0.001);
    }

    #[test]
    fn test_haversine_nan_propagates() {
        assert!(haversine_distance(f64::NAN, 0.0, 0.0, 0.0).is_nan());
    }

    #[test]
    fn path_length_sums_segments() {
        let path = [
            Position::new(0.0, 0.0),
            Position::new(1.0, 0.0),
            Position::new(2.0, 0.0),
        ];
        let total = path_length_m(&path);
        assert!((total - 2.0 * 111_194.9).abs() < 200.0, "got {total}");
        assert_eq!(path_length_m(&path[..1]), 0.0);
    }

    #[test]
    fn bounding_box_covers_all_points() {
        let points = [
            Position::new(0.0, 0.0),
            Position::new(-1.0, 2.0),
            Position::new(0.5, -3.0),
        ];
        let bounds = BoundingBox::from_points(&points).unwrap();
        assert_eq!(bounds.min_lat, -1.0);
        assert_eq!(bounds.max_lat, 0.5);
        assert_eq!(bounds.min_lon, -3.0);
        assert_eq!(bounds.max_lon, 2.0);
        assert!(points.iter().all(|p| bounds.contains(*p)));
        assert!(BoundingBox::from_points(std::iter::empty()).is_none());
    }
}
