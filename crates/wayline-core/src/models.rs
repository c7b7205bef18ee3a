//! Core data models for route drawing sessions.

use serde::{Deserialize, Serialize};

/// A geographic position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub lat: f64,
    pub lon: f64,
}

impl Position {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// True when both coordinates are finite and inside the valid lat/lon ranges.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

/// Role a waypoint plays in the route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaypointRole {
    Start,
    Via,
    End,
}

/// A point participating in the route.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub role: WaypointRole,
    pub position: Position,
}

impl Waypoint {
    pub fn start(position: Position) -> Self {
        Self { role: WaypointRole::Start, position }
    }

    pub fn via(position: Position) -> Self {
        Self { role: WaypointRole::Via, position }
    }

    pub fn end(position: Position) -> Self {
        Self { role: WaypointRole::End, position }
    }
}

/// Ordered waypoint list sent to the routing engine.
///
/// `positions` is always `[start, via.., end]`; requests are only built when
/// both endpoints exist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteRequest {
    /// Generation the request was issued under
    pub generation: u64,
    pub positions: Vec<Position>,
}

/// Geometry and totals computed by the routing engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteResult {
    pub geometry: Vec<Position>,
    pub total_distance_m: f64,
    pub total_duration_s: f64,
}

/// A named circular region used to label points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeofenceArea {
    pub name: String,
    pub center: Position,
    pub radius_m: f64,
}

/// How the next map click is interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    #[default]
    Idle,
    PickingStart,
    PickingEnd,
}
