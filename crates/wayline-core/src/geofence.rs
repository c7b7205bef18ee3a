//! Named circular areas used to label waypoints and routes.

use std::path::Path;

use thiserror::Error;

use crate::models::{GeofenceArea, Position};
use crate::spatial::haversine_distance;

#[derive(Debug, Error)]
pub enum GeofenceConfigError {
    #[error("failed to read geofence table {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed geofence table: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid geofence table: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

impl GeofenceArea {
    /// Check if a point falls inside this area (boundary inclusive).
    pub fn contains(&self, point: Position) -> bool {
        let distance = haversine_distance(self.center.lat, self.center.lon, point.lat, point.lon);
        // NaN compares false, so invalid input never matches
        distance <= self.radius_m
    }

    /// Validate area configuration.
    /// Returns list of validation errors (empty = valid).
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push("Area name must not be empty".to_string());
        }
        if !self.center.is_valid() {
            errors.push(format!(
                "Area '{}' has an invalid center ({}, {})",
                self.name, self.center.lat, self.center.lon
            ));
        }
        if !self.radius_m.is_finite() || self.radius_m <= 0.0 {
            errors.push(format!(
                "Area '{}' radius must be positive, got {}",
                self.name, self.radius_m
            ));
        }

        errors
    }
}

/// Static table of geofence areas, loaded once per process.
#[derive(Debug, Clone, Default)]
pub struct GeofenceTable {
    areas: Vec<GeofenceArea>,
}

impl GeofenceTable {
    /// Build a table, rejecting it if any entry is invalid.
    pub fn new(areas: Vec<GeofenceArea>) -> Result<Self, GeofenceConfigError> {
        let errors: Vec<String> = areas.iter().flat_map(GeofenceArea::validate).collect();
        if !errors.is_empty() {
            return Err(GeofenceConfigError::Invalid(errors));
        }
        Ok(Self { areas })
    }

    pub fn from_json_str(json: &str) -> Result<Self, GeofenceConfigError> {
        let areas: Vec<GeofenceArea> = serde_json::from_str(json)?;
        Self::new(areas)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, GeofenceConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| GeofenceConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let table = Self::from_json_str(&json)?;
        tracing::debug!(path = %path.display(), areas = table.len(), "Loaded geofence table");
        Ok(table)
    }

    pub fn areas(&self) -> &[GeofenceArea] {
        &self.areas
    }

    pub fn len(&self) -> usize {
        self.areas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }

    /// First area containing the point. Overlaps resolve to table order.
    pub fn lookup(&self, point: Position) -> Option<&GeofenceArea> {
        if !point.lat.is_finite() || !point.lon.is_finite() {
            return None;
        }
        self.areas.iter().find(|area| area.contains(point))
    }

    /// Names of the areas a path passes through, deduplicated in first-visit order.
    pub fn areas_along(&self, path: &[Position]) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for point in path {
            if let Some(area) = self.lookup(*point) {
                if !names.iter().any(|name| name == &area.name) {
                    names.push(area.name.clone());
                }
            }
        }
        names
    }
}
