//! Headless map surface and host that log what a real map would render.

use serde::Serialize;
use wayline_core::{
    MapSurface, Marker, MarkerColor, MarkerId, Position, RouteHost, RouteResult, ViewRequest,
};

#[derive(Debug, Clone, Serialize)]
pub struct RenderedMarker {
    pub color: MarkerColor,
    pub tooltip: String,
    pub position: Position,
}

/// Keeps the last rendered state instead of drawing it.
#[derive(Debug, Default)]
pub struct LogSurface {
    markers: Vec<(MarkerId, RenderedMarker)>,
    route_vertices: usize,
    view: Option<ViewRequest>,
}

impl LogSurface {
    pub fn markers(&self) -> Vec<RenderedMarker> {
        self.markers.iter().map(|(_, m)| m.clone()).collect()
    }

    pub fn view(&self) -> Option<&ViewRequest> {
        self.view.as_ref()
    }

    pub fn route_vertices(&self) -> usize {
        self.route_vertices
    }
}

impl MapSurface for LogSurface {
    fn clear_markers(&mut self) {
        self.markers.clear();
    }

    fn add_marker(&mut self, marker: &Marker) {
        tracing::debug!(key = ?marker.id.key, label = %marker.label, "Marker added");
        self.markers.push((
            marker.id,
            RenderedMarker {
                color: marker.color,
                tooltip: marker.label.clone(),
                position: marker.position,
            },
        ));
    }

    fn set_tooltip(&mut self, marker: MarkerId, text: &str) {
        if let Some((_, rendered)) = self.markers.iter_mut().find(|(id, _)| *id == marker) {
            rendered.tooltip = text.to_string();
        }
    }

    fn draw_route(&mut self, geometry: &[Position]) {
        tracing::debug!(vertices = geometry.len(), "Route drawn");
        self.route_vertices = geometry.len();
    }

    fn clear_route(&mut self) {
        self.route_vertices = 0;
    }

    fn apply_view(&mut self, view: &ViewRequest) {
        tracing::debug!(?view, "View changed");
        self.view = Some(view.clone());
    }

    fn release(&mut self) {
        tracing::debug!(markers = self.markers.len(), "Map surface released");
        self.markers.clear();
    }
}

/// Collects the route callbacks for the final summary.
#[derive(Debug, Default)]
pub struct SummaryHost {
    pub route: Option<RouteResult>,
    pub areas: Vec<String>,
}

impl RouteHost for SummaryHost {
    fn on_route_calculated(&mut self, route: &RouteResult) {
        self.route = Some(route.clone());
    }

    fn on_areas_traversed(&mut self, areas: &[String]) {
        self.areas = areas.to_vec();
    }
}
