//! Route drawing session: one store, its collaborators and the map surface.
//!
//! All state changes happen inside the session's event methods. After every
//! store mutation the session runs the publish step: marker arena rebuild,
//! routing request or teardown, and the viewport fit.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::geofence::GeofenceTable;
use crate::markers::{
    DeleteKeyOutcome, DragEdit, Marker, MarkerId, MarkerSynchronizer, TooltipUpdate,
};
use crate::models::{Position, RouteRequest, RouteResult, SelectionMode};
use crate::routing::{
    via_insert_index, AdapterUpdate, ResponseOutcome, RoutingAdapter, RoutingEngine, RoutingError,
};
use crate::selection::{ClickAction, SelectionMachine};
use crate::store::{StoreError, WaypointStore};
use crate::viewport::{FitTrigger, ViewRequest, ViewportConfig, ViewportFitter};

/// Rendering surface the session draws on. Acquired once per session.
pub trait MapSurface {
    fn clear_markers(&mut self);
    fn add_marker(&mut self, marker: &Marker);
    fn set_tooltip(&mut self, marker: MarkerId, text: &str);
    fn draw_route(&mut self, geometry: &[Position]);
    fn clear_route(&mut self);
    fn apply_view(&mut self, view: &ViewRequest);
    /// Detach listeners and free resources. Called exactly once, when the session ends.
    fn release(&mut self);
}

/// Callbacks exposed to the embedding application.
///
/// Fired for edits that originate inside the session (clicks, drags, deletes,
/// path insertions). External updates applied through the `apply_external_*`
/// methods are not echoed back.
pub trait RouteHost {
    fn on_start_point_select(&mut self, _pos: Option<Position>) {}
    fn on_end_point_select(&mut self, _pos: Option<Position>) {}
    fn on_intermediate_points_change(&mut self, _via: &[Position]) {}
    fn on_route_calculated(&mut self, _route: &RouteResult) {}
    fn on_areas_traversed(&mut self, _areas: &[String]) {}
}

impl RouteHost for () {}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub viewport: ViewportConfig,
}

pub struct RouteSession<M: MapSurface, H: RouteHost> {
    store: WaypointStore,
    selection: SelectionMachine,
    markers: MarkerSynchronizer,
    routing: RoutingAdapter,
    viewport: ViewportFitter,
    geofences: Arc<GeofenceTable>,
    surface: M,
    host: H,
}

impl<M: MapSurface, H: RouteHost> RouteSession<M, H> {
    pub fn new(surface: M, host: H, geofences: Arc<GeofenceTable>, config: SessionConfig) -> Self {
        let store = WaypointStore::new();
        let markers = MarkerSynchronizer::new(store.subscribe(), geofences.clone());
        let routing = RoutingAdapter::new(store.subscribe());
        let mut session = Self {
            store,
            selection: SelectionMachine::new(),
            markers,
            routing,
            viewport: ViewportFitter::new(config.viewport),
            geofences,
            surface,
            host,
        };
        session.render_markers();
        tracing::debug!(areas = session.geofences.len(), "Map session started");
        session
    }

    pub fn store(&self) -> &WaypointStore {
        &self.store
    }

    pub fn selection_mode(&self) -> SelectionMode {
        self.selection.mode()
    }

    pub fn markers(&self) -> &[Marker] {
        self.markers.markers()
    }

    pub fn route(&self) -> Option<&RouteResult> {
        self.routing.result()
    }

    pub fn has_route_control(&self) -> bool {
        self.routing.control().is_some()
    }

    pub fn surface(&self) -> &M {
        &self.surface
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    // ========== SELECTION ==========

    pub fn begin_pick_start(&mut self) {
        self.selection.begin_start();
    }

    pub fn begin_pick_end(&mut self) {
        self.selection.begin_end();
    }

    pub fn cancel_selection(&mut self) {
        self.selection.cancel();
    }

    /// Apply a map click. The selection mode only advances when the store
    /// accepts the clicked point.
    pub fn map_click(&mut self, pos: Position) {
        let Some(action) = self.selection.on_map_click(pos) else {
            return;
        };
        let accepted = match action {
            ClickAction::SetStart(pos) => self.edit_start(pos),
            ClickAction::SetEnd(pos) => self.edit_end(pos),
        };
        if accepted {
            let end_present = self.store.end().is_some();
            self.selection.complete(action, end_present);
        }
    }

    // ========== MARKER INTERACTION ==========

    pub fn marker_drag_end(&mut self, marker: MarkerId, pos: Position) {
        match self.markers.drag_edit(marker, pos) {
            Some(DragEdit::Start(pos)) => {
                self.edit_start(pos);
            }
            Some(DragEdit::End(pos)) => {
                self.edit_end(pos);
            }
            Some(DragEdit::Via(index, pos)) => {
                let result = self.store.update_via(index, pos);
                self.after_via_edit(result);
            }
            None => {}
        }
    }

    /// A marker was clicked; via markers open their delete window.
    pub fn marker_click(&mut self, marker: MarkerId) {
        let updates = self.markers.arm_delete(marker, Instant::now());
        self.apply_tooltips(updates);
    }

    /// Delete key pressed anywhere on the map.
    pub fn delete_key(&mut self) {
        match self.markers.press_delete(Instant::now()) {
            DeleteKeyOutcome::Remove(index) => {
                let result = self.store.remove_via(index);
                self.after_via_edit(result.map(|_| true));
            }
            DeleteKeyOutcome::Expired(update) => self.apply_tooltips([update]),
            DeleteKeyOutcome::Ignored => {}
        }
    }

    /// Close an expired delete window. Hosts call this at [`Self::delete_deadline`].
    pub fn tick(&mut self) {
        if let Some(update) = self.markers.poll_expiry(Instant::now()) {
            self.apply_tooltips([update]);
        }
    }

    pub fn delete_deadline(&self) -> Option<Instant> {
        self.markers.delete_deadline()
    }

    /// The routing engine reported a waypoint added by clicking the drawn path.
    pub fn path_waypoint_added(&mut self, engine_index: usize, pos: Position) {
        let index = via_insert_index(engine_index, self.store.via().len());
        tracing::debug!(engine_index, index, "Inserting via point from path click");
        let result = self.store.insert_via(index, pos);
        self.after_via_edit(result.map(|()| true));
    }

    pub fn clear_all(&mut self) {
        if self.store.clear_all() {
            self.publish();
            self.host.on_start_point_select(None);
            self.host.on_end_point_select(None);
            self.host.on_intermediate_points_change(&[]);
        }
    }

    // ========== EXTERNAL (CONTROLLED) UPDATES ==========

    pub fn apply_external_start(&mut self, pos: Option<Position>) {
        let changed = match pos {
            Some(pos) => self.store.set_start(pos),
            None => Ok(self.store.clear_start()),
        };
        self.after_external(changed);
    }

    pub fn apply_external_end(&mut self, pos: Option<Position>) {
        let changed = match pos {
            Some(pos) => self.store.set_end(pos),
            None => Ok(self.store.clear_end()),
        };
        self.after_external(changed);
    }

    /// Replace the whole via list with the controller's copy.
    pub fn apply_external_via(&mut self, via: Vec<Position>) {
        let changed = self.store.replace_via(via);
        self.after_external(changed);
    }

    // ========== ROUTING ==========

    /// Take the request issued for the latest point set, if not yet dispatched.
    pub fn take_route_request(&mut self) -> Option<RouteRequest> {
        self.routing.take_request()
    }

    pub fn apply_route_response(
        &mut self,
        generation: u64,
        response: Result<RouteResult, RoutingError>,
    ) -> ResponseOutcome {
        let outcome = self.routing.accept(generation, response);
        match &outcome {
            ResponseOutcome::Accepted(route) => {
                self.surface.draw_route(&route.geometry);
                let points = self.view_points();
                if let Some(view) = self.viewport.fit(&points, FitTrigger::RouteArrived) {
                    self.surface.apply_view(&view);
                }
                self.host.on_route_calculated(route);
                let areas = self.geofences.areas_along(&route.geometry);
                self.host.on_areas_traversed(&areas);
            }
            ResponseOutcome::Failed(_) => self.surface.clear_route(),
            ResponseOutcome::Stale => {}
        }
        outcome
    }

    /// Run the pending request through `engine` and apply its answer.
    pub async fn dispatch<E: RoutingEngine>(&mut self, engine: &E) -> Option<ResponseOutcome> {
        let request = self.routing.take_request()?;
        let response = engine.route(&request).await;
        Some(self.apply_route_response(request.generation, response))
    }

    // ========== INTERNALS ==========

    /// Returns whether the store accepted the point, changed or not.
    fn edit_start(&mut self, pos: Position) -> bool {
        match self.store.set_start(pos) {
            Ok(true) => {
                self.publish();
                self.host.on_start_point_select(Some(pos));
                true
            }
            Ok(false) => true,
            Err(err) => {
                tracing::warn!(error = %err, "Rejected start point");
                false
            }
        }
    }

    fn edit_end(&mut self, pos: Position) -> bool {
        match self.store.set_end(pos) {
            Ok(true) => {
                self.publish();
                self.host.on_end_point_select(Some(pos));
                true
            }
            Ok(false) => true,
            Err(err) => {
                tracing::warn!(error = %err, "Rejected end point");
                false
            }
        }
    }

    fn after_via_edit(&mut self, result: Result<bool, StoreError>) {
        match result {
            Ok(false) => {}
            Ok(true) => {
                self.publish();
                self.host.on_intermediate_points_change(self.store.via());
            }
            Err(err) => tracing::warn!(error = %err, "Rejected via point edit"),
        }
    }

    fn after_external(&mut self, changed: Result<bool, StoreError>) {
        match changed {
            Ok(true) => self.publish(),
            Ok(false) => {}
            Err(err) => tracing::warn!(error = %err, "Rejected external waypoint update"),
        }
    }

    fn publish(&mut self) {
        if self.markers.sync() {
            self.render_markers();
        }
        if self.routing.sync() == AdapterUpdate::TornDown {
            self.surface.clear_route();
        }
        let points = self.view_points();
        if let Some(view) = self.viewport.fit(&points, FitTrigger::PointsChanged) {
            self.surface.apply_view(&view);
        }
    }

    fn render_markers(&mut self) {
        self.surface.clear_markers();
        for marker in self.markers.markers() {
            self.surface.add_marker(marker);
        }
    }

    fn apply_tooltips(&mut self, updates: impl IntoIterator<Item = TooltipUpdate>) {
        for update in updates {
            self.surface.set_tooltip(update.marker, &update.text);
        }
    }

    fn view_points(&self) -> Vec<Position> {
        let mut points: Vec<Position> = self.store.ordered().iter().map(|w| w.position).collect();
        if let Some(route) = self.routing.result() {
            points.extend_from_slice(&route.geometry);
        }
        points
    }
}

impl<M: MapSurface, H: RouteHost> Drop for RouteSession<M, H> {
    fn drop(&mut self) {
        self.surface.release();
        tracing::debug!("Map session released");
    }
}
