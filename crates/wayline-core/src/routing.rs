//! Routing adapter between the waypoint store and an external routing engine.
//!
//! Requests are tagged with a monotonically increasing generation. Only a
//! response for the current generation is applied; anything older is a stale
//! answer for a point set that no longer exists and is dropped.

use std::future::Future;

use thiserror::Error;
use tokio::sync::watch;

use crate::models::{Position, RouteRequest, RouteResult};
use crate::store::StoreSnapshot;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RoutingError {
    #[error("no route found between waypoints")]
    NoRoute,
    #[error("routing transport failed: {0}")]
    Transport(String),
    #[error("invalid routing response: {0}")]
    InvalidResponse(String),
    #[error("route needs at least 2 waypoints, got {0}")]
    TooFewWaypoints(usize),
}

/// External service computing geometry for an ordered waypoint list.
pub trait RoutingEngine {
    fn route(
        &self,
        request: &RouteRequest,
    ) -> impl Future<Output = Result<RouteResult, RoutingError>> + Send;
}

/// The engine-side route for the current endpoints.
///
/// Exists only while both start and end are present.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteControl {
    pub generation: u64,
    pub positions: Vec<Position>,
}

/// What a store change did to the routing state.
#[derive(Debug, Clone, PartialEq)]
pub enum AdapterUpdate {
    /// Store did not change since the last sync
    Unchanged,
    /// A fresh request was issued
    Requested(u64),
    /// An endpoint went missing; the control was dropped
    TornDown,
    /// Endpoints still incomplete and nothing to tear down
    Idle,
}

/// How a routing response was handled.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseOutcome {
    Accepted(RouteResult),
    Stale,
    Failed(RoutingError),
}

#[derive(Debug)]
pub struct RoutingAdapter {
    snapshots: watch::Receiver<StoreSnapshot>,
    generation: u64,
    control: Option<RouteControl>,
    pending: Option<RouteRequest>,
    result: Option<RouteResult>,
}

impl RoutingAdapter {
    pub fn new(snapshots: watch::Receiver<StoreSnapshot>) -> Self {
        let mut adapter = Self {
            snapshots,
            generation: 0,
            control: None,
            pending: None,
            result: None,
        };
        let initial = adapter.snapshots.borrow_and_update().clone();
        adapter.reconcile(&initial);
        adapter
    }

    /// React to the latest store snapshot, if any was published since the last call.
    pub fn sync(&mut self) -> AdapterUpdate {
        if !self.snapshots.has_changed().unwrap_or(false) {
            return AdapterUpdate::Unchanged;
        }
        let snapshot = self.snapshots.borrow_and_update().clone();
        self.reconcile(&snapshot)
    }

    /// Hand the undispatched request to the caller.
    pub fn take_request(&mut self) -> Option<RouteRequest> {
        self.pending.take()
    }

    /// Apply an engine response for `generation`.
    pub fn accept(
        &mut self,
        generation: u64,
        response: Result<RouteResult, RoutingError>,
    ) -> ResponseOutcome {
        if self.control.is_none() || generation != self.generation {
            tracing::debug!(
                generation,
                current = self.generation,
                "Discarding stale routing response"
            );
            return ResponseOutcome::Stale;
        }
        match response {
            Ok(result) => {
                tracing::info!(
                    generation,
                    distance_m = result.total_distance_m,
                    duration_s = result.total_duration_s,
                    vertices = result.geometry.len(),
                    "Route calculated"
                );
                self.result = Some(result.clone());
                ResponseOutcome::Accepted(result)
            }
            Err(err) => {
                tracing::warn!(generation, error = %err, "Routing request failed");
                self.result = None;
                ResponseOutcome::Failed(err)
            }
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn control(&self) -> Option<&RouteControl> {
        self.control.as_ref()
    }

    pub fn result(&self) -> Option<&RouteResult> {
        self.result.as_ref()
    }

    fn reconcile(&mut self, snapshot: &StoreSnapshot) -> AdapterUpdate {
        match snapshot.route_positions() {
            Some(positions) => {
                self.generation += 1;
                tracing::debug!(
                    generation = self.generation,
                    waypoints = positions.len(),
                    "Issuing routing request"
                );
                self.control = Some(RouteControl {
                    generation: self.generation,
                    positions: positions.clone(),
                });
                self.pending = Some(RouteRequest {
                    generation: self.generation,
                    positions,
                });
                AdapterUpdate::Requested(self.generation)
            }
            None if self.control.is_some() || self.result.is_some() => {
                // bump so in-flight answers for the old endpoints are stale
                self.generation += 1;
                self.control = None;
                self.pending = None;
                self.result = None;
                tracing::debug!(generation = self.generation, "Routing control torn down");
                AdapterUpdate::TornDown
            }
            None => {
                self.pending = None;
                AdapterUpdate::Idle
            }
        }
    }
}

/// Local via index for a waypoint the engine inserted at `engine_index`.
///
/// The engine's list starts with the start point, so its indices run one
/// ahead of the via list.
pub fn via_insert_index(engine_index: usize, via_len: usize) -> usize {
    engine_index.saturating_sub(1).min(via_len)
}
