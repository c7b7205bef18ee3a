//! Ordered waypoint store: the single source of truth for route points.
//!
//! Every mutation bumps the revision and publishes a [`StoreSnapshot`] on a
//! `tokio::sync::watch` channel. Collaborators hold a receiver from
//! [`WaypointStore::subscribe`] and rebuild their derived state when it
//! reports a change.

use thiserror::Error;
use tokio::sync::watch;

use crate::models::{Position, Waypoint};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("via index {index} out of range (len {len})")]
    ViaIndexOutOfRange { index: usize, len: usize },
    #[error("invalid position ({}, {})", .0.lat, .0.lon)]
    InvalidPosition(Position),
}

/// Immutable view of the store at one revision.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreSnapshot {
    pub revision: u64,
    pub start: Option<Position>,
    pub via: Vec<Position>,
    pub end: Option<Position>,
}

impl StoreSnapshot {
    /// `[start?, via.., end?]` tagged with roles.
    pub fn ordered(&self) -> Vec<Waypoint> {
        let mut ordered = Vec::with_capacity(self.via.len() + 2);
        ordered.extend(self.start.map(Waypoint::start));
        ordered.extend(self.via.iter().copied().map(Waypoint::via));
        ordered.extend(self.end.map(Waypoint::end));
        ordered
    }

    /// Positions for a routing request, present only when both endpoints exist.
    pub fn route_positions(&self) -> Option<Vec<Position>> {
        let (start, end) = (self.start?, self.end?);
        let mut positions = Vec::with_capacity(self.via.len() + 2);
        positions.push(start);
        positions.extend_from_slice(&self.via);
        positions.push(end);
        Some(positions)
    }
}

/// Waypoint store. One instance per map session.
#[derive(Debug)]
pub struct WaypointStore {
    start: Option<Position>,
    via: Vec<Position>,
    end: Option<Position>,
    revision: u64,
    publisher: watch::Sender<StoreSnapshot>,
}

impl Default for WaypointStore {
    fn default() -> Self {
        Self::new()
    }
}

impl WaypointStore {
    pub fn new() -> Self {
        let (publisher, _) = watch::channel(StoreSnapshot::default());
        Self {
            start: None,
            via: Vec::new(),
            end: None,
            revision: 0,
            publisher,
        }
    }

    /// Receive a snapshot after every mutation.
    pub fn subscribe(&self) -> watch::Receiver<StoreSnapshot> {
        self.publisher.subscribe()
    }

    pub fn start(&self) -> Option<Position> {
        self.start
    }

    pub fn end(&self) -> Option<Position> {
        self.end
    }

    pub fn via(&self) -> &[Position] {
        &self.via
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            revision: self.revision,
            start: self.start,
            via: self.via.clone(),
            end: self.end,
        }
    }

    /// `[start?, via.., end?]` in traversal order.
    pub fn ordered(&self) -> Vec<Waypoint> {
        self.snapshot().ordered()
    }

    /// Set the start point. Returns whether the store changed.
    pub fn set_start(&mut self, pos: Position) -> Result<bool, StoreError> {
        check_position(pos)?;
        Ok(self.replace_endpoint(Endpoint::Start, Some(pos)))
    }

    /// Set the end point. Returns whether the store changed.
    pub fn set_end(&mut self, pos: Position) -> Result<bool, StoreError> {
        check_position(pos)?;
        Ok(self.replace_endpoint(Endpoint::End, Some(pos)))
    }

    pub fn clear_start(&mut self) -> bool {
        self.replace_endpoint(Endpoint::Start, None)
    }

    pub fn clear_end(&mut self) -> bool {
        self.replace_endpoint(Endpoint::End, None)
    }

    /// Insert a via point before `index`; `index == len` appends.
    pub fn insert_via(&mut self, index: usize, pos: Position) -> Result<(), StoreError> {
        check_position(pos)?;
        if index > self.via.len() {
            return Err(StoreError::ViaIndexOutOfRange {
                index,
                len: self.via.len(),
            });
        }
        self.via.insert(index, pos);
        self.publish();
        Ok(())
    }

    /// Move a via point. Returns `false` when it already sits at `pos`.
    pub fn update_via(&mut self, index: usize, pos: Position) -> Result<bool, StoreError> {
        check_position(pos)?;
        let len = self.via.len();
        let slot = self
            .via
            .get_mut(index)
            .ok_or(StoreError::ViaIndexOutOfRange { index, len })?;
        if *slot == pos {
            return Ok(false);
        }
        *slot = pos;
        self.publish();
        Ok(true)
    }

    pub fn remove_via(&mut self, index: usize) -> Result<Position, StoreError> {
        if index >= self.via.len() {
            return Err(StoreError::ViaIndexOutOfRange {
                index,
                len: self.via.len(),
            });
        }
        let removed = self.via.remove(index);
        self.publish();
        Ok(removed)
    }

    /// Wholesale replacement of the via list by an external controller.
    ///
    /// Last writer wins: no merge against earlier internal edits.
    pub fn replace_via(&mut self, via: Vec<Position>) -> Result<bool, StoreError> {
        if let Some(bad) = via.iter().find(|p| !p.is_valid()) {
            return Err(StoreError::InvalidPosition(*bad));
        }
        if self.via == via {
            return Ok(false);
        }
        self.via = via;
        self.publish();
        Ok(true)
    }

    /// Remove every waypoint. Returns whether anything was removed.
    pub fn clear_all(&mut self) -> bool {
        if self.start.is_none() && self.end.is_none() && self.via.is_empty() {
            return false;
        }
        self.start = None;
        self.end = None;
        self.via.clear();
        self.publish();
        true
    }

    fn replace_endpoint(&mut self, which: Endpoint, value: Option<Position>) -> bool {
        let slot = match which {
            Endpoint::Start => &mut self.start,
            Endpoint::End => &mut self.end,
        };
        if *slot == value {
            return false;
        }
        *slot = value;
        self.publish();
        true
    }

    fn publish(&mut self) {
        self.revision += 1;
        let snapshot = self.snapshot();
        tracing::trace!(
            revision = snapshot.revision,
            via = snapshot.via.len(),
            "Store changed"
        );
        self.publisher.send_replace(snapshot);
    }
}

#[derive(Debug, Clone, Copy)]
enum Endpoint {
    Start,
    End,
}

fn check_position(pos: Position) -> Result<(), StoreError> {
    if pos.is_valid() {
        Ok(())
    } else {
        Err(StoreError::InvalidPosition(pos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WaypointRole;

    fn p(lat: f64, lon: f64) -> Position {
        Position::new(lat, lon)
    }

    #[test]
    fn ordered_is_start_via_end() {
        let mut store = WaypointStore::new();
        store.set_end(p(3.0, 3.0)).unwrap();
        store.insert_via(0, p(2.0, 2.0)).unwrap();
        store.insert_via(0, p(1.0, 1.0)).unwrap();
        store.set_start(p(0.0, 0.0)).unwrap();

        let ordered = store.ordered();
        let roles: Vec<WaypointRole> = ordered.iter().map(|w| w.role).collect();
        assert_eq!(
            roles,
            vec![
                WaypointRole::Start,
                WaypointRole::Via,
                WaypointRole::Via,
                WaypointRole::End
            ]
        );
        let lats: Vec<f64> = ordered.iter().map(|w| w.position.lat).collect();
        assert_eq!(lats, vec![0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn via_length_tracks_inserts_minus_removes() {
        let mut store = WaypointStore::new();
        let mut inserts = 0usize;
        let mut removes = 0usize;
        // deterministic pseudo-random walk over the via operations
        let mut seed = 17u64;
        for step in 0..200 {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let len = store.via().len();
            let pos = p((step % 80) as f64, (step % 170) as f64);
            match seed >> 61 {
                0..=3 => {
                    let index = (seed as usize >> 8) % (len + 1);
                    store.insert_via(index, pos).unwrap();
                    inserts += 1;
                }
                4 | 5 if len > 0 => {
                    store.remove_via((seed as usize >> 8) % len).unwrap();
                    removes += 1;
                }
                _ if len > 0 => {
                    store.update_via((seed as usize >> 8) % len, pos).unwrap();
                }
                _ => {}
            }
            assert_eq!(store.via().len(), inserts - removes);
        }
    }

    #[test]
    fn set_start_twice_keeps_single_start() {
        let mut store = WaypointStore::new();
        assert!(store.set_start(p(1.0, 1.0)).unwrap());
        assert!(!store.set_start(p(1.0, 1.0)).unwrap());
        let starts = store
            .ordered()
            .iter()
            .filter(|w| w.role == WaypointRole::Start)
            .count();
        assert_eq!(starts, 1);
        assert_eq!(store.revision(), 1);
    }

    #[test]
    fn out_of_range_operations_leave_store_untouched() {
        let mut store = WaypointStore::new();
        store.insert_via(0, p(1.0, 1.0)).unwrap();
        let before = store.snapshot();

        assert_eq!(
            store.insert_via(3, p(0.0, 0.0)),
            Err(StoreError::ViaIndexOutOfRange { index: 3, len: 1 })
        );
        assert!(store.update_via(1, p(0.0, 0.0)).is_err());
        assert!(store.remove_via(1).is_err());
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn rejects_non_finite_positions() {
        let mut store = WaypointStore::new();
        assert!(matches!(
            store.set_start(p(f64::NAN, 0.0)),
            Err(StoreError::InvalidPosition(_))
        ));
        assert!(store.start().is_none());
    }

    #[test]
    fn replace_via_is_wholesale() {
        let mut store = WaypointStore::new();
        store.insert_via(0, p(1.0, 1.0)).unwrap();
        store.insert_via(1, p(2.0, 2.0)).unwrap();

        assert!(store.replace_via(vec![p(9.0, 9.0)]).unwrap());
        assert_eq!(store.via(), &[p(9.0, 9.0)]);
        assert!(!store.replace_via(vec![p(9.0, 9.0)]).unwrap());
    }

    #[test]
    fn update_via_to_same_position_is_not_a_mutation() {
        let mut store = WaypointStore::new();
        store.insert_via(0, p(0.5, 0.5)).unwrap();
        let mut rx = store.subscribe();
        rx.borrow_and_update();

        assert!(!store.update_via(0, p(0.5, 0.5)).unwrap());
        assert_eq!(store.revision(), 1);
        assert!(!rx.has_changed().unwrap());

        assert!(store.update_via(0, p(0.6, 0.5)).unwrap());
        assert_eq!(store.revision(), 2);
        assert!(rx.has_changed().unwrap());
    }

    #[test]
    fn subscribers_see_every_mutation() {
        let mut store = WaypointStore::new();
        let mut rx = store.subscribe();
        assert!(!rx.has_changed().unwrap());

        store.set_start(p(1.0, 1.0)).unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().start, Some(p(1.0, 1.0)));

        store.set_start(p(1.0, 1.0)).unwrap();
        assert!(!rx.has_changed().unwrap());

        store.clear_all();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().ordered(), Vec::new());
    }

    #[test]
    fn route_positions_require_both_endpoints() {
        let mut store = WaypointStore::new();
        store.set_start(p(0.0, 0.0)).unwrap();
        store.insert_via(0, p(0.5, 0.5)).unwrap();
        assert!(store.snapshot().route_positions().is_none());
        store.set_end(p(1.0, 1.0)).unwrap();
        assert_eq!(
            store.snapshot().route_positions().unwrap(),
            vec![p(0.0, 0.0), p(0.5, 0.5), p(1.0, 1.0)]
        );
    }
}
