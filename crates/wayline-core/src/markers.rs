//! Marker synchronizer: the rendered marker set as a projection of the store.
//!
//! Markers live in an arena that is thrown away and rebuilt on every store
//! change. Each rebuild gets a new epoch and every marker carries the epoch it
//! was built in, so events from markers of an older arena are ignored instead
//! of being applied against the wrong index.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::time::Instant;

use crate::geofence::GeofenceTable;
use crate::models::{Position, WaypointRole};
use crate::store::StoreSnapshot;

/// How long a clicked via marker listens for the Delete key.
pub const DELETE_WINDOW: Duration = Duration::from_secs(5);

/// Tooltip shown while a via marker's delete window is open.
pub const DELETE_PROMPT: &str = "Press Delete to remove this point";

/// Position of a marker within the ordered waypoint list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "role", content = "index", rename_all = "lowercase")]
pub enum MarkerKey {
    Start,
    Via(usize),
    End,
}

impl MarkerKey {
    pub fn role(&self) -> WaypointRole {
        match self {
            Self::Start => WaypointRole::Start,
            Self::Via(_) => WaypointRole::Via,
            Self::End => WaypointRole::End,
        }
    }

    /// Label used when no geofence names the marker's position.
    pub fn default_label(&self) -> String {
        match self {
            Self::Start => "Start".to_string(),
            Self::Via(index) => format!("Via point {}", index + 1),
            Self::End => "Destination".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerColor {
    Green,
    Blue,
    Red,
}

impl From<WaypointRole> for MarkerColor {
    fn from(role: WaypointRole) -> Self {
        match role {
            WaypointRole::Start => Self::Green,
            WaypointRole::Via => Self::Blue,
            WaypointRole::End => Self::Red,
        }
    }
}

/// Identity of a rendered marker: its arena epoch plus its key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MarkerId {
    pub epoch: u64,
    pub key: MarkerKey,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub id: MarkerId,
    pub position: Position,
    pub color: MarkerColor,
    /// Resting tooltip: geofence name or role label
    pub label: String,
    pub draggable: bool,
}

/// Store edit resulting from a marker drag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragEdit {
    Start(Position),
    End(Position),
    Via(usize, Position),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TooltipUpdate {
    pub marker: MarkerId,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteWindowState {
    Armed,
    Deleted,
    Expired,
}

/// A single armed delete listener for one via marker.
///
/// `Armed → Deleted` on a Delete key before the deadline,
/// `Armed → Expired` once the deadline passes. Both are terminal.
#[derive(Debug, Clone)]
pub struct DeleteWindow {
    marker: MarkerId,
    index: usize,
    deadline: Instant,
    state: DeleteWindowState,
}

impl DeleteWindow {
    pub fn arm(marker: MarkerId, index: usize, now: Instant) -> Self {
        Self {
            marker,
            index,
            deadline: now + DELETE_WINDOW,
            state: DeleteWindowState::Armed,
        }
    }

    pub fn marker(&self) -> MarkerId {
        self.marker
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn state(&self) -> DeleteWindowState {
        self.state
    }

    /// Delete key pressed at `now`. Returns the via index to remove, if any.
    pub fn press_delete(&mut self, now: Instant) -> Option<usize> {
        if self.expire_if_due(now) || self.state != DeleteWindowState::Armed {
            return None;
        }
        self.state = DeleteWindowState::Deleted;
        Some(self.index)
    }

    /// Move to `Expired` if the deadline has passed. Returns true on that transition.
    pub fn expire_if_due(&mut self, now: Instant) -> bool {
        if self.state == DeleteWindowState::Armed && now >= self.deadline {
            self.state = DeleteWindowState::Expired;
            return true;
        }
        false
    }
}

/// Outcome of a Delete keypress routed through the synchronizer.
#[derive(Debug, Clone, PartialEq)]
pub enum DeleteKeyOutcome {
    /// No window was armed
    Ignored,
    /// Window closed before the key arrived; tooltip reverts
    Expired(TooltipUpdate),
    /// Remove the via point at this index
    Remove(usize),
}

/// Keeps the marker arena in step with the store.
#[derive(Debug)]
pub struct MarkerSynchronizer {
    snapshots: watch::Receiver<StoreSnapshot>,
    geofences: Arc<GeofenceTable>,
    epoch: u64,
    markers: Vec<Marker>,
    delete_window: Option<DeleteWindow>,
}

impl MarkerSynchronizer {
    pub fn new(snapshots: watch::Receiver<StoreSnapshot>, geofences: Arc<GeofenceTable>) -> Self {
        let mut sync = Self {
            snapshots,
            geofences,
            epoch: 0,
            markers: Vec::new(),
            delete_window: None,
        };
        let initial = sync.snapshots.borrow_and_update().clone();
        sync.rebuild(&initial);
        sync
    }

    /// Rebuild if the store published since the last sync. Returns whether it did.
    pub fn sync(&mut self) -> bool {
        if !self.snapshots.has_changed().unwrap_or(false) {
            return false;
        }
        let snapshot = self.snapshots.borrow_and_update().clone();
        self.rebuild(&snapshot);
        true
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Marker for `id`, only if it belongs to the current arena.
    pub fn resolve(&self, id: MarkerId) -> Option<&Marker> {
        if id.epoch != self.epoch {
            tracing::debug!(?id, current = self.epoch, "Ignoring event from stale marker");
            return None;
        }
        self.markers.iter().find(|m| m.id == id)
    }

    /// Store edit for a marker dropped at `pos`.
    pub fn drag_edit(&self, id: MarkerId, pos: Position) -> Option<DragEdit> {
        let marker = self.resolve(id)?;
        Some(match marker.id.key {
            MarkerKey::Start => DragEdit::Start(pos),
            MarkerKey::End => DragEdit::End(pos),
            MarkerKey::Via(index) => DragEdit::Via(index, pos),
        })
    }

    /// Arm the delete window for a clicked via marker.
    ///
    /// Returns tooltip changes: the prompt for the clicked marker, preceded by
    /// a revert for a previously armed marker if one is being replaced.
    pub fn arm_delete(&mut self, id: MarkerId, now: Instant) -> Vec<TooltipUpdate> {
        let Some(index) = self.resolve(id).and_then(|m| match m.id.key {
            MarkerKey::Via(index) => Some(index),
            _ => None,
        }) else {
            return Vec::new();
        };

        let mut updates = Vec::with_capacity(2);
        if let Some(previous) = self.delete_window.take() {
            if previous.marker() != id && previous.state() == DeleteWindowState::Armed {
                updates.extend(self.resting_tooltip(previous.marker()));
            }
        }
        self.delete_window = Some(DeleteWindow::arm(id, index, now));
        tracing::debug!(index, "Delete window armed");
        updates.push(TooltipUpdate {
            marker: id,
            text: DELETE_PROMPT.to_string(),
        });
        updates
    }

    /// Route a Delete keypress to the armed window, detaching it either way.
    pub fn press_delete(&mut self, now: Instant) -> DeleteKeyOutcome {
        let Some(mut window) = self.delete_window.take() else {
            return DeleteKeyOutcome::Ignored;
        };
        match window.press_delete(now) {
            Some(index) => DeleteKeyOutcome::Remove(index),
            None => match self.resting_tooltip(window.marker()) {
                Some(update) => DeleteKeyOutcome::Expired(update),
                None => DeleteKeyOutcome::Ignored,
            },
        }
    }

    /// Close the delete window if its deadline passed, reverting the tooltip.
    pub fn poll_expiry(&mut self, now: Instant) -> Option<TooltipUpdate> {
        let window = self.delete_window.as_mut()?;
        if !window.expire_if_due(now) {
            return None;
        }
        let marker = window.marker();
        self.delete_window = None;
        tracing::debug!(?marker, "Delete window expired");
        self.resting_tooltip(marker)
    }

    pub fn delete_deadline(&self) -> Option<Instant> {
        self.delete_window.as_ref().map(DeleteWindow::deadline)
    }

    pub fn armed_marker(&self) -> Option<MarkerId> {
        self.delete_window.as_ref().map(DeleteWindow::marker)
    }

    fn resting_tooltip(&self, id: MarkerId) -> Option<TooltipUpdate> {
        self.resolve(id).map(|m| TooltipUpdate {
            marker: id,
            text: m.label.clone(),
        })
    }

    fn rebuild(&mut self, snapshot: &StoreSnapshot) {
        self.epoch += 1;
        self.delete_window = None;
        self.markers.clear();

        let epoch = self.epoch;
        let mut keyed: Vec<(MarkerKey, Position)> = Vec::with_capacity(snapshot.via.len() + 2);
        keyed.extend(snapshot.start.map(|p| (MarkerKey::Start, p)));
        keyed.extend(
            snapshot
                .via
                .iter()
                .enumerate()
                .map(|(i, p)| (MarkerKey::Via(i), *p)),
        );
        keyed.extend(snapshot.end.map(|p| (MarkerKey::End, p)));

        for (key, position) in keyed {
            let label = self
                .geofences
                .lookup(position)
                .map(|area| area.name.clone())
                .unwrap_or_else(|| key.default_label());
            self.markers.push(Marker {
                id: MarkerId { epoch, key },
                position,
                color: key.role().into(),
                label,
                draggable: true,
            });
        }
        tracing::debug!(epoch, markers = self.markers.len(), "Marker arena rebuilt");
    }
}
