//! Click interpretation state machine.

use crate::models::{Position, SelectionMode};

/// Store operation a map click resolves to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClickAction {
    SetStart(Position),
    SetEnd(Position),
}

/// Tracks whether the next map click sets the start, the end, or nothing.
#[derive(Debug, Clone, Default)]
pub struct SelectionMachine {
    mode: SelectionMode,
}

impl SelectionMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    pub fn begin_start(&mut self) {
        self.transition(SelectionMode::PickingStart);
    }

    pub fn begin_end(&mut self) {
        self.transition(SelectionMode::PickingEnd);
    }

    pub fn cancel(&mut self) {
        self.transition(SelectionMode::Idle);
    }

    /// Resolve a map click to the store operation it asks for.
    ///
    /// The mode is left as is; call [`Self::complete`] once the store has
    /// accepted the point.
    pub fn on_map_click(&self, pos: Position) -> Option<ClickAction> {
        match self.mode {
            SelectionMode::Idle => None,
            SelectionMode::PickingStart => Some(ClickAction::SetStart(pos)),
            SelectionMode::PickingEnd => Some(ClickAction::SetEnd(pos)),
        }
    }

    /// Advance past an accepted click.
    ///
    /// `end_present` is whether the store holds an end point; after picking a
    /// start the machine moves on to the end only when it is missing.
    pub fn complete(&mut self, action: ClickAction, end_present: bool) {
        let next = match action {
            ClickAction::SetStart(_) if !end_present => SelectionMode::PickingEnd,
            ClickAction::SetStart(_) | ClickAction::SetEnd(_) => SelectionMode::Idle,
        };
        self.transition(next);
    }

    fn transition(&mut self, next: SelectionMode) {
        if self.mode != next {
            tracing::debug!(from = ?self.mode, to = ?next, "Selection mode changed");
            self.mode = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const P: Position = Position::new(18.0, -16.0);

    fn click(machine: &mut SelectionMachine, end_present: bool) -> Option<ClickAction> {
        let action = machine.on_map_click(P)?;
        machine.complete(action, end_present);
        Some(action)
    }

    #[test]
    fn idle_clicks_do_nothing() {
        let mut machine = SelectionMachine::new();
        assert_eq!(click(&mut machine, false), None);
        assert_eq!(machine.mode(), SelectionMode::Idle);
    }

    #[test]
    fn picking_start_moves_to_end_when_end_missing() {
        let mut machine = SelectionMachine::new();
        machine.begin_start();
        assert_eq!(click(&mut machine, false), Some(ClickAction::SetStart(P)));
        assert_eq!(machine.mode(), SelectionMode::PickingEnd);

        assert_eq!(click(&mut machine, false), Some(ClickAction::SetEnd(P)));
        assert_eq!(machine.mode(), SelectionMode::Idle);
    }

    #[test]
    fn picking_start_goes_idle_when_end_present() {
        let mut machine = SelectionMachine::new();
        machine.begin_start();
        assert_eq!(click(&mut machine, true), Some(ClickAction::SetStart(P)));
        assert_eq!(machine.mode(), SelectionMode::Idle);
    }

    #[test]
    fn uncommitted_click_keeps_mode() {
        let mut machine = SelectionMachine::new();
        machine.begin_start();
        assert_eq!(machine.on_map_click(P), Some(ClickAction::SetStart(P)));
        assert_eq!(machine.mode(), SelectionMode::PickingStart);

        machine.begin_end();
        assert_eq!(machine.on_map_click(P), Some(ClickAction::SetEnd(P)));
        assert_eq!(machine.mode(), SelectionMode::PickingEnd);
    }

    #[test]
    fn cancel_returns_to_idle() {
        let mut machine = SelectionMachine::new();
        machine.begin_end();
        machine.cancel();
        assert_eq!(machine.on_map_click(P), None);
    }

    #[test]
    fn latest_command_wins() {
        let mut machine = SelectionMachine::new();
        machine.begin_start();
        machine.begin_end();
        assert_eq!(machine.on_map_click(P), Some(ClickAction::SetEnd(P)));
    }
}
