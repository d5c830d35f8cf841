//! Snapshot write-back interface.
//!
//! The engine does not persist anything itself. Every externally visible
//! step hands the new snapshot to a caller-owned `StateWriter`, so an
//! interrupted operation never loses the resource id.

use super::types::ObservedState;

/// Sink for observed-state snapshots.
pub trait StateWriter: Send {
    /// Records the latest snapshot of the resource.
    fn write(&mut self, state: &ObservedState);

    /// Records that the resource is confirmed absent.
    fn clear(&mut self);
}

/// Keeps only the latest snapshot.
impl StateWriter for Option<ObservedState> {
    fn write(&mut self, state: &ObservedState) {
        *self = Some(state.clone());
    }

    fn clear(&mut self) {
        *self = None;
    }
}

/// Keeps every snapshot; `clear` keeps the history.
impl StateWriter for Vec<ObservedState> {
    fn write(&mut self, state: &ObservedState) {
        self.push(state.clone());
    }

    fn clear(&mut self) {}
}

/// Discards every snapshot.
#[derive(Debug, Default, Clone, Copy)]
pub struct Discard;

impl StateWriter for Discard {
    fn write(&mut self, _state: &ObservedState) {}

    fn clear(&mut self) {}
}

impl<W: StateWriter + ?Sized> StateWriter for &mut W {
    fn write(&mut self, state: &ObservedState) {
        (**self).write(state);
    }

    fn clear(&mut self) {
        (**self).clear();
    }
}
