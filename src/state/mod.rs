//! Observed-state module for the reconciliation engine.
//!
//! This module defines the snapshot of a remote resource that the caller
//! keeps between reconciliations, and the write-back interface the engine
//! uses to hand over intermediate snapshots.

mod types;
mod writer;

pub use types::{LifecycleState, ObservedState};
pub use writer::{Discard, StateWriter};
