//! Change planning.
//!
//! This module compares a desired configuration with the observed state of
//! one resource and classifies the work needed to converge them.

mod diff;
mod plan;

pub use diff::{DiffEngine, IN_PLACE_DATA_SOURCE_KEYS, LIFECYCLE_STATE_FIELD};
pub use plan::{ChangeClass, ChangePlan, FieldChange, SENSITIVE_VALUE};
