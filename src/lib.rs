// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![cfg_attr(not(test), deny(warnings))] // All warnings are treated as errors
#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![cfg_attr(not(test), deny(missing_docs))] // All public items must be documented
#![cfg_attr(not(test), deny(dead_code))] // Unused code is forbidden
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![cfg_attr(not(test), warn(clippy::unwrap_used))] // unwrap() warning
#![cfg_attr(not(test), warn(clippy::expect_used))] // expect() warning
#![cfg_attr(not(test), warn(clippy::panic))] // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # Ambar Reconcile
//!
//! A reconciliation engine for Ambar data sources, filters and data
//! destinations.
//!
//! ## Overview
//!
//! Ambar resources are created, updated and deleted asynchronously: every
//! mutating call returns immediately and the resource settles later. This
//! crate decides which remote operation a desired configuration needs, waits
//! for the resource to settle, and reports every intermediate snapshot so the
//! caller never loses track of a resource id.
//!
//! ## Architecture
//!
//! 1. **Desired configuration**: a [`config::ResourceConfig`] per resource
//! 2. **Observed state**: the caller's last [`state::ObservedState`]
//! 3. **Diff engine**: classifies changes as in-place, credential or replacing
//! 4. **Reconciler**: issues the remote calls and polls until they settle
//!
//! Replacement is decided here but sequenced by the caller: an update that
//! cannot be applied in place returns [`UpdateOutcome::ReplaceRequired`].
//!
//! ## Modules
//!
//! - [`config`]: Desired configuration types and engine settings
//! - [`state`]: Observed snapshots and the write-back interface
//! - [`api`]: Remote API contract and its HTTP client
//! - [`planner`]: Change classification
//! - [`poller`]: Lifecycle polling
//! - [`reconciler`]: Per-resource state machine
//! - [`testing`]: In-memory remote for tests
//!
//! ## Example
//!
//! ```ignore
//! use ambar_reconcile::{AmbarClient, ConfigParser, DataSourceResource, Reconciler};
//! use ambar_reconcile::config::DataSourceSpec;
//!
//! let config = ConfigParser::new().load_file("ambar.yaml")?;
//! let client = AmbarClient::new(&config.client)?;
//! let data_sources = DataSourceResource::new(Reconciler::from_config(&client, &config.polling));
//!
//! let desired = DataSourceSpec::new("postgres", "partition", "serial")
//!     .with_config("hostname", "db.internal")
//!     .with_credentials("replicator", "secret");
//!
//! let mut state = None;
//! let observed = data_sources.create(&desired, &mut state).await?;
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod planner;
pub mod poller;
pub mod reconciler;
pub mod state;
pub mod testing;

// ============================================================================
// Re-exports
// ============================================================================

pub use api::{AmbarClient, ResourceApi};
pub use config::{ConfigParser, ConfigValidator, EngineConfig, ResourceConfig, ResourceKind};
pub use error::{AmbarError, Result};
pub use logging::{init_logging, init_logging_with_filter};
pub use planner::{ChangePlan, DiffEngine};
pub use poller::Poller;
pub use reconciler::{
    DataDestinationResource, DataSourceResource, FilterResource, Reconciler, UpdateOutcome,
};
pub use state::{LifecycleState, ObservedState, StateWriter};
