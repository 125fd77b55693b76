//! Generic declarative-configuration reconciliation engine for OS10.
//!
//! Reconciliation converges a device toward declared state in a single
//! pass per resource instance: read the current configuration through a
//! [`CommandExecutor`](os10_cfg_common::CommandExecutor), normalize and
//! diff it against the declared attributes, render the minimal ordered
//! command set, and execute it.
//!
//! - [`attr`]: attribute values, descriptor tables and normalization
//! - [`diff`]: the diff algorithm producing ordered set/unset operations
//! - [`emit`]: template-driven command-line rendering
//! - [`resource`]: the [`Resource`] binding and the [`Reconciler`] driver
//!
//! Configuration domains are instantiated as data: a key type implementing
//! [`Resource`] plus a static [`AttrSpec`] table. The engine carries no
//! per-domain code.

pub mod attr;
pub mod diff;
pub mod emit;
pub mod resource;

// Re-export commonly used items at crate root
pub use attr::{AttrMap, AttrSpec, AttrValue, Coercion, Collection, DefaultPolicy};
pub use diff::{Action, Operation};
pub use emit::{EmitRule, RenderCtx};
pub use resource::{
    ConflictPolicy, CurrentState, DesiredState, Ensure, Outcome, PassState, Reconciler, Resource,
};
