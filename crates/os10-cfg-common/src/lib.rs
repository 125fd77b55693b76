//! Common infrastructure for OS10 configuration management.
//!
//! This crate provides the plumbing shared by the reconciliation engine and
//! the per-domain resource tables:
//!
//! - [`error`]: the error taxonomy (validation, read, mismatch, write)
//! - [`shell`]: safe shell execution of the OS10 CLI with proper quoting
//! - [`session`]: the [`CommandExecutor`] seam and its `clish` implementation
//! - [`show`]: parsed show-output trees and nested-value extraction
//!
//! # Architecture
//!
//! The reconciliation engine reads device state through a
//! [`CommandExecutor`], extracts attribute values from the parsed tree with
//! [`show::extract`], and writes back ordered command-line batches through
//! the same executor. All device I/O is strictly sequential against one
//! logical CLI session.

pub mod error;
pub mod session;
pub mod shell;
pub mod show;

// Re-export commonly used items at crate root
pub use error::{CfgError, CfgResult};
pub use session::{ClishExecutor, CommandExecutor};

/// Parsed show-output tree type.
pub use serde_json::Value;
