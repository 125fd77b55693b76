//! Error types for OS10 configuration operations.
//!
//! This module defines the error taxonomy used throughout the workspace.
//! All errors implement `std::error::Error` via `thiserror`.

use std::io;
use thiserror::Error;

/// Result type alias for configuration operations.
pub type CfgResult<T> = Result<T, CfgError>;

/// Errors that can occur while reconciling device configuration.
#[derive(Debug, Error)]
pub enum CfgError {
    /// A desired value fails a domain constraint. Raised before any device
    /// interaction; nothing is partially applied.
    #[error("Invalid value for {field}: {message}")]
    Validation {
        /// The attribute or parameter that failed validation.
        field: String,
        /// Error message.
        message: String,
    },

    /// Transport or parsing failure while fetching current state.
    /// Reconciliation for the instance aborts; no writes are attempted.
    #[error("Failed to read device state with '{query}': {message}")]
    Read {
        /// The show query that failed.
        query: String,
        /// Error message.
        message: String,
    },

    /// A precondition on the device's identifying state does not hold
    /// (e.g. the configured ASN differs from the declared one).
    #[error("Device configuration conflict on {field}: expected {expected}, found {found}")]
    Mismatch {
        /// The identifying field in conflict.
        field: String,
        /// The declared value.
        expected: String,
        /// The value currently configured on the device.
        found: String,
    },

    /// Transport failure while executing configuration commands.
    /// Partially-applied lines are not rolled back.
    #[error("Failed to apply configuration '{line}': {message}")]
    Write {
        /// The command line (or batch head) that failed.
        line: String,
        /// Error message.
        message: String,
    },

    /// Failed to spawn the CLI process at all.
    #[error("Failed to execute shell command '{command}': {source}")]
    ShellExec {
        /// The command that failed to execute.
        command: String,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },

    /// Device output could not be parsed into a structured tree.
    #[error("Failed to parse device output: {message}")]
    Parse {
        /// Error message.
        message: String,
    },
}

impl CfgError {
    /// Creates a validation error.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates a read failure.
    pub fn read(query: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Read {
            query: query.into(),
            message: message.into(),
        }
    }

    /// Creates a mismatch error.
    pub fn mismatch(
        field: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::Mismatch {
            field: field.into(),
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Creates a write failure.
    pub fn write(line: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Write {
            line: line.into(),
            message: message.into(),
        }
    }

    /// Creates a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Returns true if this error was raised before any device interaction.
    pub fn is_validation(&self) -> bool {
        matches!(self, CfgError::Validation { .. })
    }

    /// Returns true if this error occurred while reading current state.
    pub fn is_read_failure(&self) -> bool {
        matches!(
            self,
            CfgError::Read { .. } | CfgError::Parse { .. } | CfgError::ShellExec { .. }
        )
    }

    /// Returns true if this error occurred while applying commands.
    pub fn is_write_failure(&self) -> bool {
        matches!(self, CfgError::Write { .. })
    }
}
