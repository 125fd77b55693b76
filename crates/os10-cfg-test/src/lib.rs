//! Integration test infrastructure for the OS10 configuration workspace
//!
//! Provides:
//! - A scripted mock executor that replays canned show trees and captures
//!   configure batches
//! - Fixture builders for common running-configuration shapes
//! - Verification helpers over captured command lines

pub mod executor;
pub mod fixtures;
mod verification;

pub use executor::MockExecutor;
pub use verification::*;

/// Installs a compact tracing subscriber so failing tests show engine
/// logs. Safe to call from every test; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}
