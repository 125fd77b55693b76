//! Device command session abstraction.
//!
//! [`CommandExecutor`] is the seam between the reconciliation engine and the
//! device: a show query returns a parsed value tree, a configure call
//! replays an ordered batch of command lines. Both are issued strictly
//! sequentially against one logical CLI session (`&mut self`; the engine
//! never interleaves device I/O between resource instances).

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{CfgError, CfgResult};
use crate::shell;
use crate::show;

/// Issues read and write commands against the device CLI.
#[async_trait]
pub trait CommandExecutor: Send {
    /// Issues a read-only show query and returns the parsed output tree.
    ///
    /// Queries piped through `display-json` return the parsed JSON document;
    /// plain-text queries return the raw output as a `Value::String`. A
    /// transport failure raises a read error, never an empty tree.
    async fn show(&mut self, query: &str) -> CfgResult<Value>;

    /// Replays an ordered batch of configuration lines against the session.
    ///
    /// The lines are applied in order within one configuration-mode entry,
    /// so context preambles govern the lines that follow them. A transport
    /// failure raises a write error; already-applied lines are not rolled
    /// back.
    async fn configure(&mut self, lines: &[String]) -> CfgResult<()>;
}

/// Command executor backed by the `clish` binary.
///
/// Acquiring the executor acquires the configuration session; dropping it
/// releases the session on every exit path, including error paths.
pub struct ClishExecutor {
    _private: (),
}

impl ClishExecutor {
    /// Acquires the device command session.
    pub fn acquire() -> Self {
        tracing::debug!("Acquiring OS10 CLI session");
        Self { _private: () }
    }
}

impl Drop for ClishExecutor {
    fn drop(&mut self) {
        tracing::debug!("Releasing OS10 CLI session");
    }
}

#[async_trait]
impl CommandExecutor for ClishExecutor {
    async fn show(&mut self, query: &str) -> CfgResult<Value> {
        let cmd = shell::show_invocation(query);
        let result = shell::exec(&cmd).await?;
        if !result.success() {
            return Err(CfgError::read(query, result.combined_output()));
        }
        if query.contains("display-json") {
            show::parse_display_json(&result.stdout)
        } else {
            Ok(Value::String(result.stdout))
        }
    }

    async fn configure(&mut self, lines: &[String]) -> CfgResult<()> {
        if lines.is_empty() {
            return Ok(());
        }
        tracing::info!(?lines, "Applying configuration");
        let cmd = shell::configure_invocation(lines);
        let result = shell::exec(&cmd).await?;
        if !result.success() {
            return Err(CfgError::write(
                lines.join("; "),
                result.combined_output(),
            ));
        }
        Ok(())
    }
}
