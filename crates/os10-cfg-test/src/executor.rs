//! Scripted command executor for tests.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use serde_json::Value;

use os10_cfg_common::{CfgError, CfgResult, CommandExecutor};

/// Command executor that replays canned show output and captures configure
/// batches instead of touching a device.
///
/// Show trees are queued per query: each read pops the next tree, and the
/// last one sticks so repeated reads keep answering. Unscripted queries
/// fail the test loudly.
#[derive(Default)]
pub struct MockExecutor {
    shows: HashMap<String, VecDeque<Value>>,
    failing_shows: HashMap<String, String>,
    configure_batches: Vec<Vec<String>>,
    fail_configure: Option<String>,
}

impl MockExecutor {
    /// Creates an empty executor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a show tree for a query.
    pub fn with_show(mut self, query: impl Into<String>, tree: Value) -> Self {
        self.shows.entry(query.into()).or_default().push_back(tree);
        self
    }

    /// Makes a query fail with a transport error.
    pub fn with_show_error(mut self, query: impl Into<String>, message: impl Into<String>) -> Self {
        self.failing_shows.insert(query.into(), message.into());
        self
    }

    /// Makes the next configure call fail with a transport error.
    pub fn with_configure_error(mut self, message: impl Into<String>) -> Self {
        self.fail_configure = Some(message.into());
        self
    }

    /// All captured configure batches, in execution order.
    pub fn configure_batches(&self) -> &[Vec<String>] {
        &self.configure_batches
    }

    /// All captured configure lines, flattened.
    pub fn configured_lines(&self) -> Vec<String> {
        self.configure_batches.iter().flatten().cloned().collect()
    }

    /// True when no configure call was made.
    pub fn is_untouched(&self) -> bool {
        self.configure_batches.is_empty()
    }
}

#[async_trait]
impl CommandExecutor for MockExecutor {
    async fn show(&mut self, query: &str) -> CfgResult<Value> {
        if let Some(message) = self.failing_shows.get(query) {
            return Err(CfgError::read(query, message.clone()));
        }
        let Some(queue) = self.shows.get_mut(query) else {
            return Err(CfgError::read(query, "unscripted show query in test"));
        };
        match queue.len() {
            0 => Err(CfgError::read(query, "show queue exhausted in test")),
            1 => Ok(queue.front().cloned().unwrap_or(Value::Null)),
            _ => Ok(queue.pop_front().unwrap_or(Value::Null)),
        }
    }

    async fn configure(&mut self, lines: &[String]) -> CfgResult<()> {
        if let Some(message) = self.fail_configure.take() {
            return Err(CfgError::write(
                lines.first().cloned().unwrap_or_default(),
                message,
            ));
        }
        self.configure_batches.push(lines.to_vec());
        Ok(())
    }
}
