//! Resource instances and the reconciliation driver.
//!
//! A [`Resource`] value identifies one uniquely-keyed configuration object
//! (a BGP instance, one neighbor, one interface) and binds the generic
//! engine to its domain: the show query that reads its state, the context
//! preamble that reaches its configuration scope, the removal lines for
//! `ensure: absent`, and the attribute descriptor table. The [`Reconciler`]
//! drives one instance through a single pass: read, diff, emit, execute.

use serde_json::Value;

use os10_cfg_common::{CfgError, CfgResult, CommandExecutor};

use crate::attr::{normalize, AttrMap, AttrSpec, AttrValue};
use crate::diff::{diff_attrs, validate_attrs, Operation};
use crate::emit::{emit, RenderCtx};

/// Declared lifecycle target for a resource instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ensure {
    /// The instance should exist with the declared attributes.
    Present,
    /// The instance should not exist.
    Absent,
}

/// Desired state declared by the caller for one reconciliation pass.
///
/// Only explicitly declared attributes participate in the diff; undeclared
/// attributes are left untouched.
#[derive(Debug, Clone)]
pub struct DesiredState {
    ensure: Ensure,
    attrs: AttrMap,
}

impl DesiredState {
    /// Declares that the instance should exist.
    pub fn present() -> Self {
        DesiredState {
            ensure: Ensure::Present,
            attrs: AttrMap::new(),
        }
    }

    /// Declares that the instance should not exist.
    pub fn absent() -> Self {
        DesiredState {
            ensure: Ensure::Absent,
            attrs: AttrMap::new(),
        }
    }

    /// Declares a desired attribute value.
    pub fn set(mut self, name: &'static str, value: AttrValue) -> Self {
        self.attrs.insert(name, value);
        self
    }

    /// The declared lifecycle target.
    pub fn ensure(&self) -> Ensure {
        self.ensure
    }

    /// The declared attribute values.
    pub fn attrs(&self) -> &AttrMap {
        &self.attrs
    }
}

/// Current device state for one resource instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CurrentState {
    /// The instance is not configured on the device.
    NotFound,
    /// The instance exists; raw attribute values as extracted.
    Found(AttrMap),
    /// An instance exists but its identifying key differs from the declared
    /// one (e.g. a BGP instance under another ASN).
    Conflicting {
        /// The identifying field in conflict.
        field: &'static str,
        /// The value found on the device.
        found: String,
    },
}

/// How a resource resolves a conflicting instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictPolicy {
    /// Raise a mismatch error; the caller resolves out-of-band.
    Fail,
    /// Remove the conflicting instance, then create the declared one.
    Replace,
}

/// One uniquely-keyed configuration object bound to the generic engine.
pub trait Resource: Send + Sync {
    /// Domain name, for logging.
    fn domain(&self) -> &'static str;

    /// The attribute descriptor table for this domain.
    fn attr_specs(&self) -> &'static [AttrSpec];

    /// The show query that reads this instance's configuration.
    fn show_query(&self) -> String;

    /// Context preamble reaching this instance's configuration scope, in
    /// nesting order. For most domains entering the context also creates
    /// the instance.
    fn context(&self) -> Vec<String>;

    /// Command lines that remove the whole instance.
    fn removal(&self) -> Vec<String>;

    /// Template variables substituted into emission templates.
    fn template_vars(&self) -> Vec<(&'static str, String)> {
        Vec::new()
    }

    /// Extracts this instance's current state from a parsed show tree.
    fn read_state(&self, tree: &Value) -> CfgResult<CurrentState>;

    /// Cross-attribute validation of the desired state. Per-attribute
    /// constraints live in the descriptor table; this hook covers rules
    /// spanning attributes (e.g. dampening parameters without dampening).
    fn validate(&self, _desired: &DesiredState) -> CfgResult<()> {
        Ok(())
    }

    /// How to resolve a conflicting instance.
    fn conflict_policy(&self) -> ConflictPolicy {
        ConflictPolicy::Fail
    }

    /// Combined creation lines overriding per-attribute emission, for
    /// domains whose creation grammar is a single command carrying several
    /// attributes (users, NTP servers). `None` uses the generic path.
    fn creation_lines(&self, _desired: &AttrMap) -> Option<Vec<String>> {
        None
    }
}

/// Per-pass progress of one resource instance.
///
/// `CreatePending` and `DiffPending` both terminate in `Emitted`; there is
/// no retry loop in the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassState {
    /// Nothing read yet.
    Unknown,
    /// Current state has been read.
    Read,
    /// Instance missing; creation command set pending.
    CreatePending,
    /// Instance found; attribute diff pending.
    DiffPending,
    /// Command lines handed to the executor.
    Emitted,
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Current state already matched; no commands executed.
    InSync,
    /// Commands were executed to converge the instance.
    Applied {
        /// The executed command lines, context preamble included.
        commands: Vec<String>,
    },
    /// The instance was removed (`ensure: absent`).
    Removed {
        /// The executed command lines.
        commands: Vec<String>,
    },
}

impl Outcome {
    /// The executed command lines, empty when in sync.
    pub fn commands(&self) -> &[String] {
        match self {
            Outcome::InSync => &[],
            Outcome::Applied { commands } | Outcome::Removed { commands } => commands,
        }
    }
}

/// Drives resource instances through a read, diff, emit, execute pass.
///
/// Strictly sequential: each instance's pass runs to completion before the
/// next begins, and all device calls go through one executor session.
pub struct Reconciler<E: CommandExecutor> {
    executor: E,
}

impl<E: CommandExecutor> Reconciler<E> {
    /// Creates a reconciler over an acquired executor session.
    pub fn new(executor: E) -> Self {
        Reconciler { executor }
    }

    /// Access to the underlying executor.
    pub fn executor_mut(&mut self) -> &mut E {
        &mut self.executor
    }

    /// Releases the reconciler, returning the executor.
    pub fn into_executor(self) -> E {
        self.executor
    }

    /// Reads the instance's current state from the device.
    ///
    /// Transport and parse failures propagate as read failures; a missing
    /// instance is the tagged `NotFound` variant, never an error.
    pub async fn read_current<R: Resource>(&mut self, resource: &R) -> CfgResult<CurrentState> {
        let query = resource.show_query();
        tracing::debug!(domain = resource.domain(), query = %query, "Reading current state");
        let tree = self.executor.show(&query).await?;
        resource.read_state(&tree)
    }

    /// Computes the ordered operation list for a present-state diff.
    pub fn compute_operations<R: Resource>(
        &self,
        resource: &R,
        current: &CurrentState,
        desired: &DesiredState,
    ) -> CfgResult<Vec<Operation>> {
        resource.validate(desired)?;
        match current {
            CurrentState::Found(attrs) => {
                diff_attrs(resource.attr_specs(), Some(attrs), desired.attrs())
            }
            CurrentState::NotFound => diff_attrs(resource.attr_specs(), None, desired.attrs()),
            CurrentState::Conflicting { field, found } => {
                Err(CfgError::mismatch(*field, "declared key", found.clone()))
            }
        }
    }

    /// Renders operations into command lines, context preamble included.
    pub fn render<R: Resource>(
        &self,
        resource: &R,
        current: &CurrentState,
        desired: &DesiredState,
        ops: &[Operation],
    ) -> Vec<String> {
        let specs = resource.attr_specs();
        let empty = AttrMap::new();
        let current_attrs = match current {
            CurrentState::Found(attrs) => normalize_all(specs, attrs),
            _ => empty,
        };
        let vars = resource.template_vars();
        let ctx = RenderCtx {
            vars: &vars,
            current: &current_attrs,
            desired: desired.attrs(),
        };
        emit(specs, &resource.context(), ops, &ctx)
    }

    /// Executes rendered command lines against the device.
    pub async fn apply(&mut self, lines: &[String]) -> CfgResult<()> {
        self.executor.configure(lines).await
    }

    /// Runs one full reconciliation pass for one resource instance.
    pub async fn converge<R: Resource>(
        &mut self,
        resource: &R,
        desired: &DesiredState,
    ) -> CfgResult<Outcome> {
        self.transition(resource, PassState::Unknown);
        resource.validate(desired)?;
        validate_attrs(resource.attr_specs(), desired.attrs())?;

        let current = self.read_current(resource).await?;
        self.transition(resource, PassState::Read);

        let outcome = match (desired.ensure(), &current) {
            (Ensure::Absent, CurrentState::NotFound) => Outcome::InSync,
            (Ensure::Absent, _) => {
                // Short-circuit: only the top-level removal, no per-attribute
                // diffing.
                let commands = resource.removal();
                self.transition(resource, PassState::Emitted);
                self.apply(&commands).await?;
                Outcome::Removed { commands }
            }
            (Ensure::Present, CurrentState::Conflicting { field, found }) => {
                match resource.conflict_policy() {
                    ConflictPolicy::Fail => {
                        return Err(CfgError::mismatch(*field, "declared key", found.clone()));
                    }
                    ConflictPolicy::Replace => {
                        self.transition(resource, PassState::CreatePending);
                        let mut commands = resource.removal();
                        commands.extend(self.creation_commands(resource, desired)?);
                        self.transition(resource, PassState::Emitted);
                        self.apply(&commands).await?;
                        Outcome::Applied { commands }
                    }
                }
            }
            (Ensure::Present, CurrentState::NotFound) => {
                self.transition(resource, PassState::CreatePending);
                let commands = self.creation_commands(resource, desired)?;
                self.transition(resource, PassState::Emitted);
                self.apply(&commands).await?;
                Outcome::Applied { commands }
            }
            (Ensure::Present, CurrentState::Found(_)) => {
                self.transition(resource, PassState::DiffPending);
                let ops = self.compute_operations(resource, &current, desired)?;
                if ops.is_empty() {
                    tracing::debug!(domain = resource.domain(), "Already in sync");
                    Outcome::InSync
                } else {
                    let commands = self.render(resource, &current, desired, &ops);
                    self.transition(resource, PassState::Emitted);
                    self.apply(&commands).await?;
                    Outcome::Applied { commands }
                }
            }
        };

        tracing::info!(
            domain = resource.domain(),
            executed = outcome.commands().len(),
            "Reconciliation pass complete"
        );
        Ok(outcome)
    }

    fn transition<R: Resource>(&self, resource: &R, state: PassState) {
        tracing::trace!(domain = resource.domain(), ?state, "Pass state");
    }

    fn creation_commands<R: Resource>(
        &self,
        resource: &R,
        desired: &DesiredState,
    ) -> CfgResult<Vec<String>> {
        if let Some(lines) = resource.creation_lines(desired.attrs()) {
            return Ok(lines);
        }
        let ops = diff_attrs(resource.attr_specs(), None, desired.attrs())?;
        if ops.is_empty() {
            // Entering the configuration context is itself the creation
            // command for context-scoped instances.
            return Ok(resource.context());
        }
        Ok(self.render(resource, &CurrentState::NotFound, desired, &ops))
    }
}

fn normalize_all(specs: &[AttrSpec], attrs: &AttrMap) -> AttrMap {
    attrs
        .iter()
        .map(|(name, value)| {
            let normalized = match AttrSpec::find(specs, name) {
                Some(spec) => normalize(spec, value),
                None => value.clone(),
            };
            (*name, normalized)
        })
        .collect()
}
