//! Global LLDP configuration.
//!
//! Singleton domain: LLDP timers, global enable and MED network policies.
//! There is exactly one instance and it always exists; `ensure: absent` has
//! nothing to remove.
//!
//! MED network policies are keyed by policy id; the policy parameters
//! render as one combined line:
//!
//! ```ignore
//! let desired = DesiredState::present().set(
//!     "med_network_policy",
//!     AttrValue::map([("8", "app voice vlan 3 vlan-type tag priority 3 dscp 4")]),
//! );
//! ```

use serde_json::Value;

use os10_cfg_common::{show, CfgResult};
use os10_reconcile::{
    AttrMap, AttrSpec, AttrValue, Coercion, Collection, CurrentState, DefaultPolicy, EmitRule,
    Resource,
};

use crate::validators;

/// The singleton LLDP configuration.
pub struct Lldp;

impl Lldp {
    /// Creates the singleton resource.
    pub fn new() -> Self {
        Lldp
    }
}

impl Default for Lldp {
    fn default() -> Self {
        Lldp::new()
    }
}

fn v_reinit(v: &AttrValue) -> Result<(), String> {
    validators::int_range(v, 1, 10)
}

fn v_holdtime(v: &AttrValue) -> Result<(), String> {
    validators::int_range(v, 2, 10)
}

fn v_timer(v: &AttrValue) -> Result<(), String> {
    validators::int_range(v, 5, 254)
}

fn v_fast_start(v: &AttrValue) -> Result<(), String> {
    validators::int_range(v, 1, 10)
}

static ATTRS: &[AttrSpec] = &[
    AttrSpec {
        name: "reinit",
        collection: Collection::Scalar,
        default: DefaultPolicy::EmptyRemoves,
        coerce: Coercion::None,
        emit: EmitRule::Scalar {
            set: "lldp reinit {}",
            unset: "no lldp reinit",
        },
        validate: Some(v_reinit),
    },
    AttrSpec {
        name: "holdtime_multiplier",
        collection: Collection::Scalar,
        default: DefaultPolicy::EmptyRemoves,
        coerce: Coercion::None,
        emit: EmitRule::Scalar {
            set: "lldp holdtime-multiplier {}",
            unset: "no lldp holdtime-multiplier",
        },
        validate: Some(v_holdtime),
    },
    AttrSpec {
        name: "timer",
        collection: Collection::Scalar,
        default: DefaultPolicy::EmptyRemoves,
        coerce: Coercion::None,
        emit: EmitRule::Scalar {
            set: "lldp timer {}",
            unset: "no lldp timer",
        },
        validate: Some(v_timer),
    },
    AttrSpec {
        name: "med_fast_start_repeat_count",
        collection: Collection::Scalar,
        default: DefaultPolicy::EmptyRemoves,
        coerce: Coercion::None,
        emit: EmitRule::Scalar {
            set: "lldp med fast-start-repeat-count {}",
            unset: "no lldp med fast-start-repeat-count",
        },
        validate: Some(v_fast_start),
    },
    AttrSpec {
        name: "enable",
        collection: Collection::Scalar,
        default: DefaultPolicy::Substitute("true"),
        coerce: Coercion::None,
        emit: EmitRule::Flag {
            on: "lldp enable",
            off: "no lldp enable",
        },
        validate: None,
    },
    AttrSpec {
        name: "med_network_policy",
        collection: Collection::KeyedMap,
        default: DefaultPolicy::EmptyRemoves,
        coerce: Coercion::None,
        emit: EmitRule::Entry {
            set: "lldp med network-policy {k} {v}",
            unset: "no lldp med network-policy {k}",
        },
        validate: None,
    },
];

impl Resource for Lldp {
    fn domain(&self) -> &'static str {
        "lldp"
    }

    fn attr_specs(&self) -> &'static [AttrSpec] {
        ATTRS
    }

    fn show_query(&self) -> String {
        "show running-configuration lldp | display-json".to_string()
    }

    fn context(&self) -> Vec<String> {
        Vec::new()
    }

    fn removal(&self) -> Vec<String> {
        Vec::new()
    }

    fn read_state(&self, tree: &Value) -> CfgResult<CurrentState> {
        let mut attrs = AttrMap::new();

        let global = show::extract(tree, &["data", "global-params"]);
        if let Some(global) = global {
            let scalars = [
                ("reinit", "reinit-delay"),
                ("holdtime_multiplier", "txhold-multiplier"),
                ("timer", "tx-interval"),
                ("enable", "enable"),
            ];
            for (name, key) in scalars {
                if let Some(v) = show::extract_str(global, &[key]) {
                    attrs.insert(name, AttrValue::scalar(v));
                }
            }
        }

        if let Some(sys) = show::extract(tree, &["data", "sys-config"]) {
            if let Some(v) = show::extract_str(sys, &["fast-start-repeat-count"]) {
                attrs.insert("med_fast_start_repeat_count", AttrValue::scalar(v));
            }
            if let Some(policies) = show::extract(sys, &["media-policy"]) {
                let mut entries = Vec::new();
                for policy in show::as_list(policies) {
                    let Some(id) = show::extract_str(policy, &["policy-id"]) else {
                        continue;
                    };
                    entries.push((id, policy_params(policy)));
                }
                attrs.insert("med_network_policy", AttrValue::map(entries));
            }
        }

        Ok(CurrentState::Found(attrs))
    }
}

/// Renders policy parameters in command order, substituting `none` for
/// anything the device left out.
fn policy_params(policy: &Value) -> String {
    let field = |key: &str| {
        show::extract_str(policy, &[key]).unwrap_or_else(|| "none".to_string())
    };
    format!(
        "app {} vlan {} vlan-type {} priority {} dscp {}",
        field("app"),
        field("vlan"),
        field("vlan-type"),
        field("priority"),
        field("dscp"),
    )
}
