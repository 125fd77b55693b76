//! Per-interface LLDP configuration.
//!
//! Keyed by interface name. Two grammars are unusual here:
//!
//! - MED network policies attach by id through `add`/`remove` keywords
//!   rather than plain set/no lines.
//! - `tlv_select` is a *disable* set: TLV advertisement is on by default,
//!   the running configuration records disabled options, and the declared
//!   value lists the `"group option"` pairs to disable. Reconciling an
//!   element *into* the set therefore emits the `no` form, and an element
//!   leaving the set re-enables the TLV. The `dcbxp` group takes no
//!   sub-option and is disabled bare.

use serde_json::Value;

use os10_cfg_common::{show, CfgResult};
use os10_reconcile::{
    AttrMap, AttrSpec, AttrValue, Coercion, Collection, CurrentState, DefaultPolicy, EmitRule,
    Resource,
};

/// Per-interface LLDP configuration, keyed by interface name.
pub struct LldpInterface {
    name: String,
}

impl LldpInterface {
    /// Creates the resource for the given interface name.
    pub fn new(name: impl Into<String>) -> Self {
        LldpInterface { name: name.into() }
    }
}

static ATTRS: &[AttrSpec] = &[
    AttrSpec {
        name: "receive",
        collection: Collection::Scalar,
        default: DefaultPolicy::Substitute("true"),
        coerce: Coercion::None,
        emit: EmitRule::Flag {
            on: "lldp receive",
            off: "no lldp receive",
        },
        validate: None,
    },
    AttrSpec {
        name: "transmit",
        collection: Collection::Scalar,
        default: DefaultPolicy::Substitute("true"),
        coerce: Coercion::None,
        emit: EmitRule::Flag {
            on: "lldp transmit",
            off: "no lldp transmit",
        },
        validate: None,
    },
    AttrSpec {
        name: "med",
        collection: Collection::Scalar,
        default: DefaultPolicy::Substitute("true"),
        coerce: Coercion::None,
        emit: EmitRule::Flag {
            on: "lldp med enable",
            off: "lldp med disable",
        },
        validate: None,
    },
    AttrSpec {
        name: "med_tlv_select_inventory",
        collection: Collection::Scalar,
        default: DefaultPolicy::Substitute("true"),
        coerce: Coercion::None,
        emit: EmitRule::Flag {
            on: "lldp med tlv-select inventory",
            off: "no lldp med tlv-select inventory",
        },
        validate: None,
    },
    AttrSpec {
        name: "med_tlv_select_network_policy",
        collection: Collection::Scalar,
        default: DefaultPolicy::Substitute("true"),
        coerce: Coercion::None,
        emit: EmitRule::Flag {
            on: "lldp med tlv-select network-policy",
            off: "no lldp med tlv-select network-policy",
        },
        validate: None,
    },
    AttrSpec {
        name: "med_network_policy",
        collection: Collection::UnorderedSet,
        default: DefaultPolicy::EmptyRemoves,
        coerce: Coercion::None,
        emit: EmitRule::Element {
            set: "lldp med network-policy add {}",
            unset: "lldp med network-policy remove {}",
        },
        validate: None,
    },
    AttrSpec {
        name: "tlv_select",
        collection: Collection::UnorderedSet,
        default: DefaultPolicy::EmptyRemoves,
        coerce: Coercion::None,
        // Inverted set: entering the disable set emits the no form.
        emit: EmitRule::Element {
            set: "no lldp tlv-select {}",
            unset: "lldp tlv-select {}",
        },
        validate: None,
    },
];

impl Resource for LldpInterface {
    fn domain(&self) -> &'static str {
        "lldp_interface"
    }

    fn attr_specs(&self) -> &'static [AttrSpec] {
        ATTRS
    }

    fn show_query(&self) -> String {
        format!(
            "show running-configuration interface {} | display-json",
            self.name
        )
    }

    fn context(&self) -> Vec<String> {
        vec![format!("interface {}", self.name)]
    }

    fn removal(&self) -> Vec<String> {
        Vec::new()
    }

    fn read_state(&self, tree: &Value) -> CfgResult<CurrentState> {
        let Some(intf) = show::extract(tree, &["data", "interfaces", "interface"]) else {
            return Ok(CurrentState::NotFound);
        };

        let mut attrs = AttrMap::new();
        if let Some(v) = show::extract_str(intf, &["lldp", "rx-enable"]) {
            attrs.insert("receive", AttrValue::scalar(v));
        }
        if let Some(v) = show::extract_str(intf, &["lldp", "tx-enable"]) {
            attrs.insert("transmit", AttrValue::scalar(v));
        }
        if let Some(v) = show::extract_str(intf, &["lldp-med-cfg", "med-enable"]) {
            attrs.insert("med", AttrValue::scalar(v));
        }
        if let Some(v) = show::extract_str(intf, &["lldp-med-cfg", "tlvs-tx-enable", "inventory"]) {
            attrs.insert("med_tlv_select_inventory", AttrValue::scalar(v));
        }
        if let Some(v) =
            show::extract_str(intf, &["lldp-med-cfg", "tlvs-tx-enable", "network-policy"])
        {
            attrs.insert("med_tlv_select_network_policy", AttrValue::scalar(v));
        }

        if let Some(ids) = show::extract(intf, &["lldp-med-cfg", "policy-id"]) {
            let ids: Vec<String> = show::as_list(ids)
                .iter()
                .filter_map(|v| show::leaf_str(v))
                .collect();
            attrs.insert("med_network_policy", AttrValue::List(ids));
        } else {
            attrs.insert("med_network_policy", AttrValue::list::<_, String>([]));
        }

        // Disabled TLV options, flattened to "group option" elements; a
        // bare group (dcbxp) flattens to the group name alone.
        let mut disabled = Vec::new();
        if let Some(groups) = show::extract(intf, &["tlv-select"]) {
            if let Some(groups) = groups.as_object() {
                for (group, options) in groups {
                    let options = show::as_list(options);
                    if options.is_empty() {
                        disabled.push(group.clone());
                    }
                    for option in options {
                        match show::leaf_str(option) {
                            Some(option) if !option.trim().is_empty() => {
                                disabled.push(format!("{group} {option}"));
                            }
                            _ => disabled.push(group.clone()),
                        }
                    }
                }
            }
        }
        attrs.insert("tlv_select", AttrValue::List(disabled));

        Ok(CurrentState::Found(attrs))
    }
}
