//! Physical and logical interface configuration.
//!
//! One interface keyed by its full CLI name (`ethernet 1/1/1`). Switchport
//! mode transitions clear L3 addressing first: the device rejects entering
//! an L2 mode while addresses or helper addresses remain.

use serde_json::Value;

use os10_cfg_common::{show, CfgError, CfgResult};
use os10_reconcile::{
    Action, AttrMap, AttrSpec, AttrValue, Coercion, Collection, CurrentState, DefaultPolicy,
    DesiredState, EmitRule, Operation, RenderCtx, Resource,
};

use crate::validators;

/// One interface, keyed by CLI name.
pub struct Interface {
    name: String,
}

impl Interface {
    /// Creates the resource for the given interface name.
    pub fn new(name: impl Into<String>) -> Self {
        Interface { name: name.into() }
    }
}

fn v_switchport_mode(v: &AttrValue) -> Result<(), String> {
    validators::one_of(v, &["access", "trunk", "false"])
}

fn v_admin(v: &AttrValue) -> Result<(), String> {
    validators::one_of(v, &["up", "down"])
}

/// Entering an L2 mode clears addressing (including every configured
/// helper address) first; `false` leaves L2 entirely.
fn render_switchport_mode(ctx: &RenderCtx<'_>, op: &Operation) -> Vec<String> {
    let mut lines = Vec::new();
    match op.value.as_scalar() {
        Some(mode @ ("access" | "trunk")) => {
            lines.push("no ip address".to_string());
            lines.push("no ipv6 address".to_string());
            if let Some(AttrValue::List(helpers)) = ctx.current.get("ip_helper") {
                for helper in helpers {
                    lines.push(format!("no ip helper-address {helper}"));
                }
            }
            lines.push(format!("switchport mode {mode}"));
        }
        Some("false") => lines.push("no switchport".to_string()),
        _ => {}
    }
    lines
}

fn render_admin(_ctx: &RenderCtx<'_>, op: &Operation) -> Vec<String> {
    match op.value.as_scalar() {
        Some("up") => vec!["no shutdown".to_string()],
        Some("down") => vec!["shutdown".to_string()],
        _ => Vec::new(),
    }
}

fn render_desc(_ctx: &RenderCtx<'_>, op: &Operation) -> Vec<String> {
    match op.action {
        Action::Set => match op.value.as_scalar() {
            Some(desc) => vec![format!("description \"{desc}\"")],
            None => Vec::new(),
        },
        Action::Unset => vec!["no description".to_string()],
    }
}

static ATTRS: &[AttrSpec] = &[
    AttrSpec {
        name: "desc",
        collection: Collection::Scalar,
        default: DefaultPolicy::EmptyRemoves,
        coerce: Coercion::None,
        emit: EmitRule::Custom(render_desc),
        validate: None,
    },
    AttrSpec {
        name: "mtu",
        collection: Collection::Scalar,
        default: DefaultPolicy::EmptyRemoves,
        coerce: Coercion::None,
        emit: EmitRule::Scalar {
            set: "mtu {}",
            unset: "no mtu",
        },
        validate: None,
    },
    AttrSpec {
        name: "switchport_mode",
        collection: Collection::Scalar,
        default: DefaultPolicy::EmptyRemoves,
        coerce: Coercion::None,
        emit: EmitRule::Custom(render_switchport_mode),
        validate: Some(v_switchport_mode),
    },
    AttrSpec {
        name: "admin",
        collection: Collection::Scalar,
        default: DefaultPolicy::Substitute("up"),
        coerce: Coercion::None,
        emit: EmitRule::Custom(render_admin),
        validate: Some(v_admin),
    },
    AttrSpec {
        name: "ip_address",
        collection: Collection::Scalar,
        default: DefaultPolicy::EmptyRemoves,
        coerce: Coercion::None,
        emit: EmitRule::Scalar {
            set: "ip address {}",
            unset: "no ip address",
        },
        validate: Some(validators::ip_prefix),
    },
    AttrSpec {
        name: "ipv6_address",
        collection: Collection::Scalar,
        default: DefaultPolicy::EmptyRemoves,
        coerce: Coercion::None,
        emit: EmitRule::Scalar {
            set: "ipv6 address {}",
            unset: "no ipv6 address",
        },
        validate: Some(validators::ip_prefix),
    },
    AttrSpec {
        name: "ipv6_autoconfig",
        collection: Collection::Scalar,
        default: DefaultPolicy::Substitute("false"),
        coerce: Coercion::None,
        emit: EmitRule::Flag {
            on: "ipv6 address autoconfig",
            off: "no ipv6 address autoconfig",
        },
        validate: None,
    },
    AttrSpec {
        name: "ip_helper",
        collection: Collection::UnorderedSet,
        default: DefaultPolicy::EmptyRemoves,
        coerce: Coercion::None,
        emit: EmitRule::Element {
            set: "ip helper-address {}",
            unset: "no ip helper-address {}",
        },
        validate: Some(validators::ip_address),
    },
];

impl Resource for Interface {
    fn domain(&self) -> &'static str {
        "interface"
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
        // Interfaces are not deletable; reset to factory defaults instead.
        vec![format!("default interface {}", self.name)]
    }

    fn validate(&self, desired: &DesiredState) -> CfgResult<()> {
        let l2_mode = desired
            .attrs()
            .get("switchport_mode")
            .and_then(|v| v.as_scalar())
            .is_some_and(|m| m == "access" || m == "trunk");
        let has_address = ["ip_address", "ipv6_address"].iter().any(|name| {
            desired
                .attrs()
                .get(*name)
                .is_some_and(|v| !v.is_empty())
        });
        if l2_mode && has_address {
            return Err(CfgError::validation(
                "switchport_mode",
                "an L2 interface cannot carry IP addresses",
            ));
        }
        Ok(())
    }

    fn read_state(&self, tree: &Value) -> CfgResult<CurrentState> {
        let Some(intf) = show::extract(tree, &["data", "interfaces", "interface"]) else {
            return Ok(CurrentState::NotFound);
        };

        let mut attrs = AttrMap::new();
        if let Some(v) = show::extract_str(intf, &["description"]) {
            attrs.insert("desc", AttrValue::scalar(v));
        }
        if let Some(v) = show::extract_str(intf, &["mtu"]) {
            attrs.insert("mtu", AttrValue::scalar(v));
        }
        if let Some(v) = show::extract_str(intf, &["ipv4", "address", "primary-addr"]) {
            attrs.insert("ip_address", AttrValue::scalar(v));
        }
        if let Some(v) =
            show::extract_str(intf, &["ipv6", "ipv6-addresses", "address", "ipv6-address"])
        {
            attrs.insert("ipv6_address", AttrValue::scalar(v));
        }
        if let Some(v) = show::extract_str(intf, &["ipv6", "autoconfig"]) {
            attrs.insert("ipv6_autoconfig", AttrValue::scalar(v));
        }

        if let Some(helpers) = show::extract(intf, &["dhcp-relay-if-cfgs", "server-address"]) {
            let helpers: Vec<String> = show::as_list(helpers)
                .iter()
                .filter_map(|v| show::leaf_str(v))
                .collect();
            attrs.insert("ip_helper", AttrValue::List(helpers));
        } else {
            attrs.insert("ip_helper", AttrValue::list::<_, String>([]));
        }

        // A shut interface carries enabled=false; an enabled one has no key.
        let admin = match show::extract_str(intf, &["enabled"]).as_deref() {
            Some("false") => "down",
            _ => "up",
        };
        attrs.insert("admin", AttrValue::scalar(admin));

        // L3 is MODE_L2DISABLED; trunk is MODE_L2HYBRID; access has no mode.
        let mode = match show::extract_str(intf, &["mode"]).as_deref() {
            None => "access",
            Some("MODE_L2DISABLED") => "false",
            Some("MODE_L2HYBRID") => "trunk",
            Some(other) => {
                return Err(CfgError::parse(format!(
                    "invalid switchport mode {other} read from device"
                )));
            }
        };
        attrs.insert("switchport_mode", AttrValue::scalar(mode));

        Ok(CurrentState::Found(attrs))
    }
}
