//! Global SNMP configuration.
//!
//! Singleton domain. Community strings and trap destinations are keyed
//! maps; enabled traps are a flattened `"name option"` set:
//!
//! ```ignore
//! let desired = DesiredState::present()
//!     .set("contact", AttrValue::scalar("noc@example.com"))
//!     .set("community_strings", AttrValue::map([("public", "ro")]))
//!     .set("enabled_traps", AttrValue::list(["snmp linkdown", "snmp linkup"]))
//!     .set("trap_destination", AttrValue::map([("10.1.1.1:162", "v2 public")]));
//! ```

use serde_json::Value;

use os10_cfg_common::{show, CfgResult};
use os10_reconcile::{
    Action, AttrMap, AttrSpec, AttrValue, Coercion, Collection, CurrentState, DefaultPolicy,
    EmitRule, Operation, RenderCtx, Resource,
};

/// The singleton SNMP configuration.
pub struct Snmp;

impl Snmp {
    /// Creates the singleton resource.
    pub fn new() -> Self {
        Snmp
    }
}

impl Default for Snmp {
    fn default() -> Self {
        Snmp::new()
    }
}

/// Free-form locations with spaces are quoted.
fn render_location(_ctx: &RenderCtx<'_>, op: &Operation) -> Vec<String> {
    match op.action {
        Action::Unset => vec!["no snmp-server location".to_string()],
        Action::Set => match op.value.as_scalar() {
            Some(location) if location.contains(' ') => {
                vec![format!("snmp-server location \"{location}\"")]
            }
            Some(location) => vec![format!("snmp-server location {location}")],
            None => Vec::new(),
        },
    }
}

fn v_trap_destination(v: &AttrValue) -> Result<(), String> {
    let Some(entries) = v.as_map() else {
        return Ok(());
    };
    for (key, value) in entries {
        if key.split_once(':').is_none() {
            return Err(format!("trap destination {key} is not ip:port"));
        }
        let version = value.split_whitespace().next().unwrap_or("");
        if version != "v1" && version != "v2" {
            return Err(format!("invalid trap version {version} for {key}"));
        }
    }
    Ok(())
}

/// Trap destinations key by `ip:port` and carry `version community`.
/// Clearing one requires a syntactically-valid community even though the
/// device ignores it, hence the `junk` placeholder.
fn render_trap_destination(_ctx: &RenderCtx<'_>, op: &Operation) -> Vec<String> {
    let Some(entries) = op.value.as_map() else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|(key, value)| {
            let (ip, port) = key.split_once(':')?;
            match op.action {
                Action::Unset => Some(format!("no snmp-server host {ip} junk udp-port {port}")),
                Action::Set => {
                    let (version, community) = value.split_once(' ')?;
                    let version = if version == "v2" { "2c" } else { "1" };
                    Some(format!(
                        "snmp-server host {ip} traps version {version} {community} udp-port {port}"
                    ))
                }
            }
        })
        .collect()
}

static ATTRS: &[AttrSpec] = &[
    AttrSpec {
        name: "contact",
        collection: Collection::Scalar,
        default: DefaultPolicy::EmptyRemoves,
        coerce: Coercion::None,
        emit: EmitRule::Scalar {
            set: "snmp-server contact {}",
            unset: "no snmp-server contact",
        },
        validate: None,
    },
    AttrSpec {
        name: "location",
        collection: Collection::Scalar,
        default: DefaultPolicy::EmptyRemoves,
        coerce: Coercion::None,
        emit: EmitRule::Custom(render_location),
        validate: None,
    },
    AttrSpec {
        name: "community_strings",
        collection: Collection::KeyedMap,
        default: DefaultPolicy::EmptyRemoves,
        coerce: Coercion::None,
        emit: EmitRule::Entry {
            set: "snmp-server community {k} {v}",
            unset: "no snmp-server community {k}",
        },
        validate: None,
    },
    AttrSpec {
        name: "enabled_traps",
        collection: Collection::UnorderedSet,
        default: DefaultPolicy::EmptyRemoves,
        coerce: Coercion::None,
        emit: EmitRule::Element {
            set: "snmp-server enable traps {}",
            unset: "no snmp-server enable traps {}",
        },
        validate: None,
    },
    AttrSpec {
        name: "trap_destination",
        collection: Collection::KeyedMap,
        default: DefaultPolicy::EmptyRemoves,
        coerce: Coercion::None,
        emit: EmitRule::Custom(render_trap_destination),
        validate: Some(v_trap_destination),
    },
];

impl Resource for Snmp {
    fn domain(&self) -> &'static str {
        "snmp"
    }

    fn attr_specs(&self) -> &'static [AttrSpec] {
        ATTRS
    }

    fn show_query(&self) -> String {
        "show running-configuration snmp | display-json".to_string()
    }

    fn context(&self) -> Vec<String> {
        Vec::new()
    }

    fn removal(&self) -> Vec<String> {
        Vec::new()
    }

    fn read_state(&self, tree: &Value) -> CfgResult<CurrentState> {
        let mut attrs = AttrMap::new();
        let Some(snmp) = show::extract(tree, &["data", "snmp-server"]) else {
            return Ok(CurrentState::Found(attrs));
        };

        if let Some(contact) = show::extract_str(snmp, &["global", "sys-contact"]) {
            attrs.insert("contact", AttrValue::scalar(contact));
        }
        if let Some(location) = show::extract_str(snmp, &["global", "sys-location"]) {
            attrs.insert("location", AttrValue::scalar(location));
        }

        if let Some(communities) = show::extract(snmp, &["community"]) {
            let entries: Vec<(String, String)> = show::as_list(communities)
                .into_iter()
                .filter_map(|entry| {
                    let name = show::extract_str(entry, &["community-name"])?;
                    let access = show::extract_str(entry, &["community-access"])?;
                    Some((name, map_access(&access)))
                })
                .collect();
            attrs.insert("community_strings", AttrValue::map(entries));
        }

        if let Some(traps) = show::extract(snmp, &["trap-notification", "trap"]) {
            let mut flattened = Vec::new();
            for trap in show::as_list(traps) {
                let Some(name) = show::extract_str(trap, &["trap-name"]) else {
                    continue;
                };
                let option_key = format!("trap-{name}-option");
                if let Some(options) = show::extract(trap, &[option_key.as_str()]) {
                    let mut options: Vec<String> = show::as_list(options)
                        .iter()
                        .filter_map(|v| show::leaf_str(v))
                        .map(|option| option.to_lowercase())
                        .collect();
                    options.sort();
                    for option in options {
                        flattened.push(format!("{name} {option}"));
                    }
                }
            }
            attrs.insert("enabled_traps", AttrValue::List(flattened));
        }

        if let Some(hosts) = show::extract(snmp, &["trap-recipient-host"]) {
            let entries: Vec<(String, String)> = show::as_list(hosts)
                .into_iter()
                .filter_map(|host| {
                    let address = show::extract_str(host, &["host-address"])?;
                    let port = show::extract_str(host, &["udp-port"])?;
                    // The CLI records a security model only for v2c hosts.
                    let version = match show::extract_str(host, &["security-model"]) {
                        Some(_) => "v2",
                        None => "v1",
                    };
                    let community =
                        show::extract_str(host, &["community-name"]).unwrap_or_default();
                    Some((format!("{address}:{port}"), format!("{version} {community}")))
                })
                .collect();
            attrs.insert("trap_destination", AttrValue::map(entries));
        }

        Ok(CurrentState::Found(attrs))
    }
}

/// Maps the structured access keyword to its CLI form.
fn map_access(access: &str) -> String {
    match access {
        "read-only" => "ro".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use os10_reconcile::{diff::diff_attrs, emit::emit};
    use serde_json::json;

    fn running_config() -> Value {
        json!({
            "data": {
                "snmp-server": {
                    "global": {
                        "sys-contact": "noc@example.com",
                        "sys-location": "Chennai-OTP"
                    },
                    "community": [
                        {"community-name": "public", "community-access": "read-only"},
                        {"community-name": "private", "community-access": "read-only"}
                    ],
                    "trap-notification": {
                        "trap": {
                            "trap-name": "snmp",
                            "trap-snmp-option": ["linkDown", "linkUp"]
                        }
                    },
                    "trap-recipient-host": {
                        "host-address": "10.1.1.1",
                        "udp-port": "162",
                        "security-model": "2c",
                        "community-name": "public"
                    }
                }
            }
        })
    }

    #[test]
    fn test_read_state() {
        let snmp = Snmp::new();
        let CurrentState::Found(attrs) = snmp.read_state(&running_config()).unwrap() else {
            panic!("expected Found");
        };
        assert_eq!(
            attrs.get("contact"),
            Some(&AttrValue::scalar("noc@example.com"))
        );
        assert_eq!(
            attrs.get("community_strings"),
            Some(&AttrValue::map([("public", "ro"), ("private", "ro")]))
        );
        // Options are lowercased and sorted.
        assert_eq!(
            attrs.get("enabled_traps"),
            Some(&AttrValue::list(["snmp linkdown", "snmp linkup"]))
        );
        assert_eq!(
            attrs.get("trap_destination"),
            Some(&AttrValue::map([("10.1.1.1:162", "v2 public")]))
        );
    }

    #[test]
    fn test_empty_config_is_found_with_no_attrs() {
        let snmp = Snmp::new();
        let CurrentState::Found(attrs) = snmp.read_state(&json!({"data": {}})).unwrap() else {
            panic!("expected Found");
        };
        assert!(attrs.is_empty());
    }

    #[test]
    fn test_community_reconciliation() {
        // Scenario B: {a,b} -> {b,c} is one unset and one set, nothing for b.
        let snmp = Snmp::new();
        let current: AttrMap = [(
            "community_strings",
            AttrValue::map([("a", "ro"), ("b", "ro")]),
        )]
        .into_iter()
        .collect();
        let desired: AttrMap = [(
            "community_strings",
            AttrValue::map([("b", "ro"), ("c", "ro")]),
        )]
        .into_iter()
        .collect();
        let ops = diff_attrs(ATTRS, Some(&current), &desired).unwrap();
        let ctx = RenderCtx {
            vars: &[],
            current: &current,
            desired: &desired,
        };
        let lines = emit(ATTRS, &snmp.context(), &ops, &ctx);
        assert_eq!(
            lines,
            vec![
                "no snmp-server community a".to_string(),
                "snmp-server community c ro".to_string(),
            ]
        );
    }

    #[test]
    fn test_trap_destination_junk_placeholder() {
        let snmp = Snmp::new();
        let CurrentState::Found(current) = snmp.read_state(&running_config()).unwrap() else {
            panic!("expected Found");
        };
        let desired: AttrMap = [(
            "trap_destination",
            AttrValue::map([("10.2.2.2:123", "v1 password")]),
        )]
        .into_iter()
        .collect();
        let ops = diff_attrs(ATTRS, Some(&current), &desired).unwrap();
        let ctx = RenderCtx {
            vars: &[],
            current: &current,
            desired: &desired,
        };
        let lines = emit(ATTRS, &snmp.context(), &ops, &ctx);
        assert_eq!(
            lines,
            vec![
                "no snmp-server host 10.1.1.1 junk udp-port 162".to_string(),
                "snmp-server host 10.2.2.2 traps version 1 password udp-port 123".to_string(),
            ]
        );
    }

    #[test]
    fn test_trap_destination_validation() {
        assert!(v_trap_destination(&AttrValue::map([("10.1.1.1:162", "v2 public")])).is_ok());
        assert!(v_trap_destination(&AttrValue::map([("10.1.1.1", "v2 public")])).is_err());
        assert!(v_trap_destination(&AttrValue::map([("10.1.1.1:162", "v3 public")])).is_err());
    }
}
