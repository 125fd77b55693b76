//! BGP neighbor address-family sub-configuration.
//!
//! One `address-family ipv4|ipv6 unicast` block inside a neighbor or
//! peer-group template. Both the BGP instance and the peer must already be
//! configured; their absence is a conflict the caller resolves out-of-band,
//! not a creation opportunity.

use serde_json::Value;

use os10_cfg_common::{show, CfgError, CfgResult};
use os10_reconcile::{
    Action, AttrMap, AttrSpec, AttrValue, Coercion, Collection, CurrentState, DefaultPolicy,
    EmitRule, Operation, RenderCtx, Resource,
};

use crate::bgp_neighbor::{find_peer, PeerKind};

/// One neighbor address family, keyed by ASN + peer + IP version.
pub struct BgpNeighborAf {
    asn: String,
    peer: String,
    kind: PeerKind,
    ip_ver: String,
}

impl BgpNeighborAf {
    /// Creates the resource for `ipv4` or `ipv6` unicast under the given
    /// peer.
    pub fn new(
        asn: impl Into<String>,
        peer: impl Into<String>,
        kind: PeerKind,
        ip_ver: impl Into<String>,
    ) -> CfgResult<Self> {
        let ip_ver = ip_ver.into();
        if ip_ver != "ipv4" && ip_ver != "ipv6" {
            return Err(CfgError::validation(
                "ip_ver",
                format!("invalid IP version {ip_ver}"),
            ));
        }
        Ok(BgpNeighborAf {
            asn: asn.into(),
            peer: peer.into(),
            kind,
            ip_ver,
        })
    }

    fn kind_keyword(&self) -> &'static str {
        match self.kind {
            PeerKind::Ip => "neighbor",
            PeerKind::Template => "template",
        }
    }
}

fn v_pair(v: &AttrValue) -> Result<(), String> {
    match v {
        AttrValue::List(items) if items.len() == 2 => Ok(()),
        AttrValue::Absent => Ok(()),
        _ => Err("expects exactly two values (inbound, outbound)".to_string()),
    }
}

/// Per-direction policy pair. A cleared direction still needs a
/// syntactically-valid name, hence the TEMP placeholder.
fn render_direction_pair(keyword: &'static str) -> impl Fn(&Operation) -> Vec<String> {
    move |op: &Operation| {
        let empty = Vec::new();
        let pair = match op.action {
            Action::Set => op.value.as_list().unwrap_or(&empty),
            Action::Unset => &empty,
        };
        let side = |idx: usize, dir: &str| -> String {
            match pair.get(idx).map(String::as_str) {
                Some(name) if !name.is_empty() => format!("{keyword} {name} {dir}"),
                _ => format!("no {keyword} TEMP {dir}"),
            }
        };
        vec![side(0, "in"), side(1, "out")]
    }
}

fn render_distribute_list(_ctx: &RenderCtx<'_>, op: &Operation) -> Vec<String> {
    render_direction_pair("distribute-list")(op)
}

fn render_route_map(_ctx: &RenderCtx<'_>, op: &Operation) -> Vec<String> {
    render_direction_pair("route-map")(op)
}

static ATTRS: &[AttrSpec] = &[
    AttrSpec {
        name: "activate",
        collection: Collection::Scalar,
        default: DefaultPolicy::Substitute("true"),
        coerce: Coercion::None,
        emit: EmitRule::Flag {
            on: "activate",
            off: "no activate",
        },
        validate: None,
    },
    AttrSpec {
        name: "allowas_in",
        collection: Collection::Scalar,
        default: DefaultPolicy::EmptyRemoves,
        coerce: Coercion::None,
        emit: EmitRule::Scalar {
            set: "allowas-in {}",
            unset: "no allowas-in",
        },
        validate: None,
    },
    AttrSpec {
        name: "add_path",
        collection: Collection::Scalar,
        default: DefaultPolicy::EmptyRemoves,
        coerce: Coercion::None,
        emit: EmitRule::Scalar {
            set: "add-path {}",
            unset: "no add-path",
        },
        validate: None,
    },
    AttrSpec {
        name: "next_hop_self",
        collection: Collection::Scalar,
        default: DefaultPolicy::Substitute("false"),
        coerce: Coercion::None,
        emit: EmitRule::Flag {
            on: "next-hop-self",
            off: "no next-hop-self",
        },
        validate: None,
    },
    AttrSpec {
        name: "sender_side_loop_detection",
        collection: Collection::Scalar,
        default: DefaultPolicy::Substitute("true"),
        coerce: Coercion::None,
        emit: EmitRule::Flag {
            on: "sender-side-loop-detection",
            off: "no sender-side-loop-detection",
        },
        validate: None,
    },
    AttrSpec {
        name: "soft_reconfiguration",
        collection: Collection::Scalar,
        default: DefaultPolicy::Substitute("false"),
        coerce: Coercion::None,
        emit: EmitRule::Flag {
            on: "soft-reconfiguration inbound",
            off: "no soft-reconfiguration inbound",
        },
        validate: None,
    },
    AttrSpec {
        name: "distribute_list",
        collection: Collection::OrderedList,
        default: DefaultPolicy::EmptyRemoves,
        coerce: Coercion::None,
        emit: EmitRule::Custom(render_distribute_list),
        validate: Some(v_pair),
    },
    AttrSpec {
        name: "route_map",
        collection: Collection::OrderedList,
        default: DefaultPolicy::EmptyRemoves,
        coerce: Coercion::None,
        emit: EmitRule::Custom(render_route_map),
        validate: Some(v_pair),
    },
];

impl Resource for BgpNeighborAf {
    fn domain(&self) -> &'static str {
        "bgp_neighbor_af"
    }

    fn attr_specs(&self) -> &'static [AttrSpec] {
        ATTRS
    }

    fn show_query(&self) -> String {
        "show running-configuration bgp | display-json".to_string()
    }

    fn context(&self) -> Vec<String> {
        vec![
            format!("router bgp {}", self.asn),
            format!("{} {}", self.kind_keyword(), self.peer),
            format!("address-family {} unicast", self.ip_ver),
        ]
    }

    fn removal(&self) -> Vec<String> {
        vec![
            format!("router bgp {}", self.asn),
            format!("{} {}", self.kind_keyword(), self.peer),
            format!("no address-family {} unicast", self.ip_ver),
        ]
    }

    fn read_state(&self, tree: &Value) -> CfgResult<CurrentState> {
        let Some(vrf) = show::extract(tree, &["data", "bgp-router", "vrf"]) else {
            return Err(CfgError::mismatch(
                "bgp",
                self.asn.clone(),
                "not configured".to_string(),
            ));
        };
        if let Some(asn) = show::extract_str(vrf, &["local-as-number"]) {
            if asn != self.asn {
                return Err(CfgError::mismatch("asn", self.asn.clone(), asn));
            }
        }
        let Some(peer) = find_peer(vrf, &self.peer, self.kind) else {
            return Err(CfgError::mismatch(
                "neighbor",
                self.peer.clone(),
                "not configured".to_string(),
            ));
        };
        let af_key = format!("{}-unicast", self.ip_ver);
        let Some(af) = show::extract(peer, &[af_key.as_str()]) else {
            return Ok(CurrentState::NotFound);
        };

        let mut attrs = AttrMap::new();
        if let Some(v) = show::extract_str(af, &["activate"]) {
            attrs.insert("activate", AttrValue::scalar(v));
        }
        if let Some(v) = show::extract_str(af, &["allowas-in"]) {
            attrs.insert("allowas_in", AttrValue::scalar(v));
        }

        if let Some(capability) = show::extract_str(af, &["add-path", "capability"]) {
            let value = if capability == "send" || capability == "both" {
                match show::extract_str(af, &["add-path", "count"]) {
                    Some(count) => format!("{capability} {count}"),
                    None => capability,
                }
            } else {
                capability
            };
            attrs.insert("add_path", AttrValue::scalar(value));
        }

        attrs.insert(
            "next_hop_self",
            AttrValue::scalar(
                show::extract_str(af, &["next-hop-self"]).unwrap_or_else(|| "false".to_string()),
            ),
        );
        attrs.insert(
            "sender_side_loop_detection",
            AttrValue::scalar(
                show::extract_str(af, &["sender-side-loop-detection"])
                    .unwrap_or_else(|| "true".to_string()),
            ),
        );
        attrs.insert(
            "soft_reconfiguration",
            AttrValue::boolean(show::has_key(af, &[], "soft-reconfiguration-inbound")),
        );

        let pair = |in_key: &str, out_key: &str| {
            AttrValue::list([
                show::extract_str(af, &[in_key]).unwrap_or_default(),
                show::extract_str(af, &[out_key]).unwrap_or_default(),
            ])
        };
        attrs.insert(
            "distribute_list",
            pair("distribute-list-name-in", "distribute-list-name-out"),
        );
        attrs.insert("route_map", pair("route-map-in", "route-map-out"));

        Ok(CurrentState::Found(attrs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn running_config() -> Value {
        json!({
            "data": {
                "bgp-router": {
                    "vrf": {
                        "local-as-number": "65537",
                        "peer-config": {
                            "remote-address": "10.1.1.1",
                            "ipv4-unicast": {
                                "activate": "true",
                                "add-path": {"capability": "both", "count": "3"},
                                "route-map-in": "rm-in"
                            }
                        }
                    }
                }
            }
        })
    }

    #[test]
    fn test_read_state() {
        let af = BgpNeighborAf::new("65537", "10.1.1.1", PeerKind::Ip, "ipv4").unwrap();
        let CurrentState::Found(attrs) = af.read_state(&running_config()).unwrap() else {
            panic!("expected Found");
        };
        assert_eq!(attrs.get("activate"), Some(&AttrValue::scalar("true")));
        assert_eq!(attrs.get("add_path"), Some(&AttrValue::scalar("both 3")));
        assert_eq!(attrs.get("route_map"), Some(&AttrValue::list(["rm-in", ""])));
        assert_eq!(
            attrs.get("next_hop_self"),
            Some(&AttrValue::scalar("false"))
        );
    }

    #[test]
    fn test_missing_af_not_found() {
        let af = BgpNeighborAf::new("65537", "10.1.1.1", PeerKind::Ip, "ipv6").unwrap();
        assert_eq!(
            af.read_state(&running_config()).unwrap(),
            CurrentState::NotFound
        );
    }

    #[test]
    fn test_missing_neighbor_is_error() {
        let af = BgpNeighborAf::new("65537", "10.9.9.9", PeerKind::Ip, "ipv4").unwrap();
        assert!(af.read_state(&running_config()).is_err());
    }

    #[test]
    fn test_missing_bgp_is_error() {
        let af = BgpNeighborAf::new("65537", "10.1.1.1", PeerKind::Ip, "ipv4").unwrap();
        assert!(af.read_state(&json!({"data": {}})).is_err());
    }

    #[test]
    fn test_context_nesting_order() {
        let af = BgpNeighborAf::new("65537", "spines", PeerKind::Template, "ipv4").unwrap();
        assert_eq!(
            af.context(),
            vec![
                "router bgp 65537".to_string(),
                "template spines".to_string(),
                "address-family ipv4 unicast".to_string(),
            ]
        );
    }
}
