//! BGP neighbor and peer-group template sub-configuration.
//!
//! One neighbor (keyed by ASN + remote address) or one peer-group template
//! (keyed by ASN + template name) inside the BGP instance. The declared ASN
//! must match the configured instance; sub-resources never take over a
//! foreign instance.

use serde_json::Value;

use os10_cfg_common::{show, CfgResult};
use os10_reconcile::{
    AttrMap, AttrSpec, AttrValue, Coercion, Collection, CurrentState, DefaultPolicy, DesiredState,
    EmitRule, Resource,
};

use crate::validators;

/// Whether the peer is addressed by IP or by template name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerKind {
    /// A neighbor addressed by IP.
    Ip,
    /// A peer-group template addressed by name.
    Template,
}

impl PeerKind {
    fn keyword(&self) -> &'static str {
        match self {
            PeerKind::Ip => "neighbor",
            PeerKind::Template => "template",
        }
    }
}

/// One BGP neighbor or peer-group template.
pub struct BgpNeighbor {
    asn: String,
    peer: String,
    kind: PeerKind,
}

impl BgpNeighbor {
    /// Creates the resource for a neighbor IP or template name under the
    /// given ASN.
    pub fn new(asn: impl Into<String>, peer: impl Into<String>, kind: PeerKind) -> Self {
        BgpNeighbor {
            asn: asn.into(),
            peer: peer.into(),
            kind,
        }
    }
}

/// Locates the peer entry in the parsed BGP subtree.
pub(crate) fn find_peer<'a>(vrf: &'a Value, peer: &str, kind: PeerKind) -> Option<&'a Value> {
    let (list_key, id_key) = match kind {
        PeerKind::Ip => ("peer-config", "remote-address"),
        PeerKind::Template => ("peer-group-config", "name"),
    };
    let entries = show::extract(vrf, &[list_key])?;
    show::as_list(entries)
        .into_iter()
        .find(|entry| show::extract_str(entry, &[id_key]).as_deref() == Some(peer))
}

fn v_timers(v: &AttrValue) -> Result<(), String> {
    match v {
        AttrValue::List(items) if items.len() == 2 || items.is_empty() => Ok(()),
        AttrValue::Absent => Ok(()),
        _ => Err("timers take no or two values (keepalive, hold-time)".to_string()),
    }
}

fn v_password(v: &AttrValue) -> Result<(), String> {
    validators::max_len(v, 128)
}

fn v_peergroup(v: &AttrValue) -> Result<(), String> {
    validators::max_len(v, 16)
}

fn v_ebgp_multihop(v: &AttrValue) -> Result<(), String> {
    validators::int_range(v, 1, 255)
}

fn v_weight(v: &AttrValue) -> Result<(), String> {
    validators::int_range(v, 0, 65535)
}

static ATTRS: &[AttrSpec] = &[
    AttrSpec {
        name: "advertisement_interval",
        collection: Collection::Scalar,
        default: DefaultPolicy::EmptyRemoves,
        coerce: Coercion::None,
        emit: EmitRule::Scalar {
            set: "advertisement-interval {}",
            unset: "no advertisement-interval",
        },
        validate: None,
    },
    AttrSpec {
        name: "advertisement_start",
        collection: Collection::Scalar,
        default: DefaultPolicy::EmptyRemoves,
        coerce: Coercion::None,
        emit: EmitRule::Scalar {
            set: "advertisement-start {}",
            unset: "no advertisement-start",
        },
        validate: None,
    },
    AttrSpec {
        name: "timers",
        collection: Collection::OrderedList,
        default: DefaultPolicy::EmptyRemoves,
        coerce: Coercion::None,
        emit: EmitRule::Joined {
            set: "timers {}",
            unset: "no timers",
        },
        validate: Some(v_timers),
    },
    AttrSpec {
        name: "connection_retry_timer",
        collection: Collection::Scalar,
        default: DefaultPolicy::EmptyRemoves,
        coerce: Coercion::None,
        emit: EmitRule::Scalar {
            set: "connection-retry-timer {}",
            unset: "no connection-retry-timer",
        },
        validate: None,
    },
    AttrSpec {
        name: "remote_as",
        collection: Collection::Scalar,
        default: DefaultPolicy::EmptyRemoves,
        coerce: Coercion::DottedAs,
        emit: EmitRule::Scalar {
            set: "remote-as {}",
            unset: "no remote-as",
        },
        validate: Some(validators::as_number),
    },
    AttrSpec {
        name: "remove_private_as",
        collection: Collection::Scalar,
        default: DefaultPolicy::Substitute("false"),
        coerce: Coercion::None,
        emit: EmitRule::Flag {
            on: "remove-private-as",
            off: "no remove-private-as",
        },
        validate: None,
    },
    AttrSpec {
        name: "shutdown",
        collection: Collection::Scalar,
        default: DefaultPolicy::Substitute("true"),
        coerce: Coercion::None,
        emit: EmitRule::Flag {
            on: "shutdown",
            off: "no shutdown",
        },
        validate: None,
    },
    AttrSpec {
        name: "password",
        collection: Collection::Scalar,
        default: DefaultPolicy::EmptyRemoves,
        coerce: Coercion::None,
        emit: EmitRule::Scalar {
            set: "password {}",
            // The CLI requires a password argument even when clearing.
            unset: "no password 1",
        },
        validate: Some(v_password),
    },
    AttrSpec {
        name: "send_community_standard",
        collection: Collection::Scalar,
        default: DefaultPolicy::Substitute("false"),
        coerce: Coercion::None,
        emit: EmitRule::Flag {
            on: "send-community standard",
            off: "no send-community standard",
        },
        validate: None,
    },
    AttrSpec {
        name: "send_community_extended",
        collection: Collection::Scalar,
        default: DefaultPolicy::Substitute("false"),
        coerce: Coercion::None,
        emit: EmitRule::Flag {
            on: "send-community extended",
            off: "no send-community extended",
        },
        validate: None,
    },
    AttrSpec {
        name: "peergroup",
        collection: Collection::Scalar,
        default: DefaultPolicy::EmptyRemoves,
        coerce: Coercion::None,
        emit: EmitRule::Scalar {
            set: "inherit template {}",
            // The CLI requires a template name even when clearing.
            unset: "no inherit template dummy",
        },
        validate: Some(v_peergroup),
    },
    AttrSpec {
        name: "ebgp_multihop",
        collection: Collection::Scalar,
        default: DefaultPolicy::EmptyRemoves,
        coerce: Coercion::None,
        emit: EmitRule::Scalar {
            set: "ebgp-multihop {}",
            unset: "no ebgp-multihop",
        },
        validate: Some(v_ebgp_multihop),
    },
    AttrSpec {
        name: "fall_over",
        collection: Collection::Scalar,
        default: DefaultPolicy::Substitute("false"),
        coerce: Coercion::None,
        emit: EmitRule::Flag {
            on: "fall-over",
            off: "no fall-over",
        },
        validate: None,
    },
    AttrSpec {
        name: "local_as",
        collection: Collection::Scalar,
        default: DefaultPolicy::EmptyRemoves,
        coerce: Coercion::DottedAs,
        emit: EmitRule::Scalar {
            set: "local-as {}",
            unset: "no local-as",
        },
        validate: Some(validators::as_number),
    },
    AttrSpec {
        name: "route_reflector_client",
        collection: Collection::Scalar,
        default: DefaultPolicy::Substitute("false"),
        coerce: Coercion::None,
        emit: EmitRule::Flag {
            on: "route-reflector-client",
            off: "no route-reflector-client",
        },
        validate: None,
    },
    AttrSpec {
        name: "weight",
        collection: Collection::Scalar,
        default: DefaultPolicy::EmptyRemoves,
        coerce: Coercion::None,
        emit: EmitRule::Scalar {
            set: "weight {}",
            unset: "no weight",
        },
        validate: Some(v_weight),
    },
];

impl Resource for BgpNeighbor {
    fn domain(&self) -> &'static str {
        "bgp_neighbor"
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
            format!("{} {}", self.kind.keyword(), self.peer),
        ]
    }

    fn removal(&self) -> Vec<String> {
        vec![
            format!("router bgp {}", self.asn),
            format!("no {} {}", self.kind.keyword(), self.peer),
        ]
    }

    fn validate(&self, desired: &DesiredState) -> CfgResult<()> {
        // Shutdown state applies to real neighbors, not templates.
        if self.kind == PeerKind::Template && desired.attrs().contains_key("shutdown") {
            return Err(os10_cfg_common::CfgError::validation(
                "shutdown",
                format!("template {} cannot carry a shutdown state", self.peer),
            ));
        }
        Ok(())
    }

    fn read_state(&self, tree: &Value) -> CfgResult<CurrentState> {
        let Some(vrf) = show::extract(tree, &["data", "bgp-router", "vrf"]) else {
            return Ok(CurrentState::NotFound);
        };
        if let Some(asn) = show::extract_str(vrf, &["local-as-number"]) {
            if asn != self.asn {
                return Ok(CurrentState::Conflicting {
                    field: "asn",
                    found: asn,
                });
            }
        }
        let Some(peer) = find_peer(vrf, &self.peer, self.kind) else {
            return Ok(CurrentState::NotFound);
        };

        let mut attrs = AttrMap::new();
        let scalars = [
            ("advertisement_interval", &["advertisement-interval"] as &[&str]),
            ("advertisement_start", &["advertisement-start"]),
            ("connection_retry_timer", &["connection-retry-timer"]),
            ("remote_as", &["remote-as"]),
            ("remove_private_as", &["remove-private-as"]),
            ("shutdown", &["shutdown-status"]),
            ("password", &["password"]),
            ("send_community_standard", &["send-community-standard"]),
            ("send_community_extended", &["send-community-extended"]),
            ("peergroup", &["associate-peer-group"]),
            ("ebgp_multihop", &["ebgp-multihop-count"]),
            ("local_as", &["local-as", "as-number"]),
            ("route_reflector_client", &["route-reflector-client"]),
            ("weight", &["weight"]),
        ];
        for (name, path) in scalars {
            if let Some(v) = show::extract_str(peer, path) {
                attrs.insert(name, AttrValue::scalar(v));
            }
        }

        attrs.insert(
            "fall_over",
            AttrValue::boolean(show::has_key(peer, &[], "fall-over")),
        );

        if show::has_key(peer, &[], "timers") {
            let keepalive = show::extract_str(peer, &["timers", "config-keepalive"]);
            let hold = show::extract_str(peer, &["timers", "config-hold-time"]);
            if let (Some(keepalive), Some(hold)) = (keepalive, hold) {
                attrs.insert("timers", AttrValue::list([keepalive, hold]));
            }
        } else {
            attrs.insert("timers", AttrValue::list::<_, String>([]));
        }

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
                        "peer-config": [
                            {
                                "remote-address": "10.1.1.1",
                                "remote-as": "65001",
                                "shutdown-status": "true",
                                "timers": {
                                    "config-keepalive": "30",
                                    "config-hold-time": "90"
                                }
                            }
                        ],
                        "peer-group-config": {
                            "name": "spines",
                            "send-community-extended": "true"
                        }
                    }
                }
            }
        })
    }

    #[test]
    fn test_read_neighbor() {
        let nbr = BgpNeighbor::new("65537", "10.1.1.1", PeerKind::Ip);
        let CurrentState::Found(attrs) = nbr.read_state(&running_config()).unwrap() else {
            panic!("expected Found");
        };
        assert_eq!(attrs.get("remote_as"), Some(&AttrValue::scalar("65001")));
        assert_eq!(attrs.get("timers"), Some(&AttrValue::list(["30", "90"])));
        assert_eq!(attrs.get("fall_over"), Some(&AttrValue::boolean(false)));
    }

    #[test]
    fn test_read_template_singleton() {
        // A lone template is a bare mapping, not a one-element array.
        let nbr = BgpNeighbor::new("65537", "spines", PeerKind::Template);
        let CurrentState::Found(attrs) = nbr.read_state(&running_config()).unwrap() else {
            panic!("expected Found");
        };
        assert_eq!(
            attrs.get("send_community_extended"),
            Some(&AttrValue::scalar("true"))
        );
    }

    #[test]
    fn test_missing_neighbor_not_found() {
        let nbr = BgpNeighbor::new("65537", "10.9.9.9", PeerKind::Ip);
        assert_eq!(
            nbr.read_state(&running_config()).unwrap(),
            CurrentState::NotFound
        );
    }

    #[test]
    fn test_asn_mismatch_is_conflict() {
        let nbr = BgpNeighbor::new("65001", "10.1.1.1", PeerKind::Ip);
        let state = nbr.read_state(&running_config()).unwrap();
        assert!(matches!(state, CurrentState::Conflicting { field: "asn", .. }));
    }

    #[test]
    fn test_template_rejects_shutdown() {
        let nbr = BgpNeighbor::new("65537", "spines", PeerKind::Template);
        let desired = DesiredState::present().set("shutdown", AttrValue::boolean(false));
        assert!(nbr.validate(&desired).is_err());
    }

    #[test]
    fn test_context_and_removal() {
        let nbr = BgpNeighbor::new("65537", "10.1.1.1", PeerKind::Ip);
        assert_eq!(
            nbr.context(),
            vec!["router bgp 65537".to_string(), "neighbor 10.1.1.1".to_string()]
        );
        assert_eq!(
            nbr.removal(),
            vec![
                "router bgp 65537".to_string(),
                "no neighbor 10.1.1.1".to_string()
            ]
        );
    }
}
