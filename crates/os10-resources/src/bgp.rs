//! Base BGP instance configuration.
//!
//! One BGP routing instance keyed by autonomous-system number. Sample
//! desired state:
//!
//! ```ignore
//! let desired = DesiredState::present()
//!     .set("router_id", AttrValue::scalar("10.10.10.10"))
//!     .set("max_path_ebgp", AttrValue::scalar("11"))
//!     .set("log_neighbor_changes", AttrValue::boolean(true))
//!     .set("confederation_peers", AttrValue::list(["2", "33", "4"]));
//! Reconciler::new(executor).converge(&Bgp::new("65537"), &desired).await?;
//! ```
//!
//! A device can hold only one BGP instance. When the configured ASN differs
//! from the declared one the existing instance is removed and the declared
//! one created in its place.

use serde_json::Value;

use os10_cfg_common::{show, CfgResult};
use os10_reconcile::{
    AttrMap, AttrSpec, AttrValue, Coercion, Collection, ConflictPolicy, CurrentState,
    DefaultPolicy, EmitRule, Operation, RenderCtx, Resource,
};

use crate::validators;

/// One BGP routing instance, keyed by ASN.
pub struct Bgp {
    asn: String,
}

impl Bgp {
    /// Creates the resource for the given autonomous-system number
    /// (plain 32-bit or dotted `a.b` notation).
    pub fn new(asn: impl Into<String>) -> Self {
        Bgp { asn: asn.into() }
    }

    /// The ASN in canonical 32-bit form (`a.b` encodes as `a*65536+b`).
    pub fn canonical_asn(&self) -> String {
        match self.asn.split_once('.') {
            Some((hi, lo)) => match (hi.parse::<u64>(), lo.parse::<u64>()) {
                (Ok(hi), Ok(lo)) => (hi * 65536 + lo).to_string(),
                _ => self.asn.clone(),
            },
            None => self.asn.clone(),
        }
    }
}

fn v_max_path(v: &AttrValue) -> Result<(), String> {
    validators::int_range(v, 1, 64)
}

fn v_loc_pref(v: &AttrValue) -> Result<(), String> {
    validators::int_range(v, 1, 4294967295)
}

fn v_bestpath_as_path(v: &AttrValue) -> Result<(), String> {
    validators::one_of(v, &["ignore", "multipath_relax"])
}

/// `bestpath as-path` keeps the variant keyword in its clear form, and
/// clears nothing when nothing was configured.
fn render_bestpath_as_path(_ctx: &RenderCtx<'_>, op: &Operation) -> Vec<String> {
    let dashed = |s: &str| s.replace('_', "-");
    match op.value.as_scalar() {
        Some(v) if !v.is_empty() => vec![format!("bestpath as-path {}", dashed(v))],
        _ => match op.prior.as_scalar() {
            Some(prior) if !prior.is_empty() => {
                vec![format!("no bestpath as-path {}", dashed(prior))]
            }
            _ => Vec::new(),
        },
    }
}

static ATTRS: &[AttrSpec] = &[
    AttrSpec {
        name: "router_id",
        collection: Collection::Scalar,
        default: DefaultPolicy::EmptyRemoves,
        coerce: Coercion::None,
        emit: EmitRule::Scalar {
            set: "router-id {}",
            unset: "no router-id",
        },
        validate: Some(validators::ip_address),
    },
    AttrSpec {
        name: "max_path_ebgp",
        collection: Collection::Scalar,
        default: DefaultPolicy::EmptyRemoves,
        coerce: Coercion::None,
        emit: EmitRule::Scalar {
            set: "maximum-paths ebgp {}",
            unset: "no maximum-paths ebgp",
        },
        validate: Some(v_max_path),
    },
    AttrSpec {
        name: "max_path_ibgp",
        collection: Collection::Scalar,
        default: DefaultPolicy::EmptyRemoves,
        coerce: Coercion::None,
        emit: EmitRule::Scalar {
            set: "maximum-paths ibgp {}",
            unset: "no maximum-paths ibgp",
        },
        validate: Some(v_max_path),
    },
    AttrSpec {
        name: "graceful_restart",
        collection: Collection::Scalar,
        default: DefaultPolicy::Substitute("false"),
        coerce: Coercion::None,
        emit: EmitRule::Flag {
            on: "graceful-restart role receiver-only",
            off: "no graceful-restart role receiver-only",
        },
        validate: None,
    },
    AttrSpec {
        name: "log_neighbor_changes",
        collection: Collection::Scalar,
        default: DefaultPolicy::Substitute("true"),
        coerce: Coercion::None,
        emit: EmitRule::Flag {
            on: "log-neighbor-changes",
            off: "no log-neighbor-changes",
        },
        validate: None,
    },
    AttrSpec {
        name: "fast_external_fallover",
        collection: Collection::Scalar,
        default: DefaultPolicy::Substitute("true"),
        coerce: Coercion::None,
        emit: EmitRule::Flag {
            on: "fast-external-fallover",
            off: "no fast-external-fallover",
        },
        validate: None,
    },
    AttrSpec {
        name: "always_compare_med",
        collection: Collection::Scalar,
        default: DefaultPolicy::Substitute("false"),
        coerce: Coercion::None,
        emit: EmitRule::Flag {
            on: "always-compare-med",
            off: "no always-compare-med",
        },
        validate: None,
    },
    AttrSpec {
        name: "default_loc_pref",
        collection: Collection::Scalar,
        default: DefaultPolicy::EmptyRemoves,
        coerce: Coercion::None,
        emit: EmitRule::Scalar {
            set: "default local-preference {}",
            unset: "no default local-preference",
        },
        validate: Some(v_loc_pref),
    },
    AttrSpec {
        name: "confederation_identifier",
        collection: Collection::Scalar,
        default: DefaultPolicy::EmptyRemoves,
        coerce: Coercion::DottedAs,
        emit: EmitRule::Scalar {
            set: "confederation identifier {}",
            unset: "no confederation identifier",
        },
        validate: Some(validators::as_number),
    },
    AttrSpec {
        name: "confederation_peers",
        collection: Collection::UnorderedSet,
        default: DefaultPolicy::EmptyRemoves,
        coerce: Coercion::DottedAs,
        emit: EmitRule::Element {
            set: "confederation peers {}",
            unset: "no confederation peers {}",
        },
        validate: Some(validators::as_number),
    },
    AttrSpec {
        name: "route_reflector_client_to_client",
        collection: Collection::Scalar,
        default: DefaultPolicy::Substitute("true"),
        coerce: Coercion::None,
        emit: EmitRule::Flag {
            on: "client-to-client reflection",
            off: "no client-to-client reflection",
        },
        validate: None,
    },
    AttrSpec {
        name: "route_reflector_cluster_id",
        collection: Collection::Scalar,
        default: DefaultPolicy::EmptyRemoves,
        coerce: Coercion::None,
        emit: EmitRule::Scalar {
            set: "cluster-id {}",
            // The CLI requires a cluster-id argument even when clearing.
            unset: "no cluster-id 1",
        },
        validate: None,
    },
    AttrSpec {
        name: "bestpath_as_path",
        collection: Collection::Scalar,
        default: DefaultPolicy::EmptyRemoves,
        coerce: Coercion::None,
        emit: EmitRule::Custom(render_bestpath_as_path),
        validate: Some(v_bestpath_as_path),
    },
    AttrSpec {
        name: "bestpath_med_confed",
        collection: Collection::Scalar,
        default: DefaultPolicy::Substitute("false"),
        coerce: Coercion::None,
        emit: EmitRule::Flag {
            on: "bestpath med confed",
            off: "no bestpath med confed",
        },
        validate: None,
    },
    AttrSpec {
        name: "bestpath_med_missing_as_worst",
        collection: Collection::Scalar,
        default: DefaultPolicy::Substitute("false"),
        coerce: Coercion::None,
        emit: EmitRule::Flag {
            on: "bestpath med missing-as-worst",
            off: "no bestpath med missing-as-worst",
        },
        validate: None,
    },
    AttrSpec {
        name: "bestpath_routerid_ignore",
        collection: Collection::Scalar,
        default: DefaultPolicy::Substitute("false"),
        coerce: Coercion::None,
        emit: EmitRule::Flag {
            on: "bestpath router-id ignore",
            off: "no bestpath router-id ignore",
        },
        validate: None,
    },
];

impl Resource for Bgp {
    fn domain(&self) -> &'static str {
        "bgp"
    }

    fn attr_specs(&self) -> &'static [AttrSpec] {
        ATTRS
    }

    fn show_query(&self) -> String {
        "show running-configuration bgp | display-json".to_string()
    }

    fn context(&self) -> Vec<String> {
        vec![format!("router bgp {}", self.canonical_asn())]
    }

    fn removal(&self) -> Vec<String> {
        vec!["no router bgp".to_string()]
    }

    fn conflict_policy(&self) -> ConflictPolicy {
        // Only one BGP instance can exist; a foreign ASN is removed and the
        // declared instance created in its place.
        ConflictPolicy::Replace
    }

    fn read_state(&self, tree: &Value) -> CfgResult<CurrentState> {
        let Some(vrf) = show::extract(tree, &["data", "bgp-router", "vrf"]) else {
            return Ok(CurrentState::NotFound);
        };
        let Some(asn) = show::extract_str(vrf, &["local-as-number"]) else {
            return Ok(CurrentState::NotFound);
        };
        if asn != self.canonical_asn() {
            return Ok(CurrentState::Conflicting {
                field: "asn",
                found: asn,
            });
        }

        let mut attrs = AttrMap::new();
        let scalars = [
            ("router_id", &["router-id"] as &[&str]),
            ("max_path_ebgp", &["ebgp-number-of-path"]),
            ("max_path_ibgp", &["ibgp-number-of-path"]),
            ("graceful_restart", &["graceful-restart", "helper-only"]),
            ("log_neighbor_changes", &["log-neighbor-changes"]),
            ("fast_external_fallover", &["fast-external-fallover"]),
            ("default_loc_pref", &["default-local-pref"]),
            ("confederation_identifier", &["confederation-identifier"]),
            (
                "route_reflector_client_to_client",
                &["client-to-client-reflection"],
            ),
            ("route_reflector_cluster_id", &["cluster-id-value"]),
        ];
        for (name, path) in scalars {
            if let Some(v) = show::extract_str(vrf, path) {
                attrs.insert(name, AttrValue::scalar(v));
            }
        }

        // always-compare-med is presence-encoded
        attrs.insert(
            "always_compare_med",
            AttrValue::boolean(show::has_key(vrf, &[], "always-compare-med")),
        );

        if let Some(peers) = show::extract(vrf, &["confed-peer-as"]) {
            let peers: Vec<String> = show::as_list(peers)
                .iter()
                .filter_map(|v| show::leaf_str(v))
                .collect();
            attrs.insert("confederation_peers", AttrValue::List(peers));
        }

        if let Some(bp) = show::extract(vrf, &["bestpath"]) {
            if show::has_key(bp, &[], "aspath-ignore") {
                attrs.insert("bestpath_as_path", AttrValue::scalar("ignore"));
            } else if show::has_key(bp, &[], "aspath-multipath-relax") {
                attrs.insert("bestpath_as_path", AttrValue::scalar("multipath_relax"));
            }
            attrs.insert(
                "bestpath_med_confed",
                AttrValue::boolean(show::has_key(bp, &[], "med-confed")),
            );
            attrs.insert(
                "bestpath_med_missing_as_worst",
                AttrValue::boolean(show::has_key(bp, &[], "missing-as-best")),
            );
            attrs.insert(
                "bestpath_routerid_ignore",
                AttrValue::boolean(show::has_key(bp, &[], "ignore-routerid")),
            );
        }

        Ok(CurrentState::Found(attrs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use os10_reconcile::{DesiredState, Ensure};
    use serde_json::json;

    fn running_config() -> Value {
        json!({
            "data": {
                "bgp-router": {
                    "vrf": {
                        "local-as-number": "65537",
                        "router-id": "10.10.10.10",
                        "ebgp-number-of-path": "11",
                        "confed-peer-as": ["2", "33"],
                        "bestpath": {
                            "aspath-ignore": [null],
                            "med-confed": [null]
                        }
                    }
                }
            }
        })
    }

    #[test]
    fn test_read_state_found() {
        let bgp = Bgp::new("65537");
        let state = bgp.read_state(&running_config()).unwrap();
        let CurrentState::Found(attrs) = state else {
            panic!("expected Found");
        };
        assert_eq!(attrs.get("router_id"), Some(&AttrValue::scalar("10.10.10.10")));
        assert_eq!(attrs.get("max_path_ebgp"), Some(&AttrValue::scalar("11")));
        assert_eq!(
            attrs.get("confederation_peers"),
            Some(&AttrValue::list(["2", "33"]))
        );
        assert_eq!(
            attrs.get("bestpath_as_path"),
            Some(&AttrValue::scalar("ignore"))
        );
        assert_eq!(
            attrs.get("bestpath_med_confed"),
            Some(&AttrValue::boolean(true))
        );
        assert_eq!(
            attrs.get("bestpath_routerid_ignore"),
            Some(&AttrValue::boolean(false))
        );
    }

    #[test]
    fn test_read_state_not_found() {
        let bgp = Bgp::new("65537");
        let state = bgp.read_state(&json!({"data": {}})).unwrap();
        assert_eq!(state, CurrentState::NotFound);
    }

    #[test]
    fn test_read_state_foreign_asn() {
        let bgp = Bgp::new("65001");
        let state = bgp.read_state(&running_config()).unwrap();
        assert_eq!(
            state,
            CurrentState::Conflicting {
                field: "asn",
                found: "65537".to_string()
            }
        );
    }

    #[test]
    fn test_dotted_asn_canonical_form() {
        let bgp = Bgp::new("1.2");
        assert_eq!(bgp.canonical_asn(), "65538");
        assert_eq!(bgp.context(), vec!["router bgp 65538".to_string()]);
    }

    #[test]
    fn test_desired_state_builder() {
        let desired = DesiredState::present()
            .set("router_id", AttrValue::scalar("1.1.1.1"))
            .set("log_neighbor_changes", AttrValue::boolean(true));
        assert_eq!(desired.ensure(), Ensure::Present);
        assert_eq!(desired.attrs().len(), 2);
    }
}
