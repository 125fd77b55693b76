//! BGP address-family sub-configuration.
//!
//! One `address-family ipv4|ipv6 unicast` block inside the BGP instance,
//! keyed by ASN + IP version. Networks, aggregate addresses and
//! redistribute entries carry an optional route-map suffix inside the
//! element value (`"10.1.0.0/16 setmed"`).

use serde_json::Value;

use os10_cfg_common::{show, CfgError, CfgResult};
use os10_reconcile::{
    Action, AttrMap, AttrSpec, AttrValue, Coercion, Collection, CurrentState, DefaultPolicy,
    DesiredState, EmitRule, Operation, RenderCtx, Resource,
};

use crate::validators;

/// One BGP address family, keyed by ASN + IP version.
pub struct BgpAf {
    asn: String,
    ip_ver: String,
}

impl BgpAf {
    /// Creates the resource for `ipv4` or `ipv6` unicast under the given
    /// ASN.
    pub fn new(asn: impl Into<String>, ip_ver: impl Into<String>) -> CfgResult<Self> {
        let ip_ver = ip_ver.into();
        if ip_ver != "ipv4" && ip_ver != "ipv6" {
            return Err(CfgError::validation(
                "ip_ver",
                format!("invalid IP version {ip_ver}"),
            ));
        }
        Ok(BgpAf {
            asn: asn.into(),
            ip_ver,
        })
    }
}

fn v_default_metric(v: &AttrValue) -> Result<(), String> {
    validators::int_range(v, 1, 4294967295)
}

fn v_dampening(v: &AttrValue) -> Result<(), String> {
    let items = match v {
        AttrValue::List(items) if matches!(items.len(), 0 | 4 | 5) => items,
        AttrValue::Absent => return Ok(()),
        _ => {
            return Err(
                "dampening takes half-life, reuse, suppress, max-suppress and an optional route-map"
                    .to_string(),
            );
        }
    };
    let ranges = [(1u64, 45u64), (1, 20000), (1, 20000), (1, 255)];
    for (value, (min, max)) in items.iter().zip(ranges) {
        let n: u64 = value
            .parse()
            .map_err(|_| format!("{value} is not a number"))?;
        if n < min || n > max {
            return Err(format!("{n} out of range {min}-{max}"));
        }
    }
    Ok(())
}

/// Bare dampening toggle. When parameters are also declared the combined
/// parameter line carries the enable, so the toggle renders nothing.
fn render_dampening_state(ctx: &RenderCtx<'_>, op: &Operation) -> Vec<String> {
    if op.value.as_scalar() == Some("true") {
        match ctx.desired.get("dampening") {
            Some(params) if !params.is_empty() => Vec::new(),
            _ => vec!["dampening".to_string()],
        }
    } else {
        vec!["no dampening".to_string()]
    }
}

/// Combined dampening parameter line.
fn render_dampening(_ctx: &RenderCtx<'_>, op: &Operation) -> Vec<String> {
    match op.action {
        Action::Unset => vec!["no dampening".to_string()],
        Action::Set => {
            let params = op.value.as_list().unwrap_or(&[]);
            match params {
                [half_life, reuse, suppress, max_suppress] => {
                    vec![format!(
                        "dampening {half_life} {reuse} {suppress} {max_suppress}"
                    )]
                }
                [half_life, reuse, suppress, max_suppress, route_map] => {
                    vec![format!(
                        "dampening {half_life} {reuse} {suppress} {max_suppress} route-map {route_map}"
                    )]
                }
                _ => Vec::new(),
            }
        }
    }
}

/// `prefix[ route-map]` element rendering shared by network and
/// redistribute-style attributes.
fn prefixed_line(negate: bool, keyword: &str, element: &str, map_keyword: &str) -> String {
    let no = if negate { "no " } else { "" };
    match element.split_once(' ') {
        Some((head, route_map)) => {
            format!("{no}{keyword} {head} {map_keyword} {route_map}")
        }
        None => format!("{no}{keyword} {element}"),
    }
}

fn render_network(_ctx: &RenderCtx<'_>, op: &Operation) -> Vec<String> {
    let Some(element) = op.value.as_scalar() else {
        return Vec::new();
    };
    vec![prefixed_line(
        op.action == Action::Unset,
        "network",
        element,
        "route-map",
    )]
}

fn render_redistribute(_ctx: &RenderCtx<'_>, op: &Operation) -> Vec<String> {
    let Some(element) = op.value.as_scalar() else {
        return Vec::new();
    };
    vec![prefixed_line(
        op.action == Action::Unset,
        "redistribute",
        element,
        "route-map",
    )]
}

static ATTRS: &[AttrSpec] = &[
    AttrSpec {
        name: "aggregate_address",
        collection: Collection::UnorderedSet,
        default: DefaultPolicy::EmptyRemoves,
        coerce: Coercion::None,
        emit: EmitRule::Element {
            set: "aggregate-address {}",
            unset: "no aggregate-address {}",
        },
        validate: Some(validators::ip_prefix),
    },
    AttrSpec {
        name: "dampening_state",
        collection: Collection::Scalar,
        default: DefaultPolicy::Substitute("false"),
        coerce: Coercion::None,
        emit: EmitRule::Custom(render_dampening_state),
        validate: None,
    },
    AttrSpec {
        name: "dampening",
        collection: Collection::OrderedList,
        default: DefaultPolicy::EmptyRemoves,
        coerce: Coercion::None,
        emit: EmitRule::Custom(render_dampening),
        validate: Some(v_dampening),
    },
    AttrSpec {
        name: "default_metric",
        collection: Collection::Scalar,
        default: DefaultPolicy::EmptyRemoves,
        coerce: Coercion::None,
        emit: EmitRule::Scalar {
            set: "default-metric {}",
            unset: "no default-metric",
        },
        validate: Some(v_default_metric),
    },
    AttrSpec {
        name: "network",
        collection: Collection::UnorderedSet,
        default: DefaultPolicy::EmptyRemoves,
        coerce: Coercion::None,
        emit: EmitRule::Custom(render_network),
        validate: None,
    },
    AttrSpec {
        name: "redistribute",
        collection: Collection::UnorderedSet,
        default: DefaultPolicy::EmptyRemoves,
        coerce: Coercion::None,
        emit: EmitRule::Custom(render_redistribute),
        validate: None,
    },
];

impl Resource for BgpAf {
    fn domain(&self) -> &'static str {
        "bgp_af"
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
            format!("address-family {} unicast", self.ip_ver),
        ]
    }

    fn removal(&self) -> Vec<String> {
        vec![
            format!("router bgp {}", self.asn),
            format!("no address-family {} unicast", self.ip_ver),
        ]
    }

    fn validate(&self, desired: &DesiredState) -> CfgResult<()> {
        // Dampening parameters only make sense with dampening enabled.
        let params_declared = desired
            .attrs()
            .get("dampening")
            .is_some_and(|v| !v.is_empty());
        let state_enabled = desired
            .attrs()
            .get("dampening_state")
            .and_then(|v| v.as_scalar())
            == Some("true");
        if params_declared && !state_enabled {
            return Err(CfgError::validation(
                "dampening",
                "dampening parameters require dampening_state true",
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
                return Err(CfgError::mismatch("asn", self.asn.clone(), asn));
            }
        }
        let af_key = format!("{}-unicast", self.ip_ver);
        let Some(af) = show::extract(vrf, &[af_key.as_str()]) else {
            return Ok(CurrentState::NotFound);
        };

        let mut attrs = AttrMap::new();

        if let Some(list) = show::extract(af, &["aggregate-address-list"]) {
            let prefixes: Vec<String> = show::as_list(list)
                .iter()
                .filter_map(|v| show::extract_str(v, &["prefix"]))
                .collect();
            attrs.insert("aggregate_address", AttrValue::List(prefixes));
        }

        if let Some(enabled) = show::extract_str(af, &["dampening", "enable"]) {
            attrs.insert("dampening_state", AttrValue::scalar(enabled));
        }

        if let Some(metric) = show::extract_str(af, &["default-metric"]) {
            attrs.insert("default_metric", AttrValue::scalar(metric));
        }

        if let Some(list) = show::extract(af, &["network-address-list"]) {
            let networks: Vec<String> = show::as_list(list)
                .iter()
                .filter_map(|v| {
                    let prefix = show::extract_str(v, &["prefix"])?;
                    Some(match show::extract_str(v, &["route-map"]) {
                        Some(map) if !map.is_empty() => format!("{prefix} {map}"),
                        _ => prefix,
                    })
                })
                .collect();
            attrs.insert("network", AttrValue::List(networks));
        }

        let mut redistribute = Vec::new();
        if show::has_key(af, &[], "redistribute-connected") {
            let map = show::extract_str(af, &["redistribute-connected", "redistribute-route-map"]);
            redistribute.push(join_redistribute("connected", map));
        }
        if show::has_key(af, &[], "redistribute-static") {
            let map = show::extract_str(af, &["redistribute-static", "route-map"]);
            redistribute.push(join_redistribute("static", map));
        }
        if let Some(id) = show::extract_str(af, &["redistribute-ospf", "id"]) {
            redistribute.push(format!("ospf {id}"));
        }
        if !redistribute.is_empty() {
            attrs.insert("redistribute", AttrValue::List(redistribute));
        }

        Ok(CurrentState::Found(attrs))
    }
}

fn join_redistribute(proto: &str, route_map: Option<String>) -> String {
    match route_map {
        Some(map) if !map.is_empty() => format!("{proto} {map}"),
        _ => proto.to_string(),
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
                        "ipv4-unicast": {
                            "aggregate-address-list": [
                                {"prefix": "10.1.0.0/16"},
                                {"prefix": "10.2.0.0/16"}
                            ],
                            "default-metric": "50",
                            "network-address-list": {
                                "prefix": "10.3.0.0/24",
                                "route-map": "setmed"
                            },
                            "redistribute-connected": {},
                            "redistribute-ospf": {"id": "10"}
                        }
                    }
                }
            }
        })
    }

    #[test]
    fn test_read_state() {
        let af = BgpAf::new("65537", "ipv4").unwrap();
        let CurrentState::Found(attrs) = af.read_state(&running_config()).unwrap() else {
            panic!("expected Found");
        };
        assert_eq!(
            attrs.get("aggregate_address"),
            Some(&AttrValue::list(["10.1.0.0/16", "10.2.0.0/16"]))
        );
        assert_eq!(
            attrs.get("network"),
            Some(&AttrValue::list(["10.3.0.0/24 setmed"]))
        );
        assert_eq!(
            attrs.get("redistribute"),
            Some(&AttrValue::list(["connected", "ospf 10"]))
        );
    }

    #[test]
    fn test_missing_af_not_found() {
        let af = BgpAf::new("65537", "ipv6").unwrap();
        assert_eq!(
            af.read_state(&running_config()).unwrap(),
            CurrentState::NotFound
        );
    }

    #[test]
    fn test_asn_mismatch_is_error() {
        let af = BgpAf::new("65001", "ipv4").unwrap();
        let err = af.read_state(&running_config()).unwrap_err();
        assert!(matches!(err, CfgError::Mismatch { .. }));
    }

    #[test]
    fn test_invalid_ip_ver_rejected() {
        assert!(BgpAf::new("65537", "ipx").is_err());
    }

    #[test]
    fn test_dampening_params_require_state() {
        let af = BgpAf::new("65537", "ipv4").unwrap();
        let desired =
            DesiredState::present().set("dampening", AttrValue::list(["15", "750", "2000", "60"]));
        assert!(af.validate(&desired).is_err());

        let desired = DesiredState::present()
            .set("dampening_state", AttrValue::boolean(true))
            .set("dampening", AttrValue::list(["15", "750", "2000", "60"]));
        assert!(af.validate(&desired).is_ok());
    }
}
