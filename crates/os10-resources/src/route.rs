//! Static route configuration.
//!
//! One route keyed by destination prefix; the `ip`/`ipv6` command family
//! follows the destination's address family. The next-hop list is an
//! unordered set reconciled hop-by-hop.
//!
//! Static routes have no structured show subtree; current state is read
//! from the plain-text running configuration filtered to the prefix.

use std::net::IpAddr;

use serde_json::Value;

use os10_cfg_common::{show, CfgError, CfgResult};
use os10_reconcile::{
    AttrMap, AttrSpec, AttrValue, Coercion, Collection, CurrentState, DefaultPolicy, DesiredState,
    EmitRule, Resource,
};

/// One static route, keyed by destination + prefix length.
pub struct Route {
    destination: String,
    prefix_len: u8,
    family: &'static str,
}

impl Route {
    /// Creates the resource for the given destination and prefix length.
    /// The address family keyword follows the destination address.
    pub fn new(destination: impl Into<String>, prefix_len: u8) -> CfgResult<Self> {
        let destination = destination.into();
        let family = match destination.parse::<IpAddr>() {
            Ok(IpAddr::V4(_)) => "ip",
            Ok(IpAddr::V6(_)) => "ipv6",
            Err(_) => {
                return Err(CfgError::validation(
                    "destination",
                    format!("invalid IP address {destination}/{prefix_len}"),
                ));
            }
        };
        Ok(Route {
            destination,
            prefix_len,
            family,
        })
    }

    fn prefix(&self) -> String {
        format!("{}/{}", self.destination, self.prefix_len)
    }
}

static ATTRS: &[AttrSpec] = &[AttrSpec {
    name: "next_hop_list",
    collection: Collection::UnorderedSet,
    default: DefaultPolicy::EmptyRemoves,
    coerce: Coercion::None,
    emit: EmitRule::Element {
        set: "{family} route {prefix} {}",
        unset: "no {family} route {prefix} {}",
    },
    validate: None,
}];

impl Resource for Route {
    fn domain(&self) -> &'static str {
        "route"
    }

    fn attr_specs(&self) -> &'static [AttrSpec] {
        ATTRS
    }

    fn show_query(&self) -> String {
        format!(
            "show running-configuration | grep \"{} route {} \"",
            self.family,
            self.prefix()
        )
    }

    fn context(&self) -> Vec<String> {
        Vec::new()
    }

    fn removal(&self) -> Vec<String> {
        vec![format!("no {} route {}", self.family, self.prefix())]
    }

    fn template_vars(&self) -> Vec<(&'static str, String)> {
        vec![
            ("family", self.family.to_string()),
            ("prefix", self.prefix()),
        ]
    }

    fn validate(&self, desired: &DesiredState) -> CfgResult<()> {
        if desired.ensure() == os10_reconcile::Ensure::Present {
            let declared = desired
                .attrs()
                .get("next_hop_list")
                .is_some_and(|v| !v.is_empty());
            if !declared {
                return Err(CfgError::validation(
                    "next_hop_list",
                    "a static route needs at least one next hop",
                ));
            }
        }
        Ok(())
    }

    fn read_state(&self, tree: &Value) -> CfgResult<CurrentState> {
        // Plain-text output: one line per configured next hop.
        let Some(raw) = tree.as_str() else {
            return Ok(CurrentState::NotFound);
        };
        let marker = format!("{} route {} ", self.family, self.prefix());
        let hops: Vec<String> = raw
            .lines()
            .filter_map(|line| {
                let line = line.trim();
                line.starts_with(&marker)
                    .then(|| line[marker.len()..].trim().to_string())
            })
            .filter(|hop| !hop.is_empty())
            .collect();
        if hops.is_empty() {
            return Ok(CurrentState::NotFound);
        }
        let mut attrs = AttrMap::new();
        attrs.insert("next_hop_list", AttrValue::List(hops));
        Ok(CurrentState::Found(attrs))
    }
}
