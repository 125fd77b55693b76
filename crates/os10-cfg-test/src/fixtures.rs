//! Canned running-configuration trees.

use serde_json::{json, Value};

/// A section with no configuration at all.
pub fn empty_config() -> Value {
    json!({"data": {}})
}

/// A BGP instance with a handful of attributes configured.
pub fn bgp_running_config(asn: &str) -> Value {
    json!({
        "data": {
            "bgp-router": {
                "vrf": {
                    "local-as-number": asn,
                    "router-id": "10.10.10.10",
                    "ebgp-number-of-path": "11",
                    "confed-peer-as": ["2", "33"]
                }
            }
        }
    })
}

/// A BGP instance holding one neighbor and one peer-group template.
pub fn bgp_neighbor_running_config(asn: &str, neighbor: &str) -> Value {
    json!({
        "data": {
            "bgp-router": {
                "vrf": {
                    "local-as-number": asn,
                    "peer-config": {
                        "remote-address": neighbor,
                        "remote-as": "65001",
                        "shutdown-status": "true"
                    },
                    "peer-group-config": {
                        "name": "spines"
                    }
                }
            }
        }
    })
}

/// One enabled monitor session with two sources.
pub fn monitor_running_config(id: &str) -> Value {
    json!({
        "data": {
            "sessions": {
                "session": {
                    "id": id,
                    "source-intf": [
                        {"name": "ethernet1/1/8"},
                        {"name": "ethernet1/1/9"}
                    ],
                    "destination-interface": "ethernet1/1/10",
                    "disable": "false"
                }
            }
        }
    })
}

/// An SNMP section with communities and one trap host.
pub fn snmp_running_config() -> Value {
    json!({
        "data": {
            "snmp-server": {
                "global": {"sys-contact": "noc@example.com"},
                "community": [
                    {"community-name": "public", "community-access": "read-only"}
                ],
                "trap-recipient-host": {
                    "host-address": "10.1.1.1",
                    "udp-port": "162",
                    "community-name": "public"
                }
            }
        }
    })
}

/// Static-route text output for one prefix with the given next hops.
pub fn route_running_config(prefix: &str, next_hops: &[&str]) -> Value {
    let lines: Vec<String> = next_hops
        .iter()
        .map(|hop| format!("ip route {prefix} {hop}"))
        .collect();
    Value::String(lines.join("\n"))
}
