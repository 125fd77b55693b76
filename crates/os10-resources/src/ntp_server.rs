//! NTP server configuration.
//!
//! Flat instance set: one entry per server address. Creation renders as a
//! single combined line carrying the optional authentication key and
//! prefer flag:
//!
//! ```text
//! ntp server time.domain.com key 123 prefer
//! ```

use serde_json::Value;

use os10_cfg_common::{show, CfgResult};
use os10_reconcile::{
    AttrMap, AttrSpec, AttrValue, Coercion, Collection, CurrentState, DefaultPolicy, EmitRule,
    Resource,
};

use crate::validators;

/// One NTP server, keyed by address.
pub struct NtpServer {
    address: String,
}

impl NtpServer {
    /// Creates the resource for the given server address.
    pub fn new(address: impl Into<String>) -> Self {
        NtpServer {
            address: address.into(),
        }
    }
}

/// One enumerated NTP server entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NtpServerInstance {
    /// Server address.
    pub address: String,
    /// Authentication key id, if configured.
    pub key: Option<String>,
    /// Whether the server is preferred.
    pub prefer: bool,
}

/// Enumerates all configured NTP servers from one running-config read.
pub fn instances(tree: &Value) -> CfgResult<Vec<NtpServerInstance>> {
    let Some(servers) = show::extract(tree, &["data", "ntp-config", "servers", "server"]) else {
        return Ok(Vec::new());
    };
    Ok(show::as_list(servers)
        .into_iter()
        .filter_map(|server| {
            Some(NtpServerInstance {
                address: show::extract_str(server, &["address"])?,
                key: show::extract_str(server, &["key-id"]),
                prefer: show::extract_str(server, &["prefer"]).as_deref() == Some("true"),
            })
        })
        .collect())
}

fn v_key(v: &AttrValue) -> Result<(), String> {
    validators::int_range(v, 1, 65535)
}

static ATTRS: &[AttrSpec] = &[
    AttrSpec {
        name: "key",
        collection: Collection::Scalar,
        default: DefaultPolicy::EmptyRemoves,
        coerce: Coercion::None,
        emit: EmitRule::Scalar {
            set: "ntp server {name} key {}",
            unset: "no ntp server {name} key {}",
        },
        validate: Some(v_key),
    },
    AttrSpec {
        name: "prefer",
        collection: Collection::Scalar,
        default: DefaultPolicy::Substitute("false"),
        coerce: Coercion::None,
        emit: EmitRule::Flag {
            on: "ntp server {name} prefer",
            off: "no ntp server {name} prefer",
        },
        validate: None,
    },
];

impl Resource for NtpServer {
    fn domain(&self) -> &'static str {
        "ntp_server"
    }

    fn attr_specs(&self) -> &'static [AttrSpec] {
        ATTRS
    }

    fn show_query(&self) -> String {
        "show running-configuration ntp | display-json".to_string()
    }

    fn context(&self) -> Vec<String> {
        Vec::new()
    }

    fn removal(&self) -> Vec<String> {
        vec![format!("no ntp server {}", self.address)]
    }

    fn template_vars(&self) -> Vec<(&'static str, String)> {
        vec![("name", self.address.clone())]
    }

    fn creation_lines(&self, desired: &AttrMap) -> Option<Vec<String>> {
        let mut cmd = format!("ntp server {}", self.address);
        if let Some(key) = desired.get("key").and_then(|v| v.as_scalar()) {
            if !key.is_empty() {
                cmd.push_str(&format!(" key {key}"));
            }
        }
        if desired.get("prefer").and_then(|v| v.as_scalar()) == Some("true") {
            cmd.push_str(" prefer");
        }
        Some(vec![cmd])
    }

    fn read_state(&self, tree: &Value) -> CfgResult<CurrentState> {
        let found = instances(tree)?
            .into_iter()
            .find(|s| s.address == self.address);
        let Some(server) = found else {
            return Ok(CurrentState::NotFound);
        };
        let mut attrs = AttrMap::new();
        if let Some(key) = server.key {
            attrs.insert("key", AttrValue::scalar(key));
        }
        attrs.insert("prefer", AttrValue::boolean(server.prefer));
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
                "ntp-config": {
                    "servers": {
                        "server": [
                            {"address": "time1.example.com", "key-id": "123", "prefer": "true"},
                            {"address": "time2.example.com"}
                        ]
                    }
                }
            }
        })
    }

    #[test]
    fn test_instances() {
        let servers = instances(&running_config()).unwrap();
        assert_eq!(servers.len(), 2);
        assert_eq!(servers[0].address, "time1.example.com");
        assert_eq!(servers[0].key.as_deref(), Some("123"));
        assert!(servers[0].prefer);
        assert!(!servers[1].prefer);
    }

    #[test]
    fn test_instances_empty_config() {
        assert!(instances(&json!({"data": {}})).unwrap().is_empty());
    }

    #[test]
    fn test_read_state() {
        let server = NtpServer::new("time1.example.com");
        let CurrentState::Found(attrs) = server.read_state(&running_config()).unwrap() else {
            panic!("expected Found");
        };
        assert_eq!(attrs.get("key"), Some(&AttrValue::scalar("123")));
        assert_eq!(attrs.get("prefer"), Some(&AttrValue::boolean(true)));
    }

    #[test]
    fn test_creation_combined_line() {
        let server = NtpServer::new("time.example.com");
        let desired: AttrMap = [
            ("key", AttrValue::scalar("123")),
            ("prefer", AttrValue::boolean(true)),
        ]
        .into_iter()
        .collect();
        assert_eq!(
            server.creation_lines(&desired),
            Some(vec!["ntp server time.example.com key 123 prefer".to_string()])
        );

        let bare = AttrMap::new();
        assert_eq!(
            server.creation_lines(&bare),
            Some(vec!["ntp server time.example.com".to_string()])
        );
    }

    #[test]
    fn test_removal() {
        let server = NtpServer::new("time.example.com");
        assert_eq!(
            server.removal(),
            vec!["no ntp server time.example.com".to_string()]
        );
    }
}
