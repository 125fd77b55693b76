//! Local user account configuration.
//!
//! Flat instance set keyed by username. Creation renders the combined
//! username line plus an optional sshkey line:
//!
//! ```text
//! username ops password secret role netadmin priv-lvl 15
//! username ops sshkey "ssh-rsa AAAA..."
//! ```

use serde_json::Value;

use os10_cfg_common::{show, CfgResult};
use os10_reconcile::{
    AttrMap, AttrSpec, AttrValue, Coercion, Collection, CurrentState, DefaultPolicy, EmitRule,
    Resource,
};

use crate::validators;

/// One local user, keyed by username.
pub struct User {
    name: String,
}

impl User {
    /// Creates the resource for the given username.
    pub fn new(name: impl Into<String>) -> Self {
        User { name: name.into() }
    }
}

/// One enumerated user entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInstance {
    /// Username.
    pub name: String,
    /// Assigned role, if configured.
    pub role: Option<String>,
    /// Privilege level, if configured.
    pub priv_level: Option<String>,
    /// SSH key type, if configured.
    pub ssh_key_type: Option<String>,
    /// SSH public key, if configured.
    pub ssh_key: Option<String>,
}

/// Enumerates all configured users from one running-config read.
pub fn instances(tree: &Value) -> CfgResult<Vec<UserInstance>> {
    let Some(users) = show::extract(tree, &["data", "system", "user"]) else {
        return Ok(Vec::new());
    };
    Ok(show::as_list(users)
        .into_iter()
        .filter_map(|user| {
            Some(UserInstance {
                name: show::extract_str(user, &["name"])?,
                role: show::extract_str(user, &["group"]),
                priv_level: show::extract_str(user, &["privilege-level"]),
                ssh_key_type: show::extract_str(user, &["sshkey-type"]),
                ssh_key: show::extract_str(user, &["sshkey"]),
            })
        })
        .collect())
}

fn v_role(v: &AttrValue) -> Result<(), String> {
    validators::one_of(v, &["netoperator", "netadmin", "secadmin", "sysadmin"])
}

fn v_priv_level(v: &AttrValue) -> Result<(), String> {
    validators::int_range(v, 0, 15)
}

fn v_ssh_key(v: &AttrValue) -> Result<(), String> {
    match v.as_scalar() {
        Some(key) if !key.is_empty() && !key.starts_with("ssh-rsa ") => {
            Err("ssh key must start with ssh-rsa".to_string())
        }
        _ => Ok(()),
    }
}

fn v_ssh_key_type(v: &AttrValue) -> Result<(), String> {
    validators::one_of(v, &["file", "key"])
}

static ATTRS: &[AttrSpec] = &[
    AttrSpec {
        name: "password",
        collection: Collection::Scalar,
        default: DefaultPolicy::EmptyRemoves,
        coerce: Coercion::None,
        emit: EmitRule::Scalar {
            set: "username {name} password {}",
            unset: "no username {name}",
        },
        validate: None,
    },
    AttrSpec {
        name: "role",
        collection: Collection::Scalar,
        default: DefaultPolicy::EmptyRemoves,
        coerce: Coercion::None,
        emit: EmitRule::Scalar {
            set: "username {name} role {}",
            unset: "no username {name} role {}",
        },
        validate: Some(v_role),
    },
    AttrSpec {
        name: "priv_level",
        collection: Collection::Scalar,
        default: DefaultPolicy::EmptyRemoves,
        coerce: Coercion::None,
        emit: EmitRule::Scalar {
            set: "username {name} priv-lvl {}",
            unset: "no username {name} priv-lvl {}",
        },
        validate: Some(v_priv_level),
    },
    AttrSpec {
        name: "ssh_key_type",
        collection: Collection::Scalar,
        default: DefaultPolicy::EmptyRemoves,
        coerce: Coercion::None,
        // Recorded for comparison; the key line itself carries the type.
        emit: EmitRule::Scalar {
            set: "",
            unset: "",
        },
        validate: Some(v_ssh_key_type),
    },
    AttrSpec {
        name: "ssh_key",
        collection: Collection::Scalar,
        default: DefaultPolicy::EmptyRemoves,
        coerce: Coercion::None,
        emit: EmitRule::Scalar {
            set: "username {name} sshkey \"{}\"",
            unset: "no username {name} sshkey",
        },
        validate: Some(v_ssh_key),
    },
];

impl Resource for User {
    fn domain(&self) -> &'static str {
        "user"
    }

    fn attr_specs(&self) -> &'static [AttrSpec] {
        ATTRS
    }

    fn show_query(&self) -> String {
        "show running-configuration users | display-json".to_string()
    }

    fn context(&self) -> Vec<String> {
        Vec::new()
    }

    fn removal(&self) -> Vec<String> {
        vec![
            format!("no username {}", self.name),
            format!("no username {} sshkey", self.name),
        ]
    }

    fn template_vars(&self) -> Vec<(&'static str, String)> {
        vec![("name", self.name.clone())]
    }

    fn creation_lines(&self, desired: &AttrMap) -> Option<Vec<String>> {
        let field = |name: &str| {
            desired
                .get(name)
                .and_then(|v| v.as_scalar())
                .filter(|v| !v.is_empty())
        };
        let mut cmd = format!("username {}", self.name);
        if let Some(password) = field("password") {
            cmd.push_str(&format!(" password {password}"));
        }
        if let Some(role) = field("role") {
            cmd.push_str(&format!(" role {role}"));
        }
        if let Some(priv_level) = field("priv_level") {
            cmd.push_str(&format!(" priv-lvl {priv_level}"));
        }
        let mut lines = vec![cmd];
        if let Some(key) = field("ssh_key") {
            lines.push(format!("username {} sshkey \"{}\"", self.name, key));
        }
        Some(lines)
    }

    fn read_state(&self, tree: &Value) -> CfgResult<CurrentState> {
        let found = instances(tree)?.into_iter().find(|u| u.name == self.name);
        let Some(user) = found else {
            return Ok(CurrentState::NotFound);
        };
        let mut attrs = AttrMap::new();
        if let Some(role) = user.role {
            attrs.insert("role", AttrValue::scalar(role));
        }
        if let Some(priv_level) = user.priv_level {
            attrs.insert("priv_level", AttrValue::scalar(priv_level));
        }
        if let Some(key_type) = user.ssh_key_type {
            attrs.insert("ssh_key_type", AttrValue::scalar(key_type));
        }
        if let Some(key) = user.ssh_key {
            attrs.insert("ssh_key", AttrValue::scalar(key));
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
                "system": {
                    "user": [
                        {
                            "name": "ops",
                            "group": "netadmin",
                            "privilege-level": "15",
                            "sshkey-type": "key",
                            "sshkey": "ssh-rsa AAAA"
                        },
                        {"name": "watcher", "group": "netoperator"}
                    ]
                }
            }
        })
    }

    #[test]
    fn test_instances() {
        let users = instances(&running_config()).unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].name, "ops");
        assert_eq!(users[0].role.as_deref(), Some("netadmin"));
        assert_eq!(users[1].priv_level, None);
    }

    #[test]
    fn test_read_state() {
        let user = User::new("ops");
        let CurrentState::Found(attrs) = user.read_state(&running_config()).unwrap() else {
            panic!("expected Found");
        };
        assert_eq!(attrs.get("role"), Some(&AttrValue::scalar("netadmin")));
        assert_eq!(attrs.get("ssh_key"), Some(&AttrValue::scalar("ssh-rsa AAAA")));
    }

    #[test]
    fn test_missing_user_not_found() {
        let user = User::new("ghost");
        assert_eq!(
            user.read_state(&running_config()).unwrap(),
            CurrentState::NotFound
        );
    }

    #[test]
    fn test_creation_combined_lines() {
        let user = User::new("ops");
        let desired: AttrMap = [
            ("password", AttrValue::scalar("secret")),
            ("role", AttrValue::scalar("netadmin")),
            ("priv_level", AttrValue::scalar("15")),
            ("ssh_key", AttrValue::scalar("ssh-rsa AAAA")),
        ]
        .into_iter()
        .collect();
        assert_eq!(
            user.creation_lines(&desired),
            Some(vec![
                "username ops password secret role netadmin priv-lvl 15".to_string(),
                "username ops sshkey \"ssh-rsa AAAA\"".to_string(),
            ])
        );
    }

    #[test]
    fn test_ssh_key_validation() {
        assert!(v_ssh_key(&AttrValue::scalar("ssh-rsa AAAA")).is_ok());
        assert!(v_ssh_key(&AttrValue::scalar("ecdsa-sha2 AAAA")).is_err());
    }
}
