//! Command privilege-level configuration.
//!
//! Flat instance set with a composite key (mode, privilege level, command
//! with its permit parameters) and no mutable attributes: an entry either
//! exists or it does not.
//!
//! ```text
//! privilege exec priv-lvl 4 "show version"
//! ```

use serde_json::Value;

use os10_cfg_common::{show, CfgError, CfgResult};
use os10_reconcile::{AttrMap, AttrSpec, AttrValue, CurrentState, Resource};

use crate::validators;

/// One privilege entry, keyed by mode + level + command.
pub struct Privilege {
    mode: String,
    priv_level: u8,
    command: String,
    permit_param: String,
}

impl Privilege {
    /// Creates the resource for the given mode, privilege level and
    /// command words.
    pub fn new(
        mode: impl Into<String>,
        priv_level: u8,
        command: impl Into<String>,
        permit_param: impl Into<String>,
    ) -> CfgResult<Self> {
        let mode = mode.into();
        validators::one_of(
            &AttrValue::scalar(mode.clone()),
            &["exec", "configure", "interface", "route-map", "router", "line"],
        )
        .map_err(|message| CfgError::validation("mode", message))?;
        if priv_level > 15 {
            return Err(CfgError::validation(
                "priv_level",
                format!("privilege level {priv_level} out of range 0-15"),
            ));
        }
        Ok(Privilege {
            mode,
            priv_level,
            command: command.into(),
            permit_param: permit_param.into(),
        })
    }

    fn command_words(&self) -> String {
        if self.permit_param.is_empty() {
            self.command.clone()
        } else {
            format!("{} {}", self.command, self.permit_param)
        }
    }
}

/// One enumerated privilege entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivilegeInstance {
    /// CLI mode the entry applies to.
    pub mode: String,
    /// Privilege level.
    pub priv_level: String,
    /// Command words.
    pub command: String,
    /// Permit parameters, empty when none.
    pub permit_param: String,
}

/// Enumerates all configured privilege entries from one running-config
/// read.
pub fn instances(tree: &Value) -> CfgResult<Vec<PrivilegeInstance>> {
    let Some(privileges) =
        show::extract(tree, &["data", "privilege-level-config", "privilege"])
    else {
        return Ok(Vec::new());
    };
    Ok(show::as_list(privileges)
        .into_iter()
        .filter_map(|privilege| {
            Some(PrivilegeInstance {
                priv_level: show::extract_str(privilege, &["level"])?,
                mode: show::extract_str(privilege, &["mode", "mode-name"])?,
                command: show::extract_str(privilege, &["mode", "command"]).unwrap_or_default(),
                permit_param: show::extract_str(privilege, &["mode", "permit-param"])
                    .unwrap_or_default(),
            })
        })
        .collect())
}

static ATTRS: &[AttrSpec] = &[];

impl Resource for Privilege {
    fn domain(&self) -> &'static str {
        "privilege"
    }

    fn attr_specs(&self) -> &'static [AttrSpec] {
        ATTRS
    }

    fn show_query(&self) -> String {
        "show running-configuration privilege | display-json".to_string()
    }

    fn context(&self) -> Vec<String> {
        Vec::new()
    }

    fn removal(&self) -> Vec<String> {
        vec![format!(
            "no privilege {} priv-lvl {} \"{}\"",
            self.mode,
            self.priv_level,
            self.command_words()
        )]
    }

    fn creation_lines(&self, _desired: &AttrMap) -> Option<Vec<String>> {
        Some(vec![format!(
            "privilege {} priv-lvl {} \"{}\"",
            self.mode,
            self.priv_level,
            self.command_words()
        )])
    }

    fn read_state(&self, tree: &Value) -> CfgResult<CurrentState> {
        let exists = instances(tree)?.into_iter().any(|p| {
            p.mode == self.mode
                && p.priv_level == self.priv_level.to_string()
                && p.command == self.command
                && p.permit_param == self.permit_param
        });
        if exists {
            Ok(CurrentState::Found(Default::default()))
        } else {
            Ok(CurrentState::NotFound)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn running_config() -> Value {
        json!({
            "data": {
                "privilege-level-config": {
                    "privilege": [
                        {
                            "level": "4",
                            "mode": {
                                "mode-name": "exec",
                                "command": "show",
                                "permit-param": "version"
                            }
                        }
                    ]
                }
            }
        })
    }

    #[test]
    fn test_instances() {
        let privileges = instances(&running_config()).unwrap();
        assert_eq!(privileges.len(), 1);
        assert_eq!(privileges[0].mode, "exec");
        assert_eq!(privileges[0].priv_level, "4");
        assert_eq!(privileges[0].permit_param, "version");
    }

    #[test]
    fn test_read_state_found() {
        let privilege = Privilege::new("exec", 4, "show", "version").unwrap();
        assert!(matches!(
            privilege.read_state(&running_config()).unwrap(),
            CurrentState::Found(_)
        ));
    }

    #[test]
    fn test_read_state_not_found() {
        let privilege = Privilege::new("exec", 5, "show", "version").unwrap();
        assert_eq!(
            privilege.read_state(&running_config()).unwrap(),
            CurrentState::NotFound
        );
    }

    #[test]
    fn test_creation_and_removal_lines() {
        let privilege = Privilege::new("exec", 4, "show", "version").unwrap();
        assert_eq!(
            privilege.creation_lines(&Default::default()),
            Some(vec!["privilege exec priv-lvl 4 \"show version\"".to_string()])
        );
        assert_eq!(
            privilege.removal(),
            vec!["no privilege exec priv-lvl 4 \"show version\"".to_string()]
        );
    }

    #[test]
    fn test_invalid_mode_rejected() {
        assert!(Privilege::new("bogus", 4, "show", "").is_err());
        assert!(Privilege::new("exec", 16, "show", "").is_err());
    }
}
