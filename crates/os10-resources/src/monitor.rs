//! Port-monitoring (mirror) session configuration.
//!
//! One session keyed by numeric id. A session is shut by default: the
//! running configuration records `no shut` when enabled and nothing when
//! shut. Changing the destination interface removes the old one first,
//! since a session accepts a single destination.

use serde_json::Value;

use os10_cfg_common::{show, CfgError, CfgResult};
use os10_reconcile::{
    Action, AttrMap, AttrSpec, AttrValue, Coercion, Collection, CurrentState, DefaultPolicy,
    EmitRule, Operation, RenderCtx, Resource,
};

/// One monitor session, keyed by id (1-18).
pub struct Monitor {
    id: u32,
}

impl Monitor {
    /// Creates the resource for the given session id.
    pub fn new(id: u32) -> CfgResult<Self> {
        if !(1..=18).contains(&id) {
            return Err(CfgError::validation(
                "id",
                format!("session id {id} out of range 1-18"),
            ));
        }
        Ok(Monitor { id })
    }
}

/// The session accepts one destination; an existing one is cleared before
/// the new one applies.
fn render_destination(_ctx: &RenderCtx<'_>, op: &Operation) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(prior) = op.prior.as_scalar() {
        if !prior.is_empty() {
            lines.push(format!("no destination interface {prior}"));
        }
    }
    if op.action == Action::Set {
        if let Some(dest) = op.value.as_scalar() {
            if !dest.is_empty() {
                lines.push(format!("destination interface {dest}"));
            }
        }
    }
    lines
}

static ATTRS: &[AttrSpec] = &[
    AttrSpec {
        name: "source",
        collection: Collection::UnorderedSet,
        default: DefaultPolicy::EmptyRemoves,
        coerce: Coercion::None,
        emit: EmitRule::Element {
            set: "source interface {}",
            unset: "no source interface {}",
        },
        validate: None,
    },
    AttrSpec {
        name: "destination",
        collection: Collection::Scalar,
        default: DefaultPolicy::EmptyRemoves,
        coerce: Coercion::None,
        emit: EmitRule::Custom(render_destination),
        validate: None,
    },
    AttrSpec {
        name: "flow_based",
        collection: Collection::Scalar,
        default: DefaultPolicy::Substitute("false"),
        coerce: Coercion::None,
        emit: EmitRule::Flag {
            on: "flow-based enable",
            off: "no flow-based enable",
        },
        validate: None,
    },
    AttrSpec {
        name: "shutdown",
        collection: Collection::Scalar,
        default: DefaultPolicy::Substitute("true"),
        coerce: Coercion::None,
        emit: EmitRule::Flag {
            on: "shut",
            off: "no shut",
        },
        validate: None,
    },
];

impl Resource for Monitor {
    fn domain(&self) -> &'static str {
        "monitor"
    }

    fn attr_specs(&self) -> &'static [AttrSpec] {
        ATTRS
    }

    fn show_query(&self) -> String {
        "show running-configuration monitor | display-json".to_string()
    }

    fn context(&self) -> Vec<String> {
        vec![format!("monitor session {}", self.id)]
    }

    fn removal(&self) -> Vec<String> {
        vec![format!("no monitor session {}", self.id)]
    }

    fn read_state(&self, tree: &Value) -> CfgResult<CurrentState> {
        let Some(sessions) = show::extract(tree, &["data", "sessions", "session"]) else {
            return Ok(CurrentState::NotFound);
        };
        let session = show::as_list(sessions).into_iter().find(|s| {
            show::extract_str(s, &["id"])
                .and_then(|id| id.parse::<u32>().ok())
                == Some(self.id)
        });
        let Some(session) = session else {
            return Ok(CurrentState::NotFound);
        };

        let mut attrs = AttrMap::new();

        if let Some(sources) = show::extract(session, &["source-intf"]) {
            let sources: Vec<String> = show::as_list(sources)
                .iter()
                .filter_map(|v| show::extract_str(v, &["name"]))
                .map(|name| space_interface_name(&name))
                .collect();
            attrs.insert("source", AttrValue::List(sources));
        } else {
            attrs.insert("source", AttrValue::list::<_, String>([]));
        }

        let destination = show::extract_str(session, &["destination-interface"])
            .map(|name| space_interface_name(&name))
            .unwrap_or_default();
        attrs.insert("destination", AttrValue::scalar(destination));

        attrs.insert(
            "flow_based",
            AttrValue::boolean(show::has_key(session, &[], "flow-enabled")),
        );

        // Enabled sessions record disable=false; shut sessions record
        // nothing.
        let shutdown = match show::extract_str(session, &["disable"]).as_deref() {
            Some("false") => "false",
            _ => "true",
        };
        attrs.insert("shutdown", AttrValue::scalar(shutdown));

        Ok(CurrentState::Found(attrs))
    }
}

/// Converts `ethernet1/1/1` as reported by the device to the spaced CLI
/// form `ethernet 1/1/1`.
fn space_interface_name(name: &str) -> String {
    match name.find(|c: char| !c.is_ascii_alphabetic()) {
        Some(pos) if pos > 0 => format!("{} {}", &name[..pos], &name[pos..]),
        _ => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use os10_reconcile::{diff::diff_attrs, emit::emit, RenderCtx};
    use serde_json::json;

    fn running_config() -> Value {
        json!({
            "data": {
                "sessions": {
                    "session": [
                        {
                            "id": "1",
                            "source-intf": [
                                {"name": "ethernet1/1/8"},
                                {"name": "ethernet1/1/9"}
                            ],
                            "destination-interface": "ethernet1/1/10",
                            "flow-enabled": [null],
                            "disable": "false"
                        }
                    ]
                }
            }
        })
    }

    #[test]
    fn test_read_state() {
        let monitor = Monitor::new(1).unwrap();
        let CurrentState::Found(attrs) = monitor.read_state(&running_config()).unwrap() else {
            panic!("expected Found");
        };
        assert_eq!(
            attrs.get("source"),
            Some(&AttrValue::list(["ethernet 1/1/8", "ethernet 1/1/9"]))
        );
        assert_eq!(
            attrs.get("destination"),
            Some(&AttrValue::scalar("ethernet 1/1/10"))
        );
        assert_eq!(attrs.get("flow_based"), Some(&AttrValue::boolean(true)));
        assert_eq!(attrs.get("shutdown"), Some(&AttrValue::scalar("false")));
    }

    #[test]
    fn test_missing_session_not_found() {
        let monitor = Monitor::new(2).unwrap();
        assert_eq!(
            monitor.read_state(&running_config()).unwrap(),
            CurrentState::NotFound
        );
    }

    #[test]
    fn test_id_range() {
        assert!(Monitor::new(0).is_err());
        assert!(Monitor::new(19).is_err());
        assert!(Monitor::new(18).is_ok());
    }

    #[test]
    fn test_destination_change_clears_old_first() {
        let monitor = Monitor::new(1).unwrap();
        let CurrentState::Found(current) = monitor.read_state(&running_config()).unwrap() else {
            panic!("expected Found");
        };
        let desired: AttrMap = [("destination", AttrValue::scalar("ethernet 1/1/2"))]
            .into_iter()
            .collect();
        let ops = diff_attrs(ATTRS, Some(&current), &desired).unwrap();
        let ctx = RenderCtx {
            vars: &[],
            current: &current,
            desired: &desired,
        };
        let lines = emit(ATTRS, &monitor.context(), &ops, &ctx);
        assert_eq!(
            lines,
            vec![
                "monitor session 1".to_string(),
                "no destination interface ethernet 1/1/10".to_string(),
                "destination interface ethernet 1/1/2".to_string(),
            ]
        );
    }

    #[test]
    fn test_creation_scenario() {
        // Scenario A: no existing session, five declared attributes, all
        // sets, context preamble exactly once.
        let monitor = Monitor::new(2).unwrap();
        let desired: AttrMap = [
            ("source", AttrValue::list(["ethernet 1/1/8", "ethernet 1/1/9"])),
            ("destination", AttrValue::scalar("ethernet 1/1/10")),
            ("flow_based", AttrValue::boolean(true)),
            ("shutdown", AttrValue::boolean(false)),
        ]
        .into_iter()
        .collect();
        let ops = diff_attrs(ATTRS, None, &desired).unwrap();
        assert_eq!(ops.len(), 5);
        assert!(ops.iter().all(|op| op.action == Action::Set));
        let empty = AttrMap::new();
        let ctx = RenderCtx {
            vars: &[],
            current: &empty,
            desired: &desired,
        };
        let lines = emit(ATTRS, &monitor.context(), &ops, &ctx);
        assert_eq!(
            lines,
            vec![
                "monitor session 2".to_string(),
                "source interface ethernet 1/1/8".to_string(),
                "source interface ethernet 1/1/9".to_string(),
                "destination interface ethernet 1/1/10".to_string(),
                "flow-based enable".to_string(),
                "no shut".to_string(),
            ]
        );
    }
}
