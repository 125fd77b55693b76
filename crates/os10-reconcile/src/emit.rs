//! Command-line emission.
//!
//! Translates reconciler operations into device command lines. The context
//! preamble renders first, in nesting order, exactly once per batch; each
//! operation then renders in reconciler order through its attribute's
//! emission rule. The emitter performs exactly the writes the reconciler
//! computed; it never re-derives semantics.

use crate::attr::{AttrMap, AttrSpec};
use crate::diff::{Action, Operation};

/// Template context available to renderers.
///
/// `vars` carries the resource's key substitutions (e.g. `{dest}`,
/// `{len}`); `current` and `desired` carry the instance snapshot for the
/// few renderers that need cross-attribute state.
pub struct RenderCtx<'a> {
    /// Resource template variables.
    pub vars: &'a [(&'static str, String)],
    /// Normalized current attribute snapshot (empty when creating).
    pub current: &'a AttrMap,
    /// Declared desired attribute values.
    pub desired: &'a AttrMap,
}

/// Custom rendering hook for attributes whose command grammar does not fit
/// a template.
pub type Renderer = fn(&RenderCtx<'_>, &Operation) -> Vec<String>;

/// How set and unset operations render for one attribute.
///
/// `{}` substitutes the operation payload, `{k}`/`{v}` the entry of a
/// keyed-map operation, and any other `{name}` a resource template
/// variable.
pub enum EmitRule {
    /// Scalar value: one set line, one literal unset line. Unset templates
    /// may reference `{}` to name the value being cleared.
    Scalar {
        /// Set template.
        set: &'static str,
        /// Unset template.
        unset: &'static str,
    },
    /// Boolean flag: `"true"` renders the on line, anything else the off
    /// line. Attributes whose device default is true still render their
    /// explicit negative form on unset.
    Flag {
        /// Rendered when the payload is true.
        on: &'static str,
        /// Rendered when the payload is false.
        off: &'static str,
    },
    /// Unordered-set element: one line per element operation.
    Element {
        /// Set template.
        set: &'static str,
        /// Unset template.
        unset: &'static str,
    },
    /// Keyed-map entry: one line per entry operation.
    Entry {
        /// Set template.
        set: &'static str,
        /// Unset template.
        unset: &'static str,
    },
    /// Ordered list joined by spaces into a single combined line.
    Joined {
        /// Set template.
        set: &'static str,
        /// Unset template.
        unset: &'static str,
    },
    /// Custom renderer.
    Custom(Renderer),
}

/// Substitutes template placeholders.
fn subst(template: &str, value: Option<&str>, ctx: &RenderCtx<'_>) -> String {
    let mut line = template.to_string();
    for (name, var) in ctx.vars {
        line = line.replace(&format!("{{{}}}", name), var);
    }
    if let Some(value) = value {
        line = line.replace("{}", value);
    }
    line
}

fn render_op(spec: &AttrSpec, op: &Operation, ctx: &RenderCtx<'_>) -> Vec<String> {
    match &spec.emit {
        EmitRule::Scalar { set, unset } => match op.action {
            Action::Set => vec![subst(set, op.value.as_scalar(), ctx)],
            Action::Unset => vec![subst(unset, op.prior.as_scalar(), ctx)],
        },
        EmitRule::Flag { on, off } => {
            let line = if op.value.as_scalar() == Some("true") {
                on
            } else {
                off
            };
            vec![subst(line, None, ctx)]
        }
        EmitRule::Element { set, unset } => {
            let template = match op.action {
                Action::Set => set,
                Action::Unset => unset,
            };
            vec![subst(template, op.value.as_scalar(), ctx)]
        }
        EmitRule::Entry { set, unset } => {
            let template = match op.action {
                Action::Set => set,
                Action::Unset => unset,
            };
            let Some(entries) = op.value.as_map() else {
                return Vec::new();
            };
            entries
                .iter()
                .map(|(k, v)| {
                    let line = template.replace("{k}", k).replace("{v}", v);
                    subst(&line, None, ctx)
                })
                .collect()
        }
        EmitRule::Joined { set, unset } => match op.action {
            Action::Set => {
                let joined = op.value.as_list().unwrap_or(&[]).join(" ");
                vec![subst(set, Some(&joined), ctx)]
            }
            Action::Unset => {
                let joined = op.prior.as_list().unwrap_or(&[]).join(" ");
                vec![subst(unset, Some(&joined), ctx)]
            }
        },
        EmitRule::Custom(renderer) => renderer(ctx, op),
    }
}

/// Renders a full command batch: context preamble, then one or more lines
/// per operation in order. An empty operation list renders nothing at all,
/// not even the preamble.
pub fn emit(
    specs: &[AttrSpec],
    context: &[String],
    ops: &[Operation],
    ctx: &RenderCtx<'_>,
) -> Vec<String> {
    if ops.is_empty() {
        return Vec::new();
    }
    let mut lines: Vec<String> = context.to_vec();
    for op in ops {
        let Some(spec) = AttrSpec::find(specs, op.attr) else {
            continue;
        };
        // Attributes that participate in comparison but have no command
        // line of their own render empty and are dropped.
        lines.extend(render_op(spec, op, ctx).into_iter().filter(|l| !l.is_empty()));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::{AttrValue, Coercion, Collection, DefaultPolicy};
    use crate::diff::diff_attrs;

    fn ctx<'a>(
        vars: &'a [(&'static str, String)],
        current: &'a AttrMap,
        desired: &'a AttrMap,
    ) -> RenderCtx<'a> {
        RenderCtx {
            vars,
            current,
            desired,
        }
    }

    fn specs() -> Vec<AttrSpec> {
        vec![
            AttrSpec {
                name: "router_id",
                collection: Collection::Scalar,
                default: DefaultPolicy::EmptyRemoves,
                coerce: Coercion::None,
                emit: EmitRule::Scalar {
                    set: "router-id {}",
                    unset: "no router-id",
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
                name: "timers",
                collection: Collection::OrderedList,
                default: DefaultPolicy::EmptyRemoves,
                coerce: Coercion::None,
                emit: EmitRule::Joined {
                    set: "timers {}",
                    unset: "no timers",
                },
                validate: None,
            },
        ]
    }

    #[test]
    fn test_no_ops_renders_nothing() {
        let specs = specs();
        let empty = AttrMap::new();
        let render = ctx(&[], &empty, &empty);
        let lines = emit(&specs, &["router bgp 65537".to_string()], &[], &render);
        assert!(lines.is_empty());
    }

    #[test]
    fn test_context_preamble_first_exactly_once() {
        let specs = specs();
        let empty = AttrMap::new();
        let desired: AttrMap = [
            ("router_id", AttrValue::scalar("1.1.1.1")),
            ("timers", AttrValue::list(["30", "90"])),
        ]
        .into_iter()
        .collect();
        let ops = diff_attrs(&specs, None, &desired).unwrap();
        let render = ctx(&[], &empty, &desired);
        let lines = emit(&specs, &["router bgp 65537".to_string()], &ops, &render);
        assert_eq!(
            lines,
            vec![
                "router bgp 65537".to_string(),
                "router-id 1.1.1.1".to_string(),
                "timers 30 90".to_string(),
            ]
        );
    }

    #[test]
    fn test_flag_renders_explicit_negative() {
        let specs = specs();
        let empty = AttrMap::new();
        let current: AttrMap = [("log_neighbor_changes", AttrValue::boolean(true))]
            .into_iter()
            .collect();
        let desired: AttrMap = [("log_neighbor_changes", AttrValue::boolean(false))]
            .into_iter()
            .collect();
        let ops = diff_attrs(&specs, Some(&current), &desired).unwrap();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].action, Action::Set);
        let render = ctx(&[], &empty, &desired);
        let lines = emit(&specs, &[], &ops, &render);
        assert_eq!(lines, vec!["no log-neighbor-changes".to_string()]);
    }

    #[test]
    fn test_template_vars() {
        let spec = AttrSpec {
            name: "next_hop_list",
            collection: Collection::UnorderedSet,
            default: DefaultPolicy::EmptyRemoves,
            coerce: Coercion::None,
            emit: EmitRule::Element {
                set: "{family} route {dest}/{len} {}",
                unset: "no {family} route {dest}/{len} {}",
            },
            validate: None,
        };
        let specs = [spec];
        let vars = [
            ("family", "ip".to_string()),
            ("dest", "10.20.212.0".to_string()),
            ("len", "24".to_string()),
        ];
        let empty = AttrMap::new();
        let current: AttrMap = [("next_hop_list", AttrValue::list(["127.0.0.2"]))]
            .into_iter()
            .collect();
        let desired: AttrMap = [("next_hop_list", AttrValue::list(["127.0.0.3"]))]
            .into_iter()
            .collect();
        let ops = diff_attrs(&specs, Some(&current), &desired).unwrap();
        let render = ctx(&vars, &empty, &desired);
        let lines = emit(&specs, &[], &ops, &render);
        assert_eq!(
            lines,
            vec![
                "no ip route 10.20.212.0/24 127.0.0.2".to_string(),
                "ip route 10.20.212.0/24 127.0.0.3".to_string(),
            ]
        );
    }
}
