//! The reconciliation diff algorithm.
//!
//! Given a current-state snapshot and the declared desired values for one
//! resource instance, computes the ordered operation list that converges
//! the device. Only declared attributes participate (partial-update
//! semantics); attributes whose normalized values already match produce no
//! operation.

use std::collections::BTreeMap;

use os10_cfg_common::{CfgError, CfgResult};

use crate::attr::{normalize, AttrMap, AttrSpec, AttrValue, Collection};

/// Whether an operation configures or clears a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Configure the payload value.
    Set,
    /// Clear the payload value.
    Unset,
}

/// A single set/unset action on one attribute.
///
/// For set and keyed-map attributes the payload is one element or entry;
/// for ordered lists it is the full replacement list. `prior` carries the
/// normalized current value of the whole attribute for renderers that need
/// it (e.g. clearing a value whose removal command names the old value).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    /// Attribute name.
    pub attr: &'static str,
    /// Set or unset.
    pub action: Action,
    /// Operation payload.
    pub value: AttrValue,
    /// Normalized current value of the attribute.
    pub prior: AttrValue,
}

impl Operation {
    fn set(attr: &'static str, value: AttrValue, prior: AttrValue) -> Self {
        Operation {
            attr,
            action: Action::Set,
            value,
            prior,
        }
    }

    fn unset(attr: &'static str, value: AttrValue, prior: AttrValue) -> Self {
        Operation {
            attr,
            action: Action::Unset,
            value,
            prior,
        }
    }
}

/// Validates every declared desired value against its descriptor.
///
/// Unknown attribute names and failed constraints raise a validation error
/// before any operation is computed, so nothing is partially applied.
pub fn validate_attrs(specs: &[AttrSpec], desired: &AttrMap) -> CfgResult<()> {
    for (name, value) in desired {
        let spec = AttrSpec::find(specs, name)
            .ok_or_else(|| CfgError::validation(*name, "unknown attribute"))?;
        if let Some(validate) = spec.validate {
            validate(value).map_err(|message| CfgError::validation(*name, message))?;
        }
    }
    Ok(())
}

/// Computes the ordered operation list for one resource instance.
///
/// `current` is `None` when the instance does not exist yet: every declared
/// non-empty desired attribute becomes a set and no removals are computed.
/// Operations are ordered by descriptor-table position; within a set or
/// keyed-map attribute all unsets precede all sets so that identity
/// collisions (an entry re-added under the same key) never transit through
/// a duplicate state.
pub fn diff_attrs(
    specs: &[AttrSpec],
    current: Option<&AttrMap>,
    desired: &AttrMap,
) -> CfgResult<Vec<Operation>> {
    validate_attrs(specs, desired)?;

    let mut ops = Vec::new();
    for spec in specs {
        let Some(raw_desired) = desired.get(spec.name) else {
            continue;
        };
        let des = normalize(spec, raw_desired);
        let (cur, creating) = match current {
            Some(map) => (
                normalize(spec, map.get(spec.name).unwrap_or(&AttrValue::Absent)),
                false,
            ),
            None => (normalize(spec, &AttrValue::Absent), true),
        };

        if cur == des {
            continue;
        }

        match spec.collection {
            Collection::Scalar => {
                if des.is_empty() {
                    if !creating {
                        ops.push(Operation::unset(spec.name, des, cur));
                    }
                } else {
                    ops.push(Operation::set(spec.name, des, cur));
                }
            }
            Collection::OrderedList => {
                // Replaced wholesale; position matters, so no per-element diff.
                if des.is_empty() {
                    if !creating {
                        ops.push(Operation::unset(spec.name, des, cur));
                    }
                } else {
                    ops.push(Operation::set(spec.name, des, cur));
                }
            }
            Collection::UnorderedSet => {
                let cur_items = cur.as_list().unwrap_or(&[]).to_vec();
                let des_items = des.as_list().unwrap_or(&[]).to_vec();
                let (removals, additions) = multiset_diff(&cur_items, &des_items);
                for item in removals {
                    ops.push(Operation::unset(
                        spec.name,
                        AttrValue::scalar(item),
                        cur.clone(),
                    ));
                }
                for item in additions {
                    ops.push(Operation::set(
                        spec.name,
                        AttrValue::scalar(item),
                        cur.clone(),
                    ));
                }
            }
            Collection::KeyedMap => {
                let empty = BTreeMap::new();
                let cur_entries = cur.as_map().unwrap_or(&empty);
                let des_entries = des.as_map().unwrap_or(&empty);
                // An entry whose value changed is removed and re-added under
                // the same key; removals come first.
                for (k, v) in cur_entries {
                    if des_entries.get(k) != Some(v) {
                        ops.push(Operation::unset(
                            spec.name,
                            AttrValue::map([(k.clone(), v.clone())]),
                            cur.clone(),
                        ));
                    }
                }
                for (k, v) in des_entries {
                    if cur_entries.get(k) != Some(v) {
                        ops.push(Operation::set(
                            spec.name,
                            AttrValue::map([(k.clone(), v.clone())]),
                            cur.clone(),
                        ));
                    }
                }
            }
        }
    }
    Ok(ops)
}

/// Multiset difference: returns (current − desired, desired − current),
/// matching one occurrence at a time so duplicates stay significant.
fn multiset_diff(current: &[String], desired: &[String]) -> (Vec<String>, Vec<String>) {
    let mut additions: Vec<String> = desired.to_vec();
    let mut removals = Vec::new();
    for item in current {
        if let Some(pos) = additions.iter().position(|x| x == item) {
            additions.remove(pos);
        } else {
            removals.push(item.clone());
        }
    }
    (removals, additions)
}
