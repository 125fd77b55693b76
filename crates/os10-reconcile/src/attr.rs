//! Attribute values, descriptors and normalization.
//!
//! Every managed attribute is described by a static [`AttrSpec`] entry in
//! its domain's descriptor table: how an absent value defaults, how raw
//! values coerce to canonical form, whether the attribute is a scalar, an
//! ordered list, an unordered set or a keyed map, how set/unset operations
//! render, and which constraint the desired value must satisfy. The
//! reconciler and emitter consume these tables; they carry no per-domain
//! code.

use std::collections::BTreeMap;

use crate::emit::EmitRule;

/// Normalized attribute map for one resource instance.
pub type AttrMap = BTreeMap<&'static str, AttrValue>;

/// A raw or canonical attribute value.
///
/// The device CLI deals in strings, so booleans and integers travel as
/// their canonical string forms (`"true"`, `"65538"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    /// The attribute is not configured / not declared.
    Absent,
    /// A single value.
    Scalar(String),
    /// An ordered sequence of values.
    List(Vec<String>),
    /// Key-value entries keyed by identity.
    Map(BTreeMap<String, String>),
}

impl AttrValue {
    /// Builds a scalar value.
    pub fn scalar(s: impl Into<String>) -> Self {
        AttrValue::Scalar(s.into())
    }

    /// Builds a scalar boolean value.
    pub fn boolean(b: bool) -> Self {
        AttrValue::Scalar(b.to_string())
    }

    /// Builds a list value.
    pub fn list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AttrValue::List(items.into_iter().map(Into::into).collect())
    }

    /// Builds a keyed-map value.
    pub fn map<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        AttrValue::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Returns true for [`AttrValue::Absent`].
    pub fn is_absent(&self) -> bool {
        matches!(self, AttrValue::Absent)
    }

    /// Returns true for absent values and explicit empty values.
    pub fn is_empty(&self) -> bool {
        match self {
            AttrValue::Absent => true,
            AttrValue::Scalar(s) => s.is_empty(),
            AttrValue::List(items) => items.is_empty(),
            AttrValue::Map(entries) => entries.is_empty(),
        }
    }

    /// Returns the scalar payload, if this is a scalar.
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            AttrValue::Scalar(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the list payload, if this is a list.
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            AttrValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the map payload, if this is a map.
    pub fn as_map(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            AttrValue::Map(entries) => Some(entries),
            _ => None,
        }
    }
}

/// Collection policy of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    /// Single value; replaced or removed wholesale.
    Scalar,
    /// Position-significant list; replaced wholesale, never reordered.
    OrderedList,
    /// Equality ignores order; reconciled element-by-element.
    UnorderedSet,
    /// Entries keyed by identity; reconciled entry-by-entry.
    KeyedMap,
}

/// What an absent value means for comparison.
///
/// The device is inconsistent here: string attributes treat an explicit
/// empty value as "remove" and absence as "not configured" (which compare
/// equal), while tri-state booleans substitute a per-attribute default for
/// absence. Each attribute declares its own convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultPolicy {
    /// Absent compares as the empty value; an explicit empty desired value
    /// unsets the attribute.
    EmptyRemoves,
    /// Absent compares as the given canonical value.
    Substitute(&'static str),
}

/// Type coercion applied when normalizing raw values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    /// Values pass through unchanged.
    None,
    /// Dotted autonomous-system notation: `"a.b"` encodes as `a*65536+b`.
    DottedAs,
}

/// Constraint checked against the raw desired value before any device
/// interaction.
pub type Validator = fn(&AttrValue) -> Result<(), String>;

/// Static descriptor for one attribute of a configuration domain.
pub struct AttrSpec {
    /// Attribute name as declared by callers.
    pub name: &'static str,
    /// Collection policy.
    pub collection: Collection,
    /// Default-if-absent policy.
    pub default: DefaultPolicy,
    /// Type coercion.
    pub coerce: Coercion,
    /// Command-emission rule.
    pub emit: EmitRule,
    /// Optional domain constraint.
    pub validate: Option<Validator>,
}

impl AttrSpec {
    /// Looks up a descriptor by attribute name.
    pub fn find<'a>(specs: &'a [AttrSpec], name: &str) -> Option<&'a AttrSpec> {
        specs.iter().find(|s| s.name == name)
    }
}

fn coerce_scalar(coerce: Coercion, value: &str) -> String {
    match coerce {
        Coercion::None => value.to_string(),
        Coercion::DottedAs => match value.split_once('.') {
            Some((hi, lo)) => match (hi.parse::<u64>(), lo.parse::<u64>()) {
                (Ok(hi), Ok(lo)) => (hi * 65536 + lo).to_string(),
                _ => value.to_string(),
            },
            None => value.to_string(),
        },
    }
}

/// Normalizes a raw value to its canonical comparison form.
///
/// Absence is resolved per the attribute's default policy (collections
/// normalize to the empty collection), coercion is applied to every
/// element, and unordered sets sort so equality ignores order. Two values
/// that normalize equal never produce an emitted command.
pub fn normalize(spec: &AttrSpec, value: &AttrValue) -> AttrValue {
    let resolved = match value {
        AttrValue::Absent => match spec.collection {
            Collection::Scalar => match spec.default {
                DefaultPolicy::EmptyRemoves => AttrValue::Scalar(String::new()),
                DefaultPolicy::Substitute(d) => AttrValue::Scalar(d.to_string()),
            },
            Collection::OrderedList | Collection::UnorderedSet => AttrValue::List(Vec::new()),
            Collection::KeyedMap => AttrValue::Map(BTreeMap::new()),
        },
        other => other.clone(),
    };

    match resolved {
        AttrValue::Scalar(s) => AttrValue::Scalar(coerce_scalar(spec.coerce, &s)),
        AttrValue::List(items) => {
            let mut items: Vec<String> = items
                .iter()
                .map(|s| coerce_scalar(spec.coerce, s))
                .collect();
            if spec.collection == Collection::UnorderedSet {
                items.sort();
            }
            AttrValue::List(items)
        }
        other => other,
    }
}

/// Applies the attribute's equivalence rule to two raw values.
pub fn equivalent(spec: &AttrSpec, a: &AttrValue, b: &AttrValue) -> bool {
    normalize(spec, a) == normalize(spec, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(collection: Collection, default: DefaultPolicy, coerce: Coercion) -> AttrSpec {
        AttrSpec {
            name: "test",
            collection,
            default,
            coerce,
            emit: EmitRule::Scalar {
                set: "test {}",
                unset: "no test",
            },
            validate: None,
        }
    }

    #[test]
    fn test_absent_scalar_defaults_to_empty() {
        let s = spec(Collection::Scalar, DefaultPolicy::EmptyRemoves, Coercion::None);
        assert_eq!(
            normalize(&s, &AttrValue::Absent),
            AttrValue::scalar("")
        );
        assert!(equivalent(&s, &AttrValue::Absent, &AttrValue::scalar("")));
    }

    #[test]
    fn test_absent_bool_substitutes_default() {
        let s = spec(
            Collection::Scalar,
            DefaultPolicy::Substitute("true"),
            Coercion::None,
        );
        // absent and explicit true are both in sync against true
        assert!(equivalent(&s, &AttrValue::Absent, &AttrValue::boolean(true)));
        assert!(!equivalent(&s, &AttrValue::Absent, &AttrValue::boolean(false)));
    }

    #[test]
    fn test_dotted_as_coercion() {
        let s = spec(Collection::Scalar, DefaultPolicy::EmptyRemoves, Coercion::DottedAs);
        assert_eq!(
            normalize(&s, &AttrValue::scalar("1.2")),
            AttrValue::scalar("65538")
        );
        assert_eq!(
            normalize(&s, &AttrValue::scalar("65537")),
            AttrValue::scalar("65537")
        );
        assert!(equivalent(
            &s,
            &AttrValue::scalar("1.1"),
            &AttrValue::scalar("65537")
        ));
    }

    #[test]
    fn test_unordered_set_ignores_order() {
        let s = spec(
            Collection::UnorderedSet,
            DefaultPolicy::EmptyRemoves,
            Coercion::None,
        );
        assert!(equivalent(
            &s,
            &AttrValue::list(["b", "a"]),
            &AttrValue::list(["a", "b"])
        ));
        // duplicates are significant
        assert!(!equivalent(
            &s,
            &AttrValue::list(["a", "a"]),
            &AttrValue::list(["a"])
        ));
    }

    #[test]
    fn test_ordered_list_is_positional() {
        let s = spec(
            Collection::OrderedList,
            DefaultPolicy::EmptyRemoves,
            Coercion::None,
        );
        assert!(!equivalent(
            &s,
            &AttrValue::list(["10", "20"]),
            &AttrValue::list(["20", "10"])
        ));
        assert!(equivalent(
            &s,
            &AttrValue::list(["10", "20"]),
            &AttrValue::list(["10", "20"])
        ));
    }

    #[test]
    fn test_absent_collection_is_empty() {
        let s = spec(
            Collection::UnorderedSet,
            DefaultPolicy::EmptyRemoves,
            Coercion::None,
        );
        assert!(equivalent(&s, &AttrValue::Absent, &AttrValue::list::<_, &str>([])));
    }
}
