//! Shared attribute validators.
//!
//! Validators run against the raw desired value before any device
//! interaction. Empty scalars always pass: an explicit empty value is the
//! remove request, not a candidate value.

use std::net::IpAddr;

use once_cell::sync::Lazy;
use regex::Regex;

use os10_reconcile::AttrValue;

/// AS numbers: plain 32-bit or dotted `a.b` notation.
static AS_NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+|\d+\.\d+)$").expect("Invalid regex pattern"));

/// Checks plain or dotted autonomous-system notation.
pub fn as_number(value: &AttrValue) -> Result<(), String> {
    for v in scalar_or_elements(value) {
        if !v.is_empty() && !AS_NUMBER_RE.is_match(v) {
            return Err(format!("unrecognized AS number {v}"));
        }
    }
    Ok(())
}

/// Checks an inclusive integer range.
pub fn int_range(value: &AttrValue, min: u64, max: u64) -> Result<(), String> {
    for v in scalar_or_elements(value) {
        if v.is_empty() {
            continue;
        }
        let n: u64 = v.parse().map_err(|_| format!("{v} is not a number"))?;
        if n < min || n > max {
            return Err(format!("{n} out of range {min}-{max}"));
        }
    }
    Ok(())
}

/// Checks an IP address (v4 or v6).
pub fn ip_address(value: &AttrValue) -> Result<(), String> {
    for v in scalar_or_elements(value) {
        if !v.is_empty() && v.parse::<IpAddr>().is_err() {
            return Err(format!("invalid IP address {v}"));
        }
    }
    Ok(())
}

/// Checks an `address/prefix-length` value.
pub fn ip_prefix(value: &AttrValue) -> Result<(), String> {
    for v in scalar_or_elements(value) {
        if v.is_empty() {
            continue;
        }
        let Some((addr, len)) = v.split_once('/') else {
            return Err(format!("invalid prefix {v}"));
        };
        if addr.parse::<IpAddr>().is_err() || len.parse::<u8>().is_err() {
            return Err(format!("invalid prefix {v}"));
        }
    }
    Ok(())
}

/// Checks a maximum scalar length.
pub fn max_len(value: &AttrValue, max: usize) -> Result<(), String> {
    for v in scalar_or_elements(value) {
        if v.len() > max {
            return Err(format!("value exceeds {max} characters"));
        }
    }
    Ok(())
}

/// Checks membership in a fixed keyword set.
pub fn one_of(value: &AttrValue, allowed: &[&str]) -> Result<(), String> {
    for v in scalar_or_elements(value) {
        if !v.is_empty() && !allowed.contains(&v) {
            return Err(format!("{} is not one of {}", v, allowed.join(", ")));
        }
    }
    Ok(())
}

fn scalar_or_elements(value: &AttrValue) -> Vec<&str> {
    match value {
        AttrValue::Scalar(s) => vec![s.as_str()],
        AttrValue::List(items) => items.iter().map(String::as_str).collect(),
        AttrValue::Map(_) | AttrValue::Absent => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_number() {
        assert!(as_number(&AttrValue::scalar("65537")).is_ok());
        assert!(as_number(&AttrValue::scalar("1.2")).is_ok());
        assert!(as_number(&AttrValue::scalar("")).is_ok());
        assert!(as_number(&AttrValue::scalar("x.y")).is_err());
        assert!(as_number(&AttrValue::list(["1", "bad"])).is_err());
    }

    #[test]
    fn test_int_range() {
        assert!(int_range(&AttrValue::scalar("64"), 1, 64).is_ok());
        assert!(int_range(&AttrValue::scalar("65"), 1, 64).is_err());
        assert!(int_range(&AttrValue::scalar(""), 1, 64).is_ok());
    }

    #[test]
    fn test_ip_address() {
        assert!(ip_address(&AttrValue::scalar("10.10.10.10")).is_ok());
        assert!(ip_address(&AttrValue::scalar("2001:db8::1")).is_ok());
        assert!(ip_address(&AttrValue::scalar("300.1.1.1")).is_err());
    }

    #[test]
    fn test_ip_prefix() {
        assert!(ip_prefix(&AttrValue::scalar("10.20.212.0/24")).is_ok());
        assert!(ip_prefix(&AttrValue::scalar("10.20.212.0")).is_err());
    }

    #[test]
    fn test_one_of() {
        assert!(one_of(&AttrValue::scalar("netadmin"), &["netadmin", "sysadmin"]).is_ok());
        assert!(one_of(&AttrValue::scalar("root"), &["netadmin", "sysadmin"]).is_err());
    }
}
