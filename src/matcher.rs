//! IP and CIDR matching for allowlist entries.
//!
//! Pure functions, no I/O. `validate_format` gates what may be persisted;
//! `matches` decides membership on the read path and fails closed: malformed
//! input never matches and never errors.

use ipnet::{Ipv4Net, Ipv6Net};
use std::net::IpAddr;

/// Validate an allowlist entry: a bare IPv4/IPv6 address, or `address/prefix`
/// with a numeric prefix valid for the address family.
///
/// # Examples
/// ```
/// use allowgate::matcher::validate_format;
/// assert!(validate_format("192.168.1.1"));
/// assert!(validate_format("10.0.0.0/8"));
/// assert!(validate_format("2001:db8::/32"));
/// assert!(!validate_format("10.0.0.1/33"));
/// assert!(!validate_format("not-an-ip"));
/// ```
pub fn validate_format(input: &str) -> bool {
    if input.parse::<IpAddr>().is_ok() {
        return true;
    }

    let Some((addr, prefix)) = input.split_once('/') else {
        return false;
    };
    let Ok(addr) = addr.parse::<IpAddr>() else {
        return false;
    };
    let Ok(prefix) = prefix.parse::<u8>() else {
        return false;
    };

    let max = if addr.is_ipv6() { 128 } else { 32 };
    prefix <= max
}

/// Test whether `candidate` is covered by an allowlist `entry`.
///
/// An entry without a `/` requires exact string equality. An entry with a
/// prefix is compared under the family-appropriate network mask. A family
/// mismatch between candidate and subnet is never a match.
pub fn matches(candidate: &str, entry: &str) -> bool {
    let Some((subnet, prefix)) = entry.split_once('/') else {
        return candidate == entry;
    };

    let Ok(candidate) = candidate.parse::<IpAddr>() else {
        return false;
    };
    let Ok(subnet) = subnet.parse::<IpAddr>() else {
        return false;
    };
    let Ok(prefix) = prefix.parse::<u8>() else {
        return false;
    };

    match (candidate, subnet) {
        (IpAddr::V4(c), IpAddr::V4(s)) => Ipv4Net::new(s, prefix)
            .map(|net| net.contains(&c))
            .unwrap_or(false),
        (IpAddr::V6(c), IpAddr::V6(s)) => Ipv6Net::new(s, prefix)
            .map(|net| net.contains(&c))
            .unwrap_or(false),
        _ => false,
    }
}
