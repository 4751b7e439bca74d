//! IPv4 validation and default gateway calculation

use anyhow::{bail, Result};
use std::net::Ipv4Addr;

/// Regex fragment matching one dotted-quad address (for finding old entries
/// in text files)
pub const IPV4_PATTERN: &str =
    r"(?:(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\.){3}(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)";

/// Parse a dotted-quad address: four decimal components, each 0-255.
pub fn parse_ipv4(input: &str) -> Option<Ipv4Addr> {
    let mut octets = [0u8; 4];
    let mut parts = input.trim().split('.');

    for octet in octets.iter_mut() {
        let part = parts.next()?;
        if part.is_empty() || part.len() > 3 || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        *octet = part.parse::<u16>().ok().and_then(|v| u8::try_from(v).ok())?;
    }

    if parts.next().is_some() {
        return None;
    }
    Some(Ipv4Addr::from(octets))
}

pub fn is_valid_ipv4(input: &str) -> bool {
    parse_ipv4(input).is_some()
}

/// CIDR prefix length of a dotted-decimal netmask (set bits across all octets).
/// Non-contiguous masks are rejected.
pub fn prefix_len(netmask: Ipv4Addr) -> Result<u32> {
    let bits = u32::from(netmask);
    let prefix = bits.count_ones();
    if bits.leading_ones() != prefix {
        bail!("{} is not a contiguous netmask", netmask);
    }
    Ok(prefix)
}

/// First usable host in the network containing `ip`.
///
/// /31 and /32 leave no room for a separate gateway host and are rejected.
pub fn default_gateway(ip: Ipv4Addr, netmask: Ipv4Addr) -> Result<Ipv4Addr> {
    let prefix = prefix_len(netmask)?;
    if prefix > 30 {
        bail!("Netmask {} (/{}) leaves no room for a gateway", netmask, prefix);
    }

    let network = u32::from(ip) & u32::from(netmask);
    Ok(Ipv4Addr::from(network + 1))
}
