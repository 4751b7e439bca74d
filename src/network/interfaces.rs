//! Physical interface discovery
//!
//! Device names come from /proc/net/dev; permanent (burned-in) MAC addresses
//! come from `ethtool -P`, falling back to the udev persistent-net rules on
//! releases that still record them there.

use anyhow::{Context, Result};
use log::{debug, info};
use procfs::net::InterfaceDeviceStatus;
use procfs::FromRead;
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

pub const NET_DEV_PATH: &str = "/proc/net/dev";
const LOOPBACK: &str = "lo";
const ZERO_MAC: &str = "00:00:00:00:00:00";

/// A physical interface and its hardware address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interface {
    pub name: String,
    /// Upper-case, colon separated
    pub mac: String,
}

/// Source of permanent hardware addresses
pub trait MacQuery {
    fn permanent_address(&self, device: &str) -> Option<String>;
}

/// Queries `ethtool -P <device>`
pub struct EthtoolMacQuery;

impl MacQuery for EthtoolMacQuery {
    fn permanent_address(&self, device: &str) -> Option<String> {
        let output = Command::new("ethtool").args(["-P", device]).output();
        match output {
            Ok(o) if o.status.success() => {
                parse_permanent_address(&String::from_utf8_lossy(&o.stdout))
            }
            Ok(o) => {
                debug!(
                    "ethtool -P {} failed: {}",
                    device,
                    String::from_utf8_lossy(&o.stderr).trim()
                );
                None
            }
            Err(e) => {
                debug!("Could not run ethtool for {}: {}", device, e);
                None
            }
        }
    }
}

/// Looks the device up in a udev persistent-net rules file
pub struct PersistentRulesMacQuery {
    rules: PathBuf,
}

impl PersistentRulesMacQuery {
    pub fn new(rules: &Path) -> Self {
        Self {
            rules: rules.to_path_buf(),
        }
    }
}

impl MacQuery for PersistentRulesMacQuery {
    fn permanent_address(&self, device: &str) -> Option<String> {
        let content = fs::read_to_string(&self.rules).ok()?;
        find_rule_mac(&content, device)
    }
}

/// Tries each source in order and keeps the first non-zero answer
pub struct ChainedMacQuery {
    sources: Vec<Box<dyn MacQuery>>,
}

impl ChainedMacQuery {
    pub fn new(sources: Vec<Box<dyn MacQuery>>) -> Self {
        Self { sources }
    }
}

impl MacQuery for ChainedMacQuery {
    fn permanent_address(&self, device: &str) -> Option<String> {
        self.sources
            .iter()
            .filter_map(|source| source.permanent_address(device))
            .find(|mac| normalize_mac(mac).as_deref().is_some_and(|m| m != ZERO_MAC))
    }
}

/// Extract the address from `ethtool -P` output ("Permanent address: aa:bb:...")
pub fn parse_permanent_address(output: &str) -> Option<String> {
    output
        .lines()
        .find_map(|line| line.trim().strip_prefix("Permanent address:"))
        .and_then(|mac| normalize_mac(mac.trim()))
}

/// Find `ATTR{address}=="..."` on the rule line naming `device`
pub fn find_rule_mac(rules: &str, device: &str) -> Option<String> {
    let address = Regex::new(r#"ATTR\{address\}=="([0-9A-Fa-f:]{17})""#).ok()?;
    let name = format!("NAME=\"{}\"", device);

    rules
        .lines()
        .filter(|line| !line.trim_start().starts_with('#') && line.contains(&name))
        .find_map(|line| address.captures(line))
        .and_then(|caps| normalize_mac(&caps[1]))
}

/// Upper-case a colon or dash separated MAC; `None` if malformed
pub fn normalize_mac(mac: &str) -> Option<String> {
    let parts: Vec<&str> = mac.trim().split(|c: char| c == ':' || c == '-').collect();
    if parts.len() != 6
        || !parts
            .iter()
            .all(|p| p.len() == 2 && p.chars().all(|c| c.is_ascii_hexdigit()))
    {
        return None;
    }
    Some(parts.join(":").to_ascii_uppercase())
}

/// Device names listed in a /proc/net/dev style status file
pub fn list_devices(net_dev: &Path) -> Result<Vec<String>> {
    let status = InterfaceDeviceStatus::from_file(net_dev)
        .with_context(|| format!("Failed to read {}", net_dev.display()))?;
    let mut names: Vec<String> = status.0.into_keys().collect();
    names.sort();
    Ok(names)
}

/// Discover physical interfaces: every device except loopback whose
/// permanent address is known and non-zero.
pub fn discover(net_dev: &Path, query: &dyn MacQuery) -> Result<Vec<Interface>> {
    let mut found = BTreeMap::new();

    for name in list_devices(net_dev)? {
        if name == LOOPBACK {
            continue;
        }

        match query.permanent_address(&name).and_then(|m| normalize_mac(&m)) {
            Some(mac) if mac != ZERO_MAC => {
                info!("Detected interface: {} (permanent MAC {})", name, mac);
                found.insert(name.clone(), mac);
            }
            Some(_) => debug!("Skipping {}: no burned-in address", name),
            None => debug!("Skipping {}: permanent address unavailable", name),
        }
    }

    Ok(found
        .into_iter()
        .map(|(name, mac)| Interface { name, mac })
        .collect())
}
