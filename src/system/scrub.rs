//! Removal of machine-identifying artifacts before a template is shut down
//!
//! Everything removed here is regenerated on the next boot: SSH host keys by
//! sshd, persistent-net rules by udev (on releases that still write them).

use anyhow::{Context, Result};
use log::{debug, info};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::structs::PathsConfig;
use crate::system::ifcfg::read_value;

/// Releases before this major version bind MACs through 70-persistent-net.rules
const FIRST_RELEASE_WITHOUT_PERSISTENT_RULES: u32 = 7;

/// Whether the OS still uses udev persistent-net rules. Releases old enough
/// to lack os-release are treated as legacy.
pub fn uses_persistent_rules(os_release: &Path) -> bool {
    match fs::read_to_string(os_release) {
        Ok(content) => match version_major(&content) {
            Some(major) => major < FIRST_RELEASE_WITHOUT_PERSISTENT_RULES,
            None => false,
        },
        Err(_) => true,
    }
}

fn version_major(os_release: &str) -> Option<u32> {
    os_release
        .lines()
        .find_map(|line| line.strip_prefix("VERSION_ID="))
        .map(|v| v.trim().trim_matches('"'))
        .and_then(|v| v.split('.').next())
        .and_then(|major| major.parse().ok())
}

/// Files the scrub would delete, in deletion order
pub fn scrub_targets(paths: &PathsConfig, interfaces: &BTreeSet<String>) -> Result<Vec<PathBuf>> {
    let mut targets = Vec::new();

    if uses_persistent_rules(&paths.os_release) && paths.persistent_rules.exists() {
        targets.push(paths.persistent_rules.clone());
    }

    targets.extend(matching_files(&paths.ssh_dir, |name| name.starts_with("ssh_host_"))?);
    targets.extend(stale_ifcfg_files(&paths.ifcfg_dir, interfaces)?);

    Ok(targets)
}

/// Base device of an ifcfg suffix: `eth0:1` and `eth0.100` both belong to `eth0`
fn base_device(device: &str) -> &str {
    device.split(|c: char| c == ':' || c == '.').next().unwrap_or(device)
}

/// Bonds, bridges and VLANs carry no burned-in MAC and never show up in discovery
fn is_logical(content: &str) -> bool {
    let kind = read_value(content, "TYPE").unwrap_or_default().to_ascii_lowercase();
    matches!(kind.as_str(), "bond" | "bridge" | "vlan")
        || read_value(content, "BONDING_OPTS").is_some()
        || read_value(content, "VLAN").is_some_and(|v| v.eq_ignore_ascii_case("yes"))
}

/// `ifcfg-*` files whose device no longer exists. A file is kept when its base
/// device was discovered, when it describes a logical device, or when it is
/// the bond/bridge (`MASTER=`/`BRIDGE=`) of another kept file.
fn stale_ifcfg_files(dir: &Path, interfaces: &BTreeSet<String>) -> Result<Vec<PathBuf>> {
    let files = matching_files(dir, |name| name.starts_with("ifcfg-"))?;

    let mut configs = Vec::new();
    for path in files {
        let device = path
            .file_name()
            .map(|n| n.to_string_lossy().trim_start_matches("ifcfg-").to_string())
            .unwrap_or_default();
        let content = fs::read_to_string(&path).unwrap_or_default();
        configs.push((path, device, content));
    }

    let mut kept: BTreeSet<String> = interfaces.clone();
    kept.insert("lo".to_string());
    for (_, device, content) in &configs {
        if is_logical(content) {
            kept.insert(device.clone());
        }
    }

    // Follow MASTER=/BRIDGE= references until nothing new is kept
    loop {
        let mut added = false;
        for (_, device, content) in &configs {
            if !kept.contains(device) && !kept.contains(base_device(device)) {
                continue;
            }
            for key in ["MASTER", "BRIDGE"] {
                if let Some(parent) = read_value(content, key).filter(|p| !p.is_empty()) {
                    added |= kept.insert(parent);
                }
            }
        }
        if !added {
            break;
        }
    }

    Ok(configs
        .into_iter()
        .filter(|(_, device, _)| !kept.contains(device) && !kept.contains(base_device(device)))
        .map(|(path, _, _)| path)
        .collect())
}

fn matching_files<F>(dir: &Path, keep: F) -> Result<Vec<PathBuf>>
where
    F: Fn(&str) -> bool,
{
    if !dir.exists() {
        debug!("{} does not exist, nothing to scrub there", dir.display());
        return Ok(Vec::new());
    }

    let mut found = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to list {}", dir.display()))? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if keep(&entry.file_name().to_string_lossy()) {
            found.push(entry.path());
        }
    }
    found.sort();
    Ok(found)
}

/// Delete every scrub target. Returns the deleted paths.
pub fn scrub(paths: &PathsConfig, interfaces: &BTreeSet<String>) -> Result<Vec<PathBuf>> {
    let targets = scrub_targets(paths, interfaces)?;
    for path in &targets {
        info!("deleting {}", path.display());
        fs::remove_file(path).with_context(|| format!("Failed to delete {}", path.display()))?;
    }
    Ok(targets)
}
