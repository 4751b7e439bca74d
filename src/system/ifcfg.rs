//! Helpers for RHEL-style `ifcfg-<interface>` files
//!
//! Values are `KEY=value` lines, optionally quoted. Each key is patched with a
//! whole-line pattern so a second pass finds the first pass's output.

use anyhow::Result;
use log::{info, warn};
use std::fs;
use std::path::Path;

use crate::network::interfaces::{normalize_mac, Interface};
use crate::system::patcher::ConfigPatcher;
use crate::system::service::SystemControl;

/// Pattern matching the whole `KEY=...` line
pub fn key_pattern(key: &str) -> String {
    format!(r"(?m)^[ \t]*{}=.*$", regex::escape(key))
}

pub fn key_line(key: &str, value: &str) -> String {
    format!("{}={}", key, value)
}

/// Value of `key` in ifcfg-style `content`, without surrounding quotes
pub fn read_value(content: &str, key: &str) -> Option<String> {
    content.lines().find_map(|line| {
        line.trim()
            .strip_prefix(key)
            .and_then(|rest| rest.strip_prefix('='))
            .map(|v| v.trim().trim_matches(|c: char| c == '"' || c == '\'').to_string())
    })
}

/// The `HWADDR` currently configured in `path`
pub fn current_mac(path: &Path) -> Result<Option<String>> {
    let content = fs::read_to_string(path)?;
    Ok(read_value(&content, "HWADDR"))
}

/// Source of fresh connection UUIDs
pub trait UuidSource {
    fn generate(&self) -> String;
}

pub struct RandomUuid;

impl UuidSource for RandomUuid {
    fn generate(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Make the ifcfg file agree with the interface's permanent MAC and force
/// it on at boot. Restarts networking if the MAC had to change.
/// Returns whether the MAC was repaired.
pub fn repair_mac(
    patcher: &ConfigPatcher,
    system: &dyn SystemControl,
    path: &Path,
    interface: &Interface,
) -> Result<bool> {
    if !path.exists() {
        warn!("No configuration file for {} at {}, skipping MAC check", interface.name, path.display());
        return Ok(false);
    }

    let configured = current_mac(path)?.and_then(|m| normalize_mac(&m));
    let repaired = configured.as_deref() != Some(interface.mac.as_str());
    if repaired {
        patcher.replace(path, &key_pattern("HWADDR"), &key_line("HWADDR", &interface.mac))?;
        info!(
            "MAC address for {} has been repaired ({} -> {})",
            interface.name,
            configured.as_deref().unwrap_or("none"),
            interface.mac
        );
    }

    patcher.replace(path, &key_pattern("ONBOOT"), &key_line("ONBOOT", "yes"))?;

    if repaired {
        system.restart_network()?;
    }
    Ok(repaired)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::service::tests::RecordingControl;

    const IFCFG: &str = "\
DEVICE=eth0
HWADDR=\"00:50:56:aa:bb:01\"
ONBOOT=no
BOOTPROTO=dhcp
";

    fn eth0(mac: &str) -> Interface {
        Interface { name: "eth0".to_string(), mac: mac.to_string() }
    }

    #[test]
    fn test_read_value() {
        assert_eq!(read_value(IFCFG, "HWADDR"), Some("00:50:56:aa:bb:01".to_string()));
        assert_eq!(read_value(IFCFG, "BOOTPROTO"), Some("dhcp".to_string()));
        assert_eq!(read_value(IFCFG, "BOOT"), None);
        assert_eq!(read_value(IFCFG, "UUID"), None);
    }

    #[test]
    fn test_key_pattern_matches_indented_and_quoted() {
        let re = regex::Regex::new(&key_pattern("HWADDR")).unwrap();
        assert!(re.is_match("  HWADDR=\"00:11:22:33:44:55\""));
        assert!(!re.is_match("#HWADDR=00:11:22:33:44:55"));
        assert!(!re.is_match("OLD_HWADDR=00:11:22:33:44:55"));
    }

    #[test]
    fn test_repair_rewrites_stale_mac() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ifcfg-eth0");
        fs::write(&path, IFCFG).unwrap();
        let control = RecordingControl::default();

        let repaired = repair_mac(&ConfigPatcher::default(), &control, &path, &eth0("00:50:56:AA:BB:99")).unwrap();

        assert!(repaired);
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("HWADDR=00:50:56:AA:BB:99\n"));
        assert!(content.contains("ONBOOT=yes\n"));
        assert_eq!(*control.restarts.borrow(), 1);
    }

    #[test]
    fn test_matching_mac_only_forces_onboot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ifcfg-eth0");
        fs::write(&path, IFCFG).unwrap();
        let control = RecordingControl::default();

        let repaired = repair_mac(&ConfigPatcher::default(), &control, &path, &eth0("00:50:56:AA:BB:01")).unwrap();

        assert!(!repaired);
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("HWADDR=\"00:50:56:aa:bb:01\""));
        assert!(content.contains("ONBOOT=yes\n"));
        assert_eq!(*control.restarts.borrow(), 0);
    }

    #[test]
    fn test_missing_file_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let control = RecordingControl::default();
        let repaired = repair_mac(
            &ConfigPatcher::default(),
            &control,
            &dir.path().join("ifcfg-eth0"),
            &eth0("00:50:56:AA:BB:01"),
        )
        .unwrap();
        assert!(!repaired);
    }

    #[test]
    fn test_random_uuid_shape() {
        let id = RandomUuid.generate();
        assert_eq!(id.len(), 36);
        assert_ne!(id, RandomUuid.generate());
    }
}
