//! Values entered on the previous clone run
//!
//! Written right after collection (even if the operator then declines) so the
//! next run can offer them as defaults.

use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SavedConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(default)]
    pub interfaces: BTreeMap<String, SavedInterface>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedInterface {
    pub ip: String,
    pub netmask: String,
    pub gateway: String,
}

impl SavedConfig {
    /// Load the previous run's values. Absent or unreadable files yield `None`.
    pub fn load(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }

        let parsed = fs::read_to_string(path)
            .map_err(anyhow::Error::from)
            .and_then(|content| toml::from_str::<SavedConfig>(&content).map_err(Into::into));

        match parsed {
            Ok(saved) => {
                info!("Previous configuration detected in {}. Loading...", path.display());
                Some(saved)
            }
            Err(e) => {
                warn!("Ignoring unreadable saved configuration {}: {}", path.display(), e);
                None
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let mut content = String::from("# vmclone: last entered network identity\n");
        content.push_str(&toml::to_string_pretty(self)?);
        fs::write(path, content)
            .with_context(|| format!("Failed to write saved configuration {}", path.display()))?;

        info!("Saved configuration to {}", path.display());
        Ok(())
    }

    pub fn interface(&self, name: &str) -> Option<&SavedInterface> {
        self.interfaces.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("vmconf.toml");

        let mut saved = SavedConfig {
            hostname: Some("web02".to_string()),
            ..Default::default()
        };
        saved.interfaces.insert(
            "eth0".to_string(),
            SavedInterface {
                ip: "10.0.0.5".to_string(),
                netmask: "255.255.255.0".to_string(),
                gateway: "10.0.0.1".to_string(),
            },
        );
        saved.save(&path).unwrap();

        assert_eq!(SavedConfig::load(&path), Some(saved));
    }

    #[test]
    fn test_load_hand_written_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vmconf.toml");
        fs::write(
            &path,
            "[interfaces.eth0]\nip = \"10.0.0.5\"\nnetmask = \"255.255.255.0\"\ngateway = \"10.0.0.1\"\n",
        )
        .unwrap();

        let saved = SavedConfig::load(&path).unwrap();
        assert_eq!(saved.hostname, None);
        assert_eq!(saved.interface("eth0").unwrap().ip, "10.0.0.5");
        assert!(saved.interface("eth1").is_none());
    }

    #[test]
    fn test_missing_or_corrupt_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vmconf.toml");
        assert_eq!(SavedConfig::load(&path), None);

        fs::write(&path, "interfaces = 3").unwrap();
        assert_eq!(SavedConfig::load(&path), None);
    }
}
