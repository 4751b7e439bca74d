use super::structs::Settings;
use crate::error::CloneError;
use std::fs;
use std::path::Path;
use log::{debug, info};

pub const SETTINGS_PATH: &str = "/etc/vmclone/settings.toml";

/// Load settings from `path`. Unlike the saved configuration, the settings
/// file must exist.
pub fn load_settings(path: &Path) -> Result<Settings, CloneError> {
    if !path.exists() {
        return Err(CloneError::settings(
            path,
            "file not found (copy settings.example.toml into place)",
        ));
    }

    let content = fs::read_to_string(path)
        .map_err(|e| CloneError::settings(path, e.to_string()))?;
    let mut settings: Settings =
        toml::from_str(&content).map_err(|e| CloneError::settings(path, e.to_string()))?;

    // backup_dir = "" switches backups off
    if settings.paths.backup_dir.as_deref() == Some(Path::new("")) {
        settings.paths.backup_dir = None;
    }

    info!("Loaded settings from {}", path.display());
    debug!("Settings: {:?}", settings);
    Ok(settings)
}
