//! Dated backups of configuration files
//!
//! Layout: `<root>/<YYYY-MM-DD>/<original path without leading />`.
//! At most one backup per file per day; the first one wins.

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use log::{debug, info};
use std::fs;
use std::path::{Component, Path, PathBuf};

pub struct BackupStore {
    root: PathBuf,
    date: NaiveDate,
}

impl BackupStore {
    pub fn new(root: &Path) -> Self {
        Self::for_date(root, Local::now().date_naive())
    }

    pub fn for_date(root: &Path, date: NaiveDate) -> Self {
        Self {
            root: root.to_path_buf(),
            date,
        }
    }

    /// Where today's copy of `file` lives
    pub fn backup_path(&self, file: &Path) -> PathBuf {
        let relative: PathBuf = file
            .components()
            .filter(|c| matches!(c, Component::Normal(_)))
            .collect();
        self.root
            .join(self.date.format("%Y-%m-%d").to_string())
            .join(relative)
    }

    /// Copy `file` into today's directory unless a copy is already there.
    /// Returns whether a copy was made.
    pub fn ensure(&self, file: &Path) -> Result<bool> {
        let dest = self.backup_path(file);
        if dest.exists() {
            debug!("Backup of {} already exists at {}", file.display(), dest.display());
            return Ok(false);
        }

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create backup directory {}", parent.display()))?;
        }
        fs::copy(file, &dest)
            .with_context(|| format!("Failed to back up {} to {}", file.display(), dest.display()))?;

        info!("Backed up {} to {}", file.display(), dest.display());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backup_once_per_day() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("etc").join("hosts");
        fs::create_dir_all(file.parent().unwrap()).unwrap();
        fs::write(&file, "original\n").unwrap();

        let date = NaiveDate::from_ymd_opt(2014, 1, 29).unwrap();
        let store = BackupStore::for_date(&dir.path().join("backup"), date);

        assert!(store.ensure(&file).unwrap());
        fs::write(&file, "modified\n").unwrap();
        assert!(!store.ensure(&file).unwrap());

        let dest = store.backup_path(&file);
        assert!(dest.starts_with(dir.path().join("backup").join("2014-01-29")));
        assert_eq!(fs::read_to_string(dest).unwrap(), "original\n");
    }

    #[test]
    fn test_backup_path_strips_root() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let store = BackupStore::for_date(Path::new("/var/lib/vmclone/backup"), date);
        assert_eq!(
            store.backup_path(Path::new("/etc/sysconfig/network")),
            PathBuf::from("/var/lib/vmclone/backup/2024-05-01/etc/sysconfig/network")
        );
    }

    #[test]
    fn test_missing_source_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = BackupStore::new(dir.path());
        assert!(store.ensure(&dir.path().join("absent")).is_err());
    }
}
