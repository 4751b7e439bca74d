//! Patch-or-append editing of text configuration files
//!
//! Every identity value (IP, netmask, hostname, hosts entry, ...) is one
//! pattern/replacement pair applied through [`ConfigPatcher::replace`]: if the
//! pattern matches, all matches are substituted; otherwise the replacement is
//! appended as a new line. Each call reads the whole file and swaps in the new
//! content with a single rename, so a file is never left half written.

use anyhow::{Context, Result};
use log::{debug, info};
use regex::{NoExpand, Regex};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

use crate::system::backup::BackupStore;

/// Which branch of patch-or-append fired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    /// Pattern matched; this many occurrences were substituted
    Replaced(usize),
    /// No match; replacement appended as a trailing line
    Appended,
}

#[derive(Default)]
pub struct ConfigPatcher {
    backup: Option<BackupStore>,
}

impl ConfigPatcher {
    pub fn new(backup: Option<BackupStore>) -> Self {
        Self { backup }
    }

    /// Substitute every match of `pattern` in `path` with `replacement`
    /// (taken literally), or append `replacement` when nothing matches.
    pub fn replace(&self, path: &Path, pattern: &str, replacement: &str) -> Result<PatchOutcome> {
        let re = Regex::new(pattern).with_context(|| format!("Invalid pattern {}", pattern))?;
        let mut outcome = PatchOutcome::Appended;

        self.rewrite(path, |content| {
            let count = re.find_iter(content).count();
            if count > 0 {
                outcome = PatchOutcome::Replaced(count);
                re.replace_all(content, NoExpand(replacement)).into_owned()
            } else {
                let mut appended = content.to_string();
                if !appended.is_empty() && !appended.ends_with('\n') {
                    appended.push('\n');
                }
                appended.push_str(replacement);
                appended.push('\n');
                appended
            }
        })?;

        match outcome {
            PatchOutcome::Replaced(n) => {
                debug!("{}: replaced {} match(es) of {}", path.display(), n, pattern)
            }
            PatchOutcome::Appended => {
                debug!("{}: appended {}", path.display(), replacement.trim_end())
            }
        }
        Ok(outcome)
    }

    /// Apply `edit` to the full contents of `path`. The file is backed up
    /// first (when a store is configured) and only written if `edit` changed
    /// something. Returns whether the file was written.
    pub fn rewrite<F>(&self, path: &Path, edit: F) -> Result<bool>
    where
        F: FnOnce(&str) -> String,
    {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let updated = edit(&content);
        if updated == content {
            return Ok(false);
        }

        if let Some(store) = &self.backup {
            store.ensure(path)?;
        }
        write_atomic(path, &updated)?;
        info!("Updated {}", path.display());
        Ok(true)
    }
}

/// Replace `path` with `content` via a temp file in the same directory,
/// keeping the original permissions. Symlinks are written through: the link
/// stays and its target gets the new content.
fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let target = fs::canonicalize(path)
        .with_context(|| format!("Failed to resolve {}", path.display()))?;
    let dir = target.parent().unwrap_or(Path::new("/"));
    let permissions = fs::metadata(&target)
        .with_context(|| format!("Failed to stat {}", target.display()))?
        .permissions();

    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
    tmp.write_all(content.as_bytes())?;
    tmp.as_file().sync_all()?;
    fs::set_permissions(tmp.path(), permissions)?;
    tmp.persist(&target)
        .with_context(|| format!("Failed to replace {}", target.display()))?;
    Ok(())
}
