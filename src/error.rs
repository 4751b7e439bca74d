use std::path::PathBuf;
use thiserror::Error;

/// Failures that end the process. Everything else is handled where it occurs.
#[derive(Error, Debug)]
pub enum CloneError {
    #[error("Unable to load settings from {path}: {reason}")]
    Settings { path: PathBuf, reason: String },

    #[error("Only root can run this tool")]
    NotRoot,

    #[error("Required file {0} does not exist")]
    MissingFile(PathBuf),

    /// Files rewritten before the failure are left as they are.
    #[error("Failed while writing the new configuration")]
    Commit(#[source] anyhow::Error),
}

impl CloneError {
    pub fn settings(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Settings {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_chain_printed_once() {
        let inner = anyhow::anyhow!("inner").context("Failed to read /x");
        let err = anyhow::Error::from(CloneError::Commit(inner));
        assert_eq!(
            format!("{:#}", err),
            "Failed while writing the new configuration: Failed to read /x: inner"
        );
    }
}
