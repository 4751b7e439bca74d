//! Network service restart and delayed power actions

use anyhow::{bail, Context, Result};
use log::{info, warn};
use std::process::Command;

/// What to do once the machine has been un-identified
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerAction {
    Halt,
    Reboot,
}

impl PowerAction {
    fn shutdown_flag(self) -> &'static str {
        match self {
            PowerAction::Halt => "-h",
            PowerAction::Reboot => "-r",
        }
    }
}

pub trait SystemControl {
    fn restart_network(&self) -> Result<()>;
    /// Schedule `action` one minute from now
    fn schedule(&self, action: PowerAction) -> Result<()>;
}

/// Uses `service network restart` and `/sbin/shutdown`
pub struct ServiceControl;

impl SystemControl for ServiceControl {
    fn restart_network(&self) -> Result<()> {
        info!("Restarting the network service...");
        let output = Command::new("service")
            .args(["network", "restart"])
            .output()
            .context("Failed to execute service command")?;

        if !output.status.success() {
            bail!(
                "Network restart failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }

    fn schedule(&self, action: PowerAction) -> Result<()> {
        info!("Scheduling {:?} in one minute", action);
        let output = Command::new("/sbin/shutdown")
            .args([action.shutdown_flag(), "+1"])
            .output()
            .context("Failed to execute shutdown")?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.trim().is_empty() {
            info!("{}", stdout.trim());
        }
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!("shutdown reported: {}", stderr.trim());
            bail!("Failed to schedule {:?}", action);
        }
        Ok(())
    }
}
