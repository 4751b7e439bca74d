mod clone;
mod config;
mod error;
mod network;
mod system;
mod utils;

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::{error, info};
use std::path::{Path, PathBuf};

use crate::clone::prompt::StdinPrompter;
use crate::clone::{CloneOutcome, CloneSession};
use crate::config::loader::{load_settings, SETTINGS_PATH};
use crate::config::structs::Settings;
use crate::network::interfaces::{
    discover, ChainedMacQuery, EthtoolMacQuery, PersistentRulesMacQuery, NET_DEV_PATH,
};
use crate::network::probe::{check_all, CommandProbe};
use crate::system::backup::BackupStore;
use crate::system::ifcfg::RandomUuid;
use crate::system::patcher::ConfigPatcher;
use crate::system::service::ServiceControl;

#[derive(Parser)]
#[command(name = "vmclone")]
#[command(version)]
#[command(about = "Re-identify a cloned Linux virtual machine (hostname & networking)", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Settings file (paths, domain, candidate servers)
    #[arg(long, global = true, env = "VMCLONE_SETTINGS", default_value = SETTINGS_PATH)]
    settings: PathBuf,

    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show reachable name servers and NTP servers
    Check {
        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },
    /// Re-identify this server (write networking files)
    Clone,
}

fn main() {
    let cli = Cli::parse();
    utils::logger::init(cli.verbose);

    if let Err(e) = run(cli) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    utils::privilege::require_root()?;
    let settings = load_settings(&cli.settings)?;

    match cli.command {
        Commands::Check { json } => run_check(&settings, json),
        Commands::Clone => run_clone(&settings),
    }
}

fn run_check(settings: &Settings, json: bool) -> Result<()> {
    let report = check_all(
        &CommandProbe,
        &settings.servers.nameservers,
        &settings.servers.ntp_servers,
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("\nThe following name servers are reachable:");
    for ns in &report.nameservers {
        println!("  nameserver {}", ns);
    }
    println!("\nThe following NTP servers are reachable:");
    for ntp in &report.ntp_servers {
        println!("  server {}", ntp);
    }
    println!();
    Ok(())
}

fn run_clone(settings: &Settings) -> Result<()> {
    info!("=== vmclone v{} ===", env!("CARGO_PKG_VERSION"));

    let query = ChainedMacQuery::new(vec![
        Box::new(EthtoolMacQuery),
        Box::new(PersistentRulesMacQuery::new(&settings.paths.persistent_rules)),
    ]);
    let interfaces = discover(Path::new(NET_DEV_PATH), &query)?;

    let patcher = ConfigPatcher::new(settings.paths.backup_dir.as_deref().map(BackupStore::new));
    let mut prompter = StdinPrompter;

    let outcome = CloneSession::new(
        settings,
        interfaces,
        patcher,
        &mut prompter,
        &ServiceControl,
        &CommandProbe,
        &RandomUuid,
    )
    .run()?;

    match outcome {
        CloneOutcome::Declined => info!("No changes applied"),
        CloneOutcome::Applied { scrubbed: true } => {
            info!("=== Clone complete; server un-identified, shutdown scheduled ===")
        }
        CloneOutcome::Applied { scrubbed: false } => info!("=== Clone complete ==="),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Cli::try_parse_from(["vmclone"]).is_err());
        assert!(Cli::try_parse_from(["vmclone", "frobnicate"]).is_err());
    }

    #[test]
    fn test_parse_check() {
        let cli = Cli::try_parse_from(["vmclone", "check", "--json", "--settings", "/tmp/s.toml"]).unwrap();
        assert!(matches!(cli.command, Commands::Check { json: true }));
        assert_eq!(cli.settings, PathBuf::from("/tmp/s.toml"));
    }
}
