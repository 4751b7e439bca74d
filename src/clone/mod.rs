//! Clone orchestration
//!
//! Flow: collect -> save -> preview -> confirm -> MAC repair -> commit ->
//! nameserver/NTP refresh -> optional scrub and delayed halt/reboot.
//! Nothing outside the saved configuration is written before confirmation.
//!
//! There is no rollback: if a commit step fails, files already rewritten stay
//! rewritten and the error is returned to the caller.

pub mod prompt;

use anyhow::{bail, Context, Result};
use log::{info, warn};
use std::collections::BTreeSet;
use std::fs;
use std::net::Ipv4Addr;

use crate::config::saved::{SavedConfig, SavedInterface};
use crate::config::structs::Settings;
use crate::error::CloneError;
use crate::network::gateway::{default_gateway, parse_ipv4, IPV4_PATTERN};
use crate::network::interfaces::Interface;
use crate::network::probe::{reachable_nameservers, reachable_ntp_servers, Reachability};
use crate::system::ifcfg::{key_line, key_pattern, read_value, repair_mac, UuidSource};
use crate::system::patcher::ConfigPatcher;
use crate::system::resolver::{write_nameservers, write_ntp_servers};
use crate::system::scrub::scrub;
use crate::system::service::{PowerAction, SystemControl};

use prompt::{ask, ask_ipv4, confirm, Prompter};

/// New addressing for one interface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceIdentity {
    pub ip: Ipv4Addr,
    pub netmask: Ipv4Addr,
    pub gateway: Ipv4Addr,
}

/// Everything collected from the operator
#[derive(Debug, Clone)]
pub struct ClonePlan {
    pub old_hostname: String,
    pub hostname: String,
    pub interfaces: Vec<(Interface, InterfaceIdentity)>,
}

impl ClonePlan {
    pub fn to_saved(&self) -> SavedConfig {
        SavedConfig {
            hostname: Some(self.hostname.clone()),
            interfaces: self
                .interfaces
                .iter()
                .map(|(iface, id)| {
                    (
                        iface.name.clone(),
                        SavedInterface {
                            ip: id.ip.to_string(),
                            netmask: id.netmask.to_string(),
                            gateway: id.gateway.to_string(),
                        },
                    )
                })
                .collect(),
        }
    }

    /// Text shown to the operator before confirmation
    pub fn render(&self) -> String {
        let mut out = String::from("Proposed Network Configuration\n------------------------------\n\n");
        out.push_str(&format!("Host Name: {} (was {})\n", self.hostname, self.old_hostname));
        for (iface, id) in &self.interfaces {
            out.push_str(&format!(
                "\n{} ({})\n  IP: {}\n  NM: {}\n  GW: {}\n",
                iface.name, iface.mac, id.ip, id.netmask, id.gateway
            ));
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloneOutcome {
    /// Operator declined; nothing from the collected plan was written
    Declined,
    /// Configuration written; `scrubbed` if identity artifacts were removed
    Applied { scrubbed: bool },
}

/// One interactive clone run
pub struct CloneSession<'a> {
    settings: &'a Settings,
    interfaces: Vec<Interface>,
    patcher: ConfigPatcher,
    prompter: &'a mut dyn Prompter,
    system: &'a dyn SystemControl,
    probe: &'a dyn Reachability,
    uuids: &'a dyn UuidSource,
}

impl<'a> CloneSession<'a> {
    pub fn new(
        settings: &'a Settings,
        interfaces: Vec<Interface>,
        patcher: ConfigPatcher,
        prompter: &'a mut dyn Prompter,
        system: &'a dyn SystemControl,
        probe: &'a dyn Reachability,
        uuids: &'a dyn UuidSource,
    ) -> Self {
        Self {
            settings,
            interfaces,
            patcher,
            prompter,
            system,
            probe,
            uuids,
        }
    }

    pub fn run(&mut self) -> Result<CloneOutcome> {
        self.preflight()?;
        if self.interfaces.is_empty() {
            bail!("No physical network interfaces detected");
        }

        let saved = SavedConfig::load(&self.settings.paths.saved_config);
        let plan = self.collect(saved.as_ref())?;
        info!("Saving configuration for next time");
        plan.to_saved().save(&self.settings.paths.saved_config)?;

        self.prompter.show(&plan.render());
        if !confirm(self.prompter, "Would you like to apply the above configuration?")? {
            self.prompter.show(&format!(
                "\nOK.. No changes have been made to this system.\n\
                 The configuration you have entered is saved for next time ({})\n",
                self.settings.paths.saved_config.display()
            ));
            return Ok(CloneOutcome::Declined);
        }

        self.repair_macs()?;
        self.commit(&plan).map_err(CloneError::Commit)?;
        self.refresh_servers()?;

        let scrubbed = self.post_actions()?;
        Ok(CloneOutcome::Applied { scrubbed })
    }

    /// Files every run depends on
    fn preflight(&self) -> Result<()> {
        let paths = &self.settings.paths;
        for required in [&paths.hosts, &paths.network] {
            if !required.exists() {
                return Err(CloneError::MissingFile(required.clone()).into());
            }
        }
        Ok(())
    }

    pub fn repair_macs(&self) -> Result<()> {
        for iface in &self.interfaces {
            let path = self.settings.paths.ifcfg(&iface.name);
            repair_mac(&self.patcher, self.system, &path, iface)?;
        }
        Ok(())
    }

    /// Current hostname: `HOSTNAME=` in the network file, else the kernel's
    fn current_hostname(&self) -> Result<String> {
        let network = &self.settings.paths.network;
        let content = fs::read_to_string(network)
            .with_context(|| format!("Failed to read {}", network.display()))?;

        let name = read_value(&content, "HOSTNAME")
            .filter(|h| !h.is_empty())
            .or_else(|| {
                nix::unistd::gethostname()
                    .ok()
                    .map(|h| h.to_string_lossy().into_owned())
            })
            .context("Unable to determine the current hostname")?;
        Ok(name)
    }

    pub fn collect(&mut self, saved: Option<&SavedConfig>) -> Result<ClonePlan> {
        let old_hostname = self.current_hostname()?;

        let saved_host = saved.and_then(|s| s.hostname.as_deref());
        let hostname = loop {
            let answer = ask(self.prompter, "Enter NEW Server Name", saved_host)?;
            if answer.contains('.') {
                self.prompter.show(&format!(
                    "Enter the short name only; .{} is added where needed",
                    self.settings.domain
                ));
            } else if !answer.is_empty() && !answer.contains(char::is_whitespace) {
                break answer;
            }
        };

        let mut interfaces = Vec::new();
        for iface in self.interfaces.clone() {
            let previous = saved.and_then(|s| s.interface(&iface.name));
            let identity = self.collect_interface(&iface, previous)?;
            interfaces.push((iface, identity));
        }

        Ok(ClonePlan {
            old_hostname,
            hostname,
            interfaces,
        })
    }

    fn collect_interface(
        &mut self,
        iface: &Interface,
        previous: Option<&SavedInterface>,
    ) -> Result<InterfaceIdentity> {
        let ip = ask_ipv4(
            self.prompter,
            &format!("{} IP Address", iface.name),
            previous.map(|p| p.ip.as_str()),
        )?;

        let (netmask, computed) = loop {
            let netmask = ask_ipv4(
                self.prompter,
                &format!("{} Netmask", iface.name),
                previous.map(|p| p.netmask.as_str()),
            )?;
            match default_gateway(ip, netmask) {
                Ok(gateway) => break (netmask, gateway),
                Err(e) => self.prompter.show(&format!("Invalid netmask: {}", e)),
            }
        };

        if let Some(fixed) = self.settings.interfaces.static_gateways.get(&iface.name) {
            let gateway = parse_ipv4(fixed).ok_or_else(|| {
                CloneError::settings(
                    "settings",
                    format!("static gateway {} for {} is not an IPv4 address", fixed, iface.name),
                )
            })?;
            info!("Using static gateway {} for {}", gateway, iface.name);
            return Ok(InterfaceIdentity { ip, netmask, gateway });
        }

        // A previously entered gateway is only a sensible default for the same network
        let default = previous
            .filter(|p| p.ip == ip.to_string() && p.netmask == netmask.to_string())
            .map(|p| p.gateway.clone())
            .unwrap_or_else(|| computed.to_string());
        let gateway = ask_ipv4(
            self.prompter,
            &format!("{} Gateway IP", iface.name),
            Some(&default),
        )?;

        Ok(InterfaceIdentity { ip, netmask, gateway })
    }

    fn primary_interface<'p>(&self, plan: &'p ClonePlan) -> Option<&'p Interface> {
        let wanted = &self.settings.interfaces.primary;
        plan.interfaces
            .iter()
            .map(|(iface, _)| iface)
            .find(|iface| &iface.name == wanted)
            .or_else(|| plan.interfaces.first().map(|(iface, _)| iface))
    }

    /// Write the plan into the system files, then restart networking
    pub fn commit(&self, plan: &ClonePlan) -> Result<()> {
        let paths = &self.settings.paths;

        for (iface, id) in &plan.interfaces {
            let path = paths.ifcfg(&iface.name);
            if !path.exists() {
                return Err(CloneError::MissingFile(path).into());
            }
            info!("Writing {}", path.display());

            let uuid = self.uuids.generate();
            let values = [
                ("IPADDR", id.ip.to_string()),
                ("NETMASK", id.netmask.to_string()),
                ("GATEWAY", id.gateway.to_string()),
                ("HWADDR", iface.mac.clone()),
                ("BOOTPROTO", "none".to_string()),
                ("ONBOOT", "yes".to_string()),
                ("UUID", uuid),
            ];
            for (key, value) in &values {
                self.patcher.replace(&path, &key_pattern(key), &key_line(key, value))?;
            }
        }

        self.patcher.replace(
            &paths.network,
            &key_pattern("HOSTNAME"),
            &key_line("HOSTNAME", &plan.hostname),
        )?;

        if let Some(hostname_file) = &paths.hostname_file {
            if hostname_file.exists() {
                self.patcher
                    .rewrite(hostname_file, |_| format!("{}\n", plan.hostname))?;
            } else {
                warn!("{} does not exist, not writing it", hostname_file.display());
            }
        }

        self.write_hosts(plan)?;
        self.system.restart_network()
    }

    fn write_hosts(&self, plan: &ClonePlan) -> Result<()> {
        let hosts = &self.settings.paths.hosts;
        let domain = &self.settings.domain;
        let old = regex::escape(short_name(&plan.old_hostname));
        let primary = self.primary_interface(plan).map(|i| i.name.clone());

        for (iface, id) in &plan.interfaces {
            let (pattern, line) = if Some(&iface.name) == primary.as_ref() {
                (
                    format!(
                        r"(?m)^{}[ \t]+{old}[ \t]+{old}\.{}[ \t]*$",
                        IPV4_PATTERN,
                        regex::escape(domain),
                        old = old
                    ),
                    format!("{}\t\t{} {}.{}", id.ip, plan.hostname, plan.hostname, domain),
                )
            } else {
                let suffix = self.settings.interfaces.host_suffix(&iface.name);
                (
                    format!(
                        r"(?m)^{}[ \t]+{}-{}[ \t]*$",
                        IPV4_PATTERN,
                        old,
                        regex::escape(suffix)
                    ),
                    format!("{}\t\t{}-{}", id.ip, plan.hostname, suffix),
                )
            };
            self.patcher.replace(hosts, &pattern, &line)?;
        }
        Ok(())
    }

    /// Point resolv.conf and ntp.conf at whichever configured servers answer
    fn refresh_servers(&self) -> Result<()> {
        let servers = &self.settings.servers;
        let paths = &self.settings.paths;

        let nameservers = reachable_nameservers(self.probe, &servers.nameservers);
        write_nameservers(&self.patcher, &paths.resolv_conf, &nameservers)?;

        let ntp = reachable_ntp_servers(self.probe, &servers.ntp_servers);
        write_ntp_servers(&self.patcher, &paths.ntp_conf, &ntp)
    }

    /// Offer to un-identify the machine and schedule a halt or reboot
    fn post_actions(&mut self) -> Result<bool> {
        if !confirm(self.prompter, "Would you like to 'un-identify' the server and shutdown?")? {
            return Ok(false);
        }
        let action = if confirm(self.prompter, "Reboot instead of halting?")? {
            PowerAction::Reboot
        } else {
            PowerAction::Halt
        };

        let names: BTreeSet<String> = self.interfaces.iter().map(|i| i.name.clone()).collect();
        scrub(&self.settings.paths, &names)?;
        self.system.schedule(action)?;
        Ok(true)
    }
}

fn short_name(hostname: &str) -> &str {
    hostname.split('.').next().unwrap_or(hostname)
}
