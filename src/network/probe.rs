//! Reachability checks for nameserver and NTP candidates
//!
//! Each candidate is tried once with the utility's own timeout; unreachable
//! candidates are skipped.

use log::{debug, info};
use serde::Serialize;
use std::process::{Command, Stdio};

use crate::network::gateway::is_valid_ipv4;

pub trait Reachability {
    /// Whether a DNS server answers on TCP/53
    fn nameserver(&self, address: &str) -> bool;
    /// Whether an NTP server answers a query
    fn ntp_server(&self, host: &str) -> bool;
}

/// Shells out to `nc -z` and `ntpdate -q`
pub struct CommandProbe;

impl CommandProbe {
    fn succeeds(program: &str, args: &[&str]) -> bool {
        match Command::new(program)
            .args(args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
        {
            Ok(status) => status.success(),
            Err(e) => {
                debug!("Could not run {}: {}", program, e);
                false
            }
        }
    }
}

fn nameserver_args(address: &str) -> [&str; 3] {
    ["-z", address, "53"]
}

fn ntp_args(host: &str) -> [&str; 3] {
    ["-q", "-u", host]
}

impl Reachability for CommandProbe {
    fn nameserver(&self, address: &str) -> bool {
        Self::succeeds("nc", &nameserver_args(address))
    }

    fn ntp_server(&self, host: &str) -> bool {
        Self::succeeds("ntpdate", &ntp_args(host))
    }
}

/// Reachable candidates from the configured lists
#[derive(Debug, Default, Serialize)]
pub struct ProbeReport {
    pub nameservers: Vec<String>,
    pub ntp_servers: Vec<String>,
}

/// Reachable nameservers, in candidate order. Candidates that are not IPv4
/// addresses are skipped without probing.
pub fn reachable_nameservers(probe: &dyn Reachability, candidates: &[String]) -> Vec<String> {
    info!("Checking for available name servers...");
    candidates
        .iter()
        .filter(|ns| {
            if !is_valid_ipv4(ns) {
                debug!("Skipping nameserver {}: not an IPv4 address", ns);
                return false;
            }
            let up = probe.nameserver(ns);
            if up {
                info!("nameserver {}", ns);
            } else {
                debug!("nameserver {} unreachable", ns);
            }
            up
        })
        .cloned()
        .collect()
}

/// Reachable NTP servers, in candidate order
pub fn reachable_ntp_servers(probe: &dyn Reachability, candidates: &[String]) -> Vec<String> {
    info!("Checking for available NTP servers...");
    candidates
        .iter()
        .filter(|host| {
            let up = probe.ntp_server(host);
            if up {
                info!("server {}", host);
            } else {
                debug!("NTP server {} unreachable", host);
            }
            up
        })
        .cloned()
        .collect()
}

pub fn check_all(
    probe: &dyn Reachability,
    nameservers: &[String],
    ntp_servers: &[String],
) -> ProbeReport {
    ProbeReport {
        nameservers: reachable_nameservers(probe, nameservers),
        ntp_servers: reachable_ntp_servers(probe, ntp_servers),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Answers from fixed lists and records what was probed
    pub(crate) struct FakeProbe {
        pub up: Vec<&'static str>,
        pub probed: RefCell<Vec<String>>,
    }

    impl FakeProbe {
        pub(crate) fn new(up: Vec<&'static str>) -> Self {
            Self { up, probed: RefCell::new(Vec::new()) }
        }

        fn answer(&self, target: &str) -> bool {
            self.probed.borrow_mut().push(target.to_string());
            self.up.iter().any(|up| *up == target)
        }
    }

    impl Reachability for FakeProbe {
        fn nameserver(&self, address: &str) -> bool {
            self.answer(address)
        }

        fn ntp_server(&self, host: &str) -> bool {
            self.answer(host)
        }
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_unreachable_and_invalid_skipped() {
        let probe = FakeProbe::new(vec!["8.8.8.8", "208.67.220.220"]);
        let found = reachable_nameservers(
            &probe,
            &strings(&["4.4.4.4", "8.8.8.8", "dns.example.com", "208.67.220.220"]),
        );

        assert_eq!(found, strings(&["8.8.8.8", "208.67.220.220"]));
        assert!(!probe.probed.borrow().contains(&"dns.example.com".to_string()));
    }

    #[test]
    fn test_probe_commands_use_default_timeouts() {
        assert_eq!(nameserver_args("8.8.8.8"), ["-z", "8.8.8.8", "53"]);
        assert_eq!(ntp_args("0.pool.ntp.org"), ["-q", "-u", "0.pool.ntp.org"]);
    }

    #[test]
    fn test_report_serializes() {
        let probe = FakeProbe::new(vec!["1.pool.ntp.org", "8.8.8.8"]);
        let report = check_all(
            &probe,
            &strings(&["8.8.8.8"]),
            &strings(&["0.pool.ntp.org", "1.pool.ntp.org"]),
        );
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "nameservers": ["8.8.8.8"],
                "ntp_servers": ["1.pool.ntp.org"],
            })
        );
    }
}
