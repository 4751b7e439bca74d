//! Nameserver and NTP server lists in resolv.conf / ntp.conf

use anyhow::Result;
use log::{info, warn};
use regex::Regex;
use std::path::Path;

use crate::error::CloneError;
use crate::system::patcher::ConfigPatcher;

/// Replace every `nameserver` line with one line per reachable server.
/// Leaves the file alone when `servers` is empty.
pub fn write_nameservers(patcher: &ConfigPatcher, path: &Path, servers: &[String]) -> Result<()> {
    if servers.is_empty() {
        warn!("No configured nameserver is reachable; leaving {} unchanged", path.display());
        return Ok(());
    }

    patcher.rewrite(path, |content| {
        let mut lines: Vec<String> = content
            .lines()
            .filter(|line| !line.contains("nameserver"))
            .map(str::to_string)
            .collect();
        lines.extend(servers.iter().map(|ns| format!("nameserver {}", ns)));
        lines.join("\n") + "\n"
    })?;

    info!("Wrote {} nameserver(s) to {}", servers.len(), path.display());
    Ok(())
}

/// Replace the `server` directives of an ntp.conf with `servers`, placed where
/// the first directive used to be (or at the end if there was none).
/// Leaves the file alone when `servers` is empty.
pub fn write_ntp_servers(patcher: &ConfigPatcher, path: &Path, servers: &[String]) -> Result<()> {
    if !path.exists() {
        return Err(CloneError::MissingFile(path.to_path_buf()).into());
    }
    if servers.is_empty() {
        warn!("All NTP servers specified by settings are inaccessible; leaving {} unchanged", path.display());
        return Ok(());
    }

    let directive = Regex::new(r"^\s*server\s")?;
    patcher.rewrite(path, |content| {
        let mut insert_at = None;
        let mut lines: Vec<String> = Vec::new();
        for line in content.lines() {
            if directive.is_match(line) {
                insert_at.get_or_insert(lines.len());
            } else {
                lines.push(line.to_string());
            }
        }

        let new_lines = servers.iter().map(|s| format!("server {}", s));
        match insert_at {
            Some(pos) => {
                lines.splice(pos..pos, new_lines);
            }
            None => lines.extend(new_lines),
        }
        lines.join("\n") + "\n"
    })?;

    info!("Wrote {} NTP server(s) to {}", servers.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn servers(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_nameservers_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resolv.conf");
        fs::write(&path, "search example.com\nnameserver 10.0.0.2\nnameserver 10.0.0.3\noptions rotate\n").unwrap();

        write_nameservers(&ConfigPatcher::default(), &path, &servers(&["8.8.8.8", "208.67.222.222"])).unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "search example.com\noptions rotate\nnameserver 8.8.8.8\nnameserver 208.67.222.222\n"
        );
    }

    #[test]
    fn test_no_reachable_nameserver_keeps_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resolv.conf");
        fs::write(&path, "nameserver 10.0.0.2\n").unwrap();

        write_nameservers(&ConfigPatcher::default(), &path, &[]).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "nameserver 10.0.0.2\n");
    }

    #[test]
    fn test_ntp_servers_inserted_at_first_directive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ntp.conf");
        fs::write(
            &path,
            "driftfile /var/lib/ntp/drift\n# Use public servers\nserver 0.centos.pool.ntp.org iburst\nserver 1.centos.pool.ntp.org iburst\nincludefile /etc/ntp/crypto/pw\n",
        )
        .unwrap();

        write_ntp_servers(&ConfigPatcher::default(), &path, &servers(&["0.pool.ntp.org", "2.pool.ntp.org"])).unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "driftfile /var/lib/ntp/drift\n# Use public servers\nserver 0.pool.ntp.org\nserver 2.pool.ntp.org\nincludefile /etc/ntp/crypto/pw\n"
        );
    }

    #[test]
    fn test_ntp_servers_appended_without_directives() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ntp.conf");
        fs::write(&path, "driftfile /var/lib/ntp/drift\n").unwrap();

        write_ntp_servers(&ConfigPatcher::default(), &path, &servers(&["1.pool.ntp.org"])).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "driftfile /var/lib/ntp/drift\nserver 1.pool.ntp.org\n"
        );
    }

    #[test]
    fn test_ntp_conf_missing_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = write_ntp_servers(&ConfigPatcher::default(), &dir.path().join("ntp.conf"), &servers(&["x"]))
            .unwrap_err();
        assert!(matches!(err.downcast_ref::<CloneError>(), Some(CloneError::MissingFile(_))));
    }
}
