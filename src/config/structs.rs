use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// DNS domain appended to the primary hostname in the hosts file
    #[serde(default = "default_domain")]
    pub domain: String,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub servers: ServersConfig,
    #[serde(default)]
    pub interfaces: InterfacesConfig,
}

fn default_domain() -> String {
    "example.com".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            domain: default_domain(),
            paths: PathsConfig::default(),
            servers: ServersConfig::default(),
            interfaces: InterfacesConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub hosts: PathBuf,
    /// Holds the `HOSTNAME=` line on RHEL-style systems
    pub network: PathBuf,
    /// Plain hostname file (`/etc/hostname`), rewritten only when set
    pub hostname_file: Option<PathBuf>,
    /// Directory containing `ifcfg-<interface>` files
    pub ifcfg_dir: PathBuf,
    pub persistent_rules: PathBuf,
    pub ntp_conf: PathBuf,
    pub resolv_conf: PathBuf,
    pub ssh_dir: PathBuf,
    pub os_release: PathBuf,
    /// Values entered on the last run, used as prompt defaults
    pub saved_config: PathBuf,
    /// Dated copies of every file touched; `""` disables them
    pub backup_dir: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            hosts: PathBuf::from("/etc/hosts"),
            network: PathBuf::from("/etc/sysconfig/network"),
            hostname_file: None,
            ifcfg_dir: PathBuf::from("/etc/sysconfig/network-scripts"),
            persistent_rules: PathBuf::from("/etc/udev/rules.d/70-persistent-net.rules"),
            ntp_conf: PathBuf::from("/etc/ntp.conf"),
            resolv_conf: PathBuf::from("/etc/resolv.conf"),
            ssh_dir: PathBuf::from("/etc/ssh"),
            os_release: PathBuf::from("/etc/os-release"),
            saved_config: PathBuf::from("/var/lib/vmclone/vmconf.toml"),
            backup_dir: Some(PathBuf::from("/var/lib/vmclone/backup")),
        }
    }
}

impl PathsConfig {
    pub fn ifcfg(&self, interface: &str) -> PathBuf {
        self.ifcfg_dir.join(format!("ifcfg-{}", interface))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServersConfig {
    pub nameservers: Vec<String>,
    pub ntp_servers: Vec<String>,
}

impl Default for ServersConfig {
    fn default() -> Self {
        Self {
            nameservers: vec![
                "8.8.8.8".to_string(),
                "8.8.4.4".to_string(),
                "208.67.222.222".to_string(),
                "208.67.220.220".to_string(),
            ],
            ntp_servers: (0..4).map(|i| format!("{}.pool.ntp.org", i)).collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InterfacesConfig {
    /// Interface whose address carries the plain hostname in the hosts file
    pub primary: String,
    /// Fixed gateways; interfaces listed here skip the gateway prompt
    pub static_gateways: BTreeMap<String, String>,
    /// Hosts-file alias suffix per secondary interface (defaults to the name)
    pub host_suffixes: BTreeMap<String, String>,
}

impl Default for InterfacesConfig {
    fn default() -> Self {
        Self {
            primary: "eth0".to_string(),
            static_gateways: BTreeMap::new(),
            host_suffixes: BTreeMap::new(),
        }
    }
}

impl InterfacesConfig {
    pub fn host_suffix<'a>(&'a self, interface: &'a str) -> &'a str {
        self.host_suffixes
            .get(interface)
            .map(String::as_str)
            .unwrap_or(interface)
    }
}
