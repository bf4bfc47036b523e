//! TOML daemon configuration, Raw/Validated split grounded on
//! `bins/vulcan-dhcpd`'s `RawConfig`/`Config` `TryFrom` pattern.

use std::{fs, net::Ipv4Addr, path::PathBuf};

use oonf_core::netaddr::{NetAddr, RouteKey};
use oonf_olsrv2::LocalLan;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("error reading config file: {0}")]
    Read(#[from] std::io::Error),
    #[error("error deserializing TOML: {0}")]
    Deserialize(#[from] toml::de::Error),
    #[error("interface list must not be empty")]
    NoInterfaces,
    #[error("invalid originator address: {0}")]
    InvalidOriginator(String),
    #[error("invalid attached network prefix: {0}")]
    InvalidAttachedNetwork(String),
}

/// One locally-originated prefix to announce as a [`LocalLan`] (spec.md
/// §4.9's `LocallyAttachedNetwork`), e.g. a LAN segment bridged to this
/// node but not itself running OLSRv2.
#[derive(Debug, Deserialize)]
pub struct RawAttachedNetwork {
    pub prefix: String,
    #[serde(default = "default_lan_metric")]
    pub metric: u32,
    #[serde(default)]
    pub distance: u8,
}

fn default_lan_metric() -> u32 {
    0
}

#[derive(Debug, Deserialize)]
pub struct RawConfig {
    pub originator: String,
    #[serde(default)]
    pub interfaces: Vec<String>,
    #[serde(default = "default_hello_interval_ms")]
    pub hello_interval_ms: u64,
    #[serde(default = "default_tc_interval_ms")]
    pub tc_interval_ms: u64,
    #[serde(default)]
    pub freeze_routes: bool,
    #[serde(default = "default_control_socket")]
    pub control_socket: PathBuf,
    #[serde(default)]
    pub attached_networks: Vec<RawAttachedNetwork>,
}

fn default_hello_interval_ms() -> u64 {
    2000
}

fn default_tc_interval_ms() -> u64 {
    5000
}

fn default_control_socket() -> PathBuf {
    PathBuf::from("/run/olsrv2d.sock")
}

#[derive(Debug)]
pub struct Config {
    pub originator: Ipv4Addr,
    pub interfaces: Vec<String>,
    pub hello_interval_ms: u64,
    pub tc_interval_ms: u64,
    pub freeze_routes: bool,
    pub control_socket: PathBuf,
    pub attached_networks: Vec<LocalLan>,
}

impl TryFrom<RawConfig> for Config {
    type Error = ConfigError;

    fn try_from(value: RawConfig) -> Result<Self, Self::Error> {
        if value.interfaces.is_empty() {
            return Err(ConfigError::NoInterfaces);
        }
        let originator = value
            .originator
            .parse()
            .map_err(|_| ConfigError::InvalidOriginator(value.originator.clone()))?;

        let attached_networks = value
            .attached_networks
            .iter()
            .map(|raw| {
                let network: ipnetwork::Ipv4Network =
                    raw.prefix.parse().map_err(|_| ConfigError::InvalidAttachedNetwork(raw.prefix.clone()))?;
                Ok(LocalLan::new(RouteKey::new(NetAddr::V4(network)), raw.metric, raw.distance))
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(Self {
            originator,
            interfaces: value.interfaces,
            hello_interval_ms: value.hello_interval_ms,
            tc_interval_ms: value.tc_interval_ms,
            freeze_routes: value.freeze_routes,
            control_socket: value.control_socket,
            attached_networks,
        })
    }
}

impl Config {
    pub fn from_file(path: PathBuf) -> Result<Self, ConfigError> {
        let body = fs::read_to_string(path)?;
        let raw: RawConfig = toml::from_str(&body)?;
        Self::try_from(raw)
    }
}
