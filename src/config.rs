use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::models::PortId;

/// Lowest sampling interval the poller accepts, in seconds.
pub const MIN_SAMPLING_INTERVAL: f64 = 1.0;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    /// Explicit row index -> name map; absent means "discover from the device".
    #[serde(default)]
    pub ports: Option<PortsSetting>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeviceConfig {
    #[serde(default = "default_address")]
    pub address: String,
    #[serde(default = "default_snmp_port")]
    pub port: u16,
    #[serde(default = "default_community")]
    pub community: String,
    /// Rows requested per bulk round trip.
    #[serde(default = "default_max_repetitions")]
    pub max_repetitions: u32,
    /// Per-request wait before a retry (`snmpbulkwalk -t`).
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Retries per request (`snmpbulkwalk -r`).
    #[serde(default = "default_retries")]
    pub retries: u32,
    /// Upper bound on one counter fetch; 0 disables the bound.
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,
}

impl DeviceConfig {
    pub fn fetch_timeout(&self) -> Option<Duration> {
        (self.fetch_timeout_ms > 0).then(|| Duration::from_millis(self.fetch_timeout_ms))
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            port: default_snmp_port(),
            community: default_community(),
            max_repetitions: default_max_repetitions(),
            request_timeout_ms: default_request_timeout_ms(),
            retries: default_retries(),
            fetch_timeout_ms: default_fetch_timeout_ms(),
        }
    }
}

fn default_address() -> String {
    "devswitch5920".into()
}

fn default_snmp_port() -> u16 {
    161
}

fn default_community() -> String {
    "public".into()
}

fn default_max_repetitions() -> u32 {
    30
}

fn default_request_timeout_ms() -> u64 {
    1000
}

fn default_retries() -> u32 {
    1
}

fn default_fetch_timeout_ms() -> u64 {
    5000
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollingConfig {
    /// Counter columns, inbound first then outbound.
    #[serde(default = "default_oids")]
    pub oids: OidsSetting,
    #[serde(default = "default_index_oid")]
    pub index_oid: String,
    #[serde(default = "default_name_oid")]
    pub name_oid: String,
    /// Seconds between cycle starts; clamped to MIN_SAMPLING_INTERVAL.
    #[serde(default = "default_sampling_interval")]
    pub sampling_interval: f64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            oids: default_oids(),
            index_oid: default_index_oid(),
            name_oid: default_name_oid(),
            sampling_interval: default_sampling_interval(),
        }
    }
}

fn default_oids() -> OidsSetting {
    OidsSetting::List(vec!["ifInUcastPkts".into(), "ifOutUcastPkts".into()])
}

fn default_index_oid() -> String {
    "ifIndex".into()
}

fn default_name_oid() -> String {
    "ifName".into()
}

fn default_sampling_interval() -> f64 {
    1.0
}

/// `oids = ["a", "b"]` or the legacy `oids = "a, b"`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OidsSetting {
    List(Vec<String>),
    Csv(String),
}

/// `[ports]` table (`"6" = "node_1"`) or the legacy `ports = "6:node_1, 7:node_2"`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PortsSetting {
    Table(BTreeMap<String, String>),
    List(String),
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Counter column names, trimmed, in configured order.
    pub fn oids(&self) -> Vec<String> {
        match &self.polling.oids {
            OidsSetting::List(v) => v.iter().map(|s| s.trim().to_string()).collect(),
            OidsSetting::Csv(s) => parse_oid_list(s),
        }
    }

    pub fn explicit_ports(&self) -> anyhow::Result<Option<BTreeMap<PortId, String>>> {
        match &self.ports {
            None => Ok(None),
            Some(PortsSetting::List(s)) => parse_port_list(s).map(Some),
            Some(PortsSetting::Table(t)) => t
                .iter()
                .map(|(k, v)| {
                    let id = k.trim().parse::<PortId>().map_err(|e| {
                        anyhow::anyhow!("ports: key {:?} is not a row index: {}", k, e)
                    })?;
                    Ok((id, v.trim().to_string()))
                })
                .collect::<anyhow::Result<_>>()
                .map(Some),
        }
    }

    /// Configured interval with the floor applied.
    pub fn sampling_interval(&self) -> f64 {
        let configured = self.polling.sampling_interval;
        if configured < MIN_SAMPLING_INTERVAL {
            tracing::warn!(
                configured,
                floor = MIN_SAMPLING_INTERVAL,
                "polling.sampling_interval below floor; clamping"
            );
        }
        configured.max(MIN_SAMPLING_INTERVAL)
    }

    pub fn fetch_timeout(&self) -> Option<Duration> {
        self.device.fetch_timeout()
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(
            !self.device.address.trim().is_empty(),
            "device.address must be non-empty"
        );
        anyhow::ensure!(
            self.device.port > 0,
            "device.port must be between 1 and 65535, got {}",
            self.device.port
        );
        anyhow::ensure!(
            self.device.max_repetitions > 0,
            "device.max_repetitions must be > 0, got {}",
            self.device.max_repetitions
        );
        anyhow::ensure!(
            self.device.request_timeout_ms > 0,
            "device.request_timeout_ms must be > 0, got {}",
            self.device.request_timeout_ms
        );
        let oids = self.oids();
        anyhow::ensure!(
            oids.len() == 2 && oids.iter().all(|o| !o.is_empty()),
            "polling.oids must name exactly two columns (inbound, outbound), got {:?}",
            oids
        );
        anyhow::ensure!(
            !self.polling.index_oid.trim().is_empty(),
            "polling.index_oid must be non-empty"
        );
        anyhow::ensure!(
            !self.polling.name_oid.trim().is_empty(),
            "polling.name_oid must be non-empty"
        );
        anyhow::ensure!(
            self.polling.sampling_interval.is_finite(),
            "polling.sampling_interval must be a finite number, got {}",
            self.polling.sampling_interval
        );
        self.explicit_ports()?;
        Ok(())
    }
}

/// Parses `"1:detector, 6:node_1"` into a port map.
pub fn parse_port_list(s: &str) -> anyhow::Result<BTreeMap<PortId, String>> {
    s.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (id, name) = entry
                .split_once(':')
                .ok_or_else(|| anyhow::anyhow!("ports: entry {:?} is not index:name", entry))?;
            let id = id
                .trim()
                .parse::<PortId>()
                .map_err(|e| anyhow::anyhow!("ports: {:?} is not a row index: {}", id, e))?;
            Ok((id, name.trim().to_string()))
        })
        .collect()
}

/// Parses `"ifInUcastPkts, ifOutUcastPkts"` into column names.
pub fn parse_oid_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(String::from)
        .collect()
}
