//! Process configuration, loaded once from YAML.
//!
//! Shape and loading mechanism follow the teacher's `config` crate:
//! a `Settings` struct deserialized by the `config` crate from a YAML file,
//! exposed through a `once_cell::sync::Lazy` behind a `settings()` function.

use std::{collections::HashMap, time::Duration};

use models::Role;
use serde::Deserialize;
use tracing_subscriber::filter::LevelFilter;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub web: WebConfig,
    pub database: DatabaseConfig,
    pub switch_credential: SwitchCredentialConfig,
    pub directory: Option<DirectoryConfig>,
    pub roles: RoleMapConfig,
    pub session: SessionConfig,
    pub governor: GovernorConfig,
    pub host_load: HostLoadConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WebConfig {
    pub bind_addr: HostPortPair,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: HostPortPair,
    pub username: String,
    pub password: String,
    pub database_name: String,
}

/// Process-wide SSH credential used for every switch (§3 Credential).
#[derive(Debug, Deserialize, Clone)]
pub struct SwitchCredentialConfig {
    pub username: String,
    pub password: String,
    #[serde(default = "default_handshake_timeout_secs")]
    pub handshake_timeout_secs: u64,
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,
    #[serde(default = "default_session_timeout_secs")]
    pub session_timeout_secs: u64,
}

fn default_handshake_timeout_secs() -> u64 {
    15
}
fn default_command_timeout_secs() -> u64 {
    10
}
fn default_session_timeout_secs() -> u64 {
    60
}

impl SwitchCredentialConfig {
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_secs)
    }
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_secs)
    }
}

/// REST directory bind endpoint (§4.7 Principal resolution).
#[derive(Debug, Deserialize, Clone)]
pub struct DirectoryConfig {
    pub url: String,
    pub base_dn: String,
    pub bind_username: String,
    pub bind_password: String,
}

/// Directory group -> role dictionary (§4.7). Highest matching role wins.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct RoleMapConfig {
    pub local_users: HashMap<String, LocalUser>,
    pub directory_groups: HashMap<String, Role>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LocalUser {
    /// Already-hashed secret; compared with a constant-time comparator.
    pub password_hash: String,
    pub role: Role,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    pub signing_key: String,
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
}

fn default_idle_timeout_secs() -> u64 {
    300
}

impl SessionConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

/// Concurrency Governor defaults (§4.2).
#[derive(Debug, Deserialize, Clone)]
pub struct GovernorConfig {
    #[serde(default = "default_per_switch")]
    pub per_switch_slots: usize,
    #[serde(default = "default_per_site")]
    pub per_site_slots: usize,
    #[serde(default = "default_global")]
    pub global_slots: usize,
    #[serde(default = "default_cps")]
    pub commands_per_second: u32,
    #[serde(default = "default_admission_deadline_secs")]
    pub admission_deadline_secs: u64,
}

fn default_per_switch() -> usize {
    8
}
fn default_per_site() -> usize {
    10
}
fn default_global() -> usize {
    64
}
fn default_cps() -> u32 {
    10
}
fn default_admission_deadline_secs() -> u64 {
    5
}

impl GovernorConfig {
    pub fn admission_deadline(&self) -> Duration {
        Duration::from_secs(self.admission_deadline_secs)
    }
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            per_switch_slots: default_per_switch(),
            per_site_slots: default_per_site(),
            global_slots: default_global(),
            commands_per_second: default_cps(),
            admission_deadline_secs: default_admission_deadline_secs(),
        }
    }
}

/// Host-Load Guard thresholds (§4.3).
#[derive(Debug, Deserialize, Clone)]
pub struct HostLoadConfig {
    #[serde(default = "default_sample_interval_secs")]
    pub sample_interval_secs: u64,
    #[serde(default = "default_ring_size")]
    pub ring_size: usize,
    #[serde(default = "default_yellow")]
    pub yellow_threshold_pct: f32,
    #[serde(default = "default_red")]
    pub red_threshold_pct: f32,
}

fn default_sample_interval_secs() -> u64 {
    5
}
fn default_ring_size() -> usize {
    12
}
fn default_yellow() -> f32 {
    40.0
}
fn default_red() -> f32 {
    80.0
}

impl HostLoadConfig {
    pub fn sample_interval(&self) -> Duration {
        Duration::from_secs(self.sample_interval_secs)
    }
}

impl Default for HostLoadConfig {
    fn default() -> Self {
        Self {
            sample_interval_secs: default_sample_interval_secs(),
            ring_size: default_ring_size(),
            yellow_threshold_pct: default_yellow(),
            red_threshold_pct: default_red(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub enum LoggingLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
    Off,
}

impl<'de> Deserialize<'de> for LoggingLevel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let v = String::deserialize(deserializer)?;
        Ok(match v.to_uppercase().as_str() {
            "ERROR" => Self::Error,
            "WARN" => Self::Warn,
            "INFO" => Self::Info,
            "DEBUG" => Self::Debug,
            "TRACE" => Self::Trace,
            "OFF" => Self::Off,
            other => {
                return Err(serde::de::Error::custom(format!(
                    "unrecognized log level {other}"
                )))
            }
        })
    }
}

impl From<LoggingLevel> for LevelFilter {
    fn from(value: LoggingLevel) -> Self {
        match value {
            LoggingLevel::Error => LevelFilter::ERROR,
            LoggingLevel::Warn => LevelFilter::WARN,
            LoggingLevel::Info => LevelFilter::INFO,
            LoggingLevel::Debug => LevelFilter::DEBUG,
            LoggingLevel::Trace => LevelFilter::TRACE,
            LoggingLevel::Off => LevelFilter::OFF,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct LoggingConfig {
    #[serde(default)]
    pub log_file: Option<String>,
    #[serde(default)]
    pub max_level: LoggingLevel,
}

#[derive(Debug, Clone)]
pub struct HostPortPair {
    pub host: String,
    pub port: u16,
}

impl<'de> Deserialize<'de> for HostPortPair {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let base = String::deserialize(deserializer)?;
        let (host, port) = base.split_once(':').ok_or_else(|| {
            serde::de::Error::custom(format!("failed to split {base} into host and port"))
        })?;
        let port = port
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("couldn't parse port from {port}")))?;
        Ok(HostPortPair {
            host: host.to_owned(),
            port,
        })
    }
}

impl std::fmt::Display for HostPortPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

static CONFIG_PATH_ENV: &str = "SWITCHYARD_CONFIG";

static CONFIG: once_cell::sync::Lazy<Settings> = once_cell::sync::Lazy::new(|| {
    let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| "config/settings.yaml".into());

    config::Config::builder()
        .add_source(config::File::with_name(&path))
        .add_source(config::Environment::with_prefix("SWITCHYARD").separator("__"))
        .build()
        .expect("couldn't load config file")
        .try_deserialize()
        .expect("couldn't load config file, invalid format")
});

pub fn settings() -> &'static Settings {
    &CONFIG
}
