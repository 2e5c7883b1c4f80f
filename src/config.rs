// src/config.rs

//! Manages server configuration: loading, resolving defaults, and validation.

use crate::core::persistence::IN_MEMORY;
use crate::core::persistence::ledger::StarterKit;
use crate::core::protocol::{HEADER_LEN, MAX_FRAME_LEN};
use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use tracing::warn;

/// Configuration for the Prometheus metrics exporter.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct MetricsConfig {
    /// If true, an HTTP server will be started to expose Prometheus metrics.
    #[serde(default)]
    pub enabled: bool,
    /// The port for the Prometheus metrics server.
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_metrics_port(),
        }
    }
}

fn default_metrics_port() -> u16 {
    8878
}

/// Where the relational store lives.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct DatabaseConfig {
    /// Path to the SQLite file, or `:memory:` for a throwaway database.
    #[serde(default = "default_database_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    "anchorage_data/anchorage.db".to_string()
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct StarterResource {
    pub id: u32,
    pub amount: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct StarterItem {
    pub id: u32,
    pub count: u32,
}

/// Controls what happens when an unknown account logs in.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CreatePlayerConfig {
    /// Create a commander on first login instead of answering with `user_id = 0`.
    #[serde(default)]
    pub auto_create: bool,
    #[serde(default = "default_starter_resources")]
    pub starter_resources: Vec<StarterResource>,
    #[serde(default = "default_starter_items")]
    pub starter_items: Vec<StarterItem>,
}

impl Default for CreatePlayerConfig {
    fn default() -> Self {
        Self {
            auto_create: false,
            starter_resources: default_starter_resources(),
            starter_items: default_starter_items(),
        }
    }
}

impl CreatePlayerConfig {
    pub fn starter_kit(&self) -> StarterKit {
        StarterKit {
            resources: self
                .starter_resources
                .iter()
                .map(|r| (r.id, r.amount))
                .collect(),
            items: self.starter_items.iter().map(|i| (i.id, i.count)).collect(),
        }
    }
}

fn default_starter_resources() -> Vec<StarterResource> {
    vec![
        StarterResource { id: 1, amount: 3000 }, // gold
        StarterResource { id: 2, amount: 500 },  // oil
        StarterResource { id: 4, amount: 0 },    // gems
    ]
}

fn default_starter_items() -> Vec<StarterItem> {
    vec![
        StarterItem { id: 20001, count: 1 },
        StarterItem { id: 15003, count: 10 },
    ]
}

/// A raw representation of the config file before validation.
#[derive(Deserialize)]
struct RawConfig {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default = "default_log_level")]
    log_level: String,
    #[serde(default = "default_max_clients")]
    max_clients: usize,
    #[serde(default = "default_max_frame_bytes")]
    max_frame_bytes: usize,
    #[serde(default = "default_close_flush_timeout_ms")]
    close_flush_timeout_ms: u64,
    #[serde(default)]
    maintenance: bool,
    #[serde(default)]
    restrict_to_private_networks: bool,
    #[serde(default = "default_server_ticket")]
    server_ticket: String,
    #[serde(default)]
    database: DatabaseConfig,
    #[serde(default)]
    create_player: CreatePlayerConfig,
    #[serde(default)]
    metrics: MetricsConfig,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    7000
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_max_clients() -> usize {
    10000
}
fn default_max_frame_bytes() -> usize {
    MAX_FRAME_LEN
}
fn default_close_flush_timeout_ms() -> u64 {
    500
}
fn default_server_ticket() -> String {
    "=*=*=*=ANCHORAGE=*=*=*=".to_string()
}

/// Represents the final, validated server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub max_clients: usize,
    /// Inbound frames larger than this are treated as framing errors.
    pub max_frame_bytes: usize,
    /// How long a closing connection may spend writing its disconnect notice.
    pub close_flush_timeout_ms: u64,
    /// Start with maintenance mode already on.
    pub maintenance: bool,
    /// Refuse peers outside loopback and private address ranges.
    pub restrict_to_private_networks: bool,
    pub server_ticket: String,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub create_player: CreatePlayerConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            max_clients: default_max_clients(),
            max_frame_bytes: default_max_frame_bytes(),
            close_flush_timeout_ms: default_close_flush_timeout_ms(),
            maintenance: false,
            restrict_to_private_networks: false,
            server_ticket: default_server_ticket(),
            database: DatabaseConfig::default(),
            create_player: CreatePlayerConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Config {
    /// Creates a new `Config` instance by reading and parsing a TOML file.
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file at '{path}'"))?;
        Self::from_toml_str(&contents).with_context(|| format!("Invalid config in '{path}'"))
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let raw_config: RawConfig =
            toml::from_str(contents).context("Failed to parse TOML configuration")?;

        let config = Config {
            host: raw_config.host,
            port: raw_config.port,
            log_level: raw_config.log_level,
            max_clients: raw_config.max_clients,
            max_frame_bytes: raw_config.max_frame_bytes,
            close_flush_timeout_ms: raw_config.close_flush_timeout_ms,
            maintenance: raw_config.maintenance,
            restrict_to_private_networks: raw_config.restrict_to_private_networks,
            server_ticket: raw_config.server_ticket,
            database: raw_config.database,
            create_player: raw_config.create_player,
            metrics: raw_config.metrics,
        };

        config.validate()?;
        Ok(config)
    }

    /// A configuration suited to tests: ephemeral port, in-memory store.
    pub fn for_tests() -> Self {
        Self {
            port: 0,
            database: DatabaseConfig {
                path: IN_MEMORY.to_string(),
            },
            ..Self::default()
        }
    }

    /// Validates the configuration to ensure logical consistency.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(anyhow!("host cannot be empty"));
        }
        if self.max_clients == 0 {
            return Err(anyhow!("max_clients cannot be 0"));
        }
        if self.max_frame_bytes < HEADER_LEN || self.max_frame_bytes > MAX_FRAME_LEN {
            return Err(anyhow!(
                "max_frame_bytes must be between {} and {}",
                HEADER_LEN,
                MAX_FRAME_LEN
            ));
        }
        if self.database.path.trim().is_empty() {
            return Err(anyhow!("database.path cannot be empty"));
        }
        if self.close_flush_timeout_ms == 0 {
            warn!("close_flush_timeout_ms is 0; disconnect notices will likely be dropped.");
        }

        let mut seen = std::collections::HashSet::new();
        for resource in &self.create_player.starter_resources {
            if !seen.insert(resource.id) {
                return Err(anyhow!(
                    "create_player.starter_resources lists resource {} twice",
                    resource.id
                ));
            }
        }

        if self.metrics.enabled {
            if self.metrics.port == 0 {
                return Err(anyhow!("metrics.port cannot be 0"));
            }
            if self.metrics.port == self.port {
                return Err(anyhow!(
                    "metrics.port cannot be the same as the main server port"
                ));
            }
        }
        Ok(())
    }
}
