//! Server configuration, loaded from an optional `simdex` config file
//! plus `SIMDEX_*` environment variables.

use crate::engine::{EngineConfig, DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_TOP_MATCHES};
use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    #[serde(default = "default_top_matches")]
    pub top_matches: usize,
    #[serde(default = "default_database_path")]
    pub database_path: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_upload_bytes() -> usize {
    DEFAULT_MAX_UPLOAD_BYTES
}

fn default_top_matches() -> usize {
    DEFAULT_TOP_MATCHES
}

fn default_database_path() -> String {
    "data/corpus.json".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            port: default_port(),
            timeout_secs: default_timeout_secs(),
            max_upload_bytes: default_max_upload_bytes(),
            top_matches: default_top_matches(),
            database_path: default_database_path(),
            log_level: default_log_level(),
        }
    }
}

impl ServerConfig {
    /// Layered load: `simdex.{toml,yaml,json}` in the working directory if
    /// present, then `SIMDEX_*` environment variables (`__` separates
    /// nested keys) on top.
    pub fn load() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::with_name("simdex").required(false))
            .add_source(config::Environment::with_prefix("SIMDEX").separator("__"))
            .build()?
            .try_deserialize()
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.bind_addr, self.port).parse()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            max_upload_bytes: self.max_upload_bytes,
            top_matches: self.top_matches,
        }
    }
}
