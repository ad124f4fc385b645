//! Settings of the server binary.
//!
//! Precedence, lowest first: built-in defaults, the optional TOML file given
//! with `--config`, `FXCONV_*` environment variables (`__` separates
//! sections, e.g. `FXCONV_FEED__TIMEOUT_SECS=5`), then `--port` / `PORT`.
use std::time::Duration;

use clap::Parser;
use config::{Config, ConfigError, Environment, File};
use engine::{FeedConfig, feed::TREASURY_BASE_URL};
use serde::Deserialize;

const DEFAULT_CONFIG_PATH: &str = "config/server.toml";
const ENV_PREFIX: &str = "FXCONV";

#[derive(Debug, Parser)]
#[command(name = "fxconv", about = "Purchase transactions with currency conversion")]
pub struct Args {
    /// Port to listen on.
    #[arg(long, env = "PORT")]
    port: Option<u16>,
    /// Optional config file path (TOML).
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct App {
    pub level: String,
    pub log_format: LogFormat,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Server {
    pub bind: String,
    pub port: u16,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Feed {
    pub base_url: String,
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub backoff_unit_ms: u64,
}

impl Default for Feed {
    fn default() -> Self {
        Self {
            base_url: TREASURY_BASE_URL.to_string(),
            timeout_secs: 10,
            max_attempts: 3,
            backoff_unit_ms: 1000,
        }
    }
}

impl Feed {
    pub fn feed_config(&self) -> FeedConfig {
        FeedConfig {
            base_url: self.base_url.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            max_attempts: self.max_attempts,
            backoff_unit: Duration::from_millis(self.backoff_unit_ms),
            ..FeedConfig::default()
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Cache {
    pub ttl_secs: u64,
    pub purge_interval_secs: u64,
}

impl Default for Cache {
    fn default() -> Self {
        Self {
            ttl_secs: 24 * 60 * 60,
            purge_interval_secs: 60 * 60,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub app: App,
    pub server: Server,
    pub feed: Feed,
    pub cache: Cache,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_args(Args::parse())
    }

    pub fn from_args(args: Args) -> Result<Self, ConfigError> {
        let mut settings: Settings = Config::builder()
            .add_source(File::with_name(&args.config).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        if let Some(port) = args.port {
            settings.server.port = port;
        }
        if settings.feed.max_attempts == 0 {
            return Err(ConfigError::Message(
                "feed.max_attempts must be at least 1".to_string(),
            ));
        }
        if settings.cache.purge_interval_secs == 0 {
            return Err(ConfigError::Message(
                "cache.purge_interval_secs must be at least 1".to_string(),
            ));
        }

        Ok(settings)
    }
}
