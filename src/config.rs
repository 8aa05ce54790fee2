//! Server configuration
//!
//! Built once at startup and shared read-only. Sources, later wins:
//! built-in defaults, an optional TOML file, `BANANAD_*` environment
//! variables, then command-line overrides applied by the binary.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

/// Environment variable prefix
pub const ENV_PREFIX: &str = "BANANAD_";

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub bind_addr: SocketAddr,
    /// Chat completions endpoint of the image backend
    pub api_url: String,
    /// Bearer token for the backend
    pub api_key: Option<String>,
    pub model_name: String,
    /// Shared site password; required
    pub site_password: Option<String>,
    /// Maximum reference images per request and per gallery entry
    pub max_images: usize,
    /// Maximum prompt length in characters
    pub max_prompt_chars: usize,
    /// Gallery JSON document
    pub gallery_path: PathBuf,
    /// Gallery capacity; oldest entries are evicted past this
    pub gallery_max_items: usize,
    pub upstream_timeout_secs: u64,
    /// Cap for response bodies written to logs
    pub diagnostic_body_limit: usize,
    /// Inbound request body limit
    pub body_limit_bytes: usize,
    /// Optional directory served for non-API paths
    pub static_dir: Option<PathBuf>,
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            api_url: "http://127.0.0.1:8000/v1/chat/completions".to_string(),
            api_key: None,
            model_name: "banana-pro".to_string(),
            site_password: None,
            max_images: 16,
            max_prompt_chars: 32_000,
            gallery_path: PathBuf::from("gallery.json"),
            gallery_max_items: 100,
            upstream_timeout_secs: 120,
            diagnostic_body_limit: 4096,
            body_limit_bytes: 200 * 1024 * 1024,
            static_dir: None,
            log_format: LogFormat::Pretty,
        }
    }
}

impl Config {
    /// Layer defaults, an optional TOML file and the environment
    pub fn figment(file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = file {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    /// Load and validate configuration
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let config: Config = Self::figment(file).extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the server cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.site_password.as_deref().map_or(true, str::is_empty) {
            bail!("site_password must be set (e.g. {}SITE_PASSWORD)", ENV_PREFIX);
        }
        if self.max_images == 0 {
            bail!("max_images must be at least 1");
        }
        if self.max_prompt_chars == 0 {
            bail!("max_prompt_chars must be at least 1");
        }
        if self.gallery_max_items == 0 {
            bail!("gallery_max_items must be at least 1");
        }
        if self.upstream_timeout_secs == 0 {
            bail!("upstream_timeout_secs must be at least 1");
        }
        Ok(())
    }

    /// The site password; empty only on unvalidated configs
    pub fn password(&self) -> &str {
        self.site_password.as_deref().unwrap_or("")
    }
}
