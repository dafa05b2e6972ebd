//! Configuration for tvdash-server
//!
//! Settings sources, highest priority first:
//! 1. Command-line arguments (some also readable from `TVDASH_*` environment variables)
//! 2. TOML config file (`--config`, `TVDASH_CONFIG`, or `~/.config/tvdash/config.toml`)
//! 3. Built-in defaults
//!
//! ```toml
//! host = "127.0.0.1"
//! port = 9978
//! apps_dir = "/srv/tvdash/apps"
//!
//! [proxy]
//! allowed_hosts = ["api.example.com"]
//!
//! [logging]
//! level = "debug"
//! ```

use clap::Parser;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tvdash_common::config::{config_file_path, load_toml, LoggingConfig};

/// First port tried when binding
pub const DEFAULT_PORT: u16 = 9978;

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "TVDASH_CONFIG";

/// Command-line arguments for tvdash-server
#[derive(Parser, Debug, Default, Clone)]
#[command(name = "tvdash-server")]
#[command(about = "Local dashboard server for bundled front-end apps")]
#[command(version)]
pub struct Args {
    /// Path to TOML config file
    #[arg(short, long, env = "TVDASH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to bind
    #[arg(long, env = "TVDASH_HOST")]
    pub host: Option<String>,

    /// First port to try; the next free one is used if taken
    #[arg(short, long, env = "TVDASH_PORT")]
    pub port: Option<u16>,

    /// How many consecutive ports to try
    #[arg(long)]
    pub port_attempts: Option<u16>,

    /// Directory holding one sub-directory per app
    #[arg(short, long, env = "TVDASH_APPS_DIR")]
    pub apps_dir: Option<PathBuf>,

    /// Disable the /proxy route
    #[arg(long)]
    pub no_proxy: bool,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

/// Server configuration (TOML root)
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub port_attempts: u16,
    pub apps_dir: PathBuf,
    pub proxy: ProxyConfig,
    pub logging: LoggingConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            port_attempts: 20,
            apps_dir: PathBuf::from("apps"),
            proxy: ProxyConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Forwarding proxy configuration (`[proxy]` table)
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProxyConfig {
    /// Mount the /proxy route
    pub enabled: bool,
    pub connect_timeout_secs: u64,
    /// Longest wait for the response headers or for any one body chunk
    pub read_timeout_secs: u64,
    /// Upstream hosts that may be proxied; `"*"` allows any
    pub allowed_hosts: Vec<String>,
    /// Largest request body forwarded upstream
    pub max_body_bytes: usize,
    /// Reject upstream TLS certificates that fail verification
    pub verify_tls: bool,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            connect_timeout_secs: 60,
            read_timeout_secs: 120,
            allowed_hosts: vec!["*".to_string()],
            max_body_bytes: 32 * 1024 * 1024,
            verify_tls: true,
        }
    }
}

impl ProxyConfig {
    /// Whether `host` may be proxied
    pub fn allows_host(&self, host: &str) -> bool {
        self.allowed_hosts
            .iter()
            .any(|allowed| allowed == "*" || allowed.eq_ignore_ascii_case(host))
    }
}

/// Where [`ServerConfig::load`] took its settings from
///
/// Config is loaded before logging is set up, so the caller logs this afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Settings read from this file
    File(PathBuf),
    /// File was named but does not exist; built-in defaults apply
    Missing(PathBuf),
    /// No config file configured
    Defaults,
}

impl ServerConfig {
    /// Load the config file named by `args` (if any) and apply CLI overrides
    pub fn load(args: &Args) -> tvdash_common::Result<(Self, ConfigSource)> {
        let path = config_file_path(args.config.as_deref(), CONFIG_ENV_VAR);
        let source = match path {
            Some(path) if path.exists() => ConfigSource::File(path),
            Some(path) => ConfigSource::Missing(path),
            None => ConfigSource::Defaults,
        };

        let mut config = match &source {
            ConfigSource::File(path) => Self::from_file(Some(path))?,
            ConfigSource::Missing(_) | ConfigSource::Defaults => Self::default(),
        };
        args.apply_to(&mut config);
        Ok((config, source))
    }

    /// Read a TOML file; `None` or a missing file yields defaults
    pub fn from_file(path: Option<&Path>) -> tvdash_common::Result<Self> {
        load_toml(path)
    }
}

impl Args {
    /// Override `config` with every argument that was given
    pub fn apply_to(&self, config: &mut ServerConfig) {
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(attempts) = self.port_attempts {
            config.port_attempts = attempts;
        }
        if let Some(apps_dir) = &self.apps_dir {
            config.apps_dir = apps_dir.clone();
        }
        if self.no_proxy {
            config.proxy.enabled = false;
        }
    }
}
