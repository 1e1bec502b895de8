//! Server configuration
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! command line flags.

use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Runtime settings of the service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to listen on
    pub bind: String,
    pub port: u16,
    /// Upper bound on a single image fetch
    pub fetch_timeout_ms: u64,
    /// Vertical size of every rendered frame
    pub render_height: u32,
    /// GPU sections allowed to run at the same time
    pub max_concurrent_renders: usize,
    /// Largest accepted image body
    pub max_image_bytes: u64,
    /// `env_logger` filter, overrides `RUST_LOG`
    pub log_filter: Option<String>,
    pub worker_threads: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 1445,
            fetch_timeout_ms: 10_000,
            render_height: 1000,
            max_concurrent_renders: 1,
            max_image_bytes: 32 * 1024 * 1024,
            log_filter: None,
            worker_threads: None,
        }
    }
}

impl ServerConfig {
    /// Load a configuration file. Missing keys keep their defaults.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Reject settings the service cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::Invalid("port must be non-zero".to_string()));
        }
        if self.fetch_timeout_ms == 0 {
            return Err(ConfigError::Invalid("fetch_timeout_ms must be non-zero".to_string()));
        }
        if self.render_height == 0 {
            return Err(ConfigError::Invalid("render_height must be non-zero".to_string()));
        }
        if self.max_concurrent_renders == 0 {
            return Err(ConfigError::Invalid("max_concurrent_renders must be non-zero".to_string()));
        }
        if self.worker_threads == Some(0) {
            return Err(ConfigError::Invalid("worker_threads must be non-zero".to_string()));
        }
        Ok(())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    /// Address handed to the HTTP listener
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Command line of the `boxshot` binary
#[derive(Parser, Debug)]
#[command(name = "boxshot", version, about = "Render image-textured boxes to plain-text P3")]
pub struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(long, global = true)]
    pub bind: Option<String>,

    #[arg(long, global = true)]
    pub port: Option<u16>,

    #[arg(long, global = true)]
    pub fetch_timeout_ms: Option<u64>,

    #[arg(long, global = true)]
    pub render_height: Option<u32>,

    #[arg(long, global = true)]
    pub max_concurrent_renders: Option<usize>,

    #[arg(long, global = true)]
    pub max_image_bytes: Option<u64>,

    /// Log filter, e.g. "info" or "boxshot_server=debug"
    #[arg(long = "log", global = true)]
    pub log_filter: Option<String>,

    #[arg(long, global = true)]
    pub worker_threads: Option<usize>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Serve `/test` and `/generate` over HTTP (default)
    Serve,
    /// Render one frame and write it as P3
    Render(RenderArgs),
}

/// Same parameters as a `/generate` query
#[derive(Args, Debug, Clone, PartialEq)]
pub struct RenderArgs {
    #[arg(long)]
    pub img: String,
    #[arg(long, allow_negative_numbers = true)]
    pub w: f64,
    #[arg(long, allow_negative_numbers = true)]
    pub h: f64,
    #[arg(long, allow_negative_numbers = true)]
    pub x: f64,
    #[arg(long, allow_negative_numbers = true)]
    pub y: f64,
    #[arg(long, allow_negative_numbers = true)]
    pub z: f64,
    /// Output file, stdout when omitted
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

impl Cli {
    /// Merge defaults, the config file and flags into a validated config
    pub fn resolve(&self) -> Result<ServerConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::load_from_file(path)?,
            None => ServerConfig::default(),
        };

        if let Some(bind) = &self.bind {
            config.bind = bind.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(timeout) = self.fetch_timeout_ms {
            config.fetch_timeout_ms = timeout;
        }
        if let Some(height) = self.render_height {
            config.render_height = height;
        }
        if let Some(permits) = self.max_concurrent_renders {
            config.max_concurrent_renders = permits;
        }
        if let Some(bytes) = self.max_image_bytes {
            config.max_image_bytes = bytes;
        }
        if let Some(filter) = &self.log_filter {
            config.log_filter = Some(filter.clone());
        }
        if let Some(threads) = self.worker_threads {
            config.worker_threads = Some(threads);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Serve)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 1445);
        assert_eq!(config.fetch_timeout(), Duration::from_secs(10));
        assert_eq!(config.render_height, 1000);
        assert_eq!(config.max_concurrent_renders, 1);
        assert_eq!(config.listen_addr(), "0.0.0.0:1445");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: ServerConfig = toml::from_str("port = 8080\nrender_height = 500\n").unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.render_height, 500);
        assert_eq!(config.fetch_timeout_ms, 10_000);
        assert_eq!(config.bind, "0.0.0.0");
    }

    #[test]
    fn test_flags_override_file() {
        let path = std::env::temp_dir().join(format!("boxshot-config-{}.toml", std::process::id()));
        std::fs::write(&path, "port = 8080\nfetch_timeout_ms = 2500\n").unwrap();

        let cli = Cli::try_parse_from([
            "boxshot",
            "--config",
            path.to_str().unwrap(),
            "--port",
            "9090",
        ])
        .unwrap();
        let config = cli.resolve().unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.port, 9090);
        assert_eq!(config.fetch_timeout_ms, 2500);
        assert_eq!(cli.command(), Command::Serve);
    }

    #[test]
    fn test_rejects_zero_values() {
        for flag in ["--port", "--fetch-timeout-ms", "--render-height", "--max-concurrent-renders"] {
            let cli = Cli::try_parse_from(["boxshot", flag, "0"]).unwrap();
            assert!(
                matches!(cli.resolve(), Err(ConfigError::Invalid(_))),
                "{} 0 should be rejected",
                flag
            );
        }
    }

    #[test]
    fn test_missing_config_file() {
        let cli = Cli::try_parse_from(["boxshot", "--config", "/nonexistent/boxshot.toml"]).unwrap();
        assert!(matches!(cli.resolve(), Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_render_subcommand_accepts_negative_numbers() {
        let cli = Cli::try_parse_from([
            "boxshot", "render", "--img", "http://example.com/a.png", "--w", "2", "--h", "1", "--x", "-3",
            "--y", "0.5", "--z", "-1e1",
        ])
        .unwrap();

        match cli.command() {
            Command::Render(args) => {
                assert_eq!(args.x, -3.0);
                assert_eq!(args.z, -10.0);
                assert!(args.output.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
