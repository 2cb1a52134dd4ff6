//! CLI argument definitions for the Shahr application.
//!
//! Uses `clap` with derive macros for ergonomic argument parsing.
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use shahr_core::ShahrConfig;
use std::path::PathBuf;

/// Shahr - municipal document assistant: dashboard API and conversational query session.
#[derive(Parser, Debug)]
#[command(name = "shahr", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// API server port.
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,

    /// Data directory for the saved identity.
    #[arg(short = 'd', long = "data-dir")]
    pub data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    /// Question-answering endpoint URL.
    #[arg(long = "endpoint")]
    pub endpoint: Option<String>,

    /// Ask one question, print the reply and exit instead of serving.
    #[arg(long = "ask", value_name = "QUESTION")]
    pub ask: Option<String>,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > SHAHR_CONFIG env var > platform default (~/.shahr/config.toml).
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("SHAHR_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the API server port.
    ///
    /// Priority: --port flag > SHAHR_PORT env var > config file value > 3040.
    pub fn resolve_port(&self, config_port: u16) -> u16 {
        if let Some(p) = self.port {
            return p;
        }
        if let Ok(val) = std::env::var("SHAHR_PORT") {
            if let Ok(p) = val.parse::<u16>() {
                return p;
            }
        }
        if config_port != 0 {
            return config_port;
        }
        3040
    }

    /// Write every CLI/env override into the loaded configuration.
    pub fn apply_overrides(&self, config: &mut ShahrConfig) {
        config.general.port = self.resolve_port(config.general.port);
        if let Some(ref dir) = self.data_dir {
            config.general.data_dir = dir.to_string_lossy().to_string();
        }
        if let Some(ref level) = self.log_level {
            config.general.log_level = level.clone();
        }
        if let Some(ref endpoint) = self.endpoint {
            config.query.endpoint = endpoint.clone();
        }
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".shahr").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".shahr").join("config.toml");
    }
    PathBuf::from("config.toml")
}
