use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, ShahrError};

/// Default remote question-answering endpoint.
pub const DEFAULT_QUERY_ENDPOINT: &str = "https://behsazabackend.onrender.com/api/query";

/// Top-level configuration for the Shahr assistant.
///
/// Loaded from `~/.shahr/config.toml` by default. Every section falls back to
/// its defaults when missing from the file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShahrConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub query: QueryConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

impl ShahrConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ShahrConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Reject values the session cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.query.endpoint.trim().is_empty() {
            return Err(ShahrError::Config(
                "query.endpoint must not be empty".to_string(),
            ));
        }
        if self.query.timeout_secs == 0 {
            return Err(ShahrError::Config(
                "query.timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.chat.summary_max_chars == 0 {
            return Err(ShahrError::Config(
                "chat.summary_max_chars must be greater than zero".to_string(),
            ));
        }
        if self.chat.max_sessions == 0 {
            return Err(ShahrError::Config(
                "chat.max_sessions must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Data directory with a leading `~` expanded against `HOME`/`USERPROFILE`.
    pub fn data_dir(&self) -> PathBuf {
        expand_home(&self.general.data_dir)
    }
}

fn expand_home(raw: &str) -> PathBuf {
    if let Some(rest) = raw.strip_prefix("~/") {
        let home = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE"));
        if let Ok(home) = home {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(raw)
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Data directory for the saved identity.
    pub data_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
    /// HTTP port the dashboard API listens on.
    pub port: u16,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.shahr/data".to_string(),
            log_level: "info".to_string(),
            port: 3040,
        }
    }
}

/// Remote question-answering service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Endpoint receiving `POST {"question": ...}`.
    pub endpoint: String,
    /// Upper bound on a single query, in seconds.
    pub timeout_secs: u64,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_QUERY_ENDPOINT.to_string(),
            timeout_secs: 30,
        }
    }
}

/// Conversation session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Start new sessions with the demo conversations instead of a blank one.
    pub seed_demo_conversations: bool,
    /// Maximum characters kept in a conversation's last-message summary.
    pub summary_max_chars: usize,
    /// Live login sessions kept at once; the oldest is evicted beyond this.
    pub max_sessions: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            seed_demo_conversations: true,
            summary_max_chars: 120,
            max_sessions: 64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = ShahrConfig::default();
        assert_eq!(config.general.data_dir, "~/.shahr/data");
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.general.port, 3040);
        assert_eq!(config.query.endpoint, DEFAULT_QUERY_ENDPOINT);
        assert_eq!(config.query.timeout_secs, 30);
        assert!(config.chat.seed_demo_conversations);
        assert_eq!(config.chat.summary_max_chars, 120);
        assert_eq!(config.chat.max_sessions, 64);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_valid_config() {
        let content = r#"
[general]
data_dir = "/custom/data"
log_level = "debug"
port = 8080

[query]
endpoint = "http://127.0.0.1:9000/api/query"
timeout_secs = 5
"#;
        let file = create_temp_config(content);
        let config = ShahrConfig::load(file.path()).unwrap();
        assert_eq!(config.general.data_dir, "/custom/data");
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.general.port, 8080);
        assert_eq!(config.query.endpoint, "http://127.0.0.1:9000/api/query");
        assert_eq!(config.query.timeout_secs, 5);
        // Missing section uses defaults.
        assert_eq!(config.chat.summary_max_chars, 120);
    }

    #[test]
    fn test_partial_section_keeps_field_defaults() {
        let file = create_temp_config("[query]\ntimeout_secs = 3\n");
        let config = ShahrConfig::load(file.path()).unwrap();
        assert_eq!(config.query.timeout_secs, 3);
        assert_eq!(config.query.endpoint, DEFAULT_QUERY_ENDPOINT);
    }

    #[test]
    fn test_config_load_invalid_toml() {
        let file = create_temp_config("this is {{ not valid TOML");
        assert!(ShahrConfig::load(file.path()).is_err());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = ShahrConfig::load_or_default(Path::new("/nonexistent/shahr/config.toml"));
        assert_eq!(config.general.port, 3040);
    }

    #[test]
    fn test_config_save_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("dir").join("config.toml");

        let mut config = ShahrConfig::default();
        config.general.port = 4100;
        config.save(&path).unwrap();

        let loaded = ShahrConfig::load(&path).unwrap();
        assert_eq!(loaded.general.port, 4100);
        assert_eq!(loaded.query.endpoint, config.query.endpoint);
    }

    // ---- validation ----

    #[test]
    fn test_validate_rejects_empty_endpoint() {
        let mut config = ShahrConfig::default();
        config.query.endpoint = "   ".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("query.endpoint"));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = ShahrConfig::default();
        config.query.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_summary_length() {
        let mut config = ShahrConfig::default();
        config.chat.summary_max_chars = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_max_sessions() {
        let mut config = ShahrConfig::default();
        config.chat.max_sessions = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("chat.max_sessions"));
    }

    #[test]
    fn test_data_dir_absolute_path_unchanged() {
        let mut config = ShahrConfig::default();
        config.general.data_dir = "/var/lib/shahr".to_string();
        assert_eq!(config.data_dir(), PathBuf::from("/var/lib/shahr"));
    }
}
