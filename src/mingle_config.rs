//! Project-local configuration read from `.mingle/mingle.toml`.
//!
//! # Configuration File Format
//!
//! ```toml
//! [storage]
//! db_path = "mingle.db"        # relative to the project directory
//!
//! [security]
//! history_secret = "change-me" # MINGLE_HISTORY_SECRET overrides
//!
//! [logging]
//! level = "info"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

pub const CONFIG_DIR: &str = ".mingle";
pub const CONFIG_FILE: &str = "mingle.toml";
pub const SECRET_ENV: &str = "MINGLE_HISTORY_SECRET";

const DEFAULT_SECRET: &str = "mingle-development-secret";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSection {
    /// SQLite database file
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("mingle.db")
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecuritySection {
    /// Secret the history feed token key is derived from
    #[serde(default)]
    pub history_secret: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingSection {
    /// Filter directive used when no env var or CLI flag is given
    #[serde(default)]
    pub level: Option<String>,
}

/// The complete mingle.toml structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MingleToml {
    #[serde(default)]
    pub storage: StorageSection,
    #[serde(default)]
    pub security: SecuritySection,
    #[serde(default)]
    pub logging: LoggingSection,
}

impl MingleToml {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse mingle.toml")
    }

    /// Load `.mingle/mingle.toml`, or defaults if the file doesn't exist.
    pub fn load_or_default(config_dir: &Path) -> Result<Self> {
        let config_path = config_dir.join(CONFIG_FILE);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize mingle.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// History secret: environment first, then file.
    pub fn history_secret(&self) -> Option<String> {
        std::env::var(SECRET_ENV)
            .ok()
            .filter(|s| !s.is_empty())
            .or_else(|| self.security.history_secret.clone())
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.storage.db_path.as_os_str().is_empty() {
            warnings.push("storage.db_path is empty".to_string());
        }

        match self.history_secret() {
            None => warnings.push(format!(
                "No history secret configured; set [security] history_secret or {}",
                SECRET_ENV
            )),
            Some(secret) if secret.len() < 16 => {
                warnings.push("history_secret is shorter than 16 characters".to_string())
            }
            Some(_) => {}
        }

        if let Some(level) = &self.logging.level
            && EnvFilter::try_new(level).is_err()
        {
            warnings.push(format!("Invalid logging level '{}'", level));
        }

        warnings
    }
}

/// Configuration resolved against a project directory.
#[derive(Debug, Clone)]
pub struct MingleConfig {
    pub project_dir: PathBuf,
    pub config_dir: PathBuf,
    pub toml: MingleToml,
}

impl MingleConfig {
    pub fn new(project_dir: PathBuf) -> Result<Self> {
        let project_dir = project_dir
            .canonicalize()
            .context("Failed to resolve project directory")?;
        let config_dir = project_dir.join(CONFIG_DIR);
        let toml = MingleToml::load_or_default(&config_dir)?;

        Ok(Self {
            project_dir,
            config_dir,
            toml,
        })
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }

    /// Database path; relative paths resolve against the project directory.
    pub fn db_path(&self) -> PathBuf {
        let path = &self.toml.storage.db_path;
        if path.is_absolute() {
            path.clone()
        } else {
            self.project_dir.join(path)
        }
    }

    /// Falls back to a fixed development secret, with a warning.
    pub fn history_secret(&self) -> String {
        self.toml.history_secret().unwrap_or_else(|| {
            tracing::warn!("Using the development history secret");
            DEFAULT_SECRET.to_string()
        })
    }

    pub fn log_level(&self) -> Option<&str> {
        self.toml.logging.level.as_deref()
    }

    pub fn validate(&self) -> Vec<String> {
        self.toml.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::tempdir;

    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    #[test]
    fn test_parse_full_config() {
        let config = MingleToml::parse(
            r#"
[storage]
db_path = "data/mingle.db"

[security]
history_secret = "0123456789abcdef"

[logging]
level = "mingle=debug"
"#,
        )
        .unwrap();
        assert_eq!(config.storage.db_path, PathBuf::from("data/mingle.db"));
        assert_eq!(
            config.security.history_secret.as_deref(),
            Some("0123456789abcdef")
        );
        assert_eq!(config.logging.level.as_deref(), Some("mingle=debug"));
    }

    #[test]
    fn test_parse_empty_uses_defaults() {
        let config = MingleToml::parse("").unwrap();
        assert_eq!(config.storage.db_path, PathBuf::from("mingle.db"));
        assert!(config.security.history_secret.is_none());
        assert!(config.logging.level.is_none());
    }

    #[test]
    fn test_parse_invalid_toml() {
        let err = MingleToml::parse("[storage\ndb_path = 1").unwrap_err();
        assert!(err.to_string().contains("Failed to parse mingle.toml"));
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        let mut config = MingleToml::default();
        config.security.history_secret = Some("0123456789abcdef".into());
        config.save(&path).unwrap();

        let loaded = MingleToml::load(&path).unwrap();
        assert_eq!(loaded.security.history_secret, config.security.history_secret);
        assert_eq!(loaded.storage.db_path, config.storage.db_path);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempdir().unwrap();
        let config = MingleToml::load_or_default(dir.path()).unwrap();
        assert_eq!(config.storage.db_path, PathBuf::from("mingle.db"));
    }

    #[test]
    fn test_env_secret_overrides_file() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let mut config = MingleToml::default();
        config.security.history_secret = Some("from-file-secret!".into());

        unsafe { std::env::set_var(SECRET_ENV, "from-env-secret!!") };
        assert_eq!(config.history_secret().as_deref(), Some("from-env-secret!!"));
        unsafe { std::env::remove_var(SECRET_ENV) };
        assert_eq!(config.history_secret().as_deref(), Some("from-file-secret!"));
    }

    #[test]
    fn test_validate_warnings() {
        let _guard = ENV_MUTEX.lock().unwrap();
        unsafe { std::env::remove_var(SECRET_ENV) };

        let mut config = MingleToml::default();
        let warnings = config.validate();
        assert!(warnings.iter().any(|w| w.contains("No history secret")));

        config.security.history_secret = Some("short".into());
        config.logging.level = Some("mingle=loud".into());
        let warnings = config.validate();
        assert!(warnings.iter().any(|w| w.contains("shorter than 16")));
        assert!(warnings.iter().any(|w| w.contains("Invalid logging level")));

        config.security.history_secret = Some("0123456789abcdef".into());
        config.logging.level = Some("info".into());
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_mingle_config_resolves_db_path() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(CONFIG_DIR)).unwrap();
        std::fs::write(
            dir.path().join(CONFIG_DIR).join(CONFIG_FILE),
            "[storage]\ndb_path = \"store/m.db\"\n",
        )
        .unwrap();

        let config = MingleConfig::new(dir.path().to_path_buf()).unwrap();
        let root = dir.path().canonicalize().unwrap();
        assert_eq!(config.db_path(), root.join("store/m.db"));
        assert_eq!(config.config_file(), root.join(".mingle/mingle.toml"));
    }
}
