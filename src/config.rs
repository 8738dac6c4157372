/// Application configuration
///
/// Loaded once at startup from `config.toml` in the user's config directory:
/// - Linux: ~/.config/bando-fi/config.toml
/// - macOS: ~/Library/Application Support/bando-fi/config.toml
/// - Windows: %APPDATA%\bando-fi\config.toml
///
/// Every field has a default, so a missing or malformed file is never fatal.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_DIR: &str = "bando-fi";
const DB_FILE: &str = "bando_fi.db";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory holding the local store (defaults to the platform data dir)
    pub data_dir: Option<PathBuf>,
    /// Simulated latency of the image-generation boundary
    pub generation_latency_ms: u64,
    /// Base URL of the placeholder image service
    pub placeholder_base_url: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            generation_latency_ms: 3000,
            placeholder_base_url: "https://picsum.photos".to_string(),
        }
    }
}

impl AppConfig {
    /// Load the config from the default location
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load the config from an explicit path, falling back to defaults
    pub fn load_from(path: &Path) -> Self {
        let Ok(contents) = std::fs::read_to_string(path) else {
            return Self::default();
        };

        match toml::from_str(&contents) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!("Ignoring malformed config {}: {}", path.display(), err);
                Self::default()
            }
        }
    }

    pub fn generation_latency(&self) -> Duration {
        Duration::from_millis(self.generation_latency_ms)
    }

    /// Path of the SQLite file backing the local store
    pub fn database_path(&self) -> Option<PathBuf> {
        let dir = match &self.data_dir {
            Some(dir) => dir.clone(),
            None => dirs::data_dir().or_else(dirs::home_dir)?.join(APP_DIR),
        };
        Some(dir.join(DB_FILE))
    }

    fn config_path() -> Option<PathBuf> {
        Some(dirs::config_dir()?.join(APP_DIR).join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(prefix: &str) -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be monotonic")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "bando_fi_config_{prefix}_{}_{}.toml",
            std::process::id(),
            nanos
        ))
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/bando-fi/config.toml"));
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.generation_latency(), Duration::from_millis(3000));
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let path = temp_file("partial");
        std::fs::write(&path, "generation_latency_ms = 250\n").unwrap();

        let config = AppConfig::load_from(&path);
        assert_eq!(config.generation_latency_ms, 250);
        assert_eq!(config.placeholder_base_url, "https://picsum.photos");

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_malformed_file_uses_defaults() {
        let path = temp_file("malformed");
        std::fs::write(&path, "generation_latency_ms = \"soon\"").unwrap();

        assert_eq!(AppConfig::load_from(&path), AppConfig::default());

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_database_path_honours_data_dir() {
        let config = AppConfig {
            data_dir: Some(PathBuf::from("/tmp/studio")),
            ..AppConfig::default()
        };
        assert_eq!(
            config.database_path(),
            Some(PathBuf::from("/tmp/studio/bando_fi.db"))
        );
    }
}
