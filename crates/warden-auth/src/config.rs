use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, WardenError};

/// Top-level Warden configuration stored as TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WardenConfig {
    pub warden: WardenSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WardenSettings {
    /// Path to the SQLite permission database.
    pub db_path: String,
    /// Default `tracing` filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_log_filter() -> String {
    "warden_auth=info,warden_cli=info".to_string()
}

impl WardenConfig {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(WardenError::ConfigNotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| WardenError::TomlDe(e.to_string()))
    }

    /// Save config to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| WardenError::TomlSer(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Default config for `warden init`.
    pub fn default_config(base_dir: &Path) -> Self {
        Self {
            warden: WardenSettings {
                db_path: base_dir.join("warden.db").display().to_string(),
                log_filter: default_log_filter(),
            },
        }
    }

    /// `<base_dir>/warden.toml`
    pub fn default_path(base_dir: &Path) -> PathBuf {
        base_dir.join("warden.toml")
    }

    /// `~/.warden`
    pub fn default_base_dir() -> Result<PathBuf> {
        dirs::home_dir()
            .map(|h| h.join(".warden"))
            .ok_or_else(|| WardenError::Config("Cannot determine home directory".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn roundtrip_config() {
        let tmp = TempDir::new().unwrap();
        let path = WardenConfig::default_path(tmp.path());
        let config = WardenConfig::default_config(tmp.path());
        config.save(&path).unwrap();
        let loaded = WardenConfig::load(&path).unwrap();
        assert!(loaded.warden.db_path.ends_with("warden.db"));
        assert_eq!(loaded.warden.log_filter, "warden_auth=info,warden_cli=info");
    }

    #[test]
    fn load_nonexistent_returns_error() {
        let result = WardenConfig::load(Path::new("/nonexistent/warden.toml"));
        assert!(matches!(result, Err(WardenError::ConfigNotFound(_))));
    }

    #[test]
    fn log_filter_defaults_when_missing() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("warden.toml");
        std::fs::write(&path, "[warden]\ndb_path = \"/tmp/w.db\"\n").unwrap();
        let loaded = WardenConfig::load(&path).unwrap();
        assert_eq!(loaded.warden.db_path, "/tmp/w.db");
        assert_eq!(loaded.warden.log_filter, "warden_auth=info,warden_cli=info");
    }

    #[test]
    fn malformed_toml_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("warden.toml");
        std::fs::write(&path, "[warden\n").unwrap();
        assert!(matches!(
            WardenConfig::load(&path),
            Err(WardenError::TomlDe(_))
        ));
    }
}
