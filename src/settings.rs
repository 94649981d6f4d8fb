use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Result, RevlensError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub data_dir: String,
    /// Channel stamped on imported reports when `--channel` is not given.
    pub default_channel: String,
    /// Rows per page in report tables.
    pub page_size: usize,
}

const DEFAULT_PAGE_SIZE: usize = 25;

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir().to_string_lossy().to_string(),
            default_channel: String::new(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Settings {
    pub fn channel(&self) -> Option<&str> {
        (!self.default_channel.is_empty()).then_some(self.default_channel.as_str())
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("revlens")
}

fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Documents")
        .join("revlens")
}

pub fn load_settings() -> Settings {
    let path = settings_path();
    if !path.exists() {
        return Settings::default();
    }
    let content = std::fs::read_to_string(&path).unwrap_or_default();
    serde_json::from_str(&content).unwrap_or_else(|e| {
        tracing::warn!(path = %path.display(), error = %e, "unreadable settings, using defaults");
        Settings::default()
    })
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    std::fs::create_dir_all(config_dir())?;
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| RevlensError::Settings(e.to_string()))?;
    std::fs::write(settings_path(), format!("{json}\n"))?;
    Ok(())
}

pub fn get_data_dir() -> PathBuf {
    PathBuf::from(&load_settings().data_dir)
}

pub fn shellexpand_path(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    std::fs::canonicalize(path)
        .unwrap_or_else(|_| PathBuf::from(path))
        .to_string_lossy()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load_roundtrip() {
        let settings = Settings {
            data_dir: "/tmp/test".to_string(),
            default_channel: "Main".to_string(),
            page_size: 10,
        };
        let json = serde_json::to_string_pretty(&settings).unwrap();
        let loaded: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded, settings);
        assert_eq!(loaded.channel(), Some("Main"));
    }

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert!(s.default_channel.is_empty());
        assert_eq!(s.channel(), None);
        assert_eq!(s.page_size, 25);
        assert!(s.data_dir.ends_with("revlens"));
    }

    #[test]
    fn test_load_merges_with_defaults() {
        let s: Settings = serde_json::from_str(r#"{"data_dir": "/tmp/test"}"#).unwrap();
        assert_eq!(s.data_dir, "/tmp/test");
        assert_eq!(s.page_size, 25);
    }

    #[test]
    fn test_shellexpand_keeps_unknown_paths() {
        assert_eq!(shellexpand_path("/definitely/not/here"), "/definitely/not/here");
    }
}
