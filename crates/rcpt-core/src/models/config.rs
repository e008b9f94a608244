//! Configuration structures for rcpt.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{RcptError, Result};

/// Main configuration for rcpt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RcptConfig {
    /// Web server configuration.
    pub server: ServerConfig,

    /// Database and upload locations.
    pub storage: StorageConfig,

    /// OCR configuration.
    pub ocr: OcrConfig,

    /// Receipt extraction configuration.
    pub extraction: ExtractionConfig,
}

/// Web server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind.
    pub host: String,

    /// Port to listen on.
    pub port: u16,

    /// Maximum accepted upload size in bytes.
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database file.
    pub database_path: PathBuf,

    /// Directory where uploaded files are kept.
    pub upload_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("data/receipts.db"),
            upload_dir: PathBuf::from("data/uploads"),
        }
    }
}

/// OCR engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Run OCR on image uploads.
    pub enabled: bool,

    /// Engine executable.
    pub command: String,

    /// Engine language codes, `+`-separated (e.g. "eng+rus").
    pub languages: String,

    /// Maximum image dimension (longer side) passed to the engine.
    pub max_image_size: u32,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: "tesseract".to_string(),
            languages: "eng".to_string(),
            max_image_size: 2048,
        }
    }
}

/// Receipt extraction configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Read ambiguous `01/02/2024` as 1 February.
    pub day_first: bool,

    /// Drafts below this confidence are flagged for review.
    pub min_confidence: f32,

    /// Additional keywords marking the total line.
    pub extra_total_keywords: Vec<String>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            day_first: true,
            min_confidence: 0.5,
            extra_total_keywords: Vec::new(),
        }
    }
}

impl RcptConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| RcptError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| RcptError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply overrides from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("RCPT_HOST") {
            self.server.host = host;
        }
        let port = lookup("RCPT_PORT").or_else(|| lookup("PORT"));
        if let Some(port) = port.and_then(|p| p.trim().parse().ok()) {
            self.server.port = port;
        }
        if let Some(db) = lookup("RCPT_DATABASE") {
            self.storage.database_path = PathBuf::from(db);
        }
        if let Some(dir) = lookup("RCPT_UPLOAD_DIR") {
            self.storage.upload_dir = PathBuf::from(dir);
        }
        if let Some(langs) = lookup("RCPT_OCR_LANGUAGES") {
            self.ocr.languages = langs;
        }
        self
    }

    /// Socket address string for the web server.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: RcptConfig =
            serde_json::from_str(r#"{"server": {"port": 8080}, "ocr": {"enabled": false}}"#)
                .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert!(!config.ocr.enabled);
        assert_eq!(config.ocr.command, "tesseract");
        assert!(config.extraction.day_first);
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("PORT", "7000"),
            ("RCPT_DATABASE", "/tmp/r.db"),
            ("RCPT_OCR_LANGUAGES", "eng+rus"),
        ]
        .into_iter()
        .collect();

        let config =
            RcptConfig::default().with_overrides(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.server.port, 7000);
        assert_eq!(config.storage.database_path, PathBuf::from("/tmp/r.db"));
        assert_eq!(config.ocr.languages, "eng+rus");
        assert_eq!(config.bind_addr(), "0.0.0.0:7000");
    }

    #[test]
    fn test_rcpt_port_wins_over_port() {
        let config = RcptConfig::default().with_overrides(|k| match k {
            "PORT" => Some("7000".to_string()),
            "RCPT_PORT" => Some("7100".to_string()),
            _ => None,
        });
        assert_eq!(config.server.port, 7100);
    }

    #[test]
    fn test_invalid_port_is_ignored() {
        let config =
            RcptConfig::default().with_overrides(|k| (k == "PORT").then(|| "abc".to_string()));
        assert_eq!(config.server.port, 5000);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = RcptConfig::default();
        config.extraction.extra_total_keywords = vec!["montant".to_string()];
        config.save(&path).unwrap();

        let loaded = RcptConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }
}
