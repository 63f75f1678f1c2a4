//! Application configuration management.
//!
//! Holds the persistence endpoint, the app origin, and the offline cache
//! settings. Stored at `<config_dir>/criyago/config.json`; a few values
//! can be overridden from the environment (after `.env` is loaded by the
//! binary).

use std::path::PathBuf;

use anyhow::{Context, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::auth::CredentialStore;
use crate::cache::{CacheOptions, CacheVersion};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "criyago";

/// Config file name
const CONFIG_FILE: &str = "config.json";

pub const ENV_STORE_URL: &str = "CRIYAGO_STORE_URL";
pub const ENV_STORE_KEY: &str = "CRIYAGO_STORE_KEY";
pub const ENV_ORIGIN: &str = "CRIYAGO_ORIGIN";
pub const ENV_CACHE_VERSION: &str = "CRIYAGO_CACHE_VERSION";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    pub app_name: String,
    pub version: String,
    /// Paths fetched and stored by install
    pub manifest: Vec<String>,
    pub offline_page: String,
    pub icon: String,
    pub notification_title: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            version: "v2.0".to_string(),
            manifest: ["/", "/manifest.json", "/icon-192.jpg", "/icon-512.jpg", "/offline.html"]
                .iter()
                .map(|p| p.to_string())
                .collect(),
            offline_page: "/offline.html".to_string(),
            icon: "/icon-192.jpg".to_string(),
            notification_title: "Criyago".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub origin: String,
    /// Hosted persistence endpoint; local mode when unset
    pub store_url: Option<String>,
    pub last_email: Option<String>,
    pub cache: CacheConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            origin: "http://localhost:3000".to_string(),
            store_url: None,
            last_email: None,
            cache: CacheConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse {}", path.display()))?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir =
            dirs::config_dir().ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir =
            dirs::cache_dir().ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Apply environment overrides
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(origin) = lookup(ENV_ORIGIN) {
            self.origin = origin;
        }
        if let Some(url) = lookup(ENV_STORE_URL) {
            self.store_url = Some(url).filter(|u| !u.trim().is_empty());
        }
        if let Some(version) = lookup(ENV_CACHE_VERSION) {
            self.cache.version = version;
        }
    }

    /// API key for the hosted store: environment first, then the keychain
    pub fn store_api_key(&self) -> Option<String> {
        if let Some(key) = std::env::var(ENV_STORE_KEY).ok().filter(|k| !k.is_empty()) {
            return Some(key);
        }
        let url = self.store_url.as_deref()?;
        CredentialStore::get_api_key(url).ok()
    }

    pub fn cache_version(&self) -> CacheVersion {
        CacheVersion::new(self.cache.app_name.as_str(), self.cache.version.as_str())
    }

    pub fn cache_options(&self) -> Result<CacheOptions> {
        let origin = Url::parse(&self.origin)
            .with_context(|| format!("Invalid origin URL: {}", self.origin))?;
        let mut options = CacheOptions::new(self.cache_version(), origin);
        options.offline_page = self.cache.offline_page.clone();
        options.icon = self.cache.icon.clone();
        options.notification_title = self.cache.notification_title.clone();
        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_shipped_manifest() {
        let config = Config::default();
        assert_eq!(config.cache_version().static_partition(), "criyago-static-v2.0");
        assert_eq!(config.cache.manifest.len(), 5);
        assert!(config.cache.manifest.contains(&config.cache.offline_page));
        assert!(config.store_url.is_none());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config = serde_json::from_str(r#"{"cache":{"version":"v2.1"}}"#).unwrap();
        assert_eq!(config.origin, "http://localhost:3000");
        assert_eq!(config.cache.version, "v2.1");
        assert_eq!(config.cache.icon, "/icon-192.jpg");
    }

    #[test]
    fn test_overrides() {
        let mut config = Config::default();
        config.apply_overrides(|key| match key {
            ENV_ORIGIN => Some("https://criyago.app".to_string()),
            ENV_STORE_URL => Some("https://db.example.co".to_string()),
            _ => None,
        });
        assert_eq!(config.origin, "https://criyago.app");
        assert_eq!(config.store_url.as_deref(), Some("https://db.example.co"));
        assert_eq!(config.cache.version, "v2.0");

        config.apply_overrides(|key| (key == ENV_STORE_URL).then(String::new));
        assert!(config.store_url.is_none());
    }

    #[test]
    fn test_cache_options() {
        let mut config = Config::default();
        config.cache.offline_page = "/offline-v2.html".to_string();
        let options = config.cache_options().unwrap();
        assert_eq!(options.origin.as_str(), "http://localhost:3000/");
        assert_eq!(options.offline_page, "/offline-v2.html");

        config.origin = "not a url".to_string();
        assert!(config.cache_options().is_err());
    }
}
