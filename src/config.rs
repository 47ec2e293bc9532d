use crate::i18n::{LanguageContext, CANONICAL_SLOT, TRANSLATE_HINT};
use crate::store::RawData;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default quiet period before a field's pending edit is translated
pub const DEFAULT_DEBOUNCE_MS: u64 = 1000;

/// Engine settings for one sync instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Quiet period a field must see before its pending edit resolves
    pub debounce: Duration,
    /// Language code that receives the external translation result
    pub canonical_slot: String,
    /// Target hint passed to the translation operation
    pub translate_hint: String,
    /// Drop results of resolutions that were superseded while in flight
    pub discard_stale_results: bool,
}

impl SyncConfig {
    /// Set the debounce window
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Set whether superseded in-flight results are dropped
    pub fn with_discard_stale_results(mut self, discard: bool) -> Self {
        self.discard_stale_results = discard;
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            canonical_slot: CANONICAL_SLOT.to_string(),
            translate_hint: TRANSLATE_HINT.to_string(),
            discard_stale_results: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    // Languages
    pub languages: Vec<String>,
    pub current_language: String,

    // Translation service
    pub translate_api_url: String,
    pub translate_api_key: Option<String>,

    // Sync behavior
    pub debounce_ms: u64,
    pub discard_stale_results: bool,

    // Initial data
    pub init_file: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let languages = parse_languages(
            &std::env::var("SYNC_LANGUAGES").unwrap_or_else(|_| "en_US,zh_CN".to_string()),
        );
        let current_language = std::env::var("SYNC_CURRENT_LANGUAGE")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .or_else(|| languages.first().cloned())
            .unwrap_or_default();

        Ok(Self {
            languages,
            current_language,

            // Translation service
            translate_api_url: std::env::var("TRANSLATE_API_URL")
                .context("TRANSLATE_API_URL not set")?,
            translate_api_key: std::env::var("TRANSLATE_API_KEY")
                .ok()
                .filter(|v| !v.is_empty()),

            // Sync behavior
            debounce_ms: std::env::var("SYNC_DEBOUNCE_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_DEBOUNCE_MS),
            discard_stale_results: std::env::var("SYNC_DISCARD_STALE")
                .ok()
                .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),

            // Initial data
            init_file: std::env::var("SYNC_INIT_FILE")
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
        })
    }

    /// Language context for an engine built from this configuration
    pub fn language_context(&self) -> LanguageContext {
        LanguageContext::new(self.languages.iter().cloned(), self.current_language.clone())
    }

    /// Engine settings for this configuration
    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig::default()
            .with_debounce(Duration::from_millis(self.debounce_ms))
            .with_discard_stale_results(self.discard_stale_results)
    }
}

/// Split a comma separated language list, dropping blanks.
pub fn parse_languages(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Load raw initial data from a JSON file.
pub fn load_raw_data(path: &Path) -> Result<RawData> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read initial data from {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse initial data in {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    const VARS: [&str; 7] = [
        "SYNC_LANGUAGES",
        "SYNC_CURRENT_LANGUAGE",
        "TRANSLATE_API_URL",
        "TRANSLATE_API_KEY",
        "SYNC_DEBOUNCE_MS",
        "SYNC_DISCARD_STALE",
        "SYNC_INIT_FILE",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    // ==================== SyncConfig Tests ====================

    #[test]
    fn test_sync_config_defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.debounce, Duration::from_millis(1000));
        assert_eq!(config.canonical_slot, "en_US");
        assert_eq!(config.translate_hint, "en");
        assert!(!config.discard_stale_results);
    }

    #[test]
    fn test_sync_config_builders() {
        let config = SyncConfig::default()
            .with_debounce(Duration::from_millis(50))
            .with_discard_stale_results(true);
        assert_eq!(config.debounce, Duration::from_millis(50));
        assert!(config.discard_stale_results);
    }

    // ==================== parse_languages Tests ====================

    #[test]
    fn test_parse_languages_trims_and_drops_blanks() {
        assert_eq!(
            parse_languages(" en_US, zh_CN ,,fr_FR "),
            vec!["en_US", "zh_CN", "fr_FR"]
        );
        assert!(parse_languages("").is_empty());
    }

    // ==================== from_env Tests ====================

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        clear_env();
        std::env::set_var("TRANSLATE_API_URL", "http://localhost:9000/translate");

        let config = Config::from_env().expect("Should load");

        assert_eq!(config.languages, vec!["en_US", "zh_CN"]);
        assert_eq!(config.current_language, "en_US");
        assert_eq!(config.debounce_ms, 1000);
        assert!(!config.discard_stale_results);
        assert!(config.translate_api_key.is_none());
        assert!(config.init_file.is_none());
        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_custom_values() {
        clear_env();
        std::env::set_var("TRANSLATE_API_URL", "http://localhost:9000/translate");
        std::env::set_var("TRANSLATE_API_KEY", "key");
        std::env::set_var("SYNC_LANGUAGES", "zh_CN,en_US,ja_JP");
        std::env::set_var("SYNC_CURRENT_LANGUAGE", "zh_CN");
        std::env::set_var("SYNC_DEBOUNCE_MS", "250");
        std::env::set_var("SYNC_DISCARD_STALE", "true");
        std::env::set_var("SYNC_INIT_FILE", "data/fields.json");

        let config = Config::from_env().expect("Should load");

        assert_eq!(config.languages, vec!["zh_CN", "en_US", "ja_JP"]);
        assert_eq!(config.current_language, "zh_CN");
        assert_eq!(config.translate_api_key.as_deref(), Some("key"));
        assert_eq!(config.debounce_ms, 250);
        assert!(config.discard_stale_results);
        assert_eq!(config.init_file, Some(PathBuf::from("data/fields.json")));

        let sync = config.sync_config();
        assert_eq!(sync.debounce, Duration::from_millis(250));
        assert!(sync.discard_stale_results);

        let context = config.language_context();
        assert!(context.is_current("zh_CN"));
        assert_eq!(context.languages().len(), 3);
        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_invalid_debounce_falls_back() {
        clear_env();
        std::env::set_var("TRANSLATE_API_URL", "http://localhost:9000/translate");
        std::env::set_var("SYNC_DEBOUNCE_MS", "soon");

        let config = Config::from_env().expect("Should load");
        assert_eq!(config.debounce_ms, DEFAULT_DEBOUNCE_MS);
        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_missing_api_url() {
        clear_env();

        let result = Config::from_env();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("TRANSLATE_API_URL"));
    }

    #[test]
    #[serial]
    fn test_from_env_empty_language_list() {
        clear_env();
        std::env::set_var("TRANSLATE_API_URL", "http://localhost:9000/translate");
        std::env::set_var("SYNC_LANGUAGES", " , ");

        let config = Config::from_env().expect("Should load");
        assert!(config.languages.is_empty());
        assert_eq!(config.current_language, "");
        assert!(config.language_context().is_empty());
        clear_env();
    }

    // ==================== load_raw_data Tests ====================

    #[test]
    fn test_load_raw_data() {
        let dir = TempDir::new().expect("Should create temp dir");
        let path = dir.path().join("fields.json");
        std::fs::write(&path, r#"{"title": null, "body": {"en_US": "Hello"}}"#)
            .expect("Should write");

        let data = load_raw_data(&path).expect("Should load");

        assert_eq!(data.len(), 2);
        assert!(data.get("title").map(Option::is_none).unwrap_or(false));
    }

    #[test]
    fn test_load_raw_data_missing_file() {
        let dir = TempDir::new().expect("Should create temp dir");
        let result = load_raw_data(&dir.path().join("missing.json"));

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Failed to read"));
    }

    #[test]
    fn test_load_raw_data_invalid_json() {
        let dir = TempDir::new().expect("Should create temp dir");
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "[1, 2").expect("Should write");

        let result = load_raw_data(&path);
        assert!(result.unwrap_err().to_string().contains("Failed to parse"));
    }
}
