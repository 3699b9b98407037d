use anyhow::{Context, Result};
use serde::Deserialize;

use crate::session::SessionConfig;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    #[serde(default)]
    pub recording: SessionConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
    #[serde(default)]
    pub feedback: FeedbackConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistenceBackend {
    Memory,
    Supabase,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    pub backend: PersistenceBackend,
    /// Project URL, e.g. https://<project>.supabase.co
    pub url: Option<String>,
    /// Environment variable holding the service key
    pub api_key_env: String,
    pub timeout_secs: u64,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            backend: PersistenceBackend::Memory,
            url: None,
            api_key_env: "SUPABASE_SERVICE_KEY".to_string(),
            timeout_secs: 15,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedbackConfig {
    pub base_url: String,
    pub model: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    pub timeout_secs: u64,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_secs: 60,
        }
    }
}

impl Config {
    /// Load `<path>.toml` (or any format `config` recognizes), then apply
    /// `STAR_STUDIO__SECTION__KEY` environment overrides
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("STAR_STUDIO").separator("__"))
            .build()
            .with_context(|| format!("Failed to load config from {}", path))?;

        Ok(settings.try_deserialize()?)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from_str(contents, config::FileFormat::Toml))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let cfg = Config::from_toml(
            r#"
            [service]
            name = "star-studio"

            [service.http]
            bind = "127.0.0.1"
            port = 8080
            "#,
        )
        .unwrap();

        assert_eq!(cfg.service.http.port, 8080);
        assert_eq!(cfg.persistence.backend, PersistenceBackend::Memory);
        assert_eq!(cfg.feedback.model, "gpt-4o-mini");
        assert_eq!(cfg.recording.tick_interval_ms, 1000);
        assert_eq!(cfg.recording.codec_preferences[0], "video/webm;codecs=vp9");
    }

    #[test]
    fn test_sections_override_defaults() {
        let cfg = Config::from_toml(
            r#"
            [service]
            name = "star-studio"

            [service.http]
            bind = "0.0.0.0"
            port = 3000

            [recording]
            codec_preferences = ["video/mp4"]
            media_dir = "/tmp/star-media"

            [persistence]
            backend = "supabase"
            url = "https://example.supabase.co"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.recording.codec_preferences, vec!["video/mp4".to_string()]);
        assert!(cfg.recording.media_dir.is_some());
        assert_eq!(cfg.persistence.backend, PersistenceBackend::Supabase);
        assert_eq!(cfg.persistence.api_key_env, "SUPABASE_SERVICE_KEY");
    }
}
