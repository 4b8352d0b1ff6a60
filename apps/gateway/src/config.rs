use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use parlor_settings::PromptSuggestion;
use thiserror::Error;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_LOG_FILTER: &str = "info";
const DEFAULT_STATIC_DIR: &str = "apps/gateway/static";
const DEFAULT_APP_NAME: &str = "Parlor";
const DEFAULT_CHANGELOG_PATH: &str = "apps/gateway/changelog.json";
const DEFAULT_RELEASES_URL: &str =
    "https://api.github.com/repos/parlor-chat/parlor/releases/latest";
const DEFAULT_OPENAI_MODELS: &str = "gpt-3.5-turbo,gpt-4";
const DEFAULT_ADMIN_EXPORT_ENABLED: bool = true;
const DEFAULT_MODEL_FILTER_ENABLED: bool = false;

/// Literal fallback served by `GET /api/config` when no locale is configured.
pub const FALLBACK_LOCALE: &str = "en-US";

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub log_filter: String,
    pub static_dir: PathBuf,
    pub app_name: String,
    pub default_locale: Option<String>,
    pub admin_tokens: Vec<String>,
    pub default_models: Option<String>,
    pub default_prompt_suggestions: Vec<PromptSuggestion>,
    pub trusted_email_header: Option<String>,
    pub admin_export_enabled: bool,
    pub model_filter_enabled: bool,
    pub model_filter_list: Vec<String>,
    pub webhook_url: String,
    pub changelog_path: PathBuf,
    pub releases_url: String,
    pub openai_models: Vec<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid PARLOR_BIND_ADDR value '{value}': {source}")]
    InvalidBindAddr {
        value: String,
        source: std::net::AddrParseError,
    },
    #[error("invalid PARLOR_PROMPT_SUGGESTIONS value: {source}")]
    InvalidPromptSuggestions { source: serde_json::Error },
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let bind_addr_raw = env::var("PARLOR_BIND_ADDR")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());

        let bind_addr = bind_addr_raw
            .parse()
            .map_err(|source| ConfigError::InvalidBindAddr {
                value: bind_addr_raw,
                source,
            })?;

        let log_filter = env::var("PARLOR_LOG_FILTER")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

        let static_dir = env::var("PARLOR_STATIC_DIR")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STATIC_DIR));

        let app_name = env::var("PARLOR_APP_NAME")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_APP_NAME.to_string());

        let default_locale = env::var("PARLOR_DEFAULT_LOCALE")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());

        let admin_tokens = parse_csv(env::var("PARLOR_ADMIN_TOKENS").ok().unwrap_or_default());

        let default_models = env::var("PARLOR_DEFAULT_MODELS")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());

        let default_prompt_suggestions = match env::var("PARLOR_PROMPT_SUGGESTIONS")
            .ok()
            .filter(|value| !value.trim().is_empty())
        {
            Some(raw) => serde_json::from_str(&raw)
                .map_err(|source| ConfigError::InvalidPromptSuggestions { source })?,
            None => parlor_settings::default_prompt_suggestions(),
        };

        let trusted_email_header = env::var("PARLOR_TRUSTED_EMAIL_HEADER")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());

        let admin_export_enabled = env::var("PARLOR_ENABLE_ADMIN_EXPORT")
            .ok()
            .map(|value| matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(DEFAULT_ADMIN_EXPORT_ENABLED);

        let model_filter_enabled = env::var("PARLOR_ENABLE_MODEL_FILTER")
            .ok()
            .map(|value| matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(DEFAULT_MODEL_FILTER_ENABLED);

        let model_filter_list =
            parse_csv(env::var("PARLOR_MODEL_FILTER_LIST").ok().unwrap_or_default());

        let webhook_url = env::var("PARLOR_WEBHOOK_URL")
            .ok()
            .map(|value| value.trim().to_string())
            .unwrap_or_default();

        let changelog_path = env::var("PARLOR_CHANGELOG_PATH")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CHANGELOG_PATH));

        let releases_url = env::var("PARLOR_RELEASES_URL")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_RELEASES_URL.to_string());

        let openai_models = {
            let parsed = parse_csv(env::var("PARLOR_OPENAI_MODELS").ok().unwrap_or_default());
            if parsed.is_empty() {
                parse_csv(DEFAULT_OPENAI_MODELS.to_string())
            } else {
                parsed
            }
        };

        Ok(Self {
            bind_addr,
            log_filter,
            static_dir,
            app_name,
            default_locale,
            admin_tokens,
            default_models,
            default_prompt_suggestions,
            trusted_email_header,
            admin_export_enabled,
            model_filter_enabled,
            model_filter_list,
            webhook_url,
            changelog_path,
            releases_url,
            openai_models,
        })
    }
}

#[cfg(test)]
impl Config {
    #[must_use]
    pub fn for_tests(static_dir: PathBuf) -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            log_filter: "debug".to_string(),
            static_dir,
            app_name: DEFAULT_APP_NAME.to_string(),
            default_locale: None,
            admin_tokens: vec!["admin-test-token".to_string()],
            default_models: Some("gpt-4".to_string()),
            default_prompt_suggestions: parlor_settings::default_prompt_suggestions(),
            trusted_email_header: None,
            admin_export_enabled: true,
            model_filter_enabled: false,
            model_filter_list: Vec::new(),
            webhook_url: String::new(),
            changelog_path: PathBuf::from(DEFAULT_CHANGELOG_PATH),
            releases_url: DEFAULT_RELEASES_URL.to_string(),
            openai_models: vec!["gpt-3.5-turbo".to_string(), "gpt-4".to_string()],
        }
    }
}

fn parse_csv(value: String) -> Vec<String> {
    value
        .split(',')
        .map(|segment| segment.trim().to_string())
        .filter(|segment| !segment.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::Config;
    use std::path::PathBuf;

    #[test]
    fn test_fixture_covers_all_config_fields() {
        let config = Config::for_tests(PathBuf::from("."));
        assert_eq!(config.bind_addr.port(), 0);
        assert!(!config.admin_tokens.is_empty());
        assert!(!config.openai_models.is_empty());
        assert_eq!(config.default_prompt_suggestions.len(), 4);
    }

    #[test]
    fn csv_parsing_trims_and_drops_empty_segments() {
        let parsed = super::parse_csv(" gpt-4 , ,gpt-3.5-turbo,".to_string());
        assert_eq!(parsed, vec!["gpt-4".to_string(), "gpt-3.5-turbo".to_string()]);
    }
}
