//! Runtime settings loaded from the environment (`.env` supported)

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::OrchestrationError;
use crate::models::ExecutionMode;
use crate::Result;

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// How the orchestrator picks a mode when neither caller nor plan does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModePreference {
    Fixed(ExecutionMode),
    /// Let the classifier decide from the query
    Auto,
}

impl FromStr for ModePreference {
    type Err = OrchestrationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("auto") {
            return Ok(ModePreference::Auto);
        }
        s.parse::<ExecutionMode>()
            .map(ModePreference::Fixed)
            .map_err(|_| OrchestrationError::ConfigError(format!("EXECUTION_MODE '{}' is invalid", s)))
    }
}

#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub max_retries: u32,
    pub retry_backoff: Duration,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            temperature: 0.3,
            max_output_tokens: 2048,
            max_retries: 0,
            retry_backoff: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub llm: LlmSettings,
    pub specialist_timeout: Duration,
    pub supplementary_timeout: Duration,
    pub mode: ModePreference,
    pub enable_synthesis: bool,
    pub database_url: Option<String>,
    pub port: u16,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            llm: LlmSettings::default(),
            specialist_timeout: Duration::from_secs(60),
            supplementary_timeout: Duration::from_secs(5),
            mode: ModePreference::Fixed(ExecutionMode::Parallel),
            enable_synthesis: true,
            database_url: None,
            port: 8080,
        }
    }
}

impl Settings {
    /// Read settings from process environment, falling back to defaults
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`Settings::from_env`] but with an injectable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Settings::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let llm = LlmSettings {
            api_key: get("GEMINI_API_KEY").unwrap_or_default(),
            model: get("GEMINI_MODEL").unwrap_or(defaults.llm.model),
            base_url: get("GEMINI_BASE_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or(defaults.llm.base_url),
            temperature: parse_or(get("LLM_TEMPERATURE"), "LLM_TEMPERATURE", defaults.llm.temperature)?,
            max_output_tokens: parse_or(
                get("LLM_MAX_OUTPUT_TOKENS"),
                "LLM_MAX_OUTPUT_TOKENS",
                defaults.llm.max_output_tokens,
            )?,
            max_retries: parse_or(get("LLM_MAX_RETRIES"), "LLM_MAX_RETRIES", defaults.llm.max_retries)?,
            retry_backoff: Duration::from_millis(parse_or(
                get("LLM_RETRY_BACKOFF_MS"),
                "LLM_RETRY_BACKOFF_MS",
                defaults.llm.retry_backoff.as_millis() as u64,
            )?),
        };

        let mode = match get("EXECUTION_MODE") {
            Some(raw) => raw.parse()?,
            None => defaults.mode,
        };

        let port = match get("PORT").or_else(|| get("API_PORT")) {
            Some(raw) => parse_value(&raw, "PORT")?,
            None => defaults.port,
        };

        Ok(Self {
            llm,
            specialist_timeout: Duration::from_secs(parse_or(
                get("SPECIALIST_TIMEOUT_SECS"),
                "SPECIALIST_TIMEOUT_SECS",
                defaults.specialist_timeout.as_secs(),
            )?),
            supplementary_timeout: Duration::from_secs(parse_or(
                get("SUPPLEMENTARY_TIMEOUT_SECS"),
                "SUPPLEMENTARY_TIMEOUT_SECS",
                defaults.supplementary_timeout.as_secs(),
            )?),
            mode,
            enable_synthesis: parse_or(get("ENABLE_SYNTHESIS"), "ENABLE_SYNTHESIS", defaults.enable_synthesis)?,
            database_url: get("DATABASE_URL").or_else(|| get("POSTGRES_URL")),
            port,
        })
    }

    pub fn has_api_key(&self) -> bool {
        !self.llm.api_key.is_empty()
    }
}

fn parse_or<T: FromStr>(raw: Option<String>, key: &str, default: T) -> Result<T> {
    match raw {
        Some(v) => parse_value(&v, key),
        None => Ok(default),
    }
}

fn parse_value<T: FromStr>(raw: &str, key: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| OrchestrationError::ConfigError(format!("{} has invalid value '{}'", key, raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let settings = Settings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(settings.llm.model, DEFAULT_MODEL);
        assert_eq!(settings.llm.max_retries, 0);
        assert_eq!(settings.mode, ModePreference::Fixed(ExecutionMode::Parallel));
        assert_eq!(settings.port, 8080);
        assert!(settings.enable_synthesis);
        assert!(!settings.has_api_key());
    }

    #[test]
    fn test_overrides() {
        let settings = Settings::from_lookup(lookup(&[
            ("GEMINI_API_KEY", "abc"),
            ("GEMINI_BASE_URL", "http://localhost:9999/models/"),
            ("EXECUTION_MODE", "auto"),
            ("SPECIALIST_TIMEOUT_SECS", "5"),
            ("LLM_MAX_RETRIES", "2"),
            ("API_PORT", "9000"),
            ("ENABLE_SYNTHESIS", "false"),
            ("POSTGRES_URL", "postgres://localhost/insights"),
        ]))
        .unwrap();

        assert!(settings.has_api_key());
        assert_eq!(settings.llm.base_url, "http://localhost:9999/models");
        assert_eq!(settings.mode, ModePreference::Auto);
        assert_eq!(settings.specialist_timeout, Duration::from_secs(5));
        assert_eq!(settings.llm.max_retries, 2);
        assert_eq!(settings.port, 9000);
        assert!(!settings.enable_synthesis);
        assert_eq!(settings.database_url.as_deref(), Some("postgres://localhost/insights"));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(Settings::from_lookup(lookup(&[("PORT", "eighty")])).is_err());
        assert!(Settings::from_lookup(lookup(&[("EXECUTION_MODE", "sideways")])).is_err());
    }
}
