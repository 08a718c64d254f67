//! Client configuration.
//!
//! Provides `ChatConfig`, loaded from defaults, a JSON file, or environment
//! variables, and validated before use.

use std::collections::HashMap;
use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sync::BackoffPolicy;
use crate::util::normalize_text_option;

const DEFAULT_COLLECTION_ROOT: &str = "chats";
const DEFAULT_TYPING_TIMEOUT_MS: u64 = 1500;
const DEFAULT_RETRY_INITIAL_MS: u64 = 500;
const DEFAULT_RETRY_MAX_MS: u64 = 30_000;
const DEFAULT_BOTTOM_THRESHOLD_PX: f32 = 24.0;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Tunables of the sync engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChatConfig {
    /// Root of the per-conversation collections
    pub collection_root: String,
    pub typing_timeout_ms: u64,
    pub retry_initial_ms: u64,
    pub retry_max_ms: u64,
    /// Distance from the end of the list that still counts as "at bottom"
    pub bottom_threshold_px: f32,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            collection_root: DEFAULT_COLLECTION_ROOT.to_string(),
            typing_timeout_ms: DEFAULT_TYPING_TIMEOUT_MS,
            retry_initial_ms: DEFAULT_RETRY_INITIAL_MS,
            retry_max_ms: DEFAULT_RETRY_MAX_MS,
            bottom_threshold_px: DEFAULT_BOTTOM_THRESHOLD_PX,
        }
    }
}

impl ChatConfig {
    /// Defaults overridden by `DUET_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            collection_root: normalize_text_option(lookup("DUET_COLLECTION_ROOT"))
                .unwrap_or(defaults.collection_root),
            typing_timeout_ms: parse_or(
                &lookup,
                "DUET_TYPING_TIMEOUT_MS",
                defaults.typing_timeout_ms,
            )?,
            retry_initial_ms: parse_or(&lookup, "DUET_RETRY_INITIAL_MS", defaults.retry_initial_ms)?,
            retry_max_ms: parse_or(&lookup, "DUET_RETRY_MAX_MS", defaults.retry_max_ms)?,
            bottom_threshold_px: parse_or(
                &lookup,
                "DUET_BOTTOM_THRESHOLD_PX",
                defaults.bottom_threshold_px,
            )?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let root = self.collection_root.trim();
        if root.is_empty() || root.contains('/') {
            return Err(ConfigError::Invalid(
                "collection_root must be a single non-empty path segment".to_string(),
            ));
        }
        if self.typing_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "typing_timeout_ms must be greater than 0".to_string(),
            ));
        }
        if self.retry_initial_ms == 0 {
            return Err(ConfigError::Invalid(
                "retry_initial_ms must be greater than 0".to_string(),
            ));
        }
        if self.retry_max_ms < self.retry_initial_ms {
            return Err(ConfigError::Invalid(
                "retry_max_ms must not be less than retry_initial_ms".to_string(),
            ));
        }
        if !self.bottom_threshold_px.is_finite() || self.bottom_threshold_px < 0.0 {
            return Err(ConfigError::Invalid(
                "bottom_threshold_px must be a non-negative number".to_string(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub const fn typing_timeout(&self) -> Duration {
        Duration::from_millis(self.typing_timeout_ms)
    }

    #[must_use]
    pub fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy::new(
            Duration::from_millis(self.retry_initial_ms),
            Duration::from_millis(self.retry_max_ms),
        )
    }
}

/// Parse and validate a JSON configuration document.
pub fn parse_config(payload: &str) -> Result<ChatConfig, ConfigError> {
    let config: ChatConfig = serde_json::from_str(payload)
        .map_err(|error| ConfigError::Invalid(format!("invalid config JSON: {error}")))?;
    config.validate()?;
    Ok(config)
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> Result<T, ConfigError> {
    match normalize_text_option(lookup(name)) {
        Some(raw) => raw
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("{name} has invalid value '{raw}'"))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let values: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| values.get(name).cloned()
    }

    #[test]
    fn defaults_are_valid() {
        let config = ChatConfig::default();
        config.validate().unwrap();
        assert_eq!(config.typing_timeout(), Duration::from_millis(1500));
        assert_eq!(config.backoff().delay_for(1), Duration::from_millis(500));
    }

    #[test]
    fn env_overrides_defaults() {
        let config = ChatConfig::from_lookup(lookup_from(&[
            ("DUET_COLLECTION_ROOT", " rooms "),
            ("DUET_TYPING_TIMEOUT_MS", "900"),
            ("DUET_BOTTOM_THRESHOLD_PX", "12.5"),
        ]))
        .unwrap();
        assert_eq!(config.collection_root, "rooms");
        assert_eq!(config.typing_timeout_ms, 900);
        assert!((config.bottom_threshold_px - 12.5).abs() < f32::EPSILON);
        assert_eq!(config.retry_max_ms, DEFAULT_RETRY_MAX_MS);
    }

    #[test]
    fn env_rejects_garbage_numbers() {
        let error =
            ChatConfig::from_lookup(lookup_from(&[("DUET_RETRY_MAX_MS", "soon")])).unwrap_err();
        assert!(error.to_string().contains("DUET_RETRY_MAX_MS"));
    }

    #[test]
    fn parse_config_fills_missing_fields() {
        let config = parse_config(r#"{ "typing_timeout_ms": 2000 }"#).unwrap();
        assert_eq!(config.typing_timeout_ms, 2000);
        assert_eq!(config.collection_root, "chats");
    }

    #[test]
    fn parse_config_rejects_unknown_fields() {
        let error = parse_config(r#"{ "typing_timeout": 2000 }"#).unwrap_err();
        assert!(error.to_string().contains("unknown field"));
    }

    #[test]
    fn validation_catches_inverted_backoff() {
        let config = ChatConfig {
            retry_initial_ms: 1000,
            retry_max_ms: 10,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validation_rejects_nested_root() {
        let config = ChatConfig {
            collection_root: "a/b".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
