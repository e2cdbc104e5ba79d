//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.kbridge/config.json`) and environment.
//! Environment values win over the file; empty values count as unset.

use crate::channels::{UnfurlMode, DEFAULT_KEYBASE_BINARY};
use crate::normalizer::BotIdentity;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const DEFAULT_BOT_NAME: &str = "hubot";

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Names the bot responds to.
    #[serde(default)]
    pub bot: BotConfig,

    /// Keybase client settings.
    #[serde(default)]
    pub keybase: KeybaseConfig,
}

/// Bot identity. Overridden by HUBOT_NAME / HUBOT_ALIAS env.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotConfig {
    /// Name the bot answers to. Falls back to the Keybase username, then "hubot".
    pub name: Option<String>,
    /// Optional second name (e.g. "!").
    pub alias: Option<String>,
}

/// Keybase settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeybaseConfig {
    /// Account the local keybase service is logged in as. Overridden by KB_USERNAME env.
    pub username: Option<String>,
    /// Path to the keybase binary (default "keybase" on PATH). Overridden by KB_BINARY env.
    pub binary: Option<PathBuf>,
    /// Link preview mode applied once at startup. Overridden by KB_UNFURL_MODE env. Unset leaves the account setting alone.
    pub unfurl_mode: Option<UnfurlMode>,
}

/// Trimmed, non-empty value: env first, then config.
fn pick(env_value: Option<String>, configured: Option<&str>) -> Option<String> {
    env_value
        .and_then(|s| {
            let t = s.trim();
            if t.is_empty() {
                None
            } else {
                Some(t.to_string())
            }
        })
        .or_else(|| {
            configured
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
}

fn env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Resolve the Keybase username: env KB_USERNAME overrides config.
pub fn resolve_keybase_username(config: &Config) -> Option<String> {
    pick(env("KB_USERNAME"), config.keybase.username.as_deref())
}

/// Resolve the bot name: HUBOT_NAME, then config, then Keybase username, then "hubot".
pub fn resolve_bot_name(config: &Config) -> String {
    pick(env("HUBOT_NAME"), config.bot.name.as_deref())
        .or_else(|| resolve_keybase_username(config))
        .unwrap_or_else(|| DEFAULT_BOT_NAME.to_string())
}

/// Resolve the bot alias: env HUBOT_ALIAS overrides config.
pub fn resolve_bot_alias(config: &Config) -> Option<String> {
    pick(env("HUBOT_ALIAS"), config.bot.alias.as_deref())
}

pub fn resolve_bot_identity(config: &Config) -> BotIdentity {
    BotIdentity::new(resolve_bot_name(config), resolve_bot_alias(config))
}

/// Resolve the unfurl mode: env KB_UNFURL_MODE overrides config. An unparsable env value is an error.
pub fn resolve_unfurl_mode(config: &Config) -> Result<Option<UnfurlMode>> {
    match pick(env("KB_UNFURL_MODE"), None) {
        Some(raw) => raw
            .parse::<UnfurlMode>()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("KB_UNFURL_MODE: {}", e)),
        None => Ok(config.keybase.unfurl_mode),
    }
}

/// Resolve the keybase binary: env KB_BINARY overrides config, default "keybase".
pub fn resolve_keybase_binary(config: &Config) -> PathBuf {
    let configured = config
        .keybase
        .binary
        .as_ref()
        .map(|p| p.to_string_lossy().into_owned());
    pick(env("KB_BINARY"), configured.as_deref())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_KEYBASE_BINARY))
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("KBRIDGE_CONFIG_PATH").map(PathBuf::from).unwrap_or_else(|_| {
        dirs::home_dir()
            .map(|h| h.join(".kbridge").join("config.json"))
            .unwrap_or_else(|| PathBuf::from("config.json"))
    })
}

/// Load config from the given path, or the default path (or KBRIDGE_CONFIG_PATH). Missing file => default config.
/// Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn env_value_wins_over_config() {
        assert_eq!(
            pick(Some("marvin".to_string()), Some("hubot")),
            Some("marvin".to_string())
        );
    }

    #[test]
    fn blank_values_count_as_unset() {
        assert_eq!(pick(Some("  ".to_string()), Some(" hubot ")), Some("hubot".to_string()));
        assert_eq!(pick(None, Some("")), None);
        assert_eq!(pick(None, None), None);
    }

    #[test]
    fn config_reads_camel_case_keys() {
        let json = r#"{"bot":{"name":"marvin","alias":"!"},"keybase":{"username":"marvinbot","unfurlMode":"never"}}"#;
        let config: Config = serde_json::from_str(json).expect("parse config");
        assert_eq!(config.bot.name.as_deref(), Some("marvin"));
        assert_eq!(config.bot.alias.as_deref(), Some("!"));
        assert_eq!(config.keybase.username.as_deref(), Some("marvinbot"));
        assert_eq!(config.keybase.unfurl_mode, Some(UnfurlMode::Never));
        assert_eq!(config.keybase.binary, None);
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config: Config = serde_json::from_str("{}").expect("parse empty config");
        assert!(config.bot.name.is_none());
        assert!(config.keybase.unfurl_mode.is_none());
    }

    #[test]
    fn load_config_missing_file_gives_defaults() {
        let path = std::env::temp_dir().join(format!("kbridge-missing-{}.json", uuid::Uuid::new_v4()));
        let (config, used) = load_config(Some(path.clone())).expect("load defaults");
        assert_eq!(used, path);
        assert!(config.bot.name.is_none());
    }

    #[test]
    fn load_config_reports_parse_errors() {
        let path = std::env::temp_dir().join(format!("kbridge-bad-{}.json", uuid::Uuid::new_v4()));
        std::fs::File::create(&path)
            .and_then(|mut f| f.write_all(b"{not json"))
            .expect("write bad config");
        let err = load_config(Some(path.clone())).expect_err("bad config should fail");
        assert!(err.to_string().contains("parsing config"));
        let _ = std::fs::remove_file(path);
    }
}
