use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use serde::{Deserialize, Serialize};
use supports_color::Stream;

/// Defaults persisted in the user's config directory (`flowsync config`).
/// Flags and environment variables take precedence over these.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub langflow_url: Option<String>,
    pub api_token: Option<String>,
    pub openwebui_url: Option<String>,
    pub openwebui_api_key: Option<String>,
    /// Langflow URL written into generated pipelines
    #[serde(default)]
    pub pipeline_langflow_url: Option<String>,
}

pub fn load_config() -> Result<Config> {
    let cfg: Config = confy::load("flowsync", None).context("failed to load config")?;
    Ok(cfg)
}

pub fn save_config(cfg: &Config) -> Result<()> {
    confy::store("flowsync", None, cfg).context("failed to save config")?;
    Ok(())
}

/// First non-blank value, trimmed.
pub fn first_non_empty<'a>(candidates: impl IntoIterator<Item = Option<&'a str>>) -> Option<String> {
    candidates
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// `abcdef1234` -> `abcdef12...`
pub fn mask_secret(secret: &str) -> String {
    if secret.len() > 8 {
        format!("{}...", secret.chars().take(8).collect::<String>())
    } else {
        "***".to_string()
    }
}

pub fn color_enabled_stdout() -> bool {
    supports_color::on(Stream::Stdout).is_some()
}

pub fn color_enabled_stderr() -> bool {
    supports_color::on(Stream::Stderr).is_some()
}

pub fn sym_check(enabled: bool) -> String {
    if enabled { format!("{}", "✔".green().bold()) } else { "✔".to_string() }
}

pub fn sym_cross(enabled: bool) -> String {
    if enabled { format!("{}", "✖".red().bold()) } else { "x".to_string() }
}

pub fn sym_gear(enabled: bool) -> String {
    if enabled { format!("{}", "⚙".blue().bold()) } else { "⚙".to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_first_non_blank_candidate() {
        assert_eq!(first_non_empty([None, Some("  "), Some(" b "), Some("c")]).as_deref(), Some("b"));
        assert_eq!(first_non_empty([None, Some("")]), None);
    }

    #[test]
    fn masks_secrets() {
        assert_eq!(mask_secret("abcdefghijkl"), "abcdefgh...");
        assert_eq!(mask_secret("short"), "***");
    }

    #[test]
    fn plain_symbols_without_color() {
        assert_eq!(sym_check(false), "✔");
        assert_eq!(sym_cross(false), "x");
    }
}
