use anyhow::Result;
use clap::Args;
use url::Url;

use crate::config::{DEFAULT_LANGFLOW_URL, DEFAULT_OPENWEBUI_URL, DEFAULT_PIPELINE_LANGFLOW_URL};
use crate::util::{Config, color_enabled_stdout, load_config, mask_secret, save_config, sym_check};

#[derive(Args, Debug, Default)]
pub struct ConfigCmd {
    /// Show the stored defaults
    #[arg(long)]
    pub show: bool,
    /// Store the default Langflow URL
    #[arg(long)]
    pub set_langflow_url: Option<String>,
    /// Store the Langflow API token
    #[arg(long)]
    pub set_api_token: Option<String>,
    /// Remove the stored Langflow API token
    #[arg(long)]
    pub unset_api_token: bool,
    /// Store the default OpenWebUI URL
    #[arg(long)]
    pub set_openwebui_url: Option<String>,
    /// Store the OpenWebUI API key
    #[arg(long)]
    pub set_openwebui_api_key: Option<String>,
    /// Store the Langflow URL written into generated pipelines
    #[arg(long)]
    pub set_pipeline_langflow_url: Option<String>,
}

pub fn handle_config(cmd: ConfigCmd) -> Result<()> {
    let mut cfg: Config = load_config().unwrap_or_default();
    let changed = apply(&mut cfg, &cmd)?;
    if changed {
        save_config(&cfg)?;
        println!("{} Saved flowsync config.", sym_check(color_enabled_stdout()));
    }
    if cmd.show || !changed {
        print!("{}", render(&cfg));
    }
    Ok(())
}

/// Apply the `--set-*` flags to `cfg`; returns whether anything changed.
pub fn apply(cfg: &mut Config, cmd: &ConfigCmd) -> Result<bool> {
    let mut changed = false;
    for (flag, value, slot) in [
        ("--set-langflow-url", &cmd.set_langflow_url, &mut cfg.langflow_url),
        ("--set-openwebui-url", &cmd.set_openwebui_url, &mut cfg.openwebui_url),
        ("--set-pipeline-langflow-url", &cmd.set_pipeline_langflow_url, &mut cfg.pipeline_langflow_url),
    ] {
        if let Some(url) = value.as_deref().map(str::trim) {
            if Url::parse(url).is_err() {
                anyhow::bail!("invalid URL for {flag}: '{url}'");
            }
            *slot = Some(url.to_string());
            changed = true;
        }
    }
    for (flag, value, slot) in [
        ("--set-api-token", &cmd.set_api_token, &mut cfg.api_token),
        ("--set-openwebui-api-key", &cmd.set_openwebui_api_key, &mut cfg.openwebui_api_key),
    ] {
        if let Some(secret) = value.as_deref().map(str::trim) {
            if secret.is_empty() {
                anyhow::bail!("{flag} cannot be empty");
            }
            *slot = Some(secret.to_string());
            changed = true;
        }
    }
    if cmd.unset_api_token {
        cfg.api_token = None;
        changed = true;
    }
    Ok(changed)
}

pub fn render(cfg: &Config) -> String {
    let secret = |s: &Option<String>| s.as_deref().map(mask_secret).unwrap_or_else(|| "(not set)".to_string());
    format!(
        "Langflow URL: {}\nLangflow API token: {}\nOpenWebUI URL: {}\nOpenWebUI API key: {}\nPipeline Langflow URL: {}\n",
        cfg.langflow_url.as_deref().unwrap_or(DEFAULT_LANGFLOW_URL),
        secret(&cfg.api_token),
        cfg.openwebui_url.as_deref().unwrap_or(DEFAULT_OPENWEBUI_URL),
        secret(&cfg.openwebui_api_key),
        cfg.pipeline_langflow_url.as_deref().unwrap_or(DEFAULT_PIPELINE_LANGFLOW_URL),
    )
}
