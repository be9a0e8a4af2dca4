use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use url::Url;

use crate::error::ConfigError;
use crate::util::{Config, first_non_empty, mask_secret};

pub const DEFAULT_LANGFLOW_URL: &str = "http://localhost:7860";
pub const DEFAULT_OPENWEBUI_URL: &str = "http://localhost:3000";
pub const DEFAULT_PIPELINE_LANGFLOW_URL: &str = "http://langflow:7860";

#[derive(Args, Debug, Clone, Default)]
pub struct LangflowArgs {
    /// URL of the Langflow instance
    #[arg(long, env = "LANGFLOW_URL")]
    pub langflow_url: Option<String>,
    /// API token for Langflow
    #[arg(long, env = "LANGFLOW_API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,
    /// Per-request timeout in seconds (none by default)
    #[arg(long, env = "FLOWSYNC_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,
}

#[derive(Args, Debug, Clone)]
pub struct RepoArgs {
    /// Path to the local git repository
    #[arg(long, env = "REPO_PATH", default_value = ".")]
    pub repo_path: PathBuf,
    /// Reference commit to diff from
    #[arg(long, env = "BEFORE_COMMIT")]
    pub before_commit: String,
    /// Reference commit to diff to
    #[arg(long, env = "AFTER_COMMIT")]
    pub after_commit: String,
}

#[derive(Args, Debug, Clone, Default)]
pub struct PipelineArgs {
    /// Publish an OpenWebUI pipeline for every synced flow
    #[arg(long, env = "ENABLE_OPENWEBUI")]
    pub enable_openwebui: bool,
    /// URL of the OpenWebUI instance
    #[arg(long, env = "OPENWEBUI_URL")]
    pub openwebui_url: Option<String>,
    /// API key for OpenWebUI
    #[arg(long, env = "OPENWEBUI_API_KEY", hide_env_values = true)]
    pub openwebui_api_key: Option<String>,
    /// Custom pipeline template
    #[arg(long, env = "OPENWEBUI_TEMPLATE_PATH")]
    pub openwebui_template_path: Option<PathBuf>,
    /// Langflow URL the generated pipelines call
    #[arg(long, env = "VALVE_LANGFLOW_API_URL")]
    pub pipeline_langflow_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LangflowSettings {
    pub url: String,
    pub api_token: Option<String>,
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct RepoSettings {
    pub path: PathBuf,
    pub before: String,
    pub after: String,
}

#[derive(Debug, Clone)]
pub struct OpenWebUiSettings {
    pub url: String,
    pub api_key: String,
    pub template_path: Option<PathBuf>,
    pub langflow_url: String,
    pub timeout: Option<Duration>,
}

fn check_url(field: &'static str, value: &str) -> Result<(), ConfigError> {
    Url::parse(value).map(|_| ()).map_err(|source| ConfigError::InvalidUrl { field, value: value.to_string(), source })
}

impl LangflowSettings {
    pub fn resolve(args: &LangflowArgs, stored: &Config) -> Result<Self, ConfigError> {
        let url = first_non_empty([args.langflow_url.as_deref(), stored.langflow_url.as_deref(), Some(DEFAULT_LANGFLOW_URL)])
            .ok_or(ConfigError::Missing { field: "langflow_url" })?;
        check_url("langflow_url", &url)?;
        Ok(Self {
            url,
            api_token: first_non_empty([args.api_token.as_deref(), stored.api_token.as_deref()]),
            timeout: args.timeout_secs.filter(|s| *s > 0).map(Duration::from_secs),
        })
    }
}

impl RepoSettings {
    pub fn resolve(args: &RepoArgs) -> Result<Self, ConfigError> {
        let before = first_non_empty([Some(args.before_commit.as_str())]).ok_or(ConfigError::Missing { field: "before_commit" })?;
        let after = first_non_empty([Some(args.after_commit.as_str())]).ok_or(ConfigError::Missing { field: "after_commit" })?;
        let path = args.repo_path.clone();
        if !path.exists() {
            return Err(ConfigError::RepoMissing(path));
        }
        // `.git` is a directory in a plain clone and a file in a worktree
        if !path.join(".git").exists() {
            return Err(ConfigError::NotARepository(path));
        }
        Ok(Self { path, before, after })
    }
}

impl OpenWebUiSettings {
    /// Settings for the pipeline publisher, or `None` when it is disabled and
    /// not `forced`.
    pub fn resolve(args: &PipelineArgs, stored: &Config, timeout: Option<Duration>, forced: bool) -> Result<Option<Self>, ConfigError> {
        if !(args.enable_openwebui || forced) {
            return Ok(None);
        }
        let url = first_non_empty([args.openwebui_url.as_deref(), stored.openwebui_url.as_deref(), Some(DEFAULT_OPENWEBUI_URL)])
            .ok_or(ConfigError::PublisherMissing { field: "openwebui_url" })?;
        check_url("openwebui_url", &url)?;
        let api_key = first_non_empty([args.openwebui_api_key.as_deref(), stored.openwebui_api_key.as_deref()])
            .ok_or(ConfigError::PublisherMissing { field: "openwebui_api_key" })?;
        if let Some(t) = args.openwebui_template_path.as_ref() {
            if !t.exists() {
                return Err(ConfigError::TemplateMissing(t.clone()));
            }
        }
        let langflow_url = first_non_empty([
            args.pipeline_langflow_url.as_deref(),
            stored.pipeline_langflow_url.as_deref(),
            Some(DEFAULT_PIPELINE_LANGFLOW_URL),
        ])
        .unwrap_or_else(|| DEFAULT_PIPELINE_LANGFLOW_URL.to_string());
        Ok(Some(Self { url, api_key, template_path: args.openwebui_template_path.clone(), langflow_url, timeout }))
    }
}

/// Everything `flowsync sync` needs, validated.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub langflow: LangflowSettings,
    pub repo: RepoSettings,
    pub openwebui: Option<OpenWebUiSettings>,
}

impl SyncConfig {
    pub fn resolve(langflow: &LangflowArgs, repo: &RepoArgs, pipelines: &PipelineArgs, stored: &Config) -> Result<Self, ConfigError> {
        let langflow = LangflowSettings::resolve(langflow, stored)?;
        let repo = RepoSettings::resolve(repo)?;
        let openwebui = OpenWebUiSettings::resolve(pipelines, stored, langflow.timeout, false)?;
        Ok(Self { langflow, repo, openwebui })
    }
}

/// Log-safe rendering: secrets are masked.
impl fmt::Display for SyncConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  Langflow URL: {}", self.langflow.url)?;
        writeln!(f, "  API token: {}", self.langflow.api_token.as_deref().map(mask_secret).unwrap_or_else(|| "(none)".into()))?;
        writeln!(f, "  Repository: {}", self.repo.path.display())?;
        writeln!(f, "  Range: {}..{}", self.repo.before, self.repo.after)?;
        match &self.openwebui {
            Some(o) => {
                writeln!(f, "  OpenWebUI URL: {}", o.url)?;
                writeln!(f, "  OpenWebUI API key: {}", mask_secret(&o.api_key))?;
                writeln!(
                    f,
                    "  Pipeline template: {}",
                    o.template_path.as_ref().map(|p| p.display().to_string()).unwrap_or_else(|| "(built-in)".into())
                )?;
                write!(f, "  Pipeline Langflow URL: {}", o.langflow_url)
            }
            None => write!(f, "  OpenWebUI: disabled"),
        }
    }
}
