//! Generates an OpenWebUI pipeline per synced flow and uploads it.
//!
//! This stage only consumes what the flow reconciler produced; it never
//! touches Langflow itself.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tempfile::TempDir;
use tracing::{debug, error, info, warn};

use crate::error::{ApiError, PublishError};
use crate::paths::flow_name_from_path;
use crate::reconcile::ProcessedFlows;
use crate::remote::RemoteFlow;

pub const ENDPOINT_PLACEHOLDER: &str = "ENDPOINT_PLACEHOLDER";
pub const FLOW_NAME_PLACEHOLDER: &str = "FLOW_NAME_PLACEHOLDER";
pub const LANGFLOW_URL_PLACEHOLDER: &str = "VALVE_LANGFLOW_API_URL_PLACEHOLDER";

const DEFAULT_TEMPLATE: &str = include_str!("templates/pipeline.py");

static ENDPOINT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"ENDPOINT\s*(?::\s*\w+\s*)?=\s*["']([^"']+)["']"#).expect("endpoint regex")
});

/// A pipeline as listed by OpenWebUI.
#[derive(Debug, Clone, Deserialize)]
pub struct Pipeline {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub filepath: Option<String>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

pub trait PipelineApi {
    fn list_pipelines(&self) -> Result<Vec<Pipeline>, ApiError>;
    fn upload_pipeline(&self, file: &Path) -> Result<(), PublishError>;
    fn delete_pipeline(&self, id: &str) -> Result<(), ApiError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowEndpoint {
    pub endpoint: String,
    pub display_name: String,
}

/// Endpoint and display name of a flow. Missing names fall back to the file
/// stem of `path`, missing endpoints to the snake-cased display name.
pub fn flow_endpoint(flow: &RemoteFlow, path: Option<&str>) -> FlowEndpoint {
    let display_name = if !flow.name.is_empty() {
        flow.name.clone()
    } else if let Some(p) = path {
        flow_name_from_path(p)
    } else {
        flow.id.clone()
    };
    let endpoint = match flow.endpoint_name.as_deref().filter(|e| !e.is_empty()) {
        Some(e) => e.to_string(),
        None => {
            let fallback = display_name.to_lowercase().replace(' ', "_");
            warn!("flow '{display_name}' has no endpoint name, using '{fallback}'");
            fallback
        }
    };
    FlowEndpoint { endpoint, display_name }
}

/// `My Flow-v2` -> `my_flow_v2.py`.
pub fn pipeline_file_name(display_name: &str) -> String {
    let stem: String = display_name
        .to_lowercase()
        .replace([' ', '-'], "_")
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .collect();
    let stem = if stem.is_empty() { "default_pipeline".to_string() } else { stem };
    format!("{stem}.py")
}

/// Endpoint a generated pipeline calls, read back from its source.
pub fn extract_endpoint(source: &str) -> Option<String> {
    ENDPOINT_RE.captures(source).map(|c| c[1].to_string())
}

pub struct PipelineTemplate {
    source: String,
}

impl PipelineTemplate {
    pub fn builtin() -> Self {
        Self { source: DEFAULT_TEMPLATE.to_string() }
    }

    /// Template from `path`, or the built-in one when no path is given or the
    /// file cannot be read.
    pub fn load(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            debug!("using built-in pipeline template");
            return Self::builtin();
        };
        match std::fs::read_to_string(path) {
            Ok(source) => {
                info!("loaded pipeline template from {}", path.display());
                Self { source }
            }
            Err(e) => {
                warn!("could not read pipeline template {}: {e}; using built-in template", path.display());
                Self::builtin()
            }
        }
    }

    pub fn render(&self, values: &BTreeMap<&'static str, String>) -> String {
        values
            .iter()
            .fold(self.source.clone(), |acc, (placeholder, value)| acc.replace(placeholder, value))
    }
}

/// Escape `value` for use inside a quoted Python string literal.
pub fn python_string_escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out
}

/// Placeholder values, escaped: the template embeds them in string literals.
pub fn substitutions(endpoint: &FlowEndpoint, langflow_url: &str) -> BTreeMap<&'static str, String> {
    BTreeMap::from([
        (ENDPOINT_PLACEHOLDER, python_string_escape(&endpoint.endpoint)),
        (FLOW_NAME_PLACEHOLDER, python_string_escape(&endpoint.display_name)),
        (LANGFLOW_URL_PLACEHOLDER, python_string_escape(langflow_url)),
    ])
}

pub struct Publisher<'a, P: PipelineApi> {
    api: &'a P,
    template: PipelineTemplate,
    langflow_url: String,
    workdir: TempDir,
}

impl<'a, P: PipelineApi> Publisher<'a, P> {
    pub fn new(api: &'a P, template: PipelineTemplate, langflow_url: impl Into<String>) -> Result<Self> {
        let workdir = tempfile::Builder::new()
            .prefix("flowsync-pipelines")
            .tempdir()
            .context("create pipeline work directory")?;
        Ok(Self { api, template, langflow_url: langflow_url.into(), workdir })
    }

    /// Render the pipeline for `endpoint` into the work directory.
    pub fn generate(&self, endpoint: &FlowEndpoint) -> Result<PathBuf, PublishError> {
        let source = self.template.render(&substitutions(endpoint, &self.langflow_url));
        let path = self.workdir.path().join(pipeline_file_name(&endpoint.display_name));
        std::fs::write(&path, source).map_err(|source| PublishError::Io { path: path.clone(), source })?;
        debug!("generated pipeline {}", path.display());
        Ok(path)
    }

    pub fn publish(&self, flow: &RemoteFlow, path: Option<&str>) -> Result<PathBuf, PublishError> {
        let endpoint = flow_endpoint(flow, path);
        info!("publishing pipeline for '{}' (endpoint: {})", endpoint.display_name, endpoint.endpoint);
        let file = self.generate(&endpoint)?;
        self.api.upload_pipeline(&file)?;
        Ok(file)
    }

    /// Publish a pipeline for every processed flow. Returns how many uploads
    /// succeeded.
    pub fn publish_all(&self, processed: &ProcessedFlows, flow_paths: &[String]) -> usize {
        let pb = ProgressBar::new_spinner();
        pb.set_style(ProgressStyle::with_template("{spinner} {msg}").unwrap_or_else(|_| ProgressStyle::default_spinner()));
        pb.enable_steady_tick(Duration::from_millis(80));

        let mut uploaded = 0;
        for (id, flow) in processed {
            let path = flow_paths.iter().find(|p| flow_name_from_path(p) == flow.name).map(String::as_str);
            if path.is_none() {
                warn!(id = %id, "no changed path matches flow '{}'", flow.name);
            }
            pb.set_message(format!("uploading pipeline for {}", flow.name));
            match self.publish(flow, path) {
                Ok(file) => {
                    debug!(id = %id, "uploaded {}", file.display());
                    uploaded += 1;
                }
                Err(e) => error!(id = %id, "failed to publish pipeline for '{}': {e}", flow.name),
            }
        }
        pb.finish_and_clear();
        uploaded
    }

    /// Delete pipelines whose endpoint is not in `live`. Pipelines whose
    /// endpoint cannot be determined are kept.
    pub fn prune_unused(&self, live: &HashSet<String>) -> Vec<String> {
        let pipelines = match self.api.list_pipelines() {
            Ok(p) => p,
            Err(e) => {
                error!("could not list pipelines: {e}");
                return Vec::new();
            }
        };
        if pipelines.is_empty() {
            info!("no pipelines found");
        }

        let mut deleted = Vec::new();
        for pipeline in pipelines {
            let Some(endpoint) = pipeline_endpoint(&pipeline) else {
                debug!(id = %pipeline.id, "no endpoint found, keeping pipeline");
                continue;
            };
            if live.contains(&endpoint) {
                continue;
            }
            let name = pipeline.name.clone().unwrap_or_else(|| pipeline.id.clone());
            info!("deleting pipeline '{name}' (unused endpoint '{endpoint}')");
            match self.api.delete_pipeline(&pipeline.id) {
                Ok(()) => deleted.push(format!("{name} (endpoint: {endpoint})")),
                Err(e) => error!(id = %pipeline.id, "failed to delete pipeline: {e}"),
            }
        }
        deleted
    }
}

/// Endpoint from the pipeline's source file when readable, else from its
/// metadata.
fn pipeline_endpoint(pipeline: &Pipeline) -> Option<String> {
    let from_file = pipeline.filepath.as_deref().and_then(|f| match std::fs::read_to_string(f) {
        Ok(source) => extract_endpoint(&source),
        Err(e) => {
            debug!("cannot read pipeline file {f}: {e}");
            None
        }
    });
    from_file.or_else(|| {
        pipeline
            .metadata
            .as_ref()
            .and_then(|m| m.get("endpoint"))
            .and_then(Value::as_str)
            .map(str::to_string)
    })
}
