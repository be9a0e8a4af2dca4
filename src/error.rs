use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

/// Failure of a single call against a remote HTTP API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned {status}{}", detail_suffix(.detail))]
    Status {
        status: StatusCode,
        url: String,
        detail: Option<String>,
    },

    #[error("could not decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail.as_deref().map(|d| format!(": {d}")).unwrap_or_default()
}

impl ApiError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Why one flow file could not be pushed. Parse failures stay distinct from
/// transport failures even though both are skipped the same way.
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("flow file {} does not exist", .0.display())]
    MissingFile(PathBuf),

    #[error("could not read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("flow document {} is not a JSON object", .0.display())]
    NotAnObject(PathBuf),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl FlowError {
    pub fn is_parse_error(&self) -> bool {
        matches!(self, FlowError::Parse { .. } | FlowError::NotAnObject(_))
    }
}

#[derive(Debug, Error)]
pub enum DetectError {
    #[error("git executable not found in PATH: {0}")]
    GitMissing(#[source] which::Error),

    #[error("failed to run git in {}: {source}", repo.display())]
    Spawn {
        repo: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("git diff {range} failed ({code}): {stderr}")]
    Failed {
        range: String,
        code: String,
        stderr: String,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{field} is required")]
    Missing { field: &'static str },

    #[error("{field} is not a valid URL ({value}): {source}")]
    InvalidUrl {
        field: &'static str,
        value: String,
        #[source]
        source: url::ParseError,
    },

    #[error("repository path {} does not exist", .0.display())]
    RepoMissing(PathBuf),

    #[error("{} is not a git repository", .0.display())]
    NotARepository(PathBuf),

    #[error("{field} is required when OpenWebUI publishing is enabled")]
    PublisherMissing { field: &'static str },

    #[error("pipeline template {} does not exist", .0.display())]
    TemplateMissing(PathBuf),
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("could not write pipeline {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Api(#[from] ApiError),
}
