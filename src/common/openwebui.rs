use std::path::Path;

use anyhow::Result;
use reqwest::blocking::Client;
use reqwest::blocking::multipart::Form;
use tracing::debug;

use super::network::{check_response, decode, default_client, join_url, transport};
use crate::config::OpenWebUiSettings;
use crate::error::{ApiError, PublishError};
use crate::publisher::{Pipeline, PipelineApi};

const PIPELINES_PATH: &str = "api/v1/pipelines";

/// Blocking client for the OpenWebUI pipelines API.
pub struct OpenWebUiClient {
    http: Client,
    base_url: String,
    url_idx: u32,
}

impl OpenWebUiClient {
    pub fn new(settings: &OpenWebUiSettings) -> Result<Self> {
        let http = default_client(Some(&settings.api_key), settings.timeout)?;
        Ok(Self::with_client(http, &settings.url))
    }

    pub fn with_client(http: Client, base_url: &str) -> Self {
        Self { http, base_url: base_url.trim_end_matches('/').to_string(), url_idx: 1 }
    }
}

impl PipelineApi for OpenWebUiClient {
    fn list_pipelines(&self) -> Result<Vec<Pipeline>, ApiError> {
        let url = join_url(&self.base_url, PIPELINES_PATH);
        debug!("GET {url}");
        let resp = self.http.get(&url).send().map_err(transport(&url))?;
        let pipelines: Option<Vec<Pipeline>> = decode(check_response(resp)?)?;
        Ok(pipelines.unwrap_or_default())
    }

    fn upload_pipeline(&self, file: &Path) -> Result<(), PublishError> {
        let url = join_url(&self.base_url, &format!("{PIPELINES_PATH}/upload"));
        let form = Form::new()
            .text("urlIdx", self.url_idx.to_string())
            .file("file", file)
            .map_err(|source| PublishError::Io { path: file.to_path_buf(), source })?;
        debug!("POST {url} ({})", file.display());
        let resp = self.http.post(&url).multipart(form).send().map_err(transport(&url))?;
        check_response(resp)?;
        Ok(())
    }

    fn delete_pipeline(&self, id: &str) -> Result<(), ApiError> {
        let url = join_url(&self.base_url, &format!("{PIPELINES_PATH}/{id}"));
        debug!("DELETE {url}");
        let resp = self.http.delete(&url).send().map_err(transport(&url))?;
        check_response(resp).map(|_| ())
    }
}
