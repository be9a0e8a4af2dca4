use anyhow::Result;
use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::network::{check_response, decode, default_client, join_url, transport};
use crate::config::LangflowSettings;
use crate::error::ApiError;
use crate::remote::{FlowApi, FolderApi, FolderDetail, FolderUpdate, NewFolder, RemoteFlow, RemoteFolder};

const FLOWS_PATH: &str = "api/v1/flows/";
const FOLDERS_PATH: &str = "api/v1/folders/";

/// Query used to list every user flow in one page.
const LIST_FLOWS_QUERY: [(&str, &str); 6] = [
    ("remove_example_flows", "true"),
    ("components_only", "false"),
    ("get_all", "true"),
    ("header_flows", "false"),
    ("page", "1"),
    ("size", "50"),
];

/// Blocking client for the Langflow REST API.
pub struct LangflowClient {
    http: Client,
    base_url: String,
}

/// Langflow answers a flow listing either with a bare array or, when
/// paginated, with `{ "items": [...] }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum FlowListing {
    List(Vec<RemoteFlow>),
    Page { items: Vec<RemoteFlow> },
}

impl LangflowClient {
    pub fn new(settings: &LangflowSettings) -> Result<Self> {
        let http = default_client(settings.api_token.as_deref(), settings.timeout)?;
        Ok(Self::with_client(http, &settings.url))
    }

    pub fn with_client(http: Client, base_url: &str) -> Self {
        Self { http, base_url: base_url.trim_end_matches('/').to_string() }
    }

    fn url(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    fn item_url(&self, collection: &str, id: &str) -> String {
        self.url(&format!("{collection}{id}"))
    }

    fn get_optional(&self, url: &str) -> Result<Option<Response>, ApiError> {
        debug!("GET {url}");
        let resp = self.http.get(url).send().map_err(transport(url))?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        check_response(resp).map(Some)
    }

    fn delete(&self, url: &str) -> Result<(), ApiError> {
        debug!("DELETE {url}");
        let resp = self.http.delete(url).send().map_err(transport(url))?;
        check_response(resp).map(|_| ())
    }
}

impl FlowApi for LangflowClient {
    fn list_flows(&self) -> Result<Vec<RemoteFlow>, ApiError> {
        let url = self.url(FLOWS_PATH);
        debug!("GET {url}");
        let resp = self.http.get(&url).query(&LIST_FLOWS_QUERY).send().map_err(transport(&url))?;
        let listing: Option<FlowListing> = decode(check_response(resp)?)?;
        Ok(match listing {
            Some(FlowListing::List(flows)) | Some(FlowListing::Page { items: flows }) => flows,
            None => Vec::new(),
        })
    }

    fn get_flow(&self, id: &str) -> Result<Option<RemoteFlow>, ApiError> {
        match self.get_optional(&self.item_url(FLOWS_PATH, id))? {
            Some(resp) => decode(resp),
            None => Ok(None),
        }
    }

    fn create_flow(&self, body: &Value) -> Result<RemoteFlow, ApiError> {
        let url = self.url(FLOWS_PATH);
        debug!("POST {url}");
        let resp = self.http.post(&url).json(body).send().map_err(transport(&url))?;
        decode(check_response(resp)?)
    }

    fn update_flow(&self, id: &str, body: &Value) -> Result<RemoteFlow, ApiError> {
        let url = self.item_url(FLOWS_PATH, id);
        debug!("PATCH {url}");
        let resp = self.http.patch(&url).json(body).send().map_err(transport(&url))?;
        decode(check_response(resp)?)
    }

    fn delete_flow(&self, id: &str) -> Result<(), ApiError> {
        self.delete(&self.item_url(FLOWS_PATH, id))
    }
}

impl FolderApi for LangflowClient {
    fn list_folders(&self) -> Result<Vec<RemoteFolder>, ApiError> {
        let url = self.url(FOLDERS_PATH);
        debug!("GET {url}");
        let resp = self.http.get(&url).send().map_err(transport(&url))?;
        let folders: Option<Vec<RemoteFolder>> = decode(check_response(resp)?)?;
        Ok(folders.unwrap_or_default())
    }

    fn get_folder(&self, id: &str) -> Result<Option<FolderDetail>, ApiError> {
        match self.get_optional(&self.item_url(FOLDERS_PATH, id))? {
            Some(resp) => decode(resp),
            None => Ok(None),
        }
    }

    fn create_folder(&self, folder: &NewFolder) -> Result<RemoteFolder, ApiError> {
        let url = self.url(FOLDERS_PATH);
        debug!("POST {url}");
        let resp = self.http.post(&url).json(folder).send().map_err(transport(&url))?;
        decode(check_response(resp)?)
    }

    fn update_folder(&self, id: &str, update: &FolderUpdate) -> Result<RemoteFolder, ApiError> {
        let url = self.item_url(FOLDERS_PATH, id);
        debug!("PATCH {url}");
        let resp = self.http.patch(&url).json(update).send().map_err(transport(&url))?;
        decode(check_response(resp)?)
    }

    fn delete_folder(&self, id: &str) -> Result<(), ApiError> {
        self.delete(&self.item_url(FOLDERS_PATH, id))
    }
}
