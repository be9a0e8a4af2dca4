//! Remote Langflow objects and the API seams the reconcilers drive.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::ApiError;

/// Anything a [`crate::cache::DirectoryCache`] can look up by name.
pub trait Named {
    fn name(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteFlow {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_name: Option<String>,
    /// Every other field of the flow document, kept verbatim.
    #[serde(flatten)]
    pub body: Map<String, Value>,
}

impl Named for RemoteFlow {
    fn name(&self) -> &str { &self.name }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteFolder {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl Named for RemoteFolder {
    fn name(&self) -> &str { &self.name }
}

/// A folder member as the API reports it: either a bare id or a flow object.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FolderMember {
    Id(String),
    Object { id: String },
}

impl FolderMember {
    pub fn id(&self) -> &str {
        match self {
            FolderMember::Id(id) | FolderMember::Object { id } => id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FolderDetail {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub flows: Vec<FolderMember>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub components: Vec<Value>,
}

impl FolderDetail {
    pub fn flow_ids(&self) -> Vec<String> {
        self.flows.iter().map(|m| m.id().to_string()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty() && self.components.is_empty()
    }
}

/// Body of a folder creation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewFolder {
    pub name: String,
    pub description: String,
    pub flows: Vec<String>,
}

/// Body of a folder update; the list replaces the whole membership.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FolderUpdate {
    pub flows: Vec<String>,
}

pub trait FlowApi {
    fn list_flows(&self) -> Result<Vec<RemoteFlow>, ApiError>;
    /// `Ok(None)` when the server answers 404.
    fn get_flow(&self, id: &str) -> Result<Option<RemoteFlow>, ApiError>;
    fn create_flow(&self, body: &Value) -> Result<RemoteFlow, ApiError>;
    fn update_flow(&self, id: &str, body: &Value) -> Result<RemoteFlow, ApiError>;
    fn delete_flow(&self, id: &str) -> Result<(), ApiError>;
}

pub trait FolderApi {
    fn list_folders(&self) -> Result<Vec<RemoteFolder>, ApiError>;
    /// `Ok(None)` when the server answers 404.
    fn get_folder(&self, id: &str) -> Result<Option<FolderDetail>, ApiError>;
    fn create_folder(&self, folder: &NewFolder) -> Result<RemoteFolder, ApiError>;
    fn update_folder(&self, id: &str, update: &FolderUpdate) -> Result<RemoteFolder, ApiError>;
    fn delete_folder(&self, id: &str) -> Result<(), ApiError>;
}

fn null_as_default<'de, D, T>(de: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(de)?.unwrap_or_default())
}
