#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::Path;

use flowsync::error::{ApiError, PublishError};
use flowsync::publisher::{Pipeline, PipelineApi, extract_endpoint};
use flowsync::remote::{FlowApi, FolderApi, FolderDetail, FolderMember, FolderUpdate, NewFolder, RemoteFlow, RemoteFolder};
use reqwest::StatusCode;
use serde_json::{Value, json};

#[derive(Default)]
struct State {
    next_id: usize,
    flows: BTreeMap<String, RemoteFlow>,
    folders: BTreeMap<String, FolderDetail>,
    pipelines: Vec<Pipeline>,
    uploads: Vec<String>,
    calls: Vec<String>,
    fail_list_flows: bool,
    vanish_on_delete: bool,
}

impl State {
    fn id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }
}

/// In-memory Langflow + OpenWebUI that records every call as `op:arg`.
#[derive(Default)]
pub struct FakeRemote {
    state: RefCell<State>,
}

fn not_found(what: &str, id: &str) -> ApiError {
    ApiError::Status { status: StatusCode::NOT_FOUND, url: format!("fake://{what}/{id}"), detail: Some("not found".into()) }
}

fn to_flow(id: &str, body: &Value) -> RemoteFlow {
    let mut map = body.as_object().cloned().unwrap_or_default();
    map.insert("id".into(), Value::String(id.to_string()));
    serde_json::from_value(Value::Object(map)).unwrap()
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, call: String) {
        self.state.borrow_mut().calls.push(call);
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.borrow().calls.clone()
    }

    /// Number of recorded calls for operation `op`.
    pub fn count(&self, op: &str) -> usize {
        self.state.borrow().calls.iter().filter(|c| c.split(':').next() == Some(op)).count()
    }

    pub fn fail_flow_listing(&self) {
        self.state.borrow_mut().fail_list_flows = true;
    }

    /// Deletes answer 404 after dropping the item, as when another client
    /// removed it first.
    pub fn vanish_on_delete(&self) {
        self.state.borrow_mut().vanish_on_delete = true;
    }

    pub fn seed_flow(&self, name: &str, body: Value) -> String {
        let mut s = self.state.borrow_mut();
        let id = s.id("flow");
        let mut body = body;
        body["name"] = Value::String(name.to_string());
        s.flows.insert(id.clone(), to_flow(&id, &body));
        id
    }

    pub fn seed_folder(&self, name: &str, flow_ids: &[&str], components: usize) -> String {
        let mut s = self.state.borrow_mut();
        let id = s.id("folder");
        s.folders.insert(
            id.clone(),
            FolderDetail {
                id: id.clone(),
                name: name.to_string(),
                description: None,
                flows: flow_ids.iter().map(|f| FolderMember::Id(f.to_string())).collect(),
                components: (0..components).map(|i| json!({ "id": format!("component-{i}") })).collect(),
            },
        );
        id
    }

    pub fn seed_pipeline(&self, id: &str, endpoint: Option<&str>) {
        self.state.borrow_mut().pipelines.push(Pipeline {
            id: id.to_string(),
            name: Some(id.to_string()),
            filepath: None,
            metadata: endpoint.map(|e| json!({ "endpoint": e })),
        });
    }

    pub fn flows(&self) -> Vec<RemoteFlow> {
        self.state.borrow().flows.values().cloned().collect()
    }

    pub fn flows_named(&self, name: &str) -> Vec<RemoteFlow> {
        self.flows().into_iter().filter(|f| f.name == name).collect()
    }

    pub fn folder_named(&self, name: &str) -> Option<FolderDetail> {
        self.state.borrow().folders.values().find(|f| f.name == name).cloned()
    }

    pub fn folder_count(&self) -> usize {
        self.state.borrow().folders.len()
    }

    pub fn pipeline_ids(&self) -> Vec<String> {
        self.state.borrow().pipelines.iter().map(|p| p.id.clone()).collect()
    }

    /// Sources of every uploaded pipeline file, in upload order.
    pub fn uploads(&self) -> Vec<String> {
        self.state.borrow().uploads.clone()
    }
}

impl FlowApi for FakeRemote {
    fn list_flows(&self) -> Result<Vec<RemoteFlow>, ApiError> {
        self.record("list_flows".into());
        if self.state.borrow().fail_list_flows {
            return Err(ApiError::Status {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                url: "fake://flows".into(),
                detail: Some("boom".into()),
            });
        }
        Ok(self.flows())
    }

    fn get_flow(&self, id: &str) -> Result<Option<RemoteFlow>, ApiError> {
        self.record(format!("get_flow:{id}"));
        Ok(self.state.borrow().flows.get(id).cloned())
    }

    fn create_flow(&self, body: &Value) -> Result<RemoteFlow, ApiError> {
        let name = body.get("name").and_then(Value::as_str).unwrap_or_default().to_string();
        self.record(format!("create_flow:{name}"));
        let mut s = self.state.borrow_mut();
        let id = s.id("flow");
        let flow = to_flow(&id, body);
        s.flows.insert(id, flow.clone());
        Ok(flow)
    }

    fn update_flow(&self, id: &str, body: &Value) -> Result<RemoteFlow, ApiError> {
        self.record(format!("update_flow:{id}"));
        let mut s = self.state.borrow_mut();
        let current = s.flows.get(id).cloned().ok_or_else(|| not_found("flows", id))?;
        let mut merged = serde_json::to_value(&current).unwrap();
        if let (Some(target), Some(patch)) = (merged.as_object_mut(), body.as_object()) {
            for (k, v) in patch {
                target.insert(k.clone(), v.clone());
            }
        }
        let flow = to_flow(id, &merged);
        s.flows.insert(id.to_string(), flow.clone());
        Ok(flow)
    }

    fn delete_flow(&self, id: &str) -> Result<(), ApiError> {
        self.record(format!("delete_flow:{id}"));
        let mut s = self.state.borrow_mut();
        s.flows.remove(id).ok_or_else(|| not_found("flows", id))?;
        for folder in s.folders.values_mut() {
            folder.flows.retain(|m| m.id() != id);
        }
        if s.vanish_on_delete {
            return Err(not_found("flows", id));
        }
        Ok(())
    }
}

impl FolderApi for FakeRemote {
    fn list_folders(&self) -> Result<Vec<RemoteFolder>, ApiError> {
        self.record("list_folders".into());
        Ok(self
            .state
            .borrow()
            .folders
            .values()
            .map(|f| RemoteFolder { id: f.id.clone(), name: f.name.clone(), description: f.description.clone() })
            .collect())
    }

    fn get_folder(&self, id: &str) -> Result<Option<FolderDetail>, ApiError> {
        self.record(format!("get_folder:{id}"));
        Ok(self.state.borrow().folders.get(id).cloned())
    }

    fn create_folder(&self, folder: &NewFolder) -> Result<RemoteFolder, ApiError> {
        self.record(format!("create_folder:{}", folder.name));
        let mut s = self.state.borrow_mut();
        let id = s.id("folder");
        let detail = FolderDetail {
            id: id.clone(),
            name: folder.name.clone(),
            description: Some(folder.description.clone()),
            flows: folder.flows.iter().cloned().map(FolderMember::Id).collect(),
            components: Vec::new(),
        };
        s.folders.insert(id.clone(), detail);
        Ok(RemoteFolder { id, name: folder.name.clone(), description: Some(folder.description.clone()) })
    }

    fn update_folder(&self, id: &str, update: &FolderUpdate) -> Result<RemoteFolder, ApiError> {
        self.record(format!("update_folder:{id}"));
        let mut s = self.state.borrow_mut();
        let folder = s.folders.get_mut(id).ok_or_else(|| not_found("folders", id))?;
        folder.flows = update.flows.iter().cloned().map(FolderMember::Id).collect();
        Ok(RemoteFolder { id: folder.id.clone(), name: folder.name.clone(), description: folder.description.clone() })
    }

    fn delete_folder(&self, id: &str) -> Result<(), ApiError> {
        self.record(format!("delete_folder:{id}"));
        let mut s = self.state.borrow_mut();
        s.folders.remove(id).ok_or_else(|| not_found("folders", id))?;
        if s.vanish_on_delete {
            return Err(not_found("folders", id));
        }
        Ok(())
    }
}

impl PipelineApi for FakeRemote {
    fn list_pipelines(&self) -> Result<Vec<Pipeline>, ApiError> {
        self.record("list_pipelines".into());
        Ok(self.state.borrow().pipelines.clone())
    }

    fn upload_pipeline(&self, file: &Path) -> Result<(), PublishError> {
        let name = file.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
        self.record(format!("upload_pipeline:{name}"));
        let source = std::fs::read_to_string(file).map_err(|source| PublishError::Io { path: file.to_path_buf(), source })?;
        let mut s = self.state.borrow_mut();
        let id = s.id("pipeline");
        s.pipelines.push(Pipeline {
            id,
            name: Some(name),
            filepath: None,
            metadata: extract_endpoint(&source).map(|e| json!({ "endpoint": e })),
        });
        s.uploads.push(source);
        Ok(())
    }

    fn delete_pipeline(&self, id: &str) -> Result<(), ApiError> {
        self.record(format!("delete_pipeline:{id}"));
        let mut s = self.state.borrow_mut();
        let before = s.pipelines.len();
        s.pipelines.retain(|p| p.id != id);
        if s.pipelines.len() == before {
            return Err(not_found("pipelines", id));
        }
        Ok(())
    }
}

/// Write `body` to `repo/path`, creating parent directories.
pub fn write_flow(repo: &Path, path: &str, body: &str) {
    let full = repo.join(path);
    std::fs::create_dir_all(full.parent().unwrap()).unwrap();
    std::fs::write(full, body).unwrap();
}
