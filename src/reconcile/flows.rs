use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::cache::DirectoryCache;
use crate::error::{ApiError, FlowError};
use crate::paths::flow_name_from_path;
use crate::remote::{FlowApi, RemoteFlow};

/// Flows created or updated during a run, keyed by remote id.
pub type ProcessedFlows = BTreeMap<String, RemoteFlow>;

/// Result of pushing one flow file.
#[derive(Debug)]
pub enum FlowOutcome {
    Created { path: String, flow: RemoteFlow },
    Updated { path: String, flow: RemoteFlow },
    Failed { path: String, error: FlowError },
}

/// What a batch of upserts produced: the flows that made it and the paths
/// that did not.
#[derive(Debug, Default)]
pub struct FlowBatch {
    pub processed: ProcessedFlows,
    pub created: usize,
    pub updated: usize,
    pub failed: Vec<String>,
}

/// Pushes flow files to the remote, matching remote flows by derived name.
pub struct FlowReconciler<'a, A: FlowApi> {
    api: &'a A,
    repo: PathBuf,
    flows: DirectoryCache<RemoteFlow>,
}

impl<'a, A: FlowApi> FlowReconciler<'a, A> {
    pub fn new(api: &'a A, repo: impl Into<PathBuf>) -> Self {
        Self { api, repo: repo.into(), flows: DirectoryCache::new("flows") }
    }

    pub fn find_flow_by_name(&mut self, name: &str) -> Result<Option<RemoteFlow>, ApiError> {
        self.flows.find_by_name(name, || self.api.list_flows())
    }

    /// Create the flow at `path`, or update it when a remote flow with the
    /// same name exists.
    pub fn upsert(&mut self, path: &str) -> FlowOutcome {
        let name = flow_name_from_path(path);
        debug!(path, name = %name, "upserting flow");
        match self.try_upsert(path, &name) {
            Ok(outcome) => outcome,
            Err(error) => {
                if error.is_parse_error() {
                    error!(path, "skipping unparsable flow file: {error}");
                } else {
                    error!(path, "failed to push flow: {error}");
                }
                FlowOutcome::Failed { path: path.to_string(), error }
            }
        }
    }

    fn try_upsert(&mut self, path: &str, name: &str) -> Result<FlowOutcome, FlowError> {
        let existing = self.find_flow_by_name(name)?;
        let mut body = read_flow_document(&self.repo, path)?;

        let outcome = match existing {
            Some(remote) => {
                info!(path, id = %remote.id, "flow '{name}' exists, updating");
                let flow = self.api.update_flow(&remote.id, &body)?;
                FlowOutcome::Updated { path: path.to_string(), flow: named(flow, name) }
            }
            None => {
                info!(path, "flow '{name}' not found, creating");
                if let Value::Object(map) = &mut body {
                    map.entry("name").or_insert_with(|| Value::String(name.to_string()));
                }
                let flow = self.api.create_flow(&body)?;
                FlowOutcome::Created { path: path.to_string(), flow: named(flow, name) }
            }
        };
        self.flows.invalidate();
        Ok(outcome)
    }

    /// Upsert every path in order; one bad file never stops the batch.
    pub fn upsert_all(&mut self, paths: &[String]) -> FlowBatch {
        let mut batch = FlowBatch::default();
        for path in paths {
            match self.upsert(path) {
                FlowOutcome::Created { flow, .. } => {
                    batch.created += 1;
                    batch.processed.insert(flow.id.clone(), flow);
                }
                FlowOutcome::Updated { flow, .. } => {
                    batch.updated += 1;
                    batch.processed.insert(flow.id.clone(), flow);
                }
                FlowOutcome::Failed { path, .. } => batch.failed.push(path),
            }
        }
        batch
    }

    /// Delete the remote flow named after `path`. Returns the deleted id, or
    /// `None` when no such flow exists.
    pub fn delete(&mut self, path: &str) -> Result<Option<String>, ApiError> {
        let name = flow_name_from_path(path);
        let Some(remote) = self.find_flow_by_name(&name)? else {
            warn!(path, "flow '{name}' does not exist remotely, nothing to delete");
            return Ok(None);
        };
        info!(path, id = %remote.id, "deleting flow '{name}'");
        match self.api.delete_flow(&remote.id) {
            Ok(()) => {
                self.flows.invalidate();
                Ok(Some(remote.id))
            }
            Err(e) if e.status() == Some(StatusCode::NOT_FOUND) => {
                warn!(path, id = %remote.id, "flow '{name}' was already gone");
                self.flows.invalidate();
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Delete every path; returns the ids actually deleted.
    pub fn delete_all(&mut self, paths: &[String]) -> Vec<String> {
        let mut deleted = Vec::new();
        for path in paths {
            match self.delete(path) {
                Ok(Some(id)) => deleted.push(id),
                Ok(None) => {}
                Err(e) => error!(path, "failed to delete flow: {e}"),
            }
        }
        deleted
    }
}

/// Servers may answer without echoing the name; fall back to the derived one
/// so later name lookups still match.
fn named(mut flow: RemoteFlow, name: &str) -> RemoteFlow {
    if flow.name.is_empty() {
        flow.name = name.to_string();
    }
    flow
}

/// Read and parse the JSON document at `repo/path`.
pub fn read_flow_document(repo: &Path, path: &str) -> Result<Value, FlowError> {
    let full = repo.join(path);
    if !full.is_file() {
        return Err(FlowError::MissingFile(full));
    }
    let text = std::fs::read_to_string(&full).map_err(|source| FlowError::Io { path: full.clone(), source })?;
    let body: Value = serde_json::from_str(&text).map_err(|source| FlowError::Parse { path: full.clone(), source })?;
    if !body.is_object() {
        return Err(FlowError::NotAnObject(full));
    }
    Ok(body)
}
