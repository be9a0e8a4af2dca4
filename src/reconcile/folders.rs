use std::collections::{BTreeMap, HashMap, HashSet};

use reqwest::StatusCode;
use tracing::{debug, error, info, warn};

use super::flows::ProcessedFlows;
use crate::cache::DirectoryCache;
use crate::error::ApiError;
use crate::paths::{flow_name_from_path, folder_name_from_path};
use crate::remote::{FolderApi, FolderUpdate, NewFolder, RemoteFolder};

/// Folder name -> flow ids, in folder-name order.
pub type FolderGroups = BTreeMap<String, Vec<String>>;

/// Group the ids of this run's flows by the folder their path implies.
///
/// Paths without a folder are left alone; paths whose flow is not among
/// `processed` (it failed to push) are skipped with a warning.
pub fn group_by_folder(flow_paths: &[String], processed: &ProcessedFlows) -> FolderGroups {
    let ids_by_name: HashMap<&str, &str> =
        processed.iter().map(|(id, flow)| (flow.name.as_str(), id.as_str())).collect();

    let mut groups = FolderGroups::new();
    for path in flow_paths {
        let flow_name = flow_name_from_path(path);
        let Some(folder) = folder_name_from_path(path) else {
            debug!(path, "flow '{flow_name}' has no folder");
            continue;
        };
        let Some(id) = ids_by_name.get(flow_name.as_str()) else {
            warn!(path, "no processed flow named '{flow_name}' for folder '{folder}'");
            continue;
        };
        let ids = groups.entry(folder).or_default();
        if !ids.iter().any(|existing| existing == id) {
            ids.push(id.to_string());
        }
    }
    groups
}

/// Final membership of an existing folder: this run's group plus every
/// current member this run did not touch. Touched flows that are no longer
/// grouped here are dropped.
pub fn merge_membership(group: &[String], current: &[String], processed: &ProcessedFlows) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut merged = Vec::with_capacity(group.len() + current.len());
    for id in group {
        if seen.insert(id) {
            merged.push(id.clone());
        }
    }
    for id in current {
        if processed.contains_key(id) {
            continue;
        }
        if seen.insert(id) {
            debug!(id = %id, "keeping untouched folder member");
            merged.push(id.clone());
        }
    }
    merged
}

/// Mirrors the repository's folder layout onto remote folders.
pub struct FolderReconciler<'a, A: FolderApi> {
    api: &'a A,
    folders: DirectoryCache<RemoteFolder>,
}

impl<'a, A: FolderApi> FolderReconciler<'a, A> {
    pub fn new(api: &'a A) -> Self {
        Self { api, folders: DirectoryCache::new("folders") }
    }

    pub fn find_folder_by_name(&mut self, name: &str) -> Result<Option<RemoteFolder>, ApiError> {
        self.folders.find_by_name(name, || self.api.list_folders())
    }

    /// Put every processed flow into the folder its path names, creating
    /// folders as needed. Returns the membership written for each folder.
    pub fn organize(&mut self, flow_paths: &[String], processed: &ProcessedFlows) -> FolderGroups {
        let groups = group_by_folder(flow_paths, processed);
        debug!(?groups, "flows grouped by folder");

        let mut organized = FolderGroups::new();
        for (folder, ids) in groups {
            info!("organizing folder '{folder}'");
            match self.sync_folder(&folder, &ids, processed) {
                Ok(Some(members)) => {
                    organized.insert(folder, members);
                }
                Ok(None) => {}
                Err(e) => error!(folder = %folder, "failed to organize folder: {e}"),
            }
        }
        organized
    }

    fn sync_folder(&mut self, folder: &str, group: &[String], processed: &ProcessedFlows) -> Result<Option<Vec<String>>, ApiError> {
        let Some(existing) = self.find_folder_by_name(folder)? else {
            let created = self.api.create_folder(&NewFolder {
                name: folder.to_string(),
                description: String::new(),
                flows: group.to_vec(),
            })?;
            self.folders.invalidate();
            info!(id = %created.id, "created folder '{folder}' with {} flow(s)", group.len());
            return Ok(Some(group.to_vec()));
        };

        let Some(detail) = self.api.get_folder(&existing.id)? else {
            warn!(id = %existing.id, "folder '{folder}' vanished before it could be read, skipping");
            return Ok(None);
        };
        let members = merge_membership(group, &detail.flow_ids(), processed);
        debug!(id = %existing.id, ?members, "final membership");
        self.api.update_folder(&existing.id, &FolderUpdate { flows: members.clone() })?;
        self.folders.invalidate();
        info!(id = %existing.id, "updated folder '{folder}' ({} flow(s))", members.len());
        Ok(Some(members))
    }

    /// Delete every remote folder without flows and without components.
    /// Returns the names of the folders removed.
    pub fn prune_empty(&mut self) -> Vec<String> {
        let folders = match self.folders.list(true, || self.api.list_folders()) {
            Ok(folders) => folders.to_vec(),
            Err(e) => {
                error!("could not list folders for pruning: {e}");
                return Vec::new();
            }
        };

        let mut deleted = Vec::new();
        for folder in folders {
            if folder.id.is_empty() || folder.name.is_empty() {
                continue;
            }
            let detail = match self.api.get_folder(&folder.id) {
                Ok(Some(detail)) => detail,
                Ok(None) => {
                    warn!(id = %folder.id, "folder '{}' disappeared, skipping", folder.name);
                    continue;
                }
                Err(e) => {
                    warn!(id = %folder.id, "could not read folder '{}': {e}", folder.name);
                    continue;
                }
            };
            if !detail.is_empty() {
                debug!(id = %folder.id, "folder '{}' is not empty", folder.name);
                continue;
            }
            info!(id = %folder.id, "deleting empty folder '{}'", folder.name);
            match self.api.delete_folder(&folder.id) {
                Ok(()) => {
                    self.folders.invalidate();
                    deleted.push(folder.name);
                }
                Err(e) if e.status() == Some(StatusCode::NOT_FOUND) => {
                    warn!(id = %folder.id, "folder '{}' was already gone", folder.name);
                    self.folders.invalidate();
                }
                Err(e) => error!(id = %folder.id, "failed to delete empty folder '{}': {e}", folder.name),
            }
        }
        deleted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::RemoteFlow;
    use pretty_assertions::assert_eq;
    use serde_json::Map;
    use std::collections::BTreeSet;

    fn flow(id: &str, name: &str) -> (String, RemoteFlow) {
        (
            id.to_string(),
            RemoteFlow { id: id.to_string(), name: name.to_string(), endpoint_name: None, body: Map::new() },
        )
    }

    fn ids(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn union_keeps_untouched_and_drops_touched_members() {
        let processed: ProcessedFlows = [flow("B", "b"), flow("D", "d")].into_iter().collect();
        let merged = merge_membership(&ids(&["D"]), &ids(&["A", "B", "C"]), &processed);
        let merged: BTreeSet<String> = merged.into_iter().collect();
        let expected: BTreeSet<String> = ids(&["A", "C", "D"]).into_iter().collect();
        assert_eq!(merged, expected);
    }

    #[test]
    fn union_does_not_duplicate_members() {
        let processed: ProcessedFlows = [flow("D", "d")].into_iter().collect();
        let merged = merge_membership(&ids(&["D", "D"]), &ids(&["A", "A"]), &processed);
        assert_eq!(merged, ids(&["D", "A"]));
    }

    #[test]
    fn groups_by_folder_and_skips_unfoldered_or_unknown() {
        let processed: ProcessedFlows =
            [flow("1", "invoice"), flow("2", "report"), flow("3", "root")].into_iter().collect();
        let paths = ids(&[
            "flows/excel/invoice.json",
            "langflow-config/flows/excel/report.json",
            "flows/root.json",
            "flows/word/missing.json",
        ]);
        let groups = group_by_folder(&paths, &processed);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups["excel"], ids(&["1", "2"]));
    }
}
