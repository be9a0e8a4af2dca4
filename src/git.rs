use std::path::Path;
use std::process::Command;

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::DetectError;
use crate::paths::is_flow_path;

/// Paths touched between two revisions, split by status. The `flows_*` lists
/// are the subsets that are flow documents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSet {
    pub added: Vec<String>,
    pub modified: Vec<String>,
    pub deleted: Vec<String>,
    pub flows_added: Vec<String>,
    pub flows_modified: Vec<String>,
    pub flows_deleted: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status { Added, Modified, Deleted }

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }

    pub fn has_flow_changes(&self) -> bool {
        !(self.flows_added.is_empty() && self.flows_modified.is_empty() && self.flows_deleted.is_empty())
    }

    /// Added then modified flow paths, the input of folder organisation.
    pub fn upserted_flows(&self) -> Vec<String> {
        self.flows_added.iter().chain(self.flows_modified.iter()).cloned().collect()
    }

    fn record(&mut self, status: Status, path: &str) {
        let flow = is_flow_path(path);
        let (all, flows) = match status {
            Status::Added => (&mut self.added, &mut self.flows_added),
            Status::Modified => (&mut self.modified, &mut self.flows_modified),
            Status::Deleted => (&mut self.deleted, &mut self.flows_deleted),
        };
        all.push(path.to_string());
        if flow {
            flows.push(path.to_string());
        }
    }
}

/// Parse `git diff --name-status -M -z` output.
///
/// Records are NUL separated and paths are verbatim (no quoting), so names
/// with non-ASCII characters, tabs or quotes come through unchanged.
/// Renames (`R<score>\0old\0new`) are split into a deletion of `old` and an
/// addition of `new`. Status letters other than A, M, D and R are skipped.
pub fn parse_name_status(output: &str) -> ChangeSet {
    let mut changes = ChangeSet::default();
    let mut fields = output.split('\0').filter(|f| !f.is_empty());
    while let Some(status) = fields.next() {
        let status = status.trim();
        let Some(letter) = status.chars().next() else {
            continue;
        };
        // copies and renames carry a source and a destination
        let arity = if matches!(letter, 'R' | 'C') { 2 } else { 1 };
        let paths: Vec<&str> = fields.by_ref().take(arity).collect();
        match (letter, paths.as_slice()) {
            ('R', [old, new]) => {
                debug!(from = old, to = new, "rename detected");
                changes.record(Status::Deleted, old);
                changes.record(Status::Added, new);
            }
            ('A', [path]) => changes.record(Status::Added, path),
            ('M', [path]) => changes.record(Status::Modified, path),
            ('D', [path]) => changes.record(Status::Deleted, path),
            (_, p) if p.len() == arity => warn!(status, paths = ?p, "ignoring unsupported diff status"),
            _ => warn!(status, "skipping truncated diff record"),
        }
    }
    changes
}

/// Diff `before..after` inside `repo` with rename detection.
pub fn detect_changes(repo: &Path, before: &str, after: &str) -> Result<ChangeSet, DetectError> {
    let git = which::which("git").map_err(DetectError::GitMissing)?;
    let range = format!("{before}..{after}");
    debug!(repo = %repo.display(), %range, "running git diff");

    let out = Command::new(git)
        .args(["diff", "--name-status", "-M", "-z", &range])
        .current_dir(repo)
        .output()
        .map_err(|source| DetectError::Spawn { repo: repo.to_path_buf(), source })?;

    if !out.status.success() {
        return Err(DetectError::Failed {
            range,
            code: out.status.code().map(|c| c.to_string()).unwrap_or_else(|| "signal".to_string()),
            stderr: String::from_utf8_lossy(&out.stderr).trim().to_string(),
        });
    }

    let changes = parse_name_status(&String::from_utf8_lossy(&out.stdout));
    debug!(
        added = changes.added.len(),
        modified = changes.modified.len(),
        deleted = changes.deleted.len(),
        flows_added = changes.flows_added.len(),
        flows_modified = changes.flows_modified.len(),
        flows_deleted = changes.flows_deleted.len(),
        "changes detected"
    );
    Ok(changes)
}
