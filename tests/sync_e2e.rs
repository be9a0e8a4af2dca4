mod common;

use std::collections::HashSet;

use common::{FakeRemote, write_flow};
use flowsync::cmd::pipelines::prune_pipelines;
use flowsync::cmd::sync::apply_changes;
use flowsync::git::ChangeSet;
use flowsync::publisher::{PipelineTemplate, Publisher};
use pretty_assertions::assert_eq;
use serde_json::json;

fn invoice_changes() -> ChangeSet {
    ChangeSet {
        added: vec!["flows/excel/invoice.json".into()],
        flows_added: vec!["flows/excel/invoice.json".into()],
        ..ChangeSet::default()
    }
}

#[test]
fn new_flow_in_new_folder_against_empty_remote() {
    let repo = tempfile::tempdir().unwrap();
    write_flow(repo.path(), "flows/excel/invoice.json", r#"{"description": "Invoices", "data": {"nodes": []}}"#);
    let remote = FakeRemote::new();

    let summary = apply_changes::<_, FakeRemote>(&remote, repo.path(), &invoice_changes(), None);

    assert_eq!(remote.count("create_flow"), 1);
    assert_eq!(remote.count("create_folder"), 1);
    assert_eq!(remote.count("delete_flow") + remote.count("delete_folder"), 0);

    let flow = remote.flows_named("invoice").pop().unwrap();
    let folder = remote.folder_named("excel").unwrap();
    assert_eq!(folder.flow_ids(), vec![flow.id.clone()]);
    assert_eq!(summary.added, 1);
    assert!(summary.failed.is_empty());
    assert_eq!(summary.published, None);
}

#[test]
fn stages_run_in_order() {
    let repo = tempfile::tempdir().unwrap();
    write_flow(repo.path(), "flows/excel/invoice.json", r#"{"data": {}}"#);
    write_flow(repo.path(), "flows/excel/report.json", r#"{"data": {}}"#);
    let remote = FakeRemote::new();
    remote.seed_flow("report", json!({}));
    remote.seed_flow("legacy", json!({}));

    let changes = ChangeSet {
        flows_added: vec!["flows/excel/invoice.json".into()],
        flows_modified: vec!["flows/excel/report.json".into()],
        flows_deleted: vec!["flows/legacy.json".into()],
        ..ChangeSet::default()
    };
    let summary = apply_changes::<_, FakeRemote>(&remote, repo.path(), &changes, None);

    let mutations: Vec<String> = remote
        .calls()
        .into_iter()
        .filter(|c| c.starts_with("create_") || c.starts_with("update_") || c.starts_with("delete_"))
        .map(|c| c.split(':').next().unwrap_or_default().to_string())
        .collect();
    assert_eq!(mutations, vec!["delete_flow", "create_flow", "update_flow", "create_folder"]);
    assert_eq!((summary.added, summary.modified, summary.deleted.len()), (1, 1, 1));
    assert_eq!(remote.folder_named("excel").unwrap().flow_ids().len(), 2);
}

#[test]
fn publishes_one_pipeline_per_processed_flow() {
    let repo = tempfile::tempdir().unwrap();
    write_flow(repo.path(), "flows/excel/invoice.json", r#"{"data": {}}"#);
    let remote = FakeRemote::new();
    let publisher = Publisher::new(&remote, PipelineTemplate::builtin(), "http://langflow:7860").unwrap();

    let summary = apply_changes(&remote, repo.path(), &invoice_changes(), Some(&publisher));

    assert_eq!(summary.published, Some(1));
    assert_eq!(remote.count("upload_pipeline"), 1);
    let uploads = remote.uploads();
    assert!(uploads[0].contains(r#"ENDPOINT: str = "invoice""#));
    assert!(uploads[0].contains("http://langflow:7860"));
    assert!(uploads[0].contains(r#"self.name = "invoice""#));
}

#[test]
fn nothing_processed_means_nothing_published() {
    let repo = tempfile::tempdir().unwrap();
    let remote = FakeRemote::new();
    let publisher = Publisher::new(&remote, PipelineTemplate::builtin(), "http://langflow:7860").unwrap();

    let summary = apply_changes(&remote, repo.path(), &ChangeSet::default(), Some(&publisher));

    assert_eq!(summary.published, None);
    assert_eq!(remote.count("upload_pipeline"), 0);
    // pruning still runs on an empty change set
    assert_eq!(remote.count("list_folders"), 1);
}

#[test]
fn prunes_pipelines_for_flows_that_are_gone() {
    let remote = FakeRemote::new();
    remote.seed_flow("Live Flow", json!({ "endpoint_name": "live" }));
    remote.seed_pipeline("p-live", Some("live"));
    remote.seed_pipeline("p-gone", Some("gone"));
    remote.seed_pipeline("p-unknown", None);

    let deleted = prune_pipelines(&remote, &remote, "http://langflow:7860").unwrap();

    assert_eq!(deleted, vec!["p-gone (endpoint: gone)".to_string()]);
    let left: HashSet<String> = remote.pipeline_ids().into_iter().collect();
    assert_eq!(left, HashSet::from(["p-live".to_string(), "p-unknown".to_string()]));
}
