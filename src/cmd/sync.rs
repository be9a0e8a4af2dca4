use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use owo_colors::OwoColorize;
use tracing::{debug, info};

use crate::common::langflow::LangflowClient;
use crate::common::openwebui::OpenWebUiClient;
use crate::config::{LangflowArgs, PipelineArgs, RepoArgs, SyncConfig};
use crate::git::{ChangeSet, detect_changes};
use crate::publisher::{PipelineApi, PipelineTemplate, Publisher};
use crate::reconcile::{FlowReconciler, FolderGroups, FolderReconciler, ProcessedFlows};
use crate::remote::{FlowApi, FolderApi};
use crate::util::{color_enabled_stdout, load_config, sym_check, sym_cross, sym_gear};

#[derive(Args, Debug)]
pub struct SyncCmd {
    #[command(flatten)]
    pub langflow: LangflowArgs,
    #[command(flatten)]
    pub repo: RepoArgs,
    #[command(flatten)]
    pub pipelines: PipelineArgs,
}

/// Counts and names gathered over one run.
#[derive(Debug, Default)]
pub struct SyncSummary {
    pub added: usize,
    pub modified: usize,
    pub deleted: Vec<String>,
    pub failed: Vec<String>,
    pub organized: FolderGroups,
    pub pruned_folders: Vec<String>,
    pub published: Option<usize>,
    pub processed: ProcessedFlows,
}

impl SyncSummary {
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

pub fn handle_sync(cmd: SyncCmd) -> Result<()> {
    let stored = load_config().unwrap_or_default();
    let config = SyncConfig::resolve(&cmd.langflow, &cmd.repo, &cmd.pipelines, &stored)?;
    info!("starting sync\n{config}");

    let ce = color_enabled_stdout();
    println!("{} Detecting changes {}..{}", sym_gear(ce), config.repo.before, config.repo.after);
    let changes = detect_changes(&config.repo.path, &config.repo.before, &config.repo.after)
        .context("change detection failed, nothing was synced")?;

    let langflow = LangflowClient::new(&config.langflow)?;
    let summary = match &config.openwebui {
        Some(settings) => {
            let openwebui = OpenWebUiClient::new(settings)?;
            let template = PipelineTemplate::load(settings.template_path.as_deref());
            let publisher = Publisher::new(&openwebui, template, settings.langflow_url.clone())?;
            apply_changes(&langflow, &config.repo.path, &changes, Some(&publisher))
        }
        None => apply_changes::<_, OpenWebUiClient>(&langflow, &config.repo.path, &changes, None),
    };

    print_summary(&summary, ce);
    Ok(())
}

/// Apply `changes` to the remote: deletions, additions, modifications,
/// folder organisation, pipeline publishing, then empty-folder pruning.
/// Failed items are recorded and the run carries on.
pub fn apply_changes<A, P>(api: &A, repo: &Path, changes: &ChangeSet, publisher: Option<&Publisher<'_, P>>) -> SyncSummary
where
    A: FlowApi + FolderApi,
    P: PipelineApi,
{
    let mut summary = SyncSummary::default();
    if !changes.has_flow_changes() {
        info!("no flow changes between the two revisions");
    }

    let mut flows = FlowReconciler::new(api, repo);
    if !changes.flows_deleted.is_empty() {
        info!("deleting {} flow(s)", changes.flows_deleted.len());
        summary.deleted = flows.delete_all(&changes.flows_deleted);
    }
    if !changes.flows_added.is_empty() {
        info!("adding {} flow(s)", changes.flows_added.len());
        let batch = flows.upsert_all(&changes.flows_added);
        // an "added" file whose name already exists remotely is an update
        summary.added = batch.created + batch.updated;
        summary.failed.extend(batch.failed);
        summary.processed.extend(batch.processed);
    }
    if !changes.flows_modified.is_empty() {
        info!("updating {} flow(s)", changes.flows_modified.len());
        let batch = flows.upsert_all(&changes.flows_modified);
        summary.modified = batch.created + batch.updated;
        summary.failed.extend(batch.failed);
        summary.processed.extend(batch.processed);
    }

    let mut folders = FolderReconciler::new(api);
    let upserted = changes.upserted_flows();
    if !upserted.is_empty() && !summary.processed.is_empty() {
        summary.organized = folders.organize(&upserted, &summary.processed);
    }

    if let Some(publisher) = publisher {
        if summary.processed.is_empty() {
            debug!("no flows processed, nothing to publish");
        } else {
            summary.published = Some(publisher.publish_all(&summary.processed, &upserted));
        }
    }

    summary.pruned_folders = folders.prune_empty();
    summary
}

pub fn print_summary(summary: &SyncSummary, ce: bool) {
    let ok = sym_check(ce);
    println!("{ok} Flows added: {}", summary.added);
    println!("{ok} Flows modified: {}", summary.modified);
    println!("{ok} Flows deleted: {}", summary.deleted.len());
    if !summary.organized.is_empty() {
        let names: Vec<&str> = summary.organized.keys().map(String::as_str).collect();
        println!("{ok} Folders organized: {}", names.join(", "));
    }
    if !summary.pruned_folders.is_empty() {
        println!("{ok} Empty folders removed: {}", summary.pruned_folders.join(", "));
    }
    if let Some(n) = summary.published {
        println!("{ok} Pipelines published: {n}/{}", summary.processed.len());
    }
    if summary.has_failures() {
        let bad = sym_cross(ce);
        for path in &summary.failed {
            if ce {
                println!("{bad} Failed: {}", path.red());
            } else {
                println!("{bad} Failed: {path}");
            }
        }
    }
}
