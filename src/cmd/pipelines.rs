use std::collections::HashSet;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use crate::common::langflow::LangflowClient;
use crate::common::openwebui::OpenWebUiClient;
use crate::config::{LangflowArgs, LangflowSettings, OpenWebUiSettings, PipelineArgs};
use crate::publisher::{PipelineApi, PipelineTemplate, Publisher, flow_endpoint};
use crate::remote::FlowApi;
use crate::util::{color_enabled_stdout, load_config, sym_check};

#[derive(Args, Debug)]
pub struct PrunePipelinesCmd {
    #[command(flatten)]
    pub langflow: LangflowArgs,
    #[command(flatten)]
    pub pipelines: PipelineArgs,
}

pub fn handle_prune_pipelines(cmd: PrunePipelinesCmd) -> Result<()> {
    let stored = load_config().unwrap_or_default();
    let langflow = LangflowSettings::resolve(&cmd.langflow, &stored)?;
    let Some(settings) = OpenWebUiSettings::resolve(&cmd.pipelines, &stored, langflow.timeout, true)? else {
        anyhow::bail!("OpenWebUI settings could not be resolved");
    };

    let langflow = LangflowClient::new(&langflow)?;
    let openwebui = OpenWebUiClient::new(&settings)?;
    let deleted = prune_pipelines(&langflow, &openwebui, &settings.langflow_url)?;

    let ce = color_enabled_stdout();
    if deleted.is_empty() {
        println!("{} No unused pipelines.", sym_check(ce));
    } else {
        for d in &deleted {
            println!("{} Deleted pipeline {d}", sym_check(ce));
        }
    }
    Ok(())
}

/// Endpoints of every flow currently on the Langflow side.
pub fn live_endpoints<A: FlowApi>(api: &A) -> Result<HashSet<String>> {
    let flows = api.list_flows().context("list Langflow flows")?;
    Ok(flows.iter().map(|f| flow_endpoint(f, None).endpoint).collect())
}

/// Delete OpenWebUI pipelines that call an endpoint no live flow exposes.
pub fn prune_pipelines<A: FlowApi, P: PipelineApi>(flows: &A, pipelines: &P, langflow_url: &str) -> Result<Vec<String>> {
    let live = live_endpoints(flows)?;
    info!("{} live flow endpoint(s)", live.len());
    let publisher = Publisher::new(pipelines, PipelineTemplate::builtin(), langflow_url)?;
    Ok(publisher.prune_unused(&live))
}
