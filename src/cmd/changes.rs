use anyhow::{Context, Result};
use clap::Args;

use crate::config::{RepoArgs, RepoSettings};
use crate::git::{ChangeSet, detect_changes};

#[derive(Args, Debug)]
pub struct ChangesCmd {
    #[command(flatten)]
    pub repo: RepoArgs,
    /// Print the change set as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn handle_changes(cmd: ChangesCmd) -> Result<()> {
    let repo = RepoSettings::resolve(&cmd.repo)?;
    let changes = detect_changes(&repo.path, &repo.before, &repo.after)?;
    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&changes).context("serialize change set")?);
    } else {
        print!("{}", render_changes(&changes));
    }
    Ok(())
}

pub fn render_changes(changes: &ChangeSet) -> String {
    let sections: [(&str, &[String]); 6] = [
        ("Added", &changes.added),
        ("Modified", &changes.modified),
        ("Deleted", &changes.deleted),
        ("Flows added", &changes.flows_added),
        ("Flows modified", &changes.flows_modified),
        ("Flows deleted", &changes.flows_deleted),
    ];
    let mut out = String::new();
    for (title, paths) in sections {
        out.push_str(&format!("{title} ({}):\n", paths.len()));
        for p in paths {
            out.push_str(&format!("  {p}\n"));
        }
    }
    out
}
