//! Keeps a Langflow instance in step with the flow documents tracked in a git
//! repository, and optionally publishes an OpenWebUI pipeline per flow.

pub mod cache;
pub mod cmd;
pub mod common;
pub mod config;
pub mod error;
pub mod git;
pub mod logging;
pub mod paths;
pub mod publisher;
pub mod reconcile;
pub mod remote;
pub mod util;
