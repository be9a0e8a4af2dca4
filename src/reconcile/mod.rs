pub mod flows;
pub mod folders;

pub use flows::{FlowBatch, FlowOutcome, FlowReconciler, ProcessedFlows};
pub use folders::{FolderGroups, FolderReconciler};
