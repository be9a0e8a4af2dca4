pub mod changes;
pub mod config;
pub mod pipelines;
pub mod sync;
