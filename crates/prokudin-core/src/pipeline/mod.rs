pub mod config;
mod types;

pub use types::{CancelToken, NoOpReporter, PipelineStage, ProgressReporter};
