pub mod display;
pub mod pipeline;

pub use pipeline::{AnalysisPipeline, RunRequest, Selection};
