pub mod config;
pub mod error;
pub mod models;
pub mod dataset;
pub mod llm;
pub mod analysis;
pub mod storage;

pub use config::{ConfigResolver, Environment, Overrides, Settings};
pub use error::{Error, Result};
pub use dataset::{DatasetConfig, EpisodeSource, EpisodeStore, JsonDatasetSource};
pub use llm::{AnalysisOutcome, InstructionAnalyzer, OpenRouterClient, PromptTemplate};
pub use analysis::{AnalysisPipeline, RunRequest, Selection};
pub use storage::ResultSink;
