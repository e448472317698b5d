pub mod provider;
pub mod openrouter;
pub mod prompts;

pub use provider::{AnalysisOutcome, FailureKind, InstructionAnalyzer};
pub use openrouter::OpenRouterClient;
pub use prompts::PromptTemplate;
