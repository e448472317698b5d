use async_trait::async_trait;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Connection, timeout or non-2xx status.
    Transport,
    /// Response arrived but lacked the completion text.
    Protocol,
    Unknown,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Transport => write!(f, "API request failed"),
            FailureKind::Protocol => write!(f, "Failed to parse response"),
            FailureKind::Unknown => write!(f, "Unknown error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    Success { text: String },
    Failure { kind: FailureKind, message: String },
}

impl AnalysisOutcome {
    pub fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
        AnalysisOutcome::Failure {
            kind,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, AnalysisOutcome::Success { .. })
    }
}

/// Analyzes a single navigation instruction. Implementations make exactly one
/// attempt and report failures as values.
#[async_trait]
pub trait InstructionAnalyzer: Send + Sync {
    async fn analyze(&self, instruction: &str) -> AnalysisOutcome;
    fn model(&self) -> &str;
}
