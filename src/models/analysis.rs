use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::episode::EpisodeId;

/// One successful instruction analysis, as written to the results file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub episode_id: EpisodeId,
    pub scene_id: String,
    pub instruction: String,
    pub analysis: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineReport {
    pub processed: usize,
    pub analyzed: usize,
    pub failed: usize,
    pub output_path: Option<PathBuf>,
    pub warnings: Vec<String>,
}

impl std::fmt::Display for PipelineReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Processed {} episode(s)", self.processed)?;
        if self.analyzed > 0 || self.failed > 0 {
            write!(
                f,
                ", {} analysis(es) succeeded, {} failed",
                self.analyzed, self.failed
            )?;
        }
        if let Some(ref path) = self.output_path {
            write!(f, "; results saved to {}", path.display())?;
        }
        Ok(())
    }
}
