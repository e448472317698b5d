use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};

use crate::config::Settings;
use crate::error::Result;
use crate::models::AnalysisResult;

/// Collects successful analyses for one run and writes them out at the end.
#[derive(Debug, Default)]
pub struct ResultSink {
    results: Vec<AnalysisResult>,
}

impl ResultSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, result: AnalysisResult) {
        self.results.push(result);
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn results(&self) -> &[AnalysisResult] {
        &self.results
    }

    /// Writes the collected results, returning `None` without touching the
    /// filesystem when nothing was collected.
    pub fn persist(self, settings: &Settings, output_override: Option<&str>) -> Result<Option<PathBuf>> {
        if self.results.is_empty() {
            tracing::debug!("No analysis results to save");
            return Ok(None);
        }
        persist(&self.results, settings, output_override).map(Some)
    }
}

/// Writes `results` as a pretty-printed JSON array and returns the path written.
pub fn persist(
    results: &[AnalysisResult],
    settings: &Settings,
    output_override: Option<&str>,
) -> Result<PathBuf> {
    let path = resolve_output_path(settings, output_override, Local::now());
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(results)?;
    std::fs::write(&path, json)?;
    tracing::info!("Saved {} analysis result(s) to {}", results.len(), path.display());

    Ok(path)
}

/// `output_dir/filename`, where the filename is the override or the configured
/// default. The default gets a `_YYYYMMDD_HHMMSS` suffix before its extension
/// when timestamps are enabled.
pub fn resolve_output_path(
    settings: &Settings,
    output_override: Option<&str>,
    now: DateTime<Local>,
) -> PathBuf {
    let filename = match output_override {
        Some(name) => name.to_string(),
        None if settings.use_timestamp => {
            timestamped(&settings.default_output_file, &now.format("%Y%m%d_%H%M%S").to_string())
        }
        None => settings.default_output_file.clone(),
    };
    settings.output_dir.join(filename)
}

fn timestamped(filename: &str, stamp: &str) -> String {
    let path = Path::new(filename);
    match (path.file_stem(), path.extension()) {
        (Some(stem), Some(ext)) => {
            let name = format!("{}_{}.{}", stem.to_string_lossy(), stamp, ext.to_string_lossy());
            match path.parent().filter(|p| !p.as_os_str().is_empty()) {
                Some(parent) => parent.join(name).to_string_lossy().into_owned(),
                None => name,
            }
        }
        _ => format!("{}_{}", filename, stamp),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EpisodeId;
    use chrono::TimeZone;

    fn result(id: i64, analysis: &str) -> AnalysisResult {
        AnalysisResult {
            episode_id: EpisodeId::Int(id),
            scene_id: "mp3d/zsNo4HB9uLZ/zsNo4HB9uLZ.glb".to_string(),
            instruction: "Walk into the kitchen and stop by the fridge.".to_string(),
            analysis: analysis.to_string(),
        }
    }

    fn settings(dir: &Path) -> Settings {
        Settings {
            output_dir: dir.join("nested").join("results"),
            ..Default::default()
        }
    }

    #[test]
    fn test_round_trip_preserves_results() {
        let dir = tempfile::tempdir().unwrap();
        let results = vec![result(1, "任务类型：房间切换"), result(2, "easy")];

        let path = persist(&results, &settings(dir.path()), None).unwrap();
        assert_eq!(
            path,
            dir.path().join("nested/results/instruction_analysis_results.json")
        );

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("任务类型"), "non-ASCII must not be escaped");
        assert!(raw.contains("\n  {"));

        let read_back: Vec<AnalysisResult> = serde_json::from_str(&raw).unwrap();
        assert_eq!(read_back, results);
    }

    #[test]
    fn test_rewrite_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path());

        persist(&[result(1, "first"), result(2, "first")], &settings, Some("out.json")).unwrap();
        let path = persist(&[result(3, "second")], &settings, Some("out.json")).unwrap();

        let read_back: Vec<AnalysisResult> =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(read_back, vec![result(3, "second")]);
    }

    #[test]
    fn test_timestamped_filename() {
        let now = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        let settings = Settings {
            use_timestamp: true,
            ..Default::default()
        };

        assert_eq!(
            resolve_output_path(&settings, None, now),
            PathBuf::from("analysis_results/instruction_analysis_results_20240309_140507.json")
        );
        assert_eq!(
            resolve_output_path(&settings, Some("mine.json"), now),
            PathBuf::from("analysis_results/mine.json")
        );
        assert_eq!(timestamped("results", "20240309_140507"), "results_20240309_140507");
    }

    #[test]
    fn test_empty_sink_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path());

        assert_eq!(ResultSink::new().persist(&settings, None).unwrap(), None);
        assert!(!settings.output_dir.exists());
    }
}
