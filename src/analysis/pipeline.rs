use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::analysis::display::{self, rule};
use crate::config::{ConfigResolver, Overrides, ResolvedSettings, Settings};
use crate::dataset::{EpisodeSource, EpisodeStore};
use crate::error::{Error, Result};
use crate::llm::{AnalysisOutcome, InstructionAnalyzer, OpenRouterClient, PromptTemplate};
use crate::models::{AnalysisResult, EpisodeRecord, PipelineReport};
use crate::storage::ResultSink;

/// Which episodes a run covers.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    Ids(Vec<String>),
    First(usize),
    Random,
}

#[derive(Debug, Clone)]
pub struct RunRequest {
    pub selection: Selection,
    pub analyze: bool,
    pub persist: bool,
    /// Sort by episode id before applying the selection.
    pub sort: bool,
    pub overrides: Overrides,
}

impl Default for RunRequest {
    fn default() -> Self {
        Self {
            selection: Selection::First(10),
            analyze: false,
            persist: false,
            sort: true,
            overrides: Overrides::default(),
        }
    }
}

pub struct AnalysisPipeline {
    resolver: ConfigResolver,
    source: Box<dyn EpisodeSource>,
    template: PromptTemplate,
    analyzer: Option<Arc<dyn InstructionAnalyzer>>,
    show_progress: bool,
}

impl AnalysisPipeline {
    pub fn new(resolver: ConfigResolver, source: impl EpisodeSource + 'static) -> Self {
        Self {
            resolver,
            source: Box::new(source),
            template: PromptTemplate::default(),
            analyzer: None,
            show_progress: false,
        }
    }

    pub fn with_template(mut self, template: PromptTemplate) -> Self {
        self.template = template;
        self
    }

    /// Uses `analyzer` instead of an OpenRouter client built from the settings.
    pub fn with_analyzer(mut self, analyzer: impl InstructionAnalyzer + 'static) -> Self {
        self.analyzer = Some(Arc::new(analyzer));
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub async fn run(&self, request: &RunRequest, out: &mut dyn Write) -> Result<PipelineReport> {
        let ResolvedSettings { settings, warnings } = self.resolver.resolve(&request.overrides);

        // Credentials are checked before the dataset is touched.
        let analyzer = if request.analyze {
            Some(self.analyzer_for(&settings)?)
        } else {
            None
        };
        if settings.max_retries > 0 {
            tracing::debug!(
                "max_retries = {} is configured; each analysis is attempted once",
                settings.max_retries
            );
        }

        let mut store = EpisodeStore::load(self.source.as_ref())?;
        if request.sort {
            store.sort_by_episode_id();
        }
        writeln!(out, "Dataset contains {} episodes\n", store.len())?;
        writeln!(out, "{}", rule('='))?;

        let mut report = PipelineReport {
            warnings,
            ..Default::default()
        };
        let selected = select(&store, &request.selection, &mut report.warnings)?;
        let total = selected.len();
        let mut sink = ResultSink::new();

        for (idx, episode) in selected.into_iter().enumerate() {
            display::write_episode(out, idx + 1, total, episode)?;
            report.processed += 1;

            if let Some(ref analyzer) = analyzer {
                match episode.analyzable_instruction() {
                    Some(instruction) => {
                        let outcome = self
                            .analyze_episode(analyzer.as_ref(), episode, &instruction, out)
                            .await?;
                        match outcome {
                            AnalysisOutcome::Success { text } => {
                                report.analyzed += 1;
                                if request.persist {
                                    sink.push(AnalysisResult {
                                        episode_id: episode.episode_id.clone(),
                                        scene_id: episode.scene_id.clone(),
                                        instruction,
                                        analysis: text,
                                    });
                                }
                            }
                            AnalysisOutcome::Failure { .. } => report.failed += 1,
                        }
                    }
                    None => writeln!(out, "\nNo valid instruction to analyze")?,
                }
            }

            writeln!(out, "{}", rule('='))?;
        }

        writeln!(out, "\nPrinted information for {} episode(s)", total)?;

        if request.persist {
            report.output_path =
                sink.persist(&settings, request.overrides.output_file.as_deref())?;
            if let Some(ref path) = report.output_path {
                writeln!(out, "Analysis results saved to: {}", path.display())?;
            }
        }

        tracing::info!(
            processed = report.processed,
            analyzed = report.analyzed,
            failed = report.failed,
            "Pipeline run finished"
        );
        Ok(report)
    }

    fn analyzer_for(&self, settings: &Settings) -> Result<Arc<dyn InstructionAnalyzer>> {
        settings.require_api_key()?;
        match self.analyzer {
            Some(ref analyzer) => Ok(analyzer.clone()),
            None => Ok(Arc::new(OpenRouterClient::new(
                settings,
                self.template.clone(),
            )?)),
        }
    }

    async fn analyze_episode(
        &self,
        analyzer: &dyn InstructionAnalyzer,
        episode: &EpisodeRecord,
        instruction: &str,
        out: &mut dyn Write,
    ) -> Result<AnalysisOutcome> {
        writeln!(out, "\n{}", rule('-'))?;
        writeln!(out, "Analyzing instruction (model: {})", analyzer.model())?;
        writeln!(out, "{}", rule('-'))?;

        let spinner = self.spinner(analyzer.model());
        let outcome = analyzer.analyze(instruction).await;
        spinner.finish_and_clear();

        match outcome {
            AnalysisOutcome::Success { ref text } => writeln!(out, "{}", text)?,
            AnalysisOutcome::Failure { kind, ref message } => {
                tracing::warn!(
                    "Analysis failed for episode {}: {}: {}",
                    episode.episode_id,
                    kind,
                    message
                );
                writeln!(out, "❌ {}: {}", kind, message)?;
            }
        }
        Ok(outcome)
    }

    fn spinner(&self, model: &str) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}") {
            spinner.set_style(style);
        }
        spinner.set_message(format!("Waiting for {}", model));
        spinner.enable_steady_tick(Duration::from_millis(120));
        spinner
    }
}

/// Resolves `selection` against the store. Ids that match nothing are appended
/// to `warnings`; an empty or entirely unknown id list is an error.
fn select<'a>(
    store: &'a EpisodeStore,
    selection: &Selection,
    warnings: &mut Vec<String>,
) -> Result<Vec<&'a EpisodeRecord>> {
    match selection {
        Selection::Ids(ids) => {
            let found = store.filter_by_ids(ids.as_slice());
            if found.is_empty() {
                return Err(Error::EpisodeNotFound(ids.clone()));
            }
            let missing: Vec<&str> = ids
                .iter()
                .filter(|id| !found.iter().any(|ep| ep.episode_id.matches(id)))
                .map(String::as_str)
                .collect();
            if !missing.is_empty() {
                let message = format!("Episode ID(s) not found: {}", missing.join(", "));
                tracing::warn!("{}", message);
                warnings.push(message);
            }
            Ok(found)
        }
        Selection::First(n) => Ok(store.take(*n).iter().collect()),
        Selection::Random => Ok(store.random_one().into_iter().collect()),
    }
}
