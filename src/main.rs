use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use vlnanalyzer::config::DEFAULT_API_CONFIG_PATH;
use vlnanalyzer::llm::prompts::DEFAULT_RESPONSE_LANGUAGE;
use vlnanalyzer::{
    AnalysisPipeline, ConfigResolver, DatasetConfig, Error, JsonDatasetSource, Overrides,
    PromptTemplate, RunRequest, Selection,
};

const DEFAULT_EXPERIMENT_CONFIG: &str = "VLN_CE/vlnce_baselines/config/r2r_baselines/navid_r2r.yaml";

#[derive(Parser, Debug)]
#[command(name = "vlnanalyzer")]
#[command(version = "0.1.0")]
#[command(about = "Print VLN-CE episode instructions and analyze them with an LLM")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print instructions of selected episodes, optionally analyzing and saving them
    Print(PrintArgs),
    /// Show one episode (random unless an id is given) with a brief analysis
    Inspect(InspectArgs),
}

#[derive(Args, Debug)]
struct LlmArgs {
    /// OpenRouter API key (also read from the api config or OPENROUTER_API_KEY)
    #[arg(long)]
    api_key: Option<String>,

    /// Model to use, e.g. qwen/qwen-2.5-72b-instruct or qwen/qwen-2.5-7b-instruct
    #[arg(long)]
    model: Option<String>,

    /// API configuration file
    #[arg(long, default_value = DEFAULT_API_CONFIG_PATH)]
    api_config: PathBuf,

    /// Language the analysis should be written in
    #[arg(long, default_value = DEFAULT_RESPONSE_LANGUAGE)]
    language: String,
}

#[derive(Args, Debug)]
struct PrintArgs {
    /// VLN-CE experiment config (YAML)
    #[arg(long)]
    config: PathBuf,

    /// Episode ids to print, e.g. --episode-ids 123 456 789
    #[arg(long, num_args = 1..)]
    episode_ids: Option<Vec<String>>,

    /// Number of episodes to print when no ids are given
    #[arg(long, default_value = "10")]
    max_episodes: usize,

    /// Analyze each instruction with the LLM
    #[arg(long)]
    analyze: bool,

    /// Save analysis results to a JSON file
    #[arg(long)]
    save_analysis: bool,

    /// Output file name (defaults to the api config's output settings)
    #[arg(long)]
    output_file: Option<String>,

    #[command(flatten)]
    llm: LlmArgs,
}

#[derive(Args, Debug)]
struct InspectArgs {
    /// VLN-CE experiment config (YAML)
    #[arg(long, default_value = DEFAULT_EXPERIMENT_CONFIG)]
    config: PathBuf,

    /// Episode id to show (a random episode when omitted)
    #[arg(long)]
    episode_id: Option<String>,

    /// Analyze the instruction with the LLM
    #[arg(short, long)]
    analyze: bool,

    #[command(flatten)]
    llm: LlmArgs,
}

impl LlmArgs {
    fn overrides(&self, output_file: Option<String>) -> Overrides {
        Overrides {
            api_key: self.api_key.clone(),
            model: self.model.clone(),
            output_file,
            ..Default::default()
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("vlnanalyzer=info".parse()?)
                .add_directive("reqwest=warn".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let (pipeline, request) = match cli.command {
        Command::Print(args) => {
            let pipeline = build_pipeline(&args.config, &args.llm, PromptTemplate::detailed())?;
            let selection = match args.episode_ids {
                Some(ids) if !ids.is_empty() => Selection::Ids(ids),
                _ => Selection::First(args.max_episodes),
            };
            let request = RunRequest {
                selection,
                analyze: args.analyze,
                persist: args.save_analysis,
                sort: true,
                overrides: args.llm.overrides(args.output_file.clone()),
            };
            (pipeline, request)
        }
        Command::Inspect(args) => {
            let pipeline = build_pipeline(&args.config, &args.llm, PromptTemplate::brief())?;
            let selection = match args.episode_id {
                Some(id) => Selection::Ids(vec![id]),
                None => Selection::Random,
            };
            let request = RunRequest {
                selection,
                analyze: args.analyze,
                persist: false,
                sort: false,
                overrides: args.llm.overrides(None),
            };
            (pipeline, request)
        }
    };

    let mut stdout = std::io::stdout().lock();
    match pipeline.run(&request, &mut stdout).await {
        Ok(report) => {
            tracing::info!("{}", report);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) if e.is_user_facing() => {
            let label = match e {
                Error::EpisodeNotFound(_) => "Warning",
                _ => "Error",
            };
            writeln!(stdout, "{}: {}", label, e)?;
            Ok(ExitCode::FAILURE)
        }
        Err(e) => Err(e.into()),
    }
}

fn build_pipeline(
    experiment_config: &Path,
    llm: &LlmArgs,
    template: PromptTemplate,
) -> anyhow::Result<AnalysisPipeline> {
    let dataset = DatasetConfig::load(experiment_config)?;
    let source = JsonDatasetSource::from_config(&dataset);
    let resolver = ConfigResolver::new(&llm.api_config);

    Ok(AnalysisPipeline::new(resolver, source)
        .with_template(template.with_language(llm.language.clone()))
        .with_progress(std::io::stderr().is_terminal()))
}
