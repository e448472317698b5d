use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(
        "No valid API key configured. Set one with any of:\n  \
         1. edit {config_path} and set openrouter.api_key\n  \
         2. export OPENROUTER_API_KEY=your_key\n  \
         3. pass --api-key your_key"
    )]
    MissingCredential { config_path: String },

    #[error("Episode not found: {}", describe_ids(.0))]
    EpisodeNotFound(Vec<String>),

    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
}

fn describe_ids(ids: &[String]) -> String {
    if ids.is_empty() {
        "no episode ids given".to_string()
    } else {
        ids.join(", ")
    }
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Errors that end the run with a user-facing diagnostic rather than a crash report.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Error::MissingCredential { .. } | Error::EpisodeNotFound(_)
        )
    }
}
