use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

pub const DEFAULT_API_CONFIG_PATH: &str = "api_config.yaml";
pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "qwen/qwen-2.5-72b-instruct";
pub const API_KEY_ENV: &str = "OPENROUTER_API_KEY";
pub const PLACEHOLDER_API_KEY: &str = "your_api_key_here";

/// Effective configuration for one run. Built once by [`ConfigResolver`].
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Read from the config file for compatibility; requests are never retried.
    pub max_retries: u32,
    pub output_dir: PathBuf,
    pub default_output_file: String,
    pub use_timestamp: bool,
    /// File the settings were read from, used in remediation hints.
    pub config_path: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(30),
            temperature: 0.7,
            max_tokens: 1000,
            max_retries: 3,
            output_dir: PathBuf::from("analysis_results"),
            default_output_file: "instruction_analysis_results.json".to_string(),
            use_timestamp: false,
            config_path: PathBuf::from(DEFAULT_API_CONFIG_PATH),
        }
    }
}

impl Settings {
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| Error::MissingCredential {
                config_path: self.config_path.display().to_string(),
            })
    }
}

/// Call-site values that win over every other source.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub timeout: Option<Duration>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub output_file: Option<String>,
}

/// Snapshot of environment variables consulted during resolution.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    vars: HashMap<String, String>,
}

impl Environment {
    /// Variables whose name or value is not valid UTF-8 are skipped.
    pub fn from_process() -> Self {
        Self {
            vars: std::env::vars_os()
                .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
                .collect(),
        }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedSettings {
    pub settings: Settings,
    /// Degraded-config conditions, e.g. an unreadable config file.
    pub warnings: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ApiConfigFile {
    openrouter: OpenRouterSection,
    output: OutputSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OpenRouterSection {
    api_key: Option<String>,
    default_model: Option<String>,
    timeout: Option<u64>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
    base_url: Option<String>,
    max_retries: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OutputSection {
    default_output_file: Option<String>,
    output_dir: Option<PathBuf>,
    use_timestamp: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct ConfigResolver {
    config_path: PathBuf,
    env: Environment,
}

impl ConfigResolver {
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            env: Environment::from_process(),
        }
    }

    pub fn with_environment(mut self, env: Environment) -> Self {
        self.env = env;
        self
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn resolve(&self, overrides: &Overrides) -> ResolvedSettings {
        let mut warnings = Vec::new();
        let file = match load_api_config(&self.config_path) {
            Ok(file) => file,
            Err(message) => {
                tracing::warn!("{}; using defaults and environment variables", message);
                warnings.push(message);
                ApiConfigFile::default()
            }
        };

        let defaults = Settings::default();
        let ApiConfigFile { openrouter, output } = file;

        let api_key = usable_key(overrides.api_key.as_deref())
            .or_else(|| usable_key(openrouter.api_key.as_deref()))
            .or_else(|| usable_key(self.env.get(API_KEY_ENV)));

        let settings = Settings {
            api_key,
            base_url: overrides
                .base_url
                .clone()
                .or(openrouter.base_url)
                .unwrap_or(defaults.base_url),
            model: overrides
                .model
                .clone()
                .or(openrouter.default_model)
                .unwrap_or(defaults.model),
            timeout: overrides
                .timeout
                .or(openrouter.timeout.map(Duration::from_secs))
                .unwrap_or(defaults.timeout),
            temperature: overrides
                .temperature
                .or(openrouter.temperature)
                .unwrap_or(defaults.temperature),
            max_tokens: overrides
                .max_tokens
                .or(openrouter.max_tokens)
                .unwrap_or(defaults.max_tokens),
            max_retries: openrouter.max_retries.unwrap_or(defaults.max_retries),
            output_dir: output.output_dir.unwrap_or(defaults.output_dir),
            default_output_file: output
                .default_output_file
                .unwrap_or(defaults.default_output_file),
            use_timestamp: output.use_timestamp.unwrap_or(defaults.use_timestamp),
            config_path: self.config_path.clone(),
        };

        tracing::debug!(
            model = %settings.model,
            base_url = %settings.base_url,
            has_api_key = settings.api_key.is_some(),
            "Resolved settings"
        );

        ResolvedSettings { settings, warnings }
    }
}

fn load_api_config(path: &Path) -> std::result::Result<ApiConfigFile, String> {
    let data = std::fs::read_to_string(path)
        .map_err(|e| format!("Cannot read config file {}: {}", path.display(), e))?;
    // An empty document deserializes to null rather than an empty mapping.
    if data.trim().is_empty() {
        return Ok(ApiConfigFile::default());
    }
    serde_yaml::from_str(&data)
        .map_err(|e| format!("Cannot parse config file {}: {}", path.display(), e))
}

fn usable_key(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty() && *v != PLACEHOLDER_API_KEY)
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn config_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn with_key(key: &str) -> Overrides {
        Overrides {
            api_key: Some(key.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_api_key_precedence() {
        let file = config_file("openrouter:\n  api_key: \"Y\"\n");
        let env = Environment::from_pairs([(API_KEY_ENV, "Z")]);
        let resolver = ConfigResolver::new(file.path()).with_environment(env.clone());

        let resolved = resolver.resolve(&with_key("X"));
        assert_eq!(resolved.settings.api_key.as_deref(), Some("X"));

        let resolved = resolver.resolve(&Overrides::default());
        assert_eq!(resolved.settings.api_key.as_deref(), Some("Y"));

        let empty = config_file("openrouter:\n  default_model: m\n");
        let resolver = ConfigResolver::new(empty.path()).with_environment(env);
        let resolved = resolver.resolve(&Overrides::default());
        assert_eq!(resolved.settings.api_key.as_deref(), Some("Z"));
    }

    #[test]
    fn test_placeholder_key_is_absent() {
        let file = config_file("openrouter:\n  api_key: your_api_key_here\n");
        let env = Environment::from_pairs([(API_KEY_ENV, "Z")]);
        let resolver = ConfigResolver::new(file.path()).with_environment(env);

        let resolved = resolver.resolve(&with_key(PLACEHOLDER_API_KEY));
        assert_eq!(resolved.settings.api_key.as_deref(), Some("Z"));

        let env = Environment::from_pairs([(API_KEY_ENV, PLACEHOLDER_API_KEY)]);
        let resolver = ConfigResolver::new(file.path()).with_environment(env);
        let resolved = resolver.resolve(&Overrides::default());
        assert!(resolved.settings.api_key.is_none());
        assert!(matches!(
            resolved.settings.require_api_key(),
            Err(Error::MissingCredential { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_process_environment_skips_non_utf8_values() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        std::env::set_var(
            "VLNANALYZER_TEST_NON_UTF8",
            OsStr::from_bytes(&[b'f', 0xff, b'o']),
        );
        std::env::set_var("VLNANALYZER_TEST_UTF8", "ok");

        let env = Environment::from_process();
        assert_eq!(env.get("VLNANALYZER_TEST_UTF8"), Some("ok"));
        assert_eq!(env.get("VLNANALYZER_TEST_NON_UTF8"), None);

        std::env::remove_var("VLNANALYZER_TEST_NON_UTF8");
        std::env::remove_var("VLNANALYZER_TEST_UTF8");
    }

    #[test]
    fn test_missing_file_falls_back_with_warning() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = ConfigResolver::new(dir.path().join("absent.yaml"))
            .with_environment(Environment::default());

        let resolved = resolver.resolve(&Overrides::default());
        assert_eq!(resolved.warnings.len(), 1);

        let settings = resolved.settings;
        assert_eq!(settings.base_url, DEFAULT_BASE_URL);
        assert_eq!(settings.model, DEFAULT_MODEL);
        assert_eq!(settings.timeout, Duration::from_secs(30));
        assert_eq!(settings.max_tokens, 1000);
        assert_eq!(settings.output_dir, PathBuf::from("analysis_results"));
        assert_eq!(settings.default_output_file, "instruction_analysis_results.json");
        assert!(!settings.use_timestamp);
    }

    #[test]
    fn test_unparsable_file_is_a_warning() {
        let file = config_file("openrouter: [not, a, mapping\n");
        let resolver = ConfigResolver::new(file.path())
            .with_environment(Environment::from_pairs([(API_KEY_ENV, "Z")]));

        let resolved = resolver.resolve(&Overrides::default());
        assert_eq!(resolved.warnings.len(), 1);
        assert!(resolved.warnings[0].contains("Cannot parse"));
        assert_eq!(resolved.settings.api_key.as_deref(), Some("Z"));
    }

    #[test]
    fn test_file_values_and_overrides() {
        let file = config_file(
            r#"
openrouter:
  default_model: qwen/qwen-2.5-7b-instruct
  timeout: 60
  max_tokens: 2048
  temperature: 0.2
  base_url: http://localhost:9999/v1/chat/completions
  max_retries: 5
output:
  default_output_file: results.json
  output_dir: out
  use_timestamp: true
"#,
        );
        let resolver =
            ConfigResolver::new(file.path()).with_environment(Environment::default());

        let settings = resolver.resolve(&Overrides::default()).settings;
        assert_eq!(settings.model, "qwen/qwen-2.5-7b-instruct");
        assert_eq!(settings.timeout, Duration::from_secs(60));
        assert_eq!(settings.max_tokens, 2048);
        assert_eq!(settings.max_retries, 5);
        assert_eq!(settings.output_dir, PathBuf::from("out"));
        assert!(settings.use_timestamp);

        let overrides = Overrides {
            model: Some("qwen/qwen-2-72b-instruct".to_string()),
            max_tokens: Some(10),
            ..Default::default()
        };
        let settings = resolver.resolve(&overrides).settings;
        assert_eq!(settings.model, "qwen/qwen-2-72b-instruct");
        assert_eq!(settings.max_tokens, 10);
        assert_eq!(settings.temperature, 0.2);
    }
}
