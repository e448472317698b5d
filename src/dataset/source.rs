use flate2::read::GzDecoder;
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::models::EpisodeRecord;

pub const DEFAULT_DATASET_TYPE: &str = "VLN-CE-v1";
pub const DEFAULT_SPLIT: &str = "train";
pub const DEFAULT_DATA_PATH: &str =
    "data/datasets/R2R_VLNCE_v1-2_preprocessed/{split}/{split}.json.gz";

/// Provider of the ordered episode collection of a dataset.
pub trait EpisodeSource {
    fn load(&self) -> Result<Vec<EpisodeRecord>>;

    fn describe(&self) -> String {
        "in-memory episodes".to_string()
    }
}

impl EpisodeSource for Vec<EpisodeRecord> {
    fn load(&self) -> Result<Vec<EpisodeRecord>> {
        Ok(self.clone())
    }
}

/// Dataset block of a VLN-CE experiment config (`TASK_CONFIG.DATASET`).
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetConfig {
    pub dataset_type: String,
    pub split: String,
    pub data_path: String,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            dataset_type: DEFAULT_DATASET_TYPE.to_string(),
            split: DEFAULT_SPLIT.to_string(),
            data_path: DEFAULT_DATA_PATH.to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ExperimentFile {
    #[serde(rename = "BASE_TASK_CONFIG_PATH")]
    base_task_config_path: Option<PathBuf>,
    #[serde(rename = "TASK_CONFIG")]
    task_config: TaskFile,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TaskFile {
    #[serde(rename = "DATASET")]
    dataset: DatasetSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DatasetSection {
    #[serde(rename = "TYPE")]
    dataset_type: Option<String>,
    #[serde(rename = "SPLIT")]
    split: Option<String>,
    #[serde(rename = "DATA_PATH")]
    data_path: Option<String>,
}

impl DatasetSection {
    fn or(self, fallback: DatasetSection) -> DatasetSection {
        DatasetSection {
            dataset_type: self.dataset_type.or(fallback.dataset_type),
            split: self.split.or(fallback.split),
            data_path: self.data_path.or(fallback.data_path),
        }
    }
}

impl DatasetConfig {
    /// Reads the dataset block of an experiment config. Values missing there are
    /// taken from the `DATASET` block of `BASE_TASK_CONFIG_PATH`, then defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let experiment: ExperimentFile = read_yaml(path)?;

        let mut section = experiment.task_config.dataset;
        if let Some(base_path) = experiment.base_task_config_path {
            if base_path.exists() {
                let base: TaskFile = read_yaml(&base_path)?;
                section = section.or(base.dataset);
            } else {
                tracing::warn!(
                    "Base task config {} not found, using dataset defaults",
                    base_path.display()
                );
            }
        }

        let defaults = Self::default();
        Ok(Self {
            dataset_type: section.dataset_type.unwrap_or(defaults.dataset_type),
            split: section.split.unwrap_or(defaults.split),
            data_path: section.data_path.unwrap_or(defaults.data_path),
        })
    }

    pub fn episodes_path(&self) -> PathBuf {
        PathBuf::from(self.data_path.replace("{split}", &self.split))
    }
}

fn read_yaml<T: serde::de::DeserializeOwned + Default>(path: &Path) -> Result<T> {
    let data = std::fs::read_to_string(path).map_err(|e| {
        Error::Dataset(format!("failed to read config {}: {}", path.display(), e))
    })?;
    if data.trim().is_empty() {
        return Ok(T::default());
    }
    Ok(serde_yaml::from_str(&data)?)
}

#[derive(Deserialize)]
struct DatasetFile {
    episodes: Vec<EpisodeRecord>,
}

/// Episodes stored as `{"episodes": [...]}` in a `.json` or `.json.gz` file.
#[derive(Debug, Clone)]
pub struct JsonDatasetSource {
    path: PathBuf,
    dataset_type: String,
}

impl JsonDatasetSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            dataset_type: DEFAULT_DATASET_TYPE.to_string(),
        }
    }

    pub fn from_config(config: &DatasetConfig) -> Self {
        Self {
            path: config.episodes_path(),
            dataset_type: config.dataset_type.clone(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> Result<Box<dyn Read>> {
        let file = File::open(&self.path).map_err(|e| {
            Error::Dataset(format!(
                "failed to open episodes {}: {}",
                self.path.display(),
                e
            ))
        })?;
        if self.path.extension().map(|e| e == "gz").unwrap_or(false) {
            Ok(Box::new(GzDecoder::new(file)))
        } else {
            Ok(Box::new(file))
        }
    }
}

impl EpisodeSource for JsonDatasetSource {
    fn load(&self) -> Result<Vec<EpisodeRecord>> {
        tracing::info!(
            "Loading {} episodes from {}",
            self.dataset_type,
            self.path.display()
        );
        let reader = BufReader::new(self.open()?);
        let dataset: DatasetFile = serde_json::from_reader(reader).map_err(|e| {
            Error::Dataset(format!(
                "failed to parse episodes {}: {}",
                self.path.display(),
                e
            ))
        })?;
        Ok(dataset.episodes)
    }

    fn describe(&self) -> String {
        format!("{} ({})", self.path.display(), self.dataset_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    const EPISODES: &str = r#"{
        "episodes": [
            {"episode_id": 3, "trajectory_id": 1, "scene_id": "mp3d/a/a.glb",
             "start_position": [1.0, 0.5, -2.0], "start_rotation": [0, 0.7, 0, 0.7],
             "instruction": {"instruction_text": "Exit the bedroom.", "instruction_tokens": [4, 5]},
             "goals": [{"position": [3.0, 0.5, 1.0], "radius": 3.0}]},
            {"episode_id": 1, "scene_id": "mp3d/b/b.glb"}
        ],
        "instruction_vocab": {"word_list": []}
    }"#;

    #[test]
    fn test_load_plain_and_gzip() {
        let dir = tempfile::tempdir().unwrap();

        let plain = dir.path().join("val.json");
        std::fs::write(&plain, EPISODES).unwrap();
        let episodes = JsonDatasetSource::new(&plain).load().unwrap();
        assert_eq!(episodes.len(), 2);
        assert_eq!(episodes[0].start_position, Some(vec![1.0, 0.5, -2.0]));

        let gz = dir.path().join("val.json.gz");
        let mut encoder = GzEncoder::new(File::create(&gz).unwrap(), Compression::default());
        encoder.write_all(EPISODES.as_bytes()).unwrap();
        encoder.finish().unwrap();
        let from_gz = JsonDatasetSource::new(&gz).load().unwrap();
        assert_eq!(from_gz, episodes);
    }

    #[test]
    fn test_missing_episodes_file() {
        let err = JsonDatasetSource::new("/nonexistent/val.json.gz")
            .load()
            .unwrap_err();
        assert!(matches!(err, Error::Dataset(_)));
    }

    #[test]
    fn test_dataset_config_split_substitution() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exp.yaml");
        std::fs::write(
            &path,
            "TASK_CONFIG:\n  DATASET:\n    TYPE: VLN-CE-v1\n    SPLIT: val_unseen\nEVAL:\n  SPLIT: val_unseen\n",
        )
        .unwrap();

        let config = DatasetConfig::load(&path).unwrap();
        assert_eq!(config.split, "val_unseen");
        assert_eq!(
            config.episodes_path(),
            PathBuf::from("data/datasets/R2R_VLNCE_v1-2_preprocessed/val_unseen/val_unseen.json.gz")
        );
    }

    #[test]
    fn test_dataset_config_base_task_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("task.yaml");
        std::fs::write(
            &base,
            "DATASET:\n  TYPE: RxR-VLN-CE-v1\n  SPLIT: val_seen\n  DATA_PATH: rxr/{split}.json\n",
        )
        .unwrap();
        let exp = dir.path().join("exp.yaml");
        std::fs::write(
            &exp,
            format!(
                "BASE_TASK_CONFIG_PATH: {}\nTASK_CONFIG:\n  DATASET:\n    SPLIT: train\n",
                base.display()
            ),
        )
        .unwrap();

        let config = DatasetConfig::load(&exp).unwrap();
        assert_eq!(config.dataset_type, "RxR-VLN-CE-v1");
        assert_eq!(config.split, "train");
        assert_eq!(config.episodes_path(), PathBuf::from("rxr/train.json"));
    }
}
