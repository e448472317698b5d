pub mod source;
pub mod store;

pub use source::{DatasetConfig, EpisodeSource, JsonDatasetSource};
pub use store::EpisodeStore;
