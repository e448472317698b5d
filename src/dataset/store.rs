use rand::seq::SliceRandom;

use crate::dataset::source::EpisodeSource;
use crate::error::Result;
use crate::models::EpisodeRecord;

/// Ordered, read-only view over the episodes of one dataset.
#[derive(Debug, Clone, Default)]
pub struct EpisodeStore {
    episodes: Vec<EpisodeRecord>,
}

impl EpisodeStore {
    pub fn new(episodes: Vec<EpisodeRecord>) -> Self {
        Self { episodes }
    }

    pub fn load(source: &dyn EpisodeSource) -> Result<Self> {
        let episodes = source.load()?;
        tracing::info!(
            "Loaded {} episodes from {}",
            episodes.len(),
            source.describe()
        );
        Ok(Self::new(episodes))
    }

    pub fn len(&self) -> usize {
        self.episodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.episodes.is_empty()
    }

    pub fn episodes(&self) -> &[EpisodeRecord] {
        &self.episodes
    }

    pub fn find_by_id(&self, id: &str) -> Option<&EpisodeRecord> {
        self.episodes.iter().find(|ep| ep.episode_id.matches(id))
    }

    /// Episodes whose id is in `ids`, in dataset order.
    pub fn filter_by_ids<S: AsRef<str>>(&self, ids: &[S]) -> Vec<&EpisodeRecord> {
        self.episodes
            .iter()
            .filter(|ep| ids.iter().any(|id| ep.episode_id.matches(id.as_ref())))
            .collect()
    }

    /// Stable ascending sort by episode id.
    pub fn sort_by_episode_id(&mut self) {
        self.episodes.sort_by(|a, b| a.episode_id.cmp(&b.episode_id));
    }

    pub fn take(&self, n: usize) -> &[EpisodeRecord] {
        &self.episodes[..n.min(self.episodes.len())]
    }

    pub fn random_one(&self) -> Option<&EpisodeRecord> {
        self.episodes.choose(&mut rand::thread_rng())
    }
}
