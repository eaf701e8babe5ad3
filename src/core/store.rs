/// Progress persistence: a load/save interface keyed by player id.

use dashmap::DashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::schema::ids::PlayerId;
use crate::schema::player::PlayerProgress;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("RON serialization error: {0}")]
    RonSerialize(#[from] ron::Error),
    #[error("invalid player id for file storage: {0}")]
    InvalidPlayerId(PlayerId),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Key-value storage for player progress.
///
/// Implementations must be thread-safe (Send + Sync) so a store can be
/// shared between sessions.
pub trait ProgressStore: Send + Sync {
    fn load(&self, player: &PlayerId) -> StoreResult<Option<PlayerProgress>>;

    fn save(&self, progress: &PlayerProgress) -> StoreResult<()>;

    /// Load a player, or a fresh one if nothing is stored yet.
    fn load_or_new(&self, player: &PlayerId) -> StoreResult<PlayerProgress> {
        Ok(self
            .load(player)?
            .unwrap_or_else(|| PlayerProgress::new(player.clone())))
    }
}

/// In-memory store, mostly for tests and single-process hosts.
#[derive(Debug, Default)]
pub struct MemoryProgressStore {
    players: DashMap<PlayerId, PlayerProgress>,
}

impl MemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

impl ProgressStore for MemoryProgressStore {
    fn load(&self, player: &PlayerId) -> StoreResult<Option<PlayerProgress>> {
        Ok(self.players.get(player).map(|p| p.value().clone()))
    }

    fn save(&self, progress: &PlayerProgress) -> StoreResult<()> {
        self.players
            .insert(progress.player_id.clone(), progress.clone());
        Ok(())
    }
}

/// One pretty-printed RON file per player under a directory.
#[derive(Debug, Clone)]
pub struct RonFileStore {
    dir: PathBuf,
}

impl RonFileStore {
    /// Use `dir` for storage, creating it if needed.
    pub fn open(dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, player: &PlayerId) -> StoreResult<PathBuf> {
        let id = player.as_str();
        let safe = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !safe {
            return Err(StoreError::InvalidPlayerId(player.clone()));
        }
        Ok(self.dir.join(format!("{id}.ron")))
    }
}

impl ProgressStore for RonFileStore {
    fn load(&self, player: &PlayerId) -> StoreResult<Option<PlayerProgress>> {
        let path = self.path_for(player)?;
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path)?;
        Ok(Some(ron::from_str(&contents)?))
    }

    fn save(&self, progress: &PlayerProgress) -> StoreResult<()> {
        let path = self.path_for(&progress.player_id)?;
        let text = ron::ser::to_string_pretty(progress, ron::ser::PrettyConfig::default())?;
        // Write then rename so a crash never leaves a half-written file.
        let tmp = path.with_extension("ron.tmp");
        std::fs::write(&tmp, text)?;
        std::fs::rename(&tmp, &path)?;
        tracing::debug!(player = %progress.player_id, path = %path.display(), "saved progress");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ledger::TraitName;
    use crate::schema::ids::{FragmentId, NodeId, StoryId};
    use crate::schema::player::StoryProgress;
    use crate::schema::story::Chapter;

    fn sample() -> PlayerProgress {
        let mut p = PlayerProgress::new("neo");
        p.paradox_coins = -7;
        p.current_chapter = Chapter::Training;
        p.completed_stories.push(StoryId::from("the-truth-covenant"));
        p.discover_fragment(FragmentId::from("genesis-truth"));
        p.inventory.insert("invitation".to_string());
        p.lie_profile.apply_delta(TraitName::ParadoxAptitude, 2);
        p.stories.insert(
            StoryId::from("quantum-deception"),
            StoryProgress {
                current_node: NodeId::from("intro-1"),
            },
        );
        p
    }

    #[test]
    fn memory_store_round_trip() {
        let store = MemoryProgressStore::new();
        let id = PlayerId::from("neo");
        assert!(store.load(&id).unwrap().is_none());
        store.save(&sample()).unwrap();
        assert_eq!(store.load(&id).unwrap(), Some(sample()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn load_or_new_creates_fresh_player() {
        let store = MemoryProgressStore::new();
        let p = store.load_or_new(&PlayerId::from("trinity")).unwrap();
        assert_eq!(p, PlayerProgress::new("trinity"));
    }

    #[test]
    fn file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = RonFileStore::open(dir.path().join("players")).unwrap();
        store.save(&sample()).unwrap();
        let loaded = store.load(&PlayerId::from("neo")).unwrap().unwrap();
        assert_eq!(loaded, sample());
        assert!(store.load(&PlayerId::from("smith")).unwrap().is_none());
    }

    #[test]
    fn file_store_rejects_path_like_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = RonFileStore::open(dir.path()).unwrap();
        let mut p = sample();
        p.player_id = PlayerId::from("../escape");
        assert!(matches!(store.save(&p), Err(StoreError::InvalidPlayerId(_))));
    }
}
