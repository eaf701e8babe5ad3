/// Live player sessions, one `PlayerProgress` per player, safe to share
/// between threads.

use dashmap::DashMap;

use crate::core::store::{ProgressStore, StoreResult};
use crate::schema::ids::PlayerId;
use crate::schema::player::PlayerProgress;

/// Holds the progress of every active player.
///
/// A player's progress is only ever touched through [`SessionRegistry::with_player`],
/// which holds the entry's write guard for the whole closure. Two requests
/// for the same player are therefore serialized, while different players
/// proceed in parallel.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    players: DashMap<PlayerId, PlayerProgress>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` against a player's progress, creating a fresh player if
    /// none is active. `f` must not call back into this registry for the
    /// same player.
    pub fn with_player<R>(&self, id: &PlayerId, f: impl FnOnce(&mut PlayerProgress) -> R) -> R {
        let mut entry = self
            .players
            .entry(id.clone())
            .or_insert_with(|| PlayerProgress::new(id.clone()));
        f(entry.value_mut())
    }

    /// Make a player active, loading them from `store` if they are not
    /// already in memory.
    pub fn load(&self, id: &PlayerId, store: &dyn ProgressStore) -> StoreResult<()> {
        if self.players.contains_key(id) {
            return Ok(());
        }
        let progress = store.load_or_new(id)?;
        // Another thread may have loaded the player meanwhile; keep theirs.
        self.players.entry(id.clone()).or_insert(progress);
        tracing::debug!(player = %id, "session loaded");
        Ok(())
    }

    /// Write a player's current progress to `store`. Inactive players are
    /// skipped.
    pub fn save(&self, id: &PlayerId, store: &dyn ProgressStore) -> StoreResult<()> {
        match self.players.get(id) {
            Some(progress) => store.save(progress.value()),
            None => Ok(()),
        }
    }

    pub fn insert(&self, progress: PlayerProgress) -> Option<PlayerProgress> {
        self.players.insert(progress.player_id.clone(), progress)
    }

    pub fn remove(&self, id: &PlayerId) -> Option<PlayerProgress> {
        self.players.remove(id).map(|(_, progress)| progress)
    }

    /// A copy of a player's progress.
    pub fn snapshot(&self, id: &PlayerId) -> Option<PlayerProgress> {
        self.players.get(id).map(|p| p.value().clone())
    }

    pub fn active_players(&self) -> Vec<PlayerId> {
        self.players.iter().map(|e| e.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}
