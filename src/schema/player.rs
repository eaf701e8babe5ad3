use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use super::ids::{FragmentId, NodeId, PlayerId, StoryId};
use super::story::Chapter;
use crate::core::ledger::LieProfile;

/// Where a player is within one story.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryProgress {
    pub current_node: NodeId,
}

/// Everything the engine knows about one player.
///
/// Owned by a single session at a time; the engine mutates it in place and
/// hands it back to the caller to persist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerProgress {
    pub player_id: PlayerId,
    #[serde(default)]
    pub stories: FxHashMap<StoryId, StoryProgress>,
    /// Completed stories in completion order. Never contains duplicates.
    #[serde(default)]
    pub completed_stories: Vec<StoryId>,
    #[serde(default)]
    pub current_chapter: Chapter,
    #[serde(default)]
    pub paradox_coins: i64,
    /// Discovered fragments in discovery order. Never contains duplicates.
    #[serde(default)]
    pub truth_fragments: Vec<FragmentId>,
    #[serde(default)]
    pub inventory: FxHashSet<String>,
    #[serde(default)]
    pub lie_profile: LieProfile,
}

impl PlayerProgress {
    pub fn new(player_id: impl Into<PlayerId>) -> Self {
        Self {
            player_id: player_id.into(),
            stories: FxHashMap::default(),
            completed_stories: Vec::new(),
            current_chapter: Chapter::default(),
            paradox_coins: 0,
            truth_fragments: Vec::new(),
            inventory: FxHashSet::default(),
            lie_profile: LieProfile::default(),
        }
    }

    pub fn has_completed(&self, story: &StoryId) -> bool {
        self.completed_stories.contains(story)
    }

    pub fn owns_fragment(&self, fragment: &FragmentId) -> bool {
        self.truth_fragments.contains(fragment)
    }

    pub fn has_item(&self, item: &str) -> bool {
        self.inventory.contains(item)
    }

    pub fn current_node(&self, story: &StoryId) -> Option<&NodeId> {
        self.stories.get(story).map(|p| &p.current_node)
    }

    /// Add a fragment unless already owned. Returns true if it was new.
    pub fn discover_fragment(&mut self, fragment: FragmentId) -> bool {
        if self.owns_fragment(&fragment) {
            return false;
        }
        self.truth_fragments.push(fragment);
        true
    }
}

/// The persisted player document layout the surrounding service stores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerDocument {
    pub game_state: GameState,
    pub lie_profile: LieProfile,
    pub digital_assets: DigitalAssets,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub current_chapter: Chapter,
    pub completed_stories: Vec<StoryId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DigitalAssets {
    pub paradox_coins: i64,
    pub truth_fragments: Vec<FragmentId>,
}

impl From<&PlayerProgress> for PlayerDocument {
    fn from(player: &PlayerProgress) -> Self {
        Self {
            game_state: GameState {
                current_chapter: player.current_chapter,
                completed_stories: player.completed_stories.clone(),
            },
            lie_profile: player.lie_profile,
            digital_assets: DigitalAssets {
                paradox_coins: player.paradox_coins,
                truth_fragments: player.truth_fragments.clone(),
            },
        }
    }
}
