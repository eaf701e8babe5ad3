use serde::{Deserialize, Serialize};

use super::ids::{FragmentId, NodeId, StoryId};
use crate::core::ledger::TraitName;

/// The three story arcs, in the order a player moves through them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chapter {
    Awakening,
    Training,
    Subversion,
}

impl Default for Chapter {
    fn default() -> Self {
        Self::Awakening
    }
}

impl Chapter {
    /// The chapter that follows this one, or `None` at the end of the arc.
    pub fn next(self) -> Option<Chapter> {
        match self {
            Self::Awakening => Some(Self::Training),
            Self::Training => Some(Self::Subversion),
            Self::Subversion => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Awakening => "awakening",
            Self::Training => "training",
            Self::Subversion => "subversion",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Narrative,
    Dialogue,
    Puzzle,
    Paradox,
    Choice,
    /// Text is supplied at read time by a [`NarrativeTextSource`](crate::core::capabilities::NarrativeTextSource).
    Dynamic,
}

impl Default for NodeType {
    fn default() -> Self {
        Self::Narrative
    }
}

/// Text and media references for a node. Opaque to the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeContent {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub background: Option<String>,
    #[serde(default)]
    pub audio: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeMetadata {
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub characters: Vec<String>,
    #[serde(default)]
    pub mood: Option<String>,
    #[serde(default)]
    pub time_period: Option<String>,
}

/// A minimum trait level a choice demands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraitRequirement {
    pub name: TraitName,
    pub level: i32,
}

/// Requirements a player must meet for a choice to be selectable.
/// Every listed requirement must hold.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Prerequisites {
    #[serde(default)]
    pub items: Vec<String>,
    #[serde(default)]
    pub traits: Vec<TraitRequirement>,
    #[serde(default)]
    pub truth: Vec<FragmentId>,
}

/// A signed change to one trait.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraitDelta {
    pub name: TraitName,
    pub change: i32,
}

/// State mutations fired when a choice is taken.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EffectBundle {
    #[serde(default)]
    pub add_items: Vec<String>,
    #[serde(default)]
    pub remove_items: Vec<String>,
    #[serde(default)]
    pub modify_traits: Vec<TraitDelta>,
    #[serde(default)]
    pub unlock_truth: Vec<FragmentId>,
    #[serde(default)]
    pub paradox_coins: i64,
}

impl EffectBundle {
    pub fn is_empty(&self) -> bool {
        self.add_items.is_empty()
            && self.remove_items.is_empty()
            && self.modify_traits.is_empty()
            && self.unlock_truth.is_empty()
            && self.paradox_coins == 0
    }
}

/// A player-selectable transition out of a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub text: String,
    pub next_node_id: NodeId,
    #[serde(default)]
    pub requires: Option<Prerequisites>,
    #[serde(default)]
    pub effects: EffectBundle,
    /// 0 = plain truth, 5 = complete paradox.
    #[serde(default)]
    pub truth_level: u8,
    /// Scales fragment find chances in discovery rolls.
    #[serde(default)]
    pub truth_reveal_factor: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryNode {
    pub id: NodeId,
    #[serde(default)]
    pub content: NodeContent,
    #[serde(default)]
    pub node_type: NodeType,
    #[serde(default)]
    pub choices: Vec<Choice>,
    /// Where "continue" leads from a node that exposes no choices.
    #[serde(default)]
    pub next: Option<NodeId>,
    #[serde(default)]
    pub metadata: NodeMetadata,
}

fn default_paradox_level() -> i32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryRequirements {
    #[serde(default)]
    pub completed_stories: Vec<StoryId>,
    #[serde(default = "default_paradox_level")]
    pub paradox_level: i32,
    #[serde(default)]
    pub truth_fragments: Vec<FragmentId>,
}

impl Default for StoryRequirements {
    fn default() -> Self {
        Self {
            completed_stories: Vec::new(),
            paradox_level: default_paradox_level(),
            truth_fragments: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoryRewards {
    #[serde(default)]
    pub paradox_coins: i64,
    #[serde(default)]
    pub truth_fragments: Vec<FragmentId>,
    #[serde(default)]
    pub unlock_stories: Vec<StoryId>,
}

/// A fragment that may turn up while playing a story.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryEntry {
    pub fragment: FragmentId,
    /// Base probability in `[0, 1]`.
    pub find_chance: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Story {
    pub id: StoryId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub chapter: Chapter,
    #[serde(default)]
    pub is_main_story: bool,
    pub starting_node_id: NodeId,
    pub nodes: Vec<StoryNode>,
    #[serde(default)]
    pub requirements: StoryRequirements,
    #[serde(default)]
    pub rewards: StoryRewards,
    #[serde(default)]
    pub discoveries: Vec<DiscoveryEntry>,
}
