use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use super::ids::FragmentId;

/// How hard a fragment is to come by. Ordered from most to least common.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    Legendary,
}

impl Default for Rarity {
    fn default() -> Self {
        Self::Common
    }
}

/// The kind of untruth a fragment embodies. Opaque to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FragmentType {
    Lie,
    Contradiction,
    Paradox,
    Hyperreal,
    Metatruth,
}

fn default_level() -> u8 {
    1
}

/// A discoverable narrative collectible.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FragmentDefinition {
    pub id: FragmentId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub rarity: Rarity,
    #[serde(default)]
    pub combinable: bool,
    /// Partner fragments this one is known to combine with.
    #[serde(default)]
    pub combinable_with: FxHashSet<FragmentId>,
    #[serde(default)]
    pub fragment_type: Option<FragmentType>,
    #[serde(default = "default_level")]
    pub level: u8,
}

/// A rule mapping an exact, unordered set of fragments to one output fragment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombinationRecipe {
    pub inputs: FxHashSet<FragmentId>,
    pub output: FragmentId,
}

impl CombinationRecipe {
    /// True when `selected` has exactly the recipe's inputs, in any order.
    pub fn matches(&self, selected: &FxHashSet<FragmentId>) -> bool {
        self.inputs.len() == selected.len() && self.inputs.iter().all(|id| selected.contains(id))
    }
}
