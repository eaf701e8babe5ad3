/// Fragment registry: fragment definitions, combination recipes and matching.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::schema::fragment::{CombinationRecipe, FragmentDefinition};
use crate::schema::ids::FragmentId;
use crate::schema::player::PlayerProgress;

#[derive(Debug, Error)]
pub enum FragmentError {
    #[error("no recipe matches the selected fragments")]
    NoMatchingRecipe,
    #[error("fragment not owned by player: {0}")]
    FragmentNotOwned(FragmentId),
    #[error("unknown fragment: {0}")]
    UnknownFragment(FragmentId),
    #[error("duplicate fragment definition: {0}")]
    DuplicateFragment(FragmentId),
    #[error("two recipes share the same input set (output {first} and {second})")]
    DuplicateRecipe { first: FragmentId, second: FragmentId },
    #[error("recipe for {output} needs at least 2 inputs, has {inputs}")]
    InvalidRecipe { output: FragmentId, inputs: usize },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// On-disk shape of a fragment catalog file.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct FragmentCatalog {
    #[serde(default)]
    pub fragments: Vec<FragmentDefinition>,
    #[serde(default)]
    pub recipes: Vec<CombinationRecipe>,
}

/// All fragment definitions and recipes. Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct FragmentRegistry {
    fragments: FxHashMap<FragmentId, FragmentDefinition>,
    recipes: Vec<CombinationRecipe>,
}

impl FragmentRegistry {
    /// Build a registry, rejecting duplicate ids, undersized or ambiguous
    /// recipes, and references to undefined fragments.
    pub fn new(
        definitions: Vec<FragmentDefinition>,
        recipes: Vec<CombinationRecipe>,
    ) -> Result<Self, FragmentError> {
        let mut fragments = FxHashMap::default();
        for def in definitions {
            if fragments.contains_key(&def.id) {
                return Err(FragmentError::DuplicateFragment(def.id));
            }
            fragments.insert(def.id.clone(), def);
        }

        for def in fragments.values() {
            if let Some(partner) = def.combinable_with.iter().find(|p| !fragments.contains_key(*p)) {
                return Err(FragmentError::UnknownFragment(partner.clone()));
            }
        }

        for (i, recipe) in recipes.iter().enumerate() {
            if recipe.inputs.len() < 2 {
                return Err(FragmentError::InvalidRecipe {
                    output: recipe.output.clone(),
                    inputs: recipe.inputs.len(),
                });
            }
            let referenced = recipe.inputs.iter().chain(std::iter::once(&recipe.output));
            for id in referenced {
                if !fragments.contains_key(id) {
                    return Err(FragmentError::UnknownFragment(id.clone()));
                }
            }
            if let Some(earlier) = recipes[..i].iter().find(|r| r.matches(&recipe.inputs)) {
                return Err(FragmentError::DuplicateRecipe {
                    first: earlier.output.clone(),
                    second: recipe.output.clone(),
                });
            }
        }

        Ok(Self { fragments, recipes })
    }

    /// Load a registry from a RON catalog file.
    pub fn load_from_ron(path: &Path) -> Result<Self, FragmentError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    /// Parse a registry from a RON catalog string.
    pub fn parse_ron(input: &str) -> Result<Self, FragmentError> {
        let catalog: FragmentCatalog = ron::from_str(input)?;
        Self::new(catalog.fragments, catalog.recipes)
    }

    pub fn get(&self, id: &FragmentId) -> Option<&FragmentDefinition> {
        self.fragments.get(id)
    }

    pub fn contains(&self, id: &FragmentId) -> bool {
        self.fragments.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn recipes(&self) -> &[CombinationRecipe] {
        &self.recipes
    }

    /// The fragment's combinable flag; unknown fragments are not combinable.
    pub fn is_combinable(&self, id: &FragmentId) -> bool {
        self.fragments.get(id).is_some_and(|f| f.combinable)
    }

    /// The recipe whose input set equals `selected` exactly, if any.
    /// Fewer than two selected fragments never match.
    pub fn find_matching_recipe(
        &self,
        selected: &FxHashSet<FragmentId>,
    ) -> Option<&CombinationRecipe> {
        if selected.len() < 2 {
            return None;
        }
        self.recipes.iter().find(|r| r.matches(selected))
    }

    /// Combine owned fragments into a recipe's output.
    ///
    /// Inputs stay in the player's collection; the output is added if not
    /// already owned. Player state is untouched on error.
    pub fn combine(
        &self,
        player: &mut PlayerProgress,
        selected: &[FragmentId],
    ) -> Result<&FragmentDefinition, FragmentError> {
        if let Some(missing) = selected.iter().find(|id| !player.owns_fragment(id)) {
            return Err(FragmentError::FragmentNotOwned(missing.clone()));
        }

        let set: FxHashSet<FragmentId> = selected.iter().cloned().collect();
        let recipe = self
            .find_matching_recipe(&set)
            .ok_or(FragmentError::NoMatchingRecipe)?;
        let output = self
            .fragments
            .get(&recipe.output)
            .ok_or_else(|| FragmentError::UnknownFragment(recipe.output.clone()))?;

        if player.discover_fragment(output.id.clone()) {
            tracing::debug!(
                player = %player.player_id,
                output = %output.id,
                "combined fragments into new fragment"
            );
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::fragment::Rarity;

    const CATALOG: &str = r#"(
        fragments: [
            (id: "genesis-truth", name: "Genesis Truth", rarity: rare, combinable: true,
             combinable_with: ["reality-fragment"]),
            (id: "reality-fragment", name: "Reality Fragment", rarity: uncommon, combinable: true,
             combinable_with: ["genesis-truth"]),
            (id: "cosmic-revelation", name: "Cosmic Revelation", rarity: legendary),
            (id: "echo", name: "Echo"),
        ],
        recipes: [
            (inputs: ["genesis-truth", "reality-fragment"], output: "cosmic-revelation"),
        ],
    )"#;

    fn ids(list: &[&str]) -> Vec<FragmentId> {
        list.iter().map(|s| FragmentId::from(*s)).collect()
    }

    fn set(list: &[&str]) -> FxHashSet<FragmentId> {
        ids(list).into_iter().collect()
    }

    fn def(id: &str) -> FragmentDefinition {
        FragmentDefinition {
            id: FragmentId::from(id),
            name: id.to_string(),
            description: String::new(),
            rarity: Rarity::Common,
            combinable: true,
            combinable_with: FxHashSet::default(),
            fragment_type: None,
            level: 1,
        }
    }

    fn recipe(inputs: &[&str], output: &str) -> CombinationRecipe {
        CombinationRecipe {
            inputs: set(inputs),
            output: FragmentId::from(output),
        }
    }

    #[test]
    fn parse_catalog() {
        let reg = FragmentRegistry::parse_ron(CATALOG).unwrap();
        assert_eq!(reg.len(), 4);
        assert_eq!(reg.recipes().len(), 1);
        assert_eq!(
            reg.get(&FragmentId::from("cosmic-revelation")).unwrap().rarity,
            Rarity::Legendary
        );
    }

    #[test]
    fn matching_is_order_independent() {
        let reg = FragmentRegistry::parse_ron(CATALOG).unwrap();
        let ab = reg.find_matching_recipe(&set(&["genesis-truth", "reality-fragment"]));
        let ba = reg.find_matching_recipe(&set(&["reality-fragment", "genesis-truth"]));
        assert_eq!(ab.unwrap().output, ba.unwrap().output);
        let output = reg.get(&ab.unwrap().output).unwrap();
        assert_eq!(output.name, "Cosmic Revelation");
    }

    #[test]
    fn single_fragment_never_matches() {
        let reg = FragmentRegistry::parse_ron(CATALOG).unwrap();
        assert!(reg.find_matching_recipe(&set(&["genesis-truth"])).is_none());
        assert!(reg.find_matching_recipe(&set(&[])).is_none());
    }

    #[test]
    fn superset_does_not_match() {
        let reg = FragmentRegistry::parse_ron(CATALOG).unwrap();
        assert!(reg
            .find_matching_recipe(&set(&["genesis-truth", "reality-fragment", "echo"]))
            .is_none());
    }

    #[test]
    fn combinable_flag() {
        let reg = FragmentRegistry::parse_ron(CATALOG).unwrap();
        assert!(reg.is_combinable(&FragmentId::from("genesis-truth")));
        assert!(!reg.is_combinable(&FragmentId::from("echo")));
        assert!(!reg.is_combinable(&FragmentId::from("missing")));
    }

    #[test]
    fn combine_is_additive() {
        let reg = FragmentRegistry::parse_ron(CATALOG).unwrap();
        let mut player = PlayerProgress::new("neo");
        player.discover_fragment(FragmentId::from("genesis-truth"));
        player.discover_fragment(FragmentId::from("reality-fragment"));

        let output = reg
            .combine(&mut player, &ids(&["reality-fragment", "genesis-truth"]))
            .unwrap();
        assert_eq!(output.name, "Cosmic Revelation");
        assert_eq!(player.truth_fragments, ids(&["genesis-truth", "reality-fragment", "cosmic-revelation"]));
    }

    #[test]
    fn combine_twice_does_not_duplicate_output() {
        let reg = FragmentRegistry::parse_ron(CATALOG).unwrap();
        let mut player = PlayerProgress::new("neo");
        player.discover_fragment(FragmentId::from("genesis-truth"));
        player.discover_fragment(FragmentId::from("reality-fragment"));
        let selected = ids(&["genesis-truth", "reality-fragment"]);
        reg.combine(&mut player, &selected).unwrap();
        reg.combine(&mut player, &selected).unwrap();
        assert_eq!(player.truth_fragments.len(), 3);
    }

    #[test]
    fn combine_requires_ownership() {
        let reg = FragmentRegistry::parse_ron(CATALOG).unwrap();
        let mut player = PlayerProgress::new("neo");
        player.discover_fragment(FragmentId::from("genesis-truth"));
        let before = player.clone();
        let err = reg
            .combine(&mut player, &ids(&["genesis-truth", "reality-fragment"]))
            .unwrap_err();
        assert!(matches!(err, FragmentError::FragmentNotOwned(id) if id.as_str() == "reality-fragment"));
        assert_eq!(player, before);
    }

    #[test]
    fn combine_without_recipe_is_recoverable() {
        let reg = FragmentRegistry::parse_ron(CATALOG).unwrap();
        let mut player = PlayerProgress::new("neo");
        player.discover_fragment(FragmentId::from("genesis-truth"));
        player.discover_fragment(FragmentId::from("echo"));
        let err = reg
            .combine(&mut player, &ids(&["genesis-truth", "echo"]))
            .unwrap_err();
        assert!(matches!(err, FragmentError::NoMatchingRecipe));
        assert_eq!(player.truth_fragments.len(), 2);
    }

    #[test]
    fn duplicate_input_sets_rejected() {
        let err = FragmentRegistry::new(
            vec![def("a"), def("b"), def("c"), def("d")],
            vec![recipe(&["a", "b"], "c"), recipe(&["b", "a"], "d")],
        )
        .unwrap_err();
        assert!(matches!(err, FragmentError::DuplicateRecipe { .. }));
    }

    #[test]
    fn undersized_recipe_rejected() {
        let err = FragmentRegistry::new(vec![def("a"), def("c")], vec![recipe(&["a"], "c")])
            .unwrap_err();
        assert!(matches!(err, FragmentError::InvalidRecipe { inputs: 1, .. }));
    }

    #[test]
    fn recipe_referencing_unknown_fragment_rejected() {
        let err = FragmentRegistry::new(vec![def("a"), def("b")], vec![recipe(&["a", "b"], "z")])
            .unwrap_err();
        assert!(matches!(err, FragmentError::UnknownFragment(id) if id.as_str() == "z"));
    }

    #[test]
    fn duplicate_fragment_rejected() {
        let err = FragmentRegistry::new(vec![def("a"), def("a")], vec![]).unwrap_err();
        assert!(matches!(err, FragmentError::DuplicateFragment(_)));
    }
}
