/// Choice resolution: applies a choice's effects to a player and decides
/// story completion and chapter advancement.

use serde::Serialize;
use thiserror::Error;

use crate::core::fragments::FragmentRegistry;
use crate::core::graph::{meets_prerequisites, GraphError, StoryGraph};
use crate::core::ledger::TraitName;
use crate::schema::ids::{FragmentId, NodeId, StoryId};
use crate::schema::player::PlayerProgress;
use crate::schema::story::{Chapter, EffectBundle};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error("choice {index} of node '{node}' is not available to this player")]
    ChoiceNotEligible { node: NodeId, index: usize },
    #[error("effect references unknown fragment: {0}")]
    UnknownFragment(FragmentId),
}

/// What happens to the paradox coin balance when a spend would take it below zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CurrencyPolicy {
    /// The balance may go negative.
    #[default]
    AllowNegative,
    /// The balance stops at zero.
    FloorAtZero,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TraitChange {
    pub name: TraitName,
    pub change: i32,
    /// The trait's value after clamping.
    pub value: i32,
}

/// The effects a transition actually fired.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedEffects {
    pub items_added: Vec<String>,
    pub items_removed: Vec<String>,
    pub trait_changes: Vec<TraitChange>,
    pub paradox_coins: i64,
    /// Fragments newly added to the collection (already-owned ones are skipped).
    pub unlocked_fragments: Vec<FragmentId>,
}

/// Rewards granted the one time a story is completed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRewards {
    pub paradox_coins: i64,
    pub unlocked_fragments: Vec<FragmentId>,
    pub stories_unlocked: Vec<StoryId>,
    pub chapter_advanced_to: Option<Chapter>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceOutcome {
    /// `None` once the story has ended.
    pub next_node_id: Option<NodeId>,
    pub applied_effects: AppliedEffects,
    /// True only on the transition that moved the story into the completed set.
    pub story_completed: bool,
    pub completion: Option<CompletionRewards>,
}

/// Applies choices against player state.
///
/// Stateless apart from configuration, so one resolver can serve every
/// session. Resolution is deterministic: the same player state, story and
/// choice index always produce the same outcome and the same new state.
#[derive(Debug, Clone, Copy)]
pub struct ChoiceResolver<'a> {
    registry: &'a FragmentRegistry,
    currency: CurrencyPolicy,
}

impl<'a> ChoiceResolver<'a> {
    pub fn new(registry: &'a FragmentRegistry) -> Self {
        Self {
            registry,
            currency: CurrencyPolicy::default(),
        }
    }

    pub fn with_currency_policy(mut self, policy: CurrencyPolicy) -> Self {
        self.currency = policy;
        self
    }

    /// Take choice `choice_index` at the player's current node of `graph`.
    ///
    /// On error the player is left exactly as it was.
    pub fn apply_choice(
        &self,
        player: &mut PlayerProgress,
        graph: &StoryGraph,
        choice_index: usize,
    ) -> Result<ChoiceOutcome, ResolutionError> {
        let current = current_node(player, graph)?;
        let resolution = graph.resolve_choice(&current, choice_index)?;
        if !meets_prerequisites(resolution.choice, player) {
            return Err(ResolutionError::ChoiceNotEligible {
                node: current,
                index: choice_index,
            });
        }

        tracing::debug!(
            player = %player.player_id,
            story = %graph.id(),
            from = %current,
            to = %resolution.target,
            choice = choice_index,
            "applying choice"
        );
        self.transition(
            player,
            graph,
            resolution.target,
            resolution.next_node_id,
            &resolution.choice.effects,
        )
    }

    /// Follow the "continue" link of the player's current node.
    pub fn continue_story(
        &self,
        player: &mut PlayerProgress,
        graph: &StoryGraph,
    ) -> Result<ChoiceOutcome, ResolutionError> {
        let current = current_node(player, graph)?;
        let (target, next) = graph.resolve_continue(&current)?;
        tracing::debug!(
            player = %player.player_id,
            story = %graph.id(),
            from = %current,
            to = %target,
            "continuing story"
        );
        self.transition(player, graph, target, next, &EffectBundle::default())
    }

    fn transition(
        &self,
        player: &mut PlayerProgress,
        graph: &StoryGraph,
        target: &NodeId,
        next: Option<NodeId>,
        effects: &EffectBundle,
    ) -> Result<ChoiceOutcome, ResolutionError> {
        let story = graph.story();
        let completes = next.is_none() && !player.has_completed(&story.id);

        // Validate everything that can fail before touching the player.
        self.check_fragments(&effects.unlock_truth)?;
        if completes {
            self.check_fragments(&story.rewards.truth_fragments)?;
        }

        let applied = self.apply_effects(player, effects);

        let completion = completes.then(|| {
            player.completed_stories.push(story.id.clone());
            let chapter_advanced_to = if story.is_main_story {
                advance_chapter(player)
            } else {
                None
            };
            let rewards = CompletionRewards {
                paradox_coins: story.rewards.paradox_coins,
                unlocked_fragments: self.unlock(player, &story.rewards.truth_fragments),
                stories_unlocked: story.rewards.unlock_stories.clone(),
                chapter_advanced_to,
            };
            self.add_coins(player, story.rewards.paradox_coins);
            tracing::info!(
                player = %player.player_id,
                story = %story.id,
                chapter = %player.current_chapter.as_str(),
                "story completed"
            );
            rewards
        });

        if let Some(progress) = player.stories.get_mut(&story.id) {
            progress.current_node = target.clone();
        }

        Ok(ChoiceOutcome {
            next_node_id: next,
            applied_effects: applied,
            story_completed: completion.is_some(),
            completion,
        })
    }

    /// Apply an effect bundle in its fixed order: add items, remove items,
    /// trait deltas, currency, fragment unlocks.
    fn apply_effects(&self, player: &mut PlayerProgress, effects: &EffectBundle) -> AppliedEffects {
        let mut applied = AppliedEffects::default();

        for item in &effects.add_items {
            if player.inventory.insert(item.clone()) {
                applied.items_added.push(item.clone());
            }
        }
        for item in &effects.remove_items {
            if player.inventory.remove(item) {
                applied.items_removed.push(item.clone());
            }
        }
        for delta in &effects.modify_traits {
            let value = player.lie_profile.apply_delta(delta.name, delta.change);
            applied.trait_changes.push(TraitChange {
                name: delta.name,
                change: delta.change,
                value,
            });
        }
        self.add_coins(player, effects.paradox_coins);
        applied.paradox_coins = effects.paradox_coins;
        applied.unlocked_fragments = self.unlock(player, &effects.unlock_truth);

        applied
    }

    fn add_coins(&self, player: &mut PlayerProgress, delta: i64) {
        let balance = player.paradox_coins.saturating_add(delta);
        player.paradox_coins = match self.currency {
            CurrencyPolicy::AllowNegative => balance,
            CurrencyPolicy::FloorAtZero => balance.max(0),
        };
    }

    fn unlock(&self, player: &mut PlayerProgress, fragments: &[FragmentId]) -> Vec<FragmentId> {
        fragments
            .iter()
            .filter(|id| player.discover_fragment((*id).clone()))
            .cloned()
            .collect()
    }

    fn check_fragments(&self, fragments: &[FragmentId]) -> Result<(), ResolutionError> {
        match fragments.iter().find(|id| !self.registry.contains(id)) {
            Some(unknown) => Err(ResolutionError::UnknownFragment(unknown.clone())),
            None => Ok(()),
        }
    }
}

/// A story without a progress entry has no current node; report its
/// starting node as the one that could not be found.
fn current_node(player: &PlayerProgress, graph: &StoryGraph) -> Result<NodeId, ResolutionError> {
    player.current_node(graph.id()).cloned().ok_or_else(|| {
        ResolutionError::Graph(GraphError::NodeNotFound {
            story: graph.id().clone(),
            node: graph.story().starting_node_id.clone(),
        })
    })
}

/// Move a player to the next chapter; no-op at the final chapter.
fn advance_chapter(player: &mut PlayerProgress) -> Option<Chapter> {
    let next = player.current_chapter.next()?;
    tracing::info!(
        player = %player.player_id,
        from = %player.current_chapter.as_str(),
        to = %next.as_str(),
        "chapter advanced"
    );
    player.current_chapter = next;
    Some(next)
}
