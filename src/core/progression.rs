/// The top-level paradox engine: story catalog, eligibility, and the
/// player-facing operations that tie graph, resolution and fragments together.
///
/// Built via `ParadoxEngine::builder()`. Definitions are immutable once built,
/// so one engine can be wrapped in an `Arc` and shared by every session.

use rustc_hash::FxHashMap;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::capabilities::{CapabilityError, FragmentMinter, NarrativeTextSource, PlayerProfile};
use crate::core::discovery::roll_discoveries_seeded;
use crate::core::fragments::{FragmentError, FragmentRegistry};
use crate::core::graph::{GraphError, StoryGraph};
use crate::core::resolution::{ChoiceOutcome, ChoiceResolver, CurrencyPolicy, ResolutionError};
use crate::core::store::StoreError;
use crate::schema::fragment::FragmentDefinition;
use crate::schema::ids::{FragmentId, NodeId, StoryId, TokenId};
use crate::schema::player::{PlayerProgress, StoryProgress};
use crate::schema::story::{NodeType, Story, StoryNode};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("graph error: {0}")]
    Graph(#[from] GraphError),
    #[error("resolution error: {0}")]
    Resolution(#[from] ResolutionError),
    #[error("fragment error: {0}")]
    Fragment(#[from] FragmentError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("capability error: {0}")]
    Capability(#[from] CapabilityError),
    #[error("story not found: {0}")]
    StoryNotFound(StoryId),
    #[error("story is locked for this player: {0}")]
    StoryLocked(StoryId),
    #[error("duplicate story definition: {0}")]
    DuplicateStory(StoryId),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// A choice outcome plus the stories the transition made available.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceReport {
    #[serde(flatten)]
    pub outcome: ChoiceOutcome,
    /// Stories eligible after the transition that were not eligible before,
    /// in definition order.
    pub newly_eligible: Vec<StoryId>,
}

/// A fragment handed to a minter and the token it came back with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MintedFragment {
    pub fragment: FragmentId,
    pub token: TokenId,
}

pub struct ParadoxEngine {
    /// In definition load order.
    stories: Vec<StoryGraph>,
    index: FxHashMap<StoryId, usize>,
    fragments: FragmentRegistry,
    currency: CurrencyPolicy,
}

/// Builder for constructing a `ParadoxEngine`.
pub struct ParadoxEngineBuilder {
    stories_dir: Option<PathBuf>,
    fragments_path: Option<PathBuf>,
    currency: CurrencyPolicy,
    /// Directly provided stories (for testing without files).
    stories: Vec<Story>,
    /// Directly provided fragments (for testing without files).
    fragments: Option<FragmentRegistry>,
}

impl ParadoxEngine {
    pub fn builder() -> ParadoxEngineBuilder {
        ParadoxEngineBuilder {
            stories_dir: None,
            fragments_path: None,
            currency: CurrencyPolicy::default(),
            stories: Vec::new(),
            fragments: None,
        }
    }

    pub fn fragments(&self) -> &FragmentRegistry {
        &self.fragments
    }

    pub fn currency_policy(&self) -> CurrencyPolicy {
        self.currency
    }

    /// All stories in definition load order.
    pub fn stories(&self) -> impl Iterator<Item = &Story> {
        self.stories.iter().map(StoryGraph::story)
    }

    pub fn story(&self, id: &StoryId) -> Option<&Story> {
        self.index.get(id).map(|&i| self.stories[i].story())
    }

    pub fn graph(&self, id: &StoryId) -> Result<&StoryGraph, EngineError> {
        self.index
            .get(id)
            .map(|&i| &self.stories[i])
            .ok_or_else(|| EngineError::StoryNotFound(id.clone()))
    }

    pub fn resolver(&self) -> ChoiceResolver<'_> {
        ChoiceResolver::new(&self.fragments).with_currency_policy(self.currency)
    }

    /// The current chapter's main story, or a side story whose paradox level
    /// the player's aptitude reaches and whose required stories are all done.
    pub fn is_eligible(&self, story: &Story, player: &PlayerProgress) -> bool {
        if story.is_main_story {
            return story.chapter == player.current_chapter;
        }
        player.lie_profile.paradox_aptitude() >= story.requirements.paradox_level
            && story
                .requirements
                .completed_stories
                .iter()
                .all(|s| player.has_completed(s))
    }

    /// Stories the player may start, in definition load order.
    pub fn eligible_stories(&self, player: &PlayerProgress) -> Vec<&Story> {
        self.stories()
            .filter(|story| self.is_eligible(story, player))
            .collect()
    }

    /// Return the player's current node of a story, placing them at its
    /// starting node first if they have never entered it.
    ///
    /// A story that already has progress always resumes, even if it is no
    /// longer eligible. A story whose pointer sits past its final node fails
    /// with `NodeNotFound`; use [`ParadoxEngine::restart_story`] to replay it.
    pub fn start_or_resume_story(
        &self,
        player: &mut PlayerProgress,
        story_id: &StoryId,
    ) -> Result<&StoryNode, EngineError> {
        let graph = self.graph(story_id)?;
        if let Some(current) = player.current_node(story_id) {
            return Ok(graph.node(current)?);
        }
        if !self.is_eligible(graph.story(), player) {
            return Err(EngineError::StoryLocked(story_id.clone()));
        }

        let start = graph.start();
        player.stories.insert(
            story_id.clone(),
            StoryProgress {
                current_node: start.id.clone(),
            },
        );
        tracing::info!(player = %player.player_id, story = %story_id, "story started");
        Ok(start)
    }

    /// Take a choice at the player's current node of `story_id`.
    pub fn choose(
        &self,
        player: &mut PlayerProgress,
        story_id: &StoryId,
        choice_index: usize,
    ) -> Result<ChoiceReport, EngineError> {
        let graph = self.graph(story_id)?;
        let before = self.eligible_ids(player);
        let outcome = self.resolver().apply_choice(player, graph, choice_index)?;
        Ok(self.report(player, before, outcome))
    }

    /// Follow the "continue" link of a choice-less node.
    pub fn continue_story(
        &self,
        player: &mut PlayerProgress,
        story_id: &StoryId,
    ) -> Result<ChoiceReport, EngineError> {
        let graph = self.graph(story_id)?;
        let before = self.eligible_ids(player);
        let outcome = self.resolver().continue_story(player, graph)?;
        Ok(self.report(player, before, outcome))
    }

    /// Move the player back to the starting node of a story they have
    /// entered before. Completion stays recorded, so replaying never grants
    /// the rewards a second time.
    pub fn restart_story(
        &self,
        player: &mut PlayerProgress,
        story_id: &StoryId,
    ) -> Result<&StoryNode, EngineError> {
        let graph = self.graph(story_id)?;
        let Some(progress) = player.stories.get_mut(story_id) else {
            return self.start_or_resume_story(player, story_id);
        };
        let start = graph.start();
        progress.current_node = start.id.clone();
        tracing::debug!(player = %player.player_id, story = %story_id, "story restarted");
        Ok(start)
    }

    /// A copy of a node ready for display. `dynamic` nodes get their text
    /// from `text_source` when one is supplied; if generation fails the
    /// authored text is kept.
    pub fn render_node(
        &self,
        player: &PlayerProgress,
        story_id: &StoryId,
        node_id: &NodeId,
        text_source: Option<&dyn NarrativeTextSource>,
    ) -> Result<StoryNode, EngineError> {
        let graph = self.graph(story_id)?;
        let mut node = graph.node(node_id)?.clone();
        if node.node_type != NodeType::Dynamic {
            return Ok(node);
        }
        if let Some(source) = text_source {
            match source.generate(&node, &PlayerProfile::from(player), graph.story()) {
                Ok(text) => node.content.text = text,
                Err(e) => tracing::warn!(
                    story = %story_id,
                    node = %node_id,
                    error = %e,
                    "dynamic text unavailable, using authored text"
                ),
            }
        }
        Ok(node)
    }

    pub fn combine_fragments(
        &self,
        player: &mut PlayerProgress,
        selected: &[FragmentId],
    ) -> Result<&FragmentDefinition, EngineError> {
        Ok(self.fragments.combine(player, selected)?)
    }

    /// Roll a story's discovery table for choice `choice_index` of `node_id`
    /// and add whatever turns up to the player's collection.
    ///
    /// The same seed and player state always find the same fragments.
    pub fn roll_discoveries(
        &self,
        player: &mut PlayerProgress,
        story_id: &StoryId,
        node_id: &NodeId,
        choice_index: usize,
        seed: u64,
    ) -> Result<Vec<FragmentId>, EngineError> {
        let graph = self.graph(story_id)?;
        let resolution = graph.resolve_choice(node_id, choice_index)?;
        let found = roll_discoveries_seeded(&graph.story().discoveries, resolution.choice, player, seed);
        if let Some(unknown) = found.iter().find(|id| !self.fragments.contains(id)) {
            return Err(FragmentError::UnknownFragment(unknown.clone()).into());
        }
        for id in &found {
            player.discover_fragment(id.clone());
        }
        if !found.is_empty() {
            tracing::debug!(player = %player.player_id, story = %story_id, found = found.len(), "fragments discovered");
        }
        Ok(found)
    }

    /// Mint tokens for fragments the player owns. Stops at the first failure;
    /// tokens minted before it are not returned.
    pub fn mint_unlocked(
        &self,
        player: &PlayerProgress,
        selected: &[FragmentId],
        minter: &dyn FragmentMinter,
    ) -> Result<Vec<MintedFragment>, EngineError> {
        let mut definitions = Vec::with_capacity(selected.len());
        for id in selected {
            if !player.owns_fragment(id) {
                return Err(FragmentError::FragmentNotOwned(id.clone()).into());
            }
            let def = self
                .fragments
                .get(id)
                .ok_or_else(|| FragmentError::UnknownFragment(id.clone()))?;
            definitions.push(def);
        }

        let mut minted = Vec::with_capacity(definitions.len());
        for def in definitions {
            let token = minter.mint(&player.player_id, def)?;
            tracing::info!(player = %player.player_id, fragment = %def.id, token = %token, "fragment minted");
            minted.push(MintedFragment {
                fragment: def.id.clone(),
                token,
            });
        }
        Ok(minted)
    }

    fn eligible_ids(&self, player: &PlayerProgress) -> Vec<StoryId> {
        self.eligible_stories(player)
            .into_iter()
            .map(|s| s.id.clone())
            .collect()
    }

    fn report(
        &self,
        player: &PlayerProgress,
        before: Vec<StoryId>,
        outcome: ChoiceOutcome,
    ) -> ChoiceReport {
        let newly_eligible = self
            .eligible_ids(player)
            .into_iter()
            .filter(|id| !before.contains(id))
            .collect();
        ChoiceReport {
            outcome,
            newly_eligible,
        }
    }
}

impl ParadoxEngineBuilder {
    pub fn stories_dir(mut self, path: impl AsRef<Path>) -> Self {
        self.stories_dir = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn fragments_path(mut self, path: impl AsRef<Path>) -> Self {
        self.fragments_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn currency_policy(mut self, policy: CurrencyPolicy) -> Self {
        self.currency = policy;
        self
    }

    /// Provide stories directly (for testing without files). They load
    /// before any directory stories.
    pub fn with_stories(mut self, stories: Vec<Story>) -> Self {
        self.stories.extend(stories);
        self
    }

    /// Provide fragments directly (for testing without files).
    pub fn with_fragments(mut self, fragments: FragmentRegistry) -> Self {
        self.fragments = Some(fragments);
        self
    }

    pub fn build(self) -> Result<ParadoxEngine, EngineError> {
        let fragments = match (self.fragments, &self.fragments_path) {
            (Some(registry), _) => registry,
            (None, Some(path)) => FragmentRegistry::load_from_ron(path)?,
            (None, None) => FragmentRegistry::default(),
        };

        let mut stories = self.stories;
        if let Some(ref dir) = self.stories_dir {
            if dir.exists() {
                load_ron_files_from_dir(dir, |path| {
                    stories.push(load_story_from_ron(path)?);
                    Ok(())
                })?;
            } else {
                tracing::warn!(dir = %dir.display(), "stories directory does not exist");
            }
        }

        let mut graphs = Vec::with_capacity(stories.len());
        let mut index = FxHashMap::default();
        for story in stories {
            if index.contains_key(&story.id) {
                return Err(EngineError::DuplicateStory(story.id));
            }
            warn_unknown_fragments(&story, &fragments);
            index.insert(story.id.clone(), graphs.len());
            graphs.push(StoryGraph::new(story)?);
        }

        tracing::info!(
            stories = graphs.len(),
            fragments = fragments.len(),
            recipes = fragments.recipes().len(),
            "paradox engine built"
        );
        Ok(ParadoxEngine {
            stories: graphs,
            index,
            fragments,
            currency: self.currency,
        })
    }
}

pub fn load_story_from_ron(path: &Path) -> Result<Story, EngineError> {
    let contents = std::fs::read_to_string(path)?;
    parse_story_ron(&contents)
}

pub fn parse_story_ron(input: &str) -> Result<Story, EngineError> {
    Ok(ron::from_str(input)?)
}

/// Fragment references are checked again when they fire; this only flags
/// them early.
fn warn_unknown_fragments(story: &Story, fragments: &FragmentRegistry) {
    let effects = story
        .nodes
        .iter()
        .flat_map(|n| &n.choices)
        .flat_map(|c| &c.effects.unlock_truth);
    let referenced = effects
        .chain(&story.rewards.truth_fragments)
        .chain(story.discoveries.iter().map(|d| &d.fragment));
    for id in referenced {
        if !fragments.contains(id) {
            tracing::warn!(story = %story.id, fragment = %id, "story references unknown fragment");
        }
    }
}

/// Load all .ron files from a directory in file-name order, calling
/// `loader` for each.
fn load_ron_files_from_dir<F>(dir: &Path, mut loader: F) -> Result<(), EngineError>
where
    F: FnMut(&Path) -> Result<(), EngineError>,
{
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|s| s.to_str()) == Some("ron") {
            paths.push(path);
        } else {
            tracing::debug!(path = %path.display(), "skipping non-RON file");
        }
    }
    paths.sort();
    for path in &paths {
        tracing::debug!(path = %path.display(), "loading story file");
        loader(path)?;
    }
    Ok(())
}
