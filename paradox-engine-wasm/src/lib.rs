//! WASM bindings for paradox-engine: the story endpoints of the web client,
//! JSON in and JSON out.

use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

use paradox_engine::core::fragments::FragmentRegistry;
use paradox_engine::core::ledger::LieProfile;
use paradox_engine::core::progression::{parse_story_ron, ChoiceReport, ParadoxEngine};
use paradox_engine::core::resolution::TraitChange;
use paradox_engine::schema::ids::{FragmentId, NodeId, PlayerId, StoryId};
use paradox_engine::schema::player::PlayerProgress;
use paradox_engine::schema::story::{Chapter, Story};

// ---------------------------------------------------------------------------
// Embedded story data, compiled into the WASM binary
// ---------------------------------------------------------------------------
mod data {
    pub const FRAGMENTS: &str = include_str!("../../story_data/fragments.ron");

    pub const STORIES: [&str; 4] = [
        include_str!("../../story_data/stories/01_the_truth_covenant.ron"),
        include_str!("../../story_data/stories/02_mirror_academy.ron"),
        include_str!("../../story_data/stories/03_the_last_lie.ron"),
        include_str!("../../story_data/stories/10_quantum_deception.ron"),
    ];
}

// ---------------------------------------------------------------------------
// JSON shapes for the WASM boundary
// ---------------------------------------------------------------------------
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChoiceRequest {
    story_id: StoryId,
    node_id: NodeId,
    choice_index: usize,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CombineRequest {
    fragment_ids: Vec<FragmentId>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChoiceResponse {
    next_node_id: Option<NodeId>,
    effects: EffectsSummary,
    story_completed: bool,
    newly_eligible: Vec<StoryId>,
    user_progress: UserProgress,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EffectsSummary {
    paradox_coins: i64,
    unlocked_truth: Vec<FragmentId>,
    trait_changes: Vec<TraitChange>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UserProgress {
    lie_profile: LieProfile,
    paradox_coins: i64,
    completed_stories: Vec<StoryId>,
    current_chapter: Chapter,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StorySummary {
    id: StoryId,
    title: String,
    description: String,
    chapter: Chapter,
    is_main_story: bool,
    paradox_level: i32,
    completed: bool,
}

impl ChoiceResponse {
    fn new(report: ChoiceReport, player: &PlayerProgress) -> Self {
        let outcome = report.outcome;
        let mut effects = EffectsSummary {
            paradox_coins: outcome.applied_effects.paradox_coins,
            unlocked_truth: outcome.applied_effects.unlocked_fragments,
            trait_changes: outcome.applied_effects.trait_changes,
        };
        if let Some(completion) = outcome.completion {
            effects.paradox_coins += completion.paradox_coins;
            effects.unlocked_truth.extend(completion.unlocked_fragments);
        }
        Self {
            next_node_id: outcome.next_node_id,
            effects,
            story_completed: outcome.story_completed,
            newly_eligible: report.newly_eligible,
            user_progress: UserProgress {
                lie_profile: player.lie_profile,
                paradox_coins: player.paradox_coins,
                completed_stories: player.completed_stories.clone(),
                current_chapter: player.current_chapter,
            },
        }
    }
}

impl StorySummary {
    fn new(story: &Story, player: &PlayerProgress) -> Self {
        Self {
            id: story.id.clone(),
            title: story.title.clone(),
            description: story.description.clone(),
            chapter: story.chapter,
            is_main_story: story.is_main_story,
            paradox_level: story.requirements.paradox_level,
            completed: player.has_completed(&story.id),
        }
    }
}

fn build_engine() -> Result<ParadoxEngine, String> {
    let fragments = FragmentRegistry::parse_ron(data::FRAGMENTS)
        .map_err(|e| format!("Fragment parse error: {e}"))?;
    let stories = data::STORIES
        .iter()
        .map(|src| parse_story_ron(src))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("Story parse error: {e}"))?;
    ParadoxEngine::builder()
        .with_fragments(fragments)
        .with_stories(stories)
        .build()
        .map_err(|e| format!("Engine build error: {e}"))
}

// ---------------------------------------------------------------------------
// ParadoxSession: one player against the bundled stories
// ---------------------------------------------------------------------------
#[wasm_bindgen]
pub struct ParadoxSession {
    engine: ParadoxEngine,
    player: PlayerProgress,
}

#[wasm_bindgen]
impl ParadoxSession {
    /// Start a session for a new player.
    #[wasm_bindgen(constructor)]
    pub fn new(player_id: &str) -> Result<ParadoxSession, JsError> {
        Self::create(PlayerProgress::new(player_id)).map_err(|e| JsError::new(&e))
    }

    /// Resume a session from JSON produced by [`ParadoxSession::progress`].
    pub fn resume(progress_json: &str) -> Result<ParadoxSession, JsError> {
        let player: PlayerProgress = serde_json::from_str(progress_json)
            .map_err(|e| JsError::new(&format!("Invalid progress JSON: {e}")))?;
        Self::create(player).map_err(|e| JsError::new(&e))
    }

    /// The full player progress as JSON, for the host to persist.
    pub fn progress(&self) -> Result<String, JsError> {
        to_json(&self.player).map_err(|e| JsError::new(&e))
    }

    /// Stories the player may start, as a JSON array of summaries.
    pub fn eligible_stories(&self) -> Result<String, JsError> {
        self.eligible_json().map_err(|e| JsError::new(&e))
    }

    /// Start or resume a story; returns the current node as JSON.
    pub fn start(&mut self, story_id: &str) -> Result<String, JsError> {
        self.start_json(story_id).map_err(|e| JsError::new(&e))
    }

    /// A node of a story as JSON.
    pub fn node(&self, story_id: &str, node_id: &str) -> Result<String, JsError> {
        self.node_json(story_id, node_id).map_err(|e| JsError::new(&e))
    }

    /// Take a choice.
    ///
    /// Expected JSON shape:
    /// ```json
    /// { "storyId": "the-truth-covenant", "nodeId": "choice-1", "choiceIndex": 0 }
    /// ```
    pub fn choose(&mut self, request_json: &str) -> Result<String, JsError> {
        self.choose_json(request_json).map_err(|e| JsError::new(&e))
    }

    /// Follow the continue link of the current node of a story.
    pub fn continue_story(&mut self, story_id: &str) -> Result<String, JsError> {
        self.continue_json(story_id).map_err(|e| JsError::new(&e))
    }

    /// Combine owned fragments: `{ "fragmentIds": ["genesis-truth", "reality-fragment"] }`.
    pub fn combine(&mut self, request_json: &str) -> Result<String, JsError> {
        self.combine_json(request_json).map_err(|e| JsError::new(&e))
    }

    /// Roll the discovery table for a choice; returns the found fragment ids.
    pub fn roll_discoveries(
        &mut self,
        story_id: &str,
        node_id: &str,
        choice_index: usize,
        seed: u64,
    ) -> Result<String, JsError> {
        let found = self
            .engine
            .roll_discoveries(
                &mut self.player,
                &StoryId::from(story_id),
                &NodeId::from(node_id),
                choice_index,
                seed,
            )
            .map_err(|e| JsError::new(&e.to_string()))?;
        to_json(&found).map_err(|e| JsError::new(&e))
    }
}

impl ParadoxSession {
    fn create(player: PlayerProgress) -> Result<Self, String> {
        Ok(Self {
            engine: build_engine()?,
            player,
        })
    }

    fn player_id(&self) -> &PlayerId {
        &self.player.player_id
    }

    fn eligible_json(&self) -> Result<String, String> {
        let summaries: Vec<StorySummary> = self
            .engine
            .eligible_stories(&self.player)
            .into_iter()
            .map(|s| StorySummary::new(s, &self.player))
            .collect();
        to_json(&summaries)
    }

    fn start_json(&mut self, story_id: &str) -> Result<String, String> {
        let node = self
            .engine
            .start_or_resume_story(&mut self.player, &StoryId::from(story_id))
            .map_err(|e| e.to_string())?;
        to_json(node)
    }

    fn node_json(&self, story_id: &str, node_id: &str) -> Result<String, String> {
        let node = self
            .engine
            .render_node(&self.player, &StoryId::from(story_id), &NodeId::from(node_id), None)
            .map_err(|e| e.to_string())?;
        to_json(&node)
    }

    fn choose_json(&mut self, request_json: &str) -> Result<String, String> {
        let request: ChoiceRequest =
            serde_json::from_str(request_json).map_err(|e| format!("Invalid choice JSON: {e}"))?;
        // The client names the node it is showing; a stale page must not
        // apply a choice to a different node.
        match self.player.current_node(&request.story_id) {
            Some(current) if *current == request.node_id => {}
            Some(current) => {
                return Err(format!(
                    "Player {} is at node '{}', not '{}'",
                    self.player_id(),
                    current,
                    request.node_id
                ))
            }
            None => return Err(format!("Story '{}' has not been started", request.story_id)),
        }
        let report = self
            .engine
            .choose(&mut self.player, &request.story_id, request.choice_index)
            .map_err(|e| e.to_string())?;
        to_json(&ChoiceResponse::new(report, &self.player))
    }

    fn continue_json(&mut self, story_id: &str) -> Result<String, String> {
        let report = self
            .engine
            .continue_story(&mut self.player, &StoryId::from(story_id))
            .map_err(|e| e.to_string())?;
        to_json(&ChoiceResponse::new(report, &self.player))
    }

    fn combine_json(&mut self, request_json: &str) -> Result<String, String> {
        let request: CombineRequest =
            serde_json::from_str(request_json).map_err(|e| format!("Invalid combine JSON: {e}"))?;
        let fragment = self
            .engine
            .combine_fragments(&mut self.player, &request.fragment_ids)
            .map_err(|e| e.to_string())?;
        to_json(fragment)
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| format!("Serialization error: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> ParadoxSession {
        ParadoxSession::create(PlayerProgress::new("web")).unwrap()
    }

    #[test]
    fn embedded_data_builds() {
        let s = session();
        let json = s.eligible_json().unwrap();
        assert!(json.contains("\"the-truth-covenant\""));
        assert!(!json.contains("quantum-deception"));
    }

    #[test]
    fn choose_response_has_endpoint_shape() {
        let mut s = session();
        s.start_json("the-truth-covenant").unwrap();
        for _ in 0..3 {
            s.continue_json("the-truth-covenant").unwrap();
        }
        let json = s
            .choose_json(r#"{"storyId":"the-truth-covenant","nodeId":"choice-1","choiceIndex":0}"#)
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["nextNodeId"], "narration-2");
        assert_eq!(value["storyCompleted"], false);
        assert_eq!(value["effects"]["paradoxCoins"], 0);
        assert_eq!(value["userProgress"]["currentChapter"], "awakening");
        assert_eq!(value["userProgress"]["lieProfile"]["paradoxAptitude"], 1);
    }

    #[test]
    fn stale_node_is_rejected() {
        let mut s = session();
        s.start_json("the-truth-covenant").unwrap();
        let err = s
            .choose_json(r#"{"storyId":"the-truth-covenant","nodeId":"choice-1","choiceIndex":0}"#)
            .unwrap_err();
        assert!(err.contains("intro-1"));
        assert_eq!(
            s.player.current_node(&StoryId::from("the-truth-covenant")),
            Some(&NodeId::from("intro-1"))
        );
    }

    #[test]
    fn progress_survives_json() {
        let mut s = session();
        s.start_json("the-truth-covenant").unwrap();
        let json = to_json(&s.player).unwrap();
        let back: PlayerProgress = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s.player);
    }
}
