/// Story graph: node lookup, choice resolution and prerequisite checks.

use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::schema::ids::{NodeId, StoryId};
use crate::schema::player::PlayerProgress;
use crate::schema::story::{Choice, Story, StoryNode};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("node '{node}' not found in story '{story}'")]
    NodeNotFound { story: StoryId, node: NodeId },
    #[error("choice {index} out of range for node '{node}' ({available} choices)")]
    InvalidChoice {
        node: NodeId,
        index: usize,
        available: usize,
    },
    #[error("node '{0}' has no continuation")]
    NoContinuation(NodeId),
    #[error("duplicate node '{node}' in story '{story}'")]
    DuplicateNode { story: StoryId, node: NodeId },
    #[error("starting node '{node}' missing from story '{story}'")]
    MissingStartNode { story: StoryId, node: NodeId },
}

/// Where a resolved transition leads.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution<'a> {
    /// `None` when the target is not a node of the story: the story ends here.
    pub next_node_id: Option<NodeId>,
    /// The raw target, kept so a finished story can point at its terminal id.
    pub target: &'a NodeId,
    pub choice: &'a Choice,
}

/// A story with its nodes indexed by id. Read-only after construction and
/// safe to share between sessions.
#[derive(Debug, Clone)]
pub struct StoryGraph {
    story: Story,
    index: FxHashMap<NodeId, usize>,
}

impl StoryGraph {
    pub fn new(story: Story) -> Result<Self, GraphError> {
        let mut index = FxHashMap::default();
        for (i, node) in story.nodes.iter().enumerate() {
            if index.insert(node.id.clone(), i).is_some() {
                return Err(GraphError::DuplicateNode {
                    story: story.id.clone(),
                    node: node.id.clone(),
                });
            }
        }
        if !index.contains_key(&story.starting_node_id) {
            return Err(GraphError::MissingStartNode {
                story: story.id.clone(),
                node: story.starting_node_id.clone(),
            });
        }
        Ok(Self { story, index })
    }

    pub fn story(&self) -> &Story {
        &self.story
    }

    pub fn id(&self) -> &StoryId {
        &self.story.id
    }

    pub fn start(&self) -> &StoryNode {
        // Presence of the starting node is checked in `new`.
        &self.story.nodes[self.index[&self.story.starting_node_id]]
    }

    pub fn get_node(&self, node_id: &NodeId) -> Option<&StoryNode> {
        self.index.get(node_id).map(|&i| &self.story.nodes[i])
    }

    pub fn contains(&self, node_id: &NodeId) -> bool {
        self.index.contains_key(node_id)
    }

    /// Look up a node or fail with `NodeNotFound`.
    pub fn node(&self, node_id: &NodeId) -> Result<&StoryNode, GraphError> {
        self.get_node(node_id).ok_or_else(|| GraphError::NodeNotFound {
            story: self.story.id.clone(),
            node: node_id.clone(),
        })
    }

    /// Resolve choice `index` of `current`. A target that is not a node of
    /// this story yields `next_node_id: None`, meaning the story is over.
    pub fn resolve_choice(
        &self,
        current: &NodeId,
        index: usize,
    ) -> Result<Resolution<'_>, GraphError> {
        let node = self.node(current)?;
        let choice = node.choices.get(index).ok_or_else(|| GraphError::InvalidChoice {
            node: current.clone(),
            index,
            available: node.choices.len(),
        })?;
        Ok(Resolution {
            next_node_id: self.existing(&choice.next_node_id),
            target: &choice.next_node_id,
            choice,
        })
    }

    /// Resolve the "continue" link of a node that exposes no choices.
    /// Returns the raw target and whether it is a node of this story.
    pub fn resolve_continue(&self, current: &NodeId) -> Result<(&NodeId, Option<NodeId>), GraphError> {
        let node = self.node(current)?;
        match (&node.next, node.choices.is_empty()) {
            (Some(target), true) => Ok((target, self.existing(target))),
            _ => Err(GraphError::NoContinuation(current.clone())),
        }
    }

    /// Indices of the choices of `node_id` the player may currently pick.
    pub fn eligible_choices(
        &self,
        node_id: &NodeId,
        player: &PlayerProgress,
    ) -> Result<Vec<usize>, GraphError> {
        let node = self.node(node_id)?;
        Ok(node
            .choices
            .iter()
            .enumerate()
            .filter(|(_, c)| meets_prerequisites(c, player))
            .map(|(i, _)| i)
            .collect())
    }

    fn existing(&self, target: &NodeId) -> Option<NodeId> {
        self.contains(target).then(|| target.clone())
    }
}

/// True if the player satisfies every requirement of the choice.
/// A choice without a prerequisites block is always eligible.
pub fn meets_prerequisites(choice: &Choice, player: &PlayerProgress) -> bool {
    let Some(req) = &choice.requires else {
        return true;
    };
    req.items.iter().all(|item| player.has_item(item))
        && req
            .traits
            .iter()
            .all(|t| player.lie_profile.meets(t.name, t.level))
        && req.truth.iter().all(|f| player.owns_fragment(f))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ledger::TraitName;
    use crate::schema::ids::FragmentId;

    const STORY: &str = r#"(
        id: "the-truth-covenant",
        title: "The Truth Covenant",
        chapter: awakening,
        is_main_story: true,
        starting_node_id: "intro-1",
        nodes: [
            (id: "intro-1", node_type: narrative, next: Some("choice-1")),
            (id: "choice-1", node_type: choice, choices: [
                (text: "Show the code from the email", next_node_id: "narration-2",
                 truth_reveal_factor: 0.2),
                (text: "Pretend to be an existing member", next_node_id: "dialogue-3",
                 requires: Some((traits: [(name: lieCreativity, level: 7)]))),
                (text: "Walk away", next_node_id: "the-end"),
            ]),
            (id: "narration-2"),
            (id: "dialogue-3"),
        ],
    )"#;

    fn graph() -> StoryGraph {
        StoryGraph::new(ron::from_str(STORY).unwrap()).unwrap()
    }

    #[test]
    fn start_node_lookup() {
        let g = graph();
        assert_eq!(g.start().id.as_str(), "intro-1");
        assert!(g.get_node(&NodeId::from("narration-2")).is_some());
        assert!(g.get_node(&NodeId::from("nowhere")).is_none());
    }

    #[test]
    fn resolve_to_existing_node() {
        let g = graph();
        let r = g.resolve_choice(&NodeId::from("choice-1"), 0).unwrap();
        assert_eq!(r.next_node_id, Some(NodeId::from("narration-2")));
        assert_eq!(r.choice.text, "Show the code from the email");
    }

    #[test]
    fn resolve_to_missing_node_signals_end() {
        let g = graph();
        let r = g.resolve_choice(&NodeId::from("choice-1"), 2).unwrap();
        assert_eq!(r.next_node_id, None);
        assert_eq!(r.target.as_str(), "the-end");
    }

    #[test]
    fn out_of_range_choice() {
        let g = graph();
        let err = g.resolve_choice(&NodeId::from("choice-1"), 3).unwrap_err();
        assert_eq!(
            err,
            GraphError::InvalidChoice {
                node: NodeId::from("choice-1"),
                index: 3,
                available: 3
            }
        );
        assert!(matches!(
            g.resolve_choice(&NodeId::from("intro-1"), 0),
            Err(GraphError::InvalidChoice { available: 0, .. })
        ));
    }

    #[test]
    fn unknown_current_node() {
        let g = graph();
        assert!(matches!(
            g.resolve_choice(&NodeId::from("ghost"), 0),
            Err(GraphError::NodeNotFound { .. })
        ));
    }

    #[test]
    fn continue_links() {
        let g = graph();
        let (target, next) = g.resolve_continue(&NodeId::from("intro-1")).unwrap();
        assert_eq!(target.as_str(), "choice-1");
        assert_eq!(next, Some(NodeId::from("choice-1")));
        assert!(matches!(
            g.resolve_continue(&NodeId::from("choice-1")),
            Err(GraphError::NoContinuation(_))
        ));
        assert!(matches!(
            g.resolve_continue(&NodeId::from("narration-2")),
            Err(GraphError::NoContinuation(_))
        ));
    }

    #[test]
    fn prerequisites_gate_choices() {
        let g = graph();
        let mut player = PlayerProgress::new("neo");
        let choice_node = NodeId::from("choice-1");
        assert_eq!(g.eligible_choices(&choice_node, &player).unwrap(), vec![0, 2]);

        player.lie_profile.apply_delta(TraitName::LieCreativity, 2);
        assert_eq!(g.eligible_choices(&choice_node, &player).unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn prerequisites_require_all() {
        let choice: Choice = ron::from_str(
            r#"(text: "Use the key", next_node_id: "vault",
                requires: Some((items: ["brass-key"], truth: ["genesis-truth"])))"#,
        )
        .unwrap();
        let mut player = PlayerProgress::new("neo");
        player.inventory.insert("brass-key".to_string());
        assert!(!meets_prerequisites(&choice, &player));
        player.discover_fragment(FragmentId::from("genesis-truth"));
        assert!(meets_prerequisites(&choice, &player));
    }

    #[test]
    fn duplicate_nodes_rejected() {
        let mut story: Story = ron::from_str(STORY).unwrap();
        story.nodes.push(story.nodes[0].clone());
        assert!(matches!(
            StoryGraph::new(story),
            Err(GraphError::DuplicateNode { .. })
        ));
    }

    #[test]
    fn missing_start_rejected() {
        let mut story: Story = ron::from_str(STORY).unwrap();
        story.starting_node_id = NodeId::from("prologue");
        assert!(matches!(
            StoryGraph::new(story),
            Err(GraphError::MissingStartNode { .. })
        ));
    }
}
