/// Authoring checks for story definitions: problems a story can load with
/// but that a player would trip over.

use rustc_hash::FxHashSet;
use std::fmt;

use crate::core::fragments::FragmentRegistry;
use crate::core::graph::StoryGraph;
use crate::schema::ids::{FragmentId, NodeId, StoryId};
use crate::schema::story::StoryNode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintIssue {
    pub severity: Severity,
    pub story: StoryId,
    pub node: Option<NodeId>,
    pub message: String,
}

impl fmt::Display for LintIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
        };
        match &self.node {
            Some(node) => write!(f, "{level}: [{}/{}] {}", self.story, node, self.message),
            None => write!(f, "{level}: [{}] {}", self.story, self.message),
        }
    }
}

struct Report<'a> {
    story: &'a StoryId,
    issues: Vec<LintIssue>,
}

impl Report<'_> {
    fn push(&mut self, severity: Severity, node: Option<&NodeId>, message: String) {
        self.issues.push(LintIssue {
            severity,
            story: self.story.clone(),
            node: node.cloned(),
            message,
        });
    }
}

/// Check one story against the fragment registry.
pub fn lint_story(graph: &StoryGraph, fragments: &FragmentRegistry) -> Vec<LintIssue> {
    let story = graph.story();
    let mut report = Report {
        story: &story.id,
        issues: Vec::new(),
    };

    for node in &story.nodes {
        lint_node(node, fragments, &mut report);
    }

    for id in &story.rewards.truth_fragments {
        if !fragments.contains(id) {
            report.push(Severity::Error, None, format!("reward fragment '{id}' is not defined"));
        }
    }
    let mut listed = FxHashSet::default();
    for entry in &story.discoveries {
        if !listed.insert(&entry.fragment) {
            report.push(
                Severity::Warning,
                None,
                format!("discoverable fragment '{}' is listed more than once", entry.fragment),
            );
        }
        if !fragments.contains(&entry.fragment) {
            report.push(
                Severity::Error,
                None,
                format!("discoverable fragment '{}' is not defined", entry.fragment),
            );
        }
        if !(0.0..=1.0).contains(&entry.find_chance) {
            report.push(
                Severity::Error,
                None,
                format!("find chance {} for '{}' is outside [0, 1]", entry.find_chance, entry.fragment),
            );
        }
    }

    let reachable = reachable_nodes(graph);
    for node in &story.nodes {
        if !reachable.contains(&node.id) {
            report.push(Severity::Warning, Some(&node.id), "unreachable from the starting node".into());
        }
    }
    if !can_complete(graph, &reachable) {
        report.push(Severity::Error, None, "no path from the starting node ever ends the story".into());
    }

    report.issues
}

fn lint_node(node: &StoryNode, fragments: &FragmentRegistry, report: &mut Report<'_>) {
    if node.choices.is_empty() && node.next.is_none() {
        report.push(Severity::Error, Some(&node.id), "dead end: no choices and no next link".into());
    }
    if !node.choices.is_empty() && node.next.is_some() {
        report.push(Severity::Warning, Some(&node.id), "next link is ignored because the node has choices".into());
    }

    for (i, choice) in node.choices.iter().enumerate() {
        let referenced = choice
            .effects
            .unlock_truth
            .iter()
            .chain(choice.requires.iter().flat_map(|r| &r.truth));
        for id in referenced {
            check_fragment(id, fragments, &node.id, i, report);
        }
        for req in choice.requires.iter().flat_map(|r| &r.traits) {
            let (_, max) = req.name.bounds();
            if req.level > max {
                report.push(
                    Severity::Warning,
                    Some(&node.id),
                    format!("choice {i} needs {} {} but the trait caps at {max}", req.name, req.level),
                );
            }
        }
    }
}

fn check_fragment(
    id: &FragmentId,
    fragments: &FragmentRegistry,
    node: &NodeId,
    choice: usize,
    report: &mut Report<'_>,
) {
    if !fragments.contains(id) {
        report.push(
            Severity::Error,
            Some(node),
            format!("choice {choice} references undefined fragment '{id}'"),
        );
    }
}

/// Targets a node can move to, whether or not they are nodes of the story.
fn targets(node: &StoryNode) -> Vec<&NodeId> {
    if node.choices.is_empty() {
        node.next.iter().collect()
    } else {
        node.choices.iter().map(|c| &c.next_node_id).collect()
    }
}

fn reachable_nodes(graph: &StoryGraph) -> FxHashSet<NodeId> {
    let mut seen = FxHashSet::default();
    let mut stack = vec![graph.start()];
    seen.insert(graph.start().id.clone());
    while let Some(node) = stack.pop() {
        for target in targets(node) {
            if let Some(next) = graph.get_node(target) {
                if seen.insert(next.id.clone()) {
                    stack.push(next);
                }
            }
        }
    }
    seen
}

/// True if some reachable node links to a target outside the story.
fn can_complete(graph: &StoryGraph, reachable: &FxHashSet<NodeId>) -> bool {
    reachable
        .iter()
        .filter_map(|id| graph.get_node(id))
        .any(|node| targets(node).into_iter().any(|t| !graph.contains(t)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::story::Story;

    fn lint(src: &str) -> Vec<LintIssue> {
        let registry = FragmentRegistry::parse_ron(r#"(fragments: [(id: "genesis-truth", name: "Genesis Truth")])"#).unwrap();
        let story: Story = ron::from_str(src).unwrap();
        lint_story(&StoryGraph::new(story).unwrap(), &registry)
    }

    #[test]
    fn clean_story_has_no_issues() {
        let issues = lint(
            r#"(
                id: "clean", title: "Clean", chapter: awakening, starting_node_id: "a",
                nodes: [
                    (id: "a", next: Some("b")),
                    (id: "b", choices: [(text: "End", next_node_id: "fin",
                        effects: (unlock_truth: ["genesis-truth"]))]),
                ],
            )"#,
        );
        assert!(issues.is_empty(), "{issues:?}");
    }

    #[test]
    fn flags_dead_ends_and_unknown_fragments() {
        let issues = lint(
            r#"(
                id: "broken", title: "Broken", chapter: awakening, starting_node_id: "a",
                nodes: [
                    (id: "a", choices: [
                        (text: "Loop", next_node_id: "a", effects: (unlock_truth: ["lost-truth"])),
                        (text: "Stall", next_node_id: "b",
                         requires: Some((traits: [(name: paradoxAptitude, level: 9)]))),
                    ]),
                    (id: "b"),
                    (id: "c", next: Some("a")),
                ],
            )"#,
        );
        let messages: Vec<String> = issues.iter().map(|i| i.to_string()).collect();
        assert!(messages.iter().any(|m| m.contains("undefined fragment 'lost-truth'")));
        assert!(messages.iter().any(|m| m.contains("[broken/b] dead end")));
        assert!(messages.iter().any(|m| m.contains("[broken/c] unreachable")));
        assert!(messages.iter().any(|m| m.contains("caps at 5")));
        assert!(messages.iter().any(|m| m.contains("no path from the starting node ever ends the story")));
    }

    #[test]
    fn flags_repeated_discovery_entries() {
        let issues = lint(
            r#"(
                id: "echo", title: "Echo", chapter: awakening, starting_node_id: "a",
                nodes: [(id: "a", choices: [(text: "End", next_node_id: "fin")])],
                discoveries: [
                    (fragment: "genesis-truth", find_chance: 0.5),
                    (fragment: "genesis-truth", find_chance: 0.2),
                ],
            )"#,
        );
        assert_eq!(issues.len(), 1, "{issues:?}");
        assert_eq!(issues[0].severity, Severity::Warning);
        assert!(issues[0].message.contains("'genesis-truth' is listed more than once"));
    }
}
