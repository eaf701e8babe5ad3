/// Truth Covenant demo: plays the opening story, a dynamic node and a
/// fragment combination end to end.
///
/// A mini arc: invitation → bluff at the door → inner chamber → archive →
/// chapter advance → combining the collected truths.
///
/// Run with: cargo run --example truth_covenant

use paradox_engine::core::capabilities::{CapabilityError, FragmentMinter, PlayerProfile};
use paradox_engine::core::progression::ParadoxEngine;
use paradox_engine::schema::fragment::FragmentDefinition;
use paradox_engine::schema::ids::{FragmentId, NodeId, PlayerId, StoryId, TokenId};
use paradox_engine::schema::player::{PlayerDocument, PlayerProgress};
use paradox_engine::schema::story::{Story, StoryNode};

/// Stands in for the chain the surrounding service mints on.
struct LedgerMinter;

impl FragmentMinter for LedgerMinter {
    fn mint(&self, owner: &PlayerId, fragment: &FragmentDefinition) -> Result<TokenId, CapabilityError> {
        Ok(TokenId::new(format!("0x{:08x}", owner.as_str().len() * 7919 + fragment.level as usize)))
    }
}

fn oracle(node: &StoryNode, profile: &PlayerProfile<'_>, story: &Story) -> Result<String, CapabilityError> {
    Ok(format!(
        "{} In the margin of '{}' someone has written: the liar with creativity {} will read this first.",
        node.content.text,
        story.title,
        profile.lie_profile.lie_creativity()
    ))
}

fn main() {
    let engine = ParadoxEngine::builder()
        .stories_dir("story_data/stories")
        .fragments_path("story_data/fragments.ron")
        .build()
        .expect("Failed to load story data");

    let covenant = StoryId::from("the-truth-covenant");
    let mut player = PlayerProgress::new("neo");

    // --- Opening: three narrated beats, then the first real choice ---
    let node = engine
        .start_or_resume_story(&mut player, &covenant)
        .expect("story should be open in the first chapter");
    println!("[{}] {}\n", node.id, node.content.text);
    for _ in 0..3 {
        let report = engine.continue_story(&mut player, &covenant).expect("continue");
        if let Some(next) = &report.outcome.next_node_id {
            let node = engine.render_node(&player, &covenant, next, None).expect("render");
            println!("[{}] {}\n", node.id, node.content.text);
        }
    }

    // --- Bluff at the door, keep the act going ---
    for index in [2, 0] {
        let report = engine.choose(&mut player, &covenant, index).expect("choose");
        for change in &report.outcome.applied_effects.trait_changes {
            println!("  {} {:+} -> {}", change.name, change.change, change.value);
        }
    }
    println!("  paradox coins: {}\n", player.paradox_coins);

    // --- The archive is behind a badge this path never earned ---
    let graph = engine.graph(&covenant).expect("graph");
    let open = graph
        .eligible_choices(&NodeId::from("chamber-1"), &player)
        .expect("chamber exists");
    println!("Choices open in the chamber: {:?}", open);

    let archive = engine
        .render_node(&player, &covenant, &NodeId::from("archive-1"), Some(&oracle))
        .expect("render archive");
    println!("[{}] {}\n", archive.id, archive.content.text);

    // --- Accept the Covenant's truth: the story ends ---
    let report = engine.choose(&mut player, &covenant, 0).expect("choose");
    if let Some(completion) = &report.outcome.completion {
        println!(
            "Story completed: +{} coins, chapter now {:?}",
            completion.paradox_coins, completion.chapter_advanced_to
        );
    }
    for id in &report.newly_eligible {
        println!("New story available: {}", id);
    }

    // --- Combine the two truths collected along the way ---
    let combined = engine
        .combine_fragments(
            &mut player,
            &[FragmentId::from("genesis-truth"), FragmentId::from("reality-fragment")],
        )
        .expect("combine");
    println!("\nCombined into {} ({:?})", combined.name, combined.rarity);

    let minted = engine
        .mint_unlocked(&player, &[combined.id.clone()], &LedgerMinter)
        .expect("mint");
    for m in &minted {
        println!("Minted {} as token {}", m.fragment, m.token);
    }

    let doc = PlayerDocument::from(&player);
    println!(
        "\n{}",
        ron::ser::to_string_pretty(&doc, ron::ser::PrettyConfig::default()).expect("serialize")
    );
}
