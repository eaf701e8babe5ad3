/// Playthrough: interactive shell for walking stories as a player.
///
/// Usage: playthrough [--stories <dir>] [--fragments <path>] [--player <id>]
///                    [--save-dir <dir>] [--auto <story>] [--seed <n>]
///
/// Commands:
///   stories                  list stories the player may start
///   start <story>            start or resume a story
///   choose <n>               take choice n at the current node
///   next                     follow the current node's continue link
///   restart                  go back to the start of the current story
///   roll <n>                 roll discoveries for choice n with the current seed
///   combine <id> <id> ...    combine owned fragments
///   status                   show the player's progress
///   save                     write progress to the save directory
///   help                     list commands
///   quit                     exit

use clap::Parser;
use paradox_engine::core::progression::{ChoiceReport, ParadoxEngine};
use paradox_engine::core::store::{ProgressStore, RonFileStore};
use paradox_engine::schema::ids::{FragmentId, PlayerId, StoryId};
use paradox_engine::schema::player::PlayerProgress;
use paradox_engine::schema::story::StoryNode;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "playthrough", version, about = "Play stories from the command line")]
struct Cli {
    /// Directory of story .ron files
    #[arg(long, default_value = "story_data/stories")]
    stories: PathBuf,
    /// Fragment catalog .ron file
    #[arg(long, default_value = "story_data/fragments.ron")]
    fragments: PathBuf,
    /// Player id to play as
    #[arg(long, default_value = "preview")]
    player: String,
    /// Directory to load and save player progress
    #[arg(long)]
    save_dir: Option<PathBuf>,
    /// Play a story to the end by always taking the first available choice
    #[arg(long)]
    auto: Option<String>,
    /// Seed for discovery rolls
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "paradox_engine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let engine = match ParadoxEngine::builder()
        .stories_dir(&cli.stories)
        .fragments_path(&cli.fragments)
        .build()
    {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("ERROR: Failed to load stories: {}", e);
            process::exit(1);
        }
    };

    let store = match cli.save_dir.as_ref().map(RonFileStore::open).transpose() {
        Ok(store) => store,
        Err(e) => {
            eprintln!("ERROR: Cannot open save directory: {}", e);
            process::exit(1);
        }
    };

    let player_id = PlayerId::new(cli.player.clone());
    let mut player = match &store {
        Some(store) => match store.load_or_new(&player_id) {
            Ok(player) => player,
            Err(e) => {
                eprintln!("ERROR: Failed to load player: {}", e);
                process::exit(1);
            }
        },
        None => PlayerProgress::new(player_id),
    };

    if let Some(story) = cli.auto {
        let code = auto_play(&engine, &mut player, &StoryId::new(story));
        save(store.as_ref(), &player);
        process::exit(code);
    }

    println!("Loaded {} stories", engine.stories().count());
    println!("Seed: {}", cli.seed);
    println!("Type 'help' for commands.\n");

    let mut current_story: Option<StoryId> = None;
    let mut seed = cli.seed;

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("paradox> ");
        stdout.flush().ok();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).is_err() || line.is_empty() {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        let cmd = parts[0].to_lowercase();

        match cmd.as_str() {
            "quit" | "exit" | "q" => {
                println!("Goodbye.");
                break;
            }
            "help" | "h" | "?" => print_help(),
            "stories" => {
                for story in engine.eligible_stories(&player) {
                    let marker = if player.has_completed(&story.id) { "*" } else { " " };
                    println!("  {} {} ({}): {}", marker, story.id, story.chapter.as_str(), story.title);
                }
            }
            "start" => {
                let Some(id) = parts.get(1) else {
                    println!("Usage: start <story>");
                    continue;
                };
                let story = StoryId::from(*id);
                match engine.start_or_resume_story(&mut player, &story) {
                    Ok(node) => {
                        print_node(node);
                        current_story = Some(story);
                    }
                    Err(e) => println!("ERROR: {}", e),
                }
            }
            "choose" | "c" | "next" | "n" => {
                let Some(story) = current_story.clone() else {
                    println!("No story in progress. Use 'start <story>'.");
                    continue;
                };
                let result = if cmd == "next" || cmd == "n" {
                    engine.continue_story(&mut player, &story)
                } else {
                    match parts.get(1).and_then(|n| n.parse::<usize>().ok()) {
                        Some(index) => engine.choose(&mut player, &story, index),
                        None => {
                            println!("Usage: choose <n>");
                            continue;
                        }
                    }
                };
                match result {
                    Ok(report) => {
                        print_report(&report);
                        if let Some(next) = &report.outcome.next_node_id {
                            if let Ok(node) = engine.render_node(&player, &story, next, None) {
                                print_node(&node);
                            }
                        }
                    }
                    Err(e) => println!("ERROR: {}", e),
                }
            }
            "restart" => {
                let Some(story) = current_story.clone() else {
                    println!("No story in progress.");
                    continue;
                };
                match engine.restart_story(&mut player, &story) {
                    Ok(node) => print_node(node),
                    Err(e) => println!("ERROR: {}", e),
                }
            }
            "roll" => {
                let (Some(story), Some(index)) = (
                    current_story.clone(),
                    parts.get(1).and_then(|n| n.parse::<usize>().ok()),
                ) else {
                    println!("Usage: roll <n> (with a story in progress)");
                    continue;
                };
                let Some(node) = player.current_node(&story).cloned() else {
                    continue;
                };
                match engine.roll_discoveries(&mut player, &story, &node, index, seed) {
                    Ok(found) if found.is_empty() => println!("Nothing found."),
                    Ok(found) => {
                        for id in found {
                            println!("  Discovered: {}", id);
                        }
                    }
                    Err(e) => println!("ERROR: {}", e),
                }
                seed = seed.wrapping_add(1);
            }
            "combine" => {
                if parts.len() < 3 {
                    println!("Usage: combine <id> <id> ...");
                    continue;
                }
                let selected: Vec<FragmentId> = parts[1..].iter().map(|s| FragmentId::from(*s)).collect();
                match engine.combine_fragments(&mut player, &selected) {
                    Ok(fragment) => println!("Created: {} ({:?})", fragment.name, fragment.rarity),
                    Err(e) => println!("ERROR: {}", e),
                }
            }
            "status" => print_status(&player),
            "save" => save(store.as_ref(), &player),
            _ => println!("Unknown command '{}'. Type 'help' for commands.", cmd),
        }
    }

    save(store.as_ref(), &player);
}

/// Take the first eligible choice until the story ends. Returns the exit code.
fn auto_play(engine: &ParadoxEngine, player: &mut PlayerProgress, story: &StoryId) -> i32 {
    if let Err(e) = engine.start_or_resume_story(player, story) {
        eprintln!("ERROR: {}", e);
        return 1;
    }
    let graph = match engine.graph(story) {
        Ok(graph) => graph,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            return 1;
        }
    };

    for step in 1..=500 {
        let Some(current) = player.current_node(story).cloned() else {
            return 1;
        };
        let Some(node) = graph.get_node(&current) else {
            println!("Story already finished.");
            return 0;
        };
        print_node(node);
        let result = if node.choices.is_empty() {
            engine.continue_story(player, story)
        } else {
            match graph.eligible_choices(&current, player).ok().and_then(|c| c.first().copied()) {
                Some(index) => {
                    println!("  > {}", node.choices[index].text);
                    engine.choose(player, story, index)
                }
                None => {
                    eprintln!("ERROR: no eligible choice at '{}'", current);
                    return 1;
                }
            }
        };
        match result {
            Ok(report) => {
                print_report(&report);
                if report.outcome.next_node_id.is_none() {
                    println!("\nFinished after {} steps.", step);
                    print_status(player);
                    return 0;
                }
            }
            Err(e) => {
                eprintln!("ERROR: {}", e);
                return 1;
            }
        }
    }
    eprintln!("ERROR: story did not finish within 500 steps");
    1
}

fn save(store: Option<&RonFileStore>, player: &PlayerProgress) {
    let Some(store) = store else {
        return;
    };
    match store.save(player) {
        Ok(()) => println!("Saved progress to {}", store.dir().display()),
        Err(e) => eprintln!("ERROR: Failed to save: {}", e),
    }
}

fn print_node(node: &StoryNode) {
    println!("\n[{}] ({:?})", node.id, node.node_type);
    if !node.metadata.characters.is_empty() {
        println!("  with {}", node.metadata.characters.join(", "));
    }
    println!("{}", node.content.text);
    for (i, choice) in node.choices.iter().enumerate() {
        let gated = if choice.requires.is_some() { " [requires]" } else { "" };
        println!("  {}. {}{}", i, choice.text, gated);
    }
    if node.choices.is_empty() && node.next.is_some() {
        println!("  (next)");
    }
}

fn print_report(report: &ChoiceReport) {
    let effects = &report.outcome.applied_effects;
    for item in &effects.items_added {
        println!("  + item {}", item);
    }
    for item in &effects.items_removed {
        println!("  - item {}", item);
    }
    for change in &effects.trait_changes {
        println!("  {} {:+} -> {}", change.name, change.change, change.value);
    }
    if effects.paradox_coins != 0 {
        println!("  {:+} paradox coins", effects.paradox_coins);
    }
    for id in &effects.unlocked_fragments {
        println!("  Unlocked fragment: {}", id);
    }
    if let Some(completion) = &report.outcome.completion {
        println!("\n*** Story completed: +{} paradox coins ***", completion.paradox_coins);
        for id in &completion.unlocked_fragments {
            println!("  Reward fragment: {}", id);
        }
        if let Some(chapter) = completion.chapter_advanced_to {
            println!("  Chapter advanced to {}", chapter.as_str());
        }
    }
    for id in &report.newly_eligible {
        println!("  New story available: {}", id);
    }
}

fn print_status(player: &PlayerProgress) {
    let profile = &player.lie_profile;
    println!("Player {}", player.player_id);
    println!("  Chapter: {}", player.current_chapter.as_str());
    println!("  Paradox coins: {}", player.paradox_coins);
    println!(
        "  Lie creativity {} / truth resistance {} / paradox aptitude {}",
        profile.lie_creativity(),
        profile.truth_resistance(),
        profile.paradox_aptitude()
    );
    let fragments: Vec<&str> = player.truth_fragments.iter().map(FragmentId::as_str).collect();
    println!("  Fragments: {}", fragments.join(", "));
    let done: Vec<&str> = player.completed_stories.iter().map(StoryId::as_str).collect();
    println!("  Completed: {}", done.join(", "));
}

fn print_help() {
    println!("Commands:");
    println!("  stories                 list stories you may start");
    println!("  start <story>           start or resume a story");
    println!("  choose <n>              take choice n");
    println!("  next                    follow the continue link");
    println!("  restart                 back to the start of the current story");
    println!("  roll <n>                roll discoveries for choice n");
    println!("  combine <id> <id> ...   combine owned fragments");
    println!("  status                  show progress");
    println!("  save                    write progress (needs --save-dir)");
    println!("  quit                    exit");
}
