/// Story Linter: validates story definitions against the fragment catalog.
///
/// Usage: story_linter [--stories <dir>] [--fragments <path>] [--deny-warnings]

use clap::Parser;
use paradox_engine::core::lint::{lint_story, LintIssue, Severity};
use paradox_engine::core::progression::ParadoxEngine;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "story_linter", version, about = "Check story definitions for authoring mistakes")]
struct Cli {
    /// Directory of story .ron files
    #[arg(long, default_value = "story_data/stories")]
    stories: PathBuf,
    /// Fragment catalog .ron file
    #[arg(long, default_value = "story_data/fragments.ron")]
    fragments: PathBuf,
    /// Treat warnings as errors
    #[arg(long)]
    deny_warnings: bool,
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "paradox_engine=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    if !cli.stories.is_dir() {
        eprintln!("ERROR: Path '{}' is not a directory", cli.stories.display());
        process::exit(1);
    }

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

    println!(
        "Loaded {} stories, {} fragments",
        engine.stories().count(),
        engine.fragments().len()
    );

    let mut issues: Vec<LintIssue> = Vec::new();
    for story in engine.stories() {
        match engine.graph(&story.id) {
            Ok(graph) => issues.extend(lint_story(graph, engine.fragments())),
            Err(e) => eprintln!("ERROR: {}", e),
        }
    }
    issues.sort_by(|a, b| a.severity.cmp(&b.severity));

    println!("\n=== Story Lint Report ===\n");

    if issues.is_empty() {
        println!("All checks passed!");
    }
    for issue in &issues {
        println!("{}", issue);
    }

    let errors = issues.iter().filter(|i| i.severity == Severity::Error).count();
    let warnings = issues.len() - errors;
    println!("\nSummary: {} errors, {} warnings", errors, warnings);

    if errors > 0 || (cli.deny_warnings && warnings > 0) {
        process::exit(1);
    }
}
