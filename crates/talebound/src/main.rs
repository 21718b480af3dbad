//! Talebound
//!
//! Command-line driver for the graph script engine: validate graphs, list
//! the node catalog, or run a trigger against a world.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use script_runtime::{
    GraphLibrary, HandlerRegistry, HostEvent, HostPublisher, ScriptEngine, TriggerReport, WalkStatus,
    validate_graph,
};
use script_types::{NodeCategory, NodeType, World};

use talebound::config::{AppConfig, DEFAULT_CONFIG_FILE};
use talebound::{load_graphs, load_world};

/// Graph script engine for interactive fiction
#[derive(Parser, Debug)]
#[command(name = "talebound")]
#[command(about = "Graph script engine for interactive fiction", long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// World document, overrides the configuration
    #[arg(long, global = true)]
    world: Option<PathBuf>,

    /// Graph directory or file, overrides the configuration
    #[arg(long, global = true)]
    graphs: Option<PathBuf>,

    /// Fixed seed for the random nodes
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate every loaded graph
    Validate,

    /// Print the node catalog
    Nodes {
        /// Only this category (Event, Condition, Action, Flow, Variable, Dialogue)
        #[arg(long)]
        category: Option<String>,
    },

    /// Fire one event at an owner and print what happens
    Trigger {
        owner_type: String,
        owner_id: String,
        event_tag: String,

        /// Turns to advance after the trigger
        #[arg(long, default_value_t = 0)]
        turns: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args.config.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    let mut config = AppConfig::load(&config_path, args.config.is_some())?;
    if let Some(world) = args.world {
        config.world = world;
    }
    if let Some(graphs) = args.graphs {
        config.graphs = graphs;
    }
    if args.seed.is_some() {
        config.engine.rng_seed = args.seed;
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter)))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match args.command {
        Command::Validate => validate(&config).await,
        Command::Nodes { category } => nodes(category.as_deref()),
        Command::Trigger {
            owner_type,
            owner_id,
            event_tag,
            turns,
        } => trigger(config, &owner_type, &owner_id, &event_tag, turns).await,
    }
}

async fn validate(config: &AppConfig) -> Result<()> {
    let graphs = load_graphs(&config.graphs)
        .await
        .with_context(|| format!("loading graphs from {}", config.graphs.display()))?;
    let registry = HandlerRegistry::with_builtins();

    let mut invalid = 0;
    for graph in &graphs {
        let result = validate_graph(graph, &registry);
        let verdict = if result.valid { "ok" } else { "INVALID" };
        println!("{} ({} {}): {}", graph.id, graph.owner_type, graph.owner_id, verdict);
        for error in &result.errors {
            println!("  error: {}", error);
        }
        for warning in &result.warnings {
            println!("  warning: {}", warning);
        }
        if !result.valid {
            invalid += 1;
        }
    }

    if invalid > 0 {
        bail!("{} of {} graphs failed validation", invalid, graphs.len());
    }
    info!("All {} graphs valid", graphs.len());
    Ok(())
}

fn nodes(category: Option<&str>) -> Result<()> {
    let filter = match category {
        Some(name) => match NodeCategory::parse(name) {
            Some(c) => Some(c),
            None => bail!("Unknown node category '{}'", name),
        },
        None => None,
    };

    let registry = HandlerRegistry::with_builtins();
    for node_type in NodeType::ALL.iter().copied() {
        if filter.is_some_and(|c| node_type.category() != c) {
            continue;
        }
        let handled = if registry.contains(node_type) {
            ""
        } else {
            "  (no handler)"
        };
        println!(
            "{:<36} {:<10} {}{}",
            node_type.tag(),
            node_type.category().name(),
            node_type.output_ports().join(", "),
            handled
        );
    }
    Ok(())
}

async fn trigger(config: AppConfig, owner_type: &str, owner_id: &str, event_tag: &str, turns: u32) -> Result<()> {
    let world = load_world(&config.world)
        .await
        .with_context(|| format!("loading world from {}", config.world.display()))?;
    let graphs = load_graphs(&config.graphs)
        .await
        .with_context(|| format!("loading graphs from {}", config.graphs.display()))?;

    let publisher = HostPublisher::default();
    let printer = tokio::spawn(print_host_events(publisher.subscribe()));

    let engine = ScriptEngine::new(world, GraphLibrary::new(graphs), Arc::new(publisher), config.engine);
    let (handle, join_handle) = engine.spawn();

    let report = handle.trigger(owner_type, owner_id, event_tag).await?;
    if report.is_empty() {
        warn!(owner_type, owner_id, event_tag, "No graph handles this event");
    }
    print_report(&report);

    for _ in 0..turns {
        let report = handle.advance_turn().await?;
        print_report(&report);
    }

    handle.shutdown().await;
    let world = join_handle.await.context("engine task failed")?;
    // The engine owned the last publisher, so the printer drains and exits
    printer.await.context("printer task failed")?;

    print_summary(&world);
    Ok(())
}

async fn print_host_events(mut rx: broadcast::Receiver<HostEvent>) {
    loop {
        match rx.recv().await {
            Ok(event) => print_event(&event),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "Host event printer lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn print_event(event: &HostEvent) {
    match event {
        HostEvent::ShowMessage { text } => println!("{}", text),
        HostEvent::PlaySound { sound_id } => println!("[sound] {}", sound_id),
        HostEvent::RoomMusicChanged { room_id, music_id } => println!("[music] {} in {}", music_id, room_id),
        HostEvent::PlayerTeleported { room_id } => println!("[teleport] {}", room_id),
        HostEvent::StartConversation { npc_id } => println!("[conversation] {}", npc_id),
        HostEvent::StartCombat { npc_id } => println!("[combat] {}", npc_id),
        HostEvent::StartTrade { npc_id } => println!("[trade] {}", npc_id),
        HostEvent::AdventureCompleted => println!("[adventure completed]"),
        HostEvent::Diagnostic { text } => eprintln!("[diagnostic] {}", text),
    }
}

fn print_report(report: &TriggerReport) {
    if report.all_completed() {
        return;
    }
    for walk in report.all_walks() {
        match &walk.status {
            WalkStatus::Completed => {}
            status => eprintln!("[walk {}] {} from '{}': {:?}", walk.walk_id, walk.graph_id, walk.entry_node_id, status),
        }
    }
}

fn print_summary(world: &World) {
    let player = &world.player;
    println!();
    println!(
        "{}: health {}/{}, gold {}, xp {}, room '{}'",
        player.name, player.health, player.max_health, player.gold, player.experience, player.room_id
    );
    if !player.inventory.is_empty() {
        println!("carrying: {}", player.inventory.join(", "));
    }
    println!("turn {}, score {}", world.game.turn, world.game.score);
}
