//! arbor - walks through tagging, forking and traversing a small tree.
//!
//! # Configuration
//!
//! Pass a config file (`.toml`, `.json` or `.yaml`) as the only argument, or
//! set these environment variables (a `.env` file is honoured):
//!
//! - `ARBOR_STORE_PROVIDER` - `sqlite` (default) or `memory`
//! - `ARBOR_DB_PATH` - SQLite database path, defaults to `~/.arbor/arbor.db`
//! - `ARBOR_FORK_NAME_PREFIX` - name prefix for forked versions
//!
//! Log output goes to stderr and is filtered with `RUST_LOG`.

use anyhow::{Context, Result};
use arbor_core::{
    payload_from_value, ArborConfig, ArborError, GraphTraversal, NodeId, Store, StoreFactory, Tag,
    TraversalStatus, Version, VersionId, VersioningEngine,
};
use serde_json::json;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEMO_TAG: &str = "v1.0";

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    let config = load_config()?;
    let store = StoreFactory::create(&config.store).context("failed to open store")?;
    let engine = VersioningEngine::with_config(store, config.versioning);

    run_demo(&engine)
}

fn load_config() -> Result<ArborConfig> {
    match std::env::args().nth(1) {
        Some(path) => ArborConfig::from_file(&path)
            .with_context(|| format!("failed to load config from {}", path)),
        None => ArborConfig::from_env().context("invalid environment configuration"),
    }
}

fn run_demo(engine: &VersioningEngine) -> Result<()> {
    let store = engine.store();

    let tree = engine.create_version("Tree")?;
    let root = store.create_node(tree.id, &payload_from_value(json!({"name": "root"}))?)?;
    let child = store.create_node(tree.id, &payload_from_value(json!({"name": "child"}))?)?;
    store.create_edge(
        root.id,
        child.id,
        &payload_from_value(json!({"relationship": "parent-child"}))?,
    )?;
    info!("Built version {} with {} -> {}", tree.id, root.id, child.id);

    let tag = tag_version(engine, &tree)?;
    println!("Tagged version {} as '{}'", tree.id, tag.tag_name);

    let fork = engine.fork_from_tag(&tag.tag_name)?;
    println!(
        "Forked '{}' into version {} ({})",
        tag.tag_name, fork.version.id, fork.version.name
    );
    for (old, new) in fork.id_map.iter() {
        println!("  node {} -> {}", old, new);
    }

    println!("\nTraversing original version {}:", tree.id);
    print_traversal(store.as_ref(), tree.id, root.id)?;

    println!("\nTraversing forked version {}:", fork.version.id);
    print_traversal(store.as_ref(), fork.version.id, fork.id_map.translate(root.id)?)?;

    let tagged = engine.get_version_by_tag(&tag.tag_name)?;
    println!("\nTag '{}' points at version {} ({})", tag.tag_name, tagged.id, tagged.name);

    let children = engine.get_child_versions(tree.id)?;
    println!("Version {} has {} child version(s)", tree.id, children.len());
    if let Some(first) = children.first() {
        if let Some(node) = store.list_nodes_by_version(first.id)?.first() {
            println!("\nTraversing first child version {}:", first.id);
            print_traversal(store.as_ref(), first.id, node.id)?;
        }
    }

    let lineage: Vec<String> = engine
        .get_lineage(fork.version.id)?
        .iter()
        .map(|v| v.id.to_string())
        .collect();
    println!("\nLineage of version {}: {}", fork.version.id, lineage.join(" <- "));

    Ok(())
}

/// Tag the demo version, picking a fresh name if a previous run took it.
fn tag_version(engine: &VersioningEngine, tree: &Version) -> Result<Tag> {
    let description = Some("Initial version of the tree");
    match engine.create_tag(tree.id, DEMO_TAG, description) {
        Err(ArborError::DuplicateTag { .. }) => {
            let name = format!("{}-{}", DEMO_TAG, tree.id);
            info!("Tag '{}' already exists, using '{}'", DEMO_TAG, name);
            Ok(engine.create_tag(tree.id, &name, description)?)
        }
        other => Ok(other?),
    }
}

fn print_traversal(store: &dyn Store, version_id: VersionId, start: NodeId) -> Result<()> {
    for line in traversal_lines(store, version_id, start)? {
        println!("{}", line);
    }
    Ok(())
}

/// Rendered visits, or a not-found line when the start node is missing.
fn traversal_lines(
    store: &dyn Store,
    version_id: VersionId,
    start: NodeId,
) -> Result<Vec<String>> {
    let mut traversal = GraphTraversal::new(store).traverse(version_id, start);
    let mut lines = Vec::new();
    for visit in traversal.by_ref() {
        lines.push(visit?.to_string());
    }
    if let TraversalStatus::NodeNotFound(id) = traversal.status() {
        lines.push(format!("Node {} not found.", id));
    }
    Ok(lines)
}
