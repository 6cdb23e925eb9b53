//! lledger CLI - Command line interface for learning_ledger
//!
//! Every command prints a single JSON document on stdout. Logs go to stderr
//! and are controlled by `RUST_LOG` or the configured log level.

use anyhow::Context;
use clap::{Parser, Subcommand};
use learning_ledger::{
    Config, EntityId, Event, Hash, LearningLedger, MerkleTreeBuilder, Node, Principal, RootUpdate,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lledger")]
#[command(about = "A content-addressed ledger of per-entity learning trees")]
#[command(version)]
struct Cli {
    /// Path to the ledger file (defaults to the configured path)
    #[arg(short = 'd', long)]
    ledger: Option<PathBuf>,

    /// Output format (json or text)
    #[arg(short, long, default_value = "json")]
    format: OutputFormat,

    /// Identity of the caller for administrative commands
    #[arg(long)]
    caller: Option<String>,

    /// Path to a config file
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    Json,
    Text,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new ledger
    Init {
        /// Admin principal (defaults to the configured admin)
        #[arg(long)]
        admin: Option<String>,
    },

    // === Administrative Commands ===
    /// Build a tree from leaf payloads and commit it
    Update {
        /// Entity ID
        entity: String,
        /// Leaf payloads, in order
        #[arg(required = true)]
        payloads: Vec<String>,
        /// Reason recorded with the update
        #[arg(short, long, default_value = "learning update")]
        reason: String,
    },

    /// Replace the node set from a JSON file without changing the root
    Replace {
        /// Entity ID
        entity: String,
        /// JSON array of nodes
        nodes: PathBuf,
    },

    /// Commit a root without touching the node set
    Commit {
        /// Entity ID
        entity: String,
        /// New root hash (hex)
        root: String,
        /// Opaque proof bytes (hex)
        #[arg(long, default_value = "")]
        proof: String,
        #[arg(short, long, default_value = "root commit")]
        reason: String,
    },

    /// Force a root when node data is unavailable
    Reset {
        /// Entity ID
        entity: String,
        /// New root hash (hex)
        root: String,
        #[arg(short, long, default_value = "emergency reset")]
        reason: String,
    },

    /// Hand the admin role to another principal
    TransferAdmin {
        /// New admin principal
        new_admin: String,
    },

    // === Query Commands ===
    /// Show the current root
    Root { entity: String },

    /// Show learning metrics
    Metrics { entity: String },

    /// Show root history
    History {
        entity: String,
        /// Only the most recent updates
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Get a node by hash
    Node { entity: String, hash: String },

    /// List nodes
    Nodes {
        entity: String,
        /// Only nodes at this level
        #[arg(long)]
        level: Option<u32>,
        /// Only leaves
        #[arg(long)]
        leaves: bool,
    },

    /// Show the path from a leaf to the root
    Path { entity: String, leaf: String },

    /// Produce a membership proof for a stored leaf
    Prove { entity: String, leaf: String },

    /// Check a membership proof against the current root
    Verify {
        entity: String,
        leaf: String,
        /// Sibling hashes, leaf side first
        proof: Vec<String>,
    },

    /// Check whether a root was ever committed
    InHistory { entity: String, root: String },

    /// Check the integrity of a single node
    CheckNode { entity: String, hash: String },

    /// Check the integrity of a whole tree
    CheckTree { entity: String },

    /// List known entities
    Entities,

    /// Show ledger status
    Status,
}

/// Node as accepted by `replace`; payloads are UTF-8 text
#[derive(Deserialize)]
struct NodeInput {
    hash: Hash,
    #[serde(default)]
    left_child: Option<Hash>,
    #[serde(default)]
    right_child: Option<Hash>,
    #[serde(default)]
    payload: String,
    #[serde(default)]
    level: u32,
    #[serde(default)]
    position: u32,
    is_leaf: bool,
}

impl From<NodeInput> for Node {
    fn from(input: NodeInput) -> Self {
        Node {
            hash: input.hash,
            left_child: input.left_child,
            right_child: input.right_child,
            payload: input.payload.into_bytes(),
            level: input.level,
            position: input.position,
            is_leaf: input.is_leaf,
            inserted_at: 0,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    init_logging(&config);

    let path = cli.ledger.clone().unwrap_or_else(|| config.ledger_path.clone());
    let caller = Principal::new(cli.caller.clone().unwrap_or_else(|| config.admin.clone()));

    match cli.command {
        Commands::Init { admin } => {
            let admin = admin.unwrap_or_else(|| config.admin.clone());
            let ledger = LearningLedger::create(&path, admin.as_str())?;
            output(
                &cli.format,
                &serde_json::json!({
                    "status": "ok",
                    "admin": ledger.admin().to_string(),
                    "message": format!("Created ledger at {}", path.display())
                }),
            );
        }

        Commands::Update {
            entity,
            payloads,
            reason,
        } => {
            let ledger = open_ledger(&path, &config)?;
            let entity = EntityId::new(entity);
            let tree = MerkleTreeBuilder::from_payloads(payloads).build()?;
            let update =
                ledger.update_learning_tree(&caller, &entity, tree.nodes.clone(), tree.root, vec![], &reason)?;
            ledger.sync()?;
            output(
                &cli.format,
                &serde_json::json!({
                    "status": "ok",
                    "entity": entity.to_string(),
                    "root": tree.root.to_hex(),
                    "node_count": tree.nodes.len(),
                    "update": update_json(&update),
                    "events": events_json(&ledger.drain_events())
                }),
            );
        }

        Commands::Replace { entity, nodes } => {
            let ledger = open_ledger(&path, &config)?;
            let entity = EntityId::new(entity);
            let content = std::fs::read_to_string(&nodes)
                .with_context(|| format!("Failed to read {}", nodes.display()))?;
            let inputs: Vec<NodeInput> = serde_json::from_str(&content)?;
            let nodes: Vec<Node> = inputs.into_iter().map(Node::from).collect();
            let previous = ledger.replace_tree(&caller, &entity, nodes)?;
            ledger.sync()?;
            output(
                &cli.format,
                &serde_json::json!({
                    "status": "ok",
                    "entity": entity.to_string(),
                    "previous_count": previous,
                    "node_count": ledger.node_count(&entity),
                    "events": events_json(&ledger.drain_events())
                }),
            );
        }

        Commands::Commit {
            entity,
            root,
            proof,
            reason,
        } => {
            let ledger = open_ledger(&path, &config)?;
            let entity = EntityId::new(entity);
            let proof = hex::decode(proof.trim_start_matches("0x")).context("Invalid proof hex")?;
            let update = ledger.commit_root(&caller, &entity, parse_hash(&root)?, proof, &reason)?;
            ledger.sync()?;
            output(
                &cli.format,
                &serde_json::json!({
                    "status": "ok",
                    "update": update_json(&update),
                    "events": events_json(&ledger.drain_events())
                }),
            );
        }

        Commands::Reset {
            entity,
            root,
            reason,
        } => {
            let ledger = open_ledger(&path, &config)?;
            let entity = EntityId::new(entity);
            let update = ledger.emergency_reset(&caller, &entity, parse_hash(&root)?, &reason)?;
            ledger.sync()?;
            output(
                &cli.format,
                &serde_json::json!({
                    "status": "ok",
                    "update": update_json(&update),
                    "events": events_json(&ledger.drain_events())
                }),
            );
        }

        Commands::TransferAdmin { new_admin } => {
            let ledger = open_ledger(&path, &config)?;
            ledger.transfer_admin(&caller, new_admin.as_str())?;
            ledger.sync()?;
            output(
                &cli.format,
                &serde_json::json!({
                    "status": "ok",
                    "admin": ledger.admin().to_string()
                }),
            );
        }

        Commands::Root { entity } => {
            let ledger = open_existing(&path)?;
            let entity = EntityId::new(entity);
            output(
                &cli.format,
                &serde_json::json!({
                    "entity": entity.to_string(),
                    "root": ledger.root(&entity).map(|r| r.to_hex()),
                    "update_count": ledger.update_count(&entity)
                }),
            );
        }

        Commands::Metrics { entity } => {
            let ledger = open_existing(&path)?;
            let entity = EntityId::new(entity);
            let metrics = ledger.metrics(&entity).unwrap_or_default();
            output(
                &cli.format,
                &serde_json::json!({
                    "entity": entity.to_string(),
                    "metrics": metrics
                }),
            );
        }

        Commands::History { entity, limit } => {
            let ledger = open_existing(&path)?;
            let entity = EntityId::new(entity);
            let updates = match limit {
                Some(limit) => ledger.recent_updates(&entity, limit)?,
                None => ledger.update_history(&entity),
            };
            let items: Vec<_> = updates.iter().map(update_json).collect();
            output(
                &cli.format,
                &serde_json::json!({
                    "count": items.len(),
                    "updates": items
                }),
            );
        }

        Commands::Node { entity, hash } => {
            let ledger = open_existing(&path)?;
            let entity = EntityId::new(entity);
            match ledger.node(&entity, &parse_hash(&hash)?) {
                Ok(node) => output(&cli.format, &node_json(&node)),
                Err(e) => {
                    output(
                        &cli.format,
                        &serde_json::json!({
                            "status": "error",
                            "message": e.to_string()
                        }),
                    );
                    std::process::exit(1);
                }
            }
        }

        Commands::Nodes {
            entity,
            level,
            leaves,
        } => {
            let ledger = open_existing(&path)?;
            let entity = EntityId::new(entity);
            let nodes = match (level, leaves) {
                (Some(level), _) => ledger.nodes_at_level(&entity, level),
                (None, true) => ledger.leaf_nodes(&entity),
                (None, false) => ledger.all_nodes(&entity),
            };
            let items: Vec<_> = nodes.iter().map(node_json).collect();
            output(
                &cli.format,
                &serde_json::json!({
                    "count": items.len(),
                    "depth": ledger.tree_depth(&entity),
                    "nodes": items
                }),
            );
        }

        Commands::Path { entity, leaf } => {
            let ledger = open_existing(&path)?;
            let entity = EntityId::new(entity);
            let path = ledger.path_to_root(&entity, &parse_hash(&leaf)?)?;
            let reaches_root = path.last().copied() == ledger.root(&entity);
            output(
                &cli.format,
                &serde_json::json!({
                    "length": path.len(),
                    "reaches_root": reaches_root,
                    "path": hex_list(&path)
                }),
            );
        }

        Commands::Prove { entity, leaf } => {
            let ledger = open_existing(&path)?;
            let entity = EntityId::new(entity);
            let proof = ledger.generate_proof(&entity, &parse_hash(&leaf)?)?;
            output(
                &cli.format,
                &serde_json::json!({
                    "leaf": leaf,
                    "proof": hex_list(&proof)
                }),
            );
        }

        Commands::Verify {
            entity,
            leaf,
            proof,
        } => {
            let ledger = open_existing(&path)?;
            let entity = EntityId::new(entity);
            let proof = proof
                .iter()
                .map(|h| parse_hash(h))
                .collect::<anyhow::Result<Vec<_>>>()?;
            let valid = ledger.verify_proof(&entity, &parse_hash(&leaf)?, &proof);
            output(&cli.format, &serde_json::json!({ "valid": valid }));
        }

        Commands::InHistory { entity, root } => {
            let ledger = open_existing(&path)?;
            let entity = EntityId::new(entity);
            let found = ledger.verify_root_in_history(&entity, &parse_hash(&root)?);
            output(&cli.format, &serde_json::json!({ "in_history": found }));
        }

        Commands::CheckNode { entity, hash } => {
            let ledger = open_existing(&path)?;
            let entity = EntityId::new(entity);
            let (valid, info) = ledger.verify_individual_node(&entity, &parse_hash(&hash)?);
            output(
                &cli.format,
                &serde_json::json!({
                    "valid": valid,
                    "info": info
                }),
            );
        }

        Commands::CheckTree { entity } => {
            let ledger = open_existing(&path)?;
            let entity = EntityId::new(entity);
            let report = ledger.verify_tree_integrity(&entity);
            output(
                &cli.format,
                &serde_json::json!({
                    "consistent": report.is_consistent(),
                    "report": report
                }),
            );
        }

        Commands::Entities => {
            let ledger = open_existing(&path)?;
            let items: Vec<_> = ledger
                .entities()
                .iter()
                .map(|e| {
                    serde_json::json!({
                        "entity": e.to_string(),
                        "root": ledger.root(e).map(|r| r.to_hex()),
                        "node_count": ledger.node_count(e),
                        "update_count": ledger.update_count(e)
                    })
                })
                .collect();
            output(
                &cli.format,
                &serde_json::json!({
                    "count": items.len(),
                    "entities": items
                }),
            );
        }

        Commands::Status => {
            let ledger = open_existing(&path)?;
            output(
                &cli.format,
                &serde_json::json!({
                    "ledger": path.display().to_string(),
                    "admin": ledger.admin().to_string(),
                    "entities": ledger.entities().len()
                }),
            );
        }
    }

    Ok(())
}

fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

/// Ledger for a write command; created with the configured admin if missing
fn open_ledger(path: &Path, config: &Config) -> anyhow::Result<LearningLedger> {
    let ledger = LearningLedger::open_or_create(path, config.admin.as_str())?;
    Ok(ledger)
}

/// Ledger for a query command; never creates a file
fn open_existing(path: &Path) -> anyhow::Result<LearningLedger> {
    if !path.exists() {
        anyhow::bail!(
            "No ledger at {}. Run 'lledger init' or pass --ledger",
            path.display()
        );
    }
    let ledger = LearningLedger::open(path)?;
    Ok(ledger)
}

fn parse_hash(s: &str) -> anyhow::Result<Hash> {
    Hash::from_hex(s).map_err(|_| anyhow::anyhow!("Invalid hash: {}", s))
}

fn hex_list(hashes: &[Hash]) -> Vec<String> {
    hashes.iter().map(|h| h.to_hex()).collect()
}

fn node_json(node: &Node) -> serde_json::Value {
    serde_json::json!({
        "hash": node.hash.to_hex(),
        "left_child": node.left_child.map(|h| h.to_hex()),
        "right_child": node.right_child.map(|h| h.to_hex()),
        "payload": String::from_utf8_lossy(&node.payload),
        "level": node.level,
        "position": node.position,
        "is_leaf": node.is_leaf,
        "inserted_at": node.inserted_at
    })
}

fn update_json(update: &RootUpdate) -> serde_json::Value {
    serde_json::json!({
        "previous_root": update.previous_root.to_hex(),
        "new_root": update.new_root.to_hex(),
        "proof": hex::encode(&update.proof),
        "reason": update.reason,
        "kind": update.kind.as_str(),
        "timestamp": update.timestamp
    })
}

fn events_json(events: &[Event]) -> serde_json::Value {
    serde_json::to_value(events).unwrap_or(serde_json::Value::Null)
}

fn output(format: &OutputFormat, value: &serde_json::Value) {
    let rendered = match format {
        OutputFormat::Json => serde_json::to_string(value),
        OutputFormat::Text => serde_json::to_string_pretty(value),
    };
    match rendered {
        Ok(s) => println!("{}", s),
        Err(e) => eprintln!("failed to render output: {}", e),
    }
}
