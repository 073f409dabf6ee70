// crates/flowcli/src/main.rs

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use flowcore::{Connection, Container, EndpointType, WorkflowNode};
use floweditor::{transfer, Definition, Editor, NodeScope, Registries};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "flow")]
#[command(about = "Workflow document CLI", long_about = None)]
struct Cli {
    /// Show debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a workflow document for structural and referential problems
    Validate {
        /// Path to workflow JSON file
        file: PathBuf,

        /// Print diagnostics as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the triggers, steps, sub-steps and connections of a document
    Inspect {
        /// Path to workflow JSON file
        file: PathBuf,
    },

    /// Rewrite a document (template or legacy shape) in the canonical shape
    Normalize {
        /// Path to workflow JSON file
        file: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Drop orphaned sub-steps and dangling connections
        #[arg(long)]
        prune: bool,
    },

    /// Create a new example workflow
    Init {
        /// Output file path
        #[arg(short, long, default_value = "workflow.json")]
        output: PathBuf,
    },

    /// List available trigger, node and tool types
    Catalog {
        /// Case-insensitive search over label, type, description and tags
        #[arg(short, long)]
        search: Option<String>,

        /// Only show one category
        #[arg(short, long)]
        category: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let registries = flownodes::standard_registries();

    match cli.command {
        Commands::Validate { file, json } => validate_workflow(&file, json, registries).await?,
        Commands::Inspect { file } => inspect_workflow(&file, registries).await?,
        Commands::Normalize {
            file,
            output,
            prune,
        } => normalize_workflow(&file, &output, prune, registries).await?,
        Commands::Init { output } => create_example_workflow(&output, registries).await?,
        Commands::Catalog { search, category } => {
            list_catalog(&registries, search.as_deref(), category.as_deref())
        }
    }

    Ok(())
}

async fn load(file: &Path, registries: Arc<Registries>) -> Result<Editor> {
    let json = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;
    let mut editor = Editor::new(registries);
    if let Err(err) = editor.import_json(&json) {
        for message in err.errors() {
            println!("   ✗ {}", message);
        }
        return Err(err).with_context(|| format!("{} is not a workflow document", file.display()));
    }
    tracing::debug!(file = %file.display(), "document loaded");
    Ok(editor)
}

async fn validate_workflow(file: &Path, json: bool, registries: Arc<Registries>) -> Result<()> {
    if !json {
        println!("🔍 Validating workflow: {}", file.display());
    }

    let editor = load(file, Arc::clone(&registries)).await?;
    let mut document = editor.export_document();
    let diagnostics = editor.diagnose();

    if json {
        println!("{}", serde_json::to_string_pretty(&diagnostics)?);
        if !diagnostics.is_consistent() {
            bail!("{} has dangling references", file.display());
        }
        return Ok(());
    }

    let mut warnings = Vec::new();
    for trigger in &document.triggers {
        if let Err(err) = registries.triggers.validate(&trigger.trigger_type, &trigger.config) {
            warnings.push(format!("trigger {}: {}", trigger.id, err));
        }
    }
    transfer::for_each_node_mut(&mut document, &mut |node: &mut WorkflowNode| {
        if let Err(err) = registries.nodes.validate(&node.node_type, &node.config) {
            warnings.push(format!("node {}: {}", node.id, err));
        }
    });

    for id in &diagnostics.dangling_connections {
        println!("   ✗ connection {} points at a missing entity", id);
    }
    for id in &diagnostics.orphan_sub_steps {
        println!("   ✗ sub-step {} has no parent node", id);
    }
    for cycle in &diagnostics.cycles {
        println!("   ⚠️  connection cycle: {}", cycle.join(" → "));
    }
    for (target, count) in &diagnostics.multi_inbound_targets {
        println!("   ℹ️  {} has {} inbound connections", target, count);
    }
    for warning in &warnings {
        println!("   ⚠️  {}", warning);
    }

    if !diagnostics.is_consistent() {
        bail!(
            "{} dangling connection(s), {} orphaned sub-step(s)",
            diagnostics.dangling_connections.len(),
            diagnostics.orphan_sub_steps.len()
        );
    }

    println!("✅ Workflow is valid:");
    println!("   Name: {}", document.name);
    println!("   Triggers: {}", document.triggers.len());
    println!("   Steps: {}", document.containers.len());
    println!("   Nodes: {}", document.node_count());
    println!("   Connections: {}", document.connections.len());
    Ok(())
}

async fn inspect_workflow(file: &Path, registries: Arc<Registries>) -> Result<()> {
    let editor = load(file, registries).await?;
    let document = editor.export_document();

    println!("📋 Workflow: {} (v{})", document.name, document.version);
    if !document.description.is_empty() {
        println!("   {}", document.description);
    }

    println!();
    println!("⚡ Triggers:");
    for trigger in &document.triggers {
        println!(
            "  • {} [{}]{}",
            label_or_id(&trigger.label, &trigger.id),
            trigger.trigger_type,
            disabled(trigger.enabled)
        );
        for node in trigger.nodes.iter().flatten() {
            print_node(node, 2);
        }
    }

    println!();
    println!("📦 Steps:");
    for (index, container) in document.containers.iter().enumerate() {
        println!(
            "  {}. {} ({})",
            index + 1,
            label_or_id(&container.title, &container.id),
            container.id
        );
        for node in &container.nodes {
            print_node(node, 2);
        }
    }

    if !document.sub_steps.is_empty() {
        println!();
        println!("🧩 Sub-steps:");
        for sub_step in &document.sub_steps {
            println!(
                "  • {} → {}/{}",
                label_or_id(&sub_step.name, &sub_step.id),
                sub_step.parent_container_id,
                sub_step.parent_node_id
            );
            for node in &sub_step.nodes {
                print_node(node, 2);
            }
        }
    }

    println!();
    println!("🔗 Connections: {}", document.connections.len());
    for conn in &document.connections {
        let branch = conn
            .branch_output
            .as_deref()
            .map(|b| format!(" [{}]", b))
            .unwrap_or_default();
        println!("  {}{} → {}", conn.source_id, branch, conn.target_id);
    }
    Ok(())
}

fn print_node(node: &WorkflowNode, depth: usize) {
    let indent = "  ".repeat(depth);
    println!(
        "{}- {} [{}]{}",
        indent,
        label_or_id(&node.label, &node.id),
        node.node_type,
        disabled(node.enabled)
    );
    for tool in node.tools.iter().flatten() {
        println!("{}  🔧 {} [{}]", indent, label_or_id(&tool.label, &tool.id), tool.tool_type);
    }
    for branch in node.branches.iter().flatten() {
        println!("{}  ↳ {}", indent, branch.id);
        for child in &branch.nodes {
            print_node(child, depth + 2);
        }
    }
}

fn label_or_id<'a>(label: &'a str, id: &'a str) -> &'a str {
    if label.is_empty() {
        id
    } else {
        label
    }
}

fn disabled(enabled: bool) -> &'static str {
    if enabled {
        ""
    } else {
        " (disabled)"
    }
}

async fn normalize_workflow(
    file: &Path,
    output: &Path,
    prune: bool,
    registries: Arc<Registries>,
) -> Result<()> {
    let mut editor = load(file, registries).await?;
    if prune {
        let report = editor.prune_orphans();
        println!(
            "🧹 Pruned {} sub-step(s) and {} connection(s)",
            report.sub_steps, report.connections
        );
    }
    write_document(output, &editor).await?;
    println!("✨ Normalized {} → {}", file.display(), output.display());
    Ok(())
}

async fn create_example_workflow(output: &Path, registries: Arc<Registries>) -> Result<()> {
    let mut editor = Editor::new(registries);
    editor.new_document("Example Webhook Workflow");
    editor.set_description("Receives a webhook and forwards it to an API");

    let trigger_id = editor.add_trigger_from_registry("webhook", None)?;
    editor
        .graph_mut()
        .add_container(Container::new("c1", "Step 1").with_subtitle("Forward the payload"))?;

    let mut config = flowcore::Config::new();
    config.insert("method".to_string(), "POST".into());
    config.insert("url".to_string(), "https://example.com/api/events".into());
    let node_id = editor
        .add_node_from_registry(&NodeScope::container("c1"), "http", Some(config), None)?
        .context("step c1 disappeared while building the example")?;

    editor.add_connection(Connection::new(
        trigger_id,
        EndpointType::Trigger,
        node_id,
        EndpointType::Node,
    ));

    write_document(output, &editor).await?;

    println!("✨ Created example workflow: {}", output.display());
    println!();
    println!("Inspect it with:");
    println!("  flow inspect {}", output.display());
    Ok(())
}

async fn write_document(output: &Path, editor: &Editor) -> Result<()> {
    let json = editor.export_json()?;
    tokio::fs::write(output, json)
        .await
        .with_context(|| format!("failed to write {}", output.display()))?;
    Ok(())
}

fn list_catalog(registries: &Registries, search: Option<&str>, category: Option<&str>) {
    println!("📦 Available Types:");
    print_definitions("Triggers", registries.triggers.search(search.unwrap_or("")), category);
    print_definitions("Nodes", registries.nodes.search(search.unwrap_or("")), category);
    print_definitions("Tools", registries.tools.search(search.unwrap_or("")), category);
}

fn print_definitions(title: &str, definitions: Vec<&Definition>, category: Option<&str>) {
    let definitions: Vec<&Definition> = definitions
        .into_iter()
        .filter(|d| category.map_or(true, |c| d.category == c))
        .collect();
    if definitions.is_empty() {
        return;
    }

    println!();
    println!("{}:", title);
    for definition in definitions {
        let mut flags = Vec::new();
        if definition.capabilities.supports_branches {
            flags.push("branches");
        }
        if definition.capabilities.supports_tools {
            flags.push("tools");
        }
        let flags = if flags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", flags.join(", "))
        };
        println!("  • {} ({}){}", definition.type_id, definition.category, flags);
        if !definition.description.is_empty() {
            println!("    {}", definition.description);
        }
    }
}
