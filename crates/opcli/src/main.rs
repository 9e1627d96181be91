// crates/opcli/src/main.rs

use anyhow::Result;
use clap::{Parser, Subcommand};
use opcore::{EventKind, NodeReport, OperationSpec, Returned, Value, WorkflowDefinition};
use opruntime::{
    DrawOptions, ExecutionMode, FlowRuntime, OperationRegistry, RuntimeConfig, WorkflowLoader,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "opflow")]
#[command(about = "Operation workflow engine CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a workflow file
    Run {
        /// Path to workflow JSON file
        #[arg(short, long)]
        file: PathBuf,

        /// Input data as JSON object
        #[arg(short, long)]
        input: Option<String>,

        /// Runtime config JSON file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Run independent operations concurrently
        #[arg(short, long)]
        parallel: bool,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Build a workflow file and type-check it without running it
    Validate {
        /// Path to workflow JSON file
        file: PathBuf,
    },

    /// List available operation kinds
    Ops,

    /// Create a new example workflow
    Init {
        /// Output file path
        #[arg(short, long, default_value = "workflow.json")]
        output: PathBuf,
    },

    /// Render a workflow file as Graphviz DOT
    Draw {
        /// Path to workflow JSON file
        file: PathBuf,

        /// Write DOT here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Node fill color
        #[arg(long, default_value = "orange")]
        color: String,

        /// Omit node labels
        #[arg(long)]
        no_labels: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            file,
            input,
            config,
            parallel,
            verbose,
        } => {
            let level = if verbose {
                tracing::Level::DEBUG
            } else {
                tracing::Level::INFO
            };
            tracing_subscriber::fmt().with_max_level(level).init();

            run_workflow(file, input, config, parallel).await?;
        }

        Commands::Validate { file } => {
            validate_workflow(file)?;
        }

        Commands::Ops => {
            list_operations();
        }

        Commands::Init { output } => {
            create_example_workflow(output)?;
        }

        Commands::Draw {
            file,
            output,
            color,
            no_labels,
        } => {
            draw_workflow(file, output, color, no_labels)?;
        }
    }

    Ok(())
}

fn standard_registry() -> OperationRegistry {
    let mut registry = OperationRegistry::new();
    opnodes::register_all(&mut registry);
    registry
}

fn parse_inputs(input: Option<String>) -> Result<HashMap<String, Value>> {
    let Some(input_str) = input else {
        return Ok(HashMap::new());
    };
    let json: serde_json::Value = serde_json::from_str(&input_str)?;
    match json {
        serde_json::Value::Object(obj) => Ok(obj
            .into_iter()
            .map(|(k, v)| (k, Value::from_plain_json(v)))
            .collect()),
        _ => Err(anyhow::anyhow!("Input must be a JSON object")),
    }
}

async fn run_workflow(
    file: PathBuf,
    input: Option<String>,
    config: Option<PathBuf>,
    parallel: bool,
) -> Result<()> {
    println!("🚀 Loading workflow from: {}", file.display());

    let mut config = match config {
        Some(path) => RuntimeConfig::from_file(path)?,
        None => RuntimeConfig::default(),
    };
    if parallel {
        config.mode = ExecutionMode::Parallel;
    }

    let runtime = FlowRuntime::with_registry(Arc::new(standard_registry()), config);
    let workflow = runtime.load(&file)?;
    let inputs = parse_inputs(input)?;

    println!("📋 Workflow: {}", workflow.id().unwrap_or("<anonymous>"));
    println!("   Operations: {}", workflow.len());
    println!("   Edges: {}", workflow.graph().edge_count());
    println!();

    let mut events = runtime.subscribe_events();
    let event_task = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event.kind {
                EventKind::WorkflowStarted { total_nodes, .. } => {
                    println!("▶️  Workflow started ({} nodes)", total_nodes);
                }
                EventKind::NodeStarted {
                    node_id,
                    kind,
                    inputs,
                } => {
                    println!("  ⚡ Starting node: {} ({}) inputs: {:?}", node_id, kind, inputs);
                }
                EventKind::NodeCompleted {
                    node_id,
                    duration_ms,
                    ..
                } => {
                    println!("  ✅ Node {} completed in {}ms", node_id, duration_ms);
                }
                EventKind::NodeFailed { node_id, error } => {
                    println!("  ❌ Node {} failed: {}", node_id, error);
                }
                EventKind::Report { node_id, report } => match report {
                    NodeReport::Info { message } => {
                        println!("     ℹ️  [{}] {}", node_id, message);
                    }
                    NodeReport::Warning { message } => {
                        println!("     ⚠️  [{}] {}", node_id, message);
                    }
                    NodeReport::Progress { percent, message } => match message {
                        Some(msg) => println!("     📊 [{}] {}% - {}", node_id, percent, msg),
                        None => println!("     📊 [{}] {}%", node_id, percent),
                    },
                    NodeReport::Data { port, value } => {
                        println!("     📦 [{}] {} = {}", node_id, port, value.to_plain_json());
                    }
                },
                EventKind::WorkflowCompleted {
                    success,
                    duration_ms,
                } => {
                    if success {
                        println!("✨ Workflow completed successfully in {}ms", duration_ms);
                    } else {
                        println!("💥 Workflow failed after {}ms", duration_ms);
                    }
                }
            }
        }
    });

    let result = runtime.execute(&workflow, inputs).await;

    // Let the listener drain before printing the summary
    tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
    event_task.abort();
    let result = result?;

    println!();
    println!("📊 Execution Summary:");
    println!("   Execution ID: {}", result.execution_id);
    println!(
        "   Completed: {}/{} nodes",
        result.completed_nodes, result.total_nodes
    );

    println!();
    match &result.result {
        Returned::Nothing => println!("📤 No result"),
        Returned::Single(value) => println!("📤 Result: {}", value.to_plain_json()),
        Returned::Tuple(values) => {
            let rendered: Vec<serde_json::Value> = values.iter().map(Value::to_plain_json).collect();
            println!("📤 Result: {}", serde_json::Value::Array(rendered));
        }
    }

    Ok(())
}

fn validate_workflow(file: PathBuf) -> Result<()> {
    println!("🔍 Validating workflow: {}", file.display());

    let registry = standard_registry();
    let definition = WorkflowLoader::read_definition(&file)?;
    let workflow = WorkflowLoader::new(&registry).build(&definition)?;
    workflow.validate()?;

    println!("✅ Workflow is valid:");
    println!("   Name: {}", definition.name);
    println!("   Operations: {}", workflow.len());
    println!("   Edges: {}", workflow.graph().edge_count());

    Ok(())
}

fn list_operations() {
    println!("📦 Available Operation Kinds:");
    println!();

    let registry = standard_registry();
    for kind in registry.list_kinds() {
        if let Some(metadata) = registry.metadata(&kind) {
            println!("  • {} ({})", kind, metadata.category);
            println!("    {}", metadata.description);
        } else {
            println!("  • {}", kind);
        }
    }
}

fn create_example_workflow(output: PathBuf) -> Result<()> {
    let mut definition = WorkflowDefinition::new("Example arithmetic workflow")
        .with_metadata("author", "opflow init");
    definition.description = Some("Adds two inputs and scales the sum".to_string());

    definition.add_operation(OperationSpec::new("math.add").with_name("Add inputs"));
    definition.add_operation(
        OperationSpec::new("math.scale")
            .with_name("Scale sum")
            .with_config("port", "sum")
            .with_config("factor", 10.0),
    );

    let json = serde_json::to_string_pretty(&definition)?;
    std::fs::write(&output, json)?;

    println!("✨ Created example workflow: {}", output.display());
    println!();
    println!("Run it with:");
    println!(
        "  opflow run --file {} --input '{{\"a\": 2, \"b\": 3}}'",
        output.display()
    );

    Ok(())
}

fn draw_workflow(
    file: PathBuf,
    output: Option<PathBuf>,
    color: String,
    no_labels: bool,
) -> Result<()> {
    let registry = standard_registry();
    let workflow = WorkflowLoader::new(&registry).load_file(&file)?;

    let options = DrawOptions {
        with_labels: !no_labels,
        node_color: color,
        ..DrawOptions::default()
    };
    let dot = workflow.draw(&options);

    match output {
        Some(path) => {
            std::fs::write(&path, dot)?;
            println!("🖼️  Wrote {}", path.display());
        }
        None => print!("{}", dot),
    }
    Ok(())
}
