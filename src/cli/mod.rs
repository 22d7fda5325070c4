//! CLI subcommands — init, validate, synth, outputs, refs.
//!
//! This is the compiler's own surface: it emits and inspects plans. Driving
//! the provider (create/update/delete of live resources) belongs to the
//! external deployment engine, which consumes `synth --json` and hands
//! realized outputs back through `outputs`.

use crate::core::resolver::{FileStore, ReferenceRegistry, ReferenceStore};
use crate::core::types::RealizedOutputs;
use crate::core::{parser, synth};
use crate::trace::eventlog::{self, SynthEvent};
use clap::Subcommand;
use std::path::{Path, PathBuf};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new tramar project
    Init {
        /// Directory to initialize (default: current)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Validate a region spec without synthesizing
    Validate {
        /// Path to the region spec
        #[arg(short, long, default_value = "region.yaml")]
        file: PathBuf,
    },

    /// Synthesize a region graph and print the ordered plan
    Synth {
        /// Path to the region spec
        #[arg(short, long, default_value = "region.yaml")]
        file: PathBuf,

        /// State directory (durable references, event logs)
        #[arg(long, default_value = "state")]
        state_dir: PathBuf,

        /// Emit the plan as JSON for the deployment engine
        #[arg(long)]
        json: bool,
    },

    /// Record realized outputs from the deployment engine and publish
    /// cross-region references
    Outputs {
        /// Path to the region spec
        #[arg(short, long, default_value = "region.yaml")]
        file: PathBuf,

        /// Path to the engine's realized-outputs JSON
        #[arg(short, long)]
        outputs: PathBuf,

        /// State directory
        #[arg(long, default_value = "state")]
        state_dir: PathBuf,
    },

    /// List stored cross-region references, or resolve one by name
    Refs {
        /// State directory
        #[arg(long, default_value = "state")]
        state_dir: PathBuf,

        /// Reference name to resolve
        name: Option<String>,
    },
}

/// Dispatch a CLI command.
pub fn dispatch(cmd: Commands) -> Result<(), String> {
    match cmd {
        Commands::Init { path } => cmd_init(&path),
        Commands::Validate { file } => cmd_validate(&file),
        Commands::Synth {
            file,
            state_dir,
            json,
        } => cmd_synth(&file, &state_dir, json),
        Commands::Outputs {
            file,
            outputs,
            state_dir,
        } => cmd_outputs(&file, &outputs, &state_dir),
        Commands::Refs { state_dir, name } => cmd_refs(&state_dir, name.as_deref()),
    }
}

fn cmd_init(path: &Path) -> Result<(), String> {
    let spec_path = path.join("region.yaml");
    if spec_path.exists() {
        return Err(format!("{} already exists", spec_path.display()));
    }

    let state_dir = path.join("state");
    std::fs::create_dir_all(&state_dir).map_err(|e| format!("cannot create state dir: {}", e))?;

    let template = r#"version: "1.0"
name: my-service
region: eu-west-1

params: {}

resources:
  data-table:
    type: table
    partition_key: id

  ingest-fn:
    type: function
    handler: main.handler
    runtime: python3.9
    timeout: 30
    env:
      DATA_TABLE: "{{node:data-table}}"
    access:
      - target: data-table
        mode: write

schedules:
  - target: ingest-fn
    cadence: 1d

publishes: []
"#;
    std::fs::write(&spec_path, template)
        .map_err(|e| format!("cannot write {}: {}", spec_path.display(), e))?;

    println!("initialized {}", spec_path.display());
    println!("state directory: {}", state_dir.display());
    Ok(())
}

fn cmd_validate(file: &Path) -> Result<(), String> {
    let spec = parser::parse_spec_file(file).map_err(|e| e.to_string())?;
    let errors = parser::validate_spec(&spec);
    if errors.is_empty() {
        println!(
            "OK: {} ({} resources, region {})",
            spec.name,
            spec.resources.len(),
            spec.region
        );
        return Ok(());
    }
    for error in &errors {
        eprintln!("  {}", error);
    }
    Err(format!("{} validation error(s)", errors.len()))
}

fn cmd_synth(file: &Path, state_dir: &Path, json: bool) -> Result<(), String> {
    let spec = parser::parse_spec_file(file).map_err(|e| e.to_string())?;
    let mut registry = ReferenceRegistry::new(FileStore::new(state_dir));

    eventlog::append_event(
        state_dir,
        &spec.region,
        SynthEvent::SynthStarted {
            region: spec.region.clone(),
            spec_name: spec.name.clone(),
            tramar_version: env!("CARGO_PKG_VERSION").to_string(),
        },
    )
    .map_err(|e| e.to_string())?;

    let graph = synth::synthesize(&spec, &mut registry).map_err(|e| e.to_string())?;
    let fingerprint = graph.fingerprint();
    let order: Vec<String> = graph
        .topological_order()
        .map_err(|e| e.to_string())?
        .iter()
        .map(|n| n.logical_id.clone())
        .collect();

    eventlog::append_event(
        state_dir,
        &spec.region,
        SynthEvent::GraphSynthesized {
            region: spec.region.clone(),
            nodes: graph.node_count(),
            edges: graph.edge_count(),
            fingerprint: fingerprint.clone(),
        },
    )
    .map_err(|e| e.to_string())?;

    if json {
        let doc = serde_json::json!({
            "region": &graph.region,
            "fingerprint": fingerprint,
            "order": order,
            "nodes": &graph.nodes,
            "edges": &graph.edges,
        });
        let rendered =
            serde_json::to_string_pretty(&doc).map_err(|e| format!("JSON error: {}", e))?;
        println!("{}", rendered);
        return Ok(());
    }

    println!(
        "plan for region {} ({} nodes, {} edges)",
        graph.region,
        graph.node_count(),
        graph.edge_count()
    );
    for (i, id) in order.iter().enumerate() {
        if let Some(node) = graph.node(id) {
            println!("  {:>3}. [{}] {}", i + 1, node.kind, id);
        }
    }
    println!("fingerprint: {}", fingerprint);
    Ok(())
}

fn cmd_outputs(file: &Path, outputs_path: &Path, state_dir: &Path) -> Result<(), String> {
    let spec = parser::parse_spec_file(file).map_err(|e| e.to_string())?;
    let mut registry = ReferenceRegistry::new(FileStore::new(state_dir));
    for publish in &spec.publishes {
        registry
            .publish(
                &publish.name,
                &spec.region,
                &publish.node,
                &publish.output,
                publish.transform,
            )
            .map_err(|e| e.to_string())?;
    }

    let content = std::fs::read_to_string(outputs_path)
        .map_err(|e| format!("cannot read {}: {}", outputs_path.display(), e))?;
    let outputs: RealizedOutputs =
        serde_json::from_str(&content).map_err(|e| format!("invalid outputs JSON: {}", e))?;

    let materialized = registry
        .record_outputs(&spec.region, &outputs)
        .map_err(|e| e.to_string())?;

    eventlog::append_event(
        state_dir,
        &spec.region,
        SynthEvent::OutputsRecorded {
            region: spec.region.clone(),
            nodes: outputs.len(),
        },
    )
    .map_err(|e| e.to_string())?;

    for (name, value) in &materialized {
        eventlog::append_event(
            state_dir,
            &spec.region,
            SynthEvent::ReferencePublished {
                region: spec.region.clone(),
                name: name.clone(),
                value: value.clone(),
            },
        )
        .map_err(|e| e.to_string())?;
        println!("published {} = {}", name, value);
    }
    println!(
        "recorded outputs for {} node(s) in {}",
        outputs.len(),
        spec.region
    );
    Ok(())
}

fn cmd_refs(state_dir: &Path, name: Option<&str>) -> Result<(), String> {
    let store = FileStore::new(state_dir);
    match name {
        Some(name) => match store.get(name).map_err(|e| e.to_string())? {
            Some(value) => {
                println!("{}", value);
                Ok(())
            }
            None => Err(format!("unresolved reference '{}'", name)),
        },
        None => {
            for (name, value) in store.list().map_err(|e| e.to_string())? {
                println!("{} = {}", name, value);
            }
            Ok(())
        }
    }
}
