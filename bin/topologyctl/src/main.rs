//! topologyctl
//!
//! Describe, plan and apply the cross-cloud VPN topology.
//!
//! # Usage
//! ```bash
//! # Check the configuration and the resource graph
//! topologyctl --base-name demo validate
//!
//! # Print the graph level by level, or as Graphviz
//! topologyctl --config topology.yaml graph --format dot
//!
//! # Diff against a saved state snapshot
//! topologyctl --config topology.yaml plan --state state.json
//!
//! # Apply against the simulated provider
//! topologyctl --config topology.yaml up --state-out state.json
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use topology_core::{describe, Plan, StateSnapshot, StateStore, Topology, TopologyConfig};
use topology_engine::{Provider, Reconciler, SimulatedProvider};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "topologyctl")]
#[command(about = "Cross-cloud VPN topology descriptor", long_about = None)]
#[command(version)]
struct Cli {
    /// Topology configuration file (YAML)
    #[arg(long, short, env = "TOPOLOGY_CONFIG")]
    config: Option<PathBuf>,

    /// Base name, overriding the config file and environment
    #[arg(long)]
    base_name: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the configuration and build the resource graph
    Validate,

    /// Print the resource graph
    Graph {
        #[arg(long, value_enum, default_value_t = GraphFormat::Text)]
        format: GraphFormat,
    },

    /// Show the changes an apply would make
    Plan {
        /// State snapshot (JSON) to diff against; empty state if omitted
        #[arg(long)]
        state: Option<PathBuf>,
    },

    /// Apply the topology against the simulated provider
    Up {
        /// Write the resulting state snapshot (JSON) here
        #[arg(long)]
        state_out: Option<PathBuf>,

        /// Print Prometheus metrics after the apply
        #[arg(long)]
        metrics: bool,
    },

    /// Print the JSON schema of the configuration file
    Schema,
}

#[derive(Clone, Copy, ValueEnum)]
enum GraphFormat {
    Text,
    Dot,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_topology(cli: &Cli) -> Result<Topology> {
    let mut config = TopologyConfig::load(cli.config.as_deref())?;
    if let Some(base_name) = &cli.base_name {
        config.base_name = Some(base_name.clone());
    }
    let validated = config.validate().context("invalid configuration")?;
    Ok(describe(&validated)?)
}

fn read_snapshot(path: &Path) -> Result<StateSnapshot> {
    StateSnapshot::from_file(path)
        .with_context(|| format!("failed to load state from {}", path.display()))
}

fn print_plan(plan: &Plan) {
    for change in plan.changes() {
        println!("{}", change);
    }
    println!();
    println!("Plan: {}", plan.summary());
}

fn print_graph(topology: &Topology, format: GraphFormat) {
    match format {
        GraphFormat::Text => {
            for (depth, level) in topology.graph.levels().iter().enumerate() {
                println!("level {}:", depth);
                for key in level {
                    if let Some(node) = topology.graph.get(key) {
                        println!("  {} ({})", key, node.spec.kind());
                    }
                }
            }
        }
        GraphFormat::Dot => {
            println!("digraph topology {{");
            for node in topology.graph.iter() {
                for upstream in node.upstreams() {
                    let style = if node.depends_on.contains(&upstream) {
                        " [style=dashed]"
                    } else {
                        ""
                    };
                    println!("  \"{}\" -> \"{}\"{};", upstream, node.key, style);
                }
            }
            println!("}}");
        }
    }
}

async fn up(topology: &Topology, state_out: Option<&Path>, metrics: bool) -> Result<()> {
    let provider: Arc<dyn Provider> = Arc::new(SimulatedProvider::new());
    let reconciler = Reconciler::new(provider, Arc::new(StateStore::new()))?;

    let report = reconciler.apply(topology).await?;
    print_plan(&report.plan);

    let replan = reconciler.plan(topology).await?;
    if replan.has_changes() {
        bail!("topology did not converge: {}", replan.summary());
    }
    info!("Second plan is empty, topology converged");

    println!("{}", serde_json::to_string_pretty(&report.exports)?);

    if let Some(path) = state_out {
        let snapshot = reconciler.state().snapshot().await;
        snapshot
            .write_to(path)
            .with_context(|| format!("failed to write state to {}", path.display()))?;
        info!("Wrote state snapshot to {}", path.display());
    }

    if metrics {
        print!("{}", reconciler.metrics().gather()?);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match &cli.command {
        Commands::Validate => {
            let topology = load_topology(&cli)?;
            println!(
                "Configuration is valid: {} resources, {} edges, {} levels",
                topology.graph.len(),
                topology.graph.edge_count(),
                topology.graph.levels().len()
            );
        }
        Commands::Graph { format } => {
            let topology = load_topology(&cli)?;
            print_graph(&topology, *format);
        }
        Commands::Plan { state } => {
            let topology = load_topology(&cli)?;
            let snapshot = match state {
                Some(path) => read_snapshot(path)?,
                None => StateSnapshot::default(),
            };
            let plan = Plan::build(&topology.graph, &snapshot)?;
            if plan.replaces_everything() {
                warn!("Every applied resource would be replaced; was the base name changed?");
            }
            print_plan(&plan);
        }
        Commands::Up { state_out, metrics } => {
            let topology = load_topology(&cli)?;
            up(&topology, state_out.as_deref(), *metrics).await?;
        }
        Commands::Schema => {
            println!("{}", serde_json::to_string_pretty(&TopologyConfig::schema())?);
        }
    }

    Ok(())
}
