//! CLI entry point for the threat graph reporter.
//!
//! Writes JSON to stdout for the dashboard API layer; logs go to stderr.

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{fmt, EnvFilter};

use threatgraph_core::config::{load_layered, section_or_default, ENV_PREFIX};
use threatgraph_core::CloudProvider;
use threatgraph_graph::{GraphClient, GraphConfig};
use threatgraph_reporter::{ReporterConfig, ThreatGraphReporter};

#[derive(Parser)]
#[command(name = "threatgraph-reporter")]
#[command(about = "Attack path reconstruction for the threat graph")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Config file prefix (default: threatgraph).
    #[arg(short, long, default_value = "threatgraph", global = true)]
    config: String,
}

#[derive(Subcommand)]
enum Command {
    /// Compute the threat graph for every provider.
    Compute,
    /// Compute the threat graph for one provider.
    Provider {
        /// aws, azure, gcp or others.
        #[arg(long)]
        name: CloudProvider,
    },
    /// Print node, edge and root counts per provider.
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let cli = Cli::parse();

    let cfg = load_layered(&cli.config, ENV_PREFIX)?;
    let graph_config: GraphConfig = section_or_default(&cfg, "neo4j")?;
    let reporter_config: ReporterConfig = section_or_default(&cfg, "reporter")?;
    let pretty = reporter_config.pretty;

    let client = GraphClient::connect(&graph_config).await?;
    let reporter = ThreatGraphReporter::new(client).with_config(reporter_config);

    match cli.command {
        Command::Compute => {
            let graph = reporter.threat_graph().await?;
            emit(&graph, pretty)?;
        }
        Command::Provider { name } => {
            let graph = reporter.provider_threat_graph(name).await?;
            emit(&graph, pretty)?;
        }
        Command::Stats => {
            let stats = reporter.stats().await?;
            emit(&stats, pretty)?;
        }
    }

    Ok(())
}

fn emit<T: Serialize>(value: &T, pretty: bool) -> anyhow::Result<()> {
    let out = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{out}");
    Ok(())
}
