use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use clusterbench_core::ClusterBenchConfig;

mod commands;

#[derive(Parser, Debug)]
#[command(name = "clusterbench")]
#[command(about = "Search cluster lifecycle and load diagnostics", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file; defaults to the layered lookup
    #[arg(long, global = true, env = "CLUSTERBENCH_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List plugin configurations available for installation
    ListPlugins {
        /// Cluster config tree to scan instead of the configured one
        #[arg(long)]
        config_path: Option<PathBuf>,
    },

    /// Classify a cluster error payload
    ClassifyError {
        /// JSON payload, e.g. '{"error": {"reason": "..."}, "status": 403}'
        #[arg(long, conflicts_with = "file")]
        payload: Option<String>,

        /// File holding the JSON payload
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Normalize a captured bulk response into a stats record
    ///
    /// The response is read with the encoding configured under `load.encoding`.
    BulkStats {
        /// Newline-delimited bulk request body that was sent
        #[arg(long)]
        request: PathBuf,

        /// Raw response body
        #[arg(long)]
        response: PathBuf,

        #[arg(long)]
        index: String,

        /// Number of documents or operations in the request
        #[arg(long)]
        bulk_size: u64,

        #[arg(long, default_value = "docs")]
        unit: String,

        /// Per-operation counters, shard histogram and request sizes
        #[arg(long)]
        detailed: bool,
    },

    /// Create or delete a benchmark cluster
    Cluster {
        #[command(subcommand)]
        action: ClusterAction,
    },
}

#[derive(Subcommand, Debug)]
enum ClusterAction {
    /// Provision, install and launch a cluster
    Create {
        #[arg(long, default_value = "benchmark")]
        name: String,

        /// Where to record the created cluster
        #[arg(long, default_value = "cluster.json")]
        state: PathBuf,
    },

    /// Stop and tear down a cluster created earlier
    Delete {
        #[arg(long, default_value = "cluster.json")]
        state: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let cli = Cli::parse();

    match cli.command {
        Commands::ListPlugins { config_path } => {
            let config = load_config(cli.config.as_deref())?;
            let root = config_path.unwrap_or(config.builder.cluster_config_path);
            commands::plugins::list(&root)
        }
        Commands::ClassifyError { payload, file } => {
            let payload = match (payload, file) {
                (Some(payload), _) => payload,
                (None, Some(file)) => std::fs::read_to_string(&file)
                    .with_context(|| format!("failed to read {}", file.display()))?,
                (None, None) => anyhow::bail!("either --payload or --file is required"),
            };
            commands::classify::classify_payload(&payload)
        }
        Commands::BulkStats {
            request,
            response,
            index,
            bulk_size,
            unit,
            detailed,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let captured = commands::bulk::CapturedBulk {
                index: &index,
                request: &request,
                response: &response,
                bulk_size,
                unit: &unit,
                detailed,
            };
            commands::bulk::stats(config.load.encoding, &captured)
        }
        Commands::Cluster { action } => {
            let config = load_config(cli.config.as_deref())?;
            match action {
                ClusterAction::Create { name, state } => {
                    commands::cluster::create(&config, &name, &state).await
                }
                ClusterAction::Delete { state } => commands::cluster::delete(&config, &state).await,
            }
        }
    }
}

fn load_config(path: Option<&std::path::Path>) -> anyhow::Result<ClusterBenchConfig> {
    let config = match path {
        Some(path) => ClusterBenchConfig::from_file(path),
        None => ClusterBenchConfig::load(),
    };
    config.context("failed to load configuration")
}

fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(env_filter).with_target(false).init();
}
