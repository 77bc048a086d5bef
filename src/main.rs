//! Swift Storage Driver
//!
//! Runs a single lifecycle callback by hand, either against the cluster in
//! the ambient kubeconfig or against an in-memory API (`--dry-run`).
//!
//! ```text
//! swift-storage-driver add-cluster -f cluster.yaml
//! swift-storage-driver --dry-run delete-node -f node.yaml
//! swift-storage-driver make-deployment -f node.yaml > deployment.yaml
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use k8s_openapi::api::apps::v1::Deployment;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use swift_storage_driver::{
    ClusterApiRef, DriverConfig, InMemoryClusterApi, KubeClusterApi, StorageCluster,
    StorageDriver, StorageNode, SwiftDriver,
};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Swift Storage Driver - deploys OpenStack Swift clusters on Kubernetes
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Driver configuration file (YAML)
    #[arg(long, env = "SWIFT_DRIVER_CONFIG")]
    config: Option<PathBuf>,

    /// Override the readiness timeout in seconds
    #[arg(long, env = "READINESS_TIMEOUT_SECS")]
    readiness_timeout_secs: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,

    /// Use an in-memory cluster API instead of Kubernetes
    #[arg(long, env = "DRY_RUN")]
    dry_run: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the storage type served by this driver
    Type,

    /// Bring up the cluster-wide Swift services
    AddCluster {
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Notify the driver of a changed StorageCluster
    UpdateCluster {
        #[arg(long)]
        old: PathBuf,
        #[arg(long)]
        new: PathBuf,
    },

    /// Tear down the cluster-wide Swift services
    DeleteCluster {
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Create the Service of a storage node
    AddNode {
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Notify the driver of a changed StorageNode
    UpdateNode {
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Delete the Service of a storage node
    DeleteNode {
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Print the Deployment for a storage node as YAML
    MakeDeployment {
        #[arg(short, long)]
        file: PathBuf,

        /// Currently running Deployment, whose annotations are carried over
        #[arg(long)]
        previous: Option<PathBuf>,
    },
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_logging(&args)?;

    let mut config = match &args.config {
        Some(path) => DriverConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => DriverConfig::default(),
    };
    if let Some(secs) = args.readiness_timeout_secs {
        config = config.with_readiness_timeout(Duration::from_secs(secs));
    }

    info!("Starting Swift Storage Driver");
    info!("  Version: {}", swift_storage_driver::VERSION);
    info!("  Readiness timeout: {:?}", config.readiness_timeout());
    info!("  Dry run: {}", args.dry_run);

    let memory = args.dry_run.then(|| Arc::new(InMemoryClusterApi::new()));
    let api: ClusterApiRef = match &memory {
        Some(memory) => memory.clone(),
        None => Arc::new(KubeClusterApi::try_default().await?),
    };

    // Ctrl-C aborts readiness waits instead of killing mid-request
    let shutdown = CancellationToken::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling pending waits");
            trigger.cancel();
        }
    });

    let driver = SwiftDriver::new(config, api)?.with_shutdown(shutdown);
    driver.init().await?;

    let outcome = run(&driver, args.command).await;

    if let Some(memory) = &memory {
        for call in memory.journal() {
            info!(
                "{:?} {} ({})",
                call.verb,
                call.key,
                if call.succeeded { "ok" } else { "failed" }
            );
        }
    }
    debug!("Driver metrics:\n{}", driver.metrics().render()?);

    if let Err(e) = &outcome {
        if let Some(err) = e.downcast_ref::<swift_storage_driver::Error>() {
            error!("Callback failed: {} (suggested action: {:?})", err, err.action());
        }
    }
    outcome
}

async fn run(driver: &SwiftDriver, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Type => {
            println!("{}", driver.storage_type());
        }
        Command::AddCluster { file } => {
            let cluster: StorageCluster = load(&file)?;
            driver.add_cluster(&cluster).await?;
        }
        Command::UpdateCluster { old, new } => {
            let old: StorageCluster = load(&old)?;
            let new: StorageCluster = load(&new)?;
            driver.update_cluster(&old, &new).await?;
        }
        Command::DeleteCluster { file } => {
            let cluster: StorageCluster = load(&file)?;
            driver.delete_cluster(&cluster).await?;
        }
        Command::AddNode { file } => {
            let node: StorageNode = load(&file)?;
            driver.add_node(&node).await?;
        }
        Command::UpdateNode { file } => {
            let node: StorageNode = load(&file)?;
            driver.update_node(&node).await?;
        }
        Command::DeleteNode { file } => {
            let node: StorageNode = load(&file)?;
            driver.delete_node(&node).await?;
        }
        Command::MakeDeployment { file, previous } => {
            let node: StorageNode = load(&file)?;
            let previous = previous
                .as_deref()
                .map(load::<Deployment>)
                .transpose()?;
            let deployment = driver.make_deployment(&node, previous.as_ref())?;
            print!("{}", serde_yaml::to_string(&deployment)?);
        }
    }
    Ok(())
}

/// Read a Kubernetes object from a YAML (or JSON) manifest
fn load<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_yaml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) -> anyhow::Result<()> {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(level.into())
        .add_directive("hyper=warn".parse()?)
        .add_directive("kube=info".parse()?)
        .add_directive("tower=warn".parse()?);

    // stdout is reserved for command output
    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
    Ok(())
}
