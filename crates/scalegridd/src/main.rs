//! scalegridd — the Scalegrid daemon.
//!
//! Opens the state store, picks a group backend and serves the Auto Scaling
//! query API until interrupted.
//!
//! # Usage
//!
//! ```text
//! scalegridd serve --config /etc/scalegrid/scalegrid.toml
//! scalegridd serve --data-dir /var/lib/scalegrid --mode memory --listen 127.0.0.1:8445
//! scalegridd config --config /etc/scalegrid/scalegrid.toml
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use scalegrid_backend::{ElasticBackend, EntityTemplate, GroupBackend, LocalBackend, MemoryOrchestrator};
use scalegrid_core::{OrchestratorMode, ScalegridConfig};
use scalegrid_state::StateStore;

const DEFAULT_FILTER: &str = "info,scalegridd=debug,scalegrid=debug";

#[derive(Parser)]
#[command(name = "scalegridd", about = "Scalegrid daemon")]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the query API.
    Serve {
        #[command(flatten)]
        overrides: Overrides,
    },
    /// Print the effective configuration as TOML.
    Config {
        #[command(flatten)]
        overrides: Overrides,
    },
}

#[derive(clap::Args)]
struct Overrides {
    /// Path to scalegrid.toml.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to listen on.
    #[arg(long)]
    listen: Option<SocketAddr>,

    /// Directory holding the state database.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Group backend: local or memory.
    #[arg(long)]
    mode: Option<OrchestratorMode>,
}

impl Overrides {
    fn resolve(self) -> anyhow::Result<ScalegridConfig> {
        let mut config = match &self.config {
            Some(path) => ScalegridConfig::from_file(path)?,
            None => ScalegridConfig::default(),
        };
        if let Some(listen) = self.listen {
            config.api.listen = listen;
        }
        if let Some(dir) = self.data_dir {
            config.store.path = dir.join("scalegrid.redb");
        }
        if let Some(mode) = self.mode {
            config.orchestrator.mode = mode;
        }
        Ok(config)
    }
}

fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match cli.command {
        Command::Serve { overrides } => serve(overrides.resolve()?).await,
        Command::Config { overrides } => {
            print!("{}", overrides.resolve()?.to_toml_string()?);
            Ok(())
        }
    }
}

fn build_backend(config: &ScalegridConfig) -> anyhow::Result<Arc<dyn GroupBackend>> {
    if let Some(parent) = config.store.path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let store = StateStore::open(&config.store.path)?;
    info!(path = ?config.store.path, "state store opened");
    let local = LocalBackend::new(store);

    let backend: Arc<dyn GroupBackend> = match config.orchestrator.mode {
        OrchestratorMode::Local => {
            info!("running with the local backend");
            Arc::new(local)
        }
        OrchestratorMode::Memory => {
            let template = EntityTemplate::from(&config.orchestrator);
            info!(
                site = %template.site,
                max_instances = config.orchestrator.max_instances,
                "running with the in-process orchestrator"
            );
            Arc::new(ElasticBackend::new(
                local,
                Arc::new(MemoryOrchestrator::with_max_instances(
                    config.orchestrator.max_instances,
                )),
                template,
            ))
        }
    };
    Ok(backend)
}

async fn serve(config: ScalegridConfig) -> anyhow::Result<()> {
    info!("Scalegrid daemon starting");

    let backend = build_backend(&config)?;
    let router = scalegrid_api::build_router(backend);
    let addr = config.api.listen;

    info!(%addr, "query API starting");
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "could not listen for ctrl-c, shutting down");
            }
            info!("shutdown signal received");
        })
        .await?;

    info!("Scalegrid daemon stopped");
    Ok(())
}
