mod commands;

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use ora2pg_assist_core::{ClientId, ObjectType, RuntimeConfig};
use ora2pg_assist_http::AppState;
use ora2pg_assist_service::{
    Collaborators, LlmCorrectorFactory, Ora2PgExporter, PgTargetConnector,
};
use ora2pg_assist_storage::StorageBackend;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ora2pg-assist", version)]
#[command(about = "Oracle to PostgreSQL migration assistant", long_about = None)]
struct Cli {
    /// Application database. Without it state lives in memory for this process only.
    #[arg(long, env = "DATABASE_URL", global = true, hide_env_values = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        #[arg(short, long, env = "ORA2PG_ASSIST_PORT", default_value = "8000")]
        port: u16,
        #[arg(short = 'H', long, env = "ORA2PG_ASSIST_HOST", default_value = "127.0.0.1")]
        host: String,
    },
    /// Run one migration session for a client and print the final session
    Migrate {
        client_id: ClientId,
        /// Drop everything in the target schema first
        #[arg(long)]
        clean_slate: bool,
        /// Do not synthesize missing dependencies during validation
        #[arg(long)]
        no_auto_create: bool,
        #[arg(long)]
        name: Option<String>,
        /// Object types to migrate, comma separated (e.g. table,index,view)
        #[arg(long = "types", value_delimiter = ',')]
        types: Vec<ObjectType>,
    },
    /// Show a client's DDL correction cache
    CacheStats { client_id: ClientId },
    /// Delete every cached correction of a client
    CacheClear {
        client_id: ClientId,
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
}

/// Builds the service graph with the production collaborators.
pub(crate) async fn build_state(database_url: Option<&str>) -> Result<Arc<AppState>> {
    let runtime = RuntimeConfig::from_env();
    let storage = StorageBackend::connect(database_url).await?;
    tracing::info!(backend = storage.kind(), export_dir = %runtime.export_dir.display(), "storage ready");
    let collaborators = Collaborators {
        exporter: Arc::new(Ora2PgExporter::new(runtime.ora2pg_bin.clone())),
        correctors: Arc::new(LlmCorrectorFactory::new(runtime.ai_timeout)),
        target: Arc::new(PgTargetConnector),
    };
    Ok(Arc::new(AppState::new(Arc::new(storage), collaborators, runtime)))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let database_url = cli.database_url.as_deref();

    match cli.command {
        Commands::Serve { port, host } => commands::serve::run(database_url, &host, port).await?,
        Commands::Migrate { client_id, clean_slate, no_auto_create, name, types } => {
            let options = commands::migrate::options(clean_slate, no_auto_create, name, types);
            commands::migrate::run(database_url, client_id, options).await?;
        },
        Commands::CacheStats { client_id } => commands::cache::stats(database_url, client_id).await?,
        Commands::CacheClear { client_id, yes } => {
            commands::cache::clear(database_url, client_id, yes).await?;
        },
    }

    Ok(())
}
