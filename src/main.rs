use std::fs;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use gamedock::bootstrap::{ensure_seed_data, provision_bucket};
use gamedock::config::ServerConfig;
use gamedock::server::{AppState, create_router};
use gamedock::store::{SqliteStore, Store};

#[derive(Parser)]
#[command(name = "gamedock")]
#[command(about = "A self-hosted browser game portal", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(long, short, default_value = "8080")]
        port: u16,

        /// Data directory for the database and the object bucket
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Bucket directory name inside the data directory
        #[arg(long, default_value = "scratch-games")]
        bucket: String,

        /// Public base URL for external access (e.g., "https://games.example.com").
        /// Used when building play and thumbnail URLs. If not set, URLs are
        /// host-relative.
        #[arg(long)]
        public_base_url: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("gamedock=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            host,
            port,
            data_dir,
            bucket,
            public_base_url,
        } => {
            let config = ServerConfig {
                host,
                port,
                data_dir: data_dir.into(),
                bucket,
                public_base_url,
            };

            fs::create_dir_all(&config.data_dir)?;

            let store = SqliteStore::new(config.db_path())?;
            store.initialize()?;
            ensure_seed_data(&store)?;

            let blobs = config.blob_storage();
            provision_bucket(&blobs).await;

            let state = Arc::new(AppState {
                store: Arc::new(store),
                blobs,
                public_base_url: config.public_base_url.clone(),
            });

            let app = create_router(state);
            let addr = config.socket_addr()?;

            info!("Starting server on {}", addr);

            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}
