//! fleetsink Server
//!
//! Multi-tenant telemetry collection and device-command backend.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{info, warn};

use fleetsink_core::db::unix_timestamp;
use fleetsink_core::tracing_init::init_tracing;
use fleetsink_server::auth::TokenSigner;
use fleetsink_server::blobstore::BlobStore;
use fleetsink_server::broker::SessionBroker;
use fleetsink_server::devices::DeviceDirectory;
use fleetsink_server::server::{AppState, router};
use fleetsink_server::storage::FleetDatabase;

/// Commands pending longer than this are surfaced as a warning by the
/// background sweep.
const STALE_COMMAND_AGE_SECS: i64 = 86_400;

#[derive(Parser, Debug)]
#[command(name = "fleetsink-server")]
#[command(
    version,
    about = "fleetsink server - telemetry ingestion, command queue, live push"
)]
struct Args {
    /// Address to listen on.
    #[arg(long, default_value = "0.0.0.0:8080")]
    addr: SocketAddr,

    /// Data directory for the SQLite database and blob tree.
    #[arg(long, env = "FLEETSINK_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// JWT secret key.
    #[arg(
        long,
        env = "FLEETSINK_JWT_SECRET",
        default_value = "dev-secret-change-me"
    )]
    jwt_secret: String,

    /// Access token TTL in seconds.
    #[arg(long, default_value_t = 3600)]
    access_ttl: i64,

    /// Refresh token TTL in seconds.
    #[arg(long, default_value_t = 604_800)]
    refresh_ttl: i64,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_tracing("fleetsink_server=info", args.log_json);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %args.addr,
        "Starting fleetsink-server"
    );

    let data_dir = match args.data_dir {
        Some(dir) => dir,
        None => default_data_dir()?,
    };
    info!(path = %data_dir.display(), "Using data directory");

    let db = FleetDatabase::open(&data_dir.join("fleetsink.db")).await?;
    let blobs = Arc::new(
        BlobStore::open(db.clone(), &data_dir)
            .map_err(|e| anyhow::anyhow!("blob store init failed: {e}"))?,
    );
    let signer = Arc::new(TokenSigner::new(
        args.jwt_secret.as_bytes(),
        args.access_ttl,
        args.refresh_ttl,
    ));
    let directory = DeviceDirectory::new(db.clone());
    let broker = SessionBroker::new();

    let state = AppState {
        db: db.clone(),
        directory,
        blobs,
        broker,
        signer,
    };

    // Hourly sweep: commands pending for a day or more are a correctness
    // signal for the owner, never auto-resolved.
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(3600));
        interval.tick().await; // Skip first immediate tick
        loop {
            interval.tick().await;
            let cutoff = unix_timestamp() - STALE_COMMAND_AGE_SECS;
            match db.count_stale_pending_commands(cutoff).await {
                Ok(stale) if stale > 0 => {
                    warn!(stale, "Commands pending for more than a day");
                }
                Err(e) => {
                    warn!(error = %e, "Stale command sweep failed");
                }
                _ => {}
            }
        }
    });

    let app = router(state);
    let listener = tokio::net::TcpListener::bind(args.addr).await?;
    info!(addr = %args.addr, "fleetsink server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Received shutdown signal");
        })
        .await?;

    info!("fleetsink server stopped");
    Ok(())
}

fn default_data_dir() -> anyhow::Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(home.join(".fleetsink"))
}
