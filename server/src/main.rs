use clap::Parser;
use log::info;
use server::config::ServerConfig;
use server::network::Server;
use server::persistence::{FileStore, MemoryStore, PlayerStore};
use shared::MapDescriptor;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Authoritative world simulation server
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server IP address to bind to
    #[clap(short = 'H', long, default_value = "127.0.0.1")]
    host: String,
    /// Server port to listen on
    #[clap(short, long, default_value = "8080")]
    port: u16,
    /// Simulation ticks per second
    #[clap(short, long, default_value = "20")]
    tick_rate: u32,
    /// Broadcast a public snapshot every N ticks
    #[clap(long, default_value = "3")]
    snapshot_every: u64,
    /// Seconds between background saves of dirty players
    #[clap(long, default_value = "30")]
    persist_interval_secs: u64,
    /// Maximum concurrent sessions
    #[clap(long, default_value = "64")]
    max_clients: usize,
    /// Map descriptor (JSON); the built-in map is used when omitted
    #[clap(long)]
    map: Option<PathBuf>,
    /// Directory for player records; records are kept in memory when omitted
    #[clap(long)]
    data_dir: Option<PathBuf>,
    /// World RNG seed
    #[clap(long, default_value = "24301")]
    seed: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let mut config = ServerConfig::new(format!("{}:{}", args.host, args.port), args.tick_rate);
    config.snapshot_every = args.snapshot_every.max(1);
    config.persist_interval = Duration::from_secs(args.persist_interval_secs.max(1));
    config.max_clients = args.max_clients;
    config.seed = args.seed;
    if let Some(path) = &args.map {
        config.map = MapDescriptor::load(path)?;
        info!("Loaded map from {}", path.display());
    }

    let store: Arc<dyn PlayerStore> = match &args.data_dir {
        Some(dir) => {
            info!("Storing players under {}", dir.display());
            Arc::new(FileStore::new(dir)?)
        }
        None => {
            info!("No data dir given, players are kept in memory only");
            Arc::new(MemoryStore::new())
        }
    };

    info!(
        "Starting server on {} at {} Hz (snapshot every {} ticks)",
        config.bind_addr, args.tick_rate, config.snapshot_every
    );
    let mut server = Server::new(config, store).await?;
    server.run().await?;
    Ok(())
}
