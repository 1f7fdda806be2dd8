//! Tally sync server
//!
//! Usage:
//!   tally server                          # QUIC on udp/8888, probe on tcp/8888
//!   tally server --port 9000              # both on port 9000
//!   tally server --http-port 8080         # probe on a separate port
//!   RUST_LOG=debug tally server

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tally::config::{DEFAULT_PORT, ServerConfig};
use tally::{SyncServer, health};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tally", version, about = "Shared counter and chat log over QUIC")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the sync server and its liveness probe
    Server(ServerArgs),
}

#[derive(Args)]
struct ServerArgs {
    /// Port for the QUIC endpoint
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Port for the liveness probe (defaults to --port)
    #[arg(long)]
    http_port: Option<u16>,

    /// Address to bind both listeners to
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    host: IpAddr,

    /// Close connections idle for this long
    #[arg(long, default_value_t = 300)]
    idle_timeout_secs: u64,

    /// Broadcast user:left when a client disconnects
    #[arg(long)]
    announce_departures: bool,
}

impl ServerArgs {
    fn into_config(self) -> ServerConfig {
        ServerConfig {
            bind_addr: SocketAddr::new(self.host, self.port),
            http_addr: SocketAddr::new(self.host, self.http_port.unwrap_or(self.port)),
            idle_timeout: Duration::from_secs(self.idle_timeout_secs),
            announce_departures: self.announce_departures,
            ..ServerConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Server(args) => run_server(args.into_config()).await,
    }
}

async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    info!("Configuration:");
    info!("  - QUIC address: {}", config.bind_addr);
    info!("  - Probe address: {}", config.http_addr);
    info!("  - Idle timeout: {:?}", config.idle_timeout);
    info!("  - Announce departures: {}", config.announce_departures);

    let server = SyncServer::bind(config.clone())?;

    tokio::select! {
        result = server.run() => result?,
        result = health::serve(config.http_addr) => result?,
        _ = tokio::signal::ctrl_c() => info!("Received Ctrl-C, shutting down"),
    }

    let stats = server.get_stats().await?;
    info!(
        "Final state: counter={} messages={} sessions={}",
        stats.counter, stats.history_len, stats.sessions
    );

    server.shutdown();
    Ok(())
}
