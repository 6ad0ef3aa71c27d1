use clap::Parser;
use log::info;
use server::config::ServerConfig;
use server::network::Server;
use server::rules::{RuleSet, MIN_CAPACITY};
use shared::{KILL_RADIUS, ROUND_CAPACITY};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Tick rate (updates per second)
    #[arg(short, long, default_value = "20", value_parser = clap::value_parser!(u32).range(1..=240))]
    tick_rate: u32,

    /// Maximum number of simultaneous connections
    #[arg(short, long, default_value = "16")]
    max_clients: usize,

    /// Players needed to start the round
    #[arg(short, long, default_value_t = ROUND_CAPACITY, value_parser = parse_capacity)]
    capacity: usize,

    /// Attack reach in world units
    #[arg(short, long, default_value_t = KILL_RADIUS)]
    kill_radius: f32,

    /// Seed for team assignment (random when omitted)
    #[arg(short, long)]
    seed: Option<u64>,
}

fn parse_capacity(value: &str) -> Result<usize, String> {
    let capacity: usize = value.parse().map_err(|e| format!("{}", e))?;
    if capacity < MIN_CAPACITY {
        return Err(format!("a round needs at least {} players", MIN_CAPACITY));
    }
    Ok(capacity)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let config = ServerConfig {
        bind_addr: format!("{}:{}", args.host, args.port),
        tick_duration: Duration::from_secs_f64(1.0 / args.tick_rate as f64),
        max_clients: args.max_clients,
        rules: RuleSet {
            capacity: args.capacity,
            kill_radius: args.kill_radius,
            ..RuleSet::default()
        },
        seed: args.seed,
        ..ServerConfig::default()
    };

    info!(
        "Starting server: {} Hz, round capacity {}, kill radius {}",
        args.tick_rate, config.rules.capacity, config.rules.kill_radius
    );

    let mut server = Server::new(config).await?;

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
