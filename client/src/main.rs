use clap::Parser;
use client::network::Client;
use log::info;
use shared::{UserId, INTERPOLATION_DELAY_MS, MAX_USER_ID_LEN};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:8080")]
    server: String,

    /// User name to play as
    #[arg(short = 'u', long, value_parser = parse_user)]
    user: String,

    /// Simulate network latency in milliseconds
    #[arg(short = 'l', long, default_value = "0")]
    fake_ping: u64,

    /// Frames sampled per second
    #[arg(short = 'f', long, default_value = "60", value_parser = clap::value_parser!(u32).range(1..=240))]
    frame_rate: u32,

    /// Interpolation delay in milliseconds
    #[arg(short = 'd', long, default_value_t = INTERPOLATION_DELAY_MS)]
    delay: u64,
}

fn parse_user(value: &str) -> Result<String, String> {
    let value = value.trim();
    if value.is_empty() || value.len() > MAX_USER_ID_LEN {
        return Err(format!("user name must be 1 to {} bytes", MAX_USER_ID_LEN));
    }
    Ok(value.to_string())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    info!("Starting client...");
    info!("Connecting to: {}", args.server);
    if args.fake_ping > 0 {
        info!("Simulating {}ms latency", args.fake_ping);
    }

    let mut client = Client::new(
        &args.server,
        UserId(args.user),
        args.delay,
        args.fake_ping,
        Duration::from_secs_f64(1.0 / args.frame_rate as f64),
    )
    .await?;

    client.run().await?;

    Ok(())
}
