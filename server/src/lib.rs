//! # Round Server Library
//!
//! Authoritative server for a small social-deduction game. Players join a
//! room, walk around the map, and one secretly chosen imposter tries to
//! eliminate the crew. The server owns the only mutable copy of the round and
//! pushes snapshots of it to every connected client.
//!
//! ## Module Organization
//!
//! ### Round (`round`)
//! The simulation state: players in join order, bodies, and the round status.
//!
//! ### Rules (`rules`)
//! Validates and applies the closed set of player commands (`Join`, `MoveTo`,
//! `Attack`) and drives the round lifecycle:
//!
//! ```text
//! Waiting --capacity reached--> Ongoing --no crew alive--> ImposterWon
//! ```
//!
//! Rejected commands return a `CommandError` and leave the round untouched.
//!
//! ### Tick (`tick`)
//! Moves players towards their targets once per time slice, snapping on
//! arrival so nobody overshoots.
//!
//! ### Client Manager (`client_manager`)
//! Maps datagram source addresses to user identities and drops silent
//! connections. Connections are transport state; players outlive them.
//!
//! ### Network (`network`)
//! UDP transport and the event loop. Packets and ticks are handled one at a
//! time from a single `tokio::select!` loop, which makes the server the sole
//! writer of the round.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig {
//!         bind_addr: "127.0.0.1:8080".to_string(),
//!         seed: Some(7),
//!         ..ServerConfig::default()
//!     };
//!
//!     let mut server = Server::new(config).await?;
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod client_manager;
pub mod config;
pub mod network;
pub mod round;
pub mod rules;
pub mod tick;
