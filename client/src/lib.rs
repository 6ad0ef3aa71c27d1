//! # Game Client Library
//!
//! Headless client for the round server. The server is authoritative: the
//! client never predicts or corrects state, it only presents what the server
//! sends and forwards the user's commands.
//!
//! ## Interpolation
//!
//! Round snapshots arrive at whatever rate the network delivers them. The
//! [`snapshot_buffer::SnapshotBuffer`] keeps a short history of them, stamped
//! with their receipt time, and renders a fixed delay (100 ms by default) in
//! the past. That way there is nearly always a snapshot on each side of the
//! render time, and player positions are blended linearly between the two.
//! Players are matched by id, newcomers pop in at their latest position, and
//! players missing from the latest snapshot disappear.
//!
//! ## Module Organization
//!
//! ### Snapshot Buffer (`snapshot_buffer`)
//! Bounded snapshot history and per-player linear interpolation.
//!
//! ### Game Module (`game`)
//! Client view of the round: status change announcements, automatic joining
//! of an open round, and a text rendering of the interpolated state.
//!
//! ### Input Module (`input`)
//! Parses stdin lines (`join`, `move <x> <y>`, `attack`, `status`, `quit`)
//! and numbers outgoing commands.
//!
//! ### Network Module (`network`)
//! UDP connection to the server and the single-threaded event loop that
//! sequences packet receipt, frame sampling, stdin and heartbeats.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::network::Client;
//! use shared::UserId;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = Client::new(
//!         "127.0.0.1:8080",
//!         UserId::from("alice"),
//!         100,
//!         0,
//!         Duration::from_millis(16),
//!     )
//!     .await?;
//!
//!     client.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod game;
pub mod input;
pub mod network;
pub mod snapshot_buffer;
