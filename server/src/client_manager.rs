//! Connection registry for the room server
//!
//! This module tracks which network address speaks for which user:
//! - Client connection lifecycle (connect, reconnect, disconnect, timeout)
//! - Command sequence tracking so duplicated datagrams are applied once
//! - Client capacity management and address lookup for broadcasts
//!
//! Connections are transport state only. Dropping a connection never removes
//! the user's player from the round.

use log::info;
use shared::UserId;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// A connected client and the user identity it was bound to on connect.
#[derive(Debug)]
pub struct Client {
    /// Unique connection identifier assigned by the server
    pub id: u32,
    pub user: UserId,
    /// Network address for sending responses
    pub addr: SocketAddr,
    /// Last time we received any packet from this client
    pub last_seen: Instant,
    /// Highest command sequence number already applied
    pub last_command: u32,
}

impl Client {
    pub fn new(id: u32, user: UserId, addr: SocketAddr) -> Self {
        Self {
            id,
            user,
            addr,
            last_seen: Instant::now(),
            last_command: 0,
        }
    }

    /// Returns true if no packets have been received within `timeout`.
    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }
}

/// Manages all connected clients
///
/// Enforces the connection limit and resolves datagram source addresses to
/// user identities before commands reach the rules engine.
pub struct ClientManager {
    /// Connected clients indexed by their unique ID
    clients: HashMap<u32, Client>,
    /// Next available client ID for new connections
    next_client_id: u32,
    /// Maximum number of concurrent clients allowed
    max_clients: usize,
}

impl ClientManager {
    /// Client IDs start from 1 and increment for each new connection.
    pub fn new(max_clients: usize) -> Self {
        Self {
            clients: HashMap::new(),
            next_client_id: 1,
            max_clients,
        }
    }

    /// Attempts to add a new client connection
    ///
    /// Returns Some(client_id) if successful, None if server is at capacity.
    pub fn add_client(&mut self, addr: SocketAddr, user: UserId) -> Option<u32> {
        if self.clients.len() >= self.max_clients {
            return None;
        }

        let client_id = self.next_client_id;
        self.next_client_id += 1;

        info!("Client {} ({}) connected from {}", client_id, user, addr);
        self.clients
            .insert(client_id, Client::new(client_id, user, addr));

        Some(client_id)
    }

    /// Returns true if the client was found and removed.
    pub fn remove_client(&mut self, client_id: &u32) -> bool {
        if let Some(client) = self.clients.remove(client_id) {
            info!("Client {} ({}) disconnected", client.id, client.user);
            true
        } else {
            false
        }
    }

    pub fn find_client_by_addr(&self, addr: SocketAddr) -> Option<u32> {
        self.clients
            .iter()
            .find(|(_, client)| client.addr == addr)
            .map(|(id, _)| *id)
    }

    pub fn find_client_by_user(&self, user: &UserId) -> Option<u32> {
        self.clients
            .iter()
            .find(|(_, client)| &client.user == user)
            .map(|(id, _)| *id)
    }

    /// Resolves the identity behind a datagram source address.
    pub fn user_for_addr(&self, addr: SocketAddr) -> Option<(u32, UserId)> {
        self.clients
            .values()
            .find(|client| client.addr == addr)
            .map(|client| (client.id, client.user.clone()))
    }

    /// Marks the client at `addr` as alive. Returns false for unknown addresses.
    pub fn touch(&mut self, addr: SocketAddr) -> bool {
        match self.clients.values_mut().find(|client| client.addr == addr) {
            Some(client) => {
                client.last_seen = Instant::now();
                true
            }
            None => false,
        }
    }

    /// Records `sequence` as applied for `client_id`
    ///
    /// Returns false if the sequence was already seen (a duplicated or late
    /// datagram) or the client is unknown; the command must then be skipped.
    pub fn accept_command(&mut self, client_id: u32, sequence: u32) -> bool {
        match self.clients.get_mut(&client_id) {
            Some(client) if sequence > client.last_command => {
                client.last_command = sequence;
                true
            }
            _ => false,
        }
    }

    /// Removes clients silent for longer than `timeout` and returns their IDs
    /// and last known addresses.
    pub fn check_timeouts(&mut self, timeout: Duration) -> Vec<(u32, SocketAddr)> {
        let timed_out: Vec<(u32, SocketAddr)> = self
            .clients
            .iter()
            .filter(|(_, client)| client.is_timed_out(timeout))
            .map(|(id, client)| (*id, client.addr))
            .collect();

        for (client_id, _) in &timed_out {
            self.remove_client(client_id);
        }

        timed_out
    }

    /// (client_id, address) pairs for broadcasting.
    pub fn get_client_addrs(&self) -> Vec<(u32, SocketAddr)> {
        self.clients
            .iter()
            .map(|(id, client)| (*id, client.addr))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
