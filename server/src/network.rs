//! Server network layer handling UDP communications and the round's event loop

use crate::client_manager::ClientManager;
use crate::config::ServerConfig;
use crate::round::Round;
use crate::rules::RulesEngine;
use crate::tick;
use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use shared::{
    now_millis, Command, GameEvent, Packet, RoundStatus, UserId, DISCONNECT_NOT_CONNECTED,
    DISCONNECT_TIMED_OUT, MAX_PACKET_SIZE, MAX_USER_ID_LEN, PROTOCOL_VERSION,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, RwLock};
use tokio::time::interval;

/// Messages sent from network tasks to main server loop
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived {
        packet: Packet,
        addr: SocketAddr,
    },
    ClientTimeout {
        client_id: u32,
        addr: SocketAddr,
    },
}

/// Messages sent from the main loop to the sender task
#[derive(Debug)]
pub enum GameMessage {
    SendPacket {
        packet: Packet,
        addr: SocketAddr,
    },
    BroadcastPacket {
        packet: Packet,
    },
}

/// Room server: owns the round and is its only writer
///
/// Commands and ticks are both handled inside [`Server::run`]'s single loop,
/// so no two mutations of the round ever interleave.
pub struct Server {
    socket: Arc<UdpSocket>,
    clients: Arc<RwLock<ClientManager>>,
    round: Round,
    engine: RulesEngine,
    tick: u32,
    tick_duration: Duration,
    client_timeout: Duration,

    // Communication channels
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    game_tx: mpsc::UnboundedSender<GameMessage>,
    game_rx: mpsc::UnboundedReceiver<GameMessage>,
}

impl Server {
    pub async fn new(config: ServerConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = Arc::new(UdpSocket::bind(&config.bind_addr).await?);
        info!("Server listening on {}", socket.local_addr()?);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (game_tx, game_rx) = mpsc::unbounded_channel();

        Ok(Server {
            socket,
            clients: Arc::new(RwLock::new(ClientManager::new(config.max_clients))),
            round: Round::new(),
            engine: config.rules_engine(),
            tick: 0,
            tick_duration: config.tick_duration,
            client_timeout: config.client_timeout,
            server_tx,
            server_rx,
            game_tx,
            game_rx,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn round(&self) -> &Round {
        &self.round
    }

    /// Spawns task that continuously listens for incoming packets
    fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; MAX_PACKET_SIZE];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => {
                        if let Ok(packet) = deserialize::<Packet>(&buffer[0..len]) {
                            if let Err(e) =
                                server_tx.send(ServerMessage::PacketReceived { packet, addr })
                            {
                                error!("Failed to send packet to main loop: {}", e);
                                break;
                            }
                        } else {
                            warn!("Failed to deserialize packet from {}", addr);
                        }
                    }
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Spawns task that processes outgoing packet queue
    fn spawn_network_sender(&mut self) {
        let socket = Arc::clone(&self.socket);
        let clients = Arc::clone(&self.clients);
        let mut game_rx = std::mem::replace(&mut self.game_rx, mpsc::unbounded_channel().1);

        tokio::spawn(async move {
            while let Some(message) = game_rx.recv().await {
                match message {
                    GameMessage::SendPacket { packet, addr } => {
                        if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                            error!("Failed to send packet to {}: {}", addr, e);
                        }
                    }
                    GameMessage::BroadcastPacket { packet } => {
                        let client_addrs = {
                            let clients_guard = clients.read().await;
                            clients_guard.get_client_addrs()
                        };

                        for (client_id, addr) in client_addrs {
                            if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                                error!("Failed to send to client {}: {}", client_id, e);
                            }
                        }
                    }
                }
            }
        });
    }

    /// Spawns task that drops connections that went silent
    fn spawn_timeout_checker(&self) {
        let clients = Arc::clone(&self.clients);
        let server_tx = self.server_tx.clone();
        let timeout = self.client_timeout;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));

            loop {
                interval.tick().await;

                let timed_out = {
                    let mut clients_guard = clients.write().await;
                    clients_guard.check_timeouts(timeout)
                };

                for (client_id, addr) in timed_out {
                    if let Err(e) =
                        server_tx.send(ServerMessage::ClientTimeout { client_id, addr })
                    {
                        error!("Failed to send timeout message: {}", e);
                        return;
                    }
                }
            }
        });
    }

    async fn send_packet_impl(
        socket: &UdpSocket,
        packet: &Packet,
        addr: SocketAddr,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let data = serialize(packet)?;
        socket.send_to(&data, addr).await?;
        Ok(())
    }

    fn send_packet(&self, packet: Packet, addr: SocketAddr) {
        if let Err(e) = self.game_tx.send(GameMessage::SendPacket { packet, addr }) {
            error!("Failed to queue packet for sending: {}", e);
        }
    }

    fn broadcast_packet(&self, packet: Packet) {
        if let Err(e) = self.game_tx.send(GameMessage::BroadcastPacket { packet }) {
            error!("Failed to queue broadcast packet: {}", e);
        }
    }

    /// Tells an address with no binding to connect again.
    fn reject_unknown(&self, addr: SocketAddr) {
        let reason = DISCONNECT_NOT_CONNECTED.to_string();
        self.send_packet(Packet::Disconnected { reason }, addr);
    }

    fn round_state_packet(&self) -> Packet {
        Packet::RoundState {
            tick: self.tick,
            timestamp: now_millis(),
            round: self.round.snapshot(),
        }
    }

    /// Broadcasts the current round snapshot to all connected clients
    fn broadcast_round_state(&self) {
        self.broadcast_packet(self.round_state_packet());
    }

    fn broadcast_events(&self, events: Vec<GameEvent>) {
        for event in events {
            info!("Event: {}", event);
            self.broadcast_packet(Packet::Event { event });
        }
    }

    /// Processes incoming packets; the only place commands reach the round
    async fn handle_packet(&mut self, packet: Packet, addr: SocketAddr) {
        match packet {
            Packet::Connect {
                client_version,
                user_id,
            } => self.handle_connect(client_version, user_id, addr).await,

            Packet::Command { sequence, command } => {
                let caller = {
                    let mut clients = self.clients.write().await;
                    clients.touch(addr);
                    match clients.user_for_addr(addr) {
                        Some((client_id, user)) if clients.accept_command(client_id, sequence) => {
                            Some(user)
                        }
                        Some(_) => {
                            debug!("Dropping duplicate command {} from {}", sequence, addr);
                            return;
                        }
                        None => None,
                    }
                };

                match caller {
                    Some(user) => self.handle_command(&user, sequence, command, addr),
                    None => {
                        warn!("Command from unknown address {}", addr);
                        self.reject_unknown(addr);
                    }
                }
            }

            Packet::Heartbeat => {
                let known = self.clients.write().await.touch(addr);
                if !known {
                    debug!("Heartbeat from unknown address {}", addr);
                    self.reject_unknown(addr);
                }
            }

            Packet::Disconnect => {
                let mut clients = self.clients.write().await;
                if let Some(client_id) = clients.find_client_by_addr(addr) {
                    clients.remove_client(&client_id);
                }
            }

            _ => {
                warn!("Unexpected packet type from client at {}", addr);
            }
        }
    }

    async fn handle_connect(&mut self, client_version: u32, user_id: UserId, addr: SocketAddr) {
        info!(
            "Client {} connecting from {} (version: {})",
            user_id, addr, client_version
        );

        if client_version != PROTOCOL_VERSION {
            let reason = "Protocol version mismatch".to_string();
            self.send_packet(Packet::Disconnected { reason }, addr);
            return;
        }

        if user_id.0.is_empty() || user_id.0.len() > MAX_USER_ID_LEN {
            let reason = "Invalid user id".to_string();
            self.send_packet(Packet::Disconnected { reason }, addr);
            return;
        }

        let client_id = {
            let mut clients = self.clients.write().await;

            // A reconnect replaces whatever this address or user was bound to.
            if let Some(existing) = clients.find_client_by_addr(addr) {
                clients.remove_client(&existing);
            }
            if let Some(existing) = clients.find_client_by_user(&user_id) {
                clients.remove_client(&existing);
            }

            clients.add_client(addr, user_id)
        };

        match client_id {
            Some(client_id) => {
                self.send_packet(Packet::Connected { client_id }, addr);
                self.send_packet(self.round_state_packet(), addr);
            }
            None => {
                let reason = "Server full".to_string();
                self.send_packet(Packet::Disconnected { reason }, addr);
            }
        }
    }

    fn handle_command(&mut self, user: &UserId, sequence: u32, command: Command, addr: SocketAddr) {
        let result = self.engine.apply(&mut self.round, user, &command);

        match result {
            Ok(events) => {
                debug!("{} applied {:?}", user, command);
                self.send_packet(
                    Packet::CommandResult {
                        sequence,
                        result: Ok(()),
                    },
                    addr,
                );
                self.broadcast_events(events);
                self.broadcast_round_state();
            }
            Err(e) => {
                debug!("{} rejected {:?}: {}", user, command, e);
                self.send_packet(
                    Packet::CommandResult {
                        sequence,
                        result: Err(e),
                    },
                    addr,
                );
            }
        }
    }

    /// Advances the simulation by the real time since the previous tick
    fn run_tick(&mut self, dt: f32) {
        if self.round.status == RoundStatus::Ongoing {
            tick::advance(&mut self.round, dt);
        }
        self.tick += 1;
        self.broadcast_round_state();
    }

    /// Main server loop coordinating all operations
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.spawn_network_receiver();
        self.spawn_network_sender();
        self.spawn_timeout_checker();

        let mut tick_interval = interval(self.tick_duration);
        let mut last_tick = Instant::now();

        info!("Server started successfully");

        loop {
            tokio::select! {
                message = self.server_rx.recv() => {
                    match message {
                        Some(ServerMessage::PacketReceived { packet, addr }) => {
                            self.handle_packet(packet, addr).await;
                        },
                        Some(ServerMessage::ClientTimeout { client_id, addr }) => {
                            info!("Client {} timed out", client_id);
                            let reason = DISCONNECT_TIMED_OUT.to_string();
                            self.send_packet(Packet::Disconnected { reason }, addr);
                        },
                        None => {
                            info!("Server shutting down");
                            break;
                        }
                    }
                },

                _ = tick_interval.tick() => {
                    let now = Instant::now();
                    let dt = now.duration_since(last_tick).as_secs_f32();
                    last_tick = now;

                    self.run_tick(dt);

                    if self.tick % 100 == 0 {
                        let client_count = self.clients.read().await.len();
                        debug!(
                            "Tick {}: {} clients, {} players, {:?}",
                            self.tick,
                            client_count,
                            self.round.players.len(),
                            self.round.status
                        );
                    }
                },
            }
        }

        Ok(())
    }
}
