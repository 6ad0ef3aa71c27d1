use crate::game::{describe_round, status_message, ClientGameState};
use crate::input::{parse_line, ClientAction, InputError, InputManager, HELP};
use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use shared::{
    can_reconnect, now_millis, Command, Location, Packet, RoundSnapshot, UserId,
    MAX_PACKET_SIZE, PROTOCOL_VERSION,
};

/// Unanswered commands older than this many sequence numbers are forgotten.
const PENDING_WINDOW: u32 = 64;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::UdpSocket;
use tokio::time::{interval, sleep};

pub struct Client {
    socket: UdpSocket,
    server_addr: SocketAddr,
    client_id: Option<u32>,
    connected: bool,
    running: bool,

    game_state: ClientGameState,
    input_manager: InputManager,
    /// Commands sent but not yet answered, by sequence number
    pending: HashMap<u32, Command>,

    fake_ping_ms: u64,
    frame_interval: Duration,
    last_view: Option<RoundSnapshot>,
    last_drawn: Option<Location>,
}

impl Client {
    pub async fn new(
        server_addr: &str,
        user: UserId,
        delay_ms: u64,
        fake_ping_ms: u64,
        frame_interval: Duration,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        let server_addr = server_addr.parse()?;

        Ok(Client {
            socket,
            server_addr,
            client_id: None,
            connected: false,
            running: true,
            game_state: ClientGameState::new(user, delay_ms),
            input_manager: InputManager::new(),
            pending: HashMap::new(),
            fake_ping_ms,
            frame_interval,
            last_view: None,
            last_drawn: None,
        })
    }

    async fn connect(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        info!("Connecting to server as {}...", self.game_state.user);

        let packet = Packet::Connect {
            client_version: PROTOCOL_VERSION,
            user_id: self.game_state.user.clone(),
        };
        self.send_packet(&packet).await?;

        Ok(())
    }

    async fn send_packet(&self, packet: &Packet) -> Result<(), Box<dyn std::error::Error>> {
        if self.fake_ping_ms > 0 {
            sleep(Duration::from_millis(self.fake_ping_ms / 2)).await;
        }

        let data = serialize(packet)?;
        self.socket.send_to(&data, self.server_addr).await?;
        Ok(())
    }

    async fn send_command(&mut self, command: Command) -> Result<(), Box<dyn std::error::Error>> {
        if !self.connected {
            warn!("Not connected yet, dropping {:?}", command);
            return Ok(());
        }

        if command == Command::Join {
            self.game_state.mark_join_sent(now_millis());
        }

        let sequence = self.input_manager.next_sequence();
        let packet = Packet::Command {
            sequence,
            command: command.clone(),
        };
        self.pending.insert(sequence, command);
        self.pending
            .retain(|pending, _| sequence.wrapping_sub(*pending) < PENDING_WINDOW);
        self.send_packet(&packet).await
    }

    async fn handle_packet(&mut self, packet: Packet, received_at: u64) {
        match packet {
            Packet::Connected { client_id } => {
                info!("Connected! Client ID: {}", client_id);
                self.client_id = Some(client_id);
                self.connected = true;
            }

            Packet::RoundState { round, .. } => {
                if let Some(status) = self.game_state.apply_server_state(round, received_at) {
                    info!("{}", status_message(status));
                }

                if self.connected && self.game_state.needs_join(received_at) {
                    if let Err(e) = self.send_command(Command::Join).await {
                        error!("Error sending join: {}", e);
                    }
                }
            }

            Packet::CommandResult { sequence, result } => {
                let command = self.pending.remove(&sequence);
                match (command, result) {
                    (Some(command), Ok(())) => debug!("{:?} accepted", command),
                    (Some(command), Err(e)) => warn!("{:?} rejected: {}", command, e),
                    (None, _) => debug!("Result for unknown command {}", sequence),
                }
            }

            Packet::Event { event } => {
                info!("{}", event);
            }

            Packet::Disconnected { reason } => {
                self.connected = false;
                self.client_id = None;
                if can_reconnect(&reason) {
                    // The next heartbeat tick sends Connect again.
                    warn!("Disconnected: {}, reconnecting", reason);
                } else {
                    warn!("Disconnected: {}", reason);
                    self.running = false;
                }
            }

            _ => {
                warn!("Unexpected packet type");
            }
        }
    }

    async fn handle_line(&mut self, line: &str) {
        match parse_line(line) {
            Ok(ClientAction::Send(command)) => {
                if let Err(e) = self.send_command(command).await {
                    error!("Error sending command: {}", e);
                }
            }
            Ok(ClientAction::Status) => match &self.last_view {
                Some(view) => info!("\n{}", describe_round(view, &self.game_state.user)),
                None => info!("No round state received yet"),
            },
            Ok(ClientAction::Help) => info!("{}", HELP),
            Ok(ClientAction::Quit) => self.running = false,
            Err(InputError::Empty) => {}
            Err(e) => warn!("{} ({})", e, HELP),
        }
    }

    /// Samples the interpolated round for this frame.
    fn update_frame(&mut self) {
        let Some(view) = self.game_state.render_state(now_millis()) else {
            return;
        };

        let position = self.game_state.local_player(&view).map(|p| p.location);
        if position != self.last_drawn {
            if let Some(location) = position {
                debug!("At {}", location);
            }
            self.last_drawn = position;
        }

        self.last_view = Some(view);
    }

    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.connect().await?;
        info!("{}", HELP);

        let mut frame_interval = interval(self.frame_interval);
        let mut heartbeat_interval = interval(Duration::from_secs(1));
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdin_open = true;

        // Skip the first heartbeat since it fires immediately
        heartbeat_interval.tick().await;

        let mut buffer = [0u8; MAX_PACKET_SIZE];

        while self.running {
            tokio::select! {
                result = self.socket.recv_from(&mut buffer) => {
                    match result {
                        Ok((len, _)) => {
                            if self.fake_ping_ms > 0 {
                                sleep(Duration::from_millis(self.fake_ping_ms / 2)).await;
                            }

                            match deserialize::<Packet>(&buffer[0..len]) {
                                Ok(packet) => self.handle_packet(packet, now_millis()).await,
                                Err(e) => warn!("Failed to deserialize packet: {}", e),
                            }
                        },
                        Err(e) => error!("Error receiving packet: {}", e),
                    }
                },

                line = lines.next_line(), if stdin_open => {
                    match line {
                        Ok(Some(line)) => self.handle_line(&line).await,
                        Ok(None) => {
                            debug!("stdin closed");
                            stdin_open = false;
                        }
                        Err(e) => {
                            error!("Error reading stdin: {}", e);
                            stdin_open = false;
                        }
                    }
                },

                _ = frame_interval.tick() => {
                    self.update_frame();
                },

                _ = heartbeat_interval.tick() => {
                    let packet = if self.connected {
                        Packet::Heartbeat
                    } else {
                        Packet::Connect {
                            client_version: PROTOCOL_VERSION,
                            user_id: self.game_state.user.clone(),
                        }
                    };
                    if let Err(e) = self.send_packet(&packet).await {
                        error!("Error sending heartbeat: {}", e);
                    }
                },
            }
        }

        if self.connected {
            let _ = self.send_packet(&Packet::Disconnect).await;
        }

        Ok(())
    }
}
