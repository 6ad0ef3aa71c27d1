use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;

pub const PROTOCOL_VERSION: u32 = 1;
pub const PLAYER_SPEED: f32 = 300.0;
pub const KILL_RADIUS: f32 = 200.0;
pub const ROUND_CAPACITY: usize = 4;
pub const SPAWN_LOCATION: Location = Location { x: 4900.0, y: 1700.0 };
pub const INTERPOLATION_DELAY_MS: u64 = 100;
pub const MAX_USER_ID_LEN: usize = 32;
pub const MAX_PACKET_SIZE: usize = 2048;

/// `Disconnected` reasons after which a client should send `Connect` again.
pub const DISCONNECT_TIMED_OUT: &str = "Timed out";
pub const DISCONNECT_NOT_CONNECTED: &str = "Not connected";

pub fn can_reconnect(reason: &str) -> bool {
    reason == DISCONNECT_TIMED_OUT || reason == DISCONNECT_NOT_CONNECTED
}

/// A point on the map, in world units.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
pub struct Location {
    pub x: f32,
    pub y: f32,
}

impl Location {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Location) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Unit vector pointing from `self` towards `other`, or zero if they coincide.
    pub fn direction_to(&self, other: &Location) -> (f32, f32) {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        let magnitude = (dx * dx + dy * dy).sqrt();
        if magnitude > 0.0 {
            (dx / magnitude, dy / magnitude)
        } else {
            (0.0, 0.0)
        }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Linear interpolation on each axis independently.
    pub fn lerp(&self, to: &Location, fraction: f32) -> Location {
        Location {
            x: self.x + (to.x - self.x) * fraction,
            y: self.y + (to.y - self.y) * fraction,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.1}, {:.1})", self.x, self.y)
    }
}

/// Stable identity of a user, resolved by the transport before any command runs.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct UserId(pub String);

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        UserId(value.to_string())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum Team {
    Undetermined,
    Crew,
    Imposter,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum PlayerStatus {
    Alive,
    Ghost,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum RoundStatus {
    Waiting,
    Ongoing,
    CrewWon,
    ImposterWon,
}

impl RoundStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, RoundStatus::CrewWon | RoundStatus::ImposterWon)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PlayerSnapshot {
    pub id: UserId,
    pub location: Location,
    pub team: Team,
    pub status: PlayerStatus,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BodySnapshot {
    pub id: UserId,
    pub location: Location,
}

/// Everything a client is told about the round at one instant.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RoundSnapshot {
    pub status: RoundStatus,
    pub players: Vec<PlayerSnapshot>,
    pub bodies: Vec<BodySnapshot>,
}

impl RoundSnapshot {
    pub fn waiting() -> Self {
        Self {
            status: RoundStatus::Waiting,
            players: Vec::new(),
            bodies: Vec::new(),
        }
    }

    pub fn player(&self, id: &UserId) -> Option<&PlayerSnapshot> {
        self.players.iter().find(|p| &p.id == id)
    }
}

/// Commands a joined (or joining) user may issue against the round.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Command {
    Join,
    MoveTo { x: f32, y: f32 },
    Attack,
}

/// Reasons the round rejects a command. Rejection never changes the round.
#[derive(Debug, Error, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    #[error("already joined")]
    AlreadyJoined,
    #[error("round is not accepting players")]
    RoundNotAcceptingPlayers,
    #[error("round has not started")]
    RoundNotStarted,
    #[error("round is finished")]
    RoundFinished,
    #[error("not joined")]
    PlayerNotJoined,
    #[error("not an imposter")]
    NotAnImposter,
}

/// Advisory notifications broadcast alongside state. Never required for correctness.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum GameEvent {
    PlayerJoined { id: UserId },
    RoundStarted { players: usize },
    MoveIntent { id: UserId, target: Location },
    PlayerEliminated { id: UserId, location: Location },
    RoundEnded { status: RoundStatus },
}

impl fmt::Display for GameEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameEvent::PlayerJoined { id } => write!(f, "{} joined", id),
            GameEvent::RoundStarted { players } => {
                write!(f, "round started with {} players", players)
            }
            GameEvent::MoveIntent { id, target } => write!(f, "{} moving to {}", id, target),
            GameEvent::PlayerEliminated { id, location } => {
                write!(f, "{} was eliminated at {}", id, location)
            }
            GameEvent::RoundEnded { status } => match status {
                RoundStatus::CrewWon => write!(f, "crew won"),
                RoundStatus::ImposterWon => write!(f, "imposters won"),
                other => write!(f, "round ended ({:?})", other),
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub enum Packet {
    Connect {
        client_version: u32,
        user_id: UserId,
    },
    Command {
        sequence: u32,
        command: Command,
    },
    Heartbeat,
    Disconnect,

    Connected {
        client_id: u32,
    },
    CommandResult {
        sequence: u32,
        result: Result<(), CommandError>,
    },
    RoundState {
        tick: u32,
        timestamp: u64,
        round: RoundSnapshot,
    },
    Event {
        event: GameEvent,
    },
    Disconnected {
        reason: String,
    },
}

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis();
    millis.min(u64::MAX as u128) as u64
}
