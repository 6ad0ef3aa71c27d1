use crate::snapshot_buffer::SnapshotBuffer;
use log::debug;
use shared::{PlayerSnapshot, RoundSnapshot, RoundStatus, UserId};

/// How long to wait for a join to show up in snapshots before sending it again.
pub const JOIN_RETRY_MS: u64 = 1000;

/// Client-side view of the round.
///
/// Everything here is derived from server snapshots; the client never
/// predicts or mutates round state on its own.
pub struct ClientGameState {
    pub user: UserId,
    pub buffer: SnapshotBuffer,
    last_status: RoundStatus,
    join_sent_at: Option<u64>,
}

impl ClientGameState {
    pub fn new(user: UserId, delay_ms: u64) -> Self {
        Self {
            user,
            buffer: SnapshotBuffer::new(delay_ms),
            last_status: RoundStatus::Waiting,
            join_sent_at: None,
        }
    }

    /// Buffers a snapshot received at `received_at` (ms)
    ///
    /// Returns the new round status the first time a change is observed.
    pub fn apply_server_state(
        &mut self,
        round: RoundSnapshot,
        received_at: u64,
    ) -> Option<RoundStatus> {
        let status = round.status;
        if !self.buffer.enqueue(round, received_at) {
            debug!("Dropped stale snapshot received at {}", received_at);
            return None;
        }

        if status != self.last_status {
            self.last_status = status;
            Some(status)
        } else {
            None
        }
    }

    /// True when the latest snapshot shows an open round we are not part of yet
    ///
    /// A join already sent is retried once `JOIN_RETRY_MS` have passed at
    /// local time `now` without the user appearing.
    pub fn needs_join(&self, now: u64) -> bool {
        if let Some(sent_at) = self.join_sent_at {
            if now.saturating_sub(sent_at) < JOIN_RETRY_MS {
                return false;
            }
        }
        match self.buffer.latest() {
            Some(latest) => {
                latest.status == RoundStatus::Waiting && latest.player(&self.user).is_none()
            }
            None => false,
        }
    }

    pub fn mark_join_sent(&mut self, now: u64) {
        self.join_sent_at = Some(now);
    }

    /// Interpolated state to present at local time `now` (ms).
    pub fn render_state(&self, now: u64) -> Option<RoundSnapshot> {
        self.buffer.query(now)
    }

    pub fn local_player<'a>(&self, state: &'a RoundSnapshot) -> Option<&'a PlayerSnapshot> {
        state.player(&self.user)
    }

    pub fn status(&self) -> RoundStatus {
        self.last_status
    }
}

/// Announcement shown when the round moves to `status`.
pub fn status_message(status: RoundStatus) -> &'static str {
    match status {
        RoundStatus::Waiting => "Waiting for players",
        RoundStatus::Ongoing => "Game starting",
        RoundStatus::CrewWon => "Crew won",
        RoundStatus::ImposterWon => "Imposters won",
    }
}

/// Multi-line summary of a round, marking the local user with `*`.
pub fn describe_round(state: &RoundSnapshot, user: &UserId) -> String {
    let mut lines = vec![format!("status: {:?}", state.status)];
    for player in &state.players {
        let marker = if &player.id == user { "*" } else { " " };
        lines.push(format!(
            "{} {} {:?}/{:?} at {}",
            marker, player.id, player.team, player.status, player.location
        ));
    }
    for body in &state.bodies {
        lines.push(format!("  body of {} at {}", body.id, body.location));
    }
    lines.join("\n")
}
