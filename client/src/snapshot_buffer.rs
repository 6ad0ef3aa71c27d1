//! Interpolation buffer for authoritative round snapshots
//!
//! Snapshots arrive at irregular intervals. Rendering a fixed delay in the
//! past means there is almost always a newer snapshot to interpolate towards,
//! so motion stays smooth no matter how often frames are drawn.

use shared::{PlayerSnapshot, RoundSnapshot};
use std::collections::VecDeque;

/// Rolling history of `(received_at_ms, snapshot)` pairs, oldest first.
#[derive(Debug, Clone)]
pub struct SnapshotBuffer {
    delay_ms: u64,
    retention_ms: u64,
    history: VecDeque<(u64, RoundSnapshot)>,
}

impl SnapshotBuffer {
    /// Buffer rendering `delay_ms` behind real time, retaining five delays of history.
    pub fn new(delay_ms: u64) -> Self {
        Self::with_retention(delay_ms, delay_ms.saturating_mul(5))
    }

    pub fn with_retention(delay_ms: u64, retention_ms: u64) -> Self {
        Self {
            delay_ms,
            retention_ms: retention_ms.max(delay_ms),
            history: VecDeque::new(),
        }
    }

    pub fn delay_ms(&self) -> u64 {
        self.delay_ms
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn latest(&self) -> Option<&RoundSnapshot> {
        self.history.back().map(|(_, snapshot)| snapshot)
    }

    /// Records a snapshot received at `timestamp` (ms)
    ///
    /// Snapshots older than the newest buffered one are stale and dropped;
    /// one with the same timestamp replaces it. Returns whether the snapshot
    /// was kept.
    pub fn enqueue(&mut self, snapshot: RoundSnapshot, timestamp: u64) -> bool {
        if let Some((newest, latest)) = self.history.back_mut() {
            if timestamp < *newest {
                return false;
            }
            if timestamp == *newest {
                *latest = snapshot;
                return true;
            }
        }
        self.history.push_back((timestamp, snapshot));

        // The front entry is only needed while the next one is still recent
        // enough to be an interpolation target.
        while self.history.len() > 2 {
            let second = self.history[1].0;
            if second.saturating_add(self.retention_ms) <= timestamp {
                self.history.pop_front();
            } else {
                break;
            }
        }

        true
    }

    /// Interpolated view of the round at `render_timestamp` (ms)
    ///
    /// Returns `None` only when nothing has been received yet.
    pub fn query(&self, render_timestamp: u64) -> Option<RoundSnapshot> {
        if self.history.len() < 2 {
            return self.latest().cloned();
        }

        let target = render_timestamp.saturating_sub(self.delay_ms);
        let last = self.history.len() - 1;
        let from_index = match self.history.iter().rposition(|(ts, _)| *ts <= target) {
            None => 0,
            Some(index) if index == last => last - 1,
            Some(index) => index,
        };

        let (from_ts, from) = &self.history[from_index];
        let (to_ts, to) = &self.history[from_index + 1];

        let span = (*to_ts - *from_ts) as f64;
        let fraction = ((target as f64 - *from_ts as f64) / span).clamp(0.0, 1.0) as f32;

        Some(interpolate(from, to, fraction))
    }
}

/// Blends `from` into `to` by `fraction`, keyed by player id
///
/// The later snapshot decides who is shown: newcomers appear at their
/// position in `to`, players missing from `to` are dropped. Everything other
/// than positions is taken from `to`.
pub fn interpolate(from: &RoundSnapshot, to: &RoundSnapshot, fraction: f32) -> RoundSnapshot {
    let players = to
        .players
        .iter()
        .map(|to_player| match from.player(&to_player.id) {
            Some(from_player) => PlayerSnapshot {
                location: from_player.location.lerp(&to_player.location, fraction),
                ..to_player.clone()
            },
            None => to_player.clone(),
        })
        .collect();

    RoundSnapshot {
        status: to.status,
        players,
        bodies: to.bodies.clone(),
    }
}
