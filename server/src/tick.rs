//! Movement integration for one time slice

use crate::round::{Player, Round};
use shared::PLAYER_SPEED;

/// Moves every player with a target towards it at `PLAYER_SPEED`.
///
/// Runs regardless of round status; the caller decides when ticking makes
/// sense. `elapsed_secs` should be the real time since the previous call.
pub fn advance(round: &mut Round, elapsed_secs: f32) {
    advance_with_speed(round, elapsed_secs, PLAYER_SPEED);
}

pub fn advance_with_speed(round: &mut Round, elapsed_secs: f32, speed: f32) {
    let step = (speed * elapsed_secs).max(0.0);
    for player in round.players.iter_mut() {
        step_player(player, step);
    }
}

fn step_player(player: &mut Player, step: f32) {
    let Some(target) = player.target else {
        return;
    };

    let distance = player.location.distance_to(&target);
    if !distance.is_finite() {
        // Unreachable target: stay put rather than poison the location.
        player.target = None;
        return;
    }
    if distance <= step {
        // Snap so the player never overshoots, then go idle.
        player.location = target;
        player.target = None;
    } else {
        let (dx, dy) = player.location.direction_to(&target);
        player.location.x += dx * step;
        player.location.y += dy * step;
    }
}
