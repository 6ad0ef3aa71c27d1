//! Round rules: command validation, team assignment and attack resolution
//!
//! Every command goes through [`RulesEngine::apply`]. Each handler checks all
//! of its failure conditions before touching the round, so a rejected command
//! leaves the round exactly as it was.

use crate::round::{Body, Player, Round};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::{
    Command, CommandError, GameEvent, Location, PlayerStatus, RoundStatus, Team, UserId,
    KILL_RADIUS, ROUND_CAPACITY, SPAWN_LOCATION,
};

/// Smallest capacity that yields an imposter and at least one crew member.
pub const MIN_CAPACITY: usize = 2;

/// Tunable parameters of a round.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuleSet {
    /// Number of joined players that starts the round.
    pub capacity: usize,
    /// Attacks reach victims strictly closer than this.
    pub kill_radius: f32,
    pub spawn: Location,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            capacity: ROUND_CAPACITY,
            kill_radius: KILL_RADIUS,
            spawn: SPAWN_LOCATION,
        }
    }
}

pub struct RulesEngine {
    rules: RuleSet,
    rng: StdRng,
}

impl RulesEngine {
    pub fn new(mut rules: RuleSet, rng: StdRng) -> Self {
        if rules.capacity < MIN_CAPACITY {
            warn!(
                "Round capacity {} raised to {}",
                rules.capacity, MIN_CAPACITY
            );
            rules.capacity = MIN_CAPACITY;
        }
        Self { rules, rng }
    }

    /// Engine with a deterministic team assignment sequence.
    pub fn seeded(rules: RuleSet, seed: u64) -> Self {
        Self::new(rules, StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy(rules: RuleSet) -> Self {
        Self::new(rules, StdRng::from_entropy())
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Applies `command` on behalf of `caller`.
    ///
    /// Returns the advisory events produced by the command. On error the
    /// round is untouched.
    pub fn apply(
        &mut self,
        round: &mut Round,
        caller: &UserId,
        command: &Command,
    ) -> Result<Vec<GameEvent>, CommandError> {
        match command {
            Command::Join => self.join(round, caller),
            Command::MoveTo { x, y } => set_move_target(round, caller, Location::new(*x, *y)),
            Command::Attack => attack(round, caller, self.rules.kill_radius),
        }
    }

    fn join(&mut self, round: &mut Round, caller: &UserId) -> Result<Vec<GameEvent>, CommandError> {
        if round.player(caller).is_some() {
            return Err(CommandError::AlreadyJoined);
        }
        if round.status != RoundStatus::Waiting {
            return Err(CommandError::RoundNotAcceptingPlayers);
        }

        round.players.push(Player::new(caller.clone(), self.rules.spawn));
        info!(
            "Player {} joined ({}/{})",
            caller,
            round.players.len(),
            self.rules.capacity
        );

        let mut events = vec![GameEvent::PlayerJoined { id: caller.clone() }];

        if round.players.len() >= self.rules.capacity {
            self.assign_teams(round);
            events.push(GameEvent::RoundStarted {
                players: round.players.len(),
            });
        }

        Ok(events)
    }

    /// Picks one imposter uniformly over player slots and starts the round.
    fn assign_teams(&mut self, round: &mut Round) {
        let imposter = self.rng.gen_range(0..round.players.len());

        for (index, player) in round.players.iter_mut().enumerate() {
            player.team = if index == imposter {
                Team::Imposter
            } else {
                Team::Crew
            };
        }

        round.status = RoundStatus::Ongoing;
        info!("Round started with {} players", round.players.len());
        debug!("Imposter slot {}", imposter);
    }
}

fn set_move_target(
    round: &mut Round,
    caller: &UserId,
    destination: Location,
) -> Result<Vec<GameEvent>, CommandError> {
    match round.status {
        RoundStatus::Waiting => return Err(CommandError::RoundNotStarted),
        RoundStatus::CrewWon | RoundStatus::ImposterWon => {
            return Err(CommandError::RoundFinished)
        }
        RoundStatus::Ongoing => {}
    }

    let index = round
        .player_index(caller)
        .ok_or(CommandError::PlayerNotJoined)?;
    if !destination.is_finite() {
        debug!("Ignoring non-finite destination from {}", caller);
        return Ok(Vec::new());
    }
    round.players[index].target = Some(destination);

    Ok(vec![GameEvent::MoveIntent {
        id: caller.clone(),
        target: destination,
    }])
}

fn attack(
    round: &mut Round,
    caller: &UserId,
    kill_radius: f32,
) -> Result<Vec<GameEvent>, CommandError> {
    let attacker = round.player(caller).ok_or(CommandError::PlayerNotJoined)?;
    if attacker.team != Team::Imposter {
        return Err(CommandError::NotAnImposter);
    }
    if round.status.is_finished() {
        return Err(CommandError::RoundFinished);
    }

    // First victim in join order, not the nearest one.
    let origin = attacker.location;
    let victim = round
        .players
        .iter()
        .position(|p| p.is_alive_crew() && p.location.distance_to(&origin) < kill_radius);

    let Some(victim) = victim else {
        debug!("Attack by {} found no victim in range", caller);
        return Ok(Vec::new());
    };

    let player = &mut round.players[victim];
    player.status = PlayerStatus::Ghost;
    let body = Body {
        id: player.id.clone(),
        location: player.location,
    };
    info!("Player {} was eliminated at {}", body.id, body.location);

    let mut events = vec![GameEvent::PlayerEliminated {
        id: body.id.clone(),
        location: body.location,
    }];
    round.bodies.push(body);

    if round.alive_crew_count() == 0 {
        round.status = RoundStatus::ImposterWon;
        info!("No crew left alive, imposters won");
        events.push(GameEvent::RoundEnded {
            status: round.status,
        });
    }

    Ok(events)
}
