//! Authoritative round state
//!
//! The `Round` is the single source of truth for one room. It is mutated only
//! by the rules engine and the tick integrator, both driven from the server's
//! event loop, and read to build the snapshots broadcast to clients.

use shared::{
    BodySnapshot, Location, PlayerSnapshot, PlayerStatus, RoundSnapshot, RoundStatus, Team, UserId,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub id: UserId,
    pub location: Location,
    /// Where the player is walking to; `None` while idle.
    pub target: Option<Location>,
    pub team: Team,
    pub status: PlayerStatus,
}

impl Player {
    pub fn new(id: UserId, location: Location) -> Self {
        Self {
            id,
            location,
            target: None,
            team: Team::Undetermined,
            status: PlayerStatus::Alive,
        }
    }

    pub fn is_alive_crew(&self) -> bool {
        self.team == Team::Crew && self.status == PlayerStatus::Alive
    }
}

/// Marker left where a player was eliminated. Never moved or removed.
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    pub id: UserId,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Round {
    pub status: RoundStatus,
    /// Join order is preserved; attack resolution depends on it.
    pub players: Vec<Player>,
    pub bodies: Vec<Body>,
}

impl Round {
    pub fn new() -> Self {
        Self {
            status: RoundStatus::Waiting,
            players: Vec::new(),
            bodies: Vec::new(),
        }
    }

    pub fn player(&self, id: &UserId) -> Option<&Player> {
        self.players.iter().find(|p| &p.id == id)
    }

    pub fn player_index(&self, id: &UserId) -> Option<usize> {
        self.players.iter().position(|p| &p.id == id)
    }

    pub fn alive_crew_count(&self) -> usize {
        self.players.iter().filter(|p| p.is_alive_crew()).count()
    }

    pub fn snapshot(&self) -> RoundSnapshot {
        RoundSnapshot {
            status: self.status,
            players: self
                .players
                .iter()
                .map(|p| PlayerSnapshot {
                    id: p.id.clone(),
                    location: p.location,
                    team: p.team,
                    status: p.status,
                })
                .collect(),
            bodies: self
                .bodies
                .iter()
                .map(|b| BodySnapshot {
                    id: b.id.clone(),
                    location: b.location,
                })
                .collect(),
        }
    }
}

impl Default for Round {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_round_is_empty_and_waiting() {
        let round = Round::new();
        assert_eq!(round.status, RoundStatus::Waiting);
        assert!(round.players.is_empty());
        assert!(round.bodies.is_empty());
    }

    #[test]
    fn test_new_player_defaults() {
        let player = Player::new(UserId::from("alice"), Location::new(1.0, 2.0));
        assert_eq!(player.location, Location::new(1.0, 2.0));
        assert_eq!(player.target, None);
        assert_eq!(player.team, Team::Undetermined);
        assert_eq!(player.status, PlayerStatus::Alive);
        assert!(!player.is_alive_crew());
    }

    #[test]
    fn test_snapshot_preserves_join_order_and_hides_targets() {
        let mut round = Round::new();
        round
            .players
            .push(Player::new(UserId::from("b"), Location::new(0.0, 0.0)));
        round
            .players
            .push(Player::new(UserId::from("a"), Location::new(5.0, 5.0)));
        round.players[0].target = Some(Location::new(100.0, 100.0));
        round.bodies.push(Body {
            id: UserId::from("c"),
            location: Location::new(7.0, 8.0),
        });

        let snapshot = round.snapshot();
        assert_eq!(snapshot.status, RoundStatus::Waiting);
        assert_eq!(snapshot.players[0].id, UserId::from("b"));
        assert_eq!(snapshot.players[1].id, UserId::from("a"));
        assert_eq!(snapshot.players[0].location, Location::new(0.0, 0.0));
        assert_eq!(snapshot.bodies.len(), 1);
        assert_eq!(snapshot.bodies[0].location, Location::new(7.0, 8.0));
    }

    #[test]
    fn test_alive_crew_count() {
        let mut round = Round::new();
        for (name, team, status) in [
            ("a", Team::Crew, PlayerStatus::Alive),
            ("b", Team::Crew, PlayerStatus::Ghost),
            ("c", Team::Imposter, PlayerStatus::Alive),
            ("d", Team::Crew, PlayerStatus::Alive),
        ] {
            let mut player = Player::new(UserId::from(name), Location::default());
            player.team = team;
            player.status = status;
            round.players.push(player);
        }

        assert_eq!(round.alive_crew_count(), 2);
        assert_eq!(round.player_index(&UserId::from("c")), Some(2));
        assert!(round.player(&UserId::from("z")).is_none());
    }
}
