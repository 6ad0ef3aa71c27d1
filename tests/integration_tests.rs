//! Integration tests for the round server and client view
//!
//! These tests validate cross-crate behaviour and the live UDP protocol.

use bincode::{deserialize, serialize};
use client::game::ClientGameState;
use client::snapshot_buffer::SnapshotBuffer;
use server::config::ServerConfig;
use server::network::Server;
use server::round::Round;
use server::rules::{RuleSet, RulesEngine};
use server::tick;
use shared::{
    Command, CommandError, Location, Packet, PlayerStatus, RoundSnapshot, RoundStatus, Team,
    UserId, PLAYER_SPEED, PROTOCOL_VERSION,
};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::timeout;

fn id(name: &str) -> UserId {
    UserId::from(name)
}

fn engine(capacity: usize, seed: u64) -> RulesEngine {
    RulesEngine::seeded(
        RuleSet {
            capacity,
            ..RuleSet::default()
        },
        seed,
    )
}

fn team_of(round: &Round, name: &str) -> Team {
    round.player(&id(name)).unwrap().team
}

/// ROUND LIFECYCLE TESTS
mod round_tests {
    use super::*;

    /// Two-player round from lobby to imposter victory
    #[test]
    fn two_player_scenario() {
        let mut rules = engine(2, 21);
        let mut round = Round::new();

        rules.apply(&mut round, &id("a"), &Command::Join).unwrap();
        assert_eq!(round.status, RoundStatus::Waiting);

        rules.apply(&mut round, &id("b"), &Command::Join).unwrap();
        assert_eq!(round.status, RoundStatus::Ongoing);

        let (imposter, crew) = if team_of(&round, "a") == Team::Imposter {
            ("a", "b")
        } else {
            ("b", "a")
        };
        assert_eq!(team_of(&round, imposter), Team::Imposter);
        assert_eq!(team_of(&round, crew), Team::Crew);

        let destination = Command::MoveTo {
            x: 4950.0,
            y: 1700.0,
        };
        assert!(rules.apply(&mut round, &id("a"), &destination).is_ok());

        assert_eq!(
            rules.apply(&mut round, &id(crew), &Command::Attack),
            Err(CommandError::NotAnImposter)
        );

        rules
            .apply(&mut round, &id(imposter), &Command::Attack)
            .unwrap();

        assert_eq!(
            round.player(&id(crew)).unwrap().status,
            PlayerStatus::Ghost
        );
        assert_eq!(round.bodies.len(), 1);
        assert_eq!(round.bodies[0].id, id(crew));
        assert_eq!(round.status, RoundStatus::ImposterWon);
    }

    /// Walking out of reach protects the crew; walking back in does not
    #[test]
    fn movement_decides_attack_range() {
        let mut rules = engine(2, 8);
        let mut round = Round::new();
        rules.apply(&mut round, &id("a"), &Command::Join).unwrap();
        rules.apply(&mut round, &id("b"), &Command::Join).unwrap();
        let (imposter, crew) = if team_of(&round, "a") == Team::Imposter {
            ("a", "b")
        } else {
            ("b", "a")
        };
        let spawn = round.player(&id(crew)).unwrap().location;

        let away = Command::MoveTo {
            x: spawn.x + 600.0,
            y: spawn.y,
        };
        rules.apply(&mut round, &id(crew), &away).unwrap();
        for _ in 0..25 {
            tick::advance(&mut round, 0.1);
        }
        assert_eq!(
            round.player(&id(crew)).unwrap().location,
            Location::new(spawn.x + 600.0, spawn.y)
        );

        let events = rules
            .apply(&mut round, &id(imposter), &Command::Attack)
            .unwrap();
        assert!(events.is_empty());
        assert_eq!(round.status, RoundStatus::Ongoing);

        let chase = Command::MoveTo {
            x: spawn.x + 500.0,
            y: spawn.y,
        };
        rules.apply(&mut round, &id(imposter), &chase).unwrap();
        for _ in 0..25 {
            tick::advance(&mut round, 0.1);
        }

        rules
            .apply(&mut round, &id(imposter), &Command::Attack)
            .unwrap();
        assert_eq!(round.status, RoundStatus::ImposterWon);
        assert_eq!(
            round.bodies[0].location,
            Location::new(spawn.x + 600.0, spawn.y)
        );
    }

    /// Bodies only grow, and each new body matches a player flipped to ghost
    #[test]
    fn eliminations_are_monotonic() {
        let names = ["a", "b", "c", "d"];
        let mut rules = engine(4, 77);
        let mut round = Round::new();
        for name in names {
            rules.apply(&mut round, &id(name), &Command::Join).unwrap();
        }

        for _ in 0..10 {
            for name in names {
                let before = round.clone();
                let result = rules.apply(&mut round, &id(name), &Command::Attack);

                match result {
                    Ok(_) if round.bodies.len() == before.bodies.len() + 1 => {
                        let body = round.bodies.last().unwrap();
                        assert_eq!(before.player(&body.id).unwrap().status, PlayerStatus::Alive);
                        assert_eq!(round.player(&body.id).unwrap().status, PlayerStatus::Ghost);
                        assert_eq!(&round.bodies[..before.bodies.len()], &before.bodies[..]);
                    }
                    _ => assert_eq!(round.bodies, before.bodies),
                }
            }
        }

        assert_eq!(round.bodies.len(), 3);
        assert_eq!(round.status, RoundStatus::ImposterWon);
    }
}

/// SERVER TO CLIENT INTERPOLATION TESTS
mod interpolation_tests {
    use super::*;

    /// Snapshots taken between server ticks blend into in-between positions
    #[test]
    fn client_view_follows_server_movement() {
        let mut rules = engine(2, 5);
        let mut round = Round::new();
        rules.apply(&mut round, &id("a"), &Command::Join).unwrap();
        rules.apply(&mut round, &id("b"), &Command::Join).unwrap();
        let start = round.player(&id("a")).unwrap().location;
        rules
            .apply(
                &mut round,
                &id("a"),
                &Command::MoveTo {
                    x: start.x + 3000.0,
                    y: start.y,
                },
            )
            .unwrap();

        let mut view = ClientGameState::new(id("a"), 100);
        let mut received_at = 1_000u64;
        let mut server_xs = Vec::new();
        for _ in 0..5 {
            tick::advance(&mut round, 0.1);
            server_xs.push(round.player(&id("a")).unwrap().location.x);
            view.apply_server_state(round.snapshot(), received_at);
            received_at += 100;
        }

        // Halfway between the second and third snapshot.
        let rendered = view.render_state(1_250).unwrap();
        let x = view.local_player(&rendered).unwrap().location.x;

        assert!((x - (server_xs[1] + server_xs[2]) / 2.0).abs() < 0.01);
        assert!((server_xs[2] - server_xs[1] - PLAYER_SPEED * 0.1).abs() < 0.01);
    }

    /// Snapshots survive the wire format unchanged before buffering
    #[test]
    fn serialized_snapshots_interpolate() {
        let mut buffer = SnapshotBuffer::new(0);
        let mut round = Round::new();
        let mut rules = engine(2, 1);
        rules.apply(&mut round, &id("a"), &Command::Join).unwrap();
        rules.apply(&mut round, &id("b"), &Command::Join).unwrap();

        for (i, x) in [0.0f32, 10.0].iter().enumerate() {
            round.players[0].location = Location::new(*x, 0.0);
            let packet = Packet::RoundState {
                tick: i as u32,
                timestamp: 0,
                round: round.snapshot(),
            };
            let bytes = serialize(&packet).unwrap();
            match deserialize::<Packet>(&bytes).unwrap() {
                Packet::RoundState { round, .. } => {
                    buffer.enqueue(round, i as u64 * 100);
                }
                _ => panic!("Wrong packet type"),
            }
        }

        let state = buffer.query(50).unwrap();
        assert!((state.players[0].location.x - 5.0).abs() < 1e-4);
        assert_eq!(state.players[1].location, round.players[1].location);
    }
}

/// LIVE NETWORK TESTS
mod network_tests {
    use super::*;

    struct TestPeer {
        socket: UdpSocket,
        server: SocketAddr,
    }

    impl TestPeer {
        async fn connect(name: &str, server: SocketAddr) -> Self {
            let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
            let peer = TestPeer { socket, server };
            peer.send(&Packet::Connect {
                client_version: PROTOCOL_VERSION,
                user_id: id(name),
            })
            .await;
            peer.wait_for(|p| matches!(p, Packet::Connected { .. })).await;
            peer
        }

        async fn send(&self, packet: &Packet) {
            let data = serialize(packet).unwrap();
            self.socket.send_to(&data, self.server).await.unwrap();
        }

        async fn command(&self, sequence: u32, command: Command) {
            self.send(&Packet::Command { sequence, command }).await;
        }

        /// Reads packets until one satisfies `accept`, failing after two seconds.
        async fn wait_for<F>(&self, accept: F) -> Packet
        where
            F: Fn(&Packet) -> bool,
        {
            let mut buffer = [0u8; 2048];
            timeout(Duration::from_secs(2), async {
                loop {
                    let (len, _) = self.socket.recv_from(&mut buffer).await.unwrap();
                    let packet: Packet = deserialize(&buffer[..len]).unwrap();
                    if accept(&packet) {
                        return packet;
                    }
                }
            })
            .await
            .expect("timed out waiting for packet")
        }

        async fn wait_for_round<F>(&self, accept: F) -> RoundSnapshot
        where
            F: Fn(&RoundSnapshot) -> bool,
        {
            match self
                .wait_for(|p| matches!(p, Packet::RoundState { round, .. } if accept(round)))
                .await
            {
                Packet::RoundState { round, .. } => round,
                _ => unreachable!(),
            }
        }

        async fn wait_for_result(&self, sequence: u32) -> Result<(), CommandError> {
            let wanted = sequence;
            match self
                .wait_for(
                    |p| matches!(p, Packet::CommandResult { sequence, .. } if *sequence == wanted),
                )
                .await
            {
                Packet::CommandResult { result, .. } => result,
                _ => unreachable!(),
            }
        }
    }

    async fn start_server(capacity: usize) -> SocketAddr {
        let config = ServerConfig {
            bind_addr: "127.0.0.1:0".to_string(),
            tick_duration: Duration::from_millis(20),
            seed: Some(9),
            rules: RuleSet {
                capacity,
                ..RuleSet::default()
            },
            ..ServerConfig::default()
        };
        let mut server = Server::new(config).await.unwrap();
        let addr = server.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = server.run().await;
        });
        addr
    }

    /// Full round over real UDP sockets
    #[tokio::test]
    async fn live_round_over_udp() {
        let server = start_server(2).await;
        let alice = TestPeer::connect("alice", server).await;
        let bob = TestPeer::connect("bob", server).await;

        alice.command(1, Command::Join).await;
        assert_eq!(alice.wait_for_result(1).await, Ok(()));
        bob.command(1, Command::Join).await;
        assert_eq!(bob.wait_for_result(1).await, Ok(()));

        let round = alice
            .wait_for_round(|r| r.status == RoundStatus::Ongoing)
            .await;
        let imposters: Vec<&UserId> = round
            .players
            .iter()
            .filter(|p| p.team == Team::Imposter)
            .map(|p| &p.id)
            .collect();
        assert_eq!(imposters.len(), 1);

        let (imposter, crew) = if imposters[0] == &id("alice") {
            (&alice, &bob)
        } else {
            (&bob, &alice)
        };

        crew.command(2, Command::Attack).await;
        assert_eq!(
            crew.wait_for_result(2).await,
            Err(CommandError::NotAnImposter)
        );

        imposter.command(2, Command::Attack).await;
        assert_eq!(imposter.wait_for_result(2).await, Ok(()));

        let finished = crew
            .wait_for_round(|r| r.status == RoundStatus::ImposterWon)
            .await;
        assert_eq!(finished.bodies.len(), 1);
    }

    /// Joining a started round is rejected with a structured error
    #[tokio::test]
    async fn late_join_is_rejected() {
        let server = start_server(2).await;
        let alice = TestPeer::connect("alice", server).await;
        let bob = TestPeer::connect("bob", server).await;
        let carol = TestPeer::connect("carol", server).await;

        alice.command(1, Command::Join).await;
        assert_eq!(alice.wait_for_result(1).await, Ok(()));
        bob.command(1, Command::Join).await;
        assert_eq!(bob.wait_for_result(1).await, Ok(()));

        carol.command(1, Command::Join).await;
        assert_eq!(
            carol.wait_for_result(1).await,
            Err(CommandError::RoundNotAcceptingPlayers)
        );
    }

    /// Protocol mismatch is refused before any identity is bound
    #[tokio::test]
    async fn wrong_version_is_refused() {
        let server = start_server(2).await;
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let peer = TestPeer { socket, server };

        peer.send(&Packet::Connect {
            client_version: PROTOCOL_VERSION + 1,
            user_id: id("old"),
        })
        .await;

        let packet = peer
            .wait_for(|p| matches!(p, Packet::Disconnected { .. }))
            .await;
        match packet {
            Packet::Disconnected { reason } => assert_eq!(reason, "Protocol version mismatch"),
            _ => unreachable!(),
        }
    }
}
