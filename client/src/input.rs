//! Text command input with sequencing
//!
//! Stands in for pointer and keyboard wiring: each stdin line is parsed into
//! an action, and commands bound for the server get a fresh sequence number.

use shared::Command;
use thiserror::Error;

pub const HELP: &str = "commands: join | move <x> <y> | attack | status | quit";

#[derive(Debug, Clone, PartialEq)]
pub enum ClientAction {
    Send(Command),
    Status,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq)]
pub enum InputError {
    #[error("empty input")]
    Empty,
    #[error("unknown command '{0}'")]
    Unknown(String),
    #[error("usage: move <x> <y>")]
    MoveUsage,
    #[error("invalid coordinate '{0}'")]
    BadCoordinate(String),
}

pub fn parse_line(line: &str) -> Result<ClientAction, InputError> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Err(InputError::Empty);
    };

    let action = match verb.to_ascii_lowercase().as_str() {
        "join" | "j" => ClientAction::Send(Command::Join),
        "attack" | "a" | "kill" => ClientAction::Send(Command::Attack),
        "move" | "m" => {
            let x = parse_coordinate(words.next())?;
            let y = parse_coordinate(words.next())?;
            if words.next().is_some() {
                return Err(InputError::MoveUsage);
            }
            ClientAction::Send(Command::MoveTo { x, y })
        }
        "status" | "s" => ClientAction::Status,
        "help" | "?" => ClientAction::Help,
        "quit" | "exit" | "q" => ClientAction::Quit,
        other => return Err(InputError::Unknown(other.to_string())),
    };

    if !matches!(action, ClientAction::Send(Command::MoveTo { .. })) && words.next().is_some() {
        return Err(InputError::Unknown(line.trim().to_string()));
    }

    Ok(action)
}

fn parse_coordinate(word: Option<&str>) -> Result<f32, InputError> {
    let word = word.ok_or(InputError::MoveUsage)?;
    match word.parse::<f32>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(InputError::BadCoordinate(word.to_string())),
    }
}

/// Hands out increasing sequence numbers for outgoing commands.
pub struct InputManager {
    next_sequence: u32,
}

impl InputManager {
    pub fn new() -> Self {
        Self { next_sequence: 1 }
    }

    pub fn next_sequence(&mut self) -> u32 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        sequence
    }
}

impl Default for InputManager {
    fn default() -> Self {
        Self::new()
    }
}
