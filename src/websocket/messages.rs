use serde::{Deserialize, Serialize};

use crate::{game::GameSnapshot, models::GameEvent};

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Start a new run at `level` (must be unlocked)
    StartGame {
        level: u32,
        #[serde(default)]
        categories: Option<Vec<String>>,
    },
    SelectTile {
        x: usize,
        y: usize,
    },
    Pause,
    Resume,
    NextLevel,
    ReplayLevel,
    Snapshot,
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    SessionCreated { session_id: String },
    Event { event: GameEvent },
    Snapshot { snapshot: GameSnapshot },
    Error { message: String },
}
