//! Peer protocol message definitions
//! These are the typed payloads carried inside the wire envelope

use serde::{Deserialize, Serialize};

use crate::game::entity::{Bullet, LootItem, Player, PlayerStats, Wall};
use crate::game::math::Vector2;

/// Envelope `type` tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageType {
    Init,
    Input,
    State,
    GameOver,
    Ping,
}

/// Match bootstrap, sent once by the host. Must arrive exact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitPackage {
    pub walls: Vec<Wall>,
    pub player_start: Vector2,
    pub enemy_start: Vector2,
    pub seed: u64,
}

/// Client input for the current tick
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct InputPackage {
    /// Movement intent
    #[serde(rename = "move")]
    pub movement: Vector2,
    /// Aim direction
    pub aim: Vector2,
    pub sprint: bool,
    pub fire: bool,
    /// Optional on the wire for older senders
    #[serde(default)]
    pub dash: bool,
    /// Facing angle resolved by the sender (radians)
    pub angle: f32,
}

/// Full authoritative world state. Index 0 of `players` is the host.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StatePackage {
    pub players: Vec<Player>,
    pub bullets: Vec<Bullet>,
    pub loot: Vec<LootItem>,
    pub zone_radius: f32,
    pub time_remaining: f32,
}

/// Why the match ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameOverReason {
    /// A player reached zero health
    Elimination,
    /// The match clock ran out
    TimeUp,
    /// The peer left mid-match
    Forfeit,
}

/// End-of-match stats for one participant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSummary {
    pub id: String,
    pub hp: f32,
    pub stats: PlayerStats,
}

/// Match outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameOverPackage {
    /// None on a draw
    pub winner_id: Option<String>,
    pub loser_id: Option<String>,
    pub reason: GameOverReason,
    pub duration_secs: f32,
    pub players: Vec<PlayerSummary>,
}

/// Liveness check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PingPackage {
    /// Sender's unix millis
    pub sent_at: u64,
    /// Set on the reply so the original sender can measure round trip
    #[serde(default)]
    pub echo: bool,
}

/// Tagged union of every message, keyed by [`MessageType`]
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Init(InitPackage),
    Input(InputPackage),
    State(StatePackage),
    GameOver(GameOverPackage),
    Ping(PingPackage),
}

impl Message {
    pub fn kind(&self) -> MessageType {
        match self {
            Message::Init(_) => MessageType::Init,
            Message::Input(_) => MessageType::Input,
            Message::State(_) => MessageType::State,
            Message::GameOver(_) => MessageType::GameOver,
            Message::Ping(_) => MessageType::Ping,
        }
    }
}
