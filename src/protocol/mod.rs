//! Peer protocol: typed messages, the wire envelope and state compaction

pub mod codec;
pub mod messages;
pub mod wire;

pub use codec::{validate_frame, Frame, MessageCodec, StateReceiver};
pub use messages::{
    GameOverPackage, GameOverReason, InitPackage, InputPackage, Message, PingPackage,
    PlayerSummary, StatePackage,
};
