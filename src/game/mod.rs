//! Game simulation modules

pub mod bot;
pub mod combat;
pub mod entity;
pub mod input;
pub mod loot;
pub mod math;
pub mod physics;
pub mod world;
pub mod zone;

pub use bot::BotController;
pub use input::InputBuffer;
pub use world::{World, WorldConfig, BOT_ID, GUEST_ID, HOST_ID};
