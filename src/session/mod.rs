//! Tick drivers: the authoritative host loop and the guest loop

pub mod client;
pub mod host;

pub use client::{ClientOutcome, ClientSession};
pub use host::{HostSession, Opponent};
