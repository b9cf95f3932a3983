//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

use crate::game::world::DEFAULT_MATCH_SECS;

/// Which side of the match this process plays
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    /// Listen for a guest and run the authoritative simulation
    Host,
    /// Dial a host and follow its snapshots
    Client,
    /// Host against a local bot, no network
    Practice,
}

impl FromStr for Role {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "host" => Ok(Role::Host),
            "client" | "guest" => Ok(Role::Client),
            "practice" | "bot" => Ok(Role::Practice),
            _ => Err(ConfigError::Invalid("ARENA_ROLE")),
        }
    }
}

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    pub role: Role,
    /// Listener binding address (host role)
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Requested room code; generated when absent
    pub room: Option<String>,
    /// Host peer id to dial (client role)
    pub remote: Option<String>,

    /// Arena seed; random when absent
    pub seed: u64,
    pub match_secs: f32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let role = match var("ARENA_ROLE") {
            Some(role) => role.parse()?,
            None => Role::Host,
        };

        // PORT wins over SERVER_ADDR so hosted runtimes can inject it
        let server_addr = if let Some(port) = var("PORT") {
            format!("0.0.0.0:{}", port)
        } else {
            var("SERVER_ADDR").unwrap_or_else(|| "0.0.0.0:7777".to_string())
        };

        let remote = var("ARENA_REMOTE").filter(|r| !r.trim().is_empty());
        if role == Role::Client && remote.is_none() {
            return Err(ConfigError::Missing("ARENA_REMOTE"));
        }

        let seed = match var("ARENA_SEED") {
            Some(seed) => seed
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid("ARENA_SEED"))?,
            None => rand::random(),
        };

        let match_secs = match var("ARENA_MATCH_SECS") {
            Some(secs) => secs
                .trim()
                .parse::<f32>()
                .ok()
                .filter(|s| s.is_finite() && *s > 0.0)
                .ok_or(ConfigError::Invalid("ARENA_MATCH_SECS"))?,
            None => DEFAULT_MATCH_SECS,
        };

        Ok(Self {
            role,
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,
            log_level: var("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            room: var("ARENA_ROOM").filter(|r| !r.trim().is_empty()),
            remote,
            seed,
            match_secs,
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_to_host() {
        let config = load(&[]).unwrap();
        assert_eq!(config.role, Role::Host);
        assert_eq!(config.server_addr.port(), 7777);
        assert_eq!(config.match_secs, DEFAULT_MATCH_SECS);
        assert_eq!(config.log_level, "info");
        assert!(config.room.is_none());
    }

    #[test]
    fn port_overrides_server_addr() {
        let config = load(&[("PORT", "9000"), ("SERVER_ADDR", "127.0.0.1:1")]).unwrap();
        assert_eq!(config.server_addr.port(), 9000);
    }

    #[test]
    fn client_requires_remote() {
        let err = load(&[("ARENA_ROLE", "client")]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("ARENA_REMOTE")));

        let config = load(&[
            ("ARENA_ROLE", "client"),
            ("ARENA_REMOTE", "ABCD1234@127.0.0.1:7777"),
        ])
        .unwrap();
        assert_eq!(config.role, Role::Client);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            load(&[("ARENA_ROLE", "spectator")]),
            Err(ConfigError::Invalid("ARENA_ROLE"))
        ));
        assert!(matches!(
            load(&[("ARENA_SEED", "-3")]),
            Err(ConfigError::Invalid("ARENA_SEED"))
        ));
        assert!(matches!(
            load(&[("ARENA_MATCH_SECS", "0")]),
            Err(ConfigError::Invalid("ARENA_MATCH_SECS"))
        ));
        assert!(matches!(
            load(&[("SERVER_ADDR", "nowhere")]),
            Err(ConfigError::InvalidAddress)
        ));
    }

    #[test]
    fn explicit_seed_is_used() {
        let config = load(&[("ARENA_SEED", "12345"), ("ARENA_ROLE", "practice")]).unwrap();
        assert_eq!(config.seed, 12345);
        assert_eq!(config.role, Role::Practice);
    }
}
