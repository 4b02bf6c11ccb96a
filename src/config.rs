//! Server Configuration
//!
//! Runtime knobs are read from environment variables with sane defaults, so
//! the binary runs with no setup at all. Values that would break the tick and
//! autosave timers (zero rates, zero intervals) are clamped to the smallest
//! usable value rather than rejected.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::{
    DEFAULT_PORT, DEFAULT_SAVE_INTERVAL_MS, DEFAULT_SAVE_PATH, DEFAULT_TICK_RATE,
    DEFAULT_WORLD_SIZE,
};

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// TCP port the HTTP/WebSocket listener binds to.
    pub port: u16,
    /// Full-state broadcasts per second.
    pub tick_rate: u32,
    /// Side length of the square spawn area; spawns land in `[0, world_size)`.
    pub world_size: i64,
    /// Where the world save file lives.
    pub save_path: PathBuf,
    /// How often the registry is written to disk.
    pub save_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            tick_rate: DEFAULT_TICK_RATE,
            world_size: DEFAULT_WORLD_SIZE,
            save_path: PathBuf::from(DEFAULT_SAVE_PATH),
            save_interval: Duration::from_millis(DEFAULT_SAVE_INTERVAL_MS),
        }
    }
}

impl ServerConfig {
    /// Create config from environment variables.
    ///
    /// Recognized variables: `PORT`, `TICK_RATE`, `WORLD_SIZE`, `SAVE_PATH`,
    /// `SAVE_INTERVAL_MS`. Unset or unparseable values fall back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            port: env_parse("PORT").unwrap_or(defaults.port),
            tick_rate: env_parse::<u32>("TICK_RATE")
                .unwrap_or(defaults.tick_rate)
                .max(1),
            world_size: env_parse::<i64>("WORLD_SIZE")
                .unwrap_or(defaults.world_size)
                .max(1),
            save_path: std::env::var("SAVE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.save_path),
            save_interval: env_parse::<u64>("SAVE_INTERVAL_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.save_interval)
                .max(Duration::from_millis(1)),
        }
    }

    /// Time between broadcast ticks, derived from the tick rate.
    ///
    /// Never returns zero: rates above 1000 Hz collapse to a 1 ms period.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(u64::from(1000 / self.tick_rate.max(1)).max(1))
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_crate_constants() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.tick_rate, 10);
        assert_eq!(config.world_size, 100);
        assert_eq!(config.save_path, PathBuf::from("world.json"));
        assert_eq!(config.save_interval, Duration::from_secs(60));
    }

    #[test]
    fn tick_interval_from_rate() {
        let mut config = ServerConfig::default();
        assert_eq!(config.tick_interval(), Duration::from_millis(100));

        config.tick_rate = 50;
        assert_eq!(config.tick_interval(), Duration::from_millis(20));

        // Rates past 1000 Hz would truncate to zero; the timer still needs
        // a nonzero period.
        config.tick_rate = 4000;
        assert_eq!(config.tick_interval(), Duration::from_millis(1));
    }

    // Single test mutates all env vars so parallel test threads never race
    // on the same keys.
    #[test]
    fn from_env_overrides_and_fallbacks() {
        std::env::set_var("PORT", "9999");
        std::env::set_var("TICK_RATE", "30");
        std::env::set_var("WORLD_SIZE", "512");
        std::env::set_var("SAVE_PATH", "/tmp/arena-test.json");
        std::env::set_var("SAVE_INTERVAL_MS", "250");

        let config = ServerConfig::from_env();
        assert_eq!(config.port, 9999);
        assert_eq!(config.tick_rate, 30);
        assert_eq!(config.world_size, 512);
        assert_eq!(config.save_path, PathBuf::from("/tmp/arena-test.json"));
        assert_eq!(config.save_interval, Duration::from_millis(250));

        // Garbage values fall back to defaults, zeroes are clamped.
        std::env::set_var("PORT", "not-a-port");
        std::env::set_var("TICK_RATE", "0");
        std::env::set_var("WORLD_SIZE", "-5");
        std::env::set_var("SAVE_INTERVAL_MS", "0");

        let config = ServerConfig::from_env();
        assert_eq!(config.port, 8080);
        assert_eq!(config.tick_rate, 1);
        assert_eq!(config.world_size, 1);
        assert_eq!(config.save_interval, Duration::from_millis(1));

        std::env::remove_var("PORT");
        std::env::remove_var("TICK_RATE");
        std::env::remove_var("WORLD_SIZE");
        std::env::remove_var("SAVE_PATH");
        std::env::remove_var("SAVE_INTERVAL_MS");
    }
}
