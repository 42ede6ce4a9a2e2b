//! Gateway configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`).

use std::net::SocketAddr;

use crate::worker::WorkerSettings;

/// Top-level gateway configuration.
///
/// Loaded once at startup via [`GatewayConfig::from_env`].
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:3000`).
    pub listen_addr: SocketAddr,

    /// Shared secret for signing room access tokens.
    pub token_secret: String,

    /// Validity window of attendee tokens, in seconds.
    pub attendee_token_ttl_secs: u64,

    /// How long workers wait for source audio before going text-only.
    pub source_audio_wait_secs: u64,

    /// How long a draining worker may run before it is aborted.
    pub worker_drain_timeout_secs: u64,

    /// Connection attempts per worker before its language is reported
    /// failed.
    pub worker_start_attempts: u32,

    /// Base delay of the worker-start backoff, in milliseconds.
    pub worker_start_backoff_ms: u64,

    /// Capacity of the EventBus broadcast channel.
    pub event_bus_capacity: usize,

    /// Capacity of each room's data-channel broadcast.
    pub room_channel_capacity: usize,
}

impl GatewayConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to sensible defaults when a variable is not set.
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns an error if `LISTEN_ADDR` is set but cannot be parsed as
    /// a [`SocketAddr`], or if `TOKEN_SECRET` is shorter than 16 bytes.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();

        let listen_addr: SocketAddr = std::env::var("LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
            .parse()?;

        let token_secret = std::env::var("TOKEN_SECRET")
            .unwrap_or_else(|_| "babel-gateway-dev-secret".to_string());
        // HS256 signing rejects keys under 96 bits; require some margin.
        if token_secret.len() < 16 {
            return Err("TOKEN_SECRET must be at least 16 bytes".into());
        }

        let attendee_token_ttl_secs = parse_env("ATTENDEE_TOKEN_TTL_SECS", 7200);
        let source_audio_wait_secs = parse_env("SOURCE_AUDIO_WAIT_SECS", 30);
        let worker_drain_timeout_secs = parse_env("WORKER_DRAIN_TIMEOUT_SECS", 5);
        let worker_start_attempts = parse_env("WORKER_START_ATTEMPTS", 3);
        let worker_start_backoff_ms = parse_env("WORKER_START_BACKOFF_MS", 50);
        let event_bus_capacity = parse_env("EVENT_BUS_CAPACITY", 10_000);
        let room_channel_capacity = parse_env("ROOM_CHANNEL_CAPACITY", 1024);

        Ok(Self {
            listen_addr,
            token_secret,
            attendee_token_ttl_secs,
            source_audio_wait_secs,
            worker_drain_timeout_secs,
            worker_start_attempts,
            worker_start_backoff_ms,
            event_bus_capacity,
            room_channel_capacity,
        })
    }

    /// Worker tuning derived from the configuration.
    #[must_use]
    pub fn worker_settings(&self) -> WorkerSettings {
        WorkerSettings {
            start_attempts: self.worker_start_attempts,
            start_backoff: std::time::Duration::from_millis(self.worker_start_backoff_ms),
            drain_timeout: std::time::Duration::from_secs(self.worker_drain_timeout_secs),
            source_audio_wait: std::time::Duration::from_secs(self.source_audio_wait_secs),
            token_ttl_secs: 24 * 60 * 60,
        }
    }
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
