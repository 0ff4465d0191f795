//! Configuration utilities (server URL, access token, timings, env vars)

use std::env;
use std::time::Duration;

use crate::error::ClientError;

const DEFAULT_API_URL: &str = "http://localhost:8000/api";

/// Connection settings for the game server.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_url: String,
    pub access_token: String,
    pub poll_interval: Duration,
    pub http_timeout: Duration,
}

impl ClientConfig {
    /// Build the configuration from the process environment.
    ///
    /// `BOARD_ACCESS_TOKEN` is required, everything else has a default.
    pub fn from_env() -> Result<Self, ClientError> {
        let access_token = env::var("BOARD_ACCESS_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or(ClientError::MissingConfig("BOARD_ACCESS_TOKEN"))?;
        Ok(Self {
            api_url: api_url(),
            access_token,
            poll_interval: millis_var("BOARD_POLL_INTERVAL_MS", 5000),
            http_timeout: millis_var("BOARD_HTTP_TIMEOUT_MS", 15000),
        })
    }
}

/// Base URL of the game API.
///
/// Reads `BOARD_API_URL` or falls back to a local dev server. Trailing
/// slashes are stripped so paths can be appended verbatim.
pub fn api_url() -> String {
    env::var("BOARD_API_URL")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_API_URL.to_string())
        .trim_end_matches('/')
        .to_string()
}

fn millis_var(name: &str, default: u64) -> Duration {
    let ms = env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default);
    Duration::from_millis(ms)
}

/// Animation and UI timing constants.
#[derive(Debug, Clone)]
pub struct Timings {
    pub dice_shrink: Duration,
    pub dice_spin: Duration,
    pub dice_grow: Duration,
    /// How long the revealed roll stays on screen.
    pub dice_reveal: Duration,
    pub hop: Duration,
    pub train_lift: Duration,
    pub train_slide: Duration,
    pub train_ride: Duration,
    pub train_release: Duration,
    pub train_settle: Duration,
    pub relocate: Duration,
    pub card_roll: Duration,
    pub card_reveal: Duration,
    pub error_toast: Duration,
    pub frame: Duration,
}

impl Timings {
    /// Minimum time between starting a roll and revealing its result.
    pub fn dice_floor(&self) -> Duration {
        self.dice_shrink + self.dice_spin + self.dice_grow
    }

    /// Total duration of a train ride animation.
    pub fn train_total(&self) -> Duration {
        self.train_lift + self.train_slide + self.train_ride + self.train_release + self.train_settle
    }
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            dice_shrink: Duration::from_millis(500),
            dice_spin: Duration::from_millis(1000),
            dice_grow: Duration::from_millis(500),
            dice_reveal: Duration::from_millis(2000),
            hop: Duration::from_millis(600),
            train_lift: Duration::from_millis(300),
            train_slide: Duration::from_millis(400),
            train_ride: Duration::from_millis(2500),
            train_release: Duration::from_millis(300),
            train_settle: Duration::from_millis(400),
            relocate: Duration::from_millis(900),
            card_roll: Duration::from_millis(4000),
            card_reveal: Duration::from_millis(1500),
            error_toast: Duration::from_millis(5000),
            frame: Duration::from_millis(16),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dice_floor_is_sum_of_phases() {
        let t = Timings::default();
        assert_eq!(t.dice_floor(), Duration::from_millis(2000));
        assert!(t.train_total() > t.hop * 5);
    }
}
