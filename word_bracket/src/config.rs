//! Engine tuning knobs.

use std::env;

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Attempts made for a compare-and-swap write before a conflict surfaces
    pub max_cas_retries: u32,

    /// How long a challenge stays joinable, in hours
    pub challenge_ttl_hours: i64,

    /// Interval between scheduler sweeps, in seconds
    pub tick_interval_secs: u64,
}

impl EngineConfig {
    /// Create configuration from environment variables
    ///
    /// Expected environment variables:
    /// - `MAX_CAS_RETRIES`: CAS attempts per write (default: 5)
    /// - `CHALLENGE_TTL_HOURS`: challenge lifetime (default: 24)
    /// - `TICK_INTERVAL_SECS`: scheduler sweep interval (default: 15)
    ///
    /// Unparseable values fall back to the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_cas_retries: env::var("MAX_CAS_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_cas_retries),
            challenge_ttl_hours: env::var("CHALLENGE_TTL_HOURS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.challenge_ttl_hours),
            tick_interval_secs: env::var("TICK_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.tick_interval_secs),
        }
    }

    /// Challenge lifetime as a duration
    pub fn challenge_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.challenge_ttl_hours)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_cas_retries: 5,
            challenge_ttl_hours: 24,
            tick_interval_secs: 15,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_engine_config() {
        let config = EngineConfig::default();
        assert_eq!(config.max_cas_retries, 5);
        assert_eq!(config.challenge_ttl(), chrono::Duration::hours(24));
        assert_eq!(config.tick_interval_secs, 15);
    }
}
