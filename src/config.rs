use std::time::Duration;

use crate::protocol::{GameIdentity, ObserverCredentials};

/// Delay used when the observer gives no hint about the next chunk
pub const DEFAULT_FALLBACK_DELAY: Duration = Duration::from_millis(10_000);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required variable {0}")]
    Missing(&'static str),
    #[error("Invalid value '{value}' for {name}")]
    Invalid { name: &'static str, value: String },
    #[error("{0}")]
    OutOfRange(&'static str),
}

/// Spectator session configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpectatorConfig {
    /// Delay between cycles when `nextAvailableChunk` is unknown
    pub fallback_delay: Duration,
    /// Per-request timeout for the HTTP gateway
    pub request_timeout: Duration,
    /// Cap on simultaneous item fetches per cycle (0 = unbounded)
    pub max_concurrent_fetches: usize,
    /// Fetch the observer protocol version before metadata
    pub fetch_version: bool,
    /// Subtract the time spent in a cycle from the next delay
    pub compensate_cycle_time: bool,
    /// Port for the metrics endpoint (disabled when unset)
    pub metrics_port: Option<u16>,
}

impl Default for SpectatorConfig {
    fn default() -> Self {
        Self {
            fallback_delay: DEFAULT_FALLBACK_DELAY,
            request_timeout: Duration::from_secs(30),
            max_concurrent_fetches: 0,
            fetch_version: true,
            compensate_cycle_time: false,
            metrics_port: None,
        }
    }
}

impl SpectatorConfig {
    /// Load config from environment or use defaults
    pub fn load_or_default() -> Self {
        Self::load_from(|name| std::env::var(name).ok())
    }

    /// Load config through an arbitrary variable lookup
    pub fn load_from(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(delay) = lookup("SPECTATOR_FALLBACK_DELAY_MS") {
            match delay.parse::<u64>() {
                Ok(parsed) if parsed > 0 => config.fallback_delay = Duration::from_millis(parsed),
                Ok(_) => tracing::warn!("SPECTATOR_FALLBACK_DELAY_MS must be > 0, using default"),
                Err(_) => tracing::warn!(
                    "Invalid SPECTATOR_FALLBACK_DELAY_MS '{}', using default",
                    delay
                ),
            }
        }

        if let Some(timeout) = lookup("SPECTATOR_REQUEST_TIMEOUT_SECS") {
            match timeout.parse::<u64>() {
                Ok(parsed) if parsed > 0 => config.request_timeout = Duration::from_secs(parsed),
                Ok(_) => tracing::warn!("SPECTATOR_REQUEST_TIMEOUT_SECS must be > 0, using default"),
                Err(_) => tracing::warn!(
                    "Invalid SPECTATOR_REQUEST_TIMEOUT_SECS '{}', using default",
                    timeout
                ),
            }
        }

        if let Some(limit) = lookup("SPECTATOR_MAX_CONCURRENT_FETCHES") {
            if let Ok(parsed) = limit.parse::<usize>() {
                config.max_concurrent_fetches = parsed;
            } else {
                tracing::warn!(
                    "Invalid SPECTATOR_MAX_CONCURRENT_FETCHES '{}', using default",
                    limit
                );
            }
        }

        if let Some(flag) = lookup("SPECTATOR_FETCH_VERSION") {
            match parse_bool(&flag) {
                Some(parsed) => config.fetch_version = parsed,
                None => tracing::warn!("Invalid SPECTATOR_FETCH_VERSION '{}', using default", flag),
            }
        }

        if let Some(flag) = lookup("SPECTATOR_COMPENSATE_CYCLE_TIME") {
            match parse_bool(&flag) {
                Some(parsed) => config.compensate_cycle_time = parsed,
                None => tracing::warn!(
                    "Invalid SPECTATOR_COMPENSATE_CYCLE_TIME '{}', using default",
                    flag
                ),
            }
        }

        if let Some(port) = lookup("METRICS_PORT") {
            match port.parse::<u16>() {
                Ok(parsed) if parsed > 0 => config.metrics_port = Some(parsed),
                _ => tracing::warn!("Invalid METRICS_PORT '{}', metrics server disabled", port),
            }
        }

        config
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fallback_delay.is_zero() {
            return Err(ConfigError::OutOfRange("fallback_delay must be greater than zero"));
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::OutOfRange("request_timeout must be greater than zero"));
        }
        if self.metrics_port == Some(0) {
            return Err(ConfigError::OutOfRange("metrics_port cannot be 0"));
        }
        Ok(())
    }
}

/// Which game the binary should follow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetConfig {
    pub platform_id: String,
    pub credentials: ObserverCredentials,
}

impl TargetConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load_from(|name| std::env::var(name).ok())
    }

    pub fn load_from(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |name: &'static str| lookup(name).ok_or(ConfigError::Missing(name));

        let platform_id = required("SPECTATOR_PLATFORM_ID")?;
        let game_id = required("SPECTATOR_GAME_ID")?;
        let game_server_address = required("SPECTATOR_SERVER_ADDRESS")?;
        let port = required("SPECTATOR_SERVER_PORT")?;

        let game_id = game_id.parse::<u64>().map_err(|_| ConfigError::Invalid {
            name: "SPECTATOR_GAME_ID",
            value: game_id.clone(),
        })?;
        let observer_server_port = match port.parse::<u16>() {
            Ok(parsed) if parsed > 0 => parsed,
            _ => {
                return Err(ConfigError::Invalid {
                    name: "SPECTATOR_SERVER_PORT",
                    value: port,
                })
            }
        };

        Ok(Self {
            platform_id,
            credentials: ObserverCredentials {
                game_id,
                game_server_address,
                observer_server_port,
            },
        })
    }

    pub fn identity(&self) -> GameIdentity {
        GameIdentity::from_credentials(self.platform_id.clone(), &self.credentials)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = SpectatorConfig::default();
        assert_eq!(config.fallback_delay, Duration::from_millis(10_000));
        assert_eq!(config.max_concurrent_fetches, 0);
        assert!(config.fetch_version);
        assert!(!config.compensate_cycle_time);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_overrides() {
        let config = SpectatorConfig::load_from(lookup(&[
            ("SPECTATOR_FALLBACK_DELAY_MS", "2500"),
            ("SPECTATOR_MAX_CONCURRENT_FETCHES", "8"),
            ("SPECTATOR_FETCH_VERSION", "false"),
            ("SPECTATOR_COMPENSATE_CYCLE_TIME", "yes"),
            ("METRICS_PORT", "9100"),
        ]));

        assert_eq!(config.fallback_delay, Duration::from_millis(2500));
        assert_eq!(config.max_concurrent_fetches, 8);
        assert!(!config.fetch_version);
        assert!(config.compensate_cycle_time);
        assert_eq!(config.metrics_port, Some(9100));
    }

    #[test]
    fn test_invalid_values_keep_defaults() {
        let config = SpectatorConfig::load_from(lookup(&[
            ("SPECTATOR_FALLBACK_DELAY_MS", "0"),
            ("SPECTATOR_REQUEST_TIMEOUT_SECS", "soon"),
            ("SPECTATOR_FETCH_VERSION", "maybe"),
            ("METRICS_PORT", "99999"),
        ]));

        assert_eq!(config, SpectatorConfig::default());
    }

    #[test]
    fn test_load_or_default() {
        let config = SpectatorConfig::load_or_default();
        assert!(!config.fallback_delay.is_zero());
    }

    #[test]
    fn test_validate_rejects_zero_delay() {
        let config = SpectatorConfig {
            fallback_delay: Duration::ZERO,
            ..SpectatorConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_target_config() {
        let target = TargetConfig::load_from(lookup(&[
            ("SPECTATOR_PLATFORM_ID", "KR"),
            ("SPECTATOR_GAME_ID", "123456"),
            ("SPECTATOR_SERVER_ADDRESS", "10.0.0.5"),
            ("SPECTATOR_SERVER_PORT", "80"),
        ]))
        .unwrap();

        assert_eq!(target.credentials.game_id, 123456);
        assert_eq!(
            target.identity().base_url(),
            "http://10.0.0.5:80/observer-mode/rest/consumer"
        );
    }

    #[test]
    fn test_target_config_missing_and_invalid() {
        let missing = TargetConfig::load_from(lookup(&[("SPECTATOR_PLATFORM_ID", "KR")]));
        assert_eq!(missing, Err(ConfigError::Missing("SPECTATOR_GAME_ID")));

        let invalid = TargetConfig::load_from(lookup(&[
            ("SPECTATOR_PLATFORM_ID", "KR"),
            ("SPECTATOR_GAME_ID", "abc"),
            ("SPECTATOR_SERVER_ADDRESS", "10.0.0.5"),
            ("SPECTATOR_SERVER_PORT", "80"),
        ]));
        assert!(matches!(invalid, Err(ConfigError::Invalid { name: "SPECTATOR_GAME_ID", .. })));
    }
}
