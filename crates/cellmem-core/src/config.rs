//! Logger configuration that downstream crates can serialize/deserialize.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// One-line reports instead of the three-line table.
    pub compact: bool,

    /// Run the reclamation hooks before the final readings. Turn this off
    /// when tracking leaks: reclamation hides retained memory.
    pub reclaim_before_reading: bool,

    /// Sampler sleep between polls.
    pub poll_interval_ms: u64,

    /// Wall-clock ceiling for one sampler run before it gives up on ever
    /// seeing the end boundary.
    pub max_sample_seconds: f64,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            compact: false,
            reclaim_before_reading: true,
            poll_interval_ms: 1,
            max_sample_seconds: 60.0,
        }
    }
}

impl LoggerConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `CELLMEM_COMPACT`: `1`/`true` for one-line reports
    /// - `CELLMEM_RECLAIM`: `0`/`false` to skip reclamation before final readings
    /// - `CELLMEM_POLL_INTERVAL_MS`: sampler poll interval
    /// - `CELLMEM_MAX_SAMPLE_SECONDS`: runaway ceiling for one sampler run
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(s) = std::env::var("CELLMEM_COMPACT") {
            if let Some(v) = parse_flag(&s) {
                cfg.compact = v;
            }
        }

        if let Ok(s) = std::env::var("CELLMEM_RECLAIM") {
            if let Some(v) = parse_flag(&s) {
                cfg.reclaim_before_reading = v;
            }
        }

        if let Ok(s) = std::env::var("CELLMEM_POLL_INTERVAL_MS") {
            if let Ok(v) = s.parse::<u64>() {
                cfg.poll_interval_ms = v;
            }
        }

        if let Ok(s) = std::env::var("CELLMEM_MAX_SAMPLE_SECONDS") {
            if let Ok(v) = s.parse::<f64>() {
                cfg.max_sample_seconds = v;
            }
        }

        cfg
    }

    /// Parse a YAML document; absent keys keep their defaults.
    pub fn from_yaml_str(src: &str) -> Result<Self> {
        let cfg: Self = serde_yaml::from_str(src)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(Error::Config("poll_interval_ms must be at least 1".into()));
        }
        if !self.max_sample_seconds.is_finite() || self.max_sample_seconds <= 0.0 {
            return Err(Error::Config(format!(
                "max_sample_seconds must be a positive number, got {}",
                self.max_sample_seconds
            )));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Iteration ceiling for one sampler run (at least one tick).
    pub fn max_iterations(&self) -> u64 {
        let poll_ms = self.poll_interval_ms.max(1) as f64;
        let ticks = (self.max_sample_seconds * 1000.0 / poll_ms).ceil();
        if ticks.is_finite() && ticks >= 1.0 {
            ticks as u64
        } else {
            1
        }
    }
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_sample_every_millisecond_for_a_minute() {
        let cfg = LoggerConfig::default();
        assert_eq!(cfg.poll_interval(), Duration::from_millis(1));
        assert_eq!(cfg.max_iterations(), 60_000);
        assert!(cfg.reclaim_before_reading);
        assert!(!cfg.compact);
    }

    // The only test in this crate touching these variables.
    #[test]
    fn env_overrides_and_ignores_garbage() {
        let vars = [
            "CELLMEM_COMPACT",
            "CELLMEM_RECLAIM",
            "CELLMEM_POLL_INTERVAL_MS",
            "CELLMEM_MAX_SAMPLE_SECONDS",
        ];

        std::env::set_var("CELLMEM_COMPACT", "yes");
        std::env::set_var("CELLMEM_RECLAIM", "off");
        std::env::set_var("CELLMEM_POLL_INTERVAL_MS", "5");
        std::env::set_var("CELLMEM_MAX_SAMPLE_SECONDS", "2.5");
        let cfg = LoggerConfig::from_env();
        assert!(cfg.compact);
        assert!(!cfg.reclaim_before_reading);
        assert_eq!(cfg.poll_interval_ms, 5);
        assert_eq!(cfg.max_sample_seconds, 2.5);

        std::env::set_var("CELLMEM_COMPACT", "maybe");
        std::env::set_var("CELLMEM_RECLAIM", "");
        std::env::set_var("CELLMEM_POLL_INTERVAL_MS", "-3");
        std::env::set_var("CELLMEM_MAX_SAMPLE_SECONDS", "a while");
        assert_eq!(LoggerConfig::from_env(), LoggerConfig::default());

        for var in vars {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn yaml_keeps_defaults_for_missing_keys() {
        let cfg = LoggerConfig::from_yaml_str("compact: true\npoll_interval_ms: 5\n").unwrap();
        assert!(cfg.compact);
        assert_eq!(cfg.poll_interval_ms, 5);
        assert!(cfg.reclaim_before_reading);
        assert_eq!(cfg.max_iterations(), 12_000);
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let err = LoggerConfig::from_yaml_str("poll_interval_ms: 0").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn non_positive_ceiling_is_rejected() {
        let cfg = LoggerConfig {
            max_sample_seconds: 0.0,
            ..LoggerConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn fractional_ceiling_rounds_up_to_whole_ticks() {
        let cfg = LoggerConfig {
            poll_interval_ms: 3,
            max_sample_seconds: 0.01,
            ..LoggerConfig::default()
        };
        assert_eq!(cfg.max_iterations(), 4);
    }

    #[test]
    fn flags_accept_common_spellings() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag("off"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
