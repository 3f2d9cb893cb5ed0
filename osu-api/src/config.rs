//! Client configuration
//!
//! All settings have defaults matching the public osu! API:
//!
//! | Setting           | Default                    |
//! |-------------------|----------------------------|
//! | `rate_per_minute` | 60                         |
//! | `poll_interval`   | 1 second                   |
//! | `audit_log`       | disabled                   |
//! | `verbosity`       | normal                     |
//! | `base_url`        | `https://osu.ppy.sh/api/`  |
//! | `request_timeout` | 30 seconds                 |
//!
//! The struct deserializes from any serde format; durations are given in
//! (fractional) seconds.

use serde::{Deserialize, Deserializer};
use std::path::PathBuf;
use std::time::Duration;

use crate::diagnostics::Verbosity;

/// Documented ceiling of the remote service, calls per minute
pub const MAX_DOCUMENTED_RATE: i64 = 60;

pub const DEFAULT_BASE_URL: &str = "https://osu.ppy.sh/api/";

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    /// Rate gate capacity: calls allowed in any rolling minute
    pub rate_per_minute: i64,
    /// How often a waiting call re-checks a full gate
    #[serde(deserialize_with = "duration_from_secs")]
    pub poll_interval: Duration,
    /// Where to append the call audit log, if anywhere
    pub audit_log: Option<PathBuf>,
    /// Which diagnostics the default sink emits
    pub verbosity: Verbosity,
    /// Root every endpoint path is appended to
    pub base_url: String,
    /// Transport timeout for a single request
    #[serde(deserialize_with = "duration_from_secs")]
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            rate_per_minute: MAX_DOCUMENTED_RATE,
            poll_interval: Duration::from_secs(1),
            audit_log: None,
            verbosity: Verbosity::Normal,
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl ClientConfig {
    /// Rate gate capacity to use, plus any warnings about the configured value
    ///
    /// Values of zero or below become 1. Values above the documented ceiling
    /// are kept as given.
    pub fn effective_rate(&self) -> (usize, Vec<String>) {
        let rate = self.rate_per_minute;
        if rate <= 0 {
            let warning = format!("rate_per_minute {rate} is not positive, using 1");
            return (1, vec![warning]);
        }

        let mut warnings = Vec::new();
        if rate > MAX_DOCUMENTED_RATE {
            warnings.push(format!(
                "rate_per_minute {rate} exceeds the documented limit of {MAX_DOCUMENTED_RATE}, \
                 the server may reject calls"
            ));
        }
        (usize::try_from(rate).unwrap_or(usize::MAX), warnings)
    }

    /// Base URL with exactly one trailing slash
    pub fn normalized_base_url(&self) -> String {
        format!("{}/", self.base_url.trim_end_matches('/'))
    }
}

fn duration_from_secs<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let secs = f64::deserialize(deserializer)?;
    Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.rate_per_minute, 60);
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert!(config.audit_log.is_none());
        assert_eq!(config.effective_rate(), (60, vec![]));
    }

    #[test]
    fn test_non_positive_rate_is_coerced() {
        for rate in [0, -5] {
            let config = ClientConfig {
                rate_per_minute: rate,
                ..Default::default()
            };
            let (capacity, warnings) = config.effective_rate();
            assert_eq!(capacity, 1);
            assert_eq!(warnings.len(), 1);
        }
    }

    #[test]
    fn test_rate_above_ceiling_is_kept_with_warning() {
        let config = ClientConfig {
            rate_per_minute: 1200,
            ..Default::default()
        };
        let (capacity, warnings) = config.effective_rate();
        assert_eq!(capacity, 1200);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("1200"));
    }

    #[test]
    fn test_deserialize_partial_config() {
        let config: ClientConfig = serde_json::from_str(
            r#"{"rate_per_minute": 30, "poll_interval": 0.25, "verbosity": "verbose"}"#,
        )
        .unwrap();
        assert_eq!(config.rate_per_minute, 30);
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert_eq!(config.verbosity, Verbosity::Verbose);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_base_url_normalization() {
        let config = ClientConfig {
            base_url: "http://127.0.0.1:8080/api//".to_string(),
            ..Default::default()
        };
        assert_eq!(config.normalized_base_url(), "http://127.0.0.1:8080/api/");
    }
}
