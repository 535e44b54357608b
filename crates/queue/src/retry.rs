//! Per-job retry policy.

use std::time::Duration;

use herald_common::config::RetrySettings;
use serde::{Deserialize, Serialize};

/// Delay between attempts of a failed job.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Backoff {
    /// Same delay before every retry.
    Fixed {
        #[serde(rename = "delayMs", with = "millis")]
        delay: Duration,
    },
    /// Delay multiplied on every retry, capped at `max`.
    Exponential {
        #[serde(rename = "initialMs", with = "millis")]
        initial: Duration,
        #[serde(rename = "maxMs", with = "millis")]
        max: Duration,
        multiplier: f64,
    },
}

impl Default for Backoff {
    fn default() -> Self {
        Self::Fixed {
            delay: Duration::ZERO,
        }
    }
}

impl Backoff {
    /// Delay before the retry that follows `attempt` (0-indexed) failures.
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        match *self {
            Self::Fixed { delay } => delay,
            Self::Exponential {
                initial,
                max,
                multiplier,
            } => {
                let secs = initial.as_secs_f64() * multiplier.powi(attempt.min(64) as i32);
                if !secs.is_finite() || secs >= max.as_secs_f64() {
                    max
                } else {
                    Duration::from_secs_f64(secs)
                }
            }
        }
    }

    /// Whether a job that has used `attempts_made` of `attempts` may run again.
    #[must_use]
    pub const fn should_retry(attempts_made: u32, attempts: u32) -> bool {
        attempts_made.saturating_add(1) < attempts
    }
}

impl From<RetrySettings> for Backoff {
    fn from(settings: RetrySettings) -> Self {
        Self::Fixed {
            delay: settings.backoff(),
        }
    }
}

/// `Duration` as integer milliseconds.
pub(crate) mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::cast_possible_truncation)]
    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// `Option<Duration>` as integer milliseconds.
pub(crate) mod opt_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::ref_option, clippy::cast_possible_truncation)]
    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => serializer.serialize_some(&(d.as_millis() as u64)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Option::<u64>::deserialize(deserializer).map(|v| v.map(Duration::from_millis))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_backoff() {
        let backoff = Backoff::Fixed {
            delay: Duration::from_secs(10),
        };
        assert_eq!(backoff.delay_for_attempt(0), Duration::from_secs(10));
        assert_eq!(backoff.delay_for_attempt(4), Duration::from_secs(10));
    }

    #[test]
    fn test_exponential_backoff() {
        let backoff = Backoff::Exponential {
            initial: Duration::from_secs(60),
            max: Duration::from_secs(3600),
            multiplier: 2.0,
        };

        assert_eq!(backoff.delay_for_attempt(0), Duration::from_secs(60));
        assert_eq!(backoff.delay_for_attempt(1), Duration::from_secs(120));
        assert_eq!(backoff.delay_for_attempt(3), Duration::from_secs(480));
        // Capped
        assert_eq!(backoff.delay_for_attempt(10), Duration::from_secs(3600));
        assert_eq!(backoff.delay_for_attempt(u32::MAX), Duration::from_secs(3600));
    }

    #[test]
    fn test_should_retry() {
        // 3 attempts: the first run plus two retries
        assert!(Backoff::should_retry(0, 3));
        assert!(Backoff::should_retry(1, 3));
        assert!(!Backoff::should_retry(2, 3));
        assert!(!Backoff::should_retry(0, 1));
        assert!(!Backoff::should_retry(0, 0));
    }

    #[test]
    fn test_wire_format() {
        let backoff = Backoff::Fixed {
            delay: Duration::from_secs(5),
        };
        let json = serde_json::to_value(backoff).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "fixed", "delayMs": 5000 }));
        assert_eq!(serde_json::from_value::<Backoff>(json).unwrap(), backoff);
    }

    #[test]
    fn test_from_retry_settings() {
        let backoff = Backoff::from(RetrySettings {
            attempts: 5,
            backoff_ms: 15_000,
        });
        assert_eq!(backoff.delay_for_attempt(2), Duration::from_secs(15));
    }
}
