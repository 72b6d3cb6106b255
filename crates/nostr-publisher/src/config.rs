use std::env;
use std::time::Duration;

use crate::Error;

const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Relays to publish to and how long to wait on each.
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    pub relays: Vec<String>,
    /// Upper bound on connecting to, and on sending to, a single relay.
    pub timeout: Duration,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            relays: Vec::new(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl PublisherConfig {
    pub fn new(relays: Vec<String>) -> Self {
        Self {
            relays,
            ..Self::default()
        }
    }

    /// Read `NOSTR_RELAYS` (comma or whitespace separated, required) and
    /// `NOSTR_PUBLISH_TIMEOUT_SECS` (optional).
    pub fn from_env() -> Result<Self, Error> {
        let relays = env::var("NOSTR_RELAYS")
            .map(|value| parse_relays(&value))
            .unwrap_or_default();
        if relays.is_empty() {
            return Err(Error::MissingEnv("NOSTR_RELAYS"));
        }

        let timeout = match env::var("NOSTR_PUBLISH_TIMEOUT_SECS") {
            Ok(value) => Duration::from_secs(parse_number("NOSTR_PUBLISH_TIMEOUT_SECS", &value)?),
            Err(_) => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        Ok(Self { relays, timeout })
    }
}

/// Bounded exponential backoff for whole publication attempts.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Backoff multiplier for each retry.
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_delay: Duration::from_secs(3),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Defaults, with `NOSTR_PUBLISH_MAX_ATTEMPTS` applied when set.
    pub fn from_env() -> Result<Self, Error> {
        let mut policy = Self::default();
        if let Ok(value) = env::var("NOSTR_PUBLISH_MAX_ATTEMPTS") {
            policy.max_attempts = parse_number("NOSTR_PUBLISH_MAX_ATTEMPTS", &value)? as u32;
        }
        Ok(policy)
    }

    /// Delay to wait after `attempt` failed attempts (0-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay_ms = self.initial_delay.as_millis() as f64
            * self.backoff_multiplier.powi(attempt as i32);
        let delay = Duration::from_millis(delay_ms as u64);
        delay.min(self.max_delay)
    }

    /// Check if another attempt is allowed after `attempts` have been made.
    pub fn should_retry(&self, attempts: u32) -> bool {
        attempts < self.max_attempts
    }
}

pub(crate) fn parse_relays(value: &str) -> Vec<String> {
    value
        .split(',')
        .flat_map(|chunk| chunk.split_whitespace())
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}

fn parse_number(name: &'static str, value: &str) -> Result<u64, Error> {
    value.trim().parse().map_err(|err| Error::InvalidConfig {
        name,
        message: format!("{value:?}: {err}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_relays() {
        assert_eq!(
            parse_relays("wss://a.example, wss://b.example\nwss://c.example,,"),
            vec!["wss://a.example", "wss://b.example", "wss://c.example"]
        );
        assert!(parse_relays(" , ").is_empty());
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(300),
            backoff_multiplier: 2.0,
        };

        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(300));
        assert_eq!(policy.delay_for_attempt(10), Duration::from_millis(300));
    }

    #[test]
    fn test_should_retry_bounds_total_attempts() {
        let policy = RetryPolicy::default();
        assert!(policy.should_retry(1));
        assert!(policy.should_retry(2));
        assert!(!policy.should_retry(3));
    }

    #[test]
    fn test_parse_number_rejects_garbage() {
        assert!(matches!(
            parse_number("X", "ten"),
            Err(Error::InvalidConfig { name: "X", .. })
        ));
        assert_eq!(parse_number("X", " 7 ").unwrap(), 7);
    }
}
