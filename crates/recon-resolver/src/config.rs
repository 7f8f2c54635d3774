use std::time::Duration;

use serde::{Deserialize, Serialize};

/// What to do with an observation that carries neither email nor phone.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyObservationPolicy {
    /// Refuse with [`ResolveError::Validation`](crate::ResolveError::Validation).
    #[default]
    Reject,
    /// Store a new primary with no email and no phone.
    CreatePrimary,
}

/// Configuration for the [`IdentityResolver`](crate::IdentityResolver).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Retries after a conflicted attempt before giving up.
    pub max_retries: u32,
    /// Upper bound on one attempt's transaction, in milliseconds.
    pub transaction_timeout_ms: u64,
    /// Base delay between conflicted attempts, in milliseconds. The delay
    /// grows linearly with the attempt number, plus random jitter up to the
    /// base.
    pub retry_backoff_ms: u64,
    pub empty_observation: EmptyObservationPolicy,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            transaction_timeout_ms: 5_000,
            retry_backoff_ms: 10,
            empty_observation: EmptyObservationPolicy::Reject,
        }
    }
}

impl ResolverConfig {
    pub fn transaction_timeout(&self) -> Duration {
        Duration::from_millis(self.transaction_timeout_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_empty_observation(mut self, policy: EmptyObservationPolicy) -> Self {
        self.empty_observation = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = ResolverConfig::default();
        assert_eq!(c.max_retries, 3);
        assert_eq!(c.transaction_timeout(), Duration::from_secs(5));
        assert_eq!(c.retry_backoff(), Duration::from_millis(10));
        assert_eq!(c.empty_observation, EmptyObservationPolicy::Reject);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let c: ResolverConfig =
            toml::from_str("max_retries = 8\nempty_observation = \"create_primary\"\n").unwrap();
        assert_eq!(c.max_retries, 8);
        assert_eq!(c.empty_observation, EmptyObservationPolicy::CreatePrimary);
        assert_eq!(c.transaction_timeout_ms, 5_000);
    }

    #[test]
    fn builders() {
        let c = ResolverConfig::default()
            .with_max_retries(0)
            .with_empty_observation(EmptyObservationPolicy::CreatePrimary);
        assert_eq!(c.max_retries, 0);
        assert_eq!(c.empty_observation, EmptyObservationPolicy::CreatePrimary);
    }
}
