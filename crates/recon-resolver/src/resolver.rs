use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use recon_store::ContactRepository;
use recon_types::{ConsolidatedContact, IdentifyRequest, IdentifyResponse, Observation};
use tracing::{debug, info, warn};

use crate::config::{EmptyObservationPolicy, ResolverConfig};
use crate::error::{ResolveError, ResolveResult};
use crate::plan::{reconcile, Reconciliation};

/// Resolves contact observations into consolidated identities.
///
/// The resolver holds no mutable state of its own; it can be shared freely
/// between threads. All coordination between concurrent resolutions happens
/// in the repository's transactions.
#[derive(Clone)]
pub struct IdentityResolver {
    repository: Arc<dyn ContactRepository>,
    config: ResolverConfig,
}

impl IdentityResolver {
    pub fn new(repository: Arc<dyn ContactRepository>, config: ResolverConfig) -> Self {
        Self { repository, config }
    }

    /// The current configuration.
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolve one observation and return the consolidated identity it
    /// belongs to.
    ///
    /// Conflicted attempts are retried up to `max_retries` times before
    /// surfacing [`ResolveError::Conflict`]. Store failures are returned
    /// immediately.
    pub fn resolve(&self, observation: &Observation) -> ResolveResult<ConsolidatedContact> {
        self.reconcile(observation).map(|r| r.consolidated)
    }

    /// Like [`resolve`](Self::resolve), but reports what was written.
    pub fn reconcile(&self, observation: &Observation) -> ResolveResult<Reconciliation> {
        if observation.is_empty()
            && self.config.empty_observation == EmptyObservationPolicy::Reject
        {
            return Err(ResolveError::Validation(
                "at least one of email or phoneNumber is required".into(),
            ));
        }

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.attempt(observation) {
                Ok(result) => {
                    if !result.demoted.is_empty() {
                        info!(
                            primary = %result.consolidated.primary_contact_id,
                            demoted = ?result.demoted,
                            relinked = result.relinked.len(),
                            "merged identities"
                        );
                    }
                    debug!(attempt, inserted = ?result.inserted, "resolution committed");
                    return Ok(result);
                }
                Err(ResolveError::Store(err)) if err.is_conflict() => {
                    if attempt > self.config.max_retries {
                        return Err(ResolveError::Conflict {
                            attempts: attempt,
                            reason: err.to_string(),
                        });
                    }
                    warn!(attempt, error = %err, "resolution conflicted, retrying");
                    std::thread::sleep(self.backoff(attempt));
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Resolve a wire request into a wire response.
    pub fn identify(&self, request: IdentifyRequest) -> ResolveResult<IdentifyResponse> {
        self.resolve(&Observation::from(request))
            .map(IdentifyResponse::from)
    }

    fn attempt(&self, observation: &Observation) -> ResolveResult<Reconciliation> {
        let mut tx = self.repository.begin(self.config.transaction_timeout())?;
        let result = reconcile(tx.as_mut(), observation)?;
        tx.commit()?;
        Ok(result)
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let base = self.config.retry_backoff_ms;
        if base == 0 {
            return Duration::ZERO;
        }
        let jitter = rand::thread_rng().gen_range(0..=base);
        Duration::from_millis(base.saturating_mul(u64::from(attempt)) + jitter)
    }
}

impl std::fmt::Debug for IdentityResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityResolver")
            .field("config", &self.config)
            .finish()
    }
}
