//! Pending sign requests keyed by correlation id
//!
//! Flow:
//! 1. The bridge calls `register()` and gets a oneshot receiver
//! 2. The bridge posts the request with that correlation id
//! 3. The response handler calls `complete()` when the reply arrives
//! 4. `remove_expired()` rejects requests that outlived their timeout

use crate::error::ProviderError;
use crate::provider::messages::{CorrelationId, SignOutcome};
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::channel::oneshot;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

/// A request waiting for its response
struct PendingRequest {
    sender: oneshot::Sender<SignOutcome>,
    created_at: DateTime<Utc>,
    origin: String,
    timeout: Duration,
}

/// Counters for the pending request store
#[derive(Debug, Default)]
pub struct PendingStats {
    pub total_registered: AtomicU64,
    pub total_completed: AtomicU64,
    pub total_timeouts: AtomicU64,
    /// Cancelled, or the waiting caller went away
    pub total_cancelled: AtomicU64,
}

/// Correlation id to response channel
pub struct PendingRequestStore {
    pending: DashMap<CorrelationId, PendingRequest>,
    default_timeout: Duration,
    stats: PendingStats,
}

impl PendingRequestStore {
    pub fn new(default_timeout: Duration) -> Self {
        Self {
            pending: DashMap::new(),
            default_timeout,
            stats: PendingStats::default(),
        }
    }

    /// Register a pending request and get a receiver for its outcome.
    ///
    /// Generates a correlation id unless the caller supplies one. A supplied
    /// id that is already pending is rejected.
    pub fn register(
        &self,
        id: Option<CorrelationId>,
        origin: &str,
        timeout: Option<Duration>,
    ) -> Result<(CorrelationId, oneshot::Receiver<SignOutcome>), ProviderError> {
        let id = id.unwrap_or_default();
        let (tx, rx) = oneshot::channel();

        match self.pending.entry(id.clone()) {
            Entry::Occupied(_) => {
                return Err(ProviderError::bad_request(format!(
                    "Request {} is already pending",
                    id
                )))
            }
            Entry::Vacant(slot) => {
                slot.insert(PendingRequest {
                    sender: tx,
                    created_at: Utc::now(),
                    origin: origin.to_string(),
                    timeout: timeout.unwrap_or(self.default_timeout),
                });
            }
        }
        self.stats.total_registered.fetch_add(1, Ordering::Relaxed);

        debug!(correlation_id = %id, origin = origin, "Registered pending request");

        Ok((id, rx))
    }

    /// Deliver the outcome for a pending request.
    ///
    /// Returns false when the id is unknown, already completed, or the
    /// caller stopped waiting.
    pub fn complete(&self, id: &CorrelationId, outcome: SignOutcome) -> bool {
        let Some((_, pending)) = self.pending.remove(id) else {
            warn!(correlation_id = %id, "Response for unknown or expired correlation id");
            return false;
        };

        let elapsed_ms = (Utc::now() - pending.created_at).num_milliseconds();
        match pending.sender.send(outcome) {
            Ok(()) => {
                self.stats.total_completed.fetch_add(1, Ordering::Relaxed);
                debug!(
                    correlation_id = %id,
                    origin = pending.origin,
                    elapsed_ms = elapsed_ms,
                    "Completed pending request"
                );
                true
            }
            Err(_) => {
                self.stats.total_cancelled.fetch_add(1, Ordering::Relaxed);
                warn!(
                    correlation_id = %id,
                    origin = pending.origin,
                    "Dropping response, caller no longer waiting"
                );
                false
            }
        }
    }

    /// Reject requests older than their timeout with `MethodTimedOut`.
    ///
    /// Returns the number of requests removed.
    pub fn remove_expired(&self) -> usize {
        self.remove_expired_at(Utc::now())
    }

    /// `remove_expired` against an explicit clock
    pub fn remove_expired_at(&self, now: DateTime<Utc>) -> usize {
        let expired: Vec<CorrelationId> = self
            .pending
            .iter()
            .filter(|entry| {
                let elapsed = (now - entry.created_at).num_milliseconds();
                elapsed > entry.timeout.as_millis() as i64
            })
            .map(|entry| entry.key().clone())
            .collect();

        let mut removed = 0;
        for id in expired {
            if let Some((_, pending)) = self.pending.remove(&id) {
                warn!(
                    correlation_id = %id,
                    origin = pending.origin,
                    timeout_ms = pending.timeout.as_millis() as u64,
                    "Removing expired pending request"
                );
                let error = ProviderError::timed_out(format!(
                    "No response within {} ms",
                    pending.timeout.as_millis()
                ));
                let _ = pending.sender.send(SignOutcome::Rejected(error));
                self.stats.total_timeouts.fetch_add(1, Ordering::Relaxed);
                removed += 1;
            }
        }

        removed
    }

    /// Forget a pending request without delivering an outcome
    pub fn cancel(&self, id: &CorrelationId) -> bool {
        if self.pending.remove(id).is_some() {
            self.stats.total_cancelled.fetch_add(1, Ordering::Relaxed);
            debug!(correlation_id = %id, "Cancelled pending request");
            true
        } else {
            false
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, id: &CorrelationId) -> bool {
        self.pending.contains_key(id)
    }

    pub fn stats(&self) -> &PendingStats {
        &self.stats
    }
}
