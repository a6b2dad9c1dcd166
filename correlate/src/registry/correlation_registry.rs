use std::sync::Arc;
use std::time::{Duration, SystemTime};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::{debug, info};

use crate::clock::clock::Clock;
use crate::net::bus::PublishError;
use crate::net::correlation_id::CorrelationId;
use crate::registry::outcome::{Outcome, Waiter};
use crate::registry::pending_request::PendingRequest;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("correlation id {0} is already pending")]
    DuplicateCorrelationId(CorrelationId),
}

/// In-flight requests keyed by correlation id.
///
/// A token is present exactly while its request is pending. `resolve` and `expire` both claim
/// a token by removing it from the map; the removal is atomic per key, so exactly one claimant
/// wins and writes the outcome, after the map lock is released.
pub struct CorrelationRegistry<Response> {
    pending_requests: DashMap<CorrelationId, PendingRequest<Response>>,
    clock: Arc<dyn Clock>,
    time_to_live: Duration,
}

impl<Response> CorrelationRegistry<Response> {
    pub fn new(clock: Arc<dyn Clock>, time_to_live: Duration) -> Self {
        return Self::new_with_capacity(0, clock, time_to_live);
    }

    pub fn new_with_capacity(capacity: usize, clock: Arc<dyn Clock>, time_to_live: Duration) -> Self {
        return CorrelationRegistry {
            pending_requests: DashMap::with_capacity(capacity),
            clock,
            time_to_live,
        };
    }

    pub fn register(&self, correlation_id: CorrelationId) -> Result<Waiter<Response>, RegistryError> {
        return match self.pending_requests.entry(correlation_id.clone()) {
            Entry::Occupied(_) => Err(RegistryError::DuplicateCorrelationId(correlation_id)),
            Entry::Vacant(vacant) => {
                let (sender, receiver) = oneshot::channel();
                vacant.insert(PendingRequest::new(correlation_id.clone(), sender, self.clock.now(), self.time_to_live));
                debug!(%correlation_id, "registered pending request");
                Ok(Waiter::new(correlation_id, receiver))
            }
        };
    }

    pub fn resolve(&self, correlation_id: &CorrelationId, response: Response) -> bool {
        return match self.claim(correlation_id) {
            None => {
                info!(%correlation_id, "response for unknown correlation id, late or duplicate");
                false
            }
            Some(pending_request) => {
                pending_request.complete(Outcome::Delivered(response));
                true
            }
        };
    }

    pub fn expire(&self, correlation_id: &CorrelationId) -> bool {
        return match self.claim(correlation_id) {
            None => {
                debug!(%correlation_id, "expiry for unknown correlation id, already handled");
                false
            }
            Some(pending_request) => {
                let waited = self.clock.duration_since(pending_request.creation_time());
                info!(%correlation_id, waited_ms = waited.as_millis() as u64, "pending request expired");
                pending_request.complete(Outcome::TimedOut);
                true
            }
        };
    }

    /// Expires every request whose deadline is at or before `now`.
    ///
    /// Returns only the tokens this sweep claimed; a token resolved between the scan and the
    /// claim is left to its resolver.
    pub fn sweep(&self, now: SystemTime) -> Vec<CorrelationId> {
        let expired: Vec<CorrelationId> = self.pending_requests
            .iter()
            .filter(|entry| entry.value().has_expired(now))
            .map(|entry| entry.key().clone())
            .collect();

        return expired
            .into_iter()
            .filter(|correlation_id| self.expire(correlation_id))
            .collect();
    }

    pub(crate) fn reject(&self, correlation_id: &CorrelationId, publish_error: PublishError) -> bool {
        return match self.claim(correlation_id) {
            None => false,
            Some(pending_request) => {
                pending_request.complete(Outcome::PublishFailed(publish_error));
                true
            }
        };
    }

    pub fn is_pending(&self, correlation_id: &CorrelationId) -> bool {
        return self.pending_requests.contains_key(correlation_id);
    }

    pub fn pending_count(&self) -> usize {
        return self.pending_requests.len();
    }

    pub fn time_to_live(&self) -> Duration {
        return self.time_to_live;
    }

    pub(crate) fn clock(&self) -> &Arc<dyn Clock> {
        return &self.clock;
    }

    fn claim(&self, correlation_id: &CorrelationId) -> Option<PendingRequest<Response>> {
        return self.pending_requests.remove(correlation_id).map(|(_, pending_request)| pending_request);
    }
}
