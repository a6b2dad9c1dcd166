use std::time::{Duration, SystemTime};

use tokio::sync::oneshot;
use tracing::debug;

use crate::net::correlation_id::CorrelationId;
use crate::registry::outcome::Outcome;

pub(crate) struct PendingRequest<Response> {
    correlation_id: CorrelationId,
    result_slot: oneshot::Sender<Outcome<Response>>,
    creation_time: SystemTime,
    time_to_live: Duration,
}

impl<Response> PendingRequest<Response> {
    pub(crate) fn new(correlation_id: CorrelationId,
                      result_slot: oneshot::Sender<Outcome<Response>>,
                      creation_time: SystemTime,
                      time_to_live: Duration) -> Self {
        return PendingRequest {
            correlation_id,
            result_slot,
            creation_time,
            time_to_live,
        };
    }

    /// Consumes the record, so the slot can be written only once.
    pub(crate) fn complete(self, outcome: Outcome<Response>) {
        if self.result_slot.send(outcome).is_err() {
            debug!(correlation_id = %self.correlation_id, "waiter already gone, outcome discarded");
        }
    }

    /// Expired once `time_to_live` has elapsed since creation; a `now` before the creation
    /// time never is.
    pub(crate) fn has_expired(&self, now: SystemTime) -> bool {
        return match now.duration_since(self.creation_time) {
            Ok(elapsed) => elapsed >= self.time_to_live,
            Err(_) => false,
        };
    }

    pub(crate) fn creation_time(&self) -> SystemTime {
        return self.creation_time;
    }
}
