use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::lifecycle::shutdown::ShutdownSignal;
use crate::net::bus::{Envelope, InboundSubscription};
use crate::registry::correlation_registry::CorrelationRegistry;

/// What happened to a single inbound message.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum DispatchOutcome {
    Resolved,
    UnknownCorrelation,
    Malformed,
}

/// Implemented by response bodies that also carry the correlation id, so a body that
/// disagrees with its routing key can be noticed.
pub trait CorrelatedResponse {
    fn correlation_id(&self) -> Option<&str> {
        return None;
    }
}

impl CorrelatedResponse for String {}

impl CorrelatedResponse for serde_json::Value {
    fn correlation_id(&self) -> Option<&str> {
        return self.get("correlation_id").and_then(|value| value.as_str());
    }
}

pub struct ResponseDispatcher<Response> {
    registry: Arc<CorrelationRegistry<Response>>,
}

impl<Response> ResponseDispatcher<Response>
    where Response: DeserializeOwned + CorrelatedResponse + Send + 'static {
    pub fn new(registry: Arc<CorrelationRegistry<Response>>) -> Self {
        return ResponseDispatcher { registry };
    }

    /// The routing key is authoritative; the body only supplies the payload.
    pub fn dispatch(&self, envelope: Envelope) -> DispatchOutcome {
        let correlation_id = envelope.routing_key;
        let response: Response = match serde_json::from_slice(&envelope.body) {
            Ok(response) => response,
            Err(err) => {
                warn!(%correlation_id, error = %err, "dropping undecodable response");
                return DispatchOutcome::Malformed;
            }
        };

        if let Some(body_correlation_id) = response.correlation_id() {
            if !body_correlation_id.is_empty() && body_correlation_id != correlation_id.as_str() {
                warn!(%correlation_id, body_correlation_id, "response body correlation id differs from routing key");
            }
        }

        if self.registry.resolve(&correlation_id, response) {
            debug!(%correlation_id, "response dispatched");
            return DispatchOutcome::Resolved;
        }
        return DispatchOutcome::UnknownCorrelation;
    }

    /// Dispatches inbound messages until shutdown or until the subscription ends.
    pub async fn run<S>(self, mut subscription: S, mut shutdown_signal: ShutdownSignal)
        where S: InboundSubscription {
        info!("response dispatcher started");
        loop {
            tokio::select! {
                _ = shutdown_signal.wait() => {
                    info!("response dispatcher stopped");
                    return;
                }
                next = subscription.next_message() => {
                    match next {
                        Some(envelope) => {
                            let _ = self.dispatch(envelope);
                        }
                        None => {
                            info!("inbound subscription ended, response dispatcher stopped");
                            return;
                        }
                    }
                }
            }
        }
    }

    pub fn start<S>(self, subscription: S, shutdown_signal: ShutdownSignal) -> JoinHandle<()>
        where S: InboundSubscription + 'static {
        return tokio::spawn(self.run(subscription, shutdown_signal));
    }
}
