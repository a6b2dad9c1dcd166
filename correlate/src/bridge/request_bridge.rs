use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::bridge::bridge_error::BridgeError;
use crate::bridge::correlated_request::CorrelatedRequest;
use crate::net::bus::{Envelope, OutboundPublisher};
use crate::net::correlation_id::{CorrelationId, CorrelationIdGenerator};
use crate::net::random_correlation_id_generator::RandomCorrelationIdGenerator;
use crate::registry::correlation_registry::CorrelationRegistry;
use crate::registry::outcome::Outcome;

/// Turns a publish on the bus plus a later inbound response into one awaitable call.
pub struct RequestBridge<Request, Response> {
    registry: Arc<CorrelationRegistry<Response>>,
    publisher: Arc<dyn OutboundPublisher>,
    correlation_id_generator: Arc<dyn CorrelationIdGenerator>,
    _request: PhantomData<fn(Request)>,
}

enum Interruption {
    Deadline,
    Cancellation,
}

impl<Request, Response> RequestBridge<Request, Response>
    where Request: CorrelatedRequest,
          Response: Send + 'static {
    pub fn new(registry: Arc<CorrelationRegistry<Response>>,
               publisher: Arc<dyn OutboundPublisher>,
               correlation_id_generator: Arc<dyn CorrelationIdGenerator>) -> Self {
        return RequestBridge {
            registry,
            publisher,
            correlation_id_generator,
            _request: PhantomData,
        };
    }

    pub fn with_random_correlation_ids(registry: Arc<CorrelationRegistry<Response>>,
                                       publisher: Arc<dyn OutboundPublisher>) -> Self {
        return Self::new(registry, publisher, Arc::new(RandomCorrelationIdGenerator::new()));
    }

    pub async fn execute(&self, request: Request, time_limit: Duration) -> Result<Response, BridgeError> {
        return self.execute_until(request, time_limit, std::future::pending::<()>()).await;
    }

    /// Like [`RequestBridge::execute`], but gives up as soon as `cancellation` completes.
    ///
    /// Dropping the returned future mid-wait also releases the registry entry.
    pub async fn execute_until<C>(&self, mut request: Request, time_limit: Duration, cancellation: C) -> Result<Response, BridgeError>
        where C: Future<Output=()> {
        request.validate()?;

        let correlation_id = self.correlation_id_generator.generate();
        request.assign_correlation_id(&correlation_id);
        let body = serde_json::to_vec(&request)?;

        let mut waiter = self.registry.register(correlation_id.clone())?;
        let mut pending_guard = PendingGuard::new(self.registry.clone(), correlation_id.clone());
        let started = Instant::now();

        if let Err(publish_error) = self.publisher.publish(Envelope::new(correlation_id.clone(), body)).await {
            pending_guard.disarm();
            warn!(%correlation_id, error = %publish_error, "publish failed, pending request released");
            // completed by this claim, or by a concurrent reaper sweep if that won
            self.registry.reject(&correlation_id, publish_error);
            let outcome = waiter.await;
            return into_result(correlation_id, outcome, started.elapsed());
        }
        debug!(%correlation_id, time_limit_ms = time_limit.as_millis() as u64, "request published, awaiting response");

        tokio::pin!(cancellation);
        let interruption = tokio::select! {
            outcome = &mut waiter => {
                pending_guard.disarm();
                return into_result(correlation_id, outcome, started.elapsed());
            }
            _ = tokio::time::sleep(time_limit) => Interruption::Deadline,
            _ = &mut cancellation => Interruption::Cancellation,
        };
        pending_guard.disarm();

        if self.registry.expire(&correlation_id) {
            return Err(match interruption {
                Interruption::Deadline => {
                    info!(%correlation_id, "no response before the deadline");
                    BridgeError::Timeout { correlation_id, waited: started.elapsed() }
                }
                Interruption::Cancellation => {
                    info!(%correlation_id, "request cancelled by the caller");
                    BridgeError::Cancelled { correlation_id }
                }
            });
        }

        // claimed concurrently by the dispatcher or the reaper; its outcome is in the waiter
        let outcome = waiter.await;
        return into_result(correlation_id, outcome, started.elapsed());
    }

    pub fn registry(&self) -> &Arc<CorrelationRegistry<Response>> {
        return &self.registry;
    }
}

impl<Request, Response> Clone for RequestBridge<Request, Response> {
    fn clone(&self) -> Self {
        return RequestBridge {
            registry: self.registry.clone(),
            publisher: self.publisher.clone(),
            correlation_id_generator: self.correlation_id_generator.clone(),
            _request: PhantomData,
        };
    }
}

fn into_result<Response>(correlation_id: CorrelationId, outcome: Outcome<Response>, waited: Duration) -> Result<Response, BridgeError> {
    return match outcome {
        Outcome::Delivered(response) => {
            debug!(%correlation_id, waited_ms = waited.as_millis() as u64, "response delivered");
            Ok(response)
        }
        Outcome::TimedOut => Err(BridgeError::Timeout { correlation_id, waited }),
        Outcome::PublishFailed(source) => Err(BridgeError::Publish { correlation_id, source }),
    };
}

/// Expires the registry entry if the bridge future is dropped while still waiting.
struct PendingGuard<Response> {
    registry: Arc<CorrelationRegistry<Response>>,
    correlation_id: CorrelationId,
    armed: bool,
}

impl<Response> PendingGuard<Response> {
    fn new(registry: Arc<CorrelationRegistry<Response>>, correlation_id: CorrelationId) -> Self {
        return PendingGuard { registry, correlation_id, armed: true };
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl<Response> Drop for PendingGuard<Response> {
    fn drop(&mut self) {
        if self.armed && self.registry.expire(&self.correlation_id) {
            debug!(correlation_id = %self.correlation_id, "caller went away, pending request released");
        }
    }
}
