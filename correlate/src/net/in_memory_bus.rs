use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::net::bus::{Envelope, InboundSubscription, OutboundPublisher, PublishError};
use crate::net::induced_failure::InducedFailure;

pub const DEFAULT_TOPIC_CAPACITY: usize = 1024;

/// Topic-keyed publish/subscribe bus living inside the process.
///
/// Every subscriber of a topic sees every envelope published to it after it subscribed.
/// Publishing to a topic nobody listens on fails, the way a broker without a consumer
/// group would leave the request unanswered.
pub struct InMemoryBus {
    topics: DashMap<String, broadcast::Sender<Envelope>>,
    induced_failure: InducedFailure,
    envelopes_published: AtomicU64,
    capacity: usize,
}

impl InMemoryBus {
    pub fn new() -> Arc<Self> {
        return Self::with_capacity(DEFAULT_TOPIC_CAPACITY);
    }

    pub fn with_capacity(capacity: usize) -> Arc<Self> {
        return Arc::new(InMemoryBus {
            topics: DashMap::new(),
            induced_failure: InducedFailure::new(),
            envelopes_published: AtomicU64::new(0),
            capacity,
        });
    }

    pub fn subscribe(&self, topic: &str) -> TopicSubscription {
        let receiver = self.topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe();

        debug!(topic, "new subscription");
        return TopicSubscription { topic: topic.to_string(), receiver };
    }

    pub fn publisher(self: &Arc<Self>, topic: &str) -> TopicPublisher {
        return TopicPublisher { bus: self.clone(), topic: topic.to_string() };
    }

    pub fn publish_to(&self, topic: &str, envelope: Envelope) -> Result<(), PublishError> {
        if self.induced_failure.should_reject(topic) {
            warn!(topic, correlation_id = %envelope.routing_key, "publish rejected by induced failure");
            return Err(PublishError::Rejected(format!("induced failure on topic {}", topic)));
        }

        let sender = match self.topics.get(topic) {
            None => return Err(PublishError::NoSubscribers { topic: topic.to_string() }),
            Some(sender) => sender.clone(),
        };

        let correlation_id = envelope.routing_key.clone();
        return match sender.send(envelope) {
            Ok(receivers) => {
                self.envelopes_published.fetch_add(1, Ordering::Relaxed);
                debug!(topic, %correlation_id, receivers, "envelope published");
                Ok(())
            }
            Err(_) => Err(PublishError::NoSubscribers { topic: topic.to_string() }),
        };
    }

    pub fn envelopes_published(&self) -> u64 {
        return self.envelopes_published.load(Ordering::Relaxed);
    }

    pub fn reject_publishes_to(&self, topic: &str) {
        self.induced_failure.reject_publishes_to(topic);
    }

    pub fn accept_publishes_to(&self, topic: &str) {
        self.induced_failure.clear(topic);
    }
}

#[derive(Clone)]
pub struct TopicPublisher {
    bus: Arc<InMemoryBus>,
    topic: String,
}

impl TopicPublisher {
    pub fn topic(&self) -> &str {
        return &self.topic;
    }
}

#[async_trait]
impl OutboundPublisher for TopicPublisher {
    async fn publish(&self, envelope: Envelope) -> Result<(), PublishError> {
        return self.bus.publish_to(&self.topic, envelope);
    }
}

pub struct TopicSubscription {
    topic: String,
    receiver: broadcast::Receiver<Envelope>,
}

#[async_trait]
impl InboundSubscription for TopicSubscription {
    async fn next_message(&mut self) -> Option<Envelope> {
        loop {
            match self.receiver.recv().await {
                Ok(envelope) => return Some(envelope),
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(topic = %self.topic, skipped, "subscription lagged, envelopes dropped");
                    continue;
                }
            }
        }
    }
}
