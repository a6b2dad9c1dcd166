use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::net::correlation_id::CorrelationId;

/// A bus message: the routing key carries the correlation token, the body is opaque bytes.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Envelope {
    pub routing_key: CorrelationId,
    pub body: Vec<u8>,
}

impl Envelope {
    pub fn new(routing_key: CorrelationId, body: Vec<u8>) -> Self {
        return Envelope { routing_key, body };
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PublishError {
    #[error("no subscriber on topic {topic}")]
    NoSubscribers { topic: String },
    #[error("outbound channel closed")]
    Closed,
    #[error("publish rejected: {0}")]
    Rejected(String),
}

/// The outbound half of the bus, bound to the request topic.
#[async_trait]
pub trait OutboundPublisher: Send + Sync {
    async fn publish(&self, envelope: Envelope) -> Result<(), PublishError>;
}

/// The inbound half of the bus, bound to the response topic.
///
/// `None` means the stream has ended and will yield nothing more.
#[async_trait]
pub trait InboundSubscription: Send {
    async fn next_message(&mut self) -> Option<Envelope>;
}

#[async_trait]
impl InboundSubscription for mpsc::Receiver<Envelope> {
    async fn next_message(&mut self) -> Option<Envelope> {
        return self.recv().await;
    }
}

#[async_trait]
impl OutboundPublisher for mpsc::Sender<Envelope> {
    async fn publish(&self, envelope: Envelope) -> Result<(), PublishError> {
        return self.send(envelope).await.map_err(|_| PublishError::Closed);
    }
}
