use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;
use tracing::warn;

use crate::net::bus::PublishError;
use crate::net::correlation_id::CorrelationId;

/// Terminal result of one pending request.
///
/// Each variant is explicit, so a timed-out request can never be confused with a delivered
/// response that happens to be empty.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Outcome<Response> {
    Delivered(Response),
    TimedOut,
    PublishFailed(PublishError),
}

impl<Response> Outcome<Response> {
    pub fn is_delivered(&self) -> bool {
        return matches!(self, Outcome::Delivered(_));
    }

    pub fn delivered(self) -> Option<Response> {
        return match self {
            Outcome::Delivered(response) => Some(response),
            _ => None,
        };
    }
}

/// The caller's half of a pending request; resolves once the registry entry is claimed.
pub struct Waiter<Response> {
    correlation_id: CorrelationId,
    receiver: oneshot::Receiver<Outcome<Response>>,
}

impl<Response> Waiter<Response> {
    pub(crate) fn new(correlation_id: CorrelationId, receiver: oneshot::Receiver<Outcome<Response>>) -> Self {
        return Waiter { correlation_id, receiver };
    }

    pub fn correlation_id(&self) -> &CorrelationId {
        return &self.correlation_id;
    }
}

impl<Response> Future for Waiter<Response> {
    type Output = Outcome<Response>;

    fn poll(mut self: Pin<&mut Self>, ctx: &mut Context<'_>) -> Poll<Self::Output> {
        return match Pin::new(&mut self.receiver).poll(ctx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            Poll::Ready(Err(_)) => {
                warn!(correlation_id = %self.correlation_id, "pending request dropped without an outcome");
                Poll::Ready(Outcome::TimedOut)
            }
        };
    }
}
