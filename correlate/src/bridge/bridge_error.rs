use std::time::Duration;

use thiserror::Error;

use crate::bridge::correlated_request::ValidationError;
use crate::net::bus::PublishError;
use crate::net::correlation_id::CorrelationId;
use crate::registry::correlation_registry::RegistryError;

/// The failures a caller of the bridge can observe.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("invalid request: {0}")]
    InvalidInput(#[from] ValidationError),

    #[error("failed to publish request {correlation_id}: {source}")]
    Publish {
        correlation_id: CorrelationId,
        #[source]
        source: PublishError,
    },

    #[error("no response for request {correlation_id} within {waited:?}")]
    Timeout {
        correlation_id: CorrelationId,
        waited: Duration,
    },

    #[error("request {correlation_id} cancelled by the caller")]
    Cancelled { correlation_id: CorrelationId },

    #[error("failed to serialize request: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl BridgeError {
    /// HTTP status the caller-facing surface answers with.
    pub fn status_code(&self) -> u16 {
        return match self {
            BridgeError::InvalidInput(_) => 400,
            BridgeError::Publish { .. } => 502,
            BridgeError::Timeout { .. } => 504,
            BridgeError::Cancelled { .. } => 499,
            BridgeError::Serialization(_) | BridgeError::Registry(_) => 500,
        };
    }

    pub fn is_timeout(&self) -> bool {
        return matches!(self, BridgeError::Timeout { .. });
    }
}
