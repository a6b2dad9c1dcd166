use serde::Serialize;
use thiserror::Error;

use crate::net::correlation_id::CorrelationId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid {field}: {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        return ValidationError { field, reason: reason.into() };
    }
}

/// A request body the bridge can validate, tag with a correlation id and serialize.
pub trait CorrelatedRequest: Serialize + Send + Sync {
    fn validate(&self) -> Result<(), ValidationError>;

    /// Copies the routing key into the body, for consumers that cannot read routing keys.
    fn assign_correlation_id(&mut self, correlation_id: &CorrelationId);
}
