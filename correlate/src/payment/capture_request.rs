use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use correlate_macro::add_correlation_id;

use crate::bridge::correlated_request::{CorrelatedRequest, ValidationError};
use crate::net::correlation_id::CorrelationId;

#[add_correlation_id]
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CaptureRequest {
    pub transaction_id: String,
    pub amount: f64,
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, String>>,
}

impl CaptureRequest {
    pub fn new(transaction_id: impl Into<String>, amount: f64, currency: impl Into<String>) -> Self {
        return CaptureRequest {
            correlation_id: String::new(),
            transaction_id: transaction_id.into(),
            amount,
            currency: currency.into(),
            metadata: None,
        };
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.get_or_insert_with(HashMap::new).insert(key.into(), value.into());
        return self;
    }

    /// Parses a caller-supplied body; any server-side `correlation_id` it carries is discarded.
    pub fn from_json(body: &[u8]) -> Result<Self, ValidationError> {
        let mut request: CaptureRequest = serde_json::from_slice(body)
            .map_err(|err| ValidationError::new("body", err.to_string()))?;
        request.correlation_id.clear();
        request.validate()?;
        return Ok(request);
    }
}

impl CorrelatedRequest for CaptureRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.transaction_id.trim().is_empty() {
            return Err(ValidationError::new("transaction_id", "is required"));
        }
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(ValidationError::new("amount", "must be a positive number"));
        }
        if self.currency.trim().is_empty() {
            return Err(ValidationError::new("currency", "is required"));
        }
        return Ok(());
    }

    fn assign_correlation_id(&mut self, correlation_id: &CorrelationId) {
        self.correlation_id = correlation_id.to_string();
    }
}
