use serde::{Deserialize, Serialize};

use correlate_macro::add_correlation_id;

use crate::dispatch::response_dispatcher::CorrelatedResponse;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum CaptureStatus {
    Approved,
    Declined,
}

/// `authorization_code` is present iff approved; `error_code` and `error_message` iff declined.
#[add_correlation_id]
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
pub struct CaptureResponse {
    pub transaction_id: String,
    pub status: CaptureStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl CaptureResponse {
    pub fn approved(correlation_id: impl Into<String>, transaction_id: impl Into<String>, authorization_code: impl Into<String>) -> Self {
        return CaptureResponse {
            correlation_id: correlation_id.into(),
            transaction_id: transaction_id.into(),
            status: CaptureStatus::Approved,
            authorization_code: Some(authorization_code.into()),
            error_code: None,
            error_message: None,
        };
    }

    pub fn declined(correlation_id: impl Into<String>,
                    transaction_id: impl Into<String>,
                    error_code: impl Into<String>,
                    error_message: impl Into<String>) -> Self {
        return CaptureResponse {
            correlation_id: correlation_id.into(),
            transaction_id: transaction_id.into(),
            status: CaptureStatus::Declined,
            authorization_code: None,
            error_code: Some(error_code.into()),
            error_message: Some(error_message.into()),
        };
    }

    pub fn is_approved(&self) -> bool {
        return self.status == CaptureStatus::Approved;
    }
}

impl CorrelatedResponse for CaptureResponse {
    fn correlation_id(&self) -> Option<&str> {
        return Some(&self.correlation_id);
    }
}
