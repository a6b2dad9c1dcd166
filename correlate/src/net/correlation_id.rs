use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Opaque token joining an outbound request to its inbound response.
///
/// Travels as the message routing key and keys the correlation registry.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    pub fn new(value: impl Into<String>) -> Self {
        return CorrelationId(value.into());
    }

    pub fn as_str(&self) -> &str {
        return &self.0;
    }

    pub fn into_string(self) -> String {
        return self.0;
    }
}

impl Display for CorrelationId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

impl From<&str> for CorrelationId {
    fn from(value: &str) -> Self {
        return CorrelationId::new(value);
    }
}

impl From<String> for CorrelationId {
    fn from(value: String) -> Self {
        return CorrelationId(value);
    }
}

pub trait CorrelationIdGenerator: Send + Sync {
    fn generate(&self) -> CorrelationId;
}
