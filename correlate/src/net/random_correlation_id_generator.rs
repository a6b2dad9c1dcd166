use uuid::Uuid;

use crate::net::correlation_id::{CorrelationId, CorrelationIdGenerator};

pub struct RandomCorrelationIdGenerator {}

impl CorrelationIdGenerator for RandomCorrelationIdGenerator {
    fn generate(&self) -> CorrelationId {
        return CorrelationId::new(Uuid::new_v4().to_string());
    }
}

impl RandomCorrelationIdGenerator {
    pub fn new() -> Self {
        return RandomCorrelationIdGenerator {};
    }
}

impl Default for RandomCorrelationIdGenerator {
    fn default() -> Self {
        return Self::new();
    }
}
