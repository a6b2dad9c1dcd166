pub mod payment_gateway;
pub mod payment_processor;
