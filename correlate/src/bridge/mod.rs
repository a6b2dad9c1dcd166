pub mod bridge_error;
pub mod correlated_request;
pub mod request_bridge;
