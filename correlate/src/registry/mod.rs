pub mod correlation_registry;
pub mod expiry_reaper;
pub mod outcome;
mod pending_request;
