pub mod bridge;
pub mod clock;
pub mod config;
pub mod dispatch;
pub mod lifecycle;
pub mod net;
pub mod payment;
pub mod registry;
pub mod runtime;
