use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::bridge::bridge_error::BridgeError;
use crate::bridge::correlated_request::CorrelatedRequest;
use crate::bridge::request_bridge::RequestBridge;
use crate::clock::clock::Clock;
use crate::config::bridge_config::BridgeConfig;
use crate::dispatch::response_dispatcher::{CorrelatedResponse, ResponseDispatcher};
use crate::lifecycle::shutdown::ShutdownHandle;
use crate::net::bus::{InboundSubscription, OutboundPublisher};
use crate::net::in_memory_bus::InMemoryBus;
use crate::registry::correlation_registry::CorrelationRegistry;
use crate::registry::expiry_reaper::ExpiryReaper;

/// Owns one registry together with the dispatcher and reaper tasks working on it.
pub struct BridgeRuntime<Request, Response> {
    bridge: RequestBridge<Request, Response>,
    request_timeout: Duration,
    shutdown_handle: ShutdownHandle,
    dispatcher_handle: JoinHandle<()>,
    reaper_handle: JoinHandle<()>,
}

impl<Request, Response> BridgeRuntime<Request, Response>
    where Request: CorrelatedRequest,
          Response: DeserializeOwned + CorrelatedResponse + Send + 'static {
    pub fn start<S>(config: &BridgeConfig,
                    clock: Arc<dyn Clock>,
                    publisher: Arc<dyn OutboundPublisher>,
                    subscription: S) -> Self
        where S: InboundSubscription + 'static {
        let registry = Arc::new(CorrelationRegistry::new(clock, config.get_time_to_live()));
        let (shutdown_handle, shutdown_signal) = ShutdownHandle::new();

        let dispatcher_handle = ResponseDispatcher::new(registry.clone()).start(subscription, shutdown_signal.clone());
        let reaper_handle = ExpiryReaper::new(registry.clone(), config.get_sweep_interval()).start(shutdown_signal);

        info!(
            request_topic = config.get_request_topic(),
            response_topic = config.get_response_topic(),
            request_timeout_ms = config.get_request_timeout().as_millis() as u64,
            time_to_live_ms = config.get_time_to_live().as_millis() as u64,
            "bridge runtime started"
        );
        return BridgeRuntime {
            bridge: RequestBridge::with_random_correlation_ids(registry, publisher),
            request_timeout: config.get_request_timeout(),
            shutdown_handle,
            dispatcher_handle,
            reaper_handle,
        };
    }

    /// Publishes on the configured request topic and listens on the configured response topic.
    pub fn start_on(bus: &Arc<InMemoryBus>, config: &BridgeConfig, clock: Arc<dyn Clock>) -> Self {
        let subscription = bus.subscribe(config.get_response_topic());
        let publisher = Arc::new(bus.publisher(config.get_request_topic()));
        return Self::start(config, clock, publisher, subscription);
    }

    /// Runs a request with the configured request timeout.
    pub async fn execute(&self, request: Request) -> Result<Response, BridgeError> {
        return self.bridge.execute(request, self.request_timeout).await;
    }

    pub fn bridge(&self) -> &RequestBridge<Request, Response> {
        return &self.bridge;
    }

    pub fn get_request_timeout(&self) -> Duration {
        return self.request_timeout;
    }

    pub async fn shutdown(self) {
        self.shutdown_handle.shutdown();
        if let Err(err) = self.dispatcher_handle.await {
            warn!(error = %err, "response dispatcher did not stop cleanly");
        }
        if let Err(err) = self.reaper_handle.await {
            warn!(error = %err, "expiry reaper did not stop cleanly");
        }
        info!("bridge runtime stopped");
    }
}
