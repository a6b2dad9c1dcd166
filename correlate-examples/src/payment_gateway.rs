use std::sync::Arc;

use tracing::info;

use correlate::bridge::bridge_error::BridgeError;
use correlate::clock::clock::SystemClock;
use correlate::config::bridge_config::BridgeConfig;
use correlate::net::in_memory_bus::InMemoryBus;
use correlate::payment::capture_request::CaptureRequest;
use correlate::payment::capture_response::CaptureResponse;
use correlate::runtime::bridge_runtime::BridgeRuntime;

/// Caller-facing capture operation: one synchronous-looking call per payment.
pub struct PaymentGateway {
    runtime: BridgeRuntime<CaptureRequest, CaptureResponse>,
}

impl PaymentGateway {
    pub fn new(runtime: BridgeRuntime<CaptureRequest, CaptureResponse>) -> Self {
        return PaymentGateway { runtime };
    }

    pub fn start_on(bus: &Arc<InMemoryBus>, config: &BridgeConfig) -> Self {
        return Self::new(BridgeRuntime::start_on(bus, config, Arc::new(SystemClock::new())));
    }

    pub async fn capture(&self, request: CaptureRequest) -> Result<CaptureResponse, BridgeError> {
        let transaction_id = request.transaction_id.clone();
        let response = self.runtime.execute(request).await?;
        info!(transaction_id = %transaction_id, status = ?response.status, "capture completed");
        return Ok(response);
    }

    /// Accepts a raw JSON body; decode and validation problems surface as invalid input.
    pub async fn capture_json(&self, body: &[u8]) -> Result<CaptureResponse, BridgeError> {
        let request = CaptureRequest::from_json(body)?;
        return self.capture(request).await;
    }

    pub fn pending_captures(&self) -> usize {
        return self.runtime.bridge().registry().pending_count();
    }

    pub async fn shutdown(self) {
        self.runtime.shutdown().await;
    }
}
