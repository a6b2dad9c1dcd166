use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use correlate::lifecycle::shutdown::ShutdownSignal;
use correlate::net::bus::{Envelope, InboundSubscription, OutboundPublisher};
use correlate::payment::capture_request::CaptureRequest;
use correlate::payment::capture_response::CaptureResponse;

pub const PROCESSING_DELAY_MS: &str = "PROCESSING_DELAY_MS";
pub const APPROVAL_RATE: &str = "APPROVAL_RATE";

const AUTHORIZATION_CODE_LENGTH: usize = 6;
const AUTHORIZATION_CODE_CHARSET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DECLINED_ERROR_CODE: &str = "payment_declined";
const DECLINED_ERROR_MESSAGE: &str = "Payment declined by the issuer";

#[derive(Debug, Error, Eq, PartialEq)]
pub enum ProcessorConfigError {
    #[error("{variable} must be a number of milliseconds, got {value:?}")]
    InvalidDelay { variable: &'static str, value: String },
    #[error("{variable} must be a rate between 0 and 1, got {value:?}")]
    InvalidRate { variable: &'static str, value: String },
}

#[derive(Clone, Debug, PartialEq)]
pub struct ProcessorConfig {
    processing_delay: Duration,
    approval_rate: f64,
}

impl ProcessorConfig {
    /// `approval_rate` is clamped into `[0, 1]`; NaN declines everything.
    pub fn new(processing_delay: Duration, approval_rate: f64) -> Self {
        let approval_rate = if approval_rate.is_nan() { 0.0 } else { approval_rate.clamp(0.0, 1.0) };
        return ProcessorConfig { processing_delay, approval_rate };
    }

    pub fn from_env() -> Result<Self, ProcessorConfigError> {
        return Self::from_lookup(|variable| std::env::var(variable).ok());
    }

    pub fn from_lookup<L>(lookup: L) -> Result<Self, ProcessorConfigError>
        where L: Fn(&str) -> Option<String> {
        let default = ProcessorConfig::default();

        let processing_delay = match lookup(PROCESSING_DELAY_MS) {
            None => default.processing_delay,
            Some(value) => value.trim().parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| ProcessorConfigError::InvalidDelay { variable: PROCESSING_DELAY_MS, value })?,
        };
        let approval_rate = match lookup(APPROVAL_RATE) {
            None => default.approval_rate,
            Some(value) => match value.trim().parse::<f64>() {
                Ok(rate) if (0.0..=1.0).contains(&rate) => rate,
                _ => return Err(ProcessorConfigError::InvalidRate { variable: APPROVAL_RATE, value }),
            },
        };
        return Ok(ProcessorConfig { processing_delay, approval_rate });
    }

    pub fn get_processing_delay(&self) -> Duration {
        return self.processing_delay;
    }

    pub fn get_approval_rate(&self) -> f64 {
        return self.approval_rate;
    }
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        return ProcessorConfig { processing_delay: Duration::from_millis(2000), approval_rate: 0.8 };
    }
}

/// Stands in for the remote processor: consumes capture requests and answers each one
/// on the response topic, keyed by the request's correlation id.
pub struct PaymentProcessor {
    responses: Arc<dyn OutboundPublisher>,
    config: ProcessorConfig,
}

impl PaymentProcessor {
    pub fn new(responses: Arc<dyn OutboundPublisher>, config: ProcessorConfig) -> Self {
        return PaymentProcessor { responses, config };
    }

    pub fn start<S>(self, requests: S, shutdown_signal: ShutdownSignal) -> JoinHandle<()>
        where S: InboundSubscription + 'static {
        return tokio::spawn(self.run(requests, shutdown_signal));
    }

    async fn run<S>(self, mut requests: S, mut shutdown_signal: ShutdownSignal)
        where S: InboundSubscription {
        info!(
            processing_delay_ms = self.config.processing_delay.as_millis() as u64,
            approval_rate = self.config.approval_rate,
            "payment processor started"
        );
        let processor = Arc::new(self);
        loop {
            tokio::select! {
                _ = shutdown_signal.wait() => {
                    info!("payment processor stopped");
                    return;
                }
                next = requests.next_message() => {
                    match next {
                        Some(envelope) => {
                            let processor = processor.clone();
                            tokio::spawn(async move { processor.handle(envelope).await; });
                        }
                        None => {
                            info!("request subscription ended, payment processor stopped");
                            return;
                        }
                    }
                }
            }
        }
    }

    async fn handle(&self, envelope: Envelope) {
        let correlation_id = envelope.routing_key;
        let request: CaptureRequest = match serde_json::from_slice(&envelope.body) {
            Ok(request) => request,
            Err(err) => {
                warn!(%correlation_id, error = %err, "skipping undecodable capture request");
                return;
            }
        };
        debug!(%correlation_id, transaction_id = %request.transaction_id, amount = request.amount, "processing capture");

        tokio::time::sleep(self.config.processing_delay).await;
        let response = self.decide(correlation_id.as_str(), request.transaction_id);

        let body = match serde_json::to_vec(&response) {
            Ok(body) => body,
            Err(err) => {
                warn!(%correlation_id, error = %err, "could not encode capture response");
                return;
            }
        };
        if let Err(err) = self.responses.publish(Envelope::new(correlation_id.clone(), body)).await {
            warn!(%correlation_id, error = %err, "could not publish capture response");
        }
    }

    fn decide(&self, correlation_id: &str, transaction_id: String) -> CaptureResponse {
        let mut random = rand::thread_rng();
        if random.gen_bool(self.config.approval_rate) {
            let authorization_code: String = (0..AUTHORIZATION_CODE_LENGTH)
                .map(|_| AUTHORIZATION_CODE_CHARSET[random.gen_range(0..AUTHORIZATION_CODE_CHARSET.len())] as char)
                .collect();
            return CaptureResponse::approved(correlation_id, transaction_id, authorization_code);
        }
        return CaptureResponse::declined(correlation_id, transaction_id, DECLINED_ERROR_CODE, DECLINED_ERROR_MESSAGE);
    }
}
