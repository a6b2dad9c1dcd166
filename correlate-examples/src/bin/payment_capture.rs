use std::sync::Arc;

use anyhow::{anyhow, Context};
use tokio::task::JoinSet;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use correlate::config::bridge_config::BridgeConfig;
use correlate::lifecycle::shutdown::ShutdownHandle;
use correlate::net::in_memory_bus::InMemoryBus;
use correlate::payment::capture_request::CaptureRequest;
use correlate_examples::payment_gateway::PaymentGateway;
use correlate_examples::payment_processor::{PaymentProcessor, ProcessorConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("could not install the tracing subscriber")?;

    let config = BridgeConfig::from_env().context("invalid bridge configuration")?;
    let processor_config = ProcessorConfig::from_env().context("invalid processor configuration")?;

    let bus = InMemoryBus::new();
    let (processor_shutdown, processor_signal) = ShutdownHandle::new();
    let processor_handle = PaymentProcessor::new(Arc::new(bus.publisher(config.get_response_topic())), processor_config)
        .start(bus.subscribe(config.get_request_topic()), processor_signal);

    let gateway = Arc::new(PaymentGateway::start_on(&bus, &config));
    let captures = vec![
        CaptureRequest::new("tx-1001", 120.0, "USD"),
        CaptureRequest::new("tx-1002", 75.5, "EUR").with_metadata("order_id", "A-77"),
        CaptureRequest::new("tx-1003", 9.99, "BRL"),
        CaptureRequest::new("tx-1004", -5.0, "USD"),
    ];

    let mut in_flight = JoinSet::new();
    for capture in captures {
        let gateway = gateway.clone();
        in_flight.spawn(async move {
            let transaction_id = capture.transaction_id.clone();
            return (transaction_id, gateway.capture(capture).await);
        });
    }
    while let Some(joined) = in_flight.join_next().await {
        let (transaction_id, result) = joined.context("capture task failed")?;
        match result {
            Ok(response) => info!(
                transaction_id = %transaction_id,
                response = %serde_json::to_string(&response)?,
                "capture answered"
            ),
            Err(err) => warn!(transaction_id = %transaction_id, status = err.status_code(), error = %err, "capture failed"),
        }
    }

    let gateway = Arc::try_unwrap(gateway).map_err(|_| anyhow!("payment gateway is still shared"))?;
    gateway.shutdown().await;
    processor_shutdown.shutdown();
    processor_handle.await.context("payment processor task failed")?;
    return Ok(());
}
