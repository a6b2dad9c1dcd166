use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing_subscriber::EnvFilter;

use correlate::bridge::bridge_error::BridgeError;
use correlate::bridge::request_bridge::RequestBridge;
use correlate::clock::clock::SystemClock;
use correlate::dispatch::response_dispatcher::ResponseDispatcher;
use correlate::lifecycle::shutdown::ShutdownHandle;
use correlate::net::bus::{Envelope, InboundSubscription};
use correlate::net::correlation_id::CorrelationId;
use correlate::net::in_memory_bus::{InMemoryBus, TopicSubscription};
use correlate::payment::capture_request::CaptureRequest;
use correlate::payment::capture_response::{CaptureResponse, CaptureStatus};
use correlate::registry::correlation_registry::CorrelationRegistry;

const REQUEST_TOPIC: &str = "payment-requests";
const RESPONSE_TOPIC: &str = "payment-responses";

/// `RUST_LOG=correlate=debug cargo test` shows the bridge's events.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn wire(bus: &Arc<InMemoryBus>) -> (RequestBridge<CaptureRequest, CaptureResponse>, ShutdownHandle) {
    init_tracing();
    let registry = Arc::new(CorrelationRegistry::new(Arc::new(SystemClock::new()), Duration::from_secs(300)));
    let (shutdown_handle, shutdown_signal) = ShutdownHandle::new();

    let _dispatcher_handle = ResponseDispatcher::new(registry.clone()).start(bus.subscribe(RESPONSE_TOPIC), shutdown_signal);
    let bridge = RequestBridge::with_random_correlation_ids(registry, Arc::new(bus.publisher(REQUEST_TOPIC)));
    return (bridge, shutdown_handle);
}

fn approve_after(bus: Arc<InMemoryBus>, mut requests: TopicSubscription, delay: Duration) {
    tokio::spawn(async move {
        while let Some(envelope) = requests.next_message().await {
            let request: CaptureRequest = serde_json::from_slice(&envelope.body).unwrap();
            tokio::time::sleep(delay).await;

            let response = CaptureResponse::approved(request.correlation_id, request.transaction_id, "ABC123");
            let body = serde_json::to_vec(&response).unwrap();
            let _ = bus.publish_to(RESPONSE_TOPIC, Envelope::new(envelope.routing_key, body));
        }
    });
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn capture_is_approved_well_before_the_deadline() {
    let bus = InMemoryBus::new();
    approve_after(bus.clone(), bus.subscribe(REQUEST_TOPIC), Duration::from_millis(100));
    let (bridge, shutdown_handle) = wire(&bus);

    let started = Instant::now();
    let response = bridge.execute(CaptureRequest::new("tx-100", 250.0, "USD"), Duration::from_secs(30)).await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(CaptureStatus::Approved, response.status);
    assert_eq!(Some("ABC123".to_string()), response.authorization_code);
    assert_eq!("tx-100", response.transaction_id);
    assert_eq!(0, bridge.registry().pending_count());
    shutdown_handle.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn capture_without_a_responder_times_out_and_leaves_nothing_behind() {
    let bus = InMemoryBus::new();
    let mut requests = bus.subscribe(REQUEST_TOPIC);
    let (bridge, shutdown_handle) = wire(&bus);

    let started = Instant::now();
    let result = bridge.execute(CaptureRequest::new("tx-200", 10.0, "EUR"), Duration::from_secs(2)).await;

    assert!(started.elapsed() >= Duration::from_secs(2));
    let correlation_id = match result {
        Err(BridgeError::Timeout { correlation_id, .. }) => correlation_id,
        other => panic!("expected a timeout, received {:?}", other),
    };
    assert_eq!(false, bridge.registry().is_pending(&correlation_id));

    let published = requests.next_message().await.unwrap();
    assert_eq!(correlation_id, published.routing_key);

    let late = CaptureResponse::approved(correlation_id.as_str(), "tx-200", "LATE01");
    bus.publish_to(RESPONSE_TOPIC, Envelope::new(correlation_id.clone(), serde_json::to_vec(&late).unwrap())).unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(0, bridge.registry().pending_count());
    shutdown_handle.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn capture_fails_fast_when_the_bus_rejects_the_publish() {
    let bus = InMemoryBus::new();
    let _requests = bus.subscribe(REQUEST_TOPIC);
    bus.reject_publishes_to(REQUEST_TOPIC);
    let (bridge, shutdown_handle) = wire(&bus);

    let started = Instant::now();
    let result = bridge.execute(CaptureRequest::new("tx-300", 10.0, "USD"), Duration::from_secs(30)).await;

    assert!(started.elapsed() < Duration::from_secs(1));
    let error = result.unwrap_err();
    assert_eq!(502, error.status_code());
    assert_eq!(0, bridge.registry().pending_count());
    shutdown_handle.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_captures_receive_their_own_responses() {
    let bus = InMemoryBus::new();
    approve_after(bus.clone(), bus.subscribe(REQUEST_TOPIC), Duration::from_millis(5));
    let (bridge, shutdown_handle) = wire(&bus);

    let handles = (0..20).map(|index| {
        let bridge = bridge.clone();
        return tokio::spawn(async move {
            let transaction_id = format!("tx-{}", index);
            let response = bridge.execute(CaptureRequest::new(transaction_id.clone(), 1.0, "USD"), Duration::from_secs(10)).await.unwrap();
            return (transaction_id, response);
        });
    }).collect::<Vec<_>>();

    for handle in handles {
        let (transaction_id, response) = handle.await.unwrap();
        assert_eq!(transaction_id, response.transaction_id);
    }
    assert_eq!(0, bridge.registry().pending_count());
    shutdown_handle.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn response_with_an_unknown_correlation_id_is_dropped() {
    let bus = InMemoryBus::new();
    let (bridge, shutdown_handle) = wire(&bus);
    let unknown = CorrelationId::from("never-registered");

    let response = CaptureResponse::approved(unknown.as_str(), "tx-400", "ABC123");
    bus.publish_to(RESPONSE_TOPIC, Envelope::new(unknown.clone(), serde_json::to_vec(&response).unwrap())).unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(false, bridge.registry().is_pending(&unknown));
    assert_eq!(0, bridge.registry().pending_count());
    shutdown_handle.shutdown();
}
