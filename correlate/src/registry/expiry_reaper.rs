use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::lifecycle::shutdown::ShutdownSignal;
use crate::net::correlation_id::CorrelationId;
use crate::registry::correlation_registry::CorrelationRegistry;

/// Sweep intervals below this are raised to it; `tokio::time::interval` rejects a zero period.
pub const MINIMUM_SWEEP_INTERVAL: Duration = Duration::from_millis(1);

/// Periodically expires registry entries past their deadline.
///
/// The tick interval is independent of the time-to-live and may be much coarser.
pub struct ExpiryReaper<Response> {
    registry: Arc<CorrelationRegistry<Response>>,
    sweep_interval: Duration,
}

impl<Response: Send + 'static> ExpiryReaper<Response> {
    pub fn new(registry: Arc<CorrelationRegistry<Response>>, sweep_interval: Duration) -> Self {
        if sweep_interval < MINIMUM_SWEEP_INTERVAL {
            warn!(
                sweep_interval_ms = sweep_interval.as_millis() as u64,
                minimum_ms = MINIMUM_SWEEP_INTERVAL.as_millis() as u64,
                "sweep interval too small, using the minimum"
            );
        }
        return ExpiryReaper { registry, sweep_interval: sweep_interval.max(MINIMUM_SWEEP_INTERVAL) };
    }

    pub fn sweep_interval(&self) -> Duration {
        return self.sweep_interval;
    }

    pub fn start(self, mut shutdown_signal: ShutdownSignal) -> JoinHandle<()> {
        return tokio::spawn(async move {
            let mut interval = time::interval(self.sweep_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // the first tick of an interval completes immediately
            interval.tick().await;

            info!(sweep_interval_ms = self.sweep_interval.as_millis() as u64, "expiry reaper started");
            loop {
                tokio::select! {
                    _ = shutdown_signal.wait() => {
                        info!("expiry reaper stopped");
                        return;
                    }
                    _ = interval.tick() => {
                        self.reap();
                    }
                }
            }
        });
    }

    pub fn reap(&self) -> Vec<CorrelationId> {
        let now = self.registry.clock().now();
        let expired = self.registry.sweep(now);
        if expired.is_empty() {
            debug!(pending = self.registry.pending_count(), "reaper tick, nothing expired");
        } else {
            info!(expired = expired.len(), pending = self.registry.pending_count(), "reaper tick expired pending requests");
        }
        return expired;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use crate::clock::clock::SystemClock;
    use crate::lifecycle::shutdown::ShutdownHandle;
    use crate::net::correlation_id::CorrelationId;
    use crate::registry::correlation_registry::CorrelationRegistry;
    use crate::registry::expiry_reaper::{ExpiryReaper, MINIMUM_SWEEP_INTERVAL};
    use crate::registry::expiry_reaper::tests::setup::AdjustableClock;
    use crate::registry::outcome::Outcome;

    mod setup {
        use std::sync::atomic::{AtomicU64, Ordering};
        use std::time::{Duration, SystemTime};

        use crate::clock::clock::Clock;

        /// System time shifted by an offset the test moves forward.
        pub struct AdjustableClock {
            offset_millis: AtomicU64,
        }

        impl AdjustableClock {
            pub fn new() -> Self {
                return AdjustableClock { offset_millis: AtomicU64::new(0) };
            }

            pub fn advance(&self, by: Duration) {
                self.offset_millis.fetch_add(by.as_millis() as u64, Ordering::SeqCst);
            }
        }

        impl Clock for AdjustableClock {
            fn now(&self) -> SystemTime {
                return SystemTime::now() + Duration::from_millis(self.offset_millis.load(Ordering::SeqCst));
            }
        }
    }

    #[tokio::test]
    async fn reap_expires_entries_older_than_the_time_to_live() {
        let clock = Arc::new(AdjustableClock::new());
        let registry = Arc::new(CorrelationRegistry::<String>::new(clock.clone(), Duration::from_secs(2)));
        let correlation_id = CorrelationId::from("T2");
        let waiter = registry.register(correlation_id.clone()).unwrap();

        let reaper = ExpiryReaper::new(registry.clone(), Duration::from_secs(60));
        assert!(reaper.reap().is_empty());

        clock.advance(Duration::from_secs(5));
        let expired = reaper.reap();

        assert_eq!(vec![correlation_id.clone()], expired);
        assert_eq!(Outcome::TimedOut, waiter.await);
        assert_eq!(false, registry.is_pending(&correlation_id));
    }

    #[tokio::test]
    async fn reap_only_expires_entries_past_their_own_deadline() {
        let clock = Arc::new(AdjustableClock::new());
        let registry = Arc::new(CorrelationRegistry::<String>::new(clock.clone(), Duration::from_secs(2)));
        let _older = registry.register(CorrelationId::from("older")).unwrap();

        clock.advance(Duration::from_secs(1));
        let _younger = registry.register(CorrelationId::from("younger")).unwrap();
        clock.advance(Duration::from_millis(1500));

        let reaper = ExpiryReaper::new(registry.clone(), Duration::from_secs(60));

        assert_eq!(vec![CorrelationId::from("older")], reaper.reap());
        assert!(registry.is_pending(&CorrelationId::from("younger")));
    }

    #[test]
    fn zero_sweep_interval_is_raised_to_the_minimum() {
        let registry = Arc::new(CorrelationRegistry::<String>::new(Arc::new(SystemClock::new()), Duration::from_secs(2)));
        let reaper = ExpiryReaper::new(registry, Duration::ZERO);

        assert_eq!(MINIMUM_SWEEP_INTERVAL, reaper.sweep_interval());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn started_reaper_with_a_zero_sweep_interval_keeps_reaping() {
        let registry = Arc::new(CorrelationRegistry::<String>::new(Arc::new(SystemClock::new()), Duration::from_millis(10)));
        let correlation_id = CorrelationId::from("abandoned");
        let waiter = registry.register(correlation_id.clone()).unwrap();

        let (shutdown_handle, shutdown_signal) = ShutdownHandle::new();
        let reaper_handle = ExpiryReaper::new(registry.clone(), Duration::ZERO).start(shutdown_signal);

        let outcome = tokio::time::timeout(Duration::from_secs(2), waiter).await.unwrap();
        assert_eq!(Outcome::TimedOut, outcome);
        assert_eq!(false, registry.is_pending(&correlation_id));

        shutdown_handle.shutdown();
        tokio::time::timeout(Duration::from_secs(1), reaper_handle).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn reap_with_zero_pending_entries() {
        let registry = Arc::new(CorrelationRegistry::<String>::new(Arc::new(SystemClock::new()), Duration::from_secs(2)));
        let reaper = ExpiryReaper::new(registry, Duration::from_secs(60));

        assert!(reaper.reap().is_empty());
    }

    #[tokio::test]
    async fn reap_keeps_entries_within_the_time_to_live() {
        let registry = Arc::new(CorrelationRegistry::<String>::new(Arc::new(SystemClock::new()), Duration::from_secs(300)));
        let correlation_id = CorrelationId::from("T1");
        let _waiter = registry.register(correlation_id.clone()).unwrap();

        let reaper = ExpiryReaper::new(registry.clone(), Duration::from_secs(60));

        assert!(reaper.reap().is_empty());
        assert!(registry.is_pending(&correlation_id));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn started_reaper_wakes_the_waiter_with_a_timeout() {
        let registry = Arc::new(CorrelationRegistry::<String>::new(Arc::new(SystemClock::new()), Duration::from_millis(20)));
        let correlation_id = CorrelationId::from("T2");
        let waiter = registry.register(correlation_id.clone()).unwrap();

        let (shutdown_handle, shutdown_signal) = ShutdownHandle::new();
        let reaper_handle = ExpiryReaper::new(registry.clone(), Duration::from_millis(10)).start(shutdown_signal);

        let outcome = tokio::time::timeout(Duration::from_secs(2), waiter).await.unwrap();
        assert_eq!(Outcome::TimedOut, outcome);
        assert_eq!(false, registry.is_pending(&correlation_id));

        shutdown_handle.shutdown();
        tokio::time::timeout(Duration::from_secs(1), reaper_handle).await.unwrap().unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn started_reaper_stops_on_shutdown() {
        let registry = Arc::new(CorrelationRegistry::<String>::new(Arc::new(SystemClock::new()), Duration::from_secs(300)));
        let (shutdown_handle, shutdown_signal) = ShutdownHandle::new();
        let reaper_handle = ExpiryReaper::new(registry, Duration::from_secs(60)).start(shutdown_signal);

        shutdown_handle.shutdown();

        let stopped = tokio::time::timeout(Duration::from_secs(1), reaper_handle).await;
        assert!(stopped.is_ok());
    }
}
