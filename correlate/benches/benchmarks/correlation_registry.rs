use std::sync::Arc;
use std::time::{Duration, SystemTime};

use criterion::{BatchSize, Criterion, criterion_group};

use correlate::clock::clock::SystemClock;
use correlate::net::correlation_id::CorrelationId;
use correlate::registry::correlation_registry::CorrelationRegistry;

const SIZE: usize = 64 * 1024;

fn correlation_ids() -> Vec<CorrelationId> {
    return (0..SIZE).map(|index| CorrelationId::new(index.to_string())).collect::<Vec<_>>();
}

fn register(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("correlation registry register");

    group.bench_function("register without capacity", |bencher| {
        bencher.iter_batched(
            || (CorrelationRegistry::<String>::new(Arc::new(SystemClock::new()), Duration::from_secs(300)), correlation_ids()),
            |(registry, correlation_ids)| {
                let waiters = correlation_ids
                    .into_iter()
                    .map(|correlation_id| registry.register(correlation_id))
                    .collect::<Vec<_>>();
                return (registry, waiters);
            },
            BatchSize::LargeInput,
        );
    });
    group.bench_function("register with capacity", |bencher| {
        bencher.iter_batched(
            || (CorrelationRegistry::<String>::new_with_capacity(SIZE, Arc::new(SystemClock::new()), Duration::from_secs(300)), correlation_ids()),
            |(registry, correlation_ids)| {
                let waiters = correlation_ids
                    .into_iter()
                    .map(|correlation_id| registry.register(correlation_id))
                    .collect::<Vec<_>>();
                return (registry, waiters);
            },
            BatchSize::LargeInput,
        );
    });
    group.finish();
}

fn resolve_and_sweep(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("correlation registry claim");

    group.bench_function("resolve all", |bencher| {
        bencher.iter_batched(
            || {
                let registry = CorrelationRegistry::<String>::new_with_capacity(SIZE, Arc::new(SystemClock::new()), Duration::from_secs(300));
                let correlation_ids = correlation_ids();
                let waiters = correlation_ids.iter().map(|correlation_id| registry.register(correlation_id.clone())).collect::<Vec<_>>();
                (registry, correlation_ids, waiters)
            },
            |(registry, correlation_ids, waiters)| {
                for correlation_id in &correlation_ids {
                    registry.resolve(correlation_id, String::from("approved"));
                }
                return waiters;
            },
            BatchSize::LargeInput,
        );
    });
    group.bench_function("sweep all", |bencher| {
        bencher.iter_batched(
            || {
                let registry = CorrelationRegistry::<String>::new_with_capacity(SIZE, Arc::new(SystemClock::new()), Duration::from_millis(1));
                let waiters = correlation_ids().into_iter().map(|correlation_id| registry.register(correlation_id)).collect::<Vec<_>>();
                (registry, waiters)
            },
            |(registry, waiters)| {
                registry.sweep(SystemTime::now() + Duration::from_secs(1));
                return waiters;
            },
            BatchSize::LargeInput,
        );
    });
    group.finish();
}

criterion_group!(benches, register, resolve_and_sweep);
