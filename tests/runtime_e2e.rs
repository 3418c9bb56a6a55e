use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use serde_json::json;

use insightgrid::snapshot::LogisticsAggregates;
use insightgrid::{
    AggregateProvider, AggregateQuery, AggregateSnapshot, DashboardKind, DashboardQuery,
    DashboardReport, ExecutionError, InMemoryProvider, InsightError, ProjectionEngine,
    ProviderError, RuntimeConfig, ScenarioRequest, SimulationRuntime,
};

/// Provider whose calls block until the gate is opened.
#[derive(Default)]
struct GatedProvider {
    open: Mutex<bool>,
    cv: Condvar,
    entered: AtomicUsize,
}

impl GatedProvider {
    fn wait(&self) {
        self.entered.fetch_add(1, Ordering::SeqCst);
        let mut open = self.open.lock().unwrap();
        while !*open {
            open = self.cv.wait(open).unwrap();
        }
    }

    fn release(&self) {
        *self.open.lock().unwrap() = true;
        self.cv.notify_all();
    }

    fn wait_for_entries(&self, n: usize) {
        for _ in 0..500 {
            if self.entered.load(Ordering::SeqCst) >= n {
                return;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        panic!("workers never reached the provider");
    }
}

impl AggregateProvider for GatedProvider {
    fn snapshot(&self, _query: &AggregateQuery) -> Result<AggregateSnapshot, ProviderError> {
        self.wait();
        Ok(AggregateSnapshot::Logistics(LogisticsAggregates {
            avg_cost: 1000.0,
            shipment_count: 50,
            data_points: 50,
            ..LogisticsAggregates::default()
        }))
    }

    fn dashboard(&self, query: &DashboardQuery) -> Result<DashboardReport, ProviderError> {
        self.wait();
        InMemoryProvider::default().dashboard(query)
    }
}

/// Provider standing in for an unreachable warehouse.
struct DownProvider;

impl AggregateProvider for DownProvider {
    fn snapshot(&self, _query: &AggregateQuery) -> Result<AggregateSnapshot, ProviderError> {
        Err(ProviderError::Unavailable("connection refused".to_string()))
    }

    fn dashboard(&self, _query: &DashboardQuery) -> Result<DashboardReport, ProviderError> {
        Err(ProviderError::Backend("query failed".to_string()))
    }
}

fn fuel_request() -> ScenarioRequest {
    ScenarioRequest::from_json(&json!({
        "type": "fuel_price",
        "parameters": { "fuel_increase_percent": 10, "time_horizon_months": 3 }
    }))
    .unwrap()
}

fn config(workers: usize, queue_capacity: usize, timeout_ms: u64) -> RuntimeConfig {
    RuntimeConfig {
        workers,
        queue_capacity,
        request_timeout: Duration::from_millis(timeout_ms),
    }
}

#[test]
fn full_queue_is_rejected_immediately() {
    let provider = Arc::new(GatedProvider::default());
    let runtime = SimulationRuntime::new(
        ProjectionEngine::default(),
        provider.clone(),
        config(1, 1, 5_000),
    )
    .unwrap();

    // One job occupies the worker, one fills the queue.
    let running = runtime.submit_simulation(fuel_request()).unwrap();
    provider.wait_for_entries(1);
    let queued = runtime.submit_simulation(fuel_request()).unwrap();
    assert_eq!(runtime.queue_depth(), 1);

    let err = runtime.submit_simulation(fuel_request()).unwrap_err();
    assert!(matches!(
        err,
        InsightError::Execution(ExecutionError::QueueFull { capacity: 1 })
    ));
    assert!(err.is_retryable());

    provider.release();
    assert!(running.join().is_ok());
    assert!(queued.join().is_ok());
}

#[test]
fn slow_provider_times_out() {
    let provider = Arc::new(GatedProvider::default());
    let runtime = SimulationRuntime::new(
        ProjectionEngine::default(),
        provider.clone(),
        config(1, 4, 50),
    )
    .unwrap();

    let err = runtime.simulate(fuel_request()).unwrap_err();
    assert!(matches!(
        err,
        InsightError::Execution(ExecutionError::Timeout { duration_ms: 50 })
    ));
    assert!(err.is_retryable());

    provider.release();
    let result = runtime
        .submit_simulation(fuel_request())
        .unwrap()
        .join()
        .unwrap();
    assert!(!result.result.low_confidence);
}

#[test]
fn provider_failure_is_upstream_unavailable() {
    let runtime = SimulationRuntime::new(
        ProjectionEngine::default(),
        Arc::new(DownProvider),
        config(2, 8, 1_000),
    )
    .unwrap();

    let err = runtime.simulate(fuel_request()).unwrap_err();
    assert!(matches!(
        err,
        InsightError::Execution(ExecutionError::UpstreamUnavailable { .. })
    ));
    assert!(err.is_retryable());

    let err = runtime
        .dashboard(DashboardQuery::new(DashboardKind::Overview, 30))
        .unwrap_err();
    assert!(err.is_retryable());
}

#[test]
fn validation_errors_skip_the_provider() {
    let runtime = SimulationRuntime::new(
        ProjectionEngine::default(),
        Arc::new(DownProvider),
        config(1, 4, 1_000),
    )
    .unwrap();

    let request = ScenarioRequest::from_json(&json!({
        "type": "fuel_price",
        "parameters": {}
    }))
    .unwrap();
    let err = runtime.simulate(request).unwrap_err();
    assert!(err.is_validation());
    assert_eq!(err.field(), Some("fuel_increase_percent"));
}

#[test]
fn concurrent_callers_all_get_answers() {
    let runtime = Arc::new(
        SimulationRuntime::new(
            ProjectionEngine::default(),
            Arc::new(InMemoryProvider::default()),
            config(4, 64, 2_000),
        )
        .unwrap(),
    );

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let runtime = Arc::clone(&runtime);
            std::thread::spawn(move || runtime.simulate(fuel_request()))
        })
        .collect();

    for handle in handles {
        let result = handle.join().unwrap().unwrap();
        assert_eq!(result.scenario, "Fuel Price Increase");
    }
}
