use std::sync::Arc;
use std::time::Duration;

use chrono::{Days, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use serde_json::json;

use insightgrid::provider::{SaleRecord, ShipmentRecord};
use insightgrid::{
    DashboardKind, DashboardQuery, Dataset, InMemoryProvider, ProjectionEngine, RuntimeConfig,
    ScenarioRequest, SimulationRuntime,
};

const REGIONS: [&str; 4] = ["Ontario", "Quebec", "Alberta", "British Columbia"];

fn seeded_dataset(records: u64) -> Dataset {
    let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
    let date = |i: u64| start.checked_add_days(Days::new(i % 365)).unwrap();

    // Deterministic spread so trend fitting sees a real slope.
    let shipments = (0..records)
        .map(|i| ShipmentRecord {
            date: date(i),
            route_id: format!("R-{}", i % 12),
            region: REGIONS[(i % 4) as usize].to_string(),
            fuel_used_l: 300.0 + (i % 97) as f64,
            fuel_price_per_l: 1.4 + (i % 365) as f64 * 0.001,
            delay_hr: (i % 9) as f64 * 0.5,
            shipment_volume_tons: 15.0,
        })
        .collect();
    let sales = (0..records)
        .map(|i| SaleRecord {
            date: date(i),
            order_id: format!("O-{i}"),
            product_id: format!("P-{}", i % 25),
            region: REGIONS[(i % 4) as usize].to_string(),
            units_sold: 1 + i % 7,
            unit_price: 40.0,
            revenue: 40.0 * (1 + i % 7) as f64,
        })
        .collect();

    Dataset {
        shipments,
        sales,
        finance: Vec::new(),
    }
}

fn requests() -> Vec<ScenarioRequest> {
    [
        json!({ "type": "fuel_price", "parameters": { "fuel_increase_percent": 12, "use_ml_predictions": true } }),
        json!({ "type": "demand_forecast", "parameters": { "demand_increase_percent": 20, "time_horizon_months": 24 } }),
        json!({ "type": "warehouse_expansion", "parameters": { "location": "Quebec", "investment_cost": 2_000_000 } }),
        json!({ "type": "route_optimization", "parameters": { "optimization_type": "balanced" } }),
    ]
    .iter()
    .map(|body| ScenarioRequest::from_json(body).unwrap())
    .collect()
}

fn bench_engine_run(c: &mut Criterion) {
    let provider = InMemoryProvider::new(seeded_dataset(5_000));
    let engine = ProjectionEngine::default();
    let requests = requests();

    let mut group = c.benchmark_group("projection_run");
    group.throughput(Throughput::Elements(1));
    for request in &requests {
        let name = request.scenario_type.clone().unwrap_or_default();
        group.bench_function(name, |b| {
            b.iter(|| black_box(engine.run(black_box(request), &provider).unwrap()));
        });
    }
    group.finish();
}

fn bench_dashboard(c: &mut Criterion) {
    let provider = InMemoryProvider::new(seeded_dataset(5_000));
    let dataset = provider.dataset();

    let mut group = c.benchmark_group("dashboard_report");
    for kind in [
        DashboardKind::Overview,
        DashboardKind::Trends,
        DashboardKind::AnalyticsKpis,
    ] {
        let query = DashboardQuery::new(kind, 30);
        group.bench_function(kind.as_str(), |b| {
            b.iter(|| black_box(insightgrid::dashboard::build_report(dataset, &query)));
        });
    }
    group.finish();
}

fn bench_runtime_overhead(c: &mut Criterion) {
    let runtime = SimulationRuntime::new(
        ProjectionEngine::default(),
        Arc::new(InMemoryProvider::new(seeded_dataset(1_000))),
        RuntimeConfig {
            workers: 2,
            queue_capacity: 64,
            request_timeout: Duration::from_secs(5),
        },
    )
    .unwrap();
    let request = requests().remove(3);

    let mut group = c.benchmark_group("runtime_overhead");
    group.throughput(Throughput::Elements(1));
    group.bench_function("simulate_round_trip", |b| {
        b.iter(|| black_box(runtime.simulate(request.clone()).unwrap()));
    });
    group.finish();
}

criterion_group!(
    projection,
    bench_engine_run,
    bench_dashboard,
    bench_runtime_overhead
);
criterion_main!(projection);
