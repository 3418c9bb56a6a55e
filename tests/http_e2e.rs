use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use insightgrid::{
    build_router, AppState, Dataset, InMemoryProvider, ProjectionEngine, RuntimeConfig,
    SimulationRuntime,
};

struct RawResponse {
    status: u16,
    head: String,
    body: String,
}

impl RawResponse {
    fn json(&self) -> Value {
        serde_json::from_str(&self.body).expect("json body")
    }

    fn header(&self, name: &str) -> Option<String> {
        self.head.lines().find_map(|line| {
            let (k, v) = line.split_once(':')?;
            k.trim()
                .eq_ignore_ascii_case(name)
                .then(|| v.trim().to_string())
        })
    }
}

async fn send_raw(
    addr: SocketAddr,
    method: &str,
    path: &str,
    headers: &[(&str, &str)],
    body: Option<&str>,
) -> RawResponse {
    let mut stream = tokio::net::TcpStream::connect(addr)
        .await
        .expect("connect server");
    let mut req = format!("{method} {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n");
    for (k, v) in headers {
        req.push_str(&format!("{k}: {v}\r\n"));
    }
    if let Some(body) = body {
        req.push_str("Content-Type: application/json\r\n");
        req.push_str(&format!("Content-Length: {}\r\n\r\n{body}", body.len()));
    } else {
        req.push_str("\r\n");
    }
    stream
        .write_all(req.as_bytes())
        .await
        .expect("write request");
    let mut response = String::new();
    stream
        .read_to_string(&mut response)
        .await
        .expect("read response");
    let (head, body) = response
        .split_once("\r\n\r\n")
        .map(|(h, b)| (h.to_string(), b.to_string()))
        .unwrap_or_else(|| (response.clone(), String::new()));
    let status = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|code| code.parse::<u16>().ok())
        .expect("status line");
    RawResponse { status, head, body }
}

async fn spawn_server() -> SocketAddr {
    let sample = Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/sample_dataset.json");
    let dataset = Dataset::from_path(&sample).expect("sample dataset");
    let runtime = SimulationRuntime::new(
        ProjectionEngine::default(),
        Arc::new(InMemoryProvider::new(dataset)),
        RuntimeConfig {
            workers: 2,
            queue_capacity: 16,
            request_timeout: Duration::from_secs(5),
        },
    )
    .expect("start runtime");
    let app = build_router(AppState::new(Arc::new(runtime)).with_max_body_bytes(4 * 1024));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move { axum::serve(listener, app).await.expect("serve app") });
    addr
}

#[tokio::test]
async fn simulate_returns_projection() {
    let addr = spawn_server().await;
    let body = r#"{"type":"fuel_price","parameters":{"fuel_increase_percent":10,"time_horizon_months":6}}"#;

    let resp = send_raw(addr, "POST", "/simulate", &[], Some(body)).await;
    assert_eq!(resp.status, 200);
    let json = resp.json();
    assert_eq!(json["scenario"], "Fuel Price Increase");
    assert_eq!(json["result"]["monthly_breakdown"].as_array().map(Vec::len), Some(6));
    assert!(json["result"]["total_cost_impact"].as_f64().unwrap() > 0.0);
    // Eight shipments is a thin sample.
    assert_eq!(json["result"]["low_confidence"], true);

    let root = send_raw(addr, "POST", "/", &[], Some(body)).await;
    assert_eq!(root.status, 200);
    assert_eq!(root.json()["result"]["fingerprint"], json["result"]["fingerprint"]);
}

#[tokio::test]
async fn validation_errors_name_the_field() {
    let addr = spawn_server().await;

    let resp = send_raw(
        addr,
        "POST",
        "/simulate",
        &[],
        Some(r#"{"type":"warehouse_expansion","parameters":{"location":"Toronto"}}"#),
    )
    .await;
    assert_eq!(resp.status, 400);
    let json = resp.json();
    assert_eq!(json["error"]["code"], "missing_parameter");
    assert_eq!(json["error"]["field"], "investment_cost");
    assert_eq!(json["error"]["retryable"], false);

    let resp = send_raw(addr, "POST", "/simulate", &[], Some("{broken")).await;
    assert_eq!(resp.status, 400);
    assert_eq!(resp.json()["error"]["field"], "body");

    let resp = send_raw(
        addr,
        "POST",
        "/simulate",
        &[],
        Some(r#"{"type":"teleport","parameters":{}}"#),
    )
    .await;
    assert_eq!(resp.status, 400);
    assert_eq!(resp.json()["error"]["code"], "unknown_scenario");
}

#[tokio::test]
async fn dashboard_queries() {
    let addr = spawn_server().await;

    let resp = send_raw(addr, "GET", "/data", &[], None).await;
    assert_eq!(resp.status, 200);
    let overview = resp.json();
    assert_eq!(overview["total_orders"], 6);
    assert_eq!(overview["active_shipments"], 8);

    let resp = send_raw(addr, "GET", "/data?type=trends&days=3", &[], None).await;
    assert_eq!(resp.status, 200);
    assert_eq!(resp.json()["trends"].as_array().map(Vec::len), Some(3));

    let resp = send_raw(addr, "GET", "/?type=regional-performance", &[], None).await;
    assert_eq!(resp.status, 200);
    assert!(resp.json()["regions"].is_array());

    let resp = send_raw(addr, "GET", "/data?type=weather", &[], None).await;
    assert_eq!(resp.status, 400);
    let json = resp.json();
    assert_eq!(json["error"]["code"], "unknown_query");
    let available = json["available_types"].as_array().expect("available types");
    assert!(available.iter().any(|t| *t == "overview"));

    let resp = send_raw(addr, "GET", "/data?type=trends&days=900", &[], None).await;
    assert_eq!(resp.status, 400);
    assert_eq!(resp.json()["error"]["field"], "days");
}

#[tokio::test]
async fn cors_preflight_and_request_ids() {
    let addr = spawn_server().await;

    let resp = send_raw(addr, "OPTIONS", "/simulate", &[], None).await;
    assert_eq!(resp.status, 200);
    assert_eq!(resp.header("access-control-allow-origin").as_deref(), Some("*"));
    assert_eq!(
        resp.header("access-control-allow-methods").as_deref(),
        Some("GET,POST,OPTIONS")
    );

    let resp = send_raw(addr, "GET", "/healthz", &[("x-request-id", "req-42")], None).await;
    assert_eq!(resp.status, 200);
    assert_eq!(resp.header("x-request-id").as_deref(), Some("req-42"));
    assert_eq!(resp.header("access-control-allow-origin").as_deref(), Some("*"));

    let resp = send_raw(addr, "GET", "/healthz", &[], None).await;
    let generated = resp.header("x-request-id").expect("generated request id");
    assert!(uuid::Uuid::parse_str(&generated).is_ok());
}

#[tokio::test]
async fn healthz_and_unknown_routes() {
    let addr = spawn_server().await;

    let resp = send_raw(addr, "GET", "/healthz", &[], None).await;
    assert_eq!(resp.status, 200);
    let json = resp.json();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["workers"], 2);
    assert_eq!(json["queue_capacity"], 16);

    let resp = send_raw(addr, "GET", "/nope", &[], None).await;
    assert_eq!(resp.status, 404);
    assert_eq!(resp.json()["error"]["code"], "not_found");
}
