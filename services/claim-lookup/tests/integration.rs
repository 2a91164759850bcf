// ==========================================================================
// Integration Test: HTTP lookups end to end
//
// Spins up the real Axum server over an in-memory claim source, and a mock
// lbrycrd JSON-RPC endpoint for the RPC-backed source.
//
// Run:
//   cargo test -p claim-lookup --test integration
// ==========================================================================

use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderMap, StatusCode as AxumStatus};
use axum::response::IntoResponse;
use axum::{routing::post, Json, Router};
use claim_core::wire::{put_len_field, put_varint_field};
use claim_core::ByteSource;
use claim_lookup::config::{Config, RpcConfig};
use claim_lookup::source::{ClaimRecord, ClaimSource, RpcClaimSource, SourceError, StaticClaimSource};
use reqwest::StatusCode;
use serde_json::{json, Value};

/// Find a free port on localhost
fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

async fn serve(app: Router) -> String {
    let port = free_port();
    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{port}"))
        .await
        .unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    format!("http://127.0.0.1:{port}")
}

/// Start the lookup server over `source`, return the base URL
async fn start_server(source: Arc<dyn ClaimSource>) -> String {
    let state = claim_lookup::AppState::new(source);
    serve(claim_lookup::build_router(state)).await
}

// --------------------------------------------------------------------------
// Payload fixtures (raw bytes delivered one character per byte)
// --------------------------------------------------------------------------

const CHANNEL_HASH: [u8; 20] = [
    0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e, 0x0f,
    0x10, 0x11, 0x12, 0x13, 0x14,
];

fn as_chars(bytes: Vec<u8>) -> String {
    ByteSource::from_bytes(bytes).to_chars()
}

fn current_body(title: &str) -> Vec<u8> {
    let mut source = Vec::new();
    put_len_field(&mut source, 2, b"clip.mp4");
    put_varint_field(&mut source, 3, 4096);
    put_len_field(&mut source, 4, b"video/mp4");
    put_len_field(&mut source, 6, &[0xab; 48]);

    let mut stream = Vec::new();
    put_len_field(&mut stream, 1, &source);
    put_len_field(&mut stream, 2, b"someone");

    let mut claim = Vec::new();
    put_len_field(&mut claim, 1, &stream);
    put_len_field(&mut claim, 8, title.as_bytes());
    claim
}

fn unsigned_payload(title: &str) -> String {
    let mut raw = vec![0x00];
    raw.extend(current_body(title));
    as_chars(raw)
}

fn signed_payload(title: &str) -> String {
    let mut raw = vec![0x01];
    raw.extend(CHANNEL_HASH);
    raw.extend([0x5a; 64]);
    raw.extend(current_body(title));
    as_chars(raw)
}

fn record(v: Value) -> ClaimRecord {
    serde_json::from_value(v).unwrap()
}

fn fixture_source() -> Arc<dyn ClaimSource> {
    Arc::new(
        StaticClaimSource::new()
            .with_tx(
                "abc123",
                vec![
                    record(json!({"name": "first", "claimId": "c0", "nOut": 0, "amount": 1, "value": unsigned_payload("zero")})),
                    record(json!({"name": "second", "claimId": "c1", "nOut": 1, "amount": 2, "value": signed_payload("one")})),
                ],
            )
            .with_tx(
                "mixed",
                vec![
                    record(json!({"nOut": 0, "value": unsigned_payload("fine")})),
                    record(json!({"nOut": 1, "value": "\u{7f}not a claim"})),
                ],
            )
            .with_name("badmarker", record(json!({"name": "badmarker", "value": "\u{7f}\u{0}\u{0}"})))
            .with_name("goodname", record(json!({"name": "goodname", "claimId": "c9", "value": unsigned_payload("by name")}))),
    )
}

// ==========================================================================
// Lookups over the in-memory source
// ==========================================================================

#[tokio::test]
async fn test_health() {
    let base = start_server(fixture_source()).await;
    for path in ["health", "healthz"] {
        let resp = reqwest::get(format!("{base}/{path}")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["status"], "ok");
    }
}

#[tokio::test]
async fn test_decode_by_transaction_picks_output() {
    let base = start_server(fixture_source()).await;
    let resp = reqwest::get(format!("{base}/claim_decode/abc123/1")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();

    // Daemon fields pass through; only `value` is replaced.
    assert_eq!(body["name"], "second");
    assert_eq!(body["claimId"], "c1");
    assert_eq!(body["amount"], 2);
    assert_eq!(body["value"]["claim_type"], "stream");
    assert_eq!(body["value"]["version"], "2");
    assert_eq!(body["value"]["fields"]["title"], "one");
    assert_eq!(body["value"]["fields"]["file_name"], "clip.mp4");
    let mut reversed = CHANNEL_HASH;
    reversed.reverse();
    assert_eq!(body["value"]["certificate_id"], hex::encode(reversed));
}

#[tokio::test]
async fn test_unsigned_claim_has_no_certificate_id() {
    let base = start_server(fixture_source()).await;
    let body: Value = reqwest::get(format!("{base}/claim_decode/abc123/0"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["value"]["fields"]["title"], "zero");
    assert!(body["value"].get("certificate_id").is_none());
}

#[tokio::test]
async fn test_missing_output_is_404() {
    let base = start_server(fixture_source()).await;
    let resp = reqwest::get(format!("{base}/claim_decode/abc123/5")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(resp.text().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_non_numeric_output_is_500() {
    let base = start_server(fixture_source()).await;
    for nout in ["first", "-1", "4294967296"] {
        let resp = reqwest::get(format!("{base}/claim_decode/abc123/{nout}")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR, "{nout}");
        assert_eq!(resp.text().await.unwrap(), "error when decoding claims");
    }
}

#[tokio::test]
async fn test_unclaimed_name_is_404_with_empty_body() {
    let base = start_server(fixture_source()).await;
    let resp = reqwest::get(format!("{base}/claim_decodeinv/unclaimedname")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(resp.text().await.unwrap(), "");
}

#[tokio::test]
async fn test_decode_by_name() {
    let base = start_server(fixture_source()).await;
    let resp = reqwest::get(format!("{base}/claim_decodeinv/goodname")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["claimId"], "c9");
    assert_eq!(body["value"]["fields"]["title"], "by name");
}

#[tokio::test]
async fn test_unrecognized_marker_is_500() {
    let base = start_server(fixture_source()).await;
    let resp = reqwest::get(format!("{base}/claim_decodeinv/badmarker")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(resp.text().await.unwrap(), "error when decoding claims");
}

#[tokio::test]
async fn test_whole_transaction_reports_non_decodable_in_place() {
    let base = start_server(fixture_source()).await;
    let resp = reqwest::get(format!("{base}/claim_decode/mixed")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    let claims = body.as_array().unwrap();
    assert_eq!(claims.len(), 2);
    assert_eq!(claims[0]["value"]["fields"]["title"], "fine");
    assert_eq!(claims[1]["nOut"], 1);
    assert_eq!(claims[1]["value"], json!({"error": "non_decodable"}));

    let resp = reqwest::get(format!("{base}/claim_decode/nosuchtx")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

struct BrokenSource;

#[async_trait::async_trait]
impl ClaimSource for BrokenSource {
    async fn claims_for_tx(&self, _txid: &str) -> Result<Vec<ClaimRecord>, SourceError> {
        Err(SourceError::Status(503))
    }

    async fn value_for_name(&self, _name: &str) -> Result<Option<ClaimRecord>, SourceError> {
        Err(SourceError::Rpc {
            code: -28,
            message: "Loading block index...".into(),
        })
    }
}

#[tokio::test]
async fn test_upstream_failure_is_502() {
    let base = start_server(Arc::new(BrokenSource)).await;
    for path in ["claim_decode/abc123/0", "claim_decode/abc123", "claim_decodeinv/name"] {
        let resp = reqwest::get(format!("{base}/{path}")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY, "{path}");
        assert_eq!(resp.text().await.unwrap(), "error when fetching claims");
    }
}

struct PanickingSource;

#[async_trait::async_trait]
impl ClaimSource for PanickingSource {
    async fn claims_for_tx(&self, txid: &str) -> Result<Vec<ClaimRecord>, SourceError> {
        panic!("daemon handed back garbage for {txid}")
    }

    async fn value_for_name(&self, _name: &str) -> Result<Option<ClaimRecord>, SourceError> {
        panic!("daemon handed back garbage")
    }
}

#[tokio::test]
async fn test_handler_panic_is_500() {
    let base = start_server(Arc::new(PanickingSource)).await;
    for path in ["claim_decode/abc123/0", "claim_decode/abc123", "claim_decodeinv/name"] {
        let resp = reqwest::get(format!("{base}/{path}")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR, "{path}");
        assert_eq!(resp.text().await.unwrap(), "error when decoding claims");
    }
    // The server survives.
    let resp = reqwest::get(format!("{base}/health")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

// ==========================================================================
// RpcClaimSource against a mock lbrycrd
// ==========================================================================

/// base64("alice:s3cret")
const EXPECTED_AUTH: &str = "Basic YWxpY2U6czNjcmV0";

async fn mock_rpc(headers: HeaderMap, Json(req): Json<Value>) -> axum::response::Response {
    if headers.get("authorization").and_then(|v| v.to_str().ok()) != Some(EXPECTED_AUTH) {
        return AxumStatus::UNAUTHORIZED.into_response();
    }
    assert_eq!(req["jsonrpc"], "1.0");
    let arg = req["params"][0].as_str().unwrap_or_default().to_string();
    let ok = |result: Value| Json(json!({"result": result, "error": null, "id": req["id"]})).into_response();
    match (req["method"].as_str().unwrap_or_default(), arg.as_str()) {
        ("getclaimsfortx", "abc123") => ok(json!([
            {"name": "first", "nOut": 0, "value": unsigned_payload("zero")},
            {"name": "second", "nOut": 1, "value": signed_payload("one")},
        ])),
        ("getclaimsfortx", "nulltx") => ok(Value::Null),
        ("getclaimsfortx", _) => (
            AxumStatus::INTERNAL_SERVER_ERROR,
            Json(json!({"result": null, "error": {"code": -5, "message": "No information available about transaction"}, "id": req["id"]})),
        )
            .into_response(),
        ("getvalueforname", "somename") => ok(json!({"name": "somename", "nOut": 0, "value": unsigned_payload("rpc")})),
        ("getvalueforname", _) => ok(json!({})),
        _ => (
            AxumStatus::NOT_FOUND,
            Json(json!({"result": null, "error": {"code": -32601, "message": "Method not found"}, "id": req["id"]})),
        )
            .into_response(),
    }
}

async fn start_mock_rpc() -> u16 {
    let base = serve(Router::new().route("/", post(mock_rpc))).await;
    base.rsplit(':').next().unwrap().parse().unwrap()
}

fn rpc_config(port: u16, password: &str) -> RpcConfig {
    RpcConfig {
        host: "127.0.0.1".into(),
        port,
        user: "alice".into(),
        password: password.into(),
        timeout: Duration::from_secs(5),
    }
}

#[tokio::test]
async fn test_rpc_source_fetches_and_interprets_results() {
    let port = start_mock_rpc().await;
    let src = RpcClaimSource::new(&rpc_config(port, "s3cret")).unwrap();

    let claims = src.claims_for_tx("abc123").await.unwrap();
    assert_eq!(claims.len(), 2);
    assert_eq!(claims[1].output_index(), Some(1));

    assert!(src.claims_for_tx("nulltx").await.unwrap().is_empty());
    // -5: unknown transaction
    assert!(src.claims_for_tx("unknowntx").await.unwrap().is_empty());

    assert!(src.value_for_name("somename").await.unwrap().is_some());
    assert!(src.value_for_name("unclaimedname").await.unwrap().is_none());
}

#[tokio::test]
async fn test_rpc_source_bad_credentials() {
    let port = start_mock_rpc().await;
    let src = RpcClaimSource::new(&rpc_config(port, "wrong")).unwrap();
    let err = src.claims_for_tx("abc123").await.unwrap_err();
    assert!(matches!(err, SourceError::Status(401)), "{err:?}");
}

#[tokio::test]
async fn test_full_stack_over_rpc() {
    let port = start_mock_rpc().await;
    let cfg = Config {
        rpc: rpc_config(port, "s3cret"),
        ..Config::default()
    };
    let source = Arc::new(RpcClaimSource::new(&cfg.rpc).unwrap());
    let base = serve(claim_lookup::build_router(claim_lookup::AppState::new(source))).await;

    let body: Value = reqwest::get(format!("{base}/claim_decode/abc123/0"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["value"]["fields"]["title"], "zero");

    let resp = reqwest::get(format!("{base}/claim_decode/unknowntx/0")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = reqwest::get(format!("{base}/claim_decodeinv/unclaimedname")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let body: Value = reqwest::get(format!("{base}/claim_decodeinv/somename"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["value"]["fields"]["title"], "rpc");
}
