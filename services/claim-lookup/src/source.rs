use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::config::RpcConfig;

// ---------------------------------------------------------------------------
// ClaimSource: where raw claim records come from
//
// Production talks JSON-RPC to lbrycrd; tests and offline runs use the
// in-memory StaticClaimSource. Records are passed through untouched apart
// from the `value` field, which the lookup service replaces.
// ---------------------------------------------------------------------------

/// RPC code lbrycrd uses for "no such transaction".
const RPC_INVALID_ADDRESS_OR_KEY: i64 = -5;

#[derive(thiserror::Error, Debug)]
pub enum SourceError {
    #[error("transport: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("daemon answered HTTP {0} without a JSON-RPC body")]
    Status(u16),
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("unexpected response shape: {0}")]
    Shape(String),
}

/// One claim as reported by the daemon.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClaimRecord(pub Map<String, Value>);

impl ClaimRecord {
    /// Raw payload, one character per byte.
    pub fn payload(&self) -> Option<&str> {
        self.0.get("value").and_then(Value::as_str)
    }

    pub fn output_index(&self) -> Option<u64> {
        self.0.get("nOut").and_then(Value::as_u64)
    }

    pub fn claim_id(&self) -> Option<&str> {
        self.0.get("claimId").and_then(Value::as_str)
    }

    /// Same record with `value` replaced.
    pub fn with_value(mut self, value: Value) -> Self {
        self.0.insert("value".into(), value);
        self
    }
}

#[async_trait::async_trait]
pub trait ClaimSource: Send + Sync {
    /// Every claim output of a transaction. Empty when the tx has none.
    async fn claims_for_tx(&self, txid: &str) -> Result<Vec<ClaimRecord>, SourceError>;

    /// The currently winning claim for a name, if any.
    async fn value_for_name(&self, name: &str) -> Result<Option<ClaimRecord>, SourceError>;
}

// =========================================================================
// RpcClaimSource: lbrycrd JSON-RPC 1.0 over HTTP basic auth
// =========================================================================

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: &'static str,
    method: &'a str,
    params: Value,
}

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

pub struct RpcClaimSource {
    inner: reqwest::Client,
    url: String,
    user: String,
    password: String,
}

impl RpcClaimSource {
    pub fn new(cfg: &RpcConfig) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder().timeout(cfg.timeout).build()?;
        Ok(Self {
            inner: client,
            url: cfg.url(),
            user: cfg.user.clone(),
            password: cfg.password.clone(),
        })
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, SourceError> {
        let t0 = std::time::Instant::now();
        let resp = self
            .inner
            .post(&self.url)
            .basic_auth(&self.user, Some(&self.password))
            .json(&RpcRequest {
                jsonrpc: "1.0",
                id: "claim-lookup",
                method,
                params,
            })
            .send()
            .await?;

        // bitcoind-style daemons report RPC errors with HTTP 500 and a JSON body.
        let status = resp.status();
        let body: RpcResponse = match resp.json().await {
            Ok(body) => body,
            Err(_) if !status.is_success() => return Err(SourceError::Status(status.as_u16())),
            Err(e) => return Err(e.into()),
        };

        tracing::debug!(
            method = %method,
            status = status.as_u16(),
            latency_ms = t0.elapsed().as_millis() as u64,
            "rpc.call"
        );

        match body.error {
            Some(RpcErrorBody { code, message }) => Err(SourceError::Rpc { code, message }),
            None => Ok(body.result),
        }
    }
}

#[async_trait::async_trait]
impl ClaimSource for RpcClaimSource {
    async fn claims_for_tx(&self, txid: &str) -> Result<Vec<ClaimRecord>, SourceError> {
        let result = match self.call("getclaimsfortx", json!([txid])).await {
            Ok(result) => result,
            Err(SourceError::Rpc { code, .. }) if code == RPC_INVALID_ADDRESS_OR_KEY => {
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };
        match result {
            Value::Null => Ok(Vec::new()),
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::Object(m) => Ok(ClaimRecord(m)),
                    other => Err(SourceError::Shape(format!(
                        "getclaimsfortx item is not an object: {other}"
                    ))),
                })
                .collect(),
            other => Err(SourceError::Shape(format!(
                "getclaimsfortx returned {other}"
            ))),
        }
    }

    async fn value_for_name(&self, name: &str) -> Result<Option<ClaimRecord>, SourceError> {
        match self.call("getvalueforname", json!([name])).await? {
            Value::Null => Ok(None),
            Value::Object(m) if m.is_empty() => Ok(None),
            Value::Object(m) => Ok(Some(ClaimRecord(m))),
            other => Err(SourceError::Shape(format!(
                "getvalueforname returned {other}"
            ))),
        }
    }
}

// =========================================================================
// StaticClaimSource: fixed in-memory records
// =========================================================================

#[derive(Default)]
pub struct StaticClaimSource {
    by_tx: HashMap<String, Vec<ClaimRecord>>,
    by_name: HashMap<String, ClaimRecord>,
}

impl StaticClaimSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tx(mut self, txid: &str, claims: Vec<ClaimRecord>) -> Self {
        self.by_tx.insert(txid.to_string(), claims);
        self
    }

    pub fn with_name(mut self, name: &str, claim: ClaimRecord) -> Self {
        self.by_name.insert(name.to_string(), claim);
        self
    }
}

#[async_trait::async_trait]
impl ClaimSource for StaticClaimSource {
    async fn claims_for_tx(&self, txid: &str) -> Result<Vec<ClaimRecord>, SourceError> {
        Ok(self.by_tx.get(txid).cloned().unwrap_or_default())
    }

    async fn value_for_name(&self, name: &str) -> Result<Option<ClaimRecord>, SourceError> {
        Ok(self.by_name.get(name).cloned())
    }
}
