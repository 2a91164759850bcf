use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use claim_core::{ByteSource, NormalizedClaim};
use serde_json::{json, Value};

use crate::source::{ClaimRecord, ClaimSource, SourceError};

// ---------------------------------------------------------------------------
// ClaimLookupService: fetch → decode → normalize, one request at a time
//
// Each request walks Fetching → Decoding → Normalizing → Done, or stops in
// Failed. The response is the daemon's record with `value` swapped for the
// normalized claim. Decoder detail stays in the logs.
// ---------------------------------------------------------------------------

pub const DECODE_FAILED_BODY: &str = "error when decoding claims";
pub const FETCH_FAILED_BODY: &str = "error when fetching claims";

#[derive(thiserror::Error, Debug)]
pub enum LookupError {
    #[error("claim not found")]
    NotFound,
    #[error("decode: {0}")]
    Decode(#[from] claim_core::Error),
    #[error("upstream: {0}")]
    Upstream(#[from] SourceError),
    /// Output index in the request path is not a number.
    #[error("bad output index {0:?}")]
    BadOutputIndex(String),
}

impl IntoResponse for LookupError {
    fn into_response(self) -> Response {
        match self {
            LookupError::NotFound => StatusCode::NOT_FOUND.into_response(),
            LookupError::Decode(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, DECODE_FAILED_BODY).into_response()
            }
            LookupError::BadOutputIndex(raw) => {
                tracing::warn!(nout = %raw, "output index is not a number");
                (StatusCode::INTERNAL_SERVER_ERROR, DECODE_FAILED_BODY).into_response()
            }
            LookupError::Upstream(e) => {
                tracing::error!(error = %e, "claim source failed");
                (StatusCode::BAD_GATEWAY, FETCH_FAILED_BODY).into_response()
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Fetching,
    Decoding,
    Normalizing,
    Done,
    Failed,
}

fn enter(stage: Stage, key: &str) {
    tracing::debug!(?stage, key = %key, "lookup stage");
}

#[derive(Clone)]
pub struct ClaimLookupService {
    source: Arc<dyn ClaimSource>,
}

impl ClaimLookupService {
    pub fn new(source: Arc<dyn ClaimSource>) -> Self {
        Self { source }
    }

    /// Claim at `output_index` of `txid`, decoded.
    pub async fn decode_by_transaction(
        &self,
        txid: &str,
        output_index: u32,
    ) -> Result<ClaimRecord, LookupError> {
        enter(Stage::Fetching, txid);
        let claims = self.source.claims_for_tx(txid).await.map_err(|e| {
            enter(Stage::Failed, txid);
            e
        })?;
        let record = claims
            .into_iter()
            .find(|c| c.output_index() == Some(u64::from(output_index)))
            .ok_or_else(|| {
                enter(Stage::Failed, txid);
                LookupError::NotFound
            })?;
        decode_record(record, txid)
    }

    /// Winning claim for `name`, decoded.
    pub async fn decode_by_name(&self, name: &str) -> Result<ClaimRecord, LookupError> {
        enter(Stage::Fetching, name);
        let record = self
            .source
            .value_for_name(name)
            .await
            .map_err(|e| {
                enter(Stage::Failed, name);
                e
            })?
            .ok_or_else(|| {
                enter(Stage::Failed, name);
                LookupError::NotFound
            })?;
        decode_record(record, name)
    }

    /// Every claim of `txid`. A claim that does not decode is reported in
    /// place as `{"error": "non_decodable"}`.
    pub async fn decode_transaction(&self, txid: &str) -> Result<Vec<ClaimRecord>, LookupError> {
        enter(Stage::Fetching, txid);
        let claims = self.source.claims_for_tx(txid).await.map_err(|e| {
            enter(Stage::Failed, txid);
            e
        })?;
        if claims.is_empty() {
            enter(Stage::Failed, txid);
            return Err(LookupError::NotFound);
        }
        Ok(claims
            .into_iter()
            .map(|record| match decode_record(record.clone(), txid) {
                Ok(decoded) => decoded,
                Err(_) => record.with_value(json!({ "error": "non_decodable" })),
            })
            .collect())
    }
}

fn decode_record(record: ClaimRecord, target: &str) -> Result<ClaimRecord, LookupError> {
    // A record without a string `value` decodes as an empty payload.
    let payload = record.payload().unwrap_or_default();
    match decode_payload(payload, target) {
        Ok(claim) => {
            enter(Stage::Done, target);
            Ok(record.with_value(claim.to_json()))
        }
        Err(e) => {
            enter(Stage::Failed, target);
            tracing::warn!(
                key = %target,
                claim_id = record.claim_id().unwrap_or("-"),
                error = %e,
                "claim payload did not decode"
            );
            Err(e.into())
        }
    }
}

fn decode_payload(payload: &str, target: &str) -> claim_core::Result<NormalizedClaim> {
    enter(Stage::Decoding, target);
    let source = ByteSource::from_chars(payload)?;
    let format = claim_core::sniff(source.bytes()).ok_or(claim_core::Error::UnrecognizedFormat {
        marker: source.bytes().first().copied(),
    })?;
    let (decoded, diagnostics) = claim_core::decode_as(source.bytes(), format)?;
    if !diagnostics.is_clean() {
        tracing::warn!(key = %target, revision = %format.revision, %diagnostics, "claim carried unknown data");
    }

    enter(Stage::Normalizing, target);
    claim_core::normalize(&decoded, format.revision)
}

/// Records as a JSON array, in daemon order.
pub fn records_to_json(records: Vec<ClaimRecord>) -> Value {
    Value::Array(records.into_iter().map(|r| Value::Object(r.0)).collect())
}
