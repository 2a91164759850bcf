use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde_json::Value;
use std::sync::Arc;

use crate::lookup::{records_to_json, LookupError};
use crate::AppState;

// ---------------------------------------------------------------------------
// Claim routes
//
// Handlers only extract path params and hand off to ClaimLookupService;
// LookupError carries the status mapping.
// ---------------------------------------------------------------------------

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/claim_decode/:txid", get(decode_transaction))
        .route("/claim_decode/:txid/:nout", get(decode_by_transaction))
        .route("/claim_decodeinv/:name", get(decode_by_name))
}

async fn decode_by_transaction(
    Path((txid, nout)): Path<(String, String)>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, LookupError> {
    let nout: u32 = nout.parse().map_err(|_| LookupError::BadOutputIndex(nout))?;
    let record = state.lookup.decode_by_transaction(&txid, nout).await?;
    Ok(Json(Value::Object(record.0)))
}

async fn decode_by_name(
    Path(name): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, LookupError> {
    let record = state.lookup.decode_by_name(&name).await?;
    Ok(Json(Value::Object(record.0)))
}

async fn decode_transaction(
    Path(txid): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, LookupError> {
    let records = state.lookup.decode_transaction(&txid).await?;
    Ok(Json(records_to_json(records)))
}
