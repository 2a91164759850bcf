use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use claim_lookup::config::Config;
use claim_lookup::source::RpcClaimSource;

// ---------------------------------------------------------------------------
// claim-lookup: resolve claims through lbrycrd and return them decoded
//
// GET /claim_decode/:txid/:nout   one claim output of a transaction
// GET /claim_decode/:txid         every claim output of a transaction
// GET /claim_decodeinv/:name      the winning claim for a name
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "claim_lookup=info,axum=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = Config::from_env().context("loading configuration")?;
    tracing::info!(rpc = ?cfg.rpc, "claim source: lbrycrd at {}", cfg.rpc.url());
    let source = Arc::new(RpcClaimSource::new(&cfg.rpc).context("building RPC client")?);

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr)
        .await
        .with_context(|| format!("binding {}", cfg.bind_addr))?;
    let app = claim_lookup::build_router(claim_lookup::AppState::new(source));

    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
