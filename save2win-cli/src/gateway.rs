//! Context gateway: fetches raw transaction history for an account and
//! wraps it in the context envelope consumed by the engine.

use anyhow::{Context, Result, anyhow};
use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, header::AUTHORIZATION},
    routing::get,
};
use reqwest::Url;
use save2win_ingest::{ContextEnvelope, Provider, enrich_transactions, transactions_from_payload};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use crate::{error::ApiError, health, state::GatewayState};

pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/v1/context/transactions", get(get_transaction_context))
        .merge(health::routes("mcp-service"))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct ContextQuery {
    pub account_id: Option<String>,
}

/// `{base}/{account_id}` with the id encoded as a single path segment.
pub fn history_url(base: &str, account_id: &str) -> Result<Url> {
    let mut url = Url::parse(base).with_context(|| format!("invalid history URL {base}"))?;
    url.path_segments_mut()
        .map_err(|_| anyhow!("history URL {base} cannot take a path"))?
        .pop_if_empty()
        .push(account_id);
    Ok(url)
}

pub async fn get_transaction_context(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    Query(query): Query<ContextQuery>,
) -> Result<Json<ContextEnvelope>, ApiError> {
    let account_id = query
        .account_id
        .filter(|a| !a.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing 'account_id' query parameter.".to_string()))?;
    if account_id == "." || account_id == ".." {
        return Err(ApiError::BadRequest("Invalid 'account_id' query parameter.".to_string()));
    }

    let authorization = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    let url = history_url(&state.config.gateway.transactions_api_url, &account_id)?;
    tracing::info!("fetching transactions for account '{account_id}' from {url}");

    let payload = state
        .upstream
        .get_json(url.as_str(), authorization, &[])
        .await
        .context("fetching transaction history")?;
    let raw = transactions_from_payload(payload);

    let (provider, data) = if state.config.gateway.enrich_transactions {
        let enriched = enrich_transactions(raw, &mut rand::rng());
        (Provider::BankOfAnthosEnriched, enriched)
    } else {
        (Provider::BankOfAnthos, raw)
    };
    tracing::info!("returning {} transactions for account '{account_id}'", data.len());

    Ok(Json(ContextEnvelope::new(provider, account_id, data)))
}
