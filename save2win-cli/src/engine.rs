//! Game-state engine: authenticates the caller, pulls transaction context
//! from the gateway and serves summaries and game state.

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{FromRequestParts, State},
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    response::IntoResponse,
    routing::get,
};
use chrono::Utc;
use save2win_finance::{GameState, Summary, apply_game_rules, summarize};
use save2win_ingest::transactions_from_envelope;
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;

use crate::{
    auth::{self, KeyState},
    error::ApiError,
    health,
    state::EngineState,
};

pub fn router(state: EngineState) -> Router {
    Router::new()
        .route("/api/v1/summary", get(get_summary))
        .route("/api/v1/game-state", get(get_game_state))
        .route("/readyz", get(readiness))
        .merge(health::routes("save2win-engine"))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// An authenticated caller
#[derive(Debug)]
pub struct Caller {
    pub account_id: String,
    /// Original header, forwarded to the gateway
    pub authorization: String,
}

impl FromRequestParts<EngineState> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &EngineState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or_else(|| ApiError::NoAuth("Authorization header is required".to_owned()))?
            .to_str()
            .map_err(|_| ApiError::NoAuth("Authorization header is not ASCII".to_owned()))?;

        let token = auth::bearer_token(header)
            .ok_or_else(|| ApiError::NoAuth("expected a Bearer token".to_owned()))?;

        let key = state.keys.get_or_load(&state.key_source)?;

        let claims = auth::verify_jwt(key, token, Utc::now().timestamp())
            .map_err(|e| ApiError::NoAuth(format!("{e:#}")))?;

        let account_id = claims
            .account_id()
            .ok_or_else(|| ApiError::NoAuth("token has no account claim".to_owned()))?;

        Ok(Caller {
            account_id: account_id.to_owned(),
            authorization: header.to_owned(),
        })
    }
}

async fn fetch_transactions(state: &EngineState, caller: &Caller) -> Result<Vec<Value>, ApiError> {
    let envelope = state
        .gateway
        .get_json(
            &state.config.engine.mcp_service_url,
            Some(&caller.authorization),
            &[("account_id", caller.account_id.as_str())],
        )
        .await
        .context("could not connect to context gateway")?;

    let transactions = transactions_from_envelope(envelope);
    tracing::debug!(
        "fetched {} transactions for account '{}'",
        transactions.len(),
        caller.account_id
    );
    Ok(transactions)
}

/// Ready once the signing key has loaded.
pub async fn readiness(State(state): State<EngineState>) -> impl IntoResponse {
    // result is inspected through the cached state below
    let _ = state.keys.get_or_load(&state.key_source);
    match state.keys.state() {
        KeyState::Loaded => (StatusCode::OK, Json(json!({ "status": "ready" }))),
        KeyState::Failed(reason) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "unavailable", "error": reason })),
        ),
        KeyState::NotLoaded => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "starting" })),
        ),
    }
}

pub async fn get_summary(
    State(state): State<EngineState>,
    caller: Caller,
) -> Result<Json<Summary>, ApiError> {
    let transactions = fetch_transactions(&state, &caller).await?;
    Ok(Json(summarize(&transactions, Utc::now())))
}

pub async fn get_game_state(
    State(state): State<EngineState>,
    caller: Caller,
) -> Result<Json<GameState>, ApiError> {
    let transactions = fetch_transactions(&state, &caller).await?;
    let content = state.narrator.narrative(&transactions).await;
    Ok(Json(apply_game_rules(&transactions, &content)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{KeyCache, sign_hs256};
    use crate::config::Config;
    use crate::test_support::{json_body, spawn};
    use axum::{body::Body, extract::Query, http::HeaderMap, http::Request};
    use chrono::Duration;
    use save2win_ingest::{ContextEnvelope, Provider};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use tower::ServiceExt;

    type Seen = Arc<Mutex<Vec<(Option<String>, Option<String>)>>>;

    /// Context gateway stand-in serving a fixed envelope and recording
    /// the forwarded account and Authorization header.
    async fn spawn_gateway(seen: Seen) -> String {
        let days_ago = |d: i64| (Utc::now() - Duration::days(d)).to_rfc3339();
        let data = vec![
            json!({"date": days_ago(1), "label": "Blue Bottle Coffee", "amount": -6.5}),
            json!({"date": days_ago(2), "description": "SuperMart Groceries", "amount": "-$42.10"}),
            json!({"date": days_ago(3), "label": "Payroll", "category": "Income", "amount": 1200}),
        ];
        let handler = move |Query(q): Query<HashMap<String, String>>, headers: HeaderMap| {
            let seen = seen.clone();
            let data = data.clone();
            async move {
                let auth = headers
                    .get(AUTHORIZATION)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                seen.lock().unwrap().push((q.get("account_id").cloned(), auth));
                Json(ContextEnvelope::new(Provider::BankOfAnthos, "1234567890", data))
            }
        };
        let addr = spawn(Router::new().route("/v1/context/transactions", get(handler))).await;
        format!("http://{addr}/v1/context/transactions")
    }

    fn live_app(gateway_url: String) -> Router {
        let mut cfg = Config::default();
        cfg.engine.jwt_secret = Some("k".to_string());
        cfg.engine.mcp_service_url = gateway_url;
        let keys: &'static KeyCache = Box::leak(Box::new(KeyCache::new()));
        router(EngineState::new(Arc::new(cfg), keys).unwrap())
    }

    async fn authed_get(app: Router, path: &str, bearer: &str) -> (StatusCode, Value) {
        let req = Request::get(path)
            .header(AUTHORIZATION, bearer)
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        (resp.status(), json_body(resp).await)
    }

    fn app(secret: Option<&str>) -> Router {
        let mut cfg = Config::default();
        cfg.engine.jwt_secret = secret.map(str::to_string);
        cfg.engine.mcp_service_url = "http://127.0.0.1:9/v1/context/transactions".to_string();
        let keys: &'static KeyCache = Box::leak(Box::new(KeyCache::new()));
        router(EngineState::new(Arc::new(cfg), keys).unwrap())
    }

    async fn status(app: Router, auth: Option<String>) -> StatusCode {
        let mut req = Request::get("/api/v1/game-state");
        if let Some(a) = auth {
            req = req.header(AUTHORIZATION, a);
        }
        app.oneshot(req.body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn test_readiness_tracks_key_state() {
        let resp = app(Some("k"))
            .oneshot(Request::get("/readyz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = app(None)
            .oneshot(Request::get("/readyz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_missing_header_unauthorized() {
        assert_eq!(status(app(Some("k")), None).await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_bad_signature_unauthorized() {
        let token = sign_hs256(b"wrong", &json!({"acct": "1234567890"}));
        let got = status(app(Some("k")), Some(format!("Bearer {token}"))).await;
        assert_eq!(got, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_token_without_account_unauthorized() {
        let token = sign_hs256(b"k", &json!({"name": "demo"}));
        let got = status(app(Some("k")), Some(format!("Bearer {token}"))).await;
        assert_eq!(got, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_missing_key_is_server_error() {
        let token = sign_hs256(b"k", &json!({"acct": "1234567890"}));
        let got = status(app(None), Some(format!("Bearer {token}"))).await;
        assert_eq!(got, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_summary_for_authenticated_caller() {
        let seen = Seen::default();
        let app = live_app(spawn_gateway(seen.clone()).await);
        let bearer = format!("Bearer {}", sign_hs256(b"k", &json!({"acct": "1234567890"})));

        let (status, body) = authed_get(app, "/api/v1/summary", &bearer).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![(Some("1234567890".to_string()), Some(bearer.clone()))]
        );

        assert_eq!(body["count"], json!(3));
        assert_eq!(body["recent"][0]["label"], json!("Blue Bottle Coffee"));
        assert_eq!(body["recent"][0]["type"], json!("Debit"));
        assert_eq!(body["buckets"]["Coffee"], json!({"total": -6.5, "count": 1}));
        assert_eq!(body["buckets"]["Groceries"], json!({"total": -42.1, "count": 1}));
        assert_eq!(body["buckets"]["Income"], json!({"total": 1200.0, "count": 1}));
        assert_eq!(
            body["highlights"]["largest_debit"]["label"],
            json!("SuperMart Groceries")
        );
        assert_eq!(body["highlights"]["last_income"]["label"], json!("Payroll"));
        assert_eq!(body["last_7d"], json!({"spend": -48.6, "income": 1200.0, "net": 1151.4}));
        assert_eq!(body["avg_daily_spend_30d"], json!(1.62));
    }

    #[tokio::test]
    async fn test_game_state_for_authenticated_caller() {
        let seen = Seen::default();
        let app = live_app(spawn_gateway(seen.clone()).await);
        let bearer = format!("Bearer {}", sign_hs256(b"k", &json!({"sub": "1234567890"})));

        let (status, body) = authed_get(app, "/api/v1/game-state", &bearer).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(seen.lock().unwrap()[0].0.as_deref(), Some("1234567890"));

        let fallback = save2win_finance::NarrativeContent::fallback();
        assert_eq!(
            body,
            json!({
                "xp": 850,
                "level": 1,
                "quest": fallback.quest,
                "tip": fallback.tip,
                "badges": [
                    {"id": "coffee_crusader", "title": "Coffee Crusader"},
                    {"id": "money_maker", "title": "Big Deposit!"},
                ],
            })
        );
    }

    #[tokio::test]
    async fn test_gateway_down_is_server_error() {
        let token = sign_hs256(b"k", &json!({"acct": "1234567890"}));
        let got = status(app(Some("k")), Some(format!("Bearer {token}"))).await;
        assert_eq!(got, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
