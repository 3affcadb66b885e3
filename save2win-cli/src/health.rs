use axum::{Json, Router, routing::get};
use serde_json::{Value, json};

/// `/`, `/health` and `/healthz` for the given service name.
pub fn routes<S>(service: &'static str) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/healthz", get(ok))
        .route("/health", get(ok))
        .route("/", get(move || root(service)))
}

async fn ok() -> &'static str {
    "ok"
}

async fn root(service: &'static str) -> Json<Value> {
    Json(json!({
        "service": service,
        "status": "ok",
        "build": env!("SAVE2WIN_BUILD_SHA"),
    }))
}
