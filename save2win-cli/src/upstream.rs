//! JSON GET client with retries for calls between services.

use anyhow::{Context, Result, anyhow, bail};
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde_json::Value;
use std::time::Duration;

const RETRY_STATUSES: &[u16] = &[429, 500, 502, 503, 504];
const BACKOFF_BASE: Duration = Duration::from_millis(300);

#[derive(Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    max_retries: u32,
}

impl UpstreamClient {
    pub fn new(timeout: Duration, max_retries: u32) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("building HTTP client")?;
        Ok(Self { http, max_retries })
    }

    /// GET `url` and decode the body as JSON, forwarding `authorization`
    /// when given. Connection failures and retryable statuses are retried
    /// with exponential backoff.
    pub async fn get_json(
        &self,
        url: &str,
        authorization: Option<&str>,
        query: &[(&str, &str)],
    ) -> Result<Value> {
        let mut attempt = 0;
        loop {
            let mut req = self.http.get(url).header(ACCEPT, "application/json").query(query);
            if let Some(auth) = authorization {
                req = req.header(AUTHORIZATION, auth);
            }

            let retries_left = attempt < self.max_retries;
            match req.send().await {
                Ok(resp) if retries_left && is_retryable_status(resp.status()) => {
                    tracing::warn!(url, status = %resp.status(), attempt, "retrying upstream request");
                }
                Ok(resp) => {
                    let status = resp.status();
                    if !status.is_success() {
                        let txt = resp.text().await.unwrap_or_default();
                        bail!("upstream {url} returned {status}: {txt}");
                    }
                    return resp
                        .json::<Value>()
                        .await
                        .with_context(|| format!("invalid JSON from {url}"));
                }
                Err(e) if retries_left && (e.is_connect() || e.is_timeout()) => {
                    tracing::warn!(url, attempt, "upstream request failed, retrying: {e}");
                }
                Err(e) => return Err(anyhow!(e).context(format!("requesting {url}"))),
            }

            tokio::time::sleep(backoff_delay(attempt)).await;
            attempt += 1;
        }
    }
}

pub fn is_retryable_status(status: StatusCode) -> bool {
    RETRY_STATUSES.contains(&status.as_u16())
}

/// 0.3s, 0.6s, 1.2s, ...
pub fn backoff_delay(attempt: u32) -> Duration {
    BACKOFF_BASE * 2u32.saturating_pow(attempt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::spawn;
    use axum::{
        Json, Router,
        extract::{Query, State},
        response::{IntoResponse, Response},
        routing::get,
    };
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Answers `status` for the first `failures` calls, then echoes the query.
    #[derive(Clone)]
    struct Flaky {
        status: u16,
        failures: usize,
        hits: Arc<AtomicUsize>,
    }

    async fn flaky(State(f): State<Flaky>, Query(q): Query<HashMap<String, String>>) -> Response {
        if f.hits.fetch_add(1, Ordering::SeqCst) < f.failures {
            let status = axum::http::StatusCode::from_u16(f.status).unwrap();
            return (status, "busy").into_response();
        }
        Json(json!({ "query": q })).into_response()
    }

    async fn flaky_url(status: u16, failures: usize) -> (String, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let state = Flaky {
            status,
            failures,
            hits: hits.clone(),
        };
        let addr = spawn(Router::new().route("/data", get(flaky)).with_state(state)).await;
        (format!("http://{addr}/data"), hits)
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(is_retryable_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable_status(StatusCode::BAD_GATEWAY));
        assert!(!is_retryable_status(StatusCode::NOT_FOUND));
        assert!(!is_retryable_status(StatusCode::NOT_IMPLEMENTED));
    }

    #[test]
    fn test_backoff_doubles() {
        assert_eq!(backoff_delay(0), Duration::from_millis(300));
        assert_eq!(backoff_delay(1), Duration::from_millis(600));
        assert_eq!(backoff_delay(2), Duration::from_millis(1200));
    }

    #[tokio::test]
    async fn test_retries_retryable_status_until_success() {
        let (url, hits) = flaky_url(502, 2).await;
        let client = UpstreamClient::new(Duration::from_secs(2), 3).unwrap();
        let body = client
            .get_json(&url, None, &[("account_id", "42")])
            .await
            .unwrap();
        assert_eq!(body, json!({"query": {"account_id": "42"}}));
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_status_fails_fast() {
        let (url, hits) = flaky_url(404, 1).await;
        let client = UpstreamClient::new(Duration::from_secs(2), 3).unwrap();
        let err = client.get_json(&url, None, &[]).await.unwrap_err();
        assert!(err.to_string().contains("404"), "{err:#}");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let (url, hits) = flaky_url(429, usize::MAX).await;
        let client = UpstreamClient::new(Duration::from_secs(2), 1).unwrap();
        let err = client.get_json(&url, None, &[]).await.unwrap_err();
        assert!(err.to_string().contains("429"), "{err:#}");
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unreachable_host_is_error() {
        let client = UpstreamClient::new(Duration::from_millis(200), 0).unwrap();
        let err = client
            .get_json("http://127.0.0.1:9/transactions", None, &[])
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("requesting http://127.0.0.1:9/transactions"));
    }
}
