//! Shared HTTP retry loop for remote providers.
//!
//! Retry strategy:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use anyhow::{bail, Context, Result};
use reqwest::{RequestBuilder, StatusCode};
use std::time::Duration;

/// Delay before retry number `attempt` (1-based).
pub fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs(1 << attempt.saturating_sub(1).min(5))
}

pub fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Send the request produced by `build` until it succeeds, fails with a
/// non-retryable status, or `max_retries` retries are used up. Returns the
/// decoded JSON body. `label` names the API in errors and logs.
pub async fn send_json_with_retry<F>(
    label: &str,
    max_retries: u32,
    build: F,
) -> Result<serde_json::Value>
where
    F: Fn() -> RequestBuilder,
{
    let mut last_err = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let delay = backoff_delay(attempt);
            let reason = last_err
                .as_ref()
                .map(|e: &anyhow::Error| e.to_string())
                .unwrap_or_default();
            tracing::warn!(
                api = label,
                attempt,
                delay_secs = delay.as_secs(),
                error = %reason,
                "retrying request"
            );
            tokio::time::sleep(delay).await;
        }

        match build().send().await {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    return response
                        .json()
                        .await
                        .with_context(|| format!("{} returned an invalid JSON body", label));
                }

                let body_text = response.text().await.unwrap_or_default();
                if is_retryable(status) {
                    last_err = Some(anyhow::anyhow!(
                        "{} error {}: {}",
                        label,
                        status,
                        body_text
                    ));
                    continue;
                }
                bail!("{} error {}: {}", label, status, body_text);
            }
            Err(e) => {
                last_err = Some(anyhow::anyhow!("{} request failed: {}", label, e));
            }
        }
    }

    Err(last_err.unwrap_or_else(|| anyhow::anyhow!("{} failed after retries", label)))
}

/// Build a client with the given request timeout.
pub fn client_with_timeout(timeout_secs: u64) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode as AxumStatus, routing::post, Json, Router};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_backoff_schedule() {
        let secs: Vec<u64> = (1..=8).map(|a| backoff_delay(a).as_secs()).collect();
        assert_eq!(secs, vec![1, 2, 4, 8, 16, 32, 32, 32]);
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(is_retryable(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable(StatusCode::BAD_GATEWAY));
        assert!(!is_retryable(StatusCode::BAD_REQUEST));
        assert!(!is_retryable(StatusCode::UNAUTHORIZED));
    }

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let router = Router::new().route(
            "/",
            post(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    (AxumStatus::BAD_REQUEST, "bad input")
                }
            }),
        );
        let url = serve(router).await;
        let client = client_with_timeout(5).unwrap();

        let err = send_json_with_retry("test api", 3, || client.post(&url))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("400"));
        assert!(err.to_string().contains("bad input"));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_server_error_is_retried_until_success() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let router = Router::new().route(
            "/",
            post(move || {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err((AxumStatus::SERVICE_UNAVAILABLE, "busy"))
                    } else {
                        Ok(Json(serde_json::json!({"ok": true})))
                    }
                }
            }),
        );
        let url = serve(router).await;
        let client = client_with_timeout(5).unwrap();

        let json = send_json_with_retry("test api", 2, || client.post(&url))
            .await
            .unwrap();
        assert_eq!(json["ok"], true);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }
}
