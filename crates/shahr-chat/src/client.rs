//! Client for the remote question-answering service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use shahr_core::config::QueryConfig;
use tracing::{debug, warn};

use crate::error::QueryFailure;
use crate::types::Answer;

/// Sends one question and returns the structured answer.
///
/// Every failure (transport, status, decoding) is a [`QueryFailure`].
#[async_trait]
pub trait QueryClient: Send + Sync {
    async fn ask(&self, question: &str) -> Result<Answer, QueryFailure>;
}

#[derive(Serialize)]
struct QueryRequest<'a> {
    question: &'a str,
}

/// `POST {endpoint}` with `{"question": ...}` as JSON.
pub struct HttpQueryClient {
    client: Client,
    endpoint: String,
}

impl HttpQueryClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, QueryFailure> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn from_config(config: &QueryConfig) -> Result<Self, QueryFailure> {
        Self::new(
            config.endpoint.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl QueryClient for HttpQueryClient {
    async fn ask(&self, question: &str) -> Result<Answer, QueryFailure> {
        debug!(endpoint = %self.endpoint, "Sending query");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&QueryRequest { question })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(%status, "Query service returned an error");
            return Err(QueryFailure::new(format!("HTTP {}: {}", status, text)));
        }

        let answer: Answer = response
            .json()
            .await
            .map_err(|e| QueryFailure::new(format!("invalid response body: {}", e)))?;
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/api/query", addr)
    }

    fn echo_app() -> Router {
        Router::new().route(
            "/api/query",
            post(|Json(body): Json<Value>| async move {
                Json(json!({
                    "question": body["question"],
                    "answer": "پاسخ نمونه",
                }))
            }),
        )
    }

    fn client(endpoint: String) -> HttpQueryClient {
        HttpQueryClient::new(endpoint, Duration::from_secs(5)).unwrap()
    }

    // ---- success ----

    #[tokio::test]
    async fn test_ask_success_echoes_question() {
        let endpoint = serve(echo_app()).await;
        let answer = client(endpoint)
            .ask("قوانین ساخت‌وساز چیست؟")
            .await
            .unwrap();
        assert_eq!(answer.question, "قوانین ساخت‌وساز چیست؟");
        assert_eq!(answer.answer, "پاسخ نمونه");
    }

    #[tokio::test]
    async fn test_ask_ignores_extra_fields() {
        let app = Router::new().route(
            "/api/query",
            post(|| async {
                Json(json!({"question": "q", "answer": "a", "sources": ["x.pdf"]}))
            }),
        );
        let endpoint = serve(app).await;
        let answer = client(endpoint).ask("q").await.unwrap();
        assert_eq!(answer.answer, "a");
    }

    // ---- failures ----

    #[tokio::test]
    async fn test_ask_http_error_is_failure() {
        let app = Router::new().route(
            "/api/query",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        );
        let endpoint = serve(app).await;
        let err = client(endpoint).ask("q").await.unwrap_err();
        assert!(err.reason.contains("500"));
    }

    #[tokio::test]
    async fn test_ask_malformed_body_is_failure() {
        let app = Router::new().route("/api/query", post(|| async { Json(json!({"result": 1})) }));
        let endpoint = serve(app).await;
        let err = client(endpoint).ask("q").await.unwrap_err();
        assert!(err.reason.contains("invalid response body"));
    }

    #[tokio::test]
    async fn test_ask_non_json_body_is_failure() {
        let app = Router::new().route("/api/query", post(|| async { "not json" }));
        let endpoint = serve(app).await;
        assert!(client(endpoint).ask("q").await.is_err());
    }

    #[tokio::test]
    async fn test_ask_connection_refused_is_failure() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let result = client(format!("http://{}/api/query", addr)).ask("q").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_ask_timeout_is_failure() {
        let app = Router::new().route(
            "/api/query",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(json!({"question": "q", "answer": "late"}))
            }),
        );
        let endpoint = serve(app).await;
        let slow = HttpQueryClient::new(endpoint, Duration::from_millis(100)).unwrap();
        assert!(slow.ask("q").await.is_err());
    }

    // ---- config ----

    #[test]
    fn test_from_config_uses_endpoint() {
        let config = QueryConfig::default();
        let client = HttpQueryClient::from_config(&config).unwrap();
        assert_eq!(client.endpoint(), shahr_core::config::DEFAULT_QUERY_ENDPOINT);
    }
}
