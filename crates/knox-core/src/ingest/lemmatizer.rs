use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::network::{ClientError, ServiceClient};

#[derive(Debug, Error)]
pub enum LemmatizationError {
    #[error("Could not reach the lemmatizer: {0}")]
    Connection(#[source] ClientError),
    #[error("Could not decode the lemmatizer response: {0}")]
    Parse(String),
}

pub type LemmatizationResult<T> = Result<T, LemmatizationError>;

impl LemmatizationError {
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }
}

/// Reduces every word of a text to its base form.
#[async_trait::async_trait]
pub trait Lemmatizer: Send + Sync {
    async fn lemmatize(&self, language: &str, text: &str) -> LemmatizationResult<String>;
}

#[derive(Debug, Serialize)]
struct LemmatizeRequest<'a> {
    language: &'a str,
    string: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LemmatizeResponse {
    Text(String),
    Object {
        #[serde(alias = "string")]
        lemmatized_string: String,
    },
}

impl LemmatizeResponse {
    fn into_text(self) -> String {
        match self {
            Self::Text(text) | Self::Object { lemmatized_string: text } => text,
        }
    }
}

/// Lemmatizer backed by the remote lemmatization service.
pub struct HttpLemmatizer {
    client: ServiceClient,
    endpoint: String,
}

impl HttpLemmatizer {
    #[must_use]
    pub fn new(client: ServiceClient, endpoint: String) -> Self {
        Self { client, endpoint }
    }
}

#[async_trait::async_trait]
impl Lemmatizer for HttpLemmatizer {
    async fn lemmatize(&self, language: &str, text: &str) -> LemmatizationResult<String> {
        let request = LemmatizeRequest {
            language,
            string: text,
        };

        let response = self
            .client
            .post_json(&self.endpoint, &request)
            .await
            .map_err(LemmatizationError::Connection)?;

        let body = ServiceClient::read_text(&self.endpoint, response)
            .await
            .map_err(LemmatizationError::Connection)?;

        serde_json::from_str::<LemmatizeResponse>(&body)
            .map(LemmatizeResponse::into_text)
            .map_err(|e| LemmatizationError::Parse(e.to_string()))
    }
}

const BASE_BACKOFF: Duration = Duration::from_millis(250);

/// Retries connection failures of the wrapped lemmatizer with jittered
/// exponential backoff. Parse failures are returned immediately.
pub struct RetryingLemmatizer<L> {
    inner: L,
    retries: u32,
    base_backoff: Duration,
}

impl<L: Lemmatizer> RetryingLemmatizer<L> {
    #[must_use]
    pub fn new(inner: L, retries: u32) -> Self {
        Self {
            inner,
            retries,
            base_backoff: BASE_BACKOFF,
        }
    }

    #[must_use]
    pub fn with_base_backoff(mut self, base_backoff: Duration) -> Self {
        self.base_backoff = base_backoff;
        self
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let exponential = self.base_backoff.saturating_mul(1 << attempt.min(10));
        let jitter = rand::rng().random_range(0.5..1.5);
        exponential.mul_f64(jitter)
    }
}

#[async_trait::async_trait]
impl<L: Lemmatizer> Lemmatizer for RetryingLemmatizer<L> {
    async fn lemmatize(&self, language: &str, text: &str) -> LemmatizationResult<String> {
        let mut attempt = 0;
        loop {
            match self.inner.lemmatize(language, text).await {
                Err(e) if e.is_connection() && attempt < self.retries => {
                    let wait = self.backoff(attempt);
                    tracing::warn!(
                        attempt = attempt + 1,
                        wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
                        "Lemmatizer unreachable, retrying: {}",
                        e
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::post, Json, Router};
    use std::sync::atomic::{AtomicU32, Ordering};

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/lemmatize")
    }

    fn client() -> ServiceClient {
        ServiceClient::new(Duration::from_secs(2), Duration::from_secs(5)).unwrap()
    }

    struct Flaky {
        failures: u32,
        calls: AtomicU32,
        parse_error: bool,
    }

    #[async_trait::async_trait]
    impl Lemmatizer for Flaky {
        async fn lemmatize(&self, _language: &str, text: &str) -> LemmatizationResult<String> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.parse_error {
                return Err(LemmatizationError::Parse("not json".into()));
            }
            if call < self.failures {
                return Err(LemmatizationError::Connection(ClientError::Connect(
                    "http://lemmatizer".into(),
                )));
            }
            Ok(text.to_uppercase())
        }
    }

    fn flaky(failures: u32, parse_error: bool) -> Flaky {
        Flaky {
            failures,
            calls: AtomicU32::new(0),
            parse_error,
        }
    }

    #[test]
    fn test_response_shapes() {
        let text: LemmatizeResponse = serde_json::from_str(r#""hund løbe""#).unwrap();
        assert_eq!(text.into_text(), "hund løbe");

        let object: LemmatizeResponse =
            serde_json::from_str(r#"{"lemmatized_string": "run"}"#).unwrap();
        assert_eq!(object.into_text(), "run");

        let alias: LemmatizeResponse = serde_json::from_str(r#"{"string": "be"}"#).unwrap();
        assert_eq!(alias.into_text(), "be");

        assert!(serde_json::from_str::<LemmatizeResponse>("[1, 2]").is_err());
    }

    #[tokio::test]
    async fn test_http_lemmatizer_sends_language_and_string() {
        let router = Router::new().route(
            "/lemmatize",
            post(|Json(body): Json<serde_json::Value>| async move {
                Json(format!("{}:{}", body["language"].as_str().unwrap(), body["string"].as_str().unwrap()))
            }),
        );
        let url = serve(router).await;
        let lemmatizer = HttpLemmatizer::new(client(), url);

        let out = lemmatizer.lemmatize("da", "hundene løber").await.unwrap();
        assert_eq!(out, "da:hundene løber");
    }

    #[tokio::test]
    async fn test_http_lemmatizer_parse_error() {
        let router = Router::new().route("/lemmatize", post(|| async { "not json" }));
        let url = serve(router).await;
        let lemmatizer = HttpLemmatizer::new(client(), url);

        let err = lemmatizer.lemmatize("en", "x").await.unwrap_err();
        assert!(matches!(err, LemmatizationError::Parse(_)));
    }

    #[tokio::test]
    async fn test_http_lemmatizer_status_is_connection_error() {
        let router = Router::new().route(
            "/lemmatize",
            post(|| async { (axum::http::StatusCode::SERVICE_UNAVAILABLE, "down") }),
        );
        let url = serve(router).await;
        let lemmatizer = HttpLemmatizer::new(client(), url);

        let err = lemmatizer.lemmatize("en", "x").await.unwrap_err();
        assert!(err.is_connection());
    }

    #[tokio::test]
    async fn test_http_lemmatizer_unreachable() {
        let lemmatizer = HttpLemmatizer::new(client(), "http://127.0.0.1:9/lemmatize".into());

        let err = lemmatizer.lemmatize("en", "x").await.unwrap_err();
        assert!(err.is_connection());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_recovers_from_connection_failures() {
        let lemmatizer = RetryingLemmatizer::new(flaky(2, false), 2);

        let out = lemmatizer.lemmatize("en", "pump").await.unwrap();
        assert_eq!(out, "PUMP");
        assert_eq!(lemmatizer.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_gives_up() {
        let lemmatizer = RetryingLemmatizer::new(flaky(5, false), 2);

        let err = lemmatizer.lemmatize("en", "pump").await.unwrap_err();
        assert!(err.is_connection());
        assert_eq!(lemmatizer.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_parse_error_not_retried() {
        let lemmatizer = RetryingLemmatizer::new(flaky(0, true), 3);

        let err = lemmatizer.lemmatize("en", "pump").await.unwrap_err();
        assert!(matches!(err, LemmatizationError::Parse(_)));
        assert_eq!(lemmatizer.inner.calls.load(Ordering::SeqCst), 1);
    }
}
