use reqwest::{Client, Response};
use std::time::Duration;
use url::Url;

use crate::config::KnoxConfig;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Request to {0} timed out")]
    Timeout(String),
    #[error("Could not connect to {0}")]
    Connect(String),
    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

pub type ClientResult<T> = Result<T, ClientError>;

impl ClientError {
    fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(url.to_string())
        } else if err.is_connect() {
            Self::Connect(url.to_string())
        } else {
            Self::Http(err)
        }
    }

    /// Whether the failure means the remote service could not be reached.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Connect(_))
    }
}

/// HTTP client shared by the lemmatizer and sink clients.
///
/// Every request is bound to the configured connect and request timeouts and
/// every non-2xx answer is turned into [`ClientError::Status`].
#[derive(Debug, Clone)]
pub struct ServiceClient {
    inner: Client,
}

impl ServiceClient {
    pub fn new(connect_timeout: Duration, request_timeout: Duration) -> ClientResult<Self> {
        let inner = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .user_agent(concat!("knox/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ClientError::Http)?;

        Ok(Self { inner })
    }

    pub fn from_config(config: &KnoxConfig) -> ClientResult<Self> {
        Self::new(config.connect_timeout(), config.request_timeout())
    }

    fn validate_request(url: &str) -> ClientResult<()> {
        let parsed = Url::parse(url)?;

        if parsed.host_str().is_none() {
            return Err(ClientError::InvalidUrl("No host in URL".to_string()));
        }

        match parsed.scheme() {
            "http" | "https" => Ok(()),
            other => Err(ClientError::InvalidUrl(format!("Unsupported scheme {other}"))),
        }
    }

    pub async fn post_json<T: serde::Serialize + ?Sized>(
        &self,
        url: &str,
        json: &T,
    ) -> ClientResult<Response> {
        Self::validate_request(url)?;

        let response = self
            .inner
            .post(url)
            .json(json)
            .send()
            .await
            .map_err(|e| ClientError::from_reqwest(url, e))?;

        Self::check_status(url, response)
    }

    pub async fn post_form<T: serde::Serialize + ?Sized>(
        &self,
        url: &str,
        form: &T,
    ) -> ClientResult<Response> {
        Self::validate_request(url)?;

        let response = self
            .inner
            .post(url)
            .form(form)
            .send()
            .await
            .map_err(|e| ClientError::from_reqwest(url, e))?;

        Self::check_status(url, response)
    }

    /// Reads the full body of a response that already passed the status check.
    pub async fn read_text(url: &str, response: Response) -> ClientResult<String> {
        response
            .text()
            .await
            .map_err(|e| ClientError::from_reqwest(url, e))
    }

    fn check_status(url: &str, response: Response) -> ClientResult<Response> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(ClientError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            })
        }
    }
}
