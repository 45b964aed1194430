use std::collections::BTreeMap;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;

use crate::http::{NetworkDenied, NetworkPolicy};
use crate::retry::{decide_retry, AttemptOutcome, RetryConfig, RetryDecision};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequestParts {
    pub method: String,
    pub url: url::Url,
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponseParts {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpResponseParts {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum HttpError {
    #[error("timeout")]
    Timeout,
    #[error("connect/dns/tls error: {0}")]
    Network(String),
    #[error("response too large (>{max_bytes} bytes)")]
    ResponseTooLarge { max_bytes: usize },
    #[error(transparent)]
    Denied(#[from] NetworkDenied),
    #[error("http error: {0}")]
    Other(String),
}

/// Outbound HTTP used by operations and output delivery.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn send(
        &self,
        req: HttpRequestParts,
        timeout: Duration,
        max_response_bytes: usize,
    ) -> Result<HttpResponseParts, HttpError>;
}

pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    /// Redirects are not followed; the network policy only sees the first URL.
    pub fn new(user_agent: &str) -> Result<Self, HttpError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(user_agent)
            .build()
            .map_err(|e| HttpError::Other(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn send(
        &self,
        req: HttpRequestParts,
        timeout: Duration,
        max_response_bytes: usize,
    ) -> Result<HttpResponseParts, HttpError> {
        let method = reqwest::Method::from_bytes(req.method.to_ascii_uppercase().as_bytes())
            .map_err(|e| HttpError::Other(e.to_string()))?;
        let mut rb = self.client.request(method, req.url).timeout(timeout);
        for (k, v) in req.headers {
            rb = rb.header(k, v);
        }
        if !req.body.is_empty() {
            rb = rb.body(req.body);
        }

        let resp = rb.send().await.map_err(map_reqwest_error)?;
        let status = resp.status().as_u16();
        if resp.content_length().is_some_and(|len| len as usize > max_response_bytes) {
            return Err(HttpError::ResponseTooLarge {
                max_bytes: max_response_bytes,
            });
        }

        let mut headers = BTreeMap::new();
        for (k, v) in resp.headers() {
            if let Ok(s) = v.to_str() {
                headers.insert(k.to_string(), s.to_string());
            }
        }

        let body = resp.bytes().await.map_err(map_reqwest_error)?;
        if body.len() > max_response_bytes {
            return Err(HttpError::ResponseTooLarge {
                max_bytes: max_response_bytes,
            });
        }
        Ok(HttpResponseParts {
            status,
            headers,
            body: body.to_vec(),
        })
    }
}

fn map_reqwest_error(e: reqwest::Error) -> HttpError {
    if e.is_timeout() {
        return HttpError::Timeout;
    }
    if e.is_connect() || e.is_request() {
        return HttpError::Network(e.to_string());
    }
    HttpError::Other(e.to_string())
}

/// Limits applied to one outbound call.
#[derive(Debug, Clone)]
pub struct SendOptions<'a> {
    pub policy: &'a NetworkPolicy,
    pub retry: &'a RetryConfig,
    pub timeout: Duration,
    pub max_response_bytes: usize,
}

/// Send `req` after checking it against the network policy, retrying
/// transient failures. The last response is returned even when its status
/// is an error; only transport failures become `Err`.
pub async fn send_with_retry(
    client: &dyn HttpClient,
    req: HttpRequestParts,
    opts: SendOptions<'_>,
) -> Result<HttpResponseParts, HttpError> {
    opts.policy.check(&req.url)?;

    let mut attempt = 1usize;
    loop {
        let result = client
            .send(req.clone(), opts.timeout, opts.max_response_bytes)
            .await;
        let outcome = match &result {
            Ok(resp) => AttemptOutcome::Status {
                status: resp.status,
                headers: &resp.headers,
            },
            Err(HttpError::Timeout) | Err(HttpError::Network(_)) => AttemptOutcome::NetworkFailure,
            Err(_) => AttemptOutcome::PolicyFailure,
        };
        let decision = decide_retry(opts.retry, attempt, outcome, SystemTime::now(), || fastrand::u64(..));

        match decision {
            RetryDecision::Stop { .. } => return result,
            RetryDecision::RetryAfter { delay, reason } => {
                tracing::warn!(
                    url = %req.url,
                    attempt,
                    ?reason,
                    delay_ms = delay.as_millis() as u64,
                    "retrying outbound request"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
