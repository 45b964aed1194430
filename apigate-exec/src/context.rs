use std::collections::BTreeMap;
use std::sync::Arc;

use apigate_core::{Method, TaggedValue};
use apigate_store::ResourceStore;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::GatewayConfig;
use crate::http::HttpClient;

/// The inbound request as handed over by the transport layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IncomingRequest {
    pub method: Method,
    pub uri: String,
    /// Header names are stored lower-cased.
    pub headers: BTreeMap<String, String>,
    pub query: BTreeMap<String, String>,
    /// Decoded body parameters (form fields or top-level JSON members).
    pub body: BTreeMap<String, String>,
    /// Whole decoded body. Form bodies only fill `body`.
    pub payload: Option<TaggedValue>,
}

impl IncomingRequest {
    pub fn new(method: Method, uri: impl Into<String>) -> Self {
        Self {
            method,
            uri: uri.into(),
            ..Self::default()
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    pub fn with_body_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.body.insert(name.into(), value.into());
        self
    }

    pub fn with_payload(mut self, payload: TaggedValue) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Request variable by name. Body parameters shadow query parameters.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.body.get(key).or_else(|| self.query.get(key)).map(String::as_str)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// All parameters, body over query, in name order.
    pub fn params(&self) -> BTreeMap<&str, &str> {
        let mut out: BTreeMap<&str, &str> =
            self.query.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        out.extend(self.body.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        out
    }
}

/// Per-request state threaded through every operation.
#[derive(Clone)]
pub struct ExecutionContext {
    pub request: Arc<IncomingRequest>,
    pub application_id: i64,
    pub store: Arc<dyn ResourceStore>,
    pub http: Arc<dyn HttpClient>,
    pub config: Arc<GatewayConfig>,
    pub cancel: CancellationToken,
    pub request_id: Uuid,
}

impl ExecutionContext {
    pub fn new(
        request: IncomingRequest,
        application_id: i64,
        store: Arc<dyn ResourceStore>,
        http: Arc<dyn HttpClient>,
        config: Arc<GatewayConfig>,
    ) -> Self {
        Self {
            request: Arc::new(request),
            application_id,
            store,
            http,
            config,
            cancel: CancellationToken::new(),
            request_id: Uuid::new_v4(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}
