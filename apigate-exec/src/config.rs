use std::collections::BTreeSet;
use std::time::Duration;

use apigate_core::MarkupOptions;
use serde::{Deserialize, Serialize};

use crate::format::OutputFormat;
use crate::http::NetworkPolicy;
use crate::retry::RetryConfig;

/// Engine settings. Every field has a default so partial documents load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub output: OutputConfig,
    pub cache: CacheConfig,
    pub http: HttpConfig,
    pub retry: RetrySettings,
    pub network: NetworkSettings,
    pub auth: AuthConfig,
}

impl GatewayConfig {
    pub fn markup(&self) -> MarkupOptions {
        MarkupOptions {
            xml_wrapper: self.output.xml_wrapper.clone(),
            ..MarkupOptions::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub default_format: OutputFormat,
    /// Wrap successful JSON bodies as `{result: "ok", data: ...}`.
    pub wrap_json: bool,
    pub xml_wrapper: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            default_format: OutputFormat::Json,
            wrap_json: true,
            xml_wrapper: apigate_core::convert::DEFAULT_XML_WRAPPER.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 1024,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_ms: u64,
    pub max_response_bytes: usize,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            max_response_bytes: 10 * 1024 * 1024,
            user_agent: concat!("apigate/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub statuses: BTreeSet<u16>,
    pub base_delay_ms: u64,
    pub factor: f64,
    pub max_delay_ms: u64,
    /// Total attempts including the first. 1 disables retries.
    pub max_attempts: usize,
}

impl Default for RetrySettings {
    fn default() -> Self {
        let cfg = RetryConfig::default();
        Self {
            statuses: cfg.retry_statuses,
            base_delay_ms: cfg.base_delay.as_millis() as u64,
            factor: cfg.factor,
            max_delay_ms: cfg.max_delay.as_millis() as u64,
            max_attempts: cfg.max_attempts,
        }
    }
}

impl From<&RetrySettings> for RetryConfig {
    fn from(s: &RetrySettings) -> Self {
        RetryConfig {
            retry_statuses: s.statuses.clone(),
            base_delay: Duration::from_millis(s.base_delay_ms),
            factor: s.factor,
            max_delay: Duration::from_millis(s.max_delay_ms),
            max_attempts: s.max_attempts.max(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkSettings {
    pub schemes: BTreeSet<String>,
    /// Hosts (and their subdomains) operations may call. Empty allows any public host.
    pub hosts: BTreeSet<String>,
    pub deny_private_ip_literals: bool,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            schemes: ["http", "https"].into_iter().map(String::from).collect(),
            hosts: BTreeSet::new(),
            deny_private_ip_literals: true,
        }
    }
}

impl From<&NetworkSettings> for NetworkPolicy {
    fn from(s: &NetworkSettings) -> Self {
        NetworkPolicy {
            allowed_schemes: s.schemes.iter().map(|x| x.to_ascii_lowercase()).collect(),
            allowed_hosts: s.hosts.iter().map(|x| x.to_ascii_lowercase()).collect(),
            deny_private_ip_literals: s.deny_private_ip_literals,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Request header carrying the bearer credential.
    pub token_header: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_header: "authorization".to_string(),
        }
    }
}
