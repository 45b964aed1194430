use std::collections::BTreeSet;
use std::net::IpAddr;

/// Which outbound URLs operations may reach.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkPolicy {
    pub allowed_schemes: BTreeSet<String>,
    /// Exact hosts or parent domains. Empty allows any host.
    pub allowed_hosts: BTreeSet<String>,
    /// Refuse hosts that are literal private, loopback, or link-local addresses.
    pub deny_private_ip_literals: bool,
}

impl Default for NetworkPolicy {
    fn default() -> Self {
        Self {
            allowed_schemes: ["http", "https"].into_iter().map(String::from).collect(),
            allowed_hosts: BTreeSet::new(),
            deny_private_ip_literals: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NetworkDenied {
    #[error("scheme not allowed: {0}")]
    Scheme(String),
    #[error("host not allowed: {0}")]
    Host(String),
    #[error("private address not allowed: {0}")]
    PrivateAddress(String),
}

impl NetworkPolicy {
    pub fn check(&self, url: &url::Url) -> Result<(), NetworkDenied> {
        let scheme = url.scheme();
        if !self.allowed_schemes.contains(scheme) {
            return Err(NetworkDenied::Scheme(scheme.to_string()));
        }
        let host = url
            .host_str()
            .unwrap_or("")
            .trim_start_matches('[')
            .trim_end_matches(']')
            .to_ascii_lowercase();
        if host.is_empty() {
            return Err(NetworkDenied::Host(host));
        }
        if self.deny_private_ip_literals && is_private_ip_literal(&host) {
            return Err(NetworkDenied::PrivateAddress(host));
        }
        if !host_allowed(&self.allowed_hosts, &host) {
            return Err(NetworkDenied::Host(host));
        }
        Ok(())
    }
}

fn host_allowed(allowed: &BTreeSet<String>, host: &str) -> bool {
    if allowed.is_empty() || allowed.contains(host) {
        return true;
    }
    allowed.iter().any(|h| host.ends_with(&format!(".{h}")))
}

fn is_private_ip_literal(host: &str) -> bool {
    match host.parse::<IpAddr>() {
        Ok(IpAddr::V4(v4)) => {
            let o = v4.octets();
            o[0] == 10
                || o[0] == 127
                || (o[0] == 192 && o[1] == 168)
                || (o[0] == 172 && (16..=31).contains(&o[1]))
                || (o[0] == 169 && o[1] == 254)
                || v4.is_unspecified()
        }
        Ok(IpAddr::V6(v6)) => {
            let first = v6.segments()[0];
            v6.is_loopback() || v6.is_unspecified() || first & 0xffc0 == 0xfe80 || first & 0xfe00 == 0xfc00
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> url::Url {
        url::Url::parse(s).unwrap()
    }

    #[test]
    fn empty_allowlist_permits_public_hosts() {
        let p = NetworkPolicy::default();
        assert!(p.check(&url("https://api.example.com/x")).is_ok());
        assert_eq!(
            p.check(&url("http://127.0.0.1:8080/")),
            Err(NetworkDenied::PrivateAddress("127.0.0.1".into()))
        );
        assert!(p.check(&url("http://[::1]/")).is_err());
        assert!(matches!(p.check(&url("ftp://example.com/")), Err(NetworkDenied::Scheme(_))));
    }

    #[test]
    fn allowlist_matches_subdomains() {
        let p = NetworkPolicy {
            allowed_hosts: ["example.com".to_string()].into_iter().collect(),
            ..NetworkPolicy::default()
        };
        assert!(p.check(&url("https://api.example.com/")).is_ok());
        assert!(p.check(&url("https://example.com/")).is_ok());
        assert!(p.check(&url("https://badexample.com/")).is_err());
    }
}
