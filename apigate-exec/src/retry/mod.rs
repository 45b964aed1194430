mod headers;

use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, SystemTime};

pub use headers::parse_retry_after;

/// Bounded retry policy for outbound calls made by operations.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub retry_statuses: BTreeSet<u16>,
    pub base_delay: Duration,
    pub factor: f64,
    pub max_delay: Duration,
    /// Total attempts including the first.
    pub max_attempts: usize,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            retry_statuses: [408u16, 429, 502, 503, 504].into_iter().collect(),
            base_delay: Duration::from_millis(200),
            factor: 2.0,
            max_delay: Duration::from_secs(5),
            max_attempts: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    RetryAfter { delay: Duration, reason: RetryReason },
    Stop { reason: RetryReason },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryReason {
    NotRetryable,
    AttemptsExhausted,
    PolicyFailure,
    NetworkFailure,
    HttpStatus(u16),
    RetryAfterHeader,
}

/// Outcome of one attempt, as seen by the retry policy.
#[derive(Debug, Clone, Copy)]
pub enum AttemptOutcome<'a> {
    Status {
        status: u16,
        headers: &'a BTreeMap<String, String>,
    },
    NetworkFailure,
    PolicyFailure,
}

/// Decide whether attempt `attempt_no` (1-based) should be followed by another.
///
/// A `Retry-After` header wins over computed backoff. Backoff is
/// `base * factor^(attempt_no - 1)` capped at `max_delay`, with full jitter
/// drawn from `rand_u64`.
pub fn decide_retry(
    cfg: &RetryConfig,
    attempt_no: usize,
    outcome: AttemptOutcome<'_>,
    now: SystemTime,
    rand_u64: impl Fn() -> u64,
) -> RetryDecision {
    let status = match outcome {
        AttemptOutcome::PolicyFailure => {
            return RetryDecision::Stop {
                reason: RetryReason::PolicyFailure,
            }
        }
        AttemptOutcome::Status { status, .. } if !cfg.retry_statuses.contains(&status) => {
            return RetryDecision::Stop {
                reason: RetryReason::NotRetryable,
            }
        }
        AttemptOutcome::Status { status, .. } => Some(status),
        AttemptOutcome::NetworkFailure => None,
    };

    if attempt_no >= cfg.max_attempts {
        return RetryDecision::Stop {
            reason: RetryReason::AttemptsExhausted,
        };
    }

    if let AttemptOutcome::Status { headers, .. } = outcome {
        if let Some(delay) = parse_retry_after(headers, now) {
            return RetryDecision::RetryAfter {
                delay: delay.min(cfg.max_delay),
                reason: RetryReason::RetryAfterHeader,
            };
        }
    }

    let exp = attempt_no.saturating_sub(1) as i32;
    let raw = (cfg.base_delay.as_millis() as f64) * cfg.factor.powi(exp);
    let raw_ms = raw.min(cfg.max_delay.as_millis() as f64).max(0.0) as u64;
    let jitter_ms = if raw_ms == 0 { 0 } else { rand_u64() % (raw_ms + 1) };

    RetryDecision::RetryAfter {
        delay: Duration::from_millis(jitter_ms),
        reason: status.map(RetryReason::HttpStatus).unwrap_or(RetryReason::NetworkFailure),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> RetryConfig {
        RetryConfig {
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(1000),
            ..RetryConfig::default()
        }
    }

    #[test]
    fn non_retryable_status_stops() {
        let headers = BTreeMap::new();
        let d = decide_retry(
            &cfg(),
            1,
            AttemptOutcome::Status { status: 404, headers: &headers },
            SystemTime::now(),
            || 0,
        );
        assert_eq!(d, RetryDecision::Stop { reason: RetryReason::NotRetryable });
    }

    #[test]
    fn backoff_is_bounded_by_jitter_window() {
        let headers = BTreeMap::new();
        let d = decide_retry(
            &cfg(),
            2,
            AttemptOutcome::Status { status: 503, headers: &headers },
            SystemTime::now(),
            || u64::MAX,
        );
        match d {
            RetryDecision::RetryAfter { delay, reason } => {
                assert!(delay <= Duration::from_millis(200));
                assert_eq!(reason, RetryReason::HttpStatus(503));
            }
            other => panic!("expected retry, got {other:?}"),
        }
    }

    #[test]
    fn retry_after_header_is_clamped() {
        let mut headers = BTreeMap::new();
        headers.insert("Retry-After".to_string(), "60".to_string());
        let d = decide_retry(
            &cfg(),
            1,
            AttemptOutcome::Status { status: 429, headers: &headers },
            SystemTime::now(),
            || 0,
        );
        assert_eq!(
            d,
            RetryDecision::RetryAfter {
                delay: Duration::from_millis(1000),
                reason: RetryReason::RetryAfterHeader
            }
        );
    }

    #[test]
    fn attempts_exhausted() {
        let d = decide_retry(&cfg(), 3, AttemptOutcome::NetworkFailure, SystemTime::now(), || 0);
        assert_eq!(d, RetryDecision::Stop { reason: RetryReason::AttemptsExhausted });
    }
}
