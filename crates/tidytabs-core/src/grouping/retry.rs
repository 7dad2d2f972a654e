//! Retry policy: backoff delays and HTTP status classification.

use std::time::Duration;

/// Retry policy for AI requests.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Delay before the first retry.
    pub base_delay: Duration,

    /// Backoff multiplier for exponential backoff.
    pub multiplier: f64,

    /// Retries after the first attempt.
    pub max_retries: u32,

    /// Wall-clock bound of a single attempt, independent of HTTP client timeouts.
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    /// 1s base, doubling, 2 retries, 60s per attempt.
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            multiplier: 2.0,
            max_retries: 2,
            attempt_timeout: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// Delay before retry number `retry` (1-indexed):
    /// `base_delay * multiplier^(retry - 1)`.
    ///
    /// With the default policy: 1s, 2s, 4s, ...
    pub fn next_delay(&self, retry: u32) -> Duration {
        let base_secs = self.base_delay.as_secs_f64();
        let delay_secs = base_secs * self.multiplier.powi(retry.saturating_sub(1) as i32);
        Duration::from_secs_f64(delay_secs)
    }
}

/// How a non-transport outcome of one attempt is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Success,
    /// 401 / 403. Retrying cannot fix credentials.
    Auth,
    /// 429 and the usual gateway / overload 5xx.
    Retryable,
    /// Anything else, e.g. 400 for an unknown model.
    Rejected,
}

pub fn classify_status(status: u16) -> StatusClass {
    match status {
        200..=299 => StatusClass::Success,
        401 | 403 => StatusClass::Auth,
        429 | 500 | 502 | 503 | 504 => StatusClass::Retryable,
        _ => StatusClass::Rejected,
    }
}

/// Short, body-free description used in the user-facing error.
pub(crate) fn status_reason(status: u16) -> String {
    match status {
        429 => "rate limited, HTTP 429".to_string(),
        s => format!("server error, HTTP {s}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn default_policy_matches_requirements() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.base_delay, Duration::from_secs(1));
        assert_eq!(policy.max_attempts(), 3);
        assert_eq!(policy.attempt_timeout, Duration::from_secs(60));
    }

    #[test]
    fn exponential_backoff_increases() {
        let policy = RetryPolicy::default();

        assert_eq!(policy.next_delay(1), Duration::from_secs(1));
        assert_eq!(policy.next_delay(2), Duration::from_secs(2));
        assert_eq!(policy.next_delay(3), Duration::from_secs(4));
    }

    #[rstest]
    #[case::ok(200, StatusClass::Success)]
    #[case::created(201, StatusClass::Success)]
    #[case::unauthorized(401, StatusClass::Auth)]
    #[case::forbidden(403, StatusClass::Auth)]
    #[case::rate_limited(429, StatusClass::Retryable)]
    #[case::internal(500, StatusClass::Retryable)]
    #[case::bad_gateway(502, StatusClass::Retryable)]
    #[case::unavailable(503, StatusClass::Retryable)]
    #[case::gateway_timeout(504, StatusClass::Retryable)]
    #[case::bad_request(400, StatusClass::Rejected)]
    #[case::not_found(404, StatusClass::Rejected)]
    #[case::not_implemented(501, StatusClass::Rejected)]
    fn statuses_are_classified(#[case] status: u16, #[case] expected: StatusClass) {
        assert_eq!(classify_status(status), expected);
    }
}
