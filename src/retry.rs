//! Rate-limit retry policy for outbound HTTP calls.
//!
//! Wraps every request the catalog source sends. On a throttling status the
//! policy waits and retries with capped exponential backoff plus jitter,
//! honoring the server's Retry-After hint when present. This upstream signals
//! throttling with HTTP 400 as well as 429, so both are in the default status
//! set. Once the retry budget is exhausted the throttled response is handed
//! back unmodified and the caller surfaces it as an ordinary error status.

use std::time::Duration;

use chrono::Utc;
use metrics::{counter, histogram};
use rand::Rng;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::{ConfigError, RetryPolicyConfig};

/// Retry wrapper applied to every outbound request.
#[derive(Debug, Clone)]
pub struct RateLimitRetry {
    config: RetryPolicyConfig,
}

impl RateLimitRetry {
    /// Creates the policy, validating the configuration synchronously.
    pub fn new(config: RetryPolicyConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Sends a request, retrying on throttling statuses.
    ///
    /// `build` must produce a fresh equivalent request on every call since a
    /// sent request cannot be reused. Transport errors propagate immediately;
    /// only throttle-shaped statuses are retried here.
    pub async fn execute<F>(&self, build: F) -> Result<reqwest::Response, reqwest::Error>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let mut attempt: u32 = 0;
        let mut fallback = Duration::from_millis(self.config.base_delay_ms);

        loop {
            let response = build().send().await?;
            let status = response.status().as_u16();

            if !self.config.throttle_status_codes.contains(&status) {
                return Ok(response);
            }

            if attempt >= self.config.max_retries {
                warn!(
                    status,
                    attempt, "throttled and retry budget exhausted, handing response back"
                );
                return Ok(response);
            }

            counter!("rate_limited_total").increment(1);

            let hint_ms = if self.config.respect_retry_after {
                parse_retry_after_ms(response.headers())
            } else {
                None
            };

            // Drain the abandoned body so the connection can be reused.
            let _ = response.bytes().await;

            let wait_ms = self.compute_wait_ms(hint_ms, fallback.as_millis() as u64);
            histogram!("rate_limit_wait_ms").record(wait_ms as f64);
            debug!(status, attempt, wait_ms, "throttled, backing off");
            sleep(Duration::from_millis(wait_ms)).await;

            fallback = next_fallback(
                fallback,
                self.config.backoff_multiplier,
                Duration::from_millis(self.config.max_delay_ms),
            );
            attempt += 1;
        }
    }

    /// Jittered wait: uniform over `[base*(1-j), base*(1+j))`, with the lower
    /// bound clamped at 0 and the upper bound kept at least one above it.
    fn compute_wait_ms(&self, hint_ms: Option<u64>, fallback_ms: u64) -> u64 {
        let base = hint_ms.unwrap_or(fallback_ms) as f64;
        let j = self.config.jitter_ratio;
        let low = (base * (1.0 - j)).max(0.0) as u64;
        let high = ((base * (1.0 + j)) as u64).max(low + 1);
        rand::thread_rng().gen_range(low..high)
    }
}

fn next_fallback(current: Duration, multiplier: f64, max: Duration) -> Duration {
    let grown = current.mul_f64(multiplier);
    if grown > max { max } else { grown }
}

/// Parses a Retry-After header into milliseconds.
///
/// Accepts either an integer number of seconds or an RFC 2822 HTTP-date. A
/// malformed value is treated as absent, never as an error.
fn parse_retry_after_ms(headers: &HeaderMap) -> Option<u64> {
    let raw = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(seconds) = raw.parse::<i64>() {
        return Some(seconds.max(0) as u64 * 1000);
    }

    let retry_at = chrono::DateTime::parse_from_rfc2822(raw).ok()?;
    let delta = retry_at.with_timezone(&Utc) - Utc::now();
    Some(delta.num_milliseconds().max(0) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn policy(config: RetryPolicyConfig) -> RateLimitRetry {
        RateLimitRetry::new(config).expect("valid retry config")
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let retry = policy(RetryPolicyConfig {
            jitter_ratio: 0.2,
            ..RetryPolicyConfig::default()
        });

        for _ in 0..1000 {
            let wait = retry.compute_wait_ms(None, 1000);
            assert!((800..1200).contains(&wait), "wait {} out of range", wait);
        }
    }

    #[test]
    fn jitter_never_degenerates_to_empty_range() {
        let retry = policy(RetryPolicyConfig {
            jitter_ratio: 0.0,
            ..RetryPolicyConfig::default()
        });

        // With zero jitter and zero base the range must still be non-empty.
        assert_eq!(retry.compute_wait_ms(Some(0), 500), 0);
        assert_eq!(retry.compute_wait_ms(None, 0), 0);
    }

    #[test]
    fn retry_after_seconds_parses_to_millis() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("2"));
        assert_eq!(parse_retry_after_ms(&headers), Some(2000));
    }

    #[test]
    fn retry_after_http_date_parses_to_remaining_millis() {
        let at = Utc::now() + chrono::Duration::seconds(3);
        let mut headers = HeaderMap::new();
        headers.insert(
            RETRY_AFTER,
            HeaderValue::from_str(&at.to_rfc2822()).unwrap(),
        );

        let wait = parse_retry_after_ms(&headers).expect("parsable http-date");
        assert!(wait <= 3000, "wait {} beyond hinted window", wait);
        assert!(wait >= 2000, "wait {} lost too much of the window", wait);
    }

    #[test]
    fn retry_after_in_the_past_clamps_to_zero() {
        let at = Utc::now() - chrono::Duration::seconds(30);
        let mut headers = HeaderMap::new();
        headers.insert(
            RETRY_AFTER,
            HeaderValue::from_str(&at.to_rfc2822()).unwrap(),
        );
        assert_eq!(parse_retry_after_ms(&headers), Some(0));
    }

    #[test]
    fn malformed_retry_after_is_treated_as_absent() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("next tuesday"));
        assert_eq!(parse_retry_after_ms(&headers), None);

        let retry = policy(RetryPolicyConfig::default());
        // Falls back to the configured delay when the hint is unusable.
        let wait = retry.compute_wait_ms(None, 500);
        assert!((400..600).contains(&wait));
    }

    #[test]
    fn fallback_growth_is_capped() {
        let max = Duration::from_millis(30_000);
        let mut current = Duration::from_millis(500);
        for _ in 0..10 {
            current = next_fallback(current, 2.0, max);
        }
        assert_eq!(current, max);
    }
}
