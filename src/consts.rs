//! Project-wide constants.

use std::time::Duration;

/// Public Signaloid API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.signaloid.io";

/// Environment variable holding the API token.
pub const TOKEN_ENV_VAR: &str = "SIGNALOID_API_TOKEN";

/// Environment variable overriding [`DEFAULT_BASE_URL`].
pub const BASE_URL_ENV_VAR: &str = "SIGNALOID_BASE_URL";

/// Delay between two status checks of a running task, in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5000;

/// [`DEFAULT_POLL_INTERVAL_MS`] as a [`Duration`].
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(DEFAULT_POLL_INTERVAL_MS);

/// Cap on the delay under exponential backoff, in milliseconds.
pub const DEFAULT_MAX_POLL_INTERVAL_MS: u64 = 60_000;

/// Status checks before a run gives up (ten minutes at the default interval).
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 120;

/// How many times an empty stdout is re-fetched before giving up.
pub const DEFAULT_STDOUT_RETRIES: u32 = 3;

/// Per-request timeout for the HTTP client.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Samples requested per value by the sampling strategy.
pub const DEFAULT_SAMPLE_COUNT: usize = 10;

/// Format a number with comma separators (e.g. 1,234,567).
pub fn format_number(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i).is_multiple_of(3) {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_https() {
        assert!(DEFAULT_BASE_URL.starts_with("https://"));
        assert!(!DEFAULT_BASE_URL.ends_with('/'));
    }

    #[test]
    fn default_poll_interval_is_five_seconds() {
        assert_eq!(DEFAULT_POLL_INTERVAL, Duration::from_secs(5));
    }

    #[test]
    fn format_number_small() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
    }

    #[test]
    fn format_number_groups_thousands() {
        assert_eq!(format_number(1_000), "1,000");
        assert_eq!(format_number(123_456), "123,456");
        assert_eq!(format_number(1_234_567), "1,234,567");
    }
}
