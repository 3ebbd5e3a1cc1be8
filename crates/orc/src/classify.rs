use std::time::Duration;

const DEFAULT_RATE_LIMIT_WAIT: Duration = Duration::from_secs(60);

/// Whether an error message should be treated as a provider rate limit
/// rather than an ordinary transient failure.
pub fn is_rate_limit_message(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("rate limit") || lower.contains("token rate limit")
}

/// Extracts how long to wait before the next attempt: the explicit
/// `retry_after` when the provider supplied one, else a `"try again in ...
/// Ns"` substring in the message, else a 60s default.
pub fn extract_wait_time(message: &str, retry_after: Option<Duration>) -> Duration {
    if let Some(wait) = retry_after {
        return wait;
    }
    parse_try_again_seconds(message).unwrap_or(DEFAULT_RATE_LIMIT_WAIT)
}

fn parse_try_again_seconds(message: &str) -> Option<Duration> {
    let lower = message.to_ascii_lowercase();
    let marker = "try again in ";
    let start = lower.find(marker)? + marker.len();
    let rest = &lower[start..];
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse::<u64>().ok().map(Duration::from_secs)
}
