//! Timeout helpers and default protocol durations

use std::future::Future;
use std::time::Duration;

use crate::error::{RconError, Result};

/// Default time allowed for opening the TCP socket
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default time allowed for the server's authentication verdict
pub const DEFAULT_AUTH_TIMEOUT: Duration = Duration::from_secs(5);

/// Default deadline for one command round-trip
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

/// Base delay between automatic reconnection attempts
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Upper bound for the exponential reconnect backoff
pub const MAX_RECONNECT_BACKOFF: Duration = Duration::from_secs(30);

/// Bounded time given to flush and close the socket on disconnect
pub const CLOSE_TIMEOUT: Duration = Duration::from_millis(500);

/// Run `fut` with a deadline, mapping expiry to `on_elapsed`.
pub async fn with_timeout_error<F, T>(
    fut: F,
    duration: Duration,
    on_elapsed: RconError,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(duration, fut).await {
        Ok(result) => result,
        Err(_) => Err(on_elapsed),
    }
}

/// Delay before reconnect attempt `attempt` (1-based): doubling from `base`, capped.
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let factor = 1u32 << attempt.saturating_sub(1).min(16);
    base.saturating_mul(factor).min(MAX_RECONNECT_BACKOFF)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_then_caps() {
        let base = Duration::from_millis(500);
        assert_eq!(backoff_delay(base, 1), Duration::from_millis(500));
        assert_eq!(backoff_delay(base, 2), Duration::from_secs(1));
        assert_eq!(backoff_delay(base, 3), Duration::from_secs(2));
        assert_eq!(backoff_delay(base, 40), MAX_RECONNECT_BACKOFF);
    }

    #[tokio::test]
    async fn elapsed_future_maps_to_given_error() {
        let result: Result<()> = with_timeout_error(
            async {
                tokio::time::sleep(Duration::from_millis(200)).await;
                Ok(())
            },
            Duration::from_millis(20),
            RconError::ConnectionTimeout("test"),
        )
        .await;
        assert!(matches!(result, Err(RconError::ConnectionTimeout("test"))));
    }
}
