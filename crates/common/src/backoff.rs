use std::time::Duration;

/// Capped exponential backoff for reconnect loops.
///
/// The delay doubles on every [`Backoff::next_delay`] call until it reaches
/// `max`, and starts over from `base` after [`Backoff::reset`].
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    attempt: u32,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max: max.max(base),
            attempt: 0,
        }
    }

    pub fn from_millis(base_ms: u64, max_ms: u64) -> Self {
        Self::new(Duration::from_millis(base_ms), Duration::from_millis(max_ms))
    }

    /// Number of delays handed out since the last reset.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn next_delay(&mut self) -> Duration {
        let factor = 2_u32.saturating_pow(self.attempt);
        self.attempt = self.attempt.saturating_add(1);
        self.base.saturating_mul(factor).min(self.max)
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    /// Sleep for the next delay, logging the retry.
    #[cfg(feature = "async")]
    pub async fn wait(&mut self, operation_name: &str) {
        let delay = self.next_delay();
        tracing::warn!(
            operation = operation_name,
            attempt = self.attempt,
            delay_ms = delay.as_millis() as u64,
            "Retrying after backoff"
        );
        tokio::time::sleep(delay).await;
    }
}
