use std::time::Duration;

use super::types::ReconnectStrategy;

/// Constant-pace reconnect policy.
///
/// Experiment sessions run for hours and transient network loss is common and
/// non-fatal, so retries continue indefinitely at a fixed delay. There is no
/// backoff growth and no attempt cap; the only way to stop retrying is an
/// explicit close.
#[derive(Clone, Copy, Debug)]
pub struct FixedDelayReconnect {
    delay: Duration,
}

impl FixedDelayReconnect {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for FixedDelayReconnect {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

impl ReconnectStrategy for FixedDelayReconnect {
    fn next_delay(&mut self) -> Duration {
        self.delay
    }

    fn reset(&mut self) {}

    fn should_retry(&self) -> bool {
        true
    }
}
