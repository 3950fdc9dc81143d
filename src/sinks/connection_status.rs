//! Endpoint health and the retry cadence derived from it

use std::time::Duration;

/// Tunable backoff schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Interval after the second consecutive failure; doubles after each further failure
    pub minimum_backoff: Duration,
    pub maximum_backoff: Duration,
    /// Failures after which each tick discards its batch
    pub drop_batch_after: u32,
    /// Failures after which each tick also discards the whole queue
    pub drop_queue_after: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            minimum_backoff: Duration::from_secs(5),
            maximum_backoff: Duration::from_secs(10 * 60),
            drop_batch_after: 8,
            drop_queue_after: 10,
        }
    }
}

/// Consecutive delivery failures and the schedule they imply.
///
/// Owned by the batching worker; one failure is tolerated at the base
/// period, then the interval grows exponentially up to the policy maximum.
#[derive(Debug, Clone)]
pub struct ConnectionStatus {
    period: Duration,
    policy: BackoffPolicy,
    failures_since_success: u32,
}

impl ConnectionStatus {
    pub fn new(period: Duration, policy: BackoffPolicy) -> Self {
        Self {
            period,
            policy,
            failures_since_success: 0,
        }
    }

    pub fn mark_success(&mut self) {
        self.failures_since_success = 0;
    }

    pub fn mark_failure(&mut self) {
        self.failures_since_success = self.failures_since_success.saturating_add(1);
    }

    pub fn failures_since_success(&self) -> u32 {
        self.failures_since_success
    }

    pub fn next_interval(&self) -> Duration {
        if self.failures_since_success <= 1 {
            return self.period;
        }

        let backed_off = 1u32
            .checked_shl(self.failures_since_success - 1)
            .and_then(|factor| self.policy.minimum_backoff.checked_mul(factor))
            .unwrap_or(self.policy.maximum_backoff);

        backed_off.min(self.policy.maximum_backoff).max(self.period)
    }

    pub fn should_drop_batch(&self) -> bool {
        self.failures_since_success >= self.policy.drop_batch_after
    }

    pub fn should_drop_queue(&self) -> bool {
        self.failures_since_success >= self.policy.drop_queue_after
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PERIOD: Duration = Duration::from_secs(2);

    fn status() -> ConnectionStatus {
        ConnectionStatus::new(PERIOD, BackoffPolicy::default())
    }

    #[test]
    fn test_first_failure_keeps_base_period() {
        let mut s = status();
        assert_eq!(s.next_interval(), PERIOD);
        s.mark_failure();
        assert_eq!(s.next_interval(), PERIOD);
    }

    #[test]
    fn test_escalation_schedule() {
        let mut s = status();
        s.mark_failure();
        s.mark_failure();
        assert_eq!(s.next_interval(), Duration::from_secs(10));
        s.mark_failure();
        assert_eq!(s.next_interval(), Duration::from_secs(20));
        s.mark_failure();
        assert_eq!(s.next_interval(), Duration::from_secs(40));
    }

    #[test]
    fn test_interval_is_capped() {
        let mut s = status();
        for _ in 0..40 {
            s.mark_failure();
        }
        assert_eq!(s.next_interval(), Duration::from_secs(600));
    }

    #[test]
    fn test_success_resets_escalation() {
        let mut s = status();
        for _ in 0..5 {
            s.mark_failure();
        }
        s.mark_success();
        assert_eq!(s.next_interval(), PERIOD);

        s.mark_failure();
        assert_eq!(s.next_interval(), PERIOD);
        s.mark_failure();
        assert_eq!(s.next_interval(), Duration::from_secs(10));
    }

    #[test]
    fn test_batch_dropped_after_ten_minutes_thirty_two_seconds() {
        let mut s = status();
        let mut elapsed = Duration::ZERO;

        for _ in 0..7 {
            s.mark_failure();
            assert!(!s.should_drop_batch());
            elapsed += s.next_interval();
        }
        // The eighth attempt happens here and fails
        assert_eq!(elapsed, Duration::from_secs(10 * 60 + 32));
        s.mark_failure();
        assert!(s.should_drop_batch());
        assert!(!s.should_drop_queue());
    }

    #[test]
    fn test_queue_dropped_after_thirty_minutes_thirty_two_seconds() {
        let mut s = status();
        let mut elapsed = Duration::ZERO;

        for _ in 0..9 {
            s.mark_failure();
            assert!(!s.should_drop_queue());
            elapsed += s.next_interval();
        }
        assert_eq!(elapsed, Duration::from_secs(30 * 60 + 32));
        s.mark_failure();
        assert!(s.should_drop_queue());
    }

    #[test]
    fn test_long_period_is_never_shortened() {
        let mut s = ConnectionStatus::new(Duration::from_secs(30), BackoffPolicy::default());
        s.mark_failure();
        s.mark_failure();
        assert_eq!(s.next_interval(), Duration::from_secs(30));
    }
}
