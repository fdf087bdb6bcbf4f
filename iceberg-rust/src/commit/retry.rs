/*!
Deterministic retry/backoff policy for the commit driver (§4.6).

Unlike a jittered backoff, every wait this generator produces is a pure
function of `(min_wait, max_wait, multiplier, attempt)`, so driver tests
can assert exact wait durations instead of ranges.
*/

use std::time::Duration;

use iceberg_rust_spec::table_metadata::{
    TableMetadata, COMMIT_MAX_RETRY_WAIT_MS, COMMIT_MAX_RETRY_WAIT_MS_DEFAULT, COMMIT_MIN_RETRY_WAIT_MS,
    COMMIT_MIN_RETRY_WAIT_MS_DEFAULT, COMMIT_NUM_RETRIES, COMMIT_NUM_RETRIES_DEFAULT, COMMIT_TOTAL_RETRY_TIME_MS,
    COMMIT_TOTAL_RETRY_TIME_MS_DEFAULT,
};

/// How many attempts to make and how long to wait between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of retries after the first attempt
    pub num_retries: u32,
    /// Lower bound on the backoff wait
    pub min_wait: Duration,
    /// Upper bound on the backoff wait
    pub max_wait: Duration,
    /// Wall-clock budget for the whole commit, across all attempts
    pub total_retry_time: Duration,
}

impl RetryPolicy {
    /// Read the retry policy from table properties, falling back to
    /// the documented defaults for any unset property.
    pub fn from_table_metadata(metadata: &TableMetadata) -> Self {
        RetryPolicy {
            num_retries: metadata.property_u64(COMMIT_NUM_RETRIES, COMMIT_NUM_RETRIES_DEFAULT as u64) as u32,
            min_wait: Duration::from_millis(metadata.property_u64(COMMIT_MIN_RETRY_WAIT_MS, COMMIT_MIN_RETRY_WAIT_MS_DEFAULT)),
            max_wait: Duration::from_millis(metadata.property_u64(COMMIT_MAX_RETRY_WAIT_MS, COMMIT_MAX_RETRY_WAIT_MS_DEFAULT)),
            total_retry_time: Duration::from_millis(
                metadata.property_u64(COMMIT_TOTAL_RETRY_TIME_MS, COMMIT_TOTAL_RETRY_TIME_MS_DEFAULT),
            ),
        }
    }

    /// Build a backoff generator for this policy.
    pub fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff::new(self.min_wait, self.max_wait, 2.0)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            num_retries: COMMIT_NUM_RETRIES_DEFAULT as u32,
            min_wait: Duration::from_millis(COMMIT_MIN_RETRY_WAIT_MS_DEFAULT),
            max_wait: Duration::from_millis(COMMIT_MAX_RETRY_WAIT_MS_DEFAULT),
            total_retry_time: Duration::from_millis(COMMIT_TOTAL_RETRY_TIME_MS_DEFAULT),
        }
    }
}

/// Produces the wait duration before attempt `n`, doubling each time and
/// clamping to `max_wait`.
#[derive(Debug, Clone, Copy)]
pub struct ExponentialBackoff {
    min_wait: Duration,
    max_wait: Duration,
    multiplier: f64,
}

impl ExponentialBackoff {
    /// Build a generator. `multiplier` is applied once per attempt,
    /// starting from `min_wait` at attempt 0.
    pub fn new(min_wait: Duration, max_wait: Duration, multiplier: f64) -> Self {
        ExponentialBackoff {
            min_wait,
            max_wait,
            multiplier,
        }
    }

    /// Wait duration before the `attempt`-th retry (0-indexed).
    pub fn wait_for(&self, attempt: u32) -> Duration {
        let scaled = self.min_wait.as_secs_f64() * self.multiplier.powi(attempt as i32);
        let capped = scaled.min(self.max_wait.as_secs_f64());
        Duration::from_secs_f64(capped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_until_it_hits_the_ceiling() {
        let backoff = ExponentialBackoff::new(Duration::from_millis(100), Duration::from_millis(1000), 2.0);
        assert_eq!(backoff.wait_for(0), Duration::from_millis(100));
        assert_eq!(backoff.wait_for(1), Duration::from_millis(200));
        assert_eq!(backoff.wait_for(2), Duration::from_millis(400));
        assert_eq!(backoff.wait_for(3), Duration::from_millis(800));
        assert_eq!(backoff.wait_for(4), Duration::from_millis(1000));
        assert_eq!(backoff.wait_for(10), Duration::from_millis(1000));
    }

    #[test]
    fn default_policy_matches_documented_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.num_retries, 4);
        assert_eq!(policy.min_wait, Duration::from_millis(100));
        assert_eq!(policy.max_wait, Duration::from_millis(60_000));
    }
}
