// AERIE - Distributed environmental telemetry
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Reconnect pacing for outbound links
//!
//! Sensors and edge uplinks never give up on a transient failure: they
//! reconnect forever, spaced by one of these policies. The attempt
//! counter resets on every successful connection.

use std::time::Duration;

/// Delay policy between reconnect attempts
#[derive(Debug, Clone, PartialEq)]
pub enum RetryPolicy {
    /// Constant delay between attempts
    Fixed {
        /// Delay applied to every attempt
        delay: Duration,
    },
    /// Exponentially growing delay, capped
    ExponentialBackoff {
        /// Delay before the first retry
        initial_delay: Duration,
        /// Ceiling the delay never exceeds
        max_delay: Duration,
        /// Growth factor per attempt
        multiplier: f64,
    },
}

impl RetryPolicy {
    /// Fixed delay of `secs` seconds
    pub fn fixed_secs(secs: u64) -> Self {
        RetryPolicy::Fixed {
            delay: Duration::from_secs(secs),
        }
    }

    /// Delay to wait before retry number `attempt` (0-indexed)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        match self {
            RetryPolicy::Fixed { delay } => *delay,
            RetryPolicy::ExponentialBackoff {
                initial_delay,
                max_delay,
                multiplier,
            } => {
                let delay_ms = initial_delay.as_millis() as f64 * multiplier.powi(attempt as i32);
                // powi overflows to inf for large attempts; min() keeps it finite
                let capped_ms = delay_ms.min(max_delay.as_millis() as f64);
                Duration::from_millis(capped_ms as u64)
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::ExponentialBackoff {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_delay_is_constant() {
        let policy = RetryPolicy::fixed_secs(5);
        assert_eq!(policy.delay_for_attempt(0), Duration::from_secs(5));
        assert_eq!(policy.delay_for_attempt(10), Duration::from_secs(5));
        assert_eq!(policy.delay_for_attempt(1000), Duration::from_secs(5));
    }

    #[test]
    fn test_exponential_growth() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for_attempt(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_secs(4));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_secs(8));
    }

    #[test]
    fn test_exponential_cap() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for_attempt(5), Duration::from_secs(30));
        assert_eq!(policy.delay_for_attempt(100), Duration::from_secs(30));
    }
}
