// Copyright (c) 2026 Anvil Systems
// SPDX-License-Identifier: AGPL-3.0
//! Global introspection-start throttle.
//!
//! Many nodes share PDU and DHCP capacity; kicking off hundreds of power
//! cycles at the same instant browns out both. This is deliberately a blunt
//! process-wide spacing of starts, not per-node or per-BMC fairness.

use regex::Regex;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::debug;

pub struct IntrospectionThrottle {
    min_delay: Duration,
    /// Only drivers matching this pattern are paced; `None` paces all.
    driver_pattern: Option<Regex>,
    /// Instant of the most recent qualifying start. The mutex is held
    /// across the whole read/compare/sleep/update sequence so concurrent
    /// callers serialize on it.
    last_start: Mutex<Option<Instant>>,
}

impl IntrospectionThrottle {
    pub fn new(min_delay: Duration, driver_pattern: Option<Regex>) -> Self {
        Self {
            min_delay,
            driver_pattern,
            last_start: Mutex::new(None),
        }
    }

    /// Throttle disabled entirely.
    pub fn unlimited() -> Self {
        Self::new(Duration::ZERO, None)
    }

    /// Block until at least `min_delay` has passed since the previous
    /// qualifying start. The recorded timestamp is the instant observed
    /// before sleeping, so spacing is bounded start-to-start.
    pub async fn pace(&self, driver: &str) {
        if self.min_delay.is_zero() {
            return;
        }
        if let Some(pattern) = &self.driver_pattern {
            if !pattern.is_match(driver) {
                return;
            }
        }

        let mut last_start = self.last_start.lock().await;
        let now = Instant::now();
        if let Some(previous) = *last_start {
            let elapsed = now.duration_since(previous);
            if elapsed < self.min_delay {
                let wait = self.min_delay - elapsed;
                debug!(driver, wait_ms = wait.as_millis() as u64, "throttling introspection start");
                sleep(wait).await;
            }
        }
        *last_start = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_secs(10);

    #[tokio::test(start_paused = true)]
    async fn first_start_is_not_delayed() {
        let throttle = IntrospectionThrottle::new(DELAY, None);
        let before = Instant::now();
        throttle.pace("agent_ipmitool").await;
        assert_eq!(before.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn waits_out_the_remaining_delay_and_records_pre_sleep_instant() {
        let throttle = IntrospectionThrottle::new(DELAY, None);
        throttle.pace("agent_ipmitool").await; // last = T0

        tokio::time::advance(Duration::from_secs(2)).await;
        let before = Instant::now();
        throttle.pace("agent_ipmitool").await; // arrives at T0+2, waits 8
        assert_eq!(before.elapsed(), Duration::from_secs(8));

        // last was set to T0+2 (the pre-sleep instant), not T0+10: a call
        // right after the wait (now T0+10) still has to wait 2 more seconds.
        let before = Instant::now();
        throttle.pace("agent_ipmitool").await;
        assert_eq!(before.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn elapsed_delay_means_no_wait() {
        let throttle = IntrospectionThrottle::new(DELAY, None);
        throttle.pace("agent_ipmitool").await;
        tokio::time::advance(Duration::from_secs(60)).await;

        let before = Instant::now();
        throttle.pace("agent_ipmitool").await;
        assert_eq!(before.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn non_matching_driver_bypasses_wait_and_update() {
        let pattern = Regex::new("fo{1,2}b.r").unwrap();
        let throttle = IntrospectionThrottle::new(DELAY, Some(pattern));

        throttle.pace("foobar").await; // qualifies, last = T0
        tokio::time::advance(Duration::from_secs(2)).await;

        let before = Instant::now();
        throttle.pace("agent_ipmitool").await; // does not qualify
        assert_eq!(before.elapsed(), Duration::ZERO);

        // The non-matching call must not have touched the timestamp.
        let before = Instant::now();
        throttle.pace("foobar").await;
        assert_eq!(before.elapsed(), Duration::from_secs(8));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_delay_disables_throttling() {
        let throttle = IntrospectionThrottle::unlimited();
        throttle.pace("agent_ipmitool").await;
        let before = Instant::now();
        throttle.pace("agent_ipmitool").await;
        assert_eq!(before.elapsed(), Duration::ZERO);
    }
}
