//! Wraparound-safe deadlines
//!
//! Times are `u32` microseconds that wrap every ~71.6 minutes. A deadline
//! is due when the signed distance from it to `now` is non-negative,
//! which stays correct across a wrap as long as the two times are less
//! than 2^31 µs apart.

/// True when `now` is at or past `due`
pub fn is_due(now_us: u32, due_us: u32) -> bool {
    (now_us.wrapping_sub(due_us) as i32) >= 0
}

/// Fixed-interval deadline that advances by exactly one interval per firing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Deadline {
    interval_us: u32,
    next_us: u32,
}

impl Deadline {
    /// Deadline due one interval after `now_us`
    pub fn new(interval_us: u32, now_us: u32) -> Self {
        Self {
            interval_us,
            next_us: now_us.wrapping_add(interval_us),
        }
    }

    pub fn interval_us(&self) -> u32 {
        self.interval_us
    }

    pub fn next_us(&self) -> u32 {
        self.next_us
    }

    /// Schedule the next firing one interval after `now_us`
    pub fn restart(&mut self, now_us: u32) {
        self.next_us = now_us.wrapping_add(self.interval_us);
    }

    /// Change the interval and restart from `now_us`
    pub fn set_interval(&mut self, interval_us: u32, now_us: u32) {
        self.interval_us = interval_us;
        self.restart(now_us);
    }

    /// Fire at most once; advances by one interval when due
    ///
    /// After a stall, successive polls fire back to back until the
    /// schedule has caught up.
    pub fn poll(&mut self, now_us: u32) -> bool {
        if is_due(now_us, self.next_us) {
            self.next_us = self.next_us.wrapping_add(self.interval_us);
            true
        } else {
            false
        }
    }
}

/// Outcome of a dispatch frequency change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RateChange {
    /// Frequency actually applied
    pub applied_hz: u16,
    /// True when the request exceeded the limit
    pub clamped: bool,
}

/// Telemetry dispatch rate
///
/// Frequency 0 disables dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DispatchRate {
    frequency_hz: u16,
    deadline: Deadline,
}

impl Default for DispatchRate {
    fn default() -> Self {
        Self::new()
    }
}

impl DispatchRate {
    /// Dispatch disabled
    pub fn new() -> Self {
        Self {
            frequency_hz: 0,
            deadline: Deadline::new(0, 0),
        }
    }

    pub fn frequency_hz(&self) -> u16 {
        self.frequency_hz
    }

    /// Interval between events, or `None` while disabled
    pub fn interval_us(&self) -> Option<u32> {
        (self.frequency_hz != 0).then_some(self.deadline.interval_us())
    }

    /// Set the frequency, clamped to `max_hz`, first event one interval from now
    pub fn set_frequency(&mut self, requested_hz: u16, max_hz: u16, now_us: u32) -> RateChange {
        let applied_hz = requested_hz.min(max_hz);
        self.frequency_hz = applied_hz;
        if applied_hz != 0 {
            self.deadline
                .set_interval(1_000_000 / applied_hz as u32, now_us);
        }

        RateChange {
            applied_hz,
            clamped: requested_hz > max_hz,
        }
    }

    /// Whether an event is due now
    pub fn poll(&mut self, now_us: u32) -> bool {
        self.frequency_hz != 0 && self.deadline.poll(now_us)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_is_due_across_wrap() {
        assert!(is_due(5, u32::MAX - 5));
        assert!(!is_due(u32::MAX - 5, 5));
        assert!(is_due(100, 100));
    }

    #[test]
    fn test_deadline_advances_by_interval() {
        let mut deadline = Deadline::new(1000, 0);
        assert!(!deadline.poll(999));
        assert!(deadline.poll(1003));
        // Next firing is anchored to the schedule, not to the late poll.
        assert_eq!(deadline.next_us(), 2000);
    }

    #[test]
    fn test_deadline_catches_up_after_stall() {
        let mut deadline = Deadline::new(1000, 0);
        let fired = (0..5).filter(|_| deadline.poll(3500)).count();
        assert_eq!(fired, 3);
        assert_eq!(deadline.next_us(), 4000);
    }

    #[test]
    fn test_frequency_clamped() {
        let mut rate = DispatchRate::new();
        let change = rate.set_frequency(5000, 1000, 0);
        assert_eq!(change, RateChange { applied_hz: 1000, clamped: true });
        assert_eq!(rate.frequency_hz(), 1000);
        assert_eq!(rate.interval_us(), Some(1000));
    }

    #[test]
    fn test_zero_disables() {
        let mut rate = DispatchRate::new();
        rate.set_frequency(100, 1000, 0);
        let change = rate.set_frequency(0, 1000, 0);
        assert!(!change.clamped);
        assert_eq!(rate.interval_us(), None);
        assert!(!rate.poll(1_000_000));
    }

    #[test]
    fn test_first_event_one_interval_after_set() {
        let mut rate = DispatchRate::new();
        rate.set_frequency(100, 1000, 50_000);
        assert!(!rate.poll(59_999));
        assert!(rate.poll(60_000));
    }

    proptest! {
        #[test]
        fn prop_no_drift_across_wrap(
            start in any::<u32>(),
            interval in 1u32..100_000,
            periods in 1u32..200,
            jitter in 0u32..1000,
        ) {
            let mut deadline = Deadline::new(interval, start);
            let step = (interval / 7).max(1);
            let end = start.wrapping_add(interval.wrapping_mul(periods));

            let mut fired = 0u32;
            let mut elapsed = 0u32;
            let mut expected_next = start.wrapping_add(interval);
            while elapsed < interval * periods {
                let now = start.wrapping_add(elapsed);
                if deadline.poll(now) {
                    fired += 1;
                    expected_next = expected_next.wrapping_add(interval);
                    prop_assert_eq!(deadline.next_us(), expected_next);
                }
                elapsed += step + (jitter % step);
            }
            // One final poll exactly at the end catches any last period.
            while deadline.poll(end) {
                fired += 1;
            }
            prop_assert_eq!(fired, periods);
        }
    }
}
