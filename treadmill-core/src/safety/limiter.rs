//! Torque-limit monitor
//!
//! ```text
//!              enable                   filtered ∉ band
//!  Disabled ──────────► Armed ─────────────────────────► Triggered
//!     ▲                  ▲  ◄──────── clear ──────────────┘
//!     └── disable ───────┴──────────── disable ───────────┘
//! ```
//!
//! The state is derived from two flags: `enabled` and `latched`. A latch
//! survives disabling, so setpoint writes stay blocked until an explicit
//! clear.

use crate::config::SafetyBand;

/// Monitor state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MonitorState {
    Disabled,
    Armed,
    Triggered,
}

/// Result of one periodic check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LimitCheck {
    /// Monitor not armed; the sample was ignored
    Skipped,
    /// Filtered torque inside the band
    Safe(i16),
    /// Filtered torque left the band; the latch is now set
    Tripped(i16),
}

/// Single-pole low-pass filter, `y ← (15·y + x) / 16`
///
/// The accumulator holds `16·y` so the four fractional bits are kept and
/// a constant input converges to exactly that input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TorqueFilter {
    acc: Option<i32>,
}

impl TorqueFilter {
    const SHIFT: u32 = 4;

    pub const fn new() -> Self {
        Self { acc: None }
    }

    /// Forget history; the next sample seeds the filter
    pub fn reseed(&mut self) {
        self.acc = None;
    }

    /// Feed one sample and return the filtered value
    pub fn update(&mut self, sample: i16) -> i16 {
        let x = sample as i32;
        let acc = match self.acc {
            None => x << Self::SHIFT,
            Some(acc) => acc - (acc >> Self::SHIFT) + x,
        };
        self.acc = Some(acc);
        (acc >> Self::SHIFT) as i16
    }

    /// Current output, if seeded
    pub fn value(&self) -> Option<i16> {
        self.acc.map(|acc| (acc >> Self::SHIFT) as i16)
    }
}

/// Torque-limit monitor
#[derive(Debug, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TorqueLimiter {
    band: SafetyBand,
    enabled: bool,
    latched: bool,
    filter: TorqueFilter,
}

impl TorqueLimiter {
    /// Armed monitor with an unseeded filter
    pub fn new(band: SafetyBand) -> Self {
        Self {
            band,
            enabled: true,
            latched: false,
            filter: TorqueFilter::new(),
        }
    }

    /// Return to the power-on state: enabled, unlatched, unseeded
    pub fn reset(&mut self) {
        self.enabled = true;
        self.latched = false;
        self.filter.reseed();
    }

    pub fn state(&self) -> MonitorState {
        match (self.enabled, self.latched) {
            (false, _) => MonitorState::Disabled,
            (true, true) => MonitorState::Triggered,
            (true, false) => MonitorState::Armed,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether a trip is latched, regardless of the enable flag
    pub fn is_latched(&self) -> bool {
        self.latched
    }

    /// Turn limiting on or off
    ///
    /// Enabling reseeds the filter. Disabling leaves a latched trip in place.
    pub fn set_enabled(&mut self, enabled: bool) {
        if enabled && !self.enabled {
            self.filter.reseed();
        }
        self.enabled = enabled;
    }

    /// Release the latch and reseed the filter
    pub fn clear(&mut self) {
        self.latched = false;
        self.filter.reseed();
    }

    /// Filtered torque, if the filter has been fed since the last reseed
    pub fn filtered(&self) -> Option<i16> {
        self.filter.value()
    }

    /// Run one periodic check against a raw torque sample
    pub fn check(&mut self, raw_torque: i16) -> LimitCheck {
        if self.state() != MonitorState::Armed {
            return LimitCheck::Skipped;
        }

        let filtered = self.filter.update(raw_torque);
        if self.band.contains(filtered) {
            LimitCheck::Safe(filtered)
        } else {
            self.latched = true;
            LimitCheck::Tripped(filtered)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn limiter() -> TorqueLimiter {
        TorqueLimiter::new(SafetyBand { min: 100, max: 3995 })
    }

    #[test]
    fn test_filter_seeds_from_first_sample() {
        let mut filter = TorqueFilter::new();
        assert_eq!(filter.value(), None);
        assert_eq!(filter.update(2048), 2048);
        assert_eq!(filter.value(), Some(2048));
    }

    #[test]
    fn test_filter_step_response() {
        let mut filter = TorqueFilter::new();
        filter.update(0);
        // First step moves 1/16 of the way.
        assert_eq!(filter.update(1600), 100);
        assert_eq!(filter.update(1600), 193);
    }

    #[test]
    fn test_filter_reaches_constant_input() {
        let mut filter = TorqueFilter::new();
        filter.update(2048);
        let mut y = 0;
        for _ in 0..400 {
            y = filter.update(4000);
        }
        assert_eq!(y, 4000);
    }

    #[test]
    fn test_mid_scale_stays_armed() {
        let mut limiter = limiter();
        for _ in 0..1000 {
            assert_eq!(limiter.check(2048), LimitCheck::Safe(2048));
        }
        assert_eq!(limiter.state(), MonitorState::Armed);
    }

    #[test]
    fn test_sustained_overload_trips() {
        let mut limiter = limiter();
        limiter.check(2048);

        let mut tripped_after = None;
        for i in 1..=400 {
            if let LimitCheck::Tripped(y) = limiter.check(4000) {
                assert!(y >= 3995);
                tripped_after = Some(i);
                break;
            }
        }
        let n = tripped_after.expect("monitor never tripped");
        assert!(n > 50, "tripped too early: {}", n);
        assert_eq!(limiter.state(), MonitorState::Triggered);
        assert_eq!(limiter.check(4000), LimitCheck::Skipped);
    }

    #[test]
    fn test_lower_bound_trips() {
        let mut limiter = limiter();
        assert_eq!(limiter.check(100), LimitCheck::Tripped(100));
    }

    #[test]
    fn test_single_spike_is_filtered() {
        let mut limiter = limiter();
        limiter.check(2048);
        assert_eq!(limiter.check(i16::MAX), LimitCheck::Safe(3967));
        assert_eq!(limiter.state(), MonitorState::Armed);
    }

    #[test]
    fn test_clear_rearms_with_fresh_filter() {
        let mut limiter = limiter();
        limiter.check(4000);
        assert_eq!(limiter.state(), MonitorState::Triggered);

        limiter.clear();
        assert_eq!(limiter.state(), MonitorState::Armed);
        assert_eq!(limiter.filtered(), None);
        assert_eq!(limiter.check(2048), LimitCheck::Safe(2048));
    }

    #[test]
    fn test_disable_keeps_latch() {
        let mut limiter = limiter();
        limiter.check(50);
        limiter.set_enabled(false);
        assert_eq!(limiter.state(), MonitorState::Disabled);
        assert!(limiter.is_latched());

        limiter.set_enabled(true);
        assert_eq!(limiter.state(), MonitorState::Triggered);
    }

    #[test]
    fn test_disabled_ignores_samples() {
        let mut limiter = limiter();
        limiter.set_enabled(false);
        assert_eq!(limiter.check(0), LimitCheck::Skipped);
        assert!(!limiter.is_latched());
    }

    #[test]
    fn test_reset() {
        let mut limiter = limiter();
        limiter.set_enabled(false);
        limiter.check(0);
        limiter.reset();
        assert_eq!(limiter.state(), MonitorState::Armed);
        assert_eq!(limiter.filtered(), None);
    }

    proptest! {
        #[test]
        fn prop_filter_converges_exactly(start in any::<i16>(), target in any::<i16>()) {
            let mut filter = TorqueFilter::new();
            filter.update(start);
            let mut y = start;
            for _ in 0..600 {
                y = filter.update(target);
            }
            prop_assert_eq!(y, target);
        }

        #[test]
        fn prop_filter_stays_between_input_extremes(start in any::<i16>(), target in any::<i16>()) {
            let mut filter = TorqueFilter::new();
            filter.update(start);
            let (lo, hi) = (start.min(target), start.max(target));
            for _ in 0..50 {
                let y = filter.update(target);
                prop_assert!(y >= lo && y <= hi);
            }
        }
    }
}
