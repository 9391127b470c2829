//! Microsecond time source

/// Free-running microsecond clock
///
/// The value wraps modulo 2^32 (about 71.6 minutes). Consumers compare
/// times with wrapping arithmetic and never assume monotonic `u32`s.
pub trait Clock {
    /// Microseconds since an arbitrary epoch
    fn now_us(&self) -> u32;
}
