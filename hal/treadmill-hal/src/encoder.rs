//! Quadrature position counter abstraction
//!
//! Reading a hardware counter is split into two halves so the control
//! loop never waits on it: [`QuadratureCounter::request_count`] asks for
//! a snapshot and returns at once, and a later
//! [`QuadratureCounter::fetch_count`] collects it. At most one request
//! is outstanding at any time; [`CountRequest`] names the two states.

/// Request/fetch protocol state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CountRequest {
    /// No snapshot requested
    #[default]
    Idle,
    /// A snapshot was requested and not yet collected
    AwaitingResult,
}

/// Free-running signed quadrature counter
///
/// Counts start at 0 when the counter is created and wrap modulo 2^32.
/// Implementations must keep the protocol sane when misused: a second
/// `request_count` while a request is outstanding is ignored, and a
/// `fetch_count` with no outstanding request performs a fresh
/// request/fetch pair.
pub trait QuadratureCounter {
    /// Ask for a count snapshot without waiting for it
    fn request_count(&mut self);

    /// Collect the snapshot for the outstanding request
    ///
    /// May block briefly if the counter has not produced it yet.
    fn fetch_count(&mut self) -> i32;

    /// Current protocol state
    fn request_state(&self) -> CountRequest;

    /// Synchronous read of the current count
    ///
    /// Any outstanding request is completed and discarded first so the
    /// returned value is fresh.
    fn get_count(&mut self) -> i32 {
        if self.request_state() == CountRequest::AwaitingResult {
            let _stale = self.fetch_count();
        }
        self.request_count();
        self.fetch_count()
    }
}
