//! Periodic work scheduling
//!
//! Drift-free deadlines on a wrapping microsecond clock, and the
//! telemetry dispatch rate built on them.

pub mod deadline;

pub use deadline::{is_due, Deadline, DispatchRate, RateChange};
