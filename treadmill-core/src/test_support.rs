//! Fakes for driving the control loop on the host

use std::boxed::Box;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::vec::Vec;

use treadmill_hal::{Clock, CountRequest, QuadratureCounter, SampleCell, SampleWriter, SetpointOutput};
use treadmill_protocol::{RegisterHost, Reply};

/// Counter whose snapshot is taken at request time
#[derive(Default)]
pub struct FakeEncoder {
    pub count: Rc<Cell<i32>>,
    snapshot: Option<i32>,
    pub requests: Rc<Cell<u32>>,
}

impl QuadratureCounter for FakeEncoder {
    fn request_count(&mut self) {
        if self.snapshot.is_none() {
            self.snapshot = Some(self.count.get());
            self.requests.set(self.requests.get() + 1);
        }
    }

    fn fetch_count(&mut self) -> i32 {
        if self.snapshot.is_none() {
            self.request_count();
        }
        self.snapshot.take().unwrap_or_default()
    }

    fn request_state(&self) -> CountRequest {
        if self.snapshot.is_some() {
            CountRequest::AwaitingResult
        } else {
            CountRequest::Idle
        }
    }
}

/// Records every setpoint written
#[derive(Default, Clone)]
pub struct FakeDac {
    pub writes: Rc<RefCell<Vec<u16>>>,
}

impl FakeDac {
    pub fn last(&self) -> Option<u16> {
        self.writes.borrow().last().copied()
    }
}

impl SetpointOutput for FakeDac {
    fn write_value(&mut self, value: u16) {
        self.writes.borrow_mut().push(value);
    }
}

/// Manually advanced microsecond clock
#[derive(Default, Clone)]
pub struct FakeClock {
    pub now: Rc<Cell<u32>>,
}

impl FakeClock {
    pub fn set(&self, now_us: u32) {
        self.now.set(now_us);
    }

    pub fn advance(&self, us: u32) {
        self.now.set(self.now.get().wrapping_add(us));
    }
}

impl Clock for FakeClock {
    fn now_us(&self) -> u32 {
        self.now.get()
    }
}

/// Collects replies in order
#[derive(Default)]
pub struct RecordingHost {
    pub replies: Vec<Reply>,
    pub muted: bool,
}

impl RecordingHost {
    pub fn take(&mut self) -> Vec<Reply> {
        core::mem::take(&mut self.replies)
    }
}

impl RegisterHost for RecordingHost {
    fn send_reply(&mut self, reply: &Reply) {
        self.replies.push(reply.clone());
    }

    fn is_muted(&self) -> bool {
        self.muted
    }
}

/// A sample cell that outlives the test, with its writer
pub fn leaked_cell() -> (&'static SampleCell, SampleWriter<'static>) {
    let cell: &'static SampleCell = Box::leak(Box::new(SampleCell::new()));
    let writer = cell.claim().unwrap();
    (cell, writer)
}
