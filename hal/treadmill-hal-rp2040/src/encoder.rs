//! PIO quadrature encoder
//!
//! The state machine decodes A/B edges into a 32-bit count held in its Y
//! register. It never pushes on its own: the CPU writes a request word to
//! the TX FIFO and the program answers with one snapshot in the RX FIFO,
//! which is what lets the control loop split the read into a request and
//! a later fetch.
//!
//! The program must load at address 0 because it jumps through a 16-entry
//! table indexed by `old_state << 2 | new_state`. Give the encoder a PIO
//! block of its own, or load it first.

use embassy_rp::gpio::Pull;
use embassy_rp::pio::{
    Common, Config, Direction as PioDirection, Instance, LoadedProgram, Pin, PioPin, ShiftConfig,
    ShiftDirection, StateMachine,
};
use embassy_rp::Peri;
use treadmill_hal::{CountRequest, QuadratureCounter};

use crate::error::DriverError;
use crate::pio::{integer_divider, require_consecutive};

/// Quadrature counter on one PIO state machine
pub struct PioEncoder<'d, PIO: Instance, const SM: usize> {
    sm: StateMachine<'d, PIO, SM>,
    program: Option<LoadedProgram<'d, PIO>>,
    _pin_a: Pin<'d, PIO>,
    _pin_b: Pin<'d, PIO>,
    request: CountRequest,
    /// Hardware count at construction; reported counts are relative to it
    origin: u32,
}

impl<'d, PIO: Instance, const SM: usize> PioEncoder<'d, PIO, SM> {
    /// Load the decoder and start counting from 0
    ///
    /// `pin_b` must be the GPIO directly after `pin_a`. Both inputs get
    /// pull-ups, matching open-collector encoders.
    pub fn new<A: PioPin, B: PioPin>(
        common: &mut Common<'d, PIO>,
        mut sm: StateMachine<'d, PIO, SM>,
        pin_a: Peri<'d, A>,
        pin_b: Peri<'d, B>,
    ) -> Result<Self, DriverError> {
        let mut pin_a = common.make_pio_pin(pin_a);
        let mut pin_b = common.make_pio_pin(pin_b);
        require_consecutive(&pin_a, &pin_b)?;
        pin_a.set_pull(Pull::Up);
        pin_b.set_pull(Pull::Up);

        let prg = pio::pio_asm!(
            ".origin 0",
            // Transition table: old AB in bits 3:2, new AB in bits 1:0
            "jmp update",    // 00 -> 00
            "jmp decrement", // 00 -> 01
            "jmp increment", // 00 -> 10
            "jmp update",    // 00 -> 11
            "jmp increment", // 01 -> 00
            "jmp update",    // 01 -> 01
            "jmp update",    // 01 -> 10
            "jmp decrement", // 01 -> 11
            "jmp decrement", // 10 -> 00
            "jmp update",    // 10 -> 01
            "jmp update",    // 10 -> 10
            "jmp increment", // 10 -> 11
            "jmp update",    // 11 -> 00
            "jmp increment", // 11 -> 01
            "jmp decrement", // 11 -> 10
            "jmp update",    // 11 -> 11
            "decrement:",
            "jmp y-- update",
            ".wrap_target",
            "update:",
            "set x, 0",
            // X stays 0 unless the CPU queued a request
            "pull noblock",
            "mov x, osr",
            "mov osr, isr",
            "jmp !x sample_pins",
            "mov isr, y",
            "push",
            "sample_pins:",
            "mov isr, null",
            "in osr, 2",
            "in pins, 2",
            "mov pc, isr",
            // Y + 1 as !(!Y - 1); PIO can only decrement
            "increment:",
            "mov x, !y",
            "jmp x-- increment_cont",
            "increment_cont:",
            "mov y, !x",
            ".wrap"
        );

        let installed = common
            .try_load_program(&prg.program)
            .map_err(|_| DriverError::ProgramSpace)?;

        let mut cfg = Config::default();
        cfg.use_program(&installed, &[]);
        cfg.set_in_pins(&[&pin_a, &pin_b]);
        cfg.shift_in = ShiftConfig {
            auto_fill: false,
            threshold: 32,
            direction: ShiftDirection::Left,
        };
        cfg.shift_out = ShiftConfig {
            auto_fill: false,
            threshold: 32,
            direction: ShiftDirection::Right,
        };
        // Full speed: the table lookup bounds the maximum edge rate
        cfg.clock_divider = integer_divider(1);

        sm.set_config(&cfg);
        sm.set_pin_dirs(PioDirection::In, &[&pin_a, &pin_b]);
        sm.clear_fifos();
        sm.set_enable(true);

        let mut encoder = Self {
            sm,
            program: Some(installed),
            _pin_a: pin_a,
            _pin_b: pin_b,
            request: CountRequest::Idle,
            origin: 0,
        };
        encoder.origin = encoder.raw_count();

        #[cfg(feature = "defmt")]
        defmt::info!("encoder: SM{} counting", SM);

        Ok(encoder)
    }

    /// Synchronous hardware count, bypassing the request state
    fn raw_count(&mut self) -> u32 {
        while !self.sm.tx().try_push(1) {}
        loop {
            if let Some(word) = self.sm.rx().try_pull() {
                return word;
            }
        }
    }

    /// Stop counting and free the program's instruction memory
    pub fn release(mut self, common: &mut Common<'d, PIO>) {
        self.sm.set_enable(false);
        if let Some(program) = self.program.take() {
            // SAFETY: the only state machine running this program is halted.
            unsafe { common.free_instr(program.used_memory) };
        }
    }
}

impl<PIO: Instance, const SM: usize> QuadratureCounter for PioEncoder<'_, PIO, SM> {
    fn request_count(&mut self) {
        if self.request == CountRequest::AwaitingResult {
            return;
        }
        // The TX FIFO is empty whenever no request is outstanding.
        if self.sm.tx().try_push(1) {
            self.request = CountRequest::AwaitingResult;
        }
    }

    fn fetch_count(&mut self) -> i32 {
        if self.request == CountRequest::Idle {
            self.request_count();
        }
        let raw = loop {
            if let Some(word) = self.sm.rx().try_pull() {
                break word;
            }
        };
        self.request = CountRequest::Idle;
        raw.wrapping_sub(self.origin) as i32
    }

    fn request_state(&self) -> CountRequest {
        self.request
    }
}

impl<PIO: Instance, const SM: usize> Drop for PioEncoder<'_, PIO, SM> {
    fn drop(&mut self) {
        self.sm.set_enable(false);
    }
}
