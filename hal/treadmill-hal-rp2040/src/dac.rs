//! Serial DAC output
//!
//! Clocks 16-bit words into an LTC2641-style DAC: chip-select low, 16
//! bits MSB first on SCK rising edges, chip-select high to load. SCK and
//! CS share a two-pin side-set group, so CS must be the GPIO after SCK.
//!
//! Values are written one at a time with [`PioDac::write_value`]; there
//! is no memory-to-DAC stream.

use embassy_rp::gpio::Level;
use embassy_rp::pio::{
    Common, Config, Direction as PioDirection, Instance, LoadedProgram, Pin, PioPin, ShiftConfig,
    ShiftDirection, StateMachine,
};
use embassy_rp::Peri;
use treadmill_hal::SetpointOutput;

use crate::error::DriverError;
use crate::pio::{integer_divider, require_consecutive};
use crate::timing::{
    dac_fifo_word, left_justify, spi_clock_divider, DAC_CYCLES_PER_BIT, DAC_MAX_SCK_HZ, SYS_CLK_HZ,
};

/// Serial DAC on one PIO state machine
pub struct PioDac<'d, PIO: Instance, const SM: usize> {
    sm: StateMachine<'d, PIO, SM>,
    program: Option<LoadedProgram<'d, PIO>>,
    _sck: Pin<'d, PIO>,
    _cs: Pin<'d, PIO>,
    _data: Pin<'d, PIO>,
    last: u16,
}

impl<'d, PIO: Instance, const SM: usize> PioDac<'d, PIO, SM> {
    /// Load the serializer and configure pins; call [`start`] before writing
    ///
    /// [`start`]: PioDac::start
    pub fn new<SCK: PioPin, CS: PioPin, DATA: PioPin>(
        common: &mut Common<'d, PIO>,
        mut sm: StateMachine<'d, PIO, SM>,
        sck: Peri<'d, SCK>,
        cs: Peri<'d, CS>,
        data: Peri<'d, DATA>,
    ) -> Result<Self, DriverError> {
        let sck = common.make_pio_pin(sck);
        let cs = common.make_pio_pin(cs);
        let data = common.make_pio_pin(data);
        require_consecutive(&sck, &cs)?;

        // Side-set bit 0 is SCK, bit 1 is CS
        let prg = pio::pio_asm!(
            ".side_set 2",
            ".wrap_target",
            "pull block side 2",
            "set x, 15 side 2",
            "bitloop:",
            "out pins, 1 side 0",
            "jmp x-- bitloop side 1",
            ".wrap"
        );

        let installed = common
            .try_load_program(&prg.program)
            .map_err(|_| DriverError::ProgramSpace)?;

        let divider = spi_clock_divider(SYS_CLK_HZ, DAC_CYCLES_PER_BIT, DAC_MAX_SCK_HZ);

        let mut cfg = Config::default();
        cfg.use_program(&installed, &[&sck, &cs]);
        cfg.set_out_pins(&[&data]);
        cfg.shift_out = ShiftConfig {
            auto_fill: false,
            threshold: 32,
            direction: ShiftDirection::Left,
        };
        cfg.clock_divider = integer_divider(divider);

        sm.set_config(&cfg);
        sm.set_pins(Level::High, &[&cs]);
        sm.set_pins(Level::Low, &[&sck, &data]);
        sm.set_pin_dirs(PioDirection::Out, &[&sck, &cs, &data]);
        sm.clear_fifos();

        #[cfg(feature = "defmt")]
        defmt::info!("dac: SM{} divider {}", SM, divider);

        Ok(Self {
            sm,
            program: Some(installed),
            _sck: sck,
            _cs: cs,
            _data: data,
            last: 0,
        })
    }

    /// Start the serializer
    pub fn start(&mut self) {
        self.sm.set_enable(true);
    }

    /// Queue one 16-bit word
    ///
    /// Blocks while the TX FIFO is full, which only happens when writes
    /// outpace the serial clock.
    pub fn write_value(&mut self, value: u16) {
        self.sm.tx().push(dac_fifo_word(value));
        self.last = value;
    }

    /// Queue a code from a narrower DAC, left-justified to 16 bits
    pub fn write_code(&mut self, code: u16, bits: u8) {
        self.write_value(left_justify(code, bits));
    }

    /// Last value queued
    pub fn last_value(&self) -> u16 {
        self.last
    }

    /// Halt and free the program's instruction memory
    pub fn release(mut self, common: &mut Common<'d, PIO>) {
        self.sm.set_enable(false);
        if let Some(program) = self.program.take() {
            // SAFETY: the only state machine running this program is halted.
            unsafe { common.free_instr(program.used_memory) };
        }
    }
}

impl<PIO: Instance, const SM: usize> SetpointOutput for PioDac<'_, PIO, SM> {
    fn write_value(&mut self, value: u16) {
        PioDac::write_value(self, value);
    }
}

impl<PIO: Instance, const SM: usize> Drop for PioDac<'_, PIO, SM> {
    fn drop(&mut self) {
        self.sm.set_enable(false);
    }
}
