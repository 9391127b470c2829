//! Streaming serial ADC
//!
//! Drives an ADS7029/7039/7049 from a PIO state machine. Each frame pulls
//! chip-select low, clocks `resolution + 2` bits in MSB first and pushes
//! the result; a [`ChainedStream`] moves every result into a
//! [`SampleBuffer`] so the latest conversion is always a single atomic
//! load away.
//!
//! # Program sharing
//!
//! The serializer program reads its bit count from the TX FIFO once at
//! start-up, so a single resident copy serves every resolution. Load it
//! with [`AdcProgram::load`] and hand a reference to each ADC on the same
//! PIO block. The borrow keeps the program resident until every ADC that
//! uses it has been dropped.
//!
//! # Teardown
//!
//! Dropping a [`StreamingAdc`] halts the state machine, then stops and
//! aborts its DMA channels, then releases the destination buffer. In that
//! order no transfer can land in memory the driver no longer owns.
//!
//! [`SampleBuffer`]: treadmill_hal::SampleBuffer

use embassy_rp::gpio::Level;
use embassy_rp::pio::{
    Common, Config, Direction as PioDirection, LoadedProgram, Pin, PioPin, ShiftConfig,
    ShiftDirection, StateMachine,
};
use embassy_rp::Peri;
use treadmill_hal::{AdcResolution, SampleWriter};

use crate::dma::{ChainedStream, DmaChannel, DmaIrqHandler, StreamSource};
use crate::error::DriverError;
use crate::pio::{integer_divider, PioBlock};
use crate::timing::{
    adc_bit_count, adc_sample_rate_hz, spi_clock_divider, ADC_CYCLES_PER_BIT, ADC_MAX_SCK_HZ,
    SYS_CLK_HZ,
};

/// Resident copy of the ADC serializer program
pub struct AdcProgram<'d, PIO: PioBlock> {
    program: LoadedProgram<'d, PIO>,
}

impl<'d, PIO: PioBlock> AdcProgram<'d, PIO> {
    /// Load the serializer into the block's instruction memory
    pub fn load(common: &mut Common<'d, PIO>) -> Result<Self, DriverError> {
        // SCK on side-set, CS on the set pin, MISO on the in pin
        let prg = pio::pio_asm!(
            ".side_set 1",
            "pull block side 0",
            "mov y, osr side 0",
            ".wrap_target",
            "set pins, 1 side 0 [3]",
            "mov x, y side 0",
            "set pins, 0 side 0",
            "bitloop:",
            "nop side 1 [1]",
            "in pins, 1 side 0",
            "jmp x-- bitloop side 0",
            "push noblock side 0",
            ".wrap"
        );

        let program = common
            .try_load_program(&prg.program)
            .map_err(|_| DriverError::ProgramSpace)?;

        #[cfg(feature = "defmt")]
        defmt::debug!("adc: program loaded at {}", program.origin);

        Ok(Self { program })
    }

    /// Instruction memory offset
    pub fn origin(&self) -> u8 {
        self.program.origin
    }

    /// Unload the program
    ///
    /// Only callable once every ADC borrowing it has been dropped, and so
    /// halted.
    pub fn free(self, common: &mut Common<'d, PIO>) {
        // SAFETY: no state machine borrowing this program is still alive.
        unsafe { common.free_instr(self.program.used_memory) };
    }
}

/// DMA stream and the buffer it writes, torn down in declaration order
struct ActiveStream<'d> {
    _dma: ChainedStream<'d>,
    _target: SampleWriter<'static>,
}

/// Serial ADC on one PIO state machine
pub struct StreamingAdc<'d, 'p, PIO: PioBlock, const SM: usize> {
    sm: StateMachine<'d, PIO, SM>,
    program: &'p AdcProgram<'d, PIO>,
    _cs: Pin<'d, PIO>,
    _sck: Pin<'d, PIO>,
    _data: Pin<'d, PIO>,
    resolution: AdcResolution,
    divider: u32,
    running: bool,
    stream: Option<ActiveStream<'d>>,
}

impl<'d, 'p, PIO: PioBlock, const SM: usize> StreamingAdc<'d, 'p, PIO, SM> {
    /// Configure the state machine and pins; nothing is sampled until [`start`]
    ///
    /// [`start`]: StreamingAdc::start
    pub fn new<CS: PioPin, SCK: PioPin, DATA: PioPin>(
        common: &mut Common<'d, PIO>,
        mut sm: StateMachine<'d, PIO, SM>,
        program: &'p AdcProgram<'d, PIO>,
        resolution: AdcResolution,
        cs: Peri<'d, CS>,
        sck: Peri<'d, SCK>,
        data: Peri<'d, DATA>,
    ) -> Self {
        let cs = common.make_pio_pin(cs);
        let sck = common.make_pio_pin(sck);
        let data = common.make_pio_pin(data);

        let divider = spi_clock_divider(SYS_CLK_HZ, ADC_CYCLES_PER_BIT, ADC_MAX_SCK_HZ);

        let mut cfg = Config::default();
        cfg.use_program(&program.program, &[&sck]);
        cfg.set_set_pins(&[&cs]);
        cfg.set_in_pins(&[&data]);
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
        cfg.clock_divider = integer_divider(divider);

        sm.set_config(&cfg);
        sm.set_pins(Level::High, &[&cs]);
        sm.set_pins(Level::Low, &[&sck]);
        sm.set_pin_dirs(PioDirection::Out, &[&cs, &sck]);
        sm.set_pin_dirs(PioDirection::In, &[&data]);
        sm.clear_fifos();
        // Consumed by the program's prelude once the SM is enabled
        sm.tx().push(adc_bit_count(resolution));

        #[cfg(feature = "defmt")]
        defmt::info!(
            "adc: SM{} {}-bit, {} samples/s",
            SM,
            resolution.bits(),
            adc_sample_rate_hz(SYS_CLK_HZ, divider, resolution)
        );

        Self {
            sm,
            program,
            _cs: cs,
            _sck: sck,
            _data: data,
            resolution,
            divider,
            running: false,
            stream: None,
        }
    }

    /// Program this ADC runs, for sharing with another instance
    pub fn program(&self) -> &'p AdcProgram<'d, PIO> {
        self.program
    }

    pub fn resolution(&self) -> AdcResolution {
        self.resolution
    }

    /// Conversions per second once started
    pub fn sample_rate_hz(&self) -> u32 {
        adc_sample_rate_hz(SYS_CLK_HZ, self.divider, self.resolution)
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_streaming(&self) -> bool {
        self.stream.is_some()
    }

    /// Stream every conversion into `target`
    ///
    /// A single-cell target always holds the latest sample; a longer
    /// buffer is filled cyclically.
    pub fn setup_dma_stream_to_memory<S: DmaChannel, C: DmaChannel>(
        &mut self,
        sample_channel: Peri<'d, S>,
        control_channel: Peri<'d, C>,
        target: SampleWriter<'static>,
    ) -> Result<(), DriverError> {
        self.arm(sample_channel, control_channel, target, None)
    }

    /// Like [`setup_dma_stream_to_memory`], and call `handler` on
    /// `DMA_IRQ_1` after every pass over the buffer
    ///
    /// The handler must call [`DmaIrq::acknowledge`].
    ///
    /// [`setup_dma_stream_to_memory`]: StreamingAdc::setup_dma_stream_to_memory
    /// [`DmaIrq::acknowledge`]: crate::dma::DmaIrq::acknowledge
    pub fn setup_dma_stream_to_memory_with_interrupt<S: DmaChannel, C: DmaChannel>(
        &mut self,
        sample_channel: Peri<'d, S>,
        control_channel: Peri<'d, C>,
        target: SampleWriter<'static>,
        handler: DmaIrqHandler,
    ) -> Result<(), DriverError> {
        self.arm(sample_channel, control_channel, target, Some(handler))
    }

    fn arm<S: DmaChannel, C: DmaChannel>(
        &mut self,
        sample_channel: Peri<'d, S>,
        control_channel: Peri<'d, C>,
        target: SampleWriter<'static>,
        handler: Option<DmaIrqHandler>,
    ) -> Result<(), DriverError> {
        if self.stream.is_some() {
            return Err(DriverError::StreamActive);
        }

        let source = StreamSource {
            read_address: PIO::rx_fifo_address(SM),
            dreq: PIO::rx_dreq(SM),
        };
        let dma = ChainedStream::start(
            sample_channel,
            control_channel,
            source,
            &target.dma_target(),
            handler,
        );
        self.stream = Some(ActiveStream {
            _dma: dma,
            _target: target,
        });
        Ok(())
    }

    /// Start converting
    pub fn start(&mut self) {
        self.sm.set_enable(true);
        self.running = true;
    }
}

impl<PIO: PioBlock, const SM: usize> Drop for StreamingAdc<'_, '_, PIO, SM> {
    fn drop(&mut self) {
        self.sm.set_enable(false);
        self.running = false;
        self.stream = None;

        #[cfg(feature = "defmt")]
        defmt::debug!("adc: SM{} released", SM);
    }
}
