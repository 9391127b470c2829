//! Self-chaining DMA stream
//!
//! Two channels keep a peripheral FIFO flowing into memory with no CPU
//! involvement:
//!
//! ```text
//!   PIO RX FIFO ──(DREQ)──► sample channel ──► buffer[0..N]
//!                               │ after N transfers, chain
//!                               ▼
//!                          control channel: reload word ──► sample.AL2_WRITE_ADDR_TRIG
//!                               │ (rewrites the destination and retriggers)
//!                               └──────────────────────────────────────────┘
//! ```
//!
//! The reload word lives in the destination [`SampleBuffer`] itself, so it
//! is valid for exactly as long as the buffer being written.
//!
//! Completion interrupts use `DMA_IRQ_1`; `DMA_IRQ_0` belongs to
//! embassy-rp's own transfer futures. Handlers are plain functions kept in
//! a table indexed by channel and must call [`DmaIrq::acknowledge`], or
//! the interrupt fires again as soon as the handler returns.
//!
//! [`SampleBuffer`]: treadmill_hal::SampleBuffer

use core::cell::RefCell;
use core::marker::PhantomData;
use core::sync::atomic::{compiler_fence, Ordering};

use critical_section::Mutex;
use embassy_rp::interrupt::InterruptExt;
use embassy_rp::pac::dma::regs::CtrlTrig;
use embassy_rp::pac::dma::vals::{DataSize, TreqSel};
use embassy_rp::{interrupt, pac, peripherals, Peri, PeripheralType};
use treadmill_hal::DmaTarget;

/// DMA channels on the RP2040
pub const CHANNEL_COUNT: usize = 12;

/// Interrupt handler for a stream's completion
pub type DmaIrqHandler = fn(&DmaIrq);

static IRQ1_HANDLERS: Mutex<RefCell<[Option<DmaIrqHandler>; CHANNEL_COUNT]>> =
    Mutex::new(RefCell::new([None; CHANNEL_COUNT]));

/// A DMA channel peripheral with a known channel number
pub trait DmaChannel: PeripheralType {
    const NUMBER: u8;
}

macro_rules! impl_dma_channel {
    ($($name:ident => $num:expr),* $(,)?) => {
        $(
            impl DmaChannel for peripherals::$name {
                const NUMBER: u8 = $num;
            }
        )*
    };
}

impl_dma_channel! {
    DMA_CH0 => 0, DMA_CH1 => 1, DMA_CH2 => 2, DMA_CH3 => 3,
    DMA_CH4 => 4, DMA_CH5 => 5, DMA_CH6 => 6, DMA_CH7 => 7,
    DMA_CH8 => 8, DMA_CH9 => 9, DMA_CH10 => 10, DMA_CH11 => 11,
}

/// Pending completion on one channel, handed to its handler
pub struct DmaIrq {
    channel: u8,
}

impl DmaIrq {
    /// Channel that raised the interrupt
    pub fn channel(&self) -> u8 {
        self.channel
    }

    /// Clear the channel's pending flag on `DMA_IRQ_1`
    pub fn acknowledge(&self) {
        pac::DMA.ints(1).write_value(1 << self.channel);
    }
}

/// Dispatch pending `DMA_IRQ_1` completions to their handlers
///
/// Call from the firmware's `DMA_IRQ_1` vector. Channels without a
/// handler are acknowledged here.
pub fn on_dma_irq1() {
    let pending = pac::DMA.ints(1).read();
    for channel in 0..CHANNEL_COUNT {
        if pending & (1 << channel) == 0 {
            continue;
        }
        let handler = critical_section::with(|cs| IRQ1_HANDLERS.borrow_ref(cs)[channel]);
        let irq = DmaIrq {
            channel: channel as u8,
        };
        match handler {
            Some(handler) => handler(&irq),
            None => irq.acknowledge(),
        }
    }
}

fn set_irq1_handler(channel: u8, handler: Option<DmaIrqHandler>) {
    critical_section::with(|cs| {
        IRQ1_HANDLERS.borrow_ref_mut(cs)[channel as usize] = handler;
    });
}

/// Where a stream reads from and how it is paced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StreamSource {
    /// Peripheral register the sample channel reads (not incremented)
    pub read_address: u32,
    /// DREQ line pacing the sample channel
    pub dreq: u8,
}

/// Running self-chaining channel pair
///
/// Dropping the stream disables both channels, aborts them and
/// unregisters any interrupt handler. The peripheral feeding the stream
/// must already be halted.
pub struct ChainedStream<'d> {
    sample: u8,
    control: u8,
    irq: bool,
    _channels: PhantomData<&'d mut ()>,
}

impl<'d> ChainedStream<'d> {
    /// Arm the pair and start the control channel
    ///
    /// The sample channel then waits on its DREQ, so nothing is written
    /// until the peripheral produces data.
    pub fn start<S: DmaChannel, C: DmaChannel>(
        _sample: Peri<'d, S>,
        _control: Peri<'d, C>,
        source: StreamSource,
        target: &DmaTarget,
        irq_handler: Option<DmaIrqHandler>,
    ) -> Self {
        let sample = pac::DMA.ch(S::NUMBER as usize);
        let control = pac::DMA.ch(C::NUMBER as usize);

        sample.read_addr().write_value(source.read_address);
        sample.write_addr().write_value(target.write_address);
        sample.trans_count().write_value(target.transfers);
        let mut sample_ctrl = CtrlTrig(0);
        sample_ctrl.set_treq_sel(TreqSel::from(source.dreq));
        sample_ctrl.set_data_size(DataSize::SIZE_HALFWORD);
        sample_ctrl.set_incr_read(false);
        sample_ctrl.set_incr_write(true);
        sample_ctrl.set_chain_to(C::NUMBER);
        sample_ctrl.set_irq_quiet(irq_handler.is_none());
        sample_ctrl.set_en(true);
        // Alias 1 CTRL does not trigger; the control channel does.
        sample.al1_ctrl().write_value(sample_ctrl.0);

        control.read_addr().write_value(target.reload_word_address);
        control
            .write_addr()
            .write_value(sample.al2_write_addr_trig().as_ptr() as u32);
        control.trans_count().write_value(1);
        let mut control_ctrl = CtrlTrig(0);
        control_ctrl.set_treq_sel(TreqSel::PERMANENT);
        control_ctrl.set_data_size(DataSize::SIZE_WORD);
        control_ctrl.set_incr_read(false);
        control_ctrl.set_incr_write(false);
        // Chaining to itself disables chaining.
        control_ctrl.set_chain_to(C::NUMBER);
        control_ctrl.set_irq_quiet(true);
        control_ctrl.set_en(true);

        if let Some(handler) = irq_handler {
            set_irq1_handler(S::NUMBER, Some(handler));
            pac::DMA.inte(1).modify(|w| *w |= 1 << S::NUMBER);
            // SAFETY: the handler table is populated before the line is unmasked.
            unsafe { interrupt::DMA_IRQ_1.enable() };
        }

        compiler_fence(Ordering::SeqCst);
        control.ctrl_trig().write_value(control_ctrl);

        #[cfg(feature = "defmt")]
        defmt::debug!(
            "dma: stream ch{}+ch{} -> {:#x} ({} words)",
            S::NUMBER,
            C::NUMBER,
            target.write_address,
            target.transfers
        );

        Self {
            sample: S::NUMBER,
            control: C::NUMBER,
            irq: irq_handler.is_some(),
            _channels: PhantomData,
        }
    }

    /// Sample channel number
    pub fn sample_channel(&self) -> u8 {
        self.sample
    }

    /// Control channel number
    pub fn control_channel(&self) -> u8 {
        self.control
    }

    /// Whether the sample channel is mid-block
    pub fn is_busy(&self) -> bool {
        pac::DMA.ch(self.sample as usize).ctrl_trig().read().busy()
    }
}

impl Drop for ChainedStream<'_> {
    fn drop(&mut self) {
        // Control first, so it cannot re-arm the sample channel.
        for channel in [self.control, self.sample] {
            let regs = pac::DMA.ch(channel as usize);
            let mut ctrl = CtrlTrig(regs.al1_ctrl().read());
            ctrl.set_en(false);
            regs.al1_ctrl().write_value(ctrl.0);
        }

        let mask = (1u16 << self.control) | (1u16 << self.sample);
        pac::DMA.chan_abort().write(|w| w.set_chan_abort(mask));
        while pac::DMA.chan_abort().read().chan_abort() & mask != 0 {}

        if self.irq {
            pac::DMA.inte(1).modify(|w| *w &= !(1 << self.sample));
            // Aborting can raise a spurious completion.
            pac::DMA.ints(1).write_value(1 << self.sample);
            set_irq1_handler(self.sample, None);
        }

        compiler_fence(Ordering::SeqCst);

        #[cfg(feature = "defmt")]
        defmt::debug!("dma: released ch{}+ch{}", self.sample, self.control);
    }
}
