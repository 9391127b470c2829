//! Treadmill - Harp treadmill controller firmware
//!
//! Main firmware binary for RP2040-based treadmill boards. Boot is an
//! explicit bring-up phase that builds every driver from the embedded
//! board configuration and hands them to the control loop task:
//!
//! - PIO0: torque ADC (SM0), brake current ADC (SM1), brake DAC (SM2)
//! - PIO1: quadrature encoder (SM0)
//! - DMA CH0/CH1: torque stream, CH2/CH3: brake current stream
//!
//! Any bring-up failure is fatal: it is logged and the core parks before
//! the control loop starts. The brake DAC powers up at zero, so a halted
//! board leaves the brake released.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::peripherals::{PIO0, PIO1};
use embassy_rp::pio::{self, Pio};
use embassy_rp::{bind_interrupts, interrupt, Peripherals};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use treadmill_core::config::{AdcPins, DacPins, PinMap};
use treadmill_core::{BoardConfig, ConfigError, ControlLoop, LoopSettings};
use treadmill_hal::{CellError, SampleCell};
use treadmill_hal_rp2040::adc_stream::{AdcProgram, StreamingAdc};
use treadmill_hal_rp2040::clock::EmbassyClock;
use treadmill_hal_rp2040::dac::PioDac;
use treadmill_hal_rp2040::encoder::PioEncoder;
use treadmill_hal_rp2040::{dma, DriverError};

use crate::tasks::{Hardware, TreadmillLoop};

mod channels;
mod config;
mod tasks;

bind_interrupts!(struct Irqs {
    PIO0_IRQ_0 => pio::InterruptHandler<PIO0>;
    PIO1_IRQ_0 => pio::InterruptHandler<PIO1>;
});

/// Latest torque conversion, written by DMA
static TORQUE: SampleCell = SampleCell::new();

/// Latest brake current conversion, written by DMA
static BRAKE_CURRENT: SampleCell = SampleCell::new();

// Shared by both ADCs, so it must outlive them
static ADC_PROGRAM: StaticCell<AdcProgram<'static, PIO0>> = StaticCell::new();

/// GPIOs the peripherals below are bound to
const WIRED_PINS: PinMap = PinMap {
    encoder_a: 16,
    torque_adc: AdcPins {
        cs: 9,
        sck: 11,
        data: 10,
    },
    current_adc: AdcPins {
        cs: 18,
        sck: 20,
        data: 19,
    },
    dac: DacPins { sck: 22, data: 21 },
};

/// Reasons the board cannot start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Format)]
enum BootError {
    Config(ConfigError),
    Driver(DriverError),
    /// board.toml names pins this build is not wired for
    PinsNotWired,
}

impl From<ConfigError> for BootError {
    fn from(err: ConfigError) -> Self {
        BootError::Config(err)
    }
}

impl From<DriverError> for BootError {
    fn from(err: DriverError) -> Self {
        BootError::Driver(err)
    }
}

impl From<CellError> for BootError {
    fn from(err: CellError) -> Self {
        BootError::Driver(DriverError::Cell(err))
    }
}

#[interrupt]
fn DMA_IRQ_1() {
    dma::on_dma_irq1();
}

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Treadmill firmware starting...");

    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    let (app, hardware) = match bring_up(p) {
        Ok(parts) => parts,
        Err(e) => {
            error!("Bring-up failed: {}", e);
            error!("Halting before the control loop starts");
            loop {
                cortex_m::asm::wfi();
            }
        }
    };

    spawner.spawn(unwrap!(tasks::telemetry_task()));
    spawner.spawn(unwrap!(tasks::control_task(app, hardware)));

    info!("All tasks spawned");
}

/// Build every driver from the embedded board configuration
fn bring_up(p: Peripherals) -> Result<(TreadmillLoop, Hardware), BootError> {
    let board: BoardConfig = config::load()?;
    if board.pins != WIRED_PINS {
        return Err(BootError::PinsNotWired);
    }
    let resolution = board.adc_resolution()?;

    info!(
        "Board: {} (0x{:04X}) hw {}.{}.{} fw {}.{}.{}",
        board.identity.name.as_str(),
        board.identity.who_am_i,
        board.identity.hardware.major,
        board.identity.hardware.minor,
        board.identity.hardware.patch,
        board.identity.firmware.major,
        board.identity.firmware.minor,
        board.identity.firmware.patch,
    );
    info!(
        "Safety band [{}, {}], check every {} us, max {} Hz events",
        board.safety_band.min,
        board.safety_band.max,
        board.torque_check_interval_us,
        board.max_event_hz
    );

    // PIO0: serial ADCs and the brake DAC
    let Pio {
        common: mut pio0,
        sm0,
        sm1,
        sm2,
        ..
    } = Pio::new(p.PIO0, Irqs);

    let program: &'static AdcProgram<'static, PIO0> =
        ADC_PROGRAM.init(AdcProgram::load(&mut pio0)?);

    let mut torque_adc = StreamingAdc::new(
        &mut pio0, sm0, program, resolution, p.PIN_9, p.PIN_11, p.PIN_10,
    );
    torque_adc.setup_dma_stream_to_memory(p.DMA_CH0, p.DMA_CH1, TORQUE.claim()?)?;

    let mut current_adc = StreamingAdc::new(
        &mut pio0,
        sm1,
        torque_adc.program(),
        resolution,
        p.PIN_18,
        p.PIN_20,
        p.PIN_19,
    );
    current_adc.setup_dma_stream_to_memory(p.DMA_CH2, p.DMA_CH3, BRAKE_CURRENT.claim()?)?;

    torque_adc.start();
    current_adc.start();
    info!("ADC streams running ({}-bit)", resolution.bits());

    let mut dac = PioDac::new(&mut pio0, sm2, p.PIN_22, p.PIN_23, p.PIN_21)?;
    dac.start();
    info!("Brake DAC initialized");

    // PIO1: the encoder's jump table needs address 0
    let Pio {
        common: mut pio1,
        sm0: enc_sm,
        ..
    } = Pio::new(p.PIO1, Irqs);
    let encoder = PioEncoder::new(&mut pio1, enc_sm, p.PIN_16, p.PIN_17)?;
    info!("Encoder initialized");

    let app = ControlLoop::new(
        LoopSettings::from(&board),
        encoder,
        dac,
        EmbassyClock,
        &TORQUE,
        &BRAKE_CURRENT,
    );

    Ok((
        app,
        Hardware {
            torque_adc,
            current_adc,
            pio0,
            pio1,
        },
    ))
}
