//! Control loop task
//!
//! Owns the control loop and the hardware it was built from. Each pass
//! serves queued register commands, then polls the loop once, then yields
//! so lower-priority tasks get a turn. The loop itself never blocks.

use defmt::*;
use embassy_futures::yield_now;
use embassy_rp::peripherals::{PIO0, PIO1};
use embassy_rp::pio::Common;

use treadmill_core::{AppRegister, ControlLoop, RegisterError};
use treadmill_hal_rp2040::adc_stream::StreamingAdc;
use treadmill_hal_rp2040::clock::EmbassyClock;
use treadmill_hal_rp2040::dac::PioDac;
use treadmill_hal_rp2040::encoder::PioEncoder;
use treadmill_protocol::{CommandKind, RegisterCommand};

use crate::channels::{ChannelHost, COMMANDS};

/// The control loop as wired on this board
pub type TreadmillLoop =
    ControlLoop<'static, PioEncoder<'static, PIO1, 0>, PioDac<'static, PIO0, 2>, EmbassyClock>;

/// Drivers that run on their own once started
///
/// Held for the life of the task: dropping an ADC halts its stream.
pub struct Hardware {
    pub torque_adc: StreamingAdc<'static, 'static, PIO0, 0>,
    pub current_adc: StreamingAdc<'static, 'static, PIO0, 1>,
    pub pio0: Common<'static, PIO0>,
    pub pio1: Common<'static, PIO1>,
}

/// Control loop task
#[embassy_executor::task]
pub async fn control_task(mut app: TreadmillLoop, hardware: Hardware) {
    info!(
        "Control task started ({} Hz ADC streams)",
        hardware.torque_adc.sample_rate_hz()
    );

    let mut host = ChannelHost::new();
    let mut dropped = 0;

    app.reset();
    info!("Registers reset, monitor {}", app.monitor_state());

    loop {
        while let Ok(command) = COMMANDS.try_receive() {
            let result = app.handle(&command, &mut host);
            log_access(&app, &command, result);
        }

        let outcome = app.poll(&mut host);
        if let Some(filtered) = outcome.tripped {
            warn!("Torque limit tripped at {}, brake forced to 0", filtered);
        }

        if host.dropped() != dropped {
            dropped = host.dropped();
            warn!("Reply channel full, {} replies dropped", dropped);
        }

        yield_now().await;
    }
}

fn log_access(app: &TreadmillLoop, command: &RegisterCommand, result: Result<(), RegisterError>) {
    let register = match (AppRegister::from_address(command.address), result) {
        (_, Err(RegisterError::UnknownAddress(address))) => {
            debug!("Ignoring access to register {}", address);
            return;
        }
        (Some(register), _) => register,
        (None, _) => return,
    };

    if command.kind == CommandKind::Read {
        if let Err(e) = result {
            warn!("Read of {} failed: {}", register, e);
        }
        return;
    }

    let regs = app.registers();
    match (register, result) {
        (AppRegister::BrakeSetpoint, Err(RegisterError::SafetyLatched)) => {
            warn!("Setpoint rejected: torque limit latched");
        }
        (AppRegister::BrakeSetpoint, Err(RegisterError::OutOfRange)) => {
            warn!("Setpoint clamped to {}", regs.brake_setpoint);
        }
        (AppRegister::DispatchFrequency, Ok(()) | Err(RegisterError::OutOfRange)) => {
            info!("Dispatch rate {} Hz", app.dispatch().frequency_hz());
        }
        (AppRegister::Tare, Ok(())) => {
            debug!("Tare active on {=u8:#05b}", regs.tare);
        }
        (AppRegister::ResetTare, Ok(())) => {
            debug!("Tare reset, active on {=u8:#05b}", regs.tare);
        }
        (AppRegister::TorqueLimitingTriggered, Ok(())) => {
            info!("Torque limit cleared, monitor {}", app.monitor_state());
        }
        (AppRegister::TorqueLimiting, Ok(())) => {
            info!("Torque limiting {}, monitor {}", regs.torque_limiting, app.monitor_state());
        }
        (_, Err(e)) => warn!("Write to {} rejected: {}", register, e),
        _ => {}
    }
}
