//! Application control loop
//!
//! [`ControlLoop`] owns every driver it touches and is polled from a
//! single run-to-completion loop. Each [`ControlLoop::poll`]:
//!
//! 1. collects the encoder count requested on the previous iteration and
//!    requests the next one, keeping exactly one request in flight;
//! 2. runs the torque-limit check when its interval has elapsed;
//! 3. emits the sensor snapshot as an EVENT when the dispatch rate is due.
//!
//! Register accesses from the host arrive through [`ControlLoop::handle`].
//! Every known register access is answered: READ for reads, WRITE for
//! accepted writes and WRITE_ERROR otherwise, each echoing the value the
//! register holds after the access.

use treadmill_hal::{Clock, CountRequest, QuadratureCounter, SampleCell, SetpointOutput};
use treadmill_protocol::{CommandKind, MessageType, PayloadError, RegisterCommand, RegisterHost, Reply};

use crate::config::{BoardConfig, SafetyBand};
use crate::registers::{le_u16, le_u8, AppRegister, AppRegisters};
use crate::safety::{LimitCheck, MonitorState, TorqueLimiter};
use crate::scheduler::{Deadline, DispatchRate};
use crate::tare::{RawReadings, TareOffsets};

/// Register access failures
///
/// Except for [`RegisterError::UnknownAddress`], a WRITE_ERROR reply has
/// already been sent when one of these is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegisterError {
    /// No application register at this address; not answered
    UnknownAddress(u8),
    /// Sensor readouts cannot be written
    ReadOnly,
    /// Payload type or length does not match the register
    Payload(PayloadError),
    /// Value clamped to the nearest bound and applied
    OutOfRange,
    /// Value rejected without effect
    InvalidValue,
    /// Setpoint rejected while the torque limit is latched
    SafetyLatched,
}

impl From<PayloadError> for RegisterError {
    fn from(err: PayloadError) -> Self {
        RegisterError::Payload(err)
    }
}

/// Limits the loop enforces, taken from the board configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LoopSettings {
    pub safety_band: SafetyBand,
    pub max_event_hz: u16,
    pub torque_check_interval_us: u32,
    pub max_brake_setpoint: u16,
}

impl From<&BoardConfig> for LoopSettings {
    fn from(config: &BoardConfig) -> Self {
        Self {
            safety_band: config.safety_band,
            max_event_hz: config.max_event_hz,
            torque_check_interval_us: config.torque_check_interval_us,
            max_brake_setpoint: config.max_brake_setpoint,
        }
    }
}

/// What happened during one poll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PollOutcome {
    /// Filtered torque that tripped the limit
    pub tripped: Option<i16>,
    /// A sensor event was emitted
    pub dispatched: bool,
}

/// Treadmill control loop
pub struct ControlLoop<'a, E, O, C> {
    settings: LoopSettings,
    encoder: E,
    brake: O,
    clock: C,
    torque: &'a SampleCell,
    brake_current: &'a SampleCell,
    regs: AppRegisters,
    encoder_raw: i32,
    offsets: TareOffsets,
    limiter: TorqueLimiter,
    torque_check: Deadline,
    dispatch: DispatchRate,
}

impl<'a, E, O, C> ControlLoop<'a, E, O, C>
where
    E: QuadratureCounter,
    O: SetpointOutput,
    C: Clock,
{
    /// Assemble the loop; call [`ControlLoop::reset`] before polling
    pub fn new(
        settings: LoopSettings,
        encoder: E,
        brake: O,
        clock: C,
        torque: &'a SampleCell,
        brake_current: &'a SampleCell,
    ) -> Self {
        let now = clock.now_us();
        Self {
            settings,
            encoder,
            brake,
            clock,
            torque,
            brake_current,
            regs: AppRegisters::default(),
            encoder_raw: 0,
            offsets: TareOffsets::new(),
            limiter: TorqueLimiter::new(settings.safety_band),
            torque_check: Deadline::new(settings.torque_check_interval_us, now),
            dispatch: DispatchRate::new(),
        }
    }

    /// Put every register and driver back in its power-on state
    ///
    /// Dispatch off, brake at zero, limiting armed with no trip, tare
    /// offsets cleared and the current encoder position taken as zero.
    pub fn reset(&mut self) {
        let now = self.clock.now_us();

        self.regs = AppRegisters::default();
        self.dispatch.set_frequency(0, self.settings.max_event_hz, now);
        self.brake.write_value(0);
        self.limiter.reset();
        self.regs.torque_limiting = 1;
        self.torque_check.restart(now);

        self.offsets = TareOffsets::new();
        let count = self.encoder.get_count();
        self.encoder_raw = count;
        self.offsets.zero_encoder_at(count);
        self.encoder.request_count();
    }

    /// Run one loop iteration
    pub fn poll<H: RegisterHost>(&mut self, host: &mut H) -> PollOutcome {
        let mut outcome = PollOutcome::default();

        if self.encoder.request_state() == CountRequest::AwaitingResult {
            self.encoder_raw = self.encoder.fetch_count();
        }
        self.encoder.request_count();

        let now = self.clock.now_us();

        if self.torque_check.poll(now) {
            if let LimitCheck::Tripped(filtered) = self.limiter.check(self.torque.read()) {
                self.trip(host);
                outcome.tripped = Some(filtered);
            }
        }

        if self.dispatch.poll(now) && !host.is_muted() {
            self.refresh(AppRegister::Sensors);
            self.send(host, MessageType::Event, AppRegister::Sensors);
            outcome.dispatched = true;
        }

        outcome
    }

    /// Serve one register access from the host
    pub fn handle<H: RegisterHost>(
        &mut self,
        command: &RegisterCommand,
        host: &mut H,
    ) -> Result<(), RegisterError> {
        let register = AppRegister::from_address(command.address)
            .ok_or(RegisterError::UnknownAddress(command.address))?;

        match command.kind {
            CommandKind::Read => {
                self.refresh(register);
                self.send(host, MessageType::Read, register);
                Ok(())
            }
            CommandKind::Write => {
                let result = self.write(register, command);
                let kind = match result {
                    Ok(()) => MessageType::Write,
                    Err(_) => MessageType::WriteError,
                };
                self.send(host, kind, register);
                result
            }
        }
    }

    fn write(&mut self, register: AppRegister, command: &RegisterCommand) -> Result<(), RegisterError> {
        if register.is_read_only() {
            return Err(RegisterError::ReadOnly);
        }
        let bytes = command.expect_payload(register.payload_type(), register.byte_len())?;

        match register {
            AppRegister::DispatchFrequency => {
                let requested = le_u16(bytes)?;
                let now = self.clock.now_us();
                let change = self
                    .dispatch
                    .set_frequency(requested, self.settings.max_event_hz, now);
                self.regs.dispatch_frequency = change.applied_hz;
                if change.clamped {
                    return Err(RegisterError::OutOfRange);
                }
            }
            AppRegister::BrakeSetpoint => {
                if self.limiter.is_latched() {
                    return Err(RegisterError::SafetyLatched);
                }
                let requested = le_u16(bytes)?;
                let applied = requested.min(self.settings.max_brake_setpoint);
                self.brake.write_value(applied);
                self.regs.brake_setpoint = applied;
                if applied != requested {
                    return Err(RegisterError::OutOfRange);
                }
            }
            AppRegister::Tare => {
                let mask = le_u8(bytes)?;
                let raw = self.raw();
                self.offsets.tare(mask, &raw);
                self.regs.tare = self.offsets.active();
            }
            AppRegister::ResetTare => {
                let mask = le_u8(bytes)?;
                self.offsets.reset(mask);
                self.regs.tare = self.offsets.active();
                self.regs.reset_tare = 0;
            }
            AppRegister::TorqueLimiting => {
                let enabled = match le_u8(bytes)? {
                    0 => false,
                    1 => true,
                    _ => return Err(RegisterError::InvalidValue),
                };
                self.limiter.set_enabled(enabled);
                self.regs.torque_limiting = enabled as u8;
            }
            AppRegister::TorqueLimitingTriggered => {
                if le_u8(bytes)? != 0 {
                    return Err(RegisterError::InvalidValue);
                }
                self.limiter.clear();
                self.regs.torque_limiting_triggered = 0;
            }
            AppRegister::Encoder
            | AppRegister::Torque
            | AppRegister::BrakeCurrent
            | AppRegister::Sensors => return Err(RegisterError::ReadOnly),
        }

        Ok(())
    }

    fn trip<H: RegisterHost>(&mut self, host: &mut H) {
        self.regs.brake_setpoint = 0;
        self.brake.write_value(0);
        self.regs.torque_limiting_triggered = 1;
        if !host.is_muted() {
            self.send(host, MessageType::Event, AppRegister::TorqueLimitingTriggered);
        }
    }

    /// Recompute tared readouts before they are reported
    fn refresh(&mut self, register: AppRegister) {
        let raw = self.raw();
        match register {
            AppRegister::Encoder => self.regs.encoder = self.offsets.encoder(raw.encoder),
            AppRegister::Torque => self.regs.torque = self.offsets.torque(raw.torque),
            AppRegister::BrakeCurrent => {
                self.regs.brake_current = self.offsets.current(raw.current)
            }
            AppRegister::Sensors => {
                self.regs.encoder = self.offsets.encoder(raw.encoder);
                self.regs.torque = self.offsets.torque(raw.torque);
                self.regs.brake_current = self.offsets.current(raw.current);
                self.regs.sensors = [
                    self.regs.encoder,
                    self.regs.torque as i32,
                    self.regs.brake_current as i32,
                ];
            }
            _ => {}
        }
    }

    fn send<H: RegisterHost>(&self, host: &mut H, kind: MessageType, register: AppRegister) {
        let payload = self.regs.encode(register);
        match Reply::new(kind, register.address(), register.payload_type(), &payload) {
            Ok(reply) => host.send_reply(&reply),
            Err(_e) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("register {}: reply dropped ({})", register.address(), _e);
                debug_assert!(false, "register {} reply rejected", register.address());
            }
        }
    }

    /// Latest raw readings, each copied out once
    pub fn raw(&self) -> RawReadings {
        RawReadings {
            encoder: self.encoder_raw,
            torque: self.torque.read(),
            current: self.brake_current.read(),
        }
    }

    pub fn registers(&self) -> &AppRegisters {
        &self.regs
    }

    pub fn offsets(&self) -> &TareOffsets {
        &self.offsets
    }

    /// Filtered torque from the most recent limit check
    pub fn filtered_torque(&self) -> Option<i16> {
        self.limiter.filtered()
    }

    pub fn monitor_state(&self) -> MonitorState {
        self.limiter.state()
    }

    pub fn dispatch(&self) -> &DispatchRate {
        &self.dispatch
    }

    pub fn settings(&self) -> &LoopSettings {
        &self.settings
    }

    pub fn encoder(&self) -> &E {
        &self.encoder
    }

    pub fn output(&self) -> &O {
        &self.brake
    }
}
