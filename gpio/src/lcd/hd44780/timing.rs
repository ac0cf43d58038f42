//! Command issuing and execution timing.
//!
//! Every instruction reaching the controller goes through a [CommandEncoder]. After sending, it
//! waits until the controller is ready for the next one: by polling the busy flag when the
//! transport can read, or by sleeping for the command's worst-case execution time otherwise.

use crate::lcd::hd44780::driver::{HD44780Transport, TransportCapabilities};
use crate::lcd::hd44780::{Capability, Command, LcdError, LcdResult, SettleClass};
use log::trace;
use std::time::{Duration, Instant};

const BUSY_FLAG: u8 = 0b10000000;
const ADDRESS_COUNTER: u8 = 0b01111111;

/// Delays used when talking to the controller.
///
/// The settle times are the datasheet's execution times (37 µs and 1.52 ms at 270 kHz) scaled
/// to the slowest allowed oscillator frequency of 190 kHz.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct TimingConfig {
    /// Wait after most instructions and data transfers.
    pub short_settle: Duration,
    /// Wait after clear display and return home.
    pub long_settle: Duration,
    /// Wait before the reset sequence, for VCC to rise and the controller to start.
    pub power_on_delay: Duration,
    /// Longest time the busy flag may stay set before the controller is considered dead.
    pub busy_timeout: Duration,
}

impl Default for TimingConfig {
    fn default() -> Self {
        TimingConfig {
            short_settle: Duration::from_micros(53),
            long_settle: Duration::from_micros(2161),
            power_on_delay: Duration::from_millis(150),
            busy_timeout: Duration::from_millis(50),
        }
    }
}

impl TimingConfig {
    pub fn settle_time(&self, class: SettleClass) -> Duration {
        match class {
            SettleClass::Short => self.short_settle,
            SettleClass::Long => self.long_settle,
        }
    }
}

/// Sends [Command]s over a transport and enforces their execution time.
#[derive(Debug)]
pub struct CommandEncoder<T: HD44780Transport> {
    transport: T,
    timing: TimingConfig,
}

impl<T: HD44780Transport> CommandEncoder<T> {
    pub fn new(transport: T, timing: TimingConfig) -> Self {
        CommandEncoder { transport, timing }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn timing(&self) -> &TimingConfig {
        &self.timing
    }

    pub fn capabilities(&self) -> TransportCapabilities {
        self.transport.capabilities()
    }

    /// Runs the transport's reset sequence, after which the controller accepts a function set.
    pub fn synchronize(&mut self) -> LcdResult<()> {
        self.transport.synchronize(self.timing.power_on_delay)
    }

    /// Switches the backlight. Not an instruction, so there is nothing to wait for.
    pub fn set_backlight(&mut self, on: bool) -> LcdResult<()> {
        self.transport.set_backlight(on)
    }

    /// Sends a command that does not read, then waits for it to finish.
    ///
    /// Returns [LcdError::InvalidOperand] for [Command::ReadData] and [Command::ReadBusyAddress].
    pub fn write(&mut self, command: Command) -> LcdResult<()> {
        if command.is_read() {
            return Err(LcdError::InvalidOperand(command));
        }
        let byte = command.encode()?;
        trace!("Issuing {}", command);
        self.transport.write(command.register_select(), byte)?;
        self.settle(command)
    }

    /// Sends a read command and returns the byte read.
    ///
    /// [Command::ReadBusyAddress] returns immediately; [Command::ReadData] moves the address
    /// counter, so it is waited for like a write.
    pub fn read(&mut self, command: Command) -> LcdResult<u8> {
        if !command.is_read() {
            return Err(LcdError::InvalidOperand(command));
        }
        self.capabilities().require("read", Capability::Read)?;
        trace!("Issuing {}", command);
        let value = self.transport.read(command.register_select())?;
        if command == Command::ReadData {
            self.settle(command)?;
        }
        Ok(value)
    }

    fn settle(&mut self, command: Command) -> LcdResult<()> {
        if self.capabilities().supports_read {
            self.wait_until_ready(command)
        } else {
            let delay = self.timing.settle_time(command.settle());
            self.transport.delay(delay);
            Ok(())
        }
    }

    fn wait_until_ready(&mut self, command: Command) -> LcdResult<()> {
        let start = Instant::now();
        loop {
            let status = self.transport.read(false)?;
            let busy = status & BUSY_FLAG != 0;
            trace!("Busy: {}, AC: {:#04X}", busy, status & ADDRESS_COUNTER);
            if !busy {
                return Ok(());
            }
            let waited = start.elapsed();
            if waited > self.timing.busy_timeout {
                return Err(LcdError::HardwareTimeout { command, waited });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lcd::hd44780::mock::{Event, MockTransport};

    #[test]
    fn write_only_transport_sleeps_per_settle_class() {
        let mut encoder = CommandEncoder::new(MockTransport::write_only(), TimingConfig::default());
        encoder.write(Command::ClearDisplay).unwrap();
        encoder.write(Command::WriteData(b'A')).unwrap();

        assert_eq!(
            encoder.transport().events,
            vec![
                Event::Command(Command::ClearDisplay),
                Event::Delay(Duration::from_micros(2161)),
                Event::Data(b'A'),
                Event::Delay(Duration::from_micros(53)),
            ]
        );
    }

    #[test]
    fn readable_transport_polls_the_busy_flag() {
        let mut transport = MockTransport::new();
        transport.busy_reads = 3;
        let mut encoder = CommandEncoder::new(transport, TimingConfig::default());
        encoder.write(Command::ReturnHome).unwrap();

        let transport = encoder.transport();
        assert_eq!(transport.busy_polls, 4);
        assert!(!transport.events.iter().any(|e| matches!(e, Event::Delay(_))));
    }

    #[test]
    fn stuck_busy_flag_times_out() {
        let mut transport = MockTransport::new();
        transport.stuck_busy = true;
        let timing = TimingConfig {
            busy_timeout: Duration::from_millis(2),
            ..TimingConfig::default()
        };
        let mut encoder = CommandEncoder::new(transport, timing);

        match encoder.write(Command::ClearDisplay) {
            Err(LcdError::HardwareTimeout { command, waited }) => {
                assert_eq!(command, Command::ClearDisplay);
                assert!(waited > Duration::from_millis(2));
            }
            other => panic!("expected a timeout, got {:?}", other),
        }
    }

    #[test]
    fn reads_need_the_read_capability() {
        let mut encoder = CommandEncoder::new(MockTransport::write_only(), TimingConfig::default());
        assert_eq!(
            encoder.read(Command::ReadData),
            Err(LcdError::CapabilityUnavailable {
                operation: "read",
                capability: Capability::Read
            })
        );
        assert!(encoder.transport().events.is_empty());
    }

    #[test]
    fn commands_go_through_the_matching_entry_point() {
        let mut encoder = CommandEncoder::new(MockTransport::new(), TimingConfig::default());
        assert_eq!(
            encoder.write(Command::ReadData),
            Err(LcdError::InvalidOperand(Command::ReadData))
        );
        assert_eq!(
            encoder.read(Command::ClearDisplay),
            Err(LcdError::InvalidOperand(Command::ClearDisplay))
        );
        assert_eq!(encoder.write(Command::SetDdramAddress(0x05)), Ok(()));
        assert_eq!(encoder.read(Command::ReadBusyAddress), Ok(0x05));
    }
}
