// Licensed under the Apache-2.0 license

//! Common types and constants for the LPI2C driver.

use crate::common::MilliSeconds;
use crate::syscon::{ClockId, ClockSource, InterruptLine};

/// Highest master baud rate the peripheral supports, in Hz (Fast-mode
/// Plus).
pub const MAX_BAUD_RATE_HZ: u32 = 1_000_000;

/// First 7-bit address probed by a bus scan.
pub const SCAN_FIRST_ADDRESS: u8 = 0x02;
/// Last 7-bit address probed by a bus scan.
pub const SCAN_LAST_ADDRESS: u8 = 0x7E;
/// Capacity of a scan result: every address in the probed range.
pub const SCAN_ADDRESS_COUNT: usize =
    (SCAN_LAST_ADDRESS - SCAN_FIRST_ADDRESS + 1) as usize;

/// Iterations of the idle-bus poll run after a failed transaction before
/// the peripheral is reinitialized.
pub const BUS_IDLE_POLL_BUDGET: u32 = 50;

/// Pacing of the completion wait loop.
pub const COMPLETION_POLL_INTERVAL_US: u32 = 10;

/// Timeout applied when the caller does not supply one (embedded-hal
/// entry points).
pub const DEFAULT_TRANSFER_TIMEOUT: MilliSeconds = MilliSeconds::from_ticks(5000);

/// Well-known bus speeds, by SCL frequency in Hz.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum I2cSpeed {
    Standard = 100_000,
    Fast = 400_000,
    FastPlus = 1_000_000,
}

impl I2cSpeed {
    #[must_use]
    pub const fn hz(self) -> u32 {
        self as u32
    }
}

/// Invalid caller-supplied configuration, detected before any hardware
/// state is touched.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ConfigurationError {
    /// A baud rate of zero was requested.
    BaudRateZero,
    /// The requested baud rate exceeds [`MAX_BAUD_RATE_HZ`].
    BaudRateTooHigh(u32),
}

/// LPI2C driver error.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// Invalid configuration; always fatal to the call, never retried.
    Config(ConfigurationError),
    /// The addressed peer did not acknowledge.
    Nak,
    /// The bus failed to return to idle within the bounded poll after a
    /// fault; the instance was reinitialized before this surfaced.
    BusBusyTimeout,
    /// The peripheral reported an error status not otherwise classified.
    HardwareFault,
    /// The caller-supplied timeout elapsed while waiting for completion.
    Timeout,
    /// A transaction is already in flight on this instance, or the
    /// instance is already enabled.
    Busy,
    /// The instance has not been initialized.
    NotEnabled,
    /// The requested capability is not implemented by this engine.
    Unsupported,
}

impl Error {
    /// Whether the failed transaction may have left the bus mid-cycle,
    /// warranting the one-shot idle wait / reinitialize pass.
    #[must_use]
    pub(crate) fn requires_bus_reset(self) -> bool {
        matches!(self, Error::HardwareFault | Error::Timeout)
    }
}

impl embedded_hal::i2c::Error for Error {
    fn kind(&self) -> embedded_hal::i2c::ErrorKind {
        use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource};
        match self {
            Error::Nak => ErrorKind::NoAcknowledge(NoAcknowledgeSource::Unknown),
            Error::BusBusyTimeout => ErrorKind::Bus,
            _ => ErrorKind::Other,
        }
    }
}

/// Static configuration of one LPI2C instance.
pub struct I2cConfig {
    pub clock_id: ClockId,
    pub clock_source: ClockSource,
    pub clock_divider: u32,
    /// Port clock that must be live while the bus lines are bit-banged
    /// during recovery.
    pub recovery_clock: ClockId,
    pub interrupt_line: InterruptLine,
    pub interrupt_priority: u8,
}

/// Builder for [`I2cConfig`].
pub struct I2cConfigBuilder {
    clock_id: ClockId,
    clock_source: ClockSource,
    clock_divider: u32,
    recovery_clock: ClockId,
    interrupt_line: InterruptLine,
    interrupt_priority: u8,
}

impl Default for I2cConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl I2cConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            clock_id: ClockId::Lpi2c0,
            clock_source: ClockSource::FircAsync,
            clock_divider: 1,
            recovery_clock: ClockId::RecoveryGpio,
            interrupt_line: InterruptLine(0),
            interrupt_priority: 0,
        }
    }

    #[must_use]
    pub fn clock_id(mut self, clock_id: ClockId) -> Self {
        self.clock_id = clock_id;
        self
    }

    #[must_use]
    pub fn clock_source(mut self, source: ClockSource) -> Self {
        self.clock_source = source;
        self
    }

    #[must_use]
    pub fn clock_divider(mut self, divider: u32) -> Self {
        self.clock_divider = divider;
        self
    }

    #[must_use]
    pub fn recovery_clock(mut self, clock: ClockId) -> Self {
        self.recovery_clock = clock;
        self
    }

    #[must_use]
    pub fn interrupt_line(mut self, line: InterruptLine) -> Self {
        self.interrupt_line = line;
        self
    }

    #[must_use]
    pub fn interrupt_priority(mut self, priority: u8) -> Self {
        self.interrupt_priority = priority;
        self
    }

    #[must_use]
    pub fn build(self) -> I2cConfig {
        I2cConfig {
            clock_id: self.clock_id,
            clock_source: self.clock_source,
            clock_divider: self.clock_divider,
            recovery_clock: self.recovery_clock,
            interrupt_line: self.interrupt_line,
            interrupt_priority: self.interrupt_priority,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speed_discriminants_are_hz() {
        assert_eq!(I2cSpeed::Standard.hz(), 100_000);
        assert_eq!(I2cSpeed::Fast.hz(), 400_000);
        assert_eq!(I2cSpeed::FastPlus.hz(), 1_000_000);
        assert_eq!(I2cSpeed::FastPlus.hz(), MAX_BAUD_RATE_HZ);
    }

    #[test]
    fn scan_range_covers_every_candidate() {
        assert_eq!(SCAN_ADDRESS_COUNT, 125);
    }

    #[test]
    fn builder_defaults_and_overrides() {
        let config = I2cConfigBuilder::new()
            .clock_id(ClockId::Lpi2c2)
            .clock_source(ClockSource::SircAsync)
            .clock_divider(4)
            .interrupt_line(InterruptLine(17))
            .interrupt_priority(3)
            .build();
        assert_eq!(config.clock_id, ClockId::Lpi2c2);
        assert_eq!(config.clock_source, ClockSource::SircAsync);
        assert_eq!(config.clock_divider, 4);
        assert_eq!(config.recovery_clock, ClockId::RecoveryGpio);
        assert_eq!(config.interrupt_line, InterruptLine(17));
        assert_eq!(config.interrupt_priority, 3);
    }

    #[test]
    fn nak_maps_to_no_acknowledge() {
        use embedded_hal::i2c::Error as _;
        use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource};
        assert_eq!(
            Error::Nak.kind(),
            ErrorKind::NoAcknowledge(NoAcknowledgeSource::Unknown)
        );
        assert_eq!(Error::BusBusyTimeout.kind(), ErrorKind::Bus);
        assert_eq!(Error::HardwareFault.kind(), ErrorKind::Other);
    }
}
