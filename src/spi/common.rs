// Licensed under the Apache-2.0 license

//! Common types and constants for the LPSPI driver.

use crate::common::MilliSeconds;
use crate::syscon::{ClockId, ClockSource, InterruptLine};
use embedded_hal::spi::{Mode, MODE_0};

/// Pacing of the module-busy quiescence poll.
pub const MODULE_BUSY_POLL_INTERVAL_US: u32 = 10;

/// Timeout applied when the caller does not supply one (embedded-hal
/// entry points).
pub const DEFAULT_TRANSFER_TIMEOUT: MilliSeconds = MilliSeconds::from_ticks(5000);

/// Shift direction of each frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BitOrder {
    MsbFirst,
    LsbFirst,
}

/// Invalid caller-supplied configuration, detected before any hardware
/// state is touched.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ConfigurationError {
    /// A baud rate of zero was requested.
    BaudRateZero,
}

/// LPSPI driver error.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// Invalid configuration; always fatal to the call, never retried.
    Config(ConfigurationError),
    /// Full-duplex receive buffer length differs from the send buffer.
    LengthMismatch,
    /// The peripheral reported a transfer error. Surfaced immediately;
    /// SPI has no recovery step.
    HardwareFault,
    /// The caller-supplied timeout elapsed while the module stayed busy.
    Timeout,
    /// A transfer is already in flight on this instance, or the instance
    /// is already enabled.
    Busy,
    /// The instance has not been initialized.
    NotEnabled,
}

impl embedded_hal::spi::Error for Error {
    fn kind(&self) -> embedded_hal::spi::ErrorKind {
        embedded_hal::spi::ErrorKind::Other
    }
}

/// Static configuration of one LPSPI instance.
pub struct SpiConfig {
    pub baud_rate: u32,
    /// Clock polarity and phase.
    pub mode: Mode,
    pub bit_order: BitOrder,
    pub bits_per_frame: u8,
    pub clock_id: ClockId,
    pub clock_source: ClockSource,
    pub clock_divider: u32,
    pub interrupt_line: InterruptLine,
}

impl SpiConfig {
    /// Delay between chip-select assertion and the first clock edge, one
    /// baud period in nanoseconds.
    #[must_use]
    pub fn pcs_to_sck_delay_ns(&self) -> u32 {
        1_000_000_000 / self.baud_rate.max(1)
    }

    /// Delay between the last clock edge and chip-select release.
    #[must_use]
    pub fn last_sck_to_pcs_delay_ns(&self) -> u32 {
        1_000_000_000 / self.baud_rate.max(1)
    }

    /// Idle gap enforced between back-to-back transfers.
    #[must_use]
    pub fn between_transfer_delay_ns(&self) -> u32 {
        1_000_000_000 / self.baud_rate.max(1)
    }
}

/// Builder for [`SpiConfig`].
pub struct SpiConfigBuilder {
    baud_rate: u32,
    mode: Mode,
    bit_order: BitOrder,
    clock_id: ClockId,
    clock_source: ClockSource,
    clock_divider: u32,
    interrupt_line: InterruptLine,
}

impl Default for SpiConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SpiConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            baud_rate: 1_000_000,
            mode: MODE_0,
            bit_order: BitOrder::MsbFirst,
            clock_id: ClockId::Lpspi0,
            clock_source: ClockSource::FircAsync,
            clock_divider: 8,
            interrupt_line: InterruptLine(0),
        }
    }

    #[must_use]
    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    #[must_use]
    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn bit_order(mut self, bit_order: BitOrder) -> Self {
        self.bit_order = bit_order;
        self
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
    pub fn interrupt_line(mut self, line: InterruptLine) -> Self {
        self.interrupt_line = line;
        self
    }

    #[must_use]
    pub fn build(self) -> SpiConfig {
        SpiConfig {
            baud_rate: self.baud_rate,
            mode: self.mode,
            bit_order: self.bit_order,
            bits_per_frame: 8,
            clock_id: self.clock_id,
            clock_source: self.clock_source,
            clock_divider: self.clock_divider,
            interrupt_line: self.interrupt_line,
        }
    }
}
