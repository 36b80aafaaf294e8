// Licensed under the Apache-2.0 license

//! LPI2C hardware abstraction traits.
//!
//! [`Lpi2cMaster`] is the seam between the transaction engine and the
//! register block: board support implements it against the real
//! peripheral, tests implement it with a scripted mock. [`I2cMaster`] is
//! the high-level operation set the engine exposes, so generic callers
//! can be written against the capability rather than the concrete
//! controller type.

use crate::common::MilliSeconds;
use crate::completion::TransferEvents;
use crate::i2c::common::{Error, SCAN_ADDRESS_COUNT};
use embedded_hal::i2c::SevenBitAddress;

/// Width of the in-device sub-address sent by memory transactions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum SubAddressWidth {
    One = 1,
    Two = 2,
}

impl SubAddressWidth {
    #[must_use]
    pub const fn bytes(self) -> usize {
        self as usize
    }
}

/// In-device register/memory offset sent after the device address.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubAddress {
    pub value: u16,
    pub width: SubAddressWidth,
}

/// Data phase of a transfer; the variant carries the direction.
pub enum TransferBuffer<'b> {
    Write(&'b [u8]),
    Read(&'b mut [u8]),
}

impl TransferBuffer<'_> {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            TransferBuffer::Write(bytes) => bytes.len(),
            TransferBuffer::Read(buffer) => buffer.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn is_read(&self) -> bool {
        matches!(self, TransferBuffer::Read(_))
    }
}

/// One master transaction, mirrored on the peripheral's transfer
/// descriptor.
///
/// The address phase is always framed in the write direction; when the
/// data phase reads, the peripheral issues a repeated START with the read
/// bit after any sub-address bytes. There is no STOP between the
/// sub-address and the data phase.
pub struct TransferRequest<'b> {
    pub device_address: SevenBitAddress,
    pub sub_address: Option<SubAddress>,
    pub buffer: TransferBuffer<'b>,
}

impl TransferRequest<'_> {
    /// Length of the data phase in bytes. Zero-length requests carry an
    /// address phase (and sub-address, if any) only.
    #[must_use]
    pub fn data_len(&self) -> usize {
        self.buffer.len()
    }
}

/// Register-level master interface of one LPI2C instance.
pub trait Lpi2cMaster {
    /// Program master mode at `baud_rate` Hz from a source clock of
    /// `source_clock_hz`, and attach `events` as the completion sink the
    /// interrupt path signals into.
    fn master_init(
        &mut self,
        baud_rate: u32,
        source_clock_hz: u32,
        events: &'static TransferEvents,
    );

    /// Disable the master and return the block to its reset state.
    fn master_deinit(&mut self);

    /// Submit `request` to the hardware without blocking.
    ///
    /// The outcome arrives later through the attached [`TransferEvents`]
    /// cell. The caller must leave the data buffer untouched until the
    /// cell signals. On a read, the implementation owns filling the
    /// buffer before it signals completion.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HardwareFault`] when the transfer cannot be
    /// enqueued; the implementation must leave the bus stopped in that
    /// case.
    fn start_transfer(&mut self, request: TransferRequest<'_>) -> Result<(), Error>;

    /// Whether the master state machine reports the bus idle.
    fn is_bus_idle(&self) -> bool;

    /// Interrupt service entry: advance the in-flight transfer and signal
    /// the attached completion cell when it finishes or is rejected.
    fn handle_interrupt(&mut self);
}

/// High-level master operations exposed by the transaction engine.
pub trait I2cMaster {
    /// Probe every candidate address and collect the responders, in
    /// ascending order.
    ///
    /// # Errors
    ///
    /// Propagates any non-NAK transfer error from a probe.
    fn scan(
        &mut self,
        timeout: MilliSeconds,
    ) -> Result<heapless::Vec<u8, SCAN_ADDRESS_COUNT>, Error>;

    /// Whether the device at `address` acknowledges a zero-length probe.
    ///
    /// # Errors
    ///
    /// Propagates any non-NAK transfer error.
    fn is_ready(&mut self, address: SevenBitAddress, timeout: MilliSeconds)
        -> Result<bool, Error>;

    /// Write `bytes` to the device at `address`.
    ///
    /// # Errors
    ///
    /// [`Error::Nak`] when the peer rejects; [`Error::Timeout`],
    /// [`Error::BusBusyTimeout`] or [`Error::HardwareFault`] on faults.
    fn write(
        &mut self,
        address: SevenBitAddress,
        bytes: &[u8],
        timeout: MilliSeconds,
    ) -> Result<(), Error>;

    /// Fill `buffer` from the device at `address`.
    ///
    /// # Errors
    ///
    /// Same taxonomy as [`I2cMaster::write`].
    fn read(
        &mut self,
        address: SevenBitAddress,
        buffer: &mut [u8],
        timeout: MilliSeconds,
    ) -> Result<(), Error>;

    /// Write `bytes` into device memory at `mem_address`, as one combined
    /// transaction with no STOP between sub-address and data.
    ///
    /// # Errors
    ///
    /// Same taxonomy as [`I2cMaster::write`].
    fn memory_write(
        &mut self,
        address: SevenBitAddress,
        mem_address: u16,
        width: SubAddressWidth,
        bytes: &[u8],
        timeout: MilliSeconds,
    ) -> Result<(), Error>;

    /// Fill `buffer` from device memory at `mem_address`; the read phase
    /// follows the sub-address through a repeated START.
    ///
    /// # Errors
    ///
    /// Same taxonomy as [`I2cMaster::write`].
    fn memory_read(
        &mut self,
        address: SevenBitAddress,
        mem_address: u16,
        width: SubAddressWidth,
        buffer: &mut [u8],
        timeout: MilliSeconds,
    ) -> Result<(), Error>;
}
