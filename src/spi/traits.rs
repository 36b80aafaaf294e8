// Licensed under the Apache-2.0 license

//! LPSPI hardware abstraction traits.

use crate::common::MilliSeconds;
use crate::spi::common::{Error, SpiConfig};

/// Register-level master interface of one LPSPI instance.
pub trait LpspiMaster {
    /// Program master mode from `config` against a source clock of
    /// `source_clock_hz`.
    fn master_init(&mut self, config: &SpiConfig, source_clock_hz: u32);

    /// Disable the master and return the block to its reset state.
    fn master_deinit(&mut self);

    /// Run one blocking shift. `tx = None` transmits the idle fill
    /// pattern; `rx = None` discards received frames. When both buffers
    /// are present they must be the same length and the shift is full
    /// duplex.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HardwareFault`] when the peripheral reports a
    /// transfer error.
    fn transfer(&mut self, tx: Option<&[u8]>, rx: Option<&mut [u8]>) -> Result<(), Error>;

    /// Whether the module-busy status flag is still set after a transfer.
    fn is_module_busy(&self) -> bool;
}

/// High-level master operations exposed by the transfer engine.
pub trait SpiMaster {
    /// Transmit `bytes`.
    ///
    /// # Errors
    ///
    /// [`Error::HardwareFault`], [`Error::Timeout`], [`Error::Busy`],
    /// [`Error::NotEnabled`].
    fn send(&mut self, bytes: &[u8], timeout: MilliSeconds) -> Result<(), Error>;

    /// Fill `buffer`, clocking out the idle fill pattern.
    ///
    /// # Errors
    ///
    /// Same taxonomy as [`SpiMaster::send`].
    fn receive(&mut self, buffer: &mut [u8], timeout: MilliSeconds) -> Result<(), Error>;

    /// Exchange data. Half duplex runs the send phase and the receive
    /// phase as two independent transfers; full duplex runs one transfer
    /// and requires `rx.len() == tx.len()`.
    ///
    /// # Errors
    ///
    /// [`Error::LengthMismatch`] on a full-duplex length mismatch, plus
    /// the [`SpiMaster::send`] taxonomy.
    fn send_receive(
        &mut self,
        tx: &[u8],
        rx: &mut [u8],
        half_duplex: bool,
        timeout: MilliSeconds,
    ) -> Result<(), Error>;
}
