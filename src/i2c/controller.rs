// Licensed under the Apache-2.0 license

//! LPI2C master transaction engine.
//!
//! Sequences master transactions against the asynchronous completion
//! model: a transfer is submitted non-blocking, the interrupt path
//! signals its outcome into the instance's completion cell, and the
//! calling context spins on that cell under the caller's timeout. Faults
//! trigger a single idle-wait / reinitialize pass before they surface;
//! a NAK is an ordinary peer answer and never does.

use crate::common::{BusLifecycle, Logger, MilliSeconds, NoOpLogger};
use crate::completion::{TransferEvents, TransferOutcome};
use crate::descriptor::BusDescriptor;
use crate::i2c::common::{
    ConfigurationError, Error, I2cConfig, BUS_IDLE_POLL_BUDGET, COMPLETION_POLL_INTERVAL_US,
    DEFAULT_TRANSFER_TIMEOUT, MAX_BAUD_RATE_HZ, SCAN_ADDRESS_COUNT, SCAN_FIRST_ADDRESS,
    SCAN_LAST_ADDRESS,
};
use crate::i2c::recovery;
use crate::i2c::traits::{
    I2cMaster, Lpi2cMaster, SubAddress, SubAddressWidth, TransferBuffer, TransferRequest,
};
use crate::pinctrl::I2cBusPins;
use crate::syscon::{ClockControl, InterruptControl};
use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{Operation, SevenBitAddress};

fn validate_baud_rate(baud_rate: u32) -> Result<(), Error> {
    if baud_rate == 0 {
        return Err(Error::Config(ConfigurationError::BaudRateZero));
    }
    if baud_rate > MAX_BAUD_RATE_HZ {
        return Err(Error::Config(ConfigurationError::BaudRateTooHigh(baud_rate)));
    }
    Ok(())
}

/// Master engine for one LPI2C instance.
///
/// Generic over its collaborators: the register-level hardware `H`, the
/// SCL/SDA pin pair `P`, the clock and interrupt services `C`/`I`, the
/// delay provider `D` pacing the bounded waits, and the trace logger `L`.
pub struct I2cController<
    H: Lpi2cMaster,
    P: I2cBusPins,
    C: ClockControl,
    I: InterruptControl,
    D: DelayNs,
    L: Logger = NoOpLogger,
> {
    pub hardware: H,
    pub pins: P,
    pub clock: C,
    pub intc: I,
    pub delay: D,
    pub logger: L,
    pub config: I2cConfig,
    pub descriptor: BusDescriptor,
    pub events: &'static TransferEvents,
}

impl<H, P, C, I, D, L> I2cController<H, P, C, I, D, L>
where
    H: Lpi2cMaster,
    P: I2cBusPins,
    C: ClockControl,
    I: InterruptControl,
    D: DelayNs,
    L: Logger,
{
    /// Bring the instance up in master mode at `baud_rate` Hz.
    ///
    /// Runs bus recovery on the raw lines before handing them to the
    /// peripheral, selects the functional clock, routes and enables the
    /// interrupt, then programs the master. The baud rate is validated
    /// before any hardware state is touched.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] for a zero or out-of-range baud rate;
    /// [`Error::Busy`] if the instance is already enabled (deinitialize
    /// first, or use [`I2cController::reinitialize_at`]).
    pub fn initialize(&mut self, baud_rate: u32) -> Result<(), Error> {
        validate_baud_rate(baud_rate)?;
        if self.descriptor.flags().is_enabled() {
            return Err(Error::Busy);
        }

        // the lines are bit-banged before they carry the peripheral
        // function, stuck or not
        self.clock.enable(self.config.recovery_clock);
        recovery::release_bus(&mut self.pins, &mut self.logger);
        self.pins.configure_as_peripheral();

        self.clock
            .set_source(self.config.clock_id, self.config.clock_source);
        self.clock
            .set_divider(self.config.clock_id, self.config.clock_divider);
        self.clock.enable(self.config.clock_id);
        self.intc
            .route(self.config.interrupt_line, self.config.interrupt_priority);
        self.intc.enable(self.config.interrupt_line);

        let source_clock_hz = self.clock.frequency(self.config.clock_id);
        self.events.reset();
        self.hardware
            .master_init(baud_rate, source_clock_hz, self.events);

        self.descriptor.set_baud_rate(baud_rate);
        self.descriptor.flags().set_enabled(true);
        self.logger.log("i2c: master enabled");
        Ok(())
    }

    /// Disable the peripheral, gate its clock, and mask its interrupt.
    /// A no-op on an instance that was never initialized.
    pub fn deinitialize(&mut self) {
        if !self.descriptor.flags().is_enabled() {
            return;
        }
        self.hardware.master_deinit();
        self.clock.disable(self.config.clock_id);
        self.intc.disable(self.config.interrupt_line);
        self.descriptor.flags().set_enabled(false);
        self.logger.log("i2c: master disabled");
    }

    /// Tear the instance down and bring it back up at `new_baud_rate`.
    ///
    /// # Errors
    ///
    /// Propagates [`I2cController::initialize`] errors.
    pub fn reinitialize_at(&mut self, new_baud_rate: u32) -> Result<(), Error> {
        self.deinitialize();
        self.initialize(new_baud_rate)
    }

    /// Write `bytes` to the device at `address`. A zero-length write
    /// performs the address phase only.
    ///
    /// # Errors
    ///
    /// [`Error::Nak`], [`Error::Timeout`], [`Error::BusBusyTimeout`],
    /// [`Error::HardwareFault`], [`Error::Busy`], [`Error::NotEnabled`].
    pub fn write(
        &mut self,
        address: SevenBitAddress,
        bytes: &[u8],
        timeout: MilliSeconds,
    ) -> Result<(), Error> {
        self.execute(
            TransferRequest {
                device_address: address,
                sub_address: None,
                buffer: TransferBuffer::Write(bytes),
            },
            timeout,
        )
    }

    /// Fill `buffer` from the device at `address`.
    ///
    /// # Errors
    ///
    /// Same taxonomy as [`I2cController::write`].
    pub fn read(
        &mut self,
        address: SevenBitAddress,
        buffer: &mut [u8],
        timeout: MilliSeconds,
    ) -> Result<(), Error> {
        self.execute(
            TransferRequest {
                device_address: address,
                sub_address: None,
                buffer: TransferBuffer::Read(buffer),
            },
            timeout,
        )
    }

    /// Write `bytes` into device memory at `mem_address` as one combined
    /// transaction: device address, `width` sub-address bytes, data, with
    /// no STOP in between.
    ///
    /// # Errors
    ///
    /// Same taxonomy as [`I2cController::write`].
    pub fn memory_write(
        &mut self,
        address: SevenBitAddress,
        mem_address: u16,
        width: SubAddressWidth,
        bytes: &[u8],
        timeout: MilliSeconds,
    ) -> Result<(), Error> {
        self.execute(
            TransferRequest {
                device_address: address,
                sub_address: Some(SubAddress {
                    value: mem_address,
                    width,
                }),
                buffer: TransferBuffer::Write(bytes),
            },
            timeout,
        )
    }

    /// Fill `buffer` from device memory at `mem_address`; the read phase
    /// follows the sub-address through a repeated START.
    ///
    /// # Errors
    ///
    /// Same taxonomy as [`I2cController::write`].
    pub fn memory_read(
        &mut self,
        address: SevenBitAddress,
        mem_address: u16,
        width: SubAddressWidth,
        buffer: &mut [u8],
        timeout: MilliSeconds,
    ) -> Result<(), Error> {
        self.execute(
            TransferRequest {
                device_address: address,
                sub_address: Some(SubAddress {
                    value: mem_address,
                    width,
                }),
                buffer: TransferBuffer::Read(buffer),
            },
            timeout,
        )
    }

    /// Whether the device at `address` acknowledges a zero-length probe.
    ///
    /// # Errors
    ///
    /// Propagates any non-NAK transfer error.
    pub fn is_ready(
        &mut self,
        address: SevenBitAddress,
        timeout: MilliSeconds,
    ) -> Result<bool, Error> {
        match self.write(address, &[], timeout) {
            Ok(()) => Ok(true),
            Err(Error::Nak) => Ok(false),
            Err(error) => Err(error),
        }
    }

    /// Probe every address in `0x02..=0x7E` and collect the responders,
    /// in ascending order.
    ///
    /// # Errors
    ///
    /// Propagates any non-NAK transfer error from a probe.
    pub fn scan(
        &mut self,
        timeout: MilliSeconds,
    ) -> Result<heapless::Vec<u8, SCAN_ADDRESS_COUNT>, Error> {
        let mut responders = heapless::Vec::new();
        for address in SCAN_FIRST_ADDRESS..=SCAN_LAST_ADDRESS {
            if self.is_ready(address, timeout)? {
                // capacity covers the whole probe range
                let _ = responders.push(address);
            }
        }
        Ok(responders)
    }

    fn execute(&mut self, request: TransferRequest<'_>, timeout: MilliSeconds) -> Result<(), Error> {
        if !self.descriptor.flags().is_enabled() {
            return Err(Error::NotEnabled);
        }
        if !self.descriptor.flags().try_acquire_busy() {
            return Err(Error::Busy);
        }

        let result = self.run_transfer(request, timeout);
        let result = match result {
            Err(error) if error.requires_bus_reset() => {
                if self.reset_after_error() {
                    Err(Error::BusBusyTimeout)
                } else {
                    Err(error)
                }
            }
            other => other,
        };

        self.descriptor.flags().release_busy();
        result
    }

    fn run_transfer(
        &mut self,
        request: TransferRequest<'_>,
        timeout: MilliSeconds,
    ) -> Result<(), Error> {
        self.events.reset();
        self.hardware.start_transfer(request)?;
        self.wait_for_outcome(timeout)
    }

    fn wait_for_outcome(&mut self, timeout: MilliSeconds) -> Result<(), Error> {
        let budget_us = timeout.to_micros();
        let mut elapsed_us: u32 = 0;
        loop {
            match self.events.poll() {
                Ok(TransferOutcome::Complete) => return Ok(()),
                Ok(TransferOutcome::Nak) => return Err(Error::Nak),
                Err(nb::Error::WouldBlock) => {}
                Err(nb::Error::Other(never)) => match never {},
            }
            if elapsed_us >= budget_us {
                return Err(Error::Timeout);
            }
            self.delay.delay_us(COMPLETION_POLL_INTERVAL_US);
            elapsed_us = elapsed_us.saturating_add(COMPLETION_POLL_INTERVAL_US);
        }
    }

    /// One-shot self-healing pass after a faulted transaction: wait for
    /// the bus-idle status within a fixed budget and, failing that,
    /// reinitialize the instance at its current baud rate.
    ///
    /// Returns `true` when the bus stayed busy and the instance was
    /// reinitialized.
    fn reset_after_error(&mut self) -> bool {
        self.logger.log("i2c: waiting for bus idle after fault");
        for _ in 0..BUS_IDLE_POLL_BUDGET {
            if self.hardware.is_bus_idle() {
                return false;
            }
            recovery::settle();
        }

        // bus was/is busy, reset the peripheral to get it working again
        self.logger.log("i2c: bus stuck busy, reinitializing");
        let baud_rate = self.descriptor.baud_rate();
        self.deinitialize();
        if self.initialize(baud_rate).is_err() {
            self.logger.log("i2c: reinitialization failed");
        }
        true
    }
}

impl<H, P, C, I, D, L> BusLifecycle for I2cController<H, P, C, I, D, L>
where
    H: Lpi2cMaster,
    P: I2cBusPins,
    C: ClockControl,
    I: InterruptControl,
    D: DelayNs,
    L: Logger,
{
    type Error = Error;

    fn initialize(&mut self, baud_rate: u32) -> Result<(), Error> {
        I2cController::initialize(self, baud_rate)
    }

    fn deinitialize(&mut self) {
        I2cController::deinitialize(self);
    }
}

impl<H, P, C, I, D, L> I2cMaster for I2cController<H, P, C, I, D, L>
where
    H: Lpi2cMaster,
    P: I2cBusPins,
    C: ClockControl,
    I: InterruptControl,
    D: DelayNs,
    L: Logger,
{
    fn scan(
        &mut self,
        timeout: MilliSeconds,
    ) -> Result<heapless::Vec<u8, SCAN_ADDRESS_COUNT>, Error> {
        I2cController::scan(self, timeout)
    }

    fn is_ready(
        &mut self,
        address: SevenBitAddress,
        timeout: MilliSeconds,
    ) -> Result<bool, Error> {
        I2cController::is_ready(self, address, timeout)
    }

    fn write(
        &mut self,
        address: SevenBitAddress,
        bytes: &[u8],
        timeout: MilliSeconds,
    ) -> Result<(), Error> {
        I2cController::write(self, address, bytes, timeout)
    }

    fn read(
        &mut self,
        address: SevenBitAddress,
        buffer: &mut [u8],
        timeout: MilliSeconds,
    ) -> Result<(), Error> {
        I2cController::read(self, address, buffer, timeout)
    }

    fn memory_write(
        &mut self,
        address: SevenBitAddress,
        mem_address: u16,
        width: SubAddressWidth,
        bytes: &[u8],
        timeout: MilliSeconds,
    ) -> Result<(), Error> {
        I2cController::memory_write(self, address, mem_address, width, bytes, timeout)
    }

    fn memory_read(
        &mut self,
        address: SevenBitAddress,
        mem_address: u16,
        width: SubAddressWidth,
        buffer: &mut [u8],
        timeout: MilliSeconds,
    ) -> Result<(), Error> {
        I2cController::memory_read(self, address, mem_address, width, buffer, timeout)
    }
}

impl<H, P, C, I, D, L> embedded_hal::i2c::ErrorType for I2cController<H, P, C, I, D, L>
where
    H: Lpi2cMaster,
    P: I2cBusPins,
    C: ClockControl,
    I: InterruptControl,
    D: DelayNs,
    L: Logger,
{
    type Error = Error;
}

/// embedded-hal entry points, using [`DEFAULT_TRANSFER_TIMEOUT`].
///
/// `write_read` and the write-then-read `transaction` shape are mapped
/// onto the combined memory transaction, so the write phase is limited to
/// the one- or two-byte sub-addresses the peripheral can frame; other
/// operation sequences fail with [`Error::Unsupported`].
impl<H, P, C, I, D, L> embedded_hal::i2c::I2c for I2cController<H, P, C, I, D, L>
where
    H: Lpi2cMaster,
    P: I2cBusPins,
    C: ClockControl,
    I: InterruptControl,
    D: DelayNs,
    L: Logger,
{
    fn read(&mut self, address: SevenBitAddress, buffer: &mut [u8]) -> Result<(), Self::Error> {
        I2cController::read(self, address, buffer, DEFAULT_TRANSFER_TIMEOUT)
    }

    fn write(&mut self, address: SevenBitAddress, bytes: &[u8]) -> Result<(), Self::Error> {
        I2cController::write(self, address, bytes, DEFAULT_TRANSFER_TIMEOUT)
    }

    fn write_read(
        &mut self,
        address: SevenBitAddress,
        bytes: &[u8],
        buffer: &mut [u8],
    ) -> Result<(), Self::Error> {
        match bytes {
            [register] => self.memory_read(
                address,
                u16::from(*register),
                SubAddressWidth::One,
                buffer,
                DEFAULT_TRANSFER_TIMEOUT,
            ),
            [high, low] => self.memory_read(
                address,
                u16::from_be_bytes([*high, *low]),
                SubAddressWidth::Two,
                buffer,
                DEFAULT_TRANSFER_TIMEOUT,
            ),
            _ => Err(Error::Unsupported),
        }
    }

    fn transaction(
        &mut self,
        address: SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        match operations {
            [] => Ok(()),
            [Operation::Write(bytes)] => {
                I2cController::write(self, address, bytes, DEFAULT_TRANSFER_TIMEOUT)
            }
            [Operation::Read(buffer)] => {
                I2cController::read(self, address, buffer, DEFAULT_TRANSFER_TIMEOUT)
            }
            [Operation::Write(bytes), Operation::Read(buffer)] => {
                embedded_hal::i2c::I2c::write_read(self, address, bytes, &mut **buffer)
            }
            _ => Err(Error::Unsupported),
        }
    }
}
