// Licensed under the Apache-2.0 license

//! LPSPI master transfer engine.
//!
//! All transfers are blocking and polled: the engine issues the shift,
//! then waits for the module-busy status flag to clear under the caller's
//! timeout. When software chip-select is configured, the line is driven
//! low immediately before the transfer and released immediately after it
//! on every path, including faults.

use crate::common::{BusLifecycle, Logger, MilliSeconds, NoOpLogger};
use crate::descriptor::BusDescriptor;
use crate::spi::common::{
    ConfigurationError, Error, SpiConfig, DEFAULT_TRANSFER_TIMEOUT, MODULE_BUSY_POLL_INTERVAL_US,
};
use crate::spi::traits::{LpspiMaster, SpiMaster};
use crate::syscon::{ClockControl, InterruptControl};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

/// Scratch unit for in-place exchanges.
const IN_PLACE_CHUNK: usize = 32;

/// Chip-select placeholder for controllers that leave the line to the
/// peripheral or to the board.
pub struct UnusedPin;

impl embedded_hal::digital::ErrorType for UnusedPin {
    type Error = core::convert::Infallible;
}

impl OutputPin for UnusedPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Master engine for one LPSPI instance.
pub struct SpiController<
    H: LpspiMaster,
    CS: OutputPin,
    C: ClockControl,
    I: InterruptControl,
    D: DelayNs,
    L: Logger = NoOpLogger,
> {
    pub hardware: H,
    /// Software chip-select, when the board drives the line by GPIO
    /// instead of the peripheral's own PCS output.
    pub chip_select: Option<CS>,
    pub clock: C,
    pub intc: I,
    pub delay: D,
    pub logger: L,
    pub config: SpiConfig,
    pub descriptor: BusDescriptor,
}

impl<H, CS, C, I, D, L> SpiController<H, CS, C, I, D, L>
where
    H: LpspiMaster,
    CS: OutputPin,
    C: ClockControl,
    I: InterruptControl,
    D: DelayNs,
    L: Logger,
{
    /// Bring the instance up in master mode from its stored
    /// configuration.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] for a zero baud rate; [`Error::Busy`] if the
    /// instance is already enabled.
    pub fn initialize(&mut self) -> Result<(), Error> {
        if self.config.baud_rate == 0 {
            return Err(Error::Config(ConfigurationError::BaudRateZero));
        }
        if self.descriptor.flags().is_enabled() {
            return Err(Error::Busy);
        }

        self.clock
            .set_source(self.config.clock_id, self.config.clock_source);
        self.clock
            .set_divider(self.config.clock_id, self.config.clock_divider);
        self.clock.enable(self.config.clock_id);
        self.intc.enable(self.config.interrupt_line);

        let source_clock_hz = self.clock.frequency(self.config.clock_id);
        self.hardware.master_init(&self.config, source_clock_hz);

        self.descriptor.set_baud_rate(self.config.baud_rate);
        self.descriptor.flags().set_enabled(true);
        self.logger.log("spi: master enabled");
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
        self.logger.log("spi: master disabled");
    }

    /// Transmit `bytes`. A zero-length send completes trivially without
    /// touching the hardware.
    ///
    /// # Errors
    ///
    /// [`Error::HardwareFault`], [`Error::Timeout`], [`Error::Busy`],
    /// [`Error::NotEnabled`].
    pub fn send(&mut self, bytes: &[u8], timeout: MilliSeconds) -> Result<(), Error> {
        self.check_enabled()?;
        if bytes.is_empty() {
            return Ok(());
        }
        self.claim()?;
        self.assert_chip_select();
        let mut result = self.hardware.transfer(Some(bytes), None);
        if result.is_ok() {
            result = self.wait_module_idle(timeout);
        }
        self.release_chip_select();
        self.descriptor.flags().release_busy();
        result
    }

    /// Fill `buffer`, clocking out the idle fill pattern. A zero-length
    /// receive completes trivially.
    ///
    /// # Errors
    ///
    /// Same taxonomy as [`SpiController::send`].
    pub fn receive(&mut self, buffer: &mut [u8], timeout: MilliSeconds) -> Result<(), Error> {
        self.check_enabled()?;
        if buffer.is_empty() {
            return Ok(());
        }
        self.claim()?;
        self.assert_chip_select();
        let mut result = self.hardware.transfer(None, Some(buffer));
        if result.is_ok() {
            result = self.wait_module_idle(timeout);
        }
        self.release_chip_select();
        self.descriptor.flags().release_busy();
        result
    }

    /// Exchange data with the selected device.
    ///
    /// Half duplex runs the send phase and the receive phase as two
    /// independent transfers; full duplex runs a single transfer and
    /// requires `rx.len() == tx.len()`. Chip-select, when configured,
    /// stays asserted across both half-duplex phases.
    ///
    /// # Errors
    ///
    /// [`Error::LengthMismatch`] on a full-duplex length mismatch, plus
    /// the [`SpiController::send`] taxonomy.
    pub fn send_receive(
        &mut self,
        tx: &[u8],
        rx: &mut [u8],
        half_duplex: bool,
        timeout: MilliSeconds,
    ) -> Result<(), Error> {
        self.check_enabled()?;
        if !half_duplex && rx.len() != tx.len() {
            return Err(Error::LengthMismatch);
        }
        if tx.is_empty() && rx.is_empty() {
            return Ok(());
        }
        self.claim()?;
        self.assert_chip_select();
        let result = if half_duplex {
            self.half_duplex_phases(tx, rx, timeout)
        } else {
            let mut result = self.hardware.transfer(Some(tx), Some(rx));
            if result.is_ok() {
                result = self.wait_module_idle(timeout);
            }
            result
        };
        self.release_chip_select();
        self.descriptor.flags().release_busy();
        result
    }

    fn half_duplex_phases(
        &mut self,
        tx: &[u8],
        rx: &mut [u8],
        timeout: MilliSeconds,
    ) -> Result<(), Error> {
        if !tx.is_empty() {
            self.hardware.transfer(Some(tx), None)?;
            self.wait_module_idle(timeout)?;
        }
        if !rx.is_empty() {
            self.hardware.transfer(None, Some(rx))?;
            self.wait_module_idle(timeout)?;
        }
        Ok(())
    }

    fn check_enabled(&self) -> Result<(), Error> {
        if self.descriptor.flags().is_enabled() {
            Ok(())
        } else {
            Err(Error::NotEnabled)
        }
    }

    fn claim(&self) -> Result<(), Error> {
        if self.descriptor.flags().try_acquire_busy() {
            Ok(())
        } else {
            Err(Error::Busy)
        }
    }

    fn assert_chip_select(&mut self) {
        if let Some(cs) = self.chip_select.as_mut() {
            let _ = cs.set_low();
        }
    }

    fn release_chip_select(&mut self) {
        if let Some(cs) = self.chip_select.as_mut() {
            let _ = cs.set_high();
        }
    }

    fn wait_module_idle(&mut self, timeout: MilliSeconds) -> Result<(), Error> {
        let budget_us = timeout.to_micros();
        let mut elapsed_us: u32 = 0;
        while self.hardware.is_module_busy() {
            if elapsed_us >= budget_us {
                return Err(Error::Timeout);
            }
            self.delay.delay_us(MODULE_BUSY_POLL_INTERVAL_US);
            elapsed_us = elapsed_us.saturating_add(MODULE_BUSY_POLL_INTERVAL_US);
        }
        Ok(())
    }
}

impl<H, CS, C, I, D, L> BusLifecycle for SpiController<H, CS, C, I, D, L>
where
    H: LpspiMaster,
    CS: OutputPin,
    C: ClockControl,
    I: InterruptControl,
    D: DelayNs,
    L: Logger,
{
    type Error = Error;

    fn initialize(&mut self, baud_rate: u32) -> Result<(), Error> {
        self.config.baud_rate = baud_rate;
        SpiController::initialize(self)
    }

    fn deinitialize(&mut self) {
        SpiController::deinitialize(self);
    }
}

impl<H, CS, C, I, D, L> SpiMaster for SpiController<H, CS, C, I, D, L>
where
    H: LpspiMaster,
    CS: OutputPin,
    C: ClockControl,
    I: InterruptControl,
    D: DelayNs,
    L: Logger,
{
    fn send(&mut self, bytes: &[u8], timeout: MilliSeconds) -> Result<(), Error> {
        SpiController::send(self, bytes, timeout)
    }

    fn receive(&mut self, buffer: &mut [u8], timeout: MilliSeconds) -> Result<(), Error> {
        SpiController::receive(self, buffer, timeout)
    }

    fn send_receive(
        &mut self,
        tx: &[u8],
        rx: &mut [u8],
        half_duplex: bool,
        timeout: MilliSeconds,
    ) -> Result<(), Error> {
        SpiController::send_receive(self, tx, rx, half_duplex, timeout)
    }
}

impl<H, CS, C, I, D, L> embedded_hal::spi::ErrorType for SpiController<H, CS, C, I, D, L>
where
    H: LpspiMaster,
    CS: OutputPin,
    C: ClockControl,
    I: InterruptControl,
    D: DelayNs,
    L: Logger,
{
    type Error = Error;
}

/// embedded-hal bus entry points, using [`DEFAULT_TRANSFER_TIMEOUT`].
///
/// When software chip-select is configured it wraps each individual call;
/// leave `chip_select` unset to get plain bus semantics.
impl<H, CS, C, I, D, L> embedded_hal::spi::SpiBus<u8> for SpiController<H, CS, C, I, D, L>
where
    H: LpspiMaster,
    CS: OutputPin,
    C: ClockControl,
    I: InterruptControl,
    D: DelayNs,
    L: Logger,
{
    fn read(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        SpiController::receive(self, words, DEFAULT_TRANSFER_TIMEOUT)
    }

    fn write(&mut self, words: &[u8]) -> Result<(), Self::Error> {
        SpiController::send(self, words, DEFAULT_TRANSFER_TIMEOUT)
    }

    fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), Self::Error> {
        let common = read.len().min(write.len());
        let (read_head, read_tail) = read.split_at_mut(common);
        let (write_head, write_tail) = write.split_at(common);
        if !read_head.is_empty() {
            self.send_receive(write_head, read_head, false, DEFAULT_TRANSFER_TIMEOUT)?;
        }
        if !write_tail.is_empty() {
            self.send(write_tail, DEFAULT_TRANSFER_TIMEOUT)?;
        }
        if !read_tail.is_empty() {
            self.receive(read_tail, DEFAULT_TRANSFER_TIMEOUT)?;
        }
        Ok(())
    }

    fn transfer_in_place(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        for chunk in words.chunks_mut(IN_PLACE_CHUNK) {
            let mut scratch = [0u8; IN_PLACE_CHUNK];
            let tx = scratch
                .get_mut(..chunk.len())
                .ok_or(Error::HardwareFault)?;
            tx.copy_from_slice(chunk);
            self.send_receive(tx, chunk, false, DEFAULT_TRANSFER_TIMEOUT)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.wait_module_idle(DEFAULT_TRANSFER_TIMEOUT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::InstanceId;
    use crate::spi::common::SpiConfigBuilder;
    use crate::syscon::{ClockId, ClockSource, InterruptLine};
    use std::cell::Cell;
    use std::collections::{HashMap, HashSet};
    use std::rc::Rc;

    #[derive(Clone, Debug, PartialEq, Eq)]
    enum Event {
        CsLow,
        CsHigh,
        Transfer { tx: Option<Vec<u8>>, rx_len: Option<usize> },
    }

    type EventLog = Rc<std::cell::RefCell<Vec<Event>>>;

    struct MockCs {
        log: EventLog,
    }

    impl embedded_hal::digital::ErrorType for MockCs {
        type Error = core::convert::Infallible;
    }

    impl OutputPin for MockCs {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            self.log.borrow_mut().push(Event::CsLow);
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            self.log.borrow_mut().push(Event::CsHigh);
            Ok(())
        }
    }

    struct MockLpspi {
        log: EventLog,
        fail: bool,
        busy_polls: Cell<u32>,
        init_count: usize,
        deinit_count: usize,
        last_baud: Option<u32>,
        last_source_clock: Option<u32>,
    }

    impl MockLpspi {
        fn new(log: EventLog) -> Self {
            Self {
                log,
                fail: false,
                busy_polls: Cell::new(0),
                init_count: 0,
                deinit_count: 0,
                last_baud: None,
                last_source_clock: None,
            }
        }
    }

    impl LpspiMaster for MockLpspi {
        fn master_init(&mut self, config: &SpiConfig, source_clock_hz: u32) {
            self.init_count += 1;
            self.last_baud = Some(config.baud_rate);
            self.last_source_clock = Some(source_clock_hz);
        }

        fn master_deinit(&mut self) {
            self.deinit_count += 1;
        }

        fn transfer(&mut self, tx: Option<&[u8]>, rx: Option<&mut [u8]>) -> Result<(), Error> {
            self.log.borrow_mut().push(Event::Transfer {
                tx: tx.map(<[u8]>::to_vec),
                rx_len: rx.as_ref().map(|buffer| buffer.len()),
            });
            if self.fail {
                return Err(Error::HardwareFault);
            }
            if let Some(rx) = rx {
                match tx {
                    // loopback for full duplex
                    Some(tx) => {
                        for (slot, byte) in rx.iter_mut().zip(tx.iter()) {
                            *slot = *byte;
                        }
                    }
                    // idle-fill pattern for receive-only shifts
                    None => rx.fill(0x5A),
                }
            }
            Ok(())
        }

        fn is_module_busy(&self) -> bool {
            let remaining = self.busy_polls.get();
            if remaining > 0 {
                self.busy_polls.set(remaining - 1);
                true
            } else {
                false
            }
        }
    }

    #[derive(Default)]
    struct MockClock {
        enabled: HashSet<ClockId>,
        sources: HashMap<ClockId, ClockSource>,
        touched: usize,
    }

    impl ClockControl for MockClock {
        fn enable(&mut self, clock: ClockId) {
            self.enabled.insert(clock);
            self.touched += 1;
        }

        fn disable(&mut self, clock: ClockId) {
            self.enabled.remove(&clock);
            self.touched += 1;
        }

        fn set_source(&mut self, clock: ClockId, source: ClockSource) {
            self.sources.insert(clock, source);
            self.touched += 1;
        }

        fn set_divider(&mut self, _clock: ClockId, _divider: u32) {
            self.touched += 1;
        }

        fn frequency(&self, _clock: ClockId) -> u32 {
            24_000_000
        }
    }

    #[derive(Default)]
    struct MockIntc {
        enabled: HashSet<u16>,
    }

    impl InterruptControl for MockIntc {
        fn enable(&mut self, line: InterruptLine) {
            self.enabled.insert(line.0);
        }

        fn disable(&mut self, line: InterruptLine) {
            self.enabled.remove(&line.0);
        }

        fn route(&mut self, _line: InterruptLine, _priority: u8) {}
    }

    #[derive(Default)]
    struct MockDelay {
        delays: usize,
    }

    impl DelayNs for MockDelay {
        fn delay_ns(&mut self, _ns: u32) {
            self.delays += 1;
        }
    }

    type TestController = SpiController<MockLpspi, MockCs, MockClock, MockIntc, MockDelay>;

    fn controller(with_cs: bool) -> (TestController, EventLog) {
        let log: EventLog = Rc::default();
        let spi = SpiController {
            hardware: MockLpspi::new(Rc::clone(&log)),
            chip_select: with_cs.then(|| MockCs {
                log: Rc::clone(&log),
            }),
            clock: MockClock::default(),
            intc: MockIntc::default(),
            delay: MockDelay::default(),
            logger: NoOpLogger,
            config: SpiConfigBuilder::new()
                .baud_rate(600_000)
                .clock_id(ClockId::Lpspi0)
                .interrupt_line(InterruptLine(29))
                .build(),
            descriptor: BusDescriptor::new(InstanceId::new(0)),
        };
        (spi, log)
    }

    const TIMEOUT: MilliSeconds = MilliSeconds::from_ticks(5);

    #[test]
    fn initialize_rejects_zero_baud() {
        let (mut spi, _log) = controller(false);
        spi.config.baud_rate = 0;
        assert_eq!(
            SpiController::initialize(&mut spi),
            Err(Error::Config(ConfigurationError::BaudRateZero))
        );
        assert_eq!(spi.hardware.init_count, 0);
        assert_eq!(spi.clock.touched, 0);
    }

    #[test]
    fn initialize_programs_master() {
        let (mut spi, _log) = controller(false);
        spi.initialize().unwrap();
        assert!(spi.descriptor.flags().is_enabled());
        assert!(spi.clock.enabled.contains(&ClockId::Lpspi0));
        assert!(spi.intc.enabled.contains(&29));
        assert_eq!(spi.hardware.last_baud, Some(600_000));
        assert_eq!(spi.hardware.last_source_clock, Some(24_000_000));
    }

    #[test]
    fn deinitialize_is_idempotent() {
        let (mut spi, _log) = controller(false);
        spi.deinitialize();
        assert_eq!(spi.hardware.deinit_count, 0);

        spi.initialize().unwrap();
        spi.deinitialize();
        spi.deinitialize();
        assert_eq!(spi.hardware.deinit_count, 1);
        assert!(!spi.descriptor.flags().is_enabled());
    }

    #[test]
    fn send_wraps_transfer_with_chip_select() {
        let (mut spi, log) = controller(true);
        spi.initialize().unwrap();
        spi.send(&[0x01, 0x02, 0x03], TIMEOUT).unwrap();
        assert_eq!(
            log.borrow().as_slice(),
            &[
                Event::CsLow,
                Event::Transfer {
                    tx: Some(vec![0x01, 0x02, 0x03]),
                    rx_len: None
                },
                Event::CsHigh,
            ]
        );
        assert!(!spi.descriptor.flags().is_busy());
    }

    #[test]
    fn chip_select_released_on_fault() {
        let (mut spi, log) = controller(true);
        spi.initialize().unwrap();
        spi.hardware.fail = true;
        assert_eq!(
            spi.send_receive(&[0x01, 0x02, 0x03], &mut [0u8; 3], false, TIMEOUT),
            Err(Error::HardwareFault)
        );
        let events = log.borrow();
        assert_eq!(events.first(), Some(&Event::CsLow));
        assert_eq!(events.last(), Some(&Event::CsHigh));
        assert!(!spi.descriptor.flags().is_busy());
    }

    #[test]
    fn full_duplex_is_one_transfer() {
        let (mut spi, log) = controller(false);
        spi.initialize().unwrap();
        let mut rx = [0u8; 3];
        spi.send_receive(&[0xA0, 0xA1, 0xA2], &mut rx, false, TIMEOUT)
            .unwrap();
        assert_eq!(rx, [0xA0, 0xA1, 0xA2]);
        assert_eq!(
            log.borrow().as_slice(),
            &[Event::Transfer {
                tx: Some(vec![0xA0, 0xA1, 0xA2]),
                rx_len: Some(3)
            }]
        );
    }

    #[test]
    fn half_duplex_is_two_transfers() {
        let (mut spi, log) = controller(false);
        spi.initialize().unwrap();
        let mut rx = [0u8; 2];
        spi.send_receive(&[0xB0, 0xB1, 0xB2], &mut rx, true, TIMEOUT)
            .unwrap();
        assert_eq!(rx, [0x5A, 0x5A]);
        assert_eq!(
            log.borrow().as_slice(),
            &[
                Event::Transfer {
                    tx: Some(vec![0xB0, 0xB1, 0xB2]),
                    rx_len: None
                },
                Event::Transfer {
                    tx: None,
                    rx_len: Some(2)
                },
            ]
        );
    }

    #[test]
    fn full_duplex_length_mismatch_rejected_before_hardware() {
        let (mut spi, log) = controller(true);
        spi.initialize().unwrap();
        let mut rx = [0u8; 2];
        assert_eq!(
            spi.send_receive(&[0x01, 0x02, 0x03], &mut rx, false, TIMEOUT),
            Err(Error::LengthMismatch)
        );
        // chip-select never asserted, nothing shifted
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn zero_length_transfers_complete_trivially() {
        let (mut spi, log) = controller(true);
        spi.initialize().unwrap();
        spi.send(&[], TIMEOUT).unwrap();
        spi.receive(&mut [], TIMEOUT).unwrap();
        spi.send_receive(&[], &mut [], false, TIMEOUT).unwrap();
        spi.send_receive(&[], &mut [], true, TIMEOUT).unwrap();
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn stuck_module_busy_times_out() {
        let (mut spi, log) = controller(true);
        spi.initialize().unwrap();
        spi.hardware.busy_polls = Cell::new(u32::MAX);
        assert_eq!(
            spi.send(&[0x01], MilliSeconds::from_ticks(1)),
            Err(Error::Timeout)
        );
        assert!(spi.delay.delays > 0);
        assert_eq!(log.borrow().last(), Some(&Event::CsHigh));
        assert!(!spi.descriptor.flags().is_busy());
    }

    #[test]
    fn operations_require_initialization() {
        let (mut spi, log) = controller(false);
        assert_eq!(spi.send(&[0x01], TIMEOUT), Err(Error::NotEnabled));
        let mut rx = [0u8; 1];
        assert_eq!(spi.receive(&mut rx, TIMEOUT), Err(Error::NotEnabled));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn no_chip_select_means_bare_transfers() {
        let (mut spi, log) = controller(false);
        spi.initialize().unwrap();
        spi.send(&[0xEE], TIMEOUT).unwrap();
        assert_eq!(
            log.borrow().as_slice(),
            &[Event::Transfer {
                tx: Some(vec![0xEE]),
                rx_len: None
            }]
        );
    }

    #[test]
    fn spi_bus_transfer_handles_unequal_lengths() {
        use embedded_hal::spi::SpiBus;

        let (mut spi, log) = controller(false);
        spi.initialize().unwrap();
        let mut read = [0u8; 2];
        SpiBus::transfer(&mut spi, &mut read, &[0x10, 0x11, 0x12, 0x13]).unwrap();
        assert_eq!(read, [0x10, 0x11]);
        // common prefix full duplex, remainder write-only
        assert_eq!(
            log.borrow().as_slice(),
            &[
                Event::Transfer {
                    tx: Some(vec![0x10, 0x11]),
                    rx_len: Some(2)
                },
                Event::Transfer {
                    tx: Some(vec![0x12, 0x13]),
                    rx_len: None
                },
            ]
        );
    }

    #[test]
    fn spi_bus_transfer_in_place_round_trips() {
        use embedded_hal::spi::SpiBus;

        let (mut spi, _log) = controller(false);
        spi.initialize().unwrap();
        let mut words = [0x01, 0x02, 0x03, 0x04];
        SpiBus::transfer_in_place(&mut spi, &mut words).unwrap();
        // loopback mock: data survives the exchange
        assert_eq!(words, [0x01, 0x02, 0x03, 0x04]);
    }
}
