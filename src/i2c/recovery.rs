// Licensed under the Apache-2.0 license

//! Stuck-bus recovery for the I2C lines.
//!
//! A slave left mid-byte by a reset can hold SDA low indefinitely. The
//! release sequence bit-bangs the lines as plain GPIO: simulate a START,
//! clock out the at most nine bits the slave can still be driving, then
//! issue a clean STOP. It runs before every initialization, whether or
//! not the bus is actually stuck, and it cannot fail.

use crate::common::Logger;
use crate::pinctrl::{I2cBusPins, Level, Pull};

/// SCL pulses issued while releasing the bus. Nine covers the worst case
/// of a slave stuck one bit into a byte plus the acknowledge slot.
pub const RELEASE_CLOCK_PULSES: usize = 9;

/// Iterations of the settle spin run after each electrical transition.
/// A short, non-zero settle time; deliberately not calibrated to the core
/// clock.
pub const SETTLE_LOOP_COUNT: u32 = 100;

/// Let a driven line settle.
pub(crate) fn settle() {
    for _ in 0..SETTLE_LOOP_COUNT {
        core::hint::spin_loop();
    }
}

/// Force the bus back to idle through the GPIO function of its pins.
///
/// The caller is responsible for returning the pins to their peripheral
/// function afterwards.
pub fn release_bus<P: I2cBusPins, L: Logger>(pins: &mut P, logger: &mut L) {
    pins.configure_as_gpio_output(Pull::Up);

    if pins.read_sda() == Level::Low {
        logger.log("i2c: sda held low, releasing bus");
    }

    // Drive SDA low first to simulate a start
    pins.set_sda(Level::Low);
    settle();

    // Send 9 pulses on SCL and keep SDA high
    for _ in 0..RELEASE_CLOCK_PULSES {
        pins.set_scl(Level::Low);
        settle();

        pins.set_sda(Level::High);
        settle();

        pins.set_scl(Level::High);
        settle();
        settle();
    }

    // Send stop
    pins.set_scl(Level::Low);
    settle();

    pins.set_sda(Level::Low);
    settle();

    pins.set_scl(Level::High);
    settle();

    pins.set_sda(Level::High);
    settle();
}
