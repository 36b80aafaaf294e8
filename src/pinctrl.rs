// Licensed under the Apache-2.0 license

//! Pin-service collaborator interface.
//!
//! Bus recovery needs the two I2C lines as plain digital GPIO for the
//! duration of the release sequence, then back in their peripheral
//! function. The engine only sees this trait; the pin-mux registers stay
//! in board support code.

/// Logic level on a digital pin.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

/// Pull resistor selection while a line is configured as GPIO.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pull {
    None,
    Up,
    Down,
}

/// The SCL/SDA pin pair of one I2C instance.
pub trait I2cBusPins {
    /// Mux both lines as digital outputs with the given pull, initially
    /// driven high (bus idle).
    fn configure_as_gpio_output(&mut self, pull: Pull);

    /// Return both lines to their I2C peripheral function.
    fn configure_as_peripheral(&mut self);

    fn set_scl(&mut self, level: Level);
    fn set_sda(&mut self, level: Level);

    /// Sample the data line. Only meaningful while configured as GPIO.
    fn read_sda(&self) -> Level;
}
