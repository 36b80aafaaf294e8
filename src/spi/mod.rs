// Licensed under the Apache-2.0 license

//! LPSPI master driver module.
//!
//! Polled, blocking master transfers with optional software chip-select.
//! Unlike the LPI2C engine there is no interrupt-mediated completion and
//! no bus recovery; the master owns the clock line outright.

pub mod common;
pub mod controller;
pub mod traits;

pub use common::{
    BitOrder, ConfigurationError, Error, SpiConfig, SpiConfigBuilder, DEFAULT_TRANSFER_TIMEOUT,
};
pub use controller::{SpiController, UnusedPin};
pub use traits::{LpspiMaster, SpiMaster};
