// Licensed under the Apache-2.0 license

//! LPI2C master driver module.
//!
//! Implements the master-mode transaction engine, lifecycle management,
//! and stuck-bus recovery for the LPI2C instances. Slave mode and DMA
//! transfer are not supported.

pub mod common;
pub mod controller;
pub mod recovery;
pub mod traits;

pub use common::{
    ConfigurationError, Error, I2cConfig, I2cConfigBuilder, I2cSpeed, DEFAULT_TRANSFER_TIMEOUT,
};
pub use controller::I2cController;
pub use traits::{
    I2cMaster, Lpi2cMaster, SubAddress, SubAddressWidth, TransferBuffer, TransferRequest,
};
