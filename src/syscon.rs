// Licensed under the Apache-2.0 license

//! System-control collaborator interfaces.
//!
//! The bus engines never touch the clock tree or the interrupt matrix
//! directly; they go through these traits. Board support code implements
//! them against the real SCG/PCC/INTMUX blocks, tests implement them with
//! plain mocks.

/// Gateable clock domains consumed by this subsystem.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClockId {
    Lpi2c0,
    Lpi2c1,
    Lpi2c2,
    Lpi2c3,
    Lpspi0,
    Lpspi1,
    Lpspi2,
    Lpspi3,
    /// GPIO port clock needed while the I2C lines are bit-banged during
    /// bus recovery.
    RecoveryGpio,
}

/// Functional clock sources selectable per peripheral domain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClockSource {
    FircAsync,
    SircAsync,
    SoscAsync,
    LpFllAsync,
}

/// Interrupt line identifier as routed through the interrupt multiplexer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct InterruptLine(pub u16);

/// Clock-tree service.
pub trait ClockControl {
    fn enable(&mut self, clock: ClockId);
    fn disable(&mut self, clock: ClockId);
    fn set_source(&mut self, clock: ClockId, source: ClockSource);
    fn set_divider(&mut self, clock: ClockId, divider: u32);
    /// Current functional frequency of `clock` in Hz.
    fn frequency(&self, clock: ClockId) -> u32;
}

/// Interrupt-controller service.
pub trait InterruptControl {
    fn enable(&mut self, line: InterruptLine);
    fn disable(&mut self, line: InterruptLine);
    /// Route `line` to the core at the given priority.
    fn route(&mut self, line: InterruptLine, priority: u8);
}
