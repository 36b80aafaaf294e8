// Licensed under the Apache-2.0 license

//! Shared support types for the bus driver modules.
//!
//! Provides the logging seam threaded through every controller and the
//! lifecycle capability implemented by each bus engine.

pub use fugit::MillisDurationU32 as MilliSeconds;

/// Trace sink carried by the controllers.
///
/// Controllers are generic over their logger so production builds can use
/// [`NoOpLogger`] at zero cost while bring-up builds route the same trace
/// lines to a UART or any other byte sink via [`WriteLogger`].
pub trait Logger {
    /// Emit one trace line. Implementations append their own framing.
    fn log(&mut self, message: &str);
}

/// Logger that discards everything.
#[derive(Clone, Copy, Default)]
pub struct NoOpLogger;

impl Logger for NoOpLogger {
    fn log(&mut self, _message: &str) {}
}

/// Logger that writes trace lines to an `embedded_io` byte sink.
///
/// Write errors are swallowed; tracing must never alter driver behavior.
pub struct WriteLogger<W> {
    sink: W,
}

impl<W: embedded_io::Write> WriteLogger<W> {
    pub fn new(sink: W) -> Self {
        Self { sink }
    }
}

impl<W: embedded_io::Write> Logger for WriteLogger<W> {
    fn log(&mut self, message: &str) {
        let _ = self.sink.write_all(message.as_bytes());
        let _ = self.sink.write_all(b"\r\n");
    }
}

/// Lifecycle capability shared by every bus engine.
///
/// Generic callers hold a `BusLifecycle` instead of a concrete controller
/// when all they manage is bring-up and teardown.
pub trait BusLifecycle {
    type Error;

    /// Bring the peripheral up in master mode at `baud_rate` Hz.
    ///
    /// # Errors
    ///
    /// Fails with a configuration error for an unsupported baud rate, or
    /// with a busy error if the instance is already enabled; callers must
    /// `deinitialize` first (or use [`BusLifecycle::reinitialize_at`]).
    fn initialize(&mut self, baud_rate: u32) -> Result<(), Self::Error>;

    /// Disable the peripheral, gate its clock, and mask its interrupt.
    ///
    /// Safe to call on an instance that was never initialized; repeated
    /// calls are no-ops.
    fn deinitialize(&mut self);

    /// Tear the instance down and bring it back up at `new_baud_rate`.
    ///
    /// # Errors
    ///
    /// Propagates the same errors as [`BusLifecycle::initialize`].
    fn reinitialize_at(&mut self, new_baud_rate: u32) -> Result<(), Self::Error> {
        self.deinitialize();
        self.initialize(new_baud_rate)
    }
}
