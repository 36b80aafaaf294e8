// Licensed under the Apache-2.0 license

//! Completion signaling between the interrupt and blocking-wait domains.
//!
//! An I2C transfer is submitted non-blocking; the interrupt handler later
//! reports its outcome by setting one of two flags in a [`TransferEvents`]
//! cell, which the foreground wait loop consumes. The cell is strictly
//! single-producer (the interrupt) and single-consumer (the blocking
//! caller), and every instance gets its own cell so concurrently
//! initialized buses can never alias each other's outcome.

use core::convert::Infallible;
use core::sync::atomic::{AtomicBool, Ordering};

/// Outcome reported by the interrupt side of a transfer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransferOutcome {
    /// The transfer ran to completion.
    Complete,
    /// The addressed peer did not acknowledge.
    Nak,
}

/// One instance's completion/NAK flag pair.
pub struct TransferEvents {
    completion: AtomicBool,
    nak: AtomicBool,
}

impl TransferEvents {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            completion: AtomicBool::new(false),
            nak: AtomicBool::new(false),
        }
    }

    /// Clear any stale outcome. Called before each transfer is submitted.
    pub fn reset(&self) {
        self.completion.store(false, Ordering::Release);
        self.nak.store(false, Ordering::Release);
    }

    /// Interrupt side: the transfer completed successfully.
    pub fn signal_completion(&self) {
        self.completion.store(true, Ordering::Release);
    }

    /// Interrupt side: the peer rejected the transfer.
    pub fn signal_nak(&self) {
        self.nak.store(true, Ordering::Release);
    }

    /// Foreground side: consume the pending outcome, if any.
    ///
    /// Completion takes precedence over a NAK observed in the same
    /// window; both flags are cleared once an outcome is returned.
    ///
    /// # Errors
    ///
    /// Returns [`nb::Error::WouldBlock`] while no outcome is pending.
    pub fn poll(&self) -> nb::Result<TransferOutcome, Infallible> {
        if self.completion.load(Ordering::Acquire) {
            self.completion.store(false, Ordering::Release);
            self.nak.store(false, Ordering::Release);
            return Ok(TransferOutcome::Complete);
        }
        if self.nak.load(Ordering::Acquire) {
            self.nak.store(false, Ordering::Release);
            return Ok(TransferOutcome::Nak);
        }
        Err(nb::Error::WouldBlock)
    }
}

impl Default for TransferEvents {
    fn default() -> Self {
        Self::new()
    }
}

macro_rules! declare_instance_events {
    ($prefix:ident: $($num:literal),+ $(,)?) => {
        paste::paste! {
            $(
                #[doc = concat!("Completion cell for ", stringify!($prefix), stringify!($num), ".")]
                pub static [<$prefix $num _EVENTS>]: TransferEvents = TransferEvents::new();
            )+

            #[doc = concat!("Look up the completion cell for ", stringify!($prefix), " instance `index`.")]
            #[must_use]
            pub fn [<$prefix:lower _events>](index: usize) -> Option<&'static TransferEvents> {
                match index {
                    $( $num => Some(&[<$prefix $num _EVENTS>]), )+
                    _ => None,
                }
            }
        }
    };
}

declare_instance_events!(LPI2C: 0, 1, 2, 3);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_cell_would_block() {
        let events = TransferEvents::new();
        assert_eq!(events.poll(), Err(nb::Error::WouldBlock));
    }

    #[test]
    fn completion_is_consumed_once() {
        let events = TransferEvents::new();
        events.signal_completion();
        assert_eq!(events.poll(), Ok(TransferOutcome::Complete));
        assert_eq!(events.poll(), Err(nb::Error::WouldBlock));
    }

    #[test]
    fn nak_is_consumed_once() {
        let events = TransferEvents::new();
        events.signal_nak();
        assert_eq!(events.poll(), Ok(TransferOutcome::Nak));
        assert_eq!(events.poll(), Err(nb::Error::WouldBlock));
    }

    #[test]
    fn completion_wins_over_stale_nak() {
        let events = TransferEvents::new();
        events.signal_nak();
        events.signal_completion();
        assert_eq!(events.poll(), Ok(TransferOutcome::Complete));
        // the stale NAK must not leak into the next transfer
        assert_eq!(events.poll(), Err(nb::Error::WouldBlock));
    }

    #[test]
    fn reset_discards_pending_outcome() {
        let events = TransferEvents::new();
        events.signal_completion();
        events.reset();
        assert_eq!(events.poll(), Err(nb::Error::WouldBlock));
    }

    #[test]
    fn per_instance_cells_exist() {
        for index in 0..4 {
            assert!(lpi2c_events(index).is_some());
        }
        assert!(lpi2c_events(4).is_none());
    }

    #[test]
    fn instance_cells_are_distinct() {
        let a = lpi2c_events(0).unwrap();
        let b = lpi2c_events(1).unwrap();
        a.signal_completion();
        assert_eq!(b.poll(), Err(nb::Error::WouldBlock));
        assert_eq!(a.poll(), Ok(TransferOutcome::Complete));
    }
}
