// Licensed under the Apache-2.0 license

//! Per-instance bus descriptor state.
//!
//! Each physical bus instance owns one [`BusDescriptor`]: a stable index,
//! the configured baud rate, and the `Enabled`/`Busy` flag pair that every
//! engine entry point checks before touching hardware.

use core::sync::atomic::{AtomicU8, Ordering};

/// Number of LPI2C instances on the part.
pub const LPI2C_INSTANCE_COUNT: usize = 4;
/// Number of LPSPI instances on the part.
pub const LPSPI_INSTANCE_COUNT: usize = 4;

/// Stable index of a bus instance, `0..N-1` within its peripheral family.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct InstanceId(u8);

impl InstanceId {
    #[must_use]
    pub const fn new(index: u8) -> Self {
        Self(index)
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

const FLAG_ENABLED: u8 = 1 << 0;
const FLAG_BUSY: u8 = 1 << 1;

/// `Enabled`/`Busy` bitset of one instance.
///
/// Flags are written from thread context only; the interrupt path never
/// touches them, so plain load/store pairs are sufficient and the type
/// stays usable on cores without atomic read-modify-write.
pub struct BusFlags {
    bits: AtomicU8,
}

impl BusFlags {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            bits: AtomicU8::new(0),
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.bits.load(Ordering::Acquire) & FLAG_ENABLED != 0
    }

    pub fn set_enabled(&self, enabled: bool) {
        let bits = self.bits.load(Ordering::Acquire);
        let bits = if enabled {
            bits | FLAG_ENABLED
        } else {
            bits & !FLAG_ENABLED
        };
        self.bits.store(bits, Ordering::Release);
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.bits.load(Ordering::Acquire) & FLAG_BUSY != 0
    }

    /// Claim the instance for one in-flight transaction.
    ///
    /// Returns `false` if a transaction is already in flight.
    #[must_use]
    pub fn try_acquire_busy(&self) -> bool {
        let bits = self.bits.load(Ordering::Acquire);
        if bits & FLAG_BUSY != 0 {
            return false;
        }
        self.bits.store(bits | FLAG_BUSY, Ordering::Release);
        true
    }

    pub fn release_busy(&self) {
        let bits = self.bits.load(Ordering::Acquire);
        self.bits.store(bits & !FLAG_BUSY, Ordering::Release);
    }
}

impl Default for BusFlags {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration and state record of one bus instance.
pub struct BusDescriptor {
    id: InstanceId,
    baud_rate: u32,
    flags: BusFlags,
}

impl BusDescriptor {
    #[must_use]
    pub const fn new(id: InstanceId) -> Self {
        Self {
            id,
            baud_rate: 0,
            flags: BusFlags::new(),
        }
    }

    #[must_use]
    pub const fn id(&self) -> InstanceId {
        self.id
    }

    /// Baud rate the instance was last initialized at, in Hz.
    #[must_use]
    pub const fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    pub fn set_baud_rate(&mut self, baud_rate: u32) {
        self.baud_rate = baud_rate;
    }

    #[must_use]
    pub fn flags(&self) -> &BusFlags {
        &self.flags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_start_clear() {
        let flags = BusFlags::new();
        assert!(!flags.is_enabled());
        assert!(!flags.is_busy());
    }

    #[test]
    fn enabled_flag_round_trip() {
        let flags = BusFlags::new();
        flags.set_enabled(true);
        assert!(flags.is_enabled());
        flags.set_enabled(false);
        assert!(!flags.is_enabled());
    }

    #[test]
    fn busy_claim_is_exclusive() {
        let flags = BusFlags::new();
        assert!(flags.try_acquire_busy());
        assert!(!flags.try_acquire_busy());
        flags.release_busy();
        assert!(flags.try_acquire_busy());
    }

    #[test]
    fn busy_does_not_disturb_enabled() {
        let flags = BusFlags::new();
        flags.set_enabled(true);
        assert!(flags.try_acquire_busy());
        flags.release_busy();
        assert!(flags.is_enabled());
    }

    #[test]
    fn descriptor_tracks_baud() {
        let mut desc = BusDescriptor::new(InstanceId::new(2));
        assert_eq!(desc.id().index(), 2);
        assert_eq!(desc.baud_rate(), 0);
        desc.set_baud_rate(400_000);
        assert_eq!(desc.baud_rate(), 400_000);
    }
}
