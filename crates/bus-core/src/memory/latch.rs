//! Address latch for the two address bytes of a memory cycle.

use crate::memory::map::ADDRESS_MASK;
use crate::status::CycleType;

/// Two-part address latch assembled across T1 and T2 of one bus cycle.
///
/// Both halves are invalidated at the start of every bus cycle, so an address
/// left over from an aborted cycle never reads as valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AddressLatch {
    low: Option<u8>,
    high: Option<u8>,
    cycle_type: Option<CycleType>,
}

impl AddressLatch {
    /// Creates an empty latch.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            low: None,
            high: None,
            cycle_type: None,
        }
    }

    /// Invalidates both halves at a cycle boundary.
    pub fn begin_cycle(&mut self) {
        *self = Self::new();
    }

    /// Captures the low address byte (T1).
    pub fn capture_low(&mut self, value: u8) {
        self.low = Some(value);
    }

    /// Captures the cycle type and high address bits (T2).
    ///
    /// Ignored if the low half of this cycle was never seen.
    pub fn capture_high(&mut self, value: u8) {
        if self.low.is_some() {
            self.high = Some(value & 0x3F);
            self.cycle_type = Some(CycleType::from_bus(value));
        }
    }

    /// Cycle type captured this cycle.
    #[must_use]
    pub const fn cycle_type(&self) -> Option<CycleType> {
        self.cycle_type
    }

    /// Returns `true` once T2 has been captured.
    #[must_use]
    pub const fn has_high(&self) -> bool {
        self.high.is_some()
    }

    /// Full 14-bit address, available only after both halves were captured
    /// in the same cycle.
    #[must_use]
    pub fn address(&self) -> Option<u16> {
        let low = self.low?;
        let high = self.high?;
        Some(((u16::from(high) << 8) | u16::from(low)) & ADDRESS_MASK)
    }
}

#[cfg(test)]
mod tests {
    use super::AddressLatch;
    use crate::status::CycleType;

    #[test]
    fn address_requires_both_halves() {
        let mut latch = AddressLatch::new();
        assert_eq!(latch.address(), None);
        latch.capture_low(0x34);
        assert_eq!(latch.address(), None);
        latch.capture_high(0b0101_0010);
        assert_eq!(latch.address(), Some(0x1234));
        assert_eq!(latch.cycle_type(), Some(CycleType::MemoryRead));
    }

    #[test]
    fn high_half_without_low_is_ignored() {
        let mut latch = AddressLatch::new();
        latch.capture_high(0xC8);
        assert!(!latch.has_high());
        assert_eq!(latch.cycle_type(), None);
    }

    #[test]
    fn new_cycle_discards_stale_halves() {
        let mut latch = AddressLatch::new();
        latch.capture_low(0x00);
        latch.capture_high(0x08);
        assert_eq!(latch.address(), Some(0x0800));

        latch.begin_cycle();
        latch.capture_low(0x10);
        assert_eq!(latch.address(), None);
    }
}
