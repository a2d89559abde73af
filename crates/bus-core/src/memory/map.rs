//! Two-region ROM/RAM map over the 14-bit address space.

use crate::ConfigError;

/// Size of the processor's address space in bytes (14 address bits).
pub const ADDRESS_SPACE_BYTES: usize = 0x4000;

/// Mask applied to assembled addresses.
pub const ADDRESS_MASK: u16 = 0x3FFF;

/// Byte returned for reads outside both regions.
pub const UNMAPPED_READ_VALUE: u8 = 0xFF;

/// Region classification for a 14-bit address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum MemoryRegion {
    /// Read-only program store at the bottom of the map.
    Rom,
    /// Read/write store directly above ROM.
    Ram,
    /// Outside both regions.
    Unmapped,
}

/// ROM/RAM sizing. RAM starts immediately after ROM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct MemoryLayout {
    /// ROM size in bytes.
    pub rom_size: u16,
    /// RAM size in bytes.
    pub ram_size: u16,
}

impl Default for MemoryLayout {
    fn default() -> Self {
        Self::STANDARD
    }
}

impl MemoryLayout {
    /// 2 KiB ROM at `0x0000`, 1 KiB RAM at `0x0800`.
    pub const STANDARD: Self = Self {
        rom_size: 0x0800,
        ram_size: 0x0400,
    };

    /// 4 KiB ROM at `0x0000`, 2 KiB RAM at `0x1000`.
    pub const EXTENDED: Self = Self {
        rom_size: 0x1000,
        ram_size: 0x0800,
    };

    /// First RAM address.
    #[must_use]
    pub const fn ram_base(&self) -> u16 {
        self.rom_size
    }

    /// Inclusive last RAM address.
    #[must_use]
    pub const fn ram_end(&self) -> u16 {
        self.rom_size + self.ram_size - 1
    }

    /// Checks that both regions are non-empty powers of two, RAM is aligned
    /// to its own size and the whole map fits in 14 bits.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidMemoryLayout`] when any rule is broken.
    pub const fn validate(&self) -> Result<(), ConfigError> {
        let rom = self.rom_size;
        let ram = self.ram_size;
        let valid = rom.is_power_of_two()
            && ram.is_power_of_two()
            && rom % ram == 0
            && (rom as usize) + (ram as usize) <= ADDRESS_SPACE_BYTES;
        if valid {
            Ok(())
        } else {
            Err(ConfigError::InvalidMemoryLayout {
                rom_size: rom,
                ram_size: ram,
            })
        }
    }

    /// Decodes an address into its region. Bits above the 14-bit space are ignored.
    #[must_use]
    pub const fn decode(&self, addr: u16) -> MemoryRegion {
        let addr = addr & ADDRESS_MASK;
        if addr < self.rom_size {
            MemoryRegion::Rom
        } else if addr - self.rom_size < self.ram_size {
            MemoryRegion::Ram
        } else {
            MemoryRegion::Unmapped
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{MemoryLayout, MemoryRegion};
    use crate::ConfigError;

    #[rstest]
    #[case(MemoryLayout::STANDARD, 0x0000, MemoryRegion::Rom)]
    #[case(MemoryLayout::STANDARD, 0x07FF, MemoryRegion::Rom)]
    #[case(MemoryLayout::STANDARD, 0x0800, MemoryRegion::Ram)]
    #[case(MemoryLayout::STANDARD, 0x0BFF, MemoryRegion::Ram)]
    #[case(MemoryLayout::STANDARD, 0x0C00, MemoryRegion::Unmapped)]
    #[case(MemoryLayout::STANDARD, 0x3FFF, MemoryRegion::Unmapped)]
    #[case(MemoryLayout::EXTENDED, 0x0800, MemoryRegion::Rom)]
    #[case(MemoryLayout::EXTENDED, 0x1000, MemoryRegion::Ram)]
    #[case(MemoryLayout::EXTENDED, 0x17FF, MemoryRegion::Ram)]
    #[case(MemoryLayout::EXTENDED, 0x1800, MemoryRegion::Unmapped)]
    fn region_decode_is_correct_at_boundaries(
        #[case] layout: MemoryLayout,
        #[case] addr: u16,
        #[case] expected: MemoryRegion,
    ) {
        assert_eq!(layout.decode(addr), expected);
    }

    #[test]
    fn decode_wraps_into_fourteen_bits() {
        let layout = MemoryLayout::STANDARD;
        assert_eq!(layout.decode(0x4000), MemoryRegion::Rom);
        assert_eq!(layout.decode(0x4800), MemoryRegion::Ram);
    }

    #[test]
    fn canonical_layouts_validate() {
        assert_eq!(MemoryLayout::STANDARD.validate(), Ok(()));
        assert_eq!(MemoryLayout::EXTENDED.validate(), Ok(()));
        assert_eq!(MemoryLayout::STANDARD.ram_base(), 0x0800);
        assert_eq!(MemoryLayout::EXTENDED.ram_end(), 0x17FF);
    }

    #[rstest]
    #[case(0x0000, 0x0400)]
    #[case(0x0800, 0x0000)]
    #[case(0x0600, 0x0200)]
    #[case(0x0400, 0x0800)]
    #[case(0x2000, 0x4000)]
    fn malformed_layouts_are_rejected(#[case] rom_size: u16, #[case] ram_size: u16) {
        let layout = MemoryLayout { rom_size, ram_size };
        assert_eq!(
            layout.validate(),
            Err(ConfigError::InvalidMemoryLayout { rom_size, ram_size })
        );
    }
}
