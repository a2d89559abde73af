use thiserror::Error;

use crate::arbiter::DriverSet;
use crate::interrupt::InterruptOrigin;
use crate::io::PortDirection;

/// Fault classes used for diagnostics aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum FaultClass {
    /// More than one peripheral tried to drive the bus.
    Protocol,
    /// A handshake left its required order.
    Sequencing,
}

/// Protocol invariant violations detected while stepping the bus.
///
/// None of these are reachable when every peer follows the protocol; they are
/// reported, never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum BusFault {
    /// Several drivers requested the bus in the same tick.
    #[error("bus contention between {drivers}")]
    Contention {
        /// Every driver that requested the bus.
        drivers: DriverSet,
    },
    /// The processor left the acknowledge cycle before the RST opcode was fetched.
    #[error("interrupt acknowledge for {origin} abandoned before the opcode was fetched")]
    AcknowledgeAborted {
        /// Request whose acknowledge was cut short.
        origin: InterruptOrigin,
    },
}

impl BusFault {
    /// Returns the diagnostics class for this fault.
    #[must_use]
    pub const fn class(self) -> FaultClass {
        match self {
            Self::Contention { .. } => FaultClass::Protocol,
            Self::AcknowledgeAborted { .. } => FaultClass::Sequencing,
        }
    }
}

/// Rejected configuration or host-side misuse of the system API.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
pub enum ConfigError {
    /// ROM/RAM sizes do not form a valid two-region map.
    #[error("invalid memory layout: rom {rom_size:#06x} bytes, ram {ram_size:#06x} bytes")]
    InvalidMemoryLayout {
        /// Requested ROM size.
        rom_size: u16,
        /// Requested RAM size.
        ram_size: u16,
    },
    /// ROM image does not fit the ROM region.
    #[error("rom image of {len} bytes exceeds rom capacity of {capacity} bytes")]
    RomImageTooLarge {
        /// Image length.
        len: usize,
        /// ROM region size.
        capacity: usize,
    },
    /// Interrupt source count outside `1..=8`.
    #[error("interrupt controller needs 1 to 8 sources, got {count}")]
    InvalidSourceCount {
        /// Requested source count.
        count: usize,
    },
    /// RST vector outside `0..=7`.
    #[error("rst vector {vector} is out of range")]
    InvalidVector {
        /// Requested vector.
        vector: u8,
    },
    /// Debounce window of zero cycles.
    #[error("debounce window must be at least one cycle")]
    ZeroDebounceWindow,
    /// Port number outside `0..=31`.
    #[error("port {port} is out of range")]
    PortOutOfRange {
        /// Requested port.
        port: u8,
    },
    /// Port assigned to the wrong input/output group.
    #[error("port {port} is not an {expected} port")]
    PortWrongGroup {
        /// Requested port.
        port: u8,
        /// Group the role requires.
        expected: PortDirection,
    },
    /// Host tried to set a port it does not own.
    #[error("port {port} is not a host-driven input")]
    NotHostInput {
        /// Requested port.
        port: u8,
    },
    /// Two roles mapped onto the same port.
    #[error("port {port} is assigned more than once")]
    PortConflict {
        /// Shared port.
        port: u8,
    },
    /// Button index with no configured interrupt source.
    #[error("no interrupt source with index {index}")]
    UnknownInterruptSource {
        /// Requested source index.
        index: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::{BusFault, ConfigError, FaultClass};
    use crate::arbiter::{Driver, DriverSet};
    use crate::interrupt::InterruptOrigin;
    use crate::io::PortDirection;

    #[test]
    fn class_mapping_matches_fault_taxonomy() {
        let contention = BusFault::Contention {
            drivers: DriverSet::EMPTY.with(Driver::Memory).with(Driver::Io),
        };
        assert_eq!(contention.class(), FaultClass::Protocol);
        let aborted = BusFault::AcknowledgeAborted {
            origin: InterruptOrigin::Startup,
        };
        assert_eq!(aborted.class(), FaultClass::Sequencing);
    }

    #[test]
    fn messages_name_the_offending_parties() {
        let contention = BusFault::Contention {
            drivers: DriverSet::EMPTY.with(Driver::Core).with(Driver::Memory),
        };
        assert_eq!(contention.to_string(), "bus contention between core+memory");

        let aborted = BusFault::AcknowledgeAborted {
            origin: InterruptOrigin::Source(2),
        };
        assert!(aborted.to_string().contains("source 2"));

        let group = ConfigError::PortWrongGroup {
            port: 3,
            expected: PortDirection::Output,
        };
        assert_eq!(group.to_string(), "port 3 is not an output port");
    }
}
