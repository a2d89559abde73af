//! Interrupt delivery: button debouncing, request sequencing and RST injection.

use std::fmt;

pub mod controller;
pub mod debounce;

pub use controller::{
    InterruptConfig, InterruptController, InterruptEvent, InterruptPhase, InterruptSourceConfig,
    MAX_INTERRUPT_SOURCES,
};
pub use debounce::{Debouncer, Edge};

/// Number of RST entry points.
pub const RST_VECTOR_COUNT: u8 = 8;

/// Which request an acknowledge belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum InterruptOrigin {
    /// The one-shot request raised after reset release.
    Startup,
    /// A button source, by index.
    Source(u8),
}

impl fmt::Display for InterruptOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Startup => f.write_str("startup"),
            Self::Source(index) => write!(f, "source {index}"),
        }
    }
}

/// `RST n` opcode: `00nnn101`.
#[must_use]
pub const fn rst_opcode(vector: u8) -> u8 {
    0x05 | ((vector & 0x07) << 3)
}

/// Entry address an `RST n` calls.
#[must_use]
pub const fn rst_target(vector: u8) -> u16 {
    (vector & 0x07) as u16 * 8
}
