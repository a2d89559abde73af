//! Status-line decoding: T-state classification, cycle-type tags and SYNC sampling.
//!
//! The processor announces its current state on three status lines `S2 S1 S0`
//! and pulses SYNC once per state. Every peripheral decodes the same lines
//! independently; the helpers here are the shared, stateless part of that
//! decoding plus the SYNC-edge latch peripherals embed for a glitch-free view.

/// Symbolic processor state decoded from the status lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum CycleState {
    /// First address state of a bus cycle (low address byte out).
    T1,
    /// First address state of an interrupt-acknowledge cycle.
    T1I,
    /// Second address state (cycle type and high address bits out).
    T2,
    /// Data transfer state.
    T3,
    /// Internal execution state.
    T4,
    /// Internal execution state.
    T5,
    /// Halted, waiting for an interrupt.
    #[default]
    Stopped,
    /// Waiting for READY.
    Wait,
}

/// Canonical `S2 S1 S0` encoding table (S2 is bit 2).
pub const STATUS_ENCODING_TABLE: [(u8, CycleState); 8] = [
    (0b010, CycleState::T1),
    (0b110, CycleState::T1I),
    (0b100, CycleState::T2),
    (0b001, CycleState::T3),
    (0b111, CycleState::T4),
    (0b101, CycleState::T5),
    (0b011, CycleState::Stopped),
    (0b000, CycleState::Wait),
];

impl CycleState {
    /// Returns the `S2 S1 S0` pattern the processor drives for this state.
    #[must_use]
    pub const fn status_bits(self) -> u8 {
        match self {
            Self::T1 => 0b010,
            Self::T1I => 0b110,
            Self::T2 => 0b100,
            Self::T3 => 0b001,
            Self::T4 => 0b111,
            Self::T5 => 0b101,
            Self::Stopped => 0b011,
            Self::Wait => 0b000,
        }
    }

    /// Returns `true` for the two states that open a bus cycle.
    #[must_use]
    pub const fn starts_cycle(self) -> bool {
        matches!(self, Self::T1 | Self::T1I)
    }

    /// Short mnemonic used in traces.
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::T1 => "T1",
            Self::T1I => "T1I",
            Self::T2 => "T2",
            Self::T3 => "T3",
            Self::T4 => "T4",
            Self::T5 => "T5",
            Self::Stopped => "STOPPED",
            Self::Wait => "WAIT",
        }
    }
}

/// Decodes the 3-bit status value into a [`CycleState`].
///
/// Only the low three bits are considered.
#[must_use]
pub const fn decode_status(bits: u8) -> CycleState {
    match bits & 0b111 {
        0b010 => CycleState::T1,
        0b110 => CycleState::T1I,
        0b100 => CycleState::T2,
        0b001 => CycleState::T3,
        0b111 => CycleState::T4,
        0b101 => CycleState::T5,
        0b011 => CycleState::Stopped,
        _ => CycleState::Wait,
    }
}

/// Bus cycle classification carried on D7:D6 during T2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum CycleType {
    /// Instruction fetch (PCI).
    InstructionFetch,
    /// Memory data read (PCR).
    MemoryRead,
    /// I/O port operation (PCC).
    IoOperation,
    /// Memory data write (PCW).
    MemoryWrite,
}

impl CycleType {
    /// Extracts the cycle type from a T2 bus byte.
    #[must_use]
    pub const fn from_bus(value: u8) -> Self {
        match value >> 6 {
            0b00 => Self::InstructionFetch,
            0b01 => Self::MemoryRead,
            0b10 => Self::IoOperation,
            _ => Self::MemoryWrite,
        }
    }

    /// Returns the 2-bit tag placed on D7:D6.
    #[must_use]
    pub const fn tag(self) -> u8 {
        match self {
            Self::InstructionFetch => 0b00,
            Self::MemoryRead => 0b01,
            Self::IoOperation => 0b10,
            Self::MemoryWrite => 0b11,
        }
    }

    /// Cycles whose T3 data comes from memory.
    #[must_use]
    pub const fn reads_memory(self) -> bool {
        matches!(self, Self::InstructionFetch | Self::MemoryRead)
    }

    /// Short mnemonic used in traces (datasheet names).
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::InstructionFetch => "PCI",
            Self::MemoryRead => "PCR",
            Self::IoOperation => "PCC",
            Self::MemoryWrite => "PCW",
        }
    }
}

/// One decoded status snapshot shared by every peripheral for a single tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Observation {
    /// Monotonic tick index since construction.
    pub tick: u64,
    /// State decoded from the status lines this tick.
    pub state: CycleState,
    /// SYNC level this tick.
    pub sync: bool,
    /// SYNC went low-to-high on this tick.
    pub sync_rising: bool,
}

impl Observation {
    /// Returns `true` when this tick opens a new bus cycle.
    #[must_use]
    pub const fn cycle_start(&self) -> bool {
        self.sync_rising && self.state.starts_cycle()
    }
}

/// SYNC-edge sampler that holds the state seen on the last rising edge.
///
/// Status can glitch between edges; owners that need a stable view read
/// [`SyncLatch::current`] or consume fresh samples with [`SyncLatch::take`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncLatch {
    prev_sync: bool,
    sampled: Option<CycleState>,
    fresh: bool,
}

impl SyncLatch {
    /// Creates an empty latch.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            prev_sync: false,
            sampled: None,
            fresh: false,
        }
    }

    /// Feeds one tick of status and SYNC; returns `true` if a new sample was latched.
    pub fn sample(&mut self, state: CycleState, sync: bool) -> bool {
        let rising = sync && !self.prev_sync;
        self.prev_sync = sync;
        if rising {
            self.sampled = Some(state);
            self.fresh = true;
        }
        rising
    }

    /// State captured on the most recent SYNC rising edge.
    #[must_use]
    pub const fn current(&self) -> Option<CycleState> {
        self.sampled
    }

    /// Returns the latched state once per SYNC edge.
    pub fn take(&mut self) -> Option<CycleState> {
        if self.fresh {
            self.fresh = false;
            self.sampled
        } else {
            None
        }
    }

    /// Stable state for `obs`: the fresh decode on a SYNC rising edge, the
    /// latched sample between edges.
    ///
    /// Valid both before and after [`SyncLatch::sample`] has seen `obs`.
    #[must_use]
    pub const fn settled(&self, obs: &Observation) -> Option<CycleState> {
        if obs.sync_rising {
            Some(obs.state)
        } else {
            self.sampled
        }
    }

    /// Drops the latched sample.
    pub fn clear(&mut self) {
        self.sampled = None;
        self.fresh = false;
    }
}

/// System-level decoder: tracks SYNC edges, bus-cycle boundaries and glitches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusDecoder {
    latch: SyncLatch,
    tick: u64,
    cycle_type: Option<CycleType>,
    cycle_type_pending: bool,
}

impl StatusDecoder {
    /// Creates a decoder in its reset state.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            latch: SyncLatch::new(),
            tick: 0,
            cycle_type: None,
            cycle_type_pending: false,
        }
    }

    /// Decodes one tick of status lines and SYNC into a shared [`Observation`].
    pub fn observe(&mut self, status: u8, sync: bool) -> Observation {
        let state = decode_status(status);
        let sync_rising = self.latch.sample(state, sync);
        let tick = self.tick;
        self.tick = self.tick.wrapping_add(1);
        if sync_rising && state.starts_cycle() {
            self.cycle_type_pending = true;
        }
        Observation {
            tick,
            state,
            sync,
            sync_rising,
        }
    }

    /// Captures the cycle-type tag once per bus cycle, on the first T2 tick.
    ///
    /// Returns the tag when it was captured on this call.
    pub fn capture_cycle_type(&mut self, obs: &Observation, bus: Option<u8>) -> Option<CycleType> {
        if obs.state != CycleState::T2 || !self.cycle_type_pending {
            return None;
        }
        let value = bus?;
        self.cycle_type_pending = false;
        let cycle_type = CycleType::from_bus(value);
        self.cycle_type = Some(cycle_type);
        Some(cycle_type)
    }

    /// Cycle type of the current (or last) bus cycle.
    #[must_use]
    pub const fn cycle_type(&self) -> Option<CycleType> {
        self.cycle_type
    }

    /// State latched on the last SYNC rising edge.
    #[must_use]
    pub const fn stable_state(&self) -> Option<CycleState> {
        self.latch.current()
    }

    /// Returns `true` when `obs` disagrees with the SYNC-latched state between edges.
    #[must_use]
    pub fn is_glitch(&self, obs: &Observation) -> bool {
        !obs.sync_rising && self.latch.current().is_some_and(|stable| stable != obs.state)
    }

    /// Returns the decoder to its reset state, keeping the tick counter.
    pub fn reset(&mut self) {
        let tick = self.tick;
        *self = Self::new();
        self.tick = tick;
    }
}
