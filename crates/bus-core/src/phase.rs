//! Two-phase non-overlapping clock derived from a master tick.

/// Master ticks that make up one processor clock period (one φ1/φ2 pair).
pub const MASTER_TICKS_PER_PERIOD: u8 = 4;

/// One of the two processor clock phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Drive phase: peripherals present drive requests and the bus is resolved.
    Phi1,
    /// Sample phase: peripherals latch from the resolved bus.
    Phi2,
}

/// Levels of both phases during one master tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PhaseLevels {
    /// φ1 level.
    pub phi1: bool,
    /// φ2 level.
    pub phi2: bool,
}

impl PhaseLevels {
    /// Returns the phase that is high, if any.
    #[must_use]
    pub const fn active(self) -> Option<Phase> {
        match (self.phi1, self.phi2) {
            (true, false) => Some(Phase::Phi1),
            (false, true) => Some(Phase::Phi2),
            _ => None,
        }
    }
}

/// Divides the master clock into φ1-high, gap, φ2-high, gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PhaseGenerator {
    master_ticks: u64,
}

impl PhaseGenerator {
    /// Creates a generator positioned at the start of a clock period.
    #[must_use]
    pub const fn new() -> Self {
        Self { master_ticks: 0 }
    }

    /// Returns the phase levels for the current master tick and advances.
    pub fn tick(&mut self) -> PhaseLevels {
        let slot = self.master_ticks % u64::from(MASTER_TICKS_PER_PERIOD);
        self.master_ticks = self.master_ticks.wrapping_add(1);
        PhaseLevels {
            phi1: slot == 0,
            phi2: slot == 2,
        }
    }

    /// Master ticks elapsed since construction or reset.
    #[must_use]
    pub const fn master_ticks(&self) -> u64 {
        self.master_ticks
    }

    /// Realigns to the start of a clock period.
    pub fn reset(&mut self) {
        self.master_ticks = 0;
    }
}
