//! Two-stage synchronizer followed by a stability counter.

/// Transition of the debounced level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Edge {
    /// Low to high (press).
    Rising,
    /// High to low (release).
    Falling,
}

/// Debounce state for one raw input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Debouncer {
    window: u32,
    stages: [bool; 2],
    stable_for: u32,
    level: bool,
}

impl Debouncer {
    /// Creates a debouncer that accepts a level held for `window` ticks.
    ///
    /// A zero window is treated as one.
    #[must_use]
    pub const fn new(window: u32) -> Self {
        Self {
            window: if window == 0 { 1 } else { window },
            stages: [false; 2],
            stable_for: 0,
            level: false,
        }
    }

    /// Debounced level.
    #[must_use]
    pub const fn level(&self) -> bool {
        self.level
    }

    /// Clocks one raw sample through; returns the edge pulse, if any.
    pub fn tick(&mut self, raw: bool) -> Option<Edge> {
        let synced = self.stages[1];
        self.stages = [raw, self.stages[0]];

        if synced == self.level {
            self.stable_for = 0;
            return None;
        }
        self.stable_for += 1;
        if self.stable_for < self.window {
            return None;
        }
        self.stable_for = 0;
        self.level = synced;
        Some(if synced { Edge::Rising } else { Edge::Falling })
    }

    /// Returns to the released state.
    pub fn reset(&mut self) {
        *self = Self::new(self.window);
    }
}
