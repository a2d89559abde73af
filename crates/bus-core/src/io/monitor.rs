//! Passive OUT-cycle monitor used for diagnostics.

use std::collections::VecDeque;

use crate::io::controller::{IoController, IoEvent, IoMode};
use crate::io::ports::PortTable;
use crate::status::Observation;

/// Committed OUT cycles kept in the journal before the oldest is dropped.
pub const JOURNAL_CAPACITY: usize = 256;

/// Checkpoint values kept before the oldest is dropped.
pub const CHECKPOINT_CAPACITY: usize = 256;

/// One committed OUT cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct JournalEntry {
    /// Tick of the T3 that latched the value.
    pub tick: u64,
    /// Output port.
    pub port: u8,
    /// Value written.
    pub value: u8,
}

/// Non-arbitrating I/O controller plus a bounded journal of what it saw.
#[derive(Debug, Clone)]
pub struct IoMonitor {
    mirror: IoController,
    checkpoint_port: u8,
    journal: VecDeque<JournalEntry>,
    checkpoints: VecDeque<u8>,
}

impl IoMonitor {
    /// Creates a monitor that records checkpoint writes to `checkpoint_port`.
    #[must_use]
    pub fn new(checkpoint_port: u8) -> Self {
        Self {
            mirror: IoController::new(IoMode::Passive, PortTable::new()),
            checkpoint_port,
            journal: VecDeque::with_capacity(JOURNAL_CAPACITY),
            checkpoints: VecDeque::with_capacity(CHECKPOINT_CAPACITY),
        }
    }

    /// φ2 step. Never drives the bus.
    pub fn sample(&mut self, obs: &Observation, bus: Option<u8>) -> Option<JournalEntry> {
        let IoEvent::OutputLatched { port, value } = self.mirror.sample(obs, bus)? else {
            return None;
        };
        if self.journal.len() == JOURNAL_CAPACITY {
            self.journal.pop_front();
        }
        let entry = JournalEntry {
            tick: obs.tick,
            port,
            value,
        };
        self.journal.push_back(entry);
        if port == self.checkpoint_port {
            if self.checkpoints.len() == CHECKPOINT_CAPACITY {
                self.checkpoints.pop_front();
            }
            self.checkpoints.push_back(value);
        }
        Some(entry)
    }

    /// Last value seen written to `port`.
    #[must_use]
    pub const fn mirrored(&self, port: u8) -> u8 {
        self.mirror.table().output(port)
    }

    /// Most recent OUT cycles, oldest first.
    pub fn journal(&self) -> impl Iterator<Item = &JournalEntry> + '_ {
        self.journal.iter()
    }

    /// Most recent values written to the checkpoint port, oldest first.
    pub fn checkpoints(&self) -> impl Iterator<Item = u8> + '_ {
        self.checkpoints.iter().copied()
    }

    /// Clears the mirror, journal and checkpoint history.
    pub fn reset(&mut self) {
        self.mirror.reset();
        self.journal.clear();
        self.checkpoints.clear();
    }
}
