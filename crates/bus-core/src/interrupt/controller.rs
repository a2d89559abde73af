//! Interrupt request/acknowledge state machine.
//!
//! `Startup -> Pending -> AckDrive -> Clear -> Idle`, then
//! `Idle -> Pending -> AckDrive -> Clear -> Idle` for every accepted source
//! request. The acknowledge cycle is recognized only through the SYNC-sampled
//! state, and the request is withdrawn only once the processor has moved past
//! the T3 in which the RST opcode was fetched.

use crate::interrupt::debounce::{Debouncer, Edge};
use crate::interrupt::{rst_opcode, InterruptOrigin, RST_VECTOR_COUNT};
use crate::status::{CycleState, Observation, SyncLatch};
use crate::{BusFault, ConfigError};

/// Upper bound on button sources (one status/mask bit each).
pub const MAX_INTERRUPT_SOURCES: usize = 8;

/// Active-source byte reported for the startup request.
pub const ACTIVE_STARTUP: u8 = 0x80;

/// Active-source byte reported while nothing is being delivered.
pub const ACTIVE_NONE: u8 = 0xFF;

/// Controller phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum InterruptPhase {
    /// Counting down the settle delay after reset release.
    #[default]
    Startup,
    /// No request in flight.
    Idle,
    /// INT asserted, waiting for the acknowledge cycle.
    Pending,
    /// Acknowledge cycle in progress; the opcode is driven during its T3.
    AckDrive,
    /// Request withdrawn; one tick of INT low before accepting the next.
    Clear,
}

/// One maskable button source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct InterruptSourceConfig {
    /// RST vector delivered for this source.
    pub vector: u8,
}

/// Interrupt controller parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct InterruptConfig {
    /// Ticks between reset release and the startup request.
    pub startup_delay_cycles: u32,
    /// Ticks a synchronized input must hold before its level is accepted.
    pub debounce_cycles: u32,
    /// RST vector of the startup request.
    pub startup_vector: u8,
    /// Button sources in priority order (index 0 wins).
    pub sources: Vec<InterruptSourceConfig>,
}

impl Default for InterruptConfig {
    fn default() -> Self {
        Self {
            startup_delay_cycles: 16,
            debounce_cycles: 8,
            startup_vector: 0,
            sources: vec![InterruptSourceConfig { vector: 1 }],
        }
    }
}

impl InterruptConfig {
    /// Checks source count, vectors and the debounce window.
    ///
    /// # Errors
    ///
    /// Returns the first violated [`ConfigError`] rule.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let count = self.sources.len();
        if count == 0 || count > MAX_INTERRUPT_SOURCES {
            return Err(ConfigError::InvalidSourceCount { count });
        }
        if self.debounce_cycles == 0 {
            return Err(ConfigError::ZeroDebounceWindow);
        }
        let vectors = std::iter::once(self.startup_vector)
            .chain(self.sources.iter().map(|source| source.vector));
        for vector in vectors {
            if vector >= RST_VECTOR_COUNT {
                return Err(ConfigError::InvalidVector { vector });
            }
        }
        Ok(())
    }

    fn full_mask(&self) -> u8 {
        // count is 1..=8 once validated
        (0..self.sources.len()).fold(0_u8, |mask, index| mask | (1 << index))
    }
}

/// Observable interrupt activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum InterruptEvent {
    /// Debounced level change on a source input.
    DebouncedEdge {
        /// Source index.
        source: u8,
        /// Direction of the change.
        edge: Edge,
    },
    /// A request was accepted and INT asserted.
    Raised {
        /// Accepted request.
        origin: InterruptOrigin,
        /// RST vector that will be injected.
        vector: u8,
    },
    /// The RST opcode was fetched and the request withdrawn.
    Acknowledged {
        /// Completed request.
        origin: InterruptOrigin,
        /// Vector delivered.
        vector: u8,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct InFlight {
    origin: InterruptOrigin,
    vector: u8,
}

/// Debouncers, pending/mask registers and the acknowledge sequencer.
#[derive(Debug, Clone)]
pub struct InterruptController {
    config: InterruptConfig,
    phase: InterruptPhase,
    settle_remaining: u32,
    sync: SyncLatch,
    debouncers: Vec<Debouncer>,
    inputs: Vec<bool>,
    pending: u8,
    mask: u8,
    in_flight: Option<InFlight>,
    opcode_fetched: bool,
    events: Vec<InterruptEvent>,
}

impl InterruptController {
    /// Creates a controller in its post-reset state.
    ///
    /// # Errors
    ///
    /// Propagates [`InterruptConfig::validate`] failures.
    pub fn new(config: InterruptConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let count = config.sources.len();
        let mut controller = Self {
            phase: InterruptPhase::Startup,
            settle_remaining: config.startup_delay_cycles,
            sync: SyncLatch::new(),
            debouncers: vec![Debouncer::new(config.debounce_cycles); count],
            inputs: vec![false; count],
            pending: 0,
            mask: config.full_mask(),
            in_flight: None,
            opcode_fetched: false,
            events: Vec::new(),
            config,
        };
        controller.reset();
        Ok(controller)
    }

    /// Configuration in use.
    #[must_use]
    pub const fn config(&self) -> &InterruptConfig {
        &self.config
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> InterruptPhase {
        self.phase
    }

    /// INT line level.
    #[must_use]
    pub const fn int_line(&self) -> bool {
        matches!(
            self.phase,
            InterruptPhase::Pending | InterruptPhase::AckDrive
        )
    }

    /// Origin of the request being delivered, if any.
    #[must_use]
    pub fn in_flight(&self) -> Option<InterruptOrigin> {
        self.in_flight.map(|active| active.origin)
    }

    /// Sets the raw level of a source input.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownInterruptSource`] for an unconfigured index.
    pub fn set_input(&mut self, index: usize, level: bool) -> Result<(), ConfigError> {
        let slot = self
            .inputs
            .get_mut(index)
            .ok_or(ConfigError::UnknownInterruptSource { index })?;
        *slot = level;
        Ok(())
    }

    /// Enable mask; bits above the source count are ignored.
    pub fn set_mask(&mut self, mask: u8) {
        self.mask = mask & self.config.full_mask();
    }

    /// Enable mask.
    #[must_use]
    pub const fn mask(&self) -> u8 {
        self.mask
    }

    /// Pending-source byte (bit per source).
    #[must_use]
    pub const fn status_byte(&self) -> u8 {
        self.pending
    }

    /// Active-source byte: source index, `0x80` for startup, `0xFF` when idle.
    #[must_use]
    pub fn active_byte(&self) -> u8 {
        match self.in_flight() {
            Some(InterruptOrigin::Startup) => ACTIVE_STARTUP,
            Some(InterruptOrigin::Source(index)) => index,
            None => ACTIVE_NONE,
        }
    }

    /// Drive request for the φ1 step: the RST opcode during T3 of the acknowledge cycle.
    #[must_use]
    pub fn drive_request(&self, obs: &Observation) -> Option<u8> {
        if self.phase != InterruptPhase::AckDrive
            || self.sync.settled(obs) != Some(CycleState::T3)
        {
            return None;
        }
        self.in_flight.map(|active| rst_opcode(active.vector))
    }

    /// φ2 step: debounce inputs and advance the acknowledge sequencer.
    ///
    /// # Errors
    ///
    /// Returns [`BusFault::AcknowledgeAborted`] when the processor opens a new
    /// cycle before the opcode's T3. The request is dropped, not retried.
    pub fn sample(&mut self, obs: &Observation) -> Result<(), BusFault> {
        self.sync.sample(obs.state, obs.sync);
        self.debounce_inputs();

        match self.phase {
            InterruptPhase::Startup => {
                self.settle_remaining = self.settle_remaining.saturating_sub(1);
                if self.settle_remaining == 0 {
                    self.raise(InterruptOrigin::Startup, self.config.startup_vector);
                }
                Ok(())
            }
            InterruptPhase::Idle => {
                self.accept_next();
                Ok(())
            }
            InterruptPhase::Pending => {
                if self.sync.take() == Some(CycleState::T1I) {
                    self.phase = InterruptPhase::AckDrive;
                    self.opcode_fetched = false;
                }
                Ok(())
            }
            InterruptPhase::AckDrive => self.track_acknowledge(),
            InterruptPhase::Clear => {
                self.in_flight = None;
                self.phase = InterruptPhase::Idle;
                Ok(())
            }
        }
    }

    /// Drains events produced since the last call.
    pub fn drain_events(&mut self) -> std::vec::Drain<'_, InterruptEvent> {
        self.events.drain(..)
    }

    /// Back to `Startup`: clears requests, restores the full mask and restarts
    /// the settle delay. Raw input levels are external and kept.
    pub fn reset(&mut self) {
        self.phase = InterruptPhase::Startup;
        self.settle_remaining = self.config.startup_delay_cycles;
        self.sync = SyncLatch::new();
        for debouncer in &mut self.debouncers {
            debouncer.reset();
        }
        self.pending = 0;
        self.mask = self.config.full_mask();
        self.in_flight = None;
        self.opcode_fetched = false;
        self.events.clear();
    }

    fn debounce_inputs(&mut self) {
        let lines = self.debouncers.iter_mut().zip(&self.inputs);
        for (index, (debouncer, raw)) in (0_u8..).zip(lines) {
            let Some(edge) = debouncer.tick(*raw) else {
                continue;
            };
            self.events.push(InterruptEvent::DebouncedEdge {
                source: index,
                edge,
            });
            let bit = 1_u8 << index;
            if self.mask & bit != 0 {
                self.pending |= bit;
            }
        }
    }

    fn accept_next(&mut self) {
        let ready = self.pending & self.mask;
        if ready == 0 {
            return;
        }
        let Ok(index) = u8::try_from(ready.trailing_zeros()) else {
            return;
        };
        let Some(source) = self.config.sources.get(usize::from(index)) else {
            return;
        };
        self.raise(InterruptOrigin::Source(index), source.vector);
    }

    /// Accepting a source request clears its pending bit, so an edge that
    /// arrives while it is being delivered queues a fresh request.
    fn raise(&mut self, origin: InterruptOrigin, vector: u8) {
        if let InterruptOrigin::Source(index) = origin {
            self.pending &= !(1 << index);
        }
        self.in_flight = Some(InFlight { origin, vector });
        self.phase = InterruptPhase::Pending;
        self.events.push(InterruptEvent::Raised { origin, vector });
    }

    fn track_acknowledge(&mut self) -> Result<(), BusFault> {
        let Some(state) = self.sync.take() else {
            return Ok(());
        };
        match state {
            CycleState::T3 => {
                self.opcode_fetched = true;
                Ok(())
            }
            CycleState::T2 | CycleState::Wait => Ok(()),
            _ if self.opcode_fetched => {
                self.withdraw();
                if let Some(active) = self.in_flight {
                    self.events.push(InterruptEvent::Acknowledged {
                        origin: active.origin,
                        vector: active.vector,
                    });
                }
                Ok(())
            }
            _ => {
                self.withdraw();
                let origin = self.in_flight.map_or(InterruptOrigin::Startup, |a| a.origin);
                Err(BusFault::AcknowledgeAborted { origin })
            }
        }
    }

    fn withdraw(&mut self) {
        self.phase = InterruptPhase::Clear;
    }
}
