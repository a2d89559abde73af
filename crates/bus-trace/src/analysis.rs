//! Analyses over a parsed capture, keyed on SYNC rising edges the same way
//! the bus-side peripherals latch status.

use std::collections::BTreeMap;

use i8008_bus::{decode_status, CycleState, CycleType};

use crate::capture::{Capture, Sample};

/// Optional time bounds in microseconds, both inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TimeWindow {
    /// Samples before this time are skipped.
    pub start_us: Option<f64>,
    /// Analysis stops after this time.
    pub end_us: Option<f64>,
}

impl TimeWindow {
    /// Window covering the whole capture.
    pub const ALL: Self = Self {
        start_us: None,
        end_us: None,
    };

    fn before(&self, sample: &Sample) -> bool {
        self.start_us.is_some_and(|start| sample.time_us() < start)
    }

    fn after(&self, sample: &Sample) -> bool {
        self.end_us.is_some_and(|end| sample.time_us() > end)
    }
}

fn state_of(sample: &Sample) -> Option<CycleState> {
    sample.status.map(decode_status)
}

fn sync_rising(prev: Option<bool>, sample: &Sample) -> bool {
    prev == Some(false) && sample.sync == Some(true)
}

/// One state entry, recorded at its SYNC rising edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateRecord {
    /// Sample line.
    pub line: usize,
    /// Sample time in microseconds.
    pub time_us: f64,
    /// Decoded state; `None` when the status lines were unknown.
    pub state: Option<CycleState>,
    /// Data bus at the edge.
    pub data: Option<u8>,
    /// INT at the edge.
    pub int: Option<bool>,
    /// 1-based bus cycle this state belongs to; 0 before the first T1/T1I.
    pub cycle: usize,
    /// Cycle type read from the bus when this state is T2.
    pub cycle_type: Option<CycleType>,
}

/// State-by-state trace inside `window`.
#[must_use]
pub fn trace_states(capture: &Capture, window: TimeWindow) -> Vec<StateRecord> {
    let mut records = Vec::new();
    let mut prev_sync = None;
    let mut cycle = 0;
    for sample in &capture.samples {
        if window.before(sample) {
            prev_sync = sample.sync;
            continue;
        }
        if window.after(sample) {
            break;
        }
        if sync_rising(prev_sync, sample) {
            let state = state_of(sample);
            if state.is_some_and(CycleState::starts_cycle) {
                cycle += 1;
            }
            let cycle_type = match state {
                Some(CycleState::T2) => sample.data.map(CycleType::from_bus),
                _ => None,
            };
            records.push(StateRecord {
                line: sample.line,
                time_us: sample.time_us(),
                state,
                data: sample.data,
                int: sample.int,
                cycle,
                cycle_type,
            });
        }
        prev_sync = sample.sync;
    }
    records
}

/// INT low-to-high transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntEdge {
    /// Sample line.
    pub line: usize,
    /// Sample time in microseconds.
    pub time_us: f64,
}

/// Every INT rising edge. The line is assumed low before the first sample.
#[must_use]
pub fn int_edges(capture: &Capture) -> Vec<IntEdge> {
    let mut prev = Some(false);
    let mut edges = Vec::new();
    for sample in &capture.samples {
        if prev == Some(false) && sample.int == Some(true) {
            edges.push(IntEdge {
                line: sample.line,
                time_us: sample.time_us(),
            });
        }
        prev = sample.int;
    }
    edges
}

/// Several data values seen within one state.
#[derive(Debug, Clone, PartialEq)]
pub struct DataGlitch {
    /// First line of the state.
    pub first_line: usize,
    /// Line that ended the state.
    pub end_line: usize,
    /// Time the state ended, in microseconds.
    pub time_us: f64,
    /// State the values were seen in.
    pub state: Option<CycleState>,
    /// Distinct values with their sample counts, ascending by value.
    pub values: Vec<(u8, usize)>,
}

/// `CP_D_EN` toggled while SYNC held its level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnableGlitch {
    /// Sample line.
    pub line: usize,
    /// Sample time in microseconds.
    pub time_us: f64,
    /// Previous level.
    pub from: Option<bool>,
    /// New level.
    pub to: Option<bool>,
    /// State decoded at the toggle.
    pub state: Option<CycleState>,
}

/// Result of [`find_glitches`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GlitchReport {
    /// Samples examined.
    pub samples: usize,
    /// Data-bus changes within a state.
    pub data: Vec<DataGlitch>,
    /// Enable toggles within a SYNC level.
    pub enable: Vec<EnableGlitch>,
}

impl GlitchReport {
    /// Returns `true` when nothing was found.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.data.is_empty() && self.enable.is_empty()
    }
}

#[derive(Default)]
struct StateWindow {
    first_line: usize,
    state: Option<CycleState>,
    values: BTreeMap<u8, usize>,
}

impl StateWindow {
    fn close(&mut self, end: &Sample) -> Option<DataGlitch> {
        let values = std::mem::take(&mut self.values);
        (values.len() > 1).then(|| DataGlitch {
            first_line: self.first_line,
            end_line: end.line,
            time_us: end.time_us(),
            state: self.state,
            values: values.into_iter().collect(),
        })
    }
}

/// Looks for bus contention symptoms inside `window`: the data bus changing
/// within one state and, when captured, `CP_D_EN` toggling between SYNC edges.
#[must_use]
pub fn find_glitches(capture: &Capture, window: TimeWindow) -> GlitchReport {
    let mut report = GlitchReport::default();
    let mut current = StateWindow::default();
    let mut prev_sync = None;
    let mut prev_enable = None;
    let mut last = None;

    for sample in &capture.samples {
        if window.before(sample) {
            continue;
        }
        if window.after(sample) {
            break;
        }
        report.samples += 1;

        if sync_rising(prev_sync, sample) {
            report.data.extend(current.close(sample));
            current.first_line = sample.line;
            current.state = state_of(sample);
        }
        if let Some(value) = sample.data {
            *current.values.entry(value).or_insert(0) += 1;
        }

        if capture.has_enable
            && sample.cp_d_en != prev_enable
            && sample.sync.is_some()
            && prev_sync == sample.sync
        {
            report.enable.push(EnableGlitch {
                line: sample.line,
                time_us: sample.time_us(),
                from: prev_enable,
                to: sample.cp_d_en,
                state: state_of(sample),
            });
        }

        prev_sync = sample.sync;
        prev_enable = sample.cp_d_en;
        last = Some(sample);
    }
    if let Some(end) = last {
        report.data.extend(current.close(end));
    }
    report
}

/// Opcode fetched by one instruction-fetch cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FetchRecord {
    /// Line of the cycle's T1/T1I edge.
    pub line: usize,
    /// Time of the T1/T1I edge in microseconds.
    pub time_us: f64,
    /// Byte on the bus at the T3 edge.
    pub opcode: u8,
    /// Fetched by an interrupt-acknowledge cycle.
    pub acknowledge: bool,
}

struct OpenFetch {
    line: usize,
    time_us: f64,
    acknowledge: bool,
    cycle_type: Option<CycleType>,
    opcode: Option<u8>,
}

impl OpenFetch {
    fn finish(self) -> Option<FetchRecord> {
        if self.cycle_type != Some(CycleType::InstructionFetch) {
            return None;
        }
        self.opcode.map(|opcode| FetchRecord {
            line: self.line,
            time_us: self.time_us,
            opcode,
            acknowledge: self.acknowledge,
        })
    }
}

/// Instruction fetches from the first interrupt acknowledge onward, up to `max`.
///
/// The acknowledge cycle itself is reported, so the first record carries the
/// injected RST opcode.
#[must_use]
pub fn trace_fetches(capture: &Capture, max: usize) -> Vec<FetchRecord> {
    let mut records = Vec::new();
    let mut prev_sync = None;
    let mut open: Option<OpenFetch> = None;
    let mut acknowledged = false;

    for sample in &capture.samples {
        if records.len() >= max {
            return records;
        }
        let rising = sync_rising(prev_sync, sample);
        prev_sync = sample.sync;
        if !rising {
            continue;
        }
        match state_of(sample) {
            Some(state @ (CycleState::T1 | CycleState::T1I)) => {
                acknowledged |= state == CycleState::T1I;
                if !acknowledged {
                    continue;
                }
                records.extend(open.take().and_then(OpenFetch::finish));
                open = Some(OpenFetch {
                    line: sample.line,
                    time_us: sample.time_us(),
                    acknowledge: state == CycleState::T1I,
                    cycle_type: None,
                    opcode: None,
                });
            }
            Some(CycleState::T2) => {
                if let Some(fetch) = open.as_mut() {
                    fetch.cycle_type = sample.data.map(CycleType::from_bus);
                }
            }
            Some(CycleState::T3) => {
                if let Some(fetch) = open.as_mut() {
                    fetch.opcode = fetch.opcode.or(sample.data);
                }
            }
            _ => {}
        }
    }
    records.extend(open.and_then(OpenFetch::finish));
    records.truncate(max);
    records
}
