//! Offline analysis of Intel 8008 bus logic-analyzer captures.

/// CSV capture parsing.
pub mod capture;
pub use capture::{parse_capture, read_capture, Capture, CaptureError, Sample};

/// State, INT edge, glitch and fetch analyses.
pub mod analysis;
pub use analysis::{
    find_glitches, int_edges, trace_fetches, trace_states, DataGlitch, EnableGlitch, FetchRecord,
    GlitchReport, IntEdge, StateRecord, TimeWindow,
};

#[cfg(test)]
use tempfile as _;
