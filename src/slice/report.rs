//! Per-slice statistics.

use serde::Serialize;

use super::class::SliceType;
use crate::sim::SimTime;

/// Min/max/average of a set of one-way delays, in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct OwdSummary {
    pub count: u64,
    pub min_ms: f64,
    pub max_ms: f64,
    pub avg_ms: f64,
}

impl OwdSummary {
    /// An empty sample set summarizes to all zeros.
    pub fn from_samples(samples: impl IntoIterator<Item = SimTime>) -> Self {
        let mut count = 0u64;
        let mut min = SimTime::MAX;
        let mut max = SimTime::ZERO;
        let mut sum_ms = 0.0;
        for s in samples {
            count += 1;
            min = min.min(s);
            max = max.max(s);
            sum_ms += s.as_millis_f64();
        }
        if count == 0 {
            return Self::default();
        }
        Self {
            count,
            min_ms: min.as_millis_f64(),
            max_ms: max.as_millis_f64(),
            avg_ms: sum_ms / count as f64,
        }
    }
}

/// Aggregated counters of one slice's generator/sink pairs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SliceReport {
    pub slice_id: u32,
    pub class: SliceType,
    pub source: String,
    pub sink: String,
    pub num_apps: u32,
    pub start_s: f64,
    pub stop_s: f64,
    pub sent_packets: u64,
    pub sent_bytes: u64,
    pub received_packets: u64,
    pub received_bytes: u64,
    /// `sent - received`; packets still in flight at the horizon are counted here too.
    pub dropped_packets: u64,
    pub owd: OwdSummary,
}
