//! Slice configuration and export errors.

use std::io;

use thiserror::Error;

use super::class::SliceType;
use crate::net::{NetError, NodeId};

#[derive(Debug, Error)]
pub enum SliceError {
    #[error("source node pool is empty")]
    EmptySources,
    #[error("sink node pool is empty")]
    EmptySinks,
    #[error("zero slices requested")]
    ZeroSlices,
    #[error("no source/sink pair with distinct nodes (both pools only contain {0:?})")]
    NoDistinctPair(NodeId),
    #[error("slice needs at least one application")]
    ZeroApps,
    #[error("{requested} applications exceed the per-slice port stride of {max}")]
    TooManyApps { requested: u32, max: u32 },
    #[error("slice {0} exhausts the port range")]
    PortRangeExhausted(u32),
    #[error("source and sink of a slice must differ (both {0:?})")]
    SameSourceAndSink(NodeId),
    #[error("invalid time window: start {start_s}s, stop {stop_s}s")]
    InvalidWindow { start_s: f64, stop_s: f64 },
    #[error("simulation duration must be positive")]
    ZeroDuration,
    #[error("invalid rate range for {class}: {min}..{max} Mbps")]
    InvalidRateRange { class: SliceType, min: f64, max: f64 },
    #[error("invalid packet size range for {class}: {min}..{max} bytes")]
    InvalidPacketSizeRange { class: SliceType, min: u32, max: u32 },
    #[error("invalid class probabilities: {0}")]
    InvalidProbabilities(String),
    #[error("slice {0} is not configured")]
    NotConfigured(u32),
    #[error("slice {0} already installed its applications")]
    AlreadyInstalled(u32),
    #[error("invalid background traffic: {0}")]
    InvalidBackground(String),
    #[error(transparent)]
    Net(#[from] NetError),
    #[error("failed to export OWD records: {0}")]
    Io(#[from] io::Error),
}
