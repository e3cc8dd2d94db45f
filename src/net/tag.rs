//! Side-channel packet tags.
//!
//! Tags ride along with a packet through links and queues but are not part of
//! the payload and never count towards `size_bytes`.

use crate::sim::SimTime;

/// Send timestamp stamped by the traffic generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeTag {
    pub sent_at: SimTime,
}

/// Per-hop metadata attached while a packet sits inside a queue disc.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetadataTag {
    pub ingress: SimTime,
    pub port: u32,
}
