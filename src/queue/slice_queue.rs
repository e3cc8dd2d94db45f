//! Multi-class slice scheduler.
//!
//! Packets are classified once at enqueue by their DSCP codepoint into one
//! bounded FIFO per slice type. Service is weighted round robin with a credit
//! per class: the class under the cursor is served until its credit runs out,
//! then its credit is refilled from its weight and the cursor moves on. A class
//! found empty during a scan is refilled as well, so idle classes cannot bank
//! credit. Classes with weight 0 are only served when no weighted class is
//! backlogged.

use tracing::{debug, info, trace, warn};

use crate::net::{MetadataTag, Packet};
use crate::sim::SimTime;
use crate::slice::{ClassParamsTable, SliceType};

use super::{ClassQueueReport, DropTailQueue, QueueDisc, QueueLimit};

#[derive(Debug)]
struct ClassQueue {
    q: DropTailQueue,
    weight: u32,
    credit: u32,
    delays: Vec<SimTime>,
    dropped: u64,
}

impl ClassQueue {
    fn new(limit: QueueLimit, weight: u32) -> Self {
        Self {
            q: DropTailQueue::new(limit),
            weight,
            credit: weight,
            delays: Vec::new(),
            dropped: 0,
        }
    }
}

#[derive(Debug)]
pub struct SliceQueueDisc {
    /// Egress port recorded in the metadata tag.
    port: u32,
    classes: [ClassQueue; SliceType::COUNT],
    current: usize,
    default_class: SliceType,
    unclassified: u64,
}

impl SliceQueueDisc {
    /// Capacities and weights come from the class table.
    pub fn new(table: &ClassParamsTable) -> Self {
        let limits = SliceType::ALL.map(|t| table.get(t).queue_limit);
        let weights = SliceType::ALL.map(|t| table.get(t).weight);
        Self::from_parts(limits, weights)
    }

    pub fn from_parts(
        limits: [QueueLimit; SliceType::COUNT],
        weights: [u32; SliceType::COUNT],
    ) -> Self {
        Self {
            port: 0,
            classes: std::array::from_fn(|i| ClassQueue::new(limits[i], weights[i])),
            current: 0,
            default_class: SliceType::DEFAULT,
            unclassified: 0,
        }
    }

    pub fn with_port(mut self, port: u32) -> Self {
        self.port = port;
        self
    }

    pub fn port(&self) -> u32 {
        self.port
    }

    /// Takes effect at the next dequeue; the class's credit restarts from the new weight.
    pub fn set_weight(&mut self, class: SliceType, weight: u32) {
        let c = &mut self.classes[class.index()];
        c.weight = weight;
        c.credit = weight;
        debug!(port = self.port, %class, weight, "queue weight updated");
    }

    pub fn set_weights(&mut self, weights: impl IntoIterator<Item = (SliceType, u32)>) {
        for (class, w) in weights {
            self.set_weight(class, w);
        }
    }

    pub fn weight(&self, class: SliceType) -> u32 {
        self.classes[class.index()].weight
    }

    pub fn class_len(&self, class: SliceType) -> usize {
        self.classes[class.index()].q.len()
    }

    pub fn class_bytes(&self, class: SliceType) -> u64 {
        self.classes[class.index()].q.bytes()
    }

    pub fn max_occupancy(&self, class: SliceType) -> usize {
        self.classes[class.index()].q.max_len()
    }

    /// Queueing delays observed for the class, in dequeue order.
    pub fn delays(&self, class: SliceType) -> &[SimTime] {
        &self.classes[class.index()].delays
    }

    pub fn dropped(&self, class: SliceType) -> u64 {
        self.classes[class.index()].dropped
    }

    /// Packets dropped because they carried no IP header.
    pub fn unclassified_drops(&self) -> u64 {
        self.unclassified
    }

    /// Class for a packet, or None when it has no classification marking at all.
    pub fn classify(&self, pkt: &Packet) -> Option<SliceType> {
        let dscp = pkt.dscp()?;
        Some(SliceType::from_dscp(dscp).unwrap_or(self.default_class))
    }

    fn scan_order(&self) -> impl Iterator<Item = usize> + use<> {
        let start = self.current;
        (0..SliceType::COUNT).map(move |step| (start + step) % SliceType::COUNT)
    }

    fn finish(&mut self, idx: usize, mut pkt: Packet, now: SimTime) -> Packet {
        let delay = pkt
            .take_meta_tag()
            .map(|tag| now.saturating_sub(tag.ingress))
            .unwrap_or(SimTime::ZERO);
        let c = &mut self.classes[idx];
        c.delays.push(delay);
        debug!(
            port = self.port,
            pkt_id = pkt.id,
            class = %SliceType::ALL[idx],
            q_len = c.q.len(),
            delay_ms = delay.as_millis_f64(),
            "dequeue"
        );
        pkt
    }

    /// Per-class summary, also written to the log.
    pub fn log_statistics(&self, label: &str) {
        for r in self.reports() {
            if r.served_pkts == 0 && r.dropped_pkts == 0 {
                continue;
            }
            info!(
                queue = label,
                port = self.port,
                class = %r.class,
                served = r.served_pkts,
                dropped = r.dropped_pkts,
                max_occupancy = r.max_occupancy,
                min_delay_ms = r.min_delay_ms,
                max_delay_ms = r.max_delay_ms,
                avg_delay_ms = r.avg_delay_ms,
                "queue statistics"
            );
        }
    }

    pub fn reports(&self) -> Vec<ClassQueueReport> {
        SliceType::ALL
            .iter()
            .zip(&self.classes)
            .map(|(&class, c)| {
                let served = c.delays.len();
                let (min, max, sum) = c.delays.iter().fold(
                    (f64::INFINITY, 0.0_f64, 0.0_f64),
                    |(mn, mx, sum), d| {
                        let ms = d.as_millis_f64();
                        (mn.min(ms), mx.max(ms), sum + ms)
                    },
                );
                ClassQueueReport {
                    class,
                    served_pkts: served as u64,
                    dropped_pkts: c.dropped,
                    max_occupancy: c.q.max_len(),
                    min_delay_ms: if served == 0 { 0.0 } else { min },
                    max_delay_ms: max,
                    avg_delay_ms: if served == 0 { 0.0 } else { sum / served as f64 },
                }
            })
            .collect()
    }
}

impl QueueDisc for SliceQueueDisc {
    fn enqueue(&mut self, mut pkt: Packet, now: SimTime) -> Result<(), Packet> {
        let Some(class) = self.classify(&pkt) else {
            warn!(port = self.port, pkt_id = pkt.id, "non-IP packet received, dropping");
            self.unclassified += 1;
            return Err(pkt);
        };
        pkt.set_meta_tag(MetadataTag {
            ingress: now,
            port: self.port,
        });

        let c = &mut self.classes[class.index()];
        match c.q.push(pkt) {
            Ok(()) => {
                debug!(
                    port = self.port,
                    %class,
                    q_len = c.q.len(),
                    max_occupancy = c.q.max_len(),
                    "enqueue"
                );
                Ok(())
            }
            Err(mut pkt) => {
                pkt.take_meta_tag();
                c.dropped += 1;
                debug!(port = self.port, %class, pkt_id = pkt.id, "class queue full, dropping");
                Err(pkt)
            }
        }
    }

    fn dequeue(&mut self, now: SimTime) -> Option<Packet> {
        for idx in self.scan_order() {
            let c = &mut self.classes[idx];
            if c.q.is_empty() {
                c.credit = c.weight;
                continue;
            }
            if c.credit == 0 {
                continue;
            }
            let pkt = c.q.pop()?;
            c.credit -= 1;
            if c.credit == 0 {
                c.credit = c.weight;
                self.current = (idx + 1) % SliceType::COUNT;
            } else {
                self.current = idx;
            }
            trace!(class = idx, credit = self.classes[idx].credit, "weighted service");
            return Some(self.finish(idx, pkt, now));
        }

        // Only zero-weight classes are backlogged.
        let idx = self
            .scan_order()
            .find(|&i| !self.classes[i].q.is_empty())?;
        let pkt = self.classes[idx].q.pop()?;
        Some(self.finish(idx, pkt, now))
    }

    fn peek(&self) -> Option<&Packet> {
        self.scan_order()
            .find_map(|idx| self.classes[idx].q.front())
    }

    fn len(&self) -> usize {
        self.classes.iter().map(|c| c.q.len()).sum()
    }

    fn bytes(&self) -> u64 {
        self.classes.iter().map(|c| c.q.bytes()).sum()
    }

    fn class_reports(&self) -> Option<Vec<ClassQueueReport>> {
        Some(self.reports())
    }
}
