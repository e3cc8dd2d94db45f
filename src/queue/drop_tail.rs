//! DropTail（尾丢弃）队列
//!
//! 当队列容量不足时，直接丢弃新到达的 packet。

use std::collections::VecDeque;

use crate::net::Packet;
use crate::sim::SimTime;

use super::{QueueDisc, QueueLimit};

#[derive(Debug)]
pub struct DropTailQueue {
    limit: QueueLimit,
    cur_bytes: u64,
    q: VecDeque<Packet>,
    /// 历史最大占用（包数）
    max_len: usize,
}

impl DropTailQueue {
    pub fn new(limit: QueueLimit) -> Self {
        Self {
            limit,
            cur_bytes: 0,
            q: VecDeque::new(),
            max_len: 0,
        }
    }

    pub fn with_max_bytes(max_bytes: u64) -> Self {
        Self::new(QueueLimit::Bytes(max_bytes))
    }

    pub fn with_max_packets(max_pkts: usize) -> Self {
        Self::new(QueueLimit::Packets(max_pkts))
    }

    pub fn unbounded() -> Self {
        Self::new(QueueLimit::UNBOUNDED)
    }

    pub fn limit(&self) -> QueueLimit {
        self.limit
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    pub fn push(&mut self, pkt: Packet) -> Result<(), Packet> {
        if !self.limit.admits(self.q.len(), self.cur_bytes, pkt.size_bytes) {
            return Err(pkt);
        }
        self.cur_bytes = self.cur_bytes.saturating_add(pkt.size_bytes as u64);
        self.q.push_back(pkt);
        self.max_len = self.max_len.max(self.q.len());
        Ok(())
    }

    pub fn pop(&mut self) -> Option<Packet> {
        let pkt = self.q.pop_front()?;
        self.cur_bytes = self.cur_bytes.saturating_sub(pkt.size_bytes as u64);
        Some(pkt)
    }

    pub fn front(&self) -> Option<&Packet> {
        self.q.front()
    }
}

impl QueueDisc for DropTailQueue {
    fn enqueue(&mut self, pkt: Packet, _now: SimTime) -> Result<(), Packet> {
        self.push(pkt)
    }

    fn dequeue(&mut self, _now: SimTime) -> Option<Packet> {
        self.pop()
    }

    fn peek(&self) -> Option<&Packet> {
        self.front()
    }

    fn len(&self) -> usize {
        self.q.len()
    }

    fn bytes(&self) -> u64 {
        self.cur_bytes
    }
}
