//! 队列策略（Queue disciplines）
//!
//! 提供基础的 DropTail（尾丢弃）队列，以及按切片类型分类、加权轮询服务的
//! 多队列调度器 `SliceQueueDisc`。

use serde::{Deserialize, Serialize};

use crate::net::Packet;
use crate::sim::SimTime;
use crate::slice::SliceType;

mod drop_tail;
mod slice_queue;

pub use drop_tail::DropTailQueue;
pub use slice_queue::SliceQueueDisc;

/// 队列容量上限
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueLimit {
    Bytes(u64),
    Packets(usize),
}

impl QueueLimit {
    pub const UNBOUNDED: QueueLimit = QueueLimit::Bytes(u64::MAX);

    /// 在当前占用 (len, bytes) 下是否还能放下 `size_bytes` 的包
    pub fn admits(&self, len: usize, bytes: u64, size_bytes: u32) -> bool {
        match *self {
            QueueLimit::Bytes(max) => bytes.saturating_add(size_bytes as u64) <= max,
            QueueLimit::Packets(max) => len < max,
        }
    }
}

/// 一个分类队列的统计摘要（时延单位为毫秒）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassQueueReport {
    pub class: SliceType,
    pub served_pkts: u64,
    pub dropped_pkts: u64,
    pub max_occupancy: usize,
    pub min_delay_ms: f64,
    pub max_delay_ms: f64,
    pub avg_delay_ms: f64,
}

/// 排队策略抽象
pub trait QueueDisc: std::fmt::Debug + Send {
    /// 入队：成功返回 Ok；若被丢弃则返回 Err(pkt)
    fn enqueue(&mut self, pkt: Packet, now: SimTime) -> Result<(), Packet>;
    /// 出队：按队列策略返回下一个 packet
    fn dequeue(&mut self, now: SimTime) -> Option<Packet>;
    /// 查看下一个 packet 而不取出
    fn peek(&self) -> Option<&Packet>;

    fn len(&self) -> usize;
    fn bytes(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 分类调度器返回每个类的统计；普通队列返回 None
    fn class_reports(&self) -> Option<Vec<ClassQueueReport>> {
        None
    }
}
