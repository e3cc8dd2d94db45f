//! 统计信息
//!
//! 定义网络仿真统计数据结构。

use serde::Serialize;

/// 网络统计信息
#[derive(Debug, Default, Clone, Serialize)]
pub struct Stats {
    pub delivered_pkts: u64,
    pub delivered_bytes: u64,
    /// 队列满（或无法分类）被丢弃的包
    pub dropped_pkts: u64,
    /// 找不到路由或目的端口未绑定的包
    pub unroutable_pkts: u64,
}
