//! 数据包类型
//!
//! 定义网络数据包、IP/UDP 头部信息及其侧信道标签。

use std::net::SocketAddrV4;

use super::tag::{MetadataTag, TimeTag};

/// 网络层 + 传输层头部（简化为 IPv4 + UDP 端口）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IpHeader {
    pub src: SocketAddrV4,
    pub dst: SocketAddrV4,
    /// ToS 字节：高 6 位为 DSCP
    pub tos: u8,
}

impl IpHeader {
    pub fn dscp(&self) -> u8 {
        self.tos >> 2
    }

    pub fn set_dscp(&mut self, dscp: u8) {
        self.tos = (dscp << 2) | (self.tos & 0b11);
    }
}

/// 网络数据包
///
/// 每种标签只有一个槽位，所以同一时刻最多携带一个同类标签。
#[derive(Debug, Clone)]
pub struct Packet {
    pub id: u64,
    pub size_bytes: u32,
    /// 无 IP 头的包无法分类/路由
    pub ip: Option<IpHeader>,
    pub time_tag: Option<TimeTag>,
    pub meta_tag: Option<MetadataTag>,
    pub hops_taken: u32,
}

impl Packet {
    /// 创建不带 IP 头的裸包
    pub fn new(id: u64, size_bytes: u32) -> Self {
        Self {
            id,
            size_bytes,
            ip: None,
            time_tag: None,
            meta_tag: None,
            hops_taken: 0,
        }
    }

    /// 创建 UDP 数据报
    pub fn new_udp(id: u64, size_bytes: u32, src: SocketAddrV4, dst: SocketAddrV4, tos: u8) -> Self {
        Self {
            ip: Some(IpHeader { src, dst, tos }),
            ..Self::new(id, size_bytes)
        }
    }

    /// 读取 DSCP 标记（无 IP 头时为 None）
    pub fn dscp(&self) -> Option<u8> {
        self.ip.as_ref().map(IpHeader::dscp)
    }

    pub fn src(&self) -> Option<SocketAddrV4> {
        self.ip.map(|h| h.src)
    }

    pub fn dst(&self) -> Option<SocketAddrV4> {
        self.ip.map(|h| h.dst)
    }

    /// 打上发送时间戳（覆盖旧标签）
    pub fn set_time_tag(&mut self, sent_at: crate::sim::SimTime) {
        self.time_tag = Some(TimeTag { sent_at });
    }

    /// 打上入队元数据（覆盖旧标签）
    pub fn set_meta_tag(&mut self, tag: MetadataTag) {
        self.meta_tag = Some(tag);
    }

    /// 移除并返回入队元数据
    pub fn take_meta_tag(&mut self) -> Option<MetadataTag> {
        self.meta_tag.take()
    }

    /// 前进到下一跳
    pub fn advance(mut self) -> Self {
        self.hops_taken = self.hops_taken.saturating_add(1);
        self
    }
}
