//! 节点类型
//!
//! 定义网络节点，包括节点 trait 和具体实现（主机、交换机）。

use std::net::Ipv4Addr;

use super::id::NodeId;
use super::network::Network;
use super::packet::Packet;
use crate::sim::Simulator;
use tracing::{debug, trace};

/// 节点接口
pub trait Node: Send {
    /// 获取节点标识符
    fn id(&self) -> NodeId;

    /// 获取节点名称
    fn name(&self) -> &str;

    /// 节点的 IPv4 地址（交换机没有地址）
    fn addr(&self) -> Option<Ipv4Addr> {
        None
    }

    /// 处理到达的数据包
    fn on_packet(&mut self, pkt: Packet, sim: &mut Simulator, net: &mut Network);
}

/// 主机节点
#[derive(Debug)]
pub struct Host {
    id: NodeId,
    name: String,
    addr: Ipv4Addr,
}

impl Host {
    /// 创建新主机
    pub fn new(id: NodeId, name: impl Into<String>, addr: Ipv4Addr) -> Self {
        Self {
            id,
            name: name.into(),
            addr,
        }
    }
}

impl Node for Host {
    fn id(&self) -> NodeId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn addr(&self) -> Option<Ipv4Addr> {
        Some(self.addr)
    }

    #[tracing::instrument(skip(self, sim, net), fields(node_name = %self.name(), node_id = ?self.id(), pkt_id = pkt.id))]
    fn on_packet(&mut self, pkt: Packet, sim: &mut Simulator, net: &mut Network) {
        trace!(dst = ?pkt.dst(), hops_taken = pkt.hops_taken, "🖥️  Host 处理数据包");

        if pkt.dst().is_some_and(|d| *d.ip() == self.addr) {
            net.on_delivered(self.id, pkt, sim);
        } else {
            debug!("未到达目的地，继续转发");
            net.forward_from(self.id, pkt, sim);
        }
    }
}

/// 交换机节点
#[derive(Debug)]
pub struct Switch {
    id: NodeId,
    name: String,
}

impl Switch {
    /// 创建新交换机
    pub fn new(id: NodeId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

impl Node for Switch {
    fn id(&self) -> NodeId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    #[tracing::instrument(skip(self, sim, net), fields(node_name = %self.name(), node_id = ?self.id(), pkt_id = pkt.id))]
    fn on_packet(&mut self, pkt: Packet, sim: &mut Simulator, net: &mut Network) {
        trace!(dst = ?pkt.dst(), hops_taken = pkt.hops_taken, "🔀 Switch 转发数据包");
        net.forward_from(self.id, pkt, sim);
    }
}
