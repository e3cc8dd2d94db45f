//! 网络拓扑管理
//!
//! 定义网络拓扑结构，包含节点、链路、数据包转发和统计信息。

use std::collections::HashMap;
use std::net::Ipv4Addr;

use super::deliver_packet::DeliverPacket;
use super::error::NetError;
use super::id::{LinkId, NodeId};
use super::link::Link;
use super::link_ready::LinkReady;
use super::node::{Host, Node, Switch};
use super::packet::Packet;
use super::routing::RoutingTable;
use super::stats::Stats;
use super::udp::UdpTable;
use crate::app::AppTable;
use crate::queue::{ClassQueueReport, QueueDisc};
use crate::sim::{SimTime, Simulator};
use tracing::{debug, trace, warn};

/// 某条链路出口队列的分类统计
#[derive(Debug, Clone)]
pub struct LinkQueueReport {
    pub link: LinkId,
    pub from: NodeId,
    pub to: NodeId,
    pub classes: Vec<ClassQueueReport>,
}

/// 网络拓扑
#[derive(Default)]
pub struct Network {
    nodes: Vec<Option<Box<dyn Node>>>,
    node_names: Vec<String>,
    links: Vec<Link>,
    edges: HashMap<(NodeId, NodeId), LinkId>,
    addrs: HashMap<Ipv4Addr, NodeId>,
    routes: RoutingTable,
    next_pkt_id: u64,
    pub stats: Stats,
    pub(crate) udp: UdpTable,
    pub apps: AppTable,
}

impl Network {
    /// 添加主机节点，自动分配 10.0.x.y 地址
    pub fn add_host(&mut self, name: impl Into<String>) -> NodeId {
        let n = self.addrs.len() as u32;
        let addr = Ipv4Addr::from(0x0A00_0001_u32.saturating_add((n / 254) << 8 | (n % 254)));
        self.add_host_with_addr(name, addr)
    }

    /// 添加指定地址的主机节点
    pub fn add_host_with_addr(&mut self, name: impl Into<String>, addr: Ipv4Addr) -> NodeId {
        let id = NodeId(self.nodes.len());
        let name = name.into();
        self.node_names.push(name.clone());
        self.nodes.push(Some(Box::new(Host::new(id, name, addr))));
        self.addrs.insert(addr, id);
        self.routes.mark_dirty();
        id
    }

    /// 添加交换机节点
    pub fn add_switch(&mut self, name: impl Into<String>) -> NodeId {
        let id = NodeId(self.nodes.len());
        let name = name.into();
        self.node_names.push(name.clone());
        self.nodes.push(Some(Box::new(Switch::new(id, name))));
        self.routes.mark_dirty();
        id
    }

    /// 连接两个节点（创建单向链路）
    pub fn connect(
        &mut self,
        from: NodeId,
        to: NodeId,
        latency: SimTime,
        bandwidth_bps: u64,
    ) -> LinkId {
        let id = LinkId(self.links.len());
        self.links.push(Link::new(from, to, latency, bandwidth_bps));
        self.edges.insert((from, to), id);
        self.routes.mark_dirty();
        id
    }

    /// 替换链路出口的排队策略
    pub fn set_queue(&mut self, link: LinkId, queue: Box<dyn QueueDisc>) {
        if let Some(l) = self.links.get_mut(link.0) {
            l.queue = queue;
        }
    }

    pub fn link_between(&self, from: NodeId, to: NodeId) -> Option<LinkId> {
        self.edges.get(&(from, to)).copied()
    }

    pub fn link(&self, id: LinkId) -> Option<&Link> {
        self.links.get(id.0)
    }

    pub fn links(&self) -> impl Iterator<Item = (LinkId, &Link)> {
        self.links.iter().enumerate().map(|(i, l)| (LinkId(i), l))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node_name(&self, id: NodeId) -> Option<&str> {
        self.node_names.get(id.0).map(String::as_str)
    }

    /// 节点的 IPv4 地址
    pub fn node_addr(&self, id: NodeId) -> Result<Ipv4Addr, NetError> {
        let node = self
            .nodes
            .get(id.0)
            .ok_or(NetError::UnknownNode(id))?
            .as_ref()
            .ok_or(NetError::UnknownNode(id))?;
        node.addr().ok_or(NetError::NoAddress(id))
    }

    /// 由地址查节点
    pub fn node_by_addr(&self, addr: Ipv4Addr) -> Result<NodeId, NetError> {
        self.addrs
            .get(&addr)
            .copied()
            .ok_or(NetError::AddressNotFound(addr))
    }

    pub(crate) fn alloc_pkt_id(&mut self) -> u64 {
        let id = self.next_pkt_id;
        self.next_pkt_id = self.next_pkt_id.wrapping_add(1);
        id
    }

    fn ensure_routes(&mut self) {
        if !self.routes.is_dirty() {
            return;
        }
        let n = self.nodes.len();
        let mut adj = vec![Vec::new(); n];
        let mut rev_adj = vec![Vec::new(); n];
        for l in &self.links {
            adj[l.from.0].push(l.to);
            rev_adj[l.to.0].push(l.from);
        }
        self.routes.ensure_built(&adj, &rev_adj);
    }

    /// 查询 from -> dst 的下一跳
    pub fn next_hop(&mut self, from: NodeId, dst: NodeId) -> Option<NodeId> {
        self.ensure_routes();
        self.routes.next_hop(from, dst)
    }

    /// 将数据包交付给节点处理
    #[tracing::instrument(skip(self, sim, pkt), fields(pkt_id = pkt.id, to = ?to))]
    pub fn deliver(&mut self, to: NodeId, pkt: Packet, sim: &mut Simulator) {
        // 暂时把节点取出来，避免 &mut self 与 &mut node 的重叠借用。
        let Some(mut node) = self.nodes.get_mut(to.0).and_then(Option::take) else {
            warn!("目的节点不存在，丢弃数据包");
            self.stats.unroutable_pkts += 1;
            return;
        };
        node.on_packet(pkt, sim, self);
        self.nodes[to.0] = Some(node);
    }

    /// 从指定节点转发数据包：查路由、入队到出口链路，链路空闲时立即开始发送。
    #[tracing::instrument(skip(self, sim, pkt), fields(pkt_id = pkt.id, from = ?from, hop = pkt.hops_taken))]
    pub fn forward_from(&mut self, from: NodeId, pkt: Packet, sim: &mut Simulator) {
        let Some(dst) = pkt.dst() else {
            warn!("数据包无 IP 头，无法路由");
            self.stats.unroutable_pkts += 1;
            return;
        };
        let Ok(dst_node) = self.node_by_addr(*dst.ip()) else {
            warn!(%dst, "目的地址不存在");
            self.stats.unroutable_pkts += 1;
            return;
        };
        let Some(to) = self.next_hop(from, dst_node) else {
            warn!(?dst_node, "无路由");
            self.stats.unroutable_pkts += 1;
            return;
        };
        let Some(link_id) = self.link_between(from, to) else {
            warn!(?to, "下一跳没有链路");
            self.stats.unroutable_pkts += 1;
            return;
        };

        let now = sim.now();
        let link = &mut self.links[link_id.0];
        if let Err(dropped) = link.queue.enqueue(pkt, now) {
            debug!(pkt_id = dropped.id, ?link_id, "出口队列丢包");
            self.stats.dropped_pkts += 1;
            return;
        }
        trace!(?link_id, q_len = link.queue.len(), q_bytes = link.queue.bytes(), "已入队");

        if !link.busy {
            self.start_tx(link_id, sim);
        }
    }

    /// 从链路队列取出下一个 packet 并开始序列化发送
    fn start_tx(&mut self, link_id: LinkId, sim: &mut Simulator) {
        let now = sim.now();
        let link = &mut self.links[link_id.0];
        let Some(pkt) = link.queue.dequeue(now) else {
            link.busy = false;
            return;
        };
        let depart = now.saturating_add(link.tx_time(pkt.size_bytes));
        let arrive = depart.saturating_add(link.latency);
        link.busy = true;
        let to = link.to;

        trace!(?link_id, ?depart, ?arrive, "开始发送");
        sim.schedule(depart, LinkReady { link_id });
        sim.schedule(
            arrive,
            DeliverPacket {
                to,
                pkt: pkt.advance(),
            },
        );
    }

    /// 链路完成一次发送
    pub(crate) fn on_link_ready(&mut self, link_id: LinkId, sim: &mut Simulator) {
        if let Some(link) = self.links.get_mut(link_id.0) {
            link.busy = false;
            self.start_tx(link_id, sim);
        }
    }

    /// 数据包送达目的主机
    pub(crate) fn on_delivered(&mut self, at: NodeId, pkt: Packet, sim: &mut Simulator) {
        debug!(pkt_id = pkt.id, ?at, size_bytes = pkt.size_bytes, "✅ 数据包送达目的地");
        self.udp_dispatch(at, pkt, sim);
    }

    /// 所有分类调度器的队列统计
    pub fn queue_reports(&self) -> Vec<LinkQueueReport> {
        self.links()
            .filter_map(|(id, l)| {
                l.queue.class_reports().map(|classes| LinkQueueReport {
                    link: id,
                    from: l.from,
                    to: l.to,
                    classes,
                })
            })
            .collect()
    }
}
