//! 无连接数据报传输（简化 UDP）
//!
//! 提供 bind / connect / send / listen / close 原语。发送端 socket 只是一个
//! 轻量句柄；接收端在 (节点, 端口) 上登记一个应用，数据报到达时交给它处理。

use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddrV4};

use tracing::{debug, trace, warn};

use super::deliver_packet::DeliverPacket;
use super::error::NetError;
use super::id::{AppId, NodeId};
use super::network::Network;
use super::packet::Packet;
use crate::sim::Simulator;

const EPHEMERAL_FIRST: u16 = 49_152;

/// 发送端 socket 句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UdpSocket {
    node: NodeId,
    local: SocketAddrV4,
    peer: Option<SocketAddrV4>,
    tos: u8,
}

impl UdpSocket {
    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn local(&self) -> SocketAddrV4 {
        self.local
    }

    pub fn peer(&self) -> Option<SocketAddrV4> {
        self.peer
    }

    pub fn tos(&self) -> u8 {
        self.tos
    }

    /// 设置 ToS 字节，后续发送的数据报都会携带
    pub fn set_tos(&mut self, tos: u8) {
        self.tos = tos;
    }
}

#[derive(Debug, Clone, Copy)]
struct Binding {
    /// None 表示监听任意本地地址
    local_ip: Option<Ipv4Addr>,
    receiver: Option<AppId>,
}

/// (节点, 端口) 绑定表
#[derive(Debug, Default)]
pub(crate) struct UdpTable {
    bindings: HashMap<(NodeId, u16), Binding>,
    next_ephemeral: HashMap<NodeId, u16>,
}

impl UdpTable {
    fn alloc_ephemeral(&mut self, node: NodeId) -> Result<u16, NetError> {
        let cursor = self.next_ephemeral.entry(node).or_insert(EPHEMERAL_FIRST);
        let span = u16::MAX - EPHEMERAL_FIRST + 1;
        for _ in 0..span {
            let port = *cursor;
            *cursor = if port == u16::MAX {
                EPHEMERAL_FIRST
            } else {
                port + 1
            };
            if !self.bindings.contains_key(&(node, port)) {
                return Ok(port);
            }
        }
        Err(NetError::PortsExhausted(node))
    }

    fn receiver(&self, node: NodeId, dst: SocketAddrV4) -> Option<AppId> {
        let b = self.bindings.get(&(node, dst.port()))?;
        match b.local_ip {
            Some(ip) if ip != *dst.ip() => None,
            _ => b.receiver,
        }
    }
}

impl Network {
    /// 在节点上绑定一个发送 socket；`port` 为 None 时分配临时端口。
    pub fn udp_bind(&mut self, node: NodeId, port: Option<u16>) -> Result<UdpSocket, NetError> {
        let addr = self.node_addr(node)?;
        let port = match port {
            Some(p) if self.udp.bindings.contains_key(&(node, p)) => {
                return Err(NetError::PortInUse { node, port: p });
            }
            Some(p) => p,
            None => self.udp.alloc_ephemeral(node)?,
        };
        self.udp.bindings.insert(
            (node, port),
            Binding {
                local_ip: None,
                receiver: None,
            },
        );
        trace!(?node, port, "udp bind");
        Ok(UdpSocket {
            node,
            local: SocketAddrV4::new(addr, port),
            peer: None,
            tos: 0,
        })
    }

    /// 设置默认对端；对端地址必须属于网络中的某个节点。
    pub fn udp_connect(&self, sock: &mut UdpSocket, peer: SocketAddrV4) -> Result<(), NetError> {
        self.node_by_addr(*peer.ip())?;
        sock.peer = Some(peer);
        Ok(())
    }

    /// 在 (节点, 端口) 上登记接收应用；`local_ip` 可限定只接收发往该地址的包。
    pub fn udp_listen(
        &mut self,
        node: NodeId,
        local_ip: Option<Ipv4Addr>,
        port: u16,
        app: AppId,
    ) -> Result<SocketAddrV4, NetError> {
        let addr = self.node_addr(node)?;
        if let Some(ip) = local_ip {
            if ip != addr {
                return Err(NetError::NotLocal { node, addr: ip });
            }
        }
        if self.udp.bindings.contains_key(&(node, port)) {
            return Err(NetError::PortInUse { node, port });
        }
        self.udp.bindings.insert(
            (node, port),
            Binding {
                local_ip,
                receiver: Some(app),
            },
        );
        debug!(?node, port, ?app, "udp listen");
        Ok(SocketAddrV4::new(local_ip.unwrap_or(addr), port))
    }

    /// 释放绑定；返回该绑定此前是否存在。
    pub fn udp_close(&mut self, node: NodeId, port: u16) -> bool {
        self.udp.bindings.remove(&(node, port)).is_some()
    }

    pub fn udp_is_bound(&self, node: NodeId, port: u16) -> bool {
        self.udp.bindings.contains_key(&(node, port))
    }

    /// 发送一个数据报，返回 packet id。`pkt_fn` 可在发出前修改 packet（例如打时间戳）。
    pub fn udp_send(
        &mut self,
        sock: &UdpSocket,
        size_bytes: u32,
        sim: &mut Simulator,
        pkt_fn: impl FnOnce(&mut Packet),
    ) -> Result<u64, NetError> {
        let local = sock.local;
        if !self.udp_is_bound(sock.node, local.port()) {
            return Err(NetError::SocketClosed(local));
        }
        let peer = sock.peer.ok_or(NetError::NotConnected(local))?;
        let dst_node = self.node_by_addr(*peer.ip())?;

        let id = self.alloc_pkt_id();
        let mut pkt = Packet::new_udp(id, size_bytes, local, peer, sock.tos);
        pkt_fn(&mut pkt);

        if dst_node == sock.node {
            sim.schedule(sim.now(), DeliverPacket { to: dst_node, pkt });
        } else {
            self.forward_from(sock.node, pkt, sim);
        }
        Ok(id)
    }

    /// 目的主机上的 UDP 分发：交给登记在该端口上的应用。
    pub(crate) fn udp_dispatch(&mut self, at: NodeId, pkt: Packet, sim: &mut Simulator) {
        let Some(hdr) = pkt.ip else {
            warn!(pkt_id = pkt.id, "无 IP 头的包到达主机，丢弃");
            self.stats.unroutable_pkts += 1;
            return;
        };
        match self.udp.receiver(at, hdr.dst) {
            Some(app) => {
                self.stats.delivered_pkts += 1;
                self.stats.delivered_bytes += pkt.size_bytes as u64;
                self.apps.deliver(app, sim.now(), hdr.src, &pkt);
            }
            None => {
                debug!(pkt_id = pkt.id, dst = %hdr.dst, "目的端口未监听，丢弃");
                self.stats.unroutable_pkts += 1;
            }
        }
    }
}
