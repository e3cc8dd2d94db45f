//! 网络层错误类型

use std::net::{Ipv4Addr, SocketAddrV4};

use thiserror::Error;

use super::id::NodeId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NetError {
    #[error("unknown node {0:?}")]
    UnknownNode(NodeId),
    #[error("node {0:?} has no IPv4 address")]
    NoAddress(NodeId),
    #[error("port {port} already bound on node {node:?}")]
    PortInUse { node: NodeId, port: u16 },
    #[error("no ephemeral port left on node {0:?}")]
    PortsExhausted(NodeId),
    #[error("no node owns address {0}")]
    AddressNotFound(Ipv4Addr),
    #[error("address {addr} is not local to node {node:?}")]
    NotLocal { node: NodeId, addr: Ipv4Addr },
    #[error("socket {0} is not connected")]
    NotConnected(SocketAddrV4),
    #[error("socket {0} is closed")]
    SocketClosed(SocketAddrV4),
}
