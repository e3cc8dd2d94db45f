//! 网络模拟模块
//!
//! 此模块包含网络模拟的核心组件，如节点、链路、数据包、数据报传输和网络拓扑。

// 子模块声明
mod deliver_packet;
mod error;
mod id;
mod link;
mod link_ready;
mod net_world;
mod network;
mod node;
mod packet;
mod routing;
mod stats;
mod tag;
mod udp;

// 重新导出公共接口
pub use deliver_packet::DeliverPacket;
pub use error::NetError;
pub use id::{AppId, LinkId, NodeId};
pub use link::Link;
pub use link_ready::LinkReady;
pub use net_world::NetWorld;
pub use network::{LinkQueueReport, Network};
pub use node::{Host, Node, Switch};
pub use packet::{IpHeader, Packet};
pub use routing::RoutingTable;
pub use stats::Stats;
pub use tag::{MetadataTag, TimeTag};
pub use udp::UdpSocket;
