//! 拓扑构建
//!
//! 构建器返回源/宿节点池与交换机列表；`install_slice_queues` 在交换机的
//! 每条出口链路上安装分类调度器。

pub mod dumbbell;
pub mod linear;

pub use dumbbell::{DumbbellOpts, build_dumbbell};
pub use linear::{LinearOpts, build_linear};

use tracing::info;

use crate::net::{LinkId, Network, NodeId};
use crate::queue::SliceQueueDisc;
use crate::sim::{ScenarioError, SimTime, TopologySpec};
use crate::slice::ClassParamsTable;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Topology {
    pub sources: Vec<NodeId>,
    pub sinks: Vec<NodeId>,
    pub switches: Vec<NodeId>,
}

/// 按场景描述构建拓扑
pub fn build_from_spec(net: &mut Network, spec: &TopologySpec) -> Result<Topology, ScenarioError> {
    let mbps = |m: u64| m.saturating_mul(1_000_000);
    let topo = match *spec {
        TopologySpec::Dumbbell {
            hosts_per_side,
            host_link_mbps,
            bottleneck_mbps,
            link_latency_us,
        } => build_dumbbell(
            net,
            &DumbbellOpts {
                hosts_per_side,
                host_link_bps: mbps(host_link_mbps),
                bottleneck_bps: mbps(bottleneck_mbps),
                link_latency: SimTime::from_micros(link_latency_us),
            },
        ),
        TopologySpec::Linear {
            switches,
            hosts_per_switch,
            link_mbps,
            link_latency_us,
        } => build_linear(
            net,
            &LinearOpts {
                switches,
                hosts_per_switch,
                link_bps: mbps(link_mbps),
                link_latency: SimTime::from_micros(link_latency_us),
            },
        ),
    };
    if topo.sources.is_empty() || topo.sinks.is_empty() {
        return Err(ScenarioError::InvalidTopology("topology has no hosts".into()));
    }
    Ok(topo)
}

/// 在 `switches` 的所有出口链路上安装 `SliceQueueDisc`，返回安装的数量
pub fn install_slice_queues(
    net: &mut Network,
    switches: &[NodeId],
    table: &ClassParamsTable,
) -> usize {
    let targets: Vec<LinkId> = net
        .links()
        .filter(|(_, l)| switches.contains(&l.from))
        .map(|(id, _)| id)
        .collect();
    for &id in &targets {
        net.set_queue(id, Box::new(SliceQueueDisc::new(table).with_port(id.0 as u32)));
    }
    info!(links = targets.len(), "安装切片调度器");
    targets.len()
}
