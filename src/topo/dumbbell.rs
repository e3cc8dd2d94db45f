//! Dumbbell 拓扑构建

use super::Topology;
use crate::net::Network;
use crate::sim::SimTime;

/// Dumbbell 拓扑配置选项
#[derive(Debug, Clone)]
pub struct DumbbellOpts {
    /// 每侧主机数
    pub hosts_per_side: usize,
    pub host_link_bps: u64,
    pub bottleneck_bps: u64,
    pub link_latency: SimTime,
}

impl Default for DumbbellOpts {
    fn default() -> Self {
        Self {
            hosts_per_side: 2,
            host_link_bps: 1_000_000_000,
            bottleneck_bps: 100_000_000,
            link_latency: SimTime::from_micros(100),
        }
    }
}

/// 构建 dumbbell 拓扑
///
/// 拓扑结构：src{i} <-> s0 <-> s1 <-> dst{i}
/// 左侧主机为源节点池，右侧主机为宿节点池。
pub fn build_dumbbell(net: &mut Network, opts: &DumbbellOpts) -> Topology {
    let s0 = net.add_switch("s0");
    let s1 = net.add_switch("s1");

    // s0 <-> s1 (bottleneck)
    net.connect(s0, s1, opts.link_latency, opts.bottleneck_bps);
    net.connect(s1, s0, opts.link_latency, opts.bottleneck_bps);

    let mut topo = Topology {
        switches: vec![s0, s1],
        ..Topology::default()
    };
    for i in 0..opts.hosts_per_side {
        let h = net.add_host(format!("src{i}"));
        net.connect(h, s0, opts.link_latency, opts.host_link_bps);
        net.connect(s0, h, opts.link_latency, opts.host_link_bps);
        topo.sources.push(h);
    }
    for i in 0..opts.hosts_per_side {
        let h = net.add_host(format!("dst{i}"));
        net.connect(s1, h, opts.link_latency, opts.host_link_bps);
        net.connect(h, s1, opts.link_latency, opts.host_link_bps);
        topo.sinks.push(h);
    }
    topo
}
