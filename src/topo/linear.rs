//! 线性拓扑：交换机链 s0 - s1 - ... - s{n-1}，每台交换机挂若干主机

use super::Topology;
use crate::net::Network;
use crate::sim::SimTime;

#[derive(Debug, Clone)]
pub struct LinearOpts {
    pub switches: usize,
    pub hosts_per_switch: usize,
    pub link_bps: u64,
    pub link_latency: SimTime,
}

impl Default for LinearOpts {
    fn default() -> Self {
        Self {
            switches: 3,
            hosts_per_switch: 2,
            link_bps: 1_000_000_000,
            link_latency: SimTime::from_micros(100),
        }
    }
}

/// 所有主机同时进入源与宿节点池
pub fn build_linear(net: &mut Network, opts: &LinearOpts) -> Topology {
    let mut topo = Topology::default();
    for s in 0..opts.switches {
        let sw = net.add_switch(format!("s{s}"));
        if let Some(&prev) = topo.switches.last() {
            net.connect(prev, sw, opts.link_latency, opts.link_bps);
            net.connect(sw, prev, opts.link_latency, opts.link_bps);
        }
        topo.switches.push(sw);
        for i in 0..opts.hosts_per_switch {
            let h = net.add_host(format!("h{s}_{i}"));
            net.connect(h, sw, opts.link_latency, opts.link_bps);
            net.connect(sw, h, opts.link_latency, opts.link_bps);
            topo.sources.push(h);
            topo.sinks.push(h);
        }
    }
    topo
}
