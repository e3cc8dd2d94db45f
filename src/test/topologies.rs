use crate::net::NetWorld;
use crate::sim::{ScenarioError, TopologySpec};
use crate::slice::{ClassParamsTable, SliceType};
use crate::topo::{DumbbellOpts, LinearOpts, build_dumbbell, build_from_spec, build_linear, install_slice_queues};
use std::collections::HashSet;

#[test]
fn dumbbell_pools_and_links() {
    let mut world = NetWorld::default();
    let opts = DumbbellOpts {
        hosts_per_side: 3,
        ..DumbbellOpts::default()
    };
    let topo = build_dumbbell(&mut world.net, &opts);

    assert_eq!(topo.switches.len(), 2);
    assert_eq!(topo.sources.len(), 3);
    assert_eq!(topo.sinks.len(), 3);
    assert_eq!(world.net.node_count(), 8);
    // 2 bottleneck directions + 2 per host
    assert_eq!(world.net.links().count(), 2 + 12);

    let names: Vec<&str> = topo
        .sources
        .iter()
        .filter_map(|&n| world.net.node_name(n))
        .collect();
    assert_eq!(names, vec!["src0", "src1", "src2"]);
    let b = world
        .net
        .link_between(topo.switches[0], topo.switches[1])
        .and_then(|id| world.net.link(id))
        .expect("bottleneck link");
    assert_eq!(b.bandwidth_bps, 100_000_000);

    let addrs: HashSet<_> = topo
        .sources
        .iter()
        .chain(&topo.sinks)
        .map(|&n| world.net.node_addr(n).expect("host address"))
        .collect();
    assert_eq!(addrs.len(), 6);
    assert!(world.net.node_addr(topo.switches[0]).is_err());
}

#[test]
fn linear_hosts_are_both_sources_and_sinks() {
    let mut world = NetWorld::default();
    let topo = build_linear(&mut world.net, &LinearOpts::default());

    assert_eq!(topo.switches.len(), 3);
    assert_eq!(topo.sources.len(), 6);
    assert_eq!(topo.sources, topo.sinks);
    assert_eq!(world.net.links().count(), 4 + 12);
    assert_eq!(world.net.node_name(topo.sources[5]), Some("h2_1"));

    let (a, b) = (topo.sources[0], topo.sources[5]);
    assert!(world.net.next_hop(a, b).is_some());
}

#[test]
fn slice_queues_go_on_every_switch_egress() {
    let mut world = NetWorld::default();
    let topo = build_dumbbell(&mut world.net, &DumbbellOpts::default());
    let mut table = ClassParamsTable::default();
    table.set_weight(SliceType::Mmtc, 7);

    let n = install_slice_queues(&mut world.net, &topo.switches, &table);
    assert_eq!(n, 6);

    let reports = world.net.queue_reports();
    assert_eq!(reports.len(), 6);
    for r in &reports {
        assert!(topo.switches.contains(&r.from));
        assert_eq!(r.classes.len(), SliceType::COUNT);
        assert!(r.classes.iter().all(|c| c.served_pkts == 0 && c.dropped_pkts == 0));
    }
}

#[test]
fn topology_from_description() {
    let mut world = NetWorld::default();
    let topo = build_from_spec(&mut world.net, &TopologySpec::linear()).expect("linear");
    assert_eq!(topo.sources.len(), 6);

    let mut world = NetWorld::default();
    let spec = TopologySpec::Dumbbell {
        hosts_per_side: 0,
        host_link_mbps: 1_000,
        bottleneck_mbps: 100,
        link_latency_us: 100,
    };
    assert!(matches!(
        build_from_spec(&mut world.net, &spec),
        Err(ScenarioError::InvalidTopology(_))
    ));
}

#[test]
fn network_routes_follow_topology_changes() {
    let mut world = NetWorld::default();
    let topo = build_linear(&mut world.net, &LinearOpts::default());
    let (a, b) = (topo.sources[0], topo.sources[5]);
    assert_eq!(world.net.next_hop(a, b), Some(topo.switches[0]));
    // 已构建的路由表被重复查询
    assert_eq!(world.net.next_hop(a, b), Some(topo.switches[0]));

    let lat = crate::sim::SimTime::from_micros(10);
    world.net.connect(a, b, lat, 1_000_000_000);
    assert_eq!(world.net.next_hop(a, b), Some(b));
}
