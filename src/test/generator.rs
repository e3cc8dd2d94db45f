use crate::app::{
    AppState, GAP_BATCH, GeneratorConfig, InterArrival, PacketSizeDist, SinkConfig, schedule_app,
};
use crate::net::{NetWorld, NodeId};
use crate::sim::{SimTime, Simulator};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::net::SocketAddrV4;

fn two_hosts() -> (NetWorld, NodeId, NodeId) {
    let mut world = NetWorld::default();
    let h0 = world.net.add_host("h0");
    let h1 = world.net.add_host("h1");
    let lat = SimTime::from_micros(10);
    world.net.connect(h0, h1, lat, 1_000_000_000);
    world.net.connect(h1, h0, lat, 1_000_000_000);
    (world, h0, h1)
}

#[test]
fn generator_with_packet_cap_sends_exactly_n_packets() {
    let (mut world, h0, h1) = two_hosts();
    let mut sim = Simulator::default();

    let dest = SocketAddrV4::new(world.net.node_addr(h1).expect("addr"), 9);
    let sink = world
        .net
        .install_sink(h1, SinkConfig::new(9).with_rate_interval(None));
    let cfg = GeneratorConfig::new(dest, 10e6, PacketSizeDist::Fixed(1000))
        .with_max_packets(5)
        .with_seed(7);
    let generator = world.net.install_generator(h0, cfg);
    schedule_app(&mut sim, sink, SimTime::ZERO, None);
    schedule_app(&mut sim, generator, SimTime::ZERO, None);
    sim.run(&mut world);

    let g = world.net.apps.generator(generator).expect("generator");
    assert_eq!(g.packets_sent(), 5);
    assert_eq!(g.bytes_sent(), 5_000);
    assert_eq!(g.state(), AppState::Stopped);
    assert!(!g.is_send_pending(&sim));
    assert!(g.local_addr().is_none(), "binding released after the cap");
    assert!((g.mean_gap_secs() - 0.0008).abs() < 1e-12);

    let s = world.net.apps.sink(sink).expect("sink");
    assert_eq!(s.total_packets(), 5);
    assert_eq!(s.total_bytes(), 5_000);
    assert_eq!(s.owd_samples().count(), 5);
    assert_eq!(sim.pending_events(), 0);
}

#[test]
fn inter_arrival_mean_converges_to_size_over_rate() {
    let mut rng = StdRng::seed_from_u64(42);
    let mut gaps = InterArrival::for_rate(1000.0, 10e6);
    assert!((gaps.mean_secs() - 0.0008).abs() < 1e-12);

    let first = gaps.next_secs(&mut rng);
    assert!(first >= 0.0);
    assert_eq!(gaps.remaining(), GAP_BATCH - 1);

    let n = 20_000;
    let mut sum = first;
    for _ in 1..n {
        let g = gaps.next_secs(&mut rng);
        assert!(g >= 0.0 && g.is_finite());
        sum += g;
    }
    let mean = sum / n as f64;
    assert!(
        (mean - 0.0008).abs() < 0.0008 * 0.05,
        "mean inter-arrival {mean} too far from 0.8 ms"
    );
}

#[test]
fn packet_size_distributions() {
    let mut rng = StdRng::seed_from_u64(1);
    let fixed = PacketSizeDist::Fixed(500);
    assert_eq!(fixed.sample(&mut rng), 500);
    assert_eq!(fixed.mean_bytes(), 500.0);

    let uniform = PacketSizeDist::Uniform { min: 20, max: 250 };
    assert_eq!(uniform.mean_bytes(), 135.0);
    for _ in 0..1_000 {
        let s = uniform.sample(&mut rng);
        assert!((20..=250).contains(&s));
    }

    let custom = PacketSizeDist::custom(64.0, |_| 64);
    assert_eq!(custom.sample(&mut rng), 64);
    assert_eq!(custom.mean_bytes(), 64.0);
}

#[test]
fn stopping_generator_cancels_pending_emission() {
    let (mut world, h0, h1) = two_hosts();
    let mut sim = Simulator::default();

    let dest = SocketAddrV4::new(world.net.node_addr(h1).expect("addr"), 9);
    // 平均间隔 80 ms
    let cfg = GeneratorConfig::new(dest, 100e3, PacketSizeDist::Fixed(1000)).with_seed(3);
    let generator = world.net.install_generator(h0, cfg);
    schedule_app(&mut sim, generator, SimTime::ZERO, Some(SimTime::from_secs(1)));

    sim.run_until(SimTime::from_secs(1), &mut world);
    let sent_at_stop = world
        .net
        .apps
        .generator(generator)
        .expect("generator")
        .packets_sent();
    assert!(sent_at_stop >= 1, "first packet is sent at start");

    sim.run(&mut world);
    let g = world.net.apps.generator(generator).expect("generator");
    assert_eq!(g.state(), AppState::Stopped);
    assert_eq!(g.packets_sent(), sent_at_stop);
    assert!(!g.is_send_pending(&sim));
    assert!(!world.net.udp_is_bound(h0, 49152));
}

#[test]
fn generator_start_failure_aborts_without_emissions() {
    let mut world = NetWorld::default();
    let sw = world.net.add_switch("s0");
    let h1 = world.net.add_host("h1");
    let mut sim = Simulator::default();

    let dest = SocketAddrV4::new(world.net.node_addr(h1).expect("addr"), 9);
    let on_switch = world.net.install_generator(
        sw,
        GeneratorConfig::new(dest, 1e6, PacketSizeDist::Fixed(100)),
    );
    let zero_rate = world.net.install_generator(
        h1,
        GeneratorConfig::new(dest, 0.0, PacketSizeDist::Fixed(100)),
    );
    let unknown_dest = world.net.install_generator(
        h1,
        GeneratorConfig::new(
            SocketAddrV4::new([192, 168, 1, 1].into(), 9),
            1e6,
            PacketSizeDist::Fixed(100),
        ),
    );
    for app in [on_switch, zero_rate, unknown_dest] {
        schedule_app(&mut sim, app, SimTime::ZERO, Some(SimTime::from_secs(1)));
    }
    sim.run(&mut world);

    for app in [on_switch, zero_rate, unknown_dest] {
        let g = world.net.apps.generator(app).expect("generator");
        assert_eq!(g.state(), AppState::Failed);
        assert_eq!(g.packets_sent(), 0);
    }
    assert!(!world.net.udp_is_bound(h1, 49152), "failed connect releases the binding");
    assert_eq!(world.net.stats.delivered_pkts, 0);
}

#[test]
fn generator_marks_packets_with_class_codepoint() {
    let (mut world, h0, h1) = two_hosts();
    let mut sim = Simulator::default();
    let dest = SocketAddrV4::new(world.net.node_addr(h1).expect("addr"), 9);
    let cfg = GeneratorConfig::new(dest, 1e6, PacketSizeDist::Fixed(100))
        .with_dscp(46)
        .with_max_packets(1);
    let generator = world.net.install_generator(h0, cfg);
    schedule_app(&mut sim, generator, SimTime::ZERO, None);
    sim.run(&mut world);

    let g = world.net.apps.generator(generator).expect("generator");
    assert_eq!(g.config().dscp, Some(46));
    assert_eq!(g.packets_sent(), 1);
    // Nobody listens on port 9 here.
    assert_eq!(world.net.stats.unroutable_pkts, 1);
}

#[test]
fn send_failure_marks_generator_failed_and_drops_socket() {
    let (mut world, h0, h1) = two_hosts();
    let mut sim = Simulator::default();

    let dest = SocketAddrV4::new(world.net.node_addr(h1).expect("addr"), 9);
    let cfg = GeneratorConfig::new(dest, 100e3, PacketSizeDist::Fixed(1000)).with_seed(11);
    let generator = world.net.install_generator(h0, cfg);
    schedule_app(&mut sim, generator, SimTime::ZERO, Some(SimTime::from_secs(2)));

    sim.run_until(SimTime::from_millis(500), &mut world);
    let g = world.net.apps.generator(generator).expect("generator");
    let port = g.local_addr().expect("bound while running").port();
    let sent_before = g.packets_sent();
    assert!(sent_before >= 1);

    // 外部释放绑定后，下一次发送失败
    assert!(world.net.udp_close(h0, port));
    sim.run(&mut world);

    let g = world.net.apps.generator(generator).expect("generator");
    assert_eq!(g.state(), AppState::Failed);
    assert_eq!(g.packets_sent(), sent_before);
    assert!(g.local_addr().is_none());
    assert!(!g.is_send_pending(&sim));
    assert!(!world.net.udp_is_bound(h0, port));
    assert_eq!(sim.pending_events(), 0);
}
