use crate::net::Packet;
use crate::queue::{QueueDisc, QueueLimit, SliceQueueDisc};
use crate::sim::SimTime;
use crate::slice::{ClassParamsTable, SliceType};
use std::net::{Ipv4Addr, SocketAddrV4};

fn class_pkt(id: u64, size_bytes: u32, dscp: u8) -> Packet {
    let src = SocketAddrV4::new(Ipv4Addr::new(10, 0, 0, 1), 49152);
    let dst = SocketAddrV4::new(Ipv4Addr::new(10, 0, 0, 2), 5010);
    Packet::new_udp(id, size_bytes, src, dst, dscp << 2)
}

fn fill(q: &mut SliceQueueDisc, class: SliceType, n: u64, size_bytes: u32, first_id: u64) {
    for i in 0..n {
        q.enqueue(class_pkt(first_id + i, size_bytes, class.dscp()), SimTime::ZERO)
            .expect("unbounded class queue");
    }
}

fn served_classes(q: &mut SliceQueueDisc, rounds: usize) -> [usize; SliceType::COUNT] {
    let mut served = [0; SliceType::COUNT];
    for _ in 0..rounds {
        let pkt = q.dequeue(SimTime::ZERO).expect("saturated queue");
        let class = SliceType::from_dscp(pkt.dscp().expect("ip packet")).expect("known class");
        served[class.index()] += 1;
    }
    served
}

#[test]
fn saturated_scheduler_serves_in_weight_proportion() {
    let mut q = SliceQueueDisc::from_parts([QueueLimit::UNBOUNDED; 3], [80, 15, 5]);
    for (k, class) in SliceType::ALL.into_iter().enumerate() {
        fill(&mut q, class, 1_000, 1_000, k as u64 * 10_000);
    }

    let served = served_classes(&mut q, 1_000);
    assert_eq!(served, [800, 150, 50]);
    assert_eq!(q.delays(SliceType::Urllc).len(), 800);
    assert_eq!(q.len(), 3_000 - 1_000);
}

#[test]
fn service_ratio_follows_arbitrary_weights() {
    let mut q = SliceQueueDisc::from_parts([QueueLimit::UNBOUNDED; 3], [3, 2, 1]);
    for (k, class) in SliceType::ALL.into_iter().enumerate() {
        fill(&mut q, class, 400, 100, k as u64 * 1_000);
    }
    assert_eq!(served_classes(&mut q, 600), [300, 200, 100]);
}

#[test]
fn class_queue_at_capacity_drops_and_records_high_water_mark() {
    let mut q = SliceQueueDisc::from_parts([QueueLimit::Packets(2); 3], [80, 15, 5]);
    let dscp = SliceType::Urllc.dscp();
    assert!(q.enqueue(class_pkt(1, 100, dscp), SimTime::ZERO).is_ok());
    assert!(q.enqueue(class_pkt(2, 100, dscp), SimTime::ZERO).is_ok());
    let dropped = q
        .enqueue(class_pkt(3, 100, dscp), SimTime::ZERO)
        .expect_err("third packet exceeds capacity");
    assert_eq!(dropped.id, 3);
    assert!(dropped.meta_tag.is_none());

    assert_eq!(q.class_len(SliceType::Urllc), 2);
    assert_eq!(q.dropped(SliceType::Urllc), 1);
    assert_eq!(q.max_occupancy(SliceType::Urllc), 2);
    assert_eq!(q.max_occupancy(SliceType::Embb), 0);
}

#[test]
fn byte_capacity_is_never_exceeded() {
    let mut q = SliceQueueDisc::new(&ClassParamsTable::default());
    let dscp = SliceType::Urllc.dscp();
    let mut accepted = 0;
    for id in 0..200 {
        if q.enqueue(class_pkt(id, 250, dscp), SimTime::ZERO).is_ok() {
            accepted += 1;
        }
        assert!(q.class_bytes(SliceType::Urllc) <= 25_000);
    }
    assert_eq!(accepted, 100);
    assert_eq!(q.dropped(SliceType::Urllc), 100);
}

#[test]
fn non_ip_packet_is_dropped() {
    let mut q = SliceQueueDisc::new(&ClassParamsTable::default());
    let pkt = Packet::new(9, 100);
    assert_eq!(q.classify(&pkt), None);
    assert!(q.enqueue(pkt, SimTime::ZERO).is_err());
    assert_eq!(q.unclassified_drops(), 1);
    assert!(q.is_empty());
    assert!(q.dequeue(SimTime::ZERO).is_none());
}

#[test]
fn unknown_codepoint_maps_to_default_class() {
    let mut q = SliceQueueDisc::new(&ClassParamsTable::default());
    assert_eq!(q.classify(&class_pkt(1, 100, 0)), Some(SliceType::Embb));
    assert_eq!(q.classify(&class_pkt(2, 100, 63)), Some(SliceType::Embb));
    assert_eq!(q.classify(&class_pkt(3, 100, 8)), Some(SliceType::Mmtc));

    q.enqueue(class_pkt(1, 100, 0), SimTime::ZERO).expect("enqueue");
    assert_eq!(q.class_len(SliceType::Embb), 1);
}

#[test]
fn dequeue_strips_ingress_tag_and_records_queueing_delay() {
    let mut q = SliceQueueDisc::new(&ClassParamsTable::default()).with_port(4);
    assert_eq!(q.port(), 4);
    q.enqueue(class_pkt(1, 100, SliceType::Mmtc.dscp()), SimTime::from_millis(1))
        .expect("enqueue");
    assert_eq!(q.peek().and_then(|p| p.meta_tag).map(|t| t.port), Some(4));

    let pkt = q.dequeue(SimTime::from_millis(3)).expect("pkt");
    assert!(pkt.meta_tag.is_none());
    assert_eq!(q.delays(SliceType::Mmtc), &[SimTime::from_millis(2)]);

    let reports = q.reports();
    let mmtc = &reports[SliceType::Mmtc.index()];
    assert_eq!(mmtc.class, SliceType::Mmtc);
    assert_eq!(mmtc.served_pkts, 1);
    assert_eq!(mmtc.min_delay_ms, 2.0);
    assert_eq!(mmtc.max_delay_ms, 2.0);
    assert_eq!(mmtc.avg_delay_ms, 2.0);
    assert_eq!(reports[SliceType::Urllc.index()].served_pkts, 0);
    assert_eq!(reports[SliceType::Urllc.index()].min_delay_ms, 0.0);
}

#[test]
fn peek_is_non_destructive() {
    let mut q = SliceQueueDisc::new(&ClassParamsTable::default());
    assert!(q.peek().is_none());
    q.enqueue(class_pkt(5, 60, SliceType::Mmtc.dscp()), SimTime::ZERO)
        .expect("enqueue");
    assert_eq!(q.peek().map(|p| p.id), Some(5));
    assert_eq!(q.peek().map(|p| p.id), Some(5));
    assert_eq!(q.len(), 1);
    assert_eq!(q.bytes(), 60);
}

#[test]
fn single_backlogged_class_gets_all_service() {
    let mut q = SliceQueueDisc::new(&ClassParamsTable::default());
    fill(&mut q, SliceType::Mmtc, 12, 50, 0);
    assert_eq!(served_classes(&mut q, 12), [0, 0, 12]);
    assert!(q.dequeue(SimTime::ZERO).is_none());
}

#[test]
fn weight_change_applies_to_next_decision_and_zero_weight_is_best_effort() {
    let mut q = SliceQueueDisc::from_parts([QueueLimit::UNBOUNDED; 3], [1, 1, 1]);
    fill(&mut q, SliceType::Urllc, 3, 100, 0);
    fill(&mut q, SliceType::Embb, 2, 100, 10);

    q.set_weight(SliceType::Urllc, 0);
    assert_eq!(q.weight(SliceType::Urllc), 0);

    let order: Vec<u64> = std::iter::from_fn(|| q.dequeue(SimTime::ZERO))
        .map(|p| p.id)
        .collect();
    assert_eq!(order, vec![10, 11, 0, 1, 2]);
}

#[test]
fn set_weights_from_class_table() {
    let mut table = ClassParamsTable::default();
    table.set_weight(SliceType::Embb, 40);
    let mut q = SliceQueueDisc::new(&ClassParamsTable::default());
    q.set_weights(table.weights());
    assert_eq!(q.weight(SliceType::Urllc), 80);
    assert_eq!(q.weight(SliceType::Embb), 40);
    assert_eq!(q.weight(SliceType::Mmtc), 5);
}
