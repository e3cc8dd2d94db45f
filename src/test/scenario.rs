use crate::queue::QueueLimit;
use crate::sim::{ScenarioError, ScenarioSpec, SimTime, SliceMix, TopologySpec};
use crate::slice::{PairSelection, SliceError, SliceType};

#[test]
fn empty_object_uses_defaults() {
    let spec = ScenarioSpec::from_json("{}").expect("parse");
    assert_eq!(spec.duration(), SimTime::from_secs(10));
    assert_eq!(spec.max_packets, 100);
    assert_eq!(spec.num_apps, 2);
    assert_eq!(spec.seed, 1);
    assert_eq!(spec.selection, PairSelection::Random);
    assert_eq!(spec.slices.total(), 3);
    assert!(spec.slice_queues);
    assert!(spec.owd_csv.is_none());
    assert!(matches!(
        spec.topology,
        TopologySpec::Dumbbell { hosts_per_side: 2, bottleneck_mbps: 100, .. }
    ));
    assert!(spec.validate().is_ok());
}

#[test]
fn parses_full_scenario() {
    let text = r#"{
        "topology": { "kind": "linear", "switches": 4, "hosts_per_switch": 1 },
        "duration_s": 2.5,
        "seed": 9,
        "selection": "round_robin",
        "slices": { "mode": "per_class", "counts": { "URLLC": 2, "mMTC": 3 } },
        "weights": { "eMBB": 30 },
        "class_params": {
            "URLLC": {
                "min_rate_mbps": 2.0,
                "max_rate_mbps": 4.0,
                "min_packet_bytes": 64,
                "max_packet_bytes": 128,
                "queue_limit": { "packets": 50 },
                "weight": 90
            }
        },
        "owd_csv": "out/owd.csv"
    }"#;
    let spec = ScenarioSpec::from_json(text).expect("parse");
    assert_eq!(spec.duration(), SimTime::from_millis(2_500));
    assert_eq!(spec.selection, PairSelection::RoundRobin);
    assert_eq!(spec.slices.total(), 5);
    assert!(matches!(
        spec.topology,
        TopologySpec::Linear { switches: 4, hosts_per_switch: 1, link_mbps: 1_000, .. }
    ));
    assert_eq!(
        spec.owd_csv.as_deref(),
        Some(std::path::Path::new("out/owd.csv"))
    );

    let table = spec.class_table();
    let urllc = table.get(SliceType::Urllc);
    assert_eq!(urllc.weight, 90);
    assert_eq!(urllc.queue_limit, QueueLimit::Packets(50));
    assert_eq!(table.get(SliceType::Embb).weight, 30);
    assert_eq!(table.get(SliceType::Mmtc).weight, 5);
    assert!(spec.validate().is_ok());
}

#[test]
fn weighted_mix_parses_probabilities() {
    let spec = ScenarioSpec::from_json(
        r#"{ "slices": { "mode": "weighted", "count": 8,
             "probabilities": { "urllc": 0.5, "embb": 0.5 } } }"#,
    )
    .expect("parse");
    match spec.slices {
        SliceMix::Weighted { count, probabilities } => {
            assert_eq!(count, 8);
            assert_eq!(probabilities.get(&SliceType::Urllc), Some(&0.5));
            assert!(!probabilities.contains_key(&SliceType::Mmtc));
        }
        other => panic!("unexpected mix {other:?}"),
    }
}

#[test]
fn rejects_invalid_scenarios() {
    assert!(matches!(
        ScenarioSpec::from_json(r#"{ "duration_s": "ten" }"#),
        Err(ScenarioError::Parse(_))
    ));
    assert!(matches!(
        ScenarioSpec::from_json(r#"{ "topology": { "kind": "ring" } }"#),
        Err(ScenarioError::Parse(_))
    ));

    let spec = ScenarioSpec {
        duration_s: 0.0,
        ..ScenarioSpec::default()
    };
    assert!(matches!(spec.validate(), Err(ScenarioError::InvalidDuration(_))));

    let spec = ScenarioSpec {
        duration_s: f64::NAN,
        ..ScenarioSpec::default()
    };
    assert!(matches!(spec.validate(), Err(ScenarioError::InvalidDuration(_))));

    let spec = ScenarioSpec {
        topology: TopologySpec::Linear {
            switches: 1,
            hosts_per_switch: 1,
            link_mbps: 1_000,
            link_latency_us: 100,
        },
        ..ScenarioSpec::default()
    };
    assert!(matches!(spec.validate(), Err(ScenarioError::InvalidTopology(_))));

    let spec = ScenarioSpec::from_json(
        r#"{ "class_params": { "mMTC": {
            "min_rate_mbps": 1.0, "max_rate_mbps": 2.0,
            "min_packet_bytes": 200, "max_packet_bytes": 100,
            "queue_limit": { "bytes": 1000 }, "weight": 1 } } }"#,
    )
    .expect("parse");
    assert!(matches!(
        spec.validate(),
        Err(ScenarioError::Slice(SliceError::InvalidPacketSizeRange { class: SliceType::Mmtc, .. }))
    ));
}

#[test]
fn missing_file_is_an_io_error() {
    let path = std::env::temp_dir().join("slicescope-missing-scenario.json");
    let _ = std::fs::remove_file(&path);
    match ScenarioSpec::from_path(&path) {
        Err(ScenarioError::Io { path: p, .. }) => assert_eq!(p, path),
        other => panic!("expected io error, got {other:?}"),
    }
}
