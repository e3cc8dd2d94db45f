//! 网络切片仿真
//!
//! 构建拓扑、在交换机出口安装切片调度器、批量创建切片并运行，
//! 结束后输出切片/队列统计，导出 OWD 记录。

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;

use clap::{Parser, ValueEnum};
use serde::Serialize;
use slicescope_rs::net::{NetWorld, Stats};
use slicescope_rs::queue::ClassQueueReport;
use slicescope_rs::sim::{ScenarioError, ScenarioSpec, Simulator, SliceMix, TopologySpec};
use slicescope_rs::slice::{
    BackgroundReport, BackgroundTraffic, OrchestratorConfig, PairSelection,
    SliceOrchestrator, SliceReport, SliceType,
};
use slicescope_rs::topo::{build_from_spec, install_slice_queues};
use tracing::{error, info};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TopoKind {
    Dumbbell,
    Linear,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Selection {
    Random,
    RoundRobin,
}

#[derive(Debug, Parser)]
#[command(name = "slice_sim", about = "网络切片仿真：多类型切片共享交换机出口")]
struct Args {
    /// 场景文件（JSON）；命令行参数覆盖其中的字段
    #[arg(long)]
    scenario: Option<PathBuf>,

    #[arg(long, value_enum)]
    topology: Option<TopoKind>,

    /// dumbbell 每侧主机数 / linear 每台交换机的主机数
    #[arg(long)]
    hosts: Option<usize>,

    /// linear 拓扑的交换机数
    #[arg(long)]
    switches: Option<usize>,

    /// 切片总数（类型均匀随机，或按 --class-probs 抽取）
    #[arg(long)]
    num_slices: Option<u32>,

    /// 按类型指定切片数，例如 "URLLC=2,eMBB=1"
    #[arg(long)]
    per_class: Option<String>,

    /// 类型概率表，例如 "URLLC=0.5,eMBB=0.3,mMTC=0.2"
    #[arg(long)]
    class_probs: Option<String>,

    /// 调度权重，例如 "URLLC=80,eMBB=15,mMTC=5"
    #[arg(long)]
    weights: Option<String>,

    /// 仿真时长（秒）
    #[arg(long)]
    duration_s: Option<f64>,

    /// 每个应用的发包上限（0 = 不限）
    #[arg(long)]
    max_packets: Option<u64>,

    /// 每个切片的应用对数
    #[arg(long)]
    num_apps: Option<u32>,

    #[arg(long)]
    seed: Option<u64>,

    #[arg(long, value_enum)]
    selection: Option<Selection>,

    /// 不在交换机出口安装切片调度器（保持默认 DropTail）
    #[arg(long)]
    no_slice_queues: bool,

    /// 每个源节点的背景突发流数（未标记流量，落入 eMBB 队列）
    #[arg(long)]
    background_bursts: Option<u32>,

    /// OWD 记录输出文件（CSV）
    #[arg(long)]
    owd_csv: Option<PathBuf>,

    /// 汇总输出文件（JSON）
    #[arg(long)]
    summary_json: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct LinkSummary {
    link: usize,
    from: String,
    to: String,
    classes: Vec<ClassQueueReport>,
}

#[derive(Debug, Serialize)]
struct Summary {
    duration_s: f64,
    seed: u64,
    executed_events: u64,
    network: Stats,
    slices: Vec<SliceReport>,
    queues: Vec<LinkSummary>,
    owd_rows: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    background: Option<BackgroundReport>,
}

fn parse_class_map<T: FromStr>(arg: &str, text: &str) -> Result<BTreeMap<SliceType, T>, ScenarioError> {
    let bad = |item: &str| ScenarioError::InvalidArgument(format!("--{arg}: cannot parse `{item}`"));
    let mut out = BTreeMap::new();
    for item in text.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (k, v) = item.split_once('=').ok_or_else(|| bad(item))?;
        let class = SliceType::from_str(k.trim()).map_err(|_| bad(item))?;
        let value = v.trim().parse::<T>().map_err(|_| bad(item))?;
        out.insert(class, value);
    }
    Ok(out)
}

fn apply_overrides(spec: &mut ScenarioSpec, args: &Args) -> Result<(), ScenarioError> {
    if let Some(kind) = args.topology {
        spec.topology = match kind {
            TopoKind::Dumbbell => TopologySpec::default(),
            TopoKind::Linear => TopologySpec::linear(),
        };
    }
    if let Some(n) = args.hosts {
        match &mut spec.topology {
            TopologySpec::Dumbbell { hosts_per_side, .. } => *hosts_per_side = n,
            TopologySpec::Linear { hosts_per_switch, .. } => *hosts_per_switch = n,
        }
    }
    if let Some(n) = args.switches {
        if let TopologySpec::Linear { switches, .. } = &mut spec.topology {
            *switches = n;
        }
    }

    if let Some(text) = &args.per_class {
        spec.slices = SliceMix::PerClass {
            counts: parse_class_map("per-class", text)?,
        };
    } else if let Some(text) = &args.class_probs {
        spec.slices = SliceMix::Weighted {
            count: args.num_slices.unwrap_or(spec.slices.total()),
            probabilities: parse_class_map("class-probs", text)?,
        };
    } else if let Some(count) = args.num_slices {
        spec.slices = match &spec.slices {
            SliceMix::Weighted { probabilities, .. } => SliceMix::Weighted {
                count,
                probabilities: probabilities.clone(),
            },
            _ => SliceMix::Total { count },
        };
    }
    if let Some(text) = &args.weights {
        spec.weights.extend(parse_class_map::<u32>("weights", text)?);
    }

    if let Some(d) = args.duration_s {
        spec.duration_s = d;
    }
    if let Some(n) = args.max_packets {
        spec.max_packets = n;
    }
    if let Some(n) = args.num_apps {
        spec.num_apps = n;
    }
    if let Some(s) = args.seed {
        spec.seed = s;
    }
    if let Some(sel) = args.selection {
        spec.selection = match sel {
            Selection::Random => PairSelection::Random,
            Selection::RoundRobin => PairSelection::RoundRobin,
        };
    }
    if args.no_slice_queues {
        spec.slice_queues = false;
    }
    if let Some(n) = args.background_bursts {
        let mut bg = spec.background.take().unwrap_or_default();
        bg.bursts_per_source = n;
        spec.background = Some(bg);
    }
    if let Some(p) = &args.owd_csv {
        spec.owd_csv = Some(p.clone());
    }
    Ok(())
}

fn run(args: &Args) -> Result<(), ScenarioError> {
    let mut spec = match &args.scenario {
        Some(path) => ScenarioSpec::from_path(path)?,
        None => ScenarioSpec::default(),
    };
    apply_overrides(&mut spec, args)?;
    spec.validate()?;

    let mut sim = Simulator::default();
    let mut world = NetWorld::default();
    let topo = build_from_spec(&mut world.net, &spec.topology)?;
    let table = spec.class_table();
    if spec.slice_queues {
        install_slice_queues(&mut world.net, &topo.switches, &table);
    }

    let duration = spec.duration();
    let mut orch = SliceOrchestrator::new(OrchestratorConfig {
        duration,
        max_packets: spec.max_packets,
        num_apps: spec.num_apps,
        seed: spec.seed,
        selection: spec.selection,
        classes: table,
    });
    let (sources, sinks) = (&topo.sources, &topo.sinks);
    match &spec.slices {
        SliceMix::Total { count } => {
            orch.create_slices(&mut world.net, &mut sim, sources, sinks, *count)?;
        }
        SliceMix::PerClass { counts } => {
            orch.create_slices_per_class(&mut world.net, &mut sim, sources, sinks, counts)?;
        }
        SliceMix::Weighted { count, probabilities } => {
            let probs: Vec<(SliceType, f64)> =
                probabilities.iter().map(|(&t, &p)| (t, p)).collect();
            orch.create_slices_weighted(&mut world.net, &mut sim, sources, sinks, *count, &probs)?;
        }
    }

    let mut background = spec
        .background
        .clone()
        .map(|cfg| BackgroundTraffic::new(cfg, spec.seed.wrapping_add(1)));
    if let Some(bg) = background.as_mut() {
        bg.schedule_random_bursts(&mut world.net, &mut sim, sources, sinks, duration)?;
    }

    sim.run_until(duration, &mut world);

    let slices = orch.report_slice_stats(&world.net);
    let background = background.map(|bg| bg.report(&world.net));
    let mut queues = Vec::new();
    for r in world.net.queue_reports() {
        let name = |n| world.net.node_name(n).unwrap_or_default().to_string();
        for c in &r.classes {
            info!(
                link = r.link.0,
                from = %name(r.from),
                to = %name(r.to),
                class = %c.class,
                served = c.served_pkts,
                dropped = c.dropped_pkts,
                max_occupancy = c.max_occupancy,
                avg_delay_ms = c.avg_delay_ms,
                "队列统计"
            );
        }
        queues.push(LinkSummary {
            link: r.link.0,
            from: name(r.from),
            to: name(r.to),
            classes: r.classes,
        });
    }

    let owd_rows = match &spec.owd_csv {
        Some(path) => orch.export_owd_records(&world.net, path)?,
        None => orch.owd_rows(&world.net).len(),
    };

    if let Some(path) = &args.summary_json {
        let summary = Summary {
            duration_s: duration.as_secs_f64(),
            seed: spec.seed,
            executed_events: sim.executed_events(),
            network: world.net.stats.clone(),
            slices,
            queues,
            owd_rows,
            background,
        };
        let json = serde_json::to_string_pretty(&summary)?;
        fs::write(path, json).map_err(|source| ScenarioError::Io {
            path: path.clone(),
            source,
        })?;
    }

    println!(
        "done @ {}, delivered_pkts={}, dropped_pkts={}, owd_rows={}",
        sim.now(),
        world.net.stats.delivered_pkts,
        world.net.stats.dropped_pkts,
        owd_rows
    );
    Ok(())
}

fn main() -> ExitCode {
    // 初始化 tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "仿真失败");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
