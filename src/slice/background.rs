//! 背景流量
//!
//! 在源/宿节点之间随机安排一批不打 DSCP 标记的 UDP 突发流。未标记的包在
//! 切片调度器中落入默认类 (eMBB)，用来给各交换机出口加上交叉流量。

use std::net::SocketAddrV4;

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::error::SliceError;
use super::instance::SOURCE_DRAIN;
use crate::app::{schedule_app, GeneratorConfig, PacketSizeDist, SinkConfig};
use crate::net::{AppId, Network, NodeId};
use crate::sim::{SimTime, Simulator};

/// 第 i 个源节点的突发流占用端口 `9000 + i * bursts_per_source ..`
pub const BACKGROUND_BASE_PORT: u16 = 9000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackgroundConfig {
    /// 每个源节点的突发流数量
    pub bursts_per_source: u32,
    pub min_rate_mbps: f64,
    pub max_rate_mbps: f64,
    pub min_duration_s: f64,
    pub max_duration_s: f64,
    pub packet_bytes: u32,
    /// 每个突发流的发包上限（0 = 不限）
    pub max_packets: u64,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            bursts_per_source: 2,
            min_rate_mbps: 1.0,
            max_rate_mbps: 10.0,
            min_duration_s: 0.1,
            max_duration_s: 1.0,
            packet_bytes: 1024,
            max_packets: 1000,
        }
    }
}

impl BackgroundConfig {
    pub fn validate(&self) -> Result<(), SliceError> {
        let bad = |what: &str| Err(SliceError::InvalidBackground(what.to_string()));
        let rates_ok = self.min_rate_mbps.is_finite()
            && self.max_rate_mbps.is_finite()
            && self.min_rate_mbps > 0.0
            && self.min_rate_mbps <= self.max_rate_mbps;
        if !rates_ok {
            return bad("rate range must satisfy 0 < min <= max");
        }
        let durations_ok = self.min_duration_s.is_finite()
            && self.max_duration_s.is_finite()
            && self.min_duration_s > 0.0
            && self.min_duration_s <= self.max_duration_s;
        if !durations_ok {
            return bad("duration range must satisfy 0 < min <= max");
        }
        if self.packet_bytes == 0 {
            return bad("packet size must be positive");
        }
        Ok(())
    }
}

/// 一个已安装的突发流
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Burst {
    pub source: NodeId,
    pub sink: NodeId,
    pub port: u16,
    pub start: SimTime,
    pub stop: SimTime,
    pub rate_mbps: f64,
    pub generator: AppId,
    pub sink_app: AppId,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct BackgroundReport {
    pub bursts: usize,
    pub sent_packets: u64,
    pub sent_bytes: u64,
    pub received_packets: u64,
    pub received_bytes: u64,
}

#[derive(Debug)]
pub struct BackgroundTraffic {
    cfg: BackgroundConfig,
    rng: StdRng,
    bursts: Vec<Burst>,
}

impl BackgroundTraffic {
    pub fn new(cfg: BackgroundConfig, seed: u64) -> Self {
        Self {
            cfg,
            rng: StdRng::seed_from_u64(seed),
            bursts: Vec::new(),
        }
    }

    pub fn config(&self) -> &BackgroundConfig {
        &self.cfg
    }

    pub fn bursts(&self) -> &[Burst] {
        &self.bursts
    }

    /// 为每个源节点安排 `bursts_per_source` 个突发流，宿节点按轮转选取且不同于源。
    /// 先校验全部输入，出错时不安装任何应用。
    pub fn schedule_random_bursts(
        &mut self,
        net: &mut Network,
        sim: &mut Simulator,
        sources: &[NodeId],
        sinks: &[NodeId],
        end: SimTime,
    ) -> Result<&[Burst], SliceError> {
        self.cfg.validate()?;
        if end == SimTime::ZERO {
            return Err(SliceError::ZeroDuration);
        }
        if sources.is_empty() {
            return Err(SliceError::EmptySources);
        }
        if sinks.is_empty() {
            return Err(SliceError::EmptySinks);
        }
        let mut plan = Vec::with_capacity(sources.len());
        for (i, &src) in sources.iter().enumerate() {
            let dst = (0..sinks.len())
                .map(|k| sinks[(i + k) % sinks.len()])
                .find(|&d| d != src)
                .ok_or(SliceError::NoDistinctPair(src))?;
            net.node_addr(src)?;
            let dst_ip = net.node_addr(dst)?;
            let base = burst_base_port(i, self.cfg.bursts_per_source)?;
            plan.push((src, dst, SocketAddrV4::new(dst_ip, base)));
        }

        info!(
            sources = sources.len(),
            bursts_per_source = self.cfg.bursts_per_source,
            end = %end,
            "🌊 安排背景流量"
        );
        let first = self.bursts.len();
        for (src, dst, base) in plan {
            self.schedule_between(net, sim, src, dst, base, end);
        }
        Ok(&self.bursts[first..])
    }

    fn schedule_between(
        &mut self,
        net: &mut Network,
        sim: &mut Simulator,
        source: NodeId,
        sink: NodeId,
        base: SocketAddrV4,
        end: SimTime,
    ) {
        let cfg = self.cfg.clone();
        for k in 0..cfg.bursts_per_source {
            let port = base.port() + k as u16;
            let start = SimTime::from_secs_f64(self.rng.gen_range(0.0..end.as_secs_f64()));
            let duration = self.rng.gen_range(cfg.min_duration_s..=cfg.max_duration_s);
            let stop = start.saturating_add(SimTime::from_secs_f64(duration));
            let rate_mbps = self.rng.gen_range(cfg.min_rate_mbps..=cfg.max_rate_mbps);

            let gen_cfg = GeneratorConfig::new(
                SocketAddrV4::new(*base.ip(), port),
                rate_mbps * 1e6,
                PacketSizeDist::Fixed(cfg.packet_bytes),
            )
            .with_max_packets(cfg.max_packets)
            .with_seed(self.rng.next_u64());
            let generator = net.install_generator(source, gen_cfg);
            let sink_app = net.install_sink(sink, SinkConfig::new(port).with_rate_interval(None));
            schedule_app(sim, generator, start, Some(stop));
            schedule_app(sim, sink_app, start, Some(stop.saturating_add(SOURCE_DRAIN)));

            debug!(?source, ?sink, port, %start, %stop, rate_mbps, "背景突发流");
            self.bursts.push(Burst {
                source,
                sink,
                port,
                start,
                stop,
                rate_mbps,
                generator,
                sink_app,
            });
        }
    }

    pub fn report(&self, net: &Network) -> BackgroundReport {
        let mut r = BackgroundReport {
            bursts: self.bursts.len(),
            ..BackgroundReport::default()
        };
        for b in &self.bursts {
            if let Some(g) = net.apps.generator(b.generator) {
                r.sent_packets += g.packets_sent();
                r.sent_bytes += g.bytes_sent();
            }
            if let Some(s) = net.apps.sink(b.sink_app) {
                r.received_packets += s.total_packets();
                r.received_bytes += s.total_bytes();
            }
        }
        info!(
            bursts = r.bursts,
            sent = r.sent_packets,
            received = r.received_packets,
            "背景流量统计"
        );
        r
    }
}

fn burst_base_port(index: usize, per_source: u32) -> Result<u16, SliceError> {
    let first = u32::try_from(index)
        .ok()
        .and_then(|i| i.checked_mul(per_source))
        .and_then(|p| p.checked_add(BACKGROUND_BASE_PORT as u32));
    let last = first.and_then(|p| p.checked_add(per_source.saturating_sub(1)));
    match (first, last) {
        (Some(p), Some(l)) if l <= u16::MAX as u32 => Ok(p as u16),
        _ => Err(SliceError::InvalidBackground(format!(
            "burst ports of source {index} exceed the port range"
        ))),
    }
}
