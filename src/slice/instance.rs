//! A slice: one class, one source/sink pair, `num_apps` generator/sink replicas.

use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use tracing::{debug, info};

use super::class::SliceType;
use super::error::SliceError;
use super::params::{ClassParamsTable, MAX_APP_RATE_MBPS, MIN_APP_RATE_MBPS};
use super::report::{OwdSummary, SliceReport};
use crate::app::{schedule_app, GeneratorConfig, OwdRecord, PacketSizeDist, SinkConfig};
use crate::net::{AppId, Network, NodeId};
use crate::sim::{SimTime, Simulator};

pub const BASE_PORT: u32 = 5000;
/// Ports reserved per slice id; also the per-slice application limit.
pub const PORT_STRIDE: u32 = 10;
pub const MAX_APPS_PER_SLICE: u32 = PORT_STRIDE;
/// Generators stop this long before the slice so in-flight packets can drain.
pub const SOURCE_DRAIN: SimTime = SimTime::from_secs(1);

/// First port of a slice: `5000 + id * 10`.
pub fn base_port(slice_id: u32) -> Result<u16, SliceError> {
    slice_id
        .checked_mul(PORT_STRIDE)
        .and_then(|p| p.checked_add(BASE_PORT))
        .filter(|p| p + PORT_STRIDE - 1 <= u16::MAX as u32)
        .map(|p| p as u16)
        .ok_or(SliceError::PortRangeExhausted(slice_id))
}

#[derive(Debug, Clone, PartialEq)]
pub struct SliceConfig {
    pub class: SliceType,
    pub source: NodeId,
    pub sink: NodeId,
    pub num_apps: u32,
    /// Per-application cap; 0 means unlimited.
    pub max_packets: u64,
    pub start: SimTime,
    pub stop: SimTime,
}

impl SliceConfig {
    pub fn new(class: SliceType, source: NodeId, sink: NodeId) -> Self {
        Self {
            class,
            source,
            sink,
            num_apps: 2,
            max_packets: 1,
            start: SimTime::ZERO,
            stop: SimTime::from_secs(10),
        }
    }

    pub fn with_window(mut self, start: SimTime, stop: SimTime) -> Self {
        self.start = start;
        self.stop = stop;
        self
    }

    pub fn with_num_apps(mut self, n: u32) -> Self {
        self.num_apps = n;
        self
    }

    pub fn with_max_packets(mut self, n: u64) -> Self {
        self.max_packets = n;
        self
    }

    pub fn validate(&self) -> Result<(), SliceError> {
        if self.num_apps == 0 {
            return Err(SliceError::ZeroApps);
        }
        if self.num_apps > MAX_APPS_PER_SLICE {
            return Err(SliceError::TooManyApps {
                requested: self.num_apps,
                max: MAX_APPS_PER_SLICE,
            });
        }
        if self.source == self.sink {
            return Err(SliceError::SameSourceAndSink(self.source));
        }
        if self.stop <= self.start {
            return Err(SliceError::InvalidWindow {
                start_s: self.start.as_secs_f64(),
                stop_s: self.stop.as_secs_f64(),
            });
        }
        Ok(())
    }

    /// Generator stop time: `SOURCE_DRAIN` before the slice stop, but never earlier than the
    /// middle of the window, so short windows still carry traffic.
    pub fn source_stop(&self) -> SimTime {
        let half = SimTime::from_nanos(self.stop.saturating_sub(self.start).as_nanos() / 2);
        self.stop.saturating_sub(SOURCE_DRAIN.min(half))
    }
}

/// One installed generator/sink pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AppPair {
    pub index: u32,
    pub port: u16,
    pub rate_mbps: f64,
    pub generator: AppId,
    pub sink: AppId,
}

/// Rate and size distributions shared by all generators of a slice.
#[derive(Debug, Clone)]
struct ClassDists {
    rate_mbps: Uniform<f64>,
    size: PacketSizeDist,
}

#[derive(Debug)]
pub struct Slice {
    id: u32,
    cfg: SliceConfig,
    rng: StdRng,
    dists: Option<ClassDists>,
    apps: Vec<AppPair>,
    installed: bool,
}

impl Slice {
    pub fn new(id: u32, cfg: SliceConfig, seed: u64) -> Result<Self, SliceError> {
        cfg.validate()?;
        base_port(id)?;
        Ok(Self {
            id,
            cfg,
            rng: StdRng::seed_from_u64(seed),
            dists: None,
            apps: Vec::new(),
            installed: false,
        })
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn class(&self) -> SliceType {
        self.cfg.class
    }

    pub fn dscp(&self) -> u8 {
        self.cfg.class.dscp()
    }

    pub fn config(&self) -> &SliceConfig {
        &self.cfg
    }

    pub fn apps(&self) -> &[AppPair] {
        &self.apps
    }

    pub fn is_configured(&self) -> bool {
        self.dists.is_some()
    }

    pub fn is_installed(&self) -> bool {
        self.installed
    }

    /// Builds the class's rate and packet-size distributions from the parameter table.
    pub fn configure(&mut self, table: &ClassParamsTable) -> Result<(), SliceError> {
        let class = self.cfg.class;
        let p = table.get(class);
        p.validate(class)?;
        self.dists = Some(ClassDists {
            rate_mbps: Uniform::new_inclusive(p.min_rate_mbps, p.max_rate_mbps),
            size: PacketSizeDist::Uniform {
                min: p.min_packet_bytes,
                max: p.max_packet_bytes,
            },
        });
        Ok(())
    }

    /// Creates and schedules `num_apps` generator/sink pairs. One-shot.
    pub fn install_apps(
        &mut self,
        net: &mut Network,
        sim: &mut Simulator,
    ) -> Result<&[AppPair], SliceError> {
        if self.installed {
            return Err(SliceError::AlreadyInstalled(self.id));
        }
        let dists = self.dists.clone().ok_or(SliceError::NotConfigured(self.id))?;
        net.node_addr(self.cfg.source)?;
        let dest_ip = net.node_addr(self.cfg.sink)?;
        let base = base_port(self.id)?;
        let source_stop = self.cfg.source_stop();

        info!(
            slice = self.id,
            class = %self.cfg.class,
            source = net.node_name(self.cfg.source).unwrap_or("?"),
            sink = net.node_name(self.cfg.sink).unwrap_or("?"),
            start = %self.cfg.start,
            stop = %self.cfg.stop,
            max_packets = self.cfg.max_packets,
            num_apps = self.cfg.num_apps,
            "🧩 安装切片"
        );

        for index in 0..self.cfg.num_apps {
            let port = base + index as u16;
            let rate_mbps = dists
                .rate_mbps
                .sample(&mut self.rng)
                .clamp(MIN_APP_RATE_MBPS, MAX_APP_RATE_MBPS);

            let gen_cfg = GeneratorConfig::new(
                std::net::SocketAddrV4::new(dest_ip, port),
                rate_mbps * 1e6,
                dists.size.clone(),
            )
            .with_dscp(self.cfg.class.dscp())
            .with_max_packets(self.cfg.max_packets)
            .with_seed(self.rng.next_u64());

            let generator = net.install_generator(self.cfg.source, gen_cfg);
            let sink = net.install_sink(self.cfg.sink, SinkConfig::new(port));
            schedule_app(sim, generator, self.cfg.start, Some(source_stop));
            schedule_app(sim, sink, self.cfg.start, Some(self.cfg.stop));

            debug!(slice = self.id, index, port, rate_mbps, ?generator, ?sink, "应用对");
            self.apps.push(AppPair {
                index,
                port,
                rate_mbps,
                generator,
                sink,
            });
        }
        self.installed = true;
        Ok(&self.apps)
    }

    pub fn packets_sent(&self, net: &Network) -> u64 {
        self.apps
            .iter()
            .filter_map(|a| net.apps.generator(a.generator))
            .map(|g| g.packets_sent())
            .sum()
    }

    pub fn packets_received(&self, net: &Network) -> u64 {
        self.apps
            .iter()
            .filter_map(|a| net.apps.sink(a.sink))
            .map(|s| s.total_packets())
            .sum()
    }

    /// All OWD records of this slice's sinks, sink by sink in receipt order.
    pub fn owd_records(&self, net: &Network) -> Vec<OwdRecord> {
        self.apps
            .iter()
            .filter_map(|a| net.apps.sink(a.sink))
            .flat_map(|s| s.owd_records().iter().copied())
            .collect()
    }

    pub fn report(&self, net: &Network) -> SliceReport {
        let mut sent_packets = 0;
        let mut sent_bytes = 0;
        let mut received_packets = 0;
        let mut received_bytes = 0;
        for pair in &self.apps {
            if let Some(g) = net.apps.generator(pair.generator) {
                sent_packets += g.packets_sent();
                sent_bytes += g.bytes_sent();
            }
            if let Some(s) = net.apps.sink(pair.sink) {
                received_packets += s.total_packets();
                received_bytes += s.total_bytes();
            }
        }
        let owd = OwdSummary::from_samples(self.owd_records(net).into_iter().map(|r| r.owd));
        SliceReport {
            slice_id: self.id,
            class: self.cfg.class,
            source: net.node_name(self.cfg.source).unwrap_or_default().to_string(),
            sink: net.node_name(self.cfg.sink).unwrap_or_default().to_string(),
            num_apps: self.cfg.num_apps,
            start_s: self.cfg.start.as_secs_f64(),
            stop_s: self.cfg.stop.as_secs_f64(),
            sent_packets,
            sent_bytes,
            received_packets,
            received_bytes,
            dropped_packets: sent_packets.saturating_sub(received_packets),
            owd,
        }
    }
}
