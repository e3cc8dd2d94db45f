//! 数据包接收端
//!
//! 监听一个 UDP 端口，统计总包数/字节数、按来源流分组的计数与到达时刻，
//! 并根据包上的发送时间戳记录单向时延 (OWD)。

use std::collections::BTreeMap;
use std::fmt;
use std::net::{Ipv4Addr, SocketAddrV4};

use tracing::{debug, error, info, trace};

use super::AppState;
use super::events::SinkRateSample;
use crate::net::{AppId, Network, NodeId, Packet};
use crate::sim::{RepeatingTimer, SimTime, Simulator};

#[derive(Debug, Clone)]
pub struct SinkConfig {
    pub port: u16,
    /// 仅接收发往该地址的包；None 表示本节点地址
    pub local: Option<Ipv4Addr>,
    /// 速率采样周期；None 关闭采样
    pub rate_interval: Option<SimTime>,
}

impl SinkConfig {
    pub fn new(port: u16) -> Self {
        Self {
            port,
            local: None,
            rate_interval: Some(SimTime::from_secs(1)),
        }
    }

    pub fn with_local(mut self, addr: Ipv4Addr) -> Self {
        self.local = Some(addr);
        self
    }

    pub fn with_rate_interval(mut self, interval: Option<SimTime>) -> Self {
        self.rate_interval = interval;
        self
    }
}

/// 来源流 (地址, 端口)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FlowKey {
    pub addr: Ipv4Addr,
    pub port: u16,
}

impl From<SocketAddrV4> for FlowKey {
    fn from(a: SocketAddrV4) -> Self {
        Self {
            addr: *a.ip(),
            port: a.port(),
        }
    }
}

impl fmt::Display for FlowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.addr, self.port)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlowStats {
    pub packets: u64,
    pub bytes: u64,
    /// 每个包的到达时刻
    pub arrivals: Vec<SimTime>,
}

/// 一条 OWD 记录
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwdRecord {
    pub arrival: SimTime,
    pub owd: SimTime,
}

#[derive(Debug)]
pub struct PacketSink {
    id: AppId,
    node: NodeId,
    cfg: SinkConfig,
    state: AppState,
    listen: Option<SocketAddrV4>,
    total_packets: u64,
    total_bytes: u64,
    untagged_packets: u64,
    flows: BTreeMap<FlowKey, FlowStats>,
    records: Vec<OwdRecord>,
    first_rx: Option<SimTime>,
    last_rate_bps: Option<f64>,
    rate_timer: Option<RepeatingTimer>,
}

impl PacketSink {
    pub fn new(id: AppId, node: NodeId, cfg: SinkConfig) -> Self {
        Self {
            id,
            node,
            cfg,
            state: AppState::Idle,
            listen: None,
            total_packets: 0,
            total_bytes: 0,
            untagged_packets: 0,
            flows: BTreeMap::new(),
            records: Vec::new(),
            first_rx: None,
            last_rate_bps: None,
            rate_timer: None,
        }
    }

    pub fn id(&self) -> AppId {
        self.id
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn config(&self) -> &SinkConfig {
        &self.cfg
    }

    pub fn state(&self) -> AppState {
        self.state
    }

    pub fn listen_addr(&self) -> Option<SocketAddrV4> {
        self.listen
    }

    pub fn total_packets(&self) -> u64 {
        self.total_packets
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// 收到但没有发送时间戳的包数
    pub fn untagged_packets(&self) -> u64 {
        self.untagged_packets
    }

    pub fn flow_stats(&self) -> &BTreeMap<FlowKey, FlowStats> {
        &self.flows
    }

    /// 按到达顺序的 OWD 样本
    pub fn owd_samples(&self) -> impl Iterator<Item = SimTime> + '_ {
        self.records.iter().map(|r| r.owd)
    }

    pub fn owd_records(&self) -> &[OwdRecord] {
        &self.records
    }

    /// 最近一次速率采样 (bit/s)
    pub fn last_rate_bps(&self) -> Option<f64> {
        self.last_rate_bps
    }

    pub fn start(&mut self, sim: &mut Simulator, net: &mut Network) {
        if self.state != AppState::Idle {
            return;
        }
        match net.udp_listen(self.node, self.cfg.local, self.cfg.port, self.id) {
            Ok(addr) => {
                info!(app = ?self.id, %addr, "📥 接收端开始监听");
                self.listen = Some(addr);
                self.state = AppState::Running;
            }
            Err(e) => {
                error!(app = ?self.id, port = self.cfg.port, error = %e, "监听失败");
                self.state = AppState::Failed;
                return;
            }
        }
        if let Some(interval) = self.cfg.rate_interval.filter(|i| *i > SimTime::ZERO) {
            let mut timer = RepeatingTimer::new(interval);
            timer.rearm(sim, SinkRateSample { app: self.id });
            self.rate_timer = Some(timer);
        }
    }

    /// 关闭监听并取消速率采样；之后到达的包被忽略
    pub fn stop(&mut self, sim: &mut Simulator, net: &mut Network) {
        if self.state != AppState::Running {
            return;
        }
        self.state = AppState::Stopped;
        if let Some(mut t) = self.rate_timer.take() {
            t.cancel(sim);
        }
        if self.listen.take().is_some() {
            net.udp_close(self.node, self.cfg.port);
        }
        info!(
            app = ?self.id,
            packets = self.total_packets,
            bytes = self.total_bytes,
            "🛑 接收端停止"
        );
    }

    /// 处理一个到达的包；停止后的包不计入，返回是否被接收
    pub fn on_receive(&mut self, now: SimTime, from: SocketAddrV4, pkt: &Packet) -> bool {
        if self.state == AppState::Stopped {
            trace!(app = ?self.id, pkt_id = pkt.id, "接收端已停止，忽略");
            return false;
        }
        let size = pkt.size_bytes as u64;
        self.total_packets += 1;
        self.total_bytes += size;
        self.first_rx.get_or_insert(now);

        let flow = self.flows.entry(FlowKey::from(from)).or_default();
        flow.packets += 1;
        flow.bytes += size;
        flow.arrivals.push(now);

        match pkt.time_tag {
            Some(tag) => {
                let owd = now.saturating_sub(tag.sent_at);
                self.records.push(OwdRecord { arrival: now, owd });
                debug!(app = ?self.id, pkt_id = pkt.id, %from, owd_ms = owd.as_millis_f64(), "收到");
            }
            None => {
                self.untagged_packets += 1;
                debug!(app = ?self.id, pkt_id = pkt.id, %from, "收到无时间戳的包");
            }
        }
        true
    }

    pub(crate) fn on_rate_timer(&mut self, sim: &mut Simulator) {
        let Some(timer) = self.rate_timer.as_mut() else {
            return;
        };
        timer.fired();
        if self.state != AppState::Running {
            return;
        }
        let now = sim.now();
        if let Some(first) = self.first_rx {
            let elapsed = now.saturating_sub(first).as_secs_f64();
            if elapsed > 0.0 {
                let bps = self.total_bytes as f64 * 8.0 / elapsed;
                self.last_rate_bps = Some(bps);
                debug!(app = ?self.id, rate_mbps = bps / 1e6, "接收速率");
            }
        }
        timer.rearm(sim, SinkRateSample { app: self.id });
    }
}
