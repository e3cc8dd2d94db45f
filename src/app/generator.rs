//! 随机流量发生器
//!
//! 以指数分布的发送间隔（泊松到达）向固定目的地址发送 UDP 数据报，
//! 平均间隔 = 平均包长(bit) / 目标速率。每个包打上发送时间戳，
//! 供接收端计算单向时延。

use std::fmt;
use std::net::SocketAddrV4;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, error, info, warn};

use super::AppState;
use super::events::GeneratorSend;
use crate::net::{AppId, Network, NodeId, UdpSocket};
use crate::sim::{SimTime, Simulator, Timer};

/// 每次预先抽取的发送间隔个数
pub const GAP_BATCH: usize = 100;

/// 包长分布
#[derive(Clone)]
pub enum PacketSizeDist {
    Fixed(u32),
    /// 闭区间 [min, max] 上的均匀整数
    Uniform { min: u32, max: u32 },
    /// 自定义抽样函数；`mean_bytes` 用于推导平均发送间隔
    Custom {
        mean_bytes: f64,
        sample: Arc<dyn Fn(&mut StdRng) -> u32 + Send + Sync>,
    },
}

impl PacketSizeDist {
    pub fn custom(mean_bytes: f64, sample: impl Fn(&mut StdRng) -> u32 + Send + Sync + 'static) -> Self {
        Self::Custom {
            mean_bytes,
            sample: Arc::new(sample),
        }
    }

    pub fn sample(&self, rng: &mut StdRng) -> u32 {
        match self {
            Self::Fixed(n) => *n,
            Self::Uniform { min, max } => {
                let (lo, hi) = if min <= max { (*min, *max) } else { (*max, *min) };
                rng.gen_range(lo..=hi)
            }
            Self::Custom { sample, .. } => sample(rng),
        }
    }

    pub fn mean_bytes(&self) -> f64 {
        match self {
            Self::Fixed(n) => *n as f64,
            Self::Uniform { min, max } => (*min as f64 + *max as f64) / 2.0,
            Self::Custom { mean_bytes, .. } => *mean_bytes,
        }
    }
}

impl fmt::Debug for PacketSizeDist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(n) => f.debug_tuple("Fixed").field(n).finish(),
            Self::Uniform { min, max } => f
                .debug_struct("Uniform")
                .field("min", min)
                .field("max", max)
                .finish(),
            Self::Custom { mean_bytes, .. } => f
                .debug_struct("Custom")
                .field("mean_bytes", mean_bytes)
                .finish_non_exhaustive(),
        }
    }
}

/// 指数分布发送间隔，按批预抽
#[derive(Debug, Clone)]
pub struct InterArrival {
    mean_secs: f64,
    batch: Vec<f64>,
}

impl InterArrival {
    pub fn new(mean_secs: f64) -> Self {
        Self {
            mean_secs,
            batch: Vec::with_capacity(GAP_BATCH),
        }
    }

    /// 由平均包长与目标速率构造
    pub fn for_rate(mean_bytes: f64, rate_bps: f64) -> Self {
        Self::new(mean_bytes * 8.0 / rate_bps)
    }

    pub fn mean_secs(&self) -> f64 {
        self.mean_secs
    }

    /// 当前批中剩余的间隔数
    pub fn remaining(&self) -> usize {
        self.batch.len()
    }

    pub fn next_secs(&mut self, rng: &mut impl Rng) -> f64 {
        if self.batch.is_empty() {
            self.refill(rng);
        }
        self.batch.pop().unwrap_or(self.mean_secs)
    }

    pub fn next_gap(&mut self, rng: &mut impl Rng) -> SimTime {
        SimTime::from_secs_f64(self.next_secs(rng))
    }

    fn refill(&mut self, rng: &mut impl Rng) {
        // 逆变换抽样：-mean * ln(1 - U)，U ∈ [0, 1)
        let mean = self.mean_secs;
        self.batch.extend((0..GAP_BATCH).map(|_| {
            let u: f64 = rng.gen_range(0.0..1.0);
            -mean * (1.0 - u).ln()
        }));
    }
}

/// 发生器配置
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub dest: SocketAddrV4,
    /// 目标平均速率 (bit/s)，必须 > 0
    pub rate_bps: f64,
    pub packet_size: PacketSizeDist,
    /// 设置后写入 ToS 的高 6 位
    pub dscp: Option<u8>,
    /// 发送上限；0 表示不限
    pub max_packets: u64,
    pub seed: u64,
}

impl GeneratorConfig {
    pub fn new(dest: SocketAddrV4, rate_bps: f64, packet_size: PacketSizeDist) -> Self {
        Self {
            dest,
            rate_bps,
            packet_size,
            dscp: None,
            max_packets: 0,
            seed: 0,
        }
    }

    pub fn with_dscp(mut self, dscp: u8) -> Self {
        self.dscp = Some(dscp);
        self
    }

    pub fn with_max_packets(mut self, n: u64) -> Self {
        self.max_packets = n;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

#[derive(Debug)]
pub struct TrafficGenerator {
    id: AppId,
    node: NodeId,
    cfg: GeneratorConfig,
    rng: StdRng,
    gaps: InterArrival,
    socket: Option<UdpSocket>,
    send_timer: Timer,
    state: AppState,
    packets_sent: u64,
    bytes_sent: u64,
}

impl TrafficGenerator {
    pub fn new(id: AppId, node: NodeId, cfg: GeneratorConfig) -> Self {
        let gaps = InterArrival::for_rate(cfg.packet_size.mean_bytes(), cfg.rate_bps);
        Self {
            id,
            node,
            rng: StdRng::seed_from_u64(cfg.seed),
            gaps,
            cfg,
            socket: None,
            send_timer: Timer::new(),
            state: AppState::Idle,
            packets_sent: 0,
            bytes_sent: 0,
        }
    }

    pub fn id(&self) -> AppId {
        self.id
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.cfg
    }

    pub fn state(&self) -> AppState {
        self.state
    }

    pub fn packets_sent(&self) -> u64 {
        self.packets_sent
    }

    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }

    pub fn mean_gap_secs(&self) -> f64 {
        self.gaps.mean_secs()
    }

    pub fn local_addr(&self) -> Option<SocketAddrV4> {
        self.socket.as_ref().map(UdpSocket::local)
    }

    pub fn is_send_pending(&self, sim: &Simulator) -> bool {
        self.send_timer.is_armed(sim)
    }

    /// 绑定并连接 socket，然后立即调度第一次发送
    pub fn start(&mut self, sim: &mut Simulator, net: &mut Network) {
        if self.state != AppState::Idle {
            warn!(app = ?self.id, state = ?self.state, "发生器不可重复启动");
            return;
        }
        let rate_ok = self.cfg.rate_bps > 0.0 && self.gaps.mean_secs().is_finite();
        if !rate_ok {
            error!(app = ?self.id, rate_bps = self.cfg.rate_bps, "发送速率无效，放弃启动");
            self.state = AppState::Failed;
            return;
        }
        let mut sock = match net.udp_bind(self.node, None) {
            Ok(s) => s,
            Err(e) => {
                error!(app = ?self.id, error = %e, "socket bind 失败");
                self.state = AppState::Failed;
                return;
            }
        };
        if let Err(e) = net.udp_connect(&mut sock, self.cfg.dest) {
            error!(app = ?self.id, dest = %self.cfg.dest, error = %e, "socket connect 失败");
            net.udp_close(self.node, sock.local().port());
            self.state = AppState::Failed;
            return;
        }
        if let Some(dscp) = self.cfg.dscp {
            sock.set_tos(dscp << 2);
        }
        info!(
            app = ?self.id,
            local = %sock.local(),
            dest = %self.cfg.dest,
            rate_bps = self.cfg.rate_bps,
            dscp = ?self.cfg.dscp,
            "🚀 发生器启动"
        );
        self.socket = Some(sock);
        self.state = AppState::Running;
        let now = sim.now();
        self.send_timer.arm(sim, now, GeneratorSend { app: self.id });
    }

    /// 取消挂起的发送并关闭 socket；对未运行的发生器无效果
    pub fn stop(&mut self, sim: &mut Simulator, net: &mut Network) {
        if self.state != AppState::Running {
            return;
        }
        self.state = AppState::Stopped;
        self.send_timer.cancel(sim);
        if let Some(sock) = self.socket.take() {
            net.udp_close(self.node, sock.local().port());
        }
        info!(
            app = ?self.id,
            packets = self.packets_sent,
            bytes = self.bytes_sent,
            "🛑 发生器停止"
        );
    }

    pub(crate) fn on_send_timer(&mut self, sim: &mut Simulator, net: &mut Network) {
        self.send_timer.fired();
        if self.state != AppState::Running {
            return;
        }
        let Some(sock) = self.socket.as_ref() else {
            return;
        };

        let size = self.cfg.packet_size.sample(&mut self.rng);
        let now = sim.now();
        match net.udp_send(sock, size, sim, |p| p.set_time_tag(now)) {
            Ok(pkt_id) => {
                self.packets_sent += 1;
                self.bytes_sent += size as u64;
                debug!(app = ?self.id, pkt_id, size, "发送");
            }
            Err(e) => {
                warn!(app = ?self.id, error = %e, "发送失败，发生器终止");
                self.send_timer.cancel(sim);
                if let Some(sock) = self.socket.take() {
                    net.udp_close(self.node, sock.local().port());
                }
                self.state = AppState::Failed;
                return;
            }
        }

        if self.cfg.max_packets > 0 && self.packets_sent >= self.cfg.max_packets {
            info!(app = ?self.id, max_packets = self.cfg.max_packets, "达到发送上限");
            self.stop(sim, net);
            return;
        }
        let gap = self.gaps.next_gap(&mut self.rng);
        self.send_timer.arm_in(sim, gap, GeneratorSend { app: self.id });
    }
}
