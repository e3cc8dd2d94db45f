//! 应用层：流量发生器与接收端
//!
//! 应用实例保存在 `Network::apps` 中，由 `AppId` 索引；生命周期事件
//! （启动/停止/发送/速率采样）通过仿真器调度。

mod events;
mod generator;
mod sink;

pub use events::{GeneratorSend, SinkRateSample, StartApp, StopApp, schedule_app};
pub use generator::{GeneratorConfig, InterArrival, PacketSizeDist, TrafficGenerator, GAP_BATCH};
pub use sink::{FlowKey, FlowStats, OwdRecord, PacketSink, SinkConfig};

use std::net::SocketAddrV4;

use crate::net::{AppId, Network, NodeId, Packet};
use crate::sim::SimTime;

/// 应用生命周期状态（一次性：不支持停止后重启）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Idle,
    Running,
    Stopped,
    /// 传输层 bind/connect 失败，启动被放弃
    Failed,
}

#[derive(Debug)]
pub enum App {
    Generator(TrafficGenerator),
    Sink(PacketSink),
}

/// 应用表
#[derive(Debug, Default)]
pub struct AppTable {
    apps: Vec<Option<App>>,
}

impl AppTable {
    fn insert(&mut self, make: impl FnOnce(AppId) -> App) -> AppId {
        let id = AppId(self.apps.len());
        self.apps.push(Some(make(id)));
        id
    }

    pub fn len(&self) -> usize {
        self.apps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.apps.is_empty()
    }

    pub fn generator(&self, id: AppId) -> Option<&TrafficGenerator> {
        match self.apps.get(id.0)? {
            Some(App::Generator(g)) => Some(g),
            _ => None,
        }
    }

    pub fn sink(&self, id: AppId) -> Option<&PacketSink> {
        match self.apps.get(id.0)? {
            Some(App::Sink(s)) => Some(s),
            _ => None,
        }
    }

    pub fn sink_mut(&mut self, id: AppId) -> Option<&mut PacketSink> {
        match self.apps.get_mut(id.0)? {
            Some(App::Sink(s)) => Some(s),
            _ => None,
        }
    }

    /// 暂时取出应用，避免 `&mut Network` 与 `&mut App` 重叠借用
    pub(crate) fn take(&mut self, id: AppId) -> Option<App> {
        self.apps.get_mut(id.0)?.take()
    }

    pub(crate) fn put(&mut self, id: AppId, app: App) {
        if let Some(slot) = self.apps.get_mut(id.0) {
            *slot = Some(app);
        }
    }

    pub(crate) fn deliver(&mut self, id: AppId, now: SimTime, from: SocketAddrV4, pkt: &Packet) {
        if let Some(sink) = self.sink_mut(id) {
            sink.on_receive(now, from, pkt);
        }
    }
}

impl Network {
    /// 在节点上创建流量发生器（尚未启动）
    pub fn install_generator(&mut self, node: NodeId, cfg: GeneratorConfig) -> AppId {
        self.apps
            .insert(|id| App::Generator(TrafficGenerator::new(id, node, cfg)))
    }

    /// 在节点上创建接收端（尚未启动）
    pub fn install_sink(&mut self, node: NodeId, cfg: SinkConfig) -> AppId {
        self.apps.insert(|id| App::Sink(PacketSink::new(id, node, cfg)))
    }
}
