//! 应用生命周期事件

use tracing::trace;

use super::App;
use crate::net::{AppId, NetWorld};
use crate::sim::{Event, SimTime, Simulator, World};

/// 在 `start` 启动应用，并（可选）在 `stop` 停止它
pub fn schedule_app(sim: &mut Simulator, app: AppId, start: SimTime, stop: Option<SimTime>) {
    sim.schedule(start, StartApp { app });
    if let Some(stop) = stop {
        sim.schedule(stop.max(start), StopApp { app });
    }
}

fn with_app<F>(world: &mut dyn World, app: AppId, f: F)
where
    F: FnOnce(&mut App, &mut crate::net::Network),
{
    let Some(w) = world.as_any_mut().downcast_mut::<NetWorld>() else {
        return;
    };
    let Some(mut a) = w.net.apps.take(app) else {
        trace!(?app, "应用不存在");
        return;
    };
    f(&mut a, &mut w.net);
    w.net.apps.put(app, a);
}

/// 事件：启动应用
#[derive(Debug)]
pub struct StartApp {
    pub app: AppId,
}

impl Event for StartApp {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        with_app(world, self.app, |a, net| match a {
            App::Generator(g) => g.start(sim, net),
            App::Sink(s) => s.start(sim, net),
        });
    }
}

/// 事件：停止应用
#[derive(Debug)]
pub struct StopApp {
    pub app: AppId,
}

impl Event for StopApp {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        with_app(world, self.app, |a, net| match a {
            App::Generator(g) => g.stop(sim, net),
            App::Sink(s) => s.stop(sim, net),
        });
    }
}

/// 事件：发生器发送下一个 packet
#[derive(Debug)]
pub struct GeneratorSend {
    pub app: AppId,
}

impl Event for GeneratorSend {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        with_app(world, self.app, |a, net| {
            if let App::Generator(g) = a {
                g.on_send_timer(sim, net);
            }
        });
    }
}

/// 事件：接收端周期性计算接收速率
#[derive(Debug)]
pub struct SinkRateSample {
    pub app: AppId,
}

impl Event for SinkRateSample {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        with_app(world, self.app, |a, _net| {
            if let App::Sink(s) = a {
                s.on_rate_timer(sim);
            }
        });
    }
}
