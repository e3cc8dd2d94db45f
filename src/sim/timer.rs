//! 定时器句柄
//!
//! 把“已调度的回调”包装成可显式取消的句柄：停止应用时取消挂起的事件，
//! 避免停止之后回调仍然执行。

use super::event::{Event, EventId};
use super::simulator::Simulator;
use super::time::SimTime;

/// 单次定时器：最多持有一个挂起事件。
#[derive(Debug, Default)]
pub struct Timer {
    pending: Option<EventId>,
}

impl Timer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 在 `at` 调度事件；若已有挂起事件则先取消。
    pub fn arm<E: Event>(&mut self, sim: &mut Simulator, at: SimTime, ev: E) {
        self.cancel(sim);
        self.pending = Some(sim.schedule(at, ev));
    }

    /// 在当前时间之后 `delay` 调度事件
    pub fn arm_in<E: Event>(&mut self, sim: &mut Simulator, delay: SimTime, ev: E) {
        let at = sim.now().saturating_add(delay);
        self.arm(sim, at, ev);
    }

    /// 取消挂起事件，返回是否真的取消了一个待执行事件。
    pub fn cancel(&mut self, sim: &mut Simulator) -> bool {
        match self.pending.take() {
            Some(id) => sim.cancel(id),
            None => false,
        }
    }

    /// 事件触发时调用：释放句柄（事件已不在队列中）。
    pub fn fired(&mut self) {
        self.pending = None;
    }

    pub fn is_armed(&self, sim: &Simulator) -> bool {
        self.pending.is_some_and(|id| sim.is_pending(id))
    }
}

/// 周期定时器：固定间隔重复触发，停止时必须 `cancel`。
#[derive(Debug)]
pub struct RepeatingTimer {
    interval: SimTime,
    timer: Timer,
}

impl RepeatingTimer {
    pub fn new(interval: SimTime) -> Self {
        Self {
            interval,
            timer: Timer::new(),
        }
    }

    pub fn interval(&self) -> SimTime {
        self.interval
    }

    /// 调度下一次触发（当前时间 + interval）
    pub fn rearm<E: Event>(&mut self, sim: &mut Simulator, ev: E) {
        self.timer.arm_in(sim, self.interval, ev);
    }

    pub fn fired(&mut self) {
        self.timer.fired();
    }

    pub fn cancel(&mut self, sim: &mut Simulator) -> bool {
        self.timer.cancel(sim)
    }

    pub fn is_armed(&self, sim: &Simulator) -> bool {
        self.timer.is_armed(sim)
    }
}
