//! 仿真器
//!
//! 定义事件驱动仿真器，维护当前时间与事件队列。

use super::event::{Event, EventId};
use super::scheduled_event::ScheduledEvent;
use super::time::SimTime;
use super::world::World;
use std::collections::{BinaryHeap, HashSet};
use tracing::{debug, info, trace};

/// 事件驱动仿真器：维护当前时间与事件队列。
///
/// 同一时刻的事件按调度顺序（序列号）执行；被取消的事件不会执行。
#[derive(Default)]
pub struct Simulator {
    now: SimTime,
    next_seq: u64,
    q: BinaryHeap<ScheduledEvent>,
    /// 仍在队列中且未被取消的事件序列号
    live: HashSet<u64>,
    executed: u64,
}

impl Simulator {
    /// 获取当前仿真时间
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// 已执行的事件总数
    pub fn executed_events(&self) -> u64 {
        self.executed
    }

    /// 队列中仍待执行的事件数
    pub fn pending_events(&self) -> usize {
        self.live.len()
    }

    /// 调度事件在指定时间执行；早于当前时间的调度会被钳制到当前时间。
    #[tracing::instrument(skip(self, ev), fields(event_type = std::any::type_name::<E>(), schedule_at = ?at))]
    pub fn schedule<E: Event>(&mut self, at: SimTime, ev: E) -> EventId {
        let at = at.max(self.now);
        let seq = self.next_seq;
        trace!(now = ?self.now, seq, "调度事件");

        self.next_seq = self.next_seq.wrapping_add(1);
        self.q.push(ScheduledEvent {
            at,
            seq,
            ev: Box::new(ev),
        });
        self.live.insert(seq);

        trace!(queue_size = self.q.len(), "事件已加入队列");
        EventId(seq)
    }

    /// 在当前时间之后 `delay` 调度事件
    pub fn schedule_in<E: Event>(&mut self, delay: SimTime, ev: E) -> EventId {
        let at = self.now.saturating_add(delay);
        self.schedule(at, ev)
    }

    /// 取消一个尚未执行的事件。返回该事件此前是否仍待执行。
    pub fn cancel(&mut self, id: EventId) -> bool {
        let removed = self.live.remove(&id.0);
        if removed {
            trace!(seq = id.0, "取消事件");
        }
        removed
    }

    /// 事件是否仍待执行（未执行且未取消）
    pub fn is_pending(&self, id: EventId) -> bool {
        self.live.contains(&id.0)
    }

    fn pop_live(&mut self) -> Option<ScheduledEvent> {
        while let Some(item) = self.q.pop() {
            if self.live.remove(&item.seq) {
                return Some(item);
            }
        }
        None
    }

    fn peek_live_at(&mut self) -> Option<SimTime> {
        while let Some(top) = self.q.peek() {
            if self.live.contains(&top.seq) {
                return Some(top.at);
            }
            self.q.pop();
        }
        None
    }

    /// 运行直到事件队列为空或到达 `until`。
    pub fn run_until(&mut self, until: SimTime, world: &mut dyn World) {
        while let Some(at) = self.peek_live_at() {
            if at > until {
                break;
            }
            let Some(item) = self.pop_live() else {
                break;
            };
            self.now = item.at;
            self.executed = self.executed.wrapping_add(1);
            item.ev.execute(self, world);
            world.on_tick(self);
        }
        self.now = self.now.max(until);
    }

    /// 运行所有事件直到队列为空。
    #[tracing::instrument(skip(self, world))]
    pub fn run(&mut self, world: &mut dyn World) {
        info!("▶️  开始运行仿真");
        debug!(now = ?self.now, queue_size = self.live.len(), "初始状态");

        let mut event_count = 0_u64;
        while let Some(item) = self.pop_live() {
            event_count += 1;
            self.now = item.at;
            self.executed = self.executed.wrapping_add(1);

            trace!(
                event_num = event_count,
                now = ?self.now,
                seq = item.seq,
                remaining_queue = self.live.len(),
                "执行事件"
            );

            item.ev.execute(self, world);
            world.on_tick(self);
        }

        info!(
            total_events = event_count,
            final_time = ?self.now,
            "✅ 仿真完成"
        );
    }
}
