//! 仿真核心模块
//!
//! 此模块包含事件驱动仿真的核心组件，如仿真时间、事件、定时器、世界和仿真器，
//! 以及场景描述。

// 子模块声明
mod event;
mod scenario;
mod scheduled_event;
mod simulator;
mod time;
mod timer;
mod world;

// 重新导出公共接口
pub use event::{Event, EventId};
pub use scenario::{ScenarioError, ScenarioSpec, SliceMix, TopologySpec};
pub use scheduled_event::ScheduledEvent;
pub use simulator::Simulator;
pub use time::SimTime;
pub use timer::{RepeatingTimer, Timer};
pub use world::World;
