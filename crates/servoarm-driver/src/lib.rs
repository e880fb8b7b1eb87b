//! 驱动层模块
//!
//! 本模块提供舵机机械臂的设备驱动功能，包括：
//! - 关节状态（原子存储，钳位写入，变更通知）
//! - 串口链路管理（调试/在线模式，写入互斥）
//! - 指令分发（唯一出口，审计日志，顺序保证）
//! - 读线程生命周期
//! - 钩子系统：角度变化、指令下发、原始遥测、路径状态通知
//!
//! # 使用场景
//!
//! 大多数用户应该使用 `servoarm-client` 提供的 `ArmConsole`，
//! 需要直接控制链路和指令时使用 [`ArmDriver`]。

mod arm;
mod builder;
pub mod command_log;
mod dispatcher;
mod error;
pub mod hooks;
pub mod link;
pub mod metrics;
pub mod mode;
pub mod pipeline;
pub mod state;

pub use arm::ArmDriver;
pub use builder::ArmDriverBuilder;
pub use command_log::{COMMAND_LOG_CAPACITY, CommandLog, CommandLogEntry};
pub use dispatcher::CommandDispatcher;
pub use error::DriverError;
pub use hooks::{ArmEvent, ArmObserver, EventForwarder, HookManager, PathStatus};
pub use link::LinkChannel;
pub use metrics::{LinkMetrics, MetricsSnapshot};
pub use mode::{AtomicLinkMode, LinkMode};
pub use pipeline::{LinkConfig, reader_loop};
pub use state::{ArmContext, JointState};
