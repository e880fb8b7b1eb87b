//! 钩子系统（Hook System）
//!
//! 表现层（终端、GUI 等）通过注册 [`ArmObserver`] 接收核心状态变化：
//!
//! - 关节角度变化（任何来源的写入）
//! - 指令下发（文本 + 时间戳）
//! - 原始上行行（遥测透传）
//! - 路径列表变化、录制/执行状态
//!
//! # 性能要求
//!
//! 回调在控制循环线程上同步执行，且部分回调在分发锁内触发，实现必须非阻塞。
//! 需要做 I/O 的观察者应使用 [`EventForwarder`] 把事件转发到通道，在别处消费。
//!
//! # 使用示例
//!
//! ```rust
//! use servoarm_driver::hooks::{ArmEvent, EventForwarder, HookManager};
//! use servoarm_protocol::JointId;
//! use std::sync::Arc;
//!
//! let mut hooks = HookManager::new();
//! let (forwarder, rx) = EventForwarder::new(64);
//! hooks.add_observer(Arc::new(forwarder));
//!
//! hooks.notify_angle_changed(JointId::Elbow, 120);
//! assert_eq!(
//!     rx.try_recv().unwrap(),
//!     ArmEvent::AngleChanged { joint: JointId::Elbow, angle: 120 }
//! );
//! ```

use crate::command_log::CommandLogEntry;
use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use servoarm_protocol::{Angle, JointId};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// 路径录制/执行状态（用于 UI 状态标签）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathStatus {
    /// 未选择路径
    Idle,
    /// 已选择路径
    Selected { name: String },
    /// 正在录制
    Recording { name: String, points: usize },
    /// 正在执行第 `step` 个点（从 1 开始）
    Executing {
        name: String,
        step: usize,
        total: usize,
    },
    /// 执行结束
    ExecutionFinished { name: String, cancelled: bool },
}

/// 状态变化观察者
///
/// 所有方法默认空操作，只需实现关心的事件。
pub trait ArmObserver: Send + Sync {
    /// 关节角度被写入
    fn on_angle_changed(&self, joint: JointId, angle: Angle) {
        let _ = (joint, angle);
    }

    /// 指令被分发（记录进审计日志后、写入链路前）
    fn on_command_issued(&self, entry: &CommandLogEntry) {
        let _ = entry;
    }

    /// 收到一行上行文本（无论能否解析）
    fn on_raw_line(&self, line: &str) {
        let _ = line;
    }

    /// 路径列表变化（创建/删除/重命名之后）
    fn on_path_list_changed(&self, names: &[String]) {
        let _ = names;
    }

    /// 录制/执行状态变化
    fn on_path_status(&self, status: &PathStatus) {
        let _ = status;
    }
}

/// 钩子管理器
///
/// 回调列表本身不是线程安全的，需要外部同步（`ArmContext` 中使用 `RwLock<HookManager>`）。
#[derive(Default)]
pub struct HookManager {
    observers: Vec<Arc<dyn ArmObserver>>,
}

impl HookManager {
    /// 创建新的钩子管理器
    #[must_use]
    pub const fn new() -> Self {
        Self {
            observers: Vec::new(),
        }
    }

    /// 添加观察者
    pub fn add_observer(&mut self, observer: Arc<dyn ArmObserver>) {
        self.observers.push(observer);
    }

    /// 移除所有观察者
    pub fn clear(&mut self) {
        self.observers.clear();
    }

    pub fn notify_angle_changed(&self, joint: JointId, angle: Angle) {
        for observer in &self.observers {
            observer.on_angle_changed(joint, angle);
        }
    }

    pub fn notify_command_issued(&self, entry: &CommandLogEntry) {
        for observer in &self.observers {
            observer.on_command_issued(entry);
        }
    }

    pub fn notify_raw_line(&self, line: &str) {
        for observer in &self.observers {
            observer.on_raw_line(line);
        }
    }

    pub fn notify_path_list_changed(&self, names: &[String]) {
        for observer in &self.observers {
            observer.on_path_list_changed(names);
        }
    }

    pub fn notify_path_status(&self, status: &PathStatus) {
        for observer in &self.observers {
            observer.on_path_status(status);
        }
    }

    /// 观察者数量
    #[must_use]
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// 是否为空
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

/// 观察者事件（[`EventForwarder`] 的通道载荷）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArmEvent {
    AngleChanged { joint: JointId, angle: Angle },
    CommandIssued(CommandLogEntry),
    RawLine(String),
    PathListChanged(Vec<String>),
    PathStatus(PathStatus),
}

/// 把所有事件转发到有界通道的观察者
///
/// 使用 `try_send`，通道满时丢弃事件并计数，不阻塞控制循环。
pub struct EventForwarder {
    tx: Sender<ArmEvent>,
    dropped: Arc<AtomicU64>,
}

impl EventForwarder {
    /// 创建转发器及事件接收端
    pub fn new(capacity: usize) -> (Self, Receiver<ArmEvent>) {
        let (tx, rx) = bounded(capacity);
        (
            Self {
                tx,
                dropped: Arc::new(AtomicU64::new(0)),
            },
            rx,
        )
    }

    /// 丢弃计数的共享句柄
    pub fn dropped_counter(&self) -> Arc<AtomicU64> {
        self.dropped.clone()
    }

    fn forward(&self, event: ArmEvent) {
        match self.tx.try_send(event) {
            Ok(()) | Err(TrySendError::Disconnected(_)) => {},
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            },
        }
    }
}

impl ArmObserver for EventForwarder {
    fn on_angle_changed(&self, joint: JointId, angle: Angle) {
        self.forward(ArmEvent::AngleChanged { joint, angle });
    }

    fn on_command_issued(&self, entry: &CommandLogEntry) {
        self.forward(ArmEvent::CommandIssued(entry.clone()));
    }

    fn on_raw_line(&self, line: &str) {
        self.forward(ArmEvent::RawLine(line.to_string()));
    }

    fn on_path_list_changed(&self, names: &[String]) {
        self.forward(ArmEvent::PathListChanged(names.to_vec()));
    }

    fn on_path_status(&self, status: &PathStatus) {
        self.forward(ArmEvent::PathStatus(status.clone()));
    }
}
