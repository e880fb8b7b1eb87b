//! 关节状态与共享上下文
//!
//! [`JointState`] 是五个关节角度的权威记录。每个关节一个 `AtomicU8`：
//! 单关节读写是原子的，跨关节快照不保证原子（与 `set_all` 并发时可能看到
//! 新旧混合的姿态，这是可接受的陈旧窗口）。
//!
//! 所有写入在存储前钳位到 `[0, 180]`，并通知钩子。

use crate::command_log::CommandLog;
use crate::hooks::HookManager;
use parking_lot::RwLock;
use servoarm_protocol::{Angle, HOME_ANGLE, JOINT_COUNT, JointAngles, JointId, clamp_angle};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

/// 关节角度状态
pub struct JointState {
    angles: [AtomicU8; JOINT_COUNT],
    hooks: Arc<RwLock<HookManager>>,
}

impl JointState {
    /// 所有关节为 90°，不带观察者
    pub fn new() -> Self {
        Self::with_hooks(Arc::new(RwLock::new(HookManager::new())))
    }

    /// 所有关节为 90°，写入时通知给定的钩子
    pub fn with_hooks(hooks: Arc<RwLock<HookManager>>) -> Self {
        Self {
            angles: std::array::from_fn(|_| AtomicU8::new(HOME_ANGLE)),
            hooks,
        }
    }

    /// 读取单个关节
    #[inline]
    pub fn get(&self, joint: JointId) -> Angle {
        self.angles[joint.index()].load(Ordering::Acquire)
    }

    /// 写入单个关节（钳位），返回实际存储的值
    pub fn set(&self, joint: JointId, angle: i32) -> Angle {
        let clamped = clamp_angle(angle);
        self.angles[joint.index()].store(clamped, Ordering::Release);
        self.hooks.read().notify_angle_changed(joint, clamped);
        clamped
    }

    /// 逐个写入全部关节（不保证跨关节原子）
    pub fn set_all(&self, angles: JointAngles) {
        for (joint, angle) in angles.iter() {
            self.set(joint, angle as i32);
        }
    }

    /// 在当前值上加 `delta` 并钳位，返回 `(旧值, 新值)`
    ///
    /// 读-改-写整体原子；值未变化时不写入也不通知。
    pub fn adjust(&self, joint: JointId, delta: i32) -> (Angle, Angle) {
        let slot = &self.angles[joint.index()];
        let result = slot.fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
            let next = clamp_angle((current as i32).saturating_add(delta));
            (next != current).then_some(next)
        });
        match result {
            Ok(previous) => {
                let next = clamp_angle((previous as i32).saturating_add(delta));
                self.hooks.read().notify_angle_changed(joint, next);
                (previous, next)
            },
            Err(current) => (current, current),
        }
    }

    /// 当前姿态快照（逐关节读取）
    pub fn snapshot(&self) -> JointAngles {
        JointAngles::from(std::array::from_fn(|i| self.angles[i].load(Ordering::Acquire)))
    }
}

impl Default for JointState {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for JointState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("JointState").field(&self.snapshot()).finish()
    }
}

/// 共享状态上下文
///
/// 显式持有、内部同步，按引用（`Arc`）传给每个需要它的组件。
pub struct ArmContext {
    /// 关节角度
    pub joints: JointState,
    /// 指令审计日志
    pub command_log: CommandLog,
    /// 观察者
    pub hooks: Arc<RwLock<HookManager>>,
}

impl ArmContext {
    pub fn new() -> Self {
        let hooks = Arc::new(RwLock::new(HookManager::new()));
        Self {
            joints: JointState::with_hooks(hooks.clone()),
            command_log: CommandLog::new(),
            hooks,
        }
    }
}

impl Default for ArmContext {
    fn default() -> Self {
        Self::new()
    }
}
