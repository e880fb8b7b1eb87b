//! 输入映射
//!
//! 把键盘、滑块和手柄采样转换为指令，经 `CommandDispatcher` 分发。
//!
//! 映射本身是纯函数（[`axis_delta`]、[`joystick_deltas`]、[`smooth_command`]），
//! [`InputMapper`] 负责把它们接到共享的关节状态和分发器上。

use parking_lot::Mutex;
use servoarm_driver::{CommandDispatcher, DriverError};
use servoarm_protocol::{Angle, Command, JointAngles, JointId, LegacyKey, Preset, clamp_angle};
use smallvec::SmallVec;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// 输入映射参数
#[derive(Debug, Clone, PartialEq)]
pub struct InputConfig {
    /// 模拟轴死区，`|v| < deadzone` 视为 0
    pub deadzone: f32,
    /// 满偏时的最大增量
    pub max_step: i32,
    /// 夹爪按键增量
    pub gripper_step: i32,
    /// 单步微调角度
    pub nudge_step: i32,
    /// 各离散按键的最小触发间隔
    pub debounce: DebounceIntervals,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            deadzone: 0.15,
            max_step: 5,
            gripper_step: 2,
            nudge_step: 5,
            debounce: DebounceIntervals::default(),
        }
    }
}

/// 离散按键的最小触发间隔
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceIntervals {
    pub reset: Duration,
    pub execute: Duration,
    pub record: Duration,
    pub stop: Duration,
}

impl Default for DebounceIntervals {
    fn default() -> Self {
        Self {
            reset: Duration::from_millis(500),
            execute: Duration::from_millis(1000),
            record: Duration::from_millis(500),
            stop: Duration::from_millis(500),
        }
    }
}

/// 一次手柄采样
///
/// 轴取值 `[-1, 1]`，`left_y` 向前推为负；十字键取值 `-1 / 0 / 1`，向上为正。
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GamepadSample {
    pub left_y: f32,
    pub right_x: f32,
    pub dpad_x: i8,
    pub dpad_y: i8,
    /// 夹爪减小
    pub a: bool,
    /// 夹爪增大
    pub b: bool,
    /// 全部复位
    pub x: bool,
    /// 执行当前路径
    pub y: bool,
    /// 记录当前姿态
    pub lb: bool,
    /// 停止记录
    pub rb: bool,
}

/// 需要去抖的离散按键动作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonAction {
    ResetAll,
    ExecuteSelected,
    RecordPoint,
    StopRecording,
}

impl ButtonAction {
    pub const ALL: [ButtonAction; 4] = [
        ButtonAction::ResetAll,
        ButtonAction::ExecuteSelected,
        ButtonAction::RecordPoint,
        ButtonAction::StopRecording,
    ];

    fn slot(self) -> usize {
        self as usize
    }
}

/// 按键去抖器
///
/// 每个按键独立记录上次成功触发的时间；距上次触发严格超过间隔才再次触发。
#[derive(Debug, Clone)]
pub struct Debouncer {
    intervals: DebounceIntervals,
    last_fired: [Option<Instant>; 4],
}

impl Debouncer {
    pub fn new(intervals: DebounceIntervals) -> Self {
        Self {
            intervals,
            last_fired: [None; 4],
        }
    }

    fn interval(&self, action: ButtonAction) -> Duration {
        match action {
            ButtonAction::ResetAll => self.intervals.reset,
            ButtonAction::ExecuteSelected => self.intervals.execute,
            ButtonAction::RecordPoint => self.intervals.record,
            ButtonAction::StopRecording => self.intervals.stop,
        }
    }

    /// 按键处于按下状态时调用，返回本次是否触发
    pub fn try_fire(&mut self, action: ButtonAction, now: Instant) -> bool {
        let interval = self.interval(action);
        let slot = &mut self.last_fired[action.slot()];
        let ready = match *slot {
            None => true,
            Some(last) => now.saturating_duration_since(last) > interval,
        };
        if ready {
            *slot = Some(now);
        }
        ready
    }

    /// 清除所有触发记录
    pub fn reset(&mut self) {
        self.last_fired = [None; 4];
    }
}

/// 模拟轴 → 角度增量
///
/// `|value| < deadzone` 视为 0（边界值不属于死区），其余乘以 `max_step` 后向零截断。
///
/// ```
/// use servoarm_client::input::axis_delta;
///
/// assert_eq!(axis_delta(-0.5, 0.15, 5), -2);
/// assert_eq!(axis_delta(0.1, 0.15, 5), 0);
/// assert_eq!(axis_delta(1.0, 0.15, 5), 5);
/// ```
pub fn axis_delta(value: f32, deadzone: f32, max_step: i32) -> i32 {
    let value = value.clamp(-1.0, 1.0);
    if value.abs() < deadzone {
        return 0;
    }
    (value * max_step as f32) as i32
}

/// 十字键 → 角度增量（离散输入，不做死区处理）
pub fn dpad_delta(value: i8, max_step: i32) -> i32 {
    i32::from(value.signum()) * max_step
}

/// 一次采样的关节增量，按 Base、Shoulder、Elbow、Wrist、Gripper 顺序，只包含非零项
///
/// 夹爪：A 为 `-gripper_step`，B 为 `+gripper_step`，同时按下时 B 生效。
pub fn joystick_deltas(sample: &GamepadSample, config: &InputConfig) -> SmallVec<[(JointId, i32); 5]> {
    let mut gripper = 0;
    if sample.a {
        gripper = config.gripper_step.saturating_neg();
    }
    if sample.b {
        gripper = config.gripper_step;
    }

    [
        (JointId::Base, dpad_delta(sample.dpad_x, config.max_step)),
        (JointId::Shoulder, dpad_delta(sample.dpad_y, config.max_step)),
        (
            JointId::Elbow,
            axis_delta(sample.right_x, config.deadzone, config.max_step),
        ),
        (
            JointId::Wrist,
            axis_delta(sample.left_y, config.deadzone, config.max_step),
        ),
        (JointId::Gripper, gripper),
    ]
    .into_iter()
    .filter(|(_, delta)| *delta != 0)
    .collect()
}

/// 平滑调整对应的指令：钳位后的值与当前值不同时才产生 `set`
pub fn smooth_command(joint: JointId, current: Angle, delta: i32) -> Option<Command> {
    let next = clamp_angle((current as i32).saturating_add(delta));
    (next != current).then(|| Command::set(joint, next as i32))
}

/// 输入映射器
pub struct InputMapper {
    dispatcher: Arc<CommandDispatcher>,
    config: InputConfig,
    debouncer: Mutex<Debouncer>,
}

impl InputMapper {
    pub fn new(dispatcher: Arc<CommandDispatcher>, config: InputConfig) -> Self {
        let debouncer = Mutex::new(Debouncer::new(config.debounce));
        Self {
            dispatcher,
            config,
            debouncer,
        }
    }

    pub fn config(&self) -> &InputConfig {
        &self.config
    }

    /// 遗留按键：映射表中的字符分发一条单字符指令，返回是否映射
    pub fn key_press(&self, key: char) -> Result<bool, DriverError> {
        match LegacyKey::from_char(key) {
            Some(key) => self.dispatcher.dispatch(Command::Key(key)).map(|()| true),
            None => Ok(false),
        }
    }

    /// 直接设置角度（滑块）
    pub fn set_joint(&self, joint: JointId, angle: i32) -> Result<Angle, DriverError> {
        let angle = self.dispatcher.context().joints.set(joint, angle);
        self.dispatcher.dispatch(Command::set(joint, angle as i32))?;
        Ok(angle)
    }

    /// 按 `nudge_step` 微调 `steps` 步（正数增大），总是分发
    pub fn nudge(&self, joint: JointId, steps: i32) -> Result<Angle, DriverError> {
        let joints = &self.dispatcher.context().joints;
        let delta = steps.saturating_mul(self.config.nudge_step);
        let target = (joints.get(joint) as i32).saturating_add(delta);
        self.set_joint(joint, target)
    }

    /// 平滑调整：值变化时才分发，返回新值
    pub fn adjust_smooth(&self, joint: JointId, delta: i32) -> Result<Option<Angle>, DriverError> {
        let (previous, next) = self.dispatcher.context().joints.adjust(joint, delta);
        let Some(command) = smooth_command(joint, previous, delta) else {
            return Ok(None);
        };
        self.dispatcher.dispatch(command)?;
        Ok(Some(next))
    }

    /// 全部复位：分发 `reset`，并把 90° 写回关节状态
    pub fn reset_all(&self) -> Result<(), DriverError> {
        let result = self.dispatcher.dispatch(Command::Reset);
        self.dispatcher.context().joints.set_all(JointAngles::HOME);
        result
    }

    /// 以当前关节状态发送一条 `move`
    pub fn send_all(&self) -> Result<(), DriverError> {
        let snapshot = self.dispatcher.context().joints.snapshot();
        self.dispatcher.dispatch(Command::Move(snapshot))
    }

    /// 急停：与全部复位相同
    pub fn emergency_stop(&self) -> Result<(), DriverError> {
        warn!("Emergency stop");
        self.reset_all()
    }

    pub fn open_gripper(&self) -> Result<(), DriverError> {
        self.dispatcher.dispatch(Command::Open)
    }

    pub fn close_gripper(&self) -> Result<(), DriverError> {
        self.dispatcher.dispatch(Command::Close)
    }

    /// 让控制器保存当前姿态
    pub fn save_pose(&self) -> Result<(), DriverError> {
        self.dispatcher.dispatch(Command::Save)
    }

    /// 请求状态回显（回显行由读线程解析并同步关节状态）
    pub fn query_status(&self) -> Result<(), DriverError> {
        self.dispatcher.dispatch(Command::Status)
    }

    pub fn request_help(&self) -> Result<(), DriverError> {
        self.dispatcher.dispatch(Command::Help)
    }

    /// 运行固件内置的预设动作
    pub fn run_preset(&self, preset: Preset) -> Result<(), DriverError> {
        self.dispatcher.dispatch(Command::Preset(preset))
    }

    /// 处理一次手柄采样
    ///
    /// 关节增量立即应用（分发失败已由分发器记录，这里不中断）；
    /// 返回本 tick 通过去抖的离散按键动作，由调用方执行。
    pub fn tick(&self, sample: &GamepadSample, now: Instant) -> SmallVec<[ButtonAction; 4]> {
        for (joint, delta) in joystick_deltas(sample, &self.config) {
            let _ = self.adjust_smooth(joint, delta);
        }

        let pressed = [
            (ButtonAction::ResetAll, sample.x),
            (ButtonAction::ExecuteSelected, sample.y),
            (ButtonAction::RecordPoint, sample.lb),
            (ButtonAction::StopRecording, sample.rb),
        ];
        let mut debouncer = self.debouncer.lock();
        let actions: SmallVec<[ButtonAction; 4]> = pressed
            .into_iter()
            .filter(|(action, down)| *down && debouncer.try_fire(*action, now))
            .map(|(action, _)| action)
            .collect();
        if !actions.is_empty() {
            debug!("Gamepad actions: {:?}", actions);
        }
        actions
    }
}
