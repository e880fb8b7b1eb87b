//! # Servoarm Protocol
//!
//! 五舵机机械臂串口协议定义（无硬件依赖）
//!
//! ## 模块
//!
//! - `joint`: 关节标识、角度钳位、五元组姿态
//! - `command`: 下行指令（`set`/`move`/`reset` 等）及其文本编码
//! - `feedback`: 上行状态行解析（`Servo<N> ...: <angle>°`）
//!
//! ## 线路格式
//!
//! 协议是纯文本、按行分帧的：每条指令以 `\n` 结尾，控制器逐行回显状态。

use thiserror::Error;

pub mod command;
pub mod feedback;
pub mod joint;

// 重新导出常用类型
pub use command::{Command, LegacyKey, Preset};
pub use feedback::{StatusUpdate, parse_status_line};
pub use joint::{
    Angle, HOME_ANGLE, JOINT_COUNT, JointAngles, JointId, MAX_ANGLE, MIN_ANGLE, PathPoint,
    clamp_angle,
};

/// 协议层错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// 关节编号不在 1-5 范围内
    #[error("Invalid joint index: {0} (expected 1-5)")]
    InvalidJointIndex(u8),

    /// 无法识别的关节名称
    #[error("Unknown joint name: {0}")]
    UnknownJoint(String),

    /// 角度字段无法解析为整数
    #[error("Invalid angle: {0:?}")]
    InvalidAngle(String),

    /// 不是状态行（缺少 `Servo` 前缀或 `:` 分隔符）
    #[error("Not a status line: {0:?}")]
    NotStatusLine(String),

    /// 无法识别的指令文本
    #[error("Unknown command: {0:?}")]
    UnknownCommand(String),

    /// 指令参数数量或格式不正确
    #[error("Malformed command {command:?}: {reason}")]
    MalformedCommand { command: String, reason: String },
}
