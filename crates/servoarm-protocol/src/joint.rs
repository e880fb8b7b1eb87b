//! 关节定义
//!
//! 机械臂共有 5 个舵机，线路上以 1-5 编号：
//!
//! | 编号 | 关节 |
//! |------|------|
//! | 1 | Wrist（腕部） |
//! | 2 | Base（底座） |
//! | 3 | Shoulder（肩部） |
//! | 4 | Elbow（肘部） |
//! | 5 | Gripper（夹爪） |

use crate::ProtocolError;
use std::fmt;
use std::str::FromStr;

/// 关节角度（度）
///
/// 取值范围 `[0, 180]`，超出范围的输入一律钳位而不是拒绝。
pub type Angle = u8;

/// 最小角度
pub const MIN_ANGLE: Angle = 0;

/// 最大角度
pub const MAX_ANGLE: Angle = 180;

/// 上电/复位后的默认角度
pub const HOME_ANGLE: Angle = 90;

/// 关节数量
pub const JOINT_COUNT: usize = 5;

/// 将任意整数钳位到合法角度范围
///
/// # 示例
///
/// ```
/// use servoarm_protocol::clamp_angle;
///
/// assert_eq!(clamp_angle(-7), 0);
/// assert_eq!(clamp_angle(95), 95);
/// assert_eq!(clamp_angle(184), 180);
/// ```
#[inline]
pub fn clamp_angle(value: i32) -> Angle {
    value.clamp(MIN_ANGLE as i32, MAX_ANGLE as i32) as Angle
}

/// 关节标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum JointId {
    Wrist = 1,
    Base = 2,
    Shoulder = 3,
    Elbow = 4,
    Gripper = 5,
}

impl JointId {
    /// 按线路编号排列的全部关节
    pub const ALL: [JointId; JOINT_COUNT] = [
        JointId::Wrist,
        JointId::Base,
        JointId::Shoulder,
        JointId::Elbow,
        JointId::Gripper,
    ];

    /// 线路编号（1-5）
    #[inline]
    pub fn wire_index(self) -> u8 {
        self as u8
    }

    /// 数组下标（0-4）
    #[inline]
    pub fn index(self) -> usize {
        self as usize - 1
    }

    /// 从线路编号转换
    pub fn from_wire_index(index: u8) -> Result<Self, ProtocolError> {
        match index {
            1 => Ok(JointId::Wrist),
            2 => Ok(JointId::Base),
            3 => Ok(JointId::Shoulder),
            4 => Ok(JointId::Elbow),
            5 => Ok(JointId::Gripper),
            _ => Err(ProtocolError::InvalidJointIndex(index)),
        }
    }

    /// 关节名称
    pub fn name(self) -> &'static str {
        match self {
            JointId::Wrist => "Wrist",
            JointId::Base => "Base",
            JointId::Shoulder => "Shoulder",
            JointId::Elbow => "Elbow",
            JointId::Gripper => "Gripper",
        }
    }

    /// 控制器状态行中使用的标签（`Servo1` .. `Servo5`）
    pub fn servo_label(self) -> &'static str {
        match self {
            JointId::Wrist => "Servo1",
            JointId::Base => "Servo2",
            JointId::Shoulder => "Servo3",
            JointId::Elbow => "Servo4",
            JointId::Gripper => "Servo5",
        }
    }
}

impl fmt::Display for JointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for JointId {
    type Err = ProtocolError;

    /// 接受线路编号（`"1"`）、名称（`"wrist"`，不区分大小写）或舵机标签（`"servo1"`）
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(index) = s.parse::<u8>() {
            return Self::from_wire_index(index);
        }

        let lower = s.to_ascii_lowercase();
        if let Some(rest) = lower.strip_prefix("servo")
            && let Ok(index) = rest.parse::<u8>()
        {
            return Self::from_wire_index(index);
        }

        JointId::ALL
            .into_iter()
            .find(|joint| joint.name().eq_ignore_ascii_case(&lower))
            .ok_or_else(|| ProtocolError::UnknownJoint(s.to_string()))
    }
}

/// 五关节姿态（按线路顺序：Wrist, Base, Shoulder, Elbow, Gripper）
///
/// 构造时所有分量都会被钳位到 `[0, 180]`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct JointAngles([Angle; JOINT_COUNT]);

/// 路径点：一次完整姿态快照
pub type PathPoint = JointAngles;

impl JointAngles {
    /// 全部关节处于 90° 的复位姿态
    pub const HOME: JointAngles = JointAngles([HOME_ANGLE; JOINT_COUNT]);

    /// 从 5 个整数构造（逐个钳位）
    pub fn new(values: [i32; JOINT_COUNT]) -> Self {
        Self(values.map(clamp_angle))
    }

    /// 获取指定关节角度
    #[inline]
    pub fn get(&self, joint: JointId) -> Angle {
        self.0[joint.index()]
    }

    /// 设置指定关节角度（钳位）
    #[inline]
    pub fn set(&mut self, joint: JointId, value: i32) {
        self.0[joint.index()] = clamp_angle(value);
    }

    /// 按线路顺序返回角度数组
    #[inline]
    pub fn as_array(&self) -> [Angle; JOINT_COUNT] {
        self.0
    }

    /// 按线路顺序迭代 `(关节, 角度)`
    pub fn iter(&self) -> impl Iterator<Item = (JointId, Angle)> + '_ {
        JointId::ALL.into_iter().map(move |joint| (joint, self.get(joint)))
    }
}

impl Default for JointAngles {
    fn default() -> Self {
        Self::HOME
    }
}

impl From<[Angle; JOINT_COUNT]> for JointAngles {
    fn from(values: [Angle; JOINT_COUNT]) -> Self {
        Self(values.map(|v| v.min(MAX_ANGLE)))
    }
}

impl fmt::Display for JointAngles {
    /// 以空格分隔输出，与 `move` 指令参数格式一致
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a1, a2, a3, a4, a5] = self.0;
        write!(f, "{a1} {a2} {a3} {a4} {a5}")
    }
}
