//! 下行指令定义
//!
//! 每个 [`Command`] 对应线路上的一行文本。`Display` 输出的是不带换行符的
//! 指令文本，`to_line()` 追加 `\n` 作为帧结束符。

use crate::ProtocolError;
use crate::joint::{Angle, JointAngles, JointId, clamp_angle};
use std::fmt;
use std::str::FromStr;

/// 单字符遗留按键指令
///
/// 步长由控制器固件决定（每次 5°），上位机不参与角度计算。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LegacyKey {
    /// `w`：肩部上抬
    ShoulderUp,
    /// `s`：肩部下压
    ShoulderDown,
    /// `a`：底座左转
    BaseLeft,
    /// `d`：底座右转
    BaseRight,
    /// `q`：肘部上抬
    ElbowUp,
    /// `e`：肘部下压
    ElbowDown,
    /// `z`：腕部上抬
    WristUp,
    /// `x`：腕部下压
    WristDown,
    /// `[`：快速张开夹爪
    GripperOpen,
    /// `]`：快速闭合夹爪
    GripperClose,
}

impl LegacyKey {
    /// 全部十个按键
    pub const ALL: [LegacyKey; 10] = [
        LegacyKey::ShoulderUp,
        LegacyKey::BaseLeft,
        LegacyKey::ShoulderDown,
        LegacyKey::BaseRight,
        LegacyKey::ElbowUp,
        LegacyKey::ElbowDown,
        LegacyKey::WristUp,
        LegacyKey::WristDown,
        LegacyKey::GripperOpen,
        LegacyKey::GripperClose,
    ];

    /// 从键盘字符映射（大小写不敏感），非映射键返回 `None`
    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_lowercase() {
            'w' => Some(LegacyKey::ShoulderUp),
            's' => Some(LegacyKey::ShoulderDown),
            'a' => Some(LegacyKey::BaseLeft),
            'd' => Some(LegacyKey::BaseRight),
            'q' => Some(LegacyKey::ElbowUp),
            'e' => Some(LegacyKey::ElbowDown),
            'z' => Some(LegacyKey::WristUp),
            'x' => Some(LegacyKey::WristDown),
            '[' => Some(LegacyKey::GripperOpen),
            ']' => Some(LegacyKey::GripperClose),
            _ => None,
        }
    }

    /// 线路字符
    pub fn as_char(self) -> char {
        match self {
            LegacyKey::ShoulderUp => 'w',
            LegacyKey::ShoulderDown => 's',
            LegacyKey::BaseLeft => 'a',
            LegacyKey::BaseRight => 'd',
            LegacyKey::ElbowUp => 'q',
            LegacyKey::ElbowDown => 'e',
            LegacyKey::WristUp => 'z',
            LegacyKey::WristDown => 'x',
            LegacyKey::GripperOpen => '[',
            LegacyKey::GripperClose => ']',
        }
    }
}

/// 固件内置的抓取动作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Preset {
    Cube,
    Cylinder,
    Hat,
    Boat,
}

impl Preset {
    pub const ALL: [Preset; 4] = [Preset::Cube, Preset::Cylinder, Preset::Hat, Preset::Boat];

    pub fn as_str(self) -> &'static str {
        match self {
            Preset::Cube => "cube",
            Preset::Cylinder => "cylinder",
            Preset::Hat => "hat",
            Preset::Boat => "boat",
        }
    }
}

/// 下行指令
///
/// 创建后不可变，由 `CommandDispatcher` 恰好消费一次。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// `set <1-5> <0-180>`：设置单个关节
    Set { joint: JointId, angle: Angle },
    /// `move a1 a2 a3 a4 a5`：同时设置全部关节
    Move(JointAngles),
    /// `reset`：复位到固件初始姿态
    Reset,
    /// `open`：张开夹爪
    Open,
    /// `close`：闭合夹爪
    Close,
    /// `save`：让控制器打印当前姿态
    Save,
    /// `status`：查询全部关节角度
    Status,
    /// `help`：打印固件帮助
    Help,
    /// 单字符遗留按键
    Key(LegacyKey),
    /// 固件内置动作
    Preset(Preset),
}

impl Command {
    /// 构造单关节设置指令（角度钳位）
    pub fn set(joint: JointId, angle: i32) -> Self {
        Command::Set {
            joint,
            angle: clamp_angle(angle),
        }
    }

    /// 生成带 `\n` 结束符的线路帧
    pub fn to_line(&self) -> String {
        let mut line = self.to_string();
        line.push('\n');
        line
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Set { joint, angle } => write!(f, "set {} {}", joint.wire_index(), angle),
            Command::Move(angles) => write!(f, "move {angles}"),
            Command::Reset => f.write_str("reset"),
            Command::Open => f.write_str("open"),
            Command::Close => f.write_str("close"),
            Command::Save => f.write_str("save"),
            Command::Status => f.write_str("status"),
            Command::Help => f.write_str("help"),
            Command::Key(key) => write!(f, "{}", key.as_char()),
            Command::Preset(preset) => f.write_str(preset.as_str()),
        }
    }
}

fn parse_int(command: &str, field: &str) -> Result<i32, ProtocolError> {
    field.parse::<i32>().map_err(|_| ProtocolError::MalformedCommand {
        command: command.to_string(),
        reason: format!("{field:?} is not an integer"),
    })
}

impl FromStr for Command {
    type Err = ProtocolError;

    /// 解析操作员输入的指令文本（大小写不敏感，忽略首尾空白）
    ///
    /// 角度超出范围时钳位；关节编号越界时报错。
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim().to_ascii_lowercase();
        let mut parts = text.split_whitespace();
        let Some(head) = parts.next() else {
            return Err(ProtocolError::UnknownCommand(s.to_string()));
        };
        let args: Vec<&str> = parts.collect();

        let simple = |cmd: Command| {
            if args.is_empty() {
                Ok(cmd)
            } else {
                Err(ProtocolError::MalformedCommand {
                    command: text.clone(),
                    reason: format!("`{head}` takes no arguments"),
                })
            }
        };

        match head {
            "set" => {
                let [joint, angle] = args.as_slice() else {
                    return Err(ProtocolError::MalformedCommand {
                        command: text.clone(),
                        reason: "expected `set <servo> <angle>`".to_string(),
                    });
                };
                let index = parse_int(&text, joint)?;
                let joint = u8::try_from(index)
                    .map_err(|_| ProtocolError::InvalidJointIndex(u8::MAX))
                    .and_then(JointId::from_wire_index)?;
                Ok(Command::set(joint, parse_int(&text, angle)?))
            },
            "move" => {
                if args.len() != 5 {
                    return Err(ProtocolError::MalformedCommand {
                        command: text.clone(),
                        reason: format!("expected 5 angles, got {}", args.len()),
                    });
                }
                let mut values = [0i32; 5];
                for (slot, arg) in values.iter_mut().zip(&args) {
                    *slot = parse_int(&text, arg)?;
                }
                Ok(Command::Move(JointAngles::new(values)))
            },
            "reset" => simple(Command::Reset),
            "open" => simple(Command::Open),
            "close" => simple(Command::Close),
            "save" => simple(Command::Save),
            "status" => simple(Command::Status),
            "help" => simple(Command::Help),
            _ => {
                if let Some(preset) = Preset::ALL.into_iter().find(|p| p.as_str() == head) {
                    return simple(Command::Preset(preset));
                }
                let mut chars = head.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => match LegacyKey::from_char(c) {
                        Some(key) => simple(Command::Key(key)),
                        None => Err(ProtocolError::UnknownCommand(s.to_string())),
                    },
                    _ => Err(ProtocolError::UnknownCommand(s.to_string())),
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_wire_text() {
        assert_eq!(Command::set(JointId::Wrist, 88).to_string(), "set 1 88");
        assert_eq!(Command::set(JointId::Gripper, 400).to_string(), "set 5 180");
        assert_eq!(
            Command::Move(JointAngles::new([60, 120, 45, 150, 30])).to_string(),
            "move 60 120 45 150 30"
        );
        assert_eq!(Command::Reset.to_string(), "reset");
        assert_eq!(Command::Open.to_string(), "open");
        assert_eq!(Command::Close.to_string(), "close");
        assert_eq!(Command::Save.to_string(), "save");
        assert_eq!(Command::Status.to_string(), "status");
        assert_eq!(Command::Key(LegacyKey::GripperClose).to_string(), "]");
        assert_eq!(Command::Preset(Preset::Boat).to_string(), "boat");
    }

    #[test]
    fn test_to_line_appends_newline() {
        assert_eq!(Command::Reset.to_line(), "reset\n");
        assert_eq!(Command::set(JointId::Elbow, 10).to_line(), "set 4 10\n");
    }

    #[test]
    fn test_legacy_keys_cover_ten_chars() {
        let chars: String = LegacyKey::ALL.iter().map(|k| k.as_char()).collect();
        assert_eq!(chars.len(), 10);
        for c in "wasdqezx[]".chars() {
            let key = LegacyKey::from_char(c).unwrap();
            assert_eq!(key.as_char(), c);
        }
        assert_eq!(LegacyKey::from_char('W'), Some(LegacyKey::ShoulderUp));
        assert_eq!(LegacyKey::from_char('p'), None);
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            "set 3 45".parse::<Command>().unwrap(),
            Command::set(JointId::Shoulder, 45)
        );
        assert_eq!(
            "  MOVE 1 2 3 4 5 ".parse::<Command>().unwrap(),
            Command::Move(JointAngles::new([1, 2, 3, 4, 5]))
        );
        assert_eq!("reset".parse::<Command>().unwrap(), Command::Reset);
        assert_eq!(
            "x".parse::<Command>().unwrap(),
            Command::Key(LegacyKey::WristDown)
        );
        assert_eq!(
            "hat".parse::<Command>().unwrap(),
            Command::Preset(Preset::Hat)
        );
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!("set 1".parse::<Command>().is_err());
        assert!("set 9 90".parse::<Command>().is_err());
        assert!("set one 90".parse::<Command>().is_err());
        assert!("move 1 2 3".parse::<Command>().is_err());
        assert!("reset now".parse::<Command>().is_err());
        assert!("jump".parse::<Command>().is_err());
        assert!("".parse::<Command>().is_err());
    }

    #[test]
    fn test_parse_display_agree() {
        let commands = [
            Command::set(JointId::Base, 0),
            Command::Move(JointAngles::HOME),
            Command::Reset,
            Command::Help,
            Command::Key(LegacyKey::BaseLeft),
            Command::Preset(Preset::Cylinder),
        ];
        for cmd in commands {
            assert_eq!(cmd.to_string().parse::<Command>().unwrap(), cmd);
        }
    }
}
