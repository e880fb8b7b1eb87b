//! 上行状态行解析
//!
//! 控制器对 `status` 的回显形如：
//!
//! ```text
//! === Current Positions ===
//!   Servo1 (Wrist):    90°
//!   Servo2 (Base):     45°
//! ```
//!
//! 只有包含 `Servo<1-5>` 标签且带 `:` 分隔的行会被解析为角度更新，
//! 其它行（横幅、`Servo1 -> 90°` 这类确认行等）作为遥测原样透传。

use crate::ProtocolError;
use crate::joint::{Angle, JointId, clamp_angle};

/// 一条已解析的状态行
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusUpdate {
    /// 关节
    pub joint: JointId,
    /// 钳位后的角度
    pub angle: Angle,
    /// 控制器上报的原始值（可能越界）
    pub raw_angle: i32,
}

/// 在冒号前的标签部分中查找 `Servo<N>`
fn find_servo_label(label: &str) -> Result<JointId, ProtocolError> {
    let mut rest = label;
    while let Some(pos) = rest.find("Servo") {
        let after = &rest[pos + "Servo".len()..];
        if let Some(digit) = after.chars().next().and_then(|c| c.to_digit(10)) {
            return JointId::from_wire_index(digit as u8);
        }
        rest = after;
    }
    Err(ProtocolError::UnknownJoint(label.trim().to_string()))
}

/// 解析状态行
///
/// 语法：`...Servo<1-5>...: <int>°`。角度值取第一个与第二个 `:` 之间的字段，
/// 去掉 `°` 与空白后按十进制整数解析，超出 `[0, 180]` 的值被钳位。
///
/// # 示例
///
/// ```
/// use servoarm_protocol::{JointId, parse_status_line};
///
/// let update = parse_status_line("  Servo4 (Elbow):    135°").unwrap();
/// assert_eq!(update.joint, JointId::Elbow);
/// assert_eq!(update.angle, 135);
///
/// assert!(parse_status_line("System ready!").is_err());
/// ```
pub fn parse_status_line(line: &str) -> Result<StatusUpdate, ProtocolError> {
    if !line.contains("Servo") {
        return Err(ProtocolError::NotStatusLine(line.to_string()));
    }

    let mut fields = line.split(':');
    let label = fields.next().unwrap_or_default();
    let Some(value) = fields.next() else {
        return Err(ProtocolError::NotStatusLine(line.to_string()));
    };

    let joint = find_servo_label(label)?;

    let value = value.replace('°', "");
    let value = value.trim();
    let raw_angle = value
        .parse::<i32>()
        .map_err(|_| ProtocolError::InvalidAngle(value.to_string()))?;

    Ok(StatusUpdate {
        joint,
        angle: clamp_angle(raw_angle),
        raw_angle,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_firmware_status_block() {
        let lines = [
            ("  Servo1 (Wrist):    90°", JointId::Wrist, 90),
            ("  Servo2 (Base):     45°", JointId::Base, 45),
            ("  Servo3 (Shoulder): 100°", JointId::Shoulder, 100),
            ("  Servo4 (Elbow):    0°", JointId::Elbow, 0),
            ("  Servo5 (Gripper):  30°", JointId::Gripper, 30),
        ];
        for (line, joint, angle) in lines {
            let update = parse_status_line(line).unwrap();
            assert_eq!(update.joint, joint, "line: {line}");
            assert_eq!(update.angle, angle, "line: {line}");
        }
    }

    #[test]
    fn test_parse_without_degree_sign() {
        let update = parse_status_line("Servo2: 17").unwrap();
        assert_eq!(update.joint, JointId::Base);
        assert_eq!(update.angle, 17);
    }

    #[test]
    fn test_out_of_range_is_clamped() {
        let update = parse_status_line("Servo3 (Shoulder): 250°").unwrap();
        assert_eq!(update.angle, 180);
        assert_eq!(update.raw_angle, 250);

        let update = parse_status_line("Servo3 (Shoulder): -4°").unwrap();
        assert_eq!(update.angle, 0);
    }

    #[test]
    fn test_non_status_lines_rejected() {
        assert!(matches!(
            parse_status_line("=== Current Positions ==="),
            Err(ProtocolError::NotStatusLine(_))
        ));
        // 确认行没有冒号
        assert!(matches!(
            parse_status_line("Servo1 -> 90°"),
            Err(ProtocolError::NotStatusLine(_))
        ));
        assert!(matches!(
            parse_status_line("Servo9 (Tail): 10°"),
            Err(ProtocolError::InvalidJointIndex(9))
        ));
        assert!(matches!(
            parse_status_line("Servos attached to pins:"),
            Err(ProtocolError::UnknownJoint(_))
        ));
        assert!(matches!(
            parse_status_line("  Servo1 (Wrist)    -> D0 (GPIO16)"),
            Err(ProtocolError::NotStatusLine(_))
        ));
        assert!(matches!(
            parse_status_line("Servo1 (Wrist): ninety°"),
            Err(ProtocolError::InvalidAngle(_))
        ));
    }
}
