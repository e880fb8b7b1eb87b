//! 配置文件到运行时参数的转换

use crate::input::{DebounceIntervals, InputConfig};
use crate::joystick::JoystickConfig;
use crate::path::ExecutionTiming;
use servoarm_driver::LinkConfig;
use servoarm_tools::{ExecutionSettings, InputSettings, JoystickSettings, LinkSettings};
use std::time::Duration;

/// 链路参数
pub fn link_config(settings: &LinkSettings) -> LinkConfig {
    LinkConfig {
        baud_rate: settings.baud_rate,
        settle_delay: settings.settle_delay(),
        read_timeout: settings.read_timeout(),
        write_timeout: settings.write_timeout(),
        status_query_delay: settings.status_query_delay(),
    }
}

impl From<&InputSettings> for InputConfig {
    fn from(settings: &InputSettings) -> Self {
        Self {
            deadzone: settings.deadzone,
            max_step: settings.max_step,
            gripper_step: settings.gripper_step,
            nudge_step: settings.nudge_step,
            debounce: DebounceIntervals {
                reset: Duration::from_millis(settings.debounce_reset_ms),
                execute: Duration::from_millis(settings.debounce_execute_ms),
                record: Duration::from_millis(settings.debounce_record_ms),
                stop: Duration::from_millis(settings.debounce_stop_ms),
            },
        }
    }
}

impl From<&JoystickSettings> for JoystickConfig {
    fn from(settings: &JoystickSettings) -> Self {
        Self {
            period: settings.period(),
        }
    }
}

impl From<&ExecutionSettings> for ExecutionTiming {
    fn from(settings: &ExecutionSettings) -> Self {
        Self {
            start_settle: Duration::from_millis(settings.start_settle_ms),
            point_settle: Duration::from_millis(settings.point_settle_ms),
            end_settle: Duration::from_millis(settings.end_settle_ms),
        }
    }
}
