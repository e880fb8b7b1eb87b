//! # 控制台配置
//!
//! 配置文件（TOML）覆盖链路、输入映射、摇杆轮询和路径执行的全部时序参数。
//! 缺省值与控制器固件配套的上位机保持一致。
//!
//! ```toml
//! port = "/dev/ttyUSB0"
//! debug_mode = false
//! path_dir = "robot_arm_paths"
//!
//! [link]
//! baud_rate = 115200
//! settle_delay_ms = 2000
//!
//! [joystick]
//! rate_hz = 30
//! ```

use crate::path_store::DEFAULT_PATH_DIR;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Unknown config key `{0}`")]
    UnknownKey(String),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// 串口链路参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LinkSettings {
    pub baud_rate: u32,
    /// 打开串口后的上电等待
    pub settle_delay_ms: u64,
    /// 读线程轮询超时
    pub read_timeout_ms: u64,
    pub write_timeout_ms: u64,
    /// 连接后是否发送一次 `status`
    pub query_status_on_connect: bool,
    /// 发送 `status` 前的等待
    pub status_query_delay_ms: u64,
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            baud_rate: 115_200,
            settle_delay_ms: 2000,
            read_timeout_ms: 50,
            write_timeout_ms: 1000,
            query_status_on_connect: true,
            status_query_delay_ms: 500,
        }
    }
}

impl LinkSettings {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    pub fn status_query_delay(&self) -> Option<Duration> {
        self.query_status_on_connect
            .then(|| Duration::from_millis(self.status_query_delay_ms))
    }
}

/// 输入映射参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InputSettings {
    /// 模拟摇杆死区（严格小于该值视为 0）
    pub deadzone: f32,
    /// 摇杆满偏时每个 tick 的最大角度增量
    pub max_step: i32,
    /// 夹爪按键每个 tick 的角度增量
    pub gripper_step: i32,
    /// 单步微调的角度
    pub nudge_step: i32,
    pub debounce_reset_ms: u64,
    pub debounce_execute_ms: u64,
    pub debounce_record_ms: u64,
    pub debounce_stop_ms: u64,
}

impl Default for InputSettings {
    fn default() -> Self {
        Self {
            deadzone: 0.15,
            max_step: 5,
            gripper_step: 2,
            nudge_step: 5,
            debounce_reset_ms: 500,
            debounce_execute_ms: 1000,
            debounce_record_ms: 500,
            debounce_stop_ms: 500,
        }
    }
}

/// 摇杆轮询参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JoystickSettings {
    /// 启动时是否开启手柄轮询
    pub enabled: bool,
    /// 轮询频率
    pub rate_hz: u32,
}

impl Default for JoystickSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            rate_hz: 30,
        }
    }
}

impl JoystickSettings {
    /// 每个 tick 的时长
    pub fn period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.rate_hz.max(1)))
    }
}

/// 路径执行时序
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExecutionSettings {
    /// 首次复位后的等待
    pub start_settle_ms: u64,
    /// 每个点之后的等待
    pub point_settle_ms: u64,
    /// 最后一个点之后、再次复位之前的等待
    pub end_settle_ms: u64,
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            start_settle_ms: 2000,
            point_settle_ms: 1500,
            end_settle_ms: 1000,
        }
    }
}

/// 控制台配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConsoleConfig {
    /// 默认串口
    pub port: Option<String>,
    /// 启动时是否处于调试（离线）模式
    pub debug_mode: bool,
    /// 路径目录
    pub path_dir: PathBuf,
    pub link: LinkSettings,
    pub input: InputSettings,
    pub joystick: JoystickSettings,
    pub execution: ExecutionSettings,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            port: None,
            debug_mode: true,
            path_dir: PathBuf::from(DEFAULT_PATH_DIR),
            link: LinkSettings::default(),
            input: InputSettings::default(),
            joystick: JoystickSettings::default(),
            execution: ExecutionSettings::default(),
        }
    }
}

impl ConsoleConfig {
    /// 从文件加载
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// 从文件加载，文件不存在时返回默认配置
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// 保存到文件（自动创建父目录）
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        self.validate()?;
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, self.to_toml()?).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// 序列化为 TOML 文本
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// 检查取值范围
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..1.0).contains(&self.input.deadzone) {
            return Err(ConfigError::Invalid(format!(
                "input.deadzone must be in [0, 1), got {}",
                self.input.deadzone
            )));
        }
        if self.joystick.rate_hz == 0 || self.joystick.rate_hz > 1000 {
            return Err(ConfigError::Invalid(format!(
                "joystick.rate_hz must be in 1..=1000, got {}",
                self.joystick.rate_hz
            )));
        }
        for (key, step) in [
            ("input.max_step", self.input.max_step),
            ("input.gripper_step", self.input.gripper_step),
            ("input.nudge_step", self.input.nudge_step),
        ] {
            if !(1..=180).contains(&step) {
                return Err(ConfigError::Invalid(format!(
                    "{key} must be in 1..=180, got {step}"
                )));
            }
        }
        if self.link.baud_rate == 0 {
            return Err(ConfigError::Invalid("link.baud_rate must be non-zero".into()));
        }
        Ok(())
    }

    /// 按点分隔的键设置单个值（`link.baud_rate`、`debug_mode` 等）
    ///
    /// 值依次尝试按布尔、整数、浮点数解析，否则作为字符串。
    pub fn set_value(&mut self, key: &str, raw: &str) -> Result<(), ConfigError> {
        let mut root = toml::Value::try_from(&*self)?;

        let segments: Vec<&str> = key.split('.').collect();
        let Some((leaf, parents)) = segments.split_last() else {
            return Err(ConfigError::UnknownKey(key.to_string()));
        };
        let mut table = root
            .as_table_mut()
            .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
        for segment in parents {
            table = table
                .get_mut(*segment)
                .and_then(toml::Value::as_table_mut)
                .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
        }
        table.insert((*leaf).to_string(), parse_scalar(raw));

        let updated: Self = root.try_into().map_err(|e: toml::de::Error| {
            if e.message().contains("unknown field") {
                ConfigError::UnknownKey(key.to_string())
            } else {
                ConfigError::Parse(e)
            }
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }
}

fn parse_scalar(raw: &str) -> toml::Value {
    let raw = raw.trim();
    if let Ok(b) = raw.parse::<bool>() {
        toml::Value::Boolean(b)
    } else if let Ok(i) = raw.parse::<i64>() {
        toml::Value::Integer(i)
    } else if let Ok(f) = raw.parse::<f64>() {
        toml::Value::Float(f)
    } else {
        toml::Value::String(raw.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_controller_constants() {
        let config = ConsoleConfig::default();
        assert!(config.debug_mode);
        assert_eq!(config.path_dir, PathBuf::from("robot_arm_paths"));
        assert_eq!(config.link.baud_rate, 115_200);
        assert_eq!(config.link.settle_delay(), Duration::from_secs(2));
        assert_eq!(config.input.deadzone, 0.15);
        assert_eq!(config.joystick.rate_hz, 30);
        assert_eq!(config.execution.point_settle_ms, 1500);
        config.validate().unwrap();
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: ConsoleConfig = toml::from_str(
            r#"
            port = "COM4"
            [joystick]
            rate_hz = 60
            "#,
        )
        .unwrap();
        assert_eq!(config.port.as_deref(), Some("COM4"));
        assert_eq!(config.joystick.rate_hz, 60);
        assert_eq!(config.input, InputSettings::default());
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(toml::from_str::<ConsoleConfig>("baud = 9600").is_err());
    }

    #[test]
    fn test_set_value() {
        let mut config = ConsoleConfig::default();
        config.set_value("debug_mode", "false").unwrap();
        config.set_value("port", "/dev/ttyUSB0").unwrap();
        config.set_value("link.baud_rate", "9600").unwrap();
        config.set_value("input.deadzone", "0.2").unwrap();
        assert!(!config.debug_mode);
        assert_eq!(config.port.as_deref(), Some("/dev/ttyUSB0"));
        assert_eq!(config.link.baud_rate, 9600);
        assert_eq!(config.input.deadzone, 0.2);

        assert!(matches!(
            config.set_value("link.parity", "odd"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(matches!(
            config.set_value("nothing.here", "1"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(config.set_value("joystick.rate_hz", "0").is_err());
        assert_eq!(config.joystick.rate_hz, 30);
    }

    #[test]
    fn test_step_out_of_range_rejected() {
        let mut config = ConsoleConfig::default();
        assert!(matches!(
            config.set_value("input.max_step", "2147483647"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(config.set_value("input.gripper_step", "-2").is_err());
        assert!(config.set_value("input.nudge_step", "0").is_err());
        assert_eq!(config.input, InputSettings::default());

        config.set_value("input.max_step", "180").unwrap();
        assert_eq!(config.input.max_step, 180);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = ConsoleConfig::default();
        config.port = Some("COM3".to_string());
        config.link.query_status_on_connect = false;
        config.save(&path).unwrap();

        assert_eq!(ConsoleConfig::load(&path).unwrap(), config);
        assert_eq!(
            ConsoleConfig::load_or_default(dir.path().join("missing.toml")).unwrap(),
            ConsoleConfig::default()
        );
    }
}
