//! 客户端错误类型

use servoarm_driver::DriverError;
use servoarm_tools::{ConfigError, PathError};
use thiserror::Error;

/// 客户端层错误
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    #[error("Path error: {0}")]
    Path(#[from] PathError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// 录制/执行需要先选择路径
    #[error("No path selected")]
    NoPathSelected,

    /// 路径没有任何点，拒绝执行
    #[error("Path `{0}` has no points")]
    EmptyPath(String),

    /// 已有路径正在执行
    #[error("A path is already executing")]
    ExecutionInProgress,

    #[error("Gamepad unavailable: {0}")]
    GamepadUnavailable(String),

    #[error("Joystick loop is already running")]
    JoystickAlreadyRunning,

    #[error("Failed to spawn thread: {0}")]
    Thread(String),
}
