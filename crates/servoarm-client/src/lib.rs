//! 客户端接口模块
//!
//! 面向操作者的控制逻辑，包括：
//! - 输入映射（遗留按键、滑块、微调、摇杆增量、按键去抖）
//! - 摇杆轮询线程（固定频率，可随时停止）
//! - 路径选择/录制状态机和独立线程回放
//! - [`ArmConsole`] 门面，展示层只需要持有它
//!
//! # 使用场景
//!
//! 需要直接控制链路或指令顺序时，使用 `servoarm-driver` 的 `ArmDriver`。

pub mod console;
pub mod error;
pub mod gamepad;
pub mod input;
pub mod joystick;
pub mod path;
pub mod settings;

pub use console::ArmConsole;
pub use error::ClientError;
pub use gamepad::{GamepadSource, ScriptedSource};
pub use input::{ButtonAction, DebounceIntervals, Debouncer, GamepadSample, InputConfig, InputMapper};
pub use joystick::{JoystickConfig, JoystickLoop};
pub use path::{ExecutionTiming, PathController, PathState};
pub use settings::link_config;

#[cfg(feature = "gamepad")]
pub use gamepad::GilrsSource;
