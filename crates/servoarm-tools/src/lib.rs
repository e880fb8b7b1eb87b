//! # Servoarm Tools - 路径持久化与配置
//!
//! **依赖原则**: 只依赖 `servoarm-protocol`，不引入驱动层和硬件依赖
//!
//! ## 包含模块
//!
//! - `record` - 路径记录格式（每条路径一个 CSV 文件）
//! - `path_store` - 命名路径集合及其持久化
//! - `config` - 控制台配置文件（TOML）

pub mod config;
pub mod path_store;
pub mod record;

use std::path::PathBuf;
use thiserror::Error;

pub use config::{
    ConfigError, ConsoleConfig, ExecutionSettings, InputSettings, JoystickSettings, LinkSettings,
};
pub use path_store::PathStore;
pub use record::{CSV_HEADER, LoadedPath, read_points, write_points};

/// 路径管理错误
#[derive(Error, Debug)]
pub enum PathError {
    /// 名称已存在
    #[error("Path `{0}` already exists")]
    DuplicateName(String),

    /// 名称不存在
    #[error("Unknown path `{0}`")]
    UnknownPath(String),

    /// 名称不可用作文件名（空、包含路径分隔符等）
    #[error("Invalid path name `{0}`")]
    InvalidName(String),

    /// 文件读写失败
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// CSV 编解码失败
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}
