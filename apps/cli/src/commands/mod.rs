//! 命令定义和实现

pub mod config;
pub mod paths;
pub mod ports;
pub mod run;
pub mod send;

pub use config::{ConfigCommand, GlobalArgs};
pub use paths::PathsCommand;
pub use run::RunCommand;
pub use send::SendCommand;
