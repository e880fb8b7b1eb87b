//! # Servoarm Link Adapter Layer
//!
//! 串口硬件抽象层，提供统一的按行收发接口。
//!
//! - [`LinkAdapter`]：完整的收发适配器
//! - [`RxLink`] / [`TxLink`]：分离后的只读 / 只写半边
//! - [`SplittableLink`]：可拆分为独立读写半边的适配器，供读线程与写路径物理隔离
//!
//! 后端：
//!
//! - `serial`（默认 feature）：基于 `serialport` 的真实串口
//! - [`mock`]：内存回环，用于无硬件测试

use std::time::Duration;
use thiserror::Error;

pub mod framing;
pub mod mock;
#[cfg(feature = "serial")]
pub mod serial;

pub use framing::LineFramer;
pub use mock::{MockHandle, MockLink};
#[cfg(feature = "serial")]
pub use serial::{SerialLink, SerialRx, SerialTx};

/// 默认波特率（ESP8266 固件使用 115200）
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// 链路层统一错误类型
#[derive(Error, Debug)]
pub enum LinkError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[cfg(feature = "serial")]
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),
    #[error("Failed to open port {port}: {reason}")]
    Open { port: String, reason: String },
    #[error("Read timeout")]
    Timeout,
    #[error("Write timeout")]
    WriteTimeout,
    #[error("Link closed")]
    Closed,
    #[error("Link not open")]
    NotOpen,
}

impl LinkError {
    /// 是否为不可恢复错误（读线程遇到此类错误应退出）
    pub fn is_fatal(&self) -> bool {
        match self {
            LinkError::Closed | LinkError::NotOpen => true,
            LinkError::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::NotConnected
                    | std::io::ErrorKind::UnexpectedEof
            ),
            _ => false,
        }
    }
}

/// 按行收发的链路适配器
pub trait LinkAdapter {
    /// 发送一行（实现负责追加 `\n`）
    fn send_line(&mut self, line: &str) -> Result<(), LinkError>;

    /// 等待一整行，超时返回 [`LinkError::Timeout`]
    fn receive_line(&mut self, timeout: Duration) -> Result<String, LinkError>;

    /// 非阻塞检查是否有完整行
    fn try_receive_line(&mut self) -> Result<Option<String>, LinkError> {
        match self.receive_line(Duration::ZERO) {
            Ok(line) => Ok(Some(line)),
            Err(LinkError::Timeout) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// 只读半边
pub trait RxLink: Send {
    /// 等待一整行，超时返回 [`LinkError::Timeout`]
    fn receive_line(&mut self, timeout: Duration) -> Result<String, LinkError>;
}

/// 只写半边
pub trait TxLink: Send {
    /// 发送一行（实现负责追加 `\n`，并保证整行一次写出）
    fn send_line(&mut self, line: &str) -> Result<(), LinkError>;
}

/// 可拆分的适配器
pub trait SplittableLink: LinkAdapter {
    type Rx: RxLink + 'static;
    type Tx: TxLink + 'static;

    /// 拆分为独立的读写半边（消费自身）
    fn split(self) -> Result<(Self::Rx, Self::Tx), LinkError>;
}

impl RxLink for Box<dyn RxLink> {
    fn receive_line(&mut self, timeout: Duration) -> Result<String, LinkError> {
        (**self).receive_line(timeout)
    }
}

impl TxLink for Box<dyn TxLink> {
    fn send_line(&mut self, line: &str) -> Result<(), LinkError> {
        (**self).send_line(line)
    }
}
