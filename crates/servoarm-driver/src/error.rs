//! 驱动层错误类型定义

use servoarm_link::LinkError;
use servoarm_protocol::ProtocolError;
use thiserror::Error;

/// 驱动层错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// 打开串口失败（链路保持断开）
    #[error("Connection error: {0}")]
    Connection(LinkError),

    /// 写入失败（指令被丢弃，控制循环继续）
    #[error("Write error: {0}")]
    Write(LinkError),

    /// 读取失败
    #[error("Read error: {0}")]
    Read(LinkError),

    /// 协议解析错误
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// 已连接到某个端口
    #[error("Already connected to {0}")]
    AlreadyConnected(String),

    /// IO 线程错误
    #[error("IO thread error: {0}")]
    IoThread(String),
}

impl DriverError {
    /// 是否为写入失败
    pub fn is_write_error(&self) -> bool {
        matches!(self, DriverError::Write(_))
    }

    /// 是否为不可恢复的链路错误（设备断开等）
    pub fn is_fatal_link_error(&self) -> bool {
        match self {
            DriverError::Read(e) | DriverError::Write(e) => e.is_fatal(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::DriverError;
    use servoarm_link::LinkError;
    use servoarm_protocol::ProtocolError;

    #[test]
    fn test_driver_error_display() {
        let err = DriverError::Write(LinkError::NotOpen);
        assert_eq!(err.to_string(), "Write error: Link not open");
        assert!(err.is_write_error());

        let err = DriverError::Connection(LinkError::Open {
            port: "COM3".to_string(),
            reason: "Access is denied".to_string(),
        });
        assert!(err.to_string().contains("COM3"));
        assert!(!err.is_write_error());

        let err = DriverError::AlreadyConnected("/dev/ttyUSB0".to_string());
        assert_eq!(err.to_string(), "Already connected to /dev/ttyUSB0");
    }

    #[test]
    fn test_from_protocol_error() {
        let err: DriverError = ProtocolError::InvalidJointIndex(7).into();
        match err {
            DriverError::Protocol(ProtocolError::InvalidJointIndex(index)) => assert_eq!(index, 7),
            _ => panic!("Expected Protocol variant"),
        }
    }
}
