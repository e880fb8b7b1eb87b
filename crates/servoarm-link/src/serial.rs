//! 串口后端
//!
//! 基于 `serialport` crate。拆分时通过 `try_clone()` 获得同一设备的第二个句柄，
//! 读写两侧各自持有独立的超时设置。

use crate::framing::LineFramer;
use crate::{DEFAULT_BAUD_RATE, LinkAdapter, LinkError, RxLink, SplittableLink, TxLink};
use serialport::SerialPort;
use std::io::{ErrorKind, Read};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// 单次 read 的最小超时，`Duration::ZERO` 在部分平台上表示无限等待
const MIN_READ_TIMEOUT: Duration = Duration::from_millis(1);

/// 打开时的默认读写超时
const DEFAULT_OPEN_TIMEOUT: Duration = Duration::from_secs(1);

/// 列出系统中可用的串口名称
pub fn available_ports() -> Result<Vec<String>, LinkError> {
    let ports = serialport::available_ports()?;
    Ok(ports.into_iter().map(|p| p.port_name).collect())
}

/// 带行分帧的读取器（整体适配器与读半边共用）
struct LineReader {
    port: Box<dyn SerialPort>,
    framer: LineFramer,
    current_timeout: Duration,
    buf: [u8; 256],
}

impl LineReader {
    fn new(port: Box<dyn SerialPort>) -> Self {
        let current_timeout = port.timeout();
        Self {
            port,
            framer: LineFramer::new(),
            current_timeout,
            buf: [0; 256],
        }
    }

    fn receive_line(&mut self, timeout: Duration) -> Result<String, LinkError> {
        if let Some(line) = self.framer.pop_line() {
            return Ok(line);
        }

        let wait = timeout.max(MIN_READ_TIMEOUT);
        if self.current_timeout != wait {
            self.port.set_timeout(wait)?;
            self.current_timeout = wait;
        }

        let deadline = Instant::now() + timeout;
        loop {
            match self.port.read(&mut self.buf) {
                Ok(0) => return Err(LinkError::Closed),
                Ok(n) => {
                    trace!("Serial read {} bytes", n);
                    self.framer.push(&self.buf[..n]);
                    if let Some(line) = self.framer.pop_line() {
                        return Ok(line);
                    }
                },
                Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {},
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(LinkError::Io(e)),
            }
            if Instant::now() >= deadline {
                return Err(LinkError::Timeout);
            }
        }
    }
}

fn write_line(port: &mut dyn SerialPort, line: &str) -> Result<(), LinkError> {
    let mut frame = Vec::with_capacity(line.len() + 1);
    frame.extend_from_slice(line.as_bytes());
    frame.push(b'\n');
    port.write_all(&frame).map_err(|e| match e.kind() {
        ErrorKind::TimedOut => LinkError::WriteTimeout,
        _ => LinkError::Io(e),
    })?;
    port.flush()?;
    Ok(())
}

/// 串口适配器（未拆分）
pub struct SerialLink {
    name: String,
    reader: LineReader,
}

impl SerialLink {
    /// 以默认波特率打开串口
    pub fn open(path: &str) -> Result<Self, LinkError> {
        Self::open_with_baud(path, DEFAULT_BAUD_RATE)
    }

    /// 以指定波特率打开串口
    pub fn open_with_baud(path: &str, baud_rate: u32) -> Result<Self, LinkError> {
        let port = serialport::new(path, baud_rate)
            .timeout(DEFAULT_OPEN_TIMEOUT)
            .open()
            .map_err(|e| LinkError::Open {
                port: path.to_string(),
                reason: e.to_string(),
            })?;
        debug!("Opened serial port {} at {} baud", path, baud_rate);
        Ok(Self {
            name: path.to_string(),
            reader: LineReader::new(port),
        })
    }

    /// 串口名称
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl LinkAdapter for SerialLink {
    fn send_line(&mut self, line: &str) -> Result<(), LinkError> {
        write_line(self.reader.port.as_mut(), line)
    }

    fn receive_line(&mut self, timeout: Duration) -> Result<String, LinkError> {
        self.reader.receive_line(timeout)
    }
}

/// 串口只读半边
pub struct SerialRx {
    reader: LineReader,
}

impl RxLink for SerialRx {
    fn receive_line(&mut self, timeout: Duration) -> Result<String, LinkError> {
        self.reader.receive_line(timeout)
    }
}

/// 串口只写半边
pub struct SerialTx {
    port: Box<dyn SerialPort>,
}

impl SerialTx {
    /// 设置写超时
    pub fn set_write_timeout(&mut self, timeout: Duration) -> Result<(), LinkError> {
        self.port.set_timeout(timeout)?;
        Ok(())
    }
}

impl TxLink for SerialTx {
    fn send_line(&mut self, line: &str) -> Result<(), LinkError> {
        write_line(self.port.as_mut(), line)
    }
}

impl SplittableLink for SerialLink {
    type Rx = SerialRx;
    type Tx = SerialTx;

    fn split(self) -> Result<(Self::Rx, Self::Tx), LinkError> {
        let tx_port = self.reader.port.try_clone()?;
        debug!("Split serial port {} into RX/TX halves", self.name);
        Ok((SerialRx { reader: self.reader }, SerialTx { port: tx_port }))
    }
}
