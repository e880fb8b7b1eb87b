//! 串口链路
//!
//! `LinkChannel` 持有唯一的物理连接，拆分后的读写两半各自由一把锁保护：
//!
//! - 写半边的锁保证任意时刻只有一个写者，整行写完才释放，
//!   不同来源的指令不会在线路上交错
//! - 读半边的锁由读线程在每次轮询时持有，`disconnect` 拿到它时
//!   不会有读操作正在进行
//!
//! 调试模式下 `send` 不触碰硬件，总是成功，日志与在线模式一致。

use crate::error::DriverError;
use crate::metrics::LinkMetrics;
use crate::mode::{AtomicLinkMode, LinkMode};
use crate::pipeline::LinkConfig;
use parking_lot::Mutex;
use servoarm_link::{LinkError, RxLink, SplittableLink, TxLink};
use servoarm_protocol::Command;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tracing::{debug, info, trace};

/// 物理链路
pub struct LinkChannel {
    rx: Mutex<Option<Box<dyn RxLink>>>,
    tx: Mutex<Option<Box<dyn TxLink>>>,
    port: Mutex<Option<String>>,
    mode: AtomicLinkMode,
    config: LinkConfig,
    metrics: Arc<LinkMetrics>,
}

impl LinkChannel {
    pub fn new(config: LinkConfig, mode: LinkMode) -> Self {
        Self {
            rx: Mutex::new(None),
            tx: Mutex::new(None),
            port: Mutex::new(None),
            mode: AtomicLinkMode::new(mode),
            config,
            metrics: Arc::new(LinkMetrics::new()),
        }
    }

    /// 打开串口，等待控制器启动完成后安装读写两半
    #[cfg(feature = "serial")]
    pub fn connect(&self, port: &str) -> Result<(), DriverError> {
        use servoarm_link::SerialLink;

        if let Some(current) = self.port() {
            return Err(DriverError::AlreadyConnected(current));
        }

        let link = SerialLink::open_with_baud(port, self.config.baud_rate)
            .map_err(DriverError::Connection)?;
        info!(
            "Connected to {} at {} baud, waiting {:?} for controller boot",
            port, self.config.baud_rate, self.config.settle_delay
        );
        spin_sleep::sleep(self.config.settle_delay);

        let (rx, mut tx) = link.split().map_err(DriverError::Connection)?;
        tx.set_write_timeout(self.config.write_timeout)
            .map_err(DriverError::Connection)?;
        self.install(port, Box::new(rx), Box::new(tx));
        Ok(())
    }

    /// 未启用串口后端
    #[cfg(not(feature = "serial"))]
    pub fn connect(&self, port: &str) -> Result<(), DriverError> {
        Err(DriverError::Connection(LinkError::Open {
            port: port.to_string(),
            reason: "serial backend disabled at build time".to_string(),
        }))
    }

    /// 使用任意可拆分适配器连接（mock、自定义后端）
    pub fn connect_with<L: SplittableLink>(&self, name: &str, link: L) -> Result<(), DriverError> {
        if let Some(current) = self.port() {
            return Err(DriverError::AlreadyConnected(current));
        }
        spin_sleep::sleep(self.config.settle_delay);
        let (rx, tx) = link.split().map_err(DriverError::Connection)?;
        self.install(name, Box::new(rx), Box::new(tx));
        Ok(())
    }

    fn install(&self, name: &str, rx: Box<dyn RxLink>, tx: Box<dyn TxLink>) {
        *self.rx.lock() = Some(rx);
        *self.tx.lock() = Some(tx);
        *self.port.lock() = Some(name.to_string());
        debug!("Link {} installed", name);
    }

    /// 关闭链路（幂等）
    ///
    /// 调用方负责先停止读线程；这里拿到读锁后再释放句柄。
    pub fn disconnect(&self) {
        let rx = self.rx.lock().take();
        let tx = self.tx.lock().take();
        let port = self.port.lock().take();
        if let Some(port) = port {
            drop(rx);
            drop(tx);
            info!("Disconnected from {}", port);
        }
    }

    /// 是否已打开
    pub fn is_open(&self) -> bool {
        self.port.lock().is_some()
    }

    /// 当前端口名
    pub fn port(&self) -> Option<String> {
        self.port.lock().clone()
    }

    pub fn mode(&self) -> LinkMode {
        self.mode.get(Ordering::Acquire)
    }

    /// 切换模式，返回之前的模式
    pub fn set_mode(&self, mode: LinkMode) -> LinkMode {
        let previous = self.mode.set(mode, Ordering::AcqRel);
        if previous != mode {
            info!("Link mode: {:?} -> {:?}", previous, mode);
        }
        previous
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<LinkMetrics> {
        &self.metrics
    }

    /// 写出一条指令
    ///
    /// - 调试模式：只记录日志，总是成功
    /// - 在线模式、未连接：`DriverError::Write(LinkError::NotOpen)`
    pub fn send(&self, command: &Command) -> Result<(), DriverError> {
        let text = command.to_string();

        if self.mode().is_debug() {
            info!(mode = "debug", "→ {}", text);
            self.metrics.debug_sends.fetch_add(1, Ordering::Relaxed);
            return Ok(());
        }

        let mut guard = self.tx.lock();
        let Some(tx) = guard.as_mut() else {
            self.metrics.send_failures.fetch_add(1, Ordering::Relaxed);
            return Err(DriverError::Write(LinkError::NotOpen));
        };
        match tx.send_line(&text) {
            Ok(()) => {
                info!("→ {}", text);
                self.metrics.lines_sent.fetch_add(1, Ordering::Relaxed);
                Ok(())
            },
            Err(e) => {
                self.metrics.send_failures.fetch_add(1, Ordering::Relaxed);
                Err(DriverError::Write(e))
            },
        }
    }

    /// 检查是否有完整的上行行
    ///
    /// 最多阻塞一个读超时；未连接时立即返回 `Ok(None)`。
    pub fn poll_incoming(&self) -> Result<Option<String>, DriverError> {
        let mut guard = self.rx.lock();
        let Some(rx) = guard.as_mut() else {
            return Ok(None);
        };
        match rx.receive_line(self.config.read_timeout) {
            Ok(line) => {
                trace!("Link received {} bytes", line.len());
                self.metrics.lines_received.fetch_add(1, Ordering::Relaxed);
                Ok(Some(line))
            },
            Err(LinkError::Timeout) => Ok(None),
            Err(e) => Err(DriverError::Read(e)),
        }
    }
}

impl std::fmt::Debug for LinkChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkChannel")
            .field("port", &self.port())
            .field("mode", &self.mode())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use servoarm_link::MockLink;
    use servoarm_protocol::JointId;

    fn channel(mode: LinkMode) -> LinkChannel {
        LinkChannel::new(LinkConfig::immediate(), mode)
    }

    #[test]
    fn test_debug_mode_always_succeeds() {
        let link = channel(LinkMode::Debug);
        assert!(!link.is_open());
        link.send(&Command::Reset).unwrap();
        assert_eq!(link.metrics().snapshot().debug_sends, 1);
    }

    #[test]
    fn test_live_without_link_is_write_error() {
        let link = channel(LinkMode::Live);
        let err = link.send(&Command::Open).unwrap_err();
        assert!(matches!(err, DriverError::Write(LinkError::NotOpen)));
        assert_eq!(link.metrics().snapshot().send_failures, 1);
    }

    #[test]
    fn test_connect_send_receive() {
        let link = channel(LinkMode::Live);
        let (mock, handle) = MockLink::new();
        link.connect_with("mock0", mock).unwrap();
        assert_eq!(link.port().as_deref(), Some("mock0"));

        link.send(&Command::set(JointId::Base, 45)).unwrap();
        assert_eq!(handle.written_lines(), vec!["set 2 45"]);

        handle.push_line("Servo2 (Base): 45°");
        assert_eq!(
            link.poll_incoming().unwrap().as_deref(),
            Some("Servo2 (Base): 45°")
        );
        assert_eq!(link.poll_incoming().unwrap(), None);
    }

    #[test]
    fn test_debug_mode_does_not_touch_connected_link() {
        let link = channel(LinkMode::Live);
        let (mock, handle) = MockLink::new();
        link.connect_with("mock0", mock).unwrap();

        link.set_mode(LinkMode::Debug);
        link.send(&Command::Close).unwrap();
        assert!(handle.written_lines().is_empty());
    }

    #[test]
    fn test_connect_twice_rejected() {
        let link = channel(LinkMode::Live);
        let (a, _ha) = MockLink::new();
        let (b, _hb) = MockLink::new();
        link.connect_with("a", a).unwrap();
        assert!(matches!(
            link.connect_with("b", b),
            Err(DriverError::AlreadyConnected(port)) if port == "a"
        ));
    }

    #[test]
    fn test_disconnect_is_idempotent() {
        let link = channel(LinkMode::Live);
        link.disconnect();

        let (mock, _handle) = MockLink::new();
        link.connect_with("mock0", mock).unwrap();
        link.disconnect();
        link.disconnect();
        assert!(!link.is_open());
        assert_eq!(link.poll_incoming().unwrap(), None);
        assert!(link.send(&Command::Status).is_err());
    }

    #[test]
    fn test_write_failure_surfaces() {
        let link = channel(LinkMode::Live);
        let (mock, handle) = MockLink::new();
        link.connect_with("mock0", mock).unwrap();
        handle.set_fail_writes(true);
        let err = link.send(&Command::Save).unwrap_err();
        assert!(err.is_write_error());
    }
}
