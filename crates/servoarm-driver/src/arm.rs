//! Arm API 模块
//!
//! 提供对外的 `ArmDriver` 结构体，封装读线程生命周期和共享状态。

use crate::command_log::CommandLogEntry;
use crate::dispatcher::CommandDispatcher;
use crate::error::DriverError;
use crate::hooks::{ArmObserver, HookManager};
use crate::link::LinkChannel;
use crate::metrics::MetricsSnapshot;
use crate::mode::LinkMode;
use crate::pipeline::{LinkConfig, reader_loop};
use crate::state::{ArmContext, JointState};
use parking_lot::{Mutex, RwLock};
use servoarm_link::SplittableLink;
use servoarm_protocol::Command;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{JoinHandle, spawn};
use std::time::Duration;
use tracing::error;

/// 读线程退出等待上限
const READER_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Extension trait for timeout-capable thread joins
trait JoinTimeout {
    fn join_timeout(self, timeout: Duration) -> std::thread::Result<()>;
}

impl<T: Send + 'static> JoinTimeout for JoinHandle<T> {
    fn join_timeout(self, timeout: Duration) -> std::thread::Result<()> {
        let (tx, rx) = crossbeam_channel::bounded(1);

        // 看门狗线程代为 join，超时后继续存活到目标线程结束
        spawn(move || {
            let _ = tx.send(self.join());
        });

        match rx.recv_timeout(timeout) {
            Ok(join_result) => join_result.map(|_| ()),
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => Err(Box::new(
                std::io::Error::new(std::io::ErrorKind::TimedOut, "Thread join timeout"),
            )),
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => Err(Box::new(
                std::io::Error::new(
                    std::io::ErrorKind::ConnectionReset,
                    "Thread panicked during join",
                ),
            )),
        }
    }
}

struct ReaderThread {
    is_running: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl ReaderThread {
    fn stop(self) {
        // Release: 读线程看到 false 时能看到之前的所有写入
        self.is_running.store(false, Ordering::Release);
        if let Err(_e) = self.handle.join_timeout(READER_JOIN_TIMEOUT) {
            error!(
                "Reader thread panicked or failed to shut down within {:?}",
                READER_JOIN_TIMEOUT
            );
        }
    }
}

/// 机械臂驱动（对外 API）
///
/// 持有共享上下文、链路和分发器；连接期间运行一个读线程。
/// Drop 时先停止读线程，再关闭链路。
pub struct ArmDriver {
    ctx: Arc<ArmContext>,
    link: Arc<LinkChannel>,
    dispatcher: Arc<CommandDispatcher>,
    /// 读线程（同时作为连接/断开的生命周期锁）
    reader: Mutex<Option<ReaderThread>>,
}

impl ArmDriver {
    /// 创建未连接的驱动
    pub fn new(config: LinkConfig, mode: LinkMode) -> Self {
        let ctx = Arc::new(ArmContext::new());
        let link = Arc::new(LinkChannel::new(config, mode));
        let dispatcher = Arc::new(CommandDispatcher::new(ctx.clone(), link.clone()));
        Self {
            ctx,
            link,
            dispatcher,
            reader: Mutex::new(None),
        }
    }

    /// 打开串口并启动读线程
    ///
    /// 打开失败时返回 `DriverError::Connection`，链路保持断开。
    pub fn connect(&self, port: &str) -> Result<(), DriverError> {
        let mut reader = self.reader.lock();
        Self::reap_dead_reader(&mut reader);
        self.link.connect(port)?;
        *reader = Some(self.spawn_reader()?);
        drop(reader);
        self.query_status();
        Ok(())
    }

    /// 使用任意可拆分适配器连接
    pub fn connect_with<L: SplittableLink>(&self, name: &str, link: L) -> Result<(), DriverError> {
        let mut reader = self.reader.lock();
        Self::reap_dead_reader(&mut reader);
        self.link.connect_with(name, link)?;
        *reader = Some(self.spawn_reader()?);
        drop(reader);
        self.query_status();
        Ok(())
    }

    /// 回收因致命读错误自行退出的读线程（链路已由读线程释放）
    fn reap_dead_reader(reader: &mut Option<ReaderThread>) {
        if reader
            .as_ref()
            .is_some_and(|r| !r.is_running.load(Ordering::Acquire))
            && let Some(thread) = reader.take()
        {
            thread.stop();
        }
    }

    fn spawn_reader(&self) -> Result<ReaderThread, DriverError> {
        let is_running = Arc::new(AtomicBool::new(true));
        let dispatcher = self.dispatcher.clone();
        let running = is_running.clone();
        let handle = std::thread::Builder::new()
            .name("servoarm-reader".to_string())
            .spawn(move || reader_loop(dispatcher, running))
            .map_err(|e| {
                self.link.disconnect();
                DriverError::IoThread(e.to_string())
            })?;
        Ok(ReaderThread { is_running, handle })
    }

    fn query_status(&self) {
        if let Some(delay) = self.link.config().status_query_delay {
            spin_sleep::sleep(delay);
            let _ = self.dispatcher.dispatch(Command::Status);
        }
    }

    /// 断开链路（幂等）：先停止读线程，再释放物理句柄
    pub fn disconnect(&self) {
        let mut reader = self.reader.lock();
        if let Some(thread) = reader.take() {
            thread.stop();
        }
        self.link.disconnect();
    }

    /// 是否已连接
    pub fn is_connected(&self) -> bool {
        self.link.is_open()
    }

    /// 读线程是否在运行（致命读错误后会自行退出）
    pub fn is_reader_alive(&self) -> bool {
        self.reader
            .lock()
            .as_ref()
            .is_some_and(|r| r.is_running.load(Ordering::Acquire))
    }

    /// 当前端口名
    pub fn port(&self) -> Option<String> {
        self.link.port()
    }

    pub fn mode(&self) -> LinkMode {
        self.link.mode()
    }

    /// 切换调试（离线）模式
    pub fn set_debug_mode(&self, enabled: bool) {
        self.link.set_mode(LinkMode::from_debug_flag(enabled));
    }

    pub fn is_debug_mode(&self) -> bool {
        self.link.mode().is_debug()
    }

    /// 分发一条指令（见 [`CommandDispatcher::dispatch`]）
    pub fn dispatch(&self, command: Command) -> Result<(), DriverError> {
        self.dispatcher.dispatch(command)
    }

    pub fn dispatcher(&self) -> &Arc<CommandDispatcher> {
        &self.dispatcher
    }

    pub fn context(&self) -> &Arc<ArmContext> {
        &self.ctx
    }

    pub fn joints(&self) -> &JointState {
        &self.ctx.joints
    }

    /// 审计日志快照
    pub fn command_log(&self) -> Vec<CommandLogEntry> {
        self.ctx.command_log.entries()
    }

    /// 钩子管理器（用于注册观察者）
    pub fn hooks(&self) -> Arc<RwLock<HookManager>> {
        self.ctx.hooks.clone()
    }

    /// 注册观察者
    pub fn add_observer(&self, observer: Arc<dyn ArmObserver>) {
        self.ctx.hooks.write().add_observer(observer);
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.link.metrics().snapshot()
    }
}

impl Drop for ArmDriver {
    fn drop(&mut self) {
        if let Some(thread) = self.reader.get_mut().take() {
            thread.stop();
        }
        self.link.disconnect();
    }
}

impl std::fmt::Debug for ArmDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArmDriver")
            .field("link", &self.link)
            .field("joints", &self.ctx.joints)
            .finish_non_exhaustive()
    }
}

impl Default for ArmDriver {
    fn default() -> Self {
        Self::new(LinkConfig::default(), LinkMode::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use servoarm_link::MockLink;
    use servoarm_protocol::JointId;
    use std::time::Instant;

    fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        cond()
    }

    #[test]
    fn test_reader_applies_status_lines() {
        let driver = ArmDriver::new(LinkConfig::immediate(), LinkMode::Live);
        let (mock, handle) = MockLink::new();
        driver.connect_with("mock0", mock).unwrap();
        assert!(driver.is_connected());

        handle.push_line("  Servo5 (Gripper):  30°");
        assert!(wait_until(Duration::from_secs(2), || {
            driver.joints().get(JointId::Gripper) == 30
        }));

        driver.disconnect();
        assert!(!driver.is_connected());
        assert!(!driver.is_reader_alive());
    }

    #[test]
    fn test_status_query_after_connect() {
        let config = LinkConfig {
            status_query_delay: Some(Duration::ZERO),
            ..LinkConfig::immediate()
        };
        let driver = ArmDriver::new(config, LinkMode::Live);
        let (mock, handle) = MockLink::new();
        driver.connect_with("mock0", mock).unwrap();
        assert_eq!(handle.written_lines(), vec!["status"]);
    }

    #[test]
    fn test_reader_exits_on_device_loss() {
        let driver = ArmDriver::new(LinkConfig::immediate(), LinkMode::Live);
        let (mock, handle) = MockLink::new();
        driver.connect_with("mock0", mock).unwrap();
        handle.close();
        assert!(wait_until(Duration::from_secs(2), || !driver.is_reader_alive()));
        driver.disconnect();
    }

    #[test]
    fn test_reconnect_after_device_loss() {
        let driver = ArmDriver::new(LinkConfig::immediate(), LinkMode::Live);
        let (mock, handle) = MockLink::new();
        driver.connect_with("mock0", mock).unwrap();
        handle.close();
        assert!(wait_until(Duration::from_secs(2), || !driver.is_connected()));
        assert!(!driver.is_reader_alive());
        assert!(driver.dispatch(Command::Reset).is_err());

        let (mock, handle) = MockLink::new();
        driver.connect_with("mock1", mock).unwrap();
        assert_eq!(driver.port().as_deref(), Some("mock1"));
        assert!(driver.is_reader_alive());
        driver.dispatch(Command::Reset).unwrap();
        assert_eq!(handle.written_lines(), vec!["reset"]);
        driver.disconnect();
    }

    #[test]
    fn test_debug_toggle() {
        let driver = ArmDriver::new(LinkConfig::immediate(), LinkMode::Live);
        assert!(driver.dispatch(Command::Reset).is_err());
        driver.set_debug_mode(true);
        assert!(driver.is_debug_mode());
        assert!(driver.dispatch(Command::Reset).is_ok());
        assert_eq!(driver.command_log().len(), 2);
    }

    #[test]
    fn test_drop_while_connected() {
        let driver = ArmDriver::new(LinkConfig::immediate(), LinkMode::Live);
        let (mock, _handle) = MockLink::new();
        driver.connect_with("mock0", mock).unwrap();
        drop(driver);
    }
}
