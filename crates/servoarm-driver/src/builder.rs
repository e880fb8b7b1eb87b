//! Builder 模式实现
//!
//! 提供链式构造 `ArmDriver` 实例的便捷方式。

use crate::arm::ArmDriver;
use crate::error::DriverError;
use crate::hooks::ArmObserver;
use crate::mode::LinkMode;
use crate::pipeline::LinkConfig;
use std::sync::Arc;
use std::time::Duration;

/// ArmDriver Builder（链式构造）
///
/// # Example
///
/// ```no_run
/// use servoarm_driver::ArmDriverBuilder;
///
/// // 离线调试，不打开串口
/// let driver = ArmDriverBuilder::new().debug_mode(true).build().unwrap();
///
/// // 打开串口
/// let driver = ArmDriverBuilder::new()
///     .port("/dev/ttyUSB0")
///     .baud_rate(115_200)
///     .build()
///     .unwrap();
/// ```
#[derive(Default)]
pub struct ArmDriverBuilder {
    /// 串口名称（设置后 `build()` 会立即连接）
    port: Option<String>,
    config: LinkConfig,
    debug_mode: bool,
    observers: Vec<Arc<dyn ArmObserver>>,
}

impl ArmDriverBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置串口（可选）
    pub fn port(mut self, port: impl Into<String>) -> Self {
        self.port = Some(port.into());
        self
    }

    /// 设置波特率（默认 115200）
    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.config.baud_rate = baud_rate;
        self
    }

    /// 设置上电等待（默认 2s）
    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.config.settle_delay = delay;
        self
    }

    /// 设置连接后的状态查询等待，`None` 表示不查询
    pub fn status_query_delay(mut self, delay: Option<Duration>) -> Self {
        self.config.status_query_delay = delay;
        self
    }

    /// 整体替换链路配置
    pub fn link_config(mut self, config: LinkConfig) -> Self {
        self.config = config;
        self
    }

    /// 初始调试模式（默认关闭）
    pub fn debug_mode(mut self, enabled: bool) -> Self {
        self.debug_mode = enabled;
        self
    }

    /// 注册观察者（在连接之前生效，可以收到连接时的 `status` 指令）
    pub fn observer(mut self, observer: Arc<dyn ArmObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// 构建驱动
    ///
    /// 设置了端口时立即连接，连接失败返回 `DriverError::Connection`。
    pub fn build(self) -> Result<ArmDriver, DriverError> {
        let driver = ArmDriver::new(self.config, LinkMode::from_debug_flag(self.debug_mode));
        for observer in self.observers {
            driver.add_observer(observer);
        }
        if let Some(port) = self.port {
            driver.connect(&port)?;
        }
        Ok(driver)
    }
}
