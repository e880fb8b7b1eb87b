//! 链路读循环
//!
//! 后台读线程以短超时轮询上行行，并交给 `CommandDispatcher::ingest`。

use crate::dispatcher::CommandDispatcher;
use servoarm_link::DEFAULT_BAUD_RATE;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{error, trace, warn};

/// 链路配置
///
/// # Example
///
/// ```
/// use servoarm_driver::LinkConfig;
/// use std::time::Duration;
///
/// // 默认：115200 波特率，2s 上电等待，50ms 读轮询，1s 写超时
/// let config = LinkConfig::default();
/// assert_eq!(config.settle_delay, Duration::from_secs(2));
///
/// // 测试中去掉所有等待
/// let config = LinkConfig::immediate();
/// assert_eq!(config.settle_delay, Duration::ZERO);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkConfig {
    /// 波特率
    pub baud_rate: u32,
    /// 打开串口后等待控制器完成启动的时间
    pub settle_delay: Duration,
    /// 读线程单次轮询超时
    pub read_timeout: Duration,
    /// 写超时
    pub write_timeout: Duration,
    /// 连接后发送 `status` 前的等待，`None` 表示不发送
    pub status_query_delay: Option<Duration>,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            settle_delay: Duration::from_secs(2),
            read_timeout: Duration::from_millis(50),
            write_timeout: Duration::from_secs(1),
            status_query_delay: Some(Duration::from_millis(500)),
        }
    }
}

impl LinkConfig {
    /// 无等待配置（用于测试和 mock 链路）
    pub fn immediate() -> Self {
        Self {
            settle_delay: Duration::ZERO,
            read_timeout: Duration::from_millis(5),
            status_query_delay: None,
            ..Self::default()
        }
    }
}

/// 读线程主循环
///
/// # 参数
/// - `dispatcher`: 指令分发器（持有链路，负责解析并更新关节状态）
/// - `is_running`: 运行标志，置为 false 后最迟一个读超时内退出
///
/// 遇到不可恢复的链路错误（设备断开）时清除运行标志并退出。
pub fn reader_loop(dispatcher: Arc<CommandDispatcher>, is_running: Arc<AtomicBool>) {
    #[cfg(feature = "realtime")]
    {
        use thread_priority::*;
        use tracing::info;

        match set_current_thread_priority(ThreadPriority::Max) {
            Ok(_) => info!("Reader thread priority set to MAX (realtime)"),
            Err(e) => warn!(
                "Failed to set reader thread priority: {}. \
                On Linux, you may need to run with CAP_SYS_NICE or use rtkit.",
                e
            ),
        }
    }

    let link = dispatcher.link().clone();
    let idle_wait = link.config().read_timeout;

    loop {
        // Acquire: 看到 false 时必须同时看到停止方之前的写入
        if !is_running.load(Ordering::Acquire) {
            trace!("Reader thread: is_running flag is false, exiting");
            break;
        }

        match link.poll_incoming() {
            Ok(Some(line)) => {
                dispatcher.ingest(&line);
            },
            Ok(None) => {
                if !link.is_open() {
                    spin_sleep::sleep(idle_wait);
                }
            },
            Err(e) => {
                link.metrics().read_errors.fetch_add(1, Ordering::Relaxed);
                if e.is_fatal_link_error() {
                    error!("Reader thread: fatal link error: {}, releasing link", e);
                    link.disconnect();
                    is_running.store(false, Ordering::Release);
                    break;
                }
                warn!("Reader thread: read error: {}", e);
                spin_sleep::sleep(idle_wait);
            },
        }
    }

    trace!("Reader thread: loop exited");
}
