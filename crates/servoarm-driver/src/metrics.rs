//! 链路性能指标（原子计数器）

use std::sync::atomic::{AtomicU64, Ordering};

/// 链路计数器
///
/// 所有计数使用 `Relaxed`，只用于监控，不参与同步。
#[derive(Debug, Default)]
pub struct LinkMetrics {
    /// 成功写入串口的行数
    pub lines_sent: AtomicU64,
    /// 调试模式下“发送”的行数
    pub debug_sends: AtomicU64,
    /// 写入失败次数
    pub send_failures: AtomicU64,
    /// 收到的行数
    pub lines_received: AtomicU64,
    /// 成功解析并应用的状态行
    pub status_updates: AtomicU64,
    /// 无法解析的行（遥测透传）
    pub unparsed_lines: AtomicU64,
    /// 读错误次数
    pub read_errors: AtomicU64,
}

impl LinkMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取快照
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            lines_sent: self.lines_sent.load(Ordering::Relaxed),
            debug_sends: self.debug_sends.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
            lines_received: self.lines_received.load(Ordering::Relaxed),
            status_updates: self.status_updates.load(Ordering::Relaxed),
            unparsed_lines: self.unparsed_lines.load(Ordering::Relaxed),
            read_errors: self.read_errors.load(Ordering::Relaxed),
        }
    }
}

/// 指标快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub lines_sent: u64,
    pub debug_sends: u64,
    pub send_failures: u64,
    pub lines_received: u64,
    pub status_updates: u64,
    pub unparsed_lines: u64,
    pub read_errors: u64,
}

impl MetricsSnapshot {
    /// 状态行占全部上行行的比例
    pub fn status_ratio(&self) -> f64 {
        if self.lines_received == 0 {
            0.0
        } else {
            self.status_updates as f64 / self.lines_received as f64
        }
    }
}
