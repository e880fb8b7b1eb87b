//! 链路模式定义
//!
//! 决定 `LinkChannel::send` 是否真正触碰硬件。

use std::sync::atomic::{AtomicU8, Ordering};

/// 链路工作模式
///
/// # 模式说明
///
/// - **Live**: 指令写入串口，未连接时写入失败
/// - **Debug**: 离线模式，指令只记录日志、总是成功，不触碰硬件
///
/// 两种模式下指令的日志输出一致，调试模式额外带 `mode = "debug"` 字段。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum LinkMode {
    /// 在线模式（默认）
    #[default]
    Live = 0,

    /// 调试（离线）模式
    Debug = 1,
}

impl LinkMode {
    /// 从 u8 转换，无效值返回 Live
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Debug,
            _ => Self::Live,
        }
    }

    /// 转换为 u8
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// 从布尔开关构造
    pub fn from_debug_flag(debug: bool) -> Self {
        if debug { Self::Debug } else { Self::Live }
    }

    /// 是否为调试模式
    pub fn is_debug(self) -> bool {
        self == Self::Debug
    }

    /// 是否为在线模式
    pub fn is_live(self) -> bool {
        self == Self::Live
    }
}

/// 链路模式（原子版本，用于线程间共享）
///
/// # 示例
///
/// ```rust
/// use servoarm_driver::mode::{AtomicLinkMode, LinkMode};
/// use std::sync::atomic::Ordering;
///
/// let mode = AtomicLinkMode::new(LinkMode::Live);
/// mode.set(LinkMode::Debug, Ordering::Relaxed);
/// assert!(mode.get(Ordering::Relaxed).is_debug());
/// ```
#[derive(Debug)]
pub struct AtomicLinkMode {
    inner: AtomicU8,
}

impl AtomicLinkMode {
    /// 创建新的原子模式
    pub fn new(mode: LinkMode) -> Self {
        Self {
            inner: AtomicU8::new(mode.as_u8()),
        }
    }

    /// 获取当前模式
    pub fn get(&self, ordering: Ordering) -> LinkMode {
        LinkMode::from_u8(self.inner.load(ordering))
    }

    /// 设置模式，返回之前的模式
    pub fn set(&self, mode: LinkMode, ordering: Ordering) -> LinkMode {
        LinkMode::from_u8(self.inner.swap(mode.as_u8(), ordering))
    }
}

impl Default for AtomicLinkMode {
    fn default() -> Self {
        Self::new(LinkMode::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_mode_conversions() {
        assert_eq!(LinkMode::Live.as_u8(), 0);
        assert_eq!(LinkMode::Debug.as_u8(), 1);
        assert_eq!(LinkMode::from_u8(1), LinkMode::Debug);
        assert_eq!(LinkMode::from_u8(255), LinkMode::Live); // 无效值
        assert!(LinkMode::from_debug_flag(true).is_debug());
        assert!(LinkMode::from_debug_flag(false).is_live());
    }

    #[test]
    fn test_atomic_link_mode() {
        let mode = AtomicLinkMode::default();
        assert_eq!(mode.get(Ordering::Relaxed), LinkMode::Live);

        let previous = mode.set(LinkMode::Debug, Ordering::Relaxed);
        assert_eq!(previous, LinkMode::Live);
        assert_eq!(mode.get(Ordering::Relaxed), LinkMode::Debug);
    }
}
