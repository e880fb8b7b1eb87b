//! 行分帧
//!
//! 串口读到的字节可能在任意位置被截断，`LineFramer` 负责把字节流重新
//! 切分为完整的文本行。

use std::collections::VecDeque;

/// 单行最大长度，超过后丢弃已缓存内容（防止无换行的噪声占满内存）
pub const MAX_LINE_LEN: usize = 1024;

/// 字节流 → 文本行
#[derive(Debug, Default)]
pub struct LineFramer {
    partial: Vec<u8>,
    lines: VecDeque<String>,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加读到的字节，返回新产生的完整行数
    ///
    /// 行以 `\n` 结束，`\r` 被去掉；去除首尾空白后为空的行被忽略。
    /// 非 UTF-8 字节按有损方式解码。
    pub fn push(&mut self, bytes: &[u8]) -> usize {
        let mut produced = 0;
        for &b in bytes {
            if b == b'\n' {
                let raw = std::mem::take(&mut self.partial);
                let text = String::from_utf8_lossy(&raw);
                let text = text.trim();
                if !text.is_empty() {
                    self.lines.push_back(text.to_string());
                    produced += 1;
                }
            } else if self.partial.len() < MAX_LINE_LEN {
                self.partial.push(b);
            } else {
                tracing::warn!("Line exceeds {} bytes without newline, dropping", MAX_LINE_LEN);
                self.partial.clear();
            }
        }
        produced
    }

    /// 取出最早的完整行
    pub fn pop_line(&mut self) -> Option<String> {
        self.lines.pop_front()
    }

    /// 是否有待取的完整行
    pub fn has_line(&self) -> bool {
        !self.lines.is_empty()
    }

    /// 丢弃所有缓存
    pub fn clear(&mut self) {
        self.partial.clear();
        self.lines.clear();
    }
}
