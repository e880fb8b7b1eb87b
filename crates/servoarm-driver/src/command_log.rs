//! 指令审计日志
//!
//! 保留最近 [`COMMAND_LOG_CAPACITY`] 条已分发指令，仅用于审计和显示。

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::SystemTime;

/// 默认保留条数
pub const COMMAND_LOG_CAPACITY: usize = 50;

/// 一条审计记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLogEntry {
    pub timestamp: SystemTime,
    pub text: String,
}

/// 有界环形日志
#[derive(Debug)]
pub struct CommandLog {
    entries: Mutex<VecDeque<CommandLogEntry>>,
    capacity: usize,
}

impl CommandLog {
    pub fn new() -> Self {
        Self::with_capacity(COMMAND_LOG_CAPACITY)
    }

    /// 指定容量（至少为 1）
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// 追加一条记录，超出容量时丢弃最旧的记录
    pub fn push(&self, text: impl Into<String>) -> CommandLogEntry {
        let entry = CommandLogEntry {
            timestamp: SystemTime::now(),
            text: text.into(),
        };
        let mut entries = self.entries.lock();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry.clone());
        entry
    }

    /// 按时间顺序（旧 → 新）的快照
    pub fn entries(&self) -> Vec<CommandLogEntry> {
        self.entries.lock().iter().cloned().collect()
    }

    /// 最近 `n` 条
    pub fn recent(&self, n: usize) -> Vec<CommandLogEntry> {
        let entries = self.entries.lock();
        let skip = entries.len().saturating_sub(n);
        entries.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl Default for CommandLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounded_to_capacity() {
        let log = CommandLog::new();
        for i in 0..(COMMAND_LOG_CAPACITY + 7) {
            log.push(format!("set 1 {i}"));
        }
        assert_eq!(log.len(), COMMAND_LOG_CAPACITY);

        let entries = log.entries();
        assert_eq!(entries.first().unwrap().text, "set 1 7");
        assert_eq!(
            entries.last().unwrap().text,
            format!("set 1 {}", COMMAND_LOG_CAPACITY + 6)
        );
    }

    #[test]
    fn test_recent_returns_tail() {
        let log = CommandLog::with_capacity(5);
        for text in ["reset", "open", "close"] {
            log.push(text);
        }
        let recent: Vec<_> = log.recent(2).into_iter().map(|e| e.text).collect();
        assert_eq!(recent, vec!["open", "close"]);
        assert_eq!(log.recent(10).len(), 3);
    }

    #[test]
    fn test_push_returns_stored_entry() {
        let log = CommandLog::new();
        let entry = log.push("status");
        assert_eq!(log.entries(), vec![entry]);
        log.clear();
        assert!(log.is_empty());
    }
}
