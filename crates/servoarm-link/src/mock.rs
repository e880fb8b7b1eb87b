//! 内存回环链路
//!
//! [`MockLink`] 扮演串口，[`MockHandle`] 扮演控制器一侧：向链路注入上行行，
//! 并检查上位机写出的字节。
//!
//! 开启 `byte_chunked` 后，每个字节单独加锁写入并在字节之间让出 CPU，
//! 未串行化的并发写入会在输出中交错。

use crate::{LinkAdapter, LinkError, RxLink, SplittableLink, TxLink};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Debug, Default)]
struct Shared {
    written: Mutex<Vec<u8>>,
    byte_chunked: AtomicBool,
    fail_writes: AtomicBool,
    closed: AtomicBool,
    writes: AtomicUsize,
}

/// 控制器一侧的句柄
#[derive(Debug, Clone)]
pub struct MockHandle {
    incoming: Sender<String>,
    shared: Arc<Shared>,
}

impl MockHandle {
    /// 注入一行上行文本（不含换行）
    pub fn push_line(&self, line: impl Into<String>) {
        let _ = self.incoming.send(line.into());
    }

    /// 上位机写出的原始文本
    pub fn written_text(&self) -> String {
        String::from_utf8_lossy(&self.shared.written.lock()).into_owned()
    }

    /// 上位机写出的行（去掉 `\n`）
    pub fn written_lines(&self) -> Vec<String> {
        self.written_text().lines().map(str::to_string).collect()
    }

    /// 清空写出记录
    pub fn clear_written(&self) {
        self.shared.written.lock().clear();
    }

    /// 成功写出的行数
    pub fn write_count(&self) -> usize {
        self.shared.writes.load(Ordering::Acquire)
    }

    /// 逐字节写入
    pub fn set_byte_chunked(&self, enabled: bool) {
        self.shared.byte_chunked.store(enabled, Ordering::Release);
    }

    /// 令后续写入返回 IO 错误
    pub fn set_fail_writes(&self, fail: bool) {
        self.shared.fail_writes.store(fail, Ordering::Release);
    }

    /// 模拟设备断开
    pub fn close(&self) {
        self.shared.closed.store(true, Ordering::Release);
    }
}

fn mock_send(shared: &Shared, line: &str) -> Result<(), LinkError> {
    if shared.closed.load(Ordering::Acquire) {
        return Err(LinkError::Closed);
    }
    if shared.fail_writes.load(Ordering::Acquire) {
        return Err(LinkError::Io(std::io::Error::other("mock write failure")));
    }

    if shared.byte_chunked.load(Ordering::Acquire) {
        for &b in line.as_bytes().iter().chain(std::iter::once(&b'\n')) {
            shared.written.lock().push(b);
            std::thread::yield_now();
        }
    } else {
        let mut written = shared.written.lock();
        written.extend_from_slice(line.as_bytes());
        written.push(b'\n');
    }
    shared.writes.fetch_add(1, Ordering::AcqRel);
    Ok(())
}

fn mock_receive(
    shared: &Shared,
    incoming: &Receiver<String>,
    timeout: Duration,
) -> Result<String, LinkError> {
    if shared.closed.load(Ordering::Acquire) {
        return Err(LinkError::Closed);
    }
    match incoming.recv_timeout(timeout) {
        Ok(line) => Ok(line),
        Err(RecvTimeoutError::Timeout) => Err(LinkError::Timeout),
        Err(RecvTimeoutError::Disconnected) => Err(LinkError::Closed),
    }
}

/// 内存链路（上位机一侧）
#[derive(Debug)]
pub struct MockLink {
    incoming: Receiver<String>,
    shared: Arc<Shared>,
}

impl MockLink {
    /// 创建链路及其控制器句柄
    pub fn new() -> (Self, MockHandle) {
        let (tx, rx) = unbounded();
        let shared = Arc::new(Shared::default());
        (
            Self {
                incoming: rx,
                shared: shared.clone(),
            },
            MockHandle {
                incoming: tx,
                shared,
            },
        )
    }
}

impl LinkAdapter for MockLink {
    fn send_line(&mut self, line: &str) -> Result<(), LinkError> {
        mock_send(&self.shared, line)
    }

    fn receive_line(&mut self, timeout: Duration) -> Result<String, LinkError> {
        mock_receive(&self.shared, &self.incoming, timeout)
    }
}

/// 只读半边
#[derive(Debug)]
pub struct MockRx {
    incoming: Receiver<String>,
    shared: Arc<Shared>,
}

impl RxLink for MockRx {
    fn receive_line(&mut self, timeout: Duration) -> Result<String, LinkError> {
        mock_receive(&self.shared, &self.incoming, timeout)
    }
}

/// 只写半边
#[derive(Debug)]
pub struct MockTx {
    shared: Arc<Shared>,
}

impl TxLink for MockTx {
    fn send_line(&mut self, line: &str) -> Result<(), LinkError> {
        mock_send(&self.shared, line)
    }
}

impl SplittableLink for MockLink {
    type Rx = MockRx;
    type Tx = MockTx;

    fn split(self) -> Result<(Self::Rx, Self::Tx), LinkError> {
        Ok((
            MockRx {
                incoming: self.incoming,
                shared: self.shared.clone(),
            },
            MockTx {
                shared: self.shared,
            },
        ))
    }
}
