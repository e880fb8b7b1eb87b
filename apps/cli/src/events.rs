//! 控制台事件输出
//!
//! 通过 `EventForwarder` 订阅驱动事件，在后台线程打印路径状态和路径列表变化。
//! 指令和遥测已经由 tracing 日志输出（`→` / `←`），这里不重复打印。

use anyhow::Result;
use servoarm_driver::{ArmDriver, ArmEvent, EventForwarder, PathStatus};
use std::sync::Arc;
use std::thread::JoinHandle;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// 事件打印线程
///
/// 驱动释放观察者后通道关闭，线程随之退出。
pub struct EventPrinter {
    _handle: JoinHandle<()>,
}

impl EventPrinter {
    pub fn attach(driver: &ArmDriver) -> Result<Self> {
        let (forwarder, rx) = EventForwarder::new(EVENT_CHANNEL_CAPACITY);
        driver.add_observer(Arc::new(forwarder));

        let handle = std::thread::Builder::new()
            .name("servoarm-events".to_string())
            .spawn(move || {
                for event in rx {
                    match event {
                        ArmEvent::PathStatus(status) => print_status(&status),
                        ArmEvent::PathListChanged(names) => {
                            println!("📂 路径: {}", names.join(", "));
                        },
                        _ => {},
                    }
                }
            })?;
        Ok(Self { _handle: handle })
    }
}

fn print_status(status: &PathStatus) {
    match status {
        PathStatus::Idle => println!("📍 未选择路径"),
        PathStatus::Selected { name } => println!("📍 已选择: {}", name),
        PathStatus::Recording { name, points } => {
            println!("⏺  录制中: {} ({} 个点)", name, points)
        },
        PathStatus::Executing { name, step, total } => {
            println!("▶  执行 {}: {}/{}", name, step, total)
        },
        PathStatus::ExecutionFinished { name, cancelled } => {
            if *cancelled {
                println!("⏹  已中止: {}", name);
            } else {
                println!("✅ 执行完成: {}", name);
            }
        },
    }
}
