//! 并发分发的线路完整性测试
//!
//! mock 链路逐字节写入并在字节之间让出 CPU，任何未串行化的写入都会
//! 在线路上产生交错的行。

use servoarm_driver::{ArmDriver, LinkConfig, LinkMode};
use servoarm_link::MockLink;
use servoarm_protocol::{Command, JointId, LegacyKey};
use std::sync::Arc;
use std::thread;

const PER_THREAD: usize = 200;

#[test]
fn concurrent_dispatch_never_interleaves_lines() {
    let driver = Arc::new(ArmDriver::new(LinkConfig::immediate(), LinkMode::Live));
    let (mock, handle) = MockLink::new();
    handle.set_byte_chunked(true);
    driver.connect_with("mock0", mock).unwrap();

    // 摇杆循环：连续的 set 指令
    let joystick = {
        let driver = driver.clone();
        thread::spawn(move || {
            for i in 0..PER_THREAD {
                let _ = driver.dispatch(Command::set(JointId::Wrist, (i % 181) as i32));
            }
        })
    };

    // 键盘处理：遗留按键和 move 指令
    let keyboard = {
        let driver = driver.clone();
        thread::spawn(move || {
            for i in 0..PER_THREAD {
                let command = if i % 2 == 0 {
                    Command::Key(LegacyKey::BaseLeft)
                } else {
                    "move 60 120 45 150 30".parse().unwrap()
                };
                let _ = driver.dispatch(command);
            }
        })
    };

    joystick.join().unwrap();
    keyboard.join().unwrap();

    let lines = handle.written_lines();
    assert_eq!(lines.len(), PER_THREAD * 2);
    for line in &lines {
        let parsed: Command = line
            .parse()
            .unwrap_or_else(|e| panic!("corrupted line on the wire: {line:?} ({e})"));
        assert_eq!(&parsed.to_string(), line);
    }
}

#[test]
fn wire_order_matches_dispatch_order() {
    let driver = Arc::new(ArmDriver::new(LinkConfig::immediate(), LinkMode::Live));
    let (mock, handle) = MockLink::new();
    handle.set_byte_chunked(true);
    driver.connect_with("mock0", mock).unwrap();

    let workers: Vec<_> = JointId::ALL
        .into_iter()
        .map(|joint| {
            let driver = driver.clone();
            thread::spawn(move || {
                for angle in 0..50 {
                    let _ = driver.dispatch(Command::set(joint, angle));
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    // 审计日志只保留最近 50 条，与线路尾部逐条对应
    let log: Vec<String> = driver.command_log().into_iter().map(|e| e.text).collect();
    let lines = handle.written_lines();
    assert_eq!(lines.len(), 250);
    assert_eq!(&lines[lines.len() - log.len()..], log.as_slice());
}

#[test]
fn failed_write_does_not_stop_later_dispatches() {
    let driver = ArmDriver::new(LinkConfig::immediate(), LinkMode::Live);
    let (mock, handle) = MockLink::new();
    driver.connect_with("mock0", mock).unwrap();

    handle.set_fail_writes(true);
    assert!(driver.dispatch(Command::Open).is_err());
    handle.set_fail_writes(false);
    driver.dispatch(Command::Close).unwrap();

    assert_eq!(handle.written_lines(), vec!["close"]);
    let metrics = driver.metrics();
    assert_eq!(metrics.send_failures, 1);
    assert_eq!(metrics.lines_sent, 1);
}
