//! 指令分发
//!
//! `CommandDispatcher` 是改变舵机状态的唯一出口：记录审计日志、通知观察者、
//! 写入链路三步在同一把顺序锁内完成，因此分发顺序 == 日志顺序 == 线路顺序。

use crate::error::DriverError;
use crate::link::LinkChannel;
use crate::state::ArmContext;
use parking_lot::Mutex;
use servoarm_protocol::{Command, StatusUpdate, parse_status_line};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tracing::{debug, error, info, trace};

/// 指令分发器
pub struct CommandDispatcher {
    ctx: Arc<ArmContext>,
    link: Arc<LinkChannel>,
    order: Mutex<()>,
}

impl CommandDispatcher {
    pub fn new(ctx: Arc<ArmContext>, link: Arc<LinkChannel>) -> Self {
        Self {
            ctx,
            link,
            order: Mutex::new(()),
        }
    }

    pub fn context(&self) -> &Arc<ArmContext> {
        &self.ctx
    }

    pub fn link(&self) -> &Arc<LinkChannel> {
        &self.link
    }

    /// 分发一条指令
    ///
    /// 先记入审计日志并通知观察者，再按当前模式写入链路。
    /// 失败时在这里记录错误日志，并把错误返回给调用方；
    /// 控制循环可以直接忽略返回值。
    pub fn dispatch(&self, command: Command) -> Result<(), DriverError> {
        let _order = self.order.lock();

        let entry = self.ctx.command_log.push(command.to_string());
        self.ctx.hooks.read().notify_command_issued(&entry);

        let result = self.link.send(&command);
        if let Err(e) = &result {
            error!("Failed to send `{}`: {}", command, e);
        }
        result
    }

    /// 处理一行上行文本
    ///
    /// 能解析为状态行时更新对应关节并返回解析结果；否则作为遥测透传，返回 `None`。
    pub fn ingest(&self, line: &str) -> Option<StatusUpdate> {
        info!("← {}", line);
        self.ctx.hooks.read().notify_raw_line(line);

        let metrics = self.link.metrics();
        match parse_status_line(line) {
            Ok(update) => {
                if update.raw_angle != update.angle as i32 {
                    debug!(
                        "{} reported {}°, clamped to {}°",
                        update.joint, update.raw_angle, update.angle
                    );
                }
                self.ctx.joints.set(update.joint, update.angle as i32);
                metrics.status_updates.fetch_add(1, Ordering::Relaxed);
                Some(update)
            },
            Err(e) => {
                trace!("Unparsed line ({}): {}", e, line);
                metrics.unparsed_lines.fetch_add(1, Ordering::Relaxed);
                None
            },
        }
    }
}
