//! 回放路径（One-shot）
//!
//! Ctrl+C 中止回放，机械臂仍会收到最后一次 `reset`。

use super::GlobalArgs;
use crate::events::EventPrinter;
use crate::modes::oneshot::OneShotMode;
use anyhow::Result;
use clap::Args;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// 回放命令参数
#[derive(Args, Debug)]
pub struct RunCommand {
    /// 路径名称
    pub path: String,
}

impl RunCommand {
    pub fn execute(&self, global: &GlobalArgs) -> Result<()> {
        let interrupted = Arc::new(AtomicBool::new(false));
        {
            let interrupted = interrupted.clone();
            ctrlc::set_handler(move || {
                eprintln!("\n🛑 收到 Ctrl+C，中止回放...");
                interrupted.store(true, Ordering::SeqCst);
            })?;
        }

        let mode = OneShotMode::new(global)?;
        let console = mode.console();
        let _printer = EventPrinter::attach(console.driver())?;

        let paths = console.paths();
        paths.execute(&self.path)?;
        while paths.is_executing() {
            if interrupted.load(Ordering::SeqCst) {
                paths.cancel();
                anyhow::bail!("回放被中止");
            }
            std::thread::sleep(Duration::from_millis(50));
        }
        paths.wait();
        println!("✅ 回放完成: {}", self.path.trim());
        Ok(())
    }
}
