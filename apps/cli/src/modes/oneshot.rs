//! One-shot 模式
//!
//! 按配置组装控制台；在线模式下连接串口，命令结束时随控制台一起断开。

use crate::commands::GlobalArgs;
use anyhow::{Context, Result};
use servoarm_client::ArmConsole;
use tracing::info;

/// 单次命令的控制台会话
pub struct OneShotMode {
    console: ArmConsole,
}

impl OneShotMode {
    pub fn new(global: &GlobalArgs) -> Result<Self> {
        let config = global.load_config()?;
        let console = ArmConsole::from_config(&config)?;

        if config.debug_mode {
            info!("Debug mode: commands are logged, nothing is written to the port");
        } else {
            let port = config
                .port
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("在线模式需要串口：使用 --port 或 `config set port <PORT>`"))?;
            println!("🔌 连接到 {} ...", port);
            console
                .connect(port)
                .with_context(|| format!("无法连接到 {port}"))?;
        }

        Ok(Self { console })
    }

    pub fn console(&self) -> &ArmConsole {
        &self.console
    }
}
