//! 发送单条线路指令

use super::GlobalArgs;
use crate::modes::oneshot::OneShotMode;
use anyhow::{Context, Result};
use clap::Args;
use servoarm_client::ArmConsole;
use servoarm_protocol::Command;

/// 发送命令参数
#[derive(Args, Debug)]
pub struct SendCommand {
    /// 线路指令，如 `set 2 120`、`move 90 90 90 90 90`、`reset`、`w`
    #[arg(required = true, num_args = 1.., allow_hyphen_values = true)]
    pub command: Vec<String>,
}

impl SendCommand {
    pub fn execute(&self, global: &GlobalArgs) -> Result<()> {
        let text = self.command.join(" ");
        let command: Command = text.parse().with_context(|| format!("无法解析指令: {text}"))?;
        let mode = OneShotMode::new(global)?;
        dispatch_command(mode.console(), command)?;
        println!("✅ {}", command);
        Ok(())
    }
}

/// 分发一条指令，并让关节状态跟随 `set`/`move`/`reset`
pub fn dispatch_command(console: &ArmConsole, command: Command) -> Result<()> {
    let input = console.input();
    match command {
        Command::Set { joint, angle } => {
            input.set_joint(joint, i32::from(angle))?;
        },
        Command::Move(angles) => {
            console.driver().joints().set_all(angles);
            input.send_all()?;
        },
        Command::Reset => input.reset_all()?,
        other => console.driver().dispatch(other)?,
    }
    Ok(())
}
