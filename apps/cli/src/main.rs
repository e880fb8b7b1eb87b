//! # Servoarm CLI
//!
//! Command-line console for the 5-servo robot arm.
//!
//! ## 双模式架构
//!
//! ### One-shot 模式（推荐用于脚本）
//!
//! ```bash
//! # 配置默认串口并切换到在线模式
//! servoarm config set port /dev/ttyUSB0
//! servoarm config set debug_mode false
//!
//! # 发送一条指令（内部：连接 -> 发送 -> 断开）
//! servoarm send move 90 120 45 150 30
//!
//! # 回放路径
//! servoarm run pick_and_place
//! ```
//!
//! ### REPL 模式（推荐用于调试）
//!
//! ```bash
//! $ servoarm shell
//! servoarm> connect /dev/ttyUSB0
//! servoarm> set base 120
//! servoarm> path create P1
//! servoarm> path record
//! servoarm> path exec
//! servoarm> exit
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod events;
mod modes;

use commands::{ConfigCommand, GlobalArgs, PathsCommand, RunCommand, SendCommand};
use modes::repl::run_repl;

/// Servoarm CLI - 五舵机机械臂命令行工具
#[derive(Parser, Debug)]
#[command(name = "servoarm")]
#[command(about = "Command-line console for the 5-servo robot arm", long_about = None)]
#[command(version)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 配置管理
    #[command(subcommand)]
    Config(ConfigCommand),

    /// 列出可用串口
    Ports,

    /// 路径管理
    #[command(subcommand)]
    Paths(PathsCommand),

    /// 发送一条线路指令
    Send {
        #[command(flatten)]
        args: SendCommand,
    },

    /// 回放路径
    Run {
        #[command(flatten)]
        args: RunCommand,
    },

    /// 启动交互式 Shell（REPL 模式，缺省）
    Shell,
}

fn main() -> Result<()> {
    // 初始化日志
    // RUST_LOG 未设置时只输出 servoarm_* crates 的 info 日志
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("servoarm=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Config(cmd)) => cmd.execute(&cli.global),
        Some(Commands::Ports) => commands::ports::list_ports(),
        Some(Commands::Paths(cmd)) => cmd.execute(&cli.global),
        Some(Commands::Send { args }) => args.execute(&cli.global),
        Some(Commands::Run { args }) => args.execute(&cli.global),
        Some(Commands::Shell) | None => run_repl(&cli.global),
    }
}
