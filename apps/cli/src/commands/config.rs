//! 配置管理命令
//!
//! 配置文件位于 `<config_dir>/servoarm/config.toml`，可用 `--config` 覆盖。

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use servoarm_tools::ConsoleConfig;
use std::path::PathBuf;

/// 所有子命令共用的参数
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// 配置文件路径
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// 串口（覆盖配置）
    #[arg(short, long, global = true)]
    pub port: Option<String>,

    /// 在线模式：指令写入串口（覆盖配置）
    #[arg(long, global = true, conflicts_with = "debug")]
    pub live: bool,

    /// 调试模式：指令只记录不发送（覆盖配置）
    #[arg(long, global = true)]
    pub debug: bool,

    /// 路径目录（覆盖配置）
    #[arg(long, global = true, value_name = "DIR")]
    pub path_dir: Option<PathBuf>,
}

impl GlobalArgs {
    /// 配置文件位置
    pub fn config_file(&self) -> Result<PathBuf> {
        if let Some(path) = &self.config {
            return Ok(path.clone());
        }
        let mut path = dirs::config_dir().ok_or_else(|| anyhow::anyhow!("无法确定配置目录"))?;
        path.push("servoarm");
        path.push("config.toml");
        Ok(path)
    }

    /// 文件中的配置（不应用命令行覆盖）
    pub fn load_file_config(&self) -> Result<ConsoleConfig> {
        let path = self.config_file()?;
        ConsoleConfig::load_or_default(&path)
            .with_context(|| format!("读取配置文件失败: {}", path.display()))
    }

    /// 应用命令行覆盖后的配置
    pub fn load_config(&self) -> Result<ConsoleConfig> {
        let mut config = self.load_file_config()?;
        if let Some(port) = &self.port {
            config.port = Some(port.clone());
        }
        if self.live {
            config.debug_mode = false;
        }
        if self.debug {
            config.debug_mode = true;
        }
        if let Some(dir) = &self.path_dir {
            config.path_dir = dir.clone();
        }
        Ok(config)
    }
}

/// 配置命令
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// 显示当前配置（TOML）
    Show,

    /// 设置配置项（点分隔的键，如 `link.baud_rate`）
    Set {
        /// 配置项名称
        key: String,
        /// 新值
        value: String,
    },

    /// 显示配置文件路径
    Path,

    /// 写入默认配置
    Init {
        /// 覆盖已有文件
        #[arg(long)]
        force: bool,
    },
}

impl ConfigCommand {
    pub fn execute(self, global: &GlobalArgs) -> Result<()> {
        match self {
            ConfigCommand::Show => Self::show_(global),
            ConfigCommand::Set { key, value } => Self::set_(global, &key, &value),
            ConfigCommand::Path => {
                println!("{}", global.config_file()?.display());
                Ok(())
            },
            ConfigCommand::Init { force } => Self::init_(global, force),
        }
    }

    fn show_(global: &GlobalArgs) -> Result<()> {
        let config = global.load_config()?;
        print!("{}", config.to_toml()?);
        Ok(())
    }

    fn set_(global: &GlobalArgs, key: &str, value: &str) -> Result<()> {
        let path = global.config_file()?;
        let mut config = global.load_file_config()?;
        config
            .set_value(key, value)
            .with_context(|| format!("无法设置 {key} = {value}"))?;
        config.save(&path).context("写入配置文件失败")?;
        println!("✅ {} = {}", key, value);
        Ok(())
    }

    fn init_(global: &GlobalArgs, force: bool) -> Result<()> {
        let path = global.config_file()?;
        if path.exists() && !force {
            anyhow::bail!("配置文件已存在: {}（使用 --force 覆盖）", path.display());
        }
        ConsoleConfig::default().save(&path).context("写入配置文件失败")?;
        println!("✅ 已写入默认配置: {}", path.display());
        Ok(())
    }
}
