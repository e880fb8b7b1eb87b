//! 路径管理命令（只操作路径目录，不连接机械臂）

use super::GlobalArgs;
use anyhow::{Context, Result};
use clap::Subcommand;
use servoarm_tools::PathStore;

/// 路径命令
#[derive(Subcommand, Debug)]
pub enum PathsCommand {
    /// 列出所有路径
    List,

    /// 显示路径中的点
    Show {
        name: String,
    },

    /// 创建空路径
    Create {
        name: String,
    },

    /// 删除路径
    Delete {
        name: String,
    },

    /// 重命名路径
    Rename {
        old: String,
        new: String,
    },
}

impl PathsCommand {
    pub fn execute(self, global: &GlobalArgs) -> Result<()> {
        let config = global.load_config()?;
        let mut store = PathStore::open(&config.path_dir)
            .with_context(|| format!("无法打开路径目录 {}", config.path_dir.display()))?;

        match self {
            PathsCommand::List => print_list(&store),
            PathsCommand::Show { name } => {
                let points = store
                    .get(&name)
                    .ok_or_else(|| anyhow::anyhow!("未知路径: {}", name))?;
                println!("{} ({} 个点)", name.trim(), points.len());
                for (i, point) in points.iter().enumerate() {
                    println!("  {:>3}: {}", i + 1, point);
                }
            },
            PathsCommand::Create { name } => {
                let name = store.create(&name)?;
                println!("✅ 已创建路径: {}", name);
            },
            PathsCommand::Delete { name } => {
                store.delete(&name)?;
                println!("✅ 已删除路径: {}", name.trim());
            },
            PathsCommand::Rename { old, new } => {
                let new = store.rename(&old, &new)?;
                println!("✅ {} -> {}", old.trim(), new);
            },
        }
        Ok(())
    }
}

/// 打印路径列表（名称 + 点数）
pub fn print_list(store: &PathStore) {
    if store.is_empty() {
        println!("(没有路径)");
        return;
    }
    for name in store.names() {
        let count = store.get(&name).map_or(0, <[_]>::len);
        println!("{:<24} {} 个点", name, count);
    }
}
