//! REPL 模式（交互式 Shell）
//!
//! 专用输入线程 + crossbeam 通道：rustyline 在输入线程内阻塞读取，
//! 主线程执行命令，摇杆线程和回放线程在后台运行。

use crate::commands::GlobalArgs;
use crate::commands::send::dispatch_command;
use crate::events::EventPrinter;
use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, bounded};
use rustyline::Editor;
use servoarm_client::ArmConsole;
use servoarm_protocol::{Command, JointAngles, JointId};
use std::thread;

/// Ctrl+C 在通道中的标记
const INTERRUPT: &str = "\u{3}";

/// REPL 会话（持有控制台）
pub struct ReplSession {
    console: ArmConsole,
    default_port: Option<String>,
    _events: EventPrinter,
}

impl ReplSession {
    pub fn new(global: &GlobalArgs) -> Result<Self> {
        let config = global.load_config()?;
        let console = ArmConsole::from_config(&config)?;
        let events = EventPrinter::attach(console.driver())?;
        Ok(Self {
            console,
            default_port: config.port,
            _events: events,
        })
    }

    /// 状态描述
    pub fn status(&self) -> String {
        let driver = self.console.driver();
        let link = match driver.port() {
            Some(port) => format!("已连接 {port}"),
            None => "未连接".to_string(),
        };
        let mode = if driver.is_debug_mode() { "调试" } else { "在线" };
        let path = match self.console.paths().selected() {
            Some(name) if self.console.paths().is_recording() => format!("录制中 `{name}`"),
            Some(name) => format!("已选择 `{name}`"),
            None => "未选择路径".to_string(),
        };
        let joystick = if self.console.is_joystick_running() { "，摇杆运行中" } else { "" };
        format!("{link}，{mode}模式，{path}{joystick}")
    }

    fn connect(&self, port: Option<&str>) -> Result<()> {
        let driver = self.console.driver();
        if driver.is_connected() {
            println!("⚠️  已经连接 {}", driver.port().unwrap_or_default());
            return Ok(());
        }
        let port = port
            .map(str::to_string)
            .or_else(|| self.default_port.clone())
            .ok_or_else(|| anyhow::anyhow!("没有指定串口"))?;
        println!("⏳ 连接到 {} ...", port);
        self.console
            .connect(&port)
            .with_context(|| format!("无法连接到 {port}"))?;
        println!("✅ 已连接");
        Ok(())
    }

    fn disconnect(&self) {
        if !self.console.driver().is_connected() {
            println!("⚠️  未连接");
            return;
        }
        self.console.disconnect();
        println!("✅ 已断开");
    }

    fn emergency_stop(&self) {
        eprintln!("🛑 急停：复位所有关节");
        self.console.paths().cancel();
        if let Err(e) = self.console.input().emergency_stop() {
            eprintln!("❌ 急停指令发送失败: {}", e);
        }
    }
}

/// REPL 输入（专用输入线程）
pub struct ReplInput {
    command_rx: Receiver<String>,
    _input_thread: thread::JoinHandle<Result<()>>,
}

impl ReplInput {
    /// 创建专用输入线程（保留历史记录）
    pub fn new() -> Self {
        let (command_tx, command_rx) = bounded::<String>(10);

        let input_thread = thread::spawn(move || {
            use rustyline::history::DefaultHistory;

            let mut rl = Editor::<(), DefaultHistory>::new()
                .map_err(|e| anyhow::anyhow!("Failed to initialize readline: {}", e))?;

            let history_path = dirs::data_dir()
                .map(|dir| dir.join("servoarm").join("history.txt"))
                .unwrap_or_else(|| ".servoarm_history".into());
            if let Some(parent) = history_path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            rl.load_history(&history_path).ok(); // 首次运行没有历史文件

            loop {
                match rl.readline("servoarm> ") {
                    Ok(line) => {
                        let line = line.trim().to_string();
                        if line.is_empty() {
                            continue;
                        }
                        let _ = rl.add_history_entry(line.clone());
                        let exit = line == "exit" || line == "quit";
                        if command_tx.send(line).is_err() || exit {
                            break;
                        }
                    },

                    Err(rustyline::error::ReadlineError::Interrupted) => {
                        // Ctrl+C：在主线程处理急停
                        println!("^C");
                        let _ = command_tx.send(INTERRUPT.to_string());
                    },

                    Err(rustyline::error::ReadlineError::Eof) => break,

                    Err(err) => {
                        eprintln!("Error: {:?}", err);
                        break;
                    },
                }
            }

            rl.save_history(&history_path).ok();
            Ok(())
        });

        Self {
            command_rx,
            _input_thread: input_thread,
        }
    }

    /// 阻塞等待用户输入；输入线程退出后返回 `None`
    pub fn recv_command(&self) -> Option<String> {
        self.command_rx.recv().ok()
    }
}

/// 运行 REPL 模式
pub fn run_repl(global: &GlobalArgs) -> Result<()> {
    let session = ReplSession::new(global)?;

    println!("Servoarm CLI v{} - 交互式 Shell", env!("CARGO_PKG_VERSION"));
    println!("输入 'help' 查看帮助，'exit' 退出，Ctrl+C 急停");
    println!("📊 {}", session.status());
    println!();

    let input = ReplInput::new();
    while let Some(line) = input.recv_command() {
        if line == INTERRUPT {
            session.emergency_stop();
            continue;
        }

        match line.as_str() {
            "exit" | "quit" => break,
            "help" => print_help(),
            _ => {
                if let Err(err) = handle_command(&line, &session) {
                    eprintln!("❌ Error: {:#}", err);
                    print_help_hint(&line);
                }
            },
        }
    }

    println!("⏳ 停止所有线程...");
    session.console.shutdown();
    println!("👋 再见！");
    Ok(())
}

fn parse_joint(arg: Option<&&str>) -> Result<JointId> {
    let arg = arg.ok_or_else(|| anyhow::anyhow!("缺少关节参数"))?;
    Ok(arg.parse()?)
}

fn parse_int(arg: Option<&&str>, what: &str) -> Result<i32> {
    let arg = arg.ok_or_else(|| anyhow::anyhow!("缺少{what}"))?;
    arg.parse().with_context(|| format!("无效的{what}: {arg}"))
}

/// 处理命令
fn handle_command(line: &str, session: &ReplSession) -> Result<()> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let Some(&head) = parts.first() else {
        return Ok(());
    };
    let console = &session.console;
    let input = console.input();

    match head {
        "connect" => session.connect(parts.get(1).copied())?,
        "disconnect" => session.disconnect(),
        "ports" => crate::commands::ports::list_ports()?,
        "state" => println!("📊 {}", session.status()),

        "debug" => {
            let enabled = match parts.get(1).copied() {
                Some("on") => true,
                Some("off") => false,
                None => !console.driver().is_debug_mode(),
                Some(other) => anyhow::bail!("debug 只接受 on/off，得到 {other}"),
            };
            console.set_debug_mode(enabled);
            println!("🔧 调试模式: {}", if enabled { "开" } else { "关" });
        },

        "set" => {
            let joint = parse_joint(parts.get(1))?;
            let angle = input.set_joint(joint, parse_int(parts.get(2), "角度")?)?;
            println!("{} = {}°", joint, angle);
        },

        "nudge" => {
            let joint = parse_joint(parts.get(1))?;
            let steps = match parts.get(2) {
                Some(_) => parse_int(parts.get(2), "步数")?,
                None => 1,
            };
            let angle = input.nudge(joint, steps)?;
            println!("{} = {}°", joint, angle);
        },

        "key" => {
            let key = parts
                .get(1)
                .and_then(|s| s.chars().next())
                .ok_or_else(|| anyhow::anyhow!("缺少按键"))?;
            if !input.key_press(key)? {
                anyhow::bail!("未映射的按键: {key}");
            }
        },

        "move" => {
            let mut values = [0i32; 5];
            for (i, slot) in values.iter_mut().enumerate() {
                *slot = parse_int(parts.get(i + 1), "角度")?;
            }
            dispatch_command(console, Command::Move(JointAngles::new(values)))?;
        },

        "sendall" => input.send_all()?,
        "reset" => input.reset_all()?,
        "stop" => session.emergency_stop(),
        "open" => input.open_gripper()?,
        "close" => input.close_gripper()?,
        "save" => input.save_pose()?,
        "status" => input.query_status()?,
        "fwhelp" => input.request_help()?,

        "pos" => {
            for (joint, angle) in console.driver().joints().snapshot().iter() {
                println!("  {:<9} {:>3}°", joint.name(), angle);
            }
        },

        "send" => {
            let text = parts[1..].join(" ");
            let command: Command = text.parse().with_context(|| format!("无法解析指令: {text}"))?;
            dispatch_command(console, command)?;
        },

        "path" => handle_path(&parts[1..], console)?,

        "joystick" => match parts.get(1).copied() {
            Some("start") => start_joystick(console)?,
            Some("stop") => {
                if console.stop_joystick() {
                    println!("✅ 摇杆已停止");
                } else {
                    println!("⚠️  摇杆未运行");
                }
            },
            _ => anyhow::bail!("用法: joystick start|stop"),
        },

        "log" => {
            let count = match parts.get(1) {
                Some(_) => usize::try_from(parse_int(parts.get(1), "条数")?)?,
                None => 10,
            };
            let entries = console.driver().command_log();
            for entry in entries.iter().skip(entries.len().saturating_sub(count)) {
                println!("  {}", entry.text);
            }
        },

        "metrics" => {
            let m = console.driver().metrics();
            println!("  sent {} (debug {}), failed {}", m.lines_sent, m.debug_sends, m.send_failures);
            println!(
                "  received {}, status {}, unparsed {}, read errors {}",
                m.lines_received, m.status_updates, m.unparsed_lines, m.read_errors
            );
        },

        // 其余输入按线路指令处理（`w`、`cube` 等）
        _ => {
            let command: Command = line
                .parse()
                .map_err(|_| anyhow::anyhow!("未知命令: {}", head))?;
            dispatch_command(console, command)?;
        },
    }

    Ok(())
}

fn handle_path(args: &[&str], console: &ArmConsole) -> Result<()> {
    let paths = console.paths();
    let name = || -> Result<String> {
        let joined = args.get(1..).map(|rest| rest.join(" ")).unwrap_or_default();
        if joined.trim().is_empty() {
            anyhow::bail!("缺少路径名称");
        }
        Ok(joined)
    };

    match args.first().copied() {
        Some("list") | None => {
            for name in paths.names() {
                let count = paths.points(&name).map_or(0, |p| p.len());
                let marker = if paths.selected().as_deref() == Some(name.as_str()) { "*" } else { " " };
                println!("{} {:<24} {} 个点", marker, name, count);
            }
        },
        Some("show") => {
            let name = name()?;
            let points = paths
                .points(&name)
                .ok_or_else(|| anyhow::anyhow!("未知路径: {}", name))?;
            for (i, point) in points.iter().enumerate() {
                println!("  {:>3}: {}", i + 1, point);
            }
        },
        Some("create") => {
            paths.create(&name()?)?;
        },
        Some("delete") => paths.delete(&name()?)?,
        Some("rename") => {
            let [_, old, new] = args else {
                anyhow::bail!("用法: path rename <old> <new>");
            };
            paths.rename(old, new)?;
        },
        Some("select") => paths.select(&name()?)?,
        Some("deselect") => paths.deselect(),
        Some("record") => {
            paths.record_point()?;
        },
        Some("stop") => {
            if !paths.stop_recording() {
                println!("⚠️  未在录制");
            }
        },
        Some("exec") => match args.get(1) {
            Some(_) => paths.execute(&name()?)?,
            None => paths.execute_selected()?,
        },
        Some("cancel") => {
            if !paths.cancel() {
                println!("⚠️  没有正在执行的路径");
            }
        },
        Some("reload") => {
            let count = paths.reload()?;
            println!("📂 已加载 {} 条路径", count);
        },
        Some(other) => anyhow::bail!("未知 path 子命令: {other}"),
    }
    Ok(())
}

#[cfg(feature = "gamepad")]
fn start_joystick(console: &ArmConsole) -> Result<()> {
    console.start_gamepad()?;
    println!("🎮 摇杆已启动");
    Ok(())
}

#[cfg(not(feature = "gamepad"))]
fn start_joystick(_console: &ArmConsole) -> Result<()> {
    anyhow::bail!("未启用 gamepad feature（使用 --features gamepad 构建）")
}

/// 打印帮助信息
fn print_help() {
    println!("连接:");
    println!("  connect [port]                连接串口（缺省使用配置中的串口）");
    println!("  disconnect                    断开连接");
    println!("  debug [on|off]                切换调试模式（只记录不发送）");
    println!("  ports                         列出可用串口");
    println!("  state                         显示会话状态");
    println!();
    println!("关节:");
    println!("  set <joint> <angle>           设置角度（joint: 1-5 或 wrist/base/shoulder/elbow/gripper）");
    println!("  nudge <joint> [steps]         按步长微调（负数反向）");
    println!("  key <w|s|a|d|q|e|z|x|[|]>     遗留单字符按键");
    println!("  move <a1> <a2> <a3> <a4> <a5> 同时设置五个关节");
    println!("  sendall                       以当前姿态发送 move");
    println!("  reset                         全部复位到 90°");
    println!("  stop                          急停（中止回放并复位）");
    println!("  open | close | save | status  夹爪开合 / 保存姿态 / 查询状态");
    println!("  cube | cylinder | hat | boat  运行固件预设动作");
    println!("  pos                           显示关节状态");
    println!("  send <wire command>           发送任意线路指令");
    println!();
    println!("路径:");
    println!("  path list                     列出路径（* 为选中路径）");
    println!("  path create|delete|select <name>");
    println!("  path rename <old> <new>");
    println!("  path record | stop            记录当前姿态 / 结束录制");
    println!("  path exec [name]              执行路径（缺省为选中路径）");
    println!("  path cancel                   中止执行");
    println!("  path show <name> | reload");
    println!();
    println!("其它:");
    println!("  joystick start|stop           手柄轮询");
    println!("  log [n]                       最近 n 条指令");
    println!("  metrics                       链路计数");
    println!("  help / exit / quit");
    println!();
    println!("快捷键:");
    println!("  Ctrl+C                        急停");
    println!("  Ctrl+D                        退出");
    println!();
}

/// 提供基于错误的帮助提示
fn print_help_hint(command: &str) {
    if command.starts_with("set") || command.starts_with("nudge") {
        eprintln!("💡 提示: 使用 'set base 120' 或 'nudge 3 -1'");
    } else if command.starts_with("connect") {
        eprintln!("💡 提示: 使用 'ports' 查看可用串口，再 'connect <port>'");
    } else if command.starts_with("path") {
        eprintln!("💡 提示: 先 'path create <name>' 或 'path select <name>'");
    } else {
        eprintln!("💡 提示: 输入 'help' 查看所有命令");
    }
}
