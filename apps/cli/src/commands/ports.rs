//! 串口枚举

use anyhow::Result;

/// 列出可用串口
#[cfg(feature = "serial")]
pub fn list_ports() -> Result<()> {
    let ports = servoarm_link::serial::available_ports()?;
    if ports.is_empty() {
        println!("(未发现串口)");
    }
    for port in ports {
        println!("{}", port);
    }
    Ok(())
}

#[cfg(not(feature = "serial"))]
pub fn list_ports() -> Result<()> {
    anyhow::bail!("未启用 serial feature")
}
