//! 控制台门面
//!
//! [`ArmConsole`] 把驱动、输入映射、路径控制器和摇杆线程组装在一起，
//! 是展示层（CLI、GUI）唯一需要持有的对象。
//!
//! ```no_run
//! use servoarm_client::ArmConsole;
//! use servoarm_tools::ConsoleConfig;
//!
//! let console = ArmConsole::from_config(&ConsoleConfig::default())?;
//! console.input().set_joint(servoarm_protocol::JointId::Base, 120)?;
//! # Ok::<(), servoarm_client::ClientError>(())
//! ```

use crate::error::ClientError;
use crate::gamepad::GamepadSource;
use crate::input::{InputConfig, InputMapper};
use crate::joystick::{JoystickConfig, JoystickLoop};
use crate::path::{ExecutionTiming, PathController};
use crate::settings::link_config;
use parking_lot::Mutex;
use servoarm_driver::{ArmDriver, ArmDriverBuilder};
use servoarm_link::SplittableLink;
use servoarm_tools::{ConsoleConfig, PathStore};
use std::sync::Arc;
use tracing::info;

/// 机械臂控制台
pub struct ArmConsole {
    driver: ArmDriver,
    input: Arc<InputMapper>,
    paths: Arc<PathController>,
    joystick_config: JoystickConfig,
    joystick: Mutex<Option<JoystickLoop>>,
}

impl ArmConsole {
    /// 组装控制台（不连接）
    pub fn new(
        driver: ArmDriver,
        store: PathStore,
        input: InputConfig,
        joystick: JoystickConfig,
        timing: ExecutionTiming,
    ) -> Self {
        let dispatcher = driver.dispatcher().clone();
        Self {
            input: Arc::new(InputMapper::new(dispatcher.clone(), input)),
            paths: Arc::new(PathController::new(dispatcher, store, timing)),
            driver,
            joystick_config: joystick,
            joystick: Mutex::new(None),
        }
    }

    /// 按配置文件组装：打开路径目录，设置初始调试模式（不连接）
    pub fn from_config(config: &ConsoleConfig) -> Result<Self, ClientError> {
        let driver = ArmDriverBuilder::new()
            .link_config(link_config(&config.link))
            .debug_mode(config.debug_mode)
            .build()?;
        let store = PathStore::open(&config.path_dir)?;
        Ok(Self::new(
            driver,
            store,
            InputConfig::from(&config.input),
            JoystickConfig::from(&config.joystick),
            ExecutionTiming::from(&config.execution),
        ))
    }

    pub fn driver(&self) -> &ArmDriver {
        &self.driver
    }

    pub fn input(&self) -> &Arc<InputMapper> {
        &self.input
    }

    pub fn paths(&self) -> &Arc<PathController> {
        &self.paths
    }

    /// 打开串口
    pub fn connect(&self, port: &str) -> Result<(), ClientError> {
        self.driver.connect(port)?;
        info!("Connected to {}", port);
        Ok(())
    }

    /// 使用任意可拆分适配器连接
    pub fn connect_with<L: SplittableLink>(&self, name: &str, link: L) -> Result<(), ClientError> {
        self.driver.connect_with(name, link)?;
        info!("Connected to {}", name);
        Ok(())
    }

    /// 断开链路（幂等）
    pub fn disconnect(&self) {
        self.driver.disconnect();
    }

    pub fn set_debug_mode(&self, enabled: bool) {
        self.driver.set_debug_mode(enabled);
    }

    /// 以自定义数据源启动摇杆线程
    pub fn start_joystick<S, F>(&self, make_source: F) -> Result<(), ClientError>
    where
        S: GamepadSource,
        F: FnOnce() -> Result<S, ClientError> + Send + 'static,
    {
        let mut slot = self.joystick.lock();
        if slot.as_ref().is_some_and(JoystickLoop::is_running) {
            return Err(ClientError::JoystickAlreadyRunning);
        }
        *slot = Some(JoystickLoop::spawn(
            self.input.clone(),
            self.paths.clone(),
            self.joystick_config,
            make_source,
        )?);
        Ok(())
    }

    /// 以第一个已连接的物理手柄启动摇杆线程
    #[cfg(feature = "gamepad")]
    pub fn start_gamepad(&self) -> Result<(), ClientError> {
        self.start_joystick(crate::gamepad::GilrsSource::new)
    }

    /// 停止摇杆线程，返回之前是否在运行
    pub fn stop_joystick(&self) -> bool {
        match self.joystick.lock().take() {
            Some(joystick) => {
                joystick.stop();
                true
            },
            None => false,
        }
    }

    pub fn is_joystick_running(&self) -> bool {
        self.joystick
            .lock()
            .as_ref()
            .is_some_and(JoystickLoop::is_running)
    }

    /// 停止所有线程后断开链路
    ///
    /// 顺序：摇杆线程 → 路径回放（取消时仍发送 `reset`）→ 读线程与串口。
    pub fn shutdown(&self) {
        self.stop_joystick();
        self.paths.cancel();
        self.driver.disconnect();
    }
}

impl Drop for ArmConsole {
    fn drop(&mut self) {
        self.shutdown();
    }
}
