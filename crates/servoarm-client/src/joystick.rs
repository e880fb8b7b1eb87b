//! 摇杆轮询线程
//!
//! 固定频率读取一次手柄采样，应用关节增量并执行通过去抖的按键动作。
//! 停止标志每个 tick 检查一次，已开始分发的指令不会被中断。

use crate::error::ClientError;
use crate::gamepad::GamepadSource;
use crate::input::{ButtonAction, InputMapper};
use crate::path::PathController;
use crossbeam_channel::bounded;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{error, info, trace, warn};

/// 摇杆轮询参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoystickConfig {
    /// tick 周期
    pub period: Duration,
}

impl Default for JoystickConfig {
    /// 30 Hz
    fn default() -> Self {
        Self::from_rate_hz(30)
    }
}

impl JoystickConfig {
    pub fn from_rate_hz(rate_hz: u32) -> Self {
        Self {
            period: Duration::from_secs_f64(1.0 / f64::from(rate_hz.max(1))),
        }
    }
}

/// 运行中的摇杆线程
pub struct JoystickLoop {
    is_running: Arc<AtomicBool>,
    ticks: Arc<AtomicU64>,
    handle: Option<JoinHandle<()>>,
}

impl JoystickLoop {
    /// 启动轮询线程
    ///
    /// `make_source` 在新线程内调用（部分平台的手柄句柄不能跨线程），
    /// 其错误会同步返回给调用方。
    pub fn spawn<S, F>(
        mapper: Arc<InputMapper>,
        paths: Arc<PathController>,
        config: JoystickConfig,
        make_source: F,
    ) -> Result<Self, ClientError>
    where
        S: GamepadSource,
        F: FnOnce() -> Result<S, ClientError> + Send + 'static,
    {
        let is_running = Arc::new(AtomicBool::new(true));
        let ticks = Arc::new(AtomicU64::new(0));
        let (ready_tx, ready_rx) = bounded::<Result<(), ClientError>>(1);

        let running = is_running.clone();
        let tick_counter = ticks.clone();
        let handle = std::thread::Builder::new()
            .name("servoarm-joystick".to_string())
            .spawn(move || {
                let source = match make_source() {
                    Ok(source) => {
                        let _ = ready_tx.send(Ok(()));
                        source
                    },
                    Err(e) => {
                        running.store(false, Ordering::Release);
                        let _ = ready_tx.send(Err(e));
                        return;
                    },
                };
                joystick_loop(source, &mapper, &paths, config, &running, &tick_counter);
            })
            .map_err(|e| ClientError::Thread(e.to_string()))?;

        let started = ready_rx
            .recv()
            .unwrap_or_else(|_| Err(ClientError::Thread("joystick thread exited during startup".into())));
        if let Err(e) = started {
            let _ = handle.join();
            return Err(e);
        }

        info!("Joystick loop started ({:?} per tick)", config.period);
        Ok(Self {
            is_running,
            ticks,
            handle: Some(handle),
        })
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Acquire)
    }

    /// 已完成的 tick 数
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// 停止并等待线程退出（最多一个 tick）
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.is_running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("Joystick thread panicked");
            }
            info!("Joystick loop stopped");
        }
    }
}

impl Drop for JoystickLoop {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn joystick_loop<S: GamepadSource>(
    mut source: S,
    mapper: &InputMapper,
    paths: &PathController,
    config: JoystickConfig,
    is_running: &AtomicBool,
    ticks: &AtomicU64,
) {
    let period = config.period;
    let mut next_tick = Instant::now();

    while is_running.load(Ordering::Acquire) {
        next_tick += period;

        if let Some(sample) = source.poll() {
            for action in mapper.tick(&sample, Instant::now()) {
                run_action(action, mapper, paths);
            }
        }
        ticks.fetch_add(1, Ordering::Relaxed);

        let now = Instant::now();
        if next_tick > now {
            spin_sleep::sleep(next_tick - now);
        } else {
            trace!("Joystick tick overrun by {:?}", now - next_tick);
            next_tick = now;
        }
    }
    trace!("Joystick loop exited");
}

fn run_action(action: ButtonAction, mapper: &InputMapper, paths: &PathController) {
    let result = match action {
        ButtonAction::ResetAll => mapper.reset_all().map_err(ClientError::from),
        ButtonAction::ExecuteSelected => paths.execute_selected(),
        ButtonAction::RecordPoint => paths.record_point().map(|_| ()),
        ButtonAction::StopRecording => {
            paths.stop_recording();
            Ok(())
        },
    };
    if let Err(e) = result {
        warn!("Gamepad action {:?} failed: {}", action, e);
    }
}
