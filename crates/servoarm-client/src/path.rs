//! 路径录制与回放
//!
//! [`PathController`] 维护选择/录制状态机，并在独立线程上回放路径：
//!
//! ```text
//! reset → 等待 start_settle → (move 点 → 等待 point_settle) × N → 等待 end_settle → reset
//! ```
//!
//! 回放期间单条指令失败只记录日志，继续下一个点。取消在下一次等待时生效，
//! 取消后仍会发送一次 `reset` 回到已知姿态。

use crate::error::ClientError;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};
use parking_lot::Mutex;
use servoarm_driver::{CommandDispatcher, PathStatus};
use servoarm_protocol::{Command, JointAngles, PathPoint};
use servoarm_tools::{PathError, PathStore};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{error, info, warn};

/// 回放时序
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionTiming {
    /// 首次复位后的等待
    pub start_settle: Duration,
    /// 每个点之后的等待
    pub point_settle: Duration,
    /// 最后一个点之后、再次复位之前的等待
    pub end_settle: Duration,
}

impl Default for ExecutionTiming {
    fn default() -> Self {
        Self {
            start_settle: Duration::from_secs(2),
            point_settle: Duration::from_millis(1500),
            end_settle: Duration::from_secs(1),
        }
    }
}

impl ExecutionTiming {
    /// 无等待（测试用）
    pub fn zero() -> Self {
        Self {
            start_settle: Duration::ZERO,
            point_settle: Duration::ZERO,
            end_settle: Duration::ZERO,
        }
    }
}

/// 选择/录制状态
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PathState {
    #[default]
    Idle,
    Selected(String),
    Recording(String),
}

impl PathState {
    /// 当前选中的路径
    pub fn selected(&self) -> Option<&str> {
        match self {
            PathState::Idle => None,
            PathState::Selected(name) | PathState::Recording(name) => Some(name),
        }
    }

    pub fn is_recording(&self) -> bool {
        matches!(self, PathState::Recording(_))
    }
}

struct Execution {
    cancel: Sender<()>,
    handle: JoinHandle<()>,
}

/// 路径控制器
pub struct PathController {
    dispatcher: Arc<CommandDispatcher>,
    store: Mutex<PathStore>,
    state: Mutex<PathState>,
    timing: ExecutionTiming,
    executing: Arc<AtomicBool>,
    execution: Mutex<Option<Execution>>,
}

impl PathController {
    pub fn new(dispatcher: Arc<CommandDispatcher>, store: PathStore, timing: ExecutionTiming) -> Self {
        Self {
            dispatcher,
            store: Mutex::new(store),
            state: Mutex::new(PathState::Idle),
            timing,
            executing: Arc::new(AtomicBool::new(false)),
            execution: Mutex::new(None),
        }
    }

    pub fn timing(&self) -> ExecutionTiming {
        self.timing
    }

    pub fn state(&self) -> PathState {
        self.state.lock().clone()
    }

    pub fn selected(&self) -> Option<String> {
        self.state.lock().selected().map(str::to_string)
    }

    pub fn is_recording(&self) -> bool {
        self.state.lock().is_recording()
    }

    pub fn is_executing(&self) -> bool {
        self.executing.load(Ordering::Acquire)
    }

    /// 按名称排序的路径列表
    pub fn names(&self) -> Vec<String> {
        self.store.lock().names()
    }

    /// 路径点副本
    pub fn points(&self, name: &str) -> Option<Vec<PathPoint>> {
        self.store.lock().get(name).map(<[PathPoint]>::to_vec)
    }

    /// 重新扫描路径目录
    ///
    /// 选中的路径已不存在时回到 `Idle`。
    pub fn reload(&self) -> Result<usize, ClientError> {
        let mut store = self.store.lock();
        let count = store.load_all()?;
        let names = store.names();
        {
            let mut state = self.state.lock();
            if state.selected().is_some_and(|name| !store.contains(name)) {
                *state = PathState::Idle;
            }
        }
        drop(store);
        self.notify_list(&names);
        self.notify_state();
        Ok(count)
    }

    /// 选择路径（结束正在进行的录制）
    pub fn select(&self, name: &str) -> Result<(), ClientError> {
        let name = name.trim();
        if !self.store.lock().contains(name) {
            return Err(PathError::UnknownPath(name.to_string()).into());
        }
        *self.state.lock() = PathState::Selected(name.to_string());
        self.notify_state();
        Ok(())
    }

    /// 取消选择
    pub fn deselect(&self) {
        *self.state.lock() = PathState::Idle;
        self.notify_state();
    }

    /// 创建空路径并选中，返回规范化后的名称
    pub fn create(&self, name: &str) -> Result<String, ClientError> {
        let (name, names) = {
            let mut store = self.store.lock();
            let name = store.create(name)?;
            (name, store.names())
        };
        *self.state.lock() = PathState::Selected(name.clone());
        info!("Created path `{}`", name);
        self.notify_list(&names);
        self.notify_state();
        Ok(name)
    }

    /// 删除路径；删除的是选中路径时回到 `Idle`
    pub fn delete(&self, name: &str) -> Result<(), ClientError> {
        let name = name.trim();
        let names = {
            let mut store = self.store.lock();
            store.delete(name)?;
            store.names()
        };
        {
            let mut state = self.state.lock();
            if state.selected() == Some(name) {
                *state = PathState::Idle;
            }
        }
        info!("Deleted path `{}`", name);
        self.notify_list(&names);
        self.notify_state();
        Ok(())
    }

    /// 重命名；选中路径保持选中（录制状态不变）
    pub fn rename(&self, old: &str, new: &str) -> Result<String, ClientError> {
        let old = old.trim();
        let (new, names) = {
            let mut store = self.store.lock();
            let new = store.rename(old, new)?;
            (new, store.names())
        };
        {
            let mut state = self.state.lock();
            match &mut *state {
                PathState::Selected(name) | PathState::Recording(name) if name == old => {
                    *name = new.clone();
                },
                _ => {},
            }
        }
        info!("Renamed path `{}` -> `{}`", old, new);
        self.notify_list(&names);
        self.notify_state();
        Ok(new)
    }

    /// 记录当前姿态到选中路径，进入录制状态；返回路径点数
    pub fn record_point(&self) -> Result<usize, ClientError> {
        let Some(name) = self.selected() else {
            return Err(ClientError::NoPathSelected);
        };
        let point = self.dispatcher.context().joints.snapshot();
        let count = self.store.lock().append(&name, point)?;
        *self.state.lock() = PathState::Recording(name.clone());
        info!("Recorded point {} to `{}`: {}", count, name, point);
        self.notify_status(&PathStatus::Recording {
            name,
            points: count,
        });
        Ok(count)
    }

    /// 结束录制；不在录制时为空操作
    pub fn stop_recording(&self) -> bool {
        let stopped = {
            let mut state = self.state.lock();
            match &*state {
                PathState::Recording(name) => {
                    *state = PathState::Selected(name.clone());
                    true
                },
                _ => false,
            }
        };
        if stopped {
            self.notify_state();
        }
        stopped
    }

    /// 执行选中的路径
    pub fn execute_selected(&self) -> Result<(), ClientError> {
        let name = self.selected().ok_or(ClientError::NoPathSelected)?;
        self.execute(&name)
    }

    /// 在回放线程上执行路径
    ///
    /// 空路径返回 `EmptyPath`，已有执行进行中返回 `ExecutionInProgress`，两者都不分发任何指令。
    pub fn execute(&self, name: &str) -> Result<(), ClientError> {
        let name = name.trim().to_string();
        let points = self
            .points(&name)
            .ok_or_else(|| PathError::UnknownPath(name.clone()))?;
        if points.is_empty() {
            warn!("Refusing to execute empty path `{}`", name);
            return Err(ClientError::EmptyPath(name));
        }

        let mut slot = self.execution.lock();
        if self
            .executing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(ClientError::ExecutionInProgress);
        }
        if let Some(previous) = slot.take() {
            let _ = previous.handle.join();
        }

        let (cancel, cancel_rx) = bounded(1);
        let dispatcher = self.dispatcher.clone();
        let executing = self.executing.clone();
        let timing = self.timing;
        let thread_name = name.clone();
        let handle = std::thread::Builder::new()
            .name("servoarm-exec".to_string())
            .spawn(move || {
                let cancelled = run_sequence(&dispatcher, &thread_name, &points, timing, &cancel_rx);
                executing.store(false, Ordering::Release);
                dispatcher
                    .context()
                    .hooks
                    .read()
                    .notify_path_status(&PathStatus::ExecutionFinished {
                        name: thread_name,
                        cancelled,
                    });
            })
            .map_err(|e| {
                self.executing.store(false, Ordering::Release);
                ClientError::Thread(e.to_string())
            })?;

        *slot = Some(Execution { cancel, handle });
        Ok(())
    }

    /// 中止正在进行的回放并等待回放线程结束（会发送最后一次 `reset`）
    pub fn cancel(&self) -> bool {
        let Some(execution) = self.execution.lock().take() else {
            return false;
        };
        let was_running = self.is_executing();
        let _ = execution.cancel.try_send(());
        if execution.handle.join().is_err() {
            error!("Path execution thread panicked");
        }
        was_running
    }

    /// 等待当前回放结束（不取消）
    pub fn wait(&self) {
        if let Some(execution) = self.execution.lock().take()
            && execution.handle.join().is_err()
        {
            error!("Path execution thread panicked");
        }
    }

    fn notify_list(&self, names: &[String]) {
        self.dispatcher
            .context()
            .hooks
            .read()
            .notify_path_list_changed(names);
    }

    fn notify_status(&self, status: &PathStatus) {
        self.dispatcher.context().hooks.read().notify_path_status(status);
    }

    fn notify_state(&self) {
        let status = match self.state() {
            PathState::Idle => PathStatus::Idle,
            PathState::Selected(name) => PathStatus::Selected { name },
            PathState::Recording(name) => {
                let points = self.store.lock().get(&name).map_or(0, <[PathPoint]>::len);
                PathStatus::Recording { name, points }
            },
        };
        self.notify_status(&status);
    }
}

impl Drop for PathController {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// 等待一段时间，收到取消信号（或发送端关闭）返回 true
fn settle(cancel: &Receiver<()>, duration: Duration) -> bool {
    match cancel.recv_timeout(duration) {
        Ok(()) | Err(RecvTimeoutError::Disconnected) => true,
        Err(RecvTimeoutError::Timeout) => false,
    }
}

fn home(dispatcher: &CommandDispatcher) {
    // 失败已由分发器记录
    let _ = dispatcher.dispatch(Command::Reset);
    dispatcher.context().joints.set_all(JointAngles::HOME);
}

/// 回放主体，返回是否被取消
fn run_sequence(
    dispatcher: &CommandDispatcher,
    name: &str,
    points: &[PathPoint],
    timing: ExecutionTiming,
    cancel: &Receiver<()>,
) -> bool {
    info!("Executing path `{}` ({} points)", name, points.len());
    let hooks = dispatcher.context().hooks.clone();
    let total = points.len();

    home(dispatcher);
    let mut cancelled = settle(cancel, timing.start_settle);

    if !cancelled {
        for (i, point) in points.iter().enumerate() {
            hooks.read().notify_path_status(&PathStatus::Executing {
                name: name.to_string(),
                step: i + 1,
                total,
            });
            if let Err(e) = dispatcher.dispatch(Command::Move(*point)) {
                warn!("Point {}/{} of `{}` not sent: {}", i + 1, total, name, e);
            }
            dispatcher.context().joints.set_all(*point);
            if settle(cancel, timing.point_settle) {
                cancelled = true;
                break;
            }
        }
    }

    if !cancelled {
        cancelled = settle(cancel, timing.end_settle);
    }

    home(dispatcher);
    if cancelled {
        warn!("Execution of `{}` cancelled, returned to home", name);
    } else {
        info!("Finished executing path `{}`", name);
    }
    cancelled
}

#[cfg(test)]
mod tests {
    use super::*;
    use servoarm_driver::{ArmContext, LinkChannel, LinkConfig, LinkMode};
    use tempfile::TempDir;

    fn controller(dir: &TempDir, timing: ExecutionTiming) -> PathController {
        let link = Arc::new(LinkChannel::new(LinkConfig::immediate(), LinkMode::Debug));
        let dispatcher = Arc::new(CommandDispatcher::new(Arc::new(ArmContext::new()), link));
        let store = PathStore::open(dir.path()).unwrap();
        PathController::new(dispatcher, store, timing)
    }

    #[test]
    fn test_state_machine() {
        let dir = TempDir::new().unwrap();
        let paths = controller(&dir, ExecutionTiming::zero());
        assert_eq!(paths.state(), PathState::Idle);
        assert!(matches!(paths.record_point(), Err(ClientError::NoPathSelected)));

        paths.create("P1").unwrap();
        assert_eq!(paths.state(), PathState::Selected("P1".into()));
        assert!(!paths.stop_recording());

        assert_eq!(paths.record_point().unwrap(), 1);
        assert_eq!(paths.state(), PathState::Recording("P1".into()));

        paths.rename("P1", "P2").unwrap();
        assert_eq!(paths.state(), PathState::Recording("P2".into()));

        assert!(paths.stop_recording());
        assert_eq!(paths.state(), PathState::Selected("P2".into()));

        paths.delete("P2").unwrap();
        assert_eq!(paths.state(), PathState::Idle);
    }

    #[test]
    fn test_select_cancels_recording() {
        let dir = TempDir::new().unwrap();
        let paths = controller(&dir, ExecutionTiming::zero());
        paths.create("a").unwrap();
        paths.create("b").unwrap();
        paths.record_point().unwrap();
        assert!(paths.is_recording());

        paths.select("a").unwrap();
        assert_eq!(paths.state(), PathState::Selected("a".into()));
        assert!(paths.select("missing").is_err());
        assert_eq!(paths.selected().as_deref(), Some("a"));
    }

    #[test]
    fn test_cancel_interrupts_settle() {
        let dir = TempDir::new().unwrap();
        let timing = ExecutionTiming {
            start_settle: Duration::from_secs(30),
            ..ExecutionTiming::zero()
        };
        let paths = controller(&dir, timing);
        paths.create("long").unwrap();
        paths.record_point().unwrap();

        paths.execute("long").unwrap();
        assert!(paths.is_executing());
        assert!(matches!(
            paths.execute("long"),
            Err(ClientError::ExecutionInProgress)
        ));

        assert!(paths.cancel());
        assert!(!paths.is_executing());
        assert!(!paths.cancel());
    }
}
