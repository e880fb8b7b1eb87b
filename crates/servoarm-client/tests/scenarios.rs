//! 控制台端到端场景（mock 链路，无等待时序）

use servoarm_client::{
    ArmConsole, ClientError, ExecutionTiming, GamepadSample, InputConfig, JoystickConfig,
    PathState, ScriptedSource,
};
use parking_lot::Mutex;
use servoarm_driver::{
    ArmContext, ArmDriver, ArmObserver, CommandLogEntry, LinkConfig, LinkMode,
};
use servoarm_link::{MockHandle, MockLink};
use servoarm_protocol::{JointAngles, JointId};
use servoarm_tools::{ConsoleConfig, PathError, PathStore};
use std::sync::{Arc, Weak};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;

struct Fixture {
    console: ArmConsole,
    wire: MockHandle,
    _dir: TempDir,
}

fn fixture_with(timing: ExecutionTiming, joystick: JoystickConfig) -> Fixture {
    let dir = TempDir::new().unwrap();
    let driver = ArmDriver::new(LinkConfig::immediate(), LinkMode::Live);
    let store = PathStore::open(dir.path()).unwrap();
    let console = ArmConsole::new(driver, store, InputConfig::default(), joystick, timing);
    let (mock, wire) = MockLink::new();
    console.connect_with("mock0", mock).unwrap();
    Fixture {
        console,
        wire,
        _dir: dir,
    }
}

fn fixture() -> Fixture {
    fixture_with(ExecutionTiming::zero(), JoystickConfig::default())
}

fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    condition()
}

#[test]
fn record_then_execute_dispatches_expected_sequence() {
    let f = fixture();
    let paths = f.console.paths();
    let joints = f.console.driver().joints();

    paths.create("P1").unwrap();
    paths.record_point().unwrap();
    joints.set_all(JointAngles::new([60, 120, 45, 150, 30]));
    assert_eq!(paths.record_point().unwrap(), 2);
    paths.stop_recording();
    assert!(f.wire.written_lines().is_empty());

    paths.execute("P1").unwrap();
    paths.wait();

    assert_eq!(
        f.wire.written_lines(),
        vec!["reset", "move 90 90 90 90 90", "move 60 120 45 150 30", "reset"]
    );
    assert_eq!(joints.snapshot(), JointAngles::HOME);
    assert!(!paths.is_executing());
}

#[test]
fn execute_empty_path_is_rejected_without_dispatch() {
    let f = fixture();
    f.console.paths().create("empty").unwrap();

    assert!(matches!(
        f.console.paths().execute("empty"),
        Err(ClientError::EmptyPath(name)) if name == "empty"
    ));
    assert!(matches!(
        f.console.paths().execute("nope"),
        Err(ClientError::Path(PathError::UnknownPath(_)))
    ));
    assert!(f.wire.written_lines().is_empty());
    assert!(f.console.driver().command_log().is_empty());
}

#[test]
fn execute_selected_requires_selection() {
    let f = fixture();
    assert!(matches!(
        f.console.paths().execute_selected(),
        Err(ClientError::NoPathSelected)
    ));
}

#[test]
fn joystick_half_deflection_moves_wrist_two_degrees() {
    let f = fixture();
    let sample = GamepadSample {
        left_y: -0.5,
        ..Default::default()
    };
    let actions = f.console.input().tick(&sample, Instant::now());

    assert!(actions.is_empty());
    assert_eq!(f.wire.written_lines(), vec!["set 1 88"]);
    assert_eq!(f.console.driver().joints().get(JointId::Wrist), 88);
}

#[test]
fn boundary_clamp_dispatches_once() {
    let f = fixture();
    f.console.driver().joints().set(JointId::Wrist, 179);
    let sample = GamepadSample {
        left_y: 1.0,
        ..Default::default()
    };

    f.console.input().tick(&sample, Instant::now());
    f.console.input().tick(&sample, Instant::now());

    assert_eq!(f.wire.written_lines(), vec!["set 1 180"]);
}

#[test]
fn held_button_fires_once_per_debounce_interval() {
    let f = fixture();
    let held = GamepadSample {
        x: true,
        ..Default::default()
    };
    let t0 = Instant::now();
    let input = f.console.input();

    assert_eq!(input.tick(&held, t0).len(), 1);
    assert!(input.tick(&held, t0 + Duration::from_millis(100)).is_empty());
    assert!(input.tick(&held, t0 + Duration::from_millis(500)).is_empty());
    assert_eq!(input.tick(&held, t0 + Duration::from_millis(600)).len(), 1);
}

#[test]
fn slider_nudge_and_legacy_keys() {
    let f = fixture();
    let input = f.console.input();

    assert_eq!(input.set_joint(JointId::Base, 200).unwrap(), 180);
    assert_eq!(input.nudge(JointId::Base, 1).unwrap(), 180);
    assert_eq!(input.nudge(JointId::Shoulder, -2).unwrap(), 80);
    assert!(input.key_press('w').unwrap());
    assert!(!input.key_press('k').unwrap());
    input.send_all().unwrap();

    assert_eq!(
        f.wire.written_lines(),
        vec!["set 2 180", "set 2 180", "set 3 80", "w", "move 90 180 80 90 90"]
    );
}

#[test]
fn reset_all_mirrors_home_pose() {
    let f = fixture();
    let joints = f.console.driver().joints();
    joints.set_all(JointAngles::new([10, 20, 30, 40, 50]));

    f.console.input().reset_all().unwrap();

    assert_eq!(joints.snapshot(), JointAngles::HOME);
    assert_eq!(f.wire.written_lines(), vec!["reset"]);
}

#[test]
fn joystick_loop_drives_gripper_to_limit_without_spam() {
    let f = fixture_with(ExecutionTiming::zero(), JoystickConfig::from_rate_hz(500));
    let held_b = GamepadSample {
        b: true,
        ..Default::default()
    };
    f.console
        .start_joystick(move || Ok(ScriptedSource::new([held_b])))
        .unwrap();
    assert!(matches!(
        f.console.start_joystick(|| Ok(ScriptedSource::default())),
        Err(ClientError::JoystickAlreadyRunning)
    ));

    let joints = f.console.driver().joints();
    assert!(wait_until(Duration::from_secs(5), || joints.get(JointId::Gripper) == 180));
    // 到达上限后继续运行若干 tick
    thread::sleep(Duration::from_millis(50));
    assert!(f.console.stop_joystick());
    assert!(!f.console.is_joystick_running());

    let lines = f.wire.written_lines();
    let expected: Vec<String> = (92..=180).step_by(2).map(|a| format!("set 5 {a}")).collect();
    assert_eq!(lines, expected);
}

#[test]
fn joystick_record_button_appends_current_pose() {
    let f = fixture_with(ExecutionTiming::zero(), JoystickConfig::from_rate_hz(200));
    f.console.paths().create("J").unwrap();
    let record = GamepadSample {
        lb: true,
        ..Default::default()
    };
    f.console
        .start_joystick(move || Ok(ScriptedSource::new([record, GamepadSample::default()])))
        .unwrap();

    let paths = f.console.paths();
    assert!(wait_until(Duration::from_secs(5), || {
        paths.points("J").is_some_and(|p| !p.is_empty())
    }));
    f.console.stop_joystick();

    assert_eq!(paths.points("J").unwrap(), vec![JointAngles::HOME]);
    assert_eq!(paths.state(), PathState::Recording("J".into()));
}

#[test]
fn failed_source_reports_error_and_leaves_loop_stopped() {
    let f = fixture();
    let result = f.console.start_joystick(|| {
        Err::<ScriptedSource, _>(ClientError::GamepadUnavailable("no device".into()))
    });
    assert!(matches!(result, Err(ClientError::GamepadUnavailable(_))));
    assert!(!f.console.is_joystick_running());
}

#[test]
fn shutdown_cancels_execution_and_returns_home() {
    let f = fixture_with(
        ExecutionTiming {
            start_settle: Duration::from_secs(60),
            ..ExecutionTiming::zero()
        },
        JoystickConfig::default(),
    );
    let paths = f.console.paths();
    paths.create("slow").unwrap();
    paths.record_point().unwrap();

    paths.execute("slow").unwrap();
    assert!(wait_until(Duration::from_secs(2), || f.wire.write_count() >= 1));
    f.console.shutdown();

    assert_eq!(f.wire.written_lines(), vec!["reset", "reset"]);
    assert!(!paths.is_executing());
    assert!(!f.console.driver().is_connected());
}

/// 指定指令写入失败，并记录每条指令分发时的关节快照
struct FailOnCommand {
    wire: MockHandle,
    failing: String,
    ctx: Weak<ArmContext>,
    issued: Mutex<Vec<(String, JointAngles)>>,
}

impl ArmObserver for FailOnCommand {
    fn on_command_issued(&self, entry: &CommandLogEntry) {
        self.wire.set_fail_writes(entry.text == self.failing);
        if let Some(ctx) = self.ctx.upgrade() {
            self.issued
                .lock()
                .push((entry.text.clone(), ctx.joints.snapshot()));
        }
    }
}

#[test]
fn failed_point_does_not_abort_playback() {
    let f = fixture();
    let paths = f.console.paths();
    let joints = f.console.driver().joints();

    paths.create("P").unwrap();
    for point in [[60, 120, 45, 150, 30], [10, 20, 30, 40, 50], [100, 100, 100, 100, 100]] {
        joints.set_all(JointAngles::new(point));
        paths.record_point().unwrap();
    }
    paths.stop_recording();

    let observer = Arc::new(FailOnCommand {
        wire: f.wire.clone(),
        failing: "move 10 20 30 40 50".to_string(),
        ctx: Arc::downgrade(f.console.driver().context()),
        issued: Mutex::new(Vec::new()),
    });
    f.console.driver().add_observer(observer.clone());

    paths.execute("P").unwrap();
    paths.wait();

    assert_eq!(
        f.wire.written_lines(),
        vec!["reset", "move 60 120 45 150 30", "move 100 100 100 100 100", "reset"]
    );
    // 失败的点仍进入审计日志，关节状态照常同步
    let issued = observer.issued.lock();
    let texts: Vec<&str> = issued.iter().map(|(text, _)| text.as_str()).collect();
    assert_eq!(
        texts,
        vec![
            "reset",
            "move 60 120 45 150 30",
            "move 10 20 30 40 50",
            "move 100 100 100 100 100",
            "reset",
        ]
    );
    assert_eq!(issued[3].1, JointAngles::new([10, 20, 30, 40, 50]));
    assert_eq!(joints.snapshot(), JointAngles::HOME);
}

#[test]
fn joystick_stop_takes_effect_within_a_tick() {
    let config = JoystickConfig::default();
    let period = config.period;
    let f = fixture_with(ExecutionTiming::zero(), config);
    let held_right = GamepadSample {
        dpad_x: 1,
        ..Default::default()
    };
    f.console
        .start_joystick(move || Ok(ScriptedSource::new([held_right])))
        .unwrap();
    assert!(wait_until(Duration::from_secs(2), || f.wire.write_count() >= 2));

    let started = Instant::now();
    assert!(f.console.stop_joystick());
    let elapsed = started.elapsed();
    assert!(elapsed < period * 2, "stop took {elapsed:?}");

    let writes = f.wire.write_count();
    thread::sleep(period * 3);
    assert_eq!(f.wire.write_count(), writes);
    assert!(f.console.driver().joints().get(JointId::Base) < 180);
}

#[test]
fn rename_rules_keep_selection() {
    let f = fixture();
    let paths = f.console.paths();
    paths.create("a").unwrap();
    paths.create("b").unwrap();
    assert_eq!(paths.selected().as_deref(), Some("b"));

    assert!(matches!(
        paths.rename("a", "b"),
        Err(ClientError::Path(PathError::DuplicateName(_)))
    ));
    assert_eq!(paths.rename("b", "c").unwrap(), "c");
    assert_eq!(paths.selected().as_deref(), Some("c"));
    assert_eq!(paths.names(), vec!["a", "c"]);
}

#[test]
fn debug_mode_logs_without_wire_traffic() {
    let dir = TempDir::new().unwrap();
    let driver = ArmDriver::new(LinkConfig::immediate(), LinkMode::Debug);
    let console = ArmConsole::new(
        driver,
        PathStore::open(dir.path()).unwrap(),
        InputConfig::default(),
        JoystickConfig::default(),
        ExecutionTiming::zero(),
    );

    console.input().set_joint(JointId::Elbow, 45).unwrap();
    console.input().emergency_stop().unwrap();

    let log: Vec<String> = console
        .driver()
        .command_log()
        .into_iter()
        .map(|entry| entry.text)
        .collect();
    assert_eq!(log, vec!["set 4 45", "reset"]);
    assert_eq!(console.driver().joints().get(JointId::Elbow), 90);
}

#[test]
fn console_from_config_applies_settings_without_connecting() {
    let dir = TempDir::new().unwrap();
    let mut config = ConsoleConfig::default();
    config.path_dir = dir.path().join("paths");
    config.input.nudge_step = 10;

    let console = ArmConsole::from_config(&config).unwrap();
    assert!(console.driver().is_debug_mode());
    assert!(!console.driver().is_connected());
    assert!(config.path_dir.is_dir());

    assert_eq!(console.input().nudge(JointId::Base, -1).unwrap(), 80);
    assert_eq!(console.driver().command_log().len(), 1);
}
