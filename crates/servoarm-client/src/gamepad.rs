//! 手柄数据源
//!
//! [`GamepadSource`] 把任意输入设备抽象为逐 tick 的 [`GamepadSample`]。
//! 启用 `gamepad` feature 时提供基于 `gilrs` 的实现。

use crate::input::GamepadSample;

/// 手柄采样源
///
/// 在摇杆线程内创建和使用，不要求 `Send`。
pub trait GamepadSource {
    /// 读取当前状态；没有可用设备时返回 `None`
    fn poll(&mut self) -> Option<GamepadSample>;
}

impl<S: GamepadSource + ?Sized> GamepadSource for Box<S> {
    fn poll(&mut self) -> Option<GamepadSample> {
        (**self).poll()
    }
}

/// 固定序列数据源，序列耗尽后保持最后一个采样
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    samples: std::collections::VecDeque<GamepadSample>,
    last: Option<GamepadSample>,
}

impl ScriptedSource {
    pub fn new(samples: impl IntoIterator<Item = GamepadSample>) -> Self {
        Self {
            samples: samples.into_iter().collect(),
            last: None,
        }
    }
}

impl GamepadSource for ScriptedSource {
    fn poll(&mut self) -> Option<GamepadSample> {
        if let Some(sample) = self.samples.pop_front() {
            self.last = Some(sample);
        }
        self.last
    }
}

#[cfg(feature = "gamepad")]
pub use self::gilrs_source::GilrsSource;

#[cfg(feature = "gamepad")]
mod gilrs_source {
    use super::GamepadSource;
    use crate::error::ClientError;
    use crate::input::GamepadSample;
    use gilrs::{Axis, Button, EventType, Gamepad, GamepadId, Gilrs};
    use tracing::{debug, info};

    /// 基于 gilrs 的手柄数据源，使用第一个已连接的手柄
    pub struct GilrsSource {
        gilrs: Gilrs,
        active: Option<GamepadId>,
    }

    impl GilrsSource {
        pub fn new() -> Result<Self, ClientError> {
            let gilrs = Gilrs::new().map_err(|e| ClientError::GamepadUnavailable(e.to_string()))?;
            let active = gilrs.gamepads().next().map(|(id, pad)| {
                info!("Using gamepad {} ({})", id, pad.name());
                id
            });
            Ok(Self { gilrs, active })
        }

        fn pump_events(&mut self) {
            while let Some(event) = self.gilrs.next_event() {
                match event.event {
                    EventType::Connected if self.active.is_none() => {
                        info!("Gamepad connected: {}", self.gilrs.gamepad(event.id).name());
                        self.active = Some(event.id);
                    },
                    EventType::Disconnected if self.active == Some(event.id) => {
                        info!("Gamepad disconnected");
                        self.active = self.gilrs.gamepads().map(|(id, _)| id).find(|id| *id != event.id);
                    },
                    other => debug!("Gamepad event: {:?}", other),
                }
            }
        }
    }

    fn dpad(pad: &Gamepad<'_>, negative: Button, positive: Button) -> i8 {
        i8::from(pad.is_pressed(positive)) - i8::from(pad.is_pressed(negative))
    }

    impl GamepadSource for GilrsSource {
        fn poll(&mut self) -> Option<GamepadSample> {
            self.pump_events();
            let pad = self.gilrs.connected_gamepad(self.active?)?;
            Some(GamepadSample {
                // gilrs 的 Y 轴向上为正，采样约定向前推为负
                left_y: -pad.value(Axis::LeftStickY),
                right_x: pad.value(Axis::RightStickX),
                dpad_x: dpad(&pad, Button::DPadLeft, Button::DPadRight),
                dpad_y: dpad(&pad, Button::DPadDown, Button::DPadUp),
                a: pad.is_pressed(Button::South),
                b: pad.is_pressed(Button::East),
                x: pad.is_pressed(Button::West),
                y: pad.is_pressed(Button::North),
                lb: pad.is_pressed(Button::LeftTrigger),
                rb: pad.is_pressed(Button::RightTrigger),
            })
        }
    }
}
