use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Local};
use log::info;
use smart_leds::RGB8;
use tokio::sync::RwLock;

use crate::color::Brightness;

pub mod update;

pub use update::{parse_brightness, ControlUpdate, FieldOutcome, UpdateReport};

/// Slowest frame delay a writer may ask for
pub const MAX_SPEED: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationMode {
    Static,
    Rainbow,
}

impl AnimationMode {
    pub fn name(self) -> &'static str {
        match self {
            AnimationMode::Static => "Static",
            AnimationMode::Rainbow => "Rainbow",
        }
    }
}

/// The desired output. Brightness is kept apart from the colour so the
/// requested colour can always be shown as it was sent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlState {
    pub brightness: Brightness,
    pub mode: AnimationMode,
    pub static_color: RGB8,
    /// Delay between animation frames
    pub speed: Duration,
    pub updated_at: Option<DateTime<Local>>,
}

impl Default for ControlState {
    fn default() -> Self {
        ControlState {
            brightness: Brightness::from_fraction(0.5),
            mode: AnimationMode::Rainbow,
            static_color: RGB8::new(128, 128, 128),
            speed: Duration::from_millis(50),
            updated_at: None,
        }
    }
}

/// Handle to the one control record shared by the request handler and the
/// actuator. Cloning the handle shares the record.
///
/// The lock is only held long enough to copy the record in or out, so a
/// slow connection can never hold up a frame.
#[derive(Clone)]
pub struct SharedControl {
    state: Arc<RwLock<ControlState>>,
    min_speed: Duration,
}

impl SharedControl {
    pub fn new(initial: ControlState, min_speed: Duration) -> Self {
        let min_speed = min_speed.min(MAX_SPEED);
        let initial = ControlState {
            speed: initial.speed.clamp(min_speed, MAX_SPEED),
            ..initial
        };

        Self {
            state: Arc::new(RwLock::new(initial)),
            min_speed,
        }
    }

    /// Copy of the current record
    pub async fn snapshot(&self) -> ControlState {
        *self.state.read().await
    }

    /// Apply the fields present in `update`, leaving the rest untouched.
    /// Returns the record as it stands afterwards.
    pub async fn apply(&self, update: &ControlUpdate) -> ControlState {
        let mut state = self.state.write().await;

        if let Some(brightness) = update.brightness {
            state.brightness = brightness;
        }
        if let Some(mode) = update.mode {
            state.mode = mode;
        }
        if let Some(color) = update.static_color {
            state.static_color = color;
        }
        if let Some(speed) = update.speed {
            state.speed = speed.clamp(self.min_speed, MAX_SPEED);
        }
        state.updated_at = Some(Local::now());

        info!(
            "Control: {} at {}%, colour {:?}, {}ms per frame",
            state.mode.name(),
            state.brightness.percent(),
            state.static_color,
            state.speed.as_millis()
        );

        *state
    }
}
