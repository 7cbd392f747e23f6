use std::time::Duration;

use log::{error, info};
use tokio::sync::watch;

use crate::{
    color::{hue_to_rgb, scale},
    control::{AnimationMode, SharedControl},
    display::{status_lines, Link, StatusDisplay},
    lights::LightController,
};

/// Drives the pixels from the shared control record, one frame per tick.
///
/// The animation phase lives here and nowhere else. It only moves while
/// the rainbow is running, so switching to a static colour and back picks
/// the wheel up where it stopped. The link can change under a running
/// actuator, so the lights start before association finishes.
pub struct Actuator {
    control: SharedControl,
    lights: LightController,
    display: Box<dyn StatusDisplay>,
    link: watch::Receiver<Link>,
    phase: u8,
    last_screen: Vec<String>,
}

impl Actuator {
    pub fn new(
        control: SharedControl,
        lights: LightController,
        display: impl StatusDisplay + 'static,
        link: watch::Receiver<Link>,
    ) -> Self {
        Self {
            control,
            lights,
            display: Box::new(display),
            link,
            phase: 0,
            last_screen: Vec::new(),
        }
    }

    pub fn phase(&self) -> u8 {
        self.phase
    }

    /// Compute and commit one frame. Returns how long to wait before the
    /// next one, which is `speed` in either mode.
    pub async fn tick(&mut self) -> Duration {
        let state = self.control.snapshot().await;

        let color = match state.mode {
            AnimationMode::Rainbow => {
                let color = hue_to_rgb(self.phase);
                self.phase = self.phase.wrapping_add(1);
                color
            }
            AnimationMode::Static => state.static_color,
        };

        // A failed frame is dropped, the next tick tries again
        if let Err(e) = self.lights.fill(scale(color, state.brightness)) {
            error!("Actuator: {}", e);
        }

        let link = *self.link.borrow();
        let screen = status_lines(link, &state);
        if screen != self.last_screen {
            self.display.show(&screen);
            self.last_screen = screen;
        }

        state.speed
    }

    pub async fn run(mut self) {
        info!("Actuator: driving {} pixel(s)", self.lights.len());

        loop {
            let delay = self.tick().await;
            tokio::time::sleep(delay).await;
        }
    }
}
