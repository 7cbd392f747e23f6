use std::{
    net::IpAddr,
    sync::{Arc, Mutex},
};

use log::info;

use crate::control::ControlState;

/// Headline shown in place of the address when association failed
pub const ASSOCIATION_FAILED: &str = "Wi-Fi Failed";
pub const CONNECTING: &str = "Connecting...";

/// Where association has got to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Link {
    Connecting,
    Associated(IpAddr),
    Failed,
}

impl From<Option<IpAddr>> for Link {
    fn from(address: Option<IpAddr>) -> Self {
        address.map_or(Link::Failed, Link::Associated)
    }
}

/// A small text screen next to the pixels.
pub trait StatusDisplay: Send {
    fn show(&mut self, lines: &[String]);
}

/// The four lines of the status screen: address, requested colour,
/// brightness and mode.
pub fn status_lines(link: Link, state: &ControlState) -> Vec<String> {
    let c = state.static_color;
    vec![
        match link {
            Link::Associated(ip) => ip.to_string(),
            Link::Connecting => CONNECTING.to_string(),
            Link::Failed => ASSOCIATION_FAILED.to_string(),
        },
        format!("R:{} G:{} B:{}", c.r, c.g, c.b),
        format!("Bright: {}%", state.brightness.percent()),
        format!("Mode: {}", state.mode.name()),
    ]
}

/// Writes the screen to the log
#[derive(Default)]
pub struct LogDisplay;

impl StatusDisplay for LogDisplay {
    fn show(&mut self, lines: &[String]) {
        info!("Display: {}", lines.join(" | "));
    }
}

/// Keeps every screen it was asked to show
#[derive(Clone, Default)]
pub struct MemoryDisplay {
    screens: Arc<Mutex<Vec<Vec<String>>>>,
}

impl MemoryDisplay {
    pub fn screens(&self) -> Vec<Vec<String>> {
        self.screens
            .lock()
            .map(|s| s.clone())
            .unwrap_or_else(|e| e.into_inner().clone())
    }

    pub fn last(&self) -> Option<Vec<String>> {
        self.screens().pop()
    }
}

impl StatusDisplay for MemoryDisplay {
    fn show(&mut self, lines: &[String]) {
        let mut screens = self.screens.lock().unwrap_or_else(|e| e.into_inner());
        screens.push(lines.to_vec());
    }
}
