use std::{net::IpAddr, path::Path, time::Duration};

use anyhow::Error;
use log::warn;
use serde::{Deserialize, Serialize};
use smart_leds::RGB8;

use crate::{
    color::Brightness,
    control::{AnimationMode, ControlState},
};

pub const DEFAULT_PATH: &str = "config.ron";

#[derive(Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub lights: LightsConfig,
    pub defaults: DefaultsConfig,
    pub network: NetworkConfig,
    /// Default log filter. `RUST_LOG` still wins.
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            lights: LightsConfig::default(),
            defaults: DefaultsConfig::default(),
            network: NetworkConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: IpAddr,
    pub port: u16,
    /// Give up on a client that sends nothing for this long
    pub read_timeout_ms: u64,
    /// Largest request accepted; anything longer is malformed
    pub buffer_size: usize,
    pub percent_decode: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: IpAddr::from([0, 0, 0, 0]),
            port: 80,
            read_timeout_ms: 2000,
            buffer_size: 1024,
            percent_decode: false,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LightsConfig {
    pub pixel_count: usize,
    pub spi_clock_hz: u32,
}

impl Default for LightsConfig {
    fn default() -> Self {
        Self {
            pixel_count: 1,
            spi_clock_hz: 3_200_000,
        }
    }
}

/// The control record the lights start with
#[derive(Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Fraction of full scale
    pub brightness: f64,
    pub speed_ms: u64,
    pub rainbow: bool,
    pub static_color: [u8; 3],
    /// Fastest frame rate a request may ask for
    pub min_speed_ms: u64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            brightness: 0.5,
            speed_ms: 50,
            rainbow: true,
            static_color: [128, 128, 128],
            min_speed_ms: 5,
        }
    }
}

impl DefaultsConfig {
    pub fn control_state(&self) -> ControlState {
        let [r, g, b] = self.static_color;
        ControlState {
            brightness: Brightness::from_fraction(self.brightness),
            mode: if self.rainbow {
                AnimationMode::Rainbow
            } else {
                AnimationMode::Static
            },
            static_color: RGB8::new(r, g, b),
            speed: Duration::from_millis(self.speed_ms),
            updated_at: None,
        }
    }

    pub fn min_speed(&self) -> Duration {
        Duration::from_millis(self.min_speed_ms)
    }
}

#[derive(Debug, Deserialize, Serialize, PartialEq)]
pub enum NetworkMode {
    /// Use this address as-is
    Static(IpAddr),
    /// Ask the routing table, retrying until an address shows up
    Probe,
    Disabled,
}

#[derive(Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct NetworkConfig {
    pub mode: NetworkMode,
    pub attempts: u32,
    pub retry_delay_ms: u64,
    pub probe_target: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            mode: NetworkMode::Probe,
            attempts: 10,
            retry_delay_ms: 1000,
            probe_target: "8.8.8.8:80".to_string(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Config, Error> {
        Config::load_from(DEFAULT_PATH)
    }

    /// Read a RON config. A missing file is not an error, the defaults are
    /// used instead.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Config, Error> {
        let path = path.as_ref();
        if !path.exists() {
            warn!("Config: {} not found, using defaults", path.display());
            return Ok(Config::default());
        }

        let config = std::fs::read_to_string(path)?;
        let config: Config = ron::from_str(&config)?;
        Ok(config)
    }
}
