//! Colour math for the actuation tick.
//!
//! Everything in here is pure: no allocation, no locking, no I/O. The
//! actuator calls into it once per frame.

use smart_leds::RGB8;

/// Width of one band of the hue wheel
const BAND: u8 = 85;

/// Output brightness as a level on the 0..=255 boundary scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Brightness(u8);

impl Brightness {
    pub const OFF: Brightness = Brightness(0);
    pub const FULL: Brightness = Brightness(u8::MAX);

    pub const fn from_level(level: u8) -> Self {
        Brightness(level)
    }

    /// Clamp an arbitrary integer into the level range.
    pub fn from_level_clamped(level: i64) -> Self {
        Brightness(level.clamp(0, u8::MAX as i64) as u8)
    }

    /// Build from a normalised fraction, clamping to [0, 1]. NaN is treated
    /// as zero.
    pub fn from_fraction(fraction: f64) -> Self {
        if fraction.is_nan() {
            return Brightness::OFF;
        }
        Brightness((fraction.clamp(0.0, 1.0) * u8::MAX as f64).round() as u8)
    }

    pub fn from_percent(percent: f64) -> Self {
        Brightness::from_fraction(percent / 100.0)
    }

    pub const fn level(self) -> u8 {
        self.0
    }

    pub fn fraction(self) -> f64 {
        self.0 as f64 / u8::MAX as f64
    }

    /// Rounded percentage, as shown on the status page and display
    pub fn percent(self) -> u8 {
        (self.fraction() * 100.0).round() as u8
    }
}

impl Default for Brightness {
    fn default() -> Self {
        Brightness::FULL
    }
}

/// Map a position on the colour wheel to a fully saturated colour.
///
/// The wheel is split into three 85-step bands. Inside each band one
/// channel ramps down while the next ramps up and the third stays at zero,
/// so every phase sums to 255. Phases 0, 85 and 170 land exactly on green,
/// red and blue.
pub fn hue_to_rgb(phase: u8) -> RGB8 {
    if phase < BAND {
        RGB8::new(phase * 3, 255 - phase * 3, 0)
    } else if phase < 2 * BAND {
        let p = phase - BAND;
        RGB8::new(255 - p * 3, 0, p * 3)
    } else {
        let p = phase - 2 * BAND;
        RGB8::new(0, p * 3, 255 - p * 3)
    }
}

/// Scale every channel by the brightness, truncating toward zero.
///
/// Done in 16 bits so full brightness cannot overflow; at
/// `Brightness::FULL` the colour comes back unchanged.
pub fn scale(color: RGB8, brightness: Brightness) -> RGB8 {
    let level = brightness.level() as u16;
    let channel = |c: u8| ((c as u16 * level) / u8::MAX as u16) as u8;
    RGB8::new(channel(color.r), channel(color.g), channel(color.b))
}

/// Parse `RRGGBB`, with or without a leading `#`.
pub fn parse_hex(hex: &str) -> Option<RGB8> {
    let hex = hex.strip_prefix('#').unwrap_or(hex);
    if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }

    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
    Some(RGB8::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

/// Format as `#rrggbb`, the form the colour picker expects
pub fn to_hex(color: RGB8) -> String {
    format!("#{:02x}{:02x}{:02x}", color.r, color.g, color.b)
}
