use std::{collections::BTreeMap, collections::HashMap, time::Duration};

use smart_leds::RGB8;

use super::{AnimationMode, MAX_SPEED};
use crate::color::{parse_hex, Brightness};
use crate::http::JsonValue;

/// The fields a request wants to change. `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControlUpdate {
    pub brightness: Option<Brightness>,
    pub mode: Option<AnimationMode>,
    pub static_color: Option<RGB8>,
    pub speed: Option<Duration>,
}

impl ControlUpdate {
    /// Black, not animating
    pub fn off() -> Self {
        ControlUpdate {
            mode: Some(AnimationMode::Static),
            static_color: Some(RGB8::new(0, 0, 0)),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &ControlUpdate::default()
    }
}

/// What happened to one field of a payload.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldOutcome {
    Applied(String),
    /// A field we know, carrying a value we cannot use
    WrongType { field: String, reason: String },
    /// A field we do not know; ignored
    Unknown(String),
}

/// An update together with a per-field account of how it was built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateReport {
    pub update: ControlUpdate,
    pub outcomes: Vec<FieldOutcome>,
}

impl UpdateReport {
    pub fn rejected(&self) -> impl Iterator<Item = &FieldOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, FieldOutcome::WrongType { .. }))
    }

    /// Build from query parameters, where every value is text.
    pub fn from_query(params: &HashMap<String, String>) -> Self {
        let mut report = UpdateReport::default();
        // Sorted so the outcome list is stable
        let mut keys: Vec<&String> = params.keys().collect();
        keys.sort();

        for key in keys {
            let value = Field::Text(params[key].as_str());
            report.accept(key, value);
        }

        report
    }

    /// Build from a flat JSON object.
    pub fn from_json(fields: &BTreeMap<String, JsonValue>) -> Self {
        let mut report = UpdateReport::default();

        for (key, value) in fields {
            report.accept(key, Field::Json(value));
        }

        report
    }

    fn accept(&mut self, key: &str, value: Field<'_>) {
        let result = match key {
            "brightness" => value.brightness().map(|b| self.update.brightness = Some(b)),
            "speed" => value.seconds().map(|s| self.update.speed = Some(s)),
            "speed_ms" => value.millis().map(|s| self.update.speed = Some(s)),
            "rainbow_enable" => value.flag().map(|on| {
                self.update.mode = Some(if on {
                    AnimationMode::Rainbow
                } else {
                    AnimationMode::Static
                })
            }),
            "animation_mode" | "mode" => value.mode().map(|m| self.update.mode = Some(m)),
            "static_color" | "color" => value.color().map(|c| self.update.static_color = Some(c)),
            _ => {
                self.outcomes.push(FieldOutcome::Unknown(key.to_string()));
                return;
            }
        };

        self.outcomes.push(match result {
            Ok(()) => FieldOutcome::Applied(key.to_string()),
            Err(reason) => FieldOutcome::WrongType {
                field: key.to_string(),
                reason,
            },
        });
    }
}

/// Read a brightness from a query value, in any of the accepted forms
pub fn parse_brightness(text: &str) -> Result<Brightness, String> {
    Field::Text(text).brightness()
}

/// A payload value from either source
enum Field<'a> {
    Text(&'a str),
    Json(&'a JsonValue),
}

impl Field<'_> {
    fn number(&self) -> Result<f64, String> {
        let n = match self {
            Field::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| format!("{:?} is not a number", s))?,
            Field::Json(v) => v
                .as_f64()
                .ok_or_else(|| format!("expected a number, got {}", v.kind()))?,
        };

        if n.is_nan() {
            return Err("not a number".to_string());
        }
        Ok(n)
    }

    /// Whole numbers from 2 up are 0..=255 levels. Anything else is a
    /// fraction of full scale, and `N%` is a percentage. All forms clamp.
    fn brightness(&self) -> Result<Brightness, String> {
        match self {
            Field::Text(s) => {
                let s = s.trim();
                if let Some(percent) = s.strip_suffix('%') {
                    let p = Field::Text(percent).number()?;
                    Ok(Brightness::from_percent(p))
                } else if s.contains('.') {
                    Ok(Brightness::from_fraction(self.number()?))
                } else {
                    Ok(fraction_or_level(self.number()?))
                }
            }
            Field::Json(JsonValue::Text(s)) => Field::Text(s).brightness(),
            Field::Json(_) => Ok(fraction_or_level(self.number()?)),
        }
    }

    fn seconds(&self) -> Result<Duration, String> {
        let secs = match self {
            Field::Json(JsonValue::Text(s)) => Field::Text(s).number()?,
            _ => self.number()?,
        };
        Ok(Duration::from_secs_f64(secs.clamp(0.0, MAX_SPEED.as_secs_f64())))
    }

    fn millis(&self) -> Result<Duration, String> {
        let ms = match self {
            Field::Json(JsonValue::Text(s)) => Field::Text(s).number()?,
            _ => self.number()?,
        };
        Ok(Duration::from_secs_f64(
            (ms / 1000.0).clamp(0.0, MAX_SPEED.as_secs_f64()),
        ))
    }

    fn flag(&self) -> Result<bool, String> {
        match self {
            Field::Json(JsonValue::Bool(b)) => Ok(*b),
            Field::Json(JsonValue::Integer(0)) => Ok(false),
            Field::Json(JsonValue::Integer(1)) => Ok(true),
            Field::Json(JsonValue::Text(s)) => Field::Text(s).flag(),
            Field::Json(v) => Err(format!("expected a bool, got {}", v.kind())),
            Field::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "on" | "yes" => Ok(true),
                "false" | "0" | "off" | "no" => Ok(false),
                other => Err(format!("{:?} is not a bool", other)),
            },
        }
    }

    fn mode(&self) -> Result<AnimationMode, String> {
        let name = match self {
            Field::Text(s) => *s,
            Field::Json(JsonValue::Text(s)) => s.as_str(),
            Field::Json(JsonValue::Bool(_)) => {
                return self
                    .flag()
                    .map(|on| if on { AnimationMode::Rainbow } else { AnimationMode::Static })
            }
            Field::Json(v) => return Err(format!("expected a mode name, got {}", v.kind())),
        };

        match name.trim().to_ascii_lowercase().as_str() {
            "rainbow" | "cyclic_rainbow" | "cyclicrainbow" => Ok(AnimationMode::Rainbow),
            "static" => Ok(AnimationMode::Static),
            other => Err(format!("unknown mode {:?}", other)),
        }
    }

    /// `[r, g, b]`, `r,g,b` or a hex string. Channels clamp to 0..=255.
    fn color(&self) -> Result<RGB8, String> {
        match self {
            Field::Json(JsonValue::List(items)) => {
                let channels = items
                    .iter()
                    .map(|v| Field::Json(v).number())
                    .collect::<Result<Vec<f64>, String>>()?;
                triple(&channels)
            }
            Field::Json(JsonValue::Text(s)) => Field::Text(s).color(),
            Field::Json(v) => Err(format!("expected a colour, got {}", v.kind())),
            Field::Text(s) => {
                let s = s.trim();
                if let Some(color) = parse_hex(s) {
                    return Ok(color);
                }

                let inner = s.trim_start_matches('[').trim_end_matches(']');
                let channels = inner
                    .split(',')
                    .map(|c| Field::Text(c).number())
                    .collect::<Result<Vec<f64>, String>>()
                    .map_err(|_| format!("{:?} is not a colour", s))?;
                triple(&channels)
            }
        }
    }
}

fn fraction_or_level(n: f64) -> Brightness {
    if n.fract() == 0.0 && n >= 2.0 {
        Brightness::from_level_clamped(n.min(u8::MAX as f64) as i64)
    } else {
        Brightness::from_fraction(n)
    }
}

fn triple(channels: &[f64]) -> Result<RGB8, String> {
    match channels {
        [r, g, b] => {
            let c = |v: f64| v.clamp(0.0, u8::MAX as f64) as u8;
            Ok(RGB8::new(c(*r), c(*g), c(*b)))
        }
        _ => Err(format!("expected 3 channels, got {}", channels.len())),
    }
}
