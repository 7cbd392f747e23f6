use crate::{color::to_hex, control::ControlState};

const TEMPLATE: &str = include_str!("status.html");

/// Fill the control page in from the current record.
pub fn render(state: &ControlState) -> String {
    let c = state.static_color;
    // The speed slider runs fast-to-the-right, 1..=100
    let speed_val = 100u128.saturating_sub(state.speed.as_millis()).max(1);
    let updated_at = match state.updated_at {
        Some(at) => at.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => "never".to_string(),
    };

    TEMPLATE
        .replace("BRIGHTNESS_VAL", &state.brightness.percent().to_string())
        .replace("SPEED_VAL", &speed_val.to_string())
        .replace("COLOR_HEX", &to_hex(c))
        .replace("RGB_TEXT", &format!("{},{},{}", c.r, c.g, c.b))
        .replace("UPDATED_AT", &updated_at)
        .replace("MODE", state.mode.name())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::AnimationMode;
    use smart_leds::RGB8;
    use std::time::Duration;

    #[test]
    fn test_render_defaults() {
        let page = render(&ControlState::default());
        assert!(page.contains(r#"value="50" class="slider" id="brightness""#));
        assert!(page.contains(r#"value="50" class="slider" id="speed""#));
        assert!(page.contains(r##"value="#808080""##));
        assert!(page.contains("128,128,128"));
        assert!(page.contains("Rainbow &middot;"));
        assert!(page.contains("updated never"));
    }

    #[test]
    fn test_render_leaves_no_placeholders() {
        let page = render(&ControlState::default());
        for placeholder in [
            "BRIGHTNESS_VAL",
            "SPEED_VAL",
            "COLOR_HEX",
            "RGB_TEXT",
            "UPDATED_AT",
            "MODE",
        ] {
            assert!(!page.contains(placeholder), "{} left in page", placeholder);
        }
    }

    #[test]
    fn test_render_static_colour() {
        let page = render(&ControlState {
            mode: AnimationMode::Static,
            static_color: RGB8::new(10, 20, 30),
            speed: Duration::from_secs(2),
            ..Default::default()
        });
        assert!(page.contains("10,20,30"));
        assert!(page.contains("#0a141e"));
        assert!(page.contains("Static &middot;"));
        assert!(page.contains(r#"value="1" class="slider" id="speed""#));
    }
}
