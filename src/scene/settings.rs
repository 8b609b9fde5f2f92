//! Scene-level timing settings

use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_DISPLAY_INTERVAL: Duration = Duration::from_secs(3);
pub const DEFAULT_DISPLAY_DURATION: Duration = Duration::from_secs(10);
pub const DEFAULT_TRANSITION_DURATION: Duration = Duration::from_millis(1400);

/// Timing configuration of a scene.
///
/// Wire values are in seconds; internally everything is a
/// millisecond-precision [`Duration`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneSettings {
    /// Pause between automatic selection ticks. Zero disables the timer.
    pub display_interval: Duration,

    /// How long a promoted item stays on screen before the display layer
    /// starts transitioning it out.
    pub display_duration: Duration,

    /// Disclosure/retirement animation length handed to the display layer.
    pub transition_duration: Duration,
}

impl Default for SceneSettings {
    fn default() -> Self {
        Self {
            display_interval: DEFAULT_DISPLAY_INTERVAL,
            display_duration: DEFAULT_DISPLAY_DURATION,
            transition_duration: DEFAULT_TRANSITION_DURATION,
        }
    }
}

impl SceneSettings {
    /// Read the timing fields of a raw scene document.
    ///
    /// Scene documents are hand-edited hub content, so each field may be a
    /// number, a numeric string, or missing entirely; anything absent or
    /// unparsable falls back to the built-in default.
    pub fn from_scene(raw: &Value) -> SceneSettings {
        SceneSettings {
            display_interval: seconds_field(raw, "displayInterval", DEFAULT_DISPLAY_INTERVAL),
            display_duration: seconds_field(raw, "displayDuration", DEFAULT_DISPLAY_DURATION),
            transition_duration: seconds_field(
                raw,
                "transitionDuration",
                DEFAULT_TRANSITION_DURATION,
            ),
        }
    }
}

fn seconds_field(raw: &Value, field: &str, default: Duration) -> Duration {
    match parse_number(raw.get(field)) {
        Some(seconds) if seconds >= 0.0 => Duration::from_millis((seconds * 1000.0) as u64),
        _ => default,
    }
}

/// Lenient numeric read: JSON numbers and numeric strings both count.
pub(crate) fn parse_number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(number) => number.as_f64().filter(|n| n.is_finite()),
        Value::String(text) => text.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_for_empty_scene() {
        let settings = SceneSettings::from_scene(&json!({}));

        assert_eq!(settings.display_interval, Duration::from_millis(3000));
        assert_eq!(settings.display_duration, Duration::from_millis(10000));
        assert_eq!(settings.transition_duration, Duration::from_millis(1400));
    }

    #[test]
    fn test_overrides_are_converted_from_seconds() {
        let settings = SceneSettings::from_scene(&json!({
            "displayInterval": 4,
            "displayDuration": 13,
            "transitionDuration": 3
        }));

        assert_eq!(settings.display_interval, Duration::from_millis(4000));
        assert_eq!(settings.display_duration, Duration::from_millis(13000));
        assert_eq!(settings.transition_duration, Duration::from_millis(3000));
    }

    #[test]
    fn test_numeric_strings_are_accepted() {
        let settings = SceneSettings::from_scene(&json!({
            "displayInterval": "2.5",
            "displayDuration": "bogus"
        }));

        assert_eq!(settings.display_interval, Duration::from_millis(2500));
        assert_eq!(settings.display_duration, DEFAULT_DISPLAY_DURATION);
    }

    #[test]
    fn test_explicit_zero_interval_survives() {
        let settings = SceneSettings::from_scene(&json!({ "displayInterval": 0 }));

        assert_eq!(settings.display_interval, Duration::ZERO);
    }

    #[test]
    fn test_negative_values_fall_back_to_defaults() {
        let settings = SceneSettings::from_scene(&json!({ "displayInterval": -2 }));

        assert_eq!(settings.display_interval, DEFAULT_DISPLAY_INTERVAL);
    }
}
