use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Returns a version as specified in Cargo.toml
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub fn app_name() -> &'static str {
    env!("CARGO_PKG_NAME")
}

// connections
pub const VIEWER_SERVICE_PORT: u16 = 3210;

// environment fallbacks for the CLI flags
pub const ENV_PORT: &str = "PORT";
pub const ENV_HUB_URL: &str = "HUB_URL";
pub const ENV_HUB_PASSWORD: &str = "HUB_PASSWORD";

/// Display-count caps used when a scene does not override them. Kinds
/// missing from this map are never shown, whatever the scene says.
pub static DEFAULT_DISPLAY_COUNTS: Lazy<HashMap<String, usize>> = Lazy::new(|| {
    HashMap::from([
        ("image".to_string(), 3),
        ("text".to_string(), 1),
        ("video".to_string(), 1),
        ("audio".to_string(), 1),
    ])
});

/// Runtime settings resolved from CLI flags and environment variables.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Port of the viewer-facing WebSocket service.
    pub port: u16,

    /// WebSocket address of the media hub, e.g. `ws://hub.local:8080`.
    pub hub_url: String,

    /// Password presented to the hub on every loadScene request.
    pub hub_password: String,

    /// Per-kind display caps handed to every new scheduler instance.
    pub default_display_counts: HashMap<String, usize>,
}
