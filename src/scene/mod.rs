//! Scene model and parsing
//!
//! A scene is the unit of content a viewer plays: an ordered collection of
//! media objects plus timing and capacity configuration. Scene documents
//! arrive from the hub as untrusted JSON; parsing is deliberately lenient
//! for tuning knobs (missing or malformed timings and caps fall back to
//! defaults) and strict about item identity, which the whole rotation core
//! keys on.

pub mod media;
pub mod settings;

pub use media::MediaObject;
pub use settings::SceneSettings;

use log::warn;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Fatal scene parsing failures. Everything else degrades to defaults.
#[derive(Debug, Error)]
pub enum SceneError {
    /// `maximumOnScreen` was present but not a JSON object. An absent
    /// container silently means "use the defaults"; a present-but-wrong one
    /// is a broken document and is reported.
    #[error("maximumOnScreen must be an object, got {found}")]
    InvalidCaps { found: &'static str },

    /// The `scene` item collection was present but not an array.
    #[error("scene item collection must be an array, got {found}")]
    InvalidItems { found: &'static str },

    /// An entry of the item collection could not be read as a media object
    /// (typically a missing `_id` or `type`).
    #[error("invalid media object at index {index}: {source}")]
    InvalidItem {
        index: usize,
        source: serde_json::Error,
    },
}

/// A parsed scene: the master item list plus effective settings.
#[derive(Debug, Clone)]
pub struct Scene {
    /// Defensive copy of the document's item collection, in document order.
    pub items: Vec<Arc<MediaObject>>,

    /// Timing settings, defaults substituted.
    pub settings: SceneSettings,

    /// Effective per-kind display cap. Kinds absent from this map are never
    /// shown.
    pub caps: HashMap<String, usize>,
}

impl Scene {
    /// Parse a raw scene document against the session's default display
    /// counts.
    pub fn parse(
        raw: &Value,
        default_counts: &HashMap<String, usize>,
    ) -> Result<Scene, SceneError> {
        let settings = SceneSettings::from_scene(raw);
        let caps = resolve_caps(raw, default_counts)?;

        let items = match raw.get("scene") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(entries)) => entries
                .iter()
                .enumerate()
                .map(|(index, entry)| {
                    serde_json::from_value::<MediaObject>(entry.clone())
                        .map(Arc::new)
                        .map_err(|source| SceneError::InvalidItem { index, source })
                })
                .collect::<Result<_, _>>()?,
            Some(other) => {
                return Err(SceneError::InvalidItems {
                    found: json_kind(other),
                });
            }
        };

        Ok(Scene {
            items,
            settings,
            caps,
        })
    }
}

/// Resolve the per-kind display caps for a scene.
///
/// Only kinds present in `default_counts` ever get a cap; a scene cannot
/// introduce caps for kinds the controller was not configured for. Entries
/// may be numbers or numeric strings; an unparsable entry keeps that kind's
/// default.
fn resolve_caps(
    raw: &Value,
    default_counts: &HashMap<String, usize>,
) -> Result<HashMap<String, usize>, SceneError> {
    let overrides = match raw.get("maximumOnScreen") {
        None | Some(Value::Null) => None,
        Some(Value::Object(map)) => Some(map),
        Some(other) => {
            return Err(SceneError::InvalidCaps {
                found: json_kind(other),
            });
        }
    };

    let mut caps = HashMap::with_capacity(default_counts.len());
    for (kind, &default_count) in default_counts {
        let count = match overrides.and_then(|map| map.get(kind)) {
            None => default_count,
            Some(entry) => match settings::parse_number(Some(entry)) {
                Some(parsed) if parsed >= 0.0 => parsed as usize,
                _ => {
                    warn!("unusable maximumOnScreen entry for {kind}: {entry}, keeping {default_count}");
                    default_count
                }
            },
        };
        caps.insert(kind.clone(), count);
    }
    Ok(caps)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
