//! Media object model

use serde::de::{Deserializer, Error as DeError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single displayable content item.
///
/// Selection only ever looks at `id`, `kind`, `tags` and `solo`; everything
/// else the scene document carried for this item (urls, captions, layout
/// hints, ...) is kept verbatim in `payload` and handed to the display layer
/// untouched. `id` is the only key used for membership tests and removal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaObject {
    /// Stable unique identity.
    #[serde(rename = "_id")]
    pub id: String,

    /// Category name, e.g. "image" or "text". Per-kind display caps and the
    /// solo rule are keyed on this.
    #[serde(rename = "type")]
    pub kind: String,

    /// Tags the active tag filter is evaluated against.
    #[serde(default, deserialize_with = "deserialize_tags")]
    pub tags: Vec<String>,

    /// No other item of the same kind may be on screen while this one is.
    #[serde(default)]
    pub solo: bool,

    /// Remaining wire fields, passed through to the display layer.
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

/// Scene documents carry tags either as an array of strings or as a single
/// comma-separated string (the older wire format).
fn deserialize_tags<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(Vec::new()),
        Value::String(joined) => Ok(joined
            .split(',')
            .map(|tag| tag.trim().to_string())
            .filter(|tag| !tag.is_empty())
            .collect()),
        Value::Array(entries) => entries
            .into_iter()
            .map(|entry| match entry {
                Value::String(tag) => Ok(tag),
                other => Err(D::Error::custom(format!(
                    "tag must be a string, got {other}"
                ))),
            })
            .collect(),
        other => Err(D::Error::custom(format!(
            "tags must be an array or a comma-separated string, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_minimal_item() {
        let media: MediaObject = serde_json::from_value(json!({
            "_id": "a1",
            "type": "image",
            "url": "http://example.com/a.png"
        }))
        .unwrap();

        assert_eq!(media.id, "a1");
        assert_eq!(media.kind, "image");
        assert!(media.tags.is_empty());
        assert!(!media.solo);
        assert_eq!(media.payload["url"], json!("http://example.com/a.png"));
    }

    #[test]
    fn test_tags_accept_comma_separated_string() {
        let media: MediaObject = serde_json::from_value(json!({
            "_id": "a1",
            "type": "image",
            "tags": "apples, bananas , "
        }))
        .unwrap();

        assert_eq!(media.tags, vec!["apples", "bananas"]);
    }

    #[test]
    fn test_tags_accept_string_array() {
        let media: MediaObject = serde_json::from_value(json!({
            "_id": "a1",
            "type": "image",
            "tags": ["apples", "bananas"]
        }))
        .unwrap();

        assert_eq!(media.tags, vec!["apples", "bananas"]);
    }

    #[test]
    fn test_missing_id_is_rejected() {
        let result = serde_json::from_value::<MediaObject>(json!({
            "type": "image",
            "url": "http://example.com/a.png"
        }));

        assert!(result.is_err());
    }
}
