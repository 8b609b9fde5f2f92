//! Wire messages between viewers, the controller and the hub
//!
//! Every socket speaks JSON text frames with an internally tagged `type`
//! field, e.g. `{"type": "playScene", "sceneId": "..."}`. Durations cross
//! the wire in milliseconds, ready for the display layer's animations.

use crate::rotation::QueueEvent;
use crate::scene::MediaObject;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Requests a viewer may send to the controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ViewerRequest {
    /// Load a scene from the hub and start rotation.
    #[serde(rename_all = "camelCase")]
    PlayScene {
        scene_id: String,
        /// Transition out whatever the previous scene left on screen.
        #[serde(default)]
        retire_active: bool,
    },

    /// Halt automatic rotation; active media plays out normally.
    Stop,

    /// A media element started leaving the screen.
    MediaTransitioning { id: String },

    /// A media element finished its lifecycle and may rotate again.
    MediaDone { id: String },

    /// Replace the tag filter with an any-of tag list; an empty list means
    /// match-all.
    SetTagFilter {
        #[serde(default)]
        tags: Vec<String>,
    },
}

/// Notifications the controller pushes to a viewer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ViewerEvent {
    #[serde(rename_all = "camelCase")]
    ShowMedia {
        media_object: MediaObject,
        display_duration: u64,
        transition_duration: u64,
    },

    #[serde(rename_all = "camelCase")]
    TransitionMedia { media_object: MediaObject },
}

impl From<QueueEvent> for ViewerEvent {
    fn from(event: QueueEvent) -> Self {
        match event {
            QueueEvent::Show {
                media,
                display_duration,
                transition_duration,
            } => ViewerEvent::ShowMedia {
                media_object: (*media).clone(),
                display_duration: display_duration.as_millis() as u64,
                transition_duration: transition_duration.as_millis() as u64,
            },
            QueueEvent::Transition { media } => ViewerEvent::TransitionMedia {
                media_object: (*media).clone(),
            },
        }
    }
}

/// Request sent to the hub.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum HubRequest {
    #[serde(rename_all = "camelCase")]
    LoadScene { scene_id: String, password: String },
}

/// Hub reply to a [`HubRequest`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum HubResponse {
    Scene { scene: Value },
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_viewer_requests_use_camel_case_tags() {
        let request: ViewerRequest =
            serde_json::from_value(json!({ "type": "playScene", "sceneId": "s1" })).unwrap();

        match request {
            ViewerRequest::PlayScene {
                scene_id,
                retire_active,
            } => {
                assert_eq!(scene_id, "s1");
                assert!(!retire_active);
            }
            other => panic!("unexpected request {other:?}"),
        }
    }

    #[test]
    fn test_completion_signals_round_trip() {
        for raw in [
            json!({ "type": "mediaTransitioning", "id": "m1" }),
            json!({ "type": "mediaDone", "id": "m1" }),
            json!({ "type": "stop" }),
            json!({ "type": "setTagFilter", "tags": ["apples"] }),
        ] {
            let request: ViewerRequest = serde_json::from_value(raw.clone()).unwrap();
            assert_eq!(serde_json::to_value(&request).unwrap(), raw);
        }
    }

    #[test]
    fn test_show_event_serializes_for_the_display_layer() {
        let media: MediaObject = serde_json::from_value(json!({
            "_id": "m1",
            "type": "image",
            "url": "http://example.com/m.png"
        }))
        .unwrap();

        let event = ViewerEvent::ShowMedia {
            media_object: media,
            display_duration: 10000,
            transition_duration: 1400,
        };

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], json!("showMedia"));
        assert_eq!(value["displayDuration"], json!(10000));
        assert_eq!(value["mediaObject"]["_id"], json!("m1"));
        assert_eq!(value["mediaObject"]["url"], json!("http://example.com/m.png"));
    }
}
