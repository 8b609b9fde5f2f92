//! Shared types for the rotation core

use crate::scene::MediaObject;
use std::sync::Arc;
use std::time::Duration;

/// Options for loading a scene into a running queue.
#[derive(Debug, Clone, Copy, Default)]
pub struct SceneOptions {
    /// Retire every currently active item as part of the scene swap.
    ///
    /// Off by default: items already on screen keep playing under the new
    /// scene and leave through their normal lifecycle. When set, a
    /// [`QueueEvent::Transition`] is emitted for each active item so the
    /// display layer can animate it out.
    pub retire_active: bool,
}

impl SceneOptions {
    pub fn retire_active() -> Self {
        Self {
            retire_active: true,
        }
    }
}

/// Notifications a media queue emits towards its display layer.
#[derive(Debug, Clone)]
pub enum QueueEvent {
    /// An item was promoted on screen.
    Show {
        media: Arc<MediaObject>,
        /// How long the item should stay visible.
        display_duration: Duration,
        /// Disclosure/retirement animation length.
        transition_duration: Duration,
    },

    /// The display layer is asked to retire an item.
    ///
    /// The queue never removes the item from the active set on its own; the
    /// display layer answers with `media_transitioning` once the item
    /// actually starts leaving the screen.
    Transition { media: Arc<MediaObject> },
}

impl QueueEvent {
    /// Identity of the media object the event is about.
    pub fn media_id(&self) -> &str {
        match self {
            QueueEvent::Show { media, .. } => &media.id,
            QueueEvent::Transition { media } => &media.id,
        }
    }
}
