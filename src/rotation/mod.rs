//! Media rotation core
//!
//! This module decides, tick by tick and event by event, which media object
//! becomes visible next, separating concerns between:
//! - Pool state: partitioning a scene's items into queued vs on-screen
//! - Selection: per-kind caps, solo exclusivity, one promotion per pass
//! - Orchestration: the per-viewer task owning the repeating display timer
//! - Notification: show/transition events towards the display layer
//!
//! # Architecture
//!
//! Each viewer connection runs one scheduler task; the task owns its
//! [`MediaQueue`] outright, so no lock is ever taken on pool state. External
//! signals (scene loads, completion callbacks, tag filter changes) arrive as
//! commands over a channel and are applied run-to-completion; the selection
//! pass triggered by the timer goes through the same loop and can never
//! interleave with them.

pub mod queue;
pub mod scheduler;
pub mod tags;
pub mod types;

pub use queue::MediaQueue;
pub use scheduler::{Scheduler, SchedulerHandle};
pub use tags::{MatchAll, TagFilter, TagList};
pub use types::{QueueEvent, SceneOptions};
