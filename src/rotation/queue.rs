//! Media pool and selection
//!
//! [`MediaQueue`] partitions the media objects of the current scene into a
//! shuffled queue of items awaiting display and the set currently on screen,
//! and picks at most one item to promote per invocation. Timer orchestration
//! lives in [`scheduler`](super::scheduler); everything here is synchronous
//! state manipulation, so the scheduling rules stay testable without a
//! clock.
//!
//! Invariants maintained across every operation:
//! - `queue` and `active` are disjoint (by id) and drawn from the master
//!   list of the current scene.
//! - Every queued item passes the current tag filter.
//! - Per-kind caps are checked before a promotion, never repaired after.
//! - An active solo item blocks further promotion of its kind.

use crate::rotation::tags::{self, TagFilter};
use crate::rotation::types::{QueueEvent, SceneOptions};
use crate::scene::{MediaObject, Scene, SceneError, SceneSettings};
use log::debug;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

static QUEUE_COUNT: AtomicUsize = AtomicUsize::new(0);

/// Pool state of one playback session.
pub struct MediaQueue {
    /// All media objects of the current scene.
    master: Vec<Arc<MediaObject>>,

    /// Items eligible and awaiting display, in randomized order.
    queue: Vec<Arc<MediaObject>>,

    /// Items currently on screen.
    active: Vec<Arc<MediaObject>>,

    /// Distinct kinds observed in the current scene, independent of the
    /// filter.
    kinds: Vec<String>,

    /// Effective per-kind cap for the current scene.
    caps: HashMap<String, usize>,

    /// Constructor-supplied fallback caps, reapplied on every scene load.
    default_counts: HashMap<String, usize>,

    /// Settings of the current scene, `None` until the first scene load.
    settings: Option<SceneSettings>,

    /// The tag filter in effect.
    filter: Arc<dyn TagFilter>,

    rng: StdRng,

    /// Sequence number used as a logging handle.
    instance: usize,
}

impl MediaQueue {
    pub fn new(default_counts: HashMap<String, usize>) -> Self {
        Self::with_rng(default_counts, StdRng::from_os_rng())
    }

    /// Like [`MediaQueue::new`] but with a caller-supplied RNG, so tests can
    /// pin the shuffle order.
    pub fn with_rng(default_counts: HashMap<String, usize>, rng: StdRng) -> Self {
        Self {
            master: Vec::new(),
            queue: Vec::new(),
            active: Vec::new(),
            kinds: Vec::new(),
            caps: HashMap::new(),
            default_counts,
            settings: None,
            filter: tags::match_all(),
            rng,
            instance: QUEUE_COUNT.fetch_add(1, Ordering::Relaxed) + 1,
        }
    }

    pub fn instance(&self) -> usize {
        self.instance
    }

    /// Display interval driving the automatic tick. `None` while no scene is
    /// loaded or when the scene disabled the timer with an explicit zero.
    pub fn display_interval(&self) -> Option<Duration> {
        self.settings
            .map(|settings| settings.display_interval)
            .filter(|interval| !interval.is_zero())
    }

    pub fn queued_len(&self) -> usize {
        self.queue.len()
    }

    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    /// Replace the current scene wholesale.
    ///
    /// Master list, queue, kind index and caps are rebuilt from the new
    /// document. Items already on screen are left alone unless
    /// `options.retire_active` asks for them to be transitioned out, in
    /// which case the returned events carry one retirement request per
    /// active item.
    pub fn set_scene(
        &mut self,
        raw: &Value,
        options: SceneOptions,
    ) -> Result<Vec<QueueEvent>, SceneError> {
        let scene = Scene::parse(raw, &self.default_counts)?;

        let mut events = Vec::new();
        if options.retire_active {
            for media in self.active.drain(..) {
                events.push(QueueEvent::Transition { media });
            }
        }

        self.settings = Some(scene.settings);
        self.caps = scene.caps;
        self.kinds.clear();
        for item in &scene.items {
            if !self.kinds.contains(&item.kind) {
                self.kinds.push(item.kind.clone());
            }
        }
        self.master = scene.items;
        self.refill_queue();

        debug!(
            "queue {}: scene loaded, {} items, {} queued, {} active",
            self.instance,
            self.master.len(),
            self.queue.len(),
            self.active.len()
        );
        Ok(events)
    }

    /// Pick at most one queued item and promote it on screen.
    ///
    /// Kinds at their cap and kinds held by an active solo item are skipped;
    /// the first queued item of a remaining kind wins, except that a solo
    /// item stays queued until no other item of its kind is on screen. One
    /// invocation promotes at most one item, so entrances stay staggered
    /// even when several slots are free.
    pub fn select_next(&mut self) -> Option<QueueEvent> {
        let settings = self.settings?;

        let eligible = self.eligible_kinds();
        if eligible.is_empty() {
            return None;
        }

        let winner = self.queue.iter().position(|media| {
            eligible.contains(&media.kind) && (!media.solo || self.active_count(&media.kind) == 0)
        })?;

        let media = self.queue.remove(winner);
        self.active.push(media.clone());
        debug!("queue {}: showing {}", self.instance, media.id);

        Some(QueueEvent::Show {
            media,
            display_duration: settings.display_duration,
            transition_duration: settings.transition_duration,
        })
    }

    /// Remove an item from the active set as it starts leaving the screen.
    ///
    /// Unknown ids are tolerated: completion signals may arrive late or
    /// twice. Returns whether anything was removed.
    pub fn media_transitioning(&mut self, id: &str) -> bool {
        match self.active.iter().position(|media| media.id == id) {
            Some(index) => {
                self.active.remove(index);
                debug!("queue {}: {id} transitioning off screen", self.instance);
                true
            }
            None => {
                debug!(
                    "queue {}: mediaTransitioning for unknown id {id}",
                    self.instance
                );
                false
            }
        }
    }

    /// Return a finished item to the rotation.
    ///
    /// The item is requeued only if it still exists in the master list, is
    /// not already queued (duplicate completion signals happen) and passes
    /// the current filter. It is deliberately not required to be absent from
    /// the active set: `media_done` may arrive independently of
    /// `media_transitioning`.
    pub fn media_done(&mut self, id: &str) {
        debug!("queue {}: mediaDone for {id}", self.instance);

        let Some(media) = self.master.iter().find(|media| media.id == id).cloned() else {
            return;
        };
        if contains_id(&self.queue, id) {
            return;
        }
        if self.filter.matches(&media.tags) {
            self.queue.push(media);
        }
    }

    /// Swap the active tag filter.
    ///
    /// A filter equal to the current one is ignored. Otherwise the queue is
    /// rebuilt under the new filter and a [`QueueEvent::Transition`] is
    /// returned for every active item that no longer matches; the active set
    /// itself is left for the display layer to wind down.
    pub fn set_filter(&mut self, filter: Arc<dyn TagFilter>) -> Vec<QueueEvent> {
        if self.filter.equals(filter.as_ref()) {
            return Vec::new();
        }
        self.filter = filter;
        self.refill_queue();

        self.active
            .iter()
            .filter(|media| !self.filter.matches(&media.tags))
            .map(|media| QueueEvent::Transition {
                media: media.clone(),
            })
            .collect()
    }

    /// Rebuild the queue from the master list: items passing the current
    /// filter and not already on screen, freshly shuffled.
    fn refill_queue(&mut self) {
        let mut queue: Vec<Arc<MediaObject>> = self
            .master
            .iter()
            .filter(|media| self.filter.matches(&media.tags))
            .filter(|media| !contains_id(&self.active, &media.id))
            .cloned()
            .collect();
        queue.shuffle(&mut self.rng);
        self.queue = queue;
    }

    fn active_count(&self, kind: &str) -> usize {
        self.active.iter().filter(|media| media.kind == kind).count()
    }

    /// Kinds with spare capacity that are not blocked by an active solo
    /// item. A kind without a configured cap never becomes eligible.
    fn eligible_kinds(&self) -> Vec<String> {
        let solo_kinds: Vec<&str> = self
            .active
            .iter()
            .filter(|media| media.solo)
            .map(|media| media.kind.as_str())
            .collect();

        self.kinds
            .iter()
            .filter(|kind| {
                self.active_count(kind) < self.caps.get(kind.as_str()).copied().unwrap_or(0)
            })
            .filter(|kind| !solo_kinds.contains(&kind.as_str()))
            .cloned()
            .collect()
    }
}

fn contains_id(list: &[Arc<MediaObject>], id: &str) -> bool {
    list.iter().any(|media| media.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rotation::tags::TagList;
    use serde_json::{Value, json};

    fn make_queue(default_counts: &[(&str, usize)]) -> MediaQueue {
        let counts = default_counts
            .iter()
            .map(|(kind, count)| (kind.to_string(), *count))
            .collect();
        MediaQueue::with_rng(counts, StdRng::seed_from_u64(7))
    }

    fn make_item(kind: &str, id: &str) -> Value {
        json!({ "_id": id, "type": kind, "url": format!("http://example.com/{id}") })
    }

    fn make_scene(items: Vec<Value>) -> Value {
        json!({ "scene": items })
    }

    fn tagged(kind: &str, id: &str, tags: &str) -> Value {
        json!({ "_id": id, "type": kind, "tags": tags })
    }

    fn drain_shows(queue: &mut MediaQueue) -> Vec<QueueEvent> {
        let mut shown = Vec::new();
        while let Some(event) = queue.select_next() {
            shown.push(event);
        }
        shown
    }

    #[test]
    fn test_select_without_scene_is_a_no_op() {
        let mut queue = make_queue(&[("foo", 2)]);

        assert!(queue.select_next().is_none());
        assert_eq!(queue.queued_len(), 0);
    }

    #[test]
    fn test_show_event_carries_scene_durations() {
        let mut queue = make_queue(&[("foo", 2)]);
        let mut scene = make_scene(vec![make_item("foo", "a")]);
        scene["displayDuration"] = json!(13);
        scene["transitionDuration"] = json!(3);
        queue.set_scene(&scene, SceneOptions::default()).unwrap();

        match queue.select_next().unwrap() {
            QueueEvent::Show {
                display_duration,
                transition_duration,
                ..
            } => {
                assert_eq!(display_duration, Duration::from_millis(13000));
                assert_eq!(transition_duration, Duration::from_millis(3000));
            }
            other => panic!("expected a show event, got {other:?}"),
        }
    }

    #[test]
    fn test_one_promotion_per_invocation() {
        let mut queue = make_queue(&[("foo", 2)]);
        let scene = make_scene(vec![
            make_item("foo", "a"),
            make_item("foo", "b"),
            make_item("foo", "c"),
        ]);
        queue.set_scene(&scene, SceneOptions::default()).unwrap();

        assert!(queue.select_next().is_some());
        assert_eq!(queue.active_len(), 1);
    }

    #[test]
    fn test_caps_bound_the_active_set() {
        let mut queue = make_queue(&[("foo", 2), ("bar", 2)]);
        let mut scene = make_scene(vec![
            make_item("foo", "a"),
            make_item("foo", "b"),
            make_item("foo", "c"),
            make_item("foo", "d"),
        ]);
        scene["maximumOnScreen"] = json!({ "foo": 2 });
        queue.set_scene(&scene, SceneOptions::default()).unwrap();

        let shown = drain_shows(&mut queue);

        assert_eq!(shown.len(), 2);
        assert_eq!(queue.active_len(), 2);
        assert_eq!(queue.queued_len(), 2);
    }

    #[test]
    fn test_kind_without_default_cap_is_never_shown() {
        let mut queue = make_queue(&[("foo", 2)]);
        let scene = make_scene(vec![make_item("mystery", "m"), make_item("foo", "a")]);
        queue.set_scene(&scene, SceneOptions::default()).unwrap();

        let shown = drain_shows(&mut queue);

        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].media_id(), "a");
    }

    #[test]
    fn test_freed_slot_can_be_refilled() {
        let mut queue = make_queue(&[("foo", 1)]);
        let scene = make_scene(vec![make_item("foo", "a"), make_item("foo", "b")]);
        queue.set_scene(&scene, SceneOptions::default()).unwrap();

        let first = queue.select_next().unwrap();
        assert!(queue.select_next().is_none());

        assert!(queue.media_transitioning(first.media_id()));
        assert!(queue.select_next().is_some());
        assert_eq!(queue.active_len(), 1);
    }

    #[test]
    fn test_media_transitioning_unknown_id_is_a_no_op() {
        let mut queue = make_queue(&[("foo", 2)]);
        let scene = make_scene(vec![make_item("foo", "a")]);
        queue.set_scene(&scene, SceneOptions::default()).unwrap();
        queue.select_next().unwrap();

        assert!(!queue.media_transitioning("nope"));
        assert_eq!(queue.active_len(), 1);
    }

    #[test]
    fn test_media_done_requeues_exactly_once() {
        let mut queue = make_queue(&[("foo", 2)]);
        let scene = make_scene(vec![make_item("foo", "a")]);
        queue.set_scene(&scene, SceneOptions::default()).unwrap();

        let shown = queue.select_next().unwrap();
        queue.media_transitioning(shown.media_id());
        assert_eq!(queue.queued_len(), 0);

        queue.media_done(shown.media_id());
        queue.media_done(shown.media_id());

        assert_eq!(queue.queued_len(), 1);
    }

    #[test]
    fn test_media_done_for_unknown_id_is_a_no_op() {
        let mut queue = make_queue(&[("foo", 2)]);
        let scene = make_scene(vec![make_item("foo", "a")]);
        queue.set_scene(&scene, SceneOptions::default()).unwrap();

        queue.media_done("not-in-master");

        assert_eq!(queue.queued_len(), 1);
    }

    #[test]
    fn test_media_done_respects_the_filter() {
        let mut queue = make_queue(&[("foo", 2)]);
        let scene = make_scene(vec![tagged("foo", "a", "apples")]);
        queue.set_scene(&scene, SceneOptions::default()).unwrap();

        let shown = queue.select_next().unwrap();
        queue.media_transitioning(shown.media_id());
        queue.set_filter(Arc::new(TagList::new(vec!["carrots".to_string()])));

        queue.media_done(shown.media_id());

        assert_eq!(queue.queued_len(), 0);
    }

    #[test]
    fn test_redisplay_after_completion() {
        let mut queue = make_queue(&[("foo", 2), ("bar", 2)]);
        let scene = make_scene(vec![make_item("foo", "only")]);
        queue.set_scene(&scene, SceneOptions::default()).unwrap();

        let first = queue.select_next().unwrap();
        queue.media_transitioning(first.media_id());
        queue.media_done(first.media_id());

        let second = queue.select_next().unwrap();
        assert_eq!(second.media_id(), first.media_id());
    }

    #[test]
    fn test_queued_solo_waits_for_its_kind_to_clear() {
        let mut queue = make_queue(&[("foo", 3)]);
        let plain = make_scene(vec![make_item("foo", "a"), make_item("foo", "b")]);
        queue.set_scene(&plain, SceneOptions::default()).unwrap();
        let shown: Vec<String> = drain_shows(&mut queue)
            .iter()
            .map(|event| event.media_id().to_string())
            .collect();
        assert_eq!(shown.len(), 2);

        // same scene plus a solo item: the actives are kept, only "s" queues
        let mut with_solo = plain.clone();
        with_solo["scene"]
            .as_array_mut()
            .unwrap()
            .push(json!({ "_id": "s", "type": "foo", "solo": true }));
        queue.set_scene(&with_solo, SceneOptions::default()).unwrap();
        assert_eq!(queue.queued_len(), 1);

        // capacity is never the blocker here (2 of 3 used), only the solo rule
        assert!(queue.select_next().is_none());
        queue.media_transitioning(&shown[0]);
        assert!(queue.select_next().is_none());
        queue.media_transitioning(&shown[1]);

        let solo = queue.select_next().unwrap();
        assert_eq!(solo.media_id(), "s");
    }

    #[test]
    fn test_active_solo_blocks_its_kind() {
        let mut queue = make_queue(&[("foo", 3), ("bar", 1)]);
        let solo_only = make_scene(vec![json!({ "_id": "s", "type": "foo", "solo": true })]);
        queue.set_scene(&solo_only, SceneOptions::default()).unwrap();
        let first = queue.select_next().unwrap();
        assert_eq!(first.media_id(), "s");

        // add competitors while the solo item is on screen
        let mut richer = solo_only.clone();
        richer["scene"]
            .as_array_mut()
            .unwrap()
            .extend([make_item("foo", "a"), make_item("bar", "b")]);
        queue.set_scene(&richer, SceneOptions::default()).unwrap();

        // the solo foo keeps "a" off screen despite free capacity; the
        // unrelated bar still shows
        let mut shown = Vec::new();
        while let Some(event) = queue.select_next() {
            shown.push(event.media_id().to_string());
        }
        assert_eq!(shown, vec!["b".to_string()]);

        queue.media_transitioning("s");
        let next = queue.select_next().unwrap();
        assert_eq!(next.media_id(), "a");
    }

    #[test]
    fn test_filter_change_rebuilds_queue_and_retires_active() {
        let mut queue = make_queue(&[("foo", 2), ("bar", 2)]);
        let scene = make_scene(vec![
            tagged("foo", "a", "apples, bananas"),
            tagged("foo", "b", "apples"),
            tagged("bar", "c", "apples"),
        ]);
        queue.set_scene(&scene, SceneOptions::default()).unwrap();

        let shown = queue.select_next().unwrap();
        let events = queue.set_filter(Arc::new(TagList::new(vec!["carrots".to_string()])));

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].media_id(), shown.media_id());
        assert_eq!(queue.queued_len(), 0);
        // the queue only requests retirement; removal is the display layer's move
        assert_eq!(queue.active_len(), 1);
        assert!(queue.select_next().is_none());
    }

    #[test]
    fn test_filter_change_keeps_matching_active_quiet() {
        let mut queue = make_queue(&[("foo", 2), ("bar", 2)]);
        let scene = make_scene(vec![
            tagged("foo", "a", "apples"),
            tagged("bar", "b", "carrots"),
        ]);
        queue.set_scene(&scene, SceneOptions::default()).unwrap();
        drain_shows(&mut queue);

        let events = queue.set_filter(Arc::new(TagList::new(vec!["apples".to_string()])));

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].media_id(), "b");
    }

    #[test]
    fn test_equal_filter_is_ignored() {
        let mut queue = make_queue(&[("foo", 2)]);
        let scene = make_scene(vec![tagged("foo", "a", "apples")]);
        queue.set_scene(&scene, SceneOptions::default()).unwrap();
        queue.set_filter(Arc::new(TagList::new(vec!["apples".to_string()])));
        let queued_before = queue.queued_len();

        let events = queue.set_filter(Arc::new(TagList::new(vec!["Apples".to_string()])));

        assert!(events.is_empty());
        assert_eq!(queue.queued_len(), queued_before);
    }

    #[test]
    fn test_scene_swap_keeps_active_and_stays_disjoint() {
        let mut queue = make_queue(&[("foo", 2)]);
        let scene = make_scene(vec![make_item("foo", "a"), make_item("foo", "b")]);
        queue.set_scene(&scene, SceneOptions::default()).unwrap();
        let shown = queue.select_next().unwrap();

        // identical scene set again: the active item must not re-enter the queue
        queue.set_scene(&scene, SceneOptions::default()).unwrap();

        assert_eq!(queue.active_len(), 1);
        assert_eq!(queue.queued_len(), 1);
        let next = queue.select_next().unwrap();
        assert_ne!(next.media_id(), shown.media_id());
    }

    #[test]
    fn test_scene_swap_can_retire_active() {
        let mut queue = make_queue(&[("foo", 2)]);
        let scene = make_scene(vec![make_item("foo", "a"), make_item("foo", "b")]);
        queue.set_scene(&scene, SceneOptions::default()).unwrap();
        let shown = queue.select_next().unwrap();

        let events = queue
            .set_scene(&scene, SceneOptions::retire_active())
            .unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].media_id(), shown.media_id());
        assert_eq!(queue.active_len(), 0);
        assert_eq!(queue.queued_len(), 2);
    }

    #[test]
    fn test_scene_parse_errors_propagate() {
        let mut queue = make_queue(&[("foo", 2)]);
        let result = queue.set_scene(&json!({ "maximumOnScreen": 3 }), SceneOptions::default());

        assert!(matches!(result, Err(SceneError::InvalidCaps { .. })));
    }
}
