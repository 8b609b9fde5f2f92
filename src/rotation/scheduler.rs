//! Per-viewer scheduler task
//!
//! Each viewer connection owns one scheduler: a tokio task wrapping a
//! [`MediaQueue`] together with the single repeating display timer. All
//! mutating entry points are commands on an mpsc channel, so every operation
//! and every timer tick runs to completion before the next one is looked at
//! and the pool invariants never have to survive interleaving.
//!
//! The timer follows the rearm-on-every-call rule: a selection pass first
//! drops the pending deadline and, while a scene with a non-zero display
//! interval is loaded, arms a fresh one measured from now. An externally
//! triggered pass (a freed slot) therefore resets the periodic cadence
//! instead of racing it.

use crate::rotation::queue::MediaQueue;
use crate::rotation::tags::TagFilter;
use crate::rotation::types::{QueueEvent, SceneOptions};
use crate::scene::SceneError;
use log::debug;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Instant};

enum Command {
    SetScene {
        raw: Value,
        options: SceneOptions,
        done: oneshot::Sender<Result<(), SceneError>>,
    },
    Play,
    Stop,
    MediaTransitioning(String),
    MediaDone(String),
    SetTagFilter(Arc<dyn TagFilter>),
}

/// Handle to a running scheduler task.
///
/// Cheap to clone; the task shuts down once every handle is dropped.
#[derive(Clone)]
pub struct SchedulerHandle {
    commands: mpsc::UnboundedSender<Command>,
}

impl SchedulerHandle {
    /// Load a scene. Fatal parse errors surface here; the previous scene
    /// stays in place when they do.
    pub async fn set_scene(&self, raw: Value, options: SceneOptions) -> Result<(), SceneError> {
        let (done, outcome) = oneshot::channel();
        if self
            .commands
            .send(Command::SetScene { raw, options, done })
            .is_err()
        {
            return Ok(());
        }
        // a dropped reply means the scheduler shut down mid-request
        outcome.await.unwrap_or(Ok(()))
    }

    /// Start rotation: triggers a selection pass immediately, which also
    /// arms the periodic timer.
    pub fn play(&self) {
        let _ = self.commands.send(Command::Play);
    }

    /// Disarm the timer. Active media keeps playing out; completion signals
    /// are still honored.
    pub fn stop(&self) {
        let _ = self.commands.send(Command::Stop);
    }

    /// The display layer started retiring this item; its slot frees up and
    /// is refilled without waiting for the next tick.
    pub fn media_transitioning(&self, id: impl Into<String>) {
        let _ = self.commands.send(Command::MediaTransitioning(id.into()));
    }

    /// The item finished its on-screen lifecycle and may rotate again.
    pub fn media_done(&self, id: impl Into<String>) {
        let _ = self.commands.send(Command::MediaDone(id.into()));
    }

    pub fn set_tag_filter(&self, filter: Arc<dyn TagFilter>) {
        let _ = self.commands.send(Command::SetTagFilter(filter));
    }
}

/// The scheduler task state. Constructed through [`Scheduler::spawn`].
pub struct Scheduler {
    queue: MediaQueue,
    events: mpsc::UnboundedSender<QueueEvent>,
    /// Next automatic tick; `None` while the timer is disarmed.
    deadline: Option<Instant>,
}

impl Scheduler {
    /// Spawn a scheduler with the given per-kind display count defaults.
    /// Events are delivered on `events` in emission order.
    pub fn spawn(
        default_counts: HashMap<String, usize>,
        events: mpsc::UnboundedSender<QueueEvent>,
    ) -> SchedulerHandle {
        Self::spawn_with_queue(MediaQueue::new(default_counts), events)
    }

    /// Like [`Scheduler::spawn`] with a pre-built queue, so tests can seed
    /// the shuffle.
    pub fn spawn_with_queue(
        queue: MediaQueue,
        events: mpsc::UnboundedSender<QueueEvent>,
    ) -> SchedulerHandle {
        let (commands, inbox) = mpsc::unbounded_channel();
        let scheduler = Scheduler {
            queue,
            events,
            deadline: None,
        };
        tokio::spawn(scheduler.run(inbox));
        SchedulerHandle { commands }
    }

    async fn run(mut self, mut inbox: mpsc::UnboundedReceiver<Command>) {
        let instance = self.queue.instance();
        debug!("scheduler {instance}: started");

        loop {
            tokio::select! {
                command = inbox.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },
                _ = tick(self.deadline) => self.select_next(),
            }
        }

        debug!("scheduler {instance}: shut down");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::SetScene { raw, options, done } => {
                let outcome = match self.queue.set_scene(&raw, options) {
                    Ok(events) => {
                        for event in events {
                            self.emit(event);
                        }
                        Ok(())
                    }
                    Err(error) => Err(error),
                };
                let _ = done.send(outcome);
            }
            Command::Play => self.select_next(),
            Command::Stop => self.deadline = None,
            Command::MediaTransitioning(id) => {
                self.queue.media_transitioning(&id);
                self.select_next();
            }
            Command::MediaDone(id) => self.queue.media_done(&id),
            Command::SetTagFilter(filter) => {
                for event in self.queue.set_filter(filter) {
                    self.emit(event);
                }
            }
        }
    }

    /// One pass of the selection algorithm: disarm and rearm the timer,
    /// then promote at most one item.
    fn select_next(&mut self) {
        self.deadline = self
            .queue
            .display_interval()
            .map(|interval| Instant::now() + interval);

        if let Some(event) = self.queue.select_next() {
            self.emit(event);
        }
    }

    fn emit(&self, event: QueueEvent) {
        // the receiver half lives in the connection task; when it is gone
        // this scheduler is about to be dropped as well
        let _ = self.events.send(event);
    }
}

/// Resolves at the pending deadline, or never while the timer is disarmed.
async fn tick(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
