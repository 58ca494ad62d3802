//! # Time-Driven Callbacks
//!
//! Per-frame listeners, one-shot "next frame" jobs and delayed actions.
//!
//! Callbacks receive the whole [`World`], so they can spawn, destroy and
//! move entities. Anything a callback registers (a listener, a job, an
//! action, an unsubscription) takes effect on the following frame.

use std::fmt;

use tracing::{debug, warn};

use crate::ecs::World;

/// Callback run every unpaused frame.
pub type UpdateFn = Box<dyn FnMut(&mut World)>;

/// Callback run once.
pub type OnceFn = Box<dyn FnOnce(&mut World)>;

/// Handle returned by [`TimeManager::subscribe_update`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Listener {
    id: ListenerId,
    callback: UpdateFn,
    valid: bool,
}

struct Action {
    /// `None` once fired.
    callback: Option<OnceFn>,
    remaining: f32,
}

/// Owner of every time-driven callback.
#[derive(Default)]
pub struct TimeManager {
    listeners: Vec<Listener>,
    next_update: Vec<OnceFn>,
    actions: Vec<Action>,
    /// Unsubscriptions issued while the listener list is being run.
    pending_unsubscribe: Vec<ListenerId>,
    next_id: u64,
    running: bool,
    elapsed: f32,
}

impl fmt::Debug for TimeManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimeManager")
            .field("listeners", &self.listeners.len())
            .field("next_update", &self.next_update.len())
            .field("actions", &self.actions.len())
            .field("elapsed", &self.elapsed)
            .finish_non_exhaustive()
    }
}

impl TimeManager {
    /// Creates a manager with nothing scheduled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a callback run every unpaused frame until unsubscribed.
    pub fn subscribe_update(&mut self, callback: impl FnMut(&mut World) + 'static) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push(Listener {
            id,
            callback: Box::new(callback),
            valid: true,
        });
        debug!(?id, "time listener subscribed");
        id
    }

    /// Stops a listener. It is dropped at the next clean step.
    pub fn unsubscribe_update(&mut self, id: ListenerId) {
        if let Some(listener) = self.listeners.iter_mut().find(|l| l.id == id && l.valid) {
            listener.valid = false;
        } else if self.running {
            self.pending_unsubscribe.push(id);
        } else {
            warn!(?id, "failed to unsubscribe time listener: unknown or already removed");
        }
    }

    /// Runs `callback` once at the start of the next update.
    pub fn enqueue_for_next_update(&mut self, callback: impl FnOnce(&mut World) + 'static) {
        self.next_update.push(Box::new(callback));
    }

    /// Drops every job queued with [`Self::enqueue_for_next_update`].
    pub fn clear_next_update_queue(&mut self) {
        self.next_update.clear();
    }

    /// Runs `callback` once after `delay` seconds of game time.
    pub fn enqueue_action(&mut self, callback: impl FnOnce(&mut World) + 'static, delay: f32) {
        self.actions.push(Action {
            callback: Some(Box::new(callback)),
            remaining: delay,
        });
    }

    /// Game time accumulated over unpaused updates, in seconds.
    #[must_use]
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Number of live listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.iter().filter(|l| l.valid).count()
    }

    /// Number of actions still waiting to fire.
    #[must_use]
    pub fn pending_actions(&self) -> usize {
        self.actions.iter().filter(|a| a.callback.is_some()).count()
    }

    /// Runs one frame of callbacks against `world`.
    ///
    /// Order: next-update jobs, listeners, due actions. The lists being run
    /// are moved out of the world first, so callbacks only ever append to
    /// the (empty) live lists; those additions are merged back afterwards.
    pub(crate) fn run(world: &mut World, dt: f32) {
        let time = world.time_mut();
        time.running = true;
        time.elapsed += dt;
        let jobs = std::mem::take(&mut time.next_update);
        let mut listeners = std::mem::take(&mut time.listeners);
        let mut actions = std::mem::take(&mut time.actions);

        for job in jobs {
            job(world);
        }

        for listener in &mut listeners {
            if !listener.valid || world.time().pending_unsubscribe.contains(&listener.id) {
                continue;
            }
            (listener.callback)(world);
        }

        for action in &mut actions {
            if action.callback.is_none() {
                continue;
            }
            action.remaining -= dt;
            if action.remaining <= 0.0 {
                if let Some(callback) = action.callback.take() {
                    callback(world);
                }
            }
        }

        let time = world.time_mut();
        time.running = false;

        let added = std::mem::replace(&mut time.listeners, listeners);
        time.listeners.extend(added);
        let added = std::mem::replace(&mut time.actions, actions);
        time.actions.extend(added);

        for id in std::mem::take(&mut time.pending_unsubscribe) {
            time.unsubscribe_update(id);
        }
    }

    /// Drops unsubscribed listeners and fired actions.
    pub fn clean_step(&mut self) {
        self.listeners.retain(|l| l.valid);
        self.actions.retain(|a| a.callback.is_some());
    }
}
