//! Single-flight registry of in-flight generations.
//!
//! At most one generation runs per group key. The first caller to
//! [`try_acquire`](GenerationCoordinator::try_acquire) a free key receives a
//! [`GenerationGuard`]; later callers receive a [`WaitHandle`] that resolves
//! once the guard is dropped. Dropping the guard is the only way to release a
//! slot, so every exit path of the owner releases it.
//!
//! Slots never expire. A generation that never finishes stalls its waiters
//! until the upstream call times out.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;

type Slots = Mutex<HashMap<String, watch::Sender<bool>>>;

/// Outcome of [`GenerationCoordinator::try_acquire`].
#[derive(Debug)]
pub enum Acquisition {
    /// The caller owns the slot and must generate.
    Acquired(GenerationGuard),
    /// Another generation for the group is in flight.
    Busy(WaitHandle),
}

/// Registry of generation slots keyed by group.
#[derive(Debug, Default)]
pub struct GenerationCoordinator {
    slots: Arc<Slots>,
}

impl GenerationCoordinator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically claim the slot for `group`, or get a handle on the current owner.
    pub fn try_acquire(&self, group: &str) -> Acquisition {
        let mut slots = self.lock();
        if let Some(done) = slots.get(group) {
            return Acquisition::Busy(WaitHandle {
                done: done.subscribe(),
            });
        }
        let (done, _) = watch::channel(false);
        slots.insert(group.to_owned(), done);
        Acquisition::Acquired(GenerationGuard {
            group: group.to_owned(),
            slots: Arc::clone(&self.slots),
        })
    }

    /// Whether a generation for `group` is in flight.
    #[cfg(test)]
    pub(crate) fn is_generating(&self, group: &str) -> bool {
        self.lock().contains_key(group)
    }

    /// Number of callers currently waiting on `group`.
    #[must_use]
    pub(crate) fn waiters(&self, group: &str) -> usize {
        self.lock()
            .get(group)
            .map_or(0, watch::Sender::receiver_count)
    }

    /// Number of groups currently generating.
    #[must_use]
    pub(crate) fn in_flight(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, watch::Sender<bool>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Ownership of a generation slot. Dropping it releases the slot and wakes
/// every waiter.
#[derive(Debug)]
#[must_use = "dropping the guard releases the generation slot"]
pub struct GenerationGuard {
    group: String,
    slots: Arc<Slots>,
}

impl GenerationGuard {
    /// Group key this guard owns.
    #[must_use]
    pub(crate) fn group(&self) -> &str {
        &self.group
    }

    /// Release the slot now.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for GenerationGuard {
    fn drop(&mut self) {
        let removed = self
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.group);
        if let Some(done) = removed {
            done.send_replace(true);
        }
        tracing::debug!(group = %self.group, "Generation slot released");
    }
}

/// Handle on another caller's in-flight generation.
#[derive(Debug)]
pub struct WaitHandle {
    done: watch::Receiver<bool>,
}

impl WaitHandle {
    /// Suspend until the owning generation releases its slot.
    ///
    /// Says nothing about whether the generation succeeded; callers re-check
    /// the store afterwards.
    pub async fn wait(mut self) {
        // A closed channel means the slot is gone as well.
        let _ = self.done.wait_for(|done| *done).await;
    }
}
