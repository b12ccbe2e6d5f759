//! Keyed debounce scheduler.
//!
//! `schedule(key, delay, action)` replaces whatever was pending under `key`
//! and runs `action` once the key has been quiet for `delay`. Used for the
//! safety check (per row), the suggestion fetch (per row) and the timed
//! dismissal of the "no concerns" acknowledgement.
//!
//! Key properties:
//! - At most one pending action per key; a newer schedule supersedes it
//! - An action runs exactly once, and only if it was never superseded
//! - Zero delay still defers to a spawned task, never runs inline
//! - Timers are `tokio::time` based, so tests drive them with a paused clock

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;

struct Pending {
    ticket: u64,
    handle: JoinHandle<()>,
}

struct DebounceState<K> {
    next_ticket: u64,
    pending: HashMap<K, Pending>,
}

/// Cloneable handle; clones share the same pending-timer table.
pub struct Debouncer<K> {
    state: Arc<Mutex<DebounceState<K>>>,
}

impl<K> Clone for Debouncer<K> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<K> Default for Debouncer<K>
where
    K: Eq + Hash + Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> Debouncer<K>
where
    K: Eq + Hash + Clone + Send + 'static,
{
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(DebounceState {
                next_ticket: 0,
                pending: HashMap::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, DebounceState<K>> {
        lock_state(&self.state)
    }

    /// Arm `action` under `key`, cancelling anything already pending there.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule<F>(&self, key: K, delay: Duration, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut state = self.lock();
        state.next_ticket += 1;
        let ticket = state.next_ticket;

        if let Some(previous) = state.pending.remove(&key) {
            previous.handle.abort();
        }

        let shared = Arc::clone(&self.state);
        let task_key = key.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            // Claim the slot before running: a superseding schedule that
            // raced the timer leaves a different ticket behind.
            let claimed = {
                let mut state = lock_state(&shared);
                match state.pending.get(&task_key) {
                    Some(pending) if pending.ticket == ticket => {
                        state.pending.remove(&task_key);
                        true
                    }
                    _ => false,
                }
            };

            if claimed {
                action();
            }
        });

        state.pending.insert(key, Pending { ticket, handle });
    }

    /// Drop the pending action for `key` without running it.
    /// Returns whether something was pending.
    pub fn cancel(&self, key: &K) -> bool {
        match self.lock().pending.remove(key) {
            Some(pending) => {
                pending.handle.abort();
                true
            }
            None => false,
        }
    }

    /// Drop every pending action.
    pub fn cancel_all(&self) {
        let mut state = self.lock();
        for (_, pending) in state.pending.drain() {
            pending.handle.abort();
        }
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.lock().pending.contains_key(key)
    }

    pub fn pending_count(&self) -> usize {
        self.lock().pending.len()
    }
}

fn lock_state<K>(state: &Mutex<DebounceState<K>>) -> MutexGuard<'_, DebounceState<K>> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}
