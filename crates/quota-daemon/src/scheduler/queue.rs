//! De-duplicating work queue
//!
//! A key is handed to at most one worker at a time. Keys added while they
//! are being processed are parked in the dirty set and re-queued once the
//! worker calls [`WorkQueue::done`], so a burst of triggers collapses into a
//! single follow-up run.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::{HashSet, VecDeque};
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;

#[derive(Debug)]
struct QueueState<K> {
    queue: VecDeque<K>,
    dirty: HashSet<K>,
    processing: HashSet<K>,
    shutting_down: bool,
}

/// Work queue with single-flight semantics per key
#[derive(Debug)]
pub struct WorkQueue<K>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
{
    state: Mutex<QueueState<K>>,
    notify: Notify,
    /// Pending delayed adds, tagged with the generation that created them
    timers: DashMap<K, (u64, JoinHandle<()>)>,
    generation: AtomicU64,
}

impl<K> Default for WorkQueue<K>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
{
    fn default() -> Self {
        Self {
            state: Mutex::new(QueueState {
                queue: VecDeque::new(),
                dirty: HashSet::new(),
                processing: HashSet::new(),
                shutting_down: false,
            }),
            notify: Notify::new(),
            timers: DashMap::new(),
            generation: AtomicU64::new(0),
        }
    }
}

impl<K> WorkQueue<K>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue `key` unless it is already waiting
    pub async fn add(&self, key: K) {
        let mut state = self.state.lock().await;
        if state.shutting_down || !state.dirty.insert(key.clone()) {
            return;
        }
        if state.processing.contains(&key) {
            return;
        }
        state.queue.push_back(key);
        drop(state);
        self.notify.notify_one();
    }

    /// Enqueue `key` after `delay`, replacing any pending timer for it
    pub fn add_after(self: &Arc<Self>, key: K, delay: Duration) {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let spawn_timer = || {
            let queue = Arc::clone(self);
            let timer_key = key.clone();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                queue.clear_timer(&timer_key, generation);
                queue.add(timer_key).await;
            })
        };

        // The entry guard is held until the handle is stored, so the task
        // cannot clear its slot before it exists.
        match self.timers.entry(key.clone()) {
            Entry::Occupied(mut slot) => {
                let (_, previous) = slot.insert((generation, spawn_timer()));
                previous.abort();
            }
            Entry::Vacant(slot) => {
                slot.insert((generation, spawn_timer()));
            }
        }
    }

    /// Drop the timer entry for `key` if it still belongs to `generation`
    fn clear_timer(&self, key: &K, generation: u64) {
        self.timers
            .remove_if(key, |_, (current, _)| *current == generation);
    }

    /// Cancel the pending timer for `key`
    pub fn forget(&self, key: &K) {
        if let Some((_, (_, handle))) = self.timers.remove(key) {
            handle.abort();
        }
    }

    /// Whether a timer is pending for `key`
    pub fn has_timer(&self, key: &K) -> bool {
        self.timers.contains_key(key)
    }

    /// Wait for the next key. Returns `None` once the queue shuts down.
    pub async fn get(&self) -> Option<K> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.state.lock().await;
                if state.shutting_down {
                    return None;
                }
                if let Some(key) = state.queue.pop_front() {
                    state.dirty.remove(&key);
                    state.processing.insert(key.clone());
                    return Some(key);
                }
            }

            notified.await;
        }
    }

    /// Mark `key` as finished, re-queueing it if it was added meanwhile
    pub async fn done(&self, key: &K) {
        let mut state = self.state.lock().await;
        state.processing.remove(key);
        if state.dirty.contains(key) {
            state.queue.push_back(key.clone());
            drop(state);
            self.notify.notify_one();
        }
    }

    /// Number of keys waiting to be handed out
    pub async fn len(&self) -> usize {
        self.state.lock().await.queue.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Stop handing out keys and cancel all timers
    pub async fn shutdown(&self) {
        self.state.lock().await.shutting_down = true;
        for entry in self.timers.iter() {
            entry.value().1.abort();
        }
        self.timers.clear();
        self.notify.notify_waiters();
    }
}
