use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Serializes work on the same topic id across workers.
///
/// Entries are created on first use and removed when the last holder is
/// done, so the map only ever holds ids that are in flight.
#[derive(Debug, Default)]
pub struct TopicLocks {
    slots: Mutex<HashMap<i64, Arc<Mutex<()>>>>,
}

impl TopicLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` while holding the lock for `topic_id`.
    pub fn with_topic<T>(&self, topic_id: i64, f: impl FnOnce() -> T) -> T {
        let slot = self.checkout(topic_id);
        let result = {
            let _guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
            f()
        };
        self.release(topic_id, slot);
        result
    }

    fn checkout(&self, topic_id: i64) -> Arc<Mutex<()>> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(topic_id).or_default())
    }

    fn release(&self, topic_id: i64, slot: Arc<Mutex<()>>) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        // One reference lives in the map and one is ours.
        if Arc::strong_count(&slot) == 2 {
            slots.remove(&topic_id);
        }
    }

    pub fn in_flight(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
