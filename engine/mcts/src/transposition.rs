//! Bounded map from state digests to live tree nodes.
//!
//! Entries hold `Weak` handles, so the table never keeps a node alive on
//! its own; a lookup whose handle has expired reads as a miss and is
//! pruned on the spot. The table is bounded both by entry count and by
//! entry age, evicting dead and stale entries first and the oldest live
//! entry as a last resort. It is cleared between searches: transpositions
//! are only merged within one tree.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;

use crate::node::MctsNode;

const DEFAULT_MAX_AGE: Duration = Duration::from_secs(300);

#[derive(Debug)]
struct Entry {
    node: Weak<MctsNode>,
    inserted: Instant,
}

/// Digest-keyed table of weak node handles.
#[derive(Debug)]
pub struct TranspositionTable {
    entries: Mutex<FxHashMap<u64, Entry>>,
    capacity: usize,
    max_age: Duration,
}

fn lock(
    entries: &Mutex<FxHashMap<u64, Entry>>,
) -> MutexGuard<'_, FxHashMap<u64, Entry>> {
    entries.lock().unwrap_or_else(PoisonError::into_inner)
}

impl TranspositionTable {
    pub fn new(capacity: usize) -> Self {
        Self::with_max_age(capacity, DEFAULT_MAX_AGE)
    }

    pub fn with_max_age(capacity: usize, max_age: Duration) -> Self {
        Self {
            entries: Mutex::new(FxHashMap::default()),
            capacity: capacity.max(1),
            max_age,
        }
    }

    /// Upgrade the entry for `digest`, pruning it when dead or stale.
    pub fn lookup(&self, digest: u64) -> Option<Arc<MctsNode>> {
        let mut entries = lock(&self.entries);
        match entries.get(&digest) {
            Some(entry) if entry.inserted.elapsed() <= self.max_age => {
                let node = entry.node.upgrade();
                if node.is_none() {
                    entries.remove(&digest);
                }
                node
            }
            Some(_) => {
                entries.remove(&digest);
                None
            }
            None => None,
        }
    }

    /// Insert or replace the entry for `digest`, evicting if full.
    pub fn insert(&self, digest: u64, node: &Arc<MctsNode>) {
        let mut entries = lock(&self.entries);
        if entries.len() >= self.capacity && !entries.contains_key(&digest) {
            Self::evict(&mut entries, self.max_age);
        }
        entries.insert(
            digest,
            Entry {
                node: Arc::downgrade(node),
                inserted: Instant::now(),
            },
        );
    }

    /// Drop dead and stale entries; if nothing qualified, drop the oldest
    /// entry so the insert always has room.
    fn evict(entries: &mut FxHashMap<u64, Entry>, max_age: Duration) {
        let before = entries.len();
        entries.retain(|_, entry| {
            entry.node.strong_count() > 0 && entry.inserted.elapsed() <= max_age
        });
        if entries.len() < before {
            return;
        }
        if let Some(oldest) = entries
            .iter()
            .min_by_key(|(_, entry)| entry.inserted)
            .map(|(digest, _)| *digest)
        {
            entries.remove(&oldest);
        }
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        lock(&self.entries).clear();
    }
}
