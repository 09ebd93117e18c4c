//! Eviction order: decides which key goes when the cache is full.
//!
//! Keys are evicted strictly in first-insert order. Each insert is tagged
//! with a sequence number; the queue keeps `(seq, key)` pairs and stale
//! pairs (for deleted or re-inserted keys) are skipped when popping.

use std::collections::VecDeque;

/// Insertion sequence number.
pub type Seq = u64;

/// FIFO queue of keys in first-insert order.
#[derive(Debug, Default)]
pub struct Evictor {
    queue: VecDeque<(Seq, String)>,
    next_seq: Seq,
}

impl Evictor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a first insert of `key` and return its sequence tag.
    pub fn record(&mut self, key: &str) -> Seq {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push_back((seq, key.to_string()));
        seq
    }

    /// Pop the oldest key whose tag is still current.
    ///
    /// `current` returns the live sequence tag stored for a key, or `None`
    /// if the key is gone.
    pub fn pop_oldest(&mut self, current: impl Fn(&str) -> Option<Seq>) -> Option<String> {
        while let Some((seq, key)) = self.queue.pop_front() {
            if current(key.as_str()) == Some(seq) {
                return Some(key);
            }
        }
        None
    }

    /// Drop stale pairs once they outnumber live ones.
    pub fn compact(&mut self, live: usize, current: impl Fn(&str) -> Option<Seq>) {
        if self.queue.len() <= live.saturating_mul(2).max(16) {
            return;
        }
        self.queue.retain(|(seq, key)| current(key.as_str()) == Some(*seq));
    }

    /// Keys with current tags, oldest first.
    pub fn ordered<'a>(
        &'a self,
        current: impl Fn(&str) -> Option<Seq> + 'a,
    ) -> impl Iterator<Item = &'a str> + 'a {
        self.queue
            .iter()
            .filter(move |(seq, key)| current(key.as_str()) == Some(*seq))
            .map(|(_, key)| key.as_str())
    }

    /// Number of queued pairs, including stale ones.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }
}
