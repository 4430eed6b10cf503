//! Shot ledger
//!
//! Bounded in-memory list of recently processed shots. Appended only by
//! background tasks after rendering, so its order is render-completion
//! order. Oldest records are evicted first once the capacity is reached.

use std::collections::VecDeque;

use parking_lot::Mutex;
use shared::ShotRecord;

#[derive(Debug)]
pub struct ShotLedger {
    records: Mutex<VecDeque<ShotRecord>>,
    capacity: usize,
}

impl ShotLedger {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append, then trim to capacity
    pub fn push(&self, record: ShotRecord) {
        let mut records = self.records.lock();
        records.push_back(record);
        while records.len() > self.capacity {
            records.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Up to `limit` records, newest first
    pub fn recent(&self, limit: usize) -> Vec<ShotRecord> {
        self.records.lock().iter().rev().take(limit).cloned().collect()
    }

    pub fn find(&self, filename: &str) -> Option<ShotRecord> {
        self.records
            .lock()
            .iter()
            .rev()
            .find(|r| r.filename == filename)
            .cloned()
    }
}
