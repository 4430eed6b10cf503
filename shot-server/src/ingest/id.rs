//! Shot id generation
//!
//! Ids are epoch seconds at arrival, bumped past the previous id when two
//! uploads land in the same second, so ids and filenames never collide
//! within a process.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Local};

/// Identity of one ingested shot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShotId {
    pub id: i64,
    /// Arrival time, `YYYYMMDD_HHMMSS`
    pub timestamp: String,
    /// `shot_<timestamp>_<id>.json`
    pub filename: String,
}

#[derive(Debug, Default)]
pub struct ShotIdGenerator {
    last: AtomicI64,
}

impl ShotIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> ShotId {
        self.next_at(Local::now())
    }

    pub fn next_at(&self, now: DateTime<Local>) -> ShotId {
        let secs = now.timestamp();
        let (Ok(prev) | Err(prev)) =
            self.last
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| {
                    Some(secs.max(last + 1))
                });
        let id = secs.max(prev + 1);
        let timestamp = now.format("%Y%m%d_%H%M%S").to_string();

        ShotId {
            id,
            filename: format!("shot_{}_{}.json", timestamp, id),
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_id_is_epoch_seconds() {
        let now = Local.timestamp_opt(1_717_000_000, 0).unwrap();
        let shot = ShotIdGenerator::new().next_at(now);
        assert_eq!(shot.id, 1_717_000_000);
        assert_eq!(shot.filename, format!("shot_{}_1717000000.json", shot.timestamp));
        assert_eq!(shot.timestamp.len(), 15);
    }

    #[test]
    fn test_same_second_uploads_get_distinct_ids() {
        let generator = ShotIdGenerator::new();
        let now = Local.timestamp_opt(1_717_000_000, 0).unwrap();
        let a = generator.next_at(now);
        let b = generator.next_at(now);
        assert_eq!(b.id, a.id + 1);
        assert_ne!(a.filename, b.filename);
    }

    #[test]
    fn test_concurrent_ids_unique() {
        let generator = Arc::new(ShotIdGenerator::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let generator = generator.clone();
                std::thread::spawn(move || (0..50).map(|_| generator.next().id).collect::<Vec<_>>())
            })
            .collect();

        let mut ids = HashSet::new();
        for h in handles {
            for id in h.join().unwrap() {
                assert!(ids.insert(id));
            }
        }
        assert_eq!(ids.len(), 400);
    }
}
