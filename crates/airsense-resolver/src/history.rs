//! Per-device snapshot history.
//!
//! Holds at most one previous `CanonicalReading` per device so the next
//! cycle can compute inter-cycle deltas. Entries are replaced, never
//! mutated, and evicted once a device has gone unseen for a configured
//! number of cycles, so the map cannot grow without bound as devices come
//! and go. Access follows single-writer-per-key discipline: one device is
//! only ever observed by its own evaluation task within a cycle.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tracing::debug;

use airsense_core::config::HistoryConfig;
use airsense_core::CanonicalReading;

#[derive(Debug, Clone)]
struct HistoryEntry {
    reading: CanonicalReading,
    last_seen_cycle: u64,
}

/// The only long-lived shared resource in the engine.
#[derive(Debug)]
pub struct SnapshotHistory {
    entries: DashMap<String, HistoryEntry>,
    cycle: AtomicU64,
    max_idle_cycles: u64,
}

impl SnapshotHistory {
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            entries: DashMap::new(),
            cycle: AtomicU64::new(0),
            max_idle_cycles: config.max_idle_cycles.max(1),
        }
    }

    /// Advance the cycle counter and evict entries for devices unseen for
    /// longer than the idle bound. Called once per polling cycle.
    pub fn begin_cycle(&self) -> u64 {
        let cycle = self.cycle.fetch_add(1, Ordering::SeqCst) + 1;
        let horizon = cycle.saturating_sub(self.max_idle_cycles);
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.last_seen_cycle >= horizon);
        let evicted = before - self.entries.len();
        if evicted > 0 {
            debug!("evicted {} idle device snapshot(s) at cycle {}", evicted, cycle);
        }
        cycle
    }

    /// Record the current reading for its device, returning the previous
    /// cycle's reading if one was held.
    pub fn observe(&self, reading: &CanonicalReading) -> Option<CanonicalReading> {
        let cycle = self.cycle.load(Ordering::SeqCst);
        self.entries
            .insert(
                reading.device_id.clone(),
                HistoryEntry {
                    reading: reading.clone(),
                    last_seen_cycle: cycle,
                },
            )
            .map(|entry| entry.reading)
    }

    /// Peek at the stored snapshot without replacing it.
    pub fn previous(&self, device_id: &str) -> Option<CanonicalReading> {
        self.entries.get(device_id).map(|entry| entry.reading.clone())
    }

    /// Number of devices currently tracked.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use airsense_core::Metric;
    use chrono::Utc;

    fn reading(device_id: &str, co2: f64) -> CanonicalReading {
        let mut r = CanonicalReading::empty(device_id, Utc::now());
        r.set(Metric::Co2, Some(co2));
        r
    }

    #[test]
    fn observe_returns_previous_reading() {
        let history = SnapshotHistory::new(HistoryConfig::default());
        history.begin_cycle();
        assert!(history.observe(&reading("dev-1", 600.0)).is_none());
        history.begin_cycle();
        let previous = history.observe(&reading("dev-1", 850.0)).unwrap();
        assert_eq!(previous.co2, Some(600.0));
    }

    #[test]
    fn idle_devices_are_evicted() {
        let history = SnapshotHistory::new(HistoryConfig { max_idle_cycles: 2 });
        history.begin_cycle();
        history.observe(&reading("dev-1", 600.0));
        history.observe(&reading("dev-2", 700.0));

        // dev-2 keeps reporting, dev-1 goes quiet.
        for _ in 0..3 {
            history.begin_cycle();
            history.observe(&reading("dev-2", 700.0));
        }
        assert!(history.previous("dev-1").is_none());
        assert!(history.previous("dev-2").is_some());
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn distinct_devices_do_not_interfere() {
        let history = SnapshotHistory::new(HistoryConfig::default());
        history.begin_cycle();
        history.observe(&reading("dev-1", 500.0));
        history.observe(&reading("dev-2", 900.0));
        assert_eq!(history.previous("dev-1").unwrap().co2, Some(500.0));
        assert_eq!(history.previous("dev-2").unwrap().co2, Some(900.0));
    }
}
