use serde::Serialize;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::output::{warn, OnceWarning};
use crate::resource::Insert;
use crate::table::{fold_hash, Slot, SlotTable};
use crate::{Stage, Timestamp};

/// One dispatched unit of pipeline work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimingEntry {
    pub stage: Stage,
    /// Task kind consumed by the stage.
    pub input: i32,
    /// Task kind produced by the stage.
    pub output: i32,
    /// Picture number.
    pub work_id: u32,
    pub segment: i8,
    pub tile: i8,
    pub start: Timestamp,
    pub end: Timestamp,
}

/// Append-only log of work timings.
pub struct TimingTable {
    slots: Mutex<SlotTable<TimingEntry>>,
    overflow: OnceWarning,
}

impl TimingTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Mutex::new(SlotTable::with_capacity(capacity)),
            overflow: OnceWarning::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SlotTable<TimingEntry>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn capacity(&self) -> usize {
        self.lock().capacity()
    }

    pub fn len(&self) -> usize {
        self.lock().occupied_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stores `entry` in the first free slot probed from its start second.
    /// Entries sharing a start time are kept side by side, never merged.
    pub fn add(&self, entry: TimingEntry) -> Insert {
        let hash = u64::from(fold_hash(entry.start.secs));
        if self.lock().insert(hash, entry).is_ok() {
            return Insert::Stored;
        }

        let warned = self.overflow.hit();
        if warned {
            warn(format_args!(
                "can't add time entry for {} picture {}",
                entry.stage, entry.work_id
            ));
            warn(format_args!("you need to increase the timing table capacity"));
        }
        Insert::Dropped { warned }
    }

    /// Runs `f` with the slot array locked.
    pub(crate) fn with_locked<R>(&self, f: impl FnOnce(&mut [Slot<TimingEntry>]) -> R) -> R {
        f(self.lock().slots_mut())
    }

    pub fn overflow_count(&self) -> u64 {
        self.overflow.hits()
    }
}
