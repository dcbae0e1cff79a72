use serde::Serialize;
use std::fmt;
use std::panic::Location;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::output::{warn, OnceWarning};
use crate::table::{fold_hash, Scan, Slot, SlotTable};
use crate::ResourceKind;

/// Call site that created a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Origin {
    pub file: &'static str,
    pub line: u32,
}

impl Origin {
    pub const fn new(file: &'static str, line: u32) -> Self {
        Self { file, line }
    }

    /// Origin of the caller of the enclosing `#[track_caller]` function.
    #[track_caller]
    pub fn caller() -> Self {
        let location = Location::caller();
        Self::new(location.file(), location.line())
    }

    /// FNV-1a over the file name, offset by the line. Equal origins hash
    /// equally even when the file string lives at different addresses.
    pub(crate) fn hash(&self) -> u64 {
        const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
        const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

        let mut h = FNV_OFFSET;
        for byte in self.file.bytes() {
            h ^= u64::from(byte);
            h = h.wrapping_mul(FNV_PRIME);
        }
        u64::from(fold_hash(h)).wrapping_add(u64::from(self.line))
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResourceEntry {
    pub address: usize,
    pub kind: ResourceKind,
    /// Bytes for memory kinds, a count of one for handles.
    pub size: u64,
    pub origin: Origin,
}

/// Outcome of [`ResourceTable::add`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insert {
    Stored,
    /// Null address; nothing to track.
    Ignored,
    /// Table full. `warned` is true only for the first overflow.
    Dropped { warned: bool },
}

/// Outcome of [`ResourceTable::remove`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    Removed,
    Ignored,
    /// No live entry matched. `warned` is true only for the first miss.
    Untracked { warned: bool },
}

/// Per-kind totals over the occupied slots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MemSummary {
    pub amounts: [u64; ResourceKind::ALL.len()],
    pub occupied: usize,
}

impl MemSummary {
    #[inline]
    pub fn amount(&self, kind: ResourceKind) -> u64 {
        self.amounts[kind.index()]
    }

    pub fn memory_total(&self) -> u64 {
        ResourceKind::ALL
            .into_iter()
            .filter(|kind| kind.is_memory())
            .map(|kind| self.amount(kind))
            .sum()
    }
}

#[inline]
pub(crate) fn address_hash(address: usize) -> u64 {
    u64::from(fold_hash(address as u64))
}

/// Live resources keyed by address.
///
/// One mutex guards the whole slot array; every operation holds it for its
/// entire scan.
pub struct ResourceTable {
    slots: Mutex<SlotTable<ResourceEntry>>,
    overflow: OnceWarning,
    untracked: OnceWarning,
}

impl ResourceTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Mutex::new(SlotTable::with_capacity(capacity)),
            overflow: OnceWarning::new(),
            untracked: OnceWarning::new(),
        }
    }

    // A panic while the lock was held cannot leave a slot half-written, so
    // the poisoned guard is still usable.
    fn lock(&self) -> MutexGuard<'_, SlotTable<ResourceEntry>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn capacity(&self) -> usize {
        self.lock().capacity()
    }

    /// Locked scan of every slot from `start`; see [`SlotTable::for_each`].
    pub fn for_each<F>(&self, start: u64, visit: F) -> bool
    where
        F: FnMut(&mut Slot<ResourceEntry>) -> Scan,
    {
        self.lock().for_each(start, visit)
    }

    /// Runs `f` with the slot array locked.
    pub(crate) fn with_locked<R>(&self, f: impl FnOnce(&mut SlotTable<ResourceEntry>) -> R) -> R {
        f(&mut self.lock())
    }

    pub fn add(&self, address: usize, kind: ResourceKind, size: u64, origin: Origin) -> Insert {
        if address == 0 {
            return Insert::Ignored;
        }

        let entry = ResourceEntry {
            address,
            kind,
            size,
            origin,
        };
        if self.lock().insert(address_hash(address), entry).is_ok() {
            return Insert::Stored;
        }

        let warned = self.overflow.hit();
        if warned {
            warn(format_args!(
                "can't add resource entry for {} created at {}",
                kind, origin
            ));
            warn(format_args!(
                "you have a resource leak or need to increase the resource table capacity"
            ));
        }
        Insert::Dropped { warned }
    }

    pub fn remove(&self, address: usize, kind: ResourceKind) -> Removal {
        if address == 0 {
            return Removal::Ignored;
        }

        let removed = self.for_each(address_hash(address), |slot| match slot {
            Slot::Occupied(entry) if entry.address == address && kind.releases(entry.kind) => {
                *slot = Slot::Empty;
                Scan::Stop
            }
            _ => Scan::Continue,
        });
        if removed {
            return Removal::Removed;
        }

        let warned = self.untracked.hit();
        if warned {
            warn(format_args!(
                "freed an untracked resource {:#x}, kind = {}",
                address, kind
            ));
        }
        Removal::Untracked { warned }
    }

    pub fn summarize(&self) -> MemSummary {
        let mut summary = MemSummary::default();
        self.for_each(0, |slot| {
            if let Slot::Occupied(entry) = slot {
                summary.amounts[entry.kind.index()] += entry.size;
                summary.occupied += 1;
            }
            Scan::Continue
        });
        summary
    }

    /// Calls `on_leak` for every live entry. Returns whether there was any.
    pub fn leak_scan<F>(&self, mut on_leak: F) -> bool
    where
        F: FnMut(&ResourceEntry),
    {
        let mut leaked = false;
        self.for_each(0, |slot| {
            if let Slot::Occupied(entry) = slot {
                leaked = true;
                on_leak(entry);
            }
            Scan::Continue
        });
        leaked
    }

    pub fn live_entries(&self) -> Vec<ResourceEntry> {
        self.lock().occupied().copied().collect()
    }

    pub fn overflow_count(&self) -> u64 {
        self.overflow.hits()
    }

    pub fn untracked_count(&self) -> u64 {
        self.untracked.hits()
    }
}
