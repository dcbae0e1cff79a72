//! Fixed-capacity, open-addressed slot storage.
//!
//! Both the resource table and the timing table are a flat array of tagged
//! slots addressed by `hash mod capacity`, with collisions resolved by linear
//! probing that wraps around the end of the array. Every operation on them is
//! expressed through [`SlotTable::for_each`], a single visit-with-early-exit
//! scan, so locking happens in exactly one place per table.

use std::collections::TryReserveError;

/// Default slot count of the process-wide tables. The extra slot keeps the
/// modulus off a power of two so folded pointer hashes spread better.
pub const DEFAULT_CAPACITY: usize = 4 * 1024 * 1024 + 1;

/// A table slot. Tables start with every slot `Empty`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot<T> {
    Empty,
    Occupied(T),
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Slot::Empty
    }
}

impl<T> Slot<T> {
    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, Slot::Empty)
    }

    #[inline]
    pub fn occupied(&self) -> Option<&T> {
        match self {
            Slot::Occupied(value) => Some(value),
            Slot::Empty => None,
        }
    }
}

/// Visitor verdict for [`SlotTable::for_each`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scan {
    Continue,
    Stop,
}

pub struct SlotTable<T> {
    slots: Vec<Slot<T>>,
}

impl<T> SlotTable<T> {
    /// Allocates `capacity` empty slots (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity.max(1));
        slots.resize_with(capacity.max(1), Slot::default);
        Self { slots }
    }

    /// Like [`SlotTable::with_capacity`], but reports allocation failure
    /// instead of aborting the process.
    pub fn try_with_capacity(capacity: usize) -> Result<Self, TryReserveError> {
        let mut slots = Vec::new();
        slots.try_reserve_exact(capacity.max(1))?;
        slots.resize_with(capacity.max(1), Slot::default);
        Ok(Self { slots })
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn index_of(&self, hash: u64) -> usize {
        (hash % self.slots.len() as u64) as usize
    }

    /// Visits every slot exactly once, starting at `start mod capacity` and
    /// wrapping around. Returns `true` when the visitor stopped the scan.
    pub fn for_each<F>(&mut self, start: u64, mut visit: F) -> bool
    where
        F: FnMut(&mut Slot<T>) -> Scan,
    {
        let first = self.index_of(start);
        let len = self.slots.len();

        for i in (first..len).chain(0..first) {
            if visit(&mut self.slots[i]) == Scan::Stop {
                return true;
            }
        }
        false
    }

    /// Stores `value` in the first empty slot probed from `hash`. Hands the
    /// value back when every slot is occupied.
    pub fn insert(&mut self, hash: u64, value: T) -> Result<(), T> {
        let mut pending = Some(value);
        self.for_each(hash, |slot| {
            if slot.is_empty() {
                if let Some(value) = pending.take() {
                    *slot = Slot::Occupied(value);
                }
                Scan::Stop
            } else {
                Scan::Continue
            }
        });

        match pending {
            None => Ok(()),
            Some(value) => Err(value),
        }
    }

    pub fn occupied(&self) -> impl Iterator<Item = &T> {
        self.slots.iter().filter_map(Slot::occupied)
    }

    pub fn occupied_count(&self) -> usize {
        self.slots.iter().filter(|slot| !slot.is_empty()).count()
    }

    pub fn slots(&self) -> &[Slot<T>] {
        &self.slots
    }

    pub fn slots_mut(&mut self) -> &mut [Slot<T>] {
        &mut self.slots
    }
}

/// Folds the high half of a 64-bit key onto the low half.
#[inline]
pub fn fold_hash(v: u64) -> u32 {
    const MASK32: u64 = (1 << 32) - 1;
    ((v >> 32).wrapping_add(v & MASK32)) as u32
}
