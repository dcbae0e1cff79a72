//! Allocation-site ranking.
//!
//! Live entries of one kind are folded into a scratch slot table keyed by
//! their origin, then the whole table is sorted by accumulated size.

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::TryReserveError;

use super::table::{Origin, ResourceTable};
use crate::table::{Scan, Slot, SlotTable};
use crate::ResourceKind;

/// Accumulated size of the live resources created at one call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SiteTotal {
    pub origin: Origin,
    pub size: u64,
}

pub struct SiteTable {
    slots: SlotTable<SiteTotal>,
}

impl SiteTable {
    pub fn try_new(capacity: usize) -> Result<Self, TryReserveError> {
        Ok(Self {
            slots: SlotTable::try_with_capacity(capacity)?,
        })
    }

    /// Adds `size` to the site at `origin`, creating it on first sight.
    /// Returns `false` only when the table is full of other sites.
    pub fn fold(&mut self, origin: Origin, size: u64) -> bool {
        self.slots.for_each(origin.hash(), |slot| match slot {
            Slot::Empty => {
                *slot = Slot::Occupied(SiteTotal { origin, size });
                Scan::Stop
            }
            Slot::Occupied(site) if site.origin == origin => {
                site.size += size;
                Scan::Stop
            }
            Slot::Occupied(_) => Scan::Continue,
        })
    }

    /// Sorts every slot largest first, empty slots last, and keeps the
    /// first `limit` sites.
    pub fn ranked(mut self, limit: usize) -> Vec<SiteTotal> {
        self.slots.slots_mut().sort_unstable_by(by_size_desc);
        self.slots
            .slots()
            .iter()
            .take(limit)
            .filter_map(Slot::occupied)
            .copied()
            .collect()
    }
}

fn by_size_desc(a: &Slot<SiteTotal>, b: &Slot<SiteTotal>) -> Ordering {
    match (a, b) {
        (Slot::Occupied(a), Slot::Occupied(b)) => b.size.cmp(&a.size),
        (Slot::Occupied(_), Slot::Empty) => Ordering::Less,
        (Slot::Empty, Slot::Occupied(_)) => Ordering::Greater,
        (Slot::Empty, Slot::Empty) => Ordering::Equal,
    }
}

/// Top `limit` call sites by live size for resources of `kind`.
///
/// The resource table stays locked for the whole fold. The scratch table has
/// the resource table's capacity; failing to allocate it is reported to the
/// caller and leaves the resource table untouched.
pub fn top_sites(
    table: &ResourceTable,
    kind: ResourceKind,
    limit: usize,
) -> Result<Vec<SiteTotal>, TryReserveError> {
    table.with_locked(|slots| {
        let mut sites = SiteTable::try_new(slots.capacity())?;
        for entry in slots.occupied().filter(|entry| entry.kind == kind) {
            sites.fold(entry.origin, entry.size);
        }
        Ok(sites.ranked(limit))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ResourceKind::*;

    #[test]
    fn test_ranking_orders_by_size_descending() {
        let mut sites = SiteTable::try_new(31).unwrap();
        sites.fold(Origin::new("a.rs", 1), 100);
        sites.fold(Origin::new("b.rs", 2), 300);
        sites.fold(Origin::new("c.rs", 3), 300);
        sites.fold(Origin::new("d.rs", 4), 50);

        let ranked = sites.ranked(10);
        let sizes: Vec<u64> = ranked.iter().map(|s| s.size).collect();
        assert_eq!(sizes, vec![300, 300, 100, 50]);

        let mut top_two: Vec<&str> = ranked[..2].iter().map(|s| s.origin.file).collect();
        top_two.sort();
        assert_eq!(top_two, vec!["b.rs", "c.rs"]);
        assert_eq!(ranked[2].origin.file, "a.rs");
        assert_eq!(ranked[3].origin.file, "d.rs");
    }

    #[test]
    fn test_fold_merges_same_origin() {
        let mut sites = SiteTable::try_new(7).unwrap();
        let origin = Origin::new("enc/me.rs", 40);
        assert!(sites.fold(origin, 10));
        assert!(sites.fold(origin, 22));
        assert!(sites.fold(Origin::new("enc/me.rs", 41), 5));

        let ranked = sites.ranked(10);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0], SiteTotal { origin, size: 32 });
    }

    #[test]
    fn test_fold_reports_full_table() {
        let mut sites = SiteTable::try_new(2).unwrap();
        assert!(sites.fold(Origin::new("a.rs", 1), 1));
        assert!(sites.fold(Origin::new("b.rs", 1), 1));
        assert!(!sites.fold(Origin::new("c.rs", 1), 1));
        // Existing sites still accumulate.
        assert!(sites.fold(Origin::new("a.rs", 1), 1));
    }

    #[test]
    fn test_ranked_respects_limit() {
        let mut sites = SiteTable::try_new(64).unwrap();
        for line in 1..=20u32 {
            sites.fold(Origin::new("pool.rs", line), u64::from(line));
        }
        let ranked = sites.ranked(10);
        assert_eq!(ranked.len(), 10);
        assert_eq!(ranked[0].size, 20);
        assert_eq!(ranked[9].size, 11);
    }

    #[test]
    fn test_top_sites_only_counts_requested_kind() {
        let table = ResourceTable::new(53);
        let hot = Origin::new("enc/buffers.rs", 12);
        table.add(0x100, HeapBlock, 4096, hot);
        table.add(0x200, HeapBlock, 1024, hot);
        table.add(0x300, HeapBlock, 64, Origin::new("enc/small.rs", 3));
        table.add(0x400, AlignedBlock, 1 << 20, Origin::new("enc/aligned.rs", 9));
        table.add(0x500, ZeroedHeapBlock, 1 << 20, Origin::new("enc/zeroed.rs", 1));

        let top = top_sites(&table, HeapBlock, 10).unwrap();
        assert_eq!(
            top,
            vec![
                SiteTotal {
                    origin: hot,
                    size: 5120
                },
                SiteTotal {
                    origin: Origin::new("enc/small.rs", 3),
                    size: 64
                },
            ]
        );
        // The live table is not modified by the ranking pass.
        assert_eq!(table.summarize().occupied, 5);
    }
}
